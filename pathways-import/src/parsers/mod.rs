//! Sub-parsers for the repeated field groups of a bundle
//!
//! - [`address`]: postal/physical address column groups
//! - [`phone`]: numbered phone slots and the fax slot
//! - [`taxonomy`]: term splitting, leaf reduction, vocabulary inference
//! - [`values`]: coordinates, dates and website addresses

pub mod address;
pub mod phone;
pub mod taxonomy;
pub mod values;
