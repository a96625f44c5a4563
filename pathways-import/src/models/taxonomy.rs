//! Subject classification terms

use serde::{Deserialize, Serialize};

/// Taxonomy term record (`taxonomy.csv`)
///
/// Bundle dialects flatten the hierarchy, so `parent_id` and `parent_name`
/// stay empty for terms they produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyTerm {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub parent_name: Option<String>,
    pub vocabulary: String,
}

impl TaxonomyTerm {
    pub const COLUMNS: &'static [&'static str] =
        &["id", "name", "parent_id", "parent_name", "vocabulary"];

    /// Flat term with its content-addressed id
    pub fn new(name: impl Into<String>, vocabulary: impl Into<String>) -> Self {
        let name = name.into();
        let vocabulary = vocabulary.into();
        Self {
            id: crate::identity::taxonomy_term_id(&name, &vocabulary),
            name,
            parent_id: None,
            parent_name: None,
            vocabulary,
        }
    }
}

/// Service-taxonomy link (`services_taxonomy.csv`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTaxonomyTerm {
    pub id: String,
    pub service_id: String,
    pub taxonomy_id: String,
    pub taxonomy_detail: Option<String>,
}

impl ServiceTaxonomyTerm {
    pub const COLUMNS: &'static [&'static str] =
        &["id", "service_id", "taxonomy_id", "taxonomy_detail"];

    pub fn link(service_id: &str, taxonomy_id: &str) -> Self {
        Self {
            id: crate::identity::service_taxonomy_term_id(service_id, taxonomy_id),
            service_id: service_id.to_string(),
            taxonomy_id: taxonomy_id.to_string(),
            taxonomy_detail: None,
        }
    }
}
