//! Hierarchical XML dialect
//!
//! ```text
//! Agency{Key, Name, AgencyDescription, URL/Address, Email/Address,
//!   Site{Key, Name, SiteDescription, SpatialLocation{Latitude, Longitude},
//!     SiteService{Key, Name, Description, Taxonomy{Code}},
//!     MailingAddress, PhysicalAddress{Line1.., City, State, ZipCode, Country},
//!     Phone[Confidential]{PhoneNumber, Type}}}
//! ```
//!
//! The document is streamed with `quick-xml`; each `Agency` element is
//! collected into a small owned tree and mapped into one [`Bundle`]. A
//! failure inside one agency never stops the stream.
//!
//! Rules that differ from the flat dialect:
//! - phones are validated into `+1XXXXXXXXXX` form; invalid ones are dropped
//!   with a warning, as are confidential ones
//! - address lines are read in numeric order; `Line5` and beyond are ignored
//! - a non-blank address needs `City` and `Country`; a malformed address
//!   degrades to "no address of that type" with a warning

use super::BundleMapper;
use crate::builder::{
    Bundle, BundleSettings, OrganizationBundle, RejectedCounts, ServiceBundle, SiteBundle,
    SiteDraft,
};
use crate::error::{ImportError, ParseError, Result};
use crate::models::{AddressType, Organization, Service};
use crate::parsers::address::{self, AddressFields, AddressPart, MAX_ADDRESS_LINES};
use crate::parsers::phone::{self, PhonePart, PhoneSlots};
use crate::parsers::{taxonomy, values};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

const AGENCY: &str = "Agency";

/// Owned XML element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Descend a `/`-separated child path
    pub fn path(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .try_fold(self, |element, name| element.child(name))
    }

    /// Trimmed, non-empty text at a child path
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.path(path)
            .map(|e| e.text.trim())
            .filter(|t| !t.is_empty())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn xml_error(e: impl std::fmt::Display) -> ImportError {
    ImportError::Xml(e.to_string())
}

fn start_element(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(xml_error)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Read everything up to the end tag matching `root`
fn read_subtree<R: BufRead>(reader: &mut Reader<R>, root: Element) -> Result<Element> {
    let mut stack = vec![root];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => stack.push(start_element(&start)?),
            Event::Empty(start) => {
                let element = start_element(&start)?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(element);
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::End(_) => {
                let Some(done) = stack.pop() else {
                    return Err(ImportError::Xml("Unbalanced end tag".to_string()));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => return Ok(done),
                }
            }
            Event::Eof => {
                return Err(ImportError::Xml(
                    "Unexpected end of document inside Agency".to_string(),
                ))
            }
            _ => {}
        }
        buf.clear();
    }
}

/// Maps `Agency` elements into bundles
#[derive(Debug, Clone, Default)]
pub struct XmlTreeMapper {
    settings: BundleSettings,
}

impl XmlTreeMapper {
    pub fn new(settings: BundleSettings) -> Self {
        Self { settings }
    }

    fn map_site(
        &self,
        site: &Element,
        organization_id: &str,
        context: &str,
        rejected: &mut RejectedCounts,
    ) -> std::result::Result<SiteBundle, ParseError> {
        let context = match site.text_at("Key") {
            Some(key) => format!("{} site {}", context, key),
            None => format!("{} site", context),
        };

        let phones = map_phones(site, &context, rejected);

        let mut addresses = Vec::new();
        for (tag, address_type) in [
            ("MailingAddress", AddressType::Postal),
            ("PhysicalAddress", AddressType::Physical),
        ] {
            let Some(element) = site.child(tag) else {
                continue;
            };
            let fields = address_fields(element, &context);
            match address::validate_tree_address(fields, address_type, &context) {
                Ok(Some(fields)) => addresses.push((address_type, fields)),
                Ok(None) => {}
                Err(e) => {
                    warn!(context = %context, error = %e, "Discarding malformed address");
                    rejected.addresses += 1;
                }
            }
        }

        let regions: Vec<&str> = addresses
            .iter()
            .filter_map(|(_, fields)| fields.state_province.as_deref())
            .collect();

        let mut services = Vec::new();
        for element in site.children_named("SiteService") {
            let id = element
                .text_at("Key")
                .ok_or_else(|| ParseError::missing("SiteService/Key", context.clone()))?;
            let classification =
                self.settings
                    .classifier
                    .classify(element.text_at("Description"), &regions, None);

            let taxonomy_terms = element
                .children_named("Taxonomy")
                .filter_map(|t| t.text_at("Code"))
                .flat_map(taxonomy::parse_tree_code)
                .collect();

            services.push(ServiceBundle {
                service: Service {
                    id: id.to_string(),
                    organization_id: organization_id.to_string(),
                    name: element.text_at("Name").map(str::to_string),
                    description: classification.description,
                    ..Default::default()
                },
                taxonomy_terms,
                inactive: classification.inactive,
            });
        }

        let draft = SiteDraft {
            organization_id: organization_id.to_string(),
            name: site.text_at("Name").map(str::to_string),
            alternate_name: None,
            description: site.text_at("SiteDescription").map(str::to_string),
            latitude: site
                .text_at("SpatialLocation/Latitude")
                .and_then(|v| values::parse_coordinate("Latitude", v, &context)),
            longitude: site
                .text_at("SpatialLocation/Longitude")
                .and_then(|v| values::parse_coordinate("Longitude", v, &context)),
            phones,
        };
        Ok(draft.assemble(addresses, services))
    }
}

impl BundleMapper for XmlTreeMapper {
    type Raw = Element;

    fn map_bundle(&self, agency: &Element, context: &str) -> std::result::Result<Bundle, ParseError> {
        let id = agency
            .text_at("Key")
            .ok_or_else(|| ParseError::missing("Key", context))?
            .to_string();
        let context = format!("agency {}", id);

        let classification =
            self.settings
                .classifier
                .classify(agency.text_at("AgencyDescription"), &[], None);

        let organization = Organization {
            id: id.clone(),
            name: agency.text_at("Name").map(str::to_string),
            description: classification.description,
            email: agency.text_at("Email/Address").map(str::to_string),
            url: agency.text_at("URL/Address").and_then(values::normalize_url),
            ..Default::default()
        };

        let mut rejected = RejectedCounts::default();
        let sites = agency
            .children_named("Site")
            .map(|site| self.map_site(site, &id, &context, &mut rejected))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(context = %context, sites = sites.len(), "Parsed agency");
        Ok(Bundle {
            context,
            id,
            organization: Some(OrganizationBundle {
                organization,
                taxonomy_terms: Vec::new(),
                inactive: classification.inactive,
            }),
            sites,
            rejected,
        })
    }
}

/// Validated phones of one site, in document order
fn map_phones(site: &Element, context: &str, rejected: &mut RejectedCounts) -> PhoneSlots {
    let mut slots = PhoneSlots::default();
    let mut slot = 0;

    for element in site.children_named("Phone") {
        let confidential = element
            .attribute("Confidential")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if confidential {
            debug!(context, "Skipping confidential phone");
            continue;
        }

        let (Some(number), Some(phone_type)) =
            (element.text_at("PhoneNumber"), element.text_at("Type"))
        else {
            continue;
        };

        match phone::normalize_international(number, context) {
            Ok(number) => {
                slots.set(slot, PhonePart::Number, &number);
                slots.set(slot, PhonePart::Type, &phone::type_slug(phone_type));
                slot += 1;
            }
            Err(e) => {
                warn!(context, error = %e, "Dropping phone number that fails validation");
                rejected.phones += 1;
            }
        }
    }
    slots
}

/// Collect address sub-fields; lines are ordered by their numeral
fn address_fields(element: &Element, context: &str) -> AddressFields {
    let mut fields = AddressFields::default();

    let mut lines: Vec<(usize, &str)> = element
        .children
        .iter()
        .filter_map(|c| {
            let n = c.name.strip_prefix("Line")?.parse::<usize>().ok()?;
            Some((n, c.text.trim()))
        })
        .collect();
    lines.sort_by_key(|(n, _)| *n);

    for (n, text) in lines {
        match n {
            1..=MAX_ADDRESS_LINES => fields.set(AddressPart::Line(n - 1), text),
            _ => warn!(context, line = n, "Ignoring address line beyond the fourth"),
        }
    }

    for (tag, part) in [
        ("City", AddressPart::City),
        ("State", AddressPart::StateProvince),
        ("ZipCode", AddressPart::PostalCode),
        ("Country", AddressPart::Country),
    ] {
        if let Some(text) = element.text_at(tag) {
            fields.set(part, text);
        }
    }
    fields
}

/// Streams one bundle per `Agency` element
pub struct XmlTreeReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    mapper: XmlTreeMapper,
    agencies: usize,
    finished: bool,
}

impl XmlTreeReader<BufReader<File>> {
    pub fn from_path(path: &Path, settings: BundleSettings) -> Result<Self> {
        if !path.exists() {
            return Err(ImportError::MissingFile(path.to_path_buf()));
        }
        info!(path = %path.display(), "Reading XML export");
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file), settings))
    }
}

impl<R: BufRead> XmlTreeReader<R> {
    pub fn from_reader(reader: R, settings: BundleSettings) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            mapper: XmlTreeMapper::new(settings),
            agencies: 0,
            finished: false,
        }
    }

    /// Advance to the next `Agency` start tag
    fn next_agency(&mut self) -> Result<Option<Element>> {
        loop {
            let found = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(start) if start.name().as_ref() == AGENCY.as_bytes() => {
                    Some((start_element(&start)?, false))
                }
                Event::Empty(start) if start.name().as_ref() == AGENCY.as_bytes() => {
                    Some((start_element(&start)?, true))
                }
                Event::Eof => return Ok(None),
                _ => None,
            };
            self.buf.clear();

            match found {
                Some((element, true)) => return Ok(Some(element)),
                Some((element, false)) => return read_subtree(&mut self.reader, element).map(Some),
                None => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for XmlTreeReader<R> {
    type Item = Result<Bundle>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_agency() {
            Ok(Some(agency)) => {
                self.agencies += 1;
                let context = format!("agency #{}", self.agencies);
                Some(self.mapper.map_bundle(&agency, &context).map_err(ImportError::from))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Vec<Result<Bundle>> {
        XmlTreeReader::from_reader(xml.as_bytes(), BundleSettings::default()).collect()
    }

    #[test]
    fn test_element_paths() {
        let mut url = Element::new("URL");
        let mut address = Element::new("Address");
        address.text = " www.example.org ".to_string();
        url.children.push(address);
        let mut agency = Element::new("Agency");
        agency.children.push(url);

        assert_eq!(agency.text_at("URL/Address"), Some("www.example.org"));
        assert_eq!(agency.text_at("URL/Missing"), None);
    }

    #[test]
    fn test_minimal_agency() {
        let bundles = parse(
            "<Source><Agency><Key>42</Key><Name>Helpers</Name>\
             <AgencyDescription>Helps</AgencyDescription>\
             <URL><Address>helpers.ca</Address></URL></Agency></Source>",
        );
        assert_eq!(bundles.len(), 1);
        let bundle = bundles.into_iter().next().unwrap().unwrap();
        assert_eq!(bundle.id, "42");
        let organization = bundle.organization.unwrap().organization;
        assert_eq!(organization.url.as_deref(), Some("http://helpers.ca"));
        assert!(bundle.sites.is_empty());
    }

    #[test]
    fn test_address_lines_sorted_and_capped() {
        let mut element = Element::new("PhysicalAddress");
        for (name, text) in [("Line2", "Unit 4"), ("Line1", "1 Road"), ("Line5", "extra")] {
            let mut line = Element::new(name);
            line.text = text.to_string();
            element.children.push(line);
        }
        let fields = address_fields(&element, "agency 1");
        assert_eq!(fields.lines[0].as_deref(), Some("1 Road"));
        assert_eq!(fields.lines[1].as_deref(), Some("Unit 4"));
        assert_eq!(fields.lines[2], None);
    }

    #[test]
    fn test_missing_agency_key_is_recoverable() {
        let bundles = parse("<Source><Agency><Name>No key</Name></Agency></Source>");
        let err = bundles.into_iter().next().unwrap().unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        let bundles = parse("<Source><Agency><Key>1</Key></Source>");
        let err = bundles.into_iter().last().unwrap().unwrap_err();
        assert!(!err.is_recoverable());
    }
}
