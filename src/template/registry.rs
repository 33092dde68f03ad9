//! Template type registry
//!
//! The authoritative table of recognized `template_type` strings. Parsing
//! dispatches through the sealed [`TemplateProperties`](super::TemplateProperties)
//! enum; this table backs marker detection and type validation so unknown
//! types are rejected before a full parse is attempted.

use crate::error::{Error, Result};
use crate::template::Template;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// `template_type` of an AWS managed policy
pub const AWS_MANAGED_POLICY: &str = "aws:iam:managed_policy";
/// `template_type` of an AWS IAM role
pub const AWS_ROLE: &str = "aws:iam:role";
/// `template_type` of an Okta group
pub const OKTA_GROUP: &str = "okta:group";
/// `template_type` of a Google group
pub const GOOGLE_GROUP: &str = "google:group";

/// Every recognized template type
pub const TEMPLATE_TYPES: &[&str] = &[AWS_MANAGED_POLICY, AWS_ROLE, OKTA_GROUP, GOOGLE_GROUP];

/// Whether a `template_type` value is in the registry
pub fn is_known_type(value: &str) -> bool {
    TEMPLATE_TYPES.contains(&value)
}

/// Extract the `template_type` field without committing to a full parse
pub fn peek_template_type(content: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Probe {
        template_type: String,
    }

    serde_yaml::from_str::<Probe>(content)
        .ok()
        .map(|probe| probe.template_type)
}

/// Whether a document carries the template marker: a top-level
/// `template_type` key naming a registered type
pub fn contains_template_marker(content: &str) -> bool {
    content.lines().any(|line| {
        line.strip_prefix("template_type:")
            .is_some_and(|rest| is_known_type(rest.trim().trim_matches(&['"', '\''][..])))
    })
}

/// Parse a template document, attributing failures to `path`
pub fn parse_template(path: &Path, content: &str) -> Result<Template> {
    let type_value = peek_template_type(content)
        .ok_or_else(|| Error::parse(path, "missing or invalid template_type"))?;
    if !is_known_type(&type_value) {
        return Err(Error::UnknownTemplateType { value: type_value });
    }

    let mut template: Template =
        serde_yaml::from_str(content).map_err(|err| Error::parse(path, err.to_string()))?;
    template.file_path = path.to_path_buf();
    Ok(template)
}

/// Load and parse a template file from disk
pub fn load_template(path: &Path) -> Result<Template> {
    let content = fs::read_to_string(path)?;
    parse_template(path, &content)
}
