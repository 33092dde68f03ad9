//! Template model for identity resources
//!
//! A template is a declarative, version-controlled definition of one cloud
//! identity resource. Each template is owned by exactly one YAML file on
//! disk: it is created on parse, rewritten in place during reconciliation,
//! and either written back or marked wholly deleted.

pub mod registry;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A resource tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

impl Tag {
    /// Create a tag
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Scoped removal record.
///
/// The resource is deleted only on the accounts matched by
/// `included_accounts`; accounts matched by `excluded_accounts` keep it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deleted {
    /// Always true; kept in the document for auditability
    pub deleted: bool,
    /// Patterns of the accounts the deletion applies to
    #[serde(default)]
    pub included_accounts: Vec<String>,
    /// Patterns of the accounts excluded from the deletion
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_accounts: Vec<String>,
}

impl Deleted {
    /// Create a deletion record for the given scope
    pub fn new(included_accounts: Vec<String>, excluded_accounts: Vec<String>) -> Self {
        Self {
            deleted: true,
            included_accounts,
            excluded_accounts,
        }
    }
}

/// The `deleted` field of a template: either a whole-template flag or an
/// ordered sequence of per-account deletion records.
///
/// The record sequence is append-only. Each record is a distinct historical
/// event and is preserved for audit, never collapsed or overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeletedState {
    /// The template is wholly deleted (or not deleted at all)
    Whole(bool),
    /// Scoped per-account deletion records
    Scoped(Vec<Deleted>),
}

impl Default for DeletedState {
    fn default() -> Self {
        Self::Whole(false)
    }
}

impl DeletedState {
    /// Whether the template as a whole is deleted
    pub fn is_wholly_deleted(&self) -> bool {
        matches!(self, Self::Whole(true))
    }

    /// Whether the field carries no deletion information at all
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Whole(false))
    }

    /// Scoped records, if any
    pub fn records(&self) -> &[Deleted] {
        match self {
            Self::Scoped(records) => records,
            Self::Whole(_) => &[],
        }
    }

    /// Append a deletion record, converting a plain flag into a sequence
    pub fn push(&mut self, record: Deleted) {
        match self {
            Self::Scoped(records) => records.push(record),
            Self::Whole(_) => *self = Self::Scoped(vec![record]),
        }
    }
}

/// Properties specific to an AWS managed policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedPolicyProperties {
    /// IAM path
    #[serde(default = "default_iam_path")]
    pub path: String,
    /// Policy description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The desired policy document
    pub policy_document: Value,
    /// Desired tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Properties specific to an AWS IAM role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleProperties {
    /// IAM path
    #[serde(default = "default_iam_path")]
    pub path: String,
    /// Role description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Session duration cap, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_session_duration: Option<u32>,
    /// The trust policy document
    pub assume_role_policy_document: Value,
    /// ARNs of managed policies to attach
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<String>,
    /// Desired tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

/// Properties specific to an Okta group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OktaGroupProperties {
    /// Identity provider instance the group belongs to
    pub idp_name: String,
    /// Group description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Member logins
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

/// Properties specific to a Google group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleGroupProperties {
    /// Workspace domain the group belongs to
    pub domain: String,
    /// Group description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Member addresses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

/// Type-specific template payload, discriminated by `template_type`.
///
/// The variant set is sealed; [`registry`] holds the authoritative table of
/// recognized type strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "template_type")]
pub enum TemplateProperties {
    /// `aws:iam:managed_policy`
    #[serde(rename = "aws:iam:managed_policy")]
    AwsManagedPolicy(ManagedPolicyProperties),
    /// `aws:iam:role`
    #[serde(rename = "aws:iam:role")]
    AwsRole(RoleProperties),
    /// `okta:group`
    #[serde(rename = "okta:group")]
    OktaGroup(OktaGroupProperties),
    /// `google:group`
    #[serde(rename = "google:group")]
    GoogleGroup(GoogleGroupProperties),
}

impl TemplateProperties {
    /// The canonical `template_type` string for this payload
    pub fn template_type(&self) -> &'static str {
        match self {
            Self::AwsManagedPolicy(_) => registry::AWS_MANAGED_POLICY,
            Self::AwsRole(_) => registry::AWS_ROLE,
            Self::OktaGroup(_) => registry::OKTA_GROUP,
            Self::GoogleGroup(_) => registry::GOOGLE_GROUP,
        }
    }
}

/// A parsed resource definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// File that owns this template; not part of the document
    #[serde(skip)]
    pub file_path: PathBuf,
    /// Stable identity of the resource across renames
    pub resource_name: String,
    /// Scope inclusion patterns; defaults to the wildcard
    #[serde(default = "default_included_accounts")]
    pub included_accounts: Vec<String>,
    /// Scope exclusion patterns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_accounts: Vec<String>,
    /// Whole-template flag or per-account deletion records
    #[serde(default, skip_serializing_if = "DeletedState::is_absent")]
    pub deleted: DeletedState,
    /// Type-specific payload, tagged by `template_type`
    #[serde(flatten)]
    pub properties: TemplateProperties,
}

impl Template {
    /// The template's `template_type` string
    pub fn template_type(&self) -> &'static str {
        self.properties.template_type()
    }

    /// Whether the template as a whole is deleted
    pub fn is_wholly_deleted(&self) -> bool {
        self.deleted.is_wholly_deleted()
    }

    /// Mark the template wholly deleted, discarding any scoped records
    pub fn mark_wholly_deleted(&mut self) {
        self.deleted = DeletedState::Whole(true);
    }

    /// Serialize the template back to its YAML document form
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the template back to the file that owns it
    pub fn write_back(&self) -> Result<()> {
        fs::write(&self.file_path, self.to_yaml()?)?;
        log::debug!("wrote template {}", self.file_path.display());
        Ok(())
    }
}

fn default_iam_path() -> String {
    "/".to_string()
}

fn default_included_accounts() -> Vec<String> {
    vec![crate::scope::WILDCARD.to_string()]
}

/// Find template files under a directory tree.
///
/// A file qualifies when it has the template extension and its content
/// carries the template marker. Results are sorted for determinism.
pub fn discover(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == crate::git::TEMPLATE_EXTENSION)
        })
        .filter(|entry| {
            fs::read_to_string(entry.path())
                .is_ok_and(|content| registry::contains_template_marker(&content))
        })
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    paths
}
