//! Provider abstraction for AWS IAM managed policies
//!
//! Implementations adapt a real SDK client (or a test double) to this
//! trait; the reconcilers never see pagination markers leak past
//! [`collect_pages`] and never construct transport requests themselves.
//! A missing entity surfaces as [`Error::NotFound`](crate::error::Error)
//! so fetch paths can normalize it to an empty result.

use crate::error::Result;
use crate::template::Tag;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A managed policy as observed on the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedPolicy {
    /// Policy ARN
    pub arn: String,
    /// Policy name
    pub policy_name: String,
    /// IAM path
    pub path: String,
    /// Policy description
    pub description: Option<String>,
    /// Version id of the default version
    pub default_version_id: String,
    /// Document of the default version; filled in by
    /// [`fetch_managed_policy`](crate::aws::policy::fetch_managed_policy)
    pub document: Option<Value>,
}

/// A policy as it appears in a listing, before detail fetches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySummary {
    /// Policy ARN
    pub arn: String,
    /// Policy name
    pub policy_name: String,
    /// IAM path
    pub path: String,
}

/// One retained version of a policy document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVersion {
    /// Version id (e.g. "v3")
    pub version_id: String,
    /// When the version was created
    pub create_date: DateTime<Utc>,
    /// Whether this version is the default
    pub is_default: bool,
}

/// Which policies a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListScope {
    /// Customer-managed policies only
    #[default]
    Local,
    /// AWS-managed policies only
    Aws,
    /// Both
    All,
}

/// Filter for managed policy listings
#[derive(Debug, Clone)]
pub struct PolicyListFilter {
    /// Which policies to list
    pub scope: ListScope,
    /// Restrict to policies attached to at least one entity
    pub only_attached: bool,
    /// Restrict to policies under this IAM path
    pub path_prefix: String,
    /// Provider-side usage filter, when supported
    pub usage_filter: Option<String>,
}

impl Default for PolicyListFilter {
    fn default() -> Self {
        Self {
            scope: ListScope::Local,
            only_attached: false,
            path_prefix: "/".to_string(),
            usage_filter: None,
        }
    }
}

/// Request payload for creating a managed policy
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePolicyRequest {
    /// Policy name
    pub policy_name: String,
    /// IAM path
    pub path: String,
    /// Initial policy document
    pub document: Value,
    /// Policy description
    pub description: Option<String>,
    /// Tags to attach at creation
    pub tags: Vec<Tag>,
}

/// One page of a paginated provider listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Marker for the next page, if any
    pub next_marker: Option<String>,
}

impl<T> Page<T> {
    /// A single, final page
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_marker: None,
        }
    }
}

/// Provider client for managed-policy operations.
///
/// Fetch-one operations return [`Error::NotFound`](crate::error::Error)
/// for missing entities; everything else propagates unchanged. The trait
/// carries no retry or backoff policy.
pub trait IamBackend: Send + Sync {
    /// Fetch one policy (without resolving its default document)
    fn get_policy(&self, arn: &str) -> Result<ManagedPolicy>;

    /// Fetch the document of one policy version
    fn get_policy_version_document(&self, arn: &str, version_id: &str) -> Result<Value>;

    /// List one page of policies matching the filter
    fn list_policies_page(
        &self,
        filter: &PolicyListFilter,
        marker: Option<&str>,
    ) -> Result<Page<PolicySummary>>;

    /// List all retained versions of a policy
    fn list_policy_versions(&self, arn: &str) -> Result<Vec<PolicyVersion>>;

    /// Create a managed policy
    fn create_policy(&self, request: &CreatePolicyRequest) -> Result<()>;

    /// Delete a managed policy
    fn delete_policy(&self, arn: &str) -> Result<()>;

    /// Create a new default version of a policy document
    fn create_policy_version(&self, arn: &str, document: &Value) -> Result<()>;

    /// Delete one retained version of a policy document
    fn delete_policy_version(&self, arn: &str, version_id: &str) -> Result<()>;

    /// List one page of a policy's tags
    fn list_policy_tags_page(&self, arn: &str, marker: Option<&str>) -> Result<Page<Tag>>;

    /// Attach tags to a policy
    fn tag_policy(&self, arn: &str, tags: &[Tag]) -> Result<()>;

    /// Remove tags from a policy by key
    fn untag_policy(&self, arn: &str, keys: &[String]) -> Result<()>;
}

/// Drain a paginated listing into one vector
pub fn collect_pages<T>(mut fetch: impl FnMut(Option<&str>) -> Result<Page<T>>) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let page = fetch(marker.as_deref())?;
        items.extend(page.items);
        match page.next_marker {
            Some(next) => marker = Some(next),
            None => break,
        }
    }
    Ok(items)
}

/// List every tag on a policy, following pagination
pub fn list_policy_tags(backend: &dyn IamBackend, arn: &str) -> Result<Vec<Tag>> {
    collect_pages(|marker| backend.list_policy_tags_page(arn, marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_pages_follows_markers() {
        let pages = vec![
            Page {
                items: vec![1, 2],
                next_marker: Some("m1".to_string()),
            },
            Page {
                items: vec![3],
                next_marker: Some("m2".to_string()),
            },
            Page::last(vec![4, 5]),
        ];
        let mut served = 0;
        let seen_markers = std::cell::RefCell::new(Vec::new());

        let items = collect_pages(|marker| {
            seen_markers.borrow_mut().push(marker.map(str::to_string));
            let page = pages[served].clone();
            served += 1;
            Ok(page)
        })
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            *seen_markers.borrow(),
            vec![None, Some("m1".to_string()), Some("m2".to_string())]
        );
    }

    #[test]
    fn test_collect_pages_propagates_errors() {
        let result: Result<Vec<u32>> =
            collect_pages(|_| Err(crate::error::Error::provider("throttled")));
        assert!(result.is_err());
    }
}
