//! Managed policy drift reconciliation
//!
//! Compares a template's desired document and tags against the live policy
//! and produces the minimal set of provider calls to converge. Every drift
//! is recorded as a [`ProposedChange`] whether or not execution occurs, so
//! a plan run reports byte-for-byte what an apply run would.

use crate::aws::backend::{
    collect_pages, list_policy_tags, CreatePolicyRequest, IamBackend, ManagedPolicy,
    PolicyListFilter, PolicySummary, PolicyVersion,
};
use crate::error::{Error, Result};
use crate::template::{ManagedPolicyProperties, Tag, Template, TemplateProperties};
use converge::{diff_values, try_map_bounded, ChangeType, ExecutionContext, ProposedChange};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

/// Provider retention ceiling for policy document versions
pub const MAX_POLICY_VERSIONS: usize = 5;

/// Outcome of a full reconciliation pass for one resource
#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    /// Every change the pass proposed, applied or not
    pub changes: Vec<ProposedChange>,
    /// First provider error hit while applying; later changes stay pending
    pub error: Option<Error>,
}

impl ReconcileOutcome {
    /// Whether the pass completed without a provider failure
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    fn failed(error: Error) -> Self {
        Self {
            changes: Vec::new(),
            error: Some(error),
        }
    }
}

/// The version to rotate out before creating a new one: the oldest retained
/// version that is not the default, ties broken by creation timestamp.
pub fn oldest_removable_version(versions: &[PolicyVersion]) -> Option<&str> {
    let mut sorted: Vec<&PolicyVersion> = versions.iter().collect();
    sorted.sort_by_key(|version| version.create_date);
    sorted
        .into_iter()
        .find(|version| !version.is_default)
        .map(|version| version.version_id.as_str())
}

/// Fetch one managed policy, resolving the default version's document.
///
/// A missing policy is `Ok(None)` so first-time creation and
/// drift-from-deleted-state look the same to callers; every other provider
/// error propagates unchanged.
pub fn fetch_managed_policy(
    backend: &dyn IamBackend,
    arn: &str,
) -> Result<Option<ManagedPolicy>> {
    let mut policy = match backend.get_policy(arn) {
        Ok(policy) => policy,
        Err(err) if err.is_not_found() => return Ok(None),
        Err(err) => return Err(err),
    };
    let document = backend.get_policy_version_document(arn, &policy.default_version_id)?;
    policy.document = Some(document);
    Ok(Some(policy))
}

/// List managed policies with full detail.
///
/// Pages through the listing, then fans out the per-policy detail fetches
/// with at most `jobs` calls in flight. Policies that disappear between the
/// listing and the fetch are dropped.
pub fn list_managed_policies(
    backend: &dyn IamBackend,
    filter: &PolicyListFilter,
    jobs: usize,
) -> Result<Vec<ManagedPolicy>> {
    let summaries = collect_pages(|marker| backend.list_policies_page(filter, marker))?;
    log::debug!("fetching detail for {} managed policies", summaries.len());
    let policies = try_map_bounded(summaries, jobs, |summary: PolicySummary| {
        fetch_managed_policy(backend, &summary.arn)
    })?;
    Ok(policies.into_iter().flatten().collect())
}

/// Converge the provider's policy document onto the template's.
///
/// On drift the UPDATE record is always returned; when executing and the
/// retention ceiling is reached, the oldest non-default version is deleted
/// before the new version is created (creating a sixth version without the
/// precheck fails the provider call).
pub fn update_policy_document(
    backend: &dyn IamBackend,
    arn: &str,
    desired: &Value,
    existing: &Value,
    ctx: &ExecutionContext,
) -> Result<Vec<ProposedChange>> {
    let Some(drift) = diff_values(existing, desired) else {
        return Ok(Vec::new());
    };

    let changes = vec![
        ProposedChange::new(ChangeType::Update, "policy_document")
            .with_summary(serde_json::to_value(&drift)?)
            .with_current(existing.clone())
            .with_new(desired.clone()),
    ];

    if ctx.execute() {
        let versions = backend.list_policy_versions(arn)?;
        if versions.len() >= MAX_POLICY_VERSIONS {
            if let Some(version_id) = oldest_removable_version(&versions) {
                log::info!("policy {arn} at the version retention ceiling, deleting {version_id}");
                backend.delete_policy_version(arn, version_id)?;
            }
        }
        log::info!("changes to the policy document discovered, updating {arn}");
        backend.create_policy_version(arn, desired)?;
    } else {
        log::info!("changes to the policy document discovered for {arn}");
    }

    Ok(changes)
}

/// Converge the provider's tags onto the template's.
///
/// Stale keys are removed strictly before new values are applied so a
/// changed value never lands next to its stale predecessor.
pub fn apply_policy_tags(
    backend: &dyn IamBackend,
    arn: &str,
    desired: &[Tag],
    existing: &[Tag],
    ctx: &ExecutionContext,
) -> Result<Vec<ProposedChange>> {
    let desired_keys: HashSet<&str> = desired.iter().map(|tag| tag.key.as_str()).collect();
    let existing_values: HashMap<&str, &str> = existing
        .iter()
        .map(|tag| (tag.key.as_str(), tag.value.as_str()))
        .collect();

    let to_remove: Vec<String> = existing
        .iter()
        .filter(|tag| !desired_keys.contains(tag.key.as_str()))
        .map(|tag| tag.key.clone())
        .collect();
    let to_apply: Vec<Tag> = desired
        .iter()
        .filter(|tag| existing_values.get(tag.key.as_str()).copied() != Some(tag.value.as_str()))
        .cloned()
        .collect();

    let mut changes = Vec::new();

    if !to_remove.is_empty() {
        changes.push(
            ProposedChange::new(ChangeType::Detach, "tags")
                .with_summary(json!({ "tag_keys": to_remove })),
        );
        if ctx.execute() {
            log::info!("stale tags discovered on {arn}, removing {to_remove:?}");
            backend.untag_policy(arn, &to_remove)?;
        } else {
            log::info!("stale tags discovered on {arn}: {to_remove:?}");
        }
    }

    if !to_apply.is_empty() {
        for tag in &to_apply {
            changes.push(
                ProposedChange::new(ChangeType::Attach, "tags")
                    .with_new(serde_json::to_value(tag)?),
            );
        }
        if ctx.execute() {
            log::info!("tags out of date on {arn}, applying {} tag(s)", to_apply.len());
            backend.tag_policy(arn, &to_apply)?;
        } else {
            log::info!("tags out of date on {arn}: {} tag(s)", to_apply.len());
        }
    }

    Ok(changes)
}

/// Reconcile one managed-policy template against the provider.
///
/// The full state machine: a missing policy is created (unless the template
/// is deleted), a deleted template's live policy is removed, and an
/// existing policy has its document and tags converged. The change list is
/// complete even when an apply-stage provider call fails; the failure is
/// carried in [`ReconcileOutcome::error`] and the remaining changes are
/// left unapplied.
pub fn reconcile_managed_policy(
    backend: &dyn IamBackend,
    arn: &str,
    template: &Template,
    delete_on_account: bool,
    ctx: &ExecutionContext,
) -> ReconcileOutcome {
    let TemplateProperties::AwsManagedPolicy(desired) = &template.properties else {
        return ReconcileOutcome::failed(Error::provider(format!(
            "template {} is not a managed policy",
            template.resource_name
        )));
    };
    let delete = delete_on_account || template.is_wholly_deleted();

    let existing = match fetch_managed_policy(backend, arn) {
        Ok(existing) => existing,
        Err(err) => return ReconcileOutcome::failed(err),
    };

    match (existing, delete) {
        (None, true) => ReconcileOutcome::default(),
        (None, false) => {
            let change = ProposedChange::new(ChangeType::Create, "managed_policy").with_new(json!({
                "policy_name": template.resource_name,
                "path": desired.path,
            }));
            let error = if ctx.execute() {
                log::info!("creating managed policy {} ({arn})", template.resource_name);
                backend
                    .create_policy(&CreatePolicyRequest {
                        policy_name: template.resource_name.clone(),
                        path: desired.path.clone(),
                        document: desired.policy_document.clone(),
                        description: desired.description.clone(),
                        tags: desired.tags.clone(),
                    })
                    .err()
            } else {
                None
            };
            ReconcileOutcome {
                changes: vec![change],
                error,
            }
        }
        (Some(_), true) => {
            let change = ProposedChange::new(ChangeType::Delete, "managed_policy")
                .with_current(json!({ "arn": arn }));
            let error = if ctx.execute() {
                log::info!("deleting managed policy {arn}");
                backend.delete_policy(arn).err()
            } else {
                None
            };
            ReconcileOutcome {
                changes: vec![change],
                error,
            }
        }
        (Some(existing), false) => converge_existing(backend, arn, desired, &existing, ctx),
    }
}

fn converge_existing(
    backend: &dyn IamBackend,
    arn: &str,
    desired: &ManagedPolicyProperties,
    existing: &ManagedPolicy,
    ctx: &ExecutionContext,
) -> ReconcileOutcome {
    let existing_doc = existing.document.clone().unwrap_or_default();
    let existing_tags = match list_policy_tags(backend, arn) {
        Ok(tags) => tags,
        Err(err) => return ReconcileOutcome::failed(err),
    };

    // Plan first so the reported change list is complete even when an
    // apply-stage call fails partway through.
    let plan_ctx = ExecutionContext::plan().with_jobs(ctx.jobs);
    let planned: Result<Vec<ProposedChange>> = (|| {
        let mut changes =
            update_policy_document(backend, arn, &desired.policy_document, &existing_doc, &plan_ctx)?;
        changes.extend(apply_policy_tags(
            backend,
            arn,
            &desired.tags,
            &existing_tags,
            &plan_ctx,
        )?);
        Ok(changes)
    })();
    let changes = match planned {
        Ok(changes) => changes,
        Err(err) => return ReconcileOutcome::failed(err),
    };

    let mut error = None;
    if ctx.execute() && !changes.is_empty() {
        error = update_policy_document(backend, arn, &desired.policy_document, &existing_doc, ctx)
            .and_then(|_| apply_policy_tags(backend, arn, &desired.tags, &existing_tags, ctx))
            .err();
        if let Some(err) = &error {
            log::warn!("apply halted for {arn}: {err}; remaining proposed changes left unapplied");
        }
    }

    ReconcileOutcome { changes, error }
}
