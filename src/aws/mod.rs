//! AWS IAM provider integration
//!
//! The engine never embeds transport logic: every provider interaction
//! goes through the [`backend::IamBackend`] trait, and the reconcilers in
//! [`policy`] consume that trait plus a [`converge::ExecutionContext`].

pub mod backend;
pub mod policy;

pub use backend::{
    CreatePolicyRequest, IamBackend, ListScope, ManagedPolicy, Page, PolicyListFilter,
    PolicySummary, PolicyVersion,
};
pub use policy::{
    apply_policy_tags, fetch_managed_policy, list_managed_policies, reconcile_managed_policy,
    update_policy_document, ReconcileOutcome, MAX_POLICY_VERSIONS,
};
