//! # idsync
//!
//! Identity-as-code reconciliation engine.
//!
//! idsync keeps declarative identity templates (AWS IAM roles and managed
//! policies, Okta groups, Google groups) synchronized with live cloud
//! state, mediating change through git history. The engine is three
//! composed stages:
//!
//! - **Git change classification** ([`git`]): diff the current branch
//!   against a baseline ref and narrow the result to recognized template
//!   files, normalizing renames along the way
//! - **Deletion inference** ([`inference`]): compare each modified
//!   template's committed scope against its working-tree scope and rewrite
//!   the template so every implicit per-account removal becomes an explicit
//!   deletion marker
//! - **Drift reconciliation** ([`aws`]): diff desired documents and tags
//!   against the live provider object and converge, honoring the provider's
//!   version retention ceiling and the read-only gate
//!
//! ## Example
//!
//! ```no_run
//! use converge::ExecutionContext;
//! use idsync::config::Config;
//! use idsync::repo::GitCli;
//! use idsync::{classify_changes, templates_for_modified_files};
//! use std::path::Path;
//!
//! # fn main() -> idsync::Result<()> {
//! let config = Config::load(Path::new("config.yaml"))?;
//! let repo = GitCli::open("/checkouts/identity")?;
//!
//! // What changed on this branch?
//! let changes = classify_changes(&repo, "origin/main")?;
//!
//! // Make implicit per-account removals explicit.
//! let rewritten = templates_for_modified_files(&config.accounts, &changes.modified_files);
//! for template in &rewritten {
//!     template.write_back()?;
//! }
//!
//! // Reconciliation runs per resource/account with an ExecutionContext;
//! // ExecutionContext::plan() reports changes without applying them.
//! let _ctx = ExecutionContext::plan();
//! # Ok(())
//! # }
//! ```
//!
//! ## Scope resolution
//!
//! Templates carry `included_accounts`/`excluded_accounts` match-patterns,
//! resolved against the configured account roster by [`scope`]. Patterns
//! are regular expressions; `"*"` matches every account, and explicit
//! exclusions always win over a wildcard inclusion.
//!
//! The orchestration layer (CLI, webhooks, provisioning) lives outside
//! this crate: it supplies a [`repo::Repository`], a
//! [`config::Config`], and provider backends, and consumes the
//! [`converge::ProposedChange`] records the engine returns.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aws;
pub mod config;
pub mod error;
pub mod git;
pub mod inference;
pub mod repo;
pub mod scope;
pub mod template;

pub use config::{Account, Config};
pub use error::{Error, Result};
pub use git::{classify_changes, ChangedFiles, GitDiff};
pub use inference::{templates_for_deleted_files, templates_for_modified_files};
pub use template::{Deleted, DeletedState, Template, TemplateProperties};
