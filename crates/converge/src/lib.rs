//! # Converge
//!
//! A toolkit for convergence engines: declare desired state, compare it
//! against observed state, and describe the changes that close the gap.
//!
//! ## Core Concepts
//!
//! - **DiffSummary**: a structural diff between two JSON-like values,
//!   computed order-insensitively (lists compare as multisets)
//! - **ProposedChange**: one intended mutation, recorded whether or not it
//!   is ever executed
//! - **ExecutionContext**: the read-only/execute gate passed by parameter to
//!   every reconciliation entry point
//! - **Bounded executor**: fan out a batch of independent calls with a fixed
//!   concurrency ceiling, keeping results index-aligned with inputs
//!
//! ## Example
//!
//! ```
//! use converge::{diff_values, ChangeType, ExecutionContext, ProposedChange};
//! use serde_json::json;
//!
//! let existing = json!({"Version": "2012-10-17", "Statement": []});
//! let desired = json!({"Version": "2012-10-17", "Statement": [{"Effect": "Allow"}]});
//!
//! let ctx = ExecutionContext::plan();
//! if let Some(drift) = diff_values(&existing, &desired) {
//!     let change = ProposedChange::new(ChangeType::Update, "policy_document")
//!         .with_summary(serde_json::to_value(&drift).unwrap());
//!     assert_eq!(change.change_type, ChangeType::Update);
//!     assert!(ctx.read_only);
//! }
//! ```
//!
//! The crate deliberately has no opinion about where observed state comes
//! from or how changes are applied; callers bring their own provider
//! clients and thread an [`ExecutionContext`] through them.

pub mod context;
pub mod diff;
pub mod executor;
pub mod types;

// Re-export main types at crate root
pub use context::ExecutionContext;
pub use diff::{diff_values, values_equivalent, DiffEntry, DiffSummary, ValueChange};
pub use executor::{map_bounded, map_bounded_settled, try_map_bounded};
pub use types::{ChangeType, ProposedChange};
