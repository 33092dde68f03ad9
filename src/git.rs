//! Git change classification
//!
//! Narrows a branch diff down to the template files the engine cares about
//! and normalizes renames: a pure rename is dropped, a rename that changes
//! the resource identity becomes a delete plus a create. A file that fails
//! to parse is skipped with a warning; classification is read-only, so one
//! bad file never aborts the run.

use crate::error::Result;
use crate::repo::{ChangeKind, FileChange, Repository};
use crate::template::registry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Serialization format extension of template files
pub const TEMPLATE_EXTENSION: &str = "yaml";

/// One file's before/after state relevant to one change classification.
///
/// Ephemeral: constructed here, consumed by the deletion inference engine,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitDiff {
    /// Absolute path of the file in the working tree
    pub path: PathBuf,
    /// Baseline content; `None` for newly added files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Whether the file is gone from the branch
    #[serde(default)]
    pub is_deleted: bool,
}

/// Categorized template-file changes between a baseline ref and the branch tip
#[derive(Debug, Clone, Default)]
pub struct ChangedFiles {
    /// Files added on the branch
    pub new_files: Vec<GitDiff>,
    /// Files removed on the branch (old content attached)
    pub deleted_files: Vec<GitDiff>,
    /// Files changed on the branch (old content attached)
    pub modified_files: Vec<GitDiff>,
}

impl ChangedFiles {
    /// Total number of classified changes
    pub fn total(&self) -> usize {
        self.new_files.len() + self.deleted_files.len() + self.modified_files.len()
    }
}

/// Classify the template-file changes between `base_ref` and the branch tip
pub fn classify_changes(repo: &dyn Repository, base_ref: &str) -> Result<ChangedFiles> {
    let mut files = ChangedFiles::default();

    for change in repo.diff(base_ref)? {
        match change.kind {
            ChangeKind::Added => classify_added(repo, &change, &mut files),
            ChangeKind::Deleted => classify_deleted(repo, &change, &mut files),
            ChangeKind::Modified => classify_modified(repo, change, &mut files),
        }
    }

    log::debug!(
        "classified {} template change(s) against {base_ref}",
        files.total()
    );
    Ok(files)
}

fn classify_added(repo: &dyn Repository, change: &FileChange, files: &mut ChangedFiles) {
    if !has_template_extension(&change.path) {
        return;
    }
    let path = repo.root().join(&change.path);
    if worktree_has_marker(&path) {
        files.new_files.push(GitDiff {
            path,
            content: None,
            is_deleted: false,
        });
    }
}

fn classify_deleted(repo: &dyn Repository, change: &FileChange, files: &mut ChangedFiles) {
    if !has_template_extension(&change.old_path) {
        return;
    }
    // A file that was never a recognized template is irrelevant once gone.
    let Some(content) = &change.old_content else {
        return;
    };
    if registry::contains_template_marker(content) {
        files.deleted_files.push(GitDiff {
            path: repo.root().join(&change.old_path),
            content: Some(content.clone()),
            is_deleted: true,
        });
    }
}

fn classify_modified(repo: &dyn Repository, change: FileChange, files: &mut ChangedFiles) {
    if !has_template_extension(&change.path) {
        return;
    }
    let path = repo.root().join(&change.path);
    if !worktree_has_marker(&path) {
        return;
    }
    let Some(old_content) = change.old_content else {
        return;
    };

    if change.old_path != change.path && registry::contains_template_marker(&old_content) {
        let new_content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("skipping {}: {err}", path.display());
                return;
            }
        };

        match rename_outcome(&old_content, &new_content, &path) {
            RenameOutcome::PureRename => return,
            RenameOutcome::IdentityChanged => {
                files.deleted_files.push(GitDiff {
                    path: repo.root().join(&change.old_path),
                    content: Some(old_content),
                    is_deleted: true,
                });
                files.new_files.push(GitDiff {
                    path,
                    content: None,
                    is_deleted: false,
                });
                return;
            }
            RenameOutcome::Unparseable => return,
            RenameOutcome::ContentChanged => {}
        }
    }

    files.modified_files.push(GitDiff {
        path,
        content: Some(old_content),
        is_deleted: false,
    });
}

enum RenameOutcome {
    /// Same semantic content, same identity: a no-op move
    PureRename,
    /// `resource_name` changed: delete the old resource, create the new one
    IdentityChanged,
    /// Content changed under the same identity
    ContentChanged,
    /// One side failed to parse; warned and skipped
    Unparseable,
}

fn rename_outcome(old_content: &str, new_content: &str, path: &Path) -> RenameOutcome {
    // Compare the raw documents order-insensitively before committing to a
    // typed parse; key order and list order do not make a rename a change.
    let old_value = parse_as_json(old_content);
    let new_value = parse_as_json(new_content);
    let (Some(old_value), Some(new_value)) = (old_value, new_value) else {
        log::warn!("skipping rename of {}: unparseable document", path.display());
        return RenameOutcome::Unparseable;
    };

    if converge::values_equivalent(&old_value, &new_value) {
        return RenameOutcome::PureRename;
    }

    let old_template = registry::parse_template(path, old_content);
    let new_template = registry::parse_template(path, new_content);
    match (old_template, new_template) {
        (Ok(old_template), Ok(new_template)) => {
            if old_template.resource_name == new_template.resource_name {
                RenameOutcome::ContentChanged
            } else {
                RenameOutcome::IdentityChanged
            }
        }
        (Err(err), _) | (_, Err(err)) => {
            log::warn!("skipping rename of {}: {err}", path.display());
            RenameOutcome::Unparseable
        }
    }
}

fn parse_as_json(content: &str) -> Option<serde_json::Value> {
    serde_yaml::from_str::<serde_json::Value>(content).ok()
}

fn has_template_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION)
}

fn worktree_has_marker(path: &Path) -> bool {
    match fs::read_to_string(path) {
        Ok(content) => registry::contains_template_marker(&content),
        Err(err) => {
            log::warn!("skipping {}: {err}", path.display());
            false
        }
    }
}
