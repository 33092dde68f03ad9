//! Repository access
//!
//! The engine only needs diff-by-path semantics between a baseline ref and
//! the current branch tip; the git backend stays external behind the
//! [`Repository`] trait. [`GitCli`] adapts the system `git` binary for
//! callers that do not bring their own implementation.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Tree-level classification of one changed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File exists on the branch but not at the baseline
    Added,
    /// File existed at the baseline but not on the branch
    Deleted,
    /// File exists on both sides with different content (renames included)
    Modified,
}

/// One file's change between the baseline ref and the branch tip
#[derive(Debug, Clone)]
pub struct FileChange {
    /// What happened to the file
    pub kind: ChangeKind,
    /// Repo-relative path on the current branch
    pub path: PathBuf,
    /// Repo-relative path at the baseline; differs from `path` on renames
    pub old_path: PathBuf,
    /// Content at the baseline ref; `None` for added files
    pub old_content: Option<String>,
}

/// Diff-by-path access to a repository checkout
pub trait Repository: Send + Sync {
    /// Absolute path of the working tree root
    fn root(&self) -> &Path;

    /// Tree-level changes from `base_ref` to the current branch tip
    fn diff(&self, base_ref: &str) -> Result<Vec<FileChange>>;
}

/// Repository access through the system `git` binary
#[derive(Debug)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    /// Open a checkout rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(".git").exists() {
            return Err(Error::git(format!(
                "{} is not a git repository",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .map_err(|err| Error::git(format!("failed to execute git: {err}")))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(Error::git(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }

    fn show(&self, ref_name: &str, path: &Path) -> Result<String> {
        self.git(&["show", &format!("{ref_name}:{}", path.display())])
    }
}

impl Repository for GitCli {
    fn root(&self) -> &Path {
        &self.root
    }

    fn diff(&self, base_ref: &str) -> Result<Vec<FileChange>> {
        let raw = self.git(&["diff", "--name-status", "-M", base_ref, "HEAD"])?;

        let mut changes = Vec::new();
        for parsed in parse_name_status(&raw) {
            let old_content = match parsed.kind {
                ChangeKind::Added => None,
                ChangeKind::Deleted | ChangeKind::Modified => {
                    Some(self.show(base_ref, &parsed.old_path)?)
                }
            };
            changes.push(FileChange {
                kind: parsed.kind,
                path: parsed.path,
                old_path: parsed.old_path,
                old_content,
            });
        }
        Ok(changes)
    }
}

struct ParsedChange {
    kind: ChangeKind,
    path: PathBuf,
    old_path: PathBuf,
}

/// Parse `git diff --name-status -M` output.
///
/// Unhandled statuses (copies, mode/type changes) are skipped; they carry
/// no template semantics.
fn parse_name_status(raw: &str) -> Vec<ParsedChange> {
    let mut parsed = Vec::new();
    for line in raw.lines() {
        let mut fields = line.split('\t');
        let Some(status) = fields.next() else {
            continue;
        };
        match (status.chars().next(), fields.next(), fields.next()) {
            (Some('A'), Some(path), None) => parsed.push(ParsedChange {
                kind: ChangeKind::Added,
                path: PathBuf::from(path),
                old_path: PathBuf::from(path),
            }),
            (Some('D'), Some(path), None) => parsed.push(ParsedChange {
                kind: ChangeKind::Deleted,
                path: PathBuf::from(path),
                old_path: PathBuf::from(path),
            }),
            (Some('M'), Some(path), None) => parsed.push(ParsedChange {
                kind: ChangeKind::Modified,
                path: PathBuf::from(path),
                old_path: PathBuf::from(path),
            }),
            (Some('R'), Some(old_path), Some(path)) => parsed.push(ParsedChange {
                kind: ChangeKind::Modified,
                path: PathBuf::from(path),
                old_path: PathBuf::from(old_path),
            }),
            _ => log::debug!("ignoring unhandled diff entry: {line}"),
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_status() {
        let raw = "A\tpolicies/new.yaml\n\
                   D\tpolicies/gone.yaml\n\
                   M\tpolicies/edited.yaml\n\
                   R100\tpolicies/old.yaml\tpolicies/renamed.yaml\n";

        let parsed = parse_name_status(raw);
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0].kind, ChangeKind::Added);
        assert_eq!(parsed[0].path, PathBuf::from("policies/new.yaml"));

        assert_eq!(parsed[1].kind, ChangeKind::Deleted);
        assert_eq!(parsed[2].kind, ChangeKind::Modified);

        assert_eq!(parsed[3].kind, ChangeKind::Modified);
        assert_eq!(parsed[3].old_path, PathBuf::from("policies/old.yaml"));
        assert_eq!(parsed[3].path, PathBuf::from("policies/renamed.yaml"));
    }

    #[test]
    fn test_parse_skips_unhandled_statuses() {
        let raw = "C75\ta.yaml\tb.yaml\nT\tweird.yaml\n";
        assert!(parse_name_status(raw).is_empty());
    }

    #[test]
    fn test_open_rejects_plain_directories() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitCli::open(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Git { .. }));
    }
}
