//! Deletion inference
//!
//! A resource can leave an account's scope without anyone writing
//! `deleted: true`: the wildcard gets replaced by an explicit list, an
//! entry disappears from `included_accounts`, or an account shows up in
//! `excluded_accounts`. This module compares a template's committed history
//! against its working-tree content and rewrites the template so every such
//! removal becomes an explicit per-account deletion marker the apply step
//! can act on.
//!
//! Precedence per account, evaluated in order:
//! 1. implicit removal from a wildcard scope,
//! 2. explicit removal from an enumerated list,
//! 3. newly excluded (previously included → deleted; already excluded →
//!    merely excluded; never seen → merely excluded).
//!
//! Getting this wrong either deletes a live resource from an account that
//! should keep it, or leaves a resource behind on an account that lost
//! access. Each branch is unit-tested independently below, plus their
//! interaction.

use crate::config::Account;
use crate::error::{Error, Result};
use crate::git::GitDiff;
use crate::scope::{self, WILDCARD};
use crate::template::{registry, Deleted, Template};
use std::fs;

/// Parse wholly deleted templates out of removed files.
///
/// Files whose template was already wholly deleted are skipped; the rest
/// are returned marked deleted.
pub fn templates_for_deleted_files(deleted_files: &[GitDiff]) -> Vec<Template> {
    let mut templates = Vec::new();
    for git_diff in deleted_files {
        let Some(content) = &git_diff.content else {
            continue;
        };
        let mut template = match registry::parse_template(&git_diff.path, content) {
            Ok(template) => template,
            Err(err) => {
                log::warn!("skipping deleted file {}: {err}", git_diff.path.display());
                continue;
            }
        };
        if template.is_wholly_deleted() {
            continue;
        }
        template.mark_wholly_deleted();
        log::info!("template marked as deleted: {}", git_diff.path.display());
        templates.push(template);
    }
    templates
}

/// Rewrite modified templates so per-account removals become explicit.
///
/// Each [`GitDiff`] carries the committed content; the post-change content
/// is read from the working tree at its path. A file that fails to parse is
/// skipped with a warning and does not affect the others.
pub fn templates_for_modified_files(
    accounts: &[Account],
    modified_files: &[GitDiff],
) -> Vec<Template> {
    let mut templates = Vec::new();
    for git_diff in modified_files {
        match infer_one(accounts, git_diff) {
            Ok(template) => templates.push(template),
            Err(err) => {
                log::warn!("skipping modified file {}: {err}", git_diff.path.display());
            }
        }
    }
    templates
}

fn infer_one(accounts: &[Account], git_diff: &GitDiff) -> Result<Template> {
    let Some(old_content) = &git_diff.content else {
        return Err(Error::parse(
            &git_diff.path,
            "modified diff carries no prior content",
        ));
    };
    let main_template = registry::parse_template(&git_diff.path, old_content)?;

    let new_content = fs::read_to_string(&git_diff.path)?;
    let mut template = registry::parse_template(&git_diff.path, &new_content)?;

    // Accounts included in the current commit survive any deletion this
    // pass synthesizes.
    let survivors = template.included_accounts.clone();
    let new_excluded = template.excluded_accounts.clone();
    let mut marked: Vec<String> = Vec::new();

    if !has_wildcard(&survivors) {
        if has_wildcard(&main_template.included_accounts) {
            // The old scope was "*": every roster account the new scope
            // lists no longer match was implicitly removed.
            for account in accounts {
                let pattern = scope::account_pattern(account);
                if scope::pattern_in_list(&pattern, &survivors)
                    || scope::pattern_in_list(&pattern, &new_excluded)
                {
                    log::debug!(
                        "resource on account not marked for deletion: {pattern} ({})",
                        git_diff.path.display()
                    );
                    continue;
                }
                log::info!(
                    "marking resource for deletion on account {pattern}, \
                     implicitly removed from included_accounts ({})",
                    git_diff.path.display()
                );
                mark(&mut marked, &mut template, pattern);
            }
        } else {
            // The old scope was explicit: entries that vanished from the
            // list were removed outright.
            for pattern in &main_template.included_accounts {
                if scope::pattern_in_list(pattern, &survivors) {
                    log::debug!(
                        "resource on account not marked for deletion: {pattern} ({})",
                        git_diff.path.display()
                    );
                    continue;
                }
                log::info!(
                    "marking resource for deletion on account {pattern}, \
                     explicitly removed from included_accounts ({})",
                    git_diff.path.display()
                );
                mark(&mut marked, &mut template, pattern.clone());
            }
        }
    }

    // Newly excluded accounts: previously included means deleted; already
    // excluded stays merely excluded; never seen is excluded going forward.
    let mut still_excluded = Vec::new();
    for pattern in new_excluded {
        if scope::pattern_in_list(&pattern, &main_template.excluded_accounts) {
            log::debug!(
                "resource already excluded on account: {pattern} ({})",
                git_diff.path.display()
            );
            still_excluded.push(pattern);
        } else if scope::pattern_in_list(&pattern, &main_template.included_accounts)
            || has_wildcard(&main_template.included_accounts)
        {
            log::info!(
                "marking resource for deletion on account {pattern}, \
                 added to excluded_accounts ({})",
                git_diff.path.display()
            );
            mark(&mut marked, &mut template, pattern);
        } else {
            log::debug!(
                "newly excluded account: {pattern} ({})",
                git_diff.path.display()
            );
            still_excluded.push(pattern);
        }
    }
    template.excluded_accounts = still_excluded;

    if !marked.is_empty() && !template.is_wholly_deleted() {
        let deletion_survivors = survivors
            .iter()
            .filter(|pattern| *pattern != WILDCARD)
            .cloned()
            .collect();
        template.deleted.push(Deleted::new(marked, deletion_survivors));
    }

    Ok(template)
}

fn has_wildcard(patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| pattern == WILDCARD)
}

fn mark(marked: &mut Vec<String>, template: &mut Template, pattern: String) {
    if !template.included_accounts.contains(&pattern) {
        template.included_accounts.push(pattern.clone());
    }
    if !marked.contains(&pattern) {
        marked.push(pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn roster() -> Vec<Account> {
        vec![
            Account::new("111111111111", "dev"),
            Account::new("222222222222", "staging"),
            Account::new("333333333333", "prod"),
        ]
    }

    fn doc(included: &[&str], excluded: &[&str], deleted: Option<&str>) -> String {
        let mut out = String::from(
            "template_type: aws:iam:managed_policy\nresource_name: engineering\n",
        );
        out.push_str("included_accounts:\n");
        for entry in included {
            out.push_str(&format!("  - \"{entry}\"\n"));
        }
        if !excluded.is_empty() {
            out.push_str("excluded_accounts:\n");
            for entry in excluded {
                out.push_str(&format!("  - \"{entry}\"\n"));
            }
        }
        if let Some(deleted) = deleted {
            out.push_str(deleted);
        }
        out.push_str("policy_document:\n  Version: \"2012-10-17\"\n");
        out
    }

    /// Write the new content to a temp file and build the modified-file diff
    /// carrying the old content.
    fn modified(dir: &tempfile::TempDir, old: &str, new: &str) -> GitDiff {
        let path = dir.path().join("engineering.yaml");
        fs::write(&path, new).unwrap();
        GitDiff {
            path,
            content: Some(old.to_string()),
            is_deleted: false,
        }
    }

    #[test]
    fn test_implicit_removal_from_wildcard_scope() {
        init_logs();
        let dir = tempfile::tempdir().unwrap();
        let diff = modified(
            &dir,
            &doc(&["*"], &[], None),
            &doc(&["dev", "staging"], &[], None),
        );

        let templates = templates_for_modified_files(&roster(), &[diff]);
        assert_eq!(templates.len(), 1);
        let template = &templates[0];

        // prod was implicitly removed: marked deleted and re-added so the
        // apply step still has a target.
        let prod_pattern = "(333333333333|prod)".to_string();
        assert!(template.included_accounts.contains(&prod_pattern));
        assert_eq!(template.deleted.records().len(), 1);
        assert_eq!(template.deleted.records()[0].included_accounts, vec![prod_pattern]);
        assert_eq!(
            template.deleted.records()[0].excluded_accounts,
            vec!["dev".to_string(), "staging".to_string()]
        );

        // dev and staging are untouched.
        assert!(template.included_accounts.contains(&"dev".to_string()));
        assert!(template.included_accounts.contains(&"staging".to_string()));
        assert!(template.excluded_accounts.is_empty());
    }

    #[test]
    fn test_explicit_removal_from_enumerated_list() {
        let dir = tempfile::tempdir().unwrap();
        let diff = modified(
            &dir,
            &doc(&["prod", "staging", "dev"], &[], None),
            &doc(&["staging", "dev"], &[], None),
        );

        let templates = templates_for_modified_files(&roster(), &[diff]);
        let template = &templates[0];

        assert_eq!(template.deleted.records().len(), 1);
        assert_eq!(
            template.deleted.records()[0].included_accounts,
            vec!["prod".to_string()]
        );
        assert!(template.included_accounts.contains(&"prod".to_string()));
        assert_eq!(
            template.deleted.records()[0].excluded_accounts,
            vec!["staging".to_string(), "dev".to_string()]
        );
    }

    #[test]
    fn test_newly_excluded_previously_wildcard_included() {
        let dir = tempfile::tempdir().unwrap();
        let diff = modified(
            &dir,
            &doc(&["*"], &[], None),
            &doc(&["*"], &["prod"], None),
        );

        let templates = templates_for_modified_files(&roster(), &[diff]);
        let template = &templates[0];

        // prod moves from excluded to deletion-marked.
        assert_eq!(template.deleted.records().len(), 1);
        assert_eq!(
            template.deleted.records()[0].included_accounts,
            vec!["prod".to_string()]
        );
        assert!(template.included_accounts.contains(&"prod".to_string()));
        assert!(template.excluded_accounts.is_empty());
    }

    #[test]
    fn test_already_excluded_stays_merely_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let diff = modified(
            &dir,
            &doc(&["*"], &["prod"], None),
            &doc(&["*"], &["prod"], None),
        );

        let templates = templates_for_modified_files(&roster(), &[diff]);
        let template = &templates[0];

        assert!(template.deleted.records().is_empty());
        assert!(!template.is_wholly_deleted());
        assert_eq!(template.excluded_accounts, vec!["prod".to_string()]);
    }

    #[test]
    fn test_never_seen_account_is_merely_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let diff = modified(
            &dir,
            &doc(&["dev"], &[], None),
            &doc(&["dev"], &["sandbox"], None),
        );

        let templates = templates_for_modified_files(&roster(), &[diff]);
        let template = &templates[0];

        assert!(template.deleted.records().is_empty());
        assert_eq!(template.excluded_accounts, vec!["sandbox".to_string()]);
        assert_eq!(template.included_accounts, vec!["dev".to_string()]);
    }

    #[test]
    fn test_excluded_and_no_longer_included_marks_once() {
        init_logs();
        let dir = tempfile::tempdir().unwrap();
        let diff = modified(
            &dir,
            &doc(&["prod", "dev"], &[], None),
            &doc(&["dev"], &["prod"], None),
        );

        let templates = templates_for_modified_files(&roster(), &[diff]);
        let template = &templates[0];

        let record = &template.deleted.records()[0];
        assert_eq!(record.included_accounts, vec!["prod".to_string()]);
        assert_eq!(
            template
                .included_accounts
                .iter()
                .filter(|p| *p == "prod")
                .count(),
            1
        );
        assert!(template.excluded_accounts.is_empty());
    }

    #[test]
    fn test_wildcard_to_explicit_with_new_exclusion() {
        let dir = tempfile::tempdir().unwrap();
        // prod leaves the included list and shows up excluded; step 1 must
        // leave it to step 3, which marks it exactly once.
        let diff = modified(
            &dir,
            &doc(&["*"], &[], None),
            &doc(&["dev", "staging"], &["prod"], None),
        );

        let templates = templates_for_modified_files(&roster(), &[diff]);
        let template = &templates[0];

        let record = &template.deleted.records()[0];
        assert_eq!(record.included_accounts, vec!["prod".to_string()]);
        assert!(template.excluded_accounts.is_empty());
    }

    #[test]
    fn test_deletion_records_append_never_replace() {
        let dir = tempfile::tempdir().unwrap();
        let prior = "deleted:\n  - deleted: true\n    included_accounts:\n      - \"old-account\"\n";
        let diff = modified(
            &dir,
            &doc(&["prod", "dev"], &[], Some(prior)),
            &doc(&["dev"], &[], Some(prior)),
        );

        let templates = templates_for_modified_files(&roster(), &[diff]);
        let template = &templates[0];

        assert_eq!(template.deleted.records().len(), 2);
        assert_eq!(
            template.deleted.records()[0].included_accounts,
            vec!["old-account".to_string()]
        );
        assert_eq!(
            template.deleted.records()[1].included_accounts,
            vec!["prod".to_string()]
        );
    }

    #[test]
    fn test_wholly_deleted_template_gets_no_record() {
        let dir = tempfile::tempdir().unwrap();
        let diff = modified(
            &dir,
            &doc(&["prod", "dev"], &[], None),
            &doc(&["dev"], &[], Some("deleted: true\n")),
        );

        let templates = templates_for_modified_files(&roster(), &[diff]);
        let template = &templates[0];

        assert!(template.is_wholly_deleted());
        assert!(template.deleted.records().is_empty());
    }

    #[test]
    fn test_wildcard_still_present_means_no_removals() {
        let dir = tempfile::tempdir().unwrap();
        let diff = modified(
            &dir,
            &doc(&["*"], &[], None),
            &doc(&["*"], &[], None),
        );

        let templates = templates_for_modified_files(&roster(), &[diff]);
        let template = &templates[0];

        assert!(template.deleted.records().is_empty());
        assert_eq!(template.included_accounts, vec!["*".to_string()]);
    }

    #[test]
    fn test_unparseable_file_skipped_with_others_processed() {
        let dir = tempfile::tempdir().unwrap();
        let good = modified(
            &dir,
            &doc(&["prod", "dev"], &[], None),
            &doc(&["dev"], &[], None),
        );
        let missing = GitDiff {
            path: dir.path().join("does-not-exist.yaml"),
            content: Some(doc(&["*"], &[], None)),
            is_deleted: false,
        };

        let templates = templates_for_modified_files(&roster(), &[missing, good]);
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].deleted.records().len(), 1);
    }

    #[test]
    fn test_deleted_files_marked_wholly_deleted() {
        let live = GitDiff {
            path: PathBuf::from("live.yaml"),
            content: Some(doc(&["dev"], &[], None)),
            is_deleted: true,
        };
        let already = GitDiff {
            path: PathBuf::from("already.yaml"),
            content: Some(doc(&["dev"], &[], Some("deleted: true\n"))),
            is_deleted: true,
        };

        let templates = templates_for_deleted_files(&[live, already]);
        assert_eq!(templates.len(), 1);
        assert!(templates[0].is_wholly_deleted());
        assert!(templates[0].file_path.ends_with("live.yaml"));
    }
}
