//! Account scope resolution
//!
//! A template's `included_accounts` and `excluded_accounts` entries are
//! match-patterns: regular expressions tested against account ids and
//! names, with `"*"` standing for every account. Literal identifiers that
//! happen to contain regex metacharacters must be escaped by the caller.
//!
//! Everything here is pure and deterministic; no I/O, safe to call from
//! concurrent reconciliation tasks without synchronization.

use crate::config::Account;
use regex::Regex;

/// The pattern that matches every account
pub const WILDCARD: &str = "*";

/// Build the match-pattern for a roster account: `(id|name)`
pub fn account_pattern(account: &Account) -> String {
    format!("({}|{})", account.account_id, account.account_name)
}

/// Test a match-pattern against arbitrary text.
///
/// A pattern that does not compile as a regex is compared for exact
/// equality instead of failing the pass.
pub fn pattern_matches(pattern: &str, text: &str) -> bool {
    if pattern == WILDCARD {
        return true;
    }
    match Regex::new(pattern) {
        Ok(re) => re.is_match(text),
        Err(err) => {
            log::debug!("pattern {pattern:?} is not a valid regex ({err}), comparing literally");
            pattern == text
        }
    }
}

/// Test a match-pattern against one account's id and name
pub fn pattern_matches_account(pattern: &str, account: &Account) -> bool {
    pattern == WILDCARD
        || pattern_matches(pattern, &account.account_id)
        || pattern_matches(pattern, &account.account_name)
}

/// Test a match-pattern against a list of scope entries
pub fn pattern_in_list(pattern: &str, entries: &[String]) -> bool {
    entries.iter().any(|entry| pattern_matches(pattern, entry))
}

/// Decide whether an account is in a template's scope.
///
/// An explicit `excluded_accounts` entry always wins, including over a
/// wildcard `included_accounts` entry for the same account.
pub fn is_account_in_scope(included: &[String], excluded: &[String], account: &Account) -> bool {
    if excluded
        .iter()
        .any(|pattern| pattern_matches_account(pattern, account))
    {
        return false;
    }
    included
        .iter()
        .any(|pattern| pattern_matches_account(pattern, account))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Account> {
        vec![
            Account::new("123456789012", "prod"),
            Account::new("210987654321", "staging"),
            Account::new("333333333333", "dev"),
        ]
    }

    #[test]
    fn test_wildcard_matches_everything() {
        for account in &roster() {
            assert!(pattern_matches_account(WILDCARD, account));
        }
    }

    #[test]
    fn test_pattern_matches_id_or_name() {
        let prod = &roster()[0];
        assert!(pattern_matches_account("prod", prod));
        assert!(pattern_matches_account("123456789012", prod));
        assert!(pattern_matches_account("(123456789012|prod)", prod));
        assert!(!pattern_matches_account("dev", prod));
    }

    #[test]
    fn test_patterns_are_regexes() {
        let staging = &roster()[1];
        assert!(pattern_matches_account("stag.*", staging));
        assert!(pattern_matches_account("^21.*", staging));
        assert!(!pattern_matches_account("^prod$", staging));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_equality() {
        let account = Account::new("999999999999", "prod(east");
        assert!(pattern_matches_account("prod(east", &account));
        assert!(!pattern_matches_account("prod(west", &account));
    }

    #[test]
    fn test_excluded_wins_over_wildcard() {
        let included = vec![WILDCARD.to_string()];
        let excluded = vec!["prod".to_string()];

        assert!(!is_account_in_scope(&included, &excluded, &roster()[0]));
        assert!(is_account_in_scope(&included, &excluded, &roster()[2]));
    }

    #[test]
    fn test_explicit_scope_membership() {
        let included = vec!["dev".to_string(), "staging".to_string()];
        let excluded = Vec::new();

        assert!(is_account_in_scope(&included, &excluded, &roster()[2]));
        assert!(!is_account_in_scope(&included, &excluded, &roster()[0]));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let included = vec![WILDCARD.to_string()];
        let excluded = vec!["staging".to_string()];
        let account = &roster()[1];

        let first = is_account_in_scope(&included, &excluded, account);
        let second = is_account_in_scope(&included, &excluded, account);
        assert_eq!(first, second);
        assert!(!first);
    }

    #[test]
    fn test_pattern_in_list() {
        let entries = vec!["dev".to_string(), "staging".to_string()];
        assert!(pattern_in_list("(333333333333|dev)", &entries));
        assert!(!pattern_in_list("(123456789012|prod)", &entries));
    }
}
