//! Organization configuration - the account roster
//!
//! The roster is supplied by the orchestration layer and read-only to the
//! engine; scope patterns are tested against its entries.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One known cloud account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Provider-assigned account identifier
    pub account_id: String,
    /// Human-assigned account name
    pub account_name: String,
}

impl Account {
    /// Create an account entry
    pub fn new(account_id: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            account_name: account_name.into(),
        }
    }
}

/// Engine configuration: the set of accounts templates are resolved against
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Known accounts, in declaration order
    #[serde(default)]
    pub accounts: Vec<Account>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        log::debug!(
            "loaded config from {} ({} accounts)",
            path.display(),
            config.accounts.len()
        );
        Ok(config)
    }

    /// Find an account by id or name
    pub fn find_account(&self, key: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|a| a.account_id == key || a.account_name == key)
    }
}
