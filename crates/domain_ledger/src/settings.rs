//! Ledger configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `LEDGER_` (nested keys separated by
//! `__`). A `.env` file is loaded first when present.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use core_kernel::{CoreError, Timezone};
use crate::account::{AccountSpec, StandardChart};
use crate::concept::{standard_definitions, ConceptDefinition, ConceptRegistry};

/// Ledger settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Timezone that defines the business day
    pub timezone: Timezone,
    /// Currency label shown with amounts
    pub currency: String,
    /// Chart of accounts for new closures
    pub accounts: Vec<AccountSpec>,
    /// Concept registry definitions
    pub concepts: Vec<ConceptDefinition>,
    /// Concepts whose payments are checked against the invoicing system
    pub reconciled_concepts: Vec<String>,
    /// Upper bound on a reconciliation lookup
    pub reconciliation_timeout_ms: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            timezone: Timezone::default(),
            currency: "UYU".to_string(),
            accounts: StandardChart::accounts(),
            concepts: standard_definitions(),
            reconciled_concepts: vec!["(-) Supplier payments".to_string()],
            reconciliation_timeout_ms: 5_000,
        }
    }
}

impl LedgerSettings {
    /// Loads settings from the environment and an optional file
    ///
    /// # Arguments
    ///
    /// * `path` - TOML file to layer over the defaults; ignored if missing
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Configuration` if a source cannot be parsed or the
    /// resulting settings are invalid
    pub fn load(path: Option<&Path>) -> Result<Self, CoreError> {
        // A missing .env file is not an error
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("timezone", defaults.timezone.name())
            .map_err(config_error)?
            .set_default("currency", defaults.currency.clone())
            .map_err(config_error)?
            .set_default("reconciliation_timeout_ms", defaults.reconciliation_timeout_ms)
            .map_err(config_error)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings: Self = builder
            .add_source(
                config::Environment::with_prefix("LEDGER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;

        settings.validate()?;
        Ok(settings)
    }

    /// Checks the chart of accounts and the concept registry
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.accounts.is_empty() {
            return Err(CoreError::configuration("the chart of accounts is empty"));
        }

        let mut ids = HashSet::new();
        for account in &self.accounts {
            if account.id.is_blank() {
                return Err(CoreError::configuration("an account has an empty id"));
            }
            if !ids.insert(&account.id) {
                return Err(CoreError::configuration(format!("account '{}' is defined twice", account.id)));
            }
        }

        self.registry()?;
        Ok(())
    }

    /// Builds the concept registry described by these settings
    pub fn registry(&self) -> Result<ConceptRegistry, CoreError> {
        ConceptRegistry::new(self.concepts.clone()).map_err(|e| CoreError::configuration(e.to_string()))
    }
}

fn config_error(error: config::ConfigError) -> CoreError {
    CoreError::configuration(error.to_string())
}
