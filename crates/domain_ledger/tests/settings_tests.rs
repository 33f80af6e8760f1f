//! Tests for layered ledger settings

use std::fs;
use std::path::PathBuf;

use core_kernel::{CoreError, TransactionId};
use domain_ledger::{LedgerSettings, Polarity};

fn write_settings(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("ledger-settings-{}.toml", TransactionId::new()));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_missing_file_gives_defaults() {
    let path = std::env::temp_dir().join("ledger-settings-does-not-exist.toml");
    let settings = LedgerSettings::load(Some(&path)).unwrap();
    assert_eq!(settings, LedgerSettings::default());
}

#[test]
fn test_file_overrides_defaults() {
    let path = write_settings(
        r#"
timezone = "America/Argentina/Buenos_Aires"
currency = "ARS"
reconciliation_timeout_ms = 1500
reconciled_concepts = ["(-) Rent"]

[[accounts]]
id = "till"
name = "Till"
type = "cash"

[[accounts]]
id = "bank"
name = "Bank"
type = "bank"

[[concepts]]
id = "rent"
name = "(-) Rent"
polarity = "expense"

[[concepts.states]]
id = "pending-payment"
name = "Pending Payment"

[[concepts.states]]
id = "completed"
name = "Completed"
"#,
    );

    let settings = LedgerSettings::load(Some(&path)).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(settings.timezone.name(), "America/Argentina/Buenos_Aires");
    assert_eq!(settings.currency, "ARS");
    assert_eq!(settings.reconciliation_timeout_ms, 1500);
    assert_eq!(settings.accounts.len(), 2);
    assert_eq!(settings.accounts[0].id.as_str(), "till");

    let registry = settings.registry().unwrap();
    let rent = registry.find("(-) Rent").unwrap();
    assert_eq!(rent.polarity(), Polarity::Expense);
    assert_eq!(rent.initial_state().name, "Pending Payment");
    assert_eq!(registry.completed_state(), "Completed");
}

#[test]
fn test_invalid_file_rejected() {
    let path = write_settings(
        r#"
[[accounts]]
id = "till"
name = "Till"
type = "cash"

[[accounts]]
id = "till"
name = "Second till"
type = "cash"
"#,
    );

    let result = LedgerSettings::load(Some(&path));
    fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(CoreError::Configuration(_))));
}

#[test]
fn test_unknown_timezone_rejected() {
    let path = write_settings("timezone = \"Mars/Olympus\"\n");
    let result = LedgerSettings::load(Some(&path));
    fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(CoreError::Configuration(_))));
}
