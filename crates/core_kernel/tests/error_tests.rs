//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::temporal::{parse_date, TemporalError, Timezone};

#[test]
fn test_core_error_from_temporal_error() {
    let temporal = TemporalError::InvalidTimezone("Mars/Olympus".to_string());
    let core_error: CoreError = temporal.into();

    assert!(matches!(core_error, CoreError::Temporal(_)));
    assert!(!core_error.is_configuration());
    assert!(core_error.to_string().contains("Mars/Olympus"));
}

#[test]
fn test_question_mark_converts_temporal_errors() {
    fn load(timezone: &str, date: &str) -> Result<(Timezone, chrono::NaiveDate), CoreError> {
        Ok((Timezone::parse(timezone)?, parse_date(date)?))
    }

    assert!(load("America/Montevideo", "2024-03-15").is_ok());
    assert!(matches!(
        load("America/Montevideo", "15/03/2024"),
        Err(CoreError::Temporal(TemporalError::InvalidDate(_)))
    ));
    assert!(matches!(
        load("Nowhere/City", "2024-03-15"),
        Err(CoreError::Temporal(TemporalError::InvalidTimezone(_)))
    ));
}

#[test]
fn test_core_error_configuration() {
    let error = CoreError::configuration("Missing account chart");

    assert!(error.is_configuration());
    assert_eq!(error.to_string(), "Configuration error: Missing account chart");
}
