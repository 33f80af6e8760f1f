//! Reusable transaction descriptions
//!
//! Descriptions double as tags: previously used texts are suggested while the
//! user types a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::closure::Closure;

/// A description with the last time it was used
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionEntry {
    pub text: String,
    pub last_used: DateTime<Utc>,
}

/// Distinct descriptions, most recently used first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionHistory {
    entries: Vec<DescriptionEntry>,
}

impl DescriptionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the descriptions of every transaction in the closures
    pub fn from_closures<'a, I>(closures: I) -> Self
    where
        I: IntoIterator<Item = &'a Closure>,
    {
        let mut history = Self::new();
        for closure in closures {
            for transaction in &closure.transactions {
                history.record(&transaction.description, transaction.timestamp);
            }
        }
        history
    }

    /// Records a use of a description
    ///
    /// The text is trimmed; blank texts are ignored. Recording a known text
    /// keeps a single entry with the later of the two timestamps.
    pub fn record(&mut self, text: &str, used_at: DateTime<Utc>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match self.entries.iter().position(|e| e.text == text) {
            Some(index) => {
                let entry = &mut self.entries[index];
                if used_at > entry.last_used {
                    entry.last_used = used_at;
                }
            }
            None => self.entries.push(DescriptionEntry {
                text: text.to_string(),
                last_used: used_at,
            }),
        }
        self.entries.sort_by(|a, b| b.last_used.cmp(&a.last_used));
    }

    /// Descriptions containing `query`, ignoring case, most recent first
    ///
    /// A blank query suggests nothing.
    pub fn suggest(&self, query: &str) -> Vec<&str> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|e| e.text.to_lowercase().contains(&query))
            .map(|e| e.text.as_str())
            .collect()
    }

    pub fn entries(&self) -> &[DescriptionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_record_dedupes_trimmed_text() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut history = DescriptionHistory::new();
        history.record("Bread supplier", t0);
        history.record("  Bread supplier ", t0 + Duration::hours(1));
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].last_used, t0 + Duration::hours(1));
    }

    #[test]
    fn test_suggest_most_recent_first() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut history = DescriptionHistory::new();
        history.record("Milk delivery", t0);
        history.record("Electricity bill", t0 + Duration::hours(1));
        history.record("milk for coffee", t0 + Duration::hours(2));

        assert_eq!(history.suggest("MILK"), vec!["milk for coffee", "Milk delivery"]);
        history.record("Milk delivery", t0 + Duration::hours(3));
        assert_eq!(history.suggest("milk"), vec!["Milk delivery", "milk for coffee"]);
    }

    #[test]
    fn test_blank_inputs() {
        let mut history = DescriptionHistory::new();
        history.record("   ", Utc::now());
        assert!(history.is_empty());
        history.record("Rent", Utc::now());
        assert!(history.suggest("").is_empty());
    }
}
