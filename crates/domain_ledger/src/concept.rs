//! Concept and workflow-state registry
//!
//! A concept classifies a transaction (sales income, supplier payment, ...)
//! and defines the ordered states the transaction walks through before it is
//! considered done. Transactions reference concepts and states by name, so
//! the name is the stable key: renaming a concept orphans the transactions
//! recorded under the old name.
//!
//! The registry is immutable once built and is passed explicitly to the
//! managers that need it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{LedgerError, ValidationError};
use crate::transaction::Transaction;

/// Direction of money for a concept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Income,
    Expense,
}

impl Polarity {
    /// Forces the sign of an amount to match this polarity
    pub fn normalize(&self, amount: Decimal) -> Decimal {
        match self {
            Polarity::Income => amount.abs(),
            Polarity::Expense => -amount.abs(),
        }
    }

    /// Returns true if the amount already has this polarity's sign
    pub fn matches(&self, amount: Decimal) -> bool {
        match self {
            Polarity::Income => amount > Decimal::ZERO,
            Polarity::Expense => amount < Decimal::ZERO,
        }
    }
}

/// Configuration input for a workflow state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDefinition {
    pub id: String,
    pub name: String,
    /// What must be done to leave this state
    #[serde(default)]
    pub description: String,
}

impl StateDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Configuration input for a concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptDefinition {
    pub id: String,
    pub name: String,
    pub polarity: Polarity,
    pub states: Vec<StateDefinition>,
}

/// A workflow state as positioned within one concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub id: String,
    pub name: String,
    pub description: String,
    /// 1-based position within the concept
    pub order: u32,
    /// True only for the last state of the concept
    pub is_final: bool,
}

/// A transaction concept with its ordered states
///
/// Always holds at least one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    id: String,
    name: String,
    polarity: Polarity,
    states: Vec<State>,
}

impl Concept {
    fn build(definition: &ConceptDefinition) -> Self {
        let count = definition.states.len();
        let states = definition
            .states
            .iter()
            .enumerate()
            .map(|(index, state)| State {
                id: state.id.clone(),
                name: state.name.clone(),
                description: state.description.clone(),
                order: index as u32 + 1,
                is_final: index + 1 == count,
            })
            .collect();

        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            polarity: definition.polarity,
            states,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// The state every new transaction starts in
    pub fn initial_state(&self) -> &State {
        &self.states[0]
    }

    /// The final state
    pub fn terminal_state(&self) -> &State {
        &self.states[self.states.len() - 1]
    }

    /// Looks up a state of this concept by name
    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }

    /// The state following `current`, or None if `current` is final or unknown
    pub fn next_state(&self, current: &str) -> Option<&State> {
        let index = self.states.iter().position(|s| s.name == current)?;
        self.states.get(index + 1)
    }
}

/// Immutable lookup table of concepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConceptRegistry {
    concepts: Vec<Concept>,
}

impl ConceptRegistry {
    /// Builds a registry from definitions
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidRegistry` if the list is empty, a
    /// concept name is blank or repeated, a concept has no states, a state
    /// name repeats within a concept, or the concepts do not share one final
    /// state name (transfers are recorded in that state).
    pub fn new(definitions: Vec<ConceptDefinition>) -> Result<Self, ValidationError> {
        if definitions.is_empty() {
            return Err(ValidationError::InvalidRegistry("no concepts defined".to_string()));
        }

        let mut names = HashSet::new();
        let mut final_state: Option<&str> = None;
        for definition in &definitions {
            if definition.name.trim().is_empty() {
                return Err(ValidationError::InvalidRegistry("concept name is empty".to_string()));
            }
            if !names.insert(definition.name.as_str()) {
                return Err(ValidationError::InvalidRegistry(format!(
                    "concept '{}' is defined twice",
                    definition.name
                )));
            }

            let last = definition.states.last().ok_or_else(|| {
                ValidationError::InvalidRegistry(format!("concept '{}' has no states", definition.name))
            })?;

            let mut state_names = HashSet::new();
            for state in &definition.states {
                if !state_names.insert(state.name.as_str()) {
                    return Err(ValidationError::InvalidRegistry(format!(
                        "state '{}' repeats in concept '{}'",
                        state.name, definition.name
                    )));
                }
            }

            match final_state {
                None => final_state = Some(last.name.as_str()),
                Some(expected) if expected != last.name => {
                    return Err(ValidationError::InvalidRegistry(format!(
                        "concept '{}' ends in '{}' but other concepts end in '{}'",
                        definition.name, last.name, expected
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(Self {
            concepts: definitions.iter().map(Concept::build).collect(),
        })
    }

    /// The six concepts of a small shop
    pub fn standard() -> Self {
        Self {
            concepts: standard_definitions().iter().map(Concept::build).collect(),
        }
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    /// Finds a concept by name
    pub fn find(&self, name: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.name == name)
    }

    /// Resolves a concept by name
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ConceptNotFound` for a blank or unknown name
    pub fn resolve(&self, name: &str) -> Result<&Concept, LedgerError> {
        if name.trim().is_empty() {
            return Err(LedgerError::ConceptNotFound(name.to_string()));
        }
        self.find(name)
            .ok_or_else(|| LedgerError::ConceptNotFound(name.to_string()))
    }

    /// The state a new transaction of `concept` starts in
    pub fn initial_state<'a>(&self, concept: &'a Concept) -> &'a State {
        concept.initial_state()
    }

    /// The state after `current` for the named concept
    pub fn next_state(&self, concept: &str, current: &str) -> Option<&State> {
        self.find(concept)?.next_state(current)
    }

    /// Name of the shared final state, used for transfer legs
    pub fn completed_state(&self) -> &str {
        &self.concepts[0].terminal_state().name
    }

    /// Returns true if the transaction needs no further workflow steps
    ///
    /// Transfers are always complete. A transaction whose concept or state
    /// cannot be resolved is treated as incomplete.
    pub fn is_complete(&self, transaction: &Transaction) -> bool {
        if transaction.is_transfer() {
            return true;
        }
        self.find(&transaction.concept)
            .and_then(|c| c.state(&transaction.status))
            .map(|s| s.is_final)
            .unwrap_or(false)
    }

    /// Non-transfer transactions not yet in their concept's final state
    pub fn pending_transactions(&self, transactions: &[Transaction]) -> Vec<Transaction> {
        transactions
            .iter()
            .filter(|t| !self.is_complete(t))
            .cloned()
            .collect()
    }

    /// The state an advance would move the transaction to, if any
    pub fn next_state_for(&self, transaction: &Transaction) -> Option<&State> {
        if transaction.is_transfer() {
            return None;
        }
        self.next_state(&transaction.concept, &transaction.status)
    }

    /// Looks up a state by name across all concepts
    pub fn state_info(&self, name: &str) -> Option<&State> {
        self.concepts.iter().find_map(|c| c.state(name))
    }
}

impl Default for ConceptRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Definitions behind `ConceptRegistry::standard`
pub fn standard_definitions() -> Vec<ConceptDefinition> {
    let pending_invoice = StateDefinition::new(
        "pending-invoice",
        "Pending Invoice",
        "Issue the invoice in the invoicing system and record its number.",
    );
    let pending_accounting = StateDefinition::new(
        "pending-accounting",
        "Pending Accounting",
        "Record the accounting entry and check that the amounts agree.",
    );
    let pending_payment = StateDefinition::new(
        "pending-payment",
        "Pending Payment",
        "Make the payment and record the receipt.",
    );
    let pending_control = StateDefinition::new(
        "pending-control",
        "Pending Control",
        "Review the supporting documents and verify amounts and concept.",
    );
    let completed = StateDefinition::new(
        "completed",
        "Completed",
        "All steps are done. No further action is required.",
    );

    let concept = |id: &str, name: &str, polarity, states: &[&StateDefinition]| ConceptDefinition {
        id: id.to_string(),
        name: name.to_string(),
        polarity,
        states: states.iter().map(|s| (*s).clone()).collect(),
    };

    vec![
        concept(
            "concept-1",
            "(+) Sales income",
            Polarity::Income,
            &[&pending_invoice, &pending_accounting, &completed],
        ),
        concept(
            "concept-2",
            "(+) Other income",
            Polarity::Income,
            &[&pending_payment, &pending_control, &completed],
        ),
        concept(
            "concept-3",
            "(-) Supplier payments",
            Polarity::Expense,
            &[&pending_payment, &completed],
        ),
        concept(
            "concept-4",
            "(-) Utility payments",
            Polarity::Expense,
            &[&pending_payment, &pending_accounting, &completed],
        ),
        concept(
            "concept-5",
            "(-) Salaries",
            Polarity::Expense,
            &[&pending_control, &completed],
        ),
        concept(
            "concept-6",
            "(-) Other expenses",
            Polarity::Expense,
            &[&pending_control, &completed],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_registry_is_valid() {
        assert!(ConceptRegistry::new(standard_definitions()).is_ok());
        assert_eq!(ConceptRegistry::standard().concepts().len(), 6);
    }

    #[test]
    fn test_order_and_final_flag_follow_position() {
        let registry = ConceptRegistry::standard();
        let sales = registry.find("(+) Sales income").unwrap();
        let orders: Vec<u32> = sales.states().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert!(!sales.states()[1].is_final);
        assert!(sales.states()[2].is_final);
    }

    #[test]
    fn test_next_state_walks_forward() {
        let registry = ConceptRegistry::standard();
        let next = registry.next_state("(+) Sales income", "Pending Invoice").unwrap();
        assert_eq!(next.name, "Pending Accounting");
        assert!(registry.next_state("(+) Sales income", "Completed").is_none());
        assert!(registry.next_state("(+) Sales income", "Pending Payment").is_none());
    }

    #[test]
    fn test_same_state_different_positions() {
        let registry = ConceptRegistry::standard();
        let supplier = registry.find("(-) Supplier payments").unwrap();
        let utility = registry.find("(-) Utility payments").unwrap();
        assert_eq!(supplier.next_state("Pending Payment").unwrap().name, "Completed");
        assert_eq!(utility.next_state("Pending Payment").unwrap().name, "Pending Accounting");
    }

    #[test]
    fn test_rejects_mismatched_final_states() {
        let mut definitions = standard_definitions();
        definitions[0].states.pop();
        assert!(matches!(
            ConceptRegistry::new(definitions),
            Err(ValidationError::InvalidRegistry(_))
        ));
    }

    #[test]
    fn test_polarity_normalize() {
        assert_eq!(Polarity::Income.normalize(dec!(-5)), dec!(5));
        assert_eq!(Polarity::Expense.normalize(dec!(5)), dec!(-5));
        assert_eq!(Polarity::Expense.normalize(dec!(-5)), dec!(-5));
    }
}
