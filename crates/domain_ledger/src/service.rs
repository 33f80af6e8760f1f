//! Closure service
//!
//! Orchestrates the managers over a `ClosureStore`. Each mutating call reads
//! the closure, computes the change in memory and writes the changed fields
//! back in a single operation, all while holding that closure's lock. Calls
//! on the same closure are therefore serialized, and opening a closure is
//! serialized per user so that two sessions cannot both open one.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, instrument, warn};

use core_kernel::{Clock, ClosureId, PortError, SystemClock, TransactionId, UserId};
use crate::closure::{self, Closure, ClosureLifecycle, OpeningBalance};
use crate::concept::ConceptRegistry;
use crate::error::LedgerError;
use crate::lifecycle::{CreatedTransaction, DeletionOutcome, TransactionManager};
use crate::ports::{ClosureFields, ClosureStore, PaymentSource};
use crate::reconciliation::{self, ClosureAlert, PaymentLookup};
use crate::settings::LedgerSettings;
use crate::transaction::{ProposedTransaction, Transaction};
use crate::transfer::{TransferManager, TransferOutcome, TransferRequest};

/// One async mutex per key, created on first use
struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Drop entries nobody else holds
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Application service for daily closures
pub struct ClosureService<S: ClosureStore> {
    store: Arc<S>,
    payments: Option<Arc<dyn PaymentSource>>,
    registry: ConceptRegistry,
    settings: LedgerSettings,
    clock: Arc<dyn Clock>,
    closure_locks: KeyedLocks<ClosureId>,
    user_locks: KeyedLocks<UserId>,
}

impl<S: ClosureStore> ClosureService<S> {
    /// Creates a service over a store
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if the configured concepts do not
    /// form a valid registry
    pub fn new(store: Arc<S>, settings: LedgerSettings) -> Result<Self, LedgerError> {
        let registry = ConceptRegistry::new(settings.concepts.clone())?;
        Ok(Self {
            store,
            payments: None,
            registry,
            settings,
            clock: Arc::new(SystemClock),
            closure_locks: KeyedLocks::new(),
            user_locks: KeyedLocks::new(),
        })
    }

    /// Sets the invoicing system used for reconciliation alerts
    pub fn with_payment_source(mut self, payments: Arc<dyn PaymentSource>) -> Self {
        self.payments = Some(payments);
        self
    }

    /// Replaces the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &ConceptRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Current business day
    pub fn today(&self) -> NaiveDate {
        self.settings.timezone.today(self.clock.as_ref())
    }

    async fn load(&self, id: &ClosureId) -> Result<Closure, LedgerError> {
        self.store.read_closure(id).await.map_err(|e| match e {
            PortError::NotFound { .. } => LedgerError::ClosureNotFound(*id),
            other => LedgerError::Storage(other),
        })
    }

    /// Opening balances proposed for the user's next closure
    pub async fn proposed_opening_balances(&self, user_id: &UserId) -> Result<Vec<OpeningBalance>, LedgerError> {
        let closures = self.store.list_closures_for_user(user_id).await?;
        Ok(closure::seed_opening_balances(
            &self.settings.accounts,
            closure::latest_closure(&closures),
        ))
    }

    /// Opens a new closure for the user
    #[instrument(skip_all, fields(user_id = %user_id, %date))]
    pub async fn open_closure(
        &self,
        user_id: &UserId,
        date: NaiveDate,
        balances: Vec<OpeningBalance>,
    ) -> Result<Closure, LedgerError> {
        let lock = self.user_locks.lock_for(user_id);
        let _guard = lock.lock().await;

        let existing = self.store.list_closures_for_user(user_id).await?;
        let closure = ClosureLifecycle::new(&self.registry).open(
            user_id,
            date,
            self.today(),
            &existing,
            balances,
            self.clock.now(),
        )?;

        self.store.create_closure(&closure).await?;
        Ok(closure)
    }

    /// Reads a closure
    pub async fn get_closure(&self, id: &ClosureId) -> Result<Closure, LedgerError> {
        self.load(id).await
    }

    /// All closures of a user, oldest first
    pub async fn list_closures(&self, user_id: &UserId) -> Result<Vec<Closure>, LedgerError> {
        Ok(self.store.list_closures_for_user(user_id).await?)
    }

    /// Records a transaction
    #[instrument(skip_all, fields(closure_id = %id, concept = %proposed.concept))]
    pub async fn add_transaction(
        &self,
        id: &ClosureId,
        proposed: ProposedTransaction,
    ) -> Result<CreatedTransaction, LedgerError> {
        let lock = self.closure_locks.lock_for(id);
        let _guard = lock.lock().await;

        let mut closure = self.load(id).await?;
        let created = TransactionManager::new(&self.registry, self.clock.as_ref()).create(&mut closure, proposed)?;
        self.store.write_closure_fields(id, ClosureFields::ledger(&closure)).await?;
        Ok(created)
    }

    /// Advances a transaction one workflow step
    #[instrument(skip_all, fields(closure_id = %id, transaction_id = %transaction_id))]
    pub async fn advance_transaction(
        &self,
        id: &ClosureId,
        transaction_id: &TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let lock = self.closure_locks.lock_for(id);
        let _guard = lock.lock().await;

        let mut closure = self.load(id).await?;
        let updated = TransactionManager::new(&self.registry, self.clock.as_ref()).advance_state(&mut closure, transaction_id)?;
        self.store.write_closure_fields(id, ClosureFields::transactions(&closure)).await?;
        Ok(updated)
    }

    /// Replaces a transaction's description
    #[instrument(skip_all, fields(closure_id = %id, transaction_id = %transaction_id))]
    pub async fn update_description(
        &self,
        id: &ClosureId,
        transaction_id: &TransactionId,
        description: String,
    ) -> Result<Transaction, LedgerError> {
        let lock = self.closure_locks.lock_for(id);
        let _guard = lock.lock().await;

        let mut closure = self.load(id).await?;
        let updated = TransactionManager::new(&self.registry, self.clock.as_ref()).update_description(&mut closure, transaction_id, description)?;
        self.store.write_closure_fields(id, ClosureFields::transactions(&closure)).await?;
        Ok(updated)
    }

    /// Deletes a transaction, and its transfer partner if any
    #[instrument(skip_all, fields(closure_id = %id, transaction_id = %transaction_id))]
    pub async fn delete_transaction(
        &self,
        id: &ClosureId,
        transaction_id: &TransactionId,
    ) -> Result<DeletionOutcome, LedgerError> {
        let lock = self.closure_locks.lock_for(id);
        let _guard = lock.lock().await;

        let mut closure = self.load(id).await?;
        let outcome = TransactionManager::new(&self.registry, self.clock.as_ref()).delete(&mut closure, transaction_id)?;
        self.store.write_closure_fields(id, ClosureFields::ledger(&closure)).await?;
        Ok(outcome)
    }

    /// Moves money between two accounts of the closure
    #[instrument(skip_all, fields(closure_id = %id, amount = %request.amount))]
    pub async fn execute_transfer(
        &self,
        id: &ClosureId,
        request: TransferRequest,
    ) -> Result<TransferOutcome, LedgerError> {
        let lock = self.closure_locks.lock_for(id);
        let _guard = lock.lock().await;

        let mut closure = self.load(id).await?;
        let outcome = TransferManager::new(&self.registry, self.clock.as_ref()).execute(&mut closure, request)?;
        self.store.write_closure_fields(id, ClosureFields::ledger(&closure)).await?;
        Ok(outcome)
    }

    /// Replaces the closure's notes
    #[instrument(skip_all, fields(closure_id = %id))]
    pub async fn update_observations(&self, id: &ClosureId, observations: String) -> Result<Closure, LedgerError> {
        let lock = self.closure_locks.lock_for(id);
        let _guard = lock.lock().await;

        let mut closure = self.load(id).await?;
        closure::update_observations(&mut closure, observations, self.clock.now())?;
        self.store.write_closure_fields(id, ClosureFields::observations(&closure)).await?;
        Ok(closure)
    }

    /// Closes the closure once every transaction is complete
    #[instrument(skip_all, fields(closure_id = %id))]
    pub async fn finalize_closure(&self, id: &ClosureId) -> Result<Closure, LedgerError> {
        let lock = self.closure_locks.lock_for(id);
        let _guard = lock.lock().await;

        let mut closure = self.load(id).await?;
        ClosureLifecycle::new(&self.registry).finalize(&mut closure, self.clock.now())?;
        self.store.write_closure_fields(id, ClosureFields::status(&closure)).await?;
        Ok(closure)
    }

    /// Deletes an open closure
    #[instrument(skip_all, fields(closure_id = %id))]
    pub async fn delete_closure(&self, id: &ClosureId) -> Result<(), LedgerError> {
        let lock = self.closure_locks.lock_for(id);
        let _guard = lock.lock().await;

        let closure = self.load(id).await?;
        ClosureLifecycle::new(&self.registry).ensure_deletable(&closure)?;
        self.store.delete_closure(id).await?;
        debug!(closure_id = %id, "Closure deleted");
        Ok(())
    }

    /// Reconciliation alerts for a closure
    ///
    /// Never fails because of the invoicing system: errors, timeouts and a
    /// missing payment source all produce an informational alert.
    #[instrument(skip_all, fields(closure_id = %id))]
    pub async fn closure_alerts(&self, id: &ClosureId) -> Result<Vec<ClosureAlert>, LedgerError> {
        let closure = self.load(id).await?;
        let lookup = self.lookup_payments(closure.date).await;
        Ok(reconciliation::closure_alerts(
            &closure,
            &lookup,
            &self.settings.reconciled_concepts,
        ))
    }

    async fn lookup_payments(&self, date: NaiveDate) -> PaymentLookup {
        let Some(source) = &self.payments else {
            return PaymentLookup::Unavailable("no invoicing system configured".to_string());
        };

        let timeout = Duration::from_millis(self.settings.reconciliation_timeout_ms);
        match tokio::time::timeout(timeout, source.fetch_external_payments_for_date(date)).await {
            Ok(Ok(payments)) => PaymentLookup::Available(payments),
            Ok(Err(error)) => {
                warn!(%date, %error, "External payment lookup failed");
                PaymentLookup::Unavailable(error.to_string())
            }
            Err(_) => {
                warn!(%date, timeout_ms = self.settings.reconciliation_timeout_ms, "External payment lookup timed out");
                PaymentLookup::Unavailable(format!(
                    "no response within {}ms",
                    self.settings.reconciliation_timeout_ms
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keyed_locks_share_per_key() {
        let locks: KeyedLocks<u32> = KeyedLocks::new();
        let a1 = locks.lock_for(&1);
        let a2 = locks.lock_for(&1);
        let b = locks.lock_for(&2);
        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }

    #[tokio::test]
    async fn test_keyed_locks_release_unused() {
        let locks: KeyedLocks<u32> = KeyedLocks::new();
        drop(locks.lock_for(&1));
        let _other = locks.lock_for(&2);
        let guard = match locks.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        assert!(!guard.contains_key(&1));
    }
}
