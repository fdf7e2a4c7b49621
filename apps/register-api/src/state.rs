//! # Application State
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    AppState (cloned into every handler)                 │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌────────────┐ │
//! │  │  Database    │  │ CheckLedger  │  │ ShiftManager │  │ AppConfig  │ │
//! │  │  (pool)      │  │ (tax rate)   │  │ (register,   │  │ (Arc)      │ │
//! │  │              │  │              │  │  nominals)   │  │            │ │
//! │  └──────────────┘  └──────────────┘  └──────────────┘  └────────────┘ │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  autosaves: Arc<Mutex<HashMap<shift_id, DenominationAutosave>>>  │  │
//! │  │  one debounced worker per shift being counted; idle ones stop    │  │
//! │  │  themselves and are pruned on the next lookup                    │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use kassa_core::check::CheckLedger;
use kassa_core::denomination::DenominationSet;
use kassa_core::shift::ShiftManager;
use kassa_core::Shift;
use kassa_db::{Database, DbResult, DenominationAutosave};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub ledger: CheckLedger,
    pub manager: ShiftManager,
    pub config: Arc<AppConfig>,
    autosaves: Arc<Mutex<HashMap<String, DenominationAutosave>>>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let ledger = CheckLedger::new(config.tax_rate());
        let manager = ShiftManager::new(
            config.register_id.clone(),
            DenominationSet::for_currency(&config.currency),
        );

        AppState {
            db,
            ledger,
            manager,
            config: Arc::new(config),
            autosaves: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn register_id(&self) -> &str {
        self.manager.register_id()
    }

    /// The shift's autosave worker, spawned from its stored counts on first use.
    pub async fn autosave_for(&self, shift_id: &str) -> DbResult<DenominationAutosave> {
        let mut autosaves = self.autosaves.lock().await;
        autosaves.retain(|_, autosave| autosave.is_running());
        if let Some(autosave) = autosaves.get(shift_id) {
            return Ok(autosave.clone());
        }

        let shift = self.db.shifts().get(shift_id).await?;
        let (autosave, _handle) = DenominationAutosave::spawn(
            self.db.clone(),
            self.manager.clone(),
            &shift,
            self.config.autosave_window,
            self.config.autosave_idle,
        );
        debug!(shift_id = %shift_id, "Autosave worker spawned");
        autosaves.insert(shift_id.to_string(), autosave.clone());
        Ok(autosave)
    }

    /// Records one nominal's count on the shift's worker.
    ///
    /// A worker that went idle between lookup and send is replaced once.
    pub async fn edit_count(&self, shift_id: &str, key: &str, count: u32) -> DbResult<()> {
        let autosave = self.autosave_for(shift_id).await?;
        match autosave.edit(key, count).await {
            Err(_) if !autosave.is_running() => self.autosave_for(shift_id).await?.edit(key, count).await,
            result => result,
        }
    }

    /// Clears the shift's count and saves it right away.
    pub async fn reset_counts(&self, shift_id: &str) -> DbResult<Shift> {
        let autosave = self.autosave_for(shift_id).await?;
        match autosave.reset().await {
            Err(_) if !autosave.is_running() => self.autosave_for(shift_id).await?.reset().await,
            result => result,
        }
    }

    /// Flushes and drops the shift's worker.
    ///
    /// Called before counts are written another way, so a stale draft
    /// cannot land on top of them later.
    pub async fn retire_autosave(&self, shift_id: &str) -> DbResult<()> {
        let autosave = self.autosaves.lock().await.remove(shift_id);
        if let Some(autosave) = autosave {
            if autosave.is_running() {
                autosave.flush().await?;
            }
            debug!(shift_id = %shift_id, "Autosave worker retired");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kassa_core::shift::OpenShiftRequest;
    use kassa_core::Money;
    use kassa_db::DbConfig;
    use std::time::Duration;

    async fn state_with_idle(idle: Duration) -> (AppState, Shift) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = AppConfig {
            autosave_window: Duration::from_millis(10),
            autosave_idle: idle,
            ..AppConfig::default()
        };
        let state = AppState::new(db, config);
        let shift = state
            .db
            .shifts()
            .open(
                &state.manager,
                OpenShiftRequest {
                    start_balance: Money::zero(),
                    cashier_id: "staff-1".into(),
                    cashier_name: "Olena".into(),
                },
            )
            .await
            .unwrap();
        (state, shift)
    }

    async fn tracked(state: &AppState) -> usize {
        state.autosaves.lock().await.len()
    }

    #[tokio::test]
    async fn test_idle_workers_are_pruned_and_respawned() {
        let (state, shift) = state_with_idle(Duration::from_millis(50)).await;

        state.edit_count(&shift.id, "500", 2).await.unwrap();
        assert_eq!(tracked(&state).await, 1);

        // saved after the window, then stopped after the idle period
        tokio::time::sleep(Duration::from_millis(300)).await;
        let stored = state.db.shifts().get(&shift.id).await.unwrap();
        assert_eq!(stored.denomination_counts.get("500"), Some(&2));

        let stopped = state.autosaves.lock().await.get(&shift.id).cloned().unwrap();
        assert!(!stopped.is_running());

        // the next keystroke gets a fresh worker seeded from storage
        state.edit_count(&shift.id, "100", 1).await.unwrap();
        assert_eq!(tracked(&state).await, 1);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let stored = state.db.shifts().get(&shift.id).await.unwrap();
        assert_eq!(stored.denomination_counts.get("500"), Some(&2));
        assert_eq!(stored.denomination_counts.get("100"), Some(&1));
    }

    #[tokio::test]
    async fn test_retire_removes_worker() {
        let (state, shift) = state_with_idle(Duration::from_secs(600)).await;

        state.edit_count(&shift.id, "200", 3).await.unwrap();
        state.retire_autosave(&shift.id).await.unwrap();
        assert_eq!(tracked(&state).await, 0);

        let stored = state.db.shifts().get(&shift.id).await.unwrap();
        assert_eq!(stored.denomination_counts.get("200"), Some(&3));

        let cleared = state.reset_counts(&shift.id).await.unwrap();
        assert!(cleared.denomination_counts.is_empty());
    }
}
