//! # Denomination Autosave
//!
//! Persists the cashier's banknote count without a write per keystroke.
//!
//! ```text
//!  edit 500×2 ─┐   edit 100×3 ─┐                    reset
//!              ▼               ▼                      │
//!  ────────────●───────────────●──────── 800ms ──► save  ▼ save (immediate)
//!                   window restarts on each edit
//! ```
//!
//! The timing rules live in [`CountDraft`]; this module only drives it
//! with tokio's clock and writes through a [`CountStore`].
//!
//! A worker left alone for [`AUTOSAVE_IDLE_STOP`] with nothing pending
//! stops by itself. Commands already queued are still handled, then the
//! handle reports `is_running() == false`.

use std::future::Future;
use std::time::Duration;

use kassa_core::denomination::CountDraft;
use kassa_core::shift::ShiftManager;
use kassa_core::{DenominationCounts, Shift};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::{DbError, DbResult};
use crate::pool::Database;

/// How long an idle worker waits for the next command before stopping.
pub const AUTOSAVE_IDLE_STOP: Duration = Duration::from_secs(600);

/// Where a finished count is written.
pub trait CountStore: Send + Sync + 'static {
    fn save_counts(
        &self,
        manager: &ShiftManager,
        shift_id: &str,
        counts: &DenominationCounts,
    ) -> impl Future<Output = DbResult<Shift>> + Send;
}

impl CountStore for Database {
    async fn save_counts(
        &self,
        manager: &ShiftManager,
        shift_id: &str,
        counts: &DenominationCounts,
    ) -> DbResult<Shift> {
        self.shifts().amend_denominations(manager, shift_id, counts).await
    }
}

enum AutosaveCommand {
    Edit {
        key: String,
        count: u32,
    },
    Reset {
        reply: oneshot::Sender<DbResult<Shift>>,
    },
    Flush {
        reply: oneshot::Sender<DbResult<Option<Shift>>>,
    },
}

/// Handle to the autosave worker of one shift.
///
/// Dropping every handle flushes the pending count and stops the worker.
#[derive(Debug, Clone)]
pub struct DenominationAutosave {
    shift_id: String,
    tx: mpsc::Sender<AutosaveCommand>,
}

impl DenominationAutosave {
    /// Spawns a worker seeded with the shift's stored counts.
    ///
    /// `idle_stop` is how long the worker lingers with nothing pending.
    pub fn spawn<S: CountStore>(
        store: S,
        manager: ShiftManager,
        shift: &Shift,
        window: Duration,
        idle_stop: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(64);
        let worker = AutosaveWorker {
            store,
            manager,
            shift_id: shift.id.clone(),
            draft: CountDraft::with_window(shift.denomination_counts.clone(), window),
            idle_stop,
        };
        let handle = tokio::spawn(worker.run(rx));

        let autosave = Self {
            shift_id: shift.id.clone(),
            tx,
        };
        (autosave, handle)
    }

    pub fn shift_id(&self) -> &str {
        &self.shift_id
    }

    /// Records one nominal's count; saved once the window passes quietly.
    pub async fn edit(&self, key: impl Into<String>, count: u32) -> DbResult<()> {
        self.send(AutosaveCommand::Edit {
            key: key.into(),
            count,
        })
        .await
    }

    /// Clears every count and saves right away.
    pub async fn reset(&self) -> DbResult<Shift> {
        let (reply, rx) = oneshot::channel();
        self.send(AutosaveCommand::Reset { reply }).await?;
        rx.await.map_err(|_| worker_gone())?
    }

    /// Saves any pending edit now. `None` if nothing was pending.
    pub async fn flush(&self) -> DbResult<Option<Shift>> {
        let (reply, rx) = oneshot::channel();
        self.send(AutosaveCommand::Flush { reply }).await?;
        rx.await.map_err(|_| worker_gone())?
    }

    /// False once the worker has stopped.
    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn send(&self, command: AutosaveCommand) -> DbResult<()> {
        self.tx.send(command).await.map_err(|_| worker_gone())
    }
}

fn worker_gone() -> DbError {
    DbError::Internal("denomination autosave worker stopped".to_string())
}

struct AutosaveWorker<S> {
    store: S,
    manager: ShiftManager,
    shift_id: String,
    draft: CountDraft,
    idle_stop: Duration,
}

impl<S: CountStore> AutosaveWorker<S> {
    async fn run(mut self, mut rx: mpsc::Receiver<AutosaveCommand>) {
        debug!(shift_id = %self.shift_id, "Denomination autosave started");

        loop {
            let deadline = self.draft.deadline().map(Instant::from_std);
            let wake_at = deadline.unwrap_or_else(|| Instant::now() + self.idle_stop);

            tokio::select! {
                command = rx.recv() => match command {
                    Some(AutosaveCommand::Edit { key, count }) => {
                        self.draft.edit(key, count, Instant::now().into_std());
                    }
                    Some(AutosaveCommand::Reset { reply }) => {
                        let counts = self.draft.reset();
                        let _ = reply.send(self.save(&counts).await);
                    }
                    Some(AutosaveCommand::Flush { reply }) => {
                        let result = match self.draft.flush() {
                            Some(counts) => self.save(&counts).await.map(Some),
                            None => Ok(None),
                        };
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Some(counts) = self.draft.flush() {
                            self.save_logged(&counts).await;
                        }
                        break;
                    }
                },

                _ = tokio::time::sleep_until(wake_at) => match deadline {
                    Some(_) => {
                        if let Some(counts) = self.draft.poll(Instant::now().into_std()) {
                            self.save_logged(&counts).await;
                        }
                    }
                    None => {
                        // Drains queued commands, then `recv` yields None
                        debug!(shift_id = %self.shift_id, "Denomination autosave idle, stopping");
                        rx.close();
                    }
                },
            }
        }

        debug!(shift_id = %self.shift_id, "Denomination autosave stopped");
    }

    async fn save(&self, counts: &DenominationCounts) -> DbResult<Shift> {
        self.store.save_counts(&self.manager, &self.shift_id, counts).await
    }

    /// Background saves have no caller to report to.
    async fn save_logged(&self, counts: &DenominationCounts) {
        if let Err(err) = self.save(counts).await {
            error!(shift_id = %self.shift_id, error = %err, "Denomination autosave failed");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{database, open_shift};
    use chrono::Utc;
    use kassa_core::denomination::AUTOSAVE_DEBOUNCE;
    use kassa_core::shift::OpenShiftRequest;
    use kassa_core::Money;
    use std::sync::{Arc, Mutex};

    /// Records every save; no I/O, so the paused clock stays deterministic.
    struct MemoryStore {
        shift: Mutex<Shift>,
        saves: Mutex<Vec<DenominationCounts>>,
    }

    impl MemoryStore {
        fn new() -> Arc<Self> {
            let shift = ShiftManager::default()
                .open_shift(
                    None,
                    OpenShiftRequest {
                        start_balance: Money::zero(),
                        cashier_id: "staff-1".into(),
                        cashier_name: "Olena".into(),
                    },
                    1,
                    Utc::now(),
                )
                .unwrap();
            Arc::new(Self {
                shift: Mutex::new(shift),
                saves: Mutex::new(Vec::new()),
            })
        }

        fn saves(&self) -> Vec<DenominationCounts> {
            self.saves.lock().unwrap().clone()
        }

        fn shift(&self) -> Shift {
            self.shift.lock().unwrap().clone()
        }
    }

    impl CountStore for Arc<MemoryStore> {
        async fn save_counts(
            &self,
            manager: &ShiftManager,
            _shift_id: &str,
            counts: &DenominationCounts,
        ) -> DbResult<Shift> {
            self.saves.lock().unwrap().push(counts.clone());
            let mut shift = self.shift.lock().unwrap();
            *shift = manager.amend_denominations(shift.clone(), counts)?;
            Ok(shift.clone())
        }
    }

    fn spawn_memory() -> (Arc<MemoryStore>, DenominationAutosave, JoinHandle<()>) {
        let store = MemoryStore::new();
        let shift = store.shift();
        let (autosave, handle) = DenominationAutosave::spawn(
            store.clone(),
            ShiftManager::default(),
            &shift,
            AUTOSAVE_DEBOUNCE,
            AUTOSAVE_IDLE_STOP,
        );
        (store, autosave, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_are_saved_after_quiet_window() {
        let (store, autosave, _handle) = spawn_memory();

        autosave.edit("500", 2).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        autosave.edit("100", 3).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        // second edit restarted the window
        assert!(store.saves().is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let saves = store.saves();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].get("500"), Some(&2));
        assert_eq!(saves[0].get("100"), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_saves_immediately() {
        let (store, autosave, _handle) = spawn_memory();

        autosave.edit("1000", 1).await.unwrap();
        let cleared = autosave.reset().await.unwrap();
        assert!(cleared.denomination_counts.is_empty());
        assert_eq!(store.saves().len(), 1);

        // the cancelled edit never lands afterwards
        tokio::time::sleep(AUTOSAVE_DEBOUNCE * 2).await;
        assert_eq!(store.saves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_and_drop() {
        let (store, autosave, handle) = spawn_memory();

        autosave.edit("200", 1).await.unwrap();
        let flushed = autosave.flush().await.unwrap().unwrap();
        assert_eq!(flushed.denomination_counts.get("200"), Some(&1));
        assert!(autosave.flush().await.unwrap().is_none());

        autosave.edit("50", 4).await.unwrap();
        drop(autosave);
        handle.await.unwrap();

        let saves = store.saves();
        assert_eq!(saves.len(), 2);
        assert_eq!(saves[1].get("50"), Some(&4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_worker_stops_after_saving() {
        let (store, autosave, handle) = spawn_memory();

        autosave.edit("500", 1).await.unwrap();
        tokio::time::sleep(AUTOSAVE_IDLE_STOP / 2).await;
        assert_eq!(store.saves().len(), 1);
        assert!(autosave.is_running());

        handle.await.unwrap();
        assert!(!autosave.is_running());
        assert!(autosave.edit("100", 1).await.is_err());
        assert_eq!(store.saves().len(), 1);
    }

    #[tokio::test]
    async fn test_database_store_persists_count() {
        let db = database().await;
        let shift = open_shift(&db, 200).await;
        let (autosave, _handle) = DenominationAutosave::spawn(
            db.clone(),
            ShiftManager::default(),
            &shift,
            Duration::from_millis(20),
            AUTOSAVE_IDLE_STOP,
        );

        autosave.edit("200", 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let stored = db.shifts().get(&shift.id).await.unwrap();
        assert_eq!(stored.denomination_counts.get("200"), Some(&1));
        // still open: no end balance, so no difference yet
        assert_eq!(stored.cash_difference, None);
    }
}
