use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use idle_catalog::{default_catalog, default_catalog_file, save_catalog, StaticCatalog};
use idle_core::{reconcile_with_report, PlayerId, PlayerState, ReconcileEvent, ReconcileReport};
use idle_queue::{ActionRequest, QueueError, QueueManager};
use idle_storage::{InMemoryStore, PlayerStore};
use idle_storage_sqlite::SqliteStore;

use crate::{Config, StorageBackend};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),
    #[error("player already exists: {0}")]
    PlayerExists(PlayerId),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Request sequencing around the pure core: load -> reconcile -> (enqueue) -> save.
///
/// Every call for a player holds that player's lock from load to save, so two requests
/// for the same player never interleave their reconciliations.
pub struct GameService {
    pub store: Box<dyn PlayerStore>,
    pub catalog: StaticCatalog,
    pub queue: QueueManager,
    locks: Mutex<HashMap<PlayerId, Arc<Mutex<()>>>>,
}

impl GameService {
    pub fn new(store: Box<dyn PlayerStore>, catalog: StaticCatalog, cfg: &Config) -> Self {
        Self {
            store,
            catalog,
            queue: QueueManager::new(cfg.game.max_queue_size),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Open the service for a project root, writing default config on first use.
    pub fn open(root: PathBuf) -> Result<Self> {
        let cfg_path = Config::config_path(&root);
        let cfg = if cfg_path.exists() {
            Config::load_from(&cfg_path)?
        } else {
            let cfg = Config::default();
            cfg.save_to(&cfg_path)?;
            cfg
        };

        let catalog = match cfg.catalog_path(&root) {
            Some(path) if path.exists() => StaticCatalog::load(&path)?,
            Some(path) => {
                tracing::warn!(path = %path.display(), "catalog file missing, using built-in catalog");
                default_catalog()
            }
            None => default_catalog(),
        };
        tracing::info!(actions = catalog.len(), hash = %catalog.hash(), "catalog loaded");

        let store: Box<dyn PlayerStore> = match cfg.storage.backend {
            StorageBackend::Sqlite => Box::new(SqliteStore::open(&cfg.db_path(&root))?),
            StorageBackend::Memory => Box::new(InMemoryStore::new()),
        };

        Ok(Self::new(store, catalog, &cfg))
    }

    pub fn init_project(root: &Path) -> Result<()> {
        let cfg_path = Config::config_path(root);
        if !cfg_path.exists() {
            Config::default().save_to(&cfg_path)?;
        }
        let cfg = Config::load_from(&cfg_path)?;
        if let Some(path) = cfg.catalog_path(root) {
            if !path.exists() {
                save_catalog(&default_catalog_file(), &path)
                    .with_context(|| format!("write default catalog {}", path.display()))?;
            }
        }
        if cfg.storage.backend == StorageBackend::Sqlite {
            let _ = SqliteStore::open(&cfg.db_path(root))?;
        }
        Ok(())
    }

    /// Run `f` holding the player's lock. The map entry is removed once no other caller holds it.
    fn with_player_lock<T>(&self, player_id: &PlayerId, f: impl FnOnce() -> T) -> T {
        let lock = self.locks.lock().unwrap().entry(player_id.clone()).or_default().clone();
        let out = {
            let _guard = lock.lock().unwrap();
            f()
        };

        let mut locks = self.locks.lock().unwrap();
        // one reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(player_id);
        }
        out
    }

    fn load(&self, player_id: &PlayerId) -> Result<PlayerState, ServiceError> {
        self.store
            .load_player_state(player_id)?
            .ok_or_else(|| ServiceError::PlayerNotFound(player_id.clone()))
    }

    fn reconcile_loaded(&self, state: PlayerState, now_unix: i64) -> PlayerState {
        let (state, report) = reconcile_with_report(state, now_unix);
        log_report(&state.id, &report);
        state
    }

    pub fn create_player(&self, player_id: &PlayerId, now_unix: i64) -> Result<PlayerState, ServiceError> {
        self.with_player_lock(player_id, || {
            if self.store.load_player_state(player_id)?.is_some() {
                return Err(ServiceError::PlayerExists(player_id.clone()));
            }
            let state = PlayerState::new(player_id.clone(), now_unix);
            self.store.save_player_state(player_id, &state)?;
            tracing::info!(player = %player_id, "player created");
            Ok(state)
        })
    }

    /// Login/read path: the returned state is always reconciled to `now_unix`.
    pub fn view_player(&self, player_id: &PlayerId, now_unix: i64) -> Result<PlayerState, ServiceError> {
        self.with_player_lock(player_id, || {
            let state = self.reconcile_loaded(self.load(player_id)?, now_unix);
            self.store.save_player_state(player_id, &state)?;
            Ok(state)
        })
    }

    pub fn enqueue_action(
        &self,
        player_id: &PlayerId,
        request: &ActionRequest,
        now_unix: i64,
    ) -> Result<PlayerState, ServiceError> {
        self.with_player_lock(player_id, || {
            let state = self.reconcile_loaded(self.load(player_id)?, now_unix);
            match self.queue.enqueue(state.clone(), request, &self.catalog, now_unix) {
                Ok(next) => {
                    self.store.save_player_state(player_id, &next)?;
                    if let Some(entry) = next.queue.last() {
                        tracing::info!(
                            player = %player_id,
                            action = %request.action_name,
                            quantity = request.quantity,
                            start = entry.start_unix,
                            end = ?entry.end_unix,
                            "action queued"
                        );
                    }
                    Ok(next)
                }
                Err(err) => {
                    // keep the reconciliation even though the request was rejected
                    self.store.save_player_state(player_id, &state)?;
                    tracing::info!(player = %player_id, action = %request.action_name, %err, "enqueue rejected");
                    Err(err.into())
                }
            }
        })
    }

    /// Administrative replace of a player's stored state.
    pub fn overwrite_player(&self, player_id: &PlayerId, mut state: PlayerState) -> Result<PlayerState, ServiceError> {
        self.with_player_lock(player_id, || {
            state.id = player_id.clone();
            self.store.save_player_state(player_id, &state)?;
            tracing::info!(player = %player_id, "player state overwritten");
            Ok(state)
        })
    }

    pub fn list_players(&self) -> Result<Vec<PlayerId>, ServiceError> {
        Ok(self.store.list_player_ids()?)
    }
}

fn log_report(player_id: &PlayerId, report: &ReconcileReport) {
    if report.clock_skew {
        tracing::warn!(player = %player_id, "reconcile called with a time before the checkpoint");
    }
    for event in &report.events {
        match event {
            ReconcileEvent::Resolved { action_id, kind } => {
                tracing::debug!(player = %player_id, action = %action_id, %kind, "action resolved");
            }
            ReconcileEvent::DroppedUnknown { action_id } => {
                tracing::warn!(player = %player_id, action = %action_id, "dropped action of unknown kind");
            }
            ReconcileEvent::DroppedCompleted { action_id } => {
                tracing::debug!(player = %player_id, action = %action_id, "dropped entry already marked completed");
            }
            ReconcileEvent::RetainedMalformed { action_id } => {
                tracing::warn!(player = %player_id, action = %action_id, "malformed queue entry retained");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idle_core::{ActionPayload, ActionStatus};
    use tempfile::tempdir;

    fn service() -> GameService {
        GameService::new(Box::new(InMemoryStore::new()), default_catalog(), &Config::default())
    }

    #[test]
    fn create_then_duplicate_fails() {
        let svc = service();
        let id = PlayerId::from_str("alice");
        svc.create_player(&id, 100).unwrap();
        assert!(matches!(svc.create_player(&id, 200), Err(ServiceError::PlayerExists(_))));
    }

    #[test]
    fn view_unknown_player_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.view_player(&PlayerId::from_str("ghost"), 0),
            Err(ServiceError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn enqueue_then_view_credits_resources() {
        let svc = service();
        let id = PlayerId::from_str("alice");
        svc.create_player(&id, 1_000).unwrap();

        let s = svc.enqueue_action(&id, &ActionRequest::new("farm_wheat", 5), 1_000).unwrap();
        assert_eq!(s.queue[0].start_unix, 1_000);
        assert_eq!(s.queue[0].end_unix, Some(1_300));
        assert_eq!(s.queue[0].payload, ActionPayload::Farming { resource_type: "wheat".into(), amount: 25 });

        let s = svc.view_player(&id, 1_299).unwrap();
        assert_eq!(s.resource("wheat"), 0);
        let s = svc.view_player(&id, 1_300).unwrap();
        assert_eq!(s.resource("wheat"), 25);
        assert!(s.queue.is_empty());
        assert_eq!(s.checkpoint_unix, 1_300);
    }

    #[test]
    fn finished_entries_do_not_block_capacity() {
        let svc = service();
        let id = PlayerId::from_str("bob");
        svc.create_player(&id, 0).unwrap();
        for _ in 0..3 {
            svc.enqueue_action(&id, &ActionRequest::new("mine_iron", 1), 0).unwrap();
        }
        let err = svc.enqueue_action(&id, &ActionRequest::new("mine_iron", 1), 10).unwrap_err();
        assert!(matches!(err, ServiceError::Queue(QueueError::QueueFull { capacity: 3 })));

        // first entry ends at 30; reconciling during enqueue frees the slot
        let s = svc.enqueue_action(&id, &ActionRequest::new("mine_iron", 1), 30).unwrap();
        assert_eq!(s.resource("iron"), 10);
        assert_eq!(s.queue.len(), 3);
        assert_eq!(s.queue[2].start_unix, 90);
    }

    #[test]
    fn rejected_enqueue_still_persists_reconciliation() {
        let svc = service();
        let id = PlayerId::from_str("carol");
        svc.create_player(&id, 0).unwrap();
        svc.enqueue_action(&id, &ActionRequest::new("mine_iron", 1), 0).unwrap();

        let err = svc.enqueue_action(&id, &ActionRequest::new("mine_mithril", 1), 40).unwrap_err();
        assert!(matches!(err, ServiceError::Queue(QueueError::InvalidRequest(_))));

        let stored = svc.store.load_player_state(&id).unwrap().unwrap();
        assert_eq!(stored.resource("iron"), 10);
        assert_eq!(stored.checkpoint_unix, 40);
    }

    #[test]
    fn full_queue_rejection_leaves_stored_queue_untouched() {
        let svc = service();
        let id = PlayerId::from_str("cora");
        svc.create_player(&id, 0).unwrap();
        for name in ["mine_iron", "farm_wheat", "mine_stone"] {
            svc.enqueue_action(&id, &ActionRequest::new(name, 1), 0).unwrap();
        }
        let before = svc.store.load_player_state(&id).unwrap().unwrap();

        let err = svc.enqueue_action(&id, &ActionRequest::new("mine_iron", 1), 10).unwrap_err();
        assert!(matches!(err, ServiceError::Queue(QueueError::QueueFull { capacity: 3 })));

        let stored = svc.store.load_player_state(&id).unwrap().unwrap();
        assert_eq!(stored.queue, before.queue);
        assert_eq!(stored.checkpoint_unix, 10);
    }

    #[test]
    fn player_locks_are_released_after_each_call() {
        let svc = service();
        let id = PlayerId::from_str("gus");
        svc.create_player(&id, 0).unwrap();
        svc.enqueue_action(&id, &ActionRequest::new("mine_iron", 1), 0).unwrap();
        let _ = svc.enqueue_action(&id, &ActionRequest::new("nope", 1), 0);
        svc.view_player(&id, 5).unwrap();
        let _ = svc.view_player(&PlayerId::from_str("ghost"), 5);
        svc.overwrite_player(&id, PlayerState::new(id.clone(), 5)).unwrap();

        assert!(svc.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn overwrite_replaces_state() {
        let svc = service();
        let id = PlayerId::from_str("dave");
        svc.create_player(&id, 0).unwrap();
        let mut replacement = PlayerState::new(PlayerId::from_str("ignored"), 50);
        replacement.resources.insert("gold".into(), 9);
        svc.overwrite_player(&id, replacement).unwrap();

        let s = svc.view_player(&id, 60).unwrap();
        assert_eq!(s.id, id);
        assert_eq!(s.resource("gold"), 9);
        assert_eq!(svc.list_players().unwrap(), vec![id]);
    }

    #[test]
    fn concurrent_views_never_double_credit() {
        let svc = Arc::new(service());
        let id = PlayerId::from_str("erin");
        svc.create_player(&id, 0).unwrap();
        svc.enqueue_action(&id, &ActionRequest::new("mine_iron", 1), 0).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let svc = Arc::clone(&svc);
                let id = id.clone();
                std::thread::spawn(move || svc.view_player(&id, 100).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert!(svc.locks.lock().unwrap().is_empty());
        let s = svc.view_player(&id, 100).unwrap();
        assert_eq!(s.resource("iron"), 10);
        assert!(s.queue.iter().all(|a| a.status == ActionStatus::Pending));
    }

    #[test]
    fn open_writes_default_config_and_uses_sqlite() {
        let dir = tempdir().unwrap();
        GameService::init_project(dir.path()).unwrap();
        assert!(Config::config_path(dir.path()).exists());
        assert!(dir.path().join(".idle").join("catalog.yaml").exists());

        let id = PlayerId::from_str("frank");
        {
            let svc = GameService::open(dir.path().to_path_buf()).unwrap();
            svc.create_player(&id, 0).unwrap();
            svc.enqueue_action(&id, &ActionRequest::new("raise_chickens", 2), 0).unwrap();
        }
        let svc = GameService::open(dir.path().to_path_buf()).unwrap();
        let s = svc.view_player(&id, 240).unwrap();
        assert_eq!(s.resource("egg"), 12);
    }
}
