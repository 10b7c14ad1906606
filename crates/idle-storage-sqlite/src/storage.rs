use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use idle_core::{ActionId, ActionPayload, ActionStatus, PlayerId, PlayerState, QueuedAction};
use idle_storage::PlayerStore;
use rusqlite::{params, Connection, OptionalExtension};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(db_path).with_context(|| format!("open sqlite db {}", db_path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("open in-memory sqlite db")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        // init schema
        let init_sql = include_str!("../migrations/0001_init.sql");
        conn.execute_batch(init_sql)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn status_to_str(s: &ActionStatus) -> &'static str {
        match s {
            ActionStatus::Pending => "pending",
            ActionStatus::Completed => "completed",
        }
    }

    fn str_to_status(s: &str) -> ActionStatus {
        match s {
            "completed" => ActionStatus::Completed,
            _ => ActionStatus::Pending,
        }
    }

    fn load_queue(conn: &Connection, player_id: &PlayerId) -> Result<Vec<QueuedAction>> {
        let mut stmt = conn.prepare(
            "SELECT id, payload_json, start_at, end_at, status
             FROM queued_actions WHERE player_id=?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![player_id.0], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, i64>(2)?,
                r.get::<_, Option<i64>>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?;

        let mut queue = vec![];
        for row in rows {
            let (id, payload_json, start_at, end_at, status) = row?;
            // Unreadable payloads keep their stored text and are written back as-is.
            let payload = ActionPayload::from_json_str(&payload_json);
            if payload.is_malformed() {
                tracing::warn!(player = %player_id, action = %id, kind = payload.kind_name(), "unreadable queued action payload");
            }
            queue.push(QueuedAction {
                id: ActionId::from_str(id),
                payload,
                start_unix: start_at,
                end_unix: end_at,
                status: Self::str_to_status(&status),
            });
        }
        Ok(queue)
    }
}

impl PlayerStore for SqliteStore {
    fn load_player_state(&self, player_id: &PlayerId) -> Result<Option<PlayerState>> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                "SELECT checkpoint_at, resources_json, buildings_json FROM players WHERE id=?1",
                params![player_id.0],
                |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?)),
            )
            .optional()?;
        let Some((checkpoint_unix, resources_json, buildings_json)) = row else {
            return Ok(None);
        };

        let resources = serde_json::from_str(&resources_json)
            .with_context(|| format!("parse resources for player {}", player_id))?;
        let buildings = serde_json::from_str(&buildings_json)
            .with_context(|| format!("parse buildings for player {}", player_id))?;
        let queue = Self::load_queue(&conn, player_id)?;

        Ok(Some(PlayerState { id: player_id.clone(), resources, buildings, queue, checkpoint_unix }))
    }

    fn save_player_state(&self, player_id: &PlayerId, state: &PlayerState) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let resources_json = serde_json::to_string(&state.resources)?;
        let buildings_json = serde_json::to_string(&state.buildings)?;

        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO players(id, checkpoint_at, resources_json, buildings_json, updated_at)
             VALUES (?1, ?2, ?3, ?4, CAST(strftime('%s','now') AS INTEGER))
             ON CONFLICT(id) DO UPDATE SET
               checkpoint_at=excluded.checkpoint_at,
               resources_json=excluded.resources_json,
               buildings_json=excluded.buildings_json,
               updated_at=excluded.updated_at",
            params![player_id.0, state.checkpoint_unix, resources_json, buildings_json],
        )?;
        tx.execute("DELETE FROM queued_actions WHERE player_id=?1", params![player_id.0])?;
        for (position, action) in state.queue.iter().enumerate() {
            tx.execute(
                "INSERT INTO queued_actions(id, player_id, position, kind, payload_json, start_at, end_at, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    action.id.0,
                    player_id.0,
                    position as i64,
                    action.payload.kind_name(),
                    action.payload.to_json_string()?,
                    action.start_unix,
                    action.end_unix,
                    Self::status_to_str(&action.status)
                ],
            )?;
        }
        tx.commit()?;
        tracing::debug!(player = %player_id, queued = state.queue.len(), "saved player state");
        Ok(())
    }

    fn list_player_ids(&self) -> Result<Vec<PlayerId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT id FROM players ORDER BY id")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut ids = vec![];
        for row in rows {
            ids.push(PlayerId::from_str(row?));
        }
        Ok(ids)
    }
}
