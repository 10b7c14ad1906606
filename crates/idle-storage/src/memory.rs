use std::collections::HashMap;
use std::sync::Mutex;

use idle_core::{PlayerId, PlayerState};

use crate::traits::PlayerStore;

/// In-memory storage for tests and single-process runs. Not durable.
#[derive(Default)]
pub struct InMemoryStore {
    players: Mutex<HashMap<PlayerId, PlayerState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlayerStore for InMemoryStore {
    fn load_player_state(&self, player_id: &PlayerId) -> anyhow::Result<Option<PlayerState>> {
        let players = self.players.lock().unwrap();
        Ok(players.get(player_id).cloned())
    }

    fn save_player_state(&self, player_id: &PlayerId, state: &PlayerState) -> anyhow::Result<()> {
        let mut players = self.players.lock().unwrap();
        players.insert(player_id.clone(), state.clone());
        Ok(())
    }

    fn list_player_ids(&self) -> anyhow::Result<Vec<PlayerId>> {
        let players = self.players.lock().unwrap();
        let mut ids: Vec<_> = players.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
