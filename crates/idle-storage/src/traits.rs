use idle_core::{PlayerId, PlayerState};

/// Persistence collaborator. Owns player state between requests; the core never calls it.
pub trait PlayerStore: Send + Sync {
    /// `Ok(None)` when the player does not exist.
    fn load_player_state(&self, player_id: &PlayerId) -> anyhow::Result<Option<PlayerState>>;

    /// Insert or replace the stored state for `player_id`.
    fn save_player_state(&self, player_id: &PlayerId, state: &PlayerState) -> anyhow::Result<()>;

    fn list_player_ids(&self) -> anyhow::Result<Vec<PlayerId>>;
}
