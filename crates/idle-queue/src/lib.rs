use idle_core::{
    ActionCatalog, ActionDefinition, ActionId, ActionPayload, ActionStatus, OutputTemplate, PlayerState, QueuedAction,
};

pub const DEFAULT_MAX_QUEUE_SIZE: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionRequest {
    pub action_name: String,
    pub quantity: u64,
}

impl ActionRequest {
    pub fn new(action_name: impl Into<String>, quantity: u64) -> Self {
        Self { action_name: action_name.into(), quantity }
    }
}

/// Rejections leave the state untouched; they are returned instead of a new state.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("action queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },
}

/// Appends batches to a player's action queue, chaining each onto the current tail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueManager {
    pub max_queue_size: usize,
}

impl Default for QueueManager {
    fn default() -> Self {
        Self { max_queue_size: DEFAULT_MAX_QUEUE_SIZE }
    }
}

impl QueueManager {
    pub fn new(max_queue_size: usize) -> Self {
        Self { max_queue_size }
    }

    /// Queue one entry covering the whole batch. Callers reconcile first so finished
    /// entries do not count against capacity.
    pub fn enqueue(
        &self,
        mut state: PlayerState,
        request: &ActionRequest,
        catalog: &dyn ActionCatalog,
        now_unix: i64,
    ) -> Result<PlayerState, QueueError> {
        if request.quantity == 0 {
            return Err(QueueError::InvalidRequest("quantity must be positive".into()));
        }
        let def = catalog
            .lookup(&request.action_name)
            .ok_or_else(|| QueueError::InvalidRequest(format!("unknown action: {}", request.action_name)))?;

        if state.queue.len() >= self.max_queue_size {
            return Err(QueueError::QueueFull { capacity: self.max_queue_size });
        }

        let payload = build_payload(def, &state, request.quantity)?;
        let start_unix = next_start(&state.queue, now_unix);
        let duration = def
            .unit_time_secs
            .checked_mul(request.quantity)
            .and_then(|d| i64::try_from(d).ok())
            .filter(|d| *d > 0)
            .ok_or_else(|| QueueError::InvalidRequest(format!("bad duration for {}", def.name)))?;
        let end_unix = start_unix
            .checked_add(duration)
            .ok_or_else(|| QueueError::InvalidRequest("end time out of range".into()))?;

        state.queue.push(QueuedAction {
            id: ActionId::new(),
            payload,
            start_unix,
            end_unix: Some(end_unix),
            status: ActionStatus::Pending,
        });
        Ok(state)
    }
}

/// [`QueueManager::enqueue`] with the default capacity.
pub fn enqueue(
    state: PlayerState,
    request: &ActionRequest,
    catalog: &dyn ActionCatalog,
    now_unix: i64,
) -> Result<PlayerState, QueueError> {
    QueueManager::default().enqueue(state, request, catalog, now_unix)
}

/// Stored end of the tail; a malformed tail falls back to the latest well-formed end.
fn next_start(queue: &[QueuedAction], now_unix: i64) -> i64 {
    match queue.last() {
        None => now_unix,
        Some(tail) => tail
            .well_formed_end()
            .or_else(|| queue.iter().filter_map(QueuedAction::well_formed_end).max())
            .unwrap_or(now_unix),
    }
}

fn build_payload(def: &ActionDefinition, state: &PlayerState, quantity: u64) -> Result<ActionPayload, QueueError> {
    match &def.output {
        OutputTemplate::BuildingUpgrade { building_id, levels_per_unit } => {
            let base = pending_level(state, building_id);
            let target_level = u32::try_from(quantity)
                .ok()
                .and_then(|q| q.checked_mul(*levels_per_unit))
                .and_then(|levels| base.checked_add(levels))
                .ok_or_else(|| QueueError::InvalidRequest(format!("upgrade level out of range for {building_id}")))?;
            Ok(ActionPayload::BuildingUpgrade { building_id: building_id.clone(), target_level })
        }
        template => template
            .production_payload(quantity)
            .ok_or_else(|| QueueError::InvalidRequest(format!("output amount out of range for {}", def.name))),
    }
}

/// Level the building will have once every queued upgrade for it has finished.
fn pending_level(state: &PlayerState, building_id: &str) -> u32 {
    state
        .queue
        .iter()
        .filter_map(|a| match &a.payload {
            ActionPayload::BuildingUpgrade { building_id: b, target_level } if b == building_id => Some(*target_level),
            _ => None,
        })
        .fold(state.building_level(building_id), u32::max)
}
