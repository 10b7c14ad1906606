use crate::{ActionPayload, ActionStatus, PlayerState, QueuedAction, ReconcileEvent, ReconcileReport};

/// Advance `state` to `now_unix`, resolving every queued action that has finished.
///
/// Walks the queue from the head:
/// - entries already marked `Completed` are dropped without applying anything again
/// - malformed entries (no end time, end <= start, or an unreadable payload) are kept and skipped over
/// - finished entries (end <= now) are applied to the ledger/buildings and removed
/// - the first unfinished entry stops the scan; it and everything behind it stay as-is
///
/// A `now_unix` earlier than the checkpoint is clock skew: nothing is resolved and the
/// checkpoint is left where it was.
pub fn reconcile(state: PlayerState, now_unix: i64) -> PlayerState {
    reconcile_with_report(state, now_unix).0
}

pub fn reconcile_with_report(mut state: PlayerState, now_unix: i64) -> (PlayerState, ReconcileReport) {
    let mut report = ReconcileReport {
        elapsed_secs: now_unix.saturating_sub(state.checkpoint_unix).max(0),
        clock_skew: now_unix < state.checkpoint_unix,
        events: vec![],
    };

    if report.clock_skew {
        return (state, report);
    }

    let queue = std::mem::take(&mut state.queue);
    let mut retained = Vec::with_capacity(queue.len());
    let mut entries = queue.into_iter();

    while let Some(action) = entries.next() {
        if action.status == ActionStatus::Completed {
            report.events.push(ReconcileEvent::DroppedCompleted { action_id: action.id });
            continue;
        }
        let end = action.well_formed_end().filter(|_| !action.payload.is_malformed());
        let Some(end) = end else {
            report.events.push(ReconcileEvent::RetainedMalformed { action_id: action.id.clone() });
            retained.push(action);
            continue;
        };
        if end > now_unix {
            retained.push(action);
            retained.extend(entries.by_ref());
            break;
        }
        report.events.push(resolve(&mut state, action));
    }

    state.queue = retained;
    state.checkpoint_unix = state.checkpoint_unix.max(now_unix);
    (state, report)
}

/// Apply a finished action's effect. The action is consumed; completed entries are never kept.
fn resolve(state: &mut PlayerState, action: QueuedAction) -> ReconcileEvent {
    let kind = action.payload.kind();
    match action.payload {
        ActionPayload::Mining { resource_type, amount } | ActionPayload::Farming { resource_type, amount } => {
            credit(state, resource_type, amount);
        }
        ActionPayload::AnimalHusbandry { product_type, amount, .. } => {
            credit(state, product_type, amount);
        }
        ActionPayload::BuildingUpgrade { building_id, target_level } => {
            state.buildings.entry(building_id).or_default().level = target_level;
        }
        // Malformed payloads never get here; the scan retains them.
        ActionPayload::Unknown { .. } | ActionPayload::Malformed { .. } => {
            return ReconcileEvent::DroppedUnknown { action_id: action.id };
        }
    }
    ReconcileEvent::Resolved { action_id: action.id, kind }
}

fn credit(state: &mut PlayerState, resource: String, amount: u64) {
    let total = state.resources.entry(resource).or_insert(0);
    *total = total.saturating_add(amount);
}
