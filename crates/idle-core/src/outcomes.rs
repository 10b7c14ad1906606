use crate::{ids::*, model::*};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileEvent {
    Resolved { action_id: ActionId, kind: ActionKind },
    DroppedUnknown { action_id: ActionId },
    /// Entry was already marked completed; removed without applying it again.
    DroppedCompleted { action_id: ActionId },
    RetainedMalformed { action_id: ActionId },
}

/// Diagnostics produced alongside a reconciled state. Carries no state of its own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub elapsed_secs: i64,
    pub clock_skew: bool,
    pub events: Vec<ReconcileEvent>,
}

impl ReconcileReport {
    pub fn resolved_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ReconcileEvent::Resolved { .. } | ReconcileEvent::DroppedUnknown { .. }))
            .count()
    }

    pub fn malformed_count(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, ReconcileEvent::RetainedMalformed { .. })).count()
    }
}
