use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{ids::*, model::*};

/// Resource name -> accumulated quantity.
pub type ResourceLedger = BTreeMap<String, u64>;

/// Building id -> building record.
pub type BuildingSet = BTreeMap<String, BuildingRecord>;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildingRecord {
    pub level: u32,
}

/// Kind-specific effect of a queued action.
///
/// Payloads that cannot be read into a known kind keep their stored JSON text in `raw`,
/// so they are written back exactly as they were loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionPayload {
    Mining { resource_type: String, amount: u64 },
    Farming { resource_type: String, amount: u64 },
    AnimalHusbandry { animal_type: String, product_type: String, amount: u64 },
    BuildingUpgrade { building_id: String, target_level: u32 },
    /// A kind this build does not know. Dropped without credit once finished.
    Unknown { kind: String, raw: String },
    /// A known kind with unreadable fields, or no kind at all. Never resolved.
    Malformed { kind: Option<String>, raw: String },
}

/// Wire form of the readable kinds.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum KnownPayload {
    Mining { resource_type: String, amount: u64 },
    Farming { resource_type: String, amount: u64 },
    AnimalHusbandry { animal_type: String, product_type: String, amount: u64 },
    BuildingUpgrade { building_id: String, target_level: u32 },
}

const KNOWN_KINDS: [&str; 4] = ["mining", "farming", "animal_husbandry", "building_upgrade"];

impl From<KnownPayload> for ActionPayload {
    fn from(known: KnownPayload) -> Self {
        match known {
            KnownPayload::Mining { resource_type, amount } => ActionPayload::Mining { resource_type, amount },
            KnownPayload::Farming { resource_type, amount } => ActionPayload::Farming { resource_type, amount },
            KnownPayload::AnimalHusbandry { animal_type, product_type, amount } => {
                ActionPayload::AnimalHusbandry { animal_type, product_type, amount }
            }
            KnownPayload::BuildingUpgrade { building_id, target_level } => {
                ActionPayload::BuildingUpgrade { building_id, target_level }
            }
        }
    }
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::Mining { .. } => ActionKind::Mining,
            ActionPayload::Farming { .. } => ActionKind::Farming,
            ActionPayload::AnimalHusbandry { .. } => ActionKind::AnimalHusbandry,
            ActionPayload::BuildingUpgrade { .. } => ActionKind::BuildingUpgrade,
            ActionPayload::Unknown { .. } => ActionKind::Unknown,
            ActionPayload::Malformed { .. } => ActionKind::Malformed,
        }
    }

    /// Kind name as stored, including kinds this build does not know.
    pub fn kind_name(&self) -> &str {
        match self {
            ActionPayload::Unknown { kind, .. } => kind,
            ActionPayload::Malformed { kind, .. } => kind.as_deref().unwrap_or(ActionKind::Malformed.as_str()),
            other => other.kind().as_str(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, ActionPayload::Malformed { .. })
    }

    /// Parse stored JSON text. Never fails: unreadable text becomes `Malformed` with `raw` kept verbatim.
    pub fn from_json_str(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => Self::from_value(value, raw.to_string()),
            Err(_) => ActionPayload::Malformed { kind: None, raw: raw.to_string() },
        }
    }

    /// JSON text to store. Unknown and malformed payloads return their original text.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        match self.to_known() {
            Some(known) => serde_json::to_string(&known),
            None => Ok(self.raw().unwrap_or_default().to_string()),
        }
    }

    fn raw(&self) -> Option<&str> {
        match self {
            ActionPayload::Unknown { raw, .. } | ActionPayload::Malformed { raw, .. } => Some(raw),
            _ => None,
        }
    }

    fn from_value(value: serde_json::Value, raw: String) -> Self {
        let kind = value.get("kind").and_then(serde_json::Value::as_str).map(str::to_string);
        match kind {
            Some(kind) if KNOWN_KINDS.contains(&kind.as_str()) => match serde_json::from_value::<KnownPayload>(value) {
                Ok(known) => known.into(),
                Err(_) => ActionPayload::Malformed { kind: Some(kind), raw },
            },
            Some(kind) => ActionPayload::Unknown { kind, raw },
            None => ActionPayload::Malformed { kind: None, raw },
        }
    }

    fn to_known(&self) -> Option<KnownPayload> {
        Some(match self.clone() {
            ActionPayload::Mining { resource_type, amount } => KnownPayload::Mining { resource_type, amount },
            ActionPayload::Farming { resource_type, amount } => KnownPayload::Farming { resource_type, amount },
            ActionPayload::AnimalHusbandry { animal_type, product_type, amount } => {
                KnownPayload::AnimalHusbandry { animal_type, product_type, amount }
            }
            ActionPayload::BuildingUpgrade { building_id, target_level } => {
                KnownPayload::BuildingUpgrade { building_id, target_level }
            }
            ActionPayload::Unknown { .. } | ActionPayload::Malformed { .. } => return None,
        })
    }
}

impl Serialize for ActionPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(known) = self.to_known() {
            return known.serialize(serializer);
        }
        let raw = self.raw().unwrap_or_default();
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => value.serialize(serializer),
            Err(_) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for ActionPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let raw = value.to_string();
        Ok(Self::from_value(value, raw))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuedAction {
    pub id: ActionId,
    pub payload: ActionPayload,
    pub start_unix: i64,
    /// `None` only for entries that were persisted without an end time.
    #[serde(default)]
    pub end_unix: Option<i64>,
    #[serde(default)]
    pub status: ActionStatus,
}

impl QueuedAction {
    /// End time, if the entry carries one that lies strictly after its start.
    pub fn well_formed_end(&self) -> Option<i64> {
        self.end_unix.filter(|end| *end > self.start_unix)
    }

    pub fn is_well_formed(&self) -> bool {
        self.well_formed_end().is_some()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerState {
    pub id: PlayerId,
    #[serde(default)]
    pub resources: ResourceLedger,
    #[serde(default)]
    pub buildings: BuildingSet,
    #[serde(default)]
    pub queue: Vec<QueuedAction>,
    pub checkpoint_unix: i64,
}

impl PlayerState {
    pub fn new(id: PlayerId, now_unix: i64) -> Self {
        Self {
            id,
            resources: ResourceLedger::new(),
            buildings: BuildingSet::new(),
            queue: vec![],
            checkpoint_unix: now_unix,
        }
    }

    pub fn resource(&self, name: &str) -> u64 {
        self.resources.get(name).copied().unwrap_or(0)
    }

    pub fn building_level(&self, building_id: &str) -> u32 {
        self.buildings.get(building_id).map(|b| b.level).unwrap_or(0)
    }
}
