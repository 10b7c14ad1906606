use serde::{Deserialize, Serialize};

use crate::{model::ActionKind, types::ActionPayload};

/// What one unit of an action produces. Amounts are scaled by the requested quantity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputTemplate {
    Mining { resource_type: String, amount_per_unit: u64 },
    Farming { resource_type: String, amount_per_unit: u64 },
    AnimalHusbandry { animal_type: String, product_type: String, amount_per_unit: u64 },
    BuildingUpgrade {
        building_id: String,
        #[serde(default = "one_level")]
        levels_per_unit: u32,
    },
}

fn one_level() -> u32 {
    1
}

impl OutputTemplate {
    pub fn kind(&self) -> ActionKind {
        match self {
            OutputTemplate::Mining { .. } => ActionKind::Mining,
            OutputTemplate::Farming { .. } => ActionKind::Farming,
            OutputTemplate::AnimalHusbandry { .. } => ActionKind::AnimalHusbandry,
            OutputTemplate::BuildingUpgrade { .. } => ActionKind::BuildingUpgrade,
        }
    }

    /// Payload for a production batch of `quantity` units. `None` on overflow and for
    /// building upgrades, which depend on the player's current level.
    pub fn production_payload(&self, quantity: u64) -> Option<ActionPayload> {
        match self {
            OutputTemplate::Mining { resource_type, amount_per_unit } => Some(ActionPayload::Mining {
                resource_type: resource_type.clone(),
                amount: amount_per_unit.checked_mul(quantity)?,
            }),
            OutputTemplate::Farming { resource_type, amount_per_unit } => Some(ActionPayload::Farming {
                resource_type: resource_type.clone(),
                amount: amount_per_unit.checked_mul(quantity)?,
            }),
            OutputTemplate::AnimalHusbandry { animal_type, product_type, amount_per_unit } => {
                Some(ActionPayload::AnimalHusbandry {
                    animal_type: animal_type.clone(),
                    product_type: product_type.clone(),
                    amount: amount_per_unit.checked_mul(quantity)?,
                })
            }
            OutputTemplate::BuildingUpgrade { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionDefinition {
    pub name: String,
    pub unit_time_secs: u64,
    pub output: OutputTemplate,
}

/// Lookup of action definitions by name. Owned by the caller, not by the queue.
pub trait ActionCatalog: Send + Sync {
    fn lookup(&self, action_name: &str) -> Option<&ActionDefinition>;
}
