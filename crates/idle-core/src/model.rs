use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ActionStatus {
    #[default]
    Pending,
    Completed,
}

/// Discriminant of [`crate::ActionPayload`], used for reporting and storage columns.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Mining,
    Farming,
    AnimalHusbandry,
    BuildingUpgrade,
    Unknown,
    Malformed,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Mining => "mining",
            ActionKind::Farming => "farming",
            ActionKind::AnimalHusbandry => "animal_husbandry",
            ActionKind::BuildingUpgrade => "building_upgrade",
            ActionKind::Unknown => "unknown",
            ActionKind::Malformed => "malformed",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
