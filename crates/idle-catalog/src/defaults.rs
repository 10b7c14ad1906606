use idle_core::{ActionDefinition, OutputTemplate};

use crate::{CatalogFile, StaticCatalog};

fn production(name: &str, unit_time_secs: u64, output: OutputTemplate) -> ActionDefinition {
    ActionDefinition { name: name.to_string(), unit_time_secs, output }
}

/// Built-in starter catalog, written to disk on `idle init`.
pub fn default_catalog_file() -> CatalogFile {
    CatalogFile {
        version: 1,
        actions: vec![
            production(
                "mine_iron",
                30,
                OutputTemplate::Mining { resource_type: "iron".into(), amount_per_unit: 10 },
            ),
            production(
                "mine_stone",
                20,
                OutputTemplate::Mining { resource_type: "stone".into(), amount_per_unit: 15 },
            ),
            production(
                "farm_wheat",
                60,
                OutputTemplate::Farming { resource_type: "wheat".into(), amount_per_unit: 5 },
            ),
            production(
                "raise_chickens",
                120,
                OutputTemplate::AnimalHusbandry {
                    animal_type: "chicken".into(),
                    product_type: "egg".into(),
                    amount_per_unit: 6,
                },
            ),
            production(
                "shear_sheep",
                300,
                OutputTemplate::AnimalHusbandry {
                    animal_type: "sheep".into(),
                    product_type: "wool".into(),
                    amount_per_unit: 2,
                },
            ),
            production(
                "upgrade_farm",
                900,
                OutputTemplate::BuildingUpgrade { building_id: "farm".into(), levels_per_unit: 1 },
            ),
            production(
                "upgrade_mine",
                900,
                OutputTemplate::BuildingUpgrade { building_id: "mine".into(), levels_per_unit: 1 },
            ),
        ],
    }
}

pub fn default_catalog() -> StaticCatalog {
    StaticCatalog::from_file(default_catalog_file()).expect("built-in catalog is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use idle_core::ActionCatalog;

    #[test]
    fn built_in_catalog_validates() {
        let cat = default_catalog();
        assert_eq!(cat.len(), 7);
        assert_eq!(cat.lookup("farm_wheat").unwrap().unit_time_secs, 60);
    }
}
