use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use idle_core::{ActionCatalog, ActionDefinition, OutputTemplate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogFile {
    #[serde(default = "default_version")]
    pub version: u32,
    pub actions: Vec<ActionDefinition>,
}

fn default_version() -> u32 {
    1
}

pub fn load_catalog(path: &Path) -> Result<CatalogFile> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read catalog: {}", path.display()))?;
    let file: CatalogFile = serde_yaml::from_str(&s).with_context(|| "parse catalog yaml")?;
    validate_catalog(&file)?;
    Ok(file)
}

pub fn save_catalog(file: &CatalogFile, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let s = serde_yaml::to_string(file).with_context(|| "serialize catalog yaml")?;
    std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn validate_catalog(file: &CatalogFile) -> Result<()> {
    if file.actions.is_empty() {
        return Err(anyhow!("catalog must define at least one action"));
    }
    let mut seen = HashSet::new();
    for def in &file.actions {
        let name = def.name.trim();
        if name.is_empty() {
            return Err(anyhow!("catalog action with empty name"));
        }
        if !seen.insert(name) {
            return Err(anyhow!("duplicate catalog action: {name}"));
        }
        if def.unit_time_secs == 0 {
            return Err(anyhow!("action {name}: unit_time_secs must be positive"));
        }
        match &def.output {
            OutputTemplate::Mining { resource_type, amount_per_unit }
            | OutputTemplate::Farming { resource_type, amount_per_unit } => {
                require_named(name, "resource_type", resource_type)?;
                require_amount(name, *amount_per_unit)?;
            }
            OutputTemplate::AnimalHusbandry { animal_type, product_type, amount_per_unit } => {
                require_named(name, "animal_type", animal_type)?;
                require_named(name, "product_type", product_type)?;
                require_amount(name, *amount_per_unit)?;
            }
            OutputTemplate::BuildingUpgrade { building_id, levels_per_unit } => {
                require_named(name, "building_id", building_id)?;
                if *levels_per_unit == 0 {
                    return Err(anyhow!("action {name}: levels_per_unit must be positive"));
                }
            }
        }
    }
    Ok(())
}

fn require_named(action: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("action {action}: {field} must not be empty"));
    }
    Ok(())
}

fn require_amount(action: &str, amount: u64) -> Result<()> {
    if amount == 0 {
        return Err(anyhow!("action {action}: amount_per_unit must be positive"));
    }
    Ok(())
}

pub fn canonical_json(file: &CatalogFile) -> Result<serde_json::Value> {
    let v = serde_json::to_value(file).with_context(|| "catalog to json")?;
    Ok(sort_json(v))
}

/// Recursively sort object keys for stable hashing.
fn sort_json(v: serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new_map = serde_json::Map::new();
            for k in keys {
                let child = map.get(&k).cloned().unwrap_or(serde_json::Value::Null);
                new_map.insert(k, sort_json(child));
            }
            serde_json::Value::Object(new_map)
        }
        serde_json::Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(sort_json).collect()),
        other => other,
    }
}

/// Sha256 hex over the key-sorted JSON form; identifies which catalog a process runs with.
pub fn catalog_hash(file: &CatalogFile) -> Result<String> {
    let bytes = serde_json::to_vec(&canonical_json(file)?)?;
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Immutable, name-indexed catalog.
#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    defs: HashMap<String, ActionDefinition>,
    hash: String,
}

impl StaticCatalog {
    pub fn from_file(file: CatalogFile) -> Result<Self> {
        validate_catalog(&file)?;
        let hash = catalog_hash(&file)?;
        let defs = file.actions.into_iter().map(|d| (d.name.trim().to_string(), d)).collect();
        Ok(Self { defs, hash })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_file(load_catalog(path)?)
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Definitions sorted by name.
    pub fn definitions(&self) -> Vec<&ActionDefinition> {
        let mut defs: Vec<_> = self.defs.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

impl ActionCatalog for StaticCatalog {
    fn lookup(&self, action_name: &str) -> Option<&ActionDefinition> {
        self.defs.get(action_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_catalog_file;
    use tempfile::tempdir;

    const YAML: &str = r#"
version: 2
actions:
  - name: mine_copper
    unit_time_secs: 45
    output:
      kind: mining
      resource_type: copper
      amount_per_unit: 8
  - name: build_barn
    unit_time_secs: 600
    output:
      kind: building_upgrade
      building_id: barn
"#;

    #[test]
    fn parses_yaml_with_defaults() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("catalog.yaml");
        std::fs::write(&p, YAML).unwrap();

        let cat = StaticCatalog::load(&p).unwrap();
        assert_eq!(cat.len(), 2);
        let barn = cat.lookup("build_barn").unwrap();
        assert_eq!(barn.output, OutputTemplate::BuildingUpgrade { building_id: "barn".into(), levels_per_unit: 1 });
        assert_eq!(cat.lookup("mine_copper").unwrap().unit_time_secs, 45);
        assert!(cat.lookup("mine_gold").is_none());
    }

    #[test]
    fn hash_is_stable() {
        let f = default_catalog_file();
        let h1 = catalog_hash(&f).unwrap();
        let h2 = catalog_hash(&f.clone()).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn save_then_load_keeps_hash() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("nested").join("catalog.yaml");
        let f = default_catalog_file();
        save_catalog(&f, &p).unwrap();
        let loaded = load_catalog(&p).unwrap();
        assert_eq!(catalog_hash(&loaded).unwrap(), catalog_hash(&f).unwrap());
    }

    #[test]
    fn rejects_duplicates_and_zero_times() {
        let mut f = default_catalog_file();
        let first = f.actions[0].clone();
        f.actions.push(first);
        assert!(validate_catalog(&f).is_err());

        let mut f = default_catalog_file();
        f.actions[0].unit_time_secs = 0;
        assert!(validate_catalog(&f).is_err());
    }

    #[test]
    fn rejects_zero_amounts_and_empty_names() {
        let f = CatalogFile {
            version: 1,
            actions: vec![ActionDefinition {
                name: "mine".into(),
                unit_time_secs: 1,
                output: OutputTemplate::Mining { resource_type: "iron".into(), amount_per_unit: 0 },
            }],
        };
        assert!(validate_catalog(&f).is_err());

        let f = CatalogFile {
            version: 1,
            actions: vec![ActionDefinition {
                name: " ".into(),
                unit_time_secs: 1,
                output: OutputTemplate::Mining { resource_type: "iron".into(), amount_per_unit: 1 },
            }],
        };
        assert!(validate_catalog(&f).is_err());
    }

    #[test]
    fn empty_catalog_is_invalid() {
        assert!(validate_catalog(&CatalogFile { version: 1, actions: vec![] }).is_err());
    }
}
