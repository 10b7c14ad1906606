use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use idle_catalog::{default_catalog, StaticCatalog};
use idle_core::{PlayerId, PlayerState};
use idle_queue::{ActionRequest, QueueError};
use idle_storage::InMemoryStore;
use serde::Deserialize;

use crate::{Config, GameService, ServiceError};

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub scenario_id: String,
    #[serde(default = "default_player")]
    pub player: String,
    pub start_unix: i64,
    #[serde(default)]
    pub max_queue_size: Option<usize>,
    pub steps: Vec<ScenarioStep>,
    pub expect: ScenarioExpected,
}

fn default_player() -> String {
    "player-1".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScenarioStep {
    Enqueue {
        at: i64,
        action: String,
        quantity: u64,
        #[serde(default)]
        expect_error: Option<String>,
    },
    View {
        at: i64,
    },
}

#[derive(Debug, Deserialize)]
pub struct ScenarioExpected {
    #[serde(default)]
    pub resources: BTreeMap<String, u64>,
    #[serde(default)]
    pub buildings: BTreeMap<String, u32>,
    pub queue_len: usize,
    #[serde(default)]
    pub checkpoint_unix: Option<i64>,
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub final_state: PlayerState,
    /// Error codes of rejected enqueue steps, in step order.
    pub rejections: Vec<String>,
}

pub fn load_scenario(dir: &Path) -> Result<Scenario> {
    let p = dir.join("scenario.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read scenario.yaml: {}", p.display()))?;
    let sc: Scenario = serde_yaml::from_str(&s).with_context(|| "parse scenario.yaml")?;
    Ok(sc)
}

/// Replay a fixture timeline against an in-memory store.
///
/// Uses `catalog.yaml` from the scenario directory when present, else the built-in catalog.
/// Fails if an enqueue step's outcome differs from its `expect_error`.
pub fn simulate(dir: &Path) -> Result<ScenarioResult> {
    let sc = load_scenario(dir)?;
    let catalog_path = dir.join("catalog.yaml");
    let catalog = if catalog_path.exists() { StaticCatalog::load(&catalog_path)? } else { default_catalog() };

    let mut cfg = Config::default();
    if let Some(size) = sc.max_queue_size {
        cfg.game.max_queue_size = size;
    }
    let svc = GameService::new(Box::new(InMemoryStore::new()), catalog, &cfg);
    let player = PlayerId::from_str(sc.player.clone());
    svc.create_player(&player, sc.start_unix)?;

    let mut rejections = vec![];
    for (i, step) in sc.steps.iter().enumerate() {
        match step {
            ScenarioStep::Enqueue { at, action, quantity, expect_error } => {
                let res = svc.enqueue_action(&player, &ActionRequest::new(action.clone(), *quantity), *at);
                let code = match res {
                    Ok(_) => None,
                    Err(ServiceError::Queue(err)) => Some(error_code(&err).to_string()),
                    Err(other) => return Err(anyhow!("{}: step {i}: {other}", sc.scenario_id)),
                };
                if code != *expect_error {
                    return Err(anyhow!(
                        "{}: step {i}: expected {:?}, got {:?}",
                        sc.scenario_id,
                        expect_error,
                        code
                    ));
                }
                rejections.extend(code);
            }
            ScenarioStep::View { at } => {
                svc.view_player(&player, *at)?;
            }
        }
    }

    let final_state = svc
        .store
        .load_player_state(&player)?
        .ok_or_else(|| anyhow!("{}: player vanished", sc.scenario_id))?;
    Ok(ScenarioResult { final_state, rejections })
}

/// Check a result against the scenario's `expect` block.
pub fn check_expected(sc: &Scenario, res: &ScenarioResult) -> Result<()> {
    let state = &res.final_state;
    if state.resources != sc.expect.resources {
        return Err(anyhow!("{}: resources {:?} != {:?}", sc.scenario_id, state.resources, sc.expect.resources));
    }
    let levels: BTreeMap<String, u32> = state.buildings.iter().map(|(k, v)| (k.clone(), v.level)).collect();
    if levels != sc.expect.buildings {
        return Err(anyhow!("{}: buildings {:?} != {:?}", sc.scenario_id, levels, sc.expect.buildings));
    }
    if state.queue.len() != sc.expect.queue_len {
        return Err(anyhow!("{}: queue_len {} != {}", sc.scenario_id, state.queue.len(), sc.expect.queue_len));
    }
    if let Some(cp) = sc.expect.checkpoint_unix {
        if state.checkpoint_unix != cp {
            return Err(anyhow!("{}: checkpoint {} != {}", sc.scenario_id, state.checkpoint_unix, cp));
        }
    }
    Ok(())
}

fn error_code(err: &QueueError) -> &'static str {
    match err {
        QueueError::InvalidRequest(_) => "invalid_request",
        QueueError::QueueFull { .. } => "queue_full",
    }
}
