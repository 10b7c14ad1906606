use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use idle_core::{ActionPayload, PlayerId, PlayerState};
use idle_queue::ActionRequest;
use idle_runner::GameService;

#[derive(Parser)]
#[command(name = "idle", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Initialize a game project in the current directory (creates .idle/, config, catalog, db)
    Init,

    /// List known players
    Status,

    /// Create a new player
    PlayerAdd {
        #[arg(long)]
        id: String,
    },

    /// Reconcile a player to now and print its state
    Show {
        #[arg(long)]
        player: String,
        #[arg(long)]
        json: bool,
    },

    /// Queue an action batch for a player
    Enqueue {
        #[arg(long)]
        player: String,
        #[arg(long)]
        action: String,
        #[arg(long, default_value_t = 1)]
        quantity: u64,
    },

    /// Replace a player's stored state with the JSON in a file
    Update {
        #[arg(long)]
        player: String,
        #[arg(long)]
        file: String,
    },

    /// List catalog actions
    Catalog,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let root = std::env::current_dir()?;

    match cli.cmd {
        Command::Init => {
            GameService::init_project(&root)?;
            println!("Initialized idle game in {}", root.display());
        }
        Command::Status => {
            let svc = GameService::open(root)?;
            let players = svc.list_players()?;
            println!("Players: {}", players.len());
            for p in players {
                println!("- {}", p);
            }
        }
        Command::PlayerAdd { id } => {
            let svc = GameService::open(root)?;
            svc.create_player(&PlayerId::from_str(id.clone()), idle_runner::now_unix())?;
            println!("Added player {}", id);
        }
        Command::Show { player, json } => {
            let svc = GameService::open(root)?;
            let state = svc.view_player(&PlayerId::from_str(player), idle_runner::now_unix())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_state(&state, idle_runner::now_unix());
            }
        }
        Command::Enqueue { player, action, quantity } => {
            let svc = GameService::open(root)?;
            let state = svc.enqueue_action(
                &PlayerId::from_str(player),
                &ActionRequest::new(action.clone(), quantity),
                idle_runner::now_unix(),
            )?;
            if let Some(entry) = state.queue.last() {
                println!(
                    "Queued {} x{} ({}..{})",
                    action,
                    quantity,
                    entry.start_unix,
                    entry.end_unix.unwrap_or(entry.start_unix)
                );
            }
        }
        Command::Update { player, file } => {
            let svc = GameService::open(root)?;
            let s = std::fs::read_to_string(&file).with_context(|| format!("read {}", file))?;
            let state: PlayerState = serde_json::from_str(&s).with_context(|| format!("parse {}", file))?;
            svc.overwrite_player(&PlayerId::from_str(player.clone()), state)?;
            println!("Updated player {}", player);
        }
        Command::Catalog => {
            let svc = GameService::open(root)?;
            println!("Catalog {} ({} actions)", svc.catalog.hash(), svc.catalog.len());
            for def in svc.catalog.definitions() {
                println!("- {} [{}] {}s/unit", def.name, def.output.kind(), def.unit_time_secs);
            }
        }
    }

    Ok(())
}

fn print_state(state: &PlayerState, now_unix: i64) {
    println!("Player {} (checkpoint {})", state.id, state.checkpoint_unix);
    println!("Resources:");
    for (name, qty) in &state.resources {
        println!("- {}: {}", name, qty);
    }
    println!("Buildings:");
    for (id, b) in &state.buildings {
        println!("- {}: level {}", id, b.level);
    }
    println!("Queue: {}", state.queue.len());
    for a in &state.queue {
        let what = match &a.payload {
            ActionPayload::Mining { resource_type, amount } | ActionPayload::Farming { resource_type, amount } => {
                format!("{} {}", amount, resource_type)
            }
            ActionPayload::AnimalHusbandry { animal_type, product_type, amount } => {
                format!("{} {} from {}", amount, product_type, animal_type)
            }
            ActionPayload::BuildingUpgrade { building_id, target_level } => {
                format!("{} -> level {}", building_id, target_level)
            }
            ActionPayload::Unknown { kind, .. } => format!("unknown kind {}", kind),
            ActionPayload::Malformed { .. } => "unreadable payload".to_string(),
        };
        match a.end_unix {
            Some(end) => println!("- [{}] {} (done in {}s)", a.payload.kind(), what, end.saturating_sub(now_unix).max(0)),
            None => println!("- [{}] {} (no end time)", a.payload.kind(), what),
        }
    }
}
