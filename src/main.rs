//! Binary entrypoint for the Cobble CLI.
//!
//! Stands in for the chat command dispatcher: every subcommand runs one
//! engine operation and prints its result as JSON on stdout. Player-facing
//! failures print `{"error": ..., "kind": ...}` and exit with status 2.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the data directory
//! - `profile start|delete|view|hide|show` - manage the player's profile
//! - `explore <biome>`, `mine`, `fish` - gather loot
//! - `craft <item> [-q N]`, `smelt <item> [-q N]`, `use <item>` - spend items
//! - `discard <item> [-q N|all] [--record ID]` - throw items away
//! - `inventory [--page N]`, `biomes`, `info <item>`, `leaderboard [--page N]` - views
//!
//! See the library crate docs for module-level details: `cobble::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;

use cobble::config::Config;
use cobble::survival::{Catalog, DiscardTarget, SurvivalEngine, SurvivalError, SurvivalStore};

#[derive(Parser)]
#[command(name = "cobble")]
#[command(about = "Survival progression engine for chat games")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Chat user id of the acting player
    #[arg(short, long, global = true)]
    player: Option<u64>,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the data directory
    Init,
    /// Manage your survival profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Explore a discovered biome
    Explore { biome: String },
    /// Mine with your best pickaxe
    Mine,
    /// Fish with your fishing rod
    Fish,
    /// Craft an item from its recipe
    Craft {
        item: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Smelt raw items (name either the input or the product)
    Smelt {
        item: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Eat a food item
    Use { item: String },
    /// Discard items from your inventory
    Discard {
        item: String,
        /// A number, or "all"
        #[arg(short, long, default_value = "all")]
        quantity: String,
        /// Discard one specific inventory record instead
        #[arg(long, conflicts_with = "quantity")]
        record: Option<String>,
    },
    /// Show your inventory
    Inventory {
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// List the biomes you can explore
    Biomes,
    /// Show catalog information about an item
    Info { item: String },
    /// Show the global leaderboard
    Leaderboard {
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// Create your profile
    Start,
    /// Delete your profile and inventory
    Delete,
    /// Show level, health and discoveries
    View,
    /// Hide yourself on the leaderboard
    Hide,
    /// Show yourself on the leaderboard again
    Show,
}

#[derive(Serialize)]
struct ErrorReport {
    error: String,
    kind: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        info!("Initializing new Cobble configuration");
        let cfg = Config::default();
        let serialized = toml::to_string_pretty(&cfg)?;
        tokio::fs::write(&cli.config, serialized).await?;
        tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
        info!("Configuration file created at {}", cli.config);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);
    debug!("Loaded configuration from {}", cli.config);

    let catalog = Arc::new(Catalog::load(&config.catalog.dir)?);
    let store = SurvivalStore::open(&config.storage.data_dir)?;
    let engine = SurvivalEngine::new(catalog, store, config.game)?;

    match dispatch(&engine, cli.player, cli.command) {
        Ok(json) => println!("{}", json),
        Err(Dispatch::Player(e)) => {
            let report = ErrorReport {
                error: e.to_string(),
                kind: format!("{:?}", e.kind()),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            std::process::exit(2);
        }
        Err(Dispatch::Fatal(e)) => return Err(e),
    }
    Ok(())
}

enum Dispatch {
    Player(SurvivalError),
    Fatal(anyhow::Error),
}

impl From<SurvivalError> for Dispatch {
    fn from(e: SurvivalError) -> Self {
        if e.is_user_facing() {
            Dispatch::Player(e)
        } else {
            Dispatch::Fatal(e.into())
        }
    }
}

impl From<serde_json::Error> for Dispatch {
    fn from(e: serde_json::Error) -> Self {
        Dispatch::Fatal(e.into())
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, Dispatch> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn dispatch(engine: &SurvivalEngine, player: Option<u64>, command: Commands) -> Result<String, Dispatch> {
    let player_id = || player.ok_or_else(|| Dispatch::Fatal(anyhow!("--player <ID> is required for this command")));
    let mut rng = rand::thread_rng();

    match command {
        Commands::Init => Err(Dispatch::Fatal(anyhow!("init is handled before dispatch"))),
        Commands::Profile { action } => {
            let id = player_id()?;
            match action {
                ProfileCommand::Start => to_json(&engine.start_profile(id)?),
                ProfileCommand::Delete => {
                    engine.delete_profile(id)?;
                    to_json(&serde_json::json!({ "deleted": id }))
                }
                ProfileCommand::View => to_json(&engine.profile(id)?),
                ProfileCommand::Hide => to_json(&engine.set_leaderboard_hidden(id, true)?),
                ProfileCommand::Show => to_json(&engine.set_leaderboard_hidden(id, false)?),
            }
        }
        Commands::Explore { biome } => to_json(&engine.explore(player_id()?, &biome, &mut rng)?),
        Commands::Mine => to_json(&engine.mine(player_id()?, &mut rng)?),
        Commands::Fish => to_json(&engine.fish(player_id()?, &mut rng)?),
        Commands::Craft { item, quantity } => {
            to_json(&engine.craft(player_id()?, &item, quantity, &mut rng)?)
        }
        Commands::Smelt { item, quantity } => {
            to_json(&engine.smelt(player_id()?, &item, quantity, &mut rng)?)
        }
        Commands::Use { item } => to_json(&engine.use_item(player_id()?, &item)?),
        Commands::Discard {
            item,
            quantity,
            record,
        } => {
            let target = match record {
                Some(record_id) => DiscardTarget::Record(record_id),
                None => parse_discard_quantity(&quantity)?,
            };
            to_json(&engine.discard(player_id()?, &item, target)?)
        }
        Commands::Inventory { page } => {
            to_json(&engine.inventory(player_id()?, page.saturating_sub(1))?)
        }
        Commands::Biomes => to_json(&engine.explorable_biomes(player_id()?)?),
        Commands::Info { item } => to_json(&engine.item_info(&item)?),
        Commands::Leaderboard { page } => to_json(&engine.leaderboard(page.saturating_sub(1))?),
    }
}

fn parse_discard_quantity(raw: &str) -> Result<DiscardTarget, Dispatch> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(DiscardTarget::All);
    }
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(DiscardTarget::Quantity(n)),
        _ => Err(Dispatch::Player(SurvivalError::InvalidQuantity)),
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when a human is watching
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
