use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tileworld::{Accounts, Game, RegistrySet, World};
use tileworld::world::{MAP_SIZE, MIN_MAP_SIZE};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, watch};
use tracing::{Level, info, warn};

mod conn;
mod console;

use console::SavePaths;

fn usage_and_exit() -> ! {
    eprintln!(
        "tilemud_server\n\n\
USAGE:\n  tilemud_server [--bind HOST:PORT] [--world PATH] [--accounts PATH] [--config-dir DIR]\n                 [--seed N] [--map-size N] [--autosave-s N] [--create | --load]\n\n\
ENV:\n  TILEMUD_BIND          default 127.0.0.1:4000\n  TILEMUD_WORLD_SAVE    default save/world-save.txt\n  TILEMUD_ACCOUNTS      default save/accounts.json\n  TILEMUD_CONFIG_DIR    optional; blocks.txt, items.txt and mobs.txt (default: built in)\n  TILEMUD_WORLD_SEED    optional; default random\n  TILEMUD_MAP_SIZE      default 3000 (min 32)\n  TILEMUD_AUTOSAVE_S    default 0 (off)\n\n\
With neither --create nor --load the world is loaded when the save exists and created otherwise.\n\
Console commands on stdin: save | players | quit\n"
    );
    std::process::exit(2);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StartMode {
    Auto,
    Create,
    Load,
}

#[derive(Clone, Debug)]
struct Config {
    bind: SocketAddr,
    world_path: PathBuf,
    accounts_path: PathBuf,
    config_dir: Option<PathBuf>,
    seed: Option<u64>,
    map_size: usize,
    autosave_s: u64,
    mode: StartMode,
}

fn parse_args() -> Config {
    let mut bind: SocketAddr = std::env::var("TILEMUD_BIND")
        .unwrap_or_else(|_| "127.0.0.1:4000".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());
    let mut world_path: PathBuf = std::env::var("TILEMUD_WORLD_SAVE")
        .unwrap_or_else(|_| "save/world-save.txt".to_string())
        .into();
    let mut accounts_path: PathBuf = std::env::var("TILEMUD_ACCOUNTS")
        .unwrap_or_else(|_| "save/accounts.json".to_string())
        .into();
    let mut config_dir: Option<PathBuf> = std::env::var("TILEMUD_CONFIG_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(Into::into);
    let mut seed: Option<u64> = std::env::var("TILEMUD_WORLD_SEED")
        .ok()
        .map(|v| v.parse().unwrap_or_else(|_| usage_and_exit()));
    let mut map_size: usize = std::env::var("TILEMUD_MAP_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(MAP_SIZE);
    let mut autosave_s: u64 = std::env::var("TILEMUD_AUTOSAVE_S")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut mode = StartMode::Auto;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--bind" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                bind = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--world" => {
                world_path = it.next().unwrap_or_else(|| usage_and_exit()).into();
            }
            "--accounts" => {
                accounts_path = it.next().unwrap_or_else(|| usage_and_exit()).into();
            }
            "--config-dir" => {
                config_dir = Some(it.next().unwrap_or_else(|| usage_and_exit()).into());
            }
            "--seed" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                seed = Some(v.parse().unwrap_or_else(|_| usage_and_exit()));
            }
            "--map-size" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                map_size = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--autosave-s" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                autosave_s = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--create" => mode = StartMode::Create,
            "--load" => mode = StartMode::Load,
            "-h" | "--help" => usage_and_exit(),
            _ => usage_and_exit(),
        }
    }
    if map_size < MIN_MAP_SIZE {
        usage_and_exit();
    }

    Config {
        bind,
        world_path,
        accounts_path,
        config_dir,
        seed,
        map_size,
        autosave_s,
        mode,
    }
}

fn random_seed() -> anyhow::Result<u64> {
    let mut b = [0u8; 8];
    getrandom::getrandom(&mut b).map_err(|e| anyhow::anyhow!("getrandom: {e}"))?;
    Ok(u64::from_le_bytes(b))
}

fn load_registries(cfg: &Config) -> anyhow::Result<RegistrySet> {
    match &cfg.config_dir {
        Some(dir) => RegistrySet::load_dir(dir)
            .with_context(|| format!("load entity config from {}", dir.display())),
        None => RegistrySet::defaults().context("load built-in entity config"),
    }
}

/// Load the saved world or generate a new one. Returns the world and whether it is new.
fn bootstrap(cfg: &Config) -> anyhow::Result<(World, bool)> {
    let load = match cfg.mode {
        StartMode::Load => true,
        StartMode::Create => false,
        StartMode::Auto => cfg.world_path.exists(),
    };
    if load {
        if cfg.config_dir.is_some() {
            warn!("loading a saved world; its own entity config is used instead of the config dir");
        }
        let world = World::load_from(&cfg.world_path)
            .with_context(|| format!("load world from {}", cfg.world_path.display()))?;
        return Ok((world, false));
    }

    let registries = Arc::new(load_registries(cfg)?);
    let seed = match cfg.seed {
        Some(s) => s,
        None => random_seed()?,
    };
    let world = World::generate(seed, cfg.map_size, registries).context("generate world")?;
    Ok((world, true))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tilemud_server=info".into()),
        )
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let cfg = parse_args();
    let started = Instant::now();

    let boot_cfg = cfg.clone();
    let (world, fresh) = tokio::task::spawn_blocking(move || bootstrap(&boot_cfg)).await??;
    let accounts = Accounts::load(&cfg.accounts_path)
        .with_context(|| format!("load accounts from {}", cfg.accounts_path.display()))?;
    info!(
        seed = world.seed(),
        size = world.size(),
        fresh,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "world ready"
    );

    let game = Arc::new(Mutex::new(Game::new(world, accounts, random_seed()?)));
    let paths = SavePaths {
        world: cfg.world_path.clone(),
        accounts: cfg.accounts_path.clone(),
    };
    if fresh {
        console::save(&game, &paths).await?;
    }

    let listener = TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("bind {}", cfg.bind))?;
    info!(
        bind = %cfg.bind,
        world = %cfg.world_path.display(),
        accounts = %cfg.accounts_path.display(),
        autosave_s = cfg.autosave_s,
        "tilemud listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    tokio::spawn(console::console(game.clone(), paths.clone(), shutdown_tx.clone()));
    if cfg.autosave_s > 0 {
        tokio::spawn(console::autosave(
            game.clone(),
            paths.clone(),
            Duration::from_secs(cfg.autosave_s),
            shutdown_rx.clone(),
        ));
    }
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    conn::serve(listener, game.clone(), shutdown_rx).await?;

    console::save(&game, &paths).await?;
    info!("shutdown complete");
    Ok(())
}
