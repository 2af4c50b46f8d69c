use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tileio::LineReader;
use tileworld::save::write_atomic;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::conn::SharedGame;

#[derive(Clone, Debug)]
pub struct SavePaths {
    pub world: PathBuf,
    pub accounts: PathBuf,
}

/// Serialize under the lock, write after releasing it.
pub async fn save(game: &SharedGame, paths: &SavePaths) -> anyhow::Result<()> {
    let started = Instant::now();
    let snap = game.lock().await.snapshot()?;
    let paths = paths.clone();
    let world_bytes = snap.world.len();
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        write_atomic(&paths.world, snap.world.as_bytes())
            .with_context(|| format!("write {}", paths.world.display()))?;
        write_atomic(&paths.accounts, snap.accounts.as_bytes())
            .with_context(|| format!("write {}", paths.accounts.display()))?;
        Ok(())
    })
    .await??;
    info!(
        world_bytes,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "saved"
    );
    Ok(())
}

/// Admin commands typed on the server's stdin. Ends quietly at EOF.
pub async fn console(game: SharedGame, paths: SavePaths, shutdown: Arc<watch::Sender<bool>>) {
    let mut lines = LineReader::new(tokio::io::stdin());
    loop {
        let line = match lines.read_line().await {
            Ok(Some(l)) => l,
            Ok(None) => return,
            Err(e) => {
                warn!(err = %e, "console read failed");
                return;
            }
        };
        match line.trim() {
            "" => {}
            "save" => {
                if let Err(e) = save(&game, &paths).await {
                    warn!(err = %e, "save failed");
                }
            }
            "players" => {
                let g = game.lock().await;
                println!("{} connected", g.roster().len());
                for p in g.roster().iter() {
                    let (x, y) = p.position();
                    println!("  {}: {} at {x}, {y}", p.id(), p.display_name());
                }
            }
            "quit" => {
                info!("quit requested from console");
                let _ = shutdown.send(true);
                return;
            }
            other => println!("unknown command '{other}' (save | players | quit)"),
        }
    }
}

pub async fn autosave(
    game: SharedGame,
    paths: SavePaths,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = tokio::time::interval(every);
    // The first tick fires immediately.
    tick.tick().await;
    loop {
        tokio::select! {
            _ = tick.tick() => {
                if let Err(e) = save(&game, &paths).await {
                    warn!(err = %e, "autosave failed");
                }
            }
            res = shutdown.changed() => {
                if res.is_err() || *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::tests::flat_game;

    #[tokio::test]
    async fn save_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SavePaths {
            world: dir.path().join("save/world-save.txt"),
            accounts: dir.path().join("save/accounts.json"),
        };
        let game = flat_game();
        {
            let mut g = game.lock().await;
            let (id, _) = g.join().unwrap();
            g.handle(id, "createAccount ann").unwrap();
        }
        save(&game, &paths).await.unwrap();

        let world = tileworld::World::load_from(&paths.world).unwrap();
        assert_eq!(world.size(), 32);
        let accounts = tileworld::Accounts::load(&paths.accounts).unwrap();
        assert!(accounts.contains("ann"));
    }
}
