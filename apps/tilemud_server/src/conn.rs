use std::net::SocketAddr;
use std::sync::Arc;

use tileio::{LineReader, PacketWriter};
use tileworld::{Game, PlayerId};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

pub type SharedGame = Arc<Mutex<Game>>;

pub const RUN_FAILED: &str = "that action didn't work.";
const QUIT: &str = "quit";
const SHUTTING_DOWN: &str = "the server is shutting down. goodbye.";

/// Accept connections until `shutdown` flips to true.
pub async fn serve(
    listener: TcpListener,
    game: SharedGame,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            res = listener.accept() => {
                let (stream, peer) = res?;
                let game = game.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_conn(stream, peer, game, shutdown).await {
                        warn!(peer = %peer, err = %e, "connection ended with error");
                    }
                });
            }
            res = shutdown.changed() => {
                if res.is_err() || *shutdown.borrow() {
                    info!("listener stopping");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_conn(
    stream: TcpStream,
    peer: SocketAddr,
    game: SharedGame,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let _ = stream.set_nodelay(true);
    let (rd, wr) = stream.into_split();
    let mut lines = LineReader::new(rd);
    let mut out = PacketWriter::new(wr);

    let (id, greeting) = game.lock().await.join()?;
    info!(peer = %peer, player = id, "player connected");

    let res = session(id, greeting, &mut lines, &mut out, &game, shutdown).await;

    // The player leaves even when the socket failed.
    game.lock().await.leave(id);
    info!(peer = %peer, player = id, "player disconnected");
    res
}

/// One connection's read, dispatch, reply loop. The game lock is held only while dispatching.
async fn session<R, W>(
    id: PlayerId,
    greeting: String,
    lines: &mut LineReader<R>,
    out: &mut PacketWriter<W>,
    game: &SharedGame,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    out.send(&greeting).await?;
    loop {
        let line = tokio::select! {
            r = lines.read_line() => r?,
            _ = shutdown.changed() => {
                let _ = out.send(SHUTTING_DOWN).await;
                return Ok(());
            }
        };
        let Some(line) = line else {
            return Ok(());
        };
        if line.trim() == QUIT {
            out.send("goodbye.").await?;
            return Ok(());
        }

        let reply = {
            let mut g = game.lock().await;
            match g.handle(id, &line) {
                Ok(r) => r,
                Err(e) => {
                    warn!(player = id, command = %line, err = %e, "action failed");
                    RUN_FAILED.to_string()
                }
            }
        };
        out.send(&reply).await?;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tileworld::{RegistrySet, World};
    use tokio::io::AsyncWriteExt;
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

    use super::*;

    pub(crate) fn flat_game() -> SharedGame {
        let reg = Arc::new(RegistrySet::defaults().unwrap());
        let grass = reg.blocks.id_of("grass").unwrap();
        let world = World::from_parts(1, 32, reg, vec![grass; 32 * 32], vec![None; 32 * 32]).unwrap();
        Arc::new(Mutex::new(Game::new(world, tileworld::Accounts::new(), 3)))
    }

    struct Server {
        addr: SocketAddr,
        game: SharedGame,
        _shutdown: watch::Sender<bool>,
    }

    async fn start() -> Server {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let game = flat_game();
        let (tx, rx) = watch::channel(false);
        tokio::spawn(serve(listener, game.clone(), rx));
        Server {
            addr,
            game,
            _shutdown: tx,
        }
    }

    struct Client {
        rd: LineReader<OwnedReadHalf>,
        wr: OwnedWriteHalf,
    }

    impl Client {
        async fn connect(addr: SocketAddr) -> Client {
            let (rd, wr) = TcpStream::connect(addr).await.unwrap().into_split();
            let mut c = Client {
                rd: LineReader::new(rd),
                wr,
            };
            let hello = c.recv().await;
            assert!(hello.starts_with("welcome to tilemud!"), "{hello}");
            c
        }

        /// One framed response.
        async fn recv(&mut self) -> String {
            assert_eq!(self.rd.read_line().await.unwrap().as_deref(), Some("/begin/"));
            let mut body = Vec::new();
            loop {
                let line = self.rd.read_line().await.unwrap().unwrap();
                if line == "/end/" {
                    return body.join("\n");
                }
                body.push(line);
            }
        }

        async fn ask(&mut self, line: &str) -> String {
            self.wr.write_all(format!("{line}\n").as_bytes()).await.unwrap();
            self.recv().await
        }
    }

    /// Ids of connected players, oldest first.
    async fn ids(game: &SharedGame) -> Vec<PlayerId> {
        game.lock().await.roster().iter().map(|p| p.id()).collect()
    }

    #[tokio::test]
    async fn d3_moves_three_tiles_east() {
        let srv = start().await;
        let mut c = Client::connect(srv.addr).await;
        let id = ids(&srv.game).await[0];
        srv.game.lock().await.player_mut(id).unwrap().move_to(5, 5);

        c.ask("d3").await;
        assert_eq!(srv.game.lock().await.player(id).unwrap().position(), (8, 5));
    }

    #[tokio::test]
    async fn eating_missing_bread_is_rejected() {
        let srv = start().await;
        let mut c = Client::connect(srv.addr).await;
        assert_eq!(c.ask("eat 1 bread").await, "you don't have that item!");
        let id = ids(&srv.game).await[0];
        assert_eq!(srv.game.lock().await.player(id).unwrap().stat("health").unwrap(), 10);
    }

    #[tokio::test]
    async fn upgrade_without_xp_explains_why() {
        let srv = start().await;
        let mut c = Client::connect(srv.addr).await;
        assert_eq!(
            c.ask("upgrade speed").await,
            "you need 500 xp to level up this stat. You only have 0 xp."
        );
        let id = ids(&srv.game).await[0];
        assert_eq!(srv.game.lock().await.player(id).unwrap().base_stat("speed").unwrap(), 5);
    }

    #[tokio::test]
    async fn concurrent_attacks_loot_once() {
        let srv = start().await;
        let mut a = Client::connect(srv.addr).await;
        let mut b = Client::connect(srv.addr).await;
        let players = ids(&srv.game).await;
        {
            let mut g = srv.game.lock().await;
            let crab = g.world().registries().mobs.id_of("crab").unwrap();
            g.world_mut().place_occupant(11, 10, crab).unwrap();
            for id in &players {
                g.player_mut(*id).unwrap().move_to(10, 10);
            }
        }
        assert!(a.ask("d").await.contains("You encountered: crab"));
        assert!(b.ask("d").await.contains("You encountered: crab"));
        {
            // Leave each copy of the crab one blow from death.
            let mut g = srv.game.lock().await;
            for id in &players {
                let p = g.player_mut(*id).unwrap();
                let mut e = p.take_encounter().unwrap();
                e.mob.change_stat("health", -3).unwrap();
                p.set_encounter(e);
            }
        }

        let (ra, rb) = tokio::join!(a.ask("attack"), b.ask("attack"));
        let kills = [&ra, &rb]
            .iter()
            .filter(|r| r.contains("You murdered crab"))
            .count();
        assert_eq!(kills, 1, "{ra}\n---\n{rb}");
        assert!(ra.contains("someone else already dealt with crab") || rb.contains("someone else already dealt with crab"));

        let g = srv.game.lock().await;
        let xp = players.iter().map(|id| g.player(*id).unwrap().xp()).sum::<i64>();
        assert_eq!(xp, 6);
        let shells = players
            .iter()
            .map(|id| g.player(*id).unwrap().item_count("crab shell"))
            .sum::<u32>();
        assert_eq!(shells, 1);
    }

    #[tokio::test]
    async fn quit_removes_the_player() {
        let srv = start().await;
        let mut c = Client::connect(srv.addr).await;
        assert_eq!(c.ask("quit").await, "goodbye.");
        for _ in 0..100 {
            if srv.game.lock().await.roster().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("player still connected after quit");
    }

    #[tokio::test]
    async fn shutdown_closes_sessions() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let game = flat_game();
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(serve(listener, game.clone(), rx));

        let mut c = Client::connect(addr).await;
        tx.send(true).unwrap();
        assert_eq!(c.recv().await, "the server is shutting down. goodbye.");
        server.await.unwrap().unwrap();
    }
}
