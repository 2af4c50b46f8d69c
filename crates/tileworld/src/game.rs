//! Everything one server shares between connections.

use std::sync::Arc;

use tracing::info;

use crate::accounts::Accounts;
use crate::actions::{ActionCatalog, RunCtx};
use crate::dispatch::dispatch;
use crate::error::Result;
use crate::player::{Player, PlayerId, Roster};
use crate::registry::RegistrySet;
use crate::render;
use crate::rng::{self, GameRng};
use crate::world::World;

/// Immutable for the life of the server.
pub struct GameContext {
    pub registries: Arc<RegistrySet>,
    pub actions: ActionCatalog,
}

/// Serialized state, ready to be written without holding the game.
#[derive(Debug)]
pub struct Snapshot {
    pub world: String,
    pub accounts: String,
}

pub struct Game {
    ctx: GameContext,
    world: World,
    roster: Roster,
    accounts: Accounts,
    rng: GameRng,
}

impl Game {
    pub fn new(world: World, accounts: Accounts, seed: u64) -> Self {
        Self {
            ctx: GameContext {
                registries: world.registries().clone(),
                actions: ActionCatalog::new(),
            },
            world,
            roster: Roster::new(),
            accounts,
            rng: rng::seeded(seed),
        }
    }

    pub fn context(&self) -> &GameContext {
        &self.ctx
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn accounts(&self) -> &Accounts {
        &self.accounts
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.roster.get(id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.roster.get_mut(id)
    }

    /// Add a player at a random spawn point. Returns its id and the greeting.
    pub fn join(&mut self) -> Result<(PlayerId, String)> {
        let id = self.roster.join();
        let spot = self.world.spawn_point(&mut self.rng);
        let (x, y) = match spot {
            Ok(p) => p,
            Err(e) => {
                self.roster.leave(id);
                return Err(e);
            }
        };
        self.roster.require_mut(id)?.move_to(x, y);

        let mut greeting = format!(
            "welcome to tilemud! you are player {id}.\n\
             type 'help' to get started. 'createAccount <name>' or 'login <name>' keeps your progress.\n"
        );
        greeting.push_str(&render::view(&self.world, &self.roster, id)?);
        Ok((id, greeting))
    }

    /// Remove a player, saving it into its account if it has one.
    pub fn leave(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.roster.leave(id)?;
        if let Some(name) = player.account() {
            self.accounts.upsert(player.to_account(name));
            info!(player = id, account = %name, "account stored");
        }
        Some(player)
    }

    pub fn handle(&mut self, id: PlayerId, line: &str) -> Result<String> {
        let mut ctx = RunCtx {
            ctx: &self.ctx,
            player: id,
            roster: &mut self.roster,
            world: &mut self.world,
            accounts: &mut self.accounts,
            rng: &mut self.rng,
        };
        dispatch(&mut ctx, line)
    }

    /// Copy every logged-in player into the account table.
    pub fn sync_accounts(&mut self) {
        for p in self.roster.iter() {
            if let Some(name) = p.account() {
                self.accounts.upsert(p.to_account(name));
            }
        }
    }

    pub fn snapshot(&mut self) -> Result<Snapshot> {
        self.sync_accounts();
        let mut world = String::new();
        self.world.write_to(&mut world);
        Ok(Snapshot {
            world,
            accounts: self.accounts.to_json()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests::flat;

    #[test]
    fn join_places_players_on_the_map() {
        let mut g = Game::new(flat(32), Accounts::new(), 1);
        let (a, hello) = g.join().unwrap();
        let (b, _) = g.join().unwrap();
        assert_ne!(a, b);
        assert!(hello.starts_with(&format!("welcome to tilemud! you are player {a}.")));
        assert!(hello.contains("@@"));
        let (x, y) = g.player(a).unwrap().position();
        assert!(g.world().in_bounds(x, y));
    }

    #[test]
    fn unknown_player_is_an_error() {
        let mut g = Game::new(flat(32), Accounts::new(), 1);
        assert!(g.handle(5, "stat").is_err());
    }

    #[test]
    fn snapshot_includes_live_accounts() {
        let mut g = Game::new(flat(32), Accounts::new(), 1);
        let (id, _) = g.join().unwrap();
        g.handle(id, "createAccount ann").unwrap();
        g.player_mut(id).unwrap().add_xp(77);
        let snap = g.snapshot().unwrap();
        assert!(snap.accounts.contains("\"xp\": 77"));
        assert!(snap.world.starts_with("1 32\n"));
        let back = World::read_from(&snap.world).unwrap();
        assert_eq!(back.terrain(), g.world().terrain());
    }
}
