use tracing::debug;

use crate::actions::{Action, ActionKind, Command, Parsed, RunCtx, View, first_word, reject};
use crate::entity::quote;
use crate::error::Result;
use crate::player::{Encounter, Player};
use crate::rng::GameRng;
use crate::world::World;

pub struct Attack;

/// The encounter's tile no longer holds its mob: someone else got there first.
pub(crate) fn occupant_gone(e: &Encounter, view: &View<'_>) -> bool {
    !matches!(view.world.occupant_id(e.x, e.y), Ok(Some(id)) if id == e.mob.template().id())
}

impl Action for Attack {
    fn kind(&self) -> ActionKind {
        ActionKind::Attack
    }

    fn description(&self) -> &'static str {
        "attack hits the mob you are fighting. it may hit back."
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "attack"
    }

    fn parse(&self, _command: &str, view: &View<'_>) -> Parsed {
        let Some(e) = view.player.encounter() else {
            return reject("you're not currently fighting a mob!");
        };
        if occupant_gone(e, view) {
            return reject(format!(
                "someone else already dealt with {}. type 'run' to move on.",
                e.mob.name()
            ));
        }
        Ok(Box::new(AttackCmd))
    }
}

struct AttackCmd;

/// What one exchange of blows left behind.
enum Strike {
    /// Both still standing; the encounter goes on.
    Ongoing(String),
    /// The mob or the player died.
    Over(String),
}

impl Command for AttackCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        let player = ctx.roster.require_mut(ctx.player)?;
        let dmg = player.stat("dmg")?.max(0);
        let Some(mut e) = player.take_encounter() else {
            return Ok(String::new());
        };

        // The encounter survives a failed exchange.
        match strike(&mut e, dmg, player, ctx.world, ctx.rng) {
            Ok(Strike::Ongoing(out)) => {
                player.set_encounter(e);
                Ok(out)
            }
            Ok(Strike::Over(out)) => {
                debug!(
                    player = ctx.player,
                    mob = %e.mob.name(),
                    x = e.x,
                    y = e.y,
                    "encounter over"
                );
                Ok(out)
            }
            Err(err) => {
                player.set_encounter(e);
                Err(err)
            }
        }
    }
}

fn strike(
    e: &mut Encounter,
    dmg: i64,
    player: &mut Player,
    world: &mut World,
    rng: &mut GameRng,
) -> Result<Strike> {
    e.mob.change_stat("health", -dmg)?;
    let name = e.mob.name().to_string();
    let mut out = format!("You attacked {name} and dealt {dmg} damage.\n");

    if e.mob.is_dead() {
        let drops = e.mob.roll_drops(rng)?;
        world.remove_occupant(e.x, e.y)?;
        out.push_str(&e.mob.say(quote::PLAYER_VICTORY, rng));
        out.push_str(&format!("You murdered {name}\n"));
        let xp = e.mob.xp_reward();
        player.add_xp(xp);
        out.push_str(&format!("You got {xp} xp.\n"));
        for drop in drops {
            player.add_to_inventory(&drop, 1);
            out.push_str(&format!("You got {drop}\n"));
        }
        return Ok(Strike::Over(out));
    }

    let report = e.mob.attack(player, world, rng)?;
    out.push_str(&report.text);
    if report.killed_player {
        Ok(Strike::Over(out))
    } else {
        Ok(Strike::Ongoing(out))
    }
}

pub struct Run;

impl Action for Run {
    fn kind(&self) -> ActionKind {
        ActionKind::Run
    }

    fn description(&self) -> &'static str {
        "run leaves the mob you are fighting or trading with."
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "run"
    }

    fn parse(&self, _command: &str, view: &View<'_>) -> Parsed {
        if view.player.encounter().is_none() {
            return reject("you can't run because you aren't currently fighting a mob!");
        }
        Ok(Box::new(RunCmd))
    }
}

struct RunCmd;

impl Command for RunCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        let player = ctx.roster.require_mut(ctx.player)?;
        let Some(e) = player.take_encounter() else {
            return Ok(String::new());
        };
        let mut out = e.mob.say(quote::PLAYER_RUN, ctx.rng);
        out.push_str(&format!("You ran away from {}.\n", e.mob.name()));
        Ok(out)
    }
}
