use crate::actions::{Action, ActionKind, Command, Parsed, RunCtx, View, reject};
use crate::error::Result;
use crate::player::{Encounter, Player};
use crate::render;
use crate::rng::{GameRng, Roll};
use crate::world::World;

/// `w|a|s|d[<distance>]`.
pub struct Move;

fn direction(c: char) -> Option<(i64, i64)> {
    match c.to_ascii_lowercase() {
        'w' => Some((0, -1)),
        'a' => Some((-1, 0)),
        's' => Some((0, 1)),
        'd' => Some((1, 0)),
        _ => None,
    }
}

impl Action for Move {
    fn kind(&self) -> ActionKind {
        ActionKind::Move
    }

    fn description(&self) -> &'static str {
        "w, a, s or d followed by a distance moves you up, left, down or right. the distance is at most your speed."
    }

    fn matches(&self, command: &str) -> bool {
        let mut chars = command.trim().chars();
        let Some(c) = chars.next() else {
            return false;
        };
        let rest = chars.as_str();
        let digits = rest.strip_prefix('-').unwrap_or(rest);
        direction(c).is_some() && digits.chars().all(|d| d.is_ascii_digit())
    }

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed {
        if view.player.encounter().is_some() {
            return reject("you can't move while fighting a mob!");
        }
        let command = command.trim();
        let mut chars = command.chars();
        let Some((dx, dy)) = chars.next().and_then(direction) else {
            return reject("no action matches your input!");
        };
        let rest = chars.as_str();
        if rest.starts_with('-') {
            return reject("you can't move a negative distance!");
        }
        let speed = view.player.stat("speed").unwrap_or(0);
        let distance = if rest.is_empty() {
            1
        } else {
            match rest.parse::<i64>() {
                Ok(d) => d,
                Err(_) => return reject("you can't move that far in one turn!"),
            }
        };
        if distance > speed {
            return reject("you can't move that far in one turn!");
        }
        Ok(Box::new(MoveCmd { dx, dy, distance }))
    }
}

struct MoveCmd {
    dx: i64,
    dy: i64,
    distance: i64,
}

impl Command for MoveCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        let player = ctx.roster.require_mut(ctx.player)?;
        let world = &*ctx.world;
        let rng = &mut *ctx.rng;

        let (mut x, mut y) = player.position();
        let mut out = String::new();
        let mut met = false;
        for step in 1..=self.distance {
            let (nx, ny) = (x + self.dx, y + self.dy);
            if !world.in_bounds(nx, ny) || world.block(nx, ny)?.is_solid() {
                out.push_str("Something blocks your way.\n");
                break;
            }
            x = nx;
            y = ny;
            if let Some(mob) = world.get_occupant(x, y)? {
                if step == self.distance || rng.roll_range(0, 99) < mob.aggression() {
                    if step < self.distance {
                        out.push_str(&format!("{} blocks your path.\n", mob.name()));
                    }
                    met = true;
                    break;
                }
            }
        }
        player.move_to(x, y);

        let mut text = render::view(world, ctx.roster, ctx.player)?;
        text.push_str(&out);
        if met {
            let player = ctx.roster.require_mut(ctx.player)?;
            text.push_str(&start_encounter(player, world, x, y, rng)?);
        }
        Ok(text)
    }
}

/// Meet the occupant of `(x, y)`. A mob faster than the player strikes first.
pub fn start_encounter(player: &mut Player, world: &World, x: i64, y: i64, rng: &mut GameRng) -> Result<String> {
    let Some(mut mob) = world.get_occupant(x, y)? else {
        return Ok(String::new());
    };
    let mut out = mob.entrance(rng);
    if mob.stat("speed")? > player.stat("speed")? {
        let report = mob.attack(player, world, rng)?;
        out.push_str(&report.text);
        if report.killed_player {
            return Ok(out);
        }
    }
    player.set_encounter(Encounter { mob, x, y });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::accounts::Accounts;
    use crate::actions::tests::game;
    use crate::game::Game;
    use crate::registry::{DEFAULT_BLOCKS, DEFAULT_ITEMS, DEFAULT_MOBS, RegistrySet};
    use crate::world::World;

    const SENTRY: &str = "
/begin/
String name sentry
int health 5
int dmg 1
int speed 1
int xp 1
int aggression 100
/end/
";

    /// Flat grass with a sentry, which always blocks, on (11, 10) and the player on (10, 10).
    fn guarded() -> (Game, usize) {
        let mobs = format!("{DEFAULT_MOBS}{SENTRY}");
        let reg = Arc::new(RegistrySet::load(DEFAULT_BLOCKS, DEFAULT_ITEMS, &mobs).unwrap());
        let grass = reg.blocks.id_of("grass").unwrap();
        let sentry = reg.mobs.id_of("sentry").unwrap();
        let mut world = World::from_parts(1, 32, reg, vec![grass; 32 * 32], vec![None; 32 * 32]).unwrap();
        world.place_occupant(11, 10, sentry).unwrap();

        let mut g = Game::new(world, Accounts::new(), 7);
        let (id, _) = g.join().unwrap();
        g.player_mut(id).unwrap().move_to(10, 10);
        (g, id)
    }

    #[test]
    fn d3_moves_three_east() {
        let (mut g, id) = game();
        let out = g.handle(id, "d3").unwrap();
        assert_eq!(g.player(id).unwrap().position(), (13, 10));
        assert!(out.contains("@@"));
        g.handle(id, "w").unwrap();
        assert_eq!(g.player(id).unwrap().position(), (13, 9));
    }

    #[test]
    fn distance_is_bounded_by_speed() {
        let (mut g, id) = game();
        assert_eq!(g.handle(id, "a6").unwrap(), "you can't move that far in one turn!");
        assert_eq!(g.handle(id, "a-1").unwrap(), "you can't move a negative distance!");
        assert_eq!(g.player(id).unwrap().position(), (10, 10));
    }

    #[test]
    fn stops_one_tile_before_solid() {
        let (mut g, id) = game();
        let rock = g.world().registries().blocks.id_of("rock").unwrap();
        g.world_mut().set_block(13, 10, rock).unwrap();
        g.handle(id, "d5").unwrap();
        assert_eq!(g.player(id).unwrap().position(), (12, 10));
    }

    #[test]
    fn stops_at_the_map_edge() {
        let (mut g, id) = game();
        g.player_mut(id).unwrap().move_to(1, 0);
        g.handle(id, "a4").unwrap();
        assert_eq!(g.player(id).unwrap().position(), (0, 0));
    }

    #[test]
    fn destination_occupant_starts_an_encounter() {
        let (mut g, id) = game();
        let crab = g.world().registries().mobs.id_of("crab").unwrap();
        g.world_mut().place_occupant(12, 10, crab).unwrap();
        let out = g.handle(id, "d2").unwrap();
        assert!(out.contains("You encountered: crab"));
        let p = g.player(id).unwrap();
        assert_eq!(p.position(), (12, 10));
        assert_eq!(p.encounter().map(|e| (e.x, e.y)), Some((12, 10)));
        assert_eq!(g.handle(id, "d1").unwrap(), "you can't move while fighting a mob!");
    }

    #[test]
    fn passive_occupant_never_blocks() {
        let (mut g, id) = game();
        let trader = g.world().registries().mobs.id_of("trader").unwrap();
        g.world_mut().place_occupant(11, 10, trader).unwrap();
        g.handle(id, "d3").unwrap();
        let p = g.player(id).unwrap();
        assert_eq!(p.position(), (13, 10));
        assert!(p.encounter().is_none());
    }

    #[test]
    fn aggressive_occupant_stops_the_walk() {
        let (mut g, id) = guarded();
        let out = g.handle(id, "d4").unwrap();
        assert!(out.contains("sentry blocks your path.\n"), "{out}");
        assert!(out.contains("You encountered: sentry"));
        let p = g.player(id).unwrap();
        assert_eq!(p.position(), (11, 10));
        assert_eq!(p.encounter().map(|e| (e.x, e.y)), Some((11, 10)));
    }

    #[test]
    fn blocking_rolls_follow_the_game_seed() {
        let walk = || {
            let (mut g, id) = game();
            let bear = g.world().registries().mobs.id_of("bear").unwrap();
            g.world_mut().place_occupant(11, 10, bear).unwrap();
            let out = g.handle(id, "d3").unwrap();
            (out, g.player(id).unwrap().position())
        };
        let (out, pos) = walk();
        assert_eq!((out.clone(), pos), walk());
        if out.contains("bear blocks your path.") {
            assert_eq!(pos, (11, 10));
        } else {
            assert_eq!(pos, (13, 10));
        }
    }
}
