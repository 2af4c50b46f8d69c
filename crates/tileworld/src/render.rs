//! Plain-text views of the map and of a player.

use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::Result;
use crate::player::{Player, PlayerId, Roster};
use crate::registry::EntityId;
use crate::world::World;

pub const SELF_GLYPH: &str = "@@";
pub const PLAYER_GLYPH: &str = "++";
pub const MOB_GLYPH: &str = "??";
pub const VOID_GLYPH: &str = "  ";

/// Tiles per side of one overview cell.
pub const MAP_CHUNK: usize = 30;

/// The square of side `2 * view + 1` around player `me`.
pub fn view(world: &World, roster: &Roster, me: PlayerId) -> Result<String> {
    let player = roster.require(me)?;
    let dist = player.stat("view")?.max(0);
    let (cx, cy) = player.position();
    let others = roster
        .iter()
        .filter(|p| p.id() != me)
        .map(Player::position)
        .collect::<HashSet<_>>();

    let width = (dist * 2 + 1) as usize;
    let mut out = String::with_capacity((width * 2 + 3) * width);
    for y in cy - dist..=cy + dist {
        out.push('|');
        for x in cx - dist..=cx + dist {
            let glyph = if (x, y) == (cx, cy) {
                SELF_GLYPH
            } else if !world.in_bounds(x, y) {
                VOID_GLYPH
            } else if others.contains(&(x, y)) {
                PLAYER_GLYPH
            } else if world.has_occupant(x, y) {
                MOB_GLYPH
            } else {
                world.block(x, y)?.glyph()
            };
            out.push_str(glyph);
        }
        out.push_str("|\n");
    }
    Ok(out)
}

/// The whole map at one cell per [`MAP_CHUNK`] square. Each cell shows the block with the largest
/// total map weight inside it.
pub fn overview(world: &World, roster: &Roster, me: PlayerId) -> Result<String> {
    let player = roster.require(me)?;
    let size = world.size();
    let cells = size.div_ceil(MAP_CHUNK);
    let (px, py) = player.position();
    let mine = (px as usize / MAP_CHUNK, py as usize / MAP_CHUNK);
    let others = roster
        .iter()
        .filter(|p| p.id() != me)
        .map(|p| {
            let (x, y) = p.position();
            (x as usize / MAP_CHUNK, y as usize / MAP_CHUNK)
        })
        .collect::<HashSet<_>>();

    let block_weight = world
        .registries()
        .blocks
        .iter()
        .map(|e| world.block_by_id(e.id()).map(|b| b.map_weight()))
        .collect::<Result<Vec<_>>>()?;
    let terrain = world.terrain();
    let mut weight = vec![0i64; block_weight.len()];
    let mut out = format!("({px}, {py})\n");
    for cy in 0..cells {
        out.push('|');
        for cx in 0..cells {
            let glyph = if (cx, cy) == mine {
                SELF_GLYPH
            } else if others.contains(&(cx, cy)) {
                PLAYER_GLYPH
            } else {
                weight.iter_mut().for_each(|w| *w = 0);
                for y in cy * MAP_CHUNK..((cy + 1) * MAP_CHUNK).min(size) {
                    let row = &terrain[y * size..(y + 1) * size];
                    for id in &row[cx * MAP_CHUNK..((cx + 1) * MAP_CHUNK).min(size)] {
                        let i = usize::from(*id);
                        weight[i] += block_weight[i];
                    }
                }
                let best = weight
                    .iter()
                    .enumerate()
                    .max_by_key(|(i, w)| (**w, std::cmp::Reverse(*i)))
                    .map(|(i, _)| i as EntityId)
                    .unwrap_or(0);
                world.block_by_id(best)?.glyph()
            };
            out.push_str(glyph);
        }
        out.push_str("|\n");
    }
    Ok(out)
}

pub fn stats(player: &Player) -> String {
    format!(
        "stats: \n{}base stats: \n{}",
        player.stats(),
        player.base_stats()
    )
}

pub fn inventory(player: &Player) -> String {
    if player.inventory().is_empty() {
        return "your inventory is empty.\n".to_string();
    }
    let mut out = String::new();
    for (item, n) in player.inventory() {
        let _ = writeln!(out, "{item}: {n}");
    }
    out
}

pub fn markers(player: &Player) -> String {
    if player.markers().is_empty() {
        return "you haven't placed any markers.\n".to_string();
    }
    let mut out = String::new();
    for m in player.markers() {
        let _ = writeln!(out, "({}, {}) - {}", m.x, m.y, m.description);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::tests::flat;

    #[test]
    fn view_marks_self_players_and_mobs() {
        let mut w = flat(32);
        let rat = w.registries().mobs.id_of("rat").unwrap();
        w.place_occupant(11, 10, rat).unwrap();
        let mut r = Roster::new();
        let me = r.join();
        let other = r.join();
        r.get_mut(me).unwrap().move_to(10, 10);
        r.get_mut(other).unwrap().move_to(9, 10);

        let out = view(&w, &r, me).unwrap();
        let rows = out.lines().collect::<Vec<_>>();
        assert_eq!(rows.len(), 15);
        let mid = rows[7];
        assert_eq!(mid.len(), 15 * 2 + 2);
        assert_eq!(&mid[1 + 6 * 2..1 + 9 * 2], "++@@??");
        assert!(rows[0].starts_with("|,,"));
    }

    #[test]
    fn view_pads_past_the_edge() {
        let w = flat(32);
        let mut r = Roster::new();
        let me = r.join();
        let out = view(&w, &r, me).unwrap();
        let first = out.lines().next().unwrap();
        assert!(first.starts_with(&format!("|{}", VOID_GLYPH.repeat(15))));
    }

    #[test]
    fn overview_picks_heaviest_block() {
        let mut w = flat(60);
        let floor = w.registries().blocks.id_of("village floor").unwrap();
        // 200 floor tiles at weight 8 outweigh 700 grass tiles at weight 1.
        for y in 0..10 {
            for x in 0..20 {
                w.set_block(x, y, floor).unwrap();
            }
        }
        let mut r = Roster::new();
        let me = r.join();
        r.get_mut(me).unwrap().move_to(59, 59);
        let out = overview(&w, &r, me).unwrap();
        let rows = out.lines().collect::<Vec<_>>();
        assert_eq!(rows[0], "(59, 59)");
        assert_eq!(rows[1], "|::,,|");
        assert_eq!(rows[2], "|,,@@|");
    }

    #[test]
    fn inventory_listing() {
        let mut p = Player::new(0);
        assert_eq!(inventory(&p), "your inventory is empty.\n");
        p.add_to_inventory("bread", 2);
        p.add_to_inventory("apple", 1);
        assert_eq!(inventory(&p), "apple: 1\nbread: 2\n");
    }
}
