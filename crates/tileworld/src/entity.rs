//! Capability-typed instances built from templates: terrain blocks, items and mobs.

use rand::seq::SliceRandom;

use crate::attrs::AttrStore;
use crate::error::{Error, Result};
use crate::player::Player;
use crate::registry::{Entity, EntityId};
use crate::rng::{GameRng, Roll};
use crate::world::World;

pub const GLYPH_WIDTH: usize = 2;

#[derive(Clone, Debug)]
pub enum Instance {
    Block(Block),
    Item(Item),
    Mob(Mob),
}

impl Instance {
    pub fn entity(&self) -> &Entity {
        match self {
            Instance::Block(b) => &b.entity,
            Instance::Item(i) => &i.entity,
            Instance::Mob(m) => &m.template,
        }
    }

    pub fn into_block(self) -> Result<Block> {
        match self {
            Instance::Block(b) => Ok(b),
            other => Err(not_a(other.entity(), "block")),
        }
    }

    pub fn into_item(self) -> Result<Item> {
        match self {
            Instance::Item(i) => Ok(i),
            other => Err(not_a(other.entity(), "item")),
        }
    }

    pub fn into_mob(self) -> Result<Mob> {
        match self {
            Instance::Mob(m) => Ok(m),
            other => Err(not_a(other.entity(), "mob")),
        }
    }
}

fn not_a(e: &Entity, want: &str) -> Error {
    Error::invalid_type(
        "entity type",
        format!("'{}' is a {}, not a {want}", e.name(), e.entity_type().as_str()),
    )
}

/// A terrain tile. Read-only.
#[derive(Clone, Debug)]
pub struct Block {
    entity: Entity,
    glyph: String,
    solid: bool,
    spawn_chance: f64,
    map_weight: i64,
}

impl Block {
    pub fn new(entity: Entity) -> Result<Self> {
        let attrs = entity.attrs();
        let raw = attrs.str("glyph")?;
        let glyph = format!("{raw:<width$}", width = GLYPH_WIDTH)
            .chars()
            .take(GLYPH_WIDTH)
            .collect::<String>();
        let spawn_chance = attrs.float_or("mob spawn chance", 0.0)?;
        let map_weight = attrs.int_or("map weight", 1)?.max(0);
        Ok(Self {
            solid: attrs.has_property("solid"),
            glyph,
            spawn_chance,
            map_weight,
            entity,
        })
    }

    pub fn id(&self) -> EntityId {
        self.entity.id()
    }

    pub fn name(&self) -> &str {
        self.entity.name()
    }

    pub fn attrs(&self) -> &AttrStore {
        self.entity.attrs()
    }

    pub fn glyph(&self) -> &str {
        &self.glyph
    }

    pub fn is_solid(&self) -> bool {
        self.solid
    }

    pub fn is_water(&self) -> bool {
        self.name().contains("water")
    }

    pub fn spawn_chance(&self) -> f64 {
        self.spawn_chance
    }

    pub fn map_weight(&self) -> i64 {
        self.map_weight
    }

    /// Mob names this tile may spawn, when it restricts them.
    pub fn spawns(&self) -> Result<Option<Vec<String>>> {
        if self.attrs().has_variable("spawns") {
            Ok(Some(self.attrs().str_array("spawns")?))
        } else {
            Ok(None)
        }
    }
}

/// An inventory item. Read-only.
#[derive(Clone, Debug)]
pub struct Item {
    entity: Entity,
    health_gain: i64,
    base_value: i64,
}

impl Item {
    pub fn new(entity: Entity) -> Result<Self> {
        let attrs = entity.attrs();
        let health_gain = attrs.int_or("health gain", 0)?;
        let base_value = attrs.int_or("base value", 1)?;
        Ok(Self {
            entity,
            health_gain,
            base_value,
        })
    }

    pub fn name(&self) -> &str {
        self.entity.name()
    }

    pub fn is_edible(&self) -> bool {
        self.entity.attrs().has_property("edible")
    }

    pub fn health_gain(&self) -> i64 {
        self.health_gain
    }

    pub fn base_value(&self) -> i64 {
        self.base_value
    }

    pub fn description(&self) -> Option<&str> {
        let attrs = self.entity.attrs();
        attrs
            .str("description")
            .ok()
            .or_else(|| attrs.long_text("description").ok())
    }
}

/// Quote lists a mob may carry.
pub mod quote {
    pub const ENTRANCE: &str = "entrance";
    pub const ATTACK: &str = "attack";
    pub const MOB_VICTORY: &str = "mob victory";
    pub const PLAYER_VICTORY: &str = "player victory";
    pub const PLAYER_RUN: &str = "player run";
}

/// A live creature. `stats` start as a copy of the template and are the only thing that changes.
#[derive(Clone, Debug)]
pub struct Mob {
    template: Entity,
    stats: AttrStore,
    accum_speed: i64,
}

/// What happened during one round of a mob's attacks.
#[derive(Debug, Default)]
pub struct AttackReport {
    pub text: String,
    pub killed_player: bool,
}

impl Mob {
    pub fn new(template: Entity) -> Result<Self> {
        let attrs = template.attrs();
        for stat in ["health", "dmg", "speed"] {
            attrs.int(stat)?;
        }
        let min = attrs.int_or("drop min", 1)?;
        let max = attrs.int_or("drop max", min)?;
        if max < min {
            return Err(Error::invalid_type("drop max", "drop max is below drop min"));
        }
        Ok(Self {
            accum_speed: attrs.int("speed")?,
            stats: attrs.clone(),
            template,
        })
    }

    pub fn template(&self) -> &Entity {
        &self.template
    }

    pub fn name(&self) -> &str {
        self.template.name()
    }

    /// The template's attributes; never mutated.
    pub fn base_stats(&self) -> &AttrStore {
        self.template.attrs()
    }

    pub fn stats(&self) -> &AttrStore {
        &self.stats
    }

    pub fn stat(&self, name: &str) -> Result<i64> {
        self.stats.int(name)
    }

    pub fn change_stat(&mut self, name: &str, delta: i64) -> Result<()> {
        let cur = self.stats.int(name)?;
        self.stats.set(name, cur.saturating_add(delta))
    }

    pub fn is_dead(&self) -> bool {
        self.stats.int("health").map(|h| h <= 0).unwrap_or(true)
    }

    /// Percent chance, 0..=100, of blocking a player walking through.
    pub fn aggression(&self) -> i64 {
        self.base_stats()
            .int_or("aggression", 0)
            .unwrap_or(0)
            .clamp(0, 100)
    }

    pub fn trades(&self) -> bool {
        self.base_stats().has_property("trades")
    }

    pub fn xp_reward(&self) -> i64 {
        self.base_stats().int_or("xp", 0).unwrap_or(0).max(0)
    }

    pub fn img(&self) -> &str {
        self.base_stats().long_text("img").unwrap_or("")
    }

    /// A random line from the named quote list, or empty.
    pub fn quote(&self, kind: &str, rng: &mut GameRng) -> String {
        let Ok(lines) = self.base_stats().str_array(kind) else {
            return String::new();
        };
        lines.choose(rng).cloned().unwrap_or_default()
    }

    /// Roll `drop min..=drop max` items from the drop table.
    pub fn roll_drops(&self, rng: &mut GameRng) -> Result<Vec<String>> {
        let attrs = self.base_stats();
        if !attrs.has_variable("drops") {
            return Ok(Vec::new());
        }
        let table = attrs.str_array("drops")?;
        let min = attrs.int_or("drop min", 1)?.max(0);
        let max = attrs.int_or("drop max", min)?.max(min);
        let n = rng.roll_range(min, max);
        Ok((0..n).filter_map(|_| table.choose(rng).cloned()).collect())
    }

    /// `"<name>: <quote>\n"`, or empty when the mob has nothing to say.
    pub fn say(&self, kind: &str, rng: &mut GameRng) -> String {
        let q = self.quote(kind, rng);
        if q.is_empty() {
            String::new()
        } else {
            format!("{}: {q}\n", self.name())
        }
    }

    /// Text shown when a player walks into this mob.
    pub fn entrance(&self, rng: &mut GameRng) -> String {
        let mut out = format!("You encountered: {}\n", self.name());
        let img = self.img();
        if !img.is_empty() {
            out.push_str(img);
            out.push('\n');
        }
        out.push_str(&self.say(quote::ENTRANCE, rng));
        out
    }

    /// The mob's side of a turn exchange.
    ///
    /// Speed accumulates across turns; while it stays under the player's speed the mob skips.
    /// Once it catches up the mob strikes once per `player speed` of its own speed, so a mob
    /// twice as fast hits twice. A killing blow respawns the player and ends the exchange.
    pub fn attack(&mut self, player: &mut Player, world: &World, rng: &mut GameRng) -> Result<AttackReport> {
        let mut report = AttackReport::default();
        let player_speed = player.stat("speed")?.max(1);
        let mob_speed = self.stat("speed")?;

        self.accum_speed += mob_speed;
        if self.accum_speed < player_speed {
            report
                .text
                .push_str(&format!("{} is too slow. You take another turn.\n", self.name()));
            return Ok(report);
        }
        self.accum_speed = 0;

        let dmg = self.stat("dmg")?.max(0);
        let mut turn = 0;
        while turn < mob_speed {
            report.text.push_str(&self.say(quote::ATTACK, rng));
            report.text.push_str(&format!(
                "{} attacked you and dealt {dmg} damage.\n",
                self.name()
            ));
            player.change_stat("health", -dmg)?;
            if player.is_dead() {
                report.text.push_str(&self.say(quote::MOB_VICTORY, rng));
                report
                    .text
                    .push_str(&format!("You were killed by {}\n", self.name()));
                player.respawn(world, rng)?;
                let (x, y) = player.position();
                report.text.push_str(&format!("Respawning at {x}, {y}\n"));
                report.killed_player = true;
                return Ok(report);
            }
            if turn + player_speed < mob_speed {
                report.text.push_str(&format!(
                    "{} is faster than you, and takes another turn.\n",
                    self.name()
                ));
            }
            turn += player_speed;
        }
        Ok(report)
    }
}
