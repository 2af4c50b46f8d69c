//! The shared map: a square terrain grid of block ids plus a parallel occupant grid of mob
//! template ids. Both are row-major, `index = y * size + x`.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tracing::info;

use crate::attrs::BlockReader;
use crate::entity::{Block, Mob};
use crate::error::{Error, Result};
use crate::noise;
use crate::registry::{EntityId, EntityType, Registry, RegistrySet};
use crate::rng::{self, GameRng, Roll};
use crate::save::write_atomic;

pub const MAP_SIZE: usize = 3000;
pub const MIN_MAP_SIZE: usize = 32;

pub const WATER_LEVEL: f32 = 0.50;
pub const SAND_LEVEL: f32 = 0.53;
pub const GRASS_LEVEL: f32 = 0.75;
pub const FOREST_LEVEL: f32 = 0.85;

/// Percent chance that a hut gets a trading post in its middle.
pub const TRADER_HUT_PERCENT: i64 = 35;

const MOBS_END: &str = "/mobs/";
const ITEMS_END: &str = "/items/";
const BLOCKS_END: &str = "/blocks/";
const NO_OCCUPANT: i64 = -1;

/// Block ids the generator writes, looked up by name.
struct Palette {
    water: EntityId,
    sand: EntityId,
    grass: EntityId,
    forest: EntityId,
    rock: EntityId,
    floor: EntityId,
    wall: EntityId,
    trading_post: EntityId,
}

impl Palette {
    fn lookup(blocks: &Registry) -> Result<Self> {
        Ok(Self {
            water: blocks.id_of("water")?,
            sand: blocks.id_of("sand")?,
            grass: blocks.id_of("grass")?,
            forest: blocks.id_of("forest")?,
            rock: blocks.id_of("rock")?,
            floor: blocks.id_of("village floor")?,
            wall: blocks.id_of("village wall")?,
            trading_post: blocks.id_of("trading post")?,
        })
    }

    fn for_height(&self, h: f32) -> EntityId {
        if h < WATER_LEVEL {
            self.water
        } else if h < SAND_LEVEL {
            self.sand
        } else if h < GRASS_LEVEL {
            self.grass
        } else if h < FOREST_LEVEL {
            self.forest
        } else {
            self.rock
        }
    }
}

#[derive(Clone, Debug)]
pub struct World {
    seed: u64,
    size: usize,
    registries: Arc<RegistrySet>,
    blocks: Vec<Block>,
    spawn_pools: Vec<Vec<EntityId>>,
    terrain: Vec<EntityId>,
    occupants: Vec<Option<EntityId>>,
}

impl World {
    /// Assemble a world from grids, checking that every id exists in the registries.
    pub fn from_parts(
        seed: u64,
        size: usize,
        registries: Arc<RegistrySet>,
        terrain: Vec<EntityId>,
        occupants: Vec<Option<EntityId>>,
    ) -> Result<Self> {
        let cells = size * size;
        if size == 0 || terrain.len() != cells || occupants.len() != cells {
            return Err(Error::invalid_type(
                "map",
                format!(
                    "expected {cells} cells, found {} terrain and {} occupants",
                    terrain.len(),
                    occupants.len()
                ),
            ));
        }

        let blocks = registries
            .blocks
            .iter()
            .map(|e| e.instantiate().and_then(|i| i.into_block()))
            .collect::<Result<Vec<_>>>()?;
        let wild = registries
            .mobs
            .iter()
            .filter(|m| m.attrs().has_property("wild"))
            .map(|m| m.id())
            .collect::<Vec<_>>();
        let mut spawn_pools = Vec::with_capacity(blocks.len());
        for b in &blocks {
            let pool = match b.spawns()? {
                Some(names) => names
                    .iter()
                    .map(|n| registries.mobs.id_of(n))
                    .collect::<Result<Vec<_>>>()?,
                None => wild.clone(),
            };
            spawn_pools.push(pool);
        }

        if let Some(bad) = terrain.iter().find(|id| usize::from(**id) >= blocks.len()) {
            return Err(Error::UnknownEntity {
                kind: "block",
                key: bad.to_string(),
            });
        }
        if let Some(bad) = occupants
            .iter()
            .flatten()
            .find(|id| usize::from(**id) >= registries.mobs.len())
        {
            return Err(Error::UnknownEntity {
                kind: "mob",
                key: bad.to_string(),
            });
        }

        Ok(Self {
            seed,
            size,
            registries,
            blocks,
            spawn_pools,
            terrain,
            occupants,
        })
    }

    /// Generate a new world. Every random draw comes from one generator seeded with `seed`, in a
    /// fixed order, so `(seed, size, registries)` always produce the same grids.
    pub fn generate(seed: u64, size: usize, registries: Arc<RegistrySet>) -> Result<Self> {
        let started = Instant::now();
        let palette = Palette::lookup(&registries.blocks)?;
        let mut rng = rng::seeded(seed);

        let heights = noise::height_field(size, &mut rng);
        let terrain = heights.iter().map(|h| palette.for_height(*h)).collect();
        let mut world = World::from_parts(seed, size, registries, terrain, vec![None; size * size])?;

        let settlements = settlement_count(size, &mut rng);
        let lo = (size / 6) as i64;
        let span = ((size * 2) / 3).max(1) as i64;
        let mut stamped = 0usize;
        for _ in 0..settlements {
            let x = lo + rng.gen_range(0..span);
            let y = lo + rng.gen_range(0..span);
            if world.block(x, y)?.is_water() {
                continue;
            }
            world.stamp_village(x, y, &palette, &mut rng);
            stamped += 1;
        }

        world.roll_spawns(&mut rng)?;

        info!(
            seed,
            size,
            settlements = stamped,
            occupants = world.occupants.iter().flatten().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "world generated"
        );
        Ok(world)
    }

    fn stamp_village(&mut self, x0: i64, y0: i64, p: &Palette, rng: &mut GameRng) {
        let length = rng.gen_range(20..120);
        let width = rng.gen_range(3..5);
        for x in x0..x0 + length {
            for y in y0..y0 + width {
                self.set_clipped(x, y, p.floor);
            }
        }

        // Side streets alternate down and up, each ending in a hut.
        let mut up = false;
        let mut x = x0 + rng.gen_range(2..5);
        while x < x0 + length {
            let path = rng.gen_range(3..10);
            let half = rng.gen_range(2..4);
            if up {
                for y in (y0 - path + 1)..=y0 {
                    self.set_clipped(x, y, p.floor);
                }
                self.stamp_hut(x - half, y0 - path - half * 2 + 1, half, p, rng);
            } else {
                for y in (y0 + width)..(y0 + width + path) {
                    self.set_clipped(x, y, p.floor);
                }
                self.stamp_hut(x - half, y0 + width + path, half, p, rng);
            }
            up = !up;
            x += rng.gen_range(5..10);
        }
    }

    /// A walled square of side `2 * half + 1` with a door gap in the middle of the top and
    /// bottom walls.
    fn stamp_hut(&mut self, x0: i64, y0: i64, half: i64, p: &Palette, rng: &mut GameRng) {
        let side = half * 2 + 1;
        for x in x0..x0 + side {
            for y in y0..y0 + side {
                self.set_clipped(x, y, p.floor);
            }
        }
        for x in x0..x0 + side {
            if x - x0 != half {
                self.set_clipped(x, y0, p.wall);
                self.set_clipped(x, y0 + side - 1, p.wall);
            }
        }
        for y in y0..y0 + side {
            self.set_clipped(x0, y, p.wall);
            self.set_clipped(x0 + side - 1, y, p.wall);
        }
        if rng.roll_range(0, 99) < TRADER_HUT_PERCENT {
            self.set_clipped(x0 + half, y0 + half, p.trading_post);
        }
    }

    fn roll_spawns(&mut self, rng: &mut GameRng) -> Result<()> {
        for idx in 0..self.terrain.len() {
            let bid = usize::from(self.terrain[idx]);
            let block = &self.blocks[bid];
            self.occupants[idx] = None;
            if block.is_solid() || block.spawn_chance() <= 0.0 {
                continue;
            }
            if !rng.chance(block.spawn_chance()) {
                continue;
            }
            let pool = &self.spawn_pools[bid];
            if !pool.is_empty() {
                self.occupants[idx] = Some(pool[rng.gen_range(0..pool.len())]);
            }
        }
        Ok(())
    }

    fn set_clipped(&mut self, x: i64, y: i64, id: EntityId) {
        if let Ok(i) = self.index(x, y) {
            self.terrain[i] = id;
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn registries(&self) -> &Arc<RegistrySet> {
        &self.registries
    }

    pub fn terrain(&self) -> &[EntityId] {
        &self.terrain
    }

    pub fn occupants(&self) -> &[Option<EntityId>] {
        &self.occupants
    }

    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as u64) < self.size as u64 && (y as u64) < self.size as u64
    }

    fn index(&self, x: i64, y: i64) -> Result<usize> {
        if !self.in_bounds(x, y) {
            return Err(Error::OutOfBounds { x, y });
        }
        Ok(y as usize * self.size + x as usize)
    }

    pub fn block(&self, x: i64, y: i64) -> Result<&Block> {
        let i = self.index(x, y)?;
        Ok(&self.blocks[usize::from(self.terrain[i])])
    }

    pub fn block_by_id(&self, id: EntityId) -> Result<&Block> {
        self.blocks
            .get(usize::from(id))
            .ok_or_else(|| Error::UnknownEntity {
                kind: "block",
                key: id.to_string(),
            })
    }

    pub fn set_block(&mut self, x: i64, y: i64, id: EntityId) -> Result<()> {
        self.block_by_id(id)?;
        let i = self.index(x, y)?;
        self.terrain[i] = id;
        Ok(())
    }

    /// `false` off the map.
    pub fn has_occupant(&self, x: i64, y: i64) -> bool {
        self.index(x, y)
            .map(|i| self.occupants[i].is_some())
            .unwrap_or(false)
    }

    pub fn occupant_id(&self, x: i64, y: i64) -> Result<Option<EntityId>> {
        Ok(self.occupants[self.index(x, y)?])
    }

    /// A fresh mob cloned from the occupant's template; callers never share one.
    pub fn get_occupant(&self, x: i64, y: i64) -> Result<Option<Mob>> {
        let Some(id) = self.occupant_id(x, y)? else {
            return Ok(None);
        };
        self.registries.mobs.instantiate(id)?.into_mob().map(Some)
    }

    pub fn place_occupant(&mut self, x: i64, y: i64, mob: EntityId) -> Result<()> {
        self.registries.mobs.get(mob)?;
        let i = self.index(x, y)?;
        self.occupants[i] = Some(mob);
        Ok(())
    }

    /// Clear the tile's occupant; returns whether there was one.
    pub fn remove_occupant(&mut self, x: i64, y: i64) -> Result<bool> {
        let i = self.index(x, y)?;
        Ok(self.occupants[i].take().is_some())
    }

    /// Generator derived only from the seed and the coordinates.
    pub fn tile_rng(&self, x: i64, y: i64) -> GameRng {
        rng::for_tile(self.seed, x, y)
    }

    /// Somewhere a player may stand: not solid, not water, no occupant.
    pub fn spawn_point(&self, rng: &mut GameRng) -> Result<(i64, i64)> {
        let size = self.size as i64;
        let ok = |x: i64, y: i64| -> bool {
            self.block(x, y)
                .map(|b| !b.is_solid() && !b.is_water())
                .unwrap_or(false)
                && !self.has_occupant(x, y)
        };
        for _ in 0..10_000 {
            let x = rng.gen_range(0..size);
            let y = rng.gen_range(0..size);
            if ok(x, y) {
                return Ok((x, y));
            }
        }
        // Mostly water or rock: fall back to a scan from a random start.
        let cells = self.terrain.len();
        let start = rng.gen_range(0..cells);
        (0..cells)
            .map(|k| (start + k) % cells)
            .map(|i| ((i % self.size) as i64, (i / self.size) as i64))
            .find(|(x, y)| ok(*x, *y))
            .ok_or(Error::NoSpawnPoint)
    }

    /// Save format:
    ///
    /// ```text
    /// <seed> <size>
    /// <terrain ids, row-major>
    /// <occupant ids, -1 for none>
    /// <mob blocks> /mobs/ <item blocks> /items/ <block blocks> /blocks/
    /// ```
    pub fn write_to(&self, out: &mut String) {
        out.reserve(self.terrain.len() * 6);
        let _ = writeln!(out, "{} {}", self.seed, self.size);
        for (i, id) in self.terrain.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{id}");
        }
        out.push('\n');
        for (i, occ) in self.occupants.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            match occ {
                Some(id) => {
                    let _ = write!(out, "{id}");
                }
                None => {
                    let _ = write!(out, "{NO_OCCUPANT}");
                }
            }
        }
        out.push('\n');
        self.registries.mobs.write_to(out, MOBS_END);
        self.registries.items.write_to(out, ITEMS_END);
        self.registries.blocks.write_to(out, BLOCKS_END);
    }

    pub fn read_from(text: &str) -> Result<Self> {
        let mut r = BlockReader::new(text);

        let header = next_data_line(&mut r)?;
        let mut parts = header.split_whitespace();
        let seed = parts
            .next()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| Error::malformed(r.line_no(), "bad seed"))?;
        let size = parts
            .next()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| Error::malformed(r.line_no(), "bad map size"))?;
        let cells = size
            .checked_mul(size)
            .ok_or_else(|| Error::malformed(r.line_no(), "map size too large"))?;

        let line = next_data_line(&mut r)?;
        let terrain = line
            .split_whitespace()
            .map(|t| t.parse::<EntityId>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Error::malformed(r.line_no(), "bad terrain id"))?;
        if terrain.len() != cells {
            return Err(Error::malformed(
                r.line_no(),
                format!("expected {cells} terrain ids, found {}", terrain.len()),
            ));
        }

        let line = next_data_line(&mut r)?;
        let mut occupants = Vec::with_capacity(cells);
        for t in line.split_whitespace() {
            let v = t
                .parse::<i64>()
                .map_err(|_| Error::malformed(r.line_no(), format!("bad occupant '{t}'")))?;
            occupants.push(if v == NO_OCCUPANT {
                None
            } else {
                Some(
                    EntityId::try_from(v)
                        .map_err(|_| Error::malformed(r.line_no(), format!("bad occupant '{t}'")))?,
                )
            });
        }
        if occupants.len() != cells {
            return Err(Error::malformed(
                r.line_no(),
                format!("expected {cells} occupants, found {}", occupants.len()),
            ));
        }

        let mobs = Registry::read_from(EntityType::Mob, &mut r, Some(MOBS_END))?;
        let items = Registry::read_from(EntityType::Item, &mut r, Some(ITEMS_END))?;
        let blocks = Registry::read_from(EntityType::Block, &mut r, Some(BLOCKS_END))?;
        let registries = RegistrySet { blocks, items, mobs };
        registries.check_references()?;

        World::from_parts(seed, size, Arc::new(registries), terrain, occupants)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        self.write_to(&mut out);
        write_atomic(path, out.as_bytes())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let world = Self::read_from(&text)?;
        info!(seed = world.seed, size = world.size, path = %path.display(), "world loaded");
        Ok(world)
    }
}

fn next_data_line<'a>(r: &mut BlockReader<'a>) -> Result<&'a str> {
    loop {
        let Some(line) = r.next_line() else {
            return Err(Error::malformed(r.line_no(), "unexpected end of save"));
        };
        if !line.trim().is_empty() {
            return Ok(line);
        }
    }
}

/// 50..100 settlements on a full-size map, scaled down with area for smaller ones.
fn settlement_count(size: usize, rng: &mut GameRng) -> usize {
    let n = rng.gen_range(50..100usize);
    let full = MAP_SIZE * MAP_SIZE;
    if size >= MAP_SIZE {
        n
    } else {
        (n * size * size / full).max(1)
    }
}
