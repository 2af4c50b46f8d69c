//! Per-connection player state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::accounts::Account;
use crate::actions::ActionKind;
use crate::attrs::AttrStore;
use crate::entity::Mob;
use crate::error::{Error, Result};
use crate::rng::GameRng;
use crate::world::World;

pub type PlayerId = usize;

pub const DEFAULT_HEALTH: i64 = 10;
pub const DEFAULT_DMG: i64 = 1;
pub const DEFAULT_SPEED: i64 = 5;
pub const DEFAULT_VIEW: i64 = 7;
pub const XP_MULTIPLIER: i64 = 100;

/// Upgradeable stats, in display order.
pub const STATS: [&str; 4] = ["health", "dmg", "speed", "view"];

fn default_stat(name: &str) -> i64 {
    match name {
        "health" => DEFAULT_HEALTH,
        "dmg" => DEFAULT_DMG,
        "speed" => DEFAULT_SPEED,
        _ => DEFAULT_VIEW,
    }
}

/// A live mob the player is fighting or trading with, and the tile it came from.
#[derive(Clone, Debug)]
pub struct Encounter {
    pub mob: Mob,
    pub x: i64,
    pub y: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub x: i64,
    pub y: i64,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastCommand {
    pub kind: ActionKind,
    pub command: String,
}

#[derive(Clone, Debug)]
pub struct Player {
    id: PlayerId,
    account: Option<String>,
    x: i64,
    y: i64,
    base_stats: AttrStore,
    stats: AttrStore,
    inventory: BTreeMap<String, u32>,
    xp: i64,
    encounter: Option<Encounter>,
    last: Option<LastCommand>,
    markers: Vec<Marker>,
    shortcuts: BTreeMap<String, String>,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        let mut base_stats = AttrStore::new();
        for name in STATS {
            // Fresh store with distinct names; cannot conflict.
            let _ = base_stats.set(name, default_stat(name));
        }
        Self {
            id,
            account: None,
            x: 0,
            y: 0,
            stats: base_stats.clone(),
            base_stats,
            inventory: BTreeMap::new(),
            xp: 0,
            encounter: None,
            last: None,
            markers: Vec::new(),
            shortcuts: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    pub fn display_name(&self) -> String {
        match &self.account {
            Some(a) => a.clone(),
            None => format!("player {}", self.id),
        }
    }

    pub fn position(&self) -> (i64, i64) {
        (self.x, self.y)
    }

    pub fn move_to(&mut self, x: i64, y: i64) {
        self.x = x;
        self.y = y;
    }

    /// Caps.
    pub fn base_stats(&self) -> &AttrStore {
        &self.base_stats
    }

    /// Current values, never above the caps.
    pub fn stats(&self) -> &AttrStore {
        &self.stats
    }

    pub fn base_stat(&self, name: &str) -> Result<i64> {
        self.base_stats.int(name)
    }

    pub fn stat(&self, name: &str) -> Result<i64> {
        self.stats.int(name)
    }

    /// Apply `delta`, then clamp to the base stat.
    pub fn change_stat(&mut self, name: &str, delta: i64) -> Result<()> {
        let cap = self.base_stats.int(name)?;
        let cur = self.stats.int(name)?;
        self.stats.set(name, cur.saturating_add(delta).min(cap))
    }

    pub fn reset_stats(&mut self) {
        self.stats = self.base_stats.clone();
    }

    pub fn is_dead(&self) -> bool {
        self.stats.int("health").map(|h| h <= 0).unwrap_or(true)
    }

    pub fn xp(&self) -> i64 {
        self.xp
    }

    pub fn add_xp(&mut self, delta: i64) {
        self.xp = self.xp.saturating_add(delta).max(0);
    }

    /// XP needed to raise `name` one level: current level times [`XP_MULTIPLIER`].
    pub fn upgrade_cost(&self, name: &str) -> Result<i64> {
        Ok(self.base_stat(name)?.saturating_mul(XP_MULTIPLIER))
    }

    /// Raise the cap and the current value by one, paying the XP cost.
    pub fn upgrade_base_stat(&mut self, name: &str) -> Result<()> {
        let need = self.upgrade_cost(name)?;
        if self.xp < need {
            return Err(Error::InsufficientXp {
                need,
                have: self.xp,
            });
        }
        let level = self.base_stat(name)?;
        let cur = self.stat(name)?;
        self.base_stats.set(name, level + 1)?;
        self.stats.set(name, cur + 1)?;
        self.xp -= need;
        Ok(())
    }

    pub fn inventory(&self) -> &BTreeMap<String, u32> {
        &self.inventory
    }

    pub fn item_count(&self, item: &str) -> u32 {
        self.inventory.get(item).copied().unwrap_or(0)
    }

    pub fn add_to_inventory(&mut self, item: &str, count: u32) {
        if count == 0 {
            return;
        }
        let slot = self.inventory.entry(item.to_string()).or_insert(0);
        *slot = slot.saturating_add(count);
    }

    /// Fails without changing anything if the player holds fewer than `count`.
    pub fn remove_from_inventory(&mut self, item: &str, count: u32) -> Result<()> {
        let have = self.item_count(item);
        if count > have {
            return Err(Error::InsufficientItems {
                item: item.to_string(),
                need: count,
                have,
            });
        }
        if have == count {
            self.inventory.remove(item);
        } else {
            self.inventory.insert(item.to_string(), have - count);
        }
        Ok(())
    }

    pub fn clear_inventory(&mut self) {
        self.inventory.clear();
    }

    pub fn encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref()
    }

    pub fn set_encounter(&mut self, e: Encounter) {
        self.encounter = Some(e);
    }

    pub fn take_encounter(&mut self) -> Option<Encounter> {
        self.encounter.take()
    }

    pub fn last_command(&self) -> Option<&LastCommand> {
        self.last.as_ref()
    }

    pub fn set_last_command(&mut self, kind: ActionKind, command: &str) {
        self.last = Some(LastCommand {
            kind,
            command: command.to_string(),
        });
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn add_marker(&mut self, description: &str) {
        self.markers.push(Marker {
            x: self.x,
            y: self.y,
            description: description.to_string(),
        });
    }

    pub fn shortcut(&self, alias: &str) -> Option<&str> {
        self.shortcuts.get(alias).map(|s| s.as_str())
    }

    pub fn shortcuts(&self) -> &BTreeMap<String, String> {
        &self.shortcuts
    }

    pub fn set_shortcut(&mut self, alias: &str, command: &str) {
        self.shortcuts.insert(alias.to_string(), command.to_string());
    }

    /// Death: drop everything, heal to the caps, and reappear somewhere safe. XP is kept.
    pub fn respawn(&mut self, world: &World, rng: &mut GameRng) -> Result<()> {
        self.clear_inventory();
        self.reset_stats();
        self.encounter = None;
        let (x, y) = world.spawn_point(rng)?;
        self.move_to(x, y);
        Ok(())
    }

    /// Take over an account's saved state.
    pub fn apply_account(&mut self, acct: &Account) -> Result<()> {
        let mut base = AttrStore::new();
        for name in STATS {
            let v = acct.stats.get(name).copied().unwrap_or(default_stat(name)).max(1);
            base.set(name, v)?;
        }
        self.account = Some(acct.name.clone());
        self.x = acct.x;
        self.y = acct.y;
        self.stats = base.clone();
        self.base_stats = base;
        self.inventory = acct
            .inventory
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        self.xp = acct.xp.max(0);
        self.markers = acct.markers.clone();
        self.shortcuts = acct.shortcuts.clone();
        self.encounter = None;
        Ok(())
    }

    pub fn set_account(&mut self, name: &str) {
        self.account = Some(name.to_string());
    }

    /// Snapshot for the account table.
    pub fn to_account(&self, name: &str) -> Account {
        let stats = STATS
            .iter()
            .filter_map(|s| self.base_stats.int(s).ok().map(|v| (s.to_string(), v)))
            .collect();
        Account {
            name: name.to_string(),
            x: self.x,
            y: self.y,
            inventory: self.inventory.clone(),
            stats,
            xp: self.xp,
            markers: self.markers.clone(),
            shortcuts: self.shortcuts.clone(),
        }
    }
}

/// Connected players, keyed by an id handed out in connection order and never reused.
#[derive(Debug, Default)]
pub struct Roster {
    players: BTreeMap<PlayerId, Player>,
    next_id: PlayerId,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self) -> PlayerId {
        let id = self.next_id;
        self.next_id += 1;
        self.players.insert(id, Player::new(id));
        id
    }

    pub fn leave(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn require(&self, id: PlayerId) -> Result<&Player> {
        self.players.get(&id).ok_or(Error::UnknownPlayer(id))
    }

    pub fn require_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players.get_mut(&id).ok_or(Error::UnknownPlayer(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Who is logged into `name`, if anyone.
    pub fn account_holder(&self, name: &str) -> Option<PlayerId> {
        self.players
            .values()
            .find(|p| p.account().is_some_and(|a| a.eq_ignore_ascii_case(name)))
            .map(|p| p.id())
    }
}
