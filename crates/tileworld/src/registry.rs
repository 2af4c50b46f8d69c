//! Named, densely numbered templates loaded from attribute blocks.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::attrs::{AttrStore, BlockReader};
use crate::entity::{Block, Instance, Item, Mob};
use crate::error::{Error, Result};

pub type EntityId = u16;

pub const NAME: &str = "name";
pub const ENTITY_TYPE: &str = "entity type";

pub const DEFAULT_BLOCKS: &str = include_str!("../config/blocks.txt");
pub const DEFAULT_ITEMS: &str = include_str!("../config/items.txt");
pub const DEFAULT_MOBS: &str = include_str!("../config/mobs.txt");

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityType {
    Block,
    Item,
    Mob,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Block => "block",
            EntityType::Item => "item",
            EntityType::Mob => "mob",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Some(EntityType::Block),
            "item" => Some(EntityType::Item),
            "mob" => Some(EntityType::Mob),
            _ => None,
        }
    }
}

/// An immutable template.
#[derive(Clone, Debug)]
pub struct Entity {
    id: EntityId,
    name: String,
    kind: EntityType,
    attrs: Arc<AttrStore>,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_type(&self) -> EntityType {
        self.kind
    }

    pub fn attrs(&self) -> &AttrStore {
        &self.attrs
    }

    /// Build the capability-typed instance this template describes.
    pub fn instantiate(&self) -> Result<Instance> {
        Ok(match self.kind {
            EntityType::Block => Instance::Block(Block::new(self.clone())?),
            EntityType::Item => Instance::Item(Item::new(self.clone())?),
            EntityType::Mob => Instance::Mob(Mob::new(self.clone())?),
        })
    }
}

#[derive(Clone, Debug)]
pub struct Registry {
    kind: EntityType,
    entities: Vec<Entity>,
    by_name: HashMap<String, EntityId>,
}

impl Registry {
    pub fn empty(kind: EntityType) -> Self {
        Self {
            kind,
            entities: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Load every block in `text`, numbering them in read order.
    pub fn load(kind: EntityType, text: &str) -> Result<Self> {
        let mut reader = BlockReader::new(text);
        Self::read_from(kind, &mut reader, None)
    }

    /// Load blocks until end of input or until the `stop` sentinel line.
    pub fn read_from(kind: EntityType, reader: &mut BlockReader<'_>, stop: Option<&str>) -> Result<Self> {
        let mut reg = Self::empty(kind);
        loop {
            let start = reader.line_no() + 1;
            let Some(attrs) = reader.next_block(stop)? else {
                break;
            };
            reg.push(attrs)
                .map_err(|e| Error::malformed(start, e.to_string()))?;
        }
        Ok(reg)
    }

    /// Append a template. The store must carry a unique `name`; an `entity type`, when present,
    /// overrides the registry's default kind. The template is instantiated once so bad config
    /// fails here instead of mid-game.
    pub fn push(&mut self, attrs: AttrStore) -> Result<EntityId> {
        let name = attrs
            .str(NAME)
            .map_err(|_| Error::invalid_type(NAME, "every entity needs a String name"))?
            .to_string();
        if self.by_name.contains_key(&name) {
            return Err(Error::invalid_type(NAME, format!("duplicate name '{name}'")));
        }
        let kind = if attrs.has_variable(ENTITY_TYPE) {
            let raw = attrs.str(ENTITY_TYPE)?;
            EntityType::parse(raw)
                .ok_or_else(|| Error::invalid_type(ENTITY_TYPE, format!("unknown type '{raw}'")))?
        } else {
            self.kind
        };
        let id = EntityId::try_from(self.entities.len())
            .map_err(|_| Error::invalid_type(NAME, "too many entities"))?;

        let entity = Entity {
            id,
            name: name.clone(),
            kind,
            attrs: Arc::new(attrs),
        };
        entity.instantiate()?;
        self.entities.push(entity);
        self.by_name.insert(name, id);
        Ok(id)
    }

    pub fn kind(&self) -> EntityType {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> Result<&Entity> {
        self.entities
            .get(usize::from(id))
            .ok_or_else(|| Error::UnknownEntity {
                kind: self.kind.as_str(),
                key: id.to_string(),
            })
    }

    pub fn by_name(&self, name: &str) -> Result<&Entity> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    pub fn id_of(&self, name: &str) -> Result<EntityId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownEntity {
                kind: self.kind.as_str(),
                key: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn instantiate(&self, id: EntityId) -> Result<Instance> {
        self.get(id)?.instantiate()
    }

    pub fn instantiate_item(&self, name: &str) -> Result<Item> {
        self.by_name(name)?.instantiate()?.into_item()
    }

    /// Append every template in id order, then the `sentinel` line.
    pub fn write_to(&self, out: &mut String, sentinel: &str) {
        for e in &self.entities {
            out.push_str(&e.attrs.to_block());
        }
        out.push_str(sentinel);
        out.push('\n');
    }
}

/// The three template registries a world is built from.
#[derive(Clone, Debug)]
pub struct RegistrySet {
    pub blocks: Registry,
    pub items: Registry,
    pub mobs: Registry,
}

impl RegistrySet {
    pub fn load(blocks: &str, items: &str, mobs: &str) -> Result<Self> {
        let set = Self {
            blocks: Registry::load(EntityType::Block, blocks)?,
            items: Registry::load(EntityType::Item, items)?,
            mobs: Registry::load(EntityType::Mob, mobs)?,
        };
        set.check_references()?;
        Ok(set)
    }

    /// The configuration compiled into the crate.
    pub fn defaults() -> Result<Self> {
        Self::load(DEFAULT_BLOCKS, DEFAULT_ITEMS, DEFAULT_MOBS)
    }

    /// `blocks.txt`, `items.txt` and `mobs.txt` from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let read = |f: &str| std::fs::read_to_string(dir.join(f));
        Self::load(&read("blocks.txt")?, &read("items.txt")?, &read("mobs.txt")?)
    }

    /// Spawn lists must name mobs and drop lists must name items.
    pub fn check_references(&self) -> Result<()> {
        for b in self.blocks.iter() {
            if b.attrs().has_variable("spawns") {
                for m in b.attrs().str_array("spawns")? {
                    self.mobs.id_of(&m)?;
                }
            }
        }
        for m in self.mobs.iter() {
            if m.attrs().has_variable("drops") {
                for d in m.attrs().str_array("drops")? {
                    self.items.id_of(&d)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_in_read_order() {
        let text = "/begin/\nString name a\nString glyph aa\n/end/\n\n# gap\n/begin/\nString name b\nString glyph bb\n/end/\n";
        let reg = Registry::load(EntityType::Block, text).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.id_of("a").unwrap(), 0);
        assert_eq!(reg.by_name("b").unwrap().id(), 1);
        assert_eq!(reg.get(1).unwrap().name(), "b");
        assert!(matches!(reg.get(2), Err(Error::UnknownEntity { .. })));
        assert!(matches!(reg.by_name("c"), Err(Error::UnknownEntity { .. })));
    }

    #[test]
    fn missing_or_duplicate_names_fail_fast() {
        let err = Registry::load(EntityType::Item, "/begin/\nint base-value 3\n/end/\n").unwrap_err();
        assert!(matches!(err, Error::MalformedConfig { line: 1, .. }));

        let dup = "/begin/\nString name x\n/end/\n/begin/\nString name x\n/end/\n";
        assert!(Registry::load(EntityType::Item, dup).is_err());
    }

    #[test]
    fn entity_type_tag_drives_instantiation() {
        let text = "/begin/\nString name sign\nString entity-type item\n/end/\n";
        let reg = Registry::load(EntityType::Block, text).unwrap();
        assert!(matches!(reg.instantiate(0).unwrap(), Instance::Item(_)));

        let bad = "/begin/\nString name sign\nString entity-type spaceship\n/end/\n";
        assert!(Registry::load(EntityType::Block, bad).is_err());
    }

    #[test]
    fn mobs_missing_combat_stats_are_rejected() {
        let text = "/begin/\nString name ghost\nint health 3\n/end/\n";
        assert!(Registry::load(EntityType::Mob, text).is_err());
    }

    #[test]
    fn defaults_load_and_cross_check() {
        let set = RegistrySet::defaults().unwrap();
        for name in ["water", "sand", "grass", "forest", "rock", "village floor", "village wall", "trading post"] {
            assert!(set.blocks.contains(name), "missing block {name}");
        }
        assert!(set.items.contains("bread"));
        assert!(set.mobs.contains("trader"));
    }

    #[test]
    fn registries_round_trip_through_text() {
        let set = RegistrySet::defaults().unwrap();
        let mut out = String::new();
        set.mobs.write_to(&mut out, "/mobs/");
        let mut r = BlockReader::new(&out);
        let back = Registry::read_from(EntityType::Mob, &mut r, Some("/mobs/")).unwrap();
        assert_eq!(back.len(), set.mobs.len());
        for (a, b) in set.mobs.iter().zip(back.iter()) {
            assert_eq!(a.id(), b.id());
            assert_eq!(a.attrs(), b.attrs());
        }
    }
}
