//! Game core for a tile-based multiplayer text world: typed attribute stores, entity templates,
//! a generated map, players and the commands they issue.
//!
//! Nothing here does network IO. A server owns one [`Game`] and feeds it lines.

pub mod accounts;
pub mod actions;
pub mod attrs;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod game;
pub mod noise;
pub mod player;
pub mod registry;
pub mod render;
pub mod rng;
pub mod save;
pub mod world;

pub use accounts::{Account, Accounts};
pub use attrs::{AttrStore, Value};
pub use error::{Error, Result};
pub use game::{Game, GameContext, Snapshot};
pub use player::{Player, PlayerId, Roster};
pub use registry::{EntityId, EntityType, RegistrySet};
pub use world::World;
