//! Player commands.
//!
//! Each action runs in three phases. `matches` is a cheap textual test. `parse` checks every
//! argument and precondition against a read-only [`View`] and either rejects with user text or
//! returns a [`Command`] that is safe to run. `run` applies the effect.

use crate::accounts::Accounts;
use crate::error::Result;
use crate::game::GameContext;
use crate::player::{Player, PlayerId, Roster};
use crate::rng::GameRng;
use crate::world::World;

pub mod account;
pub mod combat;
pub mod info;
pub mod items;
pub mod movement;
pub mod notes;
pub mod trade;
pub mod upgrade;

/// Every action, in the order commands are matched against them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Move,
    Attack,
    Run,
    Trade,
    Upgrade,
    Eat,
    Give,
    ShowMap,
    Display,
    ShowStats,
    ShowInventory,
    ShowXp,
    DescribeItem,
    Login,
    CreateAccount,
    Mark,
    Markers,
    ShortCut,
    Help,
    Who,
}

impl ActionKind {
    pub const ALL: [ActionKind; 20] = [
        ActionKind::Move,
        ActionKind::Attack,
        ActionKind::Run,
        ActionKind::Trade,
        ActionKind::Upgrade,
        ActionKind::Eat,
        ActionKind::Give,
        ActionKind::ShowMap,
        ActionKind::Display,
        ActionKind::ShowStats,
        ActionKind::ShowInventory,
        ActionKind::ShowXp,
        ActionKind::DescribeItem,
        ActionKind::Login,
        ActionKind::CreateAccount,
        ActionKind::Mark,
        ActionKind::Markers,
        ActionKind::ShortCut,
        ActionKind::Help,
        ActionKind::Who,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Move => "Move",
            ActionKind::Attack => "Attack",
            ActionKind::Run => "Run",
            ActionKind::Trade => "Trade",
            ActionKind::Upgrade => "Upgrade",
            ActionKind::Eat => "Eat",
            ActionKind::Give => "Give",
            ActionKind::ShowMap => "ShowMap",
            ActionKind::Display => "Display",
            ActionKind::ShowStats => "ShowStats",
            ActionKind::ShowInventory => "ShowInventory",
            ActionKind::ShowXp => "ShowXp",
            ActionKind::DescribeItem => "DescribeItem",
            ActionKind::Login => "Login",
            ActionKind::CreateAccount => "CreateAccount",
            ActionKind::Mark => "Mark",
            ActionKind::Markers => "Markers",
            ActionKind::ShortCut => "ShortCut",
            ActionKind::Help => "Help",
            ActionKind::Who => "Who",
        }
    }

    /// Construct the handler for this kind.
    pub fn build(self) -> Box<dyn Action> {
        match self {
            ActionKind::Move => Box::new(movement::Move),
            ActionKind::Attack => Box::new(combat::Attack),
            ActionKind::Run => Box::new(combat::Run),
            ActionKind::Trade => Box::new(trade::Trade),
            ActionKind::Upgrade => Box::new(upgrade::Upgrade),
            ActionKind::Eat => Box::new(items::Eat),
            ActionKind::Give => Box::new(items::Give),
            ActionKind::ShowMap => Box::new(info::ShowMap),
            ActionKind::Display => Box::new(info::Display),
            ActionKind::ShowStats => Box::new(info::ShowStats),
            ActionKind::ShowInventory => Box::new(info::ShowInventory),
            ActionKind::ShowXp => Box::new(info::ShowXp),
            ActionKind::DescribeItem => Box::new(items::DescribeItem),
            ActionKind::Login => Box::new(account::Login),
            ActionKind::CreateAccount => Box::new(account::CreateAccount),
            ActionKind::Mark => Box::new(notes::Mark),
            ActionKind::Markers => Box::new(notes::Markers),
            ActionKind::ShortCut => Box::new(notes::ShortCut),
            ActionKind::Help => Box::new(info::Help),
            ActionKind::Who => Box::new(info::Who),
        }
    }
}

/// User-facing reason a command was refused. Nothing was changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection(pub String);

pub type Parsed = std::result::Result<Box<dyn Command>, Rejection>;

/// Read-only state a command is validated against.
pub struct View<'a> {
    pub ctx: &'a GameContext,
    pub player: &'a Player,
    pub roster: &'a Roster,
    pub world: &'a World,
    pub accounts: &'a Accounts,
}

/// Mutable state a validated command runs against.
pub struct RunCtx<'a> {
    pub ctx: &'a GameContext,
    pub player: PlayerId,
    pub roster: &'a mut Roster,
    pub world: &'a mut World,
    pub accounts: &'a mut Accounts,
    pub rng: &'a mut GameRng,
}

impl RunCtx<'_> {
    pub fn me(&mut self) -> Result<&mut Player> {
        self.roster.require_mut(self.player)
    }
}

pub trait Action: Send + Sync {
    fn kind(&self) -> ActionKind;

    /// One line for `help`.
    fn description(&self) -> &'static str;

    fn matches(&self, command: &str) -> bool;

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed;
}

pub trait Command: Send {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String>;
}

/// A command whose whole effect is a precomputed reply.
pub struct Reply(pub String);

impl Command for Reply {
    fn run(self: Box<Self>, _ctx: &mut RunCtx<'_>) -> Result<String> {
        Ok(self.0)
    }
}

pub fn reject(msg: impl Into<String>) -> Parsed {
    Err(Rejection(msg.into()))
}

pub fn reply(text: impl Into<String>) -> Parsed {
    Ok(Box::new(Reply(text.into())))
}

/// Handlers for every [`ActionKind`], in match order.
pub struct ActionCatalog {
    actions: Vec<Box<dyn Action>>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self {
            actions: ActionKind::ALL.iter().map(|k| k.build()).collect(),
        }
    }

    pub fn get(&self, kind: ActionKind) -> Option<&dyn Action> {
        self.actions
            .iter()
            .find(|a| a.kind() == kind)
            .map(|a| a.as_ref())
    }

    /// First action whose `matches` accepts `command`.
    pub fn find(&self, command: &str) -> Option<&dyn Action> {
        self.actions
            .iter()
            .find(|a| a.matches(command))
            .map(|a| a.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Action> {
        self.actions.iter().map(|a| a.as_ref())
    }
}

impl Default for ActionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

pub fn first_word(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

/// Everything after the first word, trimmed; `None` when that is empty.
pub fn command_arg(command: &str) -> Option<&str> {
    let s = command.trim_start();
    let i = s.find(char::is_whitespace)?;
    let arg = s[i..].trim();
    if arg.is_empty() { None } else { Some(arg) }
}

/// Join words into an item name. `-` and `_` stand in for spaces.
pub fn item_name<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    words
        .into_iter()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(['-', '_'], " ")
        .to_ascii_lowercase()
}
