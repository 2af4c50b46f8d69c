//! Read-only commands. Each one renders its reply while parsing.

use std::fmt::Write as _;

use crate::actions::{Action, ActionKind, Parsed, View, command_arg, first_word, reject, reply};
use crate::render;

fn rendered(r: crate::error::Result<String>) -> Parsed {
    match r {
        Ok(text) => reply(text),
        Err(e) => reject(format!("could not draw that: {e}")),
    }
}

pub struct ShowMap;

impl Action for ShowMap {
    fn kind(&self) -> ActionKind {
        ActionKind::ShowMap
    }

    fn description(&self) -> &'static str {
        "displays the world map.\nusage: map"
    }

    fn matches(&self, command: &str) -> bool {
        command.trim() == "map"
    }

    fn parse(&self, _command: &str, view: &View<'_>) -> Parsed {
        rendered(render::overview(view.world, view.roster, view.player.id()))
    }
}

pub struct Display;

impl Action for Display {
    fn kind(&self) -> ActionKind {
        ActionKind::Display
    }

    fn description(&self) -> &'static str {
        "displays the area around you. @@ is you, ++ are other players and ?? are mobs.\nusage: disp"
    }

    fn matches(&self, command: &str) -> bool {
        command.trim() == "disp"
    }

    fn parse(&self, _command: &str, view: &View<'_>) -> Parsed {
        rendered(render::view(view.world, view.roster, view.player.id()))
    }
}

pub struct ShowStats;

impl Action for ShowStats {
    fn kind(&self) -> ActionKind {
        ActionKind::ShowStats
    }

    fn description(&self) -> &'static str {
        "display your stats.\nusage: stat"
    }

    fn matches(&self, command: &str) -> bool {
        command.trim() == "stat"
    }

    fn parse(&self, _command: &str, view: &View<'_>) -> Parsed {
        let (x, y) = view.player.position();
        reply(format!("position: {x}, {y}\n{}", render::stats(view.player)))
    }
}

pub struct ShowInventory;

impl Action for ShowInventory {
    fn kind(&self) -> ActionKind {
        ActionKind::ShowInventory
    }

    fn description(&self) -> &'static str {
        "displays your inventory.\nusage: inv"
    }

    fn matches(&self, command: &str) -> bool {
        command.trim() == "inv"
    }

    fn parse(&self, _command: &str, view: &View<'_>) -> Parsed {
        reply(render::inventory(view.player))
    }
}

pub struct ShowXp;

impl Action for ShowXp {
    fn kind(&self) -> ActionKind {
        ActionKind::ShowXp
    }

    fn description(&self) -> &'static str {
        "displays your current xp.\nusage: xp"
    }

    fn matches(&self, command: &str) -> bool {
        command.trim() == "xp"
    }

    fn parse(&self, _command: &str, view: &View<'_>) -> Parsed {
        reply(format!("xp: {}", view.player.xp()))
    }
}

pub struct Who;

impl Action for Who {
    fn kind(&self) -> ActionKind {
        ActionKind::Who
    }

    fn description(&self) -> &'static str {
        "lists connected players and their ids.\nusage: who"
    }

    fn matches(&self, command: &str) -> bool {
        command.trim() == "who"
    }

    fn parse(&self, _command: &str, view: &View<'_>) -> Parsed {
        let mut out = format!("players online: {}\n", view.roster.len());
        for p in view.roster.iter() {
            let you = if p.id() == view.player.id() { " (you)" } else { "" };
            let _ = writeln!(out, "{}: {}{you}", p.id(), p.display_name());
        }
        reply(out)
    }
}

const STAT_HELP: &str = "Base Stats vs. Stats:
base stats --> the maximum values that your stats can attain.
stats --> the actual current value of your stats.
for example, your health under 'stats' might be 7, but your health under 'base stats' might be 10. that means your current health is 7, and your max health is 10.
Stat Descriptions:
health --> if this reaches 0, you die, your inventory is cleared, and you are respawned.
speed --> how many tiles you can move per turn, and who strikes first and how often in a fight.
dmg --> the damage you deal per attack.
view --> how far you can see. a larger view makes 'disp' show a larger area.
";

/// `help`, `help action`, `help stat` or `help <x>`.
pub struct Help;

impl Action for Help {
    fn kind(&self) -> ActionKind {
        ActionKind::Help
    }

    fn description(&self) -> &'static str {
        "the help command.\nusage: help | help action | help stat | help <x>"
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "help"
    }

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed {
        let topic = command_arg(command).map(|t| t.to_ascii_lowercase());
        let mut out = String::new();
        match topic.as_deref() {
            None => {
                out.push_str("welcome to the help menu!\n");
                out.push_str("type 'help action' to learn more about stuff you can do!\n");
                out.push_str("type 'help stat' to learn more about stats!\n");
                out.push_str("or type 'help <x>' and i'll try to guess what you want to know about!\n");
            }
            Some("action") => {
                out.push_str("here's a list of all the actions, and what they are used for:\n");
                for a in view.ctx.actions.iter() {
                    let _ = write!(out, "\n{}:\n{}\n", a.kind().name(), a.description());
                }
            }
            Some("stat") => out.push_str(STAT_HELP),
            Some(guess) => {
                out.push_str("did you mean: \n");
                for a in view.ctx.actions.iter() {
                    if a.kind().name().to_ascii_lowercase().contains(guess) || a.matches(guess) {
                        let _ = write!(out, "\n{}:\n{}\n", a.kind().name(), a.description());
                    }
                }
            }
        }
        reply(out)
    }
}
