//! Per-player markers and command shortcuts.

use crate::actions::{
    Action, ActionKind, Command, Parsed, RunCtx, View, command_arg, first_word, reject, reply,
};
use crate::error::Result;
use crate::render;

pub struct Mark;

impl Action for Mark {
    fn kind(&self) -> ActionKind {
        ActionKind::Mark
    }

    fn description(&self) -> &'static str {
        "marks your current position so you can find it again.\nusage: mark <description>"
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "mark"
    }

    fn parse(&self, command: &str, _view: &View<'_>) -> Parsed {
        let Some(description) = command_arg(command) else {
            return reject("you need to type a description of your marker!");
        };
        Ok(Box::new(MarkCmd {
            description: description.to_string(),
        }))
    }
}

struct MarkCmd {
    description: String,
}

impl Command for MarkCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        let player = ctx.me()?;
        player.add_marker(&self.description);
        let (x, y) = player.position();
        Ok(format!(
            "successfully created marker {} at {x}, {y}",
            self.description
        ))
    }
}

pub struct Markers;

impl Action for Markers {
    fn kind(&self) -> ActionKind {
        ActionKind::Markers
    }

    fn description(&self) -> &'static str {
        "lists the markers you've placed.\nusage: markers"
    }

    fn matches(&self, command: &str) -> bool {
        command.trim() == "markers"
    }

    fn parse(&self, _command: &str, view: &View<'_>) -> Parsed {
        reply(render::markers(view.player))
    }
}

/// `short <alias> <command...>`: typing the alias alone runs the command.
pub struct ShortCut;

impl Action for ShortCut {
    fn kind(&self) -> ActionKind {
        ActionKind::ShortCut
    }

    fn description(&self) -> &'static str {
        "maps a short name to a longer command.\nusage: short <name> <command>\nexample: short e eat 1 bread"
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "short"
    }

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed {
        let Some(args) = command_arg(command) else {
            return reject("you need to specify the short version of the command!");
        };
        let (alias, mapped) = match args.split_once(char::is_whitespace) {
            Some((a, m)) => (a, m.trim()),
            None => (args, ""),
        };
        if let Some(a) = view.ctx.actions.find(alias) {
            return reject(format!(
                "your short command maps to {} please choose a different name for your short command.",
                a.kind().name()
            ));
        }
        if mapped.is_empty() {
            return reject("you need to specify what the short version of the command maps to!");
        }
        if view.ctx.actions.find(mapped).is_none() {
            return reject(format!("no command matches {mapped}"));
        }
        Ok(Box::new(ShortCutCmd {
            alias: alias.to_string(),
            mapped: mapped.to_string(),
        }))
    }
}

struct ShortCutCmd {
    alias: String,
    mapped: String,
}

impl Command for ShortCutCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        ctx.me()?.set_shortcut(&self.alias, &self.mapped);
        Ok(format!(
            "mapped {} to {} successfully.",
            self.alias, self.mapped
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::tests::game;

    #[test]
    fn markers_are_listed_in_order() {
        let (mut g, id) = game();
        assert_eq!(g.handle(id, "markers").unwrap(), "you haven't placed any markers.\n");
        assert_eq!(
            g.handle(id, "mark the old well").unwrap(),
            "successfully created marker the old well at 10, 10"
        );
        g.handle(id, "d2").unwrap();
        g.handle(id, "mark camp").unwrap();
        assert_eq!(
            g.handle(id, "markers").unwrap(),
            "(10, 10) - the old well\n(12, 10) - camp\n"
        );
    }

    #[test]
    fn shortcuts_expand_before_dispatch() {
        let (mut g, id) = game();
        assert_eq!(g.handle(id, "short x d2").unwrap(), "mapped x to d2 successfully.");
        g.handle(id, "x").unwrap();
        assert_eq!(g.player(id).unwrap().position(), (12, 10));
    }

    #[test]
    fn shortcut_rejections() {
        let (mut g, id) = game();
        assert_eq!(
            g.handle(id, "short inv stat").unwrap(),
            "your short command maps to ShowInventory please choose a different name for your short command."
        );
        assert_eq!(g.handle(id, "short zz dance").unwrap(), "no command matches dance");
        assert_eq!(
            g.handle(id, "short zz").unwrap(),
            "you need to specify what the short version of the command maps to!"
        );
    }
}
