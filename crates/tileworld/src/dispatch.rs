//! Turns one input line into one reply.

use tracing::debug;

use crate::actions::{Rejection, RunCtx, View};
use crate::error::Result;

pub const NO_HISTORY: &str = "You have no commands in your history!";
pub const NO_MATCH: &str = "no action matches your input!";

/// Match, validate, then run `line` for `ctx.player`.
///
/// An empty line repeats the last command that passed validation. A line equal to one of the
/// player's shortcuts is replaced by its command first. Nothing is changed unless validation
/// succeeds.
pub fn dispatch(ctx: &mut RunCtx<'_>, line: &str) -> Result<String> {
    let game = ctx.ctx;
    let line = line.trim();
    let player = ctx.roster.require(ctx.player)?;

    let (action, command) = if line.is_empty() {
        let Some(last) = player.last_command() else {
            return Ok(NO_HISTORY.to_string());
        };
        let Some(action) = game.actions.get(last.kind) else {
            return Ok(NO_MATCH.to_string());
        };
        (action, last.command.clone())
    } else {
        let command = player.shortcut(line).unwrap_or(line).to_string();
        let Some(action) = game.actions.find(&command) else {
            return Ok(NO_MATCH.to_string());
        };
        (action, command)
    };

    let parsed = {
        let view = View {
            ctx: game,
            player,
            roster: &*ctx.roster,
            world: &*ctx.world,
            accounts: &*ctx.accounts,
        };
        action.parse(&command, &view)
    };
    let cmd = match parsed {
        Ok(cmd) => cmd,
        Err(Rejection(msg)) => {
            debug!(player = ctx.player, action = action.kind().name(), %msg, "command rejected");
            return Ok(msg);
        }
    };

    ctx.roster
        .require_mut(ctx.player)?
        .set_last_command(action.kind(), &command);
    cmd.run(ctx)
}
