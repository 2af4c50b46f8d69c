use tracing::info;

use crate::actions::{
    Action, ActionKind, Command, Parsed, RunCtx, View, command_arg, first_word, reject,
};
use crate::error::Result;

fn valid_name(name: &str) -> bool {
    name.len() <= 32
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Checks shared by login and account creation. Returns the name.
fn account_name<'a>(command: &'a str, view: &View<'_>, missing: &str) -> Result<&'a str, String> {
    let Some(name) = command_arg(command).and_then(|a| a.split_whitespace().next()) else {
        return Err(missing.to_string());
    };
    if let Some(current) = view.player.account() {
        return Err(format!("you are already logged in as {current}."));
    }
    if !valid_name(name) {
        return Err("account names may only use letters, digits, '-' and '_'.".to_string());
    }
    Ok(name)
}

/// `login <name>`: continue as a saved account.
pub struct Login;

impl Action for Login {
    fn kind(&self) -> ActionKind {
        ActionKind::Login
    }

    fn description(&self) -> &'static str {
        "logs in to an existing account, restoring its position, stats, xp and inventory.\nusage: login <name>"
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "login"
    }

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed {
        let name = match account_name(command, view, "you have to type in your name to login.") {
            Ok(n) => n,
            Err(msg) => return reject(msg),
        };
        if !view.accounts.contains(name) {
            return reject(
                "Login failed: there is no user with that name! Use createAccount <name> to make an account with that name on the server.\n",
            );
        }
        if view.roster.account_holder(name).is_some() {
            return reject(format!("{name} is already logged in."));
        }
        Ok(Box::new(LoginCmd {
            name: name.to_string(),
        }))
    }
}

struct LoginCmd {
    name: String,
}

impl Command for LoginCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        let Some(acct) = ctx.accounts.get(&self.name).cloned() else {
            return Ok("Login failed: the account disappeared.\n".to_string());
        };
        let world = &*ctx.world;
        let player = ctx.roster.require_mut(ctx.player)?;
        player.apply_account(&acct)?;

        // The saved spot may have become unusable since the last visit.
        let (x, y) = player.position();
        let usable = world
            .block(x, y)
            .map(|b| !b.is_solid() && !b.is_water())
            .unwrap_or(false)
            && !world.has_occupant(x, y);
        if !usable {
            let (nx, ny) = world.spawn_point(ctx.rng)?;
            player.move_to(nx, ny);
        }
        info!(player = ctx.player, account = %self.name, "account login");
        Ok("Login successful.\n".to_string())
    }
}

/// `createAccount <name>`: save the current player under a new name.
pub struct CreateAccount;

impl Action for CreateAccount {
    fn kind(&self) -> ActionKind {
        ActionKind::CreateAccount
    }

    fn description(&self) -> &'static str {
        "creates a new account with the provided name.\nusage: createAccount <name>"
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command).eq_ignore_ascii_case("createAccount")
    }

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed {
        let name = match account_name(command, view, "you have to type in your name to make a new account.") {
            Ok(n) => n,
            Err(msg) => return reject(msg),
        };
        if view.accounts.contains(name) {
            return reject(
                "Account creation failed: there is already a user with that name! Use login <name> to login to an account with that name on this server.\n",
            );
        }
        Ok(Box::new(CreateCmd {
            name: name.to_string(),
        }))
    }
}

struct CreateCmd {
    name: String,
}

impl Command for CreateCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        let player = ctx.roster.require_mut(ctx.player)?;
        player.set_account(&self.name);
        ctx.accounts.upsert(player.to_account(&self.name));
        info!(player = ctx.player, account = %self.name, "account created");
        Ok("created account successfully.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::tests::game;

    #[test]
    fn login_requires_an_existing_account() {
        let (mut g, id) = game();
        assert_eq!(g.handle(id, "login").unwrap(), "you have to type in your name to login.");
        assert!(g.handle(id, "login ann").unwrap().starts_with("Login failed"));
        assert!(g.player(id).unwrap().account().is_none());
    }

    #[test]
    fn create_then_login_elsewhere() {
        let (mut g, a) = game();
        g.player_mut(a).unwrap().add_to_inventory("apple", 2);
        assert_eq!(g.handle(a, "createAccount ann").unwrap(), "created account successfully.");
        assert!(g.handle(a, "createAccount bo").unwrap().starts_with("you are already logged in as ann"));

        let (b, _) = g.join().unwrap();
        assert_eq!(g.handle(b, "login ann").unwrap(), "ann is already logged in.");
        assert!(g.handle(b, "createAccount ann").unwrap().starts_with("Account creation failed"));

        g.leave(a).unwrap();
        assert_eq!(g.handle(b, "login ann").unwrap(), "Login successful.\n");
        let p = g.player(b).unwrap();
        assert_eq!(p.account(), Some("ann"));
        assert_eq!(p.item_count("apple"), 2);
        assert_eq!(p.position(), (10, 10));
    }

    #[test]
    fn names_ignore_case() {
        let (mut g, a) = game();
        assert_eq!(g.handle(a, "createAccount ann").unwrap(), "created account successfully.");

        let (b, _) = g.join().unwrap();
        assert!(g.handle(b, "createAccount ANN").unwrap().starts_with("Account creation failed"));
        assert_eq!(g.handle(b, "login Ann").unwrap(), "Ann is already logged in.");
        assert_eq!(g.accounts().len(), 1);

        g.leave(a).unwrap();
        assert_eq!(g.handle(b, "login Ann").unwrap(), "Login successful.\n");
        assert_eq!(g.player(b).unwrap().account(), Some("ann"));
    }

    #[test]
    fn names_are_checked() {
        let (mut g, id) = game();
        assert!(g.handle(id, "createAccount a/b").unwrap().starts_with("account names may only use"));
    }
}
