use crate::actions::{
    Action, ActionKind, Command, Parsed, RunCtx, View, command_arg, first_word, item_name, reject,
    reply,
};
use crate::error::Result;
use crate::player::PlayerId;

/// `eat <amount> <item>`.
pub struct Eat;

impl Action for Eat {
    fn kind(&self) -> ActionKind {
        ActionKind::Eat
    }

    fn description(&self) -> &'static str {
        "eat <amount> <item> eats food from your inventory to recover health."
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "eat"
    }

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed {
        let mut words = command_arg(command).unwrap_or("").split_whitespace();
        let Some(amount) = words.next().and_then(|w| w.parse::<i64>().ok()) else {
            return reject("you need to specify the amount you are going to eat!");
        };
        let item = item_name(words);
        let have = view.player.item_count(&item);
        if have == 0 {
            return reject("you don't have that item!");
        }
        let edible = view
            .world
            .registries()
            .items
            .instantiate_item(&item)
            .map(|i| i.is_edible())
            .unwrap_or(false);
        if !edible {
            return reject("you can't eat that!");
        }
        if amount <= 0 {
            return reject("you can only eat a positive amount!");
        }
        if amount > i64::from(have) {
            return reject(format!("You only have {have} of that item."));
        }
        Ok(Box::new(EatCmd {
            item,
            amount: amount as u32,
        }))
    }
}

struct EatCmd {
    item: String,
    amount: u32,
}

impl Command for EatCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        let gain = ctx.world.registries().items.instantiate_item(&self.item)?.health_gain();
        let player = ctx.me()?;
        player.remove_from_inventory(&self.item, self.amount)?;
        player.change_stat("health", gain.saturating_mul(i64::from(self.amount)))?;
        Ok(format!(
            "you ate {} {}. health: {}/{}\n",
            self.amount,
            self.item,
            player.stat("health")?,
            player.base_stat("health")?
        ))
    }
}

/// `give <player id> <item> <amount>`.
pub struct Give;

impl Action for Give {
    fn kind(&self) -> ActionKind {
        ActionKind::Give
    }

    fn description(&self) -> &'static str {
        "give <player id> <item> <amount> hands items to another player. 'who' lists player ids."
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "give"
    }

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed {
        let words = command_arg(command)
            .unwrap_or("")
            .split_whitespace()
            .collect::<Vec<_>>();
        let Some(to) = words.first().and_then(|w| w.parse::<PlayerId>().ok()) else {
            return reject("you need to type the playerId of the person you are giving to!");
        };
        if view.roster.get(to).is_none() {
            return reject("That player doesn't exist!");
        }
        if to == view.player.id() {
            return reject("you can't give things to yourself!");
        }
        if words.len() < 3 {
            return reject("you need to type the item and the amount you are giving!");
        }
        let item = item_name(words[1..words.len() - 1].iter().copied());
        let have = view.player.item_count(&item);
        if have == 0 {
            return reject("You don't have that item!");
        }
        let Ok(amount) = words[words.len() - 1].parse::<i64>() else {
            return reject("you need to type the amount you are giving!");
        };
        if amount < 0 {
            return reject("Nice try, but you can't give negative donations.");
        }
        if amount == 0 {
            return reject("you have to give at least one!");
        }
        if amount > i64::from(have) {
            return reject(format!("You have {have} of that item, not {amount}."));
        }
        Ok(Box::new(GiveCmd {
            to,
            item,
            amount: amount as u32,
        }))
    }
}

struct GiveCmd {
    to: PlayerId,
    item: String,
    amount: u32,
}

impl Command for GiveCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        // The target is checked first so a vanished player cannot swallow the items.
        ctx.roster.require(self.to)?;
        ctx.me()?.remove_from_inventory(&self.item, self.amount)?;
        ctx.roster
            .require_mut(self.to)?
            .add_to_inventory(&self.item, self.amount);
        Ok(format!(
            "gave {} {} to player with id {}",
            self.amount, self.item, self.to
        ))
    }
}

/// `descr <item>`.
pub struct DescribeItem;

impl Action for DescribeItem {
    fn kind(&self) -> ActionKind {
        ActionKind::DescribeItem
    }

    fn description(&self) -> &'static str {
        "descr <item> describes an item."
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "descr"
    }

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed {
        let item = item_name(command_arg(command).unwrap_or("").split_whitespace());
        let described = view
            .world
            .registries()
            .items
            .instantiate_item(&item)
            .ok()
            .and_then(|i| i.description().map(|d| d.to_string()));
        match described {
            Some(d) => reply(format!("{item}: {d}\n")),
            None => reject("either that item doesn't exist, or it doesn't have a description."),
        }
    }
}
