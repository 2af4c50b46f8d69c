use std::fmt::Write as _;

use rand::seq::SliceRandom;

use crate::actions::{
    Action, ActionKind, Command, Parsed, RunCtx, View, command_arg, first_word, reject, reply,
};
use crate::actions::combat::occupant_gone;
use crate::rng::Roll;
use crate::entity::Mob;
use crate::error::Result;
use crate::world::World;

pub const DEFAULT_TRADE_ITEMS: i64 = 4;
pub const DEFAULT_VALUE_BONUS: i64 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Offer {
    pub item: String,
    pub xp: i64,
}

/// What a trading mob standing on `(x, y)` pays for. Drawn from the tile generator only, so the
/// same tile always makes the same offers.
pub fn offers(world: &World, mob: &Mob, x: i64, y: i64) -> Vec<Offer> {
    let attrs = mob.base_stats();
    let count = attrs
        .int_or("num trade items", DEFAULT_TRADE_ITEMS)
        .unwrap_or(DEFAULT_TRADE_ITEMS)
        .max(0) as usize;
    let bonus = attrs
        .int_or("max base value bonus", DEFAULT_VALUE_BONUS)
        .unwrap_or(DEFAULT_VALUE_BONUS)
        .max(0);

    let items = world.registries().items.iter().collect::<Vec<_>>();
    let mut rng = world.tile_rng(x, y);
    let picked = items
        .choose_multiple(&mut rng, count)
        .copied()
        .collect::<Vec<_>>();
    picked
        .into_iter()
        .map(|e| {
            let base = e.attrs().int_or("base value", 1).unwrap_or(1);
            Offer {
                item: e.name().to_string(),
                xp: base + rng.roll_range(0, bonus),
            }
        })
        .collect()
}

fn menu(offers: &[Offer]) -> String {
    let mut out = String::from("I can give: \n");
    for (i, o) in offers.iter().enumerate() {
        let _ = writeln!(out, "{}. {} xp for {}", i + 1, o.xp, o.item);
    }
    out.push_str("type 'trade <trade-number> <trade-amount>' to trade.\n");
    out
}

/// `trade` shows the menu; `trade <n> <amount>` sells.
pub struct Trade;

impl Action for Trade {
    fn kind(&self) -> ActionKind {
        ActionKind::Trade
    }

    fn description(&self) -> &'static str {
        "trade lists what a trader pays. trade <number> <amount> sells that many items for xp."
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "trade"
    }

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed {
        let Some(e) = view.player.encounter() else {
            return reject("you aren't currently interacting with a mob!");
        };
        if !e.mob.trades() {
            return reject(format!("you can't trade with {}", e.mob.name()));
        }
        if occupant_gone(e, view) {
            return reject(format!("{} has left. type 'run' to move on.", e.mob.name()));
        }
        let offers = offers(view.world, &e.mob, e.x, e.y);

        let Some(args) = command_arg(command) else {
            return reply(menu(&offers));
        };
        let mut words = args.split_whitespace();
        let Some(number) = words.next() else {
            return reject("You need to type which number trade you are making!");
        };
        let Some(offer) = number
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| offers.get(i))
        else {
            return reject(format!("the trade number must be between 1 and {}!", offers.len()));
        };
        let Some(amount) = words.next().and_then(|a| a.parse::<u32>().ok()) else {
            return reject("You need to type the amount of items you are going to trade!");
        };
        if amount == 0 {
            return reject("you have to trade at least one item!");
        }
        let have = view.player.item_count(&offer.item);
        if have < amount {
            return reject(format!("You only have {have} of that item."));
        }
        Ok(Box::new(TradeCmd {
            item: offer.item.clone(),
            amount,
            xp: offer.xp,
        }))
    }
}

struct TradeCmd {
    item: String,
    amount: u32,
    xp: i64,
}

impl Command for TradeCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        let player = ctx.me()?;
        player.remove_from_inventory(&self.item, self.amount)?;
        let total = self.xp.saturating_mul(i64::from(self.amount));
        player.add_xp(total);
        Ok(format!("you got {total} xp.\n"))
    }
}
