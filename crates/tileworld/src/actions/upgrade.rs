use crate::actions::{
    Action, ActionKind, Command, Parsed, RunCtx, View, command_arg, first_word, reject,
};
use crate::error::Result;
use crate::player::STATS;

/// `upgrade <stat>`: spend xp to raise a stat's cap by one.
pub struct Upgrade;

impl Action for Upgrade {
    fn kind(&self) -> ActionKind {
        ActionKind::Upgrade
    }

    fn description(&self) -> &'static str {
        "upgrade <stat> raises a stat by one. it costs the stat's level times 100 xp."
    }

    fn matches(&self, command: &str) -> bool {
        first_word(command) == "upgrade"
    }

    fn parse(&self, command: &str, view: &View<'_>) -> Parsed {
        let Some(stat) = command_arg(command) else {
            return reject("you need to type the stat to upgrade!");
        };
        let stat = stat.to_ascii_lowercase();
        let Some(stat) = STATS.iter().copied().find(|s| *s == stat) else {
            return reject("you don't have that stat!");
        };
        let Ok(cost) = view.player.upgrade_cost(stat) else {
            return reject("you don't have that stat!");
        };
        let xp = view.player.xp();
        if xp < cost {
            return reject(format!(
                "you need {cost} xp to level up this stat. You only have {xp} xp."
            ));
        }
        Ok(Box::new(UpgradeCmd { stat }))
    }
}

struct UpgradeCmd {
    stat: &'static str,
}

impl Command for UpgradeCmd {
    fn run(self: Box<Self>, ctx: &mut RunCtx<'_>) -> Result<String> {
        ctx.me()?.upgrade_base_stat(self.stat)?;
        Ok(format!("Your {} was increased by 1.", self.stat))
    }
}

#[cfg(test)]
mod tests {
    use crate::actions::tests::game;

    #[test]
    fn insufficient_xp_changes_nothing() {
        let (mut g, id) = game();
        g.player_mut(id).unwrap().add_xp(20);
        let out = g.handle(id, "upgrade speed").unwrap();
        assert_eq!(out, "you need 500 xp to level up this stat. You only have 20 xp.");
        let p = g.player(id).unwrap();
        assert_eq!(p.base_stat("speed").unwrap(), 5);
        assert_eq!(p.xp(), 20);
    }

    #[test]
    fn upgrade_spends_xp() {
        let (mut g, id) = game();
        g.player_mut(id).unwrap().add_xp(150);
        assert_eq!(g.handle(id, "upgrade dmg").unwrap(), "Your dmg was increased by 1.");
        let p = g.player(id).unwrap();
        assert_eq!(p.base_stat("dmg").unwrap(), 2);
        assert_eq!(p.stat("dmg").unwrap(), 2);
        assert_eq!(p.xp(), 50);
    }

    #[test]
    fn unknown_or_missing_stat() {
        let (mut g, id) = game();
        assert_eq!(g.handle(id, "upgrade").unwrap(), "you need to type the stat to upgrade!");
        assert_eq!(g.handle(id, "upgrade luck").unwrap(), "you don't have that stat!");
    }
}
