use super::cards::CardType;
use super::characters::CharacterKind;
use super::combat::BattleResult;
use super::Side;

/// 回合战报：先一句总述，再按受伤、回气、回血的顺序列出数值变化。
pub fn describe_round(
    player_card: CardType,
    ai_card: CardType,
    player_kind: CharacterKind,
    ai_kind: CharacterKind,
    result: &BattleResult,
) -> Vec<String> {
    let label = |side: Side| match side {
        Side::Player => format!("{side}{player_kind}"),
        Side::Ai => format!("{side}{ai_kind}"),
    };
    let card_of = |side: Side| match side {
        Side::Player => player_card,
        Side::Ai => ai_card,
    };

    let mut lines = vec![headline(&label, &card_of, result)];

    for side in Side::BOTH {
        let damage = result.side(side).damage_taken;
        if damage > 0 {
            lines.push(format!("{}受到了{damage}点伤害！", label(side)));
        }
    }
    for side in Side::BOTH {
        let energy = result.side(side).energy_gained;
        if energy > 0 {
            lines.push(format!("{}获得了{energy}点费用！", label(side)));
        }
    }
    for side in Side::BOTH {
        let health = result.side(side).health_gained;
        if health > 0 {
            lines.push(format!("{}回复了{health}点血量！", label(side)));
        }
    }

    lines
}

fn headline(
    label: &impl Fn(Side) -> String,
    card_of: &impl Fn(Side) -> CardType,
    result: &BattleResult,
) -> String {
    let player_card = card_of(Side::Player);
    let ai_card = card_of(Side::Ai);
    let hurt = |side: Side| result.side(side).damage_taken > 0;

    let lone_attacker = match (player_card.is_attack(), ai_card.is_attack()) {
        (true, false) => Some(Side::Player),
        (false, true) => Some(Side::Ai),
        (true, true) => {
            return match (hurt(Side::Player), hurt(Side::Ai)) {
                (true, true) => format!(
                    "{}和{}同时发动攻击，双方两败俱伤！",
                    label(Side::Player),
                    label(Side::Ai)
                ),
                (true, false) => overpowered(label, card_of, Side::Ai),
                (false, true) => overpowered(label, card_of, Side::Player),
                (false, false) => format!(
                    "{}和{}同时使用了攻击技能，势均力敌！",
                    label(Side::Player),
                    label(Side::Ai)
                ),
            };
        }
        (false, false) => None,
    };

    let Some(attacker) = lone_attacker else {
        return format!(
            "{}使用了{player_card}，{}选择了{ai_card}！",
            label(Side::Player),
            label(Side::Ai)
        );
    };

    let defender = attacker.opponent();
    let attack = card_of(attacker);
    let defense = card_of(defender);
    if hurt(defender) {
        return format!(
            "{}的{attack}突破了{}的{defense}！",
            label(attacker),
            label(defender)
        );
    }
    match defense {
        CardType::Dodge => format!(
            "{}灵活地躲过了{}的{attack}！",
            label(defender),
            label(attacker)
        ),
        CardType::Reflect => format!(
            "{}用{defense}将{}的{attack}原样奉还！",
            label(defender),
            label(attacker)
        ),
        _ => format!(
            "{}成功用{defense}格挡了{}的{attack}！",
            label(defender),
            label(attacker)
        ),
    }
}

fn overpowered(
    label: &impl Fn(Side) -> String,
    card_of: &impl Fn(Side) -> CardType,
    winner: Side,
) -> String {
    let loser = winner.opponent();
    format!(
        "{}的{}压制了{}的{}！",
        label(winner),
        card_of(winner),
        label(loser),
        card_of(loser)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::combat::resolve_round;

    fn narrate(
        player_card: CardType,
        ai_card: CardType,
        player_kind: CharacterKind,
        ai_kind: CharacterKind,
    ) -> Vec<String> {
        let result = resolve_round(player_card, ai_card, player_kind, ai_kind);
        describe_round(player_card, ai_card, player_kind, ai_kind, &result)
    }

    #[test]
    fn double_recover_mentions_both_sides() {
        let lines = narrate(
            CardType::Recover,
            CardType::Recover,
            CharacterKind::Knight,
            CharacterKind::Mage,
        );
        assert_eq!(
            lines,
            vec![
                "玩家骑士使用了回气，电脑法师选择了回气！".to_string(),
                "玩家骑士获得了1点费用！".to_string(),
                "电脑法师获得了1点费用！".to_string(),
            ]
        );
    }

    #[test]
    fn blocked_strike_has_no_damage_lines() {
        let lines = narrate(
            CardType::Strike,
            CardType::Guard,
            CharacterKind::Knight,
            CharacterKind::Knight,
        );
        assert_eq!(lines, vec!["电脑骑士成功用防御格挡了玩家骑士的击打！".to_string()]);
    }

    #[test]
    fn dodge_and_reflect_get_their_own_headline() {
        let dodged = narrate(
            CardType::Dodge,
            CardType::BigWave,
            CharacterKind::Knight,
            CharacterKind::Knight,
        );
        assert!(dodged[0].contains("躲过"), "{dodged:?}");

        let reflected = narrate(
            CardType::QiBlast,
            CardType::Reflect,
            CharacterKind::Knight,
            CharacterKind::Tank,
        );
        assert!(reflected[0].contains("原样奉还"), "{reflected:?}");
        assert_eq!(reflected[1], "玩家骑士受到了1点伤害！");
    }

    #[test]
    fn attack_through_recover_breaks_defense() {
        let lines = narrate(
            CardType::Recover,
            CardType::Strike,
            CharacterKind::Knight,
            CharacterKind::Knight,
        );
        assert_eq!(lines[0], "电脑骑士的击打突破了玩家骑士的回气！");
        assert_eq!(lines[1], "玩家骑士受到了1点伤害！");
        assert_eq!(lines[2], "玩家骑士获得了1点费用！");
    }

    #[test]
    fn attack_clash_headlines() {
        let overpowered = narrate(
            CardType::BigWave,
            CardType::Strike,
            CharacterKind::Berserker,
            CharacterKind::Knight,
        );
        assert_eq!(overpowered[0], "玩家狂战士的大波压制了电脑骑士的击打！");
        assert_eq!(overpowered.last().map(String::as_str), Some("玩家狂战士回复了1点血量！"));

        let even = narrate(
            CardType::Strike,
            CardType::Strike,
            CharacterKind::Knight,
            CharacterKind::Knight,
        );
        assert_eq!(even, vec!["玩家骑士和电脑骑士同时使用了攻击技能，势均力敌！".to_string()]);
    }
}
