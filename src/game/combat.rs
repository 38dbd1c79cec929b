use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::cards::CardType;
use super::characters::{realized_damage, AbilityKind, CharacterKind, CharacterState};
use super::Side;

/// 一方在本回合的结算结果。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SideOutcome {
    pub damage_taken: u8,
    pub energy_gained: u8,
    pub health_gained: u8,
}

/// 结算过程中产生的效果，按发生顺序记录。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum BattleEffect {
    Recovered {
        side: Side,
        amount: u8,
    },
    Overpowered {
        winner: Side,
        winning_card: CardType,
        losing_card: CardType,
    },
    Cancelled {
        player_card: CardType,
        ai_card: CardType,
    },
    Blocked {
        defender: Side,
        defense: CardType,
        attack: CardType,
    },
    Reflected {
        reflector: Side,
        amount: u8,
    },
    BerserkerHealed {
        side: Side,
        amount: u8,
    },
}

impl fmt::Display for BattleEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleEffect::Recovered { side, amount } => {
                write!(f, "{side}回气，获得{amount}点费用")
            }
            BattleEffect::Overpowered {
                winner,
                winning_card,
                losing_card,
            } => write!(
                f,
                "{winner}的{winning_card}压制了{}的{losing_card}",
                winner.opponent()
            ),
            BattleEffect::Cancelled {
                player_card,
                ai_card,
            } => write!(f, "{player_card}与{ai_card}互相抵消"),
            BattleEffect::Blocked {
                defender,
                defense,
                attack,
            } => write!(f, "{defender}的{defense}挡住了{attack}"),
            BattleEffect::Reflected { reflector, amount } => {
                write!(f, "{reflector}反弹了攻击，{}受到{amount}点伤害", reflector.opponent())
            }
            BattleEffect::BerserkerHealed { side, amount } => {
                write!(f, "{side}的狂战士造成伤害，回复{amount}点血量")
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BattleResult {
    pub player: SideOutcome,
    pub ai: SideOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<BattleEffect>,
}

impl BattleResult {
    pub fn side(&self, side: Side) -> &SideOutcome {
        match side {
            Side::Player => &self.player,
            Side::Ai => &self.ai,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideOutcome {
        match side {
            Side::Player => &mut self.player,
            Side::Ai => &mut self.ai,
        }
    }

    pub fn narrative(&self) -> Vec<String> {
        self.effects.iter().map(ToString::to_string).collect()
    }

    fn push(&mut self, effect: BattleEffect) {
        self.effects.push(effect);
    }
}

/// 胜出的攻击：由哪一方发出、是哪张牌、造成多少伤害。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WinningAttack {
    attacker: Side,
    card: CardType,
    damage: u8,
}

/// 回合结算器。纯函数，不修改角色状态，费用也不在这里扣除。
#[derive(Debug, Default)]
pub struct CombatResolver;

impl CombatResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        player_card: CardType,
        ai_card: CardType,
        player: &CharacterState,
        ai: &CharacterState,
    ) -> BattleResult {
        resolve_round(player_card, ai_card, player.kind, ai.kind)
    }
}

pub fn resolve_round(
    player_card: CardType,
    ai_card: CardType,
    player_kind: CharacterKind,
    ai_kind: CharacterKind,
) -> BattleResult {
    let card_of = |side: Side| match side {
        Side::Player => player_card,
        Side::Ai => ai_card,
    };
    let kind_of = |side: Side| match side {
        Side::Player => player_kind,
        Side::Ai => ai_kind,
    };

    let mut result = BattleResult::default();

    let reflecting = |side: Side| card_of(side) == CardType::Reflect;

    for side in Side::BOTH {
        let gained = energy_from(&[card_of(side)]);
        if gained > 0 {
            result.side_mut(side).energy_gained = gained;
            result.push(BattleEffect::Recovered {
                side,
                amount: gained,
            });
        }
    }

    let Some(winning) = arbitrate(player_card, ai_card, player_kind, ai_kind, &mut result) else {
        return result;
    };

    let defender = winning.attacker.opponent();
    let defense = card_of(defender);
    let mut damage = winning.damage;
    if defense.is_defense() && defense.blocks(winning.card) {
        damage = 0;
        result.push(BattleEffect::Blocked {
            defender,
            defense,
            attack: winning.card,
        });
    }

    if damage == 0 {
        return result;
    }

    let landed_on_defender = if reflecting(defender) {
        result.side_mut(winning.attacker).damage_taken = damage;
        result.push(BattleEffect::Reflected {
            reflector: defender,
            amount: damage,
        });
        false
    } else {
        result.side_mut(defender).damage_taken = damage;
        true
    };

    // 反弹回去的伤害不算狂战士自己的攻击
    if landed_on_defender && kind_of(winning.attacker).ability() == AbilityKind::Berserker {
        result.side_mut(winning.attacker).health_gained += 1;
        result.push(BattleEffect::BerserkerHealed {
            side: winning.attacker,
            amount: 1,
        });
    }

    result
}

/// 所选牌中所有回气的费用之和。
fn energy_from(cards: &[CardType]) -> u8 {
    cards
        .iter()
        .filter(|card| **card == CardType::Recover)
        .map(|card| card.definition().energy_value)
        .sum()
}

/// 攻防判定：只有一方攻击时直接胜出；双方攻击时比较优先级，相同则互相抵消。
fn arbitrate(
    player_card: CardType,
    ai_card: CardType,
    player_kind: CharacterKind,
    ai_kind: CharacterKind,
    result: &mut BattleResult,
) -> Option<WinningAttack> {
    let player_attack = WinningAttack {
        attacker: Side::Player,
        card: player_card,
        damage: realized_damage(player_card, player_kind),
    };
    let ai_attack = WinningAttack {
        attacker: Side::Ai,
        card: ai_card,
        damage: realized_damage(ai_card, ai_kind),
    };

    match (player_card.is_attack(), ai_card.is_attack()) {
        (false, false) => None,
        (true, false) => Some(player_attack),
        (false, true) => Some(ai_attack),
        (true, true) => {
            let player_priority = player_card.definition().priority;
            let ai_priority = ai_card.definition().priority;
            match player_priority.cmp(&ai_priority) {
                Ordering::Greater => {
                    result.push(BattleEffect::Overpowered {
                        winner: Side::Player,
                        winning_card: player_card,
                        losing_card: ai_card,
                    });
                    Some(player_attack)
                }
                Ordering::Less => {
                    result.push(BattleEffect::Overpowered {
                        winner: Side::Ai,
                        winning_card: ai_card,
                        losing_card: player_card,
                    });
                    Some(ai_attack)
                }
                Ordering::Equal => {
                    result.push(BattleEffect::Cancelled {
                        player_card,
                        ai_card,
                    });
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::cards::{ALL_CARDS, ATTACK_CARDS};

    fn knights(player_card: CardType, ai_card: CardType) -> BattleResult {
        resolve_round(
            player_card,
            ai_card,
            CharacterKind::Knight,
            CharacterKind::Knight,
        )
    }

    #[test]
    fn big_wave_overpowers_strike() {
        let result = knights(CardType::BigWave, CardType::Strike);
        assert_eq!(result.ai.damage_taken, 2);
        assert_eq!(result.player.damage_taken, 0);
        assert!(!result
            .effects
            .iter()
            .any(|effect| matches!(effect, BattleEffect::Blocked { .. })));
    }

    #[test]
    fn guard_blocks_strike() {
        let result = knights(CardType::Strike, CardType::Guard);
        assert_eq!(result.ai.damage_taken, 0);
        assert_eq!(result.player.damage_taken, 0);
        assert_eq!(
            result.effects,
            vec![BattleEffect::Blocked {
                defender: Side::Ai,
                defense: CardType::Guard,
                attack: CardType::Strike,
            }]
        );
    }

    #[test]
    fn reflect_returns_qi_blast() {
        let result = knights(CardType::QiBlast, CardType::Reflect);
        assert_eq!(result.player.damage_taken, 1);
        assert_eq!(result.ai.damage_taken, 0);
    }

    #[test]
    fn double_recover_gives_both_energy() {
        let result = knights(CardType::Recover, CardType::Recover);
        assert_eq!(result.player.energy_gained, 1);
        assert_eq!(result.ai.energy_gained, 1);
        assert_eq!(result.player.damage_taken + result.ai.damage_taken, 0);
        let narrative = result.narrative();
        assert_eq!(narrative.len(), 2, "one recover line per side: {narrative:?}");
    }

    #[test]
    fn berserker_heals_when_big_wave_lands() {
        let result = resolve_round(
            CardType::BigWave,
            CardType::Strike,
            CharacterKind::Berserker,
            CharacterKind::Knight,
        );
        assert_eq!(result.ai.damage_taken, 2);
        assert_eq!(result.player.health_gained, 1);
        assert_eq!(result.ai.health_gained, 0);
    }

    #[test]
    fn attack_pairs_follow_priority() {
        for player_card in ATTACK_CARDS {
            for ai_card in ATTACK_CARDS {
                let result = knights(player_card, ai_card);
                let player_priority = player_card.definition().priority;
                let ai_priority = ai_card.definition().priority;
                if player_priority > ai_priority {
                    assert_eq!(result.ai.damage_taken, player_card.definition().base_damage);
                    assert_eq!(result.player.damage_taken, 0);
                } else if ai_priority > player_priority {
                    assert_eq!(result.player.damage_taken, ai_card.definition().base_damage);
                    assert_eq!(result.ai.damage_taken, 0);
                } else {
                    assert_eq!(result.player.damage_taken, 0);
                    assert_eq!(result.ai.damage_taken, 0);
                }
            }
        }
    }

    #[test]
    fn defense_cards_block_exactly_their_targets() {
        for attack in ATTACK_CARDS {
            let guarded = knights(attack, CardType::Guard);
            let dodged = knights(attack, CardType::Dodge);
            let damage = attack.definition().base_damage;
            assert_eq!(guarded.ai.damage_taken, if attack.is_melee() { 0 } else { damage });
            assert_eq!(dodged.ai.damage_taken, if attack.is_ranged() { 0 } else { damage });
        }
    }

    #[test]
    fn reflect_redirects_every_attack() {
        for attack in ATTACK_CARDS {
            let result = knights(CardType::Reflect, attack);
            assert_eq!(result.player.damage_taken, 0);
            assert_eq!(result.ai.damage_taken, attack.definition().base_damage);
            assert!(result.effects.contains(&BattleEffect::Reflected {
                reflector: Side::Player,
                amount: attack.definition().base_damage,
            }));
        }
    }

    #[test]
    fn assassin_bonus_applies_before_blocking_and_reflection() {
        let landed = resolve_round(
            CardType::Assassinate,
            CardType::Dodge,
            CharacterKind::Assassin,
            CharacterKind::Knight,
        );
        assert_eq!(landed.ai.damage_taken, 3);

        let reflected = resolve_round(
            CardType::Assassinate,
            CardType::Reflect,
            CharacterKind::Assassin,
            CharacterKind::Knight,
        );
        assert_eq!(reflected.player.damage_taken, 3);
    }

    #[test]
    fn berserker_does_not_heal_when_reflected_or_reflecting() {
        let reflected = resolve_round(
            CardType::Strike,
            CardType::Reflect,
            CharacterKind::Berserker,
            CharacterKind::Knight,
        );
        assert_eq!(reflected.player.damage_taken, 1);
        assert_eq!(reflected.player.health_gained, 0);

        let reflecting = resolve_round(
            CardType::Strike,
            CardType::Reflect,
            CharacterKind::Knight,
            CharacterKind::Berserker,
        );
        assert_eq!(reflecting.ai.health_gained, 0);
    }

    #[test]
    fn berserker_does_not_heal_when_blocked() {
        let result = resolve_round(
            CardType::Strike,
            CardType::Guard,
            CharacterKind::Berserker,
            CharacterKind::Knight,
        );
        assert_eq!(result.player.health_gained, 0);
    }

    #[test]
    fn non_attack_rounds_deal_no_damage() {
        for player_card in ALL_CARDS.iter().filter(|card| card.is_defense()) {
            for ai_card in ALL_CARDS.iter().filter(|card| card.is_defense()) {
                let result = knights(*player_card, *ai_card);
                assert_eq!(result.player.damage_taken, 0);
                assert_eq!(result.ai.damage_taken, 0);
                assert_eq!(
                    result.player.energy_gained,
                    u8::from(*player_card == CardType::Recover)
                );
            }
        }
    }

    #[test]
    fn recover_energy_ignores_arbitration() {
        let result = knights(CardType::Recover, CardType::BigWave);
        assert_eq!(result.player.energy_gained, 1);
        assert_eq!(result.player.damage_taken, 2);
    }

    #[test]
    fn resolver_reads_kinds_from_state() {
        let resolver = CombatResolver::new();
        let assassin = CharacterState::new(CharacterKind::Assassin);
        let knight = CharacterState::new(CharacterKind::Knight);
        let result = resolver.resolve(CardType::Recover, CardType::Assassinate, &knight, &assassin);
        assert_eq!(result.player.damage_taken, 3);
        assert_eq!(result.player.energy_gained, 1);
    }
}
