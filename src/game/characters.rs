use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::cards::CardType;
use super::error::IntegrityError;

/// 五种可选角色。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CharacterKind {
    Knight,
    Mage,
    Tank,
    Assassin,
    Berserker,
}

/// 角色被动能力。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AbilityKind {
    None,
    /// 气功、大波费用 -1。
    SpellDiscount,
    /// 所有攻击牌费用 +1。
    TaxEnemyAttacks,
    /// 刺杀伤害 +1。
    AssassinateBonus,
    /// 造成伤害后回复 1 点血量，由结算器处理。
    Berserker,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CharacterDefinition {
    pub kind: CharacterKind,
    pub name: &'static str,
    pub description: &'static str,
    pub max_health: u8,
    pub initial_health: u8,
    pub initial_energy: u8,
    pub ability: AbilityKind,
}

pub const ALL_CHARACTERS: [CharacterKind; 5] = [
    CharacterKind::Knight,
    CharacterKind::Mage,
    CharacterKind::Tank,
    CharacterKind::Assassin,
    CharacterKind::Berserker,
];

const KNIGHT: CharacterDefinition = CharacterDefinition {
    kind: CharacterKind::Knight,
    name: "骑士",
    description: "Balanced fighter without a special ability",
    max_health: 3,
    initial_health: 3,
    initial_energy: 0,
    ability: AbilityKind::None,
};

const MAGE: CharacterDefinition = CharacterDefinition {
    kind: CharacterKind::Mage,
    name: "法师",
    description: "Qi Blast and Big Wave cost 1 less, but health is low",
    max_health: 2,
    initial_health: 2,
    initial_energy: 0,
    ability: AbilityKind::SpellDiscount,
};

const TANK: CharacterDefinition = CharacterDefinition {
    kind: CharacterKind::Tank,
    name: "肉盾",
    description: "4 health and 1 starting energy, every attack card costs 1 more",
    max_health: 4,
    initial_health: 4,
    initial_energy: 1,
    ability: AbilityKind::TaxEnemyAttacks,
};

const ASSASSIN: CharacterDefinition = CharacterDefinition {
    kind: CharacterKind::Assassin,
    name: "刺客",
    description: "Assassinate deals 1 extra damage",
    max_health: 2,
    initial_health: 2,
    initial_energy: 0,
    ability: AbilityKind::AssassinateBonus,
};

const BERSERKER: CharacterDefinition = CharacterDefinition {
    kind: CharacterKind::Berserker,
    name: "狂战士",
    description: "Starts at 2 of 3 health, heals 1 whenever its attack lands",
    max_health: 3,
    initial_health: 2,
    initial_energy: 0,
    ability: AbilityKind::Berserker,
};

impl CharacterKind {
    pub const fn definition(self) -> &'static CharacterDefinition {
        match self {
            CharacterKind::Knight => &KNIGHT,
            CharacterKind::Mage => &MAGE,
            CharacterKind::Tank => &TANK,
            CharacterKind::Assassin => &ASSASSIN,
            CharacterKind::Berserker => &BERSERKER,
        }
    }

    pub const fn name(self) -> &'static str {
        self.definition().name
    }

    pub const fn ability(self) -> AbilityKind {
        self.definition().ability
    }

    /// 未知角色名回退为骑士，只记录警告。
    pub fn parse_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!(name, "unknown character type, falling back to knight");
            CharacterKind::Knight
        })
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        ALL_CHARACTERS
            .choose(rng)
            .copied()
            .unwrap_or(CharacterKind::Knight)
    }
}

impl Default for CharacterKind {
    fn default() -> Self {
        CharacterKind::Knight
    }
}

impl fmt::Display for CharacterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CharacterKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "knight" | "骑士" => Ok(CharacterKind::Knight),
            "mage" | "法师" => Ok(CharacterKind::Mage),
            "tank" | "肉盾" => Ok(CharacterKind::Tank),
            "assassin" | "刺客" => Ok(CharacterKind::Assassin),
            "berserker" | "狂战士" => Ok(CharacterKind::Berserker),
            _ => Err(()),
        }
    }
}

/// 费用/伤害计算上下文，能力修正只作用在这里。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AbilityContext {
    pub card: CardType,
    pub cost: u8,
    pub damage: u8,
}

impl AbilityContext {
    pub fn for_card(card: CardType) -> Self {
        let definition = card.definition();
        Self {
            card,
            cost: definition.base_cost,
            damage: definition.base_damage,
        }
    }
}

pub fn apply_ability(kind: CharacterKind, mut ctx: AbilityContext) -> AbilityContext {
    match kind.ability() {
        AbilityKind::SpellDiscount => {
            if matches!(ctx.card, CardType::QiBlast | CardType::BigWave) {
                ctx.cost = ctx.cost.saturating_sub(1);
            }
        }
        AbilityKind::TaxEnemyAttacks => {
            if ctx.card.is_attack() {
                ctx.cost = ctx.cost.saturating_add(1);
            }
        }
        AbilityKind::AssassinateBonus => {
            if ctx.card == CardType::Assassinate {
                ctx.damage = ctx.damage.saturating_add(1);
            }
        }
        AbilityKind::Berserker | AbilityKind::None => {}
    }
    ctx
}

/// 出牌方实际支付的费用，只看出牌方自身的能力。
pub fn realized_cost(card: CardType, kind: CharacterKind) -> u8 {
    apply_ability(kind, AbilityContext::for_card(card)).cost
}

pub fn realized_damage(card: CardType, kind: CharacterKind) -> u8 {
    apply_ability(kind, AbilityContext::for_card(card)).damage
}

/// AI 估算对手出某张牌的费用：先套用攻击方能力，
/// 防守方为肉盾时攻击牌再 +1（每个在场的肉盾各计一次）。
pub fn threat_cost(
    card: CardType,
    attacker: CharacterKind,
    defender: CharacterKind,
    count_defender_tank: bool,
) -> u8 {
    let cost = realized_cost(card, attacker);
    if count_defender_tank
        && defender.ability() == AbilityKind::TaxEnemyAttacks
        && card.is_attack()
    {
        cost.saturating_add(1)
    } else {
        cost
    }
}

/// 对战中单个角色的可变状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterState {
    pub kind: CharacterKind,
    pub current_health: u8,
    pub current_energy: u8,
    #[serde(default = "default_alive")]
    pub is_alive: bool,
}

fn default_alive() -> bool {
    true
}

impl CharacterState {
    pub fn new(kind: CharacterKind) -> Self {
        let definition = kind.definition();
        Self {
            kind,
            current_health: definition.initial_health,
            current_energy: definition.initial_energy,
            is_alive: true,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.kind);
    }

    pub fn with_energy(mut self, energy: u8) -> Self {
        self.current_energy = energy;
        self
    }

    pub fn with_health(mut self, health: u8) -> Self {
        self.current_health = health.min(self.max_health());
        self.is_alive = self.current_health > 0;
        self
    }

    pub fn definition(&self) -> &'static CharacterDefinition {
        self.kind.definition()
    }

    pub fn max_health(&self) -> u8 {
        self.definition().max_health
    }

    pub fn realized_cost(&self, card: CardType) -> u8 {
        realized_cost(card, self.kind)
    }

    pub fn can_afford(&self, card: CardType) -> bool {
        self.realized_cost(card) <= self.current_energy
    }

    /// 返回实际扣除的血量。已阵亡时不再受伤。
    pub fn take_damage(&mut self, amount: u8) -> u8 {
        if !self.is_alive {
            return 0;
        }
        let actual = amount.min(self.current_health);
        self.current_health -= actual;
        if self.current_health == 0 {
            self.is_alive = false;
        }
        actual
    }

    /// 返回实际回复量，不超过血量上限。
    pub fn heal(&mut self, amount: u8) -> u8 {
        if !self.is_alive {
            return 0;
        }
        let actual = amount.min(self.max_health().saturating_sub(self.current_health));
        self.current_health += actual;
        actual
    }

    /// 费用达到上限时返回 true，即触发费用胜利。
    pub fn gain_energy(&mut self, amount: u8, cap: u8) -> bool {
        let before = self.current_energy;
        self.current_energy = self.current_energy.saturating_add(amount).min(cap);
        tracing::trace!(
            kind = ?self.kind,
            before,
            after = self.current_energy,
            "energy gained"
        );
        self.current_energy >= cap
    }

    /// 强制出牌可能付不起，扣到 0 为止。
    pub fn spend_energy(&mut self, amount: u8) -> u8 {
        let spent = amount.min(self.current_energy);
        self.current_energy -= spent;
        spent
    }

    pub fn integrity_check(&self, energy_cap: u8) -> Result<(), IntegrityError> {
        let max = self.max_health();
        if self.current_health > max {
            return Err(IntegrityError::HealthOutOfRange {
                value: self.current_health,
                max,
            });
        }
        if self.current_energy > energy_cap {
            return Err(IntegrityError::EnergyOutOfRange {
                value: self.current_energy,
                cap: energy_cap,
            });
        }
        if self.is_alive != (self.current_health > 0) {
            return Err(IntegrityError::AliveFlagMismatch {
                health: self.current_health,
                is_alive: self.is_alive,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::cards::ATTACK_CARDS;

    #[test]
    fn mage_discount_floors_at_zero() {
        assert_eq!(realized_cost(CardType::QiBlast, CharacterKind::Mage), 1);
        assert_eq!(realized_cost(CardType::BigWave, CharacterKind::Mage), 3);
        assert_eq!(realized_cost(CardType::Strike, CharacterKind::Mage), 1);

        let ctx = AbilityContext {
            card: CardType::QiBlast,
            cost: 0,
            damage: 1,
        };
        assert_eq!(apply_ability(CharacterKind::Mage, ctx).cost, 0);
    }

    #[test]
    fn tank_taxes_only_attacks() {
        for attack in ATTACK_CARDS {
            assert_eq!(
                realized_cost(attack, CharacterKind::Tank),
                attack.definition().base_cost + 1
            );
        }
        assert_eq!(realized_cost(CardType::Reflect, CharacterKind::Tank), 2);
        assert_eq!(realized_cost(CardType::Recover, CharacterKind::Tank), 0);
    }

    #[test]
    fn assassin_bonus_only_touches_assassinate_damage() {
        assert_eq!(realized_damage(CardType::Assassinate, CharacterKind::Assassin), 3);
        assert_eq!(realized_damage(CardType::BigWave, CharacterKind::Assassin), 2);
        assert_eq!(realized_cost(CardType::Assassinate, CharacterKind::Assassin), 3);
    }

    #[test]
    fn threat_cost_counts_each_tank_once() {
        assert_eq!(
            threat_cost(CardType::Strike, CharacterKind::Knight, CharacterKind::Tank, true),
            2
        );
        assert_eq!(
            threat_cost(CardType::Strike, CharacterKind::Tank, CharacterKind::Tank, true),
            3
        );
        assert_eq!(
            threat_cost(CardType::Strike, CharacterKind::Tank, CharacterKind::Tank, false),
            2
        );
        assert_eq!(
            threat_cost(CardType::Guard, CharacterKind::Knight, CharacterKind::Tank, true),
            0
        );
    }

    #[test]
    fn reset_uses_archetype_defaults() {
        let mut tank = CharacterState::new(CharacterKind::Tank).with_energy(5);
        tank.take_damage(2);
        tank.reset();
        assert_eq!(tank.current_energy, 1);
        assert_eq!(tank.current_health, 4);

        let berserker = CharacterState::new(CharacterKind::Berserker);
        assert_eq!(berserker.current_health, 2);
        assert_eq!(berserker.max_health(), 3);
    }

    #[test]
    fn damage_and_heal_are_clamped() {
        let mut knight = CharacterState::new(CharacterKind::Knight);
        assert_eq!(knight.heal(2), 0, "already at max health");
        assert_eq!(knight.take_damage(5), 3);
        assert!(!knight.is_alive);
        assert_eq!(knight.heal(1), 0, "dead characters do not heal");
        assert_eq!(knight.take_damage(1), 0);
    }

    #[test]
    fn energy_gain_reports_cap() {
        let mut mage = CharacterState::new(CharacterKind::Mage).with_energy(7);
        assert!(!mage.gain_energy(1, 9));
        assert!(mage.gain_energy(3, 9));
        assert_eq!(mage.current_energy, 9);
        assert_eq!(mage.spend_energy(12), 9);
    }

    #[test]
    fn integrity_check_flags_broken_state() {
        let mut state = CharacterState::new(CharacterKind::Knight);
        assert!(state.integrity_check(9).is_ok());
        state.is_alive = false;
        assert!(matches!(
            state.integrity_check(9),
            Err(IntegrityError::AliveFlagMismatch { .. })
        ));
        state.is_alive = true;
        state.current_energy = 10;
        assert!(matches!(
            state.integrity_check(9),
            Err(IntegrityError::EnergyOutOfRange { value: 10, cap: 9 })
        ));
    }

    #[test]
    fn unknown_character_falls_back_to_knight() {
        assert_eq!(CharacterKind::parse_or_default("狂战士"), CharacterKind::Berserker);
        assert_eq!(CharacterKind::parse_or_default("paladin"), CharacterKind::Knight);
    }
}
