use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 八种固定卡牌。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Recover,
    Guard,
    Dodge,
    Reflect,
    Strike,
    QiBlast,
    Assassinate,
    BigWave,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    Attack,
    Defense,
}

/// 卡牌的静态定义，整局对战中不可变。
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CardDefinition {
    pub card: CardType,
    pub name: &'static str,
    pub base_cost: u8,
    pub category: CardCategory,
    /// 仅攻击牌有效，数值越大越先结算。
    pub priority: u8,
    pub base_damage: u8,
    /// 仅回气有效。
    pub energy_value: u8,
    /// 该防御牌能抵挡的攻击类型。反弹不走这里。
    pub targets: &'static [CardType],
}

/// 对战中可用的全部卡牌，按防御类、攻击类排列。
pub const ALL_CARDS: [CardType; 8] = [
    CardType::Recover,
    CardType::Guard,
    CardType::Dodge,
    CardType::Reflect,
    CardType::Strike,
    CardType::QiBlast,
    CardType::Assassinate,
    CardType::BigWave,
];

pub const ATTACK_CARDS: [CardType; 4] = [
    CardType::Strike,
    CardType::QiBlast,
    CardType::Assassinate,
    CardType::BigWave,
];

const RECOVER: CardDefinition = CardDefinition {
    card: CardType::Recover,
    name: "回气",
    base_cost: 0,
    category: CardCategory::Defense,
    priority: 0,
    base_damage: 0,
    energy_value: 1,
    targets: &[],
};

const GUARD: CardDefinition = CardDefinition {
    card: CardType::Guard,
    name: "防御",
    base_cost: 0,
    category: CardCategory::Defense,
    priority: 0,
    base_damage: 0,
    energy_value: 0,
    targets: &[CardType::Strike, CardType::Assassinate],
};

const DODGE: CardDefinition = CardDefinition {
    card: CardType::Dodge,
    name: "闪避",
    base_cost: 0,
    category: CardCategory::Defense,
    priority: 0,
    base_damage: 0,
    energy_value: 0,
    targets: &[CardType::QiBlast, CardType::BigWave],
};

const REFLECT: CardDefinition = CardDefinition {
    card: CardType::Reflect,
    name: "反弹",
    base_cost: 2,
    category: CardCategory::Defense,
    priority: 0,
    base_damage: 0,
    energy_value: 0,
    targets: &[],
};

const STRIKE: CardDefinition = CardDefinition {
    card: CardType::Strike,
    name: "击打",
    base_cost: 1,
    category: CardCategory::Attack,
    priority: 1,
    base_damage: 1,
    energy_value: 0,
    targets: &[],
};

const QI_BLAST: CardDefinition = CardDefinition {
    card: CardType::QiBlast,
    name: "气功",
    base_cost: 2,
    category: CardCategory::Attack,
    priority: 2,
    base_damage: 1,
    energy_value: 0,
    targets: &[],
};

const ASSASSINATE: CardDefinition = CardDefinition {
    card: CardType::Assassinate,
    name: "刺杀",
    base_cost: 3,
    category: CardCategory::Attack,
    priority: 3,
    base_damage: 2,
    energy_value: 0,
    targets: &[],
};

const BIG_WAVE: CardDefinition = CardDefinition {
    card: CardType::BigWave,
    name: "大波",
    base_cost: 4,
    category: CardCategory::Attack,
    priority: 4,
    base_damage: 2,
    energy_value: 0,
    targets: &[],
};

impl CardType {
    pub const fn definition(self) -> &'static CardDefinition {
        match self {
            CardType::Recover => &RECOVER,
            CardType::Guard => &GUARD,
            CardType::Dodge => &DODGE,
            CardType::Reflect => &REFLECT,
            CardType::Strike => &STRIKE,
            CardType::QiBlast => &QI_BLAST,
            CardType::Assassinate => &ASSASSINATE,
            CardType::BigWave => &BIG_WAVE,
        }
    }

    pub const fn name(self) -> &'static str {
        self.definition().name
    }

    pub fn is_attack(self) -> bool {
        self.definition().category == CardCategory::Attack
    }

    pub fn is_defense(self) -> bool {
        self.definition().category == CardCategory::Defense
    }

    /// 近战攻击：击打、刺杀。
    pub fn is_melee(self) -> bool {
        matches!(self, CardType::Strike | CardType::Assassinate)
    }

    /// 远程攻击：气功、大波。
    pub fn is_ranged(self) -> bool {
        matches!(self, CardType::QiBlast | CardType::BigWave)
    }

    /// 本牌作为防御时能否通过 `targets` 抵挡 `attack`。
    pub fn blocks(self, attack: CardType) -> bool {
        self.definition().targets.contains(&attack)
    }

    pub fn all() -> &'static [CardType] {
        &ALL_CARDS
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CardType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recover" | "回气" => Ok(CardType::Recover),
            "guard" | "defend" | "防御" => Ok(CardType::Guard),
            "dodge" | "闪避" => Ok(CardType::Dodge),
            "reflect" | "反弹" => Ok(CardType::Reflect),
            "strike" | "击打" => Ok(CardType::Strike),
            "qi_blast" | "qiblast" | "气功" => Ok(CardType::QiBlast),
            "assassinate" | "刺杀" => Ok(CardType::Assassinate),
            "big_wave" | "bigwave" | "大波" => Ok(CardType::BigWave),
            _ => Err(()),
        }
    }
}

/// 某一方在本回合打出的牌，不携带任何展示状态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayedCard {
    pub card: CardType,
    pub owner: super::Side,
}

impl PlayedCard {
    pub fn new(card: CardType, owner: super::Side) -> Self {
        Self { card, owner }
    }
}
