//! 对战核心逻辑模块（卡牌、角色、结算、回合状态机等）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod cards;
pub mod characters;
pub mod combat;
pub mod config;
pub mod error;
pub mod narrative;
pub mod round;

/// 对战双方。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Ai,
}

impl Side {
    /// 固定的结算顺序：先玩家后电脑。
    pub const BOTH: [Side; 2] = [Side::Player, Side::Ai];

    pub const fn opponent(self) -> Side {
        match self {
            Side::Player => Side::Ai,
            Side::Ai => Side::Player,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Player => f.write_str("玩家"),
            Side::Ai => f.write_str("电脑"),
        }
    }
}

impl FromStr for Side {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" | "玩家" => Ok(Side::Player),
            "ai" | "电脑" => Ok(Side::Ai),
            _ => Err(()),
        }
    }
}

pub use cards::{CardCategory, CardDefinition, CardType, PlayedCard, ALL_CARDS, ATTACK_CARDS};
pub use characters::{
    apply_ability,
    realized_cost,
    realized_damage,
    threat_cost,
    AbilityContext,
    AbilityKind,
    CharacterDefinition,
    CharacterKind,
    CharacterState,
    ALL_CHARACTERS,
};
pub use combat::{resolve_round, BattleEffect, BattleResult, CombatResolver, SideOutcome};
pub use config::{MatchConfig, DEFAULT_ENERGY_CAP};
pub use error::{EngineError, IntegrityError};
pub use narrative::describe_round;
pub use round::{MatchEvent, RoundMachine, RoundPhase, RoundReport, VictoryReason, VictoryState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_side_names() {
        assert_eq!("AI ".parse::<Side>(), Ok(Side::Ai));
        assert_eq!("玩家".parse::<Side>(), Ok(Side::Player));
        assert!("computer".parse::<Side>().is_err());
        assert!("".parse::<Side>().is_err());
    }

    #[test]
    fn opponent_flips_side() {
        for side in Side::BOTH {
            assert_ne!(side, side.opponent());
            assert_eq!(side, side.opponent().opponent());
        }
    }
}
