use serde::{Deserialize, Serialize};

use super::{CardType, RoundPhase, Side};

/// 角色状态不变量被破坏时的具体原因。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum IntegrityError {
    #[error("health {value} exceeds max health {max}")]
    HealthOutOfRange { value: u8, max: u8 },
    #[error("energy {value} exceeds cap {cap}")]
    EnergyOutOfRange { value: u8, cap: u8 },
    #[error("alive flag {is_alive} disagrees with health {health}")]
    AliveFlagMismatch { health: u8, is_alive: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type")]
pub enum EngineError {
    #[error("unknown card `{name}`")]
    UnknownCard { name: String },
    #[error("unknown character `{name}`")]
    UnknownCharacter { name: String },
    #[error("unknown side `{name}`")]
    UnknownSide { name: String },
    #[error("expected phase {expected:?}, machine is in {actual:?}")]
    WrongPhase {
        expected: RoundPhase,
        actual: RoundPhase,
    },
    #[error("{card} needs {required} energy, only {available} available")]
    CardNotAffordable {
        card: CardType,
        required: u8,
        available: u8,
    },
    #[error("match already finished")]
    MatchFinished,
    #[error("no card selected for {side:?}")]
    MissingSelection { side: Side },
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },
    #[error("integrity violation: {error}")]
    IntegrityViolation { error: IntegrityError },
}

impl From<IntegrityError> for EngineError {
    fn from(error: IntegrityError) -> Self {
        EngineError::IntegrityViolation { error }
    }
}
