use serde::{Deserialize, Serialize};

use super::error::EngineError;

pub const DEFAULT_ENERGY_CAP: u8 = 9;

/// 对战节奏与规则参数，时间单位均为毫秒。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// 选牌倒计时。
    pub round_time_ms: u64,
    /// 开牌展示时长。
    pub reveal_ms: u64,
    /// 结算结果展示到下一回合开始的时长。
    pub result_display_ms: u64,
    /// 非选牌阶段停留超过该时长即强制回到选牌。
    pub stall_timeout_ms: u64,
    pub energy_cap: u8,
    /// AI 最少思考时间。
    pub ai_min_think_ms: u64,
    /// 剩余时间占比不高于该值时 AI 才会主动选牌。
    pub ai_think_ratio: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            round_time_ms: 9_000,
            reveal_ms: 2_000,
            result_display_ms: 4_500,
            stall_timeout_ms: 10_000,
            energy_cap: DEFAULT_ENERGY_CAP,
            ai_min_think_ms: 2_000,
            ai_think_ratio: 0.5,
        }
    }
}

impl MatchConfig {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: MatchConfig =
            serde_json::from_str(json).map_err(|error| EngineError::InvalidConfig {
                reason: error.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_round_time(mut self, round_time_ms: u64) -> Self {
        self.round_time_ms = round_time_ms;
        self
    }

    pub fn with_energy_cap(mut self, energy_cap: u8) -> Self {
        self.energy_cap = energy_cap;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: &str| {
            Err(EngineError::InvalidConfig {
                reason: reason.to_string(),
            })
        };
        if self.round_time_ms == 0 {
            return invalid("round_time_ms must be positive");
        }
        if self.energy_cap == 0 {
            return invalid("energy_cap must be positive");
        }
        if !(0.0..=1.0).contains(&self.ai_think_ratio) {
            return invalid("ai_think_ratio must be within 0..=1");
        }
        if self.stall_timeout_ms <= self.reveal_ms.max(self.result_display_ms) {
            return invalid("stall_timeout_ms must exceed reveal and result display windows");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = MatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.energy_cap, 9);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = MatchConfig::from_json(r#"{ "round_time_ms": 5000 }"#)
            .expect("partial config should parse");
        assert_eq!(config.round_time_ms, 5_000);
        assert_eq!(config.reveal_ms, 2_000);
    }

    #[test]
    fn rejects_stall_timeout_shorter_than_phases() {
        let error = MatchConfig::from_json(r#"{ "stall_timeout_ms": 1000 }"#)
            .expect_err("stall timeout below reveal window must be rejected");
        assert!(matches!(error, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(MatchConfig::from_json("{ not json").is_err());
    }
}
