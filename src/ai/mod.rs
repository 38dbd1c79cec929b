//! AI 选牌模块（威胁评估 + 过滤后随机）。

pub mod selector;

pub use selector::{reasonable_cards, AiChoice, AiConfig, AiSelector, AiStrategy, ThreatAssessment};
