use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::game::{threat_cost, CardType, CharacterState};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiStrategy {
    /// 根据对手可用攻击排除无用防御后随机。
    Heuristic,
    /// 在可出的牌中完全随机。
    Random,
}

impl FromStr for AiStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heuristic" | "smart" | "intelligent" => Ok(AiStrategy::Heuristic),
            "random" => Ok(AiStrategy::Random),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AiConfig {
    pub strategy: AiStrategy,
    /// 评估对手费用时，AI 自己是肉盾也给对手的攻击牌 +1。
    pub count_defender_tank: bool,
}

impl AiConfig {
    pub fn with_strategy(mut self, strategy: AiStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_defender_tank(mut self, count_defender_tank: bool) -> Self {
        self.count_defender_tank = count_defender_tank;
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            strategy: AiStrategy::Heuristic,
            count_defender_tank: true,
        }
    }
}

/// 对手当前付得起哪些攻击牌。
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreatAssessment {
    pub strike: bool,
    pub qi_blast: bool,
    pub assassinate: bool,
    pub big_wave: bool,
}

impl ThreatAssessment {
    pub fn assess(
        opponent: &CharacterState,
        ai: &CharacterState,
        count_defender_tank: bool,
    ) -> Self {
        let affordable = |card: CardType| {
            threat_cost(card, opponent.kind, ai.kind, count_defender_tank) <= opponent.current_energy
        };
        Self {
            strike: affordable(CardType::Strike),
            qi_blast: affordable(CardType::QiBlast),
            assassinate: affordable(CardType::Assassinate),
            big_wave: affordable(CardType::BigWave),
        }
    }

    pub fn melee(&self) -> bool {
        self.strike || self.assassinate
    }

    pub fn ranged(&self) -> bool {
        self.qi_blast || self.big_wave
    }

    pub fn any(&self) -> bool {
        self.melee() || self.ranged()
    }
}

/// 排除明显浪费的防御牌；过滤后为空则退回全部可出的牌。
pub fn reasonable_cards(playable: &[CardType], threat: &ThreatAssessment) -> Vec<CardType> {
    let reasonable: Vec<CardType> = playable
        .iter()
        .copied()
        .filter(|card| {
            if !threat.any() {
                return !card.is_defense() || *card == CardType::Recover;
            }
            match card {
                CardType::Dodge => threat.ranged(),
                CardType::Guard => threat.melee(),
                _ => true,
            }
        })
        .collect();

    if reasonable.is_empty() {
        playable.to_vec()
    } else {
        reasonable
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiChoice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<CardType>,
    pub playable: Vec<CardType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat: Option<ThreatAssessment>,
    pub reasonable: Vec<CardType>,
    pub strategy: AiStrategy,
}

pub struct AiSelector {
    config: AiConfig,
    rng: SmallRng,
}

impl AiSelector {
    pub fn new(config: AiConfig) -> Self {
        Self {
            config,
            rng: SmallRng::from_entropy(),
        }
    }

    pub fn with_seed(config: AiConfig, seed: u64) -> Self {
        Self {
            config,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    pub fn select_card(
        &mut self,
        all_cards: &[CardType],
        ai: &CharacterState,
        opponent: &CharacterState,
    ) -> Option<CardType> {
        self.decide(all_cards, ai, opponent).card
    }

    pub fn decide(
        &mut self,
        all_cards: &[CardType],
        ai: &CharacterState,
        opponent: &CharacterState,
    ) -> AiChoice {
        let playable: Vec<CardType> = all_cards
            .iter()
            .copied()
            .filter(|card| ai.can_afford(*card))
            .collect();
        let strategy = self.config.strategy;

        if playable.is_empty() {
            tracing::debug!(energy = ai.current_energy, "ai has no playable card");
            return AiChoice {
                card: None,
                playable,
                threat: None,
                reasonable: Vec::new(),
                strategy,
            };
        }

        let (threat, reasonable) = match strategy {
            AiStrategy::Random => (None, playable.clone()),
            AiStrategy::Heuristic => {
                let threat =
                    ThreatAssessment::assess(opponent, ai, self.config.count_defender_tank);
                let reasonable = reasonable_cards(&playable, &threat);
                (Some(threat), reasonable)
            }
        };

        let card = reasonable.choose(&mut self.rng).copied();
        tracing::debug!(
            ?strategy,
            ?threat,
            ?playable,
            ?reasonable,
            ?card,
            "ai card selected"
        );

        AiChoice {
            card,
            playable,
            threat,
            reasonable,
            strategy,
        }
    }
}

impl Default for AiSelector {
    fn default() -> Self {
        AiSelector::new(AiConfig::default())
    }
}
