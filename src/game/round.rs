use serde::{Deserialize, Serialize};

use super::cards::{CardType, PlayedCard, ALL_CARDS};
use super::characters::{CharacterKind, CharacterState};
use super::combat::{BattleResult, CombatResolver};
use super::config::MatchConfig;
use super::error::EngineError;
use super::narrative::describe_round;
use super::Side;
use crate::ai::{AiConfig, AiSelector};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Selecting,
    Revealing,
    Calculating,
    Finished,
}

impl Default for RoundPhase {
    fn default() -> Self {
        Self::Selecting
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum VictoryReason {
    EnergyCap,
    HealthDepleted { loser: Side },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VictoryState {
    pub winner: Side,
    pub reason: VictoryReason,
}

/// 单局对战的事件流，新开一局时清空。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum MatchEvent {
    RoundStarted {
        round: u32,
    },
    CardsRevealed {
        round: u32,
        player_card: CardType,
        ai_card: CardType,
    },
    RoundResolved {
        round: u32,
        result: BattleResult,
    },
    SelectionAborted {
        round: u32,
        missing: Side,
    },
    StallReset {
        round: u32,
        phase: RoundPhase,
    },
    /// 结算后角色状态越界，本回合作废并恢复到结算前。
    RoundRolledBack {
        round: u32,
        error: EngineError,
    },
    MatchWon {
        winner: Side,
        reason: VictoryReason,
    },
}

/// 供展示层使用的回合结算摘要。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundReport {
    pub round: u32,
    pub player_card: CardType,
    pub ai_card: CardType,
    pub result: BattleResult,
    pub narrative: Vec<String>,
}

/// 回合状态机：选牌 → 亮牌 → 结算 →（下一回合 | 结束）。
///
/// 时间由调用方通过 `tick` / `advance` 注入，状态机本身从不等待。
pub struct RoundMachine {
    config: MatchConfig,
    selector: AiSelector,
    resolver: CombatResolver,
    phase: RoundPhase,
    round: u32,
    now: u64,
    /// `tick` 传入的是绝对时间戳；`advance` 只累加相对时长。
    absolute_clock: bool,
    phase_started_at: u64,
    player: CharacterState,
    ai: CharacterState,
    player_highlight: Option<CardType>,
    player_selection: Option<PlayedCard>,
    ai_selection: Option<PlayedCard>,
    last_result: Option<BattleResult>,
    last_report: Option<RoundReport>,
    outcome: Option<VictoryState>,
    event_log: Vec<MatchEvent>,
}

impl RoundMachine {
    pub fn new(
        player_kind: CharacterKind,
        ai_kind: CharacterKind,
        config: MatchConfig,
    ) -> Result<Self, EngineError> {
        Self::with_selector(
            player_kind,
            ai_kind,
            config,
            AiSelector::new(AiConfig::default()),
        )
    }

    pub fn with_selector(
        player_kind: CharacterKind,
        ai_kind: CharacterKind,
        config: MatchConfig,
        selector: AiSelector,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let mut machine = Self {
            config,
            selector,
            resolver: CombatResolver::new(),
            phase: RoundPhase::Selecting,
            round: 0,
            now: 0,
            absolute_clock: false,
            phase_started_at: 0,
            player: CharacterState::new(player_kind),
            ai: CharacterState::new(ai_kind),
            player_highlight: None,
            player_selection: None,
            ai_selection: None,
            last_result: None,
            last_report: None,
            outcome: None,
            event_log: Vec::new(),
        };
        machine.new_match(player_kind, ai_kind);
        Ok(machine)
    }

    /// 重新开局，双方角色恢复初始状态。
    pub fn new_match(&mut self, player_kind: CharacterKind, ai_kind: CharacterKind) {
        self.player = CharacterState::new(player_kind);
        self.ai = CharacterState::new(ai_kind);
        self.round = 0;
        self.last_result = None;
        self.last_report = None;
        self.outcome = None;
        self.event_log.clear();
        tracing::info!(player = ?player_kind, ai = ?ai_kind, "match started");
        self.start_round();
    }

    /// 重新开局，电脑随机换一个角色。
    pub fn restart(&mut self, player_kind: Option<CharacterKind>) {
        let player_kind = player_kind.unwrap_or(self.player.kind);
        let ai_kind = CharacterKind::random(self.selector.rng());
        self.new_match(player_kind, ai_kind);
    }

    /// 以毫秒时间戳推进状态机，时间倒退时忽略。
    ///
    /// 第一次收到绝对时间戳时把时钟平移过去，之前 `advance` 累计的阶段耗时保留。
    pub fn tick(&mut self, now_ms: u64) -> RoundPhase {
        if !self.absolute_clock {
            self.absolute_clock = true;
            let elapsed = self.elapsed();
            self.now = now_ms;
            self.phase_started_at = now_ms.saturating_sub(elapsed);
        }
        self.run_until(now_ms)
    }

    /// 在当前时钟上再推进 `delta_ms` 毫秒。
    pub fn advance(&mut self, delta_ms: u64) -> RoundPhase {
        let now = self.now.saturating_add(delta_ms);
        self.run_until(now)
    }

    fn run_until(&mut self, now_ms: u64) -> RoundPhase {
        self.now = self.now.max(now_ms);

        let before = (self.phase, self.round);
        self.step();
        if (self.phase, self.round) == before {
            self.check_stall();
        }
        self.phase
    }

    /// 高亮（未确认）一张牌，再次高亮同一张则取消。返回当前高亮的牌。
    pub fn highlight_player_card(
        &mut self,
        card: CardType,
    ) -> Result<Option<CardType>, EngineError> {
        self.ensure_selecting()?;
        if self.player_highlight == Some(card) {
            self.player_highlight = None;
            return Ok(None);
        }
        self.ensure_affordable(card)?;
        self.player_highlight = Some(card);
        self.ensure_ai_choice(false);
        Ok(self.player_highlight)
    }

    /// 直接打出一张牌（双击或拖拽）。
    pub fn submit_player_card(&mut self, card: CardType) -> Result<(), EngineError> {
        self.ensure_selecting()?;
        self.ensure_affordable(card)?;
        self.player_highlight = Some(card);
        self.player_selection = Some(PlayedCard::new(card, Side::Player));
        tracing::debug!(round = self.round, card = ?card, "player card submitted");
        self.ensure_ai_choice(true);
        self.try_reveal();
        Ok(())
    }

    /// 打出当前高亮的牌。
    pub fn confirm_selection(&mut self) -> Result<CardType, EngineError> {
        self.ensure_selecting()?;
        let card = self
            .player_highlight
            .ok_or(EngineError::MissingSelection { side: Side::Player })?;
        self.submit_player_card(card)?;
        Ok(card)
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn characters(&self) -> (&CharacterState, &CharacterState) {
        (&self.player, &self.ai)
    }

    pub fn character(&self, side: Side) -> &CharacterState {
        match side {
            Side::Player => &self.player,
            Side::Ai => &self.ai,
        }
    }

    pub fn highlighted_card(&self) -> Option<CardType> {
        self.player_highlight
    }

    pub fn selection(&self, side: Side) -> Option<PlayedCard> {
        match side {
            Side::Player => self.player_selection,
            Side::Ai => self.ai_selection,
        }
    }

    pub fn last_result(&self) -> Option<&BattleResult> {
        self.last_result.as_ref()
    }

    pub fn last_report(&self) -> Option<&RoundReport> {
        self.last_report.as_ref()
    }

    pub fn outcome(&self) -> Option<&VictoryState> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RoundPhase::Finished
    }

    pub fn events(&self) -> &[MatchEvent] {
        &self.event_log
    }

    /// 选牌阶段剩余时间，其他阶段为 0。
    pub fn remaining_round_ms(&self) -> u64 {
        if self.phase != RoundPhase::Selecting {
            return 0;
        }
        self.config.round_time_ms.saturating_sub(self.elapsed())
    }

    pub fn realized_cost(&self, side: Side, card: CardType) -> u8 {
        self.character(side).realized_cost(card)
    }

    pub fn playable_cards(&self, side: Side) -> Vec<CardType> {
        let state = self.character(side);
        ALL_CARDS
            .iter()
            .copied()
            .filter(|card| state.can_afford(*card))
            .collect()
    }

    pub fn integrity_check(&self) -> Result<(), EngineError> {
        self.player.integrity_check(self.config.energy_cap)?;
        self.ai.integrity_check(self.config.energy_cap)?;
        Ok(())
    }

    fn elapsed(&self) -> u64 {
        self.now.saturating_sub(self.phase_started_at)
    }

    fn record_event(&mut self, event: MatchEvent) {
        self.event_log.push(event);
    }

    fn enter(&mut self, phase: RoundPhase) {
        tracing::debug!(round = self.round, from = ?self.phase, to = ?phase, "phase changed");
        self.phase = phase;
        self.phase_started_at = self.now;
    }

    fn ensure_selecting(&self) -> Result<(), EngineError> {
        match self.phase {
            RoundPhase::Selecting => Ok(()),
            RoundPhase::Finished => Err(EngineError::MatchFinished),
            actual => Err(EngineError::WrongPhase {
                expected: RoundPhase::Selecting,
                actual,
            }),
        }
    }

    fn ensure_affordable(&self, card: CardType) -> Result<(), EngineError> {
        let required = self.player.realized_cost(card);
        if required > self.player.current_energy {
            return Err(EngineError::CardNotAffordable {
                card,
                required,
                available: self.player.current_energy,
            });
        }
        Ok(())
    }

    fn start_round(&mut self) {
        self.round += 1;
        self.clear_selections();
        self.enter(RoundPhase::Selecting);
        self.record_event(MatchEvent::RoundStarted { round: self.round });
    }

    fn step(&mut self) {
        match self.phase {
            RoundPhase::Selecting => self.step_selecting(),
            RoundPhase::Revealing => {
                if self.elapsed() >= self.config.reveal_ms {
                    self.calculate();
                }
            }
            RoundPhase::Calculating => {
                if self.elapsed() >= self.config.result_display_ms {
                    self.start_round();
                }
            }
            RoundPhase::Finished => {}
        }
    }

    fn step_selecting(&mut self) {
        let elapsed = self.elapsed();
        if elapsed >= self.config.round_time_ms {
            self.force_selections();
            self.try_reveal();
            return;
        }

        let remaining = self.config.round_time_ms - elapsed;
        let threshold = self.config.round_time_ms as f64 * self.config.ai_think_ratio;
        let player_engaged = self.player_highlight.is_some() || self.player_selection.is_some();
        let ai_ready = elapsed >= self.config.ai_min_think_ms && (remaining as f64) <= threshold;
        if player_engaged || ai_ready {
            self.ensure_ai_choice(false);
        }
        self.try_reveal();
    }

    /// 电脑每回合只选一次。`forced` 时选不出牌就强制回气。
    fn ensure_ai_choice(&mut self, forced: bool) {
        if self.selected_card(Side::Ai).is_some() {
            return;
        }
        let card = match self.selector.select_card(&ALL_CARDS, &self.ai, &self.player) {
            Some(card) => card,
            None if forced => {
                tracing::warn!(round = self.round, "ai has no playable card, forcing recover");
                CardType::Recover
            }
            None => return,
        };
        self.ai_selection = Some(PlayedCard::new(card, Side::Ai));
    }

    /// 倒计时结束：补齐双方未出的牌。
    fn force_selections(&mut self) {
        if self.selected_card(Side::Player).is_none() {
            let card = self.fallback_player_card();
            tracing::debug!(round = self.round, card = ?card, "round timed out, playing for player");
            self.player_selection = Some(PlayedCard::new(card, Side::Player));
        }
        self.ensure_ai_choice(true);
    }

    fn fallback_player_card(&self) -> CardType {
        if let Some(card) = self
            .player_highlight
            .filter(|card| self.player.can_afford(*card))
        {
            return card;
        }
        if self.player.can_afford(CardType::Recover) {
            return CardType::Recover;
        }
        ALL_CARDS
            .iter()
            .copied()
            .filter(|card| self.player.can_afford(*card))
            .min_by_key(|card| self.player.realized_cost(*card))
            .unwrap_or_else(|| {
                tracing::warn!(round = self.round, "player cannot afford any card, forcing recover");
                CardType::Recover
            })
    }

    fn try_reveal(&mut self) {
        if self.phase != RoundPhase::Selecting {
            return;
        }
        let (Some(player_card), Some(ai_card)) =
            (self.selected_card(Side::Player), self.selected_card(Side::Ai))
        else {
            return;
        };
        self.enter(RoundPhase::Revealing);
        self.record_event(MatchEvent::CardsRevealed {
            round: self.round,
            player_card,
            ai_card,
        });
    }

    /// 只认归属正确的出牌。
    fn selected_card(&self, side: Side) -> Option<CardType> {
        self.selection(side)
            .filter(|played| played.owner == side)
            .map(|played| played.card)
    }

    fn clear_selections(&mut self) {
        self.player_highlight = None;
        self.player_selection = None;
        self.ai_selection = None;
    }

    fn calculate(&mut self) {
        let (player_card, ai_card) =
            match (self.selected_card(Side::Player), self.selected_card(Side::Ai)) {
                (Some(player_card), Some(ai_card)) => (player_card, ai_card),
                (player_card, _) => {
                    let missing = if player_card.is_none() { Side::Player } else { Side::Ai };
                    tracing::error!(round = self.round, ?missing, "selection missing at resolve time");
                    self.record_event(MatchEvent::SelectionAborted {
                        round: self.round,
                        missing,
                    });
                    self.clear_selections();
                    self.enter(RoundPhase::Selecting);
                    return;
                }
            };

        self.enter(RoundPhase::Calculating);
        let result = self
            .resolver
            .resolve(player_card, ai_card, &self.player, &self.ai);
        let snapshot = (self.player.clone(), self.ai.clone());
        self.apply_result(player_card, ai_card, &result);

        if let Err(error) = self.integrity_check() {
            tracing::error!(round = self.round, %error, "character state out of range, round rolled back");
            (self.player, self.ai) = snapshot;
            self.record_event(MatchEvent::RoundRolledBack {
                round: self.round,
                error,
            });
            self.clear_selections();
            self.enter(RoundPhase::Selecting);
            return;
        }

        let narrative = describe_round(player_card, ai_card, self.player.kind, self.ai.kind, &result);
        tracing::info!(
            round = self.round,
            player_card = ?player_card,
            ai_card = ?ai_card,
            player_health = self.player.current_health,
            ai_health = self.ai.current_health,
            "round resolved"
        );
        self.last_report = Some(RoundReport {
            round: self.round,
            player_card,
            ai_card,
            result: result.clone(),
            narrative,
        });
        self.record_event(MatchEvent::RoundResolved {
            round: self.round,
            result: result.clone(),
        });
        self.last_result = Some(result);

        if let Some(victory) = self.evaluate_victory() {
            tracing::info!(winner = ?victory.winner, reason = ?victory.reason, "match won");
            self.record_event(MatchEvent::MatchWon {
                winner: victory.winner,
                reason: victory.reason.clone(),
            });
            self.outcome = Some(victory);
            self.enter(RoundPhase::Finished);
        }
    }

    /// 扣费 → 伤害 → 回血 → 回气，顺序固定。
    fn apply_result(&mut self, player_card: CardType, ai_card: CardType, result: &BattleResult) {
        let cap = self.config.energy_cap;
        for (side, card) in [(Side::Player, player_card), (Side::Ai, ai_card)] {
            let outcome = *result.side(side);
            let state = match side {
                Side::Player => &mut self.player,
                Side::Ai => &mut self.ai,
            };
            let cost = state.realized_cost(card);
            let spent = state.spend_energy(cost);
            if spent < cost {
                tracing::warn!(?side, card = ?card, cost, spent, "forced play was not affordable");
            }
            state.take_damage(outcome.damage_taken);
            state.heal(outcome.health_gained);
            state.gain_energy(outcome.energy_gained, cap);
        }
    }

    /// 先判玩家再判电脑，先满足条件的一方获胜。
    fn evaluate_victory(&self) -> Option<VictoryState> {
        let cap = self.config.energy_cap;
        for side in Side::BOTH {
            let loser = side.opponent();
            if self.character(side).current_energy >= cap {
                return Some(VictoryState {
                    winner: side,
                    reason: VictoryReason::EnergyCap,
                });
            }
            if self.character(loser).current_health == 0 {
                return Some(VictoryState {
                    winner: side,
                    reason: VictoryReason::HealthDepleted { loser },
                });
            }
        }
        None
    }

    fn check_stall(&mut self) {
        if !matches!(self.phase, RoundPhase::Revealing | RoundPhase::Calculating) {
            return;
        }
        if self.elapsed() <= self.config.stall_timeout_ms {
            return;
        }
        tracing::error!(round = self.round, phase = ?self.phase, "phase stalled, resetting to selection");
        self.record_event(MatchEvent::StallReset {
            round: self.round,
            phase: self.phase,
        });
        self.clear_selections();
        self.enter(RoundPhase::Selecting);
    }
}
