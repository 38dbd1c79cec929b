pub mod ai;
pub mod game;

use gloo_timers::future::TimeoutFuture;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::{Date, Promise};

pub use ai::{AiChoice, AiConfig, AiSelector, AiStrategy, ThreatAssessment};
pub use game::{
    describe_round, resolve_round, BattleEffect, BattleResult, CardDefinition, CardType,
    CharacterDefinition, CharacterKind, CharacterState, EngineError, IntegrityError, MatchConfig,
    MatchEvent, RoundMachine, RoundPhase, RoundReport, Side, VictoryReason, VictoryState,
    ALL_CARDS, ALL_CHARACTERS,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: EngineError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn console_warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

fn parse_card(name: &str) -> Result<CardType, EngineError> {
    CardType::from_str(name).map_err(|_| EngineError::UnknownCard {
        name: name.to_string(),
    })
}

fn parse_side(name: &str) -> Result<Side, EngineError> {
    Side::from_str(name).map_err(|_| EngineError::UnknownSide {
        name: name.to_string(),
    })
}

/// 角色名无法识别时回退为骑士，同时在浏览器控制台提示。
fn parse_character(name: &str) -> CharacterKind {
    if CharacterKind::from_str(name).is_err() {
        console_warn(&format!("未知角色类型 `{name}`，使用骑士"));
    }
    CharacterKind::parse_or_default(name)
}

fn parse_strategy(strategy: Option<&str>) -> AiConfig {
    let mut config = AiConfig::default();
    if let Some(strategy) = strategy.and_then(|value| AiStrategy::from_str(value).ok()) {
        config = config.with_strategy(strategy);
    }
    config
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(serde_to_js_error)
}

#[derive(Serialize)]
struct CharactersView<'a> {
    player: &'a CharacterState,
    ai: &'a CharacterState,
}

#[derive(Serialize)]
struct ResolveResponse {
    result: BattleResult,
    narrative: Vec<String>,
}

#[wasm_bindgen]
pub struct BattleEngine {
    machine: RoundMachine,
    ai_config: AiConfig,
}

#[wasm_bindgen]
impl BattleEngine {
    /// 未传电脑角色时随机挑选；配置 JSON 无效时使用默认配置。
    #[wasm_bindgen(constructor)]
    pub fn new(
        player_kind: &str,
        ai_kind: Option<String>,
        config_json: Option<String>,
        ai_strategy: Option<String>,
    ) -> Result<BattleEngine, JsValue> {
        let player_kind = parse_character(player_kind);
        let ai_kind = match ai_kind {
            Some(name) => parse_character(&name),
            None => CharacterKind::random(&mut SmallRng::from_entropy()),
        };
        let config = match config_json {
            Some(json) => MatchConfig::from_json(&json).unwrap_or_else(|error| {
                console_warn(&format!("对战配置无效，使用默认配置：{error}"));
                MatchConfig::default()
            }),
            None => MatchConfig::default(),
        };
        let ai_config = parse_strategy(ai_strategy.as_deref());
        let machine = RoundMachine::with_selector(
            player_kind,
            ai_kind,
            config,
            AiSelector::new(ai_config.clone()),
        )
        .map_err(to_js_error)?;
        Ok(BattleEngine { machine, ai_config })
    }

    #[wasm_bindgen(js_name = "highlightCard")]
    pub fn highlight_card(&mut self, card: &str) -> Result<JsValue, JsValue> {
        let card = parse_card(card).map_err(to_js_error)?;
        let highlighted = self
            .machine
            .highlight_player_card(card)
            .map_err(to_js_error)?;
        to_value(&highlighted).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = "submitPlayerCard")]
    pub fn submit_player_card(&mut self, card: &str) -> Result<(), JsValue> {
        let card = parse_card(card).map_err(to_js_error)?;
        self.machine.submit_player_card(card).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = "confirmSelection")]
    pub fn confirm_selection(&mut self) -> Result<JsValue, JsValue> {
        let card = self.machine.confirm_selection().map_err(to_js_error)?;
        to_value(&card).map_err(JsValue::from)
    }

    /// 推进 `delta_ms` 毫秒，返回推进后的阶段。
    pub fn tick(&mut self, delta_ms: u32) -> Result<JsValue, JsValue> {
        let phase = self.machine.advance(u64::from(delta_ms));
        to_value(&phase).map_err(JsValue::from)
    }

    /// 使用浏览器时钟推进。
    #[wasm_bindgen(js_name = "tickNow")]
    pub fn tick_now(&mut self) -> Result<JsValue, JsValue> {
        let now = Date::now().max(0.0) as u64;
        let phase = self.machine.tick(now);
        to_value(&phase).map_err(JsValue::from)
    }

    pub fn phase(&self) -> Result<JsValue, JsValue> {
        to_value(&self.machine.phase()).map_err(JsValue::from)
    }

    pub fn round(&self) -> u32 {
        self.machine.round()
    }

    #[wasm_bindgen(js_name = "remainingMs")]
    pub fn remaining_ms(&self) -> u32 {
        u32::try_from(self.machine.remaining_round_ms()).unwrap_or(u32::MAX)
    }

    #[wasm_bindgen(js_name = "playableCardsJson")]
    pub fn playable_cards_json(&self, side: &str) -> Result<String, JsValue> {
        let side = parse_side(side).map_err(to_js_error)?;
        to_json(&self.machine.playable_cards(side))
    }

    #[wasm_bindgen(js_name = "charactersJson")]
    pub fn characters_json(&self) -> Result<String, JsValue> {
        let (player, ai) = self.machine.characters();
        to_json(&CharactersView { player, ai })
    }

    #[wasm_bindgen(js_name = "lastResultJson")]
    pub fn last_result_json(&self) -> Result<String, JsValue> {
        to_json(&self.machine.last_result())
    }

    #[wasm_bindgen(js_name = "lastReportJson")]
    pub fn last_report_json(&self) -> Result<String, JsValue> {
        to_json(&self.machine.last_report())
    }

    #[wasm_bindgen(js_name = "outcomeJson")]
    pub fn outcome_json(&self) -> Result<String, JsValue> {
        to_json(&self.machine.outcome())
    }

    #[wasm_bindgen(js_name = "eventsJson")]
    pub fn events_json(&self) -> Result<String, JsValue> {
        to_json(self.machine.events())
    }

    /// 重新开局。电脑角色未指定时随机。
    pub fn restart(&mut self, player_kind: Option<String>, ai_kind: Option<String>) {
        let player_kind = player_kind.as_deref().map(parse_character);
        match ai_kind {
            Some(name) => {
                let ai_kind = parse_character(&name);
                let player_kind = player_kind.unwrap_or(self.machine.character(Side::Player).kind);
                self.machine.new_match(player_kind, ai_kind);
            }
            None => self.machine.restart(player_kind),
        }
    }

    /// 延迟 `delay_ms` 后给出电脑的选牌建议，不修改对局。
    pub fn think_ai(&self, delay_ms: Option<u32>) -> Promise {
        let ai = self.machine.character(Side::Ai).clone();
        let player = self.machine.character(Side::Player).clone();
        let config = self.ai_config.clone();
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let mut selector = AiSelector::new(config);
            let choice = selector.decide(&ALL_CARDS, &ai, &player);
            let json = serde_json::to_string(&choice).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

/// 单独结算一回合，不修改传入的角色状态。
#[wasm_bindgen(js_name = "resolveRound")]
pub fn resolve_round_js(
    player_card: &str,
    ai_card: &str,
    player_state: JsValue,
    ai_state: JsValue,
) -> Result<JsValue, JsValue> {
    let player_card = parse_card(player_card).map_err(to_js_error)?;
    let ai_card = parse_card(ai_card).map_err(to_js_error)?;
    let player: CharacterState = from_value(player_state).map_err(JsValue::from)?;
    let ai: CharacterState = from_value(ai_state).map_err(JsValue::from)?;

    let result = resolve_round(player_card, ai_card, player.kind, ai.kind);
    let narrative = describe_round(player_card, ai_card, player.kind, ai.kind, &result);
    to_value(&ResolveResponse { result, narrative }).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "selectAiCard")]
pub fn select_ai_card(
    ai_state: JsValue,
    player_state: JsValue,
    strategy: Option<String>,
) -> Result<JsValue, JsValue> {
    let ai: CharacterState = from_value(ai_state).map_err(JsValue::from)?;
    let player: CharacterState = from_value(player_state).map_err(JsValue::from)?;
    let mut selector = AiSelector::new(parse_strategy(strategy.as_deref()));
    let choice = selector.decide(&ALL_CARDS, &ai, &player);
    to_value(&choice).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "cardCatalog")]
pub fn card_catalog() -> Result<JsValue, JsValue> {
    let catalog: Vec<&CardDefinition> = ALL_CARDS.iter().map(|card| card.definition()).collect();
    to_value(&catalog).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "characterCatalog")]
pub fn character_catalog() -> Result<JsValue, JsValue> {
    let catalog: Vec<&CharacterDefinition> = ALL_CHARACTERS
        .iter()
        .map(|kind| kind.definition())
        .collect();
    to_value(&catalog).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateCharacter")]
pub fn validate_character(state: JsValue, energy_cap: Option<u8>) -> Result<(), JsValue> {
    let state: CharacterState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check(energy_cap.unwrap_or(game::DEFAULT_ENERGY_CAP))
        .map_err(|error| to_js_error(EngineError::from(error)))
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
