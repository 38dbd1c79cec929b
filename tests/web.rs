//! 浏览器环境下的冒烟测试。
#![cfg(target_arch = "wasm32")]

use qi_duel::{
    card_catalog, character_catalog, resolve_round_js, BattleEngine, CardType, CharacterKind,
    CharacterState,
};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn engine_plays_a_round() {
    let mut engine = BattleEngine::new("knight", Some("法师".to_string()), None, None)
        .expect("engine should start");
    engine
        .submit_player_card("recover")
        .expect("recover is always playable");
    engine.tick(2_000).expect("tick should succeed");
    let report = engine.last_report_json().expect("report should serialize");
    assert!(report.contains("\"round\":1"), "{report}");
}

#[wasm_bindgen_test]
fn unknown_card_is_rejected() {
    let mut engine = BattleEngine::new("knight", None, None, None).expect("engine should start");
    assert!(engine.submit_player_card("fireball").is_err());
}

#[wasm_bindgen_test]
fn playable_cards_need_a_known_side() {
    let engine = BattleEngine::new("tank", Some("knight".to_string()), None, None)
        .expect("engine should start");
    let ai_cards = engine.playable_cards_json("AI ").expect("side should parse");
    assert!(ai_cards.contains("recover"), "{ai_cards}");
    assert!(engine.playable_cards_json("computer").is_err());
}

#[wasm_bindgen_test]
fn catalogs_list_every_entry() {
    let cards: Vec<serde_json::Value> =
        from_value(card_catalog().expect("card catalog")).expect("cards deserialize");
    assert_eq!(cards.len(), 8);
    let characters: Vec<serde_json::Value> =
        from_value(character_catalog().expect("character catalog")).expect("characters deserialize");
    assert_eq!(characters.len(), 5);
}

#[wasm_bindgen_test]
fn free_resolver_matches_core() {
    let player = to_value(&CharacterState::new(CharacterKind::Knight)).expect("state");
    let ai = to_value(&CharacterState::new(CharacterKind::Knight)).expect("state");
    let response: serde_json::Value =
        from_value(resolve_round_js("大波", "strike", player, ai).expect("resolve"))
            .expect("response deserialize");
    assert_eq!(response["result"]["ai"]["damage_taken"], 2);
    assert_eq!(CardType::BigWave.definition().base_damage, 2);
}
