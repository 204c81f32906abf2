//! Growth and weather over many ticks, plus the sow/reap actions.

use garden_core::{
    command::{CommandOutcome, PlayerCommand},
    config::SimConfig,
    engine::GardenSession,
    event::SimEvent,
    grid::MAX_GROWTH_LEVEL,
    plant::{PlantCatalog, PlantKind, PlantTypeDefinition},
    scenario::ScenarioDef,
    types::GridPos,
};
use serde_json::json;

/// A crowded 6x6 garden with every plant kind and no scheduled events.
fn nursery() -> ScenarioDef {
    serde_json::from_value(json!({
        "scenarioName": "nursery",
        "startConditions": {
            "gridSize": 6,
            "playerPosition": [5, 5],
            "plants": [
                { "position": [0, 0], "type": 1 },
                { "position": [1, 0], "type": 2 },
                { "position": [2, 0], "type": 3 },
                { "position": [3, 0], "type": 4 },
                { "position": [2, 2], "type": 4 },
                { "position": [2, 3], "type": 3, "growth": 4 },
                { "position": [4, 4], "type": 1 }
            ]
        },
        "victoryConditions": [ { "type": "totalPlants", "details": { "minCount": 99 } } ]
    }))
    .expect("valid nursery")
}

fn build_nursery(run_id: &str, seed: u64) -> GardenSession {
    let config = SimConfig::default_test()
        .with_scenario(nursery())
        .with_starting_scenario("nursery");
    GardenSession::build_test_with(run_id, seed, config).expect("build nursery")
}

#[test]
fn cell_invariants_hold_over_many_ticks() {
    let mut session = build_nursery("growth-invariants", 0xA11CE);
    let mut previous = session.grid().clone();

    for _ in 0..60 {
        session.advance_time().unwrap();
        let grid = session.grid();
        for (x, y, cell) in grid.cells() {
            assert_eq!(cell.plant_type == 0, cell.growth_level == 0, "cell ({x}, {y}): {cell:?}");
            assert!(cell.growth_level <= MAX_GROWTH_LEVEL);
            assert!(cell.water <= 10, "water above cap at ({x}, {y})");
            assert!(cell.sun <= 10, "sun above ability cap at ({x}, {y})");
            assert!(
                cell.growth_level >= previous.growth_level(x, y),
                "growth went backwards at ({x}, {y})"
            );
        }
        previous = grid.clone();
    }
}

#[test]
fn plants_mature_given_enough_time() {
    let mut session = build_nursery("growth-mature", 0xB0B);
    session.run_ticks(200).unwrap();
    let mature = session
        .grid()
        .cells()
        .filter(|(_, _, c)| c.growth_level == MAX_GROWTH_LEVEL)
        .count();
    assert!(mature >= 1, "no plant matured in 200 ticks");
}

#[test]
fn plant_grew_events_match_grid_changes() {
    let mut session = build_nursery("growth-events", 0xC0FFEE);
    for _ in 0..20 {
        let before = session.grid().clone();
        let events = session.advance_time().unwrap();
        for event in &events {
            if let SimEvent::PlantGrew { x, y, growth_level, .. } = event {
                assert!(*growth_level > before.growth_level(*x, *y));
            }
        }
        assert!(matches!(events.last(), Some(SimEvent::TickCompleted { .. })));
        assert!(events.iter().any(|e| matches!(e, SimEvent::RedrawRequested { .. })));
    }
}

#[test]
fn sow_then_reap_clears_plant_but_keeps_resources() {
    let mut session = GardenSession::build_test("growth-sow-reap", 9).unwrap();
    assert_eq!(session.player(), GridPos::new(0, 0));
    assert!(session.grid().cell(0, 0).is_empty());

    assert_eq!(session.sow_plant_kind(PlantKind::WaterLover), CommandOutcome::Applied);
    let sown = session.grid().cell(0, 0);
    assert_eq!(sown.plant_type, PlantKind::WaterLover.id());
    assert_eq!(sown.growth_level, 1);
    assert_eq!(sown.water, 5);
    assert_eq!(sown.sun, 5);

    assert_eq!(session.reap_plant(), CommandOutcome::Applied);
    let reaped = session.grid().cell(0, 0);
    assert_eq!(reaped.plant_type, 0);
    assert_eq!(reaped.growth_level, 0);
    assert_eq!(reaped.water, 5, "reaping leaves water alone");
    assert_eq!(reaped.sun, 5, "reaping leaves sun alone");
}

#[test]
fn sow_and_reap_preconditions_are_no_ops() {
    let mut session = GardenSession::build_test("growth-preconditions", 9).unwrap();

    assert!(matches!(session.reap_plant(), CommandOutcome::NoOp { .. }));

    session.move_player(2, 2);
    assert_eq!(session.player(), GridPos::new(2, 2));
    let before = session.current_state();
    assert!(matches!(session.sow_plant(), CommandOutcome::NoOp { .. }), "tutorial plant sits here");
    assert_eq!(session.current_state(), before);
}

#[test]
fn random_sow_is_deterministic_per_seed() {
    let mut a = GardenSession::build_test("growth-sow-a", 1234).unwrap();
    let mut b = GardenSession::build_test("growth-sow-b", 1234).unwrap();
    assert!(a.sow_plant().is_applied());
    assert!(b.sow_plant().is_applied());

    let kind = a.grid().plant_type(0, 0);
    assert!((1..=4).contains(&kind));
    assert_eq!(kind, b.grid().plant_type(0, 0));
}

#[test]
fn moving_off_the_grid_is_a_no_op() {
    let mut session = GardenSession::build_test("growth-move", 9).unwrap();
    assert!(matches!(session.move_player(-1, 0), CommandOutcome::NoOp { .. }));
    assert!(matches!(session.move_player(0, 5), CommandOutcome::NoOp { .. }));
    assert_eq!(session.player(), GridPos::new(0, 0));
    assert_eq!(session.move_player(4, 4), CommandOutcome::Applied);
    assert_eq!(session.player(), GridPos::new(4, 4));
}

#[test]
fn extreme_move_deltas_are_rejected_not_overflowed() {
    let mut session = GardenSession::build_test("growth-move-extreme", 9).unwrap();
    session.move_player(1, 0);
    for (dx, dy) in [(i64::MAX, 0), (0, i64::MAX), (i64::MIN, 0), (0, i64::MIN)] {
        let outcome = session.apply(PlayerCommand::Move { dx, dy });
        assert!(matches!(outcome, CommandOutcome::NoOp { .. }), "move by ({dx}, {dy})");
    }
    assert_eq!(session.player(), GridPos::new(1, 0));
}

#[test]
fn custom_catalog_reaches_the_session() {
    let weed = PlantTypeDefinition {
        name:         "Weed",
        growth_rule:  |_, _, _, _| true,
        ability:      None,
        stage_frames: [1, 2, 3, 4, 5],
    };
    let plot: ScenarioDef = serde_json::from_value(json!({
        "scenarioName": "weedy",
        "startConditions": {
            "gridSize": 3,
            "playerPosition": [0, 0],
            "plants": [
                { "position": [1, 1], "type": 1, "growth": 1 },
                { "position": [2, 2], "type": 2, "growth": 1 }
            ]
        },
        "victoryConditions": [ { "type": "totalPlants", "details": { "minCount": 99 } } ]
    }))
    .unwrap();
    let config = SimConfig::default_test()
        .with_scenario(plot)
        .with_starting_scenario("weedy")
        .with_catalog(PlantCatalog::from_definitions(vec![weed]));
    let mut session = GardenSession::build_test_with("growth-custom", 4, config).unwrap();

    assert_eq!(session.catalog().len(), 1);
    assert_eq!(session.grid().plant_count(), 1, "type 2 is not in this catalog");

    session.run_ticks(4).unwrap();
    assert_eq!(session.grid().growth_level(1, 1), MAX_GROWTH_LEVEL);

    assert_eq!(session.sow_plant(), CommandOutcome::Applied);
    assert_eq!(session.grid().plant_type(0, 0), 1);
    session.move_player(2, 0);
    assert!(matches!(session.sow_plant_kind(PlantKind::Balanced), CommandOutcome::NoOp { .. }));
}

#[test]
fn outbox_is_empty_once_drained() {
    let mut session = GardenSession::build_test("growth-outbox", 2).unwrap();
    session.run_ticks(5).unwrap();
    let drained = session.take_events();
    let completed = drained.iter().filter(|e| matches!(e, SimEvent::TickCompleted { .. })).count();
    assert_eq!(completed, 5);
    assert!(session.take_events().is_empty());

    session.advance_time().unwrap();
    assert!(!session.take_events().is_empty());
}
