//! Scenario engine: starting conditions, timed events, victory, chaining.
//!
//! STATES:
//!   Unloaded: no scenario active (initial).
//!   Active:   a scenario is running; `completed` flips once its victory
//!             conditions hold. Completion with a successor loads the
//!             successor immediately; without one the scenario stays
//!             completed and victory is no longer evaluated.
//!
//! RULES:
//!   - Definitions are decoded into typed actions/conditions when a scenario
//!     loads. Anything unrecognised becomes an explicit variant that is
//!     reported and skipped, never a load failure.
//!   - Event `time` is matched against the absolute tick counter exactly.
//!   - Configuration problems are warnings (log + ScenarioWarning event).

use crate::{
    config::{WeatherConfig, WeatherOverride},
    event::SimEvent,
    grid::{GridState, MAX_GRID_SIZE, MAX_GROWTH_LEVEL},
    plant::PlantCatalog,
    types::{GridPos, Tick},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ── Definition file format ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDef {
    pub scenario_name: String,
    pub start_conditions: StartConditionsDef,
    #[serde(default)]
    pub events: Vec<ScenarioEventDef>,
    /// Kept raw: a missing or malformed list must not fail the file.
    #[serde(default)]
    pub victory_conditions: Option<Value>,
    #[serde(default)]
    pub next_scenario: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConditionsDef {
    pub grid_size: i64,
    pub player_position: [i64; 2],
    #[serde(default)]
    pub plants: Vec<PlacementDef>,
    #[serde(default)]
    pub weather: Option<WeatherOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementDef {
    pub position: [i64; 2],
    #[serde(rename = "type")]
    pub plant_type: i64,
    #[serde(default = "default_growth")]
    pub growth: i64,
}

fn default_growth() -> i64 { 1 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioEventDef {
    pub time: Tick,
    pub action: String,
    #[serde(default)]
    pub details: Value,
}

#[derive(Deserialize)]
struct AddPlantDetails {
    position: [i64; 2],
    #[serde(rename = "type")]
    plant_type: i64,
}

#[derive(Deserialize)]
struct AmountDetails {
    amount: i64,
}

#[derive(Deserialize)]
struct ConditionDef {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    details: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlantGrowthDetails {
    position: [i64; 2],
    growth_level: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalPlantsDetails {
    min_count: usize,
}

// ── Decoded scenario ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ScenarioAction {
    AddPlant { x: i64, y: i64, plant_type: i64 },
    IncreaseSun { amount: i64 },
    IncreaseWater { amount: i64 },
    Unrecognized { action: String, reason: String },
}

impl ScenarioAction {
    fn decode(def: &ScenarioEventDef) -> Self {
        let details = def.details.clone();
        let decoded = match def.action.as_str() {
            "addPlant" => serde_json::from_value::<AddPlantDetails>(details).map(|d| {
                Self::AddPlant { x: d.position[0], y: d.position[1], plant_type: d.plant_type }
            }),
            "increaseSun" => serde_json::from_value::<AmountDetails>(details)
                .map(|d| Self::IncreaseSun { amount: d.amount }),
            "increaseWater" => serde_json::from_value::<AmountDetails>(details)
                .map(|d| Self::IncreaseWater { amount: d.amount }),
            other => {
                return Self::Unrecognized {
                    action: other.to_string(),
                    reason: "unknown event action".into(),
                }
            }
        };
        decoded.unwrap_or_else(|e| Self::Unrecognized {
            action: def.action.clone(),
            reason: format!("malformed details: {e}"),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Self::AddPlant { .. } => "addPlant",
            Self::IncreaseSun { .. } => "increaseSun",
            Self::IncreaseWater { .. } => "increaseWater",
            Self::Unrecognized { action, .. } => action,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    pub time: Tick,
    pub action: ScenarioAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VictoryCondition {
    PlantGrowth { x: i64, y: i64, growth_level: i64 },
    TotalPlants { min_count: usize },
    Unrecognized { kind: String, reason: String },
}

impl VictoryCondition {
    fn decode(raw: &Value) -> Self {
        let def = match serde_json::from_value::<ConditionDef>(raw.clone()) {
            Ok(def) => def,
            Err(e) => {
                return Self::Unrecognized {
                    kind: "?".into(),
                    reason: format!("malformed condition: {e}"),
                }
            }
        };
        let decoded = match def.kind.as_str() {
            "plantGrowth" => serde_json::from_value::<PlantGrowthDetails>(def.details).map(|d| {
                Self::PlantGrowth { x: d.position[0], y: d.position[1], growth_level: d.growth_level }
            }),
            "totalPlants" => serde_json::from_value::<TotalPlantsDetails>(def.details)
                .map(|d| Self::TotalPlants { min_count: d.min_count }),
            _ => {
                return Self::Unrecognized {
                    kind: def.kind.clone(),
                    reason: "unknown victory condition".into(),
                }
            }
        };
        decoded.unwrap_or_else(|e| Self::Unrecognized {
            kind: def.kind.clone(),
            reason: format!("malformed details: {e}"),
        })
    }

    /// Evaluate against the grid. None for conditions that cannot be judged.
    pub fn holds(&self, grid: &GridState) -> Option<bool> {
        match self {
            Self::PlantGrowth { x, y, growth_level } => Some(
                grid.contains(*x, *y)
                    && i64::from(grid.growth_level(*x as usize, *y as usize)) >= *growth_level,
            ),
            Self::TotalPlants { min_count } => Some(grid.plant_count() >= *min_count),
            Self::Unrecognized { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub pos: GridPos,
    pub plant_type: u8,
    pub growth: u8,
}

/// A scenario decoded and checked against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub grid_size: usize,
    pub player_start: GridPos,
    pub placements: Vec<Placement>,
    pub weather: Option<WeatherOverride>,
    pub events: Vec<ScheduledEvent>,
    pub victory_conditions: Vec<VictoryCondition>,
    pub next_scenario: Option<String>,
}

impl Scenario {
    /// Decode a definition. Returns the scenario plus configuration warnings,
    /// or an error message when the definition cannot be loaded at all.
    pub fn compile(def: &ScenarioDef, catalog: &PlantCatalog) -> Result<(Self, Vec<String>), String> {
        let name = def.scenario_name.clone();
        let start = &def.start_conditions;
        let mut warnings = Vec::new();

        if start.grid_size <= 0 || start.grid_size > MAX_GRID_SIZE as i64 {
            return Err(format!("grid size {} is not a usable positive size", start.grid_size));
        }
        let grid_size = start.grid_size as usize;
        let max = grid_size as i64 - 1;

        let [px, py] = start.player_position;
        let player_start = GridPos::new(px.clamp(0, max) as usize, py.clamp(0, max) as usize);
        if player_start.x as i64 != px || player_start.y as i64 != py {
            warnings.push(format!(
                "player start ({px}, {py}) is outside the {grid_size}x{grid_size} grid; clamped to ({}, {})",
                player_start.x, player_start.y
            ));
        }

        let mut placements = Vec::new();
        for p in &start.plants {
            let [x, y] = p.position;
            if !(0..=max).contains(&x) || !(0..=max).contains(&y) {
                warnings.push(format!("plant at ({x}, {y}) is outside the grid; skipped"));
                continue;
            }
            let Some(plant_type) = u8::try_from(p.plant_type).ok().filter(|t| catalog.contains(*t)) else {
                warnings.push(format!("plant type {} at ({x}, {y}) is not in the catalog; skipped", p.plant_type));
                continue;
            };
            let growth = p.growth.clamp(1, MAX_GROWTH_LEVEL as i64) as u8;
            if growth as i64 != p.growth {
                warnings.push(format!("plant growth {} at ({x}, {y}) adjusted to {growth}", p.growth));
            }
            placements.push(Placement { pos: GridPos::new(x as usize, y as usize), plant_type, growth });
        }

        if let Some(weather) = &start.weather {
            if weather.sun_accumulates == Some(true) {
                warnings.push("sunAccumulates is not supported; sun resets every tick".into());
            }
        }

        let victory_conditions = match &def.victory_conditions {
            Some(Value::Array(items)) if !items.is_empty() => {
                items.iter().map(VictoryCondition::decode).collect()
            }
            _ => {
                warnings.push("victory conditions are not properly defined; using none".into());
                Vec::new()
            }
        };

        let events = def
            .events
            .iter()
            .map(|e| ScheduledEvent { time: e.time, action: ScenarioAction::decode(e) })
            .collect();

        Ok((
            Self {
                name,
                grid_size,
                player_start,
                placements,
                weather: start.weather.clone(),
                events,
                victory_conditions,
                next_scenario: def.next_scenario.clone(),
            },
            warnings,
        ))
    }
}

// ── Engine ──────────────────────────────────────────────────────────

/// Mutable world the scenario engine acts on during one call.
pub struct ScenarioContext<'a> {
    pub tick:    Tick,
    pub catalog: &'a PlantCatalog,
    pub grid:    &'a mut GridState,
    pub player:  &'a mut GridPos,
}

#[derive(Debug, Clone)]
struct ActiveScenario {
    scenario:  Scenario,
    completed: bool,
}

#[derive(Debug, Clone)]
pub struct ScenarioEngine {
    definitions: BTreeMap<String, ScenarioDef>,
    active:      Option<ActiveScenario>,
}

impl ScenarioEngine {
    pub fn new(definitions: BTreeMap<String, ScenarioDef>) -> Self {
        Self { definitions, active: None }
    }

    pub fn scenario_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn active(&self) -> Option<&Scenario> {
        self.active.as_ref().map(|a| &a.scenario)
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active().map(|s| s.name.as_str())
    }

    pub fn is_completed(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.completed)
    }

    /// Weather for the active scenario, merged over `base`.
    pub fn weather(&self, base: WeatherConfig) -> WeatherConfig {
        self.active()
            .and_then(|s| s.weather.as_ref())
            .map(|w| w.apply(base))
            .unwrap_or(base)
    }

    /// Activate `name` and apply its starting conditions: a fresh grid of the
    /// scenario's size, the player at its start, and its plants.
    ///
    /// On an unknown or unusable scenario nothing changes and false is returned.
    pub fn load_scenario(
        &mut self,
        name: &str,
        ctx: &mut ScenarioContext<'_>,
        events: &mut Vec<SimEvent>,
    ) -> bool {
        let Some(def) = self.definitions.get(name) else {
            warn(ctx.tick, events, format!("Scenario \"{name}\" not found."));
            return false;
        };
        let (scenario, warnings) = match Scenario::compile(def, ctx.catalog) {
            Ok(compiled) => compiled,
            Err(reason) => {
                warn(ctx.tick, events, format!("Scenario \"{name}\" cannot be loaded: {reason}"));
                return false;
            }
        };
        for w in warnings {
            warn(ctx.tick, events, format!("Scenario \"{name}\": {w}"));
        }

        let mut grid = GridState::new(scenario.grid_size);
        for p in &scenario.placements {
            grid.set_plant_type(p.pos.x, p.pos.y, p.plant_type);
            grid.set_growth_level(p.pos.x, p.pos.y, p.growth);
        }
        *ctx.grid = grid;
        *ctx.player = scenario.player_start;

        log::info!("Loaded scenario: {}", scenario.name);
        events.push(SimEvent::ScenarioLoaded {
            tick: ctx.tick,
            name: scenario.name.clone(),
            grid_size: scenario.grid_size,
        });
        self.active = Some(ActiveScenario { scenario, completed: false });
        true
    }

    /// Re-activate a scenario without touching the grid. Used when a
    /// snapshot is restored. `None` returns the engine to Unloaded.
    pub fn resume(&mut self, name: Option<&str>, completed: bool, catalog: &PlantCatalog) -> bool {
        let Some(name) = name else {
            self.active = None;
            return true;
        };
        let compiled = self
            .definitions
            .get(name)
            .and_then(|def| Scenario::compile(def, catalog).ok());
        match compiled {
            Some((scenario, _)) => {
                self.active = Some(ActiveScenario { scenario, completed });
                true
            }
            None => {
                log::warn!("Restored state names scenario \"{name}\", which is not available");
                self.active = None;
                false
            }
        }
    }

    /// Per-tick scenario work: scheduled events, then victory, then chaining.
    pub fn on_tick(&mut self, ctx: &mut ScenarioContext<'_>, events: &mut Vec<SimEvent>) {
        self.handle_scheduled_events(ctx, events);

        let Some(active) = &self.active else { return };
        if active.completed {
            return;
        }
        if !self.check_victory_conditions(ctx.grid, ctx.tick, events) {
            return;
        }

        let Some(active) = self.active.as_mut() else { return };
        active.completed = true;
        let name = active.scenario.name.clone();
        let next = active.scenario.next_scenario.clone();

        log::info!("Victory conditions met! Scenario \"{name}\" completed.");
        events.push(SimEvent::VictoryAchieved { tick: ctx.tick, scenario: name.clone() });

        match next {
            Some(next) => {
                self.load_scenario(&next, ctx, events);
            }
            None => {
                log::info!("No more scenarios to load.");
                events.push(SimEvent::ScenarioChainEnded { tick: ctx.tick, scenario: name });
            }
        }
    }

    /// Fire every event scheduled for exactly `ctx.tick`, in definition order.
    pub fn handle_scheduled_events(&self, ctx: &mut ScenarioContext<'_>, events: &mut Vec<SimEvent>) {
        let Some(active) = &self.active else { return };
        let due = active.scenario.events.iter().filter(|e| e.time == ctx.tick);

        for scheduled in due {
            match &scheduled.action {
                ScenarioAction::AddPlant { x, y, plant_type } => {
                    if !ctx.grid.contains(*x, *y) {
                        warn(ctx.tick, events, format!("addPlant at ({x}, {y}) is outside the grid; skipped"));
                        continue;
                    }
                    let Some(t) = u8::try_from(*plant_type).ok().filter(|t| ctx.catalog.contains(*t)) else {
                        warn(ctx.tick, events, format!("addPlant type {plant_type} is not in the catalog; skipped"));
                        continue;
                    };
                    let (x, y) = (*x as usize, *y as usize);
                    ctx.grid.set_plant_type(x, y, t);
                    ctx.grid.set_growth_level(x, y, 1);
                    log::info!("Plant of type {t} added at ({x}, {y}).");
                }
                ScenarioAction::IncreaseSun { amount } => {
                    adjust_all(ctx.grid, *amount, GridState::sun, GridState::set_sun);
                    log::info!("Increased sun level by {amount}.");
                }
                ScenarioAction::IncreaseWater { amount } => {
                    adjust_all(ctx.grid, *amount, GridState::water, GridState::set_water);
                    log::info!("Increased water level by {amount}.");
                }
                ScenarioAction::Unrecognized { action, reason } => {
                    warn(ctx.tick, events, format!("Unknown event action: {action} ({reason})"));
                    continue;
                }
            }
            events.push(SimEvent::ScenarioEventFired {
                tick: ctx.tick,
                action: scheduled.action.name().to_string(),
            });
        }
    }

    /// True when every recognised condition holds. An empty list holds
    /// vacuously; unrecognised conditions are reported and skipped.
    pub fn check_victory_conditions(&self, grid: &GridState, tick: Tick, events: &mut Vec<SimEvent>) -> bool {
        let Some(active) = &self.active else { return false };
        let mut met = true;
        for condition in &active.scenario.victory_conditions {
            match condition.holds(grid) {
                Some(holds) => met &= holds,
                None => {
                    if let VictoryCondition::Unrecognized { kind, reason } = condition {
                        warn(tick, events, format!("Unknown victory condition: {kind} ({reason})"));
                    }
                }
            }
        }
        met
    }
}

fn warn(tick: Tick, events: &mut Vec<SimEvent>, message: String) {
    log::warn!("{message}");
    events.push(SimEvent::ScenarioWarning { tick, message });
}

/// Add `amount` to one attribute of every cell, saturating to the byte range.
fn adjust_all(
    grid: &mut GridState,
    amount: i64,
    get: fn(&GridState, usize, usize) -> u8,
    set: fn(&mut GridState, usize, usize, u8),
) {
    let size = grid.size();
    for y in 0..size {
        for x in 0..size {
            let value = (i64::from(get(grid, x, y)) + amount).clamp(0, u8::MAX as i64) as u8;
            set(grid, x, y, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(value: Value) -> ScenarioDef {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn decodes_camel_case_file_format() {
        let d = def(json!({
            "scenarioName": "demo",
            "startConditions": {
                "gridSize": 4,
                "playerPosition": [1, 2],
                "plants": [{ "position": [0, 0], "type": 2, "growth": 3 }]
            },
            "events": [
                { "time": 2, "action": "increaseSun", "details": { "amount": 1 } },
                { "time": 4, "action": "summonRain", "details": {} }
            ],
            "victoryConditions": [
                { "type": "totalPlants", "details": { "minCount": 2 } }
            ],
            "nextScenario": "after"
        }));
        let (s, warnings) = Scenario::compile(&d, &PlantCatalog::standard()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(s.grid_size, 4);
        assert_eq!(s.player_start, GridPos::new(1, 2));
        assert_eq!(s.placements, vec![Placement { pos: GridPos::new(0, 0), plant_type: 2, growth: 3 }]);
        assert_eq!(s.events[0].action, ScenarioAction::IncreaseSun { amount: 1 });
        assert!(matches!(s.events[1].action, ScenarioAction::Unrecognized { .. }));
        assert_eq!(s.victory_conditions, vec![VictoryCondition::TotalPlants { min_count: 2 }]);
        assert_eq!(s.next_scenario.as_deref(), Some("after"));
    }

    #[test]
    fn missing_victory_conditions_become_empty_with_warning() {
        let d = def(json!({
            "scenarioName": "open",
            "startConditions": { "gridSize": 3, "playerPosition": [0, 0] }
        }));
        let (s, warnings) = Scenario::compile(&d, &PlantCatalog::standard()).unwrap();
        assert!(s.victory_conditions.is_empty());
        assert_eq!(warnings.len(), 1);

        let malformed = def(json!({
            "scenarioName": "odd",
            "startConditions": { "gridSize": 3, "playerPosition": [0, 0] },
            "victoryConditions": { "type": "totalPlants" }
        }));
        let (s, _) = Scenario::compile(&malformed, &PlantCatalog::standard()).unwrap();
        assert!(s.victory_conditions.is_empty());
    }

    #[test]
    fn rejects_non_positive_grid() {
        let d = def(json!({
            "scenarioName": "broken",
            "startConditions": { "gridSize": 0, "playerPosition": [0, 0] }
        }));
        assert!(Scenario::compile(&d, &PlantCatalog::standard()).is_err());
    }

    #[test]
    fn bad_placements_are_skipped_or_adjusted() {
        let d = def(json!({
            "scenarioName": "messy",
            "startConditions": {
                "gridSize": 3,
                "playerPosition": [9, -1],
                "plants": [
                    { "position": [5, 5], "type": 1 },
                    { "position": [1, 1], "type": 0 },
                    { "position": [1, 1], "type": 77 },
                    { "position": [2, 2], "type": 3, "growth": 0 },
                    { "position": [0, 2], "type": 1, "growth": 9 }
                ],
                "weather": { "sunAccumulates": true }
            },
            "victoryConditions": [{ "type": "totalPlants", "details": { "minCount": 1 } }]
        }));
        let (s, warnings) = Scenario::compile(&d, &PlantCatalog::standard()).unwrap();
        assert_eq!(s.player_start, GridPos::new(2, 0));
        assert_eq!(s.placements.len(), 2);
        assert_eq!(s.placements[0].growth, 1);
        assert_eq!(s.placements[1].growth, MAX_GROWTH_LEVEL);
        // player clamp, 3 skipped plants, 2 growth adjustments, sun flag
        assert_eq!(warnings.len(), 7);
    }

    #[test]
    fn unrecognized_conditions_do_not_block_victory() {
        let d = def(json!({
            "scenarioName": "lenient",
            "startConditions": { "gridSize": 2, "playerPosition": [0, 0] },
            "victoryConditions": [
                { "type": "harvestGold", "details": {} },
                { "type": "totalPlants", "details": { "minCount": 0 } }
            ]
        }));
        let catalog = PlantCatalog::standard();
        let mut engine = ScenarioEngine::new([("lenient".to_string(), d)].into());
        let mut grid = GridState::new(1);
        let mut player = GridPos::default();
        let mut events = Vec::new();
        let mut ctx = ScenarioContext { tick: 0, catalog: &catalog, grid: &mut grid, player: &mut player };
        assert!(engine.load_scenario("lenient", &mut ctx, &mut events));
        events.clear();
        assert!(engine.check_victory_conditions(&grid, 0, &mut events));
        assert!(events.iter().any(|e| matches!(e, SimEvent::ScenarioWarning { .. })));
    }

    #[test]
    fn plant_growth_outside_grid_never_holds() {
        let grid = GridState::new(2);
        let cond = VictoryCondition::PlantGrowth { x: 4, y: 0, growth_level: 0 };
        assert_eq!(cond.holds(&grid), Some(false));
    }

    #[test]
    fn adjust_all_saturates_to_byte_range() {
        let mut grid = GridState::new(2);
        grid.set_sun(0, 0, 250);
        adjust_all(&mut grid, 10, GridState::sun, GridState::set_sun);
        assert_eq!(grid.sun(0, 0), 255);
        assert_eq!(grid.sun(1, 1), 10);
        adjust_all(&mut grid, -20, GridState::sun, GridState::set_sun);
        assert_eq!(grid.sun(1, 1), 0);
    }
}
