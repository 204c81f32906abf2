//! Runtime configuration and scenario definition loading.
//!
//! Layout of the data directory:
//!   {data_dir}/garden_config.json    session settings (snake_case)
//!   {data_dir}/scenarios/*.json      one scenario definition per file (camelCase)

use crate::{
    plant::PlantCatalog,
    scenario::{PlacementDef, ScenarioDef, ScenarioEventDef, StartConditionsDef},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

pub const DEFAULT_UNDO_LIMIT: usize = 20;
pub const DEFAULT_GRID_SIZE: usize = 5;

/// Per-tick resource regeneration.
///
/// Sun is re-rolled every tick in [sun_min, sun_max]. Water gains a roll in
/// [water_gain_min, water_gain_max] and never exceeds water_cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub sun_min:        u8,
    pub sun_max:        u8,
    pub water_gain_min: u8,
    pub water_gain_max: u8,
    pub water_cap:      u8,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            sun_min:        0,
            sun_max:        6,
            water_gain_min: 0,
            water_gain_max: 2,
            water_cap:      10,
        }
    }
}

/// Scenario-level weather tweaks, merged over the session's WeatherConfig.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherOverride {
    #[serde(default)]
    pub sun_min: Option<u8>,
    #[serde(default)]
    pub sun_max: Option<u8>,
    #[serde(default)]
    pub water_gain_min: Option<u8>,
    #[serde(default)]
    pub water_gain_max: Option<u8>,
    #[serde(default)]
    pub water_cap: Option<u8>,
    /// Sun never accumulates. Present only so scenario files that ask for it
    /// can be flagged instead of silently changing semantics.
    #[serde(default)]
    pub sun_accumulates: Option<bool>,
}

impl WeatherOverride {
    pub fn apply(&self, base: WeatherConfig) -> WeatherConfig {
        WeatherConfig {
            sun_min:        self.sun_min.unwrap_or(base.sun_min),
            sun_max:        self.sun_max.unwrap_or(base.sun_max),
            water_gain_min: self.water_gain_min.unwrap_or(base.water_gain_min),
            water_gain_max: self.water_gain_max.unwrap_or(base.water_gain_max),
            water_cap:      self.water_cap.unwrap_or(base.water_cap),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenSettings {
    pub starting_scenario: String,
    /// Undo steps kept behind the live state.
    #[serde(default = "default_undo_limit")]
    pub undo_limit: usize,
    #[serde(default = "default_true")]
    pub autosave: bool,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_grid_size")]
    pub default_grid_size: usize,
    #[serde(default)]
    pub weather: WeatherConfig,
}

fn default_undo_limit() -> usize { DEFAULT_UNDO_LIMIT }
fn default_true() -> bool { true }
fn default_tick_interval_ms() -> u64 { 1000 }
fn default_grid_size() -> usize { DEFAULT_GRID_SIZE }

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub settings:  GardenSettings,
    /// Scenario definitions keyed by scenario name.
    pub scenarios: BTreeMap<String, ScenarioDef>,
    /// Plant types available to the session. Fixed once the session is built.
    pub catalog:   PlantCatalog,
}

impl SimConfig {
    /// Load from the data/ directory.
    /// In tests, use SimConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let settings_path = format!("{data_dir}/garden_config.json");
        let content = std::fs::read_to_string(&settings_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {settings_path}: {e}"))?;
        let settings: GardenSettings = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {settings_path}: {e}"))?;

        let scenario_dir = format!("{data_dir}/scenarios");
        let entries = std::fs::read_dir(&scenario_dir)
            .map_err(|e| anyhow::anyhow!("Cannot read {scenario_dir}: {e}"))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut scenarios = BTreeMap::new();
        for path in paths {
            let display = path.display();
            let content = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("Cannot read {display}: {e}"))?;
            // A broken scenario file is a configuration error: skip it, keep the rest.
            match serde_json::from_str::<ScenarioDef>(&content) {
                Ok(def) => {
                    if scenarios.contains_key(&def.scenario_name) {
                        log::warn!("Duplicate scenario '{}' in {display}; keeping the first", def.scenario_name);
                        continue;
                    }
                    scenarios.insert(def.scenario_name.clone(), def);
                }
                Err(e) => log::warn!("Skipping malformed scenario file {display}: {e}"),
            }
        }

        if !scenarios.contains_key(&settings.starting_scenario) {
            log::warn!(
                "Starting scenario '{}' is not defined in {scenario_dir}",
                settings.starting_scenario
            );
        }
        log::debug!("Loaded {} scenario definitions from {scenario_dir}", scenarios.len());

        Ok(Self { settings, scenarios, catalog: PlantCatalog::standard() })
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let tutorial = ScenarioDef {
            scenario_name: "tutorial".into(),
            start_conditions: StartConditionsDef {
                grid_size: 5,
                player_position: [0, 0],
                plants: vec![PlacementDef { position: [2, 2], plant_type: 3, growth: 1 }],
                weather: None,
            },
            events: vec![
                ScenarioEventDef {
                    time: 3,
                    action: "increaseWater".into(),
                    details: json!({ "amount": 2 }),
                },
                ScenarioEventDef {
                    time: 5,
                    action: "addPlant".into(),
                    details: json!({ "position": [1, 2], "type": 4 }),
                },
            ],
            victory_conditions: Some(json!([
                { "type": "plantGrowth", "details": { "position": [2, 2], "growthLevel": 3 } }
            ])),
            next_scenario: Some("challenge".into()),
        };

        let challenge = ScenarioDef {
            scenario_name: "challenge".into(),
            start_conditions: StartConditionsDef {
                grid_size: 7,
                player_position: [3, 3],
                plants: vec![
                    PlacementDef { position: [1, 1], plant_type: 1, growth: 1 },
                    PlacementDef { position: [5, 1], plant_type: 2, growth: 1 },
                    PlacementDef { position: [3, 3], plant_type: 4, growth: 1 },
                    PlacementDef { position: [3, 4], plant_type: 3, growth: 2 },
                ],
                weather: None,
            },
            events: vec![ScenarioEventDef {
                time: 10,
                action: "increaseSun".into(),
                details: json!({ "amount": 2 }),
            }],
            victory_conditions: Some(json!([
                { "type": "totalPlants", "details": { "minCount": 8 } },
                { "type": "plantGrowth", "details": { "position": [3, 3], "growthLevel": 5 } }
            ])),
            next_scenario: None,
        };

        Self {
            settings: GardenSettings {
                starting_scenario: "tutorial".into(),
                undo_limit:        DEFAULT_UNDO_LIMIT,
                autosave:          true,
                tick_interval_ms:  1000,
                default_grid_size: DEFAULT_GRID_SIZE,
                weather:           WeatherConfig::default(),
            },
            scenarios: [tutorial, challenge]
                .into_iter()
                .map(|s| (s.scenario_name.clone(), s))
                .collect(),
            catalog: PlantCatalog::standard(),
        }
    }

    /// Add or replace a scenario definition.
    pub fn with_scenario(mut self, def: ScenarioDef) -> Self {
        self.scenarios.insert(def.scenario_name.clone(), def);
        self
    }

    pub fn with_starting_scenario(mut self, name: &str) -> Self {
        self.settings.starting_scenario = name.to_string();
        self
    }

    pub fn with_catalog(mut self, catalog: PlantCatalog) -> Self {
        self.catalog = catalog;
        self
    }
}
