//! The garden session: the single object that owns all mutable
//! simulation state and the only API the presentation layer calls.
//!
//! TICK PIPELINE (fixed, documented, never reordered):
//!   1. Clock advance
//!   2. Weather phase   (sun re-rolled, water accumulates)
//!   3. Growth phase    (row-major, mutation-visible)
//!   4. Scenario        (scheduled events, then victory, then chaining)
//!   5. Redraw notification
//!   6. Autosave + undo history push
//!
//! RULES:
//!   - Phases execute in registration order, every tick.
//!   - All randomness flows through the RngBank.
//!   - Every event goes to the outbox and to the event log.
//!   - Persistence failures are logged and reported; they never
//!     roll back or corrupt the live grid.

use crate::{
    clock::{SimClock, SimSpeed},
    command::{CommandOutcome, PlayerCommand},
    config::{GardenSettings, SimConfig},
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    grid::GridState,
    growth_subsystem::GrowthSubsystem,
    plant::{PlantCatalog, PlantKind},
    rng::{RngBank, SubsystemSlot},
    scenario::{ScenarioContext, ScenarioEngine},
    snapshot::{SimulationState, UndoHistory},
    store::{SimStore, SlotSummary},
    subsystem::{SimSubsystem, TickContext},
    types::{GridPos, RunId, SaveSlot, Tick},
    weather_subsystem::WeatherSubsystem,
};

pub struct GardenSession {
    pub run_id: RunId,
    pub clock:  SimClock,
    rng_bank:   RngBank,
    settings:   GardenSettings,
    catalog:    PlantCatalog,
    grid:       GridState,
    player:     GridPos,
    scenarios:  ScenarioEngine,
    history:    UndoHistory,
    phases:     Vec<(SubsystemSlot, Box<dyn SimSubsystem>)>,
    store:      SimStore,
    outbox:     Vec<SimEvent>,
}

impl GardenSession {
    /// A bare session: no phases, no scenario, an empty default-size grid.
    pub fn new(run_id: RunId, seed: u64, config: SimConfig, store: SimStore) -> Self {
        let size = config.settings.default_grid_size.max(1);
        Self {
            clock:     SimClock::new(),
            rng_bank:  RngBank::new(seed),
            catalog:   config.catalog,
            grid:      GridState::new(size),
            player:    GridPos::default(),
            scenarios: ScenarioEngine::new(config.scenarios),
            history:   UndoHistory::new(config.settings.undo_limit),
            phases:    Vec::new(),
            outbox:    Vec::new(),
            settings:  config.settings,
            store,
            run_id,
        }
    }

    /// Build a fully wired session: phases registered, run recorded,
    /// starting scenario loaded and the baseline state on the undo stack.
    /// The store must already be migrated.
    pub fn build(run_id: RunId, seed: u64, config: SimConfig, store: SimStore) -> SimResult<Self> {
        store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;
        let mut session = GardenSession::new(run_id, seed, config, store);

        // TICK PIPELINE ORDER: fixed, documented, never reordered.
        session.register(SubsystemSlot::Weather, Box::new(WeatherSubsystem::new()));
        session.register(SubsystemSlot::Growth, Box::new(GrowthSubsystem::new()));

        let run_id = session.run_id.clone();
        session.record("engine", vec![SimEvent::RunInitialized { run_id, seed }]);

        let starting = session.settings.starting_scenario.clone();
        if !starting.is_empty() {
            session.activate_scenario(&starting);
        }
        let baseline = session.current_state();
        session.history.push(baseline);
        Ok(session)
    }

    /// In-memory session over `SimConfig::default_test()`.
    pub fn build_test(run_id: &str, seed: u64) -> SimResult<Self> {
        Self::build_test_with(run_id, seed, SimConfig::default_test())
    }

    pub fn build_test_with(run_id: &str, seed: u64, config: SimConfig) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        Self::build(run_id.to_string(), seed, config, store)
    }

    /// Register a tick phase. Call in the documented pipeline order.
    pub fn register(&mut self, slot: SubsystemSlot, phase: Box<dyn SimSubsystem>) {
        self.phases.push((slot, phase));
    }

    // ── Accessors ──────────────────────────────────────────────

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn player(&self) -> GridPos {
        self.player
    }

    pub fn catalog(&self) -> &PlantCatalog {
        &self.catalog
    }

    pub fn scenario(&self) -> &ScenarioEngine {
        &self.scenarios
    }

    pub fn settings(&self) -> &GardenSettings {
        &self.settings
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.seed()
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick
    }

    /// Drain every event produced since the last call.
    ///
    /// The outbox is unbounded; a caller that ticks must drain it.
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn store_events_for_tick(&self, tick: Tick) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(&self.run_id, tick)
    }

    // ── Time ───────────────────────────────────────────────────

    /// Run one tick of the pipeline. Always runs, paused or not.
    pub fn advance_time(&mut self) -> SimResult<Vec<SimEvent>> {
        let tick = self.clock.advance();
        log::debug!("Time advanced to {tick}");

        let mut tick_events = vec![SimEvent::TickStarted { tick }];
        append_to_log(&self.store, &self.run_id, "engine", tick, &tick_events);

        let weather = self.scenarios.weather(self.settings.weather);
        for (slot, phase) in &mut self.phases {
            let mut rng = self.rng_bank.for_subsystem_at_tick(*slot, tick);
            let mut ctx = TickContext {
                tick,
                grid: &mut self.grid,
                catalog: &self.catalog,
                weather,
            };
            let new_events = phase.update(&mut ctx, &mut rng)?;
            append_to_log(&self.store, &self.run_id, phase.name(), tick, &new_events);
            tick_events.extend(new_events);
        }

        let mut scenario_events = Vec::new();
        let mut ctx = ScenarioContext {
            tick,
            catalog: &self.catalog,
            grid:    &mut self.grid,
            player:  &mut self.player,
        };
        self.scenarios.on_tick(&mut ctx, &mut scenario_events);
        append_to_log(&self.store, &self.run_id, "scenario", tick, &scenario_events);
        tick_events.extend(scenario_events);

        let closing = vec![
            SimEvent::RedrawRequested { tick },
            SimEvent::TickCompleted { tick },
        ];
        append_to_log(&self.store, &self.run_id, "engine", tick, &closing);
        tick_events.extend(closing);

        if self.settings.autosave {
            if let Err(e) = self.persist(SaveSlot::AutoSave) {
                log::error!("Auto-save failed: {e}");
            }
        }
        let current = self.current_state();
        self.history.push(current);

        self.outbox.extend(tick_events.iter().cloned());
        Ok(tick_events)
    }

    /// Run n ticks in a loop. Used for testing and fast-forward.
    pub fn run_ticks(&mut self, n: u64) -> SimResult<()> {
        for _ in 0..n {
            self.advance_time()?;
        }
        Ok(())
    }

    /// One timer firing: as many ticks as the clock speed asks for,
    /// none while paused. Returns how many ticks ran.
    pub fn timer_step(&mut self) -> SimResult<u32> {
        let steps = self.clock.ticks_per_timer_step();
        for _ in 0..steps {
            self.advance_time()?;
        }
        Ok(steps)
    }

    // ── Player actions ─────────────────────────────────────────

    /// Sow a random catalog kind at the player's cell.
    pub fn sow_plant(&mut self) -> CommandOutcome {
        if self.catalog.is_empty() {
            return CommandOutcome::no_op("The plant catalog is empty; nothing to sow.");
        }
        let GridPos { x, y } = self.player;
        let cell_index = (y * self.grid.size() + x) as u64;
        let mut rng = self
            .rng_bank
            .for_cell_at_tick(SubsystemSlot::Sowing, self.clock.current_tick, cell_index);
        let plant_type = rng.next_u64_below(self.catalog.len() as u64) as u8 + 1;
        self.sow(plant_type)
    }

    pub fn sow_plant_kind(&mut self, kind: PlantKind) -> CommandOutcome {
        self.sow(kind.id())
    }

    fn sow(&mut self, plant_type: u8) -> CommandOutcome {
        let GridPos { x, y } = self.player;
        if self.grid.plant_type(x, y) != 0 {
            return CommandOutcome::no_op(format!("Cell ({x}, {y}) is already planted."));
        }
        if !self.catalog.contains(plant_type) {
            return CommandOutcome::no_op(format!("Plant type {plant_type} is not in the catalog."));
        }
        self.grid.set_plant_type(x, y, plant_type);
        self.grid.set_growth_level(x, y, 1);
        self.grid.set_water(x, y, 5);
        self.grid.set_sun(x, y, 5);
        log::info!("Sowed {} at ({x}, {y})", self.catalog.name(plant_type));

        let tick = self.clock.current_tick;
        self.record("player", vec![
            SimEvent::PlantSown { tick, x, y, plant_type },
            SimEvent::RedrawRequested { tick },
        ]);
        let current = self.current_state();
        self.history.push(current);
        CommandOutcome::Applied
    }

    /// Harvest the plant at the player's cell. Sun and water stay.
    pub fn reap_plant(&mut self) -> CommandOutcome {
        let GridPos { x, y } = self.player;
        let plant_type = self.grid.plant_type(x, y);
        if plant_type == 0 {
            return CommandOutcome::no_op(format!("No plant to reap at ({x}, {y})."));
        }
        let growth_level = self.grid.growth_level(x, y);
        self.grid.set_plant_type(x, y, 0);
        self.grid.set_growth_level(x, y, 0);
        log::info!("Reaped {} (growth {growth_level}) at ({x}, {y})", self.catalog.name(plant_type));

        let tick = self.clock.current_tick;
        self.record("player", vec![
            SimEvent::PlantReaped { tick, x, y, plant_type, growth_level },
            SimEvent::RedrawRequested { tick },
        ]);
        let current = self.current_state();
        self.history.push(current);
        CommandOutcome::Applied
    }

    pub fn move_player(&mut self, dx: i64, dy: i64) -> CommandOutcome {
        let Some(next) = self.player.offset(dx, dy, self.grid.size()) else {
            return CommandOutcome::no_op(format!(
                "Move by ({dx}, {dy}) from ({}, {}) leaves the grid.",
                self.player.x, self.player.y
            ));
        };
        self.player = next;

        let tick = self.clock.current_tick;
        self.record("player", vec![
            SimEvent::PlayerMoved { tick, x: next.x, y: next.y },
            SimEvent::RedrawRequested { tick },
        ]);
        let current = self.current_state();
        self.history.push(current);
        CommandOutcome::Applied
    }

    // ── Scenarios ──────────────────────────────────────────────

    /// Load a scenario by name, replacing the grid and player position.
    pub fn load_scenario(&mut self, name: &str) -> CommandOutcome {
        if !self.activate_scenario(name) {
            let name = name.to_string();
            let err = if self.scenarios.scenario_names().any(|n| n == name) {
                SimError::InvalidScenario { name, reason: "definition is unusable".into() }
            } else {
                SimError::ScenarioNotFound { name }
            };
            return CommandOutcome::failed(err.to_string());
        }
        let current = self.current_state();
        self.history.push(current);
        CommandOutcome::Applied
    }

    fn activate_scenario(&mut self, name: &str) -> bool {
        let tick = self.clock.current_tick;
        let mut events = Vec::new();
        let mut ctx = ScenarioContext {
            tick,
            catalog: &self.catalog,
            grid:    &mut self.grid,
            player:  &mut self.player,
        };
        let loaded = self.scenarios.load_scenario(name, &mut ctx, &mut events);
        if loaded {
            events.push(SimEvent::RedrawRequested { tick });
        }
        self.record("scenario", events);
        loaded
    }

    // ── Snapshots ──────────────────────────────────────────────

    pub fn current_state(&self) -> SimulationState {
        SimulationState::capture(
            &self.grid,
            self.clock.current_tick,
            self.player,
            self.scenarios.active_name(),
            self.scenarios.is_completed(),
        )
    }

    /// Replace the live simulation with `state`. Validation happens
    /// before anything is touched, so an error leaves the session as it was.
    pub fn restore_state(&mut self, state: &SimulationState, source: &str) -> SimResult<()> {
        let grid = state.rebuild_grid(&self.catalog)?;
        self.grid = grid;
        self.player = state.player_position;
        self.clock.rewind_to(state.game_time);
        self.scenarios.resume(
            state.scenario_name.as_deref(),
            state.scenario_completed,
            &self.catalog,
        );

        let tick = state.game_time;
        self.record("snapshot", vec![
            SimEvent::StateRestored { tick, source: source.to_string() },
            SimEvent::RedrawRequested { tick },
        ]);
        Ok(())
    }

    pub fn undo(&mut self) -> CommandOutcome {
        let current = self.current_state();
        let Some(previous) = self.history.undo(current) else {
            return CommandOutcome::no_op("Nothing to undo.");
        };
        match self.restore_state(&previous, "undo") {
            Ok(()) => CommandOutcome::Applied,
            Err(e) => CommandOutcome::failed(format!("Undo failed: {e}")),
        }
    }

    pub fn redo(&mut self) -> CommandOutcome {
        let current = self.current_state();
        let Some(next) = self.history.redo(current) else {
            return CommandOutcome::no_op("Nothing to redo.");
        };
        match self.restore_state(&next, "redo") {
            Ok(()) => CommandOutcome::Applied,
            Err(e) => CommandOutcome::failed(format!("Redo failed: {e}")),
        }
    }

    pub fn save_game(&mut self, slot: SaveSlot) -> CommandOutcome {
        match self.persist(slot) {
            Ok(()) => {
                log::info!("Game saved to {slot}");
                let tick = self.clock.current_tick;
                self.record("snapshot", vec![SimEvent::GameSaved { tick, slot }]);
                CommandOutcome::Applied
            }
            Err(e) => CommandOutcome::failed(format!("Save to {slot} failed: {e}")),
        }
    }

    pub fn load_game(&mut self, slot: SaveSlot) -> CommandOutcome {
        let state = match self.read_slot(slot) {
            Ok(state) => state,
            Err(SimError::SlotEmpty { slot }) => {
                return CommandOutcome::no_op(format!("No save found in {slot}"));
            }
            Err(e) => return CommandOutcome::failed(format!("Load game failed: {e}")),
        };
        if let Err(e) = self.restore_state(&state, &slot.key()) {
            return CommandOutcome::failed(format!("Load game failed: {e}"));
        }
        log::info!("Game loaded from {slot}");
        let current = self.current_state();
        self.history.push(current);
        CommandOutcome::Applied
    }

    pub fn list_slots(&self) -> SimResult<Vec<SlotSummary>> {
        self.store.list_slots()
    }

    pub fn has_autosave(&self) -> bool {
        match self.store.has_slot(&SaveSlot::AutoSave.key()) {
            Ok(present) => present,
            Err(e) => {
                log::error!("Cannot check for an auto-save: {e}");
                false
            }
        }
    }

    /// Continue where the last session left off.
    pub fn resume_from_autosave(&mut self) -> CommandOutcome {
        self.load_game(SaveSlot::AutoSave)
    }

    fn persist(&self, slot: SaveSlot) -> SimResult<()> {
        let state = self.current_state();
        let payload = state.encode()?;
        self.store.save_slot(&slot.key(), state.game_time, &payload)?;
        log::debug!("Wrote {} bytes to {slot}", payload.len());
        Ok(())
    }

    fn read_slot(&self, slot: SaveSlot) -> SimResult<SimulationState> {
        let payload = self
            .store
            .load_slot(&slot.key())?
            .ok_or_else(|| SimError::SlotEmpty { slot: slot.to_string() })?;
        SimulationState::decode(&payload)
    }

    // ── Commands ───────────────────────────────────────────────

    /// Apply one player command. Never panics on bad input; every
    /// rejection comes back as an outcome.
    pub fn apply(&mut self, command: PlayerCommand) -> CommandOutcome {
        match command {
            PlayerCommand::Pause => {
                self.clock.pause();
                CommandOutcome::Applied
            }
            PlayerCommand::Resume => {
                self.clock.resume();
                CommandOutcome::Applied
            }
            PlayerCommand::SetSpeed { speed } => self.set_speed(speed),
            PlayerCommand::AdvanceTime => match self.advance_time() {
                Ok(_) => CommandOutcome::Applied,
                Err(e) => CommandOutcome::failed(format!("Tick failed: {e}")),
            },
            PlayerCommand::Move { dx, dy } => self.move_player(dx, dy),
            PlayerCommand::Sow { kind: Some(kind) } => self.sow_plant_kind(kind),
            PlayerCommand::Sow { kind: None } => self.sow_plant(),
            PlayerCommand::Reap => self.reap_plant(),
            PlayerCommand::Undo => self.undo(),
            PlayerCommand::Redo => self.redo(),
            PlayerCommand::Save { slot } => self.save_game(slot),
            PlayerCommand::Load { slot } => self.load_game(slot),
            PlayerCommand::LoadScenario { name } => self.load_scenario(&name),
        }
    }

    fn set_speed(&mut self, speed: SimSpeed) -> CommandOutcome {
        self.clock.set_speed(speed);
        log::info!("Clock speed set to {speed:?}");
        CommandOutcome::Applied
    }

    /// Outbox + event log for events produced outside the tick pipeline.
    fn record(&mut self, source: &str, events: Vec<SimEvent>) {
        append_to_log(&self.store, &self.run_id, source, self.clock.current_tick, &events);
        self.outbox.extend(events);
    }
}

/// Persist events to the diagnostics log. A failed write is logged and
/// dropped; the simulation carries on.
fn append_to_log(store: &SimStore, run_id: &str, source: &str, tick: Tick, events: &[SimEvent]) {
    for event in events {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                log::error!("Cannot serialize {} event: {e}", event.type_name());
                continue;
            }
        };
        let entry = EventLogEntry {
            id:         None,
            run_id:     run_id.to_string(),
            tick,
            source:     source.to_string(),
            event_type: event.type_name().to_string(),
            payload,
        };
        if let Err(e) = store.append_event(&entry) {
            log::error!("Cannot append {} event to the log: {e}", entry.event_type);
        }
    }
}
