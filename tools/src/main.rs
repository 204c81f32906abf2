//! garden-runner: headless runner and JSON-lines front end for the garden simulation.
//!
//! Usage:
//!   garden-runner --seed 12345 --ticks 30 --db garden.db
//!   garden-runner --ipc-mode --auto-tick-ms 1000 --resume --db garden.db
//!
//! In IPC mode every stdin line is one request and every reply is one
//! stdout line. Timer ticks and stdin requests are delivered through one
//! channel and handled by a single loop, so they never overlap.

use anyhow::Result;
use garden_core::{
    clock::SimSpeed,
    command::{CommandOutcome, PlayerCommand},
    config::SimConfig,
    engine::GardenSession,
    event::SimEvent,
    snapshot::{collect_plants, PlantRecord},
    store::SimStore,
    types::{GridPos, Tick},
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        #[serde(default = "one")]
        count: u64,
    },
    Command {
        command: PlayerCommand,
    },
    ListSlots,
    Quit,
}

fn one() -> u64 { 1 }

#[derive(serde::Serialize)]
struct UiState {
    tick:               Tick,
    paused:             bool,
    speed:              SimSpeed,
    grid_size:          usize,
    player:             GridPos,
    scenario:           Option<String>,
    scenario_completed: bool,
    plants:             Vec<PlantRecord>,
    /// Row-major [sun, water] per cell, for colouring the tiles.
    resources:          Vec<[u8; 2]>,
    undo_depth:         usize,
    redo_depth:         usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome:            Option<CommandOutcome>,
    events:             Vec<SimEvent>,
}

#[derive(serde::Serialize)]
struct SlotInfo {
    slot:     String,
    tick:     Tick,
    saved_at: String,
}

/// Everything the main loop reacts to.
enum Input {
    Line(String),
    TimerFired,
    Eof,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 30u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let resume = args.iter().any(|a| a == "--resume");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");

    let mut config = SimConfig::load(data_dir)?;
    if let Some(name) = string_arg(&args, "--scenario") {
        config = config.with_starting_scenario(name);
    }
    let auto_tick_ms = parse_arg(&args, "--auto-tick-ms", config.settings.tick_interval_ms);

    if !ipc_mode {
        println!("Garden Grid: garden-runner");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  scenario:  {}", config.settings.starting_scenario);
        println!();
    }

    let store = SimStore::open(db)?;
    store.migrate()?;

    let run_id = format!("run-{seed}-{}", uuid::Uuid::new_v4());
    let mut session = GardenSession::build(run_id.clone(), seed, config, store)?;

    if resume {
        if session.has_autosave() {
            let outcome = session.resume_from_autosave();
            log::info!("Resume from auto-save: {outcome:?}");
        } else {
            log::info!("No auto-save to resume from");
        }
    }

    if ipc_mode {
        run_ipc_loop(&mut session, auto_tick_ms)?;
    } else {
        let mut events = 0;
        for _ in 0..ticks {
            session.advance_time()?;
            events += session.take_events().len();
        }
        print_summary(&session, ticks, events)?;
    }

    Ok(())
}

fn run_ipc_loop(session: &mut GardenSession, auto_tick_ms: u64) -> Result<()> {
    let (tx, rx) = mpsc::channel::<Input>();
    let in_flight = Arc::new(AtomicBool::new(false));

    spawn_stdin_reader(tx.clone());
    if auto_tick_ms > 0 {
        spawn_tick_timer(tx, Duration::from_millis(auto_tick_ms), Arc::clone(&in_flight));
    } else {
        drop(tx);
    }

    let mut stdout = io::stdout();
    while let Ok(input) = rx.recv() {
        let line = match input {
            Input::Eof => break,
            Input::TimerFired => {
                let ran = session.timer_step();
                in_flight.store(false, Ordering::Release);
                match ran {
                    Ok(0) => continue,
                    Ok(_) => serde_json::to_string(&build_ui_state(session, None))?,
                    Err(e) => {
                        log::error!("Timer tick failed: {e}");
                        serde_json::json!({ "error": e.to_string() }).to_string()
                    }
                }
            }
            Input::Line(buffer) => {
                if buffer.trim().is_empty() {
                    continue;
                }
                let cmd: IpcCommand = match serde_json::from_str(&buffer) {
                    Ok(c) => c,
                    Err(e) => {
                        writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                        stdout.flush()?;
                        continue;
                    }
                };
                match cmd {
                    IpcCommand::Quit => break,
                    IpcCommand::GetState => serde_json::to_string(&build_ui_state(session, None))?,
                    IpcCommand::Tick { count } => {
                        session.run_ticks(count)?;
                        serde_json::to_string(&build_ui_state(session, None))?
                    }
                    IpcCommand::Command { command } => {
                        let outcome = session.apply(command);
                        serde_json::to_string(&build_ui_state(session, Some(outcome)))?
                    }
                    IpcCommand::ListSlots => {
                        let slots: Vec<SlotInfo> = session
                            .list_slots()?
                            .into_iter()
                            .map(|s| SlotInfo { slot: s.key, tick: s.tick, saved_at: s.saved_at })
                            .collect();
                        serde_json::to_string(&slots)?
                    }
                }
            }
        };
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn spawn_stdin_reader(tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        let mut handle = stdin.lock();
        loop {
            let mut buffer = String::new();
            match handle.read_line(&mut buffer) {
                Ok(0) => {
                    let _ = tx.send(Input::Eof);
                    break;
                }
                Ok(_) => {
                    if tx.send(Input::Line(buffer)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("stdin read failed: {e}");
                    let _ = tx.send(Input::Eof);
                    break;
                }
            }
        }
    });
}

/// Single-flight periodic timer: a firing is only queued once the
/// previous one has been handled.
fn spawn_tick_timer(tx: mpsc::Sender<Input>, interval: Duration, in_flight: Arc<AtomicBool>) {
    thread::spawn(move || loop {
        thread::sleep(interval);
        if in_flight.swap(true, Ordering::AcqRel) {
            log::debug!("Previous tick still pending; skipping timer firing");
            continue;
        }
        if tx.send(Input::TimerFired).is_err() {
            break;
        }
    });
}

fn build_ui_state(session: &mut GardenSession, outcome: Option<CommandOutcome>) -> UiState {
    let grid = session.grid();
    let resources = grid.cells().map(|(_, _, c)| [c.sun, c.water]).collect();
    let plants = collect_plants(grid);
    let grid_size = grid.size();
    UiState {
        tick: session.clock.current_tick,
        paused: session.clock.paused,
        speed: session.clock.speed,
        grid_size,
        player: session.player(),
        scenario: session.scenario().active_name().map(str::to_string),
        scenario_completed: session.scenario().is_completed(),
        plants,
        resources,
        undo_depth: session.history().undo_depth(),
        redo_depth: session.history().redo_depth(),
        outcome,
        events: session.take_events(),
    }
}

fn print_summary(session: &GardenSession, ticks: u64, events: usize) -> Result<()> {
    let grid = session.grid();
    let mature = grid
        .cells()
        .filter(|(_, _, c)| c.growth_level == garden_core::grid::MAX_GROWTH_LEVEL)
        .count();

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {}", session.run_id);
    println!("  ticks run:      {ticks}");
    println!("  events:         {events}");
    println!("  final tick:     {}", session.clock.current_tick);
    println!("  scenario:       {}", session.scenario().active_name().unwrap_or("(none)"));
    println!("  completed:      {}", session.scenario().is_completed());
    println!("  grid size:      {}", grid.size());
    println!("  plants:         {}", grid.plant_count());
    println!("  mature plants:  {mature}");

    println!();
    println!("=== GARDEN ===");
    for y in 0..grid.size() {
        let row: String = (0..grid.size())
            .map(|x| {
                let cell = grid.cell(x, y);
                if cell.is_empty() {
                    ". ".to_string()
                } else {
                    format!("{} ", cell.growth_level)
                }
            })
            .collect();
        println!("  {}", row.trim_end());
    }

    println!();
    println!("=== PLANT TYPES ===");
    for (id, def) in session.catalog().kinds() {
        let count = grid.cells().filter(|(_, _, c)| c.plant_type == id).count();
        println!("  {id} {:<20} {count}", def.name);
    }

    let slots = session.list_slots()?;
    if !slots.is_empty() {
        println!();
        println!("=== SAVE SLOTS ===");
        for s in slots {
            println!("  {:<10} tick {:<6} {}", s.key, s.tick, s.saved_at);
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
