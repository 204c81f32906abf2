pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod grid;
pub mod growth_subsystem;
pub mod plant;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod store;
pub mod subsystem;
pub mod types;
pub mod weather_subsystem;
