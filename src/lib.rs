pub mod afk;
pub mod combat;
mod config;
pub mod entities;
pub mod persistence;
pub mod security;
pub mod telemetry;
pub mod world;

pub use security::envelope::{Action, SignedEnvelope};
pub use security::integrity::IntegrityHasher;
pub use security::verifier::{SignatureVerifier, VerifyError};
pub use world::state::{WorldConfig, WorldState};

use persistence::autosave::{AutosaveConfig, AutosaveState};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub fn run(args: &[String]) -> Result<(), String> {
    let config = config::AppConfig::from_args(args)?;
    telemetry::logging::init(&config.root)?;

    let store = persistence::store::SaveStore::from_root(&config.root);
    let save_report = store.validate_character_saves();
    println!("everidle: startup");
    println!("- root: {}", config.root.display());
    println!("- server: {}", config.server_id);
    if save_report.missing_dir {
        println!("- saves: missing save/characters directory");
    } else {
        println!(
            "- saves: files={}, parsed={}, errors={}",
            save_report.character_files,
            save_report.parsed,
            save_report.errors.len()
        );
    }
    for err in &save_report.errors {
        eprintln!("everidle: save validate {}", err);
    }

    let tick_ms = config.tick_ms;
    let world = Arc::new(Mutex::new(WorldState::new(WorldConfig {
        server_id: config.server_id,
        secret: config.secret,
        nonce_capacity: config.nonce_capacity,
        afk_max_duration_seconds: config.afk_max_duration_seconds,
        tick_ms,
        rng_seed: config.rng_seed,
        engine: combat::engine::EngineConfig::default(),
    })));
    {
        let mut world = world
            .lock()
            .map_err(|_| "world lock poisoned".to_string())?;
        world.set_store(store);
    }
    telemetry::logging::log_game("world started");

    let mut autosave = AutosaveState::new(
        AutosaveConfig {
            interval_seconds: config.autosave_interval_seconds,
        },
        Instant::now(),
    );

    loop {
        {
            let mut world = world
                .lock()
                .map_err(|_| "world lock poisoned".to_string())?;
            world.tick();
            let now = Instant::now();
            if autosave.due(now) {
                let saved = world.save_all();
                telemetry::logging::log_game(&format!("autosave: {saved} characters"));
                autosave.mark_saved(now);
            }
        }
        std::thread::sleep(Duration::from_millis(tick_ms));
    }
}
