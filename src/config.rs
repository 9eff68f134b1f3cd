use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub server_id: String,
    /// Shared HMAC secret for envelope signatures; never logged.
    pub secret: String,
    pub tick_ms: u64,
    pub nonce_capacity: usize,
    pub afk_max_duration_seconds: u64,
    pub autosave_interval_seconds: u64,
    pub rng_seed: u64,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 2 {
            return Err("usage: everidle <data-root> [server-id]".to_string());
        }

        let root = Path::new(&args[1]).to_path_buf();
        let server_id = if args.len() > 2 {
            args[2].clone()
        } else {
            "world-1".to_string()
        };

        let secret = match env_string("EVERIDLE_SECRET") {
            Some(secret) => secret,
            None => return Err("EVERIDLE_SECRET must be set and non-empty".to_string()),
        };

        let tick_ms = env_parsed("EVERIDLE_TICK_MS")?.unwrap_or(250).max(1);
        let nonce_capacity = env_parsed("EVERIDLE_NONCE_CAPACITY")?.unwrap_or(10_000);
        let afk_max_duration_seconds = env_parsed("EVERIDLE_AFK_CAP_SECS")?.unwrap_or(7200);
        let autosave_interval_seconds = env_parsed("EVERIDLE_AUTOSAVE_SECS")?.unwrap_or(300);
        let rng_seed = env_parsed("EVERIDLE_RNG_SEED")?.unwrap_or(0);

        Ok(Self {
            root,
            server_id,
            secret,
            tick_ms,
            nonce_capacity,
            afk_max_duration_seconds,
            autosave_interval_seconds,
            rng_seed,
        })
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Result<Option<T>, String> {
    match env_string(name) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| format!("{name} is not a valid number: {value}")),
    }
}
