pub mod consumables;
pub mod engine;
pub mod log;
pub mod resolver;
pub mod rng;
pub mod stats;
