pub mod clock;
pub mod monsters;
pub mod position;
pub mod scheduler;
pub mod state;
pub mod zones;
