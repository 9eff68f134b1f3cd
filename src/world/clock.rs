/// Milliseconds since world start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GameTick(pub u64);

impl GameTick {
    pub fn saturating_add_ms(self, millis: u64) -> GameTick {
        GameTick(self.0.saturating_add(millis))
    }

    pub fn saturating_elapsed_since(self, earlier: GameTick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

#[derive(Debug, Clone)]
pub struct GameClock {
    now: GameTick,
}

impl GameClock {
    pub fn new() -> Self {
        Self { now: GameTick(0) }
    }

    pub fn now(&self) -> GameTick {
        self.now
    }

    pub fn advance_ms(&mut self, millis: u64) -> GameTick {
        self.now = self.now.saturating_add_ms(millis);
        self.now
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new()
    }
}
