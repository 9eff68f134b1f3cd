/// Deterministic roll source for combat resolution. Seeded per world so
/// replays and tests are reproducible.
#[derive(Debug, Clone, Copy)]
pub struct CombatRng {
    state: u64,
}

impl CombatRng {
    pub fn from_seed(seed: u64) -> Self {
        let seed = if seed == 0 { 0x9e3779b97f4a7c15 } else { seed };
        Self { state: seed }
    }

    fn next(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1);
        (self.state >> 32) as u32
    }

    /// Roll against a percentage chance in [0, 100].
    pub fn roll_percent(&mut self, chance: f32) -> bool {
        if chance <= 0.0 {
            return false;
        }
        if chance >= 100.0 {
            return true;
        }
        let bucket = self.next() % 10_000;
        (bucket as f32) < chance * 100.0
    }

    pub fn roll_range(&mut self, min: u32, max: u32) -> u32 {
        let (min, max) = if min >= max { (min, min) } else { (min, max) };
        let span = u64::from(max - min) + 1;
        let value = u64::from(self.next()) % span;
        min + value as u32
    }
}
