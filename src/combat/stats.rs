use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatantStats {
    pub hp: i32,
    pub max_hp: i32,
    pub resource: i32,
    pub max_resource: i32,
    pub attack_power: i32,
    pub spell_power: i32,
    /// Seconds per swing; must stay above zero.
    pub attack_speed: f32,
    /// Percent chance in [0, 100].
    pub critical_chance: f32,
    /// Percent multiplier applied on a critical hit (150.0 = 1.5x).
    pub critical_damage: f32,
    pub armor: i32,
    pub magic_resistance: i32,
    pub penetration: i32,
    pub spell_penetration: i32,
    /// Percent chance in [0, 100].
    pub dodge_chance: f32,
}

/// Damage reduction is capped so armor stacking can never zero out a hit.
pub const MITIGATION_CAP_PERCENT: f32 = 90.0;

/// Points of armor/resistance per percent of reduction.
const MITIGATION_SCALE: f32 = 10.0;

impl CombatantStats {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Swing period in milliseconds.
    pub fn attack_period_ms(&self) -> u64 {
        let speed = self.attack_speed.max(0.1);
        (speed * 1000.0) as u64
    }

    /// Percent of incoming damage removed by armor (physical) or magic
    /// resistance (spells), after the attacker's penetration, clamped to
    /// [0, MITIGATION_CAP_PERCENT].
    pub fn mitigation_percent(&self, spell: bool, penetration: i32) -> f32 {
        let defense = if spell {
            self.magic_resistance
        } else {
            self.armor
        };
        let effective = defense.saturating_sub(penetration).max(0);
        (effective as f32 / MITIGATION_SCALE).clamp(0.0, MITIGATION_CAP_PERCENT)
    }

    /// Apply damage, clamping hp to [0, max_hp]. Returns the amount applied.
    pub fn apply_damage(&mut self, amount: i32) -> i32 {
        let amount = amount.max(0);
        let applied = amount.min(self.hp);
        self.hp -= applied;
        applied
    }

    /// Apply healing without overflowing max_hp. Returns the amount applied.
    pub fn apply_heal(&mut self, amount: i32) -> i32 {
        let amount = amount.max(0);
        let applied = amount.min(self.max_hp - self.hp);
        self.hp += applied;
        applied
    }

    pub fn restore_to_max(&mut self) {
        self.hp = self.max_hp;
        self.resource = self.max_resource;
    }
}

impl Default for CombatantStats {
    fn default() -> Self {
        Self {
            hp: 100,
            max_hp: 100,
            resource: 50,
            max_resource: 50,
            attack_power: 10,
            spell_power: 10,
            attack_speed: 2.0,
            critical_chance: 5.0,
            critical_damage: 150.0,
            armor: 0,
            magic_resistance: 0,
            penetration: 0,
            spell_penetration: 0,
            dodge_chance: 0.0,
        }
    }
}
