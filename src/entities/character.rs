use crate::combat::consumables::ConsumableStock;
use crate::combat::stats::CombatantStats;
use crate::world::clock::GameTick;
use crate::world::monsters::MonsterId;
use crate::world::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatState {
    Idle,
    Engaging,
    InCombat,
    Dead,
    Resurrecting,
}

/// Transient per-character combat bookkeeping. Created when the character
/// enters the world, dropped on disconnect; never persisted. The target is a
/// lookup-only reference: the monster may despawn independently and every
/// consumer must handle the id no longer resolving.
#[derive(Debug, Clone)]
pub struct CombatSession {
    pub state: CombatState,
    pub in_combat: bool,
    pub target: Option<MonsterId>,
    pub gcd_ready_at: GameTick,
    pub buffs: BTreeMap<String, GameTick>,
    pub cooldowns: BTreeMap<String, GameTick>,
    pub dwell_since: Option<GameTick>,
}

impl CombatSession {
    pub fn new() -> Self {
        Self {
            state: CombatState::Idle,
            in_combat: false,
            target: None,
            gcd_ready_at: GameTick(0),
            buffs: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
            dwell_since: None,
        }
    }

    pub fn gcd_ready(&self, now: GameTick) -> bool {
        now >= self.gcd_ready_at
    }

    pub fn cooldown_ready(&self, skill_id: &str, now: GameTick) -> bool {
        self.cooldowns
            .get(skill_id)
            .map_or(true, |ready_at| now >= *ready_at)
    }

    pub fn clear_target(&mut self) {
        self.target = None;
        self.in_combat = false;
        if matches!(self.state, CombatState::Engaging | CombatState::InCombat) {
            self.state = CombatState::Idle;
        }
    }

    pub fn expire_buffs(&mut self, now: GameTick) {
        self.buffs.retain(|_, expires_at| now < *expires_at);
    }
}

impl Default for CombatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub level: u32,
    pub experience: u64,
    pub xp_to_level: u64,
    pub stats: CombatantStats,
    pub currencies: BTreeMap<String, i64>,
    pub talents: BTreeMap<String, u32>,
    pub consumables: ConsumableStock,
    pub position: Position,
    pub zone_id: String,
    pub monsters_killed: u64,
    pub session: CombatSession,
}

impl Character {
    pub fn gold(&self) -> i64 {
        self.currencies.get("gold").copied().unwrap_or(0)
    }

    pub fn add_gold(&mut self, amount: i64) {
        let entry = self.currencies.entry("gold".to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    pub fn add_experience(&mut self, amount: u64) {
        self.experience = self.experience.saturating_add(amount);
        while self.xp_to_level > 0 && self.experience >= self.xp_to_level {
            self.experience -= self.xp_to_level;
            self.level = self.level.saturating_add(1);
            self.xp_to_level = xp_for_level(self.level);
        }
    }
}

pub fn xp_for_level(level: u32) -> u64 {
    let level = u64::from(level.max(1));
    100 * level * level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character() -> Character {
        Character {
            id: CharacterId(1),
            name: "Tester".to_string(),
            level: 1,
            experience: 0,
            xp_to_level: xp_for_level(1),
            stats: CombatantStats::default(),
            currencies: BTreeMap::new(),
            talents: BTreeMap::new(),
            consumables: ConsumableStock::default(),
            position: Position::default(),
            zone_id: "meadow".to_string(),
            monsters_killed: 0,
            session: CombatSession::new(),
        }
    }

    #[test]
    fn experience_rolls_over_into_levels() {
        let mut ch = character();
        ch.add_experience(250);
        assert_eq!(ch.level, 2);
        assert_eq!(ch.experience, 150);
        assert_eq!(ch.xp_to_level, xp_for_level(2));
    }

    #[test]
    fn gold_accumulates_through_the_currency_map() {
        let mut ch = character();
        assert_eq!(ch.gold(), 0);
        ch.add_gold(75);
        ch.add_gold(25);
        assert_eq!(ch.gold(), 100);
    }

    #[test]
    fn clear_target_returns_combat_states_to_idle() {
        let mut session = CombatSession::new();
        session.state = CombatState::InCombat;
        session.in_combat = true;
        session.target = Some(MonsterId(9));
        session.clear_target();
        assert_eq!(session.state, CombatState::Idle);
        assert!(!session.in_combat);
        assert!(session.target.is_none());

        // A dead character stays dead when the target is cleared.
        session.state = CombatState::Dead;
        session.clear_target();
        assert_eq!(session.state, CombatState::Dead);
    }

    #[test]
    fn buffs_expire_by_tick() {
        let mut session = CombatSession::new();
        session.buffs.insert("regen".to_string(), GameTick(1000));
        session.buffs.insert("haste".to_string(), GameTick(3000));
        session.expire_buffs(GameTick(2000));
        assert!(!session.buffs.contains_key("regen"));
        assert!(session.buffs.contains_key("haste"));
    }
}
