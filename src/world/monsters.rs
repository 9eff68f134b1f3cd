use crate::combat::stats::CombatantStats;
use crate::entities::character::CharacterId;
use crate::world::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonsterId(pub u32);

/// Static description of a monster kind: base stats, rewards and spawn
/// behavior. Live monsters are stamped out of this and reset against it on
/// respawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterTemplate {
    pub name: String,
    pub max_hp: i32,
    pub attack_power: i32,
    pub armor: i32,
    /// Movement/attack speed stat; the swing period is 2.5s scaled by
    /// 100 / speed, so speed 100 swings every 2.5s.
    pub speed: u32,
    pub xp_reward: u64,
    pub gold_reward: i64,
    pub aggro_radius: f32,
    pub respawn_seconds: u64,
}

impl MonsterTemplate {
    pub fn attack_period_ms(&self) -> u64 {
        let speed = self.speed.max(1) as f32;
        (2.5 * (100.0 / speed) * 1000.0) as u64
    }

    pub fn stats(&self) -> CombatantStats {
        CombatantStats {
            hp: self.max_hp,
            max_hp: self.max_hp,
            resource: 0,
            max_resource: 0,
            attack_power: self.attack_power,
            armor: self.armor,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Monster {
    pub id: MonsterId,
    pub template: MonsterTemplate,
    pub stats: CombatantStats,
    pub spawn_position: Position,
    pub position: Position,
    pub zone_id: String,
    pub alive: bool,
    pub target: Option<CharacterId>,
}

impl Monster {
    /// Reset to spawn position with full stats; used on (re)spawn.
    pub fn reset(&mut self) {
        self.stats = self.template.stats();
        self.position = self.spawn_position;
        self.alive = true;
        self.target = None;
    }
}

#[derive(Debug, Default)]
pub struct MonsterRoster {
    monsters: HashMap<MonsterId, Monster>,
    next_id: u32,
}

impl MonsterRoster {
    pub fn new() -> Self {
        Self {
            monsters: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn spawn(
        &mut self,
        template: MonsterTemplate,
        spawn_position: Position,
        zone_id: &str,
    ) -> MonsterId {
        let id = MonsterId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let monster = Monster {
            id,
            stats: template.stats(),
            template,
            spawn_position,
            position: spawn_position,
            zone_id: zone_id.to_string(),
            alive: true,
            target: None,
        };
        self.monsters.insert(id, monster);
        id
    }

    pub fn get(&self, id: MonsterId) -> Option<&Monster> {
        self.monsters.get(&id)
    }

    pub fn get_mut(&mut self, id: MonsterId) -> Option<&mut Monster> {
        self.monsters.get_mut(&id)
    }

    pub fn remove(&mut self, id: MonsterId) -> Option<Monster> {
        self.monsters.remove(&id)
    }

    pub fn ids(&self) -> Vec<MonsterId> {
        self.monsters.keys().copied().collect()
    }

    /// Closest living monster whose own aggro radius covers `position`.
    pub fn nearest_alive_aggro(&self, position: Position) -> Option<MonsterId> {
        let mut best: Option<(MonsterId, f32)> = None;
        for monster in self.monsters.values() {
            if !monster.alive {
                continue;
            }
            if !monster
                .position
                .within(position, monster.template.aggro_radius)
            {
                continue;
            }
            let distance = monster.position.distance_squared(position);
            match best {
                Some((_, current)) if current <= distance => {}
                _ => best = Some((monster.id, distance)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Closest living monster within `radius` of `position`.
    pub fn nearest_alive_within(&self, position: Position, radius: f32) -> Option<MonsterId> {
        let mut best: Option<(MonsterId, f32)> = None;
        for monster in self.monsters.values() {
            if !monster.alive {
                continue;
            }
            if !monster.position.within(position, radius) {
                continue;
            }
            let distance = monster.position.distance_squared(position);
            match best {
                Some((_, current)) if current <= distance => {}
                _ => best = Some((monster.id, distance)),
            }
        }
        best.map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.monsters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monsters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat() -> MonsterTemplate {
        MonsterTemplate {
            name: "Cave Rat".to_string(),
            max_hp: 40,
            attack_power: 6,
            armor: 5,
            speed: 100,
            xp_reward: 12,
            gold_reward: 3,
            aggro_radius: 12.0,
            respawn_seconds: 30,
        }
    }

    #[test]
    fn attack_period_scales_with_speed() {
        let mut template = rat();
        assert_eq!(template.attack_period_ms(), 2500);
        template.speed = 200;
        assert_eq!(template.attack_period_ms(), 1250);
        template.speed = 0;
        // Zero speed does not divide by zero.
        assert!(template.attack_period_ms() > 0);
    }

    #[test]
    fn reset_restores_template_stats_and_spawn_position() {
        let mut roster = MonsterRoster::new();
        let id = roster.spawn(rat(), Position::new(10.0, 0.0, 10.0), "cave");
        let monster = roster.get_mut(id).unwrap();
        monster.stats.apply_damage(40);
        monster.alive = false;
        monster.position = Position::new(99.0, 0.0, 99.0);
        monster.reset();
        assert!(monster.alive);
        assert_eq!(monster.stats.hp, 40);
        assert_eq!(monster.position, Position::new(10.0, 0.0, 10.0));
    }

    #[test]
    fn aggro_selection_uses_each_monsters_own_radius() {
        let mut roster = MonsterRoster::new();
        let mut short_sighted = rat();
        short_sighted.aggro_radius = 2.0;
        let near_blind = roster.spawn(short_sighted, Position::new(4.0, 0.0, 0.0), "cave");
        let watchful = roster.spawn(rat(), Position::new(9.0, 0.0, 0.0), "cave");

        let origin = Position::default();
        // The closer monster cannot see that far; the farther one can.
        assert_eq!(roster.nearest_alive_aggro(origin), Some(watchful));
        assert_ne!(roster.nearest_alive_aggro(origin), Some(near_blind));

        roster.get_mut(watchful).unwrap().alive = false;
        assert_eq!(roster.nearest_alive_aggro(origin), None);
    }

    #[test]
    fn nearest_alive_ignores_dead_and_distant_monsters() {
        let mut roster = MonsterRoster::new();
        let near = roster.spawn(rat(), Position::new(5.0, 0.0, 0.0), "cave");
        let far = roster.spawn(rat(), Position::new(100.0, 0.0, 0.0), "cave");
        let dead = roster.spawn(rat(), Position::new(1.0, 0.0, 0.0), "cave");
        roster.get_mut(dead).unwrap().alive = false;

        let origin = Position::default();
        assert_eq!(roster.nearest_alive_within(origin, 50.0), Some(near));
        roster.remove(near);
        assert_eq!(roster.nearest_alive_within(origin, 50.0), None);
        assert_eq!(roster.nearest_alive_within(origin, 200.0), Some(far));
    }
}
