use crate::combat::log::{ActorType, CombatLogEntry, OutboundEvent};
use crate::combat::resolver::{self, OutcomeKind, SkillSpec};
use crate::combat::rng::CombatRng;
use crate::entities::character::{Character, CharacterId, CombatState};
use crate::world::clock::GameTick;
use crate::world::monsters::{Monster, MonsterId, MonsterRoster};
use crate::world::position::Position;
use crate::world::scheduler::{EntityId, TimerKey, TimerKind, TimerQueue};

/// Active skills usable through queue-skill. Unknown ids are ignored.
pub const SKILLS: &[SkillSpec] = &[
    SkillSpec {
        id: "power_strike",
        spell: false,
        cooldown_ms: 6000,
    },
    SkillSpec {
        id: "firebolt",
        spell: true,
        cooldown_ms: 8000,
    },
];

pub fn skill_by_id(id: &str) -> Option<&'static SkillSpec> {
    SKILLS.iter().find(|spec| spec.id == id)
}

/// Online characters walk to their target; AFK characters stay put and only
/// fight what comes within a fixed radius of the parked reference position.
/// Everything else about resolution is identical between the modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatMode {
    Online,
    Afk,
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Online-mode leash; combat drops once the target strays past this.
    pub aggro_radius: f32,
    pub melee_range: f32,
    /// Radius around the AFK reference position a target must be inside.
    pub afk_combat_radius: f32,
    /// Units moved toward the target per engage step (online mode).
    pub engage_step: f32,
    /// Stationary time before auto-engaging a nearby hostile.
    pub dwell_ms: u64,
    pub gcd_ms: u64,
    pub resurrect_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            aggro_radius: 15.0,
            melee_range: 2.0,
            afk_combat_radius: 40.0,
            engage_step: 4.0,
            dwell_ms: 1000,
            gcd_ms: 1500,
            resurrect_ms: 30_000,
        }
    }
}

/// Where an emitted event should go; the world flushes these through the
/// log manager after each serialized step.
#[derive(Debug, Clone, PartialEq)]
pub enum Audience {
    Zone(String),
    One(CharacterId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonsterKill {
    pub monster_id: MonsterId,
    pub xp: u64,
    pub gold: i64,
}

pub struct CombatEngine {
    pub config: EngineConfig,
}

impl CombatEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn character_key(id: CharacterId, kind: TimerKind) -> TimerKey {
        TimerKey::new(EntityId::Character(id), kind)
    }

    fn monster_key(id: MonsterId, kind: TimerKind) -> TimerKey {
        TimerKey::new(EntityId::Monster(id), kind)
    }

    /// Drive one engage/maintain step for a character. Attack cadence is
    /// timer-driven elsewhere; this handles target acquisition, the engage
    /// approach and disengage checks.
    pub fn tick_character(
        &self,
        ch: &mut Character,
        mode: CombatMode,
        afk_reference: Option<Position>,
        monsters: &mut MonsterRoster,
        now: GameTick,
        timers: &mut TimerQueue,
        events: &mut Vec<(Audience, OutboundEvent)>,
    ) {
        ch.session.expire_buffs(now);
        let anchor = match mode {
            CombatMode::Online => ch.position,
            CombatMode::Afk => afk_reference.unwrap_or(ch.position),
        };

        match ch.session.state {
            CombatState::Idle => {
                if ch.session.target.is_none() {
                    // Explicit targeting skips the dwell; passive detection
                    // requires the character to have been stationary.
                    let dwell_since = *ch.session.dwell_since.get_or_insert(now);
                    if now.saturating_elapsed_since(dwell_since) < self.config.dwell_ms {
                        return;
                    }
                    ch.session.target = match mode {
                        // Each monster decides how far it notices intruders.
                        CombatMode::Online => monsters.nearest_alive_aggro(anchor),
                        CombatMode::Afk => monsters
                            .nearest_alive_within(anchor, self.config.afk_combat_radius),
                    };
                }
                if ch.session.target.is_some() {
                    ch.session.state = CombatState::Engaging;
                    ch.session.dwell_since = None;
                }
            }
            CombatState::Engaging => {
                let Some(target_id) = ch.session.target else {
                    ch.session.clear_target();
                    return;
                };
                let Some(monster) = monsters.get(target_id) else {
                    ch.session.clear_target();
                    return;
                };
                if !monster.alive {
                    ch.session.clear_target();
                    return;
                }
                match mode {
                    CombatMode::Online => {
                        if !ch.position.within(monster.position, self.config.melee_range) {
                            ch.position = ch
                                .position
                                .step_toward(monster.position, self.config.engage_step);
                            events.push((
                                Audience::Zone(ch.zone_id.clone()),
                                OutboundEvent::PlayerPositionUpdate {
                                    character_id: ch.id.0,
                                    x: ch.position.x,
                                    y: ch.position.y,
                                    z: ch.position.z,
                                },
                            ));
                        }
                        if ch.position.within(monster.position, self.config.melee_range) {
                            self.enter_combat(ch, target_id, monsters, now, timers, events);
                        }
                    }
                    CombatMode::Afk => {
                        // No movement while AFK: the target must already be
                        // inside the combat radius or it is ignored.
                        if monster.position.within(anchor, self.config.afk_combat_radius) {
                            self.enter_combat(ch, target_id, monsters, now, timers, events);
                        } else {
                            ch.session.clear_target();
                        }
                    }
                }
            }
            CombatState::InCombat => {
                let valid = ch
                    .session
                    .target
                    .and_then(|id| monsters.get(id))
                    .map_or(false, |monster| {
                        monster.alive
                            && match mode {
                                CombatMode::Online => monster
                                    .position
                                    .within(ch.position, self.config.aggro_radius),
                                CombatMode::Afk => monster
                                    .position
                                    .within(anchor, self.config.afk_combat_radius),
                            }
                    });
                if !valid {
                    self.disengage(ch, monsters, timers);
                }
            }
            CombatState::Dead | CombatState::Resurrecting => {}
        }
    }

    fn enter_combat(
        &self,
        ch: &mut Character,
        target_id: MonsterId,
        monsters: &mut MonsterRoster,
        now: GameTick,
        timers: &mut TimerQueue,
        events: &mut Vec<(Audience, OutboundEvent)>,
    ) {
        let Some(monster) = monsters.get_mut(target_id) else {
            ch.session.clear_target();
            return;
        };
        ch.session.state = CombatState::InCombat;
        ch.session.in_combat = true;
        monster.target = Some(ch.id);
        timers.schedule_in(
            Self::character_key(ch.id, TimerKind::AutoAttack),
            now,
            ch.stats.attack_period_ms(),
        );
        timers.schedule_in(
            Self::monster_key(target_id, TimerKind::AutoAttack),
            now,
            monster.template.attack_period_ms(),
        );
        events.push((
            Audience::Zone(ch.zone_id.clone()),
            OutboundEvent::CombatStart {
                character_id: ch.id.0,
                monster_id: target_id.0,
                zone_id: ch.zone_id.clone(),
            },
        ));
    }

    /// Leave combat without anyone dying: target lost, out of range or
    /// explicitly cleared.
    pub fn disengage(&self, ch: &mut Character, monsters: &mut MonsterRoster, timers: &mut TimerQueue) {
        if let Some(target_id) = ch.session.target {
            timers.cancel(Self::monster_key(target_id, TimerKind::AutoAttack));
            if let Some(monster) = monsters.get_mut(target_id) {
                if monster.target == Some(ch.id) {
                    monster.target = None;
                }
            }
        }
        timers.cancel(Self::character_key(ch.id, TimerKind::AutoAttack));
        ch.session.clear_target();
    }

    /// The character's auto-attack (or skill) timer fired. Returns the kill
    /// when the swing was lethal so the caller can route the rewards.
    pub fn fire_player_attack(
        &self,
        ch: &mut Character,
        monsters: &mut MonsterRoster,
        skill: Option<&SkillSpec>,
        now: GameTick,
        timers: &mut TimerQueue,
        rng: &mut CombatRng,
        events: &mut Vec<(Audience, OutboundEvent)>,
    ) -> Option<MonsterKill> {
        if ch.session.state != CombatState::InCombat {
            return None;
        }
        let target_id = ch.session.target?;
        let Some(monster) = monsters.get_mut(target_id) else {
            self.disengage(ch, monsters, timers);
            return None;
        };
        if !monster.alive {
            self.disengage(ch, monsters, timers);
            return None;
        }

        let outcome = resolver::resolve(&ch.stats, &monster.stats, skill, rng);
        monster.stats.apply_damage(outcome.damage);

        let action = match outcome.kind {
            OutcomeKind::Hit => "damage",
            OutcomeKind::Crit => "critical_damage",
            OutcomeKind::Miss => "miss",
        };
        let mut entry = CombatLogEntry::new(
            now.0,
            action,
            ch.id.0,
            ActorType::Player,
            target_id.0,
            ActorType::Monster,
        )
        .with_value(i64::from(outcome.damage))
        .with_zone(&ch.zone_id);
        if let Some(spec) = skill {
            entry = entry.with_skill(spec.id);
        }
        events.push((
            Audience::Zone(ch.zone_id.clone()),
            OutboundEvent::CombatDamage { entry },
        ));

        if monster.stats.hp == 0 {
            let kill = MonsterKill {
                monster_id: target_id,
                xp: monster.template.xp_reward,
                gold: monster.template.gold_reward,
            };
            let respawn_ms = monster.template.respawn_seconds.saturating_mul(1000);
            monster.alive = false;
            monster.target = None;
            events.push((
                Audience::Zone(ch.zone_id.clone()),
                OutboundEvent::CombatDeath {
                    entry: CombatLogEntry::new(
                        now.0,
                        "entity_death",
                        ch.id.0,
                        ActorType::Player,
                        target_id.0,
                        ActorType::Monster,
                    )
                    .with_zone(&ch.zone_id),
                },
            ));
            timers.cancel(Self::monster_key(target_id, TimerKind::AutoAttack));
            timers.schedule_in(
                Self::monster_key(target_id, TimerKind::Respawn),
                now,
                respawn_ms,
            );
            timers.cancel(Self::character_key(ch.id, TimerKind::AutoAttack));
            ch.session.clear_target();
            return Some(kill);
        }

        if skill.is_none() {
            timers.schedule_in(
                Self::character_key(ch.id, TimerKind::AutoAttack),
                now,
                ch.stats.attack_period_ms(),
            );
        }
        None
    }

    /// The monster's auto-attack timer fired. Returns true when the
    /// character died; the caller bumps the responsible session's death
    /// counter and, once the resurrect timer fires, brings the character
    /// back.
    pub fn fire_monster_attack(
        &self,
        monster: &mut Monster,
        ch: &mut Character,
        now: GameTick,
        timers: &mut TimerQueue,
        rng: &mut CombatRng,
        events: &mut Vec<(Audience, OutboundEvent)>,
    ) -> bool {
        if !monster.alive || monster.target != Some(ch.id) {
            return false;
        }
        if ch.session.state != CombatState::InCombat {
            timers.cancel(Self::monster_key(monster.id, TimerKind::AutoAttack));
            return false;
        }

        let outcome = resolver::resolve(&monster.stats, &ch.stats, None, rng);
        ch.stats.apply_damage(outcome.damage);

        let action = match outcome.kind {
            OutcomeKind::Hit => "damage",
            OutcomeKind::Crit => "critical_damage",
            OutcomeKind::Miss => "miss",
        };
        events.push((
            Audience::Zone(ch.zone_id.clone()),
            OutboundEvent::CombatDamage {
                entry: CombatLogEntry::new(
                    now.0,
                    action,
                    monster.id.0,
                    ActorType::Monster,
                    ch.id.0,
                    ActorType::Player,
                )
                .with_value(i64::from(outcome.damage))
                .with_zone(&ch.zone_id),
            },
        ));

        // Below half health the character self-heals from stock; death only
        // proceeds once the stock is exhausted.
        if ch.stats.hp * 2 < ch.stats.max_hp {
            ch.consumables.try_heal(&mut ch.stats);
        }

        if ch.stats.hp == 0 {
            ch.session.state = CombatState::Dead;
            ch.session.in_combat = false;
            ch.session.target = None;
            monster.target = None;
            timers.cancel_entity(EntityId::Character(ch.id));
            timers.cancel(Self::monster_key(monster.id, TimerKind::AutoAttack));
            timers.schedule_in(
                Self::character_key(ch.id, TimerKind::Resurrect),
                now,
                self.config.resurrect_ms,
            );
            events.push((
                Audience::Zone(ch.zone_id.clone()),
                OutboundEvent::CombatDeath {
                    entry: CombatLogEntry::new(
                        now.0,
                        "entity_death",
                        monster.id.0,
                        ActorType::Monster,
                        ch.id.0,
                        ActorType::Player,
                    )
                    .with_zone(&ch.zone_id),
                },
            ));
            return true;
        }

        timers.schedule_in(
            Self::monster_key(monster.id, TimerKind::AutoAttack),
            now,
            monster.template.attack_period_ms(),
        );
        false
    }

    /// Resurrect timer fired: full restore, back to Idle.
    pub fn resurrect(
        &self,
        ch: &mut Character,
        now: GameTick,
        events: &mut Vec<(Audience, OutboundEvent)>,
    ) {
        if ch.session.state != CombatState::Dead {
            return;
        }
        ch.session.state = CombatState::Resurrecting;
        ch.stats.restore_to_max();
        ch.session.state = CombatState::Idle;
        ch.session.dwell_since = Some(now);
        events.push((
            Audience::Zone(ch.zone_id.clone()),
            OutboundEvent::PlayerResurrected { character_id: ch.id.0 },
        ));
    }

    /// Use an active skill. Gated by the global cooldown and the skill's own
    /// cooldown; both are no-op rejections, not errors.
    pub fn queue_skill(
        &self,
        ch: &mut Character,
        monsters: &mut MonsterRoster,
        skill_id: &str,
        now: GameTick,
        timers: &mut TimerQueue,
        rng: &mut CombatRng,
        events: &mut Vec<(Audience, OutboundEvent)>,
    ) -> Option<MonsterKill> {
        let spec = skill_by_id(skill_id)?;
        if ch.session.state != CombatState::InCombat {
            return None;
        }
        if !ch.session.gcd_ready(now) || !ch.session.cooldown_ready(spec.id, now) {
            return None;
        }
        ch.session.gcd_ready_at = now.saturating_add_ms(self.config.gcd_ms);
        // Cancellable handle for the gcd window; disconnect sweeps it up
        // with the rest of the entity's timers.
        timers.schedule_in(
            Self::character_key(ch.id, TimerKind::GlobalCooldown),
            now,
            self.config.gcd_ms,
        );
        ch.session
            .cooldowns
            .insert(spec.id.to_string(), now.saturating_add_ms(spec.cooldown_ms));
        self.fire_player_attack(ch, monsters, Some(spec), now, timers, rng, events)
    }
}
