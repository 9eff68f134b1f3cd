use crate::afk::session::{AfkSessionManager, AFK_MAX_DURATION_SECONDS};
use crate::combat::engine::{Audience, CombatEngine, CombatMode, EngineConfig, MonsterKill};
use crate::combat::log::{CombatLogManager, EventSink, NullSink, OutboundEvent};
use crate::combat::rng::CombatRng;
use crate::entities::character::{Character, CharacterId, CombatState};
use crate::persistence::store::{CharacterDelta, CharacterSave, SaveStore};
use crate::security::envelope::{Action, SignedEnvelope};
use crate::security::integrity::IntegrityHasher;
use crate::security::nonce::DEFAULT_NONCE_CAPACITY;
use crate::security::verifier::SignatureVerifier;
use crate::telemetry::logging;
use crate::world::clock::{GameClock, GameTick};
use crate::world::monsters::{MonsterId, MonsterRoster, MonsterTemplate};
use crate::world::position::Position;
use crate::world::scheduler::{EntityId, TimerKind, TimerQueue};
use crate::world::zones::ZoneMap;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct WorldConfig {
    pub server_id: String,
    pub secret: String,
    pub nonce_capacity: usize,
    pub afk_max_duration_seconds: u64,
    pub tick_ms: u64,
    pub rng_seed: u64,
    pub engine: EngineConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            server_id: "world-1".to_string(),
            secret: String::new(),
            nonce_capacity: DEFAULT_NONCE_CAPACITY,
            afk_max_duration_seconds: AFK_MAX_DURATION_SECONDS,
            tick_ms: 250,
            rng_seed: 0,
            engine: EngineConfig::default(),
        }
    }
}

/// Single logical authority over one world instance. Every mutation of
/// character or monster combat state funnels through here, so independent
/// attack timers never race; callers wrap the whole state in a mutex when
/// sharing it across threads.
pub struct WorldState {
    server_id: String,
    tick_ms: u64,
    clock: GameClock,
    characters: HashMap<CharacterId, Character>,
    monsters: MonsterRoster,
    timers: TimerQueue,
    rng: CombatRng,
    engine: CombatEngine,
    afk: AfkSessionManager,
    zones: ZoneMap,
    verifier: SignatureVerifier,
    sink: Box<dyn EventSink + Send>,
    store: Option<SaveStore>,
    pending: Vec<(Audience, OutboundEvent)>,
}

impl WorldState {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            server_id: config.server_id,
            tick_ms: config.tick_ms.max(1),
            clock: GameClock::new(),
            characters: HashMap::new(),
            monsters: MonsterRoster::new(),
            timers: TimerQueue::new(),
            rng: CombatRng::from_seed(config.rng_seed),
            engine: CombatEngine::new(config.engine),
            afk: AfkSessionManager::with_max_duration(config.afk_max_duration_seconds),
            zones: ZoneMap::new(),
            verifier: SignatureVerifier::new(config.secret, config.nonce_capacity),
            sink: Box::new(NullSink),
            store: None,
            pending: Vec::new(),
        }
    }

    pub fn set_sink(&mut self, sink: Box<dyn EventSink + Send>) {
        self.sink = sink;
    }

    pub fn set_store(&mut self, store: SaveStore) {
        self.store = Some(store);
    }

    pub fn now(&self) -> GameTick {
        self.clock.now()
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    pub fn afk(&self) -> &AfkSessionManager {
        &self.afk
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn monster(&self, id: MonsterId) -> Option<&crate::world::monsters::Monster> {
        self.monsters.get(id)
    }

    pub fn add_character(&mut self, character: Character) {
        self.zones.insert(&character.zone_id, character.id);
        self.characters.insert(character.id, character);
    }

    /// Disconnect: drop the character and every timer it still owns. An
    /// AFK session survives disconnection; its summary stays claimable.
    pub fn remove_character(&mut self, id: CharacterId) -> Option<Character> {
        self.timers.cancel_entity(EntityId::Character(id));
        self.zones.remove(id);
        let removed = self.characters.remove(&id);
        if let Some(character) = &removed {
            if let Some(store) = &self.store {
                if let Err(err) = store.save_character(character) {
                    logging::log_error(&format!(
                        "save on disconnect for character {} failed: {err}",
                        id.0
                    ));
                }
            }
        }
        removed
    }

    pub fn spawn_monster(
        &mut self,
        template: MonsterTemplate,
        position: Position,
        zone_id: &str,
    ) -> MonsterId {
        self.monsters.spawn(template, position, zone_id)
    }

    /// Entry point for transport-delivered envelopes. `epoch_ms` is the
    /// wall-clock time used for the freshness window. Returns false when
    /// the envelope was dropped at the boundary.
    pub fn handle_envelope(
        &mut self,
        actor: CharacterId,
        envelope: &SignedEnvelope,
        epoch_ms: u64,
    ) -> bool {
        let actor_name = format!("character {}", actor.0);
        if !self.verifier.verify(&actor_name, envelope, epoch_ms) {
            return false;
        }
        let Some(data) = envelope.data.as_ref() else {
            return false;
        };
        let action = match Action::from_value(data) {
            Ok(action) => action,
            Err(err) => {
                logging::log_security(&format!("{actor_name}: {err}"));
                return false;
            }
        };
        self.dispatch_action(actor, action);
        self.flush_events();
        true
    }

    fn dispatch_action(&mut self, actor: CharacterId, action: Action) {
        let now = self.clock.now();
        match action {
            Action::Move { x, y, z } => {
                if self.afk.is_active(actor) {
                    // Parked characters do not move; ignore.
                    return;
                }
                let Some(ch) = self.characters.get_mut(&actor) else {
                    return;
                };
                if matches!(ch.session.state, CombatState::Dead | CombatState::Resurrecting) {
                    return;
                }
                ch.position = Position::new(x, y, z);
                ch.session.dwell_since = None;
                self.pending.push((
                    Audience::Zone(ch.zone_id.clone()),
                    OutboundEvent::PlayerPositionUpdate {
                        character_id: actor.0,
                        x,
                        y,
                        z,
                    },
                ));
            }
            Action::ActivateAfk => {
                let Some(ch) = self.characters.get(&actor) else {
                    return;
                };
                let reference = ch.position;
                if self.afk.activate(actor, &self.server_id, reference, now) {
                    logging::log_afk(&format!("character {} activated afk", actor.0));
                    self.pending.push((
                        Audience::One(actor),
                        OutboundEvent::AfkActivated { character_id: actor.0 },
                    ));
                }
            }
            Action::DeactivateAfk => {
                if self.afk.deactivate(actor, now) {
                    if let Some(ch) = self.characters.get_mut(&actor) {
                        self.engine.disengage(ch, &mut self.monsters, &mut self.timers);
                    }
                    logging::log_afk(&format!("character {} deactivated afk", actor.0));
                    self.pending.push((
                        Audience::One(actor),
                        OutboundEvent::AfkDeactivated { character_id: actor.0 },
                    ));
                }
            }
            Action::ClaimAfkSummary => {
                let Some(ch) = self.characters.get_mut(&actor) else {
                    return;
                };
                let summary = self.afk.claim(ch);
                if let Some(store) = &self.store {
                    store.save_delta_best_effort(
                        actor,
                        &CharacterDelta {
                            level: Some(ch.level),
                            experience: Some(ch.experience),
                            gold: Some(ch.gold()),
                            monsters_killed: Some(ch.monsters_killed),
                            ..Default::default()
                        },
                    );
                }
                logging::log_afk(&format!(
                    "character {} claimed afk summary: kills={} xp={} gold={}",
                    actor.0, summary.monsters_killed, summary.xp_gained, summary.gold_gained
                ));
                self.pending.push((
                    Audience::One(actor),
                    OutboundEvent::AfkSummaryClaimed {
                        character_id: actor.0,
                        summary,
                    },
                ));
            }
            Action::GetAfkSummary => {
                let summary = self.afk.summary(actor);
                self.pending.push((
                    Audience::One(actor),
                    OutboundEvent::AfkSummaryUpdate {
                        character_id: actor.0,
                        summary,
                    },
                ));
            }
            Action::VerifyIntegrity { digest } => {
                self.verify_integrity(actor, &digest);
            }
            Action::QueueSkill { skill_id } => {
                let Some(ch) = self.characters.get_mut(&actor) else {
                    return;
                };
                let kill = self.engine.queue_skill(
                    ch,
                    &mut self.monsters,
                    &skill_id,
                    now,
                    &mut self.timers,
                    &mut self.rng,
                    &mut self.pending,
                );
                if let Some(kill) = kill {
                    self.apply_kill(actor, kill, now);
                }
            }
        }
    }

    /// Compare a client-reported digest against the authoritative copy.
    /// A mismatch is never an error toward the client: it is logged for
    /// audit and answered with a full resync snapshot.
    pub fn verify_integrity(&mut self, actor: CharacterId, claimed: &str) -> bool {
        let Some(ch) = self.characters.get(&actor) else {
            return false;
        };
        if IntegrityHasher::verify(ch, claimed) {
            return true;
        }
        logging::log_security(&format!(
            "integrity mismatch for character {}, pushing resync",
            actor.0
        ));
        self.pending.push((
            Audience::One(actor),
            OutboundEvent::CharacterResync {
                character_id: actor.0,
                snapshot: CharacterSave::from_character(ch),
            },
        ));
        self.flush_events();
        false
    }

    /// Advance the world one tick: fire due timers, run engage/maintain
    /// steps, refresh AFK sessions, then flush events to the sink.
    pub fn tick(&mut self) {
        let now = self.clock.advance_ms(self.tick_ms);
        self.fire_due_timers(now);
        self.run_character_steps(now);
        self.refresh_afk_sessions(now);
        self.flush_events();
    }

    /// Advance by `ms` of simulated time in whole ticks.
    pub fn advance(&mut self, ms: u64) {
        let mut remaining = ms;
        while remaining >= self.tick_ms {
            self.tick();
            remaining -= self.tick_ms;
        }
    }

    fn fire_due_timers(&mut self, now: GameTick) {
        while let Some(key) = self.timers.pop_ready(now) {
            match (key.entity, key.kind) {
                (EntityId::Character(id), TimerKind::AutoAttack) => {
                    let Some(ch) = self.characters.get_mut(&id) else {
                        continue;
                    };
                    let kill = self.engine.fire_player_attack(
                        ch,
                        &mut self.monsters,
                        None,
                        now,
                        &mut self.timers,
                        &mut self.rng,
                        &mut self.pending,
                    );
                    if let Some(kill) = kill {
                        self.apply_kill(id, kill, now);
                    }
                }
                (EntityId::Character(id), TimerKind::Resurrect) => {
                    if let Some(ch) = self.characters.get_mut(&id) {
                        self.engine.resurrect(ch, now, &mut self.pending);
                    }
                }
                (EntityId::Character(_), TimerKind::GlobalCooldown) => {
                    // Expiry is tracked on the session; the timer exists so
                    // disconnect cancellation sweeps it.
                }
                (EntityId::Monster(id), TimerKind::AutoAttack) => {
                    let Some(monster) = self.monsters.get_mut(id) else {
                        continue;
                    };
                    let Some(target) = monster.target else {
                        continue;
                    };
                    let Some(ch) = self.characters.get_mut(&target) else {
                        monster.target = None;
                        continue;
                    };
                    let died = self.engine.fire_monster_attack(
                        monster,
                        ch,
                        now,
                        &mut self.timers,
                        &mut self.rng,
                        &mut self.pending,
                    );
                    if died {
                        self.afk.record_death(target);
                    }
                }
                (EntityId::Monster(id), TimerKind::Respawn) => {
                    if let Some(monster) = self.monsters.get_mut(id) {
                        monster.reset();
                    }
                }
                (EntityId::Monster(_), TimerKind::GlobalCooldown | TimerKind::Resurrect)
                | (EntityId::Character(_), TimerKind::Respawn) => {}
            }
        }
    }

    fn run_character_steps(&mut self, now: GameTick) {
        let ids: Vec<CharacterId> = self.characters.keys().copied().collect();
        for id in ids {
            let (mode, reference) = match self.afk.session(id) {
                Some(session) if session.is_active => {
                    (CombatMode::Afk, Some(session.reference_position))
                }
                _ => (CombatMode::Online, None),
            };
            let Some(ch) = self.characters.get_mut(&id) else {
                continue;
            };
            self.engine.tick_character(
                ch,
                mode,
                reference,
                &mut self.monsters,
                now,
                &mut self.timers,
                &mut self.pending,
            );
        }
    }

    fn refresh_afk_sessions(&mut self, now: GameTick) {
        for id in self.afk.active_ids() {
            if self.afk.update_time(id, now) {
                logging::log_afk(&format!("character {} reached the afk time limit", id.0));
                self.pending.push((
                    Audience::One(id),
                    OutboundEvent::AfkTimeLimitReached { character_id: id.0 },
                ));
            }
        }
    }

    fn apply_kill(&mut self, actor: CharacterId, kill: MonsterKill, now: GameTick) {
        if self.afk.is_active(actor) {
            // AFK rewards are buffered until claim.
            if self.afk.record_kill(actor, now, kill.xp, kill.gold) {
                self.pending.push((
                    Audience::One(actor),
                    OutboundEvent::AfkSummaryUpdate {
                        character_id: actor.0,
                        summary: self.afk.summary(actor),
                    },
                ));
            }
            return;
        }
        let Some(ch) = self.characters.get_mut(&actor) else {
            return;
        };
        ch.add_experience(kill.xp);
        ch.add_gold(kill.gold);
        ch.monsters_killed = ch.monsters_killed.saturating_add(1);
        if let Some(store) = &self.store {
            store.save_delta_best_effort(
                actor,
                &CharacterDelta {
                    level: Some(ch.level),
                    experience: Some(ch.experience),
                    gold: Some(ch.gold()),
                    monsters_killed: Some(ch.monsters_killed),
                    ..Default::default()
                },
            );
        }
    }

    fn flush_events(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.pending);
        for (audience, event) in events {
            match audience {
                Audience::Zone(zone_id) => CombatLogManager::broadcast_to_zone(
                    &self.zones,
                    self.sink.as_ref(),
                    &zone_id,
                    &event,
                ),
                Audience::One(recipient) => {
                    CombatLogManager::send_to_one(self.sink.as_ref(), recipient, &event)
                }
            }
        }
    }

    /// Periodic full save of every connected character; errors are logged
    /// per character, never fatal.
    pub fn save_all(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        let mut saved = 0;
        for character in self.characters.values() {
            match store.save_character(character) {
                Ok(()) => saved += 1,
                Err(err) => logging::log_error(&format!(
                    "autosave for character {} failed: {err}",
                    character.id.0
                )),
            }
        }
        saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::consumables::ConsumableStock;
    use crate::combat::stats::CombatantStats;
    use crate::entities::character::{xp_for_level, CombatSession};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    const EPOCH: u64 = 1_700_000_000_000;

    #[derive(Default)]
    struct SharedSink {
        events: Arc<Mutex<Vec<(CharacterId, OutboundEvent)>>>,
    }

    impl EventSink for SharedSink {
        fn deliver(&self, recipient: CharacterId, event: &OutboundEvent) -> Result<(), String> {
            if let Ok(mut events) = self.events.lock() {
                events.push((recipient, event.clone()));
            }
            Ok(())
        }
    }

    fn world() -> (WorldState, Arc<Mutex<Vec<(CharacterId, OutboundEvent)>>>) {
        let mut world = WorldState::new(WorldConfig {
            secret: "test-secret".to_string(),
            rng_seed: 99,
            ..Default::default()
        });
        let events = Arc::new(Mutex::new(Vec::new()));
        world.set_sink(Box::new(SharedSink {
            events: Arc::clone(&events),
        }));
        (world, events)
    }

    fn character(id: u32, position: Position) -> Character {
        Character {
            id: CharacterId(id),
            name: format!("hero-{id}"),
            level: 1,
            experience: 0,
            xp_to_level: xp_for_level(1),
            stats: CombatantStats {
                attack_power: 25,
                critical_chance: 0.0,
                dodge_chance: 0.0,
                ..Default::default()
            },
            currencies: BTreeMap::new(),
            talents: BTreeMap::new(),
            consumables: ConsumableStock::default(),
            position,
            zone_id: "meadow".to_string(),
            monsters_killed: 0,
            session: CombatSession::new(),
        }
    }

    fn brute() -> MonsterTemplate {
        MonsterTemplate {
            name: "Brute".to_string(),
            max_hp: 10_000,
            attack_power: 150,
            armor: 0,
            speed: 100,
            xp_reward: 100,
            gold_reward: 25,
            aggro_radius: 12.0,
            respawn_seconds: 60,
        }
    }

    fn signed(world: &WorldState, data: serde_json::Value, nonce: &str) -> SignedEnvelope {
        let signature = world.verifier().sign(&data, EPOCH, nonce);
        SignedEnvelope {
            data: Some(data),
            timestamp: Some(EPOCH),
            nonce: Some(nonce.to_string()),
            signature: Some(signature),
        }
    }

    #[test]
    fn overkill_hit_kills_then_resurrects_at_full_health() {
        let (mut world, events) = world();
        world.add_character(character(1, Position::new(0.0, 0.0, 0.0)));
        world.spawn_monster(brute(), Position::new(1.0, 0.0, 0.0), "meadow");

        // Dwell, engage, and eat the brute's first 150-damage swing.
        world.advance(5000);
        {
            let ch = world.character(CharacterId(1)).unwrap();
            assert_eq!(ch.session.state, CombatState::Dead);
            assert_eq!(ch.stats.hp, 0);
        }
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|(_, e)| matches!(e, OutboundEvent::CombatDeath { .. })));

        // Death at t=4000; the fixed 30s resurrection timer lands on the
        // t=34000 tick, before the character has had time to re-engage.
        world.advance(29_000);
        let ch = world.character(CharacterId(1)).unwrap();
        assert_eq!(ch.session.state, CombatState::Idle);
        assert_eq!(ch.stats.hp, ch.stats.max_hp);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|(_, e)| matches!(e, OutboundEvent::PlayerResurrected { .. })));
    }

    #[test]
    fn duplicate_nonce_is_rejected_regardless_of_payload() {
        let (mut world, _) = world();
        world.add_character(character(1, Position::new(0.0, 0.0, 0.0)));

        let first = signed(&world, json!({"type": "activate-afk"}), "nonce-1");
        assert!(world.handle_envelope(CharacterId(1), &first, EPOCH));

        // Different, validly signed payload under the same nonce.
        let second = signed(&world, json!({"type": "deactivate-afk"}), "nonce-1");
        assert!(!world.handle_envelope(CharacterId(1), &second, EPOCH));
        // The first action stuck: the session is still active.
        assert!(world.afk().is_active(CharacterId(1)));
    }

    #[test]
    fn tampered_envelope_never_reaches_dispatch() {
        let (mut world, _) = world();
        world.add_character(character(1, Position::new(0.0, 0.0, 0.0)));
        let mut envelope = signed(&world, json!({"type": "activate-afk"}), "nonce-t");
        envelope.data = Some(json!({"type": "claim-afk-summary"}));
        assert!(!world.handle_envelope(CharacterId(1), &envelope, EPOCH));
        assert!(!world.afk().is_active(CharacterId(1)));
    }

    #[test]
    fn afk_kills_buffer_into_the_summary_and_claim_applies_them() {
        let (mut world, events) = world();
        let mut ch = character(1, Position::new(100.0, 0.0, 100.0));
        ch.stats.attack_power = 500;
        world.add_character(ch);
        // Weak monster inside the AFK radius.
        world.spawn_monster(
            MonsterTemplate {
                max_hp: 40,
                attack_power: 1,
                respawn_seconds: 2,
                ..brute()
            },
            Position::new(110.0, 0.0, 100.0),
            "meadow",
        );

        let activate = signed(&world, json!({"type": "activate-afk"}), "n-activate");
        assert!(world.handle_envelope(CharacterId(1), &activate, EPOCH));

        world.advance(60_000);

        let summary = world.afk().summary(CharacterId(1));
        assert!(summary.monsters_killed >= 2, "kept killing the respawning monster");
        // Rewards are buffered, not applied.
        let ch = world.character(CharacterId(1)).unwrap();
        assert_eq!(ch.experience, 0);
        assert_eq!(ch.gold(), 0);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|(_, e)| matches!(e, OutboundEvent::AfkSummaryUpdate { .. })));

        let claim = signed(&world, json!({"type": "claim-afk-summary"}), "n-claim");
        assert!(world.handle_envelope(CharacterId(1), &claim, EPOCH));
        let ch = world.character(CharacterId(1)).unwrap();
        assert_eq!(ch.monsters_killed, summary.monsters_killed);
        assert_eq!(ch.gold(), summary.gold_gained);
        // 100 xp per kill is enough to clear level 1.
        assert!(ch.level >= 2);
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|(_, e)| matches!(e, OutboundEvent::AfkSummaryClaimed { .. })));

        // Second claim is an empty no-op.
        let claim_again = signed(&world, json!({"type": "claim-afk-summary"}), "n-claim-2");
        assert!(world.handle_envelope(CharacterId(1), &claim_again, EPOCH));
        let ch = world.character(CharacterId(1)).unwrap();
        assert_eq!(ch.monsters_killed, summary.monsters_killed);
        assert_eq!(ch.gold(), summary.gold_gained);
    }

    #[test]
    fn afk_combat_ignores_monsters_outside_the_radius() {
        let (mut world, _) = world();
        world.add_character(character(1, Position::new(100.0, 0.0, 100.0)));
        world.spawn_monster(brute(), Position::new(160.0, 0.0, 100.0), "meadow");

        let activate = signed(&world, json!({"type": "activate-afk"}), "n-a");
        assert!(world.handle_envelope(CharacterId(1), &activate, EPOCH));
        world.advance(10_000);

        let ch = world.character(CharacterId(1)).unwrap();
        assert_eq!(ch.session.state, CombatState::Idle);
        assert_eq!(ch.stats.hp, ch.stats.max_hp);
        assert_eq!(world.afk().summary(CharacterId(1)).monsters_killed, 0);
    }

    #[test]
    fn integrity_mismatch_logs_nothing_back_but_forces_a_resync() {
        let (mut world, events) = world();
        world.add_character(character(1, Position::new(0.0, 0.0, 0.0)));

        // A matching digest is acknowledged silently.
        let good = IntegrityHasher::digest(world.character(CharacterId(1)).unwrap());
        assert!(world.verify_integrity(CharacterId(1), &good));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .all(|(_, e)| !matches!(e, OutboundEvent::CharacterResync { .. })));

        // A stale digest arriving over the signed channel gets the full
        // authoritative snapshot back, addressed to the reporter only.
        let envelope = signed(
            &world,
            json!({"type": "verify-integrity", "digest": "deadbeef"}),
            "n-integrity",
        );
        assert!(world.handle_envelope(CharacterId(1), &envelope, EPOCH));
        let events = events.lock().unwrap();
        let resync = events
            .iter()
            .find_map(|(recipient, e)| match e {
                OutboundEvent::CharacterResync {
                    character_id,
                    snapshot,
                } => Some((*recipient, *character_id, snapshot.clone())),
                _ => None,
            })
            .expect("mismatch pushes a resync snapshot");
        assert_eq!(resync.0, CharacterId(1));
        assert_eq!(resync.1, 1);
        assert_eq!(resync.2.level, 1);
        assert_eq!(resync.2.name, "hero-1");
    }

    #[test]
    fn move_action_updates_position_and_broadcasts() {
        let (mut world, events) = world();
        world.add_character(character(1, Position::new(0.0, 0.0, 0.0)));

        let envelope = signed(
            &world,
            json!({"type": "move", "x": 5.0, "y": 0.0, "z": 7.0}),
            "n-move",
        );
        assert!(world.handle_envelope(CharacterId(1), &envelope, EPOCH));
        let ch = world.character(CharacterId(1)).unwrap();
        assert_eq!(ch.position, Position::new(5.0, 0.0, 7.0));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|(_, e)| matches!(e, OutboundEvent::PlayerPositionUpdate { .. })));
    }

    #[test]
    fn disconnect_cancels_every_pending_timer() {
        let (mut world, _) = world();
        world.add_character(character(1, Position::new(0.0, 0.0, 0.0)));
        world.spawn_monster(brute(), Position::new(1.0, 0.0, 0.0), "meadow");
        // Engage and get both attack timers scheduled.
        world.advance(2000);
        assert!(world.timers.len() >= 2);

        world.remove_character(CharacterId(1));
        // Only monster-owned timers may remain.
        assert_eq!(
            world
                .timers
                .cancel_entity(EntityId::Character(CharacterId(1))),
            0
        );
    }
}
