use crate::entities::character::{Character, CharacterId};
use crate::world::clock::GameTick;
use crate::world::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const AFK_MAX_DURATION_SECONDS: u64 = 7200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AfkSummary {
    pub monsters_killed: u64,
    pub xp_gained: u64,
    pub gold_gained: i64,
    pub deaths: u32,
    pub total_time_seconds: u64,
}

impl AfkSummary {
    pub fn is_empty(&self) -> bool {
        *self == AfkSummary::default()
    }
}

#[derive(Debug, Clone)]
pub struct AfkSession {
    pub character_id: CharacterId,
    pub server_id: String,
    pub is_active: bool,
    pub started_at: GameTick,
    /// Fixed point combat range is measured from while AFK.
    pub reference_position: Position,
    pub summary: AfkSummary,
    pub max_duration_seconds: u64,
    pub time_limit_reached: bool,
}

impl AfkSession {
    pub fn elapsed_seconds(&self, now: GameTick) -> u64 {
        now.saturating_elapsed_since(self.started_at) / 1000
    }
}

/// Tracks at most one AFK session per character. Rewards are buffered in the
/// session summary and only land on the character at claim time. Deactivation
/// and claiming are independent: a deactivated session keeps its summary
/// until it is claimed.
#[derive(Debug, Default)]
pub struct AfkSessionManager {
    sessions: HashMap<CharacterId, AfkSession>,
    max_duration_seconds: u64,
}

impl AfkSessionManager {
    pub fn new() -> Self {
        Self::with_max_duration(AFK_MAX_DURATION_SECONDS)
    }

    pub fn with_max_duration(max_duration_seconds: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            max_duration_seconds: max_duration_seconds.max(1),
        }
    }

    /// Start a session. Returns false (no-op) if one is already active.
    pub fn activate(
        &mut self,
        character_id: CharacterId,
        server_id: &str,
        reference_position: Position,
        now: GameTick,
    ) -> bool {
        if self
            .sessions
            .get(&character_id)
            .map_or(false, |session| session.is_active)
        {
            return false;
        }
        self.sessions.insert(
            character_id,
            AfkSession {
                character_id,
                server_id: server_id.to_string(),
                is_active: true,
                started_at: now,
                reference_position,
                summary: AfkSummary::default(),
                max_duration_seconds: self.max_duration_seconds,
                time_limit_reached: false,
            },
        );
        true
    }

    pub fn session(&self, character_id: CharacterId) -> Option<&AfkSession> {
        self.sessions.get(&character_id)
    }

    pub fn active_ids(&self) -> Vec<CharacterId> {
        self.sessions
            .iter()
            .filter(|(_, session)| session.is_active)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn is_active(&self, character_id: CharacterId) -> bool {
        self.sessions
            .get(&character_id)
            .map_or(false, |session| session.is_active)
    }

    /// Refresh elapsed time and the cap flag. Returns true exactly once,
    /// on the tick the session crosses its duration limit.
    pub fn update_time(&mut self, character_id: CharacterId, now: GameTick) -> bool {
        let Some(session) = self.sessions.get_mut(&character_id) else {
            return false;
        };
        if !session.is_active {
            return false;
        }
        let elapsed = session.elapsed_seconds(now);
        session.summary.total_time_seconds = elapsed.min(session.max_duration_seconds);
        if !session.time_limit_reached && elapsed >= session.max_duration_seconds {
            session.time_limit_reached = true;
            return true;
        }
        false
    }

    /// Buffer a monster kill. Returns false when the session is missing,
    /// inactive, or capped; no rewards accrue in those cases.
    pub fn record_kill(
        &mut self,
        character_id: CharacterId,
        now: GameTick,
        xp: u64,
        gold: i64,
    ) -> bool {
        let Some(session) = self.sessions.get_mut(&character_id) else {
            return false;
        };
        if !session.is_active || session.time_limit_reached {
            return false;
        }
        if session.elapsed_seconds(now) >= session.max_duration_seconds {
            session.time_limit_reached = true;
            return false;
        }
        session.summary.monsters_killed += 1;
        session.summary.xp_gained = session.summary.xp_gained.saturating_add(xp);
        session.summary.gold_gained = session.summary.gold_gained.saturating_add(gold);
        true
    }

    pub fn record_death(&mut self, character_id: CharacterId) {
        if let Some(session) = self.sessions.get_mut(&character_id) {
            if session.is_active {
                session.summary.deaths += 1;
            }
        }
    }

    /// Atomically read-and-zero the summary, applying the buffered rewards
    /// to the character. Claiming with no session (or an already claimed
    /// one) returns the zero summary instead of erroring.
    pub fn claim(&mut self, character: &mut Character) -> AfkSummary {
        let Some(session) = self.sessions.remove(&character.id) else {
            return AfkSummary::default();
        };
        let summary = session.summary;
        character.add_experience(summary.xp_gained);
        character.add_gold(summary.gold_gained);
        character.monsters_killed = character
            .monsters_killed
            .saturating_add(summary.monsters_killed);
        summary
    }

    pub fn summary(&self, character_id: CharacterId) -> AfkSummary {
        self.sessions
            .get(&character_id)
            .map(|session| session.summary)
            .unwrap_or_default()
    }

    /// Stop accruing without touching the summary; the summary stays
    /// claimable until claim() runs.
    pub fn deactivate(&mut self, character_id: CharacterId, now: GameTick) -> bool {
        let Some(session) = self.sessions.get_mut(&character_id) else {
            return false;
        };
        if !session.is_active {
            return false;
        }
        let elapsed = session.elapsed_seconds(now);
        session.summary.total_time_seconds = elapsed.min(session.max_duration_seconds);
        session.is_active = false;
        true
    }
}
