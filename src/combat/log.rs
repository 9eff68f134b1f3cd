use crate::afk::session::AfkSummary;
use crate::entities::character::CharacterId;
use crate::persistence::store::CharacterSave;
use crate::telemetry::logging;
use crate::world::zones::ZoneDirectory;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Player,
    Monster,
}

/// One resolved exchange, shaped for clients. Immutable once built; unset
/// optional fields fall back to explicit defaults so delivery can never
/// block combat resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatLogEntry {
    pub timestamp_ms: u64,
    pub action: String,
    pub actor_id: u32,
    pub actor_type: ActorType,
    pub target_id: u32,
    pub target_type: ActorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
}

impl CombatLogEntry {
    pub fn new(
        timestamp_ms: u64,
        action: &str,
        actor_id: u32,
        actor_type: ActorType,
        target_id: u32,
        target_type: ActorType,
    ) -> Self {
        let action = if action.is_empty() { "unknown" } else { action };
        Self {
            timestamp_ms,
            action: action.to_string(),
            actor_id,
            actor_type,
            target_id,
            target_type,
            value: None,
            skill_id: None,
            zone_id: None,
        }
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_skill(mut self, skill_id: &str) -> Self {
        self.skill_id = Some(skill_id.to_string());
        self
    }

    pub fn with_zone(mut self, zone_id: &str) -> Self {
        self.zone_id = Some(zone_id.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    CombatStart {
        character_id: u32,
        monster_id: u32,
        zone_id: String,
    },
    CombatDamage { entry: CombatLogEntry },
    CombatDeath { entry: CombatLogEntry },
    PlayerPositionUpdate {
        character_id: u32,
        x: f32,
        y: f32,
        z: f32,
    },
    PlayerResurrected { character_id: u32 },
    AfkActivated { character_id: u32 },
    AfkDeactivated { character_id: u32 },
    AfkSummaryUpdate {
        character_id: u32,
        summary: AfkSummary,
    },
    AfkTimeLimitReached { character_id: u32 },
    AfkSummaryClaimed {
        character_id: u32,
        summary: AfkSummary,
    },
    /// Authoritative snapshot pushed after an integrity mismatch.
    CharacterResync {
        character_id: u32,
        snapshot: CharacterSave,
    },
}

/// Delivery boundary toward the transport layer. Fire-and-forget: a slow or
/// failing sink must never stall combat resolution, so errors are logged
/// and dropped.
pub trait EventSink {
    fn deliver(&self, recipient: CharacterId, event: &OutboundEvent) -> Result<(), String>;
}

/// Sink used until a transport is attached.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn deliver(&self, _recipient: CharacterId, _event: &OutboundEvent) -> Result<(), String> {
        Ok(())
    }
}

/// Stateless routing of events to a zone's occupants or a single recipient.
pub struct CombatLogManager;

impl CombatLogManager {
    pub fn broadcast_to_zone(
        directory: &dyn ZoneDirectory,
        sink: &dyn EventSink,
        zone_id: &str,
        event: &OutboundEvent,
    ) {
        for recipient in directory.characters_in_zone(zone_id) {
            if let Err(err) = sink.deliver(recipient, event) {
                logging::log_error(&format!(
                    "event delivery to {} failed: {err}",
                    recipient.0
                ));
            }
        }
    }

    pub fn send_to_one(sink: &dyn EventSink, recipient: CharacterId, event: &OutboundEvent) {
        if let Err(err) = sink.deliver(recipient, event) {
            logging::log_error(&format!(
                "event delivery to {} failed: {err}",
                recipient.0
            ));
        }
    }
}
