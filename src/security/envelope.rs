use serde::Deserialize;
use serde_json::Value;

/// Signed wrapper around a client-originated action. Fields are optional at
/// the wire level; the verifier rejects envelopes with anything missing.
/// Not retained beyond verification.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedEnvelope {
    #[serde(default)]
    pub data: Option<Value>,
    /// Epoch milliseconds at the client.
    #[serde(default)]
    pub timestamp: Option<u64>,
    /// Single-use random hex token.
    #[serde(default)]
    pub nonce: Option<String>,
    /// Hex-encoded HMAC-SHA256 over canonical data ++ timestamp ++ nonce.
    #[serde(default)]
    pub signature: Option<String>,
}

impl SignedEnvelope {
    pub fn parse(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|err| format!("envelope parse failed: {err}"))
    }
}

/// Canonical serialization of the payload for signing. serde_json orders
/// map keys, so the same payload always signs to the same bytes.
pub fn canonical_json(data: &Value) -> String {
    serde_json::to_string(data).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    Move { x: f32, y: f32, z: f32 },
    ActivateAfk,
    DeactivateAfk,
    ClaimAfkSummary,
    GetAfkSummary,
    QueueSkill {
        #[serde(alias = "skillId")]
        skill_id: String,
    },
    /// Client-reported digest of its local character state, checked against
    /// the authoritative copy.
    VerifyIntegrity {
        #[serde(alias = "hash")]
        digest: String,
    },
}

impl Action {
    /// Decode a verified payload. Unknown or malformed action types are
    /// rejected here, after signature verification has already passed.
    pub fn from_value(data: &Value) -> Result<Action, String> {
        serde_json::from_value(data.clone())
            .map_err(|err| format!("unknown or malformed action: {err}"))
    }
}
