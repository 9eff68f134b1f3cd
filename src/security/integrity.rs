use crate::entities::character::Character;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Version tag baked into the canonical form. Bump it whenever the tracked
/// field set changes, so stale client digests fail loudly instead of
/// colliding.
const DIGEST_VERSION: &str = "v1";

/// Tamper/desync detector over a character's security-sensitive fields. The
/// field list is explicit and ordered; map-typed fields are walked in key
/// order, so the digest is deterministic across runs and platforms. A
/// mismatch is a signal to re-sync the client from the authoritative copy,
/// never a reason to trust the client's hash.
pub struct IntegrityHasher;

impl IntegrityHasher {
    pub fn digest(character: &Character) -> String {
        let mut canonical = String::new();
        let _ = write!(
            canonical,
            "{DIGEST_VERSION}|level:{}|xp:{}|xp_to_level:{}|hp:{}|max_hp:{}|resource:{}|max_resource:{}|attack_power:{}|spell_power:{}",
            character.level,
            character.experience,
            character.xp_to_level,
            character.stats.hp,
            character.stats.max_hp,
            character.stats.resource,
            character.stats.max_resource,
            character.stats.attack_power,
            character.stats.spell_power,
        );
        canonical.push_str("|currencies:");
        for (name, amount) in &character.currencies {
            let _ = write!(canonical, "{name}={amount},");
        }
        canonical.push_str("|cooldowns:");
        for (skill, ready_at) in &character.session.cooldowns {
            let _ = write!(canonical, "{skill}={},", ready_at.0);
        }
        canonical.push_str("|buffs:");
        for (buff, expires_at) in &character.session.buffs {
            let _ = write!(canonical, "{buff}={},", expires_at.0);
        }
        canonical.push_str("|talents:");
        for (talent, rank) in &character.talents {
            let _ = write!(canonical, "{talent}={rank},");
        }

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify(character: &Character, claimed: &str) -> bool {
        Self::digest(character) == claimed
    }
}
