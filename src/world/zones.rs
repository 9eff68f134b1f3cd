use crate::entities::character::CharacterId;
use std::collections::{BTreeSet, HashMap};

/// Zone membership query used by log routing. Supplied by the world/session
/// layer; tests inject small fixed maps.
pub trait ZoneDirectory {
    fn characters_in_zone(&self, zone_id: &str) -> Vec<CharacterId>;
}

#[derive(Debug, Default)]
pub struct ZoneMap {
    members: HashMap<String, BTreeSet<CharacterId>>,
}

impl ZoneMap {
    pub fn new() -> Self {
        Self {
            members: HashMap::new(),
        }
    }

    pub fn insert(&mut self, zone_id: &str, character: CharacterId) {
        self.members
            .entry(zone_id.to_string())
            .or_default()
            .insert(character);
    }

    pub fn remove(&mut self, character: CharacterId) {
        for set in self.members.values_mut() {
            set.remove(&character);
        }
        self.members.retain(|_, set| !set.is_empty());
    }
}

impl ZoneDirectory for ZoneMap {
    fn characters_in_zone(&self, zone_id: &str) -> Vec<CharacterId> {
        self.members
            .get(zone_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}
