use crate::combat::consumables::ConsumableStock;
use crate::combat::stats::CombatantStats;
use crate::entities::character::{Character, CharacterId, CombatSession};
use crate::telemetry::logging;
use crate::world::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum StoreError {
    NotFound(CharacterId),
    Io(String),
    Parse(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "character {} not found", id.0),
            StoreError::Io(message) => write!(f, "save io error: {message}"),
            StoreError::Parse(message) => write!(f, "save parse error: {message}"),
        }
    }
}

/// Persistent slice of a character. The transient combat session is never
/// written; it is rebuilt empty on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSave {
    pub id: u32,
    pub name: String,
    pub level: u32,
    pub experience: u64,
    pub xp_to_level: u64,
    pub stats: CombatantStats,
    #[serde(default)]
    pub currencies: BTreeMap<String, i64>,
    #[serde(default)]
    pub talents: BTreeMap<String, u32>,
    #[serde(default)]
    pub consumables: ConsumableStock,
    pub position: Position,
    pub zone_id: String,
    #[serde(default)]
    pub monsters_killed: u64,
}

impl CharacterSave {
    pub fn from_character(character: &Character) -> Self {
        Self {
            id: character.id.0,
            name: character.name.clone(),
            level: character.level,
            experience: character.experience,
            xp_to_level: character.xp_to_level,
            stats: character.stats,
            currencies: character.currencies.clone(),
            talents: character.talents.clone(),
            consumables: character.consumables,
            position: character.position,
            zone_id: character.zone_id.clone(),
            monsters_killed: character.monsters_killed,
        }
    }

    pub fn into_character(self) -> Character {
        Character {
            id: CharacterId(self.id),
            name: self.name,
            level: self.level,
            experience: self.experience,
            xp_to_level: self.xp_to_level,
            stats: self.stats,
            currencies: self.currencies,
            talents: self.talents,
            consumables: self.consumables,
            position: self.position,
            zone_id: self.zone_id,
            monsters_killed: self.monsters_killed,
            session: CombatSession::new(),
        }
    }
}

/// Subset of fields a simulation step may dirty. Absent fields are left
/// untouched when the delta is merged into the save.
#[derive(Debug, Clone, Default)]
pub struct CharacterDelta {
    pub level: Option<u32>,
    pub experience: Option<u64>,
    pub hp: Option<i32>,
    pub gold: Option<i64>,
    pub monsters_killed: Option<u64>,
    pub position: Option<Position>,
    pub consumables: Option<ConsumableStock>,
}

#[derive(Debug, Default)]
pub struct SaveValidationReport {
    pub character_files: usize,
    pub parsed: usize,
    pub errors: Vec<String>,
    pub missing_dir: bool,
}

#[derive(Debug, Clone)]
pub struct SaveStore {
    root: PathBuf,
}

impl SaveStore {
    pub fn from_root(root: &Path) -> Self {
        Self {
            root: root.join("save"),
        }
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn character_path(&self, id: CharacterId) -> PathBuf {
        self.root.join("characters").join(format!("{}.yml", id.0))
    }

    fn character_backup_path(&self, id: CharacterId) -> PathBuf {
        self.root.join("characters").join(format!("{}.yml.bak", id.0))
    }

    pub fn load_character(&self, id: CharacterId) -> Result<Character, StoreError> {
        let path = self.character_path(id);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id));
            }
            Err(err) => {
                return Err(StoreError::Io(format!(
                    "read failed for {}: {err}",
                    path.display()
                )));
            }
        };
        match serde_yaml::from_str::<CharacterSave>(&data) {
            Ok(save) => Ok(save.into_character()),
            Err(err) => {
                // Fall back to the previous good copy when the primary is
                // corrupt.
                if let Ok(backup) = fs::read_to_string(self.character_backup_path(id)) {
                    if let Ok(save) = serde_yaml::from_str::<CharacterSave>(&backup) {
                        logging::log_error(&format!(
                            "save parse failed for {}, using backup: {err}",
                            path.display()
                        ));
                        return Ok(save.into_character());
                    }
                }
                Err(StoreError::Parse(format!(
                    "parse failed for {}: {err}",
                    path.display()
                )))
            }
        }
    }

    pub fn save_character(&self, character: &Character) -> Result<(), StoreError> {
        let save = CharacterSave::from_character(character);
        let serialized = serde_yaml::to_string(&save)
            .map_err(|err| StoreError::Parse(format!("serialize failed: {err}")))?;
        let path = self.character_path(character.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| StoreError::Io(format!("create dir failed: {err}")))?;
        }
        // Keep the previous copy as the backup before overwriting.
        if path.exists() {
            let _ = fs::copy(&path, self.character_backup_path(character.id));
        }
        fs::write(&path, serialized)
            .map_err(|err| StoreError::Io(format!("write failed for {}: {err}", path.display())))
    }

    pub fn save_character_delta(
        &self,
        id: CharacterId,
        delta: &CharacterDelta,
    ) -> Result<(), StoreError> {
        let mut character = self.load_character(id)?;
        if let Some(level) = delta.level {
            character.level = level;
        }
        if let Some(experience) = delta.experience {
            character.experience = experience;
        }
        if let Some(hp) = delta.hp {
            character.stats.hp = hp.clamp(0, character.stats.max_hp);
        }
        if let Some(gold) = delta.gold {
            character.currencies.insert("gold".to_string(), gold);
        }
        if let Some(monsters_killed) = delta.monsters_killed {
            character.monsters_killed = monsters_killed;
        }
        if let Some(position) = delta.position {
            character.position = position;
        }
        if let Some(consumables) = delta.consumables {
            character.consumables = consumables;
        }
        self.save_character(&character)
    }

    /// Fire-and-forget write used from the simulation path: a failing sink
    /// is logged and never stalls combat resolution.
    pub fn save_delta_best_effort(&self, id: CharacterId, delta: &CharacterDelta) {
        if let Err(err) = self.save_character_delta(id, delta) {
            logging::log_error(&format!("delta save for character {} failed: {err}", id.0));
        }
    }

    pub fn validate_character_saves(&self) -> SaveValidationReport {
        let mut report = SaveValidationReport::default();
        let dir = self.root.join("characters");
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => {
                report.missing_dir = true;
                return report;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "yml") {
                continue;
            }
            report.character_files += 1;
            match fs::read_to_string(&path) {
                Ok(data) => match serde_yaml::from_str::<CharacterSave>(&data) {
                    Ok(_) => report.parsed += 1,
                    Err(err) => report
                        .errors
                        .push(format!("{}: {err}", path.display())),
                },
                Err(err) => report.errors.push(format!("{}: {err}", path.display())),
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::character::xp_for_level;
    use std::sync::atomic::{AtomicU32, Ordering};

    static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    fn temp_store() -> SaveStore {
        let seq = DIR_SEQ.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "everidle-store-test-{}-{seq}",
            std::process::id()
        ));
        SaveStore::new(dir)
    }

    fn character(id: u32) -> Character {
        let mut currencies = BTreeMap::new();
        currencies.insert("gold".to_string(), 500);
        Character {
            id: CharacterId(id),
            name: "Saved".to_string(),
            level: 3,
            experience: 42,
            xp_to_level: xp_for_level(3),
            stats: CombatantStats::default(),
            currencies,
            talents: BTreeMap::new(),
            consumables: ConsumableStock::default(),
            position: Position::new(10.0, 0.0, 20.0),
            zone_id: "meadow".to_string(),
            monsters_killed: 7,
            session: CombatSession::new(),
        }
    }

    #[test]
    fn save_then_load_round_trips_persistent_fields() {
        let store = temp_store();
        let original = character(1);
        store.save_character(&original).unwrap();

        let loaded = store.load_character(CharacterId(1)).unwrap();
        assert_eq!(loaded.name, original.name);
        assert_eq!(loaded.level, 3);
        assert_eq!(loaded.gold(), 500);
        assert_eq!(loaded.monsters_killed, 7);
        // Transient combat state is rebuilt fresh.
        assert!(loaded.session.target.is_none());
        assert!(!loaded.session.in_combat);
    }

    #[test]
    fn missing_character_is_not_found() {
        let store = temp_store();
        match store.load_character(CharacterId(404)) {
            Err(StoreError::NotFound(id)) => assert_eq!(id, CharacterId(404)),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn delta_merges_only_present_fields() {
        let store = temp_store();
        store.save_character(&character(2)).unwrap();

        let delta = CharacterDelta {
            gold: Some(650),
            monsters_killed: Some(9),
            ..Default::default()
        };
        store.save_character_delta(CharacterId(2), &delta).unwrap();

        let loaded = store.load_character(CharacterId(2)).unwrap();
        assert_eq!(loaded.gold(), 650);
        assert_eq!(loaded.monsters_killed, 9);
        // Untouched fields survive.
        assert_eq!(loaded.level, 3);
        assert_eq!(loaded.experience, 42);
    }

    #[test]
    fn corrupt_primary_falls_back_to_backup() {
        let store = temp_store();
        let ch = character(3);
        store.save_character(&ch).unwrap();
        // Second save moves the first copy into the backup slot.
        store.save_character(&ch).unwrap();
        let path = store.character_path(CharacterId(3));
        fs::write(&path, "not: [valid: yaml").unwrap();

        let loaded = store.load_character(CharacterId(3)).unwrap();
        assert_eq!(loaded.name, "Saved");
    }

    #[test]
    fn validation_reports_parse_failures() {
        let store = temp_store();
        store.save_character(&character(4)).unwrap();
        let dir = store.root.join("characters");
        fs::write(dir.join("5.yml"), "junk: [").unwrap();

        let report = store.validate_character_saves();
        assert_eq!(report.character_files, 2);
        assert_eq!(report.parsed, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(!report.missing_dir);
    }
}
