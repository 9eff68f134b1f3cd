use crate::entities::character::CharacterId;
use crate::world::clock::GameTick;
use crate::world::monsters::MonsterId;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityId {
    Character(CharacterId),
    Monster(MonsterId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    AutoAttack,
    GlobalCooldown,
    Resurrect,
    Respawn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey {
    pub entity: EntityId,
    pub kind: TimerKind,
}

impl TimerKey {
    pub fn new(entity: EntityId, kind: TimerKind) -> Self {
        Self { entity, kind }
    }
}

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    key: TimerKey,
    due: GameTick,
}

/// Min-heap by due tick (earliest first)
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.key.cmp(&self.key))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.due == other.due
    }
}

impl Eq for TimerEntry {}

/// Single time-ordered queue of per-entity timers. Rescheduling a key
/// supersedes the old entry; stale heap entries are skipped lazily against
/// the index. Cancelling an entity drops every timer it still owns, so no
/// callback can fire for a removed character or monster.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<TimerEntry>,
    index: HashMap<TimerKey, GameTick>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            index: HashMap::new(),
        }
    }

    pub fn schedule(&mut self, key: TimerKey, due: GameTick) {
        self.index.insert(key, due);
        self.heap.push(TimerEntry { key, due });
    }

    pub fn schedule_in(&mut self, key: TimerKey, now: GameTick, delay_ms: u64) {
        self.schedule(key, now.saturating_add_ms(delay_ms));
    }

    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.index.remove(&key).is_some()
    }

    pub fn cancel_entity(&mut self, entity: EntityId) -> usize {
        let stale: Vec<TimerKey> = self
            .index
            .keys()
            .filter(|key| key.entity == entity)
            .copied()
            .collect();
        for key in &stale {
            self.index.remove(key);
        }
        stale.len()
    }

    pub fn due_at(&self, key: TimerKey) -> Option<GameTick> {
        self.index.get(&key).copied()
    }

    /// Pop the next timer that is due at or before `now`.
    pub fn pop_ready(&mut self, now: GameTick) -> Option<TimerKey> {
        loop {
            let entry = self.heap.peek()?;
            match self.index.get(&entry.key) {
                Some(active) if *active == entry.due => {
                    if entry.due > now {
                        return None;
                    }
                    let entry = self.heap.pop()?;
                    self.index.remove(&entry.key);
                    return Some(entry.key);
                }
                _ => {
                    // Superseded or cancelled entry.
                    self.heap.pop();
                    continue;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
