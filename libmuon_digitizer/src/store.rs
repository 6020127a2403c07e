use fxhash::FxHashMap;

use super::digit::Digit;
use super::trigger::{GlobalTriggerRecord, LocalTriggerRecord};

/// What to do when a digit with the same key is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPolicy {
    /// Keep the existing digit, reject the new one.
    Deny,
    /// Replace the existing digit.
    Allow,
}

/// Append-only digit output of one decode pass. Implementations own the
/// duplicate policy; decoders only report rejections.
pub trait DigitSink {
    fn clear(&mut self);
    /// Insert a digit. Returns false if the sink rejected it.
    fn insert(&mut self, digit: Digit, policy: InsertPolicy) -> bool;
}

/// Trigger-record output of one decode pass.
pub trait TriggerSink {
    fn clear(&mut self);
    /// Set the event's global trigger record. Called again, it replaces the
    /// previous record, so the store holds at most one.
    fn set_global(&mut self, record: GlobalTriggerRecord);
    fn append(&mut self, record: LocalTriggerRecord);
}

/// In-memory digit store keyed by the packed digit key.
#[derive(Debug, Clone, Default)]
pub struct DigitStore {
    digits: FxHashMap<i64, Digit>,
}

impl DigitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn get(&self, key: i64) -> Option<&Digit> {
        self.digits.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Digit> {
        self.digits.values()
    }

    /// Digits ordered by key, for deterministic output.
    pub fn sorted(&self) -> Vec<Digit> {
        let mut digits: Vec<Digit> = self.digits.values().cloned().collect();
        digits.sort_by_key(|digit| digit.key());
        digits
    }
}

impl DigitSink for DigitStore {
    fn clear(&mut self) {
        self.digits.clear();
    }

    fn insert(&mut self, digit: Digit, policy: InsertPolicy) -> bool {
        let key = digit.key();
        match policy {
            InsertPolicy::Deny => {
                if self.digits.contains_key(&key) {
                    return false;
                }
                self.digits.insert(key, digit);
                true
            }
            InsertPolicy::Allow => {
                self.digits.insert(key, digit);
                true
            }
        }
    }
}

/// In-memory trigger store: at most one global record, local records in
/// arrival order.
#[derive(Debug, Clone, Default)]
pub struct TriggerStore {
    global: Option<GlobalTriggerRecord>,
    locals: Vec<LocalTriggerRecord>,
}

impl TriggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&self) -> Option<&GlobalTriggerRecord> {
        self.global.as_ref()
    }

    pub fn locals(&self) -> &[LocalTriggerRecord] {
        &self.locals
    }
}

impl TriggerSink for TriggerStore {
    fn clear(&mut self) {
        self.global = None;
        self.locals.clear();
    }

    fn set_global(&mut self, record: GlobalTriggerRecord) {
        self.global = Some(record);
    }

    fn append(&mut self, record: LocalTriggerRecord) {
        self.locals.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electronics::Cathode;

    fn digit(channel: u16, amplitude: f32) -> Digit {
        Digit {
            detector_element: 103,
            chip: 12,
            channel,
            cathode: Cathode::Bend,
            pad_x: 1,
            pad_y: 2,
            amplitude,
        }
    }

    #[test]
    fn test_deny_keeps_first() {
        let mut store = DigitStore::new();
        assert!(store.insert(digit(5, 87.0), InsertPolicy::Deny));
        assert!(!store.insert(digit(5, 99.0), InsertPolicy::Deny));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(digit(5, 0.0).key()).unwrap().amplitude, 87.0);
    }

    #[test]
    fn test_allow_replaces() {
        let mut store = DigitStore::new();
        assert!(store.insert(digit(5, 87.0), InsertPolicy::Allow));
        assert!(store.insert(digit(5, 99.0), InsertPolicy::Allow));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(digit(5, 0.0).key()).unwrap().amplitude, 99.0);
    }

    #[test]
    fn test_sorted_is_deterministic() {
        let mut store = DigitStore::new();
        store.insert(digit(9, 1.0), InsertPolicy::Deny);
        store.insert(digit(1, 2.0), InsertPolicy::Deny);
        store.insert(digit(4, 3.0), InsertPolicy::Deny);
        let channels: Vec<u16> = store.sorted().iter().map(|d| d.channel).collect();
        assert_eq!(channels, vec![1, 4, 9]);
    }

    #[test]
    fn test_trigger_store_single_global() {
        let mut store = TriggerStore::new();
        store.set_global(GlobalTriggerRecord::from_response(0x1));
        store.set_global(GlobalTriggerRecord::from_response(0x2));
        assert_eq!(store.global().unwrap().response(), 0x2);
        store.clear();
        assert!(store.global().is_none());
    }
}
