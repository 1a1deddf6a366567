//! Do-Not-Call registry lookups.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

pub trait DncRegistry: Send + Sync {
    /// Whether the normalized phone number is on the registry.
    fn is_listed(&self, phone: &str) -> bool;
}

/// Registry stub used until a real DNC feed is wired in; never lists a number.
pub struct NoDncRegistry;

impl DncRegistry for NoDncRegistry {
    fn is_listed(&self, _phone: &str) -> bool {
        false
    }
}

/// In-memory registry loaded from an operator-supplied list.
#[derive(Default)]
pub struct StaticDncRegistry {
    /// Normalized phone -> time the number was listed.
    numbers: DashMap<String, DateTime<Utc>>,
}

impl StaticDncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, phone: &str) {
        self.numbers.insert(phone.to_string(), Utc::now());
        tracing::info!(phone = %phone, "number added to DNC registry");
    }

    pub fn remove(&self, phone: &str) -> bool {
        self.numbers.remove(phone).is_some()
    }

    /// Bulk-load numbers. Returns the number of entries added.
    pub fn bulk_add<I, S>(&self, phones: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let now = Utc::now();
        let mut count = 0usize;
        for phone in phones {
            self.numbers.insert(phone.as_ref().to_string(), now);
            count += 1;
        }
        tracing::info!(count, "DNC registry import completed");
        count
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

impl DncRegistry for StaticDncRegistry {
    fn is_listed(&self, phone: &str) -> bool {
        self.numbers.contains_key(phone)
    }
}
