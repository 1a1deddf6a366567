//! Bounded compliance audit log. Holds the most recent validation records;
//! once full, the oldest record is evicted for every new one.

use chrono::{DateTime, Utc};
use outreach_core::ComplianceRecord;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogStats {
    pub retained: usize,
    pub capacity: usize,
    pub total_recorded: u64,
    pub total_evicted: u64,
}

pub struct ComplianceLog {
    records: Mutex<VecDeque<ComplianceRecord>>,
    capacity: usize,
    total_recorded: AtomicU64,
    total_evicted: AtomicU64,
}

impl ComplianceLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            total_recorded: AtomicU64::new(0),
            total_evicted: AtomicU64::new(0),
        }
    }

    pub fn append(&self, record: ComplianceRecord) {
        let mut records = self.records.lock();
        if records.len() >= self.capacity {
            records.pop_front();
            self.total_evicted.fetch_add(1, Ordering::Relaxed);
        }
        records.push_back(record);
        self.total_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Records created within `[start, end]`, oldest first.
    pub fn in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<ComplianceRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.created_at >= start && r.created_at <= end)
            .cloned()
            .collect()
    }

    /// Most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ComplianceRecord> {
        self.records
            .lock()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: Uuid) -> Option<ComplianceRecord> {
        self.records.lock().iter().find(|r| r.id == id).cloned()
    }

    /// Apply `f` to the record with `id`, returning its result.
    pub fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut ComplianceRecord) -> R) -> Option<R> {
        let mut records = self.records.lock();
        records.iter_mut().find(|r| r.id == id).map(f)
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn stats(&self) -> AuditLogStats {
        AuditLogStats {
            retained: self.len(),
            capacity: self.capacity,
            total_recorded: self.total_recorded.load(Ordering::Relaxed),
            total_evicted: self.total_evicted.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use outreach_core::Channel;

    fn record(at: DateTime<Utc>) -> ComplianceRecord {
        ComplianceRecord::new("p-1", Some("+15551234567".into()), Channel::Sms, at)
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let log = ComplianceLog::new(3);
        let start = Utc::now();
        for i in 0..5 {
            log.append(record(start + Duration::minutes(i)));
        }

        assert_eq!(log.len(), 3);
        let stats = log.stats();
        assert_eq!(stats.total_recorded, 5);
        assert_eq!(stats.total_evicted, 2);

        let recent = log.recent(10);
        assert_eq!(recent[0].created_at, start + Duration::minutes(4));
        assert_eq!(recent[2].created_at, start + Duration::minutes(2));
    }

    #[test]
    fn test_in_range_filters_by_creation_time() {
        let log = ComplianceLog::new(10);
        let start = Utc::now();
        log.append(record(start - Duration::days(2)));
        log.append(record(start));
        log.append(record(start + Duration::hours(1)));

        let found = log.in_range(start - Duration::hours(1), start + Duration::hours(2));
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_update_in_place() {
        let log = ComplianceLog::new(10);
        let rec = record(Utc::now());
        let id = rec.id;
        log.append(rec);

        let updated = log.update(id, |r| {
            r.compliance_score = 0.5;
        });
        assert!(updated.is_some());
        assert_eq!(log.get(id).unwrap().compliance_score, 0.5);
        assert!(log.update(Uuid::new_v4(), |_| ()).is_none());
    }
}
