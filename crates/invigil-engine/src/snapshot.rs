//! Snapshot Evidence Gate
//!
//! Decides, independently of the violation throttle, whether an annotated
//! still should accompany this frame's batch. Evidence is attached only when
//! the batch carries an evidence-worthy type and enough time has passed since
//! the session's previous snapshot.

use crate::domain::{dt_us, sec_to_us, ViolationEvent};

pub struct SnapshotGate {
    /// Required gap between snapshots: twice the base capture interval.
    min_gap_us: u64,
    last_snapshot_us: Option<i64>,
}

impl SnapshotGate {
    pub fn new(interval_sec: f32) -> Self {
        Self {
            min_gap_us: sec_to_us(interval_sec) * 2,
            last_snapshot_us: None,
        }
    }

    /// Whether to attach a snapshot to this batch. Capture time is recorded
    /// on success.
    pub fn should_capture(&mut self, violations: &[ViolationEvent], now_us: i64) -> bool {
        let evidence_worthy = violations
            .iter()
            .any(|v| v.violation_type.evidence_worthy());
        if !evidence_worthy {
            return false;
        }
        if let Some(last) = self.last_snapshot_us {
            if dt_us(now_us, last) < self.min_gap_us {
                return false;
            }
        }
        self.last_snapshot_us = Some(now_us);
        true
    }
}
