//! Session State and Registry
//!
//! All mutable per-session state lives in one record built by a single
//! factory, and the registry shards sessions across independently locked maps
//! so concurrent sessions never contend on a global lock. A frame pass holds
//! the session's own mutex for its whole duration, which serializes frames
//! within a session while leaving other sessions untouched.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use crate::config::EngineConfig;
use crate::domain::{dt_sec, dt_us, sec_to_us, PoseBaseline, SessionStats};
use crate::drift::GazeDriftTracker;
use crate::movement::BodyMovementTracker;
use crate::snapshot::SnapshotGate;
use crate::throttle::ViolationThrottle;

/// Mutable state for one proctoring session.
pub struct SessionState {
    pub baseline: PoseBaseline,
    pub created_us: i64,
    pub last_seen_us: i64,
    pub frames_processed: u64,
    pub violation_count: u64,
    pub throttle: ViolationThrottle,
    pub drift: GazeDriftTracker,
    pub movement: BodyMovementTracker,
    pub snapshot: SnapshotGate,
}

impl SessionState {
    /// Single factory for default-initialized session state.
    pub fn new(config: &EngineConfig, now_us: i64) -> Self {
        Self {
            baseline: PoseBaseline::default(),
            created_us: now_us,
            last_seen_us: now_us,
            frames_processed: 0,
            violation_count: 0,
            throttle: ViolationThrottle::new(config.throttle.cooldown_sec),
            drift: GazeDriftTracker::new(config.drift.clone()),
            movement: BodyMovementTracker::new(config.movement.clone()),
            snapshot: SnapshotGate::new(config.snapshot.interval_sec),
        }
    }

    pub fn stats(&self, now_us: i64) -> SessionStats {
        SessionStats {
            duration_sec: dt_sec(now_us, self.created_us),
            frames_processed: self.frames_processed,
            violation_count: self.violation_count,
        }
    }
}

type Shard = Mutex<HashMap<String, Arc<Mutex<SessionState>>>>;

/// Sharded session map. Lookup locks one shard briefly; the returned handle
/// is then locked independently for the duration of a pass.
pub struct SessionRegistry {
    shards: Vec<Shard>,
}

impl SessionRegistry {
    pub fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self { shards }
    }

    fn shard_for(&self, session_id: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        session_id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Fetch the session's state handle, creating default state on first use.
    pub fn get_or_create(
        &self,
        session_id: &str,
        config: &EngineConfig,
        now_us: i64,
    ) -> Arc<Mutex<SessionState>> {
        let mut shard = self.shard_for(session_id).lock().unwrap();
        shard
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "initializing session state");
                Arc::new(Mutex::new(SessionState::new(config, now_us)))
            })
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Mutex<SessionState>>> {
        self.shard_for(session_id).lock().unwrap().get(session_id).cloned()
    }

    /// Drop a session's state. Returns whether it existed.
    pub fn remove(&self, session_id: &str) -> bool {
        self.shard_for(session_id).lock().unwrap().remove(session_id).is_some()
    }

    /// Purge sessions idle longer than `idle_timeout_sec`. Sessions currently
    /// mid-pass are left alone. Returns how many were removed.
    pub fn evict_idle(&self, now_us: i64, idle_timeout_sec: f32) -> usize {
        let idle_us = sec_to_us(idle_timeout_sec);
        let mut removed = 0;
        for shard in &self.shards {
            let mut map = shard.lock().unwrap();
            map.retain(|session_id, handle| {
                let Ok(state) = handle.try_lock() else {
                    return true;
                };
                let keep = dt_us(now_us, state.last_seen_us) < idle_us;
                if !keep {
                    tracing::info!(%session_id, "evicting idle session");
                    removed += 1;
                }
                keep
            });
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().unwrap().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
