//! Domain Types
//!
//! Violation events, frame reports, and the strict time helpers shared by the
//! trackers. All timestamps are caller-supplied microseconds; deltas saturate
//! so a clock regression never wraps into a huge positive interval.

use invigil_signals::{Frame, HeadPose};
use serde::{Deserialize, Serialize};

/// Compute time delta with saturating subtraction.
/// If clocks go backwards (now < last), returns 0 instead of wrapping.
#[inline]
pub fn dt_us(now_us: i64, last_us: i64) -> u64 {
    if now_us >= last_us {
        (now_us - last_us) as u64
    } else {
        0
    }
}

/// Time delta in seconds. Convenience wrapper around [`dt_us`].
#[inline]
pub fn dt_sec(now_us: i64, last_us: i64) -> f32 {
    (dt_us(now_us, last_us) as f32) / 1_000_000.0
}

/// Seconds to microseconds, for config-to-runtime conversion.
#[inline]
pub fn sec_to_us(sec: f32) -> u64 {
    (sec.max(0.0) as f64 * 1_000_000.0) as u64
}

/// Integrity violation categories emitted by the engine.
///
/// Upstream also records `tab_switch`, `copy_paste`, and `excessive_noise`;
/// those never originate here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    LookingAway,
    MultipleFaces,
    NoPerson,
    PhoneDetected,
    BookDetected,
    EyeMovement,
    ShoulderMovement,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LookingAway => "looking_away",
            Self::MultipleFaces => "multiple_faces",
            Self::NoPerson => "no_person",
            Self::PhoneDetected => "phone_detected",
            Self::BookDetected => "book_detected",
            Self::EyeMovement => "eye_movement",
            Self::ShoulderMovement => "shoulder_movement",
        }
    }

    /// Whether this type qualifies for an evidence snapshot.
    pub fn evidence_worthy(&self) -> bool {
        !matches!(self, Self::NoPerson)
    }
}

impl std::fmt::Display for ViolationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One emitted violation. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct ViolationEvent {
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub message: String,
    /// Confidence in 0..1
    pub confidence: f32,
    pub timestamp_us: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_offset: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaw_offset: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movement_distance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_count: Option<u32>,
}

impl ViolationEvent {
    pub fn new(
        violation_type: ViolationType,
        severity: Severity,
        message: impl Into<String>,
        confidence: f32,
        timestamp_us: i64,
    ) -> Self {
        Self {
            violation_type,
            severity,
            message: message.into(),
            confidence,
            timestamp_us,
            pitch_offset: None,
            yaw_offset: None,
            duration_sec: None,
            movement_distance: None,
            change_count: None,
        }
    }
}

/// Per-session calibration baseline: pitch/yaw recorded while looking at the
/// camera normally. Degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseBaseline {
    pub pitch: f32,
    pub yaw: f32,
}

/// Result of one orchestration pass over a single frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub timestamp_us: i64,
    pub violations: Vec<ViolationEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_pose: Option<HeadPose>,
    pub face_count: usize,
    pub brightness: f32,
    pub black_screen: bool,
    pub looking_away: bool,
    pub multiple_faces: bool,
    pub no_person: bool,
    pub phone_detected: bool,
    pub book_detected: bool,
    /// Annotated evidence frame, present only when the snapshot gate opens.
    /// Encoding is the caller's concern.
    #[serde(skip)]
    pub snapshot: Option<Frame>,
}

impl FrameReport {
    pub fn empty(timestamp_us: i64) -> Self {
        Self {
            timestamp_us,
            violations: Vec::new(),
            head_pose: None,
            face_count: 0,
            brightness: 0.0,
            black_screen: false,
            looking_away: false,
            multiple_faces: false,
            no_person: false,
            phone_detected: false,
            book_detected: false,
            snapshot: None,
        }
    }
}

/// Aggregate counters for one session.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionStats {
    pub duration_sec: f32,
    pub frames_processed: u64,
    pub violation_count: u64,
}
