//! # invigil-engine
//!
//! Per-frame violation detection and temporal-fusion engine for exam
//! proctoring. Turns raw per-frame observations (face count, head-pose
//! angles, detected-object labels) into debounced, confidence-scored
//! violation events with throttled evidence snapshots.
//!
//! The engine consumes decoded frames plus pluggable face/object detector
//! backends ([`detect::FaceAnalyzer`], [`detect::ObjectDetector`]) and emits
//! a [`domain::FrameReport`] per pass. Sessions are independent and
//! internally serialized; see [`session`].
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use invigil_engine::{EngineConfig, ProctorEngine};
//!
//! let engine = ProctorEngine::new(EngineConfig::default(), face_backend, object_backend);
//! engine.calibrate("session-1", &calibration_frame)?;
//! let report = engine.process_frame("session-1", &frame)?;
//! for violation in &report.violations {
//!     println!("{}: {}", violation.violation_type, violation.message);
//! }
//! ```

pub mod config;
pub mod detect;
pub mod domain;
pub mod drift;
pub mod engine;
pub mod gaze;
pub mod movement;
pub mod objects;
pub mod session;
pub mod snapshot;
pub mod throttle;

pub use config::{ConfigError, EngineConfig};
pub use detect::{DetectorError, FaceAnalyzer, FaceObservation, ObjectDetector, RawDetection};
pub use domain::{
    FrameReport, PoseBaseline, SessionStats, Severity, ViolationEvent, ViolationType,
};
pub use engine::{EngineError, EnvironmentReport, ProctorEngine};

#[cfg(test)]
pub(crate) mod landmark_fixtures {
    //! Shared synthetic landmark builders for tracker tests.

    use invigil_signals::{indices, FaceLandmarks};

    /// Full mesh with the eye rings displaced horizontally from the face
    /// center by `offset_x`, jittered vertically by `jitter`.
    pub fn offset_eye_landmarks(offset_x: f32, jitter: f32) -> FaceLandmarks {
        let mut points = vec![[0.5f32, 0.5f32]; 468];
        points[indices::FOREHEAD_TOP] = [0.5, 0.2];
        points[indices::CHIN] = [0.5, 0.8];
        for idx in indices::LEFT_EYE_RING
            .iter()
            .chain(indices::RIGHT_EYE_RING.iter())
        {
            points[*idx] = [0.5 + offset_x, 0.4 + jitter];
        }
        FaceLandmarks::from_normalized(points)
    }

    /// Full mesh whose face bounding box is centered at (`cx`, `cy`) in
    /// normalized coordinates.
    pub fn face_box_landmarks(cx: f32, cy: f32) -> FaceLandmarks {
        let mut points = vec![[0.5f32, 0.5f32]; 468];
        points[indices::LEFT_CHEEKBONE] = [cx - 0.1, cy];
        points[indices::RIGHT_CHEEKBONE] = [cx + 0.1, cy];
        points[indices::FOREHEAD_TOP] = [cx, cy - 0.15];
        points[indices::CHIN] = [cx, cy + 0.15];
        FaceLandmarks::from_normalized(points)
    }
}
