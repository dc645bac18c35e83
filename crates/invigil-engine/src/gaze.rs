//! Looking-Away Classification
//!
//! Converts pose offsets against the session calibration baseline into a
//! boolean looking-away decision plus a confidence score. Yaw (horizontal
//! turn) is the dominant signal; the decision is the conjunction of several
//! strict gates so natural micro-movements never flag.

use invigil_signals::HeadPose;

use crate::config::GazeConfig;
use crate::domain::PoseBaseline;

/// Classifier output for one frame.
#[derive(Debug, Clone, Copy)]
pub struct GazeAssessment {
    pub looking_away: bool,
    /// Confidence in 0..1
    pub confidence: f32,
    /// Absolute pitch offset from baseline, degrees
    pub pitch_offset: f32,
    /// Absolute yaw offset from baseline, degrees
    pub yaw_offset: f32,
}

pub struct GazeClassifier {
    config: GazeConfig,
}

impl GazeClassifier {
    pub fn new(config: GazeConfig) -> Self {
        Self { config }
    }

    /// Assess whether the pose reads as looking away from the camera.
    pub fn assess(&self, pose: &HeadPose, baseline: PoseBaseline) -> GazeAssessment {
        let cfg = &self.config;
        let pitch_offset = (pose.pitch - baseline.pitch).abs();
        let yaw_offset = (pose.yaw - baseline.yaw).abs();

        // Yaw-weighted blend; left/right turn is the strongest indicator.
        let normalized_yaw = (yaw_offset / cfg.max_yaw_offset).min(1.0);
        let normalized_pitch = (pitch_offset / cfg.max_pitch_offset).min(1.0);
        let blend = normalized_yaw * 0.8 + normalized_pitch * 0.2;

        let decisive_yaw = yaw_offset > cfg.max_yaw_offset * cfg.yaw_gate_fraction;
        let total_deviation = (yaw_offset * yaw_offset + pitch_offset * pitch_offset).sqrt();
        let substantial_movement = total_deviation > cfg.min_total_deviation;
        let above_yaw_floor = yaw_offset > cfg.min_yaw_offset;

        // Once the angular gates agree the turn is unambiguous, the reported
        // confidence is floored at the gate; the blend alone cannot reach it
        // on a pure horizontal turn.
        let angular_gates = decisive_yaw && substantial_movement && above_yaw_floor;
        let confidence = if angular_gates {
            blend.max(cfg.confidence_gate)
        } else {
            blend
        };

        let looking_away = angular_gates && confidence >= cfg.confidence_gate;

        GazeAssessment {
            looking_away,
            confidence,
            pitch_offset,
            yaw_offset,
        }
    }

    pub fn config(&self) -> &GazeConfig {
        &self.config
    }
}
