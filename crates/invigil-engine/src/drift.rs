//! Gaze Drift Tracking
//!
//! Session-scoped state machine that accumulates sustained off-center eye
//! position. An episode only accumulates while the eyes keep moving; a frozen
//! or stale face position never counts as sustained drift. Confirmation fires
//! once the episode lasts the configured window, then the machine rearms.

use invigil_signals::{indices, FaceLandmarks};

use crate::config::DriftConfig;
use crate::domain::dt_sec;

/// Episode phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriftPhase {
    /// Eyes near the face center
    Focused,
    /// Accumulating a continuous away episode
    Drifting,
}

/// Per-frame tracker output.
#[derive(Debug, Clone, Copy)]
pub struct DriftUpdate {
    /// An away episode just crossed the confirmation window
    pub confirmed: bool,
    /// Length of the current episode, seconds
    pub away_duration_sec: f32,
    /// Frame-to-frame eye movement, fraction of face width
    pub movement: f32,
    /// Horizontal eye offset from the face center
    pub eye_offset: f32,
}

pub struct GazeDriftTracker {
    config: DriftConfig,
    phase: DriftPhase,
    away_start_us: i64,
    last_qualifying_us: i64,
    last_position: Option<(f32, f32)>,
}

impl GazeDriftTracker {
    pub fn new(config: DriftConfig) -> Self {
        Self {
            config,
            phase: DriftPhase::Focused,
            away_start_us: 0,
            last_qualifying_us: 0,
            last_position: None,
        }
    }

    /// Advance the tracker with this frame's landmarks.
    ///
    /// `looking_away` is the gaze classifier's verdict for the same frame; a
    /// confirmed head turn counts as away even when the eye offset alone does
    /// not. Returns `None` when the landmark set is incomplete; the frame is
    /// skipped without resetting episode state.
    pub fn update(
        &mut self,
        landmarks: &FaceLandmarks,
        looking_away: bool,
        now_us: i64,
    ) -> Option<DriftUpdate> {
        if !landmarks.is_complete() {
            return None;
        }

        let left_eye = landmarks.mean_of(&indices::LEFT_EYE_RING)?;
        let right_eye = landmarks.mean_of(&indices::RIGHT_EYE_RING)?;
        let forehead = landmarks.point(indices::FOREHEAD_TOP)?;
        let chin = landmarks.point(indices::CHIN)?;

        let face_center_x = (forehead[0] + chin[0]) / 2.0;
        let eye_offset = (left_eye[0] + right_eye[0]) / 2.0 - face_center_x;
        let eye_center_y = (left_eye[1] + right_eye[1]) / 2.0;
        let position = (eye_offset, eye_center_y);

        let movement = match self.last_position {
            Some((px, py)) => {
                let dx = position.0 - px;
                let dy = position.1 - py;
                (dx * dx + dy * dy).sqrt()
            }
            None => 0.0,
        };
        self.last_position = Some(position);

        let eyes_away = eye_offset.abs() > self.config.eye_offset_threshold || looking_away;
        let qualifying = eyes_away && movement > self.config.min_movement;

        let mut update = DriftUpdate {
            confirmed: false,
            away_duration_sec: 0.0,
            movement,
            eye_offset,
        };

        if qualifying {
            if self.phase == DriftPhase::Focused {
                self.phase = DriftPhase::Drifting;
                self.away_start_us = now_us;
            }
            self.last_qualifying_us = now_us;
            update.away_duration_sec = dt_sec(now_us, self.away_start_us);

            if update.away_duration_sec >= self.config.away_threshold_sec {
                update.confirmed = true;
                self.phase = DriftPhase::Focused;
            }
        } else if self.phase == DriftPhase::Drifting {
            // Refocus debounce: a blink or one quiet frame must not end the
            // episode, only a sustained return does.
            if dt_sec(now_us, self.last_qualifying_us) > self.config.refocus_debounce_sec {
                self.phase = DriftPhase::Focused;
            } else {
                update.away_duration_sec = dt_sec(now_us, self.away_start_us);
            }
        }

        Some(update)
    }

    pub fn reset(&mut self) {
        self.phase = DriftPhase::Focused;
        self.away_start_us = 0;
        self.last_qualifying_us = 0;
        self.last_position = None;
    }
}
