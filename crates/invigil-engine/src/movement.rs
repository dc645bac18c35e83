//! Body Movement Tracking
//!
//! Counts repeated significant position shifts of the face bounding-box
//! center, which stands in for body/shoulder position (no dedicated body-pose
//! input). A run of qualifying shifts fires once and rearms; long quiet gaps
//! split runs into separate episodes, and brief stillness only decays the
//! counter instead of erasing it.

use invigil_signals::{indices, FaceLandmarks};

use crate::config::MovementConfig;
use crate::domain::dt_sec;

/// Per-frame tracker output.
#[derive(Debug, Clone, Copy)]
pub struct MovementUpdate {
    /// The change counter just reached the firing threshold
    pub triggered: bool,
    /// Counter value backing this update (pre-reset when `triggered`)
    pub change_count: u32,
    /// Normalized displacement this frame
    pub displacement: f32,
}

pub struct BodyMovementTracker {
    config: MovementConfig,
    last_position: Option<(f32, f32)>,
    change_count: u32,
    last_change_us: i64,
    last_decay_us: i64,
}

impl BodyMovementTracker {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            last_position: None,
            change_count: 0,
            last_change_us: 0,
            last_decay_us: 0,
        }
    }

    /// Advance the tracker with this frame's landmarks.
    ///
    /// Returns `None` when the landmark set is incomplete; the frame is
    /// skipped without resetting the counter.
    pub fn update(
        &mut self,
        landmarks: &FaceLandmarks,
        width: u32,
        height: u32,
        now_us: i64,
    ) -> Option<MovementUpdate> {
        if !landmarks.is_complete() || width == 0 || height == 0 {
            return None;
        }

        let left = landmarks.point(indices::LEFT_CHEEKBONE)?;
        let right = landmarks.point(indices::RIGHT_CHEEKBONE)?;
        let top = landmarks.point(indices::FOREHEAD_TOP)?;
        let bottom = landmarks.point(indices::CHIN)?;

        let center_x = (left[0] + right[0]) / 2.0 * width as f32;
        let center_y = (top[1] + bottom[1]) / 2.0 * height as f32;

        let Some((last_x, last_y)) = self.last_position else {
            self.last_position = Some((center_x, center_y));
            return Some(MovementUpdate {
                triggered: false,
                change_count: self.change_count,
                displacement: 0.0,
            });
        };

        let dx = center_x - last_x;
        let dy = center_y - last_y;
        let displacement = (dx * dx + dy * dy).sqrt() / width.max(height) as f32;
        self.last_position = Some((center_x, center_y));

        let mut triggered = false;
        if displacement > self.config.displacement_threshold {
            // A long gap since the previous shift means this is a new episode,
            // not a continuation of the old run.
            let gap = dt_sec(now_us, self.last_change_us);
            if self.change_count > 0 && gap > self.config.episode_gap_sec {
                self.change_count = 1;
            } else {
                self.change_count += 1;
            }
            self.last_change_us = now_us;
            self.last_decay_us = now_us;

            if self.change_count >= self.config.change_threshold {
                triggered = true;
            }
        } else {
            // One decrement per quiet second, never a hard reset.
            let quiet_anchor = self.last_change_us.max(self.last_decay_us);
            if self.change_count > 0 && dt_sec(now_us, quiet_anchor) > self.config.decay_after_sec {
                self.change_count -= 1;
                self.last_decay_us = now_us;
            }
        }

        let update = MovementUpdate {
            triggered,
            change_count: self.change_count,
            displacement,
        };
        if triggered {
            self.change_count = 0;
        }
        Some(update)
    }

    pub fn reset(&mut self) {
        self.last_position = None;
        self.change_count = 0;
        self.last_change_us = 0;
        self.last_decay_us = 0;
    }
}
