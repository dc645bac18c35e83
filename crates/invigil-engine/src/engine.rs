//! Frame Orchestrator
//!
//! Composes the detectors, classifiers, and per-session trackers into one
//! pass over a single incoming frame. The engine owns the external detector
//! collaborators (constructed once at process start) and the sharded session
//! registry; everything else is stateless policy.
//!
//! Degradation policy: only an invalid frame fails the call. A missing pose
//! solve skips gaze-dependent checks for that frame, a failed object detector
//! reads as "no objects", and an unknown session id auto-initializes.

use std::sync::Arc;

use invigil_signals::{estimate_head_pose, indices, Frame, HeadPose};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::detect::{DetectorError, FaceAnalyzer, ObjectDetector};
use crate::domain::{
    FrameReport, PoseBaseline, SessionStats, Severity, ViolationEvent, ViolationType,
};
use crate::gaze::{GazeAssessment, GazeClassifier};
use crate::objects::{ObjectPresence, ObjectPresenceFilter};
use crate::session::SessionRegistry;

const PHONE_BOX_COLOR: [u8; 3] = [255, 0, 0];
const BOOK_BOX_COLOR: [u8; 3] = [0, 0, 255];
const BOX_THICKNESS: u32 = 3;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("no face available for calibration")]
    NoFace,
    #[error("head pose estimation failed")]
    PoseEstimation,
    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// Pre-exam lighting and framing check.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentReport {
    pub lighting_ok: bool,
    pub face_detected: bool,
    pub face_centered: bool,
    pub brightness: f32,
    pub message: String,
}

/// The proctoring engine: one instance per process, shared across sessions.
pub struct ProctorEngine {
    config: EngineConfig,
    faces: Arc<dyn FaceAnalyzer>,
    objects: Arc<dyn ObjectDetector>,
    gaze: GazeClassifier,
    object_filter: ObjectPresenceFilter,
    sessions: SessionRegistry,
}

impl ProctorEngine {
    pub fn new(
        config: EngineConfig,
        faces: Arc<dyn FaceAnalyzer>,
        objects: Arc<dyn ObjectDetector>,
    ) -> Self {
        Self {
            gaze: GazeClassifier::new(config.gaze.clone()),
            object_filter: ObjectPresenceFilter::new(config.objects.clone()),
            sessions: SessionRegistry::new(config.session.shards),
            config,
            faces,
            objects,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one pass over a frame for the given session.
    ///
    /// The session's state is locked for the whole pass; frames for the same
    /// session serialize, frames for different sessions run in parallel.
    pub fn process_frame(
        &self,
        session_id: &str,
        frame: &Frame,
    ) -> Result<FrameReport, EngineError> {
        ensure_valid(frame)?;
        let now_us = frame.timestamp_us;

        let handle = self.sessions.get_or_create(session_id, &self.config, now_us);
        let mut state = handle.lock().unwrap();

        state.throttle.begin_frame();
        state.last_seen_us = now_us;
        state.frames_processed += 1;

        let mut report = FrameReport::empty(now_us);
        report.brightness = frame.mean_luma();
        report.black_screen = report.brightness < self.config.environment.black_screen_brightness;

        let observation = match self.faces.analyze(frame) {
            Ok(obs) => Some(obs),
            Err(err) => {
                warn!(session_id, %err, "face analysis unavailable, skipping face checks");
                None
            }
        };

        if let Some(obs) = &observation {
            report.face_count = obs.count;

            if obs.count > 1 {
                report.multiple_faces = true;
                if state.throttle.should_emit(ViolationType::MultipleFaces, now_us) {
                    debug!(session_id, count = obs.count, "multiple faces in frame");
                    report.violations.push(ViolationEvent::new(
                        ViolationType::MultipleFaces,
                        Severity::High,
                        format!("{} people detected in frame", obs.count),
                        0.95,
                        now_us,
                    ));
                }
            } else if obs.count == 0 {
                if report.black_screen {
                    // Camera off, not an empty seat: suppressing the signal
                    // here is the false-positive guard, not a detection gap.
                    debug!(
                        session_id,
                        brightness = report.brightness,
                        "black screen, no-person signal suppressed"
                    );
                } else {
                    report.no_person = true;
                    if state.throttle.should_emit(ViolationType::NoPerson, now_us) {
                        report.violations.push(ViolationEvent::new(
                            ViolationType::NoPerson,
                            Severity::Medium,
                            format!(
                                "No person detected in frame (brightness: {:.1})",
                                report.brightness
                            ),
                            0.9,
                            now_us,
                        ));
                    }
                }
            } else if let Some(landmarks) = obs.landmarks.first() {
                let pose = estimate_head_pose(landmarks, frame.width, frame.height);
                if pose.is_none() {
                    debug!(session_id, "pose solve failed, skipping gaze checks");
                }

                let mut looking_away_now = false;
                if let Some(pose) = pose {
                    report.head_pose = Some(pose);
                    let assessment = self.gaze.assess(&pose, state.baseline);
                    looking_away_now = assessment.looking_away;

                    if assessment.looking_away
                        && self.passes_emission_gates(
                            &pose,
                            &assessment,
                            state.baseline,
                            landmarks.len(),
                        )
                    {
                        report.looking_away = true;
                        if state.throttle.should_emit(ViolationType::LookingAway, now_us) {
                            report
                                .violations
                                .push(looking_away_event(&assessment, &self.config, now_us));
                        }
                    }
                }

                // Trackers run whenever landmarks are available; the drift
                // tracker only borrows the classifier verdict, the body
                // tracker needs no pose at all.
                if let Some(update) = state.drift.update(landmarks, looking_away_now, now_us) {
                    if update.confirmed
                        && state.throttle.should_emit(ViolationType::EyeMovement, now_us)
                    {
                        debug!(
                            session_id,
                            duration = update.away_duration_sec,
                            "sustained eye drift confirmed"
                        );
                        let mut event = ViolationEvent::new(
                            ViolationType::EyeMovement,
                            Severity::Medium,
                            format!(
                                "Eyes away from webcam with movement for {:.1} seconds",
                                update.away_duration_sec
                            ),
                            0.85,
                            now_us,
                        );
                        event.duration_sec = Some(update.away_duration_sec);
                        event.movement_distance = Some(update.movement);
                        report.violations.push(event);
                    }
                }

                if let Some(update) =
                    state
                        .movement
                        .update(landmarks, frame.width, frame.height, now_us)
                {
                    if update.triggered
                        && state
                            .throttle
                            .should_emit(ViolationType::ShoulderMovement, now_us)
                    {
                        debug!(
                            session_id,
                            changes = update.change_count,
                            "continuous body movement confirmed"
                        );
                        let mut event = ViolationEvent::new(
                            ViolationType::ShoulderMovement,
                            Severity::Medium,
                            format!(
                                "Continuous shoulder/body movement detected ({} changes)",
                                update.change_count
                            ),
                            0.80,
                            now_us,
                        );
                        event.change_count = Some(update.change_count);
                        event.movement_distance = Some(update.displacement);
                        report.violations.push(event);
                    }
                }
            }
        }

        // Object detection fails open: an absent or broken detector must not
        // abort the frame or invent violations.
        let detections = match self.objects.detect(frame) {
            Ok(detections) => detections,
            Err(err) => {
                warn!(session_id, %err, "object detector unavailable, treating as no objects");
                Vec::new()
            }
        };
        let presence = self.object_filter.filter(&detections);

        if let Some(phone) = &presence.phone {
            report.phone_detected = true;
            if state.throttle.should_emit(ViolationType::PhoneDetected, now_us) {
                debug!(session_id, confidence = phone.confidence, "phone detected");
                report.violations.push(ViolationEvent::new(
                    ViolationType::PhoneDetected,
                    Severity::High,
                    format!("Mobile phone detected with {:.2} confidence", phone.confidence),
                    phone.confidence,
                    now_us,
                ));
            }
        }
        if let Some(book) = &presence.book {
            if self.object_filter.book_enabled() {
                report.book_detected = true;
                if state.throttle.should_emit(ViolationType::BookDetected, now_us) {
                    report.violations.push(ViolationEvent::new(
                        ViolationType::BookDetected,
                        Severity::Medium,
                        format!("Book detected with {:.2} confidence", book.confidence),
                        book.confidence,
                        now_us,
                    ));
                }
            } else {
                debug!(
                    session_id,
                    confidence = book.confidence,
                    "book match suppressed by policy"
                );
            }
        }

        if state.snapshot.should_capture(&report.violations, now_us) {
            report.snapshot = Some(annotate(frame, &presence));
        }

        state.violation_count += report.violations.len() as u64;
        Ok(report)
    }

    /// Calibrate the session baseline from a frame of the participant looking
    /// at the camera normally. Returns the full measured pose.
    pub fn calibrate(&self, session_id: &str, frame: &Frame) -> Result<HeadPose, EngineError> {
        ensure_valid(frame)?;
        let observation = self.faces.analyze(frame)?;
        let landmarks = observation.landmarks.first().ok_or(EngineError::NoFace)?;
        let pose = estimate_head_pose(landmarks, frame.width, frame.height)
            .ok_or(EngineError::PoseEstimation)?;

        let handle = self
            .sessions
            .get_or_create(session_id, &self.config, frame.timestamp_us);
        let mut state = handle.lock().unwrap();
        state.baseline = PoseBaseline {
            pitch: pose.pitch,
            yaw: pose.yaw,
        };
        state.last_seen_us = frame.timestamp_us;
        debug!(
            session_id,
            pitch = pose.pitch,
            yaw = pose.yaw,
            "session calibrated"
        );
        Ok(pose)
    }

    /// Install an externally measured baseline.
    pub fn set_baseline(&self, session_id: &str, baseline: PoseBaseline, now_us: i64) {
        let handle = self.sessions.get_or_create(session_id, &self.config, now_us);
        let mut state = handle.lock().unwrap();
        state.baseline = baseline;
        state.last_seen_us = now_us;
    }

    /// Pre-exam lighting and framing check.
    pub fn check_environment(&self, frame: &Frame) -> Result<EnvironmentReport, EngineError> {
        ensure_valid(frame)?;
        let cfg = &self.config.environment;
        let brightness = frame.mean_luma();
        let lighting_ok = brightness > cfg.min_brightness && brightness < cfg.max_brightness;

        let observation = self.faces.analyze(frame)?;
        let face_detected = observation.count > 0;
        let face_centered = face_detected
            && observation
                .landmarks
                .first()
                .and_then(|lm| {
                    let left = lm.point(indices::LEFT_CHEEKBONE)?;
                    let right = lm.point(indices::RIGHT_CHEEKBONE)?;
                    let top = lm.point(indices::FOREHEAD_TOP)?;
                    let bottom = lm.point(indices::CHIN)?;
                    let cx = (left[0] + right[0]) / 2.0;
                    let cy = (top[1] + bottom[1]) / 2.0;
                    Some(
                        cx > cfg.center_x_min
                            && cx < cfg.center_x_max
                            && cy > cfg.center_y_min
                            && cy < cfg.center_y_max,
                    )
                })
                .unwrap_or(false);

        let mut message = Vec::new();
        if !lighting_ok {
            message.push(if brightness <= cfg.min_brightness {
                "Lighting too dark"
            } else {
                "Lighting too bright"
            });
        }
        if !face_detected {
            message.push("No face detected");
        } else if !face_centered {
            message.push("Face not centered");
        }
        if message.is_empty() {
            message.push("Environment check passed");
        }

        Ok(EnvironmentReport {
            lighting_ok,
            face_detected,
            face_centered,
            brightness,
            message: message.join(", "),
        })
    }

    pub fn session_stats(&self, session_id: &str, now_us: i64) -> Option<SessionStats> {
        let handle = self.sessions.get(session_id)?;
        let state = handle.lock().unwrap();
        Some(state.stats(now_us))
    }

    /// Drop a session's state. Returns whether the session existed.
    pub fn end_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id)
    }

    /// Purge sessions idle longer than the configured timeout.
    pub fn evict_idle(&self, now_us: i64) -> usize {
        self.sessions
            .evict_idle(now_us, self.config.session.idle_timeout_sec)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Secondary gates applied before a looking-away candidate may emit: the
    /// turn must be genuinely horizontal (not nodding), the raw angles and
    /// baseline numerically sane, and the mesh trustworthy.
    fn passes_emission_gates(
        &self,
        pose: &HeadPose,
        assessment: &GazeAssessment,
        baseline: PoseBaseline,
        landmark_count: usize,
    ) -> bool {
        let cfg = &self.config.gaze;
        let plausible_pose =
            pose.pitch.abs() < cfg.max_plausible_angle && pose.yaw.abs() < cfg.max_plausible_angle;
        let plausible_baseline = baseline.pitch.abs() < cfg.max_plausible_baseline
            && baseline.yaw.abs() < cfg.max_plausible_baseline;
        let trusted_mesh = landmark_count > cfg.min_landmarks;
        let horizontal_turn = assessment.yaw_offset > cfg.min_yaw_offset
            && assessment.pitch_offset < cfg.max_nod_pitch_offset;
        plausible_pose && plausible_baseline && trusted_mesh && horizontal_turn
    }
}

fn ensure_valid(frame: &Frame) -> Result<(), EngineError> {
    if frame.is_valid() {
        Ok(())
    } else {
        Err(EngineError::InvalidFrame(format!(
            "{}x{} with {} bytes",
            frame.width,
            frame.height,
            frame.data.len()
        )))
    }
}

fn looking_away_event(
    assessment: &GazeAssessment,
    config: &EngineConfig,
    now_us: i64,
) -> ViolationEvent {
    let (severity, descriptor) = if assessment.confidence >= config.gaze.severity_gate {
        (Severity::High, "clearly looking away")
    } else {
        (Severity::Medium, "appears to be looking away")
    };
    let mut event = ViolationEvent::new(
        ViolationType::LookingAway,
        severity,
        format!(
            "Student {} - head turned {:.1}° horizontally, {:.1}° vertically (confidence: {:.2})",
            descriptor, assessment.yaw_offset, assessment.pitch_offset, assessment.confidence
        ),
        assessment.confidence,
        now_us,
    );
    event.pitch_offset = Some(assessment.pitch_offset);
    event.yaw_offset = Some(assessment.yaw_offset);
    event
}

/// Burn bounding boxes into a copy of the frame for evidence. Annotation
/// never touches detection state.
fn annotate(frame: &Frame, presence: &ObjectPresence) -> Frame {
    let mut annotated = frame.clone();
    if let Some(phone) = &presence.phone {
        annotated.draw_rect(phone.bbox, PHONE_BOX_COLOR, BOX_THICKNESS);
    }
    if let Some(book) = &presence.book {
        annotated.draw_rect(book.bbox, BOOK_BOX_COLOR, BOX_THICKNESS);
    }
    annotated
}
