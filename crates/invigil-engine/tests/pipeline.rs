//! End-to-end orchestration scenarios with scripted detector backends.

use std::sync::Arc;

use invigil_engine::detect::NullObjectDetector;
use invigil_engine::{
    DetectorError, EngineConfig, FaceAnalyzer, FaceObservation, ObjectDetector, ProctorEngine,
    RawDetection, Severity, ViolationType,
};
use invigil_signals::{FaceLandmarks, Frame};

const SEC: i64 = 1_000_000;
const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

/// Face analyzer driven by a closure over the frame.
struct FnFaces<F>(F);

impl<F> FaceAnalyzer for FnFaces<F>
where
    F: Fn(&Frame) -> FaceObservation + Send + Sync,
{
    fn analyze(&self, frame: &Frame) -> Result<FaceObservation, DetectorError> {
        Ok((self.0)(frame))
    }
}

/// Object detector driven by a closure over the frame.
struct FnObjects<F>(F);

impl<F> ObjectDetector for FnObjects<F>
where
    F: Fn(&Frame) -> Vec<RawDetection> + Send + Sync,
{
    fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError> {
        Ok((self.0)(frame))
    }
}

fn lit_frame(timestamp_us: i64) -> Frame {
    Frame::new(
        vec![128u8; (WIDTH * HEIGHT * 3) as usize],
        WIDTH,
        HEIGHT,
        timestamp_us,
    )
}

/// Anthropometric model in camera-aligned axes, matching the engine's solve.
const FACE_MODEL: [[f32; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, 330.0, 65.0],
    [-225.0, -170.0, 135.0],
    [225.0, -170.0, 135.0],
    [-150.0, 150.0, 125.0],
    [150.0, 150.0, 125.0],
];
const SOLVE_INDICES: [usize; 6] = [1, 152, 33, 263, 61, 291];

/// Project the face model turned `yaw_deg` about the vertical axis into a
/// normalized landmark set.
fn turned_face_landmarks(yaw_deg: f32) -> FaceLandmarks {
    let (sin, cos) = yaw_deg.to_radians().sin_cos();
    let focal = WIDTH as f32;
    let cx = WIDTH as f32 / 2.0;
    let cy = HEIGHT as f32 / 2.0;

    let mut points = vec![[0.5f32, 0.5f32]; 468];
    for (i, m) in FACE_MODEL.iter().enumerate() {
        let x = m[0] * cos + m[2] * sin;
        let y = m[1];
        let z = -m[0] * sin + m[2] * cos + 1400.0;
        let u = focal * x / z + cx;
        let v = focal * y / z + cy;
        points[SOLVE_INDICES[i]] = [u / WIDTH as f32, v / HEIGHT as f32];
    }
    FaceLandmarks::from_normalized(points)
}

fn single_face(landmarks: FaceLandmarks) -> FaceObservation {
    FaceObservation {
        count: 1,
        landmarks: vec![landmarks],
    }
}

fn phone(confidence: f32) -> RawDetection {
    RawDetection {
        label: "cell phone".into(),
        confidence,
        bbox: [100.0, 120.0, 80.0, 140.0],
    }
}

#[test]
fn multiple_faces_throttled_across_frames() {
    let faces = FnFaces(|_: &Frame| FaceObservation {
        count: 3,
        landmarks: Vec::new(),
    });
    let engine = ProctorEngine::new(
        EngineConfig::default(),
        Arc::new(faces),
        Arc::new(NullObjectDetector),
    );

    let first = engine.process_frame("exam-1", &lit_frame(0)).unwrap();
    assert!(first.multiple_faces);
    assert_eq!(first.violations.len(), 1);
    assert_eq!(first.violations[0].violation_type, ViolationType::MultipleFaces);
    assert_eq!(first.violations[0].severity, Severity::High);
    assert_eq!(first.violations[0].message, "3 people detected in frame");

    // Within the cooldown: the flag persists, the event does not repeat
    let second = engine.process_frame("exam-1", &lit_frame(5 * SEC)).unwrap();
    assert!(second.multiple_faces);
    assert!(second.violations.is_empty());

    // Past the cooldown it may fire again
    let third = engine.process_frame("exam-1", &lit_frame(13 * SEC)).unwrap();
    assert_eq!(third.violations.len(), 1);
}

#[test]
fn black_frame_suppresses_no_person() {
    let faces = FnFaces(|_: &Frame| FaceObservation::default());
    let engine = ProctorEngine::new(
        EngineConfig::default(),
        Arc::new(faces),
        Arc::new(NullObjectDetector),
    );

    let report = engine.process_frame("exam-1", &Frame::empty(WIDTH, HEIGHT, 0)).unwrap();
    assert!(report.black_screen);
    assert!(!report.no_person);
    assert!(report.violations.is_empty());

    // The same empty seat under normal lighting does flag
    let report = engine.process_frame("exam-1", &lit_frame(SEC)).unwrap();
    assert!(!report.black_screen);
    assert!(report.no_person);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].violation_type, ViolationType::NoPerson);
}

#[test]
fn looking_away_fires_after_calibration() {
    let faces = FnFaces(|frame: &Frame| {
        if frame.timestamp_us == 0 {
            single_face(turned_face_landmarks(0.0))
        } else {
            single_face(turned_face_landmarks(58.0))
        }
    });
    let engine = ProctorEngine::new(
        EngineConfig::default(),
        Arc::new(faces),
        Arc::new(NullObjectDetector),
    );

    let baseline_pose = engine.calibrate("exam-1", &lit_frame(0)).unwrap();
    assert!(baseline_pose.yaw.abs() < 1.0);
    assert!(baseline_pose.pitch.abs() < 1.0);

    let report = engine.process_frame("exam-1", &lit_frame(SEC)).unwrap();
    assert!(report.looking_away);
    let pose = report.head_pose.unwrap();
    assert!((pose.yaw - 58.0).abs() < 2.0, "yaw {}", pose.yaw);

    assert_eq!(report.violations.len(), 1);
    let event = &report.violations[0];
    assert_eq!(event.violation_type, ViolationType::LookingAway);
    assert!(event.confidence >= 0.98);
    assert_eq!(event.severity, Severity::Medium);
    assert!(event.yaw_offset.unwrap() > 50.0);

    // Still turned one second later: state persists, emission is throttled
    let report = engine.process_frame("exam-1", &lit_frame(2 * SEC)).unwrap();
    assert!(report.looking_away);
    assert!(report.violations.is_empty());
}

#[test]
fn frontal_pose_stays_clean() {
    let faces = FnFaces(|_: &Frame| single_face(turned_face_landmarks(0.0)));
    let engine = ProctorEngine::new(
        EngineConfig::default(),
        Arc::new(faces),
        Arc::new(NullObjectDetector),
    );

    engine.calibrate("exam-1", &lit_frame(0)).unwrap();
    let report = engine.process_frame("exam-1", &lit_frame(SEC)).unwrap();
    assert!(!report.looking_away);
    assert!(report.violations.is_empty());
    assert_eq!(report.face_count, 1);
}

#[test]
fn phone_violation_round_trip() {
    let engine = ProctorEngine::new(
        EngineConfig::default(),
        Arc::new(FnFaces(|_: &Frame| FaceObservation::default())),
        Arc::new(FnObjects(|_: &Frame| vec![phone(0.72)])),
    );

    let black = Frame::empty(WIDTH, HEIGHT, 0);
    let first = engine.process_frame("exam-1", &black).unwrap();
    assert!(first.phone_detected);
    assert_eq!(first.violations.len(), 1);
    let event = &first.violations[0];
    assert_eq!(event.violation_type, ViolationType::PhoneDetected);
    assert_eq!(event.message, "Mobile phone detected with 0.72 confidence");
    assert!((event.confidence - 0.72).abs() < 1e-4);

    // Immediate second call: already-fired type yields an empty batch
    let second = engine
        .process_frame("exam-1", &Frame::empty(WIDTH, HEIGHT, 100_000))
        .unwrap();
    assert!(second.phone_detected);
    assert!(second.violations.is_empty());
}

#[test]
fn book_mapping_suppressed_unless_enabled() {
    let book = RawDetection {
        label: "book".into(),
        confidence: 0.8,
        bbox: [10.0, 10.0, 60.0, 90.0],
    };

    let make_engine = |emit_books: bool| {
        let mut config = EngineConfig::default();
        config.objects.emit_book_violations = emit_books;
        let book = book.clone();
        ProctorEngine::new(
            config,
            Arc::new(FnFaces(|_: &Frame| FaceObservation::default())),
            Arc::new(FnObjects(move |_: &Frame| vec![book.clone()])),
        )
    };

    let suppressed = make_engine(false);
    let report = suppressed.process_frame("exam-1", &Frame::empty(WIDTH, HEIGHT, 0)).unwrap();
    assert!(!report.book_detected);
    assert!(report.violations.is_empty());

    let enabled = make_engine(true);
    let report = enabled.process_frame("exam-1", &Frame::empty(WIDTH, HEIGHT, 0)).unwrap();
    assert!(report.book_detected);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].violation_type, ViolationType::BookDetected);
    assert_eq!(report.violations[0].severity, Severity::Medium);
}

#[test]
fn snapshot_gate_holds_four_seconds() {
    // Short cooldown so a phone violation lands on every frame; only the
    // snapshot gate limits evidence.
    let mut config = EngineConfig::default();
    config.throttle.cooldown_sec = 0.5;

    let engine = ProctorEngine::new(
        config,
        Arc::new(FnFaces(|_: &Frame| FaceObservation::default())),
        Arc::new(FnObjects(|_: &Frame| vec![phone(0.9)])),
    );

    let mut snapshot_times = Vec::new();
    for i in 0..7 {
        let now = i * SEC;
        let report = engine
            .process_frame("exam-1", &Frame::empty(WIDTH, HEIGHT, now))
            .unwrap();
        assert!(!report.violations.is_empty(), "frame at {now}");
        if report.snapshot.is_some() {
            snapshot_times.push(now);
        }
    }
    assert_eq!(snapshot_times, vec![0, 4 * SEC]);
}

#[test]
fn snapshot_carries_burned_in_box() {
    let engine = ProctorEngine::new(
        EngineConfig::default(),
        Arc::new(FnFaces(|_: &Frame| FaceObservation::default())),
        Arc::new(FnObjects(|_: &Frame| vec![phone(0.9)])),
    );

    let report = engine.process_frame("exam-1", &Frame::empty(WIDTH, HEIGHT, 0)).unwrap();
    let snapshot = report.snapshot.expect("evidence snapshot expected");

    // Box outline from the detection bbox, red on a black frame
    assert_eq!(snapshot.get_pixel(100, 120), [255, 0, 0]);
    // Interior untouched
    assert_eq!(snapshot.get_pixel(140, 190), [0, 0, 0]);
}

#[test]
fn sessions_do_not_share_throttle_state() {
    let engine = ProctorEngine::new(
        EngineConfig::default(),
        Arc::new(FnFaces(|_: &Frame| FaceObservation {
            count: 2,
            landmarks: Vec::new(),
        })),
        Arc::new(NullObjectDetector),
    );

    let a = engine.process_frame("exam-a", &lit_frame(0)).unwrap();
    assert_eq!(a.violations.len(), 1);

    // A different session fires immediately even though exam-a just did
    let b = engine.process_frame("exam-b", &lit_frame(1000)).unwrap();
    assert_eq!(b.violations.len(), 1);
}

#[test]
fn idle_eviction_resets_session_state() {
    let engine = ProctorEngine::new(
        EngineConfig::default(),
        Arc::new(FnFaces(|_: &Frame| FaceObservation {
            count: 2,
            landmarks: Vec::new(),
        })),
        Arc::new(NullObjectDetector),
    );

    let first = engine.process_frame("exam-1", &lit_frame(0)).unwrap();
    assert_eq!(first.violations.len(), 1);
    assert_eq!(engine.active_sessions(), 1);

    // Idle past the timeout, then evict
    assert_eq!(engine.evict_idle(700 * SEC), 1);
    assert_eq!(engine.active_sessions(), 0);

    // A fresh session fires immediately; the old cooldown is gone
    let report = engine.process_frame("exam-1", &lit_frame(701 * SEC)).unwrap();
    assert_eq!(report.violations.len(), 1);
}
