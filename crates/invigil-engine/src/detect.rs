//! External Detector Collaborators
//!
//! The engine never runs models itself; face and object detection are
//! pluggable backends implementing these traits (MediaPipe via FFI, ONNX
//! sessions, remote services). Calls are synchronous from the engine's
//! perspective; backend batching or GPU scheduling is the backend's concern.

use invigil_signals::{FaceLandmarks, Frame};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detector unavailable: {0}")]
    Unavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Per-frame face analysis: how many faces, and a landmark set per face.
#[derive(Debug, Clone, Default)]
pub struct FaceObservation {
    pub count: usize,
    /// One normalized landmark set per detected face, best face first.
    pub landmarks: Vec<FaceLandmarks>,
}

/// One raw object detection from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
    /// Backend class label, e.g. "cell phone"
    pub label: String,
    /// Detection confidence in 0..1
    pub confidence: f32,
    /// Bounding box `[x, y, width, height]` in pixels
    pub bbox: [f32; 4],
}

/// Pluggable face analysis backend.
pub trait FaceAnalyzer: Send + Sync {
    fn analyze(&self, frame: &Frame) -> Result<FaceObservation, DetectorError>;
}

/// Pluggable object detection backend.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<RawDetection>, DetectorError>;
}

/// No-op object detector for deployments without a model; the engine fails
/// open and reports no prohibited objects.
#[derive(Debug, Clone, Default)]
pub struct NullObjectDetector;

impl ObjectDetector for NullObjectDetector {
    fn detect(&self, _frame: &Frame) -> Result<Vec<RawDetection>, DetectorError> {
        Ok(Vec::new())
    }
}
