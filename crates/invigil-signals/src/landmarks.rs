//! MediaPipe Face Mesh Landmark Indices and Set Type
//!
//! Landmarks arrive from the external face analyzer in normalized image
//! coordinates (0..1 on both axes), one fixed-length ordered list per face.

use serde::{Deserialize, Serialize};

/// Number of points in a complete MediaPipe face mesh.
pub const FACE_MESH_POINTS: usize = 468;

/// MediaPipe Face Mesh 468 landmark indices
pub mod indices {
    /// Nose tip (pose solve anchor)
    pub const NOSE_TIP: usize = 1;
    /// Chin center
    pub const CHIN: usize = 152;
    /// Top of forehead (hairline)
    pub const FOREHEAD_TOP: usize = 10;
    /// Left eye outer corner
    pub const LEFT_EYE_OUTER: usize = 33;
    /// Right eye outer corner
    pub const RIGHT_EYE_OUTER: usize = 263;
    /// Left mouth corner
    pub const LEFT_MOUTH_CORNER: usize = 61;
    /// Right mouth corner
    pub const RIGHT_MOUTH_CORNER: usize = 291;
    /// Left cheekbone (widest point)
    pub const LEFT_CHEEKBONE: usize = 234;
    /// Right cheekbone
    pub const RIGHT_CHEEKBONE: usize = 454;

    /// Left eye contour ring
    pub const LEFT_EYE_RING: [usize; 16] = [
        33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
    ];
    /// Right eye contour ring
    pub const RIGHT_EYE_RING: [usize; 16] = [
        362, 382, 381, 380, 374, 373, 390, 249, 263, 466, 388, 387, 386, 385, 384, 398,
    ];
}

/// One face's landmark set in normalized image coordinates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceLandmarks {
    /// Normalized points, `[x, y]` each in 0..1
    pub points: Vec<[f32; 2]>,
}

impl FaceLandmarks {
    /// Wrap a normalized point list.
    pub fn from_normalized(points: Vec<[f32; 2]>) -> Self {
        Self { points }
    }

    /// Whether the set carries a complete face mesh.
    pub fn is_complete(&self) -> bool {
        self.points.len() >= FACE_MESH_POINTS
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get a landmark by index, if present.
    pub fn point(&self, idx: usize) -> Option<[f32; 2]> {
        self.points.get(idx).copied()
    }

    /// Mean position of a landmark group. `None` if any index is missing.
    pub fn mean_of(&self, group: &[usize]) -> Option<[f32; 2]> {
        if group.is_empty() {
            return None;
        }
        let mut sum = [0.0f32; 2];
        for &idx in group {
            let p = self.point(idx)?;
            sum[0] += p[0];
            sum[1] += p[1];
        }
        let inv = 1.0 / group.len() as f32;
        Some([sum[0] * inv, sum[1] * inv])
    }
}
