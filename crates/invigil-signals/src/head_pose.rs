//! Head Pose Estimation
//!
//! Solves camera-relative head orientation from six facial landmarks
//! (nose tip, chin, eye outer corners, mouth corners) paired with a fixed
//! anthropometric 3D model. Pinhole camera: focal length equal to the frame
//! width, principal point at the frame center, zero lens distortion.
//!
//! The solve is a damped Gauss-Newton minimization of reprojection error over
//! rotation (axis-angle) and translation. Pure and deterministic; degenerate
//! landmark configurations and non-converging solves report as `None`.

use nalgebra::{Rotation3, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

use crate::landmarks::{indices, FaceLandmarks};

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HeadPose {
    /// Rotation about the horizontal axis (up/down tilt)
    pub pitch: f32,
    /// Rotation about the vertical axis (left/right turn)
    pub yaw: f32,
    /// In-plane rotation
    pub roll: f32,
}

/// Landmark order for the solve.
const SOLVE_INDICES: [usize; 6] = [
    indices::NOSE_TIP,
    indices::CHIN,
    indices::LEFT_EYE_OUTER,
    indices::RIGHT_EYE_OUTER,
    indices::LEFT_MOUTH_CORNER,
    indices::RIGHT_MOUTH_CORNER,
];

/// Canonical anthropometric face model, camera-aligned axes (x right, y down,
/// z into the scene), nose tip at the origin. Units are millimeters-ish; only
/// ratios matter for orientation.
const FACE_MODEL: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],       // nose tip
    [0.0, 330.0, 65.0],    // chin
    [-225.0, -170.0, 135.0], // left eye outer corner
    [225.0, -170.0, 135.0],  // right eye outer corner
    [-150.0, 150.0, 125.0],  // left mouth corner
    [150.0, 150.0, 125.0],   // right mouth corner
];

/// Distance between the model eye corners, used to seed depth.
const MODEL_EYE_SPAN: f64 = 450.0;

const MAX_ITERATIONS: usize = 40;
const MAX_DAMPING: f64 = 1e10;

type Params = SVector<f64, 6>;
type Residuals = SVector<f64, 12>;
type Jacobian = SMatrix<f64, 12, 6>;

/// Estimate head pose from a landmark set and frame dimensions.
///
/// Returns `None` when the required landmarks are missing or non-finite, the
/// point configuration is degenerate, or the solve does not converge.
pub fn estimate_head_pose(landmarks: &FaceLandmarks, width: u32, height: u32) -> Option<HeadPose> {
    if width == 0 || height == 0 {
        return None;
    }
    let w = width as f64;
    let h = height as f64;

    let mut observed = Residuals::zeros();
    for (i, &idx) in SOLVE_INDICES.iter().enumerate() {
        let p = landmarks.point(idx)?;
        if !p[0].is_finite() || !p[1].is_finite() {
            return None;
        }
        observed[2 * i] = p[0] as f64 * w;
        observed[2 * i + 1] = p[1] as f64 * h;
    }

    let focal = w;
    let cx = w / 2.0;
    let cy = h / 2.0;

    // Seed depth from the observed eye-corner span; a collapsed span means the
    // configuration cannot constrain the solve.
    let ex = observed[4] - observed[6];
    let ey = observed[5] - observed[7];
    let eye_span = (ex * ex + ey * ey).sqrt();
    if eye_span < 1.0 {
        log::debug!("head pose solve rejected: degenerate eye span {eye_span:.3}px");
        return None;
    }
    let z0 = (focal * MODEL_EYE_SPAN / eye_span).clamp(50.0, 100_000.0);
    let x0 = (observed[0] - cx) * z0 / focal;
    let y0 = (observed[1] - cy) * z0 / focal;

    let mut params = Params::from_column_slice(&[0.0, 0.0, 0.0, x0, y0, z0]);
    let (mut res, mut cost) = project_residuals(&params, &observed, focal, cx, cy)?;

    let mut lambda = 1e-3;
    for _ in 0..MAX_ITERATIONS {
        let jac = numeric_jacobian(&params, &res, &observed, focal, cx, cy)?;
        let jtj = jac.transpose() * jac;
        let jtr = jac.transpose() * res;

        let mut stepped = false;
        while lambda <= MAX_DAMPING {
            let mut damped = jtj;
            for d in 0..6 {
                damped[(d, d)] += lambda * jtj[(d, d)].max(1e-9);
            }
            let Some(chol) = damped.cholesky() else {
                lambda *= 10.0;
                continue;
            };
            let delta = chol.solve(&-jtr);
            let candidate = params + delta;
            match project_residuals(&candidate, &observed, focal, cx, cy) {
                Some((r_new, c_new)) if c_new < cost => {
                    params = candidate;
                    res = r_new;
                    cost = c_new;
                    lambda = (lambda * 0.3).max(1e-12);
                    stepped = true;
                    break;
                }
                _ => lambda *= 10.0,
            }
        }
        if !stepped {
            break;
        }
        if cost < 1e-8 {
            break;
        }
    }

    // Reject fits that never settled near the observations.
    let rms = (cost / 12.0).sqrt();
    if !rms.is_finite() || rms > 0.05 * w {
        log::debug!("head pose solve rejected: rms reprojection error {rms:.2}px");
        return None;
    }

    let rot = Rotation3::from_scaled_axis(Vector3::new(params[0], params[1], params[2]));
    let (rx, ry, rz) = rot.euler_angles();
    Some(HeadPose {
        pitch: rx.to_degrees() as f32,
        yaw: ry.to_degrees() as f32,
        roll: rz.to_degrees() as f32,
    })
}

/// Reprojection residuals for the current parameters, or `None` if any model
/// point lands behind the camera.
fn project_residuals(
    params: &Params,
    observed: &Residuals,
    focal: f64,
    cx: f64,
    cy: f64,
) -> Option<(Residuals, f64)> {
    let rot = Rotation3::from_scaled_axis(Vector3::new(params[0], params[1], params[2]));
    let t = Vector3::new(params[3], params[4], params[5]);

    let mut res = Residuals::zeros();
    for (i, m) in FACE_MODEL.iter().enumerate() {
        let cam = rot * Vector3::new(m[0], m[1], m[2]) + t;
        if cam.z < 1.0 {
            return None;
        }
        let u = focal * cam.x / cam.z + cx;
        let v = focal * cam.y / cam.z + cy;
        res[2 * i] = u - observed[2 * i];
        res[2 * i + 1] = v - observed[2 * i + 1];
    }
    let cost = res.norm_squared();
    if !cost.is_finite() {
        return None;
    }
    Some((res, cost))
}

fn numeric_jacobian(
    params: &Params,
    res: &Residuals,
    observed: &Residuals,
    focal: f64,
    cx: f64,
    cy: f64,
) -> Option<Jacobian> {
    let mut jac = Jacobian::zeros();
    for j in 0..6 {
        let eps = if j < 3 { 1e-6 } else { 1e-3 };
        let mut perturbed = *params;
        perturbed[j] += eps;
        let (r2, _) = project_residuals(&perturbed, observed, focal, cx, cy)?;
        jac.set_column(j, &((r2 - *res) / eps));
    }
    Some(jac)
}
