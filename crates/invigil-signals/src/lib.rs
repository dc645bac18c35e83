//! # invigil-signals
//!
//! Geometry and frame primitives for the invigil proctoring engine.
//!
//! This crate provides:
//! - **Landmark types**: MediaPipe face-mesh indices and normalized landmark sets
//! - **Head pose**: six-point perspective pose solve (pitch/yaw/roll in degrees)
//! - **Frame**: raw RGB8 frame wrapper with luma and annotation helpers
//!
//! ## Example
//!
//! ```ignore
//! use invigil_signals::{estimate_head_pose, FaceLandmarks};
//!
//! let landmarks = FaceLandmarks::from_normalized(points);
//! if let Some(pose) = estimate_head_pose(&landmarks, 1280, 720) {
//!     println!("yaw: {:.1} deg", pose.yaw);
//! }
//! ```

pub mod frame;
pub mod head_pose;
pub mod landmarks;

pub use frame::Frame;
pub use head_pose::{estimate_head_pose, HeadPose};
pub use landmarks::{indices, FaceLandmarks};
