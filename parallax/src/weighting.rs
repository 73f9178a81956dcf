//! # Ego-motion weighting

use crate::disparity::DisparityDecomposition;
use nalgebra as na;

/// Snapshot of the camera's translational and rotational velocity.
///
/// Angular velocity is laid out as `[pitch, yaw, roll]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EgoMotion {
    pub velocity: na::Vector3<f64>,
    pub angular_velocity: na::Vector3<f64>,
}

impl EgoMotion {
    pub fn new(velocity: na::Vector3<f64>, angular_velocity: na::Vector3<f64>) -> Self {
        Self {
            velocity,
            angular_velocity,
        }
    }

    /// Pure translation with no rotation.
    pub fn translation(velocity: na::Vector3<f64>) -> Self {
        Self::new(velocity, na::Vector3::zeros())
    }

    /// Whether the camera is not moving along any axis.
    pub fn is_stationary(&self) -> bool {
        self.velocity == na::Vector3::zeros() && self.angular_velocity == na::Vector3::zeros()
    }
}

/// Weight each axis of the disparity by the camera's velocity along it.
///
/// The result is the dot product of `[x, y, z]` with the translational velocity plus the dot
/// product of `[pitch, yaw, roll]` with the angular velocity. It is large when the observed
/// motion agrees with what the ego-motion predicts, and zero when the two are orthogonal. Zero is
/// a valid output.
///
/// # Arguments
///
/// * `decomposition` - per-axis disparity of the feature.
/// * `ego` - current camera velocities.
pub fn weight_disparity(decomposition: &DisparityDecomposition, ego: &EgoMotion) -> f64 {
    decomposition.x * ego.velocity.x
        + decomposition.y * ego.velocity.y
        + decomposition.z * ego.velocity.z
        + decomposition.pitch * ego.angular_velocity.x
        + decomposition.yaw * ego.angular_velocity.y
        + decomposition.roll * ego.angular_velocity.z
}
