//! # Camera state
//!
//! Pinhole camera with known ego-motion. The camera's position is advanced by explicit Euler
//! integration once per frame. Its velocities are set externally.

use crate::error::{ParallaxError, ParallaxResult};
use crate::resolver::ResolveParams;
use crate::weighting::EgoMotion;
use nalgebra as na;

/// Coordinate space of the produced points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
pub enum OutputSpace {
    /// Relative to the camera.
    Camera,
    /// Camera-space points offset by the camera's position.
    World,
}

impl Default for OutputSpace {
    fn default() -> Self {
        Self::World
    }
}

/// Camera configuration.
///
/// Missing fields fall back to their defaults when deserializing.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CameraConfig {
    pub focal_length: f64,
    pub frame_size: (usize, usize),
    pub position: (f64, f64, f64),
    pub velocity: (f64, f64, f64),
    pub rotation: (f64, f64, f64),
    pub angular_velocity: (f64, f64, f64),
    pub output_space: OutputSpace,
    /// Integration step in seconds used when no other timing source is available.
    pub time_step: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            focal_length: 38.199,
            frame_size: (640, 360),
            position: (0.0, 0.0, 0.0),
            velocity: (0.0, 0.0, 0.0),
            rotation: (0.0, 0.0, 0.0),
            angular_velocity: (0.0, 0.0, 0.0),
            output_space: OutputSpace::default(),
            time_step: 1.0 / 20.0,
        }
    }
}

impl CameraConfig {
    /// Check that the configuration describes a usable camera.
    pub fn validate(&self) -> ParallaxResult<()> {
        if !self.focal_length.is_finite() || self.focal_length <= 0.0 {
            return Err(ParallaxError::InvalidConfig(format!(
                "focal length must be positive, got {}",
                self.focal_length
            )));
        }

        if self.frame_size.0 == 0 || self.frame_size.1 == 0 {
            return Err(ParallaxError::InvalidConfig(format!(
                "frame size must be non-zero, got {}x{}",
                self.frame_size.0, self.frame_size.1
            )));
        }

        if !self.time_step.is_finite() {
            return Err(ParallaxError::InvalidConfig(format!(
                "time step must be finite, got {}",
                self.time_step
            )));
        }

        Ok(())
    }
}

fn vec3((x, y, z): (f64, f64, f64)) -> na::Vector3<f64> {
    na::Vector3::new(x, y, z)
}

/// State of the moving camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    position: na::Vector3<f64>,
    velocity: na::Vector3<f64>,
    // Stored, but not used in any of the depth computations.
    rotation: na::Vector3<f64>,
    angular_velocity: na::Vector3<f64>,
    focal_length: f64,
    frame_size: (usize, usize),
    center: na::Point2<f64>,
}

impl Default for CameraState {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl CameraState {
    /// Create a new camera.
    ///
    /// # Errors
    ///
    /// Returns [`ParallaxError::InvalidConfig`] if the configuration fails validation.
    pub fn new(config: &CameraConfig) -> ParallaxResult<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: &CameraConfig) -> Self {
        let (w, h) = config.frame_size;

        Self {
            position: vec3(config.position),
            velocity: vec3(config.velocity),
            rotation: vec3(config.rotation),
            angular_velocity: vec3(config.angular_velocity),
            focal_length: config.focal_length,
            frame_size: config.frame_size,
            center: na::Point2::new(w as f64 / 2.0, h as f64 / 2.0),
        }
    }

    /// Advance the camera's position by a single Euler step.
    ///
    /// # Arguments
    ///
    /// * `dt` - elapsed time in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ParallaxError::InvalidTimeStep`] and leaves the state untouched if `dt` is not
    /// finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use parallax::prelude::v1::*;
    /// use nalgebra as na;
    ///
    /// let mut camera = CameraState::default();
    /// camera.set_velocity(na::Vector3::new(0.0, 0.0, 1.0));
    /// camera.advance(0.05).unwrap();
    ///
    /// assert_eq!(camera.position(), na::Vector3::new(0.0, 0.0, 0.05));
    /// ```
    pub fn advance(&mut self, dt: f64) -> ParallaxResult<()> {
        if !dt.is_finite() {
            return Err(ParallaxError::InvalidTimeStep(dt));
        }

        self.position += self.velocity * dt;

        Ok(())
    }

    /// Replace the translational velocity.
    pub fn set_velocity(&mut self, velocity: na::Vector3<f64>) {
        self.velocity = velocity;
    }

    /// Replace the rotational velocity.
    pub fn set_angular_velocity(&mut self, angular_velocity: na::Vector3<f64>) {
        self.angular_velocity = angular_velocity;
    }

    pub fn position(&self) -> na::Vector3<f64> {
        self.position
    }

    pub fn velocity(&self) -> na::Vector3<f64> {
        self.velocity
    }

    pub fn rotation(&self) -> na::Vector3<f64> {
        self.rotation
    }

    pub fn angular_velocity(&self) -> na::Vector3<f64> {
        self.angular_velocity
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn frame_size(&self) -> (usize, usize) {
        self.frame_size
    }

    /// Vanishing point of the frame, always half of the frame size.
    pub fn center(&self) -> na::Point2<f64> {
        self.center
    }

    /// Current velocities of the camera.
    pub fn ego_motion(&self) -> EgoMotion {
        EgoMotion::new(self.velocity, self.angular_velocity)
    }

    /// Offset to add to camera-space points for the given output space.
    pub fn world_offset(&self, space: OutputSpace) -> Option<na::Vector3<f64>> {
        match space {
            OutputSpace::Camera => None,
            OutputSpace::World => Some(self.position),
        }
    }

    /// Snapshot of the parameters needed to resolve features of the current frame.
    pub fn resolve_params(&self, space: OutputSpace) -> ResolveParams {
        ResolveParams {
            frame_size: self.frame_size,
            center: self.center,
            focal_length: self.focal_length,
            ego: self.ego_motion(),
            world_offset: self.world_offset(space),
        }
    }
}
