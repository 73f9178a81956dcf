//! # Disparity decomposition
//!
//! Splits the raw 2D disparity of a feature into contributions along the camera's translational
//! axes (x, y and z) and rotational axes (roll, yaw and pitch).
//!
//! The frame center is used as the vanishing point. Apparent motion caused by forward or
//! backward translation points along the line between a feature and the vanishing point, while
//! roll moves features perpendicular to it.

use crate::error::{ParallaxError, ParallaxResult};
use crate::geometry::{perpendicular, radial_direction};
use nalgebra as na;

/// Disparity split along the six camera motion axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisparityDecomposition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub roll: f64,
    pub yaw: f64,
    pub pitch: f64,
}

impl DisparityDecomposition {
    /// Translational components as `[x, y, z]`.
    pub fn translational(&self) -> na::Vector3<f64> {
        na::Vector3::new(self.x, self.y, self.z)
    }

    /// Rotational components as `[pitch, yaw, roll]`.
    ///
    /// The ordering matches the axis ordering of angular velocity vectors.
    pub fn rotational(&self) -> na::Vector3<f64> {
        na::Vector3::new(self.pitch, self.yaw, self.roll)
    }
}

/// Decompose a feature's disparity into per-axis contributions.
///
/// # Arguments
///
/// * `previous` - position of the feature in the previous frame.
/// * `disparity` - displacement of the feature since the previous frame.
/// * `center` - vanishing point of the frame.
///
/// # Errors
///
/// Returns [`ParallaxError::DegenerateRadialVector`] if `previous` is exactly at `center`.
///
/// # Examples
///
/// ```
/// use parallax::disparity::decompose;
/// use nalgebra as na;
///
/// let d = decompose(
///     na::Point2::new(340.0, 180.0),
///     na::Vector2::new(1.0, 0.0),
///     na::Point2::new(320.0, 180.0),
/// )
/// .unwrap();
///
/// assert_eq!((d.x, d.y, d.z), (-1.0, 0.0, 1.0));
/// ```
pub fn decompose(
    previous: na::Point2<f64>,
    disparity: na::Vector2<f64>,
    center: na::Point2<f64>,
) -> ParallaxResult<DisparityDecomposition> {
    let radial =
        radial_direction(previous, center).ok_or(ParallaxError::DegenerateRadialVector)?;

    // Camera motion to the right/up shows up as pixel motion to the left/down.
    let x = -disparity.x;
    let y = -disparity.y;
    let z = radial.x * x + radial.y * y;

    let perp = perpendicular(radial);
    let roll = perp.x * x + perp.y * y;

    // Yaw and pitch reuse the raw translational components.
    let yaw = x;
    let pitch = y;

    Ok(DisparityDecomposition {
        x,
        y,
        z,
        roll,
        yaw,
        pitch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn center() -> na::Point2<f64> {
        na::Point2::new(320.0, 180.0)
    }

    #[test]
    fn receding_along_radial() {
        let previous = na::Point2::new(340.0, 180.0);
        let d = decompose(previous, na::Vector2::new(1.0, 0.0), center()).unwrap();

        assert_eq!(d.x, -1.0);
        assert_eq!(d.y, 0.0);
        assert_eq!(d.z, 1.0);
        assert_eq!(d.yaw, -1.0);
        assert_eq!(d.pitch, 0.0);
        assert_approx_eq!(d.roll, 0.0);
    }

    #[test]
    fn tangential_motion_is_roll() {
        // Feature above the center moving horizontally.
        let previous = na::Point2::new(320.0, 80.0);
        let d = decompose(previous, na::Vector2::new(2.0, 0.0), center()).unwrap();

        // radial = (0, 1), perpendicular = (1, 0)
        assert_approx_eq!(d.z, 0.0);
        assert_approx_eq!(d.roll, -2.0);
    }

    #[test]
    fn diagonal_split() {
        let previous = na::Point2::new(330.0, 190.0);
        let disparity = na::Vector2::new(3.0, -1.0);
        let d = decompose(previous, disparity, center()).unwrap();

        let r = std::f64::consts::FRAC_1_SQRT_2;
        assert_approx_eq!(d.z, -r * -3.0 + -r * 1.0, 1e-12);
        assert_approx_eq!(d.roll, -r * -3.0 + r * 1.0, 1e-12);
        // Radial and perpendicular components preserve the disparity's length.
        assert_approx_eq!(d.z.hypot(d.roll), disparity.norm(), 1e-12);
    }

    #[test]
    fn degenerate_at_center() {
        for disparity in [na::Vector2::zeros(), na::Vector2::new(5.0, -3.0)] {
            assert_eq!(
                decompose(center(), disparity, center()),
                Err(ParallaxError::DegenerateRadialVector)
            );
        }
    }

    #[test]
    fn vector_views() {
        let d = DisparityDecomposition {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            roll: 4.0,
            yaw: 5.0,
            pitch: 6.0,
        };

        assert_eq!(d.translational(), na::Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(d.rotational(), na::Vector3::new(6.0, 5.0, 4.0));
    }
}
