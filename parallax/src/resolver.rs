//! # Depth and position resolution
//!
//! Inverts the weighted disparity of a feature into a depth along the optical axis, and then
//! back-projects the feature's pixel through a pinhole model to get its camera-space position.

use crate::disparity::decompose;
use crate::error::{ParallaxError, ParallaxResult};
use crate::tracker::FeatureCorrespondence;
use crate::weighting::{weight_disparity, EgoMotion};
use nalgebra as na;

/// Scale applied to the weighted disparity before inverting it into depth.
///
/// Absorbs the unit mismatch between pixel-space disparity and velocity-space quantities.
pub const DEPTH_SCALE: f64 = 10.0;

/// Scale applied to back-projected lateral coordinates.
pub const UNIT_SCALE: f64 = 1000.0;

/// 3D point recovered from a single feature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeaturePoint3D {
    position: na::Point3<f64>,
    source_pixel: na::Point2<f64>,
    depth: f64,
}

impl FeaturePoint3D {
    /// Position in camera space, or world space if a world offset was applied.
    pub fn position(&self) -> na::Point3<f64> {
        self.position
    }

    /// Current-frame pixel the point was derived from.
    pub fn source_pixel(&self) -> na::Point2<f64> {
        self.source_pixel
    }

    /// Distance along the camera's optical axis, before any world offset.
    pub fn depth(&self) -> f64 {
        self.depth
    }
}

/// Everything `resolve` needs to know about the camera for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolveParams {
    /// Frame width and height in pixels.
    pub frame_size: (usize, usize),
    /// Vanishing point of the frame.
    pub center: na::Point2<f64>,
    pub focal_length: f64,
    pub ego: EgoMotion,
    /// Camera position to add to camera-space points. `None` keeps points in camera space.
    pub world_offset: Option<na::Vector3<f64>>,
}

/// Convert weighted disparity into a depth along the optical axis.
///
/// # Errors
///
/// Returns [`ParallaxError::NonFiniteDepth`] if the weighted disparity is zero, or the quotient is
/// otherwise not finite.
pub fn depth_from_weighted(weighted: f64, focal_length: f64) -> ParallaxResult<f64> {
    if weighted == 0.0 {
        return Err(ParallaxError::NonFiniteDepth { weighted });
    }

    let depth = focal_length / (weighted * DEPTH_SCALE);

    if depth.is_finite() {
        Ok(depth)
    } else {
        Err(ParallaxError::NonFiniteDepth { weighted })
    }
}

/// Back-project a pixel at a known depth into camera space.
///
/// # Arguments
///
/// * `pixel` - pixel coordinates of the feature.
/// * `depth` - distance along the optical axis.
/// * `frame_size` - width and height of the frame.
/// * `focal_length` - focal length of the camera.
pub fn back_project(
    pixel: na::Point2<f64>,
    depth: f64,
    frame_size: (usize, usize),
    focal_length: f64,
) -> na::Point3<f64> {
    let (w, h) = (frame_size.0 as f64, frame_size.1 as f64);

    let x = (pixel.x - w / 2.0) * depth / (focal_length * w) * UNIT_SCALE;
    let y = (pixel.y - h / 2.0) * depth / (focal_length * h) * UNIT_SCALE;

    na::Point3::new(x, y, depth)
}

/// Resolve the 3D position of a single tracked feature.
///
/// This is a pure function of its inputs.
///
/// # Arguments
///
/// * `correspondence` - previous and current pixel position of the feature.
/// * `params` - camera parameters and ego-motion for the frame.
///
/// # Errors
///
/// Fails with [`ParallaxError::DegenerateRadialVector`] if the previous pixel lies on the frame
/// center, and with [`ParallaxError::NonFiniteDepth`] if the ego-motion explains none of the
/// feature's motion.
///
/// # Examples
///
/// ```
/// # use assert_approx_eq::assert_approx_eq;
/// use parallax::prelude::v1::*;
/// use nalgebra as na;
///
/// let params = ResolveParams {
///     frame_size: (640, 360),
///     center: na::Point2::new(320.0, 180.0),
///     focal_length: 38.199,
///     ego: EgoMotion::translation(na::Vector3::new(0.0, 0.0, 1.0)),
///     world_offset: None,
/// };
///
/// let c = FeatureCorrespondence::new(
///     na::Point2::new(340.0, 180.0),
///     na::Point2::new(341.0, 180.0),
/// );
///
/// let point = resolve(&c, &params).unwrap();
///
/// assert_approx_eq!(point.depth(), 3.8199);
/// ```
pub fn resolve(
    correspondence: &FeatureCorrespondence,
    params: &ResolveParams,
) -> ParallaxResult<FeaturePoint3D> {
    let current = correspondence.current;
    let previous = correspondence.previous;

    let decomposition = decompose(previous, correspondence.disparity(), params.center)?;
    let weighted = weight_disparity(&decomposition, &params.ego);
    let depth = depth_from_weighted(weighted, params.focal_length)?;

    let position = back_project(current, depth, params.frame_size, params.focal_length);

    // Translation only, camera orientation is not applied.
    let position = match params.world_offset {
        Some(offset) => position + offset,
        None => position,
    };

    Ok(FeaturePoint3D {
        position,
        source_pixel: current,
        depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn params(ego: EgoMotion) -> ResolveParams {
        ResolveParams {
            frame_size: (640, 360),
            center: na::Point2::new(320.0, 180.0),
            focal_length: 38.199,
            ego,
            world_offset: None,
        }
    }

    fn forward() -> EgoMotion {
        EgoMotion::translation(na::Vector3::new(0.0, 0.0, 1.0))
    }

    fn corr(prev: (f64, f64), cur: (f64, f64)) -> FeatureCorrespondence {
        FeatureCorrespondence::new(
            na::Point2::new(prev.0, prev.1),
            na::Point2::new(cur.0, cur.1),
        )
    }

    #[test]
    fn reference_scenario() {
        let p = resolve(&corr((340.0, 180.0), (341.0, 180.0)), &params(forward())).unwrap();

        let depth = 38.199 / (1.0 * 10.0);
        assert_approx_eq!(p.depth(), 3.8199, 1e-6);

        let x = (341.0 - 640.0 / 2.0) * depth / (38.199 * 640.0) * 1000.0;
        let y = (180.0 - 360.0 / 2.0) * depth / (38.199 * 360.0) * 1000.0;

        assert_approx_eq!(p.position().x, x, 1e-6);
        assert_approx_eq!(p.position().y, y, 1e-6);
        assert_approx_eq!(p.position().z, depth, 1e-6);
        assert_approx_eq!(p.position().x, 3.28125, 1e-6);
        assert_eq!(p.source_pixel(), na::Point2::new(341.0, 180.0));
    }

    #[test]
    fn stationary_camera_fails() {
        let mut rng = StdRng::seed_from_u64(5);
        let params = params(EgoMotion::default());

        for _ in 0..100 {
            let c = corr(
                (rng.gen_range(0.0..640.0), rng.gen_range(0.0..360.0)),
                (rng.gen_range(0.0..640.0), rng.gen_range(0.0..360.0)),
            );
            assert_eq!(
                resolve(&c, &params),
                Err(ParallaxError::NonFiniteDepth { weighted: 0.0 })
            );
        }
    }

    #[test]
    fn center_pixel_fails() {
        let ego = EgoMotion::new(
            na::Vector3::new(0.3, -1.0, 2.0),
            na::Vector3::new(0.1, 0.2, 0.3),
        );

        for cur in [(320.0, 180.0), (400.0, 10.0), (-50.0, 900.0)] {
            assert_eq!(
                resolve(&corr((320.0, 180.0), cur), &params(ego)),
                Err(ParallaxError::DegenerateRadialVector)
            );
        }
    }

    #[test]
    fn receding_feature_has_positive_depth() {
        let center = na::Point2::new(320.0, 180.0);

        for (px, py) in [(400.0, 180.0), (100.0, 40.0), (330.0, 300.0), (10.0, 350.0)] {
            let previous = na::Point2::new(px, py);
            let outward = (previous - center).normalize();

            for magnitude in [0.5, 1.0, 4.0] {
                let current = previous + outward * magnitude;
                let c = FeatureCorrespondence::new(previous, current);
                let p = resolve(&c, &params(forward())).unwrap();
                assert!(p.depth() > 0.0 && p.depth().is_finite());
            }
        }
    }

    #[test]
    fn resolve_is_pure() {
        let ego = EgoMotion::new(
            na::Vector3::new(0.5, 0.25, 1.0),
            na::Vector3::new(0.01, -0.02, 0.03),
        );
        let c = corr((100.0, 50.0), (97.5, 48.0));

        let a = resolve(&c, &params(ego)).unwrap();
        let b = resolve(&c, &params(ego)).unwrap();

        assert_eq!(a.position().x.to_bits(), b.position().x.to_bits());
        assert_eq!(a.position().y.to_bits(), b.position().y.to_bits());
        assert_eq!(a.position().z.to_bits(), b.position().z.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn world_offset_translates() {
        let c = corr((340.0, 180.0), (341.0, 180.0));
        let camera = resolve(&c, &params(forward())).unwrap();

        let offset = na::Vector3::new(1.0, -2.0, 0.05);
        let world = resolve(
            &c,
            &ResolveParams {
                world_offset: Some(offset),
                ..params(forward())
            },
        )
        .unwrap();

        assert_eq!(world.position(), camera.position() + offset);
        assert_eq!(world.depth(), camera.depth());
    }

    #[test]
    fn out_of_bounds_pixels_are_accepted() {
        let p = resolve(&corr((-100.0, -40.0), (-103.0, -42.0)), &params(forward())).unwrap();
        assert!(p.position().x < 0.0);
        assert!(p.position().y < 0.0);
    }

    #[test]
    fn depth_inversion() {
        assert_approx_eq!(depth_from_weighted(2.0, 38.199).unwrap(), 1.90995, 1e-9);
        assert_approx_eq!(depth_from_weighted(-1.0, 38.199).unwrap(), -3.8199, 1e-9);
        assert!(depth_from_weighted(0.0, 38.199).is_err());
        assert!(depth_from_weighted(-0.0, 38.199).is_err());
        assert!(depth_from_weighted(f64::NAN, 38.199).is_err());
        assert!(depth_from_weighted(1e-320, 38.199).is_err());
    }

    #[test]
    fn back_project_center_is_on_axis() {
        let p = back_project(na::Point2::new(320.0, 180.0), 7.5, (640, 360), 38.199);
        assert_eq!(p, na::Point3::new(0.0, 0.0, 7.5));
    }
}
