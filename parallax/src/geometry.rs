//! # Geometry primitives

use nalgebra as na;

/// Normalize a 2D vector to unit length.
///
/// Returns `None` if the vector has zero length, or the result is not finite.
///
/// # Arguments
///
/// * `v` - vector to normalize.
///
/// # Examples
///
/// ```
/// # use assert_approx_eq::assert_approx_eq;
/// use parallax::geometry::normalize;
/// use nalgebra as na;
///
/// let n = normalize(na::Vector2::new(3.0, 4.0)).unwrap();
///
/// assert_approx_eq!(n.x, 0.6);
/// assert_approx_eq!(n.y, 0.8);
/// assert!(normalize(na::Vector2::zeros()).is_none());
/// ```
pub fn normalize(v: na::Vector2<f64>) -> Option<na::Vector2<f64>> {
    let norm = v.norm();

    if norm == 0.0 {
        return None;
    }

    let n = v / norm;

    if n.x.is_finite() && n.y.is_finite() {
        Some(n)
    } else {
        None
    }
}

/// Rotate a 2D vector by 90 degrees.
///
/// Swaps the components and negates the new `y`, so `(x, y)` becomes `(y, -x)`.
pub fn perpendicular(v: na::Vector2<f64>) -> na::Vector2<f64> {
    na::Vector2::new(v.y, -v.x)
}

/// Unit direction pointing from `from` towards `center`.
///
/// # Arguments
///
/// * `from` - starting point, typically the previous position of a feature.
/// * `center` - target point, typically the vanishing point of the frame.
pub fn radial_direction(
    from: na::Point2<f64>,
    center: na::Point2<f64>,
) -> Option<na::Vector2<f64>> {
    normalize(center - from)
}
