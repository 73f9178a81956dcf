//! # Error types

use thiserror::Error;

/// Errors produced by the depth recovery core.
///
/// `DegenerateRadialVector` and `NonFiniteDepth` are per-feature conditions. The pipeline drops
/// the affected feature for the current frame and carries on with the rest.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParallaxError {
    /// The feature's previous position coincides with the frame center.
    #[error("feature lies on the vanishing point, radial direction is undefined")]
    DegenerateRadialVector,

    /// The weighted disparity does not yield a finite depth.
    #[error("weighted disparity {weighted} does not produce a finite depth")]
    NonFiniteDepth { weighted: f64 },

    /// Camera integration step is not a finite number.
    #[error("invalid time step: {0}")]
    InvalidTimeStep(f64),

    /// Camera configuration is unusable.
    #[error("invalid camera configuration: {0}")]
    InvalidConfig(String),
}

impl ParallaxError {
    /// Whether the error only affects a single feature in a single frame.
    pub fn is_per_feature(&self) -> bool {
        matches!(
            self,
            Self::DegenerateRadialVector | Self::NonFiniteDepth { .. }
        )
    }
}

pub type ParallaxResult<T> = std::result::Result<T, ParallaxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_feature_classification() {
        assert!(ParallaxError::DegenerateRadialVector.is_per_feature());
        assert!(ParallaxError::NonFiniteDepth { weighted: 0.0 }.is_per_feature());
        assert!(!ParallaxError::InvalidTimeStep(f64::NAN).is_per_feature());
        assert!(!ParallaxError::InvalidConfig("focal length".into()).is_per_feature());
    }

    #[test]
    fn converts_into_anyhow() {
        fn fails() -> anyhow::Result<()> {
            let res: ParallaxResult<()> = Err(ParallaxError::DegenerateRadialVector);
            res?;
            Ok(())
        }

        let err = fails().unwrap_err();
        assert!(err.downcast_ref::<ParallaxError>().is_some());
    }
}
