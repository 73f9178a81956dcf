//! # Motion Parallax Depth Library
//!
//! This library recovers the 3D position of tracked image features relative to a moving camera
//! from their frame-to-frame pixel disparity and the camera's known ego-motion. Features are
//! supplied by an external tracker, the camera velocities are supplied by the caller, and each
//! frame produces a set of camera-space or world-space points.
//!
//! The easiest way to use the library is to import its prelude:
//!
//! ```
//! use parallax::prelude::v1::*;
//! ```
//!
//! You may need [`nalgebra`](https://crates.io/crates/nalgebra) to make use of the functionality.

pub mod camera;
pub mod disparity;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod resolver;
pub mod tracker;
pub mod weighting;

pub mod prelude {
    pub mod v1 {
        pub use crate::{
            camera::{CameraConfig, CameraState, OutputSpace},
            disparity::{decompose, DisparityDecomposition},
            error::{ParallaxError, ParallaxResult},
            pipeline::{FrameResult, ParallaxPipeline, RunStats},
            resolver::{resolve, FeaturePoint3D, ResolveParams},
            tracker::{CorrespondenceFile, EndOfStream, FeatureCorrespondence, FrameQueue, Tracker},
            weighting::{weight_disparity, EgoMotion},
        };
        pub use anyhow::{anyhow, Error, Result};
    }
}
