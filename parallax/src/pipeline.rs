//! # Per-frame processing

use crate::prelude::v1::*;
use crate::tracker::is_end_of_stream;
use log::*;

/// Points recovered in a single frame.
///
/// Points follow the order in which their correspondences were supplied. Features that failed to
/// resolve are absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameResult(Vec<FeaturePoint3D>);

impl FrameResult {
    pub fn iter(&self) -> std::slice::Iter<'_, FeaturePoint3D> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[FeaturePoint3D] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<FeaturePoint3D> {
        self.0
    }
}

impl From<Vec<FeaturePoint3D>> for FrameResult {
    fn from(points: Vec<FeaturePoint3D>) -> Self {
        Self(points)
    }
}

impl IntoIterator for FrameResult {
    type Item = FeaturePoint3D;
    type IntoIter = std::vec::IntoIter<FeaturePoint3D>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FrameResult {
    type Item = &'a FeaturePoint3D;
    type IntoIter = std::slice::Iter<'a, FeaturePoint3D>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Totals gathered over a tracker run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames: usize,
    pub resolved: usize,
    pub dropped: usize,
}

/// Resolves every feature of a frame against a moving camera.
#[derive(Clone, Debug)]
pub struct ParallaxPipeline {
    camera: CameraState,
    output_space: OutputSpace,
}

impl Default for ParallaxPipeline {
    fn default() -> Self {
        Self {
            camera: CameraState::default(),
            output_space: OutputSpace::default(),
        }
    }
}

impl ParallaxPipeline {
    /// Create a new pipeline from camera configuration.
    pub fn new(config: &CameraConfig) -> ParallaxResult<Self> {
        Ok(Self {
            camera: CameraState::new(config)?,
            output_space: config.output_space,
        })
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    /// Mutable access to the camera, for updating its ego-motion between frames.
    pub fn camera_mut(&mut self) -> &mut CameraState {
        &mut self.camera
    }

    pub fn output_space(&self) -> OutputSpace {
        self.output_space
    }

    pub fn set_output_space(&mut self, output_space: OutputSpace) {
        self.output_space = output_space;
    }

    fn resolve_one(c: &FeatureCorrespondence, params: &ResolveParams) -> Option<FeaturePoint3D> {
        resolve(c, params)
            .map_err(|e| trace!("Dropping feature {:?}: {}", c, e))
            .ok()
    }

    fn log_frame(total: usize, points: &FrameResult) {
        debug!(
            "Resolved {} of {} features ({} dropped)",
            points.len(),
            total,
            total - points.len()
        );
    }

    /// Resolve all features of a frame against the current camera state.
    ///
    /// The camera is not modified. Features that fail to resolve are left out of the result.
    ///
    /// # Arguments
    ///
    /// * `correspondences` - features matched between the previous and current frame.
    pub fn process_frame(&self, correspondences: &[FeatureCorrespondence]) -> FrameResult {
        let params = self.camera.resolve_params(self.output_space);

        let points = FrameResult(
            correspondences
                .iter()
                .filter_map(|c| Self::resolve_one(c, &params))
                .collect(),
        );

        Self::log_frame(correspondences.len(), &points);

        points
    }

    /// Parallel version of [`process_frame`](Self::process_frame).
    ///
    /// Produces the same points in the same order.
    #[cfg(feature = "parallel")]
    pub fn process_frame_par(&self, correspondences: &[FeatureCorrespondence]) -> FrameResult {
        use rayon::prelude::*;

        let params = self.camera.resolve_params(self.output_space);

        let points = FrameResult(
            correspondences
                .par_iter()
                .filter_map(|c| Self::resolve_one(c, &params))
                .collect(),
        );

        Self::log_frame(correspondences.len(), &points);

        points
    }

    /// Advance the camera and then resolve the frame.
    ///
    /// World-space points are offset by the position reached after the step.
    ///
    /// # Arguments
    ///
    /// * `dt` - time elapsed since the previous frame.
    /// * `correspondences` - features matched between the previous and current frame.
    pub fn step(
        &mut self,
        dt: f64,
        correspondences: &[FeatureCorrespondence],
    ) -> ParallaxResult<FrameResult> {
        self.camera.advance(dt)?;
        Ok(self.process_frame(correspondences))
    }

    /// Run the pipeline over every frame of a tracker.
    ///
    /// Stops once the tracker reaches the end of the stream.
    ///
    /// # Errors
    ///
    /// Any tracker error other than [`EndOfStream`] is returned, as is any error from `on_frame`.
    ///
    /// # Arguments
    ///
    /// * `tracker` - source of correspondences.
    /// * `dt` - time step between consecutive frames.
    /// * `on_frame` - called with the index and points of every frame.
    pub fn run(
        &mut self,
        tracker: &mut impl Tracker,
        dt: f64,
        mut on_frame: impl FnMut(usize, &FrameResult) -> Result<()>,
    ) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let mut correspondences = vec![];

        loop {
            correspondences.clear();

            let filled = match tracker.next_frame(&mut correspondences) {
                Ok(filled) => filled,
                Err(e) if is_end_of_stream(&e) => break,
                Err(e) => {
                    warn!("Tracker failed after {} frames: {}", stats.frames, e);
                    return Err(e.context(format!("Tracker failed at frame {}", stats.frames)));
                }
            };

            if !filled {
                trace!("Frame {} has no correspondences", stats.frames);
            }

            let points = self.step(dt, &correspondences)?;

            stats.resolved += points.len();
            stats.dropped += correspondences.len() - points.len();

            on_frame(stats.frames, &points)?;

            stats.frames += 1;
        }

        info!(
            "Processed {} frames, {} points resolved, {} dropped",
            stats.frames, stats.resolved, stats.dropped
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use nalgebra as na;

    fn corr(prev: (f64, f64), cur: (f64, f64)) -> FeatureCorrespondence {
        FeatureCorrespondence::new(
            na::Point2::new(prev.0, prev.1),
            na::Point2::new(cur.0, cur.1),
        )
    }

    fn forward(output_space: OutputSpace) -> ParallaxPipeline {
        ParallaxPipeline::new(&CameraConfig {
            velocity: (0.0, 0.0, 1.0),
            output_space,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn failures_are_dropped_in_order() {
        let pipeline = forward(OutputSpace::Camera);

        let frame = [
            corr((340.0, 180.0), (341.0, 180.0)),
            // On the vanishing point.
            corr((320.0, 180.0), (321.0, 180.0)),
            corr((100.0, 40.0), (98.0, 39.0)),
            // Orthogonal to forward motion.
            corr((320.0, 80.0), (322.0, 80.0)),
            corr((500.0, 300.0), (503.0, 302.0)),
        ];

        let points = pipeline.process_frame(&frame);
        let pixels = points
            .iter()
            .map(|p| p.source_pixel())
            .collect::<Vec<_>>();

        assert_eq!(
            pixels,
            vec![
                frame[0].current,
                frame[2].current,
                frame[4].current
            ]
        );
    }

    #[test]
    fn empty_frame() {
        let pipeline = forward(OutputSpace::World);
        assert!(pipeline.process_frame(&[]).is_empty());
    }

    #[test]
    fn step_advances_before_resolving() {
        let mut pipeline = forward(OutputSpace::World);
        let frame = [corr((340.0, 180.0), (341.0, 180.0))];

        let points = pipeline.step(0.05, &frame).unwrap();
        assert_eq!(points.len(), 1);

        let p = points.iter().next().unwrap();
        assert_approx_eq!(p.position().z, 3.8199 + 0.05, 1e-9);
        assert_approx_eq!(p.depth(), 3.8199, 1e-9);
        assert_eq!(pipeline.camera().position(), na::Vector3::new(0.0, 0.0, 0.05));
    }

    #[test]
    fn camera_space_ignores_position() {
        let mut pipeline = forward(OutputSpace::Camera);
        let frame = [corr((340.0, 180.0), (341.0, 180.0))];

        for _ in 0..5 {
            let points = pipeline.step(0.5, &frame).unwrap();
            assert_approx_eq!(points.as_slice()[0].position().z, 3.8199, 1e-9);
        }
    }

    #[test]
    fn bad_time_step_leaves_camera() {
        let mut pipeline = forward(OutputSpace::World);
        assert!(pipeline.step(f64::NAN, &[]).is_err());
        assert_eq!(pipeline.camera().position(), na::Vector3::zeros());
    }

    #[test]
    fn velocity_change_between_frames() {
        let mut pipeline = forward(OutputSpace::Camera);
        let frame = [corr((340.0, 180.0), (341.0, 180.0))];

        let before = pipeline.process_frame(&frame);
        pipeline
            .camera_mut()
            .set_velocity(na::Vector3::new(0.0, 0.0, 2.0));
        let after = pipeline.process_frame(&frame);

        assert_approx_eq!(
            before.as_slice()[0].depth(),
            2.0 * after.as_slice()[0].depth(),
            1e-12
        );
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential() {
        let pipeline = forward(OutputSpace::World);

        let frame = (0..500)
            .map(|i| {
                let x = (i % 40) as f64 * 16.0;
                let y = (i / 40) as f64 * 30.0;
                corr((x, y), (x + (x - 320.0) * 0.01, y + (y - 180.0) * 0.01))
            })
            .collect::<Vec<_>>();

        assert_eq!(
            pipeline.process_frame(&frame),
            pipeline.process_frame_par(&frame)
        );
    }
}
