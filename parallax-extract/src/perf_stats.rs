use std::time::Duration;

/// Frame rate summary of a processing run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FpsSummary {
    pub min: f32,
    pub max: f32,
    pub avg: f32,
}

/// Total time in seconds and average time in milliseconds.
pub fn calc_perf(times: &[Duration]) -> (f32, f32) {
    let total = times.iter().map(Duration::as_secs_f32).sum::<f32>();
    let len = times.len();

    let len = if len > 0 { len as f32 } else { 1.0 };

    (total, total * 1000.0 / len)
}

/// Compute frame rates out of per-frame processing times.
///
/// Frames that took no measurable time are skipped. Returns `None` if nothing is left.
pub fn fps_summary(times: &[Duration]) -> Option<FpsSummary> {
    let fps = times
        .iter()
        .map(Duration::as_secs_f32)
        .filter(|&t| t > 0.0)
        .map(|t| 1.0 / t)
        .collect::<Vec<_>>();

    if fps.is_empty() {
        return None;
    }

    let min = fps.iter().copied().fold(f32::INFINITY, f32::min);
    let max = fps.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let avg = fps.iter().sum::<f32>() / fps.len() as f32;

    Some(FpsSummary { min, max, avg })
}
