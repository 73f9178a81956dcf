//! Recover 3D feature points from recorded correspondences.

use clap::*;
use log::*;
use parallax::prelude::v1::{Result, *};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::time::{Duration, Instant};

mod perf_stats;

/// Single CSV row.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
struct PointRecord {
    frame: usize,
    x: f64,
    y: f64,
    z: f64,
    depth: f64,
    pixel_x: f64,
    pixel_y: f64,
}

impl PointRecord {
    fn new(frame: usize, point: &FeaturePoint3D) -> Self {
        let pos = point.position();
        let pixel = point.source_pixel();
        Self {
            frame,
            x: pos.x,
            y: pos.y,
            z: pos.z,
            depth: point.depth(),
            pixel_x: pixel.x,
            pixel_y: pixel.y,
        }
    }
}

fn load_config(path: Option<&str>) -> Result<CameraConfig> {
    match path {
        Some(path) => {
            let file = BufReader::new(File::open(path)?);
            let config: CameraConfig = serde_json::from_reader(file)?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(CameraConfig::default()),
    }
}

/// Parse a `WIDTHxHEIGHT` frame size.
fn parse_frame_size(s: &str) -> Result<(usize, usize)> {
    let (w, h) = s
        .split_once(|c: char| c == 'x' || c == 'X')
        .ok_or_else(|| anyhow!("Invalid frame size {}, expected WIDTHxHEIGHT", s))?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

/// Warn if the stream's frame size disagrees with the camera configuration.
///
/// Returns `false` on a mismatch. Streams that do not know their frame size always match.
fn check_frame_size(tracker: &impl Tracker, config: &CameraConfig) -> bool {
    match tracker.get_frame_size() {
        Some((w, h)) if (w, h) != config.frame_size => {
            warn!(
                "Stream frame size {}x{} differs from configured {}x{}",
                w, h, config.frame_size.0, config.frame_size.1
            );
            false
        }
        _ => true,
    }
}

/// Pick the integration step.
///
/// An explicit value wins, then a value from the config file, then the stream's framerate.
fn select_dt(
    cli_dt: Option<f64>,
    config: &CameraConfig,
    config_given: bool,
    framerate: Option<f64>,
) -> f64 {
    cli_dt
        .or_else(|| Some(config.time_step).filter(|_| config_given))
        .or_else(|| framerate.filter(|&f| f > 0.0).map(|f| 1.0 / f))
        .unwrap_or(config.time_step)
}

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("parallax-extract")
        .version(crate_version!())
        .author(crate_authors!())
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .takes_value(true)
                .required_unless_present("dump-config"),
        )
        .arg(Arg::new("config").long("config").short('c').takes_value(true))
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .takes_value(true)
                .default_value("points.csv"),
        )
        .arg(Arg::new("dt").long("dt").takes_value(true))
        .arg(Arg::new("fps").long("fps").takes_value(true))
        .arg(Arg::new("frame-size").long("frame-size").takes_value(true))
        .arg(Arg::new("camera-space").long("camera-space"))
        .arg(Arg::new("dump-config").long("dump-config"))
        .get_matches();

    let config_path = matches.value_of("config");
    let mut config = load_config(config_path)?;

    if matches.is_present("camera-space") {
        config.output_space = OutputSpace::Camera;
    }

    if matches.is_present("dump-config") {
        serde_json::to_writer_pretty(std::io::stdout(), &config)?;
        println!();
        return Ok(());
    }

    let input = matches
        .value_of("input")
        .ok_or_else(|| anyhow!("Please supply an input stream!"))?;
    let output = matches.value_of("output").unwrap_or("points.csv");
    let cli_dt = matches.value_of("dt").map(str::parse).transpose()?;
    let fps = matches.value_of("fps").map(str::parse).transpose()?;
    let frame_size = matches
        .value_of("frame-size")
        .map(parse_frame_size)
        .transpose()?;

    let mut tracker = correspondence_loader::create_tracker(input, fps, frame_size)?;

    check_frame_size(&tracker, &config);

    let dt = select_dt(
        cli_dt,
        &config,
        config_path.is_some(),
        tracker.get_framerate(),
    );
    info!("Using time step of {} s", dt);

    let mut pipeline = ParallaxPipeline::new(&config)?;
    let mut writer = csv::Writer::from_path(output)?;

    let mut times: Vec<Duration> = vec![];
    let mut last = Instant::now();

    let stats = pipeline.run(&mut tracker, dt, |frame, points| {
        for p in points {
            writer.serialize(PointRecord::new(frame, p))?;
        }
        times.push(last.elapsed());
        last = Instant::now();
        Ok(())
    })?;

    writer.flush()?;

    let (total_s, avg_ms) = perf_stats::calc_perf(&times);
    info!("Processing took {:.03} s, {:.03} ms per frame", total_s, avg_ms);

    if let Some(fps) = perf_stats::fps_summary(&times) {
        info!(
            "Min FPS: {:.1} Max FPS: {:.1} Avg FPS: {:.1}",
            fps.min, fps.max, fps.avg
        );
    }

    info!(
        "Wrote {} points from {} frames to {}",
        stats.resolved, stats.frames, output
    );

    Ok(())
}
