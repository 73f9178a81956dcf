//! # Feature tracker interface
//!
//! Feature detection and frame-to-frame matching happen outside of this library. Trackers only
//! need to hand over a sequence of `(previous, current)` pixel pairs for every frame.

use crate::prelude::v1::*;
use log::*;
use nalgebra as na;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use thiserror::Error;

/// Returned by trackers once the stream has ended cleanly.
///
/// Any other error from [`Tracker::next_frame`] is a failure of the stream itself.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("end of stream")]
pub struct EndOfStream;

/// Whether a tracker error marks a clean end of the stream.
pub fn is_end_of_stream(err: &anyhow::Error) -> bool {
    err.is::<EndOfStream>()
}

/// Pixel positions of a single feature in the previous and the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureCorrespondence {
    pub previous: na::Point2<f64>,
    pub current: na::Point2<f64>,
}

impl FeatureCorrespondence {
    pub fn new(previous: na::Point2<f64>, current: na::Point2<f64>) -> Self {
        Self { previous, current }
    }

    /// Displacement of the feature since the previous frame.
    pub fn disparity(&self) -> na::Vector2<f64> {
        self.current - self.previous
    }
}

/// Source of per-frame feature correspondences.
pub trait Tracker {
    /// Produce correspondences for the next frame.
    ///
    /// Correspondences are appended to `out`. If the frame carried any, `Ok(true)` is returned.
    /// If the frame had none, `Ok(false)` is returned. At the end of the stream, `Err` holding
    /// [`EndOfStream`] is returned. Any other `Err` means reading the stream failed.
    fn next_frame(&mut self, out: &mut Vec<FeatureCorrespondence>) -> Result<bool>;

    /// Get the framerate of the stream.
    ///
    /// Returns `None` if the framerate is not known.
    fn get_framerate(&self) -> Option<f64> {
        None
    }

    /// Get the width and height of frames the pixel coordinates refer to.
    fn get_frame_size(&self) -> Option<(usize, usize)> {
        None
    }
}

impl<T: Tracker + ?Sized> Tracker for Box<T> {
    fn next_frame(&mut self, out: &mut Vec<FeatureCorrespondence>) -> Result<bool> {
        (**self).next_frame(out)
    }

    fn get_framerate(&self) -> Option<f64> {
        (**self).get_framerate()
    }

    fn get_frame_size(&self) -> Option<(usize, usize)> {
        (**self).get_frame_size()
    }
}

/// In-memory tracker over pre-built frames.
#[derive(Clone, Debug, Default)]
pub struct FrameQueue {
    frames: VecDeque<Vec<FeatureCorrespondence>>,
    framerate: Option<f64>,
    frame_size: Option<(usize, usize)>,
}

impl FrameQueue {
    pub fn new(frames: impl IntoIterator<Item = Vec<FeatureCorrespondence>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            framerate: None,
            frame_size: None,
        }
    }

    pub fn with_framerate(self, framerate: f64) -> Self {
        Self {
            framerate: Some(framerate),
            ..self
        }
    }

    pub fn with_frame_size(self, frame_size: (usize, usize)) -> Self {
        Self {
            frame_size: Some(frame_size),
            ..self
        }
    }

    pub fn push(&mut self, frame: Vec<FeatureCorrespondence>) {
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Tracker for FrameQueue {
    fn next_frame(&mut self, out: &mut Vec<FeatureCorrespondence>) -> Result<bool> {
        let frame = self
            .frames
            .pop_front()
            .ok_or(EndOfStream)?;
        out.extend(frame);
        Ok(!out.is_empty())
    }

    fn get_framerate(&self) -> Option<f64> {
        self.framerate
    }

    fn get_frame_size(&self) -> Option<(usize, usize)> {
        self.frame_size
    }
}

/// Tracker reading recorded correspondences.
///
/// Each frame is a 32-bit LE count, followed by that many groups of 4 LE `f32` values:
/// `previous.x, previous.y, current.x, current.y`.
pub struct CorrespondenceFile<T> {
    reader: T,
}

impl<T: Read> CorrespondenceFile<T> {
    pub fn new(reader: T) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> T {
        self.reader
    }
}

impl<T: Read> Tracker for CorrespondenceFile<T> {
    fn next_frame(&mut self, out: &mut Vec<FeatureCorrespondence>) -> Result<bool> {
        let mut cnt = [0u8; std::mem::size_of::<u32>()];

        // Running out of data before the first byte of a frame is a clean end.
        let mut filled = 0;
        while filled < cnt.len() {
            match self.reader.read(&mut cnt[filled..]) {
                Ok(0) if filled == 0 => return Err(EndOfStream.into()),
                Ok(0) => return Err(anyhow!("Truncated frame header")),
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let cnt = u32::from_le_bytes(cnt);

        for _ in 0..cnt {
            let mut data = [[0u8; std::mem::size_of::<f32>()]; 4];
            for b in &mut data {
                self.reader.read_exact(&mut *b)?;
            }
            let [px, py, cx, cy] = data.map(|b| f32::from_le_bytes(b) as f64);
            out.push(FeatureCorrespondence::new(
                na::Point2::new(px, py),
                na::Point2::new(cx, cy),
            ));
        }

        Ok(cnt > 0)
    }
}

/// Write a single frame in the format read by [`CorrespondenceFile`].
///
/// Coordinates are stored as `f32`.
pub fn write_frame(out: &mut impl Write, frame: &[FeatureCorrespondence]) -> Result<()> {
    let cnt = u32::try_from(frame.len())?;
    out.write_all(&cnt.to_le_bytes())?;

    for v in frame.iter().flat_map(|c| {
        [c.previous.x, c.previous.y, c.current.x, c.current.y]
    }) {
        out.write_all(&(v as f32).to_le_bytes())?;
    }

    Ok(())
}

/// Open a file or an input stream.
///
/// Inputs of the form `tcp://host:port` connect to a remote stream. `tcp://@:port` listens on
/// the port and accepts the first connection instead.
pub fn open_file(input: &str) -> Result<Box<dyn Read + Send>> {
    if let Some(input) = input.strip_prefix("tcp://") {
        let (addr, port) = input
            .split_once(':')
            .ok_or_else(|| anyhow!("Invalid format"))?;
        let port: u16 = str::parse(port)?;

        let stream = if addr == "@" {
            let listener = TcpListener::bind(("0.0.0.0", port))?;
            info!("Listening on port {}", port);
            let (sock, addr) = listener.accept()?;
            info!("Accept {}", addr);
            sock
        } else {
            info!("Connecting to {}", input);
            TcpStream::connect(input)?
        };

        Ok(Box::new(stream))
    } else {
        std::fs::File::open(input)
            .map(|i| Box::new(i) as _)
            .map_err(Into::into)
    }
}
