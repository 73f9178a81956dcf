//! Common `Tracker` instance loader.

use log::*;
use parallax::prelude::v1::*;
use parallax::tracker::open_file;
use std::io::{BufReader, Read};

/// Create a tracker depending on the input.
///
/// Inputs ending with `.corr` are interpreted as recorded correspondence files, `tcp://` inputs
/// as network streams in the same format, and `-` as the standard input.
///
/// # Arguments
///
/// * `input` - path or address of the stream.
/// * `framerate` - framerate of the stream, if known.
/// * `frame_size` - width and height of the frames the stream was recorded from, if known.
pub fn create_tracker(
    input: &str,
    framerate: Option<f64>,
    frame_size: Option<(usize, usize)>,
) -> Result<Box<dyn Tracker>> {
    let reader: Box<dyn Read + Send> = if input == "-" {
        debug!("Reading correspondences from stdin");
        Box::new(std::io::stdin())
    } else if input.ends_with(".corr") || input.starts_with("tcp://") {
        open_file(input)?
    } else {
        return Err(anyhow!("Unsupported input: {}", input));
    };

    Ok(Box::new(RecordedStream {
        file: CorrespondenceFile::new(BufReader::new(reader)),
        framerate,
        frame_size,
    }))
}

struct RecordedStream<T> {
    file: CorrespondenceFile<T>,
    framerate: Option<f64>,
    frame_size: Option<(usize, usize)>,
}

impl<T: Read> Tracker for RecordedStream<T> {
    fn next_frame(&mut self, out: &mut Vec<FeatureCorrespondence>) -> Result<bool> {
        self.file.next_frame(out)
    }

    fn get_framerate(&self) -> Option<f64> {
        self.framerate
    }

    fn get_frame_size(&self) -> Option<(usize, usize)> {
        self.frame_size
    }
}
