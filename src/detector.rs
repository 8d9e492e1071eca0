use std::{fs, path::Path};

use async_std::channel::{self, Receiver, Sender, TryRecvError};
use log::{debug, info, warn};

use crate::{error::RetargetError, landmarks::Detection};

/// Where completed detector results come from. Polling never blocks: the
/// detector runs at its own rate and the render loop only picks up whatever
/// finished since the last poll.
pub trait LandmarkSource {
    /// Most recent detection completed since the last poll, if any
    fn poll(&mut self) -> Option<Detection>;

    /// True once the source can never produce another detection
    fn is_finished(&self) -> bool {
        false
    }
}

/// Receiving end of a detector channel. Older results still queued when
/// polled are dropped; only the newest one matters.
pub struct ChannelSource {
    receiver: Receiver<Detection>,
    closed: bool,
}

impl ChannelSource {
    pub fn new(receiver: Receiver<Detection>) -> Self {
        ChannelSource {
            receiver,
            closed: false,
        }
    }
}

impl LandmarkSource for ChannelSource {
    fn poll(&mut self) -> Option<Detection> {
        let mut latest = None;
        let mut dropped = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(detection) => {
                    if latest.replace(detection).is_some() {
                        dropped += 1;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Closed) => {
                    if !self.closed {
                        info!("Detector channel closed");
                    }
                    self.closed = true;
                    break;
                }
            }
        }
        if dropped > 0 {
            debug!("Dropped {} superseded detections", dropped);
        }
        latest
    }

    fn is_finished(&self) -> bool {
        self.closed
    }
}

/// Unbounded detector channel; the sender side goes to whatever runs the detector
pub fn detector_channel() -> (Sender<Detection>, ChannelSource) {
    let (tx, rx) = channel::unbounded();
    (tx, ChannelSource::new(rx))
}

/// Load a recorded detection sequence. `.msgpack`/`.mp` files are decoded as
/// MessagePack, anything else as JSON.
pub fn load_recording(path: &str) -> Result<Vec<Detection>, RetargetError> {
    let bytes = fs::read(path).map_err(|e| {
        RetargetError::DetectorStartupFailure(format!("cannot read recording \"{}\": {}", path, e))
    })?;

    let is_msgpack = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("msgpack") || ext.eq_ignore_ascii_case("mp"));

    let decoded = if is_msgpack {
        rmp_serde::from_slice::<Vec<Detection>>(&bytes).map_err(|e| e.to_string())
    } else {
        serde_json::from_slice::<Vec<Detection>>(&bytes).map_err(|e| e.to_string())
    };
    let recording = decoded.map_err(|e| {
        RetargetError::DetectorStartupFailure(format!("cannot decode recording \"{}\": {}", path, e))
    })?;

    if recording.is_empty() {
        warn!("Recording \"{}\" contains no detections", path);
    } else {
        info!("Loaded {} detections from \"{}\"", recording.len(), path);
    }
    Ok(recording)
}
