//! CDG Playback Engine
//!
//! [`CdgPlayer`] drives a whole stream through the display state machine
//! and materializes the frame timeline the host render loop queries.
//!
//! Use is two-phase. `open` accepts the raw byte buffer and resets all
//! state; `process` consumes it packet by packet, snapshotting the safe
//! area every 12 packets (40 ms of stream time) into a [`VideoFrame`].
//! After `process` returns, the buffer is released and every query
//! (`frame_at`, `can_skip`, `last_update_ms`, `duration_ms`, tempo) is
//! read-only, so a host may share the player across threads behind a
//! shared reference.

use crate::display::CdgDisplay;
use crate::subcode::{
    FRAME_INTERVAL_MS, PACKET_SIZE, PACKETS_PER_FRAME, PACKETS_PER_SECOND, SubcodeStream,
    decode_packet,
};
use crate::{CdgError, Result, loader};
use image::RgbImage;
use log::{debug, info, warn};
use std::path::Path;

/// One decoded frame of the timeline: the 288x192 safe area resolved to
/// RGB, tagged with its start time on the stream clock.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Stream time at which this frame becomes current, in milliseconds.
    pub start_time_ms: u32,
    /// Safe-area pixels through the palette active at emission time.
    pub image: RgbImage,
}

/// Decoder and playback-time index for one CD+G stream.
#[derive(Debug, Clone)]
pub struct CdgPlayer {
    data: Vec<u8>,
    frames: Vec<VideoFrame>,
    skip: Vec<bool>,
    display: CdgDisplay,
    position: u32,
    duration_ms: u32,
    last_update_ms: u32,
    tempo: i32,
    processed: bool,
}

impl CdgPlayer {
    /// Create a player with no stream loaded.
    pub fn new() -> Self {
        CdgPlayer {
            data: Vec::new(),
            frames: Vec::new(),
            skip: Vec::new(),
            display: CdgDisplay::new(),
            position: 0,
            duration_ms: 0,
            last_update_ms: 0,
            tempo: 100,
            processed: false,
        }
    }

    fn reset(&mut self) {
        self.data.clear();
        self.frames.clear();
        self.skip.clear();
        self.display.reset();
        self.position = 0;
        self.duration_ms = 0;
        self.last_update_ms = 0;
        self.tempo = 100;
        self.processed = false;
    }

    /// Accept a raw CDG byte buffer, resetting all decoder state.
    ///
    /// # Errors
    /// Returns [`CdgError::EmptyInput`] for a zero-length buffer.
    pub fn open(&mut self, data: &[u8]) -> Result<()> {
        info!("opening {} bytes of CDG data", data.len());
        self.reset();
        if data.is_empty() {
            warn!("received zero bytes of CDG data");
            return Err(CdgError::EmptyInput);
        }
        self.data = data.to_vec();
        let packet_count = self.data.len() / PACKET_SIZE;
        self.duration_ms = packet_count as u32 * FRAME_INTERVAL_MS;
        let frame_estimate = packet_count / PACKETS_PER_FRAME as usize;
        self.frames.reserve(frame_estimate);
        self.skip.reserve(frame_estimate);
        Ok(())
    }

    /// Read a `.cdg` file from disk and open it.
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let data = loader::load_file(path)?;
        self.open(&data)
    }

    /// Decode the accepted buffer into the frame timeline.
    ///
    /// Runs synchronously to completion and releases the input buffer.
    /// A ragged tail shorter than one packet is logged and dropped.
    ///
    /// # Errors
    /// Returns [`CdgError::EmptyInput`] if no buffer was opened.
    pub fn process(&mut self) -> Result<()> {
        if self.data.is_empty() {
            return Err(CdgError::EmptyInput);
        }
        let data = std::mem::take(&mut self.data);
        let stream = SubcodeStream::new(&data);
        if stream.remainder() != 0 {
            warn!(
                "stream truncated: dropping {} trailing bytes after the last complete packet",
                stream.remainder()
            );
        }

        let mut window_updated = false;
        for packet in stream {
            let changed = match decode_packet(packet) {
                Some(cmd) => {
                    self.display.apply(&cmd);
                    self.display.take_dirty()
                }
                None => false,
            };
            if changed {
                self.last_update_ms = self.frames.len() as u32 * FRAME_INTERVAL_MS;
                window_updated = true;
            }
            self.position += 1;
            if self.position % PACKETS_PER_FRAME == 0 {
                self.skip.push(!window_updated);
                self.frames.push(VideoFrame {
                    start_time_ms: self.position * 1000 / PACKETS_PER_SECOND,
                    image: self.display.render_safe_area(),
                });
                window_updated = false;
            }
        }

        self.processed = true;
        info!(
            "processed {} packets into {} frames",
            self.position,
            self.frames.len()
        );
        Ok(())
    }

    /// Timeline index for a playback time, after tempo scaling.
    fn frame_index(&self, ms: u32) -> usize {
        let scaled = ms as u64 * self.tempo.max(0) as u64 / 100;
        scaled.div_ceil(FRAME_INTERVAL_MS as u64) as usize
    }

    /// The frame current at playback time `ms`.
    ///
    /// Times past the end of the stream return the last frame.
    ///
    /// # Errors
    /// [`CdgError::QueryBeforeProcess`] before `process()` has completed;
    /// [`CdgError::EmptyTimeline`] if the stream was shorter than one
    /// 12-packet frame window.
    pub fn frame_at(&self, ms: u32) -> Result<&VideoFrame> {
        if !self.processed {
            return Err(CdgError::QueryBeforeProcess);
        }
        let last = self.frames.last().ok_or(CdgError::EmptyTimeline)?;
        let index = self.frame_index(ms);
        match self.frames.get(index) {
            Some(frame) => Ok(frame),
            None => {
                debug!("frame past end of stream requested, returning last frame");
                Ok(last)
            }
        }
    }

    /// Whether rendering may be skipped around playback time `ms`.
    ///
    /// True only when the frame at `ms` and both its neighbors were
    /// emitted with no graphics change (a three-frame quiet window). Out
    /// of range times, and any query before processing, return false.
    pub fn can_skip(&self, ms: u32) -> bool {
        if !self.processed {
            return false;
        }
        let index = self.frame_index(ms);
        if index == 0 || index + 1 >= self.skip.len() {
            return false;
        }
        self.skip[index - 1] && self.skip[index] && self.skip[index + 1]
    }

    /// Stream time of the most recent command that changed pixels or
    /// palette, quantized to the preceding frame boundary.
    pub fn last_update_ms(&self) -> u32 {
        self.last_update_ms
    }

    /// Nominal stream duration in milliseconds, derived from the packet
    /// count of the opened buffer.
    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Playback tempo in percent (100 = real time).
    pub fn tempo(&self) -> i32 {
        self.tempo
    }

    /// Set the playback tempo in percent.
    ///
    /// Affects only query-time frame index scaling, never decoding.
    pub fn set_tempo(&mut self, percent: i32) {
        self.tempo = percent;
    }

    /// Whether `process()` has completed and queries are serviceable.
    pub fn is_open(&self) -> bool {
        self.processed
    }

    /// Number of frames on the timeline.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// The full decoded timeline in emission order.
    pub fn frames(&self) -> &[VideoFrame] {
        &self.frames
    }

    /// The raster state after the last processed packet.
    pub fn display(&self) -> &CdgDisplay {
        &self.display
    }
}

impl Default for CdgPlayer {
    fn default() -> Self {
        Self::new()
    }
}
