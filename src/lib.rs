//! CD+G Subcode Stream Decoder and Frame Replayer
//!
//! This crate decodes the CD+Graphics (CD+G) subcode stream found on karaoke
//! discs and in `.cdg` files. The stream is a sequence of 24-byte subcode
//! packets, 300 per second, whose drawing commands drive a 300x216
//! indexed-color framebuffer with a 16-entry palette. The decoder interprets
//! those commands and produces a timeline of timestamped 288x192 RGB frames
//! that a host render loop can query by playback time.
//!
//! # Features
//! - Full CD+G command set: memory/border preset, tile blocks (normal and
//!   XOR), scroll preset/copy with fine offsets, palette loads
//! - Memory-preset repeat suppression as emitted by real discs
//! - 40 ms frame cadence with per-frame "nothing changed" skip bits
//! - Playback-time queries: frame by time, skip window, last graphics
//!   update, nominal duration, tempo scaling
//!
//! # Quick start
//! ```no_run
//! use cdg_replayer::CdgPlayer;
//!
//! let data = std::fs::read("song.cdg").unwrap();
//! let mut player = CdgPlayer::new();
//! player.open(&data).unwrap();
//! player.process().unwrap();
//!
//! let frame = player.frame_at(30_000).unwrap();
//! println!("frame at 30s starts at {} ms", frame.start_time_ms);
//! ```
//!
//! Decoding is two-phase: `open` + `process` mutate the player, after which
//! every query is `&self` and the timeline is immutable for the player's
//! lifetime.

#![warn(missing_docs)]

// Domain modules
pub mod display; // Framebuffer, palette, scroll state
pub mod loader; // CDG file I/O
pub mod player; // Playback engine and timeline queries
pub mod subcode; // Subcode packet parsing

/// Error type for CDG decoding and playback queries
#[derive(thiserror::Error, Debug)]
pub enum CdgError {
    /// `open` was handed zero bytes of CDG data
    #[error("empty CDG stream: no bytes to decode")]
    EmptyInput,

    /// The input length is not a multiple of the 24-byte packet size
    #[error("truncated subcode packet: {remainder} trailing bytes (packets are 24 bytes)")]
    TruncatedPacket {
        /// Number of bytes left over after the last complete packet
        remainder: usize,
    },

    /// A playback query was issued before `process()` completed
    #[error("query before process(): no decoded timeline available")]
    QueryBeforeProcess,

    /// The stream was shorter than one 12-packet frame window
    #[error("decoded timeline is empty: stream shorter than one frame")]
    EmptyTimeline,

    /// IO error from the filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for CdgError {
    fn from(s: String) -> Self {
        CdgError::Other(s)
    }
}

impl From<&str> for CdgError {
    fn from(s: &str) -> Self {
        CdgError::Other(s.to_string())
    }
}

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, CdgError>;

// Public API exports
pub use display::CdgDisplay;
pub use loader::load_file;
pub use player::{CdgPlayer, VideoFrame};
pub use subcode::{CdgCommand, HScroll, ScrollCmd, SubcodeStream, TileBlock, VScroll, decode_packet};
