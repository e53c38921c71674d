//! framecount - count MPEG audio frames
//!
//! Walks a byte buffer header by header and reports how many MPEG-1 Layer III
//! frames it holds. The count is what callers use to tell a real MP3 upload
//! from anything else: a genuine file always has at least one frame.
//!
//! # Quick Start
//!
//! ```
//! use framecount::mp3::count_frames;
//!
//! // One 128kbps / 44.1kHz frame is 417 bytes
//! let mut frame = vec![0xFF, 0xFB, 0x90, 0x00];
//! frame.resize(417, 0);
//!
//! assert_eq!(count_frames(&frame.repeat(3)), 3);
//! assert_eq!(count_frames(b"not audio"), 0);
//! ```
//!
//! # Scanning rules
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Fewer than 4 bytes left | scan ends |
//! | No sync at cursor | skip one byte |
//! | Valid header | count it, jump by frame size |
//! | Reserved bitrate or sample rate index | scan ends, header not counted |
//!
//! # Modules
//!
//! - [`mp3`]: frame header parsing, the frame walker and statistics
//! - [`analyzer`]: payload decoding and verdicts for requests and files
//! - [`serve`]: the HTTP service
//! - [`report`]: JSON and CSV reports for offline runs

pub mod analyzer;
pub mod config;
pub mod error;
pub mod mp3;
pub mod report;
pub mod serve;

pub use analyzer::{AnalyseRequest, Analysis, Analyzer, FileResult, Verdict};
pub use config::Config;
pub use error::{Error, Result};
pub use mp3::{count_frames, scan_frames, FrameStats};
