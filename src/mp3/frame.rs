//! MP3 frame header parsing and frame walking
//!
//! MP3 frames start with a sync word (11 bits of 1s) followed by header info.
//! Frame header structure (4 bytes):
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//!
//! A = sync (11 bits)
//! B = MPEG version (2 bits)
//! C = Layer (2 bits)
//! D = Protection bit (CRC)
//! E = Bitrate index (4 bits)
//! F = Sample rate index (2 bits)
//! G = Padding bit
//! H..M = private, channel mode, mode extension, copyright, original, emphasis
//!
//! Only A, E, F and G are read. Every sync match is decoded with the MPEG-1
//! Layer III tables; B and C are not consulted.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::iter::FusedIterator;
use tracing::debug;

/// Bytes needed to inspect a candidate header
pub const HEADER_LEN: usize = 4;

/// PCM samples carried by one MPEG-1 Layer III frame
pub const SAMPLES_PER_FRAME: u32 = 1152;

// Bitrate lookup table (kbps)
// Index 0 = free, 15 = bad
const BITRATES_V1_L3: [u32; 16] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
];

// Sample rate lookup table (Hz)
// Index 3 = reserved
const SAMPLE_RATES_V1: [u32; 4] = [44100, 48000, 32000, 0];

/// Why a 4-byte candidate was not accepted as a frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderError {
    /// The first 11 bits are not all set
    NoSync,
    /// Bitrate index 0 (free format) or 15 (bad)
    ReservedBitrate(u8),
    /// Sample rate index 3
    ReservedSampleRate(u8),
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::NoSync => write!(f, "no frame sync"),
            HeaderError::ReservedBitrate(idx) => write!(f, "reserved bitrate index {}", idx),
            HeaderError::ReservedSampleRate(idx) => {
                write!(f, "reserved sample rate index {}", idx)
            }
        }
    }
}

impl std::error::Error for HeaderError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameHeader {
    /// kbps
    pub bitrate: u32,
    /// Hz
    pub sample_rate: u32,
    pub padding: bool,
    /// Total frame length in bytes, header included
    pub frame_size: u32,
}

impl FrameHeader {
    /// Check the 11-bit sync pattern at the start of `bytes`
    pub fn is_sync(bytes: &[u8]) -> bool {
        matches!(bytes, [0xFF, b1, ..] if b1 & 0xE0 == 0xE0)
    }

    /// Parse a 4-byte MP3 frame header
    pub fn parse(header: [u8; 4]) -> Result<Self, HeaderError> {
        if !Self::is_sync(&header) {
            return Err(HeaderError::NoSync);
        }

        // Bitrate index (bits 7-4 of byte 2)
        let bitrate_idx = (header[2] & 0xF0) >> 4;
        // Sample rate index (bits 3-2 of byte 2)
        let sample_rate_idx = (header[2] & 0x0C) >> 2;
        // Padding (bit 1 of byte 2)
        let padding = (header[2] & 0x02) >> 1;

        let bitrate = BITRATES_V1_L3[bitrate_idx as usize];
        if bitrate == 0 {
            return Err(HeaderError::ReservedBitrate(bitrate_idx));
        }

        let sample_rate = SAMPLE_RATES_V1[sample_rate_idx as usize];
        if sample_rate == 0 {
            return Err(HeaderError::ReservedSampleRate(sample_rate_idx));
        }

        let frame_size = 144 * bitrate * 1000 / sample_rate + padding as u32;

        Ok(FrameHeader {
            bitrate,
            sample_rate,
            padding: padding == 1,
            frame_size,
        })
    }

    /// Playback time covered by this frame
    pub fn duration_secs(&self) -> f64 {
        SAMPLES_PER_FRAME as f64 / self.sample_rate as f64
    }
}

/// A counted frame and where it starts in the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub offset: usize,
    pub header: FrameHeader,
}

/// How a walk over a buffer ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// Fewer than [`HEADER_LEN`] bytes remained at the cursor
    #[default]
    EndOfBuffer,
    /// A sync match carried a reserved index. The walk does not resync past it.
    ReservedHeader { offset: usize, error: HeaderError },
}

/// Walks a buffer frame by frame.
///
/// On a sync match the cursor jumps by the decoded frame size; otherwise it
/// moves one byte forward. The first header with a reserved bitrate or sample
/// rate index ends the walk for good.
#[derive(Debug, Clone)]
pub struct FrameScanner<'a> {
    data: &'a [u8],
    cursor: usize,
    stop: Option<StopReason>,
}

impl<'a> FrameScanner<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: 0,
            stop: None,
        }
    }

    /// Current byte offset of the walk
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// `None` until the iterator has been exhausted
    pub fn stop(&self) -> Option<StopReason> {
        self.stop
    }
}

impl Iterator for FrameScanner<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.stop.is_some() {
            return None;
        }

        while let Some(&[b0, b1, b2, b3]) = self.data.get(self.cursor..self.cursor + HEADER_LEN) {
            let offset = self.cursor;
            match FrameHeader::parse([b0, b1, b2, b3]) {
                Ok(header) => {
                    self.cursor += header.frame_size as usize;
                    return Some(Frame { offset, header });
                }
                Err(HeaderError::NoSync) => self.cursor += 1,
                Err(error) => {
                    debug!(offset, %error, "halting frame scan");
                    self.stop = Some(StopReason::ReservedHeader { offset, error });
                    return None;
                }
            }
        }

        self.stop = Some(StopReason::EndOfBuffer);
        None
    }
}

impl FusedIterator for FrameScanner<'_> {}

/// Count the frames in `data`. Never fails; malformed input yields 0 or a
/// truncated count.
pub fn count_frames(data: &[u8]) -> usize {
    FrameScanner::new(data).count()
}

/// Statistics about frames in an MP3 buffer
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameStats {
    pub frame_count: usize,
    /// Per frame, kbps. Kept out of reports.
    #[serde(skip)]
    pub bitrates: Vec<u32>,
    /// Per frame, bytes. Kept out of reports.
    #[serde(skip)]
    pub frame_sizes: Vec<u32>,
    pub is_vbr: bool,
    pub avg_bitrate: u32,
    pub min_bitrate: u32,
    pub max_bitrate: u32,
    pub duration_secs: f64,
    pub bytes_scanned: usize,
    pub stop: StopReason,
}

impl FrameStats {
    /// Calculate coefficient of variation for frame sizes
    pub fn frame_size_cv(&self) -> f64 {
        if self.frame_sizes.is_empty() {
            return 0.0;
        }

        let mean: f64 = self.frame_sizes.iter().map(|&x| x as f64).sum::<f64>()
            / self.frame_sizes.len() as f64;

        if mean == 0.0 {
            return 0.0;
        }

        let variance: f64 = self
            .frame_sizes
            .iter()
            .map(|&x| {
                let diff = x as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / self.frame_sizes.len() as f64;

        (variance.sqrt() / mean) * 100.0
    }
}

/// Walk the whole buffer and collect frame statistics
pub fn scan_frames(data: &[u8]) -> FrameStats {
    let mut stats = FrameStats::default();
    let mut unique_bitrates = HashSet::new();
    let mut scanner = FrameScanner::new(data);

    for frame in scanner.by_ref() {
        stats.frame_count += 1;
        stats.bitrates.push(frame.header.bitrate);
        stats.frame_sizes.push(frame.header.frame_size);
        stats.duration_secs += frame.header.duration_secs();
        unique_bitrates.insert(frame.header.bitrate);
    }

    stats.stop = scanner.stop().unwrap_or_default();
    stats.bytes_scanned = scanner.position().min(data.len());

    if !stats.bitrates.is_empty() {
        stats.is_vbr = unique_bitrates.len() > 1;
        let total: u64 = stats.bitrates.iter().map(|&b| b as u64).sum();
        stats.avg_bitrate = (total / stats.bitrates.len() as u64) as u32;
        stats.min_bitrate = stats.bitrates.iter().copied().min().unwrap_or(0);
        stats.max_bitrate = stats.bitrates.iter().copied().max().unwrap_or(0);
    }

    stats
}
