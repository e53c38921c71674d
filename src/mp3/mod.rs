pub mod frame;

pub use frame::{
    count_frames, scan_frames, Frame, FrameHeader, FrameScanner, FrameStats, HeaderError,
    StopReason,
};
