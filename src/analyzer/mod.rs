pub mod payload;

use crate::mp3::{self, FrameStats};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, warn};

/// Counting function used by [`Analyzer`]
pub type Counter = fn(&[u8]) -> usize;

/// A request body as handed over by the transport layer
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyseRequest<'a> {
    pub body: Option<&'a [u8]>,
    pub is_base64_encoded: bool,
}

impl<'a> AnalyseRequest<'a> {
    pub fn raw(body: &'a [u8]) -> Self {
        Self {
            body: Some(body),
            is_base64_encoded: false,
        }
    }

    pub fn base64(body: &'a [u8]) -> Self {
        Self {
            body: Some(body),
            is_base64_encoded: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// At least one frame found
    Ok,
    /// Nothing to scan
    Empty,
    /// Decoded fine but holds no frame; not an MP3
    NoFrames,
    /// Decoding or counting failed
    Error,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Ok => write!(f, "OK"),
            Verdict::Empty => write!(f, "EMPTY"),
            Verdict::NoFrames => write!(f, "NO_FRAMES"),
            Verdict::Error => write!(f, "ERROR"),
        }
    }
}

/// Outcome of analysing one request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub verdict: Verdict,
    pub frame_count: usize,
    pub error: Option<String>,
}

impl Analysis {
    fn from_count(frame_count: usize) -> Self {
        Self {
            verdict: if frame_count > 0 {
                Verdict::Ok
            } else {
                Verdict::NoFrames
            },
            frame_count,
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            verdict: Verdict::Error,
            frame_count: 0,
            error: Some(message),
        }
    }
}

/// Result for one file on disk
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file_path: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub verdict: Verdict,
    pub frame_count: usize,
    pub stats: Option<FrameStats>,
    pub error: Option<String>,
}

/// Decodes payloads and counts the frames in them
#[derive(Clone, Copy)]
pub struct Analyzer {
    counter: Counter,
    /// Also collect [`FrameStats`] for files
    pub collect_stats: bool,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            counter: mp3::count_frames,
            collect_stats: false,
        }
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("collect_stats", &self.collect_stats)
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap the counting function, e.g. to exercise failure handling
    pub fn with_counter(mut self, counter: Counter) -> Self {
        self.counter = counter;
        self
    }

    pub fn with_stats(mut self, collect: bool) -> Self {
        self.collect_stats = collect;
        self
    }

    /// Analyse a request body. Never panics: a panic inside the counter is
    /// reported as [`Verdict::Error`].
    pub fn analyse(&self, request: &AnalyseRequest<'_>) -> Analysis {
        let body = match request.body {
            Some(body) if !body.is_empty() => body,
            _ => {
                return Analysis {
                    verdict: Verdict::Empty,
                    frame_count: 0,
                    error: None,
                }
            }
        };

        let data = match payload::decode_body(body, request.is_base64_encoded) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "failed to decode request body");
                return Analysis::failed(e.to_string());
            }
        };

        match self.count(&data) {
            Ok(count) => {
                debug!(bytes = data.len(), frames = count, "analysed payload");
                Analysis::from_count(count)
            }
            Err(message) => {
                warn!(%message, "frame counting failed");
                Analysis::failed(message)
            }
        }
    }

    /// Analyse a single MP3 file
    pub fn analyse_file<P: AsRef<Path>>(&self, path: P) -> FileResult {
        let path = path.as_ref();
        let file_path = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file_path.clone());

        let data = match std::fs::read(path) {
            Ok(d) => d,
            Err(e) => {
                return FileResult {
                    file_path,
                    file_name,
                    size_bytes: 0,
                    verdict: Verdict::Error,
                    frame_count: 0,
                    stats: None,
                    error: Some(format!("Failed to read file: {}", e)),
                };
            }
        };

        let analysis = self.analyse(&AnalyseRequest::raw(&data));
        let stats = (self.collect_stats && analysis.verdict != Verdict::Error)
            .then(|| mp3::scan_frames(&data));

        FileResult {
            file_path,
            file_name,
            size_bytes: data.len() as u64,
            verdict: analysis.verdict,
            frame_count: analysis.frame_count,
            stats,
            error: analysis.error,
        }
    }

    fn count(&self, data: &[u8]) -> Result<usize, String> {
        let counter = self.counter;
        panic::catch_unwind(AssertUnwindSafe(|| counter(data))).map_err(panic_message)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "frame counter panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn full_frame() -> Vec<u8> {
        let mut frame = vec![0xFF, 0xFB, 0x90, 0x00];
        frame.resize(417, 0);
        frame
    }

    fn failing_counter(_: &[u8]) -> usize {
        panic!("fail")
    }

    // ==========================================================================
    // REQUEST ANALYSIS TESTS
    // ==========================================================================

    #[test]
    fn test_missing_body() {
        let analysis = Analyzer::new().analyse(&AnalyseRequest::default());
        assert_eq!(analysis.verdict, Verdict::Empty);
        assert_eq!(analysis.frame_count, 0);
    }

    #[test]
    fn test_empty_body_counts_as_missing() {
        let analysis = Analyzer::new().analyse(&AnalyseRequest::raw(&[]));
        assert_eq!(analysis.verdict, Verdict::Empty);
    }

    #[test]
    fn test_no_frames() {
        let analysis = Analyzer::new().analyse(&AnalyseRequest::raw(b"test-data"));
        assert_eq!(analysis.verdict, Verdict::NoFrames);
        assert_eq!(analysis.error, None);
    }

    #[test]
    fn test_raw_frames() {
        let data = full_frame().repeat(3);
        let analysis = Analyzer::new().analyse(&AnalyseRequest::raw(&data));
        assert_eq!(analysis.verdict, Verdict::Ok);
        assert_eq!(analysis.frame_count, 3);
    }

    #[test]
    fn test_base64_frames() {
        use base64::Engine as _;
        let encoded = base64::engine::general_purpose::STANDARD.encode(full_frame().repeat(2));
        let analysis = Analyzer::new().analyse(&AnalyseRequest::base64(encoded.as_bytes()));
        assert_eq!(analysis.verdict, Verdict::Ok);
        assert_eq!(analysis.frame_count, 2);
    }

    #[test]
    fn test_bad_base64_is_an_error() {
        let analysis = Analyzer::new().analyse(&AnalyseRequest::base64(b"%%%"));
        assert_eq!(analysis.verdict, Verdict::Error);
        assert!(analysis.error.is_some());
    }

    #[test]
    fn test_counter_panic_is_an_error() {
        let analyzer = Analyzer::new().with_counter(failing_counter);
        let analysis = analyzer.analyse(&AnalyseRequest::raw(b"test-data"));
        assert_eq!(analysis.verdict, Verdict::Error);
        assert_eq!(analysis.error.as_deref(), Some("fail"));
    }

    #[test]
    fn test_custom_counter() {
        let analyzer = Analyzer::new().with_counter(|_| 1);
        let analysis = analyzer.analyse(&AnalyseRequest::raw(b"test-data"));
        assert_eq!(analysis.verdict, Verdict::Ok);
        assert_eq!(analysis.frame_count, 1);
    }

    #[test]
    fn test_verdict_display_matches_serde() {
        for verdict in [Verdict::Ok, Verdict::Empty, Verdict::NoFrames, Verdict::Error] {
            let json = serde_json::to_string(&verdict).expect("serialize");
            assert_eq!(json, format!("\"{}\"", verdict));
        }
    }

    // ==========================================================================
    // FILE ANALYSIS TESTS
    // ==========================================================================

    #[test]
    fn test_analyse_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&full_frame().repeat(2)).expect("write");

        let result = Analyzer::new().with_stats(true).analyse_file(file.path());
        assert_eq!(result.verdict, Verdict::Ok);
        assert_eq!(result.frame_count, 2);
        assert_eq!(result.size_bytes, 834);
        let stats = result.stats.expect("stats requested");
        assert_eq!(stats.frame_count, 2);
        assert_eq!(stats.avg_bitrate, 128);
    }

    #[test]
    fn test_analyze_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = Analyzer::new().analyse_file(dir.path().join("nope.mp3"));
        assert_eq!(result.verdict, Verdict::Error);
        assert_eq!(result.file_name, "nope.mp3");
        assert!(result.error.expect("error set").starts_with("Failed to read file"));
    }
}
