//! JSON report generation

use crate::analyzer::FileResult;
use crate::report::Summary;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct JsonReport<'a> {
    generated: String,
    summary: JsonSummary,
    files: &'a [FileResult],
}

#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    ok: usize,
    empty: usize,
    no_frames: usize,
    error: usize,
    frames: usize,
}

pub fn write<W: Write>(writer: &mut W, results: &[FileResult]) -> io::Result<()> {
    let summary = Summary::from_results(results);

    let report = JsonReport {
        generated: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        summary: JsonSummary {
            total: summary.total,
            ok: summary.ok,
            empty: summary.empty,
            no_frames: summary.no_frames,
            error: summary.error,
            frames: summary.frames,
        },
        files: results,
    };

    serde_json::to_writer_pretty(&mut *writer, &report).map_err(io::Error::other)?;
    writeln!(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Verdict;
    use crate::mp3::scan_frames;
    use crate::report::tests::result;

    #[test]
    fn test_json_report_shape() {
        let results = vec![
            result("a.mp3", Verdict::Ok, 3),
            result("b.mp3", Verdict::NoFrames, 0),
        ];
        let mut out = Vec::new();
        write(&mut out, &results).expect("write");

        let value: serde_json::Value = serde_json::from_slice(&out).expect("valid json");
        assert_eq!(value["summary"]["total"], 2);
        assert_eq!(value["summary"]["ok"], 1);
        assert_eq!(value["summary"]["no_frames"], 1);
        assert_eq!(value["summary"]["frames"], 3);
        assert_eq!(value["files"][0]["verdict"], "OK");
        assert_eq!(value["files"][1]["verdict"], "NO_FRAMES");
        assert_eq!(value["files"][0]["frame_count"], 3);
        assert!(value["generated"].as_str().expect("timestamp").ends_with('Z'));
    }

    #[test]
    fn test_json_stats_omit_per_frame_vectors() {
        let mut frame = vec![0xFF, 0xFB, 0x90, 0x00];
        frame.resize(417, 0);

        let mut ok = result("a.mp3", Verdict::Ok, 3);
        ok.stats = Some(scan_frames(&frame.repeat(3)));
        let mut out = Vec::new();
        write(&mut out, &[ok]).expect("write");

        let value: serde_json::Value = serde_json::from_slice(&out).expect("valid json");
        let stats = &value["files"][0]["stats"];
        assert!(stats.is_object());
        assert!(stats.get("bitrates").is_none());
        assert!(stats.get("frame_sizes").is_none());
        assert_eq!(stats["frame_count"], 3);
        assert_eq!(stats["avg_bitrate"], 128);
        assert_eq!(stats["stop"]["kind"], "end_of_buffer");
    }
}
