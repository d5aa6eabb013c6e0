use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::config::SubtitleFormat;
use crate::error::{Result, SubtransError};
use crate::segment::Segment;

/// Render segments as an SRT document
pub fn render_srt(segments: &[Segment]) -> String {
    let mut srt_content = String::new();

    for (index, segment) in segments.iter().enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(segment.start),
            format_srt_time(segment.end),
            segment.text.trim()
        ));
    }

    srt_content
}

/// Render segments as a WebVTT document
pub fn render_vtt(segments: &[Segment]) -> String {
    let mut vtt_content = String::from("WEBVTT\n\n");

    for segment in segments {
        vtt_content.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_vtt_time(segment.start),
            format_vtt_time(segment.end),
            segment.text.trim()
        ));
    }

    vtt_content
}

pub fn render(segments: &[Segment], format: SubtitleFormat) -> String {
    match format {
        SubtitleFormat::Srt => render_srt(segments),
        SubtitleFormat::Vtt => render_vtt(segments),
    }
}

/// Write a subtitle file.
///
/// The document goes to a temporary file in the destination directory first
/// and is renamed into place, so an interrupted run never leaves a truncated
/// file under the final name.
pub async fn write_subtitles<P: AsRef<Path>>(
    segments: &[Segment],
    format: SubtitleFormat,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref().to_path_buf();
    info!("Generating {} file: {}", format.extension(), output_path.display());

    let content = render(segments, format);
    let directory = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    fs::create_dir_all(&directory).await?;

    tokio::task::spawn_blocking(move || -> Result<()> {
        use std::io::Write;

        let mut temp = tempfile::NamedTempFile::new_in(&directory)?;
        temp.write_all(content.as_bytes())?;
        temp.flush()?;
        temp.persist(&output_path)
            .map_err(|e| SubtransError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| SubtransError::Subtitle(format!("Subtitle writer task failed: {}", e)))??;

    info!("Subtitle file generated successfully ({} entries)", segments.len());
    Ok(())
}

/// Read a subtitle file, detecting the format from its extension
pub async fn read_subtitles<P: AsRef<Path>>(path: P) -> Result<Vec<Segment>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SubtransError::FileNotFound(path.display().to_string()));
    }

    let format = SubtitleFormat::from_path(path)?;
    let content = fs::read_to_string(path).await?;
    parse(&content, format)
}

pub fn parse(content: &str, format: SubtitleFormat) -> Result<Vec<Segment>> {
    match format {
        SubtitleFormat::Srt => parse_srt(content),
        SubtitleFormat::Vtt => parse_vtt(content),
    }
}

/// Parse an SRT document. Index lines are optional; CRLF and a BOM are accepted.
pub fn parse_srt(content: &str) -> Result<Vec<Segment>> {
    parse_cues(content, ',')
}

/// Parse a WebVTT document. NOTE blocks, STYLE blocks and cue settings are skipped.
pub fn parse_vtt(content: &str) -> Result<Vec<Segment>> {
    let content = content.trim_start_matches('\u{feff}');
    if !content.trim_start().starts_with("WEBVTT") {
        return Err(SubtransError::Subtitle("Missing WEBVTT header".to_string()));
    }
    parse_cues(content, '.')
}

fn parse_cues(content: &str, millis_separator: char) -> Result<Vec<Segment>> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut segments = Vec::new();

    for block in content.split("\n\n") {
        let lines: Vec<&str> = block.lines().filter(|l| !l.trim().is_empty()).collect();
        let Some(timing_index) = lines.iter().position(|l| l.contains("-->")) else {
            continue;
        };

        let (start, end) = parse_timing_line(lines[timing_index], millis_separator)?;
        let text = lines[timing_index + 1..]
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join("\n");

        segments.push(Segment::new(start, end, text));
    }

    Ok(segments)
}

fn parse_timing_line(line: &str, millis_separator: char) -> Result<(f64, f64)> {
    let mut parts = line.split("-->");
    let start = parts.next().unwrap_or_default().trim();
    // Cue settings may follow the end timestamp
    let end = parts
        .next()
        .and_then(|rest| rest.split_whitespace().next())
        .ok_or_else(|| SubtransError::Subtitle(format!("Invalid timing line: {}", line)))?;

    Ok((
        parse_timestamp(start, millis_separator)?,
        parse_timestamp(end, millis_separator)?,
    ))
}

/// Parse `HH:MM:SS,mmm` (or `MM:SS.mmm` in WebVTT) into seconds
fn parse_timestamp(value: &str, millis_separator: char) -> Result<f64> {
    let invalid = || SubtransError::Subtitle(format!("Invalid timestamp: {}", value));

    let (clock, millis) = value.rsplit_once(millis_separator).ok_or_else(invalid)?;
    if millis.len() != 3 {
        return Err(invalid());
    }
    let millis = parse_digits(millis).ok_or_else(invalid)?;

    let fields: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match fields.as_slice() {
        [h, m, s] => (parse_digits(h).ok_or_else(invalid)?, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return Err(invalid()),
    };
    let minutes = parse_sexagesimal(minutes).ok_or_else(invalid)?;
    let seconds = parse_sexagesimal(seconds).ok_or_else(invalid)?;

    let total_millis = hours
        .checked_mul(3_600_000)
        .and_then(|ms| ms.checked_add(minutes * 60_000 + seconds * 1000 + millis))
        .ok_or_else(|| SubtransError::Subtitle(format!("Timestamp out of range: {}", value)))?;
    Ok(total_millis as f64 / 1000.0)
}

fn parse_digits(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Two-digit minutes or seconds field
fn parse_sexagesimal(field: &str) -> Option<u64> {
    if field.len() != 2 {
        return None;
    }
    parse_digits(field).filter(|v| *v < 60)
}

fn split_millis(seconds: f64) -> (u64, u64, u64, u64) {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;
    (hours, minutes, secs, millis)
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
pub fn format_srt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds);
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Format time in seconds to WebVTT time format (HH:MM:SS.mmm)
pub fn format_vtt_time(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_millis(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(65.123), "00:01:05,123");
        assert_eq!(format_srt_time(3661.500), "01:01:01,500");
        assert_eq!(format_srt_time(3.05), "00:00:03,050");
    }

    #[test]
    fn test_format_vtt_time() {
        assert_eq!(format_vtt_time(65.123), "00:01:05.123");
    }

    #[test]
    fn test_render_srt() {
        let segments = vec![
            Segment::new(1.0, 3.0, "Hello"),
            Segment::new(3.05, 4.0, " world "),
        ];
        assert_eq!(
            render_srt(&segments),
            "1\n00:00:01,000 --> 00:00:03,000\nHello\n\n2\n00:00:03,050 --> 00:00:04,000\nworld\n\n"
        );
    }

    #[test]
    fn test_render_vtt() {
        let segments = vec![Segment::new(1.0, 3.0, "Hello")];
        assert_eq!(
            render_vtt(&segments),
            "WEBVTT\n\n00:00:01.000 --> 00:00:03.000\nHello\n\n"
        );
    }

    #[test]
    fn test_parse_srt_with_crlf_and_bom() {
        let content = "\u{feff}1\r\n00:00:01,000 --> 00:00:02,500\r\nFirst line\r\nsecond line\r\n\r\n2\r\n00:01:00,000 --> 00:01:01,000\r\nNext\r\n";
        let segments = parse_srt(content).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, 1.0);
        assert_eq!(segments[0].end, 2.5);
        assert_eq!(segments[0].text, "First line\nsecond line");
        assert_eq!(segments[1].start, 60.0);
    }

    #[test]
    fn test_parse_vtt_with_settings_and_short_timestamps() {
        let content = "WEBVTT\n\nNOTE a comment\n\ncue-1\n00:01.000 --> 00:02.000 align:start\nHi\n";
        let segments = parse_vtt(content).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, 1.0);
        assert_eq!(segments[0].end, 2.0);
        assert_eq!(segments[0].text, "Hi");
    }

    #[test]
    fn test_parse_rejects_overflowing_hours() {
        let result = parse_srt("1\n9999999999999:00:00,000 --> 9999999999999:00:01,000\nHi\n");
        assert!(matches!(result, Err(SubtransError::Subtitle(_))));
    }

    #[test]
    fn test_parse_rejects_malformed_millis() {
        assert!(parse_srt("1\n00:00:01,5 --> 00:00:02,000\nHi\n").is_err());
        assert!(parse_srt("1\n00:00:01,000 --> 00:00:02,1500\nHi\n").is_err());
        assert!(parse_srt("1\n00:00:01,+50 --> 00:00:02,000\nHi\n").is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range_clock_fields() {
        assert!(parse_srt("1\n00:60:00,000 --> 00:61:00,000\nHi\n").is_err());
        assert!(parse_srt("1\n00:00:75,000 --> 00:00:76,000\nHi\n").is_err());
        assert!(parse_srt("1\n00:0:01,000 --> 00:00:02,000\nHi\n").is_err());
        assert!(parse_vtt("WEBVTT\n\n1:01.000 --> 01:02.000\nHi\n").is_err());
    }

    #[test]
    fn test_parse_accepts_long_hours() {
        let segments = parse_srt("1\n100:00:00,000 --> 100:00:01,250\nHi\n").unwrap();
        assert_eq!(segments[0].start, 360_000.0);
        assert_eq!(segments[0].end, 360_001.25);
    }

    #[test]
    fn test_parse_rejects_bad_timestamp() {
        assert!(parse_srt("1\n00:00:xx,000 --> 00:00:01,000\nHi\n").is_err());
        assert!(parse_vtt("not a vtt").is_err());
    }

    #[test]
    fn test_rendered_srt_parses_back() {
        let segments = vec![Segment::new(0.5, 1.25, "one"), Segment::new(2.0, 3.0, "two")];
        assert_eq!(parse_srt(&render_srt(&segments)).unwrap(), segments);
    }

    #[tokio::test]
    async fn test_write_subtitles_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.srt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "stale").unwrap();

        write_subtitles(&[Segment::new(0.0, 1.0, "fresh")], SubtitleFormat::Srt, &path)
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("fresh"));
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
