use assert_fs::prelude::*;
use assert_fs::TempDir;

use subtrans::config::Config;
use subtrans::subtitle::parse_srt;
use subtrans::workflow::Workflow;

const CRAMPED_SRT: &str = "\u{feff}1\r\n00:00:00,000 --> 00:00:00,500\r\nHi\r\n\r\n\
2\r\n00:00:00,600 --> 00:00:00,900\r\nthere\r\n\r\n\
3\r\n00:00:05,000 --> 00:00:07,000\r\nThis line overlaps\r\n\r\n\
4\r\n00:00:06,500 --> 00:00:08,000\r\nthe next one\r\n\r\n";

#[tokio::test]
async fn retime_writes_next_to_input() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("talk.srt");
    input.write_str(CRAMPED_SRT).unwrap();

    let mut config = Config::default();
    config.timing.extend_short_segments = false;
    let workflow = Workflow::new(config).unwrap();

    let report = workflow.retime_subtitles(input.path(), None).await.unwrap();
    assert_eq!(report.input_segments, 4);
    assert_eq!(report.output_segments, 3);
    assert_eq!(report.nudged, 1);

    let output = temp.child("talk.retimed.srt");
    assert!(output.path().exists());

    let segments = parse_srt(&std::fs::read_to_string(output.path()).unwrap()).unwrap();
    let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["Hi there", "This line overlaps", "the next one"]);
    assert_eq!(segments[2].start, 7.05);
    assert_eq!(segments[2].end, 8.0);

    temp.close().unwrap();
}

#[tokio::test]
async fn retime_converts_to_webvtt() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("talk.srt");
    input.write_str(CRAMPED_SRT).unwrap();
    let output = temp.child("out").child("talk.vtt");

    let workflow = Workflow::new(Config::default()).unwrap();
    workflow
        .retime_subtitles(input.path(), Some(output.path()))
        .await
        .unwrap();

    let content = std::fs::read_to_string(output.path()).unwrap();
    assert!(content.starts_with("WEBVTT\n\n"));
    assert!(content.contains("00:00:07.050 --> 00:00:08.000"));
}

#[tokio::test]
async fn retime_rejects_unknown_extension() {
    let temp = TempDir::new().unwrap();
    let input = temp.child("notes.txt");
    input.write_str("not subtitles").unwrap();

    let workflow = Workflow::new(Config::default()).unwrap();
    assert!(workflow.retime_subtitles(input.path(), None).await.is_err());
}

