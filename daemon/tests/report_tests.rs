mod common;

use chrono::{Local, TimeZone};
use common::{proc, HangingNotifier, MemoryLog, RecordingNotifier};
use cpu_shield::report::{format_alert_record, AlertLog, FileAlertLog, Reporter, ALERT_TITLE, NOTIFY_TIMEOUT};
use cpu_shield::sampler::Sample;
use std::fs;
use std::time::Duration;

fn sample(cpu: f64) -> Sample {
    Sample {
        timestamp: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
        cpu_percent: cpu,
        is_alert: true,
    }
}

#[test]
fn test_record_layout() {
    let s = sample(85.34);
    let record = format_alert_record(
        &s.timestamp,
        s.cpu_percent,
        &[proc(42, "ffmpeg", 72.5), proc(7, "node", 3.0)],
    );
    let expected = "[2024-03-09 14:05:07] ALERT: CPU Usage at 85.3%\n\
                    Top CPU-consuming processes:\n  \
                    PID: 42, Name: ffmpeg, CPU%: 72.5\n  \
                    PID: 7, Name: node, CPU%: 3.0\n\
                    --------------------\n";
    assert_eq!(record, expected);
}

#[test]
fn test_record_without_processes() {
    let s = sample(81.0);
    let record = format_alert_record(&s.timestamp, s.cpu_percent, &[]);
    let lines: Vec<&str> = record.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "-".repeat(20));
}

#[test]
fn test_file_log_appends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("system_alert.log");
    let mut log = FileAlertLog::new(&path);
    log.append("first\n").unwrap();
    log.append("second\n").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
}

#[test]
fn test_file_log_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be opened for appending
    let mut log = FileAlertLog::new(dir.path());
    let err = log.append("record\n").unwrap_err();
    assert_eq!(err.path, dir.path());
}

#[tokio::test]
async fn test_report_logs_then_notifies() {
    let log = MemoryLog::default();
    let notifier = RecordingNotifier::default();
    let mut reporter = Reporter::new(Box::new(log.clone()), Box::new(notifier.clone()));
    reporter.report(&sample(90.0), &[proc(1, "a", 50.0)]).await.unwrap();

    assert_eq!(log.records().len(), 1);
    assert!(log.records()[0].contains("PID: 1, Name: a, CPU%: 50.0"));
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, ALERT_TITLE);
    assert_eq!(sent[0].1, "CPU usage is at 90.0%\nCheck logs for details.");
}

#[tokio::test]
async fn test_notification_failure_is_swallowed() {
    let log = MemoryLog::default();
    let mut reporter = Reporter::new(Box::new(log.clone()), Box::new(RecordingNotifier::failing()));
    assert!(reporter.report(&sample(95.0), &[]).await.is_ok());
    assert_eq!(log.records().len(), 1);
}

#[tokio::test]
async fn test_log_failure_propagates_but_still_notifies() {
    let notifier = RecordingNotifier::default();
    let mut reporter = Reporter::new(Box::new(MemoryLog::failing()), Box::new(notifier.clone()));
    assert!(reporter.report(&sample(95.0), &[]).await.is_err());
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stuck_notifier_is_abandoned_after_timeout() {
    let log = MemoryLog::default();
    let mut reporter = Reporter::new(Box::new(log.clone()), Box::new(HangingNotifier));
    let start = tokio::time::Instant::now();
    assert!(reporter.report(&sample(95.0), &[]).await.is_ok());
    assert!(start.elapsed() >= NOTIFY_TIMEOUT);
    assert_eq!(log.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_notify_timeout_is_configurable() {
    let mut reporter = Reporter::new(Box::new(MemoryLog::default()), Box::new(HangingNotifier))
        .notify_timeout(Duration::from_millis(200));
    let start = tokio::time::Instant::now();
    assert!(reporter.report(&sample(95.0), &[]).await.is_ok());
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(200) && waited < NOTIFY_TIMEOUT);
}
