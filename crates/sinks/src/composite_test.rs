//! Tests for the composite sink

use super::*;
use crate::test_support::{FailingWriter, MemoryWriter};
use scribe_config::{LogFormat, RotationConfig};
use scribe_routing::{RoutingMode, RoutingRule};
use std::collections::BTreeMap;
use tempfile::TempDir;

/// Sink with one memory writer per destination, returned in table order
fn memory_sink(rules: &[RoutingRule], mode: RoutingMode, min: Severity) -> (CompositeSink, Vec<Arc<MemoryWriter>>) {
    let table = RouteTableBuilder::new().build(rules, mode, min).unwrap();
    let memory: Vec<Arc<MemoryWriter>> = table
        .destinations()
        .iter()
        .map(|d| Arc::new(MemoryWriter::new(d.clone())))
        .collect();
    let writers = memory
        .iter()
        .map(|w| Arc::clone(w) as Arc<dyn LogWriter>)
        .collect();
    let sink = CompositeSink::from_parts(table, writers, Encoder::default()).unwrap();
    (sink, memory)
}

fn find<'a>(sink: &CompositeSink, memory: &'a [Arc<MemoryWriter>], destination: &str) -> &'a MemoryWriter {
    let index = sink
        .table()
        .destinations()
        .iter()
        .position(|d| d == destination)
        .unwrap();
    &memory[index]
}

#[test]
fn test_duplicate_mode_delivers_error_twice() {
    let rules = vec![
        RoutingRule::new("all", ["app.log"]),
        RoutingRule::new("error", ["error.log"]),
    ];
    let (sink, memory) = memory_sink(&rules, RoutingMode::Duplicate, Severity::Info);

    sink.emit(Severity::Error, b"boom\n").unwrap();
    sink.emit(Severity::Info, b"hello\n").unwrap();

    assert_eq!(find(&sink, &memory, "app.log").lines(), vec!["boom", "hello"]);
    assert_eq!(find(&sink, &memory, "error.log").lines(), vec!["boom"]);

    let snapshot = sink.metrics_snapshot();
    assert_eq!(snapshot.records_emitted, 2);
    assert_eq!(snapshot.deliveries, 3);
    assert_eq!(snapshot.bytes_written, 5 + 5 + 6);
}

#[test]
fn test_above_mode() {
    let rules = vec![RoutingRule::new("warn", ["important.log"])];
    let (sink, memory) = memory_sink(&rules, RoutingMode::Above, Severity::Trace);

    for severity in Severity::ALL {
        sink.emit(severity, format!("{severity}\n").as_bytes()).unwrap();
    }

    assert_eq!(memory[0].lines(), vec!["warn", "error", "fatal"]);
}

#[test]
fn test_exact_mode() {
    let rules = vec![RoutingRule::new("warn", ["warn.log"])];
    let (sink, memory) = memory_sink(&rules, RoutingMode::Exact, Severity::Trace);

    for severity in Severity::ALL {
        sink.emit(severity, format!("{severity}\n").as_bytes()).unwrap();
    }

    assert_eq!(memory[0].lines(), vec!["warn"]);
}

#[test]
fn test_below_min_level_not_delivered() {
    let rules = vec![RoutingRule::new("all", ["app.log"])];
    let (sink, memory) = memory_sink(&rules, RoutingMode::Duplicate, Severity::Warn);

    sink.emit(Severity::Info, b"skip\n").unwrap();
    sink.emit(Severity::Warn, b"keep\n").unwrap();

    assert_eq!(memory[0].lines(), vec!["keep"]);
    assert!(!sink.enabled(Severity::Info));
    assert!(sink.enabled(Severity::Fatal));
    assert_eq!(sink.min_level(), Some(Severity::Warn));
}

#[test]
fn test_one_failure_out_of_three() {
    let table = RouteTableBuilder::new()
        .build(
            &[RoutingRule::new("all", ["a", "b", "c"])],
            RoutingMode::Duplicate,
            Severity::Info,
        )
        .unwrap();
    let a = Arc::new(MemoryWriter::new("a"));
    let b = Arc::new(FailingWriter::new("b"));
    let c = Arc::new(MemoryWriter::new("c"));
    let writers: Vec<Arc<dyn LogWriter>> = vec![a.clone(), b.clone(), c.clone()];
    let sink = CompositeSink::from_parts(table, writers, Encoder::default()).unwrap();

    let err = sink.emit(Severity::Info, b"record\n").unwrap_err();

    assert_eq!(err.failures().len(), 1);
    assert_eq!(err.failures()[0].destination, "b");
    assert_eq!(err.attempted(), 3);
    assert!(!err.is_total());
    assert_eq!(a.lines(), vec!["record"]);
    assert_eq!(c.lines(), vec!["record"]);
    assert_eq!(b.attempts(), 1);
    assert_eq!(sink.metrics_snapshot().write_errors, 1);
    assert_eq!(sink.metrics_snapshot().deliveries, 2);
}

#[test]
fn test_total_failure() {
    let table = RouteTableBuilder::new()
        .build(&[RoutingRule::new("all", ["x"])], RoutingMode::Duplicate, Severity::Info)
        .unwrap();
    let writers: Vec<Arc<dyn LogWriter>> = vec![Arc::new(FailingWriter::new("x"))];
    let sink = CompositeSink::from_parts(table, writers, Encoder::default()).unwrap();

    let err = sink.emit(Severity::Error, b"x\n").unwrap_err();
    assert!(err.is_total());

    // no circuit breaking: the next call tries again
    assert!(sink.emit(Severity::Error, b"x\n").is_err());
    assert_eq!(sink.metrics_snapshot().write_errors, 2);
}

#[test]
fn test_shared_writer_instance_written_once_per_rule() {
    let table = RouteTableBuilder::new()
        .build(
            &[RoutingRule::new("all", ["logs/app.log", "./logs/app.log"])],
            RoutingMode::Duplicate,
            Severity::Info,
        )
        .unwrap();
    let shared = Arc::new(MemoryWriter::new("logs/app.log"));
    let writers: Vec<Arc<dyn LogWriter>> = vec![shared.clone(), shared.clone()];
    let sink = CompositeSink::from_parts(table, writers, Encoder::default()).unwrap();

    sink.emit(Severity::Info, b"once\n").unwrap();

    assert_eq!(shared.lines(), vec!["once"]);
    assert_eq!(sink.writer_count(), 1);
}

#[test]
fn test_flush_attempts_all() {
    let table = RouteTableBuilder::new()
        .build(&[RoutingRule::new("all", ["bad", "good"])], RoutingMode::Duplicate, Severity::Info)
        .unwrap();
    let good = Arc::new(MemoryWriter::new("good"));
    let writers: Vec<Arc<dyn LogWriter>> = vec![Arc::new(FailingWriter::new("bad")), good.clone()];
    let sink = CompositeSink::from_parts(table, writers, Encoder::default()).unwrap();

    let err = sink.flush().unwrap_err();
    assert!(matches!(err, SinkError::Flush { ref destination, .. } if destination == "bad"));
    assert_eq!(good.sync_count(), 1);
    assert_eq!(sink.metrics_snapshot().flush_count, 1);
}

#[test]
fn test_close_once_per_writer() {
    let rules = vec![
        RoutingRule::new("all", ["app.log"]),
        RoutingRule::new("error", ["app.log", "error.log"]),
    ];
    let (sink, memory) = memory_sink(&rules, RoutingMode::Duplicate, Severity::Info);

    sink.close().unwrap();
    sink.close().unwrap();

    for writer in &memory {
        assert_eq!(writer.close_count(), 1);
    }
}

#[test]
fn test_log_encodes_once() {
    let rules = vec![RoutingRule::new("all", ["a", "b"])];
    let (sink, memory) = memory_sink(&rules, RoutingMode::Duplicate, Severity::Info);

    let record = Record::new(Severity::Warn, "disk almost full").with_target("storage");
    sink.log(&record).unwrap();
    sink.log(&Record::new(Severity::Debug, "filtered")).unwrap();

    assert_eq!(memory[0].contents(), memory[1].contents());
    let lines = memory[0].lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("[WARN] storage disk almost full"));
    assert_eq!(sink.metrics_snapshot().records_emitted, 1);
}

#[test]
fn test_mismatched_parts_rejected() {
    let table = RouteTableBuilder::new()
        .build(&[RoutingRule::new("all", ["a", "b"])], RoutingMode::Duplicate, Severity::Info)
        .unwrap();
    let writers: Vec<Arc<dyn LogWriter>> = vec![Arc::new(MemoryWriter::new("a"))];
    assert!(matches!(
        CompositeSink::from_parts(table, writers, Encoder::default()),
        Err(SinkError::Config(_))
    ));
}

fn file_config(dir: &TempDir) -> OutputConfig {
    let mut level_destinations = BTreeMap::new();
    level_destinations.insert(
        "all".to_string(),
        vec![dir.path().join("app.log").to_string_lossy().into_owned()],
    );
    level_destinations.insert(
        "error".to_string(),
        vec![dir.path().join("error.log").to_string_lossy().into_owned()],
    );
    level_destinations.insert("verbose".to_string(), vec!["stdout".to_string()]);

    OutputConfig {
        level: Severity::Info,
        format: LogFormat::Json,
        enable_level_routing: true,
        routing_mode: RoutingMode::Duplicate,
        level_destinations,
        rotation: RotationConfig {
            max_backups: 0,
            max_age: 0,
            compress: false,
            ..RotationConfig::default()
        },
        ..OutputConfig::default()
    }
}

#[test]
fn test_build_from_config() {
    let dir = TempDir::new().unwrap();
    let sink = CompositeSink::build(&file_config(&dir)).unwrap();

    assert_eq!(sink.table().skipped(), ["verbose".to_string()]);
    assert_eq!(sink.writer_count(), 2);
    assert_eq!(sink.encoder(), Encoder::Json);

    sink.log(&Record::new(Severity::Error, "failed")).unwrap();
    sink.log(&Record::new(Severity::Info, "ok")).unwrap();
    sink.close().unwrap();

    let app = std::fs::read_to_string(dir.path().join("app.log")).unwrap();
    let error = std::fs::read_to_string(dir.path().join("error.log")).unwrap();
    assert_eq!(app.lines().count(), 2);
    assert_eq!(error.lines().count(), 1);

    let line: serde_json::Value = serde_json::from_str(error.lines().next().unwrap()).unwrap();
    assert_eq!(line["level"], "error");
    assert_eq!(line["message"], "failed");
}

#[test]
fn test_build_without_routes_fails() {
    let dir = TempDir::new().unwrap();
    let mut config = file_config(&dir);
    config.level_destinations.clear();
    config.level_destinations.insert("verbose".into(), vec!["stdout".into()]);

    assert!(matches!(
        CompositeSink::build(&config),
        Err(SinkError::Routing(_))
    ));
}

#[test]
fn test_plain_destinations_ignore_routing_mode() {
    let dir = TempDir::new().unwrap();
    let config = OutputConfig {
        level: Severity::Warn,
        destinations: vec![dir.path().join("app.log").to_string_lossy().into_owned()],
        routing_mode: RoutingMode::Exact,
        ..OutputConfig::default()
    };
    let sink = CompositeSink::build(&config).unwrap();

    assert!(sink.table().skipped().is_empty());
    sink.log(&Record::new(Severity::Info, "quiet")).unwrap();
    sink.log(&Record::new(Severity::Warn, "warned")).unwrap();
    sink.log(&Record::new(Severity::Fatal, "gave up")).unwrap();
    sink.close().unwrap();

    let app = std::fs::read_to_string(dir.path().join("app.log")).unwrap();
    assert_eq!(app.lines().count(), 2);
}

#[test]
fn test_build_unwritable_destination_fails() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();

    let config = OutputConfig {
        destinations: vec![blocker.join("app.log").to_string_lossy().into_owned()],
        ..OutputConfig::default()
    };
    assert!(matches!(
        CompositeSink::build(&config),
        Err(SinkError::Resolve { .. })
    ));
}
