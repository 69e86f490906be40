//! Tests for destination resolution

use super::*;
use crate::util::ManualClock;
use chrono::{Local, TimeZone};
use tempfile::TempDir;

fn time_rotation() -> RotationConfig {
    RotationConfig {
        enable_time_rotation: true,
        max_age: 0,
        compress: false,
        ..RotationConfig::default()
    }
}

#[test]
fn test_parse_destinations() {
    assert_eq!(
        Destination::parse("stdout").unwrap(),
        Destination::Console(ConsoleStream::Stdout)
    );
    assert_eq!(
        Destination::parse("stderr").unwrap(),
        Destination::Console(ConsoleStream::Stderr)
    );
    assert_eq!(
        Destination::parse("logs/app.log").unwrap(),
        Destination::File(PathBuf::from("logs/app.log"))
    );
    assert!(matches!(Destination::parse(""), Err(SinkError::EmptyDestination)));
    assert!(matches!(Destination::parse("  "), Err(SinkError::EmptyDestination)));
    assert!(Destination::parse("stdout").unwrap().is_console());
}

#[test]
fn test_console_writers_not_file_backed() {
    let resolver = DestinationResolver::new(RotationConfig::default());
    let writer = resolver.resolve("stderr").unwrap();
    assert_eq!(writer.name(), "stderr");
    assert!(!writer.is_file_backed());
}

#[test]
fn test_same_path_same_instance() {
    let dir = TempDir::new().unwrap();
    let resolver = DestinationResolver::new(time_rotation());
    let path = dir.path().join("app.log");
    let path = path.to_str().unwrap();

    let a = resolver.resolve(path).unwrap();
    let b = resolver.resolve(path).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(resolver.len(), 1);
}

#[test]
fn test_console_streams_deduplicated() {
    let resolver = DestinationResolver::new(RotationConfig::default());
    let a = resolver.resolve("stdout").unwrap();
    let b = resolver.resolve("stdout").unwrap();
    let c = resolver.resolve("stderr").unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(resolver.len(), 2);
}

#[test]
fn test_distinct_paths_distinct_writers() {
    let dir = TempDir::new().unwrap();
    let resolver = DestinationResolver::new(time_rotation());

    let a = resolver.resolve(dir.path().join("app.log").to_str().unwrap()).unwrap();
    let b = resolver.resolve(dir.path().join("error.log").to_str().unwrap()).unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(a.is_file_backed());
}

#[test]
fn test_resolve_creates_parent_directory() {
    let dir = TempDir::new().unwrap();
    let resolver = DestinationResolver::new(RotationConfig::default());
    let path = dir.path().join("a/b/app.log");

    resolver.resolve(path.to_str().unwrap()).unwrap();
    assert!(dir.path().join("a/b").is_dir());
}

#[test]
fn test_unwritable_directory_fails() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"not a directory").unwrap();

    let resolver = DestinationResolver::new(RotationConfig::default());
    let result = resolver.resolve(blocker.join("app.log").to_str().unwrap());

    assert!(matches!(result, Err(SinkError::Resolve { .. })));
    assert!(resolver.is_empty());
}

#[test]
fn test_empty_destination_fails() {
    let resolver = DestinationResolver::new(RotationConfig::default());
    assert!(matches!(resolver.resolve(""), Err(SinkError::EmptyDestination)));
}

#[test]
fn test_time_rotation_selected() {
    let dir = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new(Local.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap()));
    let resolver = DestinationResolver::with_clock(time_rotation(), clock);

    let writer = resolver.resolve(dir.path().join("app.log").to_str().unwrap()).unwrap();
    writer.write(b"x\n").unwrap();

    assert!(dir.path().join("app.2025-01-02.log").exists());
    assert!(!dir.path().join("app.log").exists());
}

#[test]
fn test_size_rotation_selected() {
    let dir = TempDir::new().unwrap();
    let resolver = DestinationResolver::new(RotationConfig {
        max_backups: 0,
        max_age: 0,
        compress: false,
        ..RotationConfig::default()
    });

    let writer = resolver.resolve(dir.path().join("app.log").to_str().unwrap()).unwrap();
    writer.write(b"x\n").unwrap();

    assert_eq!(fs::read_to_string(dir.path().join("app.log")).unwrap(), "x\n");
}

#[test]
fn test_get_after_resolve() {
    let resolver = DestinationResolver::new(RotationConfig::default());
    assert!(resolver.get("stdout").is_none());

    let writer = resolver.resolve("stdout").unwrap();
    let cached = resolver.get("stdout").unwrap();
    assert!(Arc::ptr_eq(&writer, &cached));
}
