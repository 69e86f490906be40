//! Tests for retention sweeps and the maintenance worker

use super::*;
use chrono::TimeZone;
use filetime::FileTime;
use tempfile::TempDir;

fn touch(dir: &Path, name: &str, modified: DateTime<Local>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, name.as_bytes()).unwrap();
    filetime::set_file_mtime(&path, FileTime::from_system_time(modified.into())).unwrap();
    path
}

fn day(d: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2025, 1, d, 0, 1, 0).unwrap()
}

fn request(dir: &Path, active: &Path, now: DateTime<Local>, policy: RetentionPolicy) -> SweepRequest {
    SweepRequest {
        dir: dir.to_path_buf(),
        names: RotatedName::new("app.", "%Y-%m-%d", ".log"),
        active: active.to_path_buf(),
        now,
        policy,
        max_files: None,
    }
}

#[test]
fn test_policy_cutoff() {
    let now = Local.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
    let policy = RetentionPolicy::new(2, TimeDelta::days(1), false);
    assert_eq!(
        policy.cutoff(now),
        Some(Local.with_ymd_and_hms(2025, 1, 3, 12, 0, 0).unwrap())
    );
    assert_eq!(RetentionPolicy::disabled().cutoff(now), None);
    assert!(!RetentionPolicy::disabled().is_active());
}

#[test]
fn test_sweep_keeps_recent_buckets() {
    let dir = TempDir::new().unwrap();
    for d in 1..=4 {
        touch(dir.path(), &format!("app.2025-01-0{d}.log"), day(d));
    }
    let active = touch(dir.path(), "app.2025-01-05.log", day(5));

    let now = Local.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
    let stats = request(dir.path(), &active, now, RetentionPolicy::new(2, TimeDelta::days(1), false)).run();

    assert_eq!(stats.scanned, 4);
    assert_eq!(stats.removed, 3);
    assert!(!dir.path().join("app.2025-01-01.log").exists());
    assert!(!dir.path().join("app.2025-01-02.log").exists());
    assert!(!dir.path().join("app.2025-01-03.log").exists());
    assert!(dir.path().join("app.2025-01-04.log").exists());
    assert!(active.exists());
}

#[test]
fn test_sweep_never_touches_active_file() {
    let dir = TempDir::new().unwrap();
    // an active file with an ancient mtime still survives
    let active = touch(dir.path(), "app.2025-01-01.log", day(1));

    let now = Local.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    let stats = request(dir.path(), &active, now, RetentionPolicy::new(1, TimeDelta::days(1), true)).run();

    assert_eq!(stats, SweepStats::default());
    assert!(active.exists());
}

#[test]
fn test_sweep_ignores_other_prefixes() {
    let dir = TempDir::new().unwrap();
    let active = touch(dir.path(), "app.2025-01-05.log", day(5));
    let other = touch(dir.path(), "error.2025-01-01.log", day(1));

    let now = Local.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
    request(dir.path(), &active, now, RetentionPolicy::new(1, TimeDelta::days(1), false)).run();

    assert!(other.exists());
}

#[test]
fn test_rotated_name_matches_only_own_files() {
    let names = RotatedName::around(Path::new("logs/app.log"), '.', "%Y-%m-%d");
    assert!(names.matches("app.2025-01-02.log"));
    assert!(names.matches("app.2025-01-02.log.lz4"));
    assert!(!names.matches("app.log"));
    assert!(!names.matches("app.error.2025-01-02.log"));
    assert!(!names.matches("app.error.2025-01-02.log.lz4"));
    assert!(!names.matches("app.2025-01-02.txt"));

    let backups = RotatedName::around(Path::new("app.log"), '-', "%Y-%m-%dT%H-%M-%S%.3f");
    assert!(backups.matches("app-2025-01-02T09-00-00.000.log"));
    assert!(backups.matches("app-2025-01-02T09-00-00.000.log.lz4"));
    assert!(!backups.matches("app-error.log"));
    assert!(!backups.matches("app-error-2025-01-02T09-00-00.000.log"));
}

#[test]
fn test_sweep_leaves_sibling_destination_alone() {
    let dir = TempDir::new().unwrap();
    let active = touch(dir.path(), "app.2025-01-05.log", day(5));
    let sibling = touch(dir.path(), "app.error.2025-01-01.log", day(1));

    let now = Local.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
    let stats = request(dir.path(), &active, now, RetentionPolicy::new(1, TimeDelta::days(1), true)).run();

    assert_eq!(stats.scanned, 0);
    assert!(sibling.exists());
}

#[test]
fn test_zero_max_age_disables_deletion() {
    let dir = TempDir::new().unwrap();
    let old = touch(dir.path(), "app.2024-01-01.log", day(1) - TimeDelta::days(365));
    let active = touch(dir.path(), "app.2025-01-05.log", day(5));

    let stats = request(dir.path(), &active, day(5), RetentionPolicy::new(0, TimeDelta::days(1), false)).run();

    assert_eq!(stats.removed, 0);
    assert!(old.exists());
}

#[test]
fn test_sweep_compresses_survivors() {
    let dir = TempDir::new().unwrap();
    let kept = touch(dir.path(), "app.2025-01-04.log", day(4));
    let done = touch(dir.path(), "app.2025-01-03.log.lz4", day(4));
    let active = touch(dir.path(), "app.2025-01-05.log", day(5));

    let now = Local.with_ymd_and_hms(2025, 1, 5, 12, 0, 0).unwrap();
    let stats = request(dir.path(), &active, now, RetentionPolicy::new(7, TimeDelta::days(1), true)).run();

    assert_eq!(stats.compressed, 1);
    assert!(!kept.exists());
    assert!(dir.path().join("app.2025-01-04.log.lz4").exists());
    assert!(done.exists());
    assert!(active.exists());
}

#[test]
fn test_max_files_keeps_newest() {
    let dir = TempDir::new().unwrap();
    for d in 1..=4 {
        touch(dir.path(), &format!("app.2025-01-0{d}.log"), day(d));
    }
    let active = dir.path().join("app.log");

    let mut req = request(dir.path(), &active, day(5), RetentionPolicy::disabled());
    req.max_files = Some(2);
    let stats = req.run();

    assert_eq!(stats.removed, 2);
    assert!(dir.path().join("app.2025-01-04.log").exists());
    assert!(dir.path().join("app.2025-01-03.log").exists());
    assert!(!dir.path().join("app.2025-01-02.log").exists());
}

#[test]
fn test_missing_directory_is_swallowed() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let stats = request(&missing, &missing.join("app.log"), day(5), RetentionPolicy::new(1, TimeDelta::days(1), false)).run();
    assert_eq!(stats.failed, 1);
}

#[test]
fn test_worker_runs_jobs_before_barrier() {
    let dir = TempDir::new().unwrap();
    let old = touch(dir.path(), "app.2025-01-01.log", day(1));
    let active = touch(dir.path(), "app.2025-01-05.log", day(5));

    let worker = RetentionWorker::spawn("app.log").unwrap();
    assert!(worker.schedule(request(
        dir.path(),
        &active,
        day(5),
        RetentionPolicy::new(1, TimeDelta::days(1), false),
    )));
    worker.wait_idle();

    assert!(!old.exists());
    assert!(active.exists());
}

#[test]
fn test_worker_drop_drains_queue() {
    let dir = TempDir::new().unwrap();
    let old = touch(dir.path(), "app.2025-01-01.log", day(1));
    let active = touch(dir.path(), "app.2025-01-05.log", day(5));

    {
        let worker = RetentionWorker::spawn("app.log").unwrap();
        worker.schedule(request(
            dir.path(),
            &active,
            day(5),
            RetentionPolicy::new(1, TimeDelta::days(1), false),
        ));
    }

    assert!(!old.exists());
}
