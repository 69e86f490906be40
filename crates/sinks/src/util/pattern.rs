//! Time bucket patterns
//!
//! A `TimePattern` renders the bucket label of a time-rotating file and
//! reports the coarse unit its finest specifier changes at. `%Y-%m-%d`
//! rotates daily, `%Y-%m-%d-%H` hourly, and a pattern with no time
//! specifier at all never rotates.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeDelta};

use crate::common::SinkError;

/// Granularity of a time pattern, finest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BucketUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl BucketUnit {
    /// Nominal length of one bucket
    ///
    /// Months count as 30 days and years as 365; retention only needs an
    /// approximate cutoff.
    pub fn duration(self) -> TimeDelta {
        match self {
            BucketUnit::Second => TimeDelta::seconds(1),
            BucketUnit::Minute => TimeDelta::minutes(1),
            BucketUnit::Hour => TimeDelta::hours(1),
            BucketUnit::Day => TimeDelta::days(1),
            BucketUnit::Week => TimeDelta::weeks(1),
            BucketUnit::Month => TimeDelta::days(30),
            BucketUnit::Year => TimeDelta::days(365),
        }
    }

    /// Unit a single strftime conversion character changes at
    fn of_specifier(spec: char) -> Option<Self> {
        match spec {
            'S' | 's' | 'T' | 'X' | 'r' | 'c' | 'f' | '+' => Some(BucketUnit::Second),
            'M' | 'R' => Some(BucketUnit::Minute),
            'H' | 'I' | 'k' | 'l' | 'p' | 'P' => Some(BucketUnit::Hour),
            'd' | 'e' | 'j' | 'F' | 'D' | 'x' | 'a' | 'A' | 'u' | 'w' => Some(BucketUnit::Day),
            'U' | 'W' | 'V' => Some(BucketUnit::Week),
            'm' | 'b' | 'B' | 'h' => Some(BucketUnit::Month),
            'Y' | 'y' | 'C' | 'G' | 'g' => Some(BucketUnit::Year),
            _ => None,
        }
    }
}

impl fmt::Display for BucketUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BucketUnit::Second => "second",
            BucketUnit::Minute => "minute",
            BucketUnit::Hour => "hour",
            BucketUnit::Day => "day",
            BucketUnit::Week => "week",
            BucketUnit::Month => "month",
            BucketUnit::Year => "year",
        };
        f.write_str(name)
    }
}

/// Validated strftime pattern for bucket labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePattern {
    pattern: String,
    unit: BucketUnit,
}

impl TimePattern {
    /// Validate `pattern` and detect its granularity
    pub fn new(pattern: impl Into<String>) -> Result<Self, SinkError> {
        let pattern = pattern.into();
        if scribe_config::validate_time_pattern(&pattern).is_err() {
            return Err(SinkError::InvalidPattern { pattern });
        }
        let unit = detect_unit(&pattern);
        Ok(Self { pattern, unit })
    }

    /// Render the bucket label for `now`
    pub fn render(&self, now: DateTime<Local>) -> String {
        now.format(&self.pattern).to_string()
    }

    /// Finest unit the pattern changes at (day when nothing is recognised)
    pub fn unit(&self) -> BucketUnit {
        self.unit
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for TimePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn detect_unit(pattern: &str) -> BucketUnit {
    let mut finest: Option<BucketUnit> = None;
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        // skip padding, width and precision modifiers such as %-d, %_H, %.3f, %:z
        let spec = chars.find(|&c| !matches!(c, '-' | '_' | '0'..='9' | '.' | ':' | '#'));
        let Some(spec) = spec else { break };
        if spec == '%' {
            continue;
        }
        if let Some(unit) = BucketUnit::of_specifier(spec) {
            finest = Some(finest.map_or(unit, |current| current.min(unit)));
        }
    }

    finest.unwrap_or(BucketUnit::Day)
}

/// Insert `label` before the extension of `base`
///
/// `logs/app.log` with `2025-01-02` becomes `logs/app.2025-01-02.log`; a base
/// without an extension gets the label appended after a dot.
pub fn bucketed_path(base: &Path, label: &str) -> PathBuf {
    let (stem, ext) = split_name(base);
    let name = match ext {
        Some(ext) => format!("{stem}.{label}.{ext}"),
        None => format!("{stem}.{label}"),
    };
    base.with_file_name(name)
}

/// Split the file name of `path` into stem and optional extension
pub(crate) fn split_name(path: &Path) -> (String, Option<String>) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    (stem, ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_daily_pattern() {
        let pattern = TimePattern::new("%Y-%m-%d").unwrap();
        assert_eq!(pattern.unit(), BucketUnit::Day);

        let now = Local.with_ymd_and_hms(2025, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(pattern.render(now), "2025-01-02");
    }

    #[test]
    fn test_finest_specifier_wins() {
        assert_eq!(TimePattern::new("%Y-%m-%d-%H").unwrap().unit(), BucketUnit::Hour);
        assert_eq!(TimePattern::new("%Y%m%d%H%M").unwrap().unit(), BucketUnit::Minute);
        assert_eq!(TimePattern::new("%Y-%m").unwrap().unit(), BucketUnit::Month);
        assert_eq!(TimePattern::new("%Y").unwrap().unit(), BucketUnit::Year);
        assert_eq!(TimePattern::new("%Y-W%V").unwrap().unit(), BucketUnit::Week);
        assert_eq!(TimePattern::new("%F").unwrap().unit(), BucketUnit::Day);
    }

    #[test]
    fn test_modifiers_are_skipped() {
        assert_eq!(TimePattern::new("%Y-%-m-%-d").unwrap().unit(), BucketUnit::Day);
        assert_eq!(TimePattern::new("%H%M%S%.3f").unwrap().unit(), BucketUnit::Second);
    }

    #[test]
    fn test_constant_pattern_defaults_to_day() {
        let pattern = TimePattern::new("static").unwrap();
        assert_eq!(pattern.unit(), BucketUnit::Day);

        let a = Local.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let b = Local.with_ymd_and_hms(2026, 6, 7, 0, 0, 0).unwrap();
        assert_eq!(pattern.render(a), pattern.render(b));
    }

    #[test]
    fn test_escaped_percent_is_literal() {
        assert_eq!(TimePattern::new("%Y%%H").unwrap().unit(), BucketUnit::Year);
    }

    #[test]
    fn test_invalid_patterns_rejected() {
        assert!(matches!(
            TimePattern::new(""),
            Err(SinkError::InvalidPattern { .. })
        ));
        assert!(TimePattern::new("%Y/%m").is_err());
        assert!(TimePattern::new("%Q").is_err());
    }

    #[test]
    fn test_unit_durations() {
        assert_eq!(BucketUnit::Day.duration(), TimeDelta::days(1));
        assert_eq!(BucketUnit::Month.duration(), TimeDelta::days(30));
        assert!(BucketUnit::Hour < BucketUnit::Day);
        assert_eq!(BucketUnit::Hour.to_string(), "hour");
    }

    #[test]
    fn test_bucketed_path() {
        let path = bucketed_path(Path::new("logs/app.log"), "2025-01-02");
        assert_eq!(path, PathBuf::from("logs/app.2025-01-02.log"));

        let path = bucketed_path(Path::new("app"), "2025-01-02");
        assert_eq!(path, PathBuf::from("app.2025-01-02"));

        let path = bucketed_path(Path::new("/var/log/svc.tar.log"), "01");
        assert_eq!(path, PathBuf::from("/var/log/svc.tar.01.log"));
    }
}
