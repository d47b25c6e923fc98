use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};
use time::UtcOffset;

use crate::utils::time::{ClockTime, parse_utc_offset};

pub const DEFAULT_DATABASE_FILE: &str = "replylag.sqlite";
pub const REPORT_ARTIFACT_FILE: &str = "report.json";
pub const DEFAULT_BUSINESS_START: ClockTime = ClockTime::at(9, 30, 0);
pub const DEFAULT_DAY_END: ClockTime = ClockTime::at(23, 59, 59);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub home_dir: PathBuf,
    pub cwd: PathBuf,
    pub out_dir: PathBuf,
    pub database_path: PathBuf,
}

impl RuntimePaths {
    #[must_use]
    pub fn report_artifact_path(&self) -> PathBuf {
        self.out_dir.join(REPORT_ARTIFACT_FILE)
    }

    /// Resolves a user-supplied input path the way `--out-dir` and `--db` are.
    pub fn resolve_input(&self, path: &Path) -> Result<PathBuf> {
        resolve_user_path(path, &self.home_dir, &self.cwd)
    }
}

pub fn resolve_runtime_paths(
    home_dir: &Path,
    cwd: &Path,
    out_dir_override: Option<&Path>,
    database_override: Option<&Path>,
) -> Result<RuntimePaths> {
    if !home_dir.is_absolute() {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    let home_dir = normalize_lexical(home_dir);
    let cwd = normalize_lexical(cwd);
    let out_dir = match out_dir_override {
        Some(path) => resolve_user_path(path, &home_dir, &cwd)?,
        None => normalize_lexical(&home_dir.join(".replylag").join("output")),
    };
    let database_path = match database_override {
        Some(path) => resolve_user_path(path, &home_dir, &cwd)?,
        None => out_dir.join(DEFAULT_DATABASE_FILE),
    };

    Ok(RuntimePaths {
        home_dir,
        cwd,
        out_dir,
        database_path,
    })
}

/// The non-working part of every day. Instants strictly inside
/// `(start, business_start)` are moved to `business_start`; `day_end` is the
/// last counted second of a day when a reply crosses midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffHoursWindow {
    pub start: ClockTime,
    pub business_start: ClockTime,
    pub day_end: ClockTime,
}

impl Default for OffHoursWindow {
    fn default() -> Self {
        Self {
            start: ClockTime::MIDNIGHT,
            business_start: DEFAULT_BUSINESS_START,
            day_end: DEFAULT_DAY_END,
        }
    }
}

impl OffHoursWindow {
    pub fn new(business_start: ClockTime, day_end: ClockTime) -> Result<Self> {
        if business_start <= ClockTime::MIDNIGHT {
            bail!("business start must be after 00:00:00, got {business_start}");
        }
        if business_start >= day_end {
            bail!("business start {business_start} must precede day end {day_end}");
        }

        Ok(Self {
            start: ClockTime::MIDNIGHT,
            business_start,
            day_end,
        })
    }

    /// Open on both ends.
    #[must_use]
    pub fn contains(&self, time_of_day: ClockTime) -> bool {
        time_of_day > self.start && time_of_day < self.business_start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    pub window: OffHoursWindow,
    pub utc_offset: UtcOffset,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            window: OffHoursWindow::default(),
            utc_offset: UtcOffset::UTC,
        }
    }
}

pub fn resolve_report_settings(
    business_start: Option<&str>,
    utc_offset: Option<&str>,
) -> Result<ReportSettings> {
    let window = match business_start {
        Some(raw) => OffHoursWindow::new(ClockTime::parse(raw)?, DEFAULT_DAY_END)?,
        None => OffHoursWindow::default(),
    };
    let utc_offset = match utc_offset {
        Some(raw) => parse_utc_offset(raw)?,
        None => UtcOffset::UTC,
    };

    Ok(ReportSettings { window, utc_offset })
}

fn resolve_user_path(path: &Path, home_dir: &Path, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::{OffHoursWindow, resolve_report_settings, resolve_runtime_paths};
    use crate::utils::time::ClockTime;
    use std::path::Path;
    use time::UtcOffset;

    #[test]
    fn defaults_database_under_replylag_output() {
        let paths =
            resolve_runtime_paths(Path::new("/home/tester"), Path::new("/work/repo"), None, None)
                .expect("paths should resolve");

        assert_eq!(paths.out_dir, Path::new("/home/tester/.replylag/output"));
        assert_eq!(
            paths.database_path,
            Path::new("/home/tester/.replylag/output/replylag.sqlite")
        );
        assert_eq!(
            paths.report_artifact_path(),
            Path::new("/home/tester/.replylag/output/report.json")
        );
    }

    #[test]
    fn database_override_resolves_independently_of_out_dir() {
        let paths = resolve_runtime_paths(
            Path::new("/home/tester"),
            Path::new("/work/repo"),
            Some(Path::new("~/reports")),
            Some(Path::new("./data/../data/chat.sqlite")),
        )
        .expect("overrides should resolve");

        assert_eq!(paths.out_dir, Path::new("/home/tester/reports"));
        assert_eq!(paths.database_path, Path::new("/work/repo/data/chat.sqlite"));
    }

    #[test]
    fn input_paths_expand_home_and_normalize_against_cwd() {
        let paths =
            resolve_runtime_paths(Path::new("/home/tester"), Path::new("/work/repo"), None, None)
                .expect("paths should resolve");

        assert_eq!(
            paths
                .resolve_input(Path::new("~/exports/messages.jsonl"))
                .expect("home input should resolve"),
            Path::new("/home/tester/exports/messages.jsonl")
        );
        assert_eq!(
            paths
                .resolve_input(Path::new("./data/../managers.jsonl"))
                .expect("relative input should resolve"),
            Path::new("/work/repo/managers.jsonl")
        );
        assert_eq!(
            paths
                .resolve_input(Path::new("/srv/supervisors.jsonl"))
                .expect("absolute input should resolve"),
            Path::new("/srv/supervisors.jsonl")
        );
    }

    #[test]
    fn rejects_non_absolute_cwd() {
        let err = resolve_runtime_paths(Path::new("/home/tester"), Path::new("repo"), None, None)
            .expect_err("relative cwd must fail");
        assert!(
            err.to_string().contains("cwd must be absolute"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn rejects_tilde_username_syntax() {
        let err = resolve_runtime_paths(
            Path::new("/home/tester"),
            Path::new("/work/repo"),
            None,
            Some(Path::new("~someone/chat.sqlite")),
        )
        .expect_err("~username syntax must fail");
        assert!(err.to_string().contains("unsupported home expansion syntax"));
    }

    #[test]
    fn default_window_is_midnight_to_half_past_nine() {
        let window = OffHoursWindow::default();
        assert_eq!(window.start.to_string(), "00:00:00");
        assert_eq!(window.business_start.to_string(), "09:30:00");
        assert_eq!(window.day_end.to_string(), "23:59:59");
    }

    #[test]
    fn window_bounds_are_open() {
        let window = OffHoursWindow::default();
        let at = |raw: &str| ClockTime::parse(raw).expect("clock time should parse");

        assert!(!window.contains(at("00:00:00")));
        assert!(window.contains(at("00:00:01")));
        assert!(window.contains(at("09:29:59")));
        assert!(!window.contains(at("09:30:00")));
        assert!(!window.contains(at("14:00:00")));
    }

    #[test]
    fn settings_parse_business_start_and_offset() {
        let settings = resolve_report_settings(Some("08:00"), Some("+03:00"))
            .expect("settings should resolve");
        assert_eq!(settings.window.business_start.to_string(), "08:00:00");
        assert_eq!(
            settings.utc_offset,
            UtcOffset::from_hms(3, 0, 0).expect("offset should build")
        );

        let defaults = resolve_report_settings(None, None).expect("defaults should resolve");
        assert_eq!(defaults.window, OffHoursWindow::default());
        assert_eq!(defaults.utc_offset, UtcOffset::UTC);
    }

    #[test]
    fn settings_reject_midnight_business_start() {
        let err = resolve_report_settings(Some("00:00"), None)
            .expect_err("midnight business start must fail");
        assert!(err.to_string().contains("business start must be after"));
    }
}
