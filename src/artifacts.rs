//! Per-test artifact layout under the profile directory.
//!
//! One run of the host test-runner maps to one timestamped directory, and
//! every profiled test gets a dedicated subdirectory inside it, so tests
//! within a run never contend for files.

use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};

use time::OffsetDateTime;
use time::macros::format_description;
use walkdir::WalkDir;

use crate::{ImageFormat, Prune, WaldorfError, WaldorfResult};

/// Captured profile data inside a test directory.
pub const PROFILE_FILENAME: &str = "test.profile";

pub const DOT_SUFFIX: &str = "dot";

/// Identifier of one test as reported by the host runner, e.g.
/// `suite::module::case`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestId {
    id: String,
}

impl TestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// Last path segment; call-graph roots are matched against this.
    pub fn short_name(&self) -> &str {
        let tail = self.id.rsplit("::").next().unwrap_or(&self.id);
        tail.rsplit('.').next().unwrap_or(tail)
    }

    /// Directory-safe form of the identifier (`suite::case` → `suite.case`).
    pub fn dir_name(&self) -> String {
        self.id.replace("::", ".")
    }
}

/// Run directory stamp, `YYYY_MM_DD_HH_MM_SS`.
pub fn run_stamp(now: OffsetDateTime) -> WaldorfResult<String> {
    let format = format_description!("[year]_[month]_[day]_[hour]_[minute]_[second]");
    Ok(now.format(&format)?)
}

/// Resolved artifact paths for one run.
#[derive(Debug, Clone)]
pub struct RunDirs {
    profile_dir: PathBuf,
    stamp: String,
}

impl RunDirs {
    pub fn new(profile_dir: PathBuf, stamp: String) -> Self {
        Self { profile_dir, stamp }
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    pub fn run_dir(&self) -> PathBuf {
        self.profile_dir.join(&self.stamp)
    }

    pub fn test_dir(&self, test: &TestId) -> PathBuf {
        self.run_dir().join(test.dir_name())
    }

    pub fn profile_path(&self, test: &TestId) -> PathBuf {
        self.test_dir(test).join(PROFILE_FILENAME)
    }

    pub fn dot_path(&self, test: &TestId, prune: Prune) -> PathBuf {
        self.test_dir(test)
            .join(format!("{}.{DOT_SUFFIX}", prune.file_stem()))
    }

    pub fn image_path(&self, test: &TestId, prune: Prune, format: ImageFormat) -> PathBuf {
        self.test_dir(test)
            .join(format!("{}.{}", prune.file_stem(), format.extension()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEntry {
    pub stamp: String,
    pub tests: usize,
}

/// Recorded runs under the profile directory, oldest first. The stamp
/// format sorts lexicographically in time order.
pub fn list_runs(profile_dir: &Path) -> WaldorfResult<Vec<RunEntry>> {
    let mut out = Vec::new();
    if !profile_dir.exists() {
        return Ok(out);
    }
    for entry in WalkDir::new(profile_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(walkdir_error)?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let stamp = entry.file_name().to_string_lossy().to_string();
        let tests = count_test_dirs(entry.path())?;
        out.push(RunEntry { stamp, tests });
    }
    out.sort_by(|a, b| a.stamp.cmp(&b.stamp));
    Ok(out)
}

fn count_test_dirs(run_dir: &Path) -> WaldorfResult<usize> {
    let mut count = 0;
    for entry in WalkDir::new(run_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(walkdir_error)?;
        if entry.file_type().is_dir() && entry.path().join(PROFILE_FILENAME).is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// Resolve a run selector (a stamp directory name, or `latest`) to its
/// directory.
pub fn resolve_run(profile_dir: &Path, selector: &str) -> WaldorfResult<PathBuf> {
    if selector == "latest" {
        let runs = list_runs(profile_dir)?;
        return match runs.last() {
            Some(entry) => Ok(profile_dir.join(&entry.stamp)),
            None => Err(WaldorfError::InvalidArgument(format!(
                "no recorded runs under {}",
                profile_dir.display()
            ))),
        };
    }
    let dir = profile_dir.join(selector);
    if dir.is_dir() {
        return Ok(dir);
    }
    Err(WaldorfError::InvalidArgument(format!(
        "no run {selector:?} under {}",
        profile_dir.display()
    )))
}

/// `path` expressed relative to `base`. Both sides must be either absolute
/// or relative to the same root; the report writer hands us siblings of
/// the HTML file, which satisfies that.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_comps: Vec<Component<'_>> = path.components().collect();
    let base_comps: Vec<Component<'_>> = base.components().collect();

    let mut shared = 0;
    while shared < path_comps.len()
        && shared < base_comps.len()
        && path_comps[shared] == base_comps[shared]
    {
        shared += 1;
    }

    let mut out = PathBuf::new();
    for _ in shared..base_comps.len() {
        out.push("..");
    }
    for comp in &path_comps[shared..] {
        out.push(comp.as_os_str());
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Zip one run directory for sharing.
pub fn bundle_run(run_dir: &Path, out_zip: &Path) -> WaldorfResult<()> {
    if let Some(parent) = out_zip.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(out_zip)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for entry in WalkDir::new(run_dir).min_depth(1) {
        let entry = entry.map_err(walkdir_error)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(run_dir).unwrap_or(entry.path());
        let name = rel.to_string_lossy().replace('\\', "/");
        zip.start_file(name, options)?;
        let bytes = std::fs::read(entry.path())?;
        zip.write_all(&bytes)?;
    }

    zip.finish()?;
    Ok(())
}

fn walkdir_error(e: walkdir::Error) -> WaldorfError {
    let msg = e.to_string();
    WaldorfError::Io(e.into_io_error().unwrap_or_else(|| std::io::Error::other(msg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Date;
    use time::Month;
    use uuid::Uuid;

    fn temp_workspace(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("waldorf-artifacts-{name}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("workspace");
        dir
    }

    #[test]
    fn run_stamp_uses_underscore_layout() {
        let date = Date::from_calendar_date(2026, Month::August, 7).expect("date");
        let now = date.with_hms(14, 3, 9).expect("time").assume_utc();
        assert_eq!(run_stamp(now).expect("stamp"), "2026_08_07_14_03_09");
    }

    #[test]
    fn test_id_short_name_takes_last_segment() {
        assert_eq!(TestId::new("suite::module::case").short_name(), "case");
        assert_eq!(TestId::new("pkg.module.case").short_name(), "case");
        assert_eq!(TestId::new("bare").short_name(), "bare");
    }

    #[test]
    fn test_dirs_are_sanitized_and_nested_under_the_stamp() {
        let dirs = RunDirs::new(PathBuf::from("profiles"), "2026_01_01_00_00_00".to_string());
        let test = TestId::new("suite::case");
        assert_eq!(
            dirs.profile_path(&test),
            PathBuf::from("profiles/2026_01_01_00_00_00/suite.case/test.profile")
        );
        assert_eq!(
            dirs.dot_path(&test, Prune::PrunedCumulative),
            PathBuf::from(
                "profiles/2026_01_01_00_00_00/suite.case/call_graph_pruned_cumulative.dot"
            )
        );
        assert_eq!(
            dirs.image_path(&test, Prune::NonPruned, ImageFormat::Png),
            PathBuf::from("profiles/2026_01_01_00_00_00/suite.case/call_graph_non_pruned.png")
        );
    }

    #[test]
    fn list_runs_counts_tests_with_profiles() {
        let ws = temp_workspace("list-runs");
        let run = ws.join("2026_01_01_00_00_00");
        std::fs::create_dir_all(run.join("a.one")).expect("test dir");
        std::fs::write(run.join("a.one").join(PROFILE_FILENAME), b"{}").expect("profile");
        std::fs::create_dir_all(run.join("a.two")).expect("empty test dir");

        let runs = list_runs(&ws).expect("list");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].stamp, "2026_01_01_00_00_00");
        assert_eq!(runs[0].tests, 1);
    }

    #[test]
    fn resolve_run_latest_picks_newest_stamp() {
        let ws = temp_workspace("resolve-latest");
        std::fs::create_dir_all(ws.join("2026_01_01_00_00_00")).expect("old run");
        std::fs::create_dir_all(ws.join("2026_02_01_00_00_00")).expect("new run");

        let dir = resolve_run(&ws, "latest").expect("resolve");
        assert_eq!(dir, ws.join("2026_02_01_00_00_00"));

        let err = resolve_run(&ws, "2026_03_01_00_00_00").expect_err("missing run");
        match err {
            WaldorfError::InvalidArgument(msg) => assert!(msg.contains("no run"), "message: {msg}"),
            other => panic!("expected invalid argument, got {other:?}"),
        }
    }

    #[test]
    fn relative_to_walks_up_shared_prefix() {
        assert_eq!(
            relative_to(
                Path::new("/out/profiles/run/test/graph.png"),
                Path::new("/out/reports")
            ),
            PathBuf::from("../profiles/run/test/graph.png")
        );
        assert_eq!(
            relative_to(Path::new("/out/report"), Path::new("/out/report")),
            PathBuf::from(".")
        );
        assert_eq!(
            relative_to(Path::new("profiles/x.png"), Path::new("profiles")),
            PathBuf::from("x.png")
        );
    }

    #[test]
    fn bundle_run_zips_nested_files() {
        let ws = temp_workspace("bundle");
        let run = ws.join("run");
        std::fs::create_dir_all(run.join("suite.case")).expect("test dir");
        std::fs::write(run.join("suite.case").join(PROFILE_FILENAME), b"{}").expect("profile");
        let out = ws.join("run.zip");

        bundle_run(&run, &out).expect("bundle");

        let file = File::open(&out).expect("open zip");
        let mut zip = zip::ZipArchive::new(file).expect("read zip");
        assert_eq!(zip.len(), 1);
        let entry = zip.by_index(0).expect("entry");
        assert_eq!(entry.name(), "suite.case/test.profile");
    }
}
