//! `waldorf.toml` config loading and the host-facing CLI overlay.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

/// Output format for rendered call-graph images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }

    pub fn dot_flag(self) -> &'static str {
        match self {
            Self::Png => "-Tpng",
            Self::Svg => "-Tsvg",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Directory holding one timestamped subdirectory per profiled run.
    #[serde(default = "default_profile_dir")]
    pub profile_dir: PathBuf,

    /// Render call graphs for each test in addition to the textual summaries.
    #[serde(default)]
    pub call_graph: bool,

    /// Profiler sampling frequency in Hz.
    #[serde(default = "default_sample_hz")]
    pub sample_hz: i32,

    /// Image format handed to the graph renderer.
    #[serde(default = "default_image_format")]
    pub image_format: ImageFormat,

    /// Keep the intermediate .dot files next to the rendered images.
    #[serde(default = "default_keep_dot")]
    pub keep_dot: bool,
}

fn default_profile_dir() -> PathBuf {
    PathBuf::from("results_profiles")
}

fn default_sample_hz() -> i32 {
    99
}

fn default_image_format() -> ImageFormat {
    ImageFormat::Png
}

fn default_keep_dot() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile_dir: default_profile_dir(),
            call_graph: false,
            sample_hz: default_sample_hz(),
            image_format: default_image_format(),
            keep_dot: default_keep_dot(),
        }
    }
}

impl Config {
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Apply host CLI options on top of the file config.
    pub fn merge_args(&mut self, args: &ProfilerArgs) {
        if args.call_graph {
            self.call_graph = true;
        }
        if let Some(dir) = &args.profile_dir {
            self.profile_dir = dir.clone();
        }
    }
}

/// Profiler options a host test-runner can `#[command(flatten)]` into its
/// own CLI.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ProfilerArgs {
    /// Adds call graphs based on the profiling to the HTML report for each
    /// test.
    #[arg(long = "html-call-graph")]
    pub call_graph: bool,

    /// Directory storing the call graph and statistics files for each
    /// individual test. The HTML report links to the files thus created.
    #[arg(long = "html-profile-dir", env = "WALDORF_PROFILE_DIR", value_name = "DIR")]
    pub profile_dir: Option<PathBuf>,
}
