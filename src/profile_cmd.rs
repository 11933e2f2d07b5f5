//! CLI commands over recorded profiling runs (`waldorf <command> ...`).

use clap::Subcommand;

use std::path::{Path, PathBuf};

use crate::{
    Config, ProfileData, Prune, SortKey, TestId, WaldorfError, WaldorfResult, bundle_run,
    dot_available, dot_for_test, list_runs, render_dot, render_stats, resolve_run,
    PROFILE_FILENAME,
};

const RUN_HELP: &str = "Run selector: a stamp directory under the profile dir, or `latest`.";

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// List recorded profiling runs.
    Runs,
    /// Print the textual profiling summary for one test in a run.
    Show {
        #[arg(value_name = "RUN", help = RUN_HELP)]
        run: String,
        #[arg(long)]
        test: String,
        #[arg(long, default_value = "cumulative")]
        sort: SortKey,
    },
    /// Regenerate the call-graph files for one test in a run.
    Graph {
        #[arg(value_name = "RUN", help = RUN_HELP)]
        run: String,
        #[arg(long)]
        test: String,
    },
    /// Bundle a run directory into a zip archive.
    Bundle {
        #[arg(value_name = "RUN", help = RUN_HELP)]
        run: String,
        #[arg(long)]
        out: PathBuf,
    },
}

pub fn profile_command(config: &Config, command: &ProfileCommand) -> WaldorfResult<serde_json::Value> {
    match command {
        ProfileCommand::Runs => {
            let runs = list_runs(&config.profile_dir)?;
            Ok(serde_json::json!({
                "schemaVersion": "waldorf.runs.v1",
                "profileDir": config.profile_dir,
                "runs": runs,
            }))
        }

        ProfileCommand::Show { run, test, sort } => {
            let run_dir = resolve_run(&config.profile_dir, run)?;
            let profile = load_test_profile(&run_dir, test)?;
            Ok(serde_json::json!({
                "schemaVersion": "waldorf.show.v1",
                "run": run,
                "test": test,
                "sort": sort,
                "content": render_stats(&profile, *sort),
            }))
        }

        ProfileCommand::Graph { run, test } => {
            let run_dir = resolve_run(&config.profile_dir, run)?;
            let profile = load_test_profile(&run_dir, test)?;
            let test_id = TestId::new(test.clone());
            let test_dir = run_dir.join(test_id.dir_name());
            let rendered = dot_available();

            let mut files = Vec::new();
            for prune in Prune::ALL {
                let dot = dot_for_test(&profile, test_id.short_name(), prune);
                let dot_path = test_dir.join(format!("{}.dot", prune.file_stem()));
                std::fs::write(&dot_path, &dot)?;
                files.push(dot_path.to_string_lossy().to_string());
                if rendered {
                    let image_path = test_dir.join(format!(
                        "{}.{}",
                        prune.file_stem(),
                        config.image_format.extension()
                    ));
                    render_dot(&dot_path, &image_path, config.image_format)?;
                    files.push(image_path.to_string_lossy().to_string());
                }
            }

            Ok(serde_json::json!({
                "schemaVersion": "waldorf.graph.v1",
                "run": run,
                "test": test,
                "rendered": rendered,
                "files": files,
            }))
        }

        ProfileCommand::Bundle { run, out } => {
            let run_dir = resolve_run(&config.profile_dir, run)?;
            bundle_run(&run_dir, out)?;
            Ok(serde_json::json!({
                "schemaVersion": "waldorf.bundle.v1",
                "run": run,
                "zip": out,
            }))
        }
    }
}

fn load_test_profile(run_dir: &Path, test: &str) -> WaldorfResult<ProfileData> {
    let test_id = TestId::new(test);
    let path = run_dir.join(test_id.dir_name()).join(PROFILE_FILENAME);
    if !path.is_file() {
        return Err(WaldorfError::Report(format!(
            "no profile recorded for test {test:?} under {}",
            run_dir.display()
        )));
    }
    ProfileData::read_json(&path)
}
