//! HTML fragment assembly and the extension point over the host runner.
//!
//! The host owns the report page; waldorf only contributes per-test detail
//! fragments. Each profiling summary and call graph becomes a collapsible
//! popup section spliced into the test's captured output, which the base
//! report template renders inside a `<pre>` block.

use std::path::Path;

use time::OffsetDateTime;

use crate::{
    Config, CpuProfiler, ProfileData, Prune, RunDirs, SortKey, TestId, WaldorfError,
    WaldorfResult, dot_for_test, dot_available, relative_to, render_dot, render_stats, run_stamp,
};

/// Where assembled per-test fragments go. Implemented by the host's HTML
/// report writer.
pub trait ReportSink {
    /// Path of the HTML report file; image links are made relative to its
    /// directory.
    fn report_path(&self) -> &Path;

    /// Append the assembled detail fragment for one test.
    fn append_test_detail(&mut self, test: &TestId, html: &str) -> WaldorfResult<()>;
}

/// Collapsible popup section. The fragment closes and reopens the
/// surrounding `<pre>` block of the base template.
pub fn popup_fragment(div_id: &str, title: &str, body: &str) -> String {
    format!(
        r#"
</pre>
<a class="popup_link" onfocus="this.blur();" href="javascript:showTestDetail('{div_id}')">{title}</a>
<p>
<div id='{div_id}' class="popup_window" style="background-color: #D9D9D9; margin-top: 10; margin-bottom: 10">
    <div style='text-align: right; color:black;cursor:pointer'>
        <a onfocus='this.blur();' onclick="document.getElementById('{div_id}').style.display = 'none' " >
           [x]</a>
    </div>
    <pre>{body}</pre>
</div>
</p>
<pre>"#
    )
}

pub fn img_fragment(src: &Path) -> String {
    format!("\n<img src=\"{}\">\n", src.display())
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// The per-test profiling extension. Construct once per run of the host
/// test-runner; `profile_test` is the pre-test wrap and `report_test` the
/// post-test report assembly hook.
#[derive(Debug)]
pub struct HtmlProfiler {
    config: Config,
    dirs: RunDirs,
    profiler: CpuProfiler,
    call_graph: bool,
}

impl HtmlProfiler {
    pub fn new(config: Config) -> WaldorfResult<Self> {
        if config.sample_hz <= 0 {
            return Err(WaldorfError::Config(format!(
                "sample_hz must be positive, got {}",
                config.sample_hz
            )));
        }
        let stamp = run_stamp(OffsetDateTime::now_utc())?;
        let dirs = RunDirs::new(config.profile_dir.clone(), stamp);
        std::fs::create_dir_all(dirs.run_dir())?;

        let call_graph = config.call_graph && dot_available();
        if config.call_graph && !call_graph {
            tracing::debug!("call graphs requested but no layout engine is installed");
        }

        Ok(Self {
            profiler: CpuProfiler::new(config.sample_hz),
            config,
            dirs,
            call_graph,
        })
    }

    pub fn run_dirs(&self) -> &RunDirs {
        &self.dirs
    }

    pub fn call_graph_enabled(&self) -> bool {
        self.call_graph
    }

    /// Run one test under the profiler and persist its profile data.
    pub fn profile_test<T>(&self, test: &TestId, run: impl FnOnce() -> T) -> WaldorfResult<T> {
        std::fs::create_dir_all(self.dirs.test_dir(test))?;
        let (value, profile) = self.profiler.profile(run)?;
        profile.write_json(&self.dirs.profile_path(test))?;
        Ok(value)
    }

    /// Assemble this test's detail fragment and hand it to the host report.
    pub fn report_test(
        &self,
        sink: &mut dyn ReportSink,
        test: &TestId,
        captured_output: &str,
    ) -> WaldorfResult<()> {
        let html = self.test_detail_html(test, captured_output, sink.report_path())?;
        sink.append_test_detail(test, &html)
    }

    /// Escaped captured output, both profiling summaries, and (when
    /// enabled) the three call-graph sections.
    pub fn test_detail_html(
        &self,
        test: &TestId,
        captured_output: &str,
        report_path: &Path,
    ) -> WaldorfResult<String> {
        let profile = ProfileData::read_json(&self.dirs.profile_path(test))?;

        let mut out = escape_html(captured_output);
        for sort in SortKey::ALL {
            out.push_str(&self.profile_section(test, &profile, sort));
        }
        if self.call_graph {
            for prune in Prune::ALL {
                out.push_str(&self.callgraph_section(test, &profile, prune, report_path)?);
            }
        }
        Ok(out)
    }

    fn profile_section(&self, test: &TestId, profile: &ProfileData, sort: SortKey) -> String {
        let report = render_stats(profile, sort);
        popup_fragment(
            &format!("{}.{}", test.as_str(), sort.label()),
            sort.link_title(),
            &escape_html(&report),
        )
    }

    fn callgraph_section(
        &self,
        test: &TestId,
        profile: &ProfileData,
        prune: Prune,
        report_path: &Path,
    ) -> WaldorfResult<String> {
        let dot = dot_for_test(profile, test.short_name(), prune);
        let image_path = self.dirs.image_path(test, prune, self.config.image_format);

        if self.config.keep_dot {
            let dot_path = self.dirs.dot_path(test, prune);
            std::fs::write(&dot_path, &dot)?;
            render_dot(&dot_path, &image_path, self.config.image_format)?;
        } else {
            let tmp = std::env::temp_dir().join(format!("waldorf-{}.dot", uuid::Uuid::new_v4()));
            std::fs::write(&tmp, &dot)?;
            let rendered = render_dot(&tmp, &image_path, self.config.image_format);
            let _ = std::fs::remove_file(&tmp);
            rendered?;
        }

        let report_dir = report_path.parent().unwrap_or_else(|| Path::new("."));
        let rel = relative_to(&image_path, report_dir);
        Ok(popup_fragment(
            &format!("{}.{}", test.as_str(), prune.file_stem()),
            prune.title(),
            &img_fragment(&rel),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    struct MemorySink {
        report_path: PathBuf,
        details: Vec<(String, String)>,
    }

    impl ReportSink for MemorySink {
        fn report_path(&self) -> &Path {
            &self.report_path
        }

        fn append_test_detail(&mut self, test: &TestId, html: &str) -> WaldorfResult<()> {
            self.details.push((test.as_str().to_string(), html.to_string()));
            Ok(())
        }
    }

    fn temp_workspace(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("waldorf-report-{name}-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("workspace");
        dir
    }

    fn sample_profile() -> ProfileData {
        ProfileData::from_folded(
            100,
            &[(vec!["suite::case".to_string(), "worker".to_string()], 10)],
        )
    }

    fn profiler_without_call_graphs(ws: &Path) -> HtmlProfiler {
        let config = Config {
            profile_dir: ws.join("profiles"),
            call_graph: false,
            ..Config::default()
        };
        HtmlProfiler::new(config).expect("profiler")
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>"fast" & 'loose'</b>"#),
            "&lt;b&gt;&quot;fast&quot; &amp; &apos;loose&apos;&lt;/b&gt;"
        );
    }

    #[test]
    fn popup_fragment_wires_div_id_into_link_and_window() {
        let html = popup_fragment("suite.case.cumulative", "Profiling report", "BODY");
        assert!(html.contains("showTestDetail('suite.case.cumulative')"));
        assert!(html.contains("<div id='suite.case.cumulative' class=\"popup_window\""));
        assert!(html.contains("<pre>BODY</pre>"));
        // The fragment must close and reopen the surrounding pre block.
        assert!(html.trim_start().starts_with("</pre>"));
        assert!(html.trim_end().ends_with("<pre>"));
    }

    #[test]
    fn img_fragment_embeds_the_source_path() {
        assert_eq!(
            img_fragment(Path::new("../run/test/graph.png")),
            "\n<img src=\"../run/test/graph.png\">\n"
        );
    }

    #[test]
    fn new_rejects_non_positive_sample_rate() {
        let config = Config {
            sample_hz: 0,
            ..Config::default()
        };
        let err = HtmlProfiler::new(config).expect_err("must fail");
        match err {
            WaldorfError::Config(msg) => assert!(msg.contains("sample_hz"), "message: {msg}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn detail_html_contains_escaped_output_and_both_summaries() {
        let ws = temp_workspace("detail");
        let profiler = profiler_without_call_graphs(&ws);
        let test = TestId::new("suite::case");
        sample_profile()
            .write_json(&profiler.run_dirs().profile_path(&test))
            .expect("profile");

        let html = profiler
            .test_detail_html(&test, "output <raw>", &ws.join("report.html"))
            .expect("detail html");

        assert!(html.starts_with("output &lt;raw&gt;"));
        assert!(html.contains("Profiling report (cumulative time)"));
        assert!(html.contains("Profiling report (internal time)"));
        assert!(html.contains("showTestDetail('suite::case.cumulative')"));
        assert!(html.contains("showTestDetail('suite::case.internal')"));
        // Summaries are escaped before embedding.
        assert!(html.contains("--- PROFILE (SORTED BY CUMULATIVE TIME)---"));
        assert!(!html.contains("<img"), "call graphs are disabled");
    }

    #[test]
    fn report_test_appends_through_the_sink() {
        let ws = temp_workspace("sink");
        let profiler = profiler_without_call_graphs(&ws);
        let test = TestId::new("suite::case");
        sample_profile()
            .write_json(&profiler.run_dirs().profile_path(&test))
            .expect("profile");

        let mut sink = MemorySink {
            report_path: ws.join("report.html"),
            details: Vec::new(),
        };
        profiler
            .report_test(&mut sink, &test, "ok")
            .expect("report test");

        assert_eq!(sink.details.len(), 1);
        assert_eq!(sink.details[0].0, "suite::case");
        assert!(sink.details[0].1.contains("Profiling report (cumulative time)"));
    }

    #[test]
    fn missing_profile_is_an_error() {
        let ws = temp_workspace("missing-profile");
        let profiler = profiler_without_call_graphs(&ws);
        let test = TestId::new("suite::case");
        let err = profiler
            .test_detail_html(&test, "", &ws.join("report.html"))
            .expect_err("no profile recorded");
        match err {
            WaldorfError::Io(_) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
