//! Per-test CPU capture via the `pprof` statistical profiler.

use crate::{ProfileData, WaldorfError, WaldorfResult};

/// Shared-object frames that only add noise to test profiles.
const BLOCKLIST: &[&str] = &["libc", "libgcc", "pthread", "vdso"];

#[derive(Debug, Clone, Copy)]
pub struct CpuProfiler {
    sample_hz: i32,
}

impl CpuProfiler {
    pub fn new(sample_hz: i32) -> Self {
        Self { sample_hz }
    }

    /// Run one test closure under the profiler. Tests run one at a time,
    /// so the guard never overlaps another capture.
    pub fn profile<T>(&self, run: impl FnOnce() -> T) -> WaldorfResult<(T, ProfileData)> {
        let guard = pprof::ProfilerGuardBuilder::default()
            .frequency(self.sample_hz)
            .blocklist(BLOCKLIST)
            .build()
            .map_err(|e| WaldorfError::Profile(e.to_string()))?;

        let value = run();

        let report = guard
            .report()
            .build()
            .map_err(|e| WaldorfError::Profile(e.to_string()))?;
        drop(guard);

        let stacks = folded_from_report(&report);
        Ok((value, ProfileData::from_folded(self.sample_hz, &stacks)))
    }
}

/// Flatten a pprof report into root-first folded stacks. The backtrace
/// stores frames leaf-first and inlined symbols innermost-first, so both
/// levels are reversed.
fn folded_from_report(report: &pprof::Report) -> Vec<(Vec<String>, u64)> {
    let mut stacks = Vec::new();
    for (frames, count) in &report.data {
        let mut stack = Vec::new();
        for frame in frames.frames.iter().rev() {
            for symbol in frame.iter().rev() {
                stack.push(symbol.name());
            }
        }
        if stack.is_empty() || *count <= 0 {
            continue;
        }
        stacks.push((stack, *count as u64));
    }
    stacks.sort();
    stacks
}
