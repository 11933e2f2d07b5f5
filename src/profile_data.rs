//! Captured profile data: per-function sample counts and call edges.

use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One profiled function. `self_samples` counts samples with the function
/// on top of the stack, `cum_samples` counts samples with it anywhere on
/// the stack (at most once per sample, so recursion is not double-counted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionStats {
    pub name: String,
    #[serde(rename = "selfSamples")]
    pub self_samples: u64,
    #[serde(rename = "cumSamples")]
    pub cum_samples: u64,
}

/// A caller → callee adjacency observed in sampled stacks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
    pub samples: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileData {
    pub format: String,
    pub version: u32,
    #[serde(rename = "sampleHz")]
    pub sample_hz: i32,
    #[serde(rename = "totalSamples")]
    pub total_samples: u64,
    pub functions: Vec<FunctionStats>,
    pub edges: Vec<CallEdge>,
}

impl ProfileData {
    /// Build from root-first folded stacks, `(frames, weight)` per stack.
    pub fn from_folded(sample_hz: i32, stacks: &[(Vec<String>, u64)]) -> Self {
        let mut self_samples = BTreeMap::<String, u64>::new();
        let mut cum_samples = BTreeMap::<String, u64>::new();
        let mut edge_samples = BTreeMap::<(String, String), u64>::new();
        let mut total = 0u64;

        for (frames, weight) in stacks {
            if frames.is_empty() || *weight == 0 {
                continue;
            }
            total = total.saturating_add(*weight);

            let mut seen = BTreeSet::new();
            for name in frames {
                if seen.insert(name.as_str()) {
                    *cum_samples.entry(name.clone()).or_insert(0) += weight;
                }
            }
            if let Some(leaf) = frames.last() {
                *self_samples.entry(leaf.clone()).or_insert(0) += weight;
            }
            for pair in frames.windows(2) {
                *edge_samples
                    .entry((pair[0].clone(), pair[1].clone()))
                    .or_insert(0) += weight;
            }
        }

        let mut functions: Vec<FunctionStats> = cum_samples
            .into_iter()
            .map(|(name, cum)| FunctionStats {
                self_samples: self_samples.get(&name).copied().unwrap_or(0),
                cum_samples: cum,
                name,
            })
            .collect();
        functions.sort_by(|a, b| {
            b.cum_samples
                .cmp(&a.cum_samples)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut edges: Vec<CallEdge> = edge_samples
            .into_iter()
            .map(|((caller, callee), samples)| CallEdge {
                caller,
                callee,
                samples,
            })
            .collect();
        edges.sort_by(|a, b| {
            b.samples
                .cmp(&a.samples)
                .then_with(|| a.caller.cmp(&b.caller))
                .then_with(|| a.callee.cmp(&b.callee))
        });

        Self {
            format: "waldorf-profile".to_string(),
            version: 1,
            sample_hz,
            total_samples: total,
            functions,
            edges,
        }
    }

    pub fn samples_to_ms(&self, samples: u64) -> f64 {
        if self.sample_hz <= 0 {
            return 0.0;
        }
        samples as f64 * 1000.0 / f64::from(self.sample_hz)
    }

    /// Fraction of total samples, 0.0 when the profile is empty.
    pub fn fraction(&self, samples: u64) -> f64 {
        if self.total_samples == 0 {
            return 0.0;
        }
        samples as f64 / self.total_samples as f64
    }

    pub fn write_json(&self, path: &Path) -> crate::WaldorfResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> crate::WaldorfResult<Self> {
        let bytes = std::fs::read(path)?;
        let p: ProfileData = serde_json::from_slice(&bytes)?;
        Ok(p)
    }
}
