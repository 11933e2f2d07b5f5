//! Call-graph construction, pruning, and DOT output.
//!
//! The graph is a projection of [`ProfileData`]: one node per profiled
//! function weighted by its share of total samples, one edge per observed
//! caller → callee adjacency. Layout and rasterization stay with the
//! external Graphviz engine; this module only emits the DOT description.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::{CallEdge, ProfileData};

/// Time metric a graph is pruned and colored by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cumulative,
    Internal,
}

/// The three fixed pruning policies applied per test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prune {
    PrunedCumulative,
    PrunedInternal,
    NonPruned,
}

impl Prune {
    pub const ALL: [Prune; 3] = [Self::PrunedCumulative, Self::PrunedInternal, Self::NonPruned];

    /// File stem of the .dot/image artifacts, also the popup div id suffix.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::PrunedCumulative => "call_graph_pruned_cumulative",
            Self::PrunedInternal => "call_graph_pruned_internal",
            Self::NonPruned => "call_graph_non_pruned",
        }
    }

    /// Section title shown as the popup link text.
    pub fn title(self) -> &'static str {
        match self {
            Self::PrunedCumulative => "Call-graph (pruned, colored by cumulative time)",
            Self::PrunedInternal => "Call-graph (pruned, colored by internal time)",
            Self::NonPruned => "Call-graph (not pruned, colored by cumulative time)",
        }
    }

    pub fn metric(self) -> Metric {
        match self {
            Self::PrunedInternal => Metric::Internal,
            Self::PrunedCumulative | Self::NonPruned => Metric::Cumulative,
        }
    }

    /// Functions below this share of total samples are dropped.
    pub fn node_threshold(self) -> f64 {
        match self {
            Self::NonPruned => 0.0,
            Self::PrunedCumulative | Self::PrunedInternal => 0.005,
        }
    }

    /// Edges below this share of total samples are dropped.
    pub fn edge_threshold(self) -> f64 {
        match self {
            Self::NonPruned => 0.0,
            Self::PrunedCumulative | Self::PrunedInternal => 0.001,
        }
    }
}

/// Node/edge colors interpolated between a cold and a hot HSL anchor.
#[derive(Debug, Clone, Copy)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub min_color: Hsl,
    pub max_color: Hsl,
    pub gamma: f64,
    pub font_name: &'static str,
}

/// Dark blue for cold functions through saturated red for hot ones.
pub const TEMPERATURE_COLORMAP: Theme = Theme {
    min_color: Hsl {
        h: 2.0 / 3.0,
        s: 0.80,
        l: 0.25,
    },
    max_color: Hsl {
        h: 0.0,
        s: 1.0,
        l: 0.5,
    },
    gamma: 1.0,
    font_name: "vera",
};

impl Theme {
    /// `#rrggbb` for a weight in `[0, 1]`.
    pub fn color(&self, weight: f64) -> String {
        let w = weight.clamp(0.0, 1.0).powf(self.gamma);
        let h = self.min_color.h + w * (self.max_color.h - self.min_color.h);
        let s = self.min_color.s + w * (self.max_color.s - self.min_color.s);
        let l = self.min_color.l + w * (self.max_color.l - self.min_color.l);
        let (r, g, b) = hsl_to_rgb(h, s, l);
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    fn font_size(&self, weight: f64) -> f64 {
        8.0 + 14.0 * weight.clamp(0.0, 1.0)
    }

    fn pen_width(&self, weight: f64) -> f64 {
        0.5 + 4.0 * weight.clamp(0.0, 1.0)
    }
}

/// `h` is a fraction of a full turn, `s`/`l` in `[0, 1]`.
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let h = h.rem_euclid(1.0) * 6.0;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match h {
        v if v < 1.0 => (c, x, 0.0),
        v if v < 2.0 => (x, c, 0.0),
        v if v < 3.0 => (0.0, c, x),
        v if v < 4.0 => (0.0, x, c),
        v if v < 5.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_byte = |v: f64| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
    (to_byte(r), to_byte(g), to_byte(b))
}

#[derive(Debug, Clone, Copy)]
struct NodeWeight {
    self_samples: u64,
    cum_samples: u64,
}

#[derive(Debug, Clone)]
pub struct CallGraph {
    total_samples: u64,
    nodes: BTreeMap<String, NodeWeight>,
    edges: Vec<CallEdge>,
}

impl CallGraph {
    pub fn from_profile(profile: &ProfileData) -> Self {
        let nodes = profile
            .functions
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    NodeWeight {
                        self_samples: f.self_samples,
                        cum_samples: f.cum_samples,
                    },
                )
            })
            .collect();
        Self {
            total_samples: profile.total_samples,
            nodes,
            edges: profile.edges.clone(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// The profiled function whose name ends with the test's short name,
    /// only if exactly one matches.
    pub fn find_test_root(&self, short_name: &str) -> Option<String> {
        let mut matches = self.nodes.keys().filter(|name| name.ends_with(short_name));
        match (matches.next(), matches.next()) {
            (Some(root), None) => Some(root.clone()),
            _ => None,
        }
    }

    /// Restrict the graph to `root` and its reachable descendants.
    pub fn prune_root(&mut self, root: &str) {
        if !self.nodes.contains_key(root) {
            return;
        }
        let mut keep = BTreeSet::new();
        let mut queue = VecDeque::new();
        keep.insert(root.to_string());
        queue.push_back(root.to_string());
        while let Some(current) = queue.pop_front() {
            for edge in &self.edges {
                if edge.caller == current && !keep.contains(&edge.callee) {
                    keep.insert(edge.callee.clone());
                    queue.push_back(edge.callee.clone());
                }
            }
        }
        self.nodes.retain(|name, _| keep.contains(name));
        self.edges
            .retain(|e| keep.contains(&e.caller) && keep.contains(&e.callee));
    }

    /// Drop functions and edges below the given shares of total samples.
    pub fn prune(&mut self, node_threshold: f64, edge_threshold: f64, metric: Metric) {
        let total = self.total_samples;
        self.nodes
            .retain(|_, w| fraction(metric_samples(*w, metric), total) >= node_threshold);
        let nodes = &self.nodes;
        self.edges.retain(|e| {
            nodes.contains_key(&e.caller)
                && nodes.contains_key(&e.callee)
                && fraction(e.samples, total) >= edge_threshold
        });
    }

    /// Emit the DOT description, colored by `metric` under `theme`.
    pub fn to_dot(&self, theme: &Theme, metric: Metric) -> String {
        let font = theme.font_name;
        let mut out = String::new();
        out.push_str("digraph {\n");
        out.push_str(&format!(
            "\tgraph [fontname=\"{font}\", ranksep=0.25, nodesep=0.125];\n"
        ));
        out.push_str(&format!(
            "\tnode [fontname=\"{font}\", shape=box, style=filled, fontcolor=white, width=0, height=0];\n"
        ));
        out.push_str(&format!("\tedge [fontname=\"{font}\"];\n"));

        for (name, weight) in &self.nodes {
            let w = fraction(metric_samples(*weight, metric), self.total_samples);
            out.push_str(&format!(
                "\t{} [label=\"{}\\n{:.2}%\\n({:.2}%)\\n{}x\", fillcolor=\"{}\", fontsize=\"{:.2}\"];\n",
                quote(name),
                escape_label(name),
                100.0 * fraction(weight.cum_samples, self.total_samples),
                100.0 * fraction(weight.self_samples, self.total_samples),
                weight.cum_samples,
                theme.color(w),
                theme.font_size(w),
            ));
        }

        for edge in &self.edges {
            let w = fraction(edge.samples, self.total_samples);
            out.push_str(&format!(
                "\t{} -> {} [label=\"{:.2}%\", color=\"{}\", penwidth=\"{:.2}\", fontsize=\"{:.2}\"];\n",
                quote(&edge.caller),
                quote(&edge.callee),
                100.0 * w,
                theme.color(w),
                theme.pen_width(w),
                theme.font_size(w),
            ));
        }

        out.push_str("}\n");
        out
    }
}

fn metric_samples(w: NodeWeight, metric: Metric) -> u64 {
    match metric {
        Metric::Cumulative => w.cum_samples,
        Metric::Internal => w.self_samples,
    }
}

fn fraction(samples: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    samples as f64 / total as f64
}

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

fn escape_label(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The DOT description for one test under one pruning policy: root-prune
/// to the uniquely matched test function (if any), threshold-prune, then
/// write with the temperature colormap.
pub fn dot_for_test(profile: &ProfileData, test_short_name: &str, prune: Prune) -> String {
    let mut graph = CallGraph::from_profile(profile);
    if let Some(root) = graph.find_test_root(test_short_name) {
        graph.prune_root(&root);
    }
    graph.prune(prune.node_threshold(), prune.edge_threshold(), prune.metric());
    graph.to_dot(&TEMPERATURE_COLORMAP, prune.metric())
}
