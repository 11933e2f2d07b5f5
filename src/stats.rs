//! Textual profiling summaries in the report's two fixed sort orders.

use serde::{Deserialize, Serialize};

use crate::ProfileData;

pub const PROFILE_FOOTER: &str = "--- END PROFILE ---";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Cumulative,
    Internal,
}

impl SortKey {
    pub const ALL: [SortKey; 2] = [Self::Cumulative, Self::Internal];

    pub fn header(self) -> &'static str {
        match self {
            Self::Cumulative => "--- PROFILE (SORTED BY CUMULATIVE TIME)---",
            Self::Internal => "--- PROFILE (SORTED BY INTERNAL TIME)---",
        }
    }

    pub fn link_title(self) -> &'static str {
        match self {
            Self::Cumulative => "Profiling report (cumulative time)",
            Self::Internal => "Profiling report (internal time)",
        }
    }

    /// Section label, also the suffix of the report's popup div id.
    pub fn label(self) -> &'static str {
        match self {
            Self::Cumulative => "cumulative",
            Self::Internal => "internal",
        }
    }
}

impl clap::ValueEnum for SortKey {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Cumulative, Self::Internal]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Cumulative => clap::builder::PossibleValue::new("cumulative"),
            Self::Internal => clap::builder::PossibleValue::new("internal"),
        })
    }
}

/// Render the framed, column-aligned summary of one profile.
pub fn render_stats(profile: &ProfileData, sort: SortKey) -> String {
    let mut out = String::new();
    out.push_str(sort.header());
    out.push('\n');
    out.push_str(&format!(
        "{} samples at {} Hz (~{:.1} ms)\n\n",
        profile.total_samples,
        profile.sample_hz,
        profile.samples_to_ms(profile.total_samples)
    ));
    out.push_str("  samples    self ms   self %     cum ms    cum %  function\n");

    let mut rows: Vec<_> = profile.functions.iter().collect();
    rows.sort_by(|a, b| {
        let (ka, kb) = match sort {
            SortKey::Cumulative => (a.cum_samples, b.cum_samples),
            SortKey::Internal => (a.self_samples, b.self_samples),
        };
        kb.cmp(&ka).then_with(|| a.name.cmp(&b.name))
    });

    for row in rows {
        out.push_str(&format!(
            "{:>9} {:>10.1} {:>8.2} {:>10.1} {:>8.2}  {}\n",
            row.self_samples,
            profile.samples_to_ms(row.self_samples),
            100.0 * profile.fraction(row.self_samples),
            profile.samples_to_ms(row.cum_samples),
            100.0 * profile.fraction(row.cum_samples),
            row.name
        ));
    }

    out.push_str(PROFILE_FOOTER);
    out.push('\n');
    out
}
