//! Finished tracts: one TRS plus the description that belongs to it.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::instrument;

use plss_aliquot::DepthOptions;
use plss_shared::{Diagnostics, Layout, Trs};

/// One parsed unit of land.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tract {
    pub trs: Trs,
    pub desc: String,
    /// Layout of the chunk the tract came from.
    pub layout: Layout,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lots: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub qqs: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub lot_acres: BTreeMap<String, String>,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

impl Tract {
    /// A bare tract; an error TRS is flagged `trs_error`.
    pub fn new(trs: Trs, desc: impl Into<String>, layout: Layout) -> Self {
        let mut diagnostics = Diagnostics::new();
        if trs.has_error() {
            diagnostics.error("trs_error", trs.to_string());
        }
        Self {
            trs,
            desc: desc.into(),
            layout,
            lots: Vec::new(),
            qqs: Vec::new(),
            lot_acres: BTreeMap::new(),
            diagnostics,
        }
    }

    /// Canonical short Twp/Rge, e.g. `154n97w`.
    pub fn twprge(&self) -> String {
        self.trs.twprge()
    }

    /// Fill `lots`, `qqs` and `lot_acres` from the description.
    #[instrument(skip_all, fields(trs = %self.trs))]
    pub fn parse_lots_qqs(&mut self, opts: &DepthOptions) {
        let found = plss_aliquot::parse_lots_qqs(&self.desc, opts, &mut self.diagnostics);
        self.lots = found.lots;
        self.qqs = found.qqs;
        self.lot_acres = found.lot_acres;
    }
}

/// Trim punctuation, whitespace and dangling connectors (`and`, `of`, `&`)
/// from both ends of a captured description.
pub fn clean_description(text: &str) -> String {
    static EDGES_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?i)^(?:[\s,;:.\-]+|(?:and|or|of|in)\b|&)+|(?:[\s,;.\-]+|\b(?:and|or|of|in|the)|&)+$",
        )
        .expect("valid regex")
    });

    EDGES_RE.replace_all(text, "").into_owned()
}
