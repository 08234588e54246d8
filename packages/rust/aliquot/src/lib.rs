//! Lot and aliquot decomposition of a single tract description.
//!
//! Normalizes aliquot phrasing into compact blocks, pulls out lot
//! references, then splits every remaining aliquot block into
//! quarter-quarter tokens at the requested depth.

pub mod aliquots;
pub mod lots;
mod normalize;
pub mod numbers;

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use plss_shared::Diagnostics;

pub use aliquots::{Aliquot, DepthOptions, decompose};
pub use lots::{LotsFound, unpack_lots};
pub use numbers::{NumberList, unpack_numbers};

/// A compact aliquot block in normalized text.
static ALIQUOT_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:(?:[NS][EW]|[NSEW]2)+|ALL)\b").expect("aliquot block regex")
});

/// Lots and quarter-quarters of one tract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LotsQqs {
    pub lots: Vec<String>,
    pub qqs: Vec<String>,
    pub lot_acres: BTreeMap<String, String>,
}

/// Normalize aliquot phrasing to compact tokens (`North Half of the NE/4` → `N2NE`).
pub fn normalize_aliquots(text: &str) -> String {
    normalize::run_pipeline(text)
}

/// Decompose a tract description into lots and QQs.
///
/// Flags `dup_qq`, `dup_lot`, `nonSequen_Lots`, `lot_with_aliquot`, and
/// `no_lots_qqs` (when a non-empty description yields nothing) into `diag`.
#[instrument(skip_all, fields(len = description.len()))]
pub fn parse_lots_qqs(description: &str, opts: &DepthOptions, diag: &mut Diagnostics) -> LotsQqs {
    let normalized = normalize_aliquots(description);
    let found = unpack_lots(&normalized, diag);

    let mut qqs = Vec::new();
    for block in ALIQUOT_BLOCK_RE.find_iter(&found.remainder) {
        let tokens = decompose(block.as_str(), opts);
        debug!(block = block.as_str(), count = tokens.len(), "decomposed aliquot block");
        qqs.extend(tokens);
    }

    let mut seen = HashSet::new();
    for qq in &qqs {
        if !seen.insert(qq.as_str()) {
            diag.warn_once("dup_qq", qq.clone());
        }
    }

    if found.lots.is_empty() && qqs.is_empty() && !description.trim().is_empty() {
        diag.warn("no_lots_qqs", description.trim());
    }

    LotsQqs {
        lots: found.lots,
        qqs,
        lot_acres: found.acres,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (LotsQqs, Diagnostics) {
        let mut diag = Diagnostics::new();
        let result = parse_lots_qqs(text, &DepthOptions::default(), &mut diag);
        (result, diag)
    }

    #[test]
    fn lots_and_aliquots_together() {
        let (result, diag) = parse("Lots 1 - 3, S/2NE/4");
        assert_eq!(result.lots, ["L1", "L2", "L3"]);
        assert_eq!(result.qqs, ["SENE", "SWNE"]);
        assert!(diag.is_empty());
    }

    #[test]
    fn spelled_out_description() {
        let (result, _) = parse("the North Half of the Southeast Quarter");
        assert_eq!(result.qqs, ["NESE", "NWSE"]);
    }

    #[test]
    fn overlapping_aliquots_flag_duplicates() {
        let (result, diag) = parse("NE/4, N/2NE/4");
        assert_eq!(result.qqs.len(), 6);
        assert!(diag.has_warning("dup_qq"));
    }

    #[test]
    fn nothing_found_is_flagged() {
        let (result, diag) = parse("that part lying north of the river");
        assert!(result.lots.is_empty() && result.qqs.is_empty());
        assert!(diag.has_warning("no_lots_qqs"));
    }

    #[test]
    fn lot_acreage_passes_through() {
        let (result, _) = parse("Lot 4(38.70), SW/4NW/4");
        assert_eq!(result.lots, ["L4"]);
        assert_eq!(result.qqs, ["SWNW"]);
        assert_eq!(result.lot_acres.get("L4").map(String::as_str), Some("38.70"));
    }
}
