//! Splitting a description into independently assembled chunks.

use std::ops::Range;

use tracing::debug;

use plss_shared::{Diagnostics, Layout, ParseConfig};

use crate::layout::classify;
use crate::twprge::find_twprges;

/// Byte ranges of `text`, one chunk per accepted Twp/Rge, tiling the text.
///
/// When the Twp/Rge leads its sections, each chunk begins at a Twp/Rge (text
/// before the first one stays with it); otherwise each chunk ends at one
/// (text after the last one stays with it).
pub fn segment(text: &str, config: &ParseConfig) -> Vec<Range<usize>> {
    let layout = config
        .mandated_layout
        .unwrap_or_else(|| classify(text, config.layout_candidates.as_deref()));
    if layout == Layout::CopyAll {
        return vec![0..text.len()];
    }

    // Rejections are reported again when each chunk is assembled.
    let mut scratch = Diagnostics::new();
    let twprges = find_twprges(text, layout, &mut scratch);

    let cuts: Vec<usize> = if layout.twprge_first() {
        twprges.iter().skip(1).map(|m| m.start).collect()
    } else {
        let keep = twprges.len().saturating_sub(1);
        twprges.iter().take(keep).map(|m| m.end).collect()
    };

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        if cut > start {
            chunks.push(start..cut);
            start = cut;
        }
    }
    chunks.push(start..text.len());

    debug!(%layout, chunks = chunks.len(), "segmented text");
    chunks
}
