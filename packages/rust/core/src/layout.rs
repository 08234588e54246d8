//! Layout detection from the relative position of the first section and the
//! first Twp/Rge.

use tracing::debug;

use plss_shared::Layout;

use crate::section::first_section;
use crate::twprge::first_twprge;

/// A section starting at or before this offset marks `S_desc_TR`.
const EARLY_SECTION: usize = 1;

/// Twp/Rge and section separated by at most this many bytes read as `TRS_desc`.
const SHORT_GAP: usize = 4;

/// Guess the layout of `text`, restricted to `candidates` when given.
///
/// Falls back to `copy_all` whenever either the section or the Twp/Rge is
/// missing. If no preferred layout is among the candidates, `copy_all` is
/// used when allowed, otherwise the first candidate.
pub fn classify(text: &str, candidates: Option<&[Layout]>) -> Layout {
    let preferred = preference(text);
    let allowed = |layout: &Layout| candidates.is_none_or(|c| c.contains(layout));

    let chosen = preferred
        .iter()
        .copied()
        .find(|l| allowed(l))
        .or_else(|| candidates.and_then(|c| c.first().copied()))
        .unwrap_or(Layout::CopyAll);

    debug!(layout = %chosen, "classified layout");
    chosen
}

/// Layouts in order of preference for this text, always ending in `copy_all`.
fn preference(text: &str) -> Vec<Layout> {
    let (Some(twprge), Some(section)) = (first_twprge(text), first_section(text)) else {
        return vec![Layout::CopyAll];
    };

    // Leading punctuation left over from segmentation does not count.
    let lead = text.len()
        - text
            .trim_start_matches(|c: char| c.is_whitespace() || ",;:.-".contains(c))
            .len();

    if section.start < twprge.start {
        if section.start.saturating_sub(lead) <= EARLY_SECTION {
            vec![Layout::SDescTr, Layout::DescStr, Layout::CopyAll]
        } else {
            vec![Layout::DescStr, Layout::SDescTr, Layout::CopyAll]
        }
    } else if section.start.saturating_sub(twprge.end) <= SHORT_GAP {
        vec![Layout::TrsDesc, Layout::TrDescS, Layout::CopyAll]
    } else {
        vec![Layout::TrDescS, Layout::TrsDesc, Layout::CopyAll]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_structured_layout_is_recognized() {
        assert_eq!(classify("T154N-R97W Sec 14: NE/4", None), Layout::TrsDesc);
        assert_eq!(classify("T154N-R97W, Sec 14: NE/4", None), Layout::TrsDesc);
        assert_eq!(classify("NE/4 of Sec 14, T154N-R97W", None), Layout::DescStr);
        assert_eq!(classify("Sec 14: NE/4, T154N-R97W", None), Layout::SDescTr);
        assert_eq!(classify("T154N-R97W NE/4 of Sec 14", None), Layout::TrDescS);
    }

    #[test]
    fn leading_punctuation_does_not_delay_the_section() {
        assert_eq!(classify("; Sec 20: W/2, T154N-R97W", None), Layout::SDescTr);
        assert_eq!(classify("; W/2 of Sec 20, T154N-R97W", None), Layout::DescStr);
    }

    #[test]
    fn missing_signals_fall_back_to_copy_all() {
        assert_eq!(classify("NE/4 of something", None), Layout::CopyAll);
        assert_eq!(classify("T154N-R97W NE/4", None), Layout::CopyAll);
        assert_eq!(classify("Sec 14: NE/4", None), Layout::CopyAll);
    }

    #[test]
    fn candidates_restrict_the_choice() {
        let only_desc_str = [Layout::DescStr];
        assert_eq!(classify("Sec 14: NE/4, T154N-R97W", Some(&only_desc_str)), Layout::DescStr);

        let structured = [Layout::TrsDesc, Layout::TrDescS];
        assert_eq!(classify("NE/4 of Sec 14, T154N-R97W", Some(&structured)), Layout::TrsDesc);
        assert_eq!(classify("nothing", Some(&structured)), Layout::TrsDesc);
    }
}
