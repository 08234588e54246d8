//! Section and multi-section matching.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use plss_aliquot::unpack_numbers;
use plss_shared::{Diagnostics, Layout, RequireColon};

/// `Sec 14`, `Sections 4 and 6 through 10`, `§ 3:`. A trailing colon is
/// captured separately so each pass can decide whether it is required.
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        (?:\bsec(?:tion)?s?\.?|§§?)\s*
        (?P<body>
            \d{1,2}\b
            (?:
                \s*(?:,|\band\b|&|\bthrough\b|\bthru\b|\bto\b|-|–)\s*
                (?:(?:\bsec(?:tion)?s?\.?|§)\s*)?
                \d{1,2}\b
            )*
        )
        (?P<colon>\s*:)?",
    )
    .expect("valid regex")
});

/// A section reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMatch {
    /// Section numbers in declared order, elided ranges expanded.
    pub sections: Vec<u8>,
    pub start: usize,
    /// End of the match, including the colon if there is one.
    pub end: usize,
    pub has_colon: bool,
}

impl SectionMatch {
    pub fn is_multi(&self) -> bool {
        self.sections.len() > 1
    }
}

/// Every section reference in `text` consistent with `layout`.
///
/// The colon layouts require `Section N:`; rejected references are flagged
/// `sec_ignored` or `multisec_ignored`. Under [`RequireColon::Default`], if
/// that leaves nothing, every reference is accepted on a second pass and
/// flagged `pulled_sec_without_colon`.
pub fn find_sections(
    text: &str,
    layout: Layout,
    require_colon: RequireColon,
    diag: &mut Diagnostics,
) -> Vec<SectionMatch> {
    let candidates = all_sections(text);
    let colon_required = layout.expects_colon() && require_colon != RequireColon::Never;

    let accepted = if !colon_required {
        candidates
    } else {
        let (with_colon, without_colon): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|m| m.has_colon);

        if with_colon.is_empty()
            && !without_colon.is_empty()
            && require_colon == RequireColon::Default
        {
            debug!(count = without_colon.len(), "retrying sections without colon");
            for m in &without_colon {
                diag.warn("pulled_sec_without_colon", match_text(text, m));
            }
            without_colon
        } else {
            for m in &without_colon {
                let code = if m.is_multi() { "multisec_ignored" } else { "sec_ignored" };
                diag.warn(code, match_text(text, m));
            }
            with_colon
        }
    };

    for m in &accepted {
        flag_accepted(text, m, diag);
    }
    debug!(%layout, count = accepted.len(), "matched sections");
    accepted
}

/// The first section reference in `text`, colon or not.
pub fn first_section(text: &str) -> Option<SectionMatch> {
    all_sections(text).into_iter().next()
}

fn all_sections(text: &str) -> Vec<SectionMatch> {
    SECTION_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let sections: Vec<u8> = unpack_numbers(&caps["body"])
                .numbers
                .into_iter()
                .filter_map(|n| u8::try_from(n).ok())
                .collect();
            Some(SectionMatch {
                sections,
                start: whole.start(),
                end: whole.end(),
                has_colon: caps.name("colon").is_some(),
            })
        })
        .collect()
}

fn flag_accepted(text: &str, m: &SectionMatch, diag: &mut Diagnostics) {
    if !m.is_multi() {
        return;
    }
    diag.warn("multisec_found", match_text(text, m));

    let list = unpack_numbers(&text[m.start..m.end]);
    for (start, end) in &list.descending_ranges {
        diag.warn("nonSequen_sec", format!("{start}-{end}"));
    }
    for dup in &list.duplicates {
        diag.warn("dup_sec", dup.to_string());
    }
}

/// Matched text without the trailing colon.
fn match_text<'a>(text: &'a str, m: &SectionMatch) -> &'a str {
    text[m.start..m.end].trim_end_matches([':', ' ']).trim()
}
