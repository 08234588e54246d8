//! Text normalization ahead of matching.
//!
//! Every Township/Range spelling the patterns below recognize is rewritten to
//! the canonical `T154N-R97W` form, so the downstream matchers only ever look
//! for one shape. Passes run in order: OCR scrub (optional), Twp/Rge rewrite,
//! whitespace cleanup.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, instrument};

use plss_shared::{EastWest, NorthSouth, ParseConfig};

/// Output of [`preprocess`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preprocessed {
    /// Normalized text.
    pub text: String,
    /// Twp/Rge tokens as originally written that had to be repaired
    /// (missing direction or label, OCR digits), in source order.
    pub fixed: Vec<String>,
}

/// Normalize raw description text.
#[instrument(skip_all, fields(len = raw.len(), ocr_scrub = config.ocr_scrub))]
pub fn preprocess(raw: &str, config: &ParseConfig) -> Preprocessed {
    let mut fixed = Vec::new();

    let mut text = strip_cruft(raw);
    if config.ocr_scrub {
        text = ocr_scrub(&text, &mut fixed);
    }
    text = rewrite_twprges(&text, config.default_ns, config.default_ew, &mut fixed);
    text = collapse_whitespace(&text);

    debug!(fixed = fixed.len(), "preprocessed text");
    Preprocessed { text, fixed }
}

// ---------------------------------------------------------------------------
// Cruft
// ---------------------------------------------------------------------------

/// Drop control and zero-width characters; unify line endings and
/// non-breaking spaces.
fn strip_cruft(text: &str) -> String {
    static CONTROL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F\u{200B}\u{FEFF}]").expect("valid regex")
    });

    let text = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{a0}', " ");
    CONTROL_RE.replace_all(&text, "").into_owned()
}

// ---------------------------------------------------------------------------
// OCR scrub
// ---------------------------------------------------------------------------

/// Replace look-alike characters with digits inside Twp, Rge and Sec numbers.
///
/// Only fields that already contain at least one real digit are touched, so
/// ordinary words after a label (`To`, `Sec of`) survive.
fn ocr_scrub(text: &str, fixed: &mut Vec<String>) -> String {
    static OCR_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"\b(?P<label>(?i:t(?:wp|ownship)?\.?|r(?:ge|ange)?\.?|sec(?:tion)?s?\.?))(?P<gap>\s*)(?P<num>[0-9OoIl|]{1,3})",
        )
        .expect("valid regex")
    });

    OCR_RE
        .replace_all(text, |caps: &Captures| {
            let num = &caps["num"];
            let has_digit = num.bytes().any(|b| b.is_ascii_digit());
            let has_lookalike = num.bytes().any(|b| !b.is_ascii_digit());
            if !has_digit || !has_lookalike {
                return caps[0].to_string();
            }

            let scrubbed: String = num
                .chars()
                .map(|c| match c {
                    'O' | 'o' => '0',
                    'I' | 'l' | '|' => '1',
                    other => other,
                })
                .collect();

            let label = &caps["label"];
            if !label.to_ascii_lowercase().starts_with("sec") {
                fixed.push(caps[0].to_string());
            }
            format!("{label}{}{scrubbed}", &caps["gap"])
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Twp/Rge rewrite
// ---------------------------------------------------------------------------

/// Twp/Rge spellings from strictest to loosest. Each later pattern accepts
/// something the earlier ones reject; a token matched by any pattern after
/// the first counts as repaired.
static TWPRGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    const TWP: &str = r"T(?:wp|ownship)?\.?";
    const RGE: &str = r"R(?:ge|ange)?\.?";
    const NS: &str = r"(?P<td>North|South|N|S)\.?";
    const EW: &str = r"(?P<rd>East|West|E|W)\b";
    const SEP: &str = r"[\s,\-–]*";

    [
        // T154N-R97W, Township 154 North, Range 97 West
        format!(r"\b{TWP}\s*(?P<tn>\d{{1,3}})\s*{NS}{SEP}{RGE}\s*(?P<rn>\d{{1,3}})\s*{EW}"),
        // T154-R97, T154N R97
        format!(
            r"\b{TWP}\s*(?P<tn>\d{{1,3}})(?:\s*{NS})?{SEP}{RGE}\s*(?P<rn>\d{{1,3}})(?:\s*{EW})?"
        ),
        // 154N-R97W
        format!(r"\b(?P<tn>\d{{1,3}})\s*{NS}{SEP}{RGE}\s*(?P<rn>\d{{1,3}})\s*{EW}"),
        // T154N-97W
        format!(r"\b{TWP}\s*(?P<tn>\d{{1,3}})\s*{NS}{SEP}(?P<rn>\d{{1,3}})\s*{EW}"),
        // 154N97W
        r"\b(?P<tn>\d{1,3})(?P<td>[NS])[\s,\-]*(?P<rn>\d{1,3})(?P<rd>[EW])\b".to_string(),
    ]
    .into_iter()
    .map(|pattern| Regex::new(&format!("(?i){pattern}")).expect("valid regex"))
    .collect()
});

fn rewrite_twprges(
    text: &str,
    default_ns: NorthSouth,
    default_ew: EastWest,
    fixed: &mut Vec<String>,
) -> String {
    let mut current = text.to_string();

    for (strictness, pattern) in TWPRGE_PATTERNS.iter().enumerate() {
        current = pattern
            .replace_all(&current, |caps: &Captures| {
                let canonical = canonical_twprge(caps, default_ns, default_ew);
                let original = caps[0].trim();
                if strictness > 0 && original != canonical {
                    fixed.push(original.to_string());
                }
                canonical
            })
            .into_owned();
    }

    current
}

/// `T{twp}{N|S}-R{rge}{E|W}`, directions defaulted when absent.
fn canonical_twprge(caps: &Captures, default_ns: NorthSouth, default_ew: EastWest) -> String {
    let tn = caps["tn"].trim_start_matches('0');
    let rn = caps["rn"].trim_start_matches('0');
    let td = caps
        .name("td")
        .and_then(|m| NorthSouth::from_token(&m.as_str()[..1]))
        .unwrap_or(default_ns);
    let rd = caps
        .name("rd")
        .and_then(|m| EastWest::from_token(&m.as_str()[..1]))
        .unwrap_or(default_ew);

    format!(
        "T{}{}-R{}{}",
        if tn.is_empty() { "0" } else { tn },
        td.letter().to_ascii_uppercase(),
        if rn.is_empty() { "0" } else { rn },
        rd.letter().to_ascii_uppercase(),
    )
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

/// Collapse runs of spaces and tabs, fold line-break runs into one newline,
/// and trim the ends.
fn collapse_whitespace(text: &str) -> String {
    static SPACES_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));
    static NEWLINES_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r" ?\n\s*").expect("valid regex"));

    let text = SPACES_RE.replace_all(text, " ");
    let text = NEWLINES_RE.replace_all(&text, "\n");
    text.trim().to_string()
}
