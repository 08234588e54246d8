//! Rewrites aliquot phrasing into compact tokens.
//!
//! Each pass is a function `&str -> String` applied in sequence, so that
//! `Northeast Quarter of the North Half`, `NE/4 of N/2`, `NE¼N½` and
//! `NE4N2` all end up as the single compact block `NEN2`.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Run every normalization pass over a tract description.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = spell_out_words(text);
    result = compact_fractions(&result);
    result = strip_quarter_fours(&result);
    result = join_of_chains(&result);
    result = normalize_all(&result);
    result
}

// ---------------------------------------------------------------------------
// Pass 1: spelled-out quarters and halves
// ---------------------------------------------------------------------------

/// `Northeast Quarter` → `NE/4`, `North Half` → `N/2`.
fn spell_out_words(text: &str) -> String {
    static QUARTER_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?i)\b(?P<ns>north|south)[\s-]*(?P<ew>east|west)\s+(?:one[\s-]*)?(?:quarter|fourth)\b",
        )
        .expect("valid regex")
    });
    static HALF_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\b(?P<dir>north|south|east|west)\s+(?:one[\s-]*)?half\b")
            .expect("valid regex")
    });

    let text = QUARTER_WORDS_RE.replace_all(text, |caps: &Captures| {
        format!("{}{}/4", initial(&caps["ns"]), initial(&caps["ew"]))
    });
    HALF_WORDS_RE
        .replace_all(&text, |caps: &Captures| format!("{}/2", initial(&caps["dir"])))
        .into_owned()
}

fn initial(word: &str) -> char {
    word.chars().next().map_or('?', |c| c.to_ascii_uppercase())
}

// ---------------------------------------------------------------------------
// Pass 2: fraction forms to compact tokens
// ---------------------------------------------------------------------------

/// One fraction-form quarter or half.
const FRACTION_ATOM: &str = r"(?:(?P<ns>[NS])\.?\s?(?P<ew>[EW])\.?(?:\s*(?:1/4|/4|¼)|\s+(?:quarter|qtr)s?\b\.?)|(?P<dir>[NSEW])\.?(?:\s*(?:1/2|/2|½)|\s+half\b))";

/// `NE/4`, `N.E.1/4`, `NE¼`, `NE quarter` → `NE`; `N/2`, `N½`, `N half` → `N2`.
///
/// Atoms written back to back (`E/2W/2SE/4`) are matched as one chain, since
/// only the first of them sits on a word boundary.
fn compact_fractions(text: &str) -> String {
    static ATOM_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(&format!("(?i){FRACTION_ATOM}")).expect("valid regex")
    });
    static CHAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
        let atom = FRACTION_ATOM
            .replace("?P<ns>", "")
            .replace("?P<ew>", "")
            .replace("?P<dir>", "");
        Regex::new(&format!(r"(?i)\b(?:{atom})+")).expect("valid regex")
    });

    CHAIN_RE
        .replace_all(text, |chain: &Captures| {
            ATOM_RE
                .replace_all(&chain[0], |atom: &Captures| match atom.name("dir") {
                    Some(dir) => format!("{}2", dir.as_str().to_ascii_uppercase()),
                    None => format!("{}{}", &atom["ns"], &atom["ew"]).to_ascii_uppercase(),
                })
                .into_owned()
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: `NE4SW4` shorthand
// ---------------------------------------------------------------------------

/// Drop the `4` of compact quarter tokens written as `NE4`.
fn strip_quarter_fours(text: &str) -> String {
    static SHORTHAND_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)\b(?:[NS][EW]4?|[NSEW]2)+\b").expect("valid regex")
    });

    SHORTHAND_RE
        .replace_all(text, |caps: &Captures| {
            caps[0].replace('4', "").to_ascii_uppercase()
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: join `NE of the SW` into `NESW`
// ---------------------------------------------------------------------------

/// Merge compact blocks separated only by whitespace or `of (the)`.
fn join_of_chains(text: &str) -> String {
    static CHAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?i)\b(?P<a>(?:[NS][EW]|[NSEW]2)+)\s+(?:of\s+(?:the\s+)?)?(?P<b>(?:[NS][EW]|[NSEW]2)+)\b",
        )
        .expect("valid regex")
    });

    // Non-overlapping replacement joins pairs; repeat until longer chains settle.
    let mut current = text.to_string();
    loop {
        let next = CHAIN_RE
            .replace_all(&current, |caps: &Captures| {
                format!("{}{}", &caps["a"], &caps["b"]).to_ascii_uppercase()
            })
            .into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

// ---------------------------------------------------------------------------
// Pass 5: ALL
// ---------------------------------------------------------------------------

fn normalize_all(text: &str) -> String {
    static ALL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\ball\b").expect("valid regex"));

    ALL_RE.replace_all(text, "ALL").into_owned()
}
