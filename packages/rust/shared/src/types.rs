//! Core domain types: the Township/Range/Section key and the layout tags.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{PlssError, Result};

/// Canonical string of a TRS whose every field is an error.
pub const ERROR_TRS: &str = "XXXzXXXzXX";

/// Canonical string of a TRS whose every field is undefined.
pub const UNDEF_TRS: &str = "___z___z__";

const ERROR_TWPRGE_PART: &str = "XXXz";
const UNDEF_TWPRGE_PART: &str = "___z";
const ERROR_SEC: &str = "XX";
const UNDEF_SEC: &str = "__";

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// Township direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NorthSouth {
    #[default]
    #[serde(alias = "n")]
    North,
    #[serde(alias = "s")]
    South,
}

impl NorthSouth {
    /// Single lowercase letter used in canonical strings.
    pub fn letter(self) -> char {
        match self {
            Self::North => 'n',
            Self::South => 's',
        }
    }

    /// Read `n`/`s`/`north`/`south` in any case.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().trim_end_matches('.').to_ascii_lowercase().as_str() {
            "n" | "north" => Some(Self::North),
            "s" | "south" => Some(Self::South),
            _ => None,
        }
    }
}

/// Range direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EastWest {
    #[serde(alias = "e")]
    East,
    #[default]
    #[serde(alias = "w")]
    West,
}

impl EastWest {
    /// Single lowercase letter used in canonical strings.
    pub fn letter(self) -> char {
        match self {
            Self::East => 'e',
            Self::West => 'w',
        }
    }

    /// Read `e`/`w`/`east`/`west` in any case.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().trim_end_matches('.').to_ascii_lowercase().as_str() {
            "e" | "east" => Some(Self::East),
            "w" | "west" => Some(Self::West),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Part: defined / undefined / error
// ---------------------------------------------------------------------------

/// One field of a TRS key.
///
/// `Undefined` means no token was present; `Error` means a token was present
/// but could not be interpreted. The variant order is also the sort order:
/// defined values first, then undefined, then error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Part<T> {
    Defined(T),
    Undefined,
    Error,
}

impl<T> Part<T> {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    pub fn defined(&self) -> Option<&T> {
        match self {
            Self::Defined(v) => Some(v),
            _ => None,
        }
    }
}

/// A township number and its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Township {
    pub number: u16,
    pub direction: NorthSouth,
}

/// A range number and its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
    pub number: u16,
    pub direction: EastWest,
}

// ---------------------------------------------------------------------------
// Trs
// ---------------------------------------------------------------------------

/// Immutable Township/Range/Section key.
///
/// Every representable value has exactly one canonical string
/// (`154n97w14`, `XXXzXXXzXX`, `___z___z__`, or a mix), so the derived
/// equality and hashing agree with comparing canonical strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Trs {
    pub township: Part<Township>,
    pub range: Part<Range>,
    pub section: Part<u8>,
}

/// Matches a canonical TRS string, optionally without the section.
static CANONICAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?P<twp>\d{1,3}[ns]|XXXz|___z)(?P<rge>\d{1,3}[ew]|XXXz|___z)(?P<sec>\d{1,2}|XX|__)?$",
    )
    .expect("canonical TRS regex")
});

/// Matches a raw township or range component such as `154`, `154N`, `154 north`.
static RAW_TWPRGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<num>\d{1,3})\s*(?P<dir>north|south|east|west|[nsew])?\.?$")
        .expect("raw twprge regex")
});

impl Trs {
    /// A TRS with every field flagged as an error.
    pub fn error() -> Self {
        Self {
            township: Part::Error,
            range: Part::Error,
            section: Part::Error,
        }
    }

    /// A TRS with every field undefined.
    pub fn undefined() -> Self {
        Self {
            township: Part::Undefined,
            range: Part::Undefined,
            section: Part::Undefined,
        }
    }

    /// Build a TRS from raw textual components, filling omitted directions
    /// with the supplied defaults.
    ///
    /// `None` or an empty string yields an undefined field; a token that is
    /// present but unreadable yields an error field.
    pub fn from_raw(
        twp: Option<&str>,
        rge: Option<&str>,
        sec: Option<&str>,
        default_ns: NorthSouth,
        default_ew: EastWest,
    ) -> Self {
        let township = match raw_number_and_dir(twp) {
            RawPart::Missing => Part::Undefined,
            RawPart::Bad => Part::Error,
            RawPart::Found(number, dir) => match dir.map(|d| NorthSouth::from_token(&d)) {
                None => Part::Defined(Township {
                    number,
                    direction: default_ns,
                }),
                Some(Some(direction)) => Part::Defined(Township { number, direction }),
                Some(None) => Part::Error,
            },
        };
        let range = match raw_number_and_dir(rge) {
            RawPart::Missing => Part::Undefined,
            RawPart::Bad => Part::Error,
            RawPart::Found(number, dir) => match dir.map(|d| EastWest::from_token(&d)) {
                None => Part::Defined(Range {
                    number,
                    direction: default_ew,
                }),
                Some(Some(direction)) => Part::Defined(Range { number, direction }),
                Some(None) => Part::Error,
            },
        };
        Self {
            township,
            range,
            section: section_part(sec),
        }
    }

    /// Combine a canonical short Twp/Rge string (`154n97w`) with a section
    /// number. A missing Twp/Rge or section is carried as an error, which is
    /// how the assembler reports "expected but not found".
    pub fn from_twprge_and_section(twprge: Option<&str>, section: Option<u8>) -> Self {
        let (township, range) = match twprge.and_then(|tr| tr.parse::<Trs>().ok()) {
            Some(parsed) => (parsed.township, parsed.range),
            None => (Part::Error, Part::Error),
        };
        Self {
            township,
            range,
            section: Part::Undefined,
        }
        .with_section(section)
    }

    /// The same Twp/Rge with a different section; `None` or a number past
    /// two digits becomes an error field.
    pub fn with_section(self, section: Option<u8>) -> Self {
        let section = match section {
            Some(n) if n <= 99 => Part::Defined(n),
            _ => Part::Error,
        };
        Self { section, ..self }
    }

    /// Canonical short Twp/Rge form, e.g. `154n97w`.
    pub fn twprge(&self) -> String {
        format!(
            "{}{}",
            fmt_twp(&self.township),
            fmt_rge(&self.range)
        )
    }

    pub fn twp_undef(&self) -> bool {
        self.township.is_undefined()
    }

    pub fn rge_undef(&self) -> bool {
        self.range.is_undefined()
    }

    pub fn sec_undef(&self) -> bool {
        self.section.is_undefined()
    }

    pub fn twp_error(&self) -> bool {
        self.township.is_error()
    }

    pub fn rge_error(&self) -> bool {
        self.range.is_error()
    }

    pub fn sec_error(&self) -> bool {
        self.section.is_error()
    }

    /// True when any field is an error.
    pub fn has_error(&self) -> bool {
        self.twp_error() || self.rge_error() || self.sec_error()
    }
}

enum RawPart {
    Missing,
    Bad,
    Found(u16, Option<String>),
}

fn raw_number_and_dir(raw: Option<&str>) -> RawPart {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return RawPart::Missing;
    };
    let Some(caps) = RAW_TWPRGE_RE.captures(raw) else {
        return RawPart::Bad;
    };
    match caps["num"].parse::<u16>() {
        Ok(n) => RawPart::Found(n, caps.name("dir").map(|m| m.as_str().to_string())),
        Err(_) => RawPart::Bad,
    }
}

fn section_part(raw: Option<&str>) -> Part<u8> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Part::Undefined,
        Some(s) => match s.parse::<u8>() {
            Ok(n) if n <= 99 => Part::Defined(n),
            _ => Part::Error,
        },
    }
}

fn fmt_twp(part: &Part<Township>) -> String {
    match part {
        Part::Defined(t) => format!("{}{}", t.number, t.direction.letter()),
        Part::Undefined => UNDEF_TWPRGE_PART.to_string(),
        Part::Error => ERROR_TWPRGE_PART.to_string(),
    }
}

fn fmt_rge(part: &Part<Range>) -> String {
    match part {
        Part::Defined(r) => format!("{}{}", r.number, r.direction.letter()),
        Part::Undefined => UNDEF_TWPRGE_PART.to_string(),
        Part::Error => ERROR_TWPRGE_PART.to_string(),
    }
}

impl fmt::Display for Trs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sec = match self.section {
            Part::Defined(n) => format!("{n:02}"),
            Part::Undefined => UNDEF_SEC.to_string(),
            Part::Error => ERROR_SEC.to_string(),
        };
        write!(f, "{}{sec}", self.twprge())
    }
}

impl FromStr for Trs {
    type Err = PlssError;

    /// Parse a canonical string such as `154n97w14`, `154n97w`, or a sentinel.
    fn from_str(s: &str) -> Result<Self> {
        let caps = CANONICAL_RE
            .captures(s.trim())
            .ok_or_else(|| PlssError::parse(format!("not a canonical TRS: {s:?}")))?;

        let township = match &caps["twp"] {
            "XXXz" => Part::Error,
            "___z" => Part::Undefined,
            t => {
                let (num, dir) = t.split_at(t.len() - 1);
                Part::Defined(Township {
                    number: num.parse().map_err(|_| PlssError::parse(format!("bad township in {s:?}")))?,
                    direction: NorthSouth::from_token(dir)
                        .ok_or_else(|| PlssError::parse(format!("bad township direction in {s:?}")))?,
                })
            }
        };
        let range = match &caps["rge"] {
            "XXXz" => Part::Error,
            "___z" => Part::Undefined,
            r => {
                let (num, dir) = r.split_at(r.len() - 1);
                Part::Defined(Range {
                    number: num.parse().map_err(|_| PlssError::parse(format!("bad range in {s:?}")))?,
                    direction: EastWest::from_token(dir)
                        .ok_or_else(|| PlssError::parse(format!("bad range direction in {s:?}")))?,
                })
            }
        };
        let section = match caps.name("sec").map(|m| m.as_str()) {
            None | Some("__") => Part::Undefined,
            Some("XX") => Part::Error,
            Some(n) => Part::Defined(
                n.parse()
                    .map_err(|_| PlssError::parse(format!("bad section in {s:?}")))?,
            ),
        };

        Ok(Self {
            township,
            range,
            section,
        })
    }
}

impl From<Trs> for String {
    fn from(trs: Trs) -> Self {
        trs.to_string()
    }
}

impl TryFrom<String> for Trs {
    type Error = PlssError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Structural template a land description follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    /// `T154N-R97W Sec 14: NE/4`
    #[serde(rename = "TRS_desc")]
    TrsDesc,
    /// `NE/4 of Section 14, T154N-R97W`
    #[serde(rename = "desc_STR")]
    DescStr,
    /// `Section 14: NE/4, T154N-R97W`
    #[serde(rename = "S_desc_TR")]
    SDescTr,
    /// `T154N-R97W, NE/4 of Section 14`
    #[serde(rename = "TR_desc_S")]
    TrDescS,
    /// Whole text becomes one tract's description.
    #[serde(rename = "copy_all")]
    CopyAll,
}

impl Layout {
    /// Every layout, structured ones first.
    pub const ALL: [Layout; 5] = [
        Layout::TrsDesc,
        Layout::DescStr,
        Layout::SDescTr,
        Layout::TrDescS,
        Layout::CopyAll,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TrsDesc => "TRS_desc",
            Self::DescStr => "desc_STR",
            Self::SDescTr => "S_desc_TR",
            Self::TrDescS => "TR_desc_S",
            Self::CopyAll => "copy_all",
        }
    }

    /// Layouts where the description conventionally follows `Section N:`.
    pub fn expects_colon(self) -> bool {
        matches!(self, Self::TrsDesc | Self::SDescTr)
    }

    /// Layouts where the Twp/Rge is written before the sections it governs.
    pub fn twprge_first(self) -> bool {
        matches!(self, Self::TrsDesc | Self::TrDescS)
    }

    /// Layouts where the description text follows its section reference.
    pub fn desc_follows_section(self) -> bool {
        matches!(self, Self::TrsDesc | Self::SDescTr)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = PlssError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Layout::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                PlssError::validation(format!(
                    "unknown layout {wanted:?} (expected one of TRS_desc, desc_STR, S_desc_TR, TR_desc_S, copy_all)"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_roundtrip() {
        let trs: Trs = "154n97w14".parse().expect("parse");
        assert_eq!(
            trs.township,
            Part::Defined(Township {
                number: 154,
                direction: NorthSouth::North
            })
        );
        assert_eq!(trs.section, Part::Defined(14));
        assert_eq!(trs.to_string(), "154n97w14");
        assert_eq!(trs.twprge(), "154n97w");
    }

    #[test]
    fn sentinels_parse_and_print() {
        let err: Trs = ERROR_TRS.parse().expect("error sentinel");
        assert_eq!(err, Trs::error());
        assert!(err.twp_error() && err.rge_error() && err.sec_error());
        assert_eq!(Trs::undefined().to_string(), UNDEF_TRS);
        assert!(!Trs::undefined().has_error());
    }

    #[test]
    fn section_is_zero_padded() {
        let trs = Trs::from_twprge_and_section(Some("1s2e"), Some(3));
        assert_eq!(trs.to_string(), "1s2e03");
    }

    #[test]
    fn twprge_without_section_is_undefined_section() {
        let trs: Trs = "154n97w".parse().expect("parse");
        assert!(trs.sec_undef());
        assert_eq!(trs.to_string(), "154n97w__");
    }

    #[test]
    fn from_raw_applies_default_directions() {
        let trs = Trs::from_raw(
            Some("154"),
            Some("97"),
            Some("14"),
            NorthSouth::South,
            EastWest::East,
        );
        assert_eq!(trs.to_string(), "154s97e14");

        let trs = Trs::from_raw(Some("154N"), Some("97 west"), None, NorthSouth::South, EastWest::East);
        assert_eq!(trs.to_string(), "154n97w__");
    }

    #[test]
    fn from_raw_separates_undefined_and_error() {
        let trs = Trs::from_raw(Some("1x4"), None, Some("two"), NorthSouth::North, EastWest::West);
        assert!(trs.twp_error());
        assert!(trs.rge_undef() && !trs.rge_error());
        assert!(trs.sec_error());
        assert_eq!(trs.to_string(), "XXXz___zXX");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!("154x97w14".parse::<Trs>().is_err());
        assert!("".parse::<Trs>().is_err());
    }

    #[test]
    fn ordering_puts_undefined_before_error() {
        let mut list: Vec<Trs> = ["XXXzXXXzXX", "___z___z__", "2n1w01", "1n1w36"]
            .iter()
            .map(|s| s.parse().expect("parse"))
            .collect();
        list.sort();
        let printed: Vec<String> = list.iter().map(ToString::to_string).collect();
        assert_eq!(printed, ["1n1w36", "2n1w01", "___z___z__", "XXXzXXXzXX"]);
    }

    #[test]
    fn trs_serializes_as_canonical_string() {
        let trs: Trs = "154n97w14".parse().expect("parse");
        let json = serde_json::to_string(&trs).expect("serialize");
        assert_eq!(json, "\"154n97w14\"");
        let back: Trs = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, trs);
    }

    #[test]
    fn layout_names_roundtrip() {
        for layout in Layout::ALL {
            assert_eq!(layout.as_str().parse::<Layout>().expect("parse"), layout);
        }
        assert!("sideways".parse::<Layout>().is_err());
    }
}
