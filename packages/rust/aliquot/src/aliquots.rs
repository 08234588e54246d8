//! Aliquot decomposition: compact blocks such as `E2W2SE` into quarter-quarters.

use std::fmt;

/// One atomic aliquot subdivision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aliquot {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
    All,
}

use Aliquot::*;

const QUARTERS: [Aliquot; 4] = [NE, NW, SE, SW];

impl Aliquot {
    pub fn is_half(self) -> bool {
        matches!(self, N | S | E | W)
    }

    pub fn is_quarter(self) -> bool {
        matches!(self, NE | NW | SE | SW)
    }

    /// Compact token: `N2`, `NE`, `ALL`.
    pub fn token(self) -> &'static str {
        match self {
            N => "N2",
            S => "S2",
            E => "E2",
            W => "W2",
            NE => "NE",
            NW => "NW",
            SE => "SE",
            SW => "SW",
            All => "ALL",
        }
    }

    /// Quarters making up this component, in `NE, NW, SE, SW` order.
    fn quarters(self) -> &'static [Aliquot] {
        match self {
            All => &QUARTERS,
            N => &[NE, NW],
            S => &[SE, SW],
            E => &[NE, SE],
            W => &[NW, SW],
            NE => &[NE],
            NW => &[NW],
            SE => &[SE],
            SW => &[SW],
        }
    }

    /// Letters of a quarter or half, e.g. `SE` → `"SE"`, `W` → `"W"`.
    fn letters(self) -> &'static str {
        match self {
            All => "",
            other => other.token().trim_end_matches('2'),
        }
    }

    /// A half on the north/south axis.
    fn is_ns_half(self) -> bool {
        matches!(self, N | S)
    }

    /// The quarter two perpendicular halves describe.
    fn merge_halves(a: Aliquot, b: Aliquot) -> Option<Aliquot> {
        let (ns, ew) = match (a.is_ns_half(), b.is_ns_half()) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => return None,
        };
        Some(match (ns, ew) {
            (N, E) => NE,
            (N, W) => NW,
            (S, E) => SE,
            (S, W) => SW,
            _ => return None,
        })
    }
}

impl fmt::Display for Aliquot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Depth controls for [`decompose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthOptions {
    /// Minimum depth (2 = quarter-quarters).
    pub min_depth: u8,
    /// Components past this depth are dropped.
    pub max_depth: Option<u8>,
    /// Always split halves into quarters.
    pub break_halves: bool,
}

impl Default for DepthOptions {
    fn default() -> Self {
        Self {
            min_depth: 2,
            max_depth: None,
            break_halves: false,
        }
    }
}

/// Split a compact block (`E2W2SE`, `NENE`, `ALL`) into components in
/// reading order (smallest subdivision first). Unknown characters are skipped.
pub fn tokenize(block: &str) -> Vec<Aliquot> {
    let upper = block.to_ascii_uppercase();
    let bytes = upper.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(b"ALL") {
            out.push(All);
            i += 3;
            continue;
        }
        let pair = (bytes[i], bytes.get(i + 1).copied());
        let (component, width) = match pair {
            (b'N', Some(b'E')) => (Some(NE), 2),
            (b'N', Some(b'W')) => (Some(NW), 2),
            (b'S', Some(b'E')) => (Some(SE), 2),
            (b'S', Some(b'W')) => (Some(SW), 2),
            (b'N', Some(b'2')) => (Some(N), 2),
            (b'S', Some(b'2')) => (Some(S), 2),
            (b'E', Some(b'2')) => (Some(E), 2),
            (b'W', Some(b'2')) => (Some(W), 2),
            _ => (None, 1),
        };
        out.extend(component);
        i += width;
    }

    out
}

/// Rewrite non-canonical orderings in reading order until nothing changes:
/// a quarter followed by a half that is not one of its own letters becomes
/// half-then-quarter (`SE W2` → `W2 SE`), and two perpendicular halves merge
/// into one quarter (`N2 E2` → `NE`).
pub fn normalize_order(mut parts: Vec<Aliquot>) -> Vec<Aliquot> {
    loop {
        let mut changed = false;

        let mut i = 0;
        while i + 1 < parts.len() {
            let (a, b) = (parts[i], parts[i + 1]);
            if a.is_quarter() && b.is_half() && !a.letters().contains(b.letters()) {
                parts.swap(i, i + 1);
                changed = true;
            }
            i += 1;
        }

        let mut i = 0;
        while i + 1 < parts.len() {
            if let Some(merged) = Aliquot::merge_halves(parts[i], parts[i + 1]) {
                parts.splice(i..i + 2, [merged]);
                changed = true;
            } else {
                i += 1;
            }
        }

        if !changed {
            return parts;
        }
    }
}

/// How many times the component at `level` (1-based, `ALL` is level 0)
/// must be subdivided.
///
/// A half needs one subdivision just to become quarters at its own level,
/// so it counts one short of a quarter at the same nominal depth.
fn subdivisions(component: Aliquot, level: u8, is_last: bool, opts: &DepthOptions) -> u8 {
    let break_half =
        component.is_half() && (level <= opts.min_depth || opts.break_halves);
    let reach = if is_last {
        opts.min_depth.saturating_sub(level)
    } else {
        0
    };
    reach + u8::from(break_half)
}

/// Subdivide one component `times` times.
///
/// The first subdivision turns `ALL` or a half into its quarters (same level);
/// a quarter becomes its four sub-quarters. Each later subdivision splits
/// every token into four, smaller part written first.
fn subdivide(component: Aliquot, times: u8) -> Vec<String> {
    if times == 0 {
        return vec![component.token().to_string()];
    }

    let mut tokens: Vec<String> = if component.is_quarter() {
        QUARTERS
            .iter()
            .map(|q| format!("{}{}", q.token(), component.token()))
            .collect()
    } else {
        component.quarters().iter().map(|q| q.token().to_string()).collect()
    };

    for _ in 1..times {
        tokens = tokens
            .iter()
            .flat_map(|t| QUARTERS.iter().map(move |q| format!("{}{t}", q.token())))
            .collect();
    }

    tokens
}

/// Decompose a compact aliquot block into QQ tokens.
///
/// `N2NE` at `min_depth = 2` gives `["NENE", "NWNE"]`; `ALL` at
/// `min_depth = 2` gives all sixteen quarter-quarters.
pub fn decompose(block: &str, opts: &DepthOptions) -> Vec<String> {
    let parts = normalize_order(tokenize(block));

    // Largest subdivision first.
    let mut parts: Vec<Aliquot> = parts.into_iter().rev().collect();
    if parts.len() > 1 {
        parts.retain(|p| *p != All);
    }
    if let Some(max) = opts.max_depth {
        parts.truncate(usize::from(max).max(1));
    }
    if parts.is_empty() {
        return Vec::new();
    }

    let last = parts.len() - 1;
    let expanded: Vec<Vec<String>> = parts
        .iter()
        .enumerate()
        .map(|(i, component)| {
            let level = if *component == All {
                0
            } else {
                u8::try_from(i + 1).unwrap_or(u8::MAX)
            };
            subdivide(*component, subdivisions(*component, level, i == last, opts))
        })
        .collect();

    // Fold from the innermost component outward.
    let mut iter = expanded.into_iter().rev();
    let mut result = iter.next().unwrap_or_default();
    for outer in iter {
        result = outer
            .iter()
            .flat_map(|o| result.iter().map(move |inner| format!("{inner}{o}")))
            .collect();
    }

    result
}
