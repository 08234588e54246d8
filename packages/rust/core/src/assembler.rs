//! Marker-based assembly of tract components from one chunk of text.
//!
//! Once Twp/Rge and section matches are known, the chunk is reduced to a
//! sorted list of [`Marker`]s. Walking consecutive marker pairs visits every
//! span of the chunk exactly once; the layout decides which spans become
//! descriptions, and every span is recorded in [`ChunkAssembly::spans`] so
//! the chunk can be rebuilt from them.

use std::ops::Range;

use tracing::{debug, instrument, warn};

use plss_shared::{Diagnostics, Layout, RequireColon};

use crate::section::{SectionMatch, find_sections, first_section};
use crate::twprge::{TwpRgeMatch, find_twprges, first_twprge};

/// Unused spans shorter than this (trimmed, in characters) are not reported.
const MIN_UNUSED_LEN: usize = 4;

/// Kind of a marker. Declaration order breaks ties at equal positions:
/// ends sort before starts, so adjacent matches never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MarkerKind {
    TextStart,
    TwpRgeEnd,
    SecEnd,
    TwpRgeStart,
    SecStart,
    TextEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub pos: usize,
    pub kind: MarkerKind,
}

/// A description span tied to its sections and Twp/Rge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TractComponent {
    pub span: Range<usize>,
    /// Raw description text.
    pub desc: String,
    /// One tract is produced per section; empty means the section is unknown.
    pub sections: Vec<u8>,
    /// Canonical short Twp/Rge; `None` when none applied.
    pub twprge: Option<String>,
    /// Unused text was folded back into the description.
    pub reconstructed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Description,
    TwpRge,
    Section,
    Unused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub range: Range<usize>,
}

/// Result of assembling one chunk.
#[derive(Debug, Clone)]
pub struct ChunkAssembly {
    /// Layout actually used; `copy_all` after a fallback.
    pub layout: Layout,
    pub text: String,
    pub components: Vec<TractComponent>,
    /// Every non-empty span of `text`, in order.
    pub spans: Vec<Span>,
    pub diagnostics: Diagnostics,
}

/// Assemble tract components from `text` under `layout`.
///
/// A structured layout that yields no component is retried once as
/// `copy_all`, which always yields exactly one.
#[instrument(skip_all, fields(%layout, len = text.len()))]
pub fn assemble(text: &str, layout: Layout, require_colon: RequireColon) -> ChunkAssembly {
    let mut diag = Diagnostics::new();

    if layout != Layout::CopyAll {
        let (components, spans) = walk(text, layout, require_colon, &mut diag);
        if !components.is_empty() {
            debug!(components = components.len(), "assembled chunk");
            return ChunkAssembly {
                layout,
                text: text.to_string(),
                components,
                spans,
                diagnostics: diag,
            };
        }
        warn!(%layout, "no tracts found, falling back to copy_all");
        diag.warn("copy_all_fallback", layout.as_str());
    }

    copy_all(text, diag)
}

/// The whole chunk as one component, tagged with the first Twp/Rge and the
/// first section found.
fn copy_all(text: &str, diagnostics: Diagnostics) -> ChunkAssembly {
    let twprge = first_twprge(text).map(|m| m.value);
    let sections = first_section(text)
        .and_then(|m| m.sections.first().copied())
        .into_iter()
        .collect();

    let component = TractComponent {
        span: 0..text.len(),
        desc: text.to_string(),
        sections,
        twprge,
        reconstructed: false,
    };

    ChunkAssembly {
        layout: Layout::CopyAll,
        text: text.to_string(),
        components: vec![component],
        spans: vec![Span {
            kind: SpanKind::Description,
            range: 0..text.len(),
        }],
        diagnostics,
    }
}

fn markers(len: usize, twprges: &[TwpRgeMatch], sections: &[SectionMatch]) -> Vec<Marker> {
    let mut markers = vec![
        Marker { pos: 0, kind: MarkerKind::TextStart },
        Marker { pos: len, kind: MarkerKind::TextEnd },
    ];
    for m in twprges {
        markers.push(Marker { pos: m.start, kind: MarkerKind::TwpRgeStart });
        markers.push(Marker { pos: m.end, kind: MarkerKind::TwpRgeEnd });
    }
    for m in sections {
        markers.push(Marker { pos: m.start, kind: MarkerKind::SecStart });
        markers.push(Marker { pos: m.end, kind: MarkerKind::SecEnd });
    }
    markers.sort_by_key(|m| (m.pos, m.kind));
    markers
}

/// Walk the markers once, capturing descriptions per layout.
///
/// Twp/Rge and section matches are consumed first-in-first-out as their start
/// markers are reached. Twp/Rge-first layouts stamp each component with the
/// Twp/Rge active when it is captured; the others hold components as pending
/// until the next Twp/Rge arrives.
fn walk(
    text: &str,
    layout: Layout,
    require_colon: RequireColon,
    diag: &mut Diagnostics,
) -> (Vec<TractComponent>, Vec<Span>) {
    let twprges = find_twprges(text, layout, diag);
    let mut sections = find_sections(text, layout, require_colon, diag);
    sections.retain(|s| !twprges.iter().any(|t| s.start < t.end && t.start < s.end));

    let mut components: Vec<TractComponent> = Vec::new();
    let mut spans = Vec::new();

    let mut next_twprge = 0;
    let mut next_section = 0;
    let mut working_twprge: Option<&TwpRgeMatch> = None;
    let mut twprge_used = false;
    let mut working_section: Option<&SectionMatch> = None;
    let mut pending: Vec<usize> = Vec::new();

    for pair in markers(text.len(), &twprges, &sections).windows(2) {
        let (current, next) = (pair[0], pair[1]);
        let range = current.pos..next.pos;

        match current.kind {
            MarkerKind::TwpRgeStart => {
                if layout.twprge_first() {
                    close_twprge(working_twprge, twprge_used, diag);
                }
                working_twprge = twprges.get(next_twprge);
                next_twprge += 1;
                twprge_used = false;

                if let Some(twprge) = working_twprge.filter(|_| !layout.twprge_first()) {
                    if pending.is_empty() {
                        diag.error("sec_error", twprge.value.clone());
                    }
                    for i in pending.drain(..) {
                        components[i].twprge = Some(twprge.value.clone());
                    }
                }
                spans.push(Span { kind: SpanKind::TwpRge, range });
                continue;
            }
            MarkerKind::SecStart => {
                working_section = sections.get(next_section);
                next_section += 1;
                spans.push(Span { kind: SpanKind::Section, range });
                continue;
            }
            _ => {}
        }

        let owner = if layout.desc_follows_section() {
            working_section.filter(|_| current.kind == MarkerKind::SecEnd)
        } else if next.kind == MarkerKind::SecStart {
            sections.get(next_section)
        } else {
            None
        };

        let Some(section) = owner else {
            if !range.is_empty() {
                spans.push(Span { kind: SpanKind::Unused, range });
            }
            continue;
        };

        let twprge = if layout.twprge_first() {
            twprge_used |= working_twprge.is_some();
            working_twprge.map(|t| t.value.clone())
        } else {
            pending.push(components.len());
            None
        };
        components.push(TractComponent {
            span: range.clone(),
            desc: text[range.clone()].to_string(),
            sections: section.sections.clone(),
            twprge,
            reconstructed: false,
        });
        spans.push(Span { kind: SpanKind::Description, range });
    }

    if layout.twprge_first() {
        close_twprge(working_twprge, twprge_used, diag);
    }

    (components, spans)
}

/// A Twp/Rge that governed no section is flagged when it is replaced.
fn close_twprge(twprge: Option<&TwpRgeMatch>, used: bool, diag: &mut Diagnostics) {
    if let Some(twprge) = twprge.filter(|_| !used) {
        diag.error("sec_error", twprge.value.clone());
    }
}

impl ChunkAssembly {
    /// Text of a span.
    pub fn span_text(&self, span: &Span) -> &str {
        &self.text[span.range.clone()]
    }

    fn is_significant(&self, span: &Span) -> bool {
        span.kind == SpanKind::Unused && self.span_text(span).trim().chars().count() >= MIN_UNUSED_LEN
    }

    /// Fold significant unused text into the chunk's only component, before
    /// or after its own description according to position.
    ///
    /// Returns whether anything was reattached.
    pub fn reattach_unused(&mut self) -> bool {
        if self.components.len() != 1 {
            return false;
        }
        let significant: Vec<usize> = (0..self.spans.len())
            .filter(|&i| self.is_significant(&self.spans[i]))
            .collect();
        if significant.is_empty() {
            return false;
        }

        let own = self.components[0].span.clone();
        let mut before = Vec::new();
        let mut after = Vec::new();
        for &i in &significant {
            let span = &self.spans[i];
            let piece = self.text[span.range.clone()].trim().to_string();
            if span.range.end <= own.start {
                before.push(piece);
            } else {
                after.push(piece);
            }
        }

        let component = &mut self.components[0];
        let own_desc = component.desc.trim().to_string();
        component.desc = before
            .into_iter()
            .chain(std::iter::once(own_desc))
            .chain(after)
            .filter(|piece| !piece.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        component.reconstructed = true;

        for i in significant {
            self.spans[i].kind = SpanKind::Description;
        }
        true
    }

    /// Report every significant unused span as `unused_desc`.
    pub fn flag_unused(&mut self) {
        let unused: Vec<String> = self
            .spans
            .iter()
            .filter(|span| self.is_significant(span))
            .map(|span| self.span_text(span).trim().to_string())
            .collect();
        for text in unused {
            self.diagnostics.warn("unused_desc", text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, layout: Layout) -> ChunkAssembly {
        assemble(text, layout, RequireColon::Default)
    }

    fn summary(assembly: &ChunkAssembly) -> Vec<(Option<String>, Vec<u8>, String)> {
        assembly
            .components
            .iter()
            .map(|c| (c.twprge.clone(), c.sections.clone(), c.desc.trim().to_string()))
            .collect()
    }

    fn rebuilt(assembly: &ChunkAssembly) -> String {
        assembly.spans.iter().map(|s| assembly.span_text(s)).collect()
    }

    #[test]
    fn markers_sort_ends_before_starts() {
        let twprges = [TwpRgeMatch { value: "154n97w".into(), start: 0, end: 10 }];
        let sections = [SectionMatch { sections: vec![1], start: 10, end: 16, has_colon: true }];
        let kinds: Vec<MarkerKind> = markers(20, &twprges, &sections).iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            [
                MarkerKind::TextStart,
                MarkerKind::TwpRgeStart,
                MarkerKind::TwpRgeEnd,
                MarkerKind::SecStart,
                MarkerKind::SecEnd,
                MarkerKind::TextEnd,
            ]
        );
    }

    #[test]
    fn twprge_first_with_description_after_section() {
        let assembly = run("T154N-R97W Sec 14: NE/4, Sec 15: ALL", Layout::TrsDesc);
        assert_eq!(
            summary(&assembly),
            [
                (Some("154n97w".to_string()), vec![14], "NE/4,".to_string()),
                (Some("154n97w".to_string()), vec![15], "ALL".to_string()),
            ]
        );
        assert_eq!(assembly.layout, Layout::TrsDesc);
    }

    #[test]
    fn twprge_last_fills_pending_components() {
        let assembly = run(
            "NE/4 of Sec 14, S/2 of Sec 15, T154N-R97W; W/2 of Sec 3, T155N-R98W",
            Layout::DescStr,
        );
        let summary = summary(&assembly);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[0], (Some("154n97w".to_string()), vec![14], "NE/4 of".to_string()));
        assert_eq!(summary[1].0.as_deref(), Some("154n97w"));
        assert_eq!(summary[2], (Some("155n98w".to_string()), vec![3], "; W/2 of".to_string()));
    }

    #[test]
    fn section_first_with_description_after_section() {
        let assembly = run("Sec 14: NE/4, Sec 15: ALL, T154N-R97W", Layout::SDescTr);
        let twprges: Vec<_> = assembly.components.iter().map(|c| c.twprge.as_deref()).collect();
        assert_eq!(twprges, [Some("154n97w"), Some("154n97w")]);
        assert_eq!(assembly.components[1].desc.trim(), "ALL,");
    }

    #[test]
    fn twprge_without_sections_is_a_sec_error() {
        let assembly = run("T154N-R97W Sec 1: ALL, T155N-R97W", Layout::TrsDesc);
        assert!(assembly.diagnostics.errors.iter().any(|f| f.to_string() == "sec_error<155n97w>"));

        let assembly = run("Sec 14: NE/4, T154N-R97W, T155N-R98W", Layout::SDescTr);
        assert!(assembly.diagnostics.errors.iter().any(|f| f.to_string() == "sec_error<155n98w>"));
    }

    #[test]
    fn unused_text_is_reported() {
        let mut assembly = run(
            "T154N-R97W Sec 14: NE/4, T155N-R98W less the county road Sec 3: ALL",
            Layout::TrsDesc,
        );
        assert_eq!(assembly.components.len(), 2);
        assembly.flag_unused();
        assert!(
            assembly
                .diagnostics
                .warnings
                .iter()
                .any(|f| f.to_string() == "unused_desc<less the county road>")
        );
    }

    #[test]
    fn empty_structured_result_falls_back_to_copy_all() {
        let assembly = run("T154N-R97W the NE/4", Layout::TrsDesc);
        assert_eq!(assembly.layout, Layout::CopyAll);
        assert_eq!(summary(&assembly), [(Some("154n97w".to_string()), vec![], "T154N-R97W the NE/4".to_string())]);
        assert!(assembly.diagnostics.has_warning("copy_all_fallback"));
    }

    #[test]
    fn copy_all_takes_first_twprge_and_section() {
        let assembly = run("Sec 3 and Sec 4 of T154N-R97W and T1N-R1E", Layout::CopyAll);
        assert_eq!(assembly.components.len(), 1);
        assert_eq!(assembly.components[0].twprge.as_deref(), Some("154n97w"));
        assert_eq!(assembly.components[0].sections, [3]);
        assert!(assembly.diagnostics.is_empty());
    }

    #[test]
    fn spans_rebuild_the_chunk() {
        let cases = [
            ("T155N-R97W Sec 1: SW/4, T154N-R97W Sec 20: W/2, Sec 24-27: S/2", Layout::TrsDesc),
            ("SW/4 of Sec 1, T155N-R97W; W/2 of Sec 20, T154N-R97W tail", Layout::DescStr),
            ("Sec 1: SW/4, T155N-R97W; Sec 20: W/2, T154N-R97W", Layout::SDescTr),
            ("lead T155N-R97W SW/4 of Sec 1, T154N-R97W W/2 of Sec 20 trailing", Layout::TrDescS),
            ("no structure at all", Layout::TrsDesc),
        ];
        for (text, layout) in cases {
            let assembly = run(text, layout);
            assert_eq!(rebuilt(&assembly), text, "layout {layout}");
        }
    }

    #[test]
    fn lone_component_absorbs_unused_text() {
        let mut assembly = run("All that land in T154N-R97W Sec 14: NE/4", Layout::TrsDesc);
        assert!(assembly.reattach_unused());
        let component = &assembly.components[0];
        assert!(component.reconstructed);
        assert_eq!(component.desc, "All that land in NE/4");

        assembly.flag_unused();
        assert!(!assembly.diagnostics.has_warning("unused_desc"));
        assert_eq!(rebuilt(&assembly), "All that land in T154N-R97W Sec 14: NE/4");
    }

    #[test]
    fn several_components_are_not_reattached() {
        let mut assembly = run("Extra words T154N-R97W Sec 1: ALL, Sec 2: ALL", Layout::TrsDesc);
        assert!(!assembly.reattach_unused());
    }
}
