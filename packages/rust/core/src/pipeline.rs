//! End-to-end parse: raw text → preprocess → segment → assemble → tracts.

use serde::Serialize;
use tracing::{debug, info, instrument};

use plss_aliquot::DepthOptions;
use plss_shared::{Diagnostics, Layout, ParseConfig, Result};

use crate::assembler::{ChunkAssembly, assemble};
use crate::cache::TrsCache;
use crate::layout::classify;
use crate::preprocess::preprocess;
use crate::section::first_section;
use crate::segment::segment;
use crate::tract::{Tract, clean_description};
use crate::twprge::first_twprge;

/// A parsed land description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDescription {
    /// Text as given.
    pub source: String,
    /// Text after preprocessing.
    pub text: String,
    /// Layout of each chunk, in order.
    pub layouts: Vec<Layout>,
    /// Tracts in source order; never empty.
    pub tracts: Vec<Tract>,
    /// Description-level flags. Each tract carries a copy of these too.
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

impl ParsedDescription {
    /// Canonical TRS of every tract, in order.
    pub fn trs_list(&self) -> Vec<String> {
        self.tracts.iter().map(|t| t.trs.to_string()).collect()
    }

    /// `(trs, desc)` of every tract, in order.
    pub fn trs_desc_pairs(&self) -> Vec<(String, String)> {
        self.tracts
            .iter()
            .map(|t| (t.trs.to_string(), t.desc.clone()))
            .collect()
    }
}

/// Progress callbacks for [`parse_batch`].
pub trait ProgressReporter {
    /// Called after each description is parsed.
    fn parsed(&self, current: usize, total: usize);
    /// Called once the batch is finished.
    fn done(&self, tracts: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn parsed(&self, _current: usize, _total: usize) {}
    fn done(&self, _tracts: usize) {}
}

/// Parse one description with a fresh [`TrsCache`].
///
/// Only an invalid `config` is an `Err`; malformed text always yields at
/// least one tract plus diagnostics.
pub fn parse_description(text: &str, config: &ParseConfig) -> Result<ParsedDescription> {
    let mut cache = TrsCache::new();
    parse_description_cached(text, config, &mut cache)
}

/// Parse one description, memoizing TRS parsing in `cache`.
#[instrument(skip_all, fields(len = text.len()))]
pub fn parse_description_cached(
    text: &str,
    config: &ParseConfig,
    cache: &mut TrsCache,
) -> Result<ParsedDescription> {
    config.validate()?;

    let pre = preprocess(text, config);
    let mut diag = Diagnostics::new();
    for token in &pre.fixed {
        diag.warn("TR_fixed", token.as_str());
    }
    if first_twprge(&pre.text).is_none() {
        diag.error("noTR", "");
    }
    if first_section(&pre.text).is_none() {
        diag.error("noSection", "");
    }

    let chunks = if config.segment {
        segment(&pre.text, config)
    } else {
        vec![0..pre.text.len()]
    };

    let mut assemblies: Vec<ChunkAssembly> = chunks
        .into_iter()
        .map(|range| {
            let chunk = &pre.text[range];
            let layout = config
                .mandated_layout
                .unwrap_or_else(|| classify(chunk, config.layout_candidates.as_deref()));
            assemble(chunk, layout, config.require_colon)
        })
        .collect();

    let components: usize = assemblies.iter().map(|a| a.components.len()).sum();
    if components == 1 {
        for assembly in &mut assemblies {
            assembly.reattach_unused();
        }
    }

    let mut tracts = Vec::new();
    for assembly in &mut assemblies {
        assembly.flag_unused();
        diag.extend(&assembly.diagnostics);
        tracts.extend(finish_chunk(assembly, config, cache, &mut diag));
    }

    // Description-level flags first, then each tract's own.
    for tract in &mut tracts {
        let own = std::mem::replace(&mut tract.diagnostics, diag.clone());
        tract.diagnostics.extend(&own);
    }

    if config.parse_qq {
        let (min_depth, max_depth) = config.depth_bounds();
        let opts = DepthOptions {
            min_depth,
            max_depth,
            break_halves: config.break_halves,
        };
        for tract in &mut tracts {
            tract.parse_lots_qqs(&opts);
        }
    }

    let layouts: Vec<Layout> = assemblies.iter().map(|a| a.layout).collect();
    info!(
        tracts = tracts.len(),
        warnings = diag.warnings.len(),
        errors = diag.errors.len(),
        "parsed description"
    );

    Ok(ParsedDescription {
        source: text.to_string(),
        text: pre.text,
        layouts,
        tracts,
        diagnostics: diag,
    })
}

/// One tract per section of each component, descriptions cleaned per layout.
fn finish_chunk(
    assembly: &ChunkAssembly,
    config: &ParseConfig,
    cache: &mut TrsCache,
    diag: &mut Diagnostics,
) -> Vec<Tract> {
    let clean = config.clean_up_for(assembly.layout);
    let mut tracts = Vec::new();

    for component in &assembly.components {
        let desc = if clean {
            clean_description(&component.desc)
        } else {
            component.desc.trim().to_string()
        };

        let sections: Vec<Option<u8>> = if component.sections.is_empty() {
            vec![None]
        } else {
            component.sections.iter().copied().map(Some).collect()
        };

        for section in sections {
            let trs = cache.tract_trs(component.twprge.as_deref(), section);
            if component.reconstructed {
                diag.warn("sec_within", trs.to_string());
            }
            tracts.push(Tract::new(trs, desc.clone(), assembly.layout));
        }
    }

    debug!(layout = %assembly.layout, tracts = tracts.len(), "finished chunk");
    tracts
}

/// Parse many descriptions with one shared cache.
///
/// The config is validated once up front; after that no description can fail.
#[instrument(skip_all, fields(count = texts.len()))]
pub fn parse_batch<S: AsRef<str>>(
    texts: &[S],
    config: &ParseConfig,
    progress: &dyn ProgressReporter,
) -> Result<Vec<ParsedDescription>> {
    config.validate()?;

    let mut cache = TrsCache::new();
    let mut parsed = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        parsed.push(parse_description_cached(text.as_ref(), config, &mut cache)?);
        progress.parsed(i + 1, texts.len());
    }

    let tracts = parsed.iter().map(|p| p.tracts.len()).sum();
    progress.done(tracts);
    debug!(cached = cache.len(), hits = cache.hits(), "batch finished");
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeSet;

    use plss_shared::{EastWest, NorthSouth, PlssError, RequireColon};

    use super::*;

    fn parse(text: &str) -> ParsedDescription {
        parse_description(text, &ParseConfig::default()).expect("valid config")
    }

    fn pairs(parsed: &ParsedDescription) -> BTreeSet<(String, String)> {
        parsed.trs_desc_pairs().into_iter().collect()
    }

    #[test]
    fn multi_section_expands_to_one_tract_per_section() {
        let parsed = parse("T154N-R97W Sec 24 - 27: S/2");
        assert_eq!(
            parsed.trs_desc_pairs(),
            [
                ("154n97w24".to_string(), "S/2".to_string()),
                ("154n97w25".to_string(), "S/2".to_string()),
                ("154n97w26".to_string(), "S/2".to_string()),
                ("154n97w27".to_string(), "S/2".to_string()),
            ]
        );
        assert!(parsed.diagnostics.has_warning("multisec_found"));
    }

    #[test]
    fn all_four_layouts_agree() {
        let phrasings = [
            "T155N-R97W Sec 1: SW/4, T154N-R97W Sec 20: W/2, Sec 24-27: S/2, Sec 28: N/2",
            "SW/4 of Sec 1, T155N-R97W; W/2 of Sec 20, S/2 of Sec 24-27, N/2 of Sec 28, T154N-R97W",
            "Sec 1: SW/4, T155N-R97W; Sec 20: W/2, Sec 24-27: S/2, Sec 28: N/2, T154N-R97W",
            "T155N-R97W SW/4 of Sec 1, T154N-R97W W/2 of Sec 20, S/2 of Sec 24-27, N/2 of Sec 28",
        ];
        let expected: BTreeSet<(String, String)> = [
            ("155n97w01", "SW/4"),
            ("154n97w20", "W/2"),
            ("154n97w24", "S/2"),
            ("154n97w25", "S/2"),
            ("154n97w26", "S/2"),
            ("154n97w27", "S/2"),
            ("154n97w28", "N/2"),
        ]
        .into_iter()
        .map(|(trs, desc)| (trs.to_string(), desc.to_string()))
        .collect();

        let layouts = [Layout::TrsDesc, Layout::DescStr, Layout::SDescTr, Layout::TrDescS];
        for (text, layout) in phrasings.into_iter().zip(layouts) {
            let parsed = parse(text);
            assert_eq!(parsed.layouts, [layout], "text: {text}");
            assert_eq!(pairs(&parsed), expected, "text: {text}");

            let segmented = ParseConfig {
                segment: true,
                ..ParseConfig::default()
            };
            let parsed = parse_description(text, &segmented).expect("valid config");
            assert_eq!(pairs(&parsed), expected, "segmented text: {text}");
        }
    }

    #[test]
    fn omitted_directions_use_defaults() {
        let parsed = parse("T154-R97W Sec 14: NE/4");
        assert_eq!(parsed.trs_list(), ["154n97w14"]);
        assert!(parsed.diagnostics.warnings.iter().any(|f| f.to_string() == "TR_fixed<T154-R97W>"));

        let south = ParseConfig {
            default_ns: NorthSouth::South,
            default_ew: EastWest::West,
            ..ParseConfig::default()
        };
        let parsed = parse_description("T154-R97W Sec 14: NE/4", &south).expect("valid config");
        assert_eq!(parsed.trs_list(), ["154s97w14"]);
    }

    #[test]
    fn unstructured_text_degrades_to_one_copy_all_tract() {
        let parsed = parse("a parcel described by metes and bounds");
        assert_eq!(parsed.layouts, [Layout::CopyAll]);
        assert_eq!(parsed.tracts.len(), 1);

        let tract = &parsed.tracts[0];
        assert_eq!(tract.trs.to_string(), "XXXzXXXzXX");
        assert_eq!(tract.desc, "a parcel described by metes and bounds");
        assert!(tract.diagnostics.has_error("noTR"));
        assert!(tract.diagnostics.has_error("noSection"));
        assert!(tract.diagnostics.has_error("trs_error"));
    }

    #[test]
    fn empty_text_still_yields_a_tract() {
        let parsed = parse("");
        assert_eq!(parsed.trs_list(), ["XXXzXXXzXX"]);
    }

    #[test]
    fn missing_colon_is_recovered_on_second_pass() {
        let parsed = parse("T154N-R97W Section 14 NE/4");
        assert_eq!(parsed.layouts, [Layout::TrsDesc]);
        assert_eq!(parsed.trs_desc_pairs(), [("154n97w14".to_string(), "NE/4".to_string())]);
        assert!(parsed.diagnostics.has_warning("pulled_sec_without_colon"));

        let strict = ParseConfig {
            require_colon: RequireColon::Always,
            ..ParseConfig::default()
        };
        let parsed = parse_description("T154N-R97W Section 14 NE/4", &strict).expect("valid config");
        assert_eq!(parsed.layouts, [Layout::CopyAll]);
        assert!(parsed.diagnostics.has_warning("sec_ignored"));
    }

    #[test]
    fn description_level_flags_reach_every_tract() {
        let parsed = parse("T154-R97 Sec 1 - 2: ALL");
        assert_eq!(parsed.tracts.len(), 2);
        for tract in &parsed.tracts {
            assert!(tract.diagnostics.has_warning("TR_fixed"));
            assert!(tract.diagnostics.has_warning("multisec_found"));
        }
    }

    #[test]
    fn lone_tract_absorbs_stray_text() {
        let parsed = parse("All that land in T154N-R97W Sec 14: NE/4");
        assert_eq!(parsed.trs_list(), ["154n97w14"]);
        assert_eq!(parsed.tracts[0].desc, "All that land in NE/4");
        assert!(parsed.diagnostics.warnings.iter().any(|f| f.to_string() == "sec_within<154n97w14>"));
        assert!(!parsed.diagnostics.has_warning("unused_desc"));
    }

    #[test]
    fn mandated_layout_skips_detection() {
        let config = ParseConfig {
            mandated_layout: Some(Layout::CopyAll),
            ..ParseConfig::default()
        };
        let parsed = parse_description("T154N-R97W Sec 14: NE/4", &config).expect("valid config");
        assert_eq!(parsed.trs_list(), ["154n97w14"]);
        assert_eq!(parsed.tracts[0].desc, "T154N-R97W Sec 14: NE/4");
    }

    #[test]
    fn parse_qq_decomposes_each_tract() {
        let config = ParseConfig {
            parse_qq: true,
            ..ParseConfig::default()
        };
        let parsed =
            parse_description("T154N-R97W Sec 1: Lots 1 - 3, S/2NE/4, Sec 2: ALL", &config)
                .expect("valid config");
        assert_eq!(parsed.tracts[0].lots, ["L1", "L2", "L3"]);
        assert_eq!(parsed.tracts[0].qqs, ["SENE", "SWNE"]);
        assert_eq!(parsed.tracts[1].qqs.len(), 16);
    }

    #[test]
    fn exact_depth_applies_to_decomposition() {
        let config = ParseConfig {
            parse_qq: true,
            exact_depth: Some(1),
            ..ParseConfig::default()
        };
        let parsed = parse_description("T154N-R97W Sec 1: ALL", &config).expect("valid config");
        assert_eq!(parsed.tracts[0].qqs, ["NE", "NW", "SE", "SW"]);
    }

    #[test]
    fn invalid_config_is_the_only_failure() {
        let config = ParseConfig {
            min_depth: 3,
            max_depth: Some(2),
            ..ParseConfig::default()
        };
        let err = parse_description("T154N-R97W Sec 1: ALL", &config);
        assert!(matches!(err, Err(PlssError::Config { .. })));
    }

    #[test]
    fn tracts_serialize_to_json() {
        let parsed = parse("T154N-R97W Sec 14: NE/4");
        let json = serde_json::to_value(&parsed).expect("serialize");
        assert_eq!(json["tracts"][0]["trs"], "154n97w14");
        assert_eq!(json["layouts"][0], "TRS_desc");
    }

    struct Counting {
        calls: Cell<usize>,
        finished: Cell<usize>,
    }

    impl ProgressReporter for Counting {
        fn parsed(&self, _current: usize, _total: usize) {
            self.calls.set(self.calls.get() + 1);
        }
        fn done(&self, tracts: usize) {
            self.finished.set(tracts);
        }
    }

    #[test]
    fn batch_reports_progress() {
        let texts = ["T154N-R97W Sec 1: ALL", "T154N-R97W Sec 2 - 3: ALL", "nothing"];
        let progress = Counting {
            calls: Cell::new(0),
            finished: Cell::new(0),
        };
        let parsed = parse_batch(&texts, &ParseConfig::default(), &progress).expect("valid config");
        assert_eq!(parsed.len(), 3);
        assert_eq!(progress.calls.get(), 3);
        assert_eq!(progress.finished.get(), 4);

        let parsed = parse_batch(&texts, &ParseConfig::default(), &SilentProgress).expect("valid config");
        assert_eq!(parsed[1].trs_list(), ["154n97w02", "154n97w03"]);
    }
}
