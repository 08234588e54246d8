//! Parse options and application configuration.
//!
//! User config lives at `~/.plss/plss.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PlssError, Result};
use crate::types::{EastWest, Layout, NorthSouth};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "plss.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".plss";

// ---------------------------------------------------------------------------
// Parse options
// ---------------------------------------------------------------------------

/// How the section matcher treats a trailing colon after `Section N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequireColon {
    /// Require the colon for the colon layouts, then retry without it if
    /// nothing matched.
    #[default]
    Default,
    /// Require the colon for the colon layouts; never retry.
    Always,
    /// Never require a colon.
    Never,
}

/// Options controlling a single description parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Township direction assumed when the text omits it.
    #[serde(default)]
    pub default_ns: NorthSouth,

    /// Range direction assumed when the text omits it.
    #[serde(default)]
    pub default_ew: EastWest,

    /// Substitute look-alike characters (`O`, `l`, `I`, `|`) inside numeric fields.
    #[serde(default)]
    pub ocr_scrub: bool,

    /// Split the text into chunks at each Twp/Rge before assembling tracts.
    #[serde(default)]
    pub segment: bool,

    #[serde(default)]
    pub require_colon: RequireColon,

    /// Strip connecting words and punctuation from captured descriptions.
    /// Absent means on for every structured layout, off for `copy_all`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_up: Option<bool>,

    /// Decompose each finished tract into lots and quarter-quarters.
    #[serde(default)]
    pub parse_qq: bool,

    /// Minimum aliquot depth (2 = quarter-quarters).
    #[serde(default = "default_min_depth")]
    pub min_depth: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u8>,

    /// Sets both the minimum and maximum depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_depth: Option<u8>,

    /// Always split halves into quarters, even past `min_depth`.
    #[serde(default)]
    pub break_halves: bool,

    /// Skip layout detection and use this layout for every chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mandated_layout: Option<Layout>,

    /// Restrict layout detection to these candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_candidates: Option<Vec<Layout>>,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            default_ns: NorthSouth::default(),
            default_ew: EastWest::default(),
            ocr_scrub: false,
            segment: false,
            require_colon: RequireColon::default(),
            clean_up: None,
            parse_qq: false,
            min_depth: default_min_depth(),
            max_depth: None,
            exact_depth: None,
            break_halves: false,
            mandated_layout: None,
            layout_candidates: None,
        }
    }
}

fn default_min_depth() -> u8 {
    2
}

impl ParseConfig {
    /// Reject option combinations that cannot be honored.
    pub fn validate(&self) -> Result<()> {
        if let (Some(exact), Some(max)) = (self.exact_depth, self.max_depth) {
            if exact != max {
                return Err(PlssError::config(format!(
                    "exact_depth ({exact}) conflicts with max_depth ({max})"
                )));
            }
        }

        let (min, max) = self.depth_bounds();
        if let Some(max) = max.filter(|max| *max < min) {
            return Err(PlssError::config(format!(
                "max_depth ({max}) is less than min_depth ({min})"
            )));
        }

        if let Some(candidates) = &self.layout_candidates {
            if candidates.is_empty() {
                return Err(PlssError::config("layout_candidates must not be empty"));
            }
            if let Some(mandated) = self.mandated_layout.filter(|l| !candidates.contains(l)) {
                return Err(PlssError::config(format!(
                    "mandated_layout {mandated} is not among layout_candidates"
                )));
            }
        }

        Ok(())
    }

    /// Effective `(min_depth, max_depth)` after applying `exact_depth`.
    pub fn depth_bounds(&self) -> (u8, Option<u8>) {
        match self.exact_depth {
            Some(exact) => (exact, Some(exact)),
            None => (self.min_depth, self.max_depth),
        }
    }

    /// Whether captured descriptions are cleaned for this layout.
    pub fn clean_up_for(&self, layout: Layout) -> bool {
        self.clean_up.unwrap_or(layout != Layout::CopyAll)
    }
}

// ---------------------------------------------------------------------------
// Application config (matching plss.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Parse options used when the CLI gives no override.
    #[serde(default)]
    pub parse: ParseConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per tract per line.
    #[default]
    Json,
    /// Tab-separated `trs`, `desc`, lots and QQs.
    Text,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Include warning and error flags in each output record.
    #[serde(default = "default_true")]
    pub include_diagnostics: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_diagnostics: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.plss/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| PlssError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.plss/plss.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path and validate its parse options.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PlssError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| PlssError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.parse.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PlssError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| PlssError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PlssError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
