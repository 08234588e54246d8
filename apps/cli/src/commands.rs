//! CLI command definitions, routing, and tracing setup.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use plss_core::{ParsedDescription, ProgressReporter, Tract, parse_batch, parse_description};
use plss_shared::{
    AppConfig, EastWest, Layout, NorthSouth, OutputConfig, OutputFormat, init_config,
    load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// plss: parse PLSS land descriptions into Township/Range/Section tracts.
#[derive(Parser)]
#[command(
    name = "plss",
    version,
    about = "Parse PLSS land descriptions into Township/Range/Section tracts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Record output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum FormatArg {
    Json,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Parse a single description and print its tracts.
    Parse {
        /// The land description.
        text: String,

        #[command(flatten)]
        options: ParseArgs,
    },

    /// Parse a file with one description per line.
    Batch {
        /// Input file; blank lines are skipped.
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: ParseArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Parse options; each one overrides the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct ParseArgs {
    /// Township direction when omitted: n or s.
    #[arg(long, value_parser = parse_ns)]
    pub ns: Option<NorthSouth>,

    /// Range direction when omitted: e or w.
    #[arg(long, value_parser = parse_ew)]
    pub ew: Option<EastWest>,

    /// Force a layout: TRS_desc, desc_STR, S_desc_TR, TR_desc_S, copy_all.
    #[arg(long)]
    pub layout: Option<Layout>,

    /// Split the text at each Twp/Rge before assembling.
    #[arg(long)]
    pub segment: bool,

    /// Repair OCR look-alike characters in numeric fields.
    #[arg(long)]
    pub ocr_scrub: bool,

    /// Decompose tracts into lots and quarter-quarters.
    #[arg(long)]
    pub qq: bool,

    /// Minimum aliquot depth.
    #[arg(long)]
    pub min_depth: Option<u8>,

    /// Maximum aliquot depth.
    #[arg(long)]
    pub max_depth: Option<u8>,

    /// Split halves into quarters at every depth.
    #[arg(long)]
    pub break_halves: bool,

    /// Output format (overrides the config file).
    #[arg(long)]
    pub format: Option<FormatArg>,
}

fn parse_ns(value: &str) -> std::result::Result<NorthSouth, String> {
    NorthSouth::from_token(value).ok_or_else(|| format!("expected n or s, got '{value}'"))
}

fn parse_ew(value: &str) -> std::result::Result<EastWest, String> {
    EastWest::from_token(value).ok_or_else(|| format!("expected e or w, got '{value}'"))
}

impl ParseArgs {
    /// Layer these flags over the file config.
    fn apply(&self, config: &mut AppConfig) {
        let parse = &mut config.parse;
        if let Some(ns) = self.ns {
            parse.default_ns = ns;
        }
        if let Some(ew) = self.ew {
            parse.default_ew = ew;
        }
        if self.layout.is_some() {
            parse.mandated_layout = self.layout;
        }
        parse.segment |= self.segment;
        parse.ocr_scrub |= self.ocr_scrub;
        parse.parse_qq |= self.qq;
        parse.break_halves |= self.break_halves;
        if let Some(min) = self.min_depth {
            parse.min_depth = min;
        }
        if self.max_depth.is_some() {
            parse.max_depth = self.max_depth;
        }
        if let Some(format) = self.format {
            config.output.format = format.into();
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so records on
/// stdout stay clean.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "plss=info",
        1 => "plss=debug",
        _ => "plss=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Parse { text, options } => cmd_parse(&text, &options),
        Command::Batch {
            input,
            output,
            options,
        } => cmd_batch(&input, output.as_deref(), &options),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

fn resolve_config(options: &ParseArgs) -> Result<AppConfig> {
    let mut config = load_config()?;
    options.apply(&mut config);
    Ok(config)
}

fn cmd_parse(text: &str, options: &ParseArgs) -> Result<()> {
    let config = resolve_config(options)?;
    let parsed = parse_description(text, &config.parse)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_description(&mut out, &parsed, &config.output)?;
    Ok(())
}

fn cmd_batch(input: &Path, output: Option<&Path>, options: &ParseArgs) -> Result<()> {
    let config = resolve_config(options)?;

    let content = std::fs::read_to_string(input)
        .wrap_err_with(|| format!("failed to read '{}'", input.display()))?;
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    info!(input = %input.display(), descriptions = lines.len(), "parsing batch");

    let progress = CliProgress::new(lines.len());
    let parsed = parse_batch(&lines, &config.parse, &progress)?;

    let mut out: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("failed to create '{}'", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    for description in &parsed {
        write_description(&mut out, description, &config.output)?;
    }
    out.flush()?;

    let tracts: usize = parsed.iter().map(|p| p.tracts.len()).sum();
    info!(descriptions = parsed.len(), tracts, "batch complete");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created config file: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let toml_str =
        toml::to_string_pretty(&config).map_err(|e| eyre!("failed to serialize config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn write_description(
    out: &mut dyn Write,
    parsed: &ParsedDescription,
    output: &OutputConfig,
) -> Result<()> {
    for tract in &parsed.tracts {
        let line = match output.format {
            OutputFormat::Json => json_record(tract, output.include_diagnostics)?,
            OutputFormat::Text => text_record(tract, output.include_diagnostics),
        };
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn json_record(tract: &Tract, include_diagnostics: bool) -> Result<String> {
    let mut value = serde_json::to_value(tract)?;
    if !include_diagnostics {
        if let Some(record) = value.as_object_mut() {
            record.remove("warnings");
            record.remove("errors");
        }
    }
    Ok(serde_json::to_string(&value)?)
}

/// `trs<TAB>desc<TAB>lots<TAB>qqs[<TAB>flags]`, lists comma-separated.
fn text_record(tract: &Tract, include_diagnostics: bool) -> String {
    let mut fields = vec![
        tract.trs.to_string(),
        tract.desc.replace(['\t', '\n'], " "),
        tract.lots.join(","),
        tract.qqs.join(","),
    ];
    if include_diagnostics {
        let flags: Vec<String> = tract
            .diagnostics
            .errors
            .iter()
            .chain(&tract.diagnostics.warnings)
            .map(ToString::to_string)
            .collect();
        fields.push(flags.join(","));
    }
    fields.join("\t")
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Batch progress bar on stderr.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn parsed(&self, current: usize, _total: usize) {
        self.bar.set_position(current as u64);
    }

    fn done(&self, tracts: usize) {
        self.bar.finish_with_message(format!("{tracts} tracts"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plss_shared::ParseConfig;

    #[test]
    fn flags_override_file_config() {
        let args = ParseArgs {
            ns: Some(NorthSouth::South),
            layout: Some(Layout::TrDescS),
            qq: true,
            max_depth: Some(3),
            format: Some(FormatArg::Text),
            ..ParseArgs::default()
        };
        let mut config = AppConfig::default();
        args.apply(&mut config);

        assert_eq!(config.parse.default_ns, NorthSouth::South);
        assert_eq!(config.parse.default_ew, EastWest::West);
        assert_eq!(config.parse.mandated_layout, Some(Layout::TrDescS));
        assert!(config.parse.parse_qq);
        assert_eq!(config.parse.max_depth, Some(3));
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn direction_flags_accept_letters_and_words() {
        assert_eq!(parse_ns("s"), Ok(NorthSouth::South));
        assert_eq!(parse_ew("East"), Ok(EastWest::East));
        assert!(parse_ns("x").is_err());
    }

    #[test]
    fn records_render_in_both_formats() {
        let parsed = parse_description("T154-R97W Sec 14: NE/4", &ParseConfig::default())
            .expect("valid config");
        let tract = &parsed.tracts[0];

        let json = json_record(tract, false).expect("serialize");
        assert!(json.contains("\"trs\":\"154n97w14\""));
        assert!(!json.contains("warnings"));

        let text = text_record(tract, true);
        assert!(text.starts_with("154n97w14\tNE/4\t"));
        assert!(text.contains("TR_fixed<T154-R97W>"));
    }

    #[test]
    fn cli_parses_batch_arguments() {
        let cli = Cli::try_parse_from([
            "plss", "-vv", "batch", "--input", "in.txt", "--qq", "--layout", "desc_STR",
        ])
        .expect("valid arguments");
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Batch { input, options, .. } => {
                assert_eq!(input, PathBuf::from("in.txt"));
                assert!(options.qq);
                assert_eq!(options.layout, Some(Layout::DescStr));
            }
            _ => panic!("expected batch command"),
        }
    }
}
