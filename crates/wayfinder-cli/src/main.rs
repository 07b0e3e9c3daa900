//! `wayfinder`: resolve links against a linking config from the command line.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};
use wayfinder::{Linker, LinkingConfig, NestedState, tree};

/// Link tester for wayfinder linking configs.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Linking config, as JSON or TOML (chosen by extension).
    #[clap(short, long)]
    config: PathBuf,

    /// Log filter, e.g. `wayfinder=debug`. Overrides `RUST_LOG`.
    #[clap(short, long)]
    log: Option<String>,

    /// Command to run.
    #[clap(subcommand)]
    command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a URL or path and print the state, action and canonical path.
    Resolve {
        /// URL or path, e.g. `myapp://user/@vergil/edit`.
        url: String,
    },
    /// Print the compiled patterns in matching order.
    Patterns,
    /// Serialize a persisted state file as a path.
    Path {
        /// JSON state, as written by `NavigationContainer::to_json`.
        state: PathBuf,
    },
}

/// Install the log subscriber. Logs go to stderr so stdout stays parseable.
fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::from_default_env(),
    };
    fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

/// Parse a linking config. TOML is used for `.toml` files, JSON otherwise.
fn parse_config(text: &str, path: &Path) -> Result<LinkingConfig> {
    let toml = path.extension().is_some_and(|e| e == "toml");
    debug!(path = %path.display(), toml, "loading linking config");
    if toml {
        toml::from_str(text).with_context(|| format!("parsing {}", path.display()))
    } else {
        LinkingConfig::from_json(text).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Read and compile a linking config.
fn load(path: &Path) -> Result<Linker> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Linker::new(parse_config(&text, path)?)?)
}

/// Print the compiled pattern table.
fn print_patterns(linker: &Linker, w: &mut dyn Write) -> Result<()> {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["pattern", "screens"]);
    for (pattern, screens) in linker.patterns() {
        let shown = if pattern.is_empty() {
            "/".to_string()
        } else {
            pattern.to_string()
        };
        table.add_row(vec![Cell::new(shown).fg(Color::Green), Cell::new(screens.join(" > "))]);
    }
    writeln!(w, "{table}")?;
    Ok(())
}

/// Resolve a URL and print what it maps to.
fn resolve(linker: &Linker, url: &str, w: &mut dyn Write) -> Result<()> {
    let Some(state) = linker.state_from_url(url) else {
        bail!("no pattern matches {url}");
    };
    writeln!(w, "state:\n{}", serde_json::to_string_pretty(&state)?)?;
    let focused: Vec<String> = tree::partial_focused_path(&state)
        .into_iter()
        .map(|(name, params)| match params {
            Some(p) => format!("{name} {}", Value::Object(p)),
            None => name,
        })
        .collect();
    writeln!(w, "focused: {}", focused.join(" > "))?;
    if let Some(action) = linker.action_from_state(&state) {
        writeln!(w, "action:\n{}", serde_json::to_string_pretty(&action)?)?;
    }
    writeln!(w, "path: {}", linker.path_from_partial(&state))?;
    Ok(())
}

/// Print the path of a persisted state.
fn state_path(linker: &Linker, file: &Path, w: &mut dyn Write) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let state: NestedState = serde_json::from_str(&text)?;
    writeln!(w, "{}", linker.path_from_partial(&state.to_partial()))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log.as_deref());
    let linker = load(&args.config)?;
    let mut out = io::stdout().lock();
    match args.command {
        Command::Resolve { url } => resolve(&linker, &url, &mut out),
        Command::Patterns => print_patterns(&linker, &mut out),
        Command::Path { state } => state_path(&linker, &state, &mut out),
    }
}
