use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wbuild_core::{
    DEFAULT_MAX_DEPTH, HtmlEmitOptions, ParseError, ParseOptions, SourceMap, ThemeMode, Tree,
    emit_html_sanitized, emit_html_with_options, parse_with_options,
};
use wbuild_renderer::{Assets, Renderer};

#[derive(Parser, Debug)]
#[command(name = "wbuild")]
#[command(about = "Build a themed HTML page from bracket markup")]
struct Cli {
    /// Markup file to build; reads stdin when omitted
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Write the result here instead of stdout
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Initial page theme
    #[arg(long, value_enum, default_value_t = ThemeArg::Dark)]
    theme: ThemeArg,

    /// Markup file rendered after the document as a separate tree
    #[arg(long, value_name = "FILE")]
    footer: Option<PathBuf>,

    /// Filter the emitted HTML through the allow-list sanitizer
    #[arg(long)]
    sanitized: bool,

    /// Print only the document HTML, without the page wrapper
    #[arg(long)]
    raw: bool,

    /// Skip syntax highlighting of code blocks
    #[arg(long)]
    no_highlight: bool,

    /// Print the parsed tree as JSON and stop
    #[arg(long)]
    dump_tree: bool,

    /// Write wbuild.css and wbuild.js here and link them instead of inlining
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Bracket, brace and command nesting limit
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Reject documents that reuse a uid
    #[arg(long)]
    strict_uids: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for ThemeMode {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => ThemeMode::Light,
            ThemeArg::Dark => ThemeMode::Dark,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wbuild=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let parse_options = ParseOptions {
        max_depth: cli.max_depth,
        reject_duplicate_uids: cli.strict_uids,
    };
    let emit_options = HtmlEmitOptions {
        theme: cli.theme.into(),
        max_depth: cli.max_depth,
    };

    let source = read_input(cli.input.as_deref())?;
    let tree = build_tree(&source, &parse_options)?;
    tracing::info!(nodes = tree.len(), "parsed document");

    if cli.dump_tree {
        let json = serde_json::to_string_pretty(&tree).context("failed to serialize tree")?;
        return write_output(cli.output.as_deref(), &format!("{}\n", json));
    }

    let renderer = Renderer::new(emit_options.theme);
    let body = emit(cli, &renderer, &tree, &emit_options)?;

    if cli.raw {
        return write_output(cli.output.as_deref(), &format!("{}\n", body));
    }

    let footer = match &cli.footer {
        Some(path) => {
            let source = read_input(Some(path))?;
            let tree = build_tree(&source, &parse_options)
                .with_context(|| format!("in footer {}", path.display()))?;
            Some(emit(cli, &renderer, &tree, &emit_options)?)
        }
        None => None,
    };

    let renderer = match &cli.assets {
        Some(dir) => {
            renderer
                .generate_files(dir)
                .with_context(|| format!("failed to write assets to {}", dir.display()))?;
            renderer.with_assets(Assets::Linked)
        }
        None => renderer,
    };

    let page = renderer.embed_html(&body, footer.as_deref());
    write_output(cli.output.as_deref(), &page)
}

fn build_tree(source: &str, options: &ParseOptions) -> Result<Tree> {
    parse_with_options(source, options).map_err(|err| anyhow!(report(source, &err)))
}

fn emit(cli: &Cli, renderer: &Renderer, tree: &Tree, options: &HtmlEmitOptions) -> Result<String> {
    let html = if cli.sanitized {
        emit_html_sanitized(tree, options)
    } else {
        emit_html_with_options(tree, options)
    }
    .context("failed to emit html")?;

    if cli.no_highlight {
        Ok(html)
    } else {
        Ok(renderer.highlight_html(&html))
    }
}

/// `LINE:COL error CODE message` with one-based positions, or
/// `error CODE message` when the error carries no span.
fn report(source: &str, err: &ParseError) -> String {
    match err.span() {
        Some(span) => {
            let location = SourceMap::new(source).locate(span.start);
            format!("{} error {} {}", location, err.code(), err)
        }
        None => format!("error {} {}", err.code(), err),
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("error: failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("error: failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn write_output(path: Option<&Path>, contents: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, contents)
            .with_context(|| format!("error: failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(contents.as_bytes())
                .and_then(|()| stdout.flush())
                .context("error: failed to write stdout")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::report;
    use wbuild_core::parse;

    #[test]
    fn reports_position_of_spanned_errors() {
        let source = "[section]\n  [bg=x]";
        let err = parse(source).unwrap_err();
        assert_eq!(
            report(source, &err),
            format!("2:3 error {} {}", err.code(), err)
        );
    }

    #[test]
    fn columns_count_characters_not_bytes() {
        let source = "[text]Übersicht\n\u{e9}\u{e9} [section][bg=x]";
        let err = parse(source).unwrap_err();
        assert!(report(source, &err).starts_with("2:13 error "));
    }

    #[test]
    fn reports_errors_without_position() {
        let source = "[text]\\link{#nowhere}";
        let err = parse(source).unwrap_err();
        assert_eq!(report(source, &err), format!("error {} {}", err.code(), err));
    }
}
