//! src/main.rs
//! Headless front end: restores or opens a document, prints the revealed
//! tree and the document outline (or its HTML), then persists the session.
//!
//! ```text
//! mdview [FILE.md | FOLDER] [--html] [--verbose]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use mdview_core::{
    config::Config,
    logging::{LoggerBuilder, LoggerConfig},
    model::tree::{Children, RootMode, VisibleRow},
    session::{StartupOutcome, ViewerSession},
};

#[derive(Debug, Default)]
struct Args {
    target: Option<PathBuf>,
    html: bool,
    verbose: bool,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = Self::default();

        for arg in std::env::args_os().skip(1) {
            let text = arg.to_string_lossy().into_owned();

            match text.as_str() {
                "--html" => args.html = true,
                "-v" | "--verbose" => args.verbose = true,
                "-h" | "--help" => {
                    println!("usage: mdview [FILE.md | FOLDER] [--html] [--verbose]");
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => anyhow::bail!("unknown option {flag}"),
                _ if args.target.is_none() => args.target = Some(PathBuf::from(arg)),
                _ => anyhow::bail!("only one path may be given"),
            }
        }

        Ok(args)
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let args = Args::parse()?;
    let config = Config::load().await.context("Failed to load configuration")?;

    let _guard = LoggerBuilder::new()
        .with_config(LoggerConfig::for_app())
        .with_level(&config.log_filter)
        .with_console(args.verbose)
        .build()
        .await
        .context("Failed to initialize logging")?;
    info!("Starting mdview");

    let (mode, startup_file) = startup_plan(&config, args.target.as_deref());
    let html = args.html;

    let report = tokio::task::spawn_blocking(move || -> Result<(String, Config)> {
        let mut session = ViewerSession::with_fs(config);
        let outcome = session
            .startup(mode, startup_file.as_deref())
            .context("Startup failed")?;

        let text = render_report(&session, &outcome, html);
        Ok((text, session.into_settings()))
    })
    .await
    .context("Viewer worker panicked")?;

    let (text, settings) = report?;
    print!("{text}");

    if let Err(e) = settings.save().await {
        warn!(error = %e, "Failed to persist session");
    }

    info!("mdview exited cleanly");
    Ok(())
}

/// A folder argument re-roots the tree; a file argument is opened under the
/// configured root mode.
fn startup_plan(config: &Config, target: Option<&Path>) -> (RootMode, Option<PathBuf>) {
    match target {
        Some(path) if path.is_dir() => (RootMode::Folder(path.to_path_buf()), None),
        Some(path) => (RootMode::from(&config.tree.root), Some(path.to_path_buf())),
        None => (RootMode::from(&config.tree.root), None),
    }
}

fn render_report(session: &ViewerSession, outcome: &StartupOutcome, html: bool) -> String {
    use std::fmt::Write;

    let mut out = String::new();

    match outcome {
        StartupOutcome::OpenedArgument(report) | StartupOutcome::RestoredFile(report) => {
            let _ = writeln!(out, "document: {}", report.document.path.display());
        }
        StartupOutcome::RestoredPath(navigation) => {
            let _ = writeln!(out, "restored: {}", navigation.target.display());
        }
        StartupOutcome::Empty => {
            let _ = writeln!(out, "no document");
        }
    }

    out.push('\n');
    let tree = session.tree();
    for row in tree.visible_rows() {
        match row {
            VisibleRow::Node { id, depth } => {
                let Some(node) = tree.node(id) else { continue };
                let marker = match (&node.children, node.is_dir(), node.expanded) {
                    (_, false, _) => ' ',
                    (Children::NotLoaded, true, _) | (_, true, false) => '+',
                    (_, true, true) => '-',
                };
                let cursor = if node.selected { '>' } else { ' ' };
                let _ = writeln!(out, "{cursor}{}{marker} {}", "  ".repeat(depth), node.name);
            }
            VisibleRow::AccessDenied { depth, .. } => {
                let _ = writeln!(out, " {}  (access denied)", "  ".repeat(depth));
            }
        }
    }

    if html {
        if let Some(rendered) = session.active_html() {
            out.push('\n');
            out.push_str(rendered);
        }
    } else if let Some(outline) = session.active_outline() {
        out.push_str("\noutline:\n");
        for heading in outline {
            let indent = "  ".repeat(usize::from(heading.level.saturating_sub(1)));
            let _ = writeln!(out, "{indent}{} (#{})", heading.text, heading.anchor_id);
        }
    }

    out
}
