//! CLI binary for edgequake-doccompare.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ComparisonConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_doccompare::{
    ChangeKind, ChangeRecord, CompareResult, ComparisonConfig, ComparisonService, DocumentRef,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compare two local files (relative paths resolve against --files-dir)
  doccompare compare v1.txt v2.txt

  # Compare remote documents, JSON output
  doccompare --json compare https://example.com/a.html https://example.com/b.html

  # Encrypted PDFs
  doccompare compare old.pdf new.pdf --first-password s3cret --second-password s3cret

  # Compare several revisions against the first one
  doccompare multi base.txt rev1.txt rev2.txt
  doccompare multi a.pdf b.pdf --password '' --password secret

  # Render page 2 of a stored result to PNG
  doccompare page 0b7c…-uuid 2 -o page2.png

  # Download the stored artifact
  doccompare download 0b7c…-uuid -o merged.txt

  # Page count of a document, no compare
  doccompare inspect report.pdf

ENVIRONMENT VARIABLES:
  DOCCOMPARE_FILES_DIR        Root folder for source documents
  DOCCOMPARE_RESULT_DIR       Result folder (default: <files-dir>/temp)
  DOCCOMPARE_PRELOAD_PAGES    0 = render all result pages, >0 = lazy pages
  DOCCOMPARE_DOWNLOAD_TIMEOUT URL download timeout in seconds
  PDFIUM_LIB_PATH             Directory containing the pdfium shared library
  RUST_LOG                    Override log filtering (e.g. edgequake_doccompare=debug)
"#;

/// Compare documents and report where they differ.
#[derive(Parser, Debug)]
#[command(
    name = "doccompare",
    version,
    about = "Compare document revisions and report changes with page coordinates",
    long_about = "Compare two or more versions of a document (text, HTML or PDF) from local \
paths or URLs. Pairwise compares run in both directions so that insertions and deletions \
both carry accurate page coordinates. Results are stored under a fresh identifier and can \
be rendered page by page or downloaded later.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Root folder for source documents.
    #[arg(long, global = true, env = "DOCCOMPARE_FILES_DIR", default_value = ".")]
    files_dir: PathBuf,

    /// Where compare results are stored.
    #[arg(long, global = true, env = "DOCCOMPARE_RESULT_DIR")]
    result_dir: Option<PathBuf>,

    /// 0 renders every result page; any other value lists pages lazily.
    #[arg(long, global = true, env = "DOCCOMPARE_PRELOAD_PAGES", default_value_t = 0)]
    preload_pages: usize,

    /// Accept png/jpg/jpeg/bmp/gif sources.
    #[arg(long, global = true, env = "DOCCOMPARE_ALLOW_IMAGES")]
    allow_images: bool,

    /// Disable multi-document comparison.
    #[arg(long, global = true, env = "DOCCOMPARE_NO_MULTI")]
    no_multi: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "DOCCOMPARE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Longest edge of rendered PDF pages in pixels.
    #[arg(long, global = true, env = "DOCCOMPARE_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Output structured JSON instead of a human summary.
    #[arg(long, global = true, env = "DOCCOMPARE_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, global = true, env = "DOCCOMPARE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCCOMPARE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCCOMPARE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare exactly two documents in both directions.
    Compare {
        /// First (base) document: path or URL.
        first: String,
        /// Second (revision) document: path or URL.
        second: String,
        #[arg(long)]
        first_password: Option<String>,
        #[arg(long)]
        second_password: Option<String>,
    },
    /// Compare the first document against every following one.
    Multi {
        /// Two or more documents: paths or URLs.
        #[arg(num_args = 1..)]
        inputs: Vec<String>,
        /// Password for the input at the same position; repeat per input,
        /// passing "" for inputs without one.
        #[arg(long = "password")]
        passwords: Vec<String>,
    },
    /// Render one page of a stored result.
    Page {
        guid: String,
        /// 1-indexed page number.
        page: usize,
        #[arg(long)]
        password: Option<String>,
        /// Write the PNG here; otherwise print the page descriptor.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Download a stored result (or one page of it as PNG).
    Download {
        guid: String,
        /// Download this 1-indexed page as PNG instead of the artifact.
        #[arg(long)]
        index: Option<usize>,
        /// Artifact extension, when known.
        #[arg(long)]
        ext: Option<String>,
        /// Password of the stored result, used when rendering `--index`.
        #[arg(long)]
        password: Option<String>,
        /// Output file; stdout if omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the pages of a document without comparing.
    Inspect {
        path: PathBuf,
        #[arg(long)]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would fight the spinner for the terminal.
    let show_progress = !g.quiet && !g.no_progress && !g.json;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let service = ComparisonService::with_default_engine(build_config(g)?)
        .context("Failed to initialise comparison service")?;

    match cli.command {
        Command::Compare {
            ref first,
            ref second,
            ref first_password,
            ref second_password,
        } => {
            let sources = vec![
                source(first, first_password.as_deref()),
                source(second, second_password.as_deref()),
            ];
            let spinner = spinner(show_progress, "Comparing", format!("{first} ↔ {second}"));
            let result = service.compare(sources).await;
            spinner.finish_and_clear();
            report(g, &result.context("Compare failed")?)?;
        }
        Command::Multi {
            ref inputs,
            ref passwords,
        } => {
            let sources = multi_sources(inputs, passwords)?;
            let spinner = spinner(
                show_progress,
                "Comparing",
                format!("{} documents", inputs.len()),
            );
            let result = service.multi_compare(sources).await;
            spinner.finish_and_clear();
            report(g, &result.context("Multi compare failed")?)?;
        }
        Command::Page {
            ref guid,
            page,
            ref password,
            ref output,
        } => match output {
            Some(path) => {
                let png = service
                    .download_document(guid, Some(page), None, password.as_deref())
                    .await
                    .context("Page rendering failed")?;
                write_output(Some(path), &png)?;
                if !g.quiet {
                    eprintln!("{} page {} → {}", green("✔"), page, bold(&path.display().to_string()));
                }
            }
            None => {
                let desc = service
                    .load_result_page(guid, page, password.as_deref())
                    .await
                    .context("Page rendering failed")?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&desc).context("Failed to serialise page")?
                );
            }
        },
        Command::Download {
            ref guid,
            index,
            ref ext,
            ref password,
            ref output,
        } => {
            let bytes = service
                .download_document(guid, index, ext.as_deref(), password.as_deref())
                .await
                .context("Download failed")?;
            write_output(output.as_ref(), &bytes)?;
            if !g.quiet && output.is_some() {
                eprintln!("{} {} bytes", green("✔"), bytes.len());
            }
        }
        Command::Inspect {
            ref path,
            ref password,
        } => {
            let pages = service
                .load_document(path, password.as_deref())
                .await
                .context("Failed to inspect document")?;
            if g.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&pages).context("Failed to serialise pages")?
                );
            } else {
                println!("File:   {}", path.display());
                println!("Pages:  {}", pages.len());
                for p in pages.iter().filter(|p| p.is_loaded()) {
                    println!("  page {:>3}  {}x{} px", p.number, p.width, p.height);
                }
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ComparisonConfig`.
fn build_config(g: &GlobalArgs) -> Result<ComparisonConfig> {
    let mut builder = ComparisonConfig::builder()
        .files_directory(&g.files_dir)
        .preload_page_count(g.preload_pages)
        .multi_comparing(!g.no_multi)
        .allow_image_formats(g.allow_images)
        .download_timeout_secs(g.download_timeout)
        .max_rendered_pixels(g.max_pixels);

    if let Some(ref dir) = g.result_dir {
        builder = builder.result_directory(dir);
    }

    builder.build().context("Invalid configuration")
}

fn source(input: &str, password: Option<&str>) -> DocumentRef {
    let r = DocumentRef::from_input(input);
    match password {
        Some(p) => r.with_password(p),
        None => r,
    }
}

/// Pair each input with the password at the same position; "" means none.
fn multi_sources(inputs: &[String], passwords: &[String]) -> Result<Vec<DocumentRef>> {
    if passwords.len() > inputs.len() {
        anyhow::bail!(
            "{} passwords given for {} inputs",
            passwords.len(),
            inputs.len()
        );
    }
    Ok(inputs
        .iter()
        .enumerate()
        .map(|(k, input)| {
            let pw = passwords.get(k).map(String::as_str).filter(|p| !p.is_empty());
            source(input, pw)
        })
        .collect())
}

fn spinner(enabled: bool, prefix: &'static str, msg: String) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix(prefix);
    bar.set_message(msg);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn write_output(path: Option<&PathBuf>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(p) => std::fs::write(p, bytes).with_context(|| format!("Failed to write {:?}", p)),
        None => io::stdout()
            .lock()
            .write_all(bytes)
            .context("Failed to write to stdout"),
    }
}

fn report(g: &GlobalArgs, result: &CompareResult) -> Result<()> {
    if g.json {
        let json = serde_json::to_string_pretty(result).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    println!("{} {}", bold("Result:"), result.guid);
    println!("{} {}", bold("Artifact:"), result.artifact_path.display());
    println!(
        "{} {} inserted, {} deleted, {} style changes  ({} pages)",
        bold("Changes:"),
        green(&result.count(ChangeKind::Inserted).to_string()),
        red(&result.count(ChangeKind::Deleted).to_string()),
        cyan(&result.count(ChangeKind::StyleChanged).to_string()),
        result.pages.len(),
    );
    for change in &result.changes {
        println!("  {}", describe(change));
    }
    Ok(())
}

fn describe(c: &ChangeRecord) -> String {
    let marker = match c.kind {
        ChangeKind::Inserted => green("+"),
        ChangeKind::Deleted => red("-"),
        ChangeKind::StyleChanged => cyan("~"),
        _ => dim("·"),
    };
    let position = match (c.page, c.bounds) {
        (Some(page), Some(b)) => dim(&format!("p{page} @ {:.0},{:.0}", b.x, b.y)),
        _ => dim("unplaced"),
    };
    format!("{marker} {:>3}  {:<18}  {}", c.id, position, c.text)
}
