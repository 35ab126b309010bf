//! stylefold - fold CSS formatting into inline styles

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info, warn};

use stylefold::{BookOutput, CssSummary, FormattedEntry, Options, load_book_dir, process_book};

#[derive(Parser)]
#[command(name = "stylefold")]
#[command(
    version,
    about = "Fold CSS bold/italic/underline/alignment into inline styles and extract formatted text",
    long_about = None
)]
#[command(after_help = "Every sub-directory of ROOT is one book. Writes:
    OUT/html/<book>/<chapter>.html   rewritten chapters
    OUT/json/format.json             formatted text records
    OUT/json/css_styles.json         selector styles per book

EXAMPLES:
    stylefold static/epub -o static
    RUST_LOG=stylefold=debug stylefold books -o out --jobs 4")]
struct Cli {
    /// Directory containing one sub-directory per book
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Output directory
    #[arg(short, long, value_name = "OUT")]
    output: PathBuf,

    /// Worker threads for chapter processing (default: one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> stylefold::Result<()> {
    let book_dirs = find_book_directories(&cli.root)?;
    if book_dirs.is_empty() {
        warn!(root = %cli.root.display(), "no book directories found");
        return Ok(());
    }

    let options = Options { jobs: cli.jobs };
    let mut records: Vec<FormattedEntry> = Vec::new();
    let mut summaries: BTreeMap<u32, CssSummary> = BTreeMap::new();

    for (index, dir) in book_dirs.iter().enumerate() {
        let book = match load_book_dir(dir, index as u32 + 1) {
            Ok(book) => book,
            Err(e) => {
                error!(dir = %dir.display(), "skipping book: {e}");
                continue;
            }
        };
        debug!(dir = %dir.display(), book = book.number, "loaded book directory");

        let output = process_book(&book, &options);
        write_chapters(&cli.output, &output)?;
        log_book(&output);

        records.extend(output.entries().cloned());
        summaries.insert(output.number, output.summary);
    }

    let json_dir = cli.output.join("json");
    fs::create_dir_all(&json_dir)?;
    fs::write(json_dir.join("format.json"), serde_json::to_string_pretty(&records)?)?;
    fs::write(
        json_dir.join("css_styles.json"),
        serde_json::to_string_pretty(&summaries)?,
    )?;

    info!(
        books = summaries.len(),
        records = records.len(),
        output = %cli.output.display(),
        "done"
    );
    Ok(())
}

/// Immediate sub-directories of `root`, sorted by name.
fn find_book_directories(root: &Path) -> stylefold::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }
    Ok(dirs)
}

fn write_chapters(out: &Path, output: &BookOutput) -> stylefold::Result<()> {
    let dir = out.join("html").join(output.number.to_string());
    fs::create_dir_all(&dir)?;
    for chapter in &output.chapters {
        fs::write(dir.join(format!("{:04}.html", chapter.chapter)), &chapter.html)?;
    }
    Ok(())
}

fn log_book(output: &BookOutput) {
    let selectors_skipped: usize = output
        .chapters
        .iter()
        .map(|c| c.diagnostics.selectors_skipped())
        .sum();
    info!(
        book = output.number,
        chapters = output.chapters.len(),
        failed = output.failures.len(),
        entries = output.entries().count(),
        selectors = output.summary.selectors.len(),
        groups = output.summary.groups.len(),
        sources_skipped = output.diagnostics.sources_skipped(),
        selectors_skipped,
        "book finished"
    );
}
