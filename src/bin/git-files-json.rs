//! git-files-json CLI
//!
//! Pack git-tracked files into a JSON bundle, and list or extract bundles.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use git_files_json::archive::{DEFAULT_OUTPUT, DEFAULT_REPO_DIR};
use git_files_json::{
    list_directory_files, list_tracked_files, list_tracked_files_or_empty, Decoder, Encoder,
    EncodingConfig, Payload, Progress,
};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "git-files-json")]
#[command(author = "nzinfo <li.monan@gmail.com>")]
#[command(version)]
#[command(about = "Pack git-tracked files into a JSON bundle")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Log filter for diagnostics on stderr (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(flatten)]
    create: CreateArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a bundle from the files tracked in a repository (default)
    Create(CreateArgs),

    /// Extract a bundle into a directory
    #[command(name = "x")]
    Extract {
        /// Bundle file to extract
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Directory to extract to (default: current directory)
        #[arg(short = 'C', long, default_value = ".")]
        directory: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List contents of a bundle
    #[command(name = "t")]
    List {
        /// Bundle file to list
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Repository to pack
    #[arg(short = 'C', long, default_value = DEFAULT_REPO_DIR)]
    directory: PathBuf,

    /// Output bundle file
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Walk the directory instead of asking git for tracked files
    #[arg(long)]
    walk: bool,

    /// Continue with an empty bundle when git fails
    #[arg(long)]
    allow_empty_on_git_failure: bool,

    /// Keep `\r\n` and `\r` line endings in text files
    #[arg(long)]
    no_normalize_newlines: bool,

    /// Only print the header and the summary
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command.unwrap_or(Commands::Create(cli.create)) {
        Commands::Create(args) => {
            create_bundle(args)?;
        }
        Commands::Extract { input, directory, verbose } => {
            extract_bundle(input, directory, verbose)?;
        }
        Commands::List { input, verbose } => {
            list_bundle(input, verbose)?;
        }
    }

    Ok(())
}

fn create_bundle(args: CreateArgs) -> Result<()> {
    let paths = if args.walk {
        let paths = list_directory_files(&args.directory)?;
        exclude_output(&args.directory, paths, &args.output)
    } else if args.allow_empty_on_git_failure {
        list_tracked_files_or_empty(&args.directory)
    } else {
        list_tracked_files(&args.directory)
            .with_context(|| format!("Failed to list tracked files in: {}", args.directory.display()))?
    };

    let encoder = Encoder::with_config(EncodingConfig {
        normalize_newlines: !args.no_normalize_newlines,
        ..EncodingConfig::default()
    });

    let quiet = args.quiet;
    let bundle = encoder.collect(&args.directory, &paths, |event| match event {
        Progress::Started { total } => println!("Processing {} files...", total),
        Progress::Added { index, total, path } if !quiet => {
            println!("[{}/{}] Added: {}", index, total, path)
        }
        Progress::Skipped { index, total, path } if !quiet => {
            println!("[{}/{}] Skipped (not found): {}", index, total, path)
        }
        _ => {}
    });

    encoder.encode_to_file(&bundle, &args.output)?;

    println!("\nCreated JSON file with {} files", bundle.len());
    println!("File saved to: {}", args.output.display());

    Ok(())
}

/// Drop the bundle being written from a walked listing, so repeated runs
/// into the same tree produce the same output.
fn exclude_output(root: &Path, paths: Vec<String>, output: &Path) -> Vec<String> {
    let Some(target) = canonical_output(output) else {
        return paths;
    };

    paths
        .into_iter()
        .filter(|path| match fs::canonicalize(root.join(path)) {
            Ok(resolved) if resolved == target => {
                tracing::debug!(path = %path, "excluding output bundle from walk");
                false
            }
            _ => true,
        })
        .collect()
}

/// Canonical form of the output path, which may not exist yet
fn canonical_output(output: &Path) -> Option<PathBuf> {
    if let Ok(path) = fs::canonicalize(output) {
        return Some(path);
    }

    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Some(fs::canonicalize(parent).ok()?.join(output.file_name()?))
}

fn extract_bundle(input: PathBuf, directory: PathBuf, verbose: bool) -> Result<()> {
    let bundle = Decoder::new().decode_from_file(&input)?;

    if verbose {
        println!("Files: {}", bundle.len());
    }

    for record in &bundle {
        let relative = Path::new(&record.path);
        if relative.components().any(|c| !matches!(c, Component::Normal(_) | Component::CurDir)) {
            bail!("Refusing to extract outside the target directory: {}", record.path);
        }

        let data = match record.payload() {
            Ok(Payload::Text(text)) => text.as_bytes().to_vec(),
            Ok(Payload::Binary(bytes)) => bytes,
            Err(err) => {
                tracing::warn!(path = %record.path, error = %err, "writing undecodable record as text");
                record.content.as_bytes().to_vec()
            }
            Ok(Payload::ReadError(message)) => {
                tracing::warn!(path = %record.path, error = message, "skipping unreadable record");
                if verbose {
                    println!("Skipped unreadable: {}", record.path);
                }
                continue;
            }
        };

        let output_path = directory.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create: {}", parent.display()))?;
        }

        fs::write(&output_path, data)
            .with_context(|| format!("Failed to write: {}", output_path.display()))?;

        if verbose {
            println!("Extracted: {}", record.path);
        }
    }

    Ok(())
}

fn list_bundle(input: PathBuf, verbose: bool) -> Result<()> {
    let bundle = Decoder::new().decode_from_file(&input)?;

    for record in &bundle {
        if verbose {
            let (kind, size) = match record.payload() {
                Ok(Payload::Text(text)) => ("text", text.len()),
                Ok(Payload::Binary(bytes)) => ("binary", bytes.len()),
                Ok(Payload::ReadError(_)) => ("error", 0),
                Err(_) => ("text", record.content.len()),
            };
            println!("{}  {}  {}", record.path, kind, size);
        } else {
            println!("{}", record.path);
        }
    }

    Ok(())
}
