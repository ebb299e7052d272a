use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use dialoguer::Confirm;
use media_sleuth::{
    Config, FileOutcome, MediaDirectory, MediaSleuthError, Mode, Pattern, PlannedOperation,
    ProgressEvent, build_resolver, execute_copy, execute_rename, organize_directory,
    plan_renames, prune_empty_dirs,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// MediaSleuth - Identify TV and film files and rename them by pattern
#[derive(Parser)]
#[command(name = "media-sleuth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the files of a media directory and rename them
    Rename {
        /// Media directory to organize
        directory: PathBuf,

        /// Media type, for directories not listed in the configuration
        #[arg(long, value_enum)]
        mode: Option<CliMode>,

        /// Bypass the on-disk cache and fetch metadata again
        #[arg(long)]
        refresh: bool,

        /// Only show what would be done
        #[arg(long)]
        dry_run: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Copy files into this directory instead of renaming them in place
        #[arg(long)]
        copy_to: Option<PathBuf>,
    },

    /// Show how a file name is parsed by a naming pattern
    Parse {
        /// Naming pattern, e.g. "%n/Season %s/%s %e - %t.%x"
        pattern: String,

        /// File path relative to the media directory
        file: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    Tv,
    Film,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Tv => Mode::TvShow,
            CliMode::Film => Mode::Film,
        }
    }
}

/// Installs the log subscriber; `RUST_LOG` wins over the configured level
fn init_logging(log_level: &str, verbose: u8) {
    let level = match verbose {
        0 => log_level,
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Started { directory, mode } => {
            let kind = match mode {
                Mode::TvShow => "TV show",
                Mode::Film => "film",
            };
            println!(
                "MediaSleuth reporting: Organizing {} directory {}...",
                kind,
                directory.display()
            );
        }
        ProgressEvent::ScanningFiles => {
            println!("\nScanning for media files...");
        }
        ProgressEvent::FilesFound { count } => {
            if count == 0 {
                println!("No media files found.");
            } else {
                println!("Found {} media file(s)\n", count);
            }
        }
        ProgressEvent::ProcessingFile { index, total, path } => {
            println!("[{}/{}] Identifying: {}", index + 1, total, path.display());
        }
        ProgressEvent::Identified { destination, .. } => {
            println!("  -> {}", destination.display());
        }
        ProgressEvent::Skipped { reason, .. } => {
            println!("  Skipped: {}", reason);
        }
        ProgressEvent::Complete { resolved, skipped } => {
            println!(
                "\nIdentification complete! Resolved {} file(s), skipped {}.",
                resolved, skipped
            );
        }
    }
}

fn print_plan(operations: &[PlannedOperation], root: &Path) {
    println!("\n=== Planned Operations ===\n");
    for op in operations {
        let source = op.source.strip_prefix(root).unwrap_or(&op.source);
        println!("  {}", source.display());
        match op.duplicate_suffix {
            Some(suffix) => println!("    -> {} (duplicate #{})", op.destination.display(), suffix),
            None => println!("    -> {}", op.destination.display()),
        }
    }
    println!();
}

fn media_directory(
    config: &Config,
    directory: &Path,
    mode: Option<CliMode>,
) -> Result<MediaDirectory, MediaSleuthError> {
    match config.media_dir_for(directory) {
        Ok(media_dir) => Ok(media_dir.clone()),
        Err(e) => match mode {
            Some(mode) => Ok(MediaDirectory::new(directory, mode.into())?),
            None => Err(e.into()),
        },
    }
}

fn rename(
    config: &Config,
    directory: &Path,
    mode: Option<CliMode>,
    refresh: bool,
    dry_run: bool,
    yes: bool,
    copy_to: Option<&Path>,
) -> Result<(), MediaSleuthError> {
    let media_dir = media_directory(config, directory, mode)?;
    let mut resolver = build_resolver(config)?;

    let outcomes = organize_directory(&mut resolver, &media_dir, refresh, handle_progress_event)?;
    let operations = plan_renames(&outcomes, &media_dir, copy_to)?;

    if operations.is_empty() {
        let resolved = outcomes
            .iter()
            .any(|outcome| matches!(outcome, FileOutcome::Resolved { .. }));
        if resolved {
            println!("\nAll identified files are already named correctly.");
        } else {
            println!("\nNothing to do.");
        }
        return Ok(());
    }

    print_plan(&operations, &media_dir.root);

    if dry_run {
        println!("Dry run, no files were changed.");
        return Ok(());
    }

    if !yes {
        let verb = if copy_to.is_some() { "Copy" } else { "Rename" };
        let confirmed = Confirm::new()
            .with_prompt(format!("{} {} file(s)?", verb, operations.len()))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let errors = match copy_to {
        Some(output_dir) => execute_copy(&operations, output_dir)?,
        None => {
            let errors = execute_rename(&operations);
            if media_dir.prune_empty_dirs {
                let removed = prune_empty_dirs(&operations, &media_dir.root);
                if !removed.is_empty() {
                    println!("Removed {} empty folder(s).", removed.len());
                }
            }
            errors
        }
    };

    for error in &errors {
        eprintln!("Error: {}", error);
    }
    println!(
        "Successfully processed {} of {} file(s)!",
        operations.len() - errors.len(),
        operations.len()
    );

    Ok(())
}

fn parse(pattern: &str, file: &str) -> Result<(), MediaSleuthError> {
    let pattern = Pattern::compile(pattern)?;

    if pattern.is_tv() {
        match pattern.parse_episode(file) {
            Some(parsed) => {
                println!("Season:     {}", parsed.season);
                println!(
                    "Episodes:   {}",
                    parsed
                        .episodes
                        .iter()
                        .map(|e| e.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                println!("Matched by: {:?}", parsed.matched_by);
                println!("Term:       {}", parsed.term.as_deref().unwrap_or("-"));
            }
            None => println!("No season or episode found."),
        }
    } else {
        match pattern.parse_film(file) {
            Some(details) => {
                println!("Title: {}", details.term);
                println!("Year:  {}", details.year.as_deref().unwrap_or("-"));
                println!(
                    "Part:  {}",
                    details.part.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
                );
            }
            None => println!("File name does not match the pattern."),
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    init_logging(&config.log_level, cli.verbose);

    match &config.file {
        Some(path) => info!(path = %path.display(), "loaded config"),
        None => info!("no config file found, using defaults"),
    }

    let result = match &cli.command {
        Commands::Rename {
            directory,
            mode,
            refresh,
            dry_run,
            yes,
            copy_to,
        } => {
            if !directory.is_dir() {
                eprintln!("Error: Path is not a directory: {}", directory.display());
                process::exit(1);
            }
            rename(
                &config,
                directory,
                *mode,
                *refresh,
                *dry_run,
                *yes,
                copy_to.as_deref(),
            )
        }
        Commands::Parse { pattern, file } => parse(pattern, file),
    };

    if let Err(e) = result {
        eprintln!("\nError: {}", e);
        process::exit(1);
    }
}
