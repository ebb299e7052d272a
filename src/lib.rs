//! MediaSleuth - Identify TV and film files and rename them by pattern
//!
//! This library parses media file names with user defined naming patterns
//! (falling back to well known release naming conventions), looks the
//! resulting search terms up in metadata sources through a chain of caches
//! and renders the destination path of every file from the same pattern.

mod cache;
mod config;
mod file_operations;
mod file_resolver;
mod metadata_retrieval;
mod model;
mod normalizer;
mod pattern;
mod resolver;
mod search;
mod store;

use file_resolver::scan_for_videos;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

// Re-export error types
pub use cache::CacheError;
pub use config::ConfigError;
pub use file_operations::FileOperationError;
pub use file_resolver::FileResolverError;
pub use metadata_retrieval::SourceError;
pub use pattern::PatternSyntaxError;
pub use store::StoreError;

pub use config::{
    CacheConfig, Config, DEFAULT_FILM_PATTERN, DEFAULT_TV_PATTERN, MediaDirectory,
};
pub use file_operations::{
    PlannedOperation, execute_copy, execute_rename, plan_operations, prune_empty_dirs,
};
pub use file_resolver::VideoFile;
pub use metadata_retrieval::{Source, TvMazeSource};
pub use model::{
    Episode, Film, IdentifiedFile, Identity, MediaQuery, Mode, SearchResult, Season, Show,
};
pub use normalizer::normalize;
pub use pattern::{
    Heuristic, MatchedBy, MetadataContext, ParsedFileName, Pattern, SearchDetails, Segment,
    TokenKind,
};
pub use resolver::MetadataResolver;
pub use search::{FilmSearcher, SearchOutcome, ShowQuery, ShowSearcher};
pub use store::{JsonFileStore, MemoryStore, Store};

/// Progress event emitted while organizing a media directory
///
/// These events allow library users to track progress and provide feedback
/// during a run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Organizing started
    Started { directory: PathBuf, mode: Mode },

    /// Scanning directory for media files
    ScanningFiles,

    /// Media files found
    FilesFound { count: usize },

    /// Processing a specific media file
    ProcessingFile {
        index: usize,
        total: usize,
        path: PathBuf,
    },

    /// A file was identified and has a destination
    Identified { path: PathBuf, destination: PathBuf },

    /// A file could not be identified
    Skipped { path: PathBuf, reason: String },

    /// Organizing complete
    Complete { resolved: usize, skipped: usize },
}

/// What happened to a single media file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    /// The file was identified; `destination` is where the pattern puts it
    Resolved {
        file: IdentifiedFile,
        destination: PathBuf,
    },
    /// The file was left alone
    Skipped { path: PathBuf, reason: String },
}

impl FileOutcome {
    fn skipped(path: &Path, reason: impl Into<String>) -> Self {
        FileOutcome::Skipped {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Top-level error type for MediaSleuth operations
#[derive(Debug, Error)]
pub enum MediaSleuthError {
    /// Error in the configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error in a naming pattern
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternSyntaxError),

    /// Error during file resolution
    #[error("File resolution error: {0}")]
    FileResolver(#[from] FileResolverError),

    /// Error during metadata retrieval
    #[error("Metadata source error: {0}")]
    Source(#[from] SourceError),

    /// Error in a cache store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error during cache operations
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error while renaming or copying files
    #[error("File operation error: {0}")]
    FileOperation(#[from] FileOperationError),
}

/// Builds a resolver from the configuration
///
/// The in-process store always comes first. The JSON file store follows if
/// the cache is enabled, and TVMaze is the only source.
pub fn build_resolver(config: &Config) -> Result<MetadataResolver, MediaSleuthError> {
    let mut stores: Vec<Box<dyn Store>> = vec![Box::new(MemoryStore::new())];

    if config.cache.enabled {
        let ttl = config.cache.ttl();
        let json_store = match &config.cache.dir {
            Some(dir) => JsonFileStore::open_in(dir, ttl)?,
            None => JsonFileStore::open(ttl)?,
        };
        stores.push(Box::new(json_store));
    }

    let sources: Vec<Box<dyn Source>> = vec![Box::new(TvMazeSource::new())];
    Ok(MetadataResolver::new(stores, sources))
}

/// Identifies every media file in a media directory
///
/// This function scans the media directory recursively, extracts a search
/// term from each file name, resolves the file's identity and metadata and
/// renders its destination with the directory's naming pattern. Files that
/// cannot be identified are reported as skipped and never abort the run.
///
/// Nothing is renamed here; pass the outcomes to [`plan_renames`] and the
/// executors for that.
///
/// # Examples
///
/// ```no_run
/// use media_sleuth::{Config, build_resolver, organize_directory, ProgressEvent};
/// use std::path::Path;
///
/// let config = Config::load(None).unwrap();
/// let media_dir = config.media_dir_for(Path::new("/media/tv")).unwrap();
/// let mut resolver = build_resolver(&config).unwrap();
///
/// let outcomes = organize_directory(&mut resolver, media_dir, false, |event| {
///     if let ProgressEvent::Skipped { path, reason } = event {
///         println!("{}: {}", path.display(), reason);
///     }
/// })
/// .unwrap();
/// ```
pub fn organize_directory<F>(
    resolver: &mut MetadataResolver,
    media_dir: &MediaDirectory,
    refresh: bool,
    mut progress_callback: F,
) -> Result<Vec<FileOutcome>, MediaSleuthError>
where
    F: FnMut(ProgressEvent),
{
    progress_callback(ProgressEvent::Started {
        directory: media_dir.root.clone(),
        mode: media_dir.mode,
    });

    for source_id in &media_dir.sources {
        if !resolver.source_ids().any(|id| id == source_id.as_str()) {
            warn!(source = %source_id, "media directory names an unknown source");
        }
    }

    progress_callback(ProgressEvent::ScanningFiles);
    let files = scan_for_videos(media_dir)?;
    progress_callback(ProgressEvent::FilesFound { count: files.len() });

    let mut outcomes = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        progress_callback(ProgressEvent::ProcessingFile {
            index,
            total: files.len(),
            path: file.path.clone(),
        });

        let outcome = identify_file(resolver, media_dir, &file.path, refresh).unwrap_or_else(|e| {
            warn!(file = %file.path.display(), error = %e, "metadata lookup failed");
            FileOutcome::skipped(&file.path, e.to_string())
        });

        match &outcome {
            FileOutcome::Resolved { file, destination } => {
                progress_callback(ProgressEvent::Identified {
                    path: file.path.clone(),
                    destination: destination.clone(),
                })
            }
            FileOutcome::Skipped { path, reason } => {
                info!(file = %path.display(), %reason, "skipping file");
                progress_callback(ProgressEvent::Skipped {
                    path: path.clone(),
                    reason: reason.clone(),
                })
            }
        }
        outcomes.push(outcome);
    }

    let resolved = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, FileOutcome::Resolved { .. }))
        .count();
    progress_callback(ProgressEvent::Complete {
        resolved,
        skipped: outcomes.len() - resolved,
    });

    Ok(outcomes)
}

/// Plans the renames (or copies, with `output_dir`) for resolved files
pub fn plan_renames(
    outcomes: &[FileOutcome],
    media_dir: &MediaDirectory,
    output_dir: Option<&Path>,
) -> Result<Vec<PlannedOperation>, MediaSleuthError> {
    let targets: Vec<(PathBuf, PathBuf)> = outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            FileOutcome::Resolved { file, destination } => {
                Some((file.path.clone(), destination.clone()))
            }
            FileOutcome::Skipped { .. } => None,
        })
        .collect();

    Ok(plan_operations(&targets, &media_dir.root, output_dir)?)
}

fn identify_file(
    resolver: &mut MetadataResolver,
    media_dir: &MediaDirectory,
    path: &Path,
    refresh: bool,
) -> Result<FileOutcome, SourceError> {
    match media_dir.mode {
        Mode::TvShow => identify_episode(resolver, media_dir, path, refresh),
        Mode::Film => identify_film(resolver, media_dir, path, refresh),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_string())
}

fn identify_episode(
    resolver: &mut MetadataResolver,
    media_dir: &MediaDirectory,
    path: &Path,
    refresh: bool,
) -> Result<FileOutcome, SourceError> {
    let outcome = ShowSearcher::new(media_dir).search(path, |query| {
        let media_query = MediaQuery::new(&query.term, Mode::TvShow).with_year(query.year.clone());
        resolver.search_media(&media_query, &media_dir.sources, refresh)
    })?;

    let (result, parsed) = match outcome {
        SearchOutcome::Found(result, parsed) => (result, parsed),
        SearchOutcome::NotFound(_) => {
            return Ok(FileOutcome::skipped(path, "no matching show found"));
        }
        SearchOutcome::Unparsed => {
            return Ok(FileOutcome::skipped(path, "no season and episode in file name"));
        }
    };

    let Some(show) = resolver.get_show(&result.source_id, &result.id, refresh)? else {
        return Ok(FileOutcome::skipped(
            path,
            format!("show {} not available from {}", result.id, result.source_id),
        ));
    };

    let mut episodes: Vec<Episode> = Vec::new();
    for &number in &parsed.episodes {
        let episode =
            resolver.get_episode(&result.source_id, &show.show_id, parsed.season, number, refresh)?;
        match episode {
            Some(episode) => {
                if !episodes.contains(&episode) {
                    episodes.push(episode);
                }
            }
            None => {
                return Ok(FileOutcome::skipped(
                    path,
                    format!(
                        "{} has no episode {} in season {}",
                        show.name, number, parsed.season
                    ),
                ));
            }
        }
    }

    let title = episodes
        .iter()
        .map(|episode| episode.title.as_str())
        .collect::<Vec<_>>()
        .join(" & ");
    debug!(file = %path.display(), show = %show.name, %title, "episode identified");

    let context = MetadataContext::default()
        .with_show_name(&show.name)
        .with_season(parsed.season)
        .with_episodes(parsed.episodes.clone())
        .with_title(title)
        .with_year(show.year())
        .with_id(&show.show_id);
    let context = match extension_of(path) {
        Some(ext) => context.with_extension(ext),
        None => context,
    };
    let destination = media_dir.pattern.destination(&media_dir.root, &context);

    // A multi-episode file is identified by its first episode, widened to
    // every number the file name covers
    let Some(mut episode) = episodes.into_iter().next() else {
        return Ok(FileOutcome::skipped(path, "no episode numbers in file name"));
    };
    for number in &parsed.episodes {
        if !episode.covers(*number) {
            episode.episode_numbers.push(*number);
        }
    }

    Ok(FileOutcome::Resolved {
        file: IdentifiedFile {
            path: path.to_path_buf(),
            identity: Identity::Episode { show, episode },
            part: None,
        },
        destination,
    })
}

fn identify_film(
    resolver: &mut MetadataResolver,
    media_dir: &MediaDirectory,
    path: &Path,
    refresh: bool,
) -> Result<FileOutcome, SourceError> {
    let outcome = FilmSearcher::new(media_dir).search(path, |details| {
        let media_query = MediaQuery::new(&details.term, Mode::Film)
            .with_year(details.year.clone())
            .with_part(details.part);
        resolver.search_media(&media_query, &media_dir.sources, refresh)
    })?;

    let (result, details) = match outcome {
        SearchOutcome::Found(result, details) => (result, details),
        SearchOutcome::NotFound(_) => {
            return Ok(FileOutcome::skipped(path, "no matching film found"));
        }
        SearchOutcome::Unparsed => {
            return Ok(FileOutcome::skipped(path, "no title in file name"));
        }
    };

    let Some(film) = resolver.get_film(&result.source_id, &result.id, refresh)? else {
        return Ok(FileOutcome::skipped(
            path,
            format!("film {} not available from {}", result.id, result.source_id),
        ));
    };

    let part = details.part.or(result.part);
    let context = MetadataContext::default()
        .with_title(&film.title)
        .with_year(film.year)
        .with_part(part)
        .with_id(&film.film_id);
    let context = match extension_of(path) {
        Some(ext) => context.with_extension(ext),
        None => context,
    };
    let destination = media_dir.pattern.destination(&media_dir.root, &context);

    Ok(FileOutcome::Resolved {
        file: IdentifiedFile {
            path: path.to_path_buf(),
            identity: Identity::Film(film),
            part,
        },
        destination,
    })
}
