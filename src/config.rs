//! Configuration file handling
//!
//! The configuration is a TOML file describing the media directories to
//! organize, the on-disk cache and the default log level. Naming patterns and
//! regular expressions are compiled while loading, so a broken configuration
//! is reported before any file is touched.

use crate::model::Mode;
use crate::pattern::{Pattern, PatternSyntaxError};
use directories::ProjectDirs;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default naming pattern for TV show directories
pub const DEFAULT_TV_PATTERN: &str = "%n/Season %s/%s %e - %t.%x";

/// Default naming pattern for film directories
pub const DEFAULT_FILM_PATTERN: &str = "%t{ (%y)}{ Part %p}.%x";

const DEFAULT_EXTENSIONS: &[&str] = &[
    "avi", "mkv", "mp4", "m4v", "mpg", "mpeg", "mov", "wmv", "ts",
];

const DEFAULT_STRIP_TOKENS: &[&str] = &[
    r"(?i)\b(?:dvdrip|dvd-rip|bdrip|brrip|bluray|web-?dl|webrip|hdtv|pdtv|dvdscr)\b",
    r"(?i)\b(?:xvid|divx|x264|x265|h\.?264|hevc|aac|ac3)\b",
    r"(?i)\b(?:480p|576p|720p|1080p|2160p)\b",
    r"\[[^\]]*\]",
];

/// Errors that can occur while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to determine configuration directory location
    #[error("Failed to determine configuration directory location")]
    ConfigDirectoryNotFound,

    /// Failed to read the configuration file
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has invalid values
    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A naming pattern failed to compile
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: PatternSyntaxError,
    },

    /// A strip token or ignore pattern is not a valid regular expression
    #[error("Invalid regular expression '{regex}': {source}")]
    InvalidRegex { regex: String, source: regex::Error },

    /// A media directory lists no sources
    #[error("Media directory {0} has no sources configured")]
    NoSources(PathBuf),

    /// No media directory is configured for a path
    #[error("No media directory configured for {0}")]
    UnknownMediaDirectory(PathBuf),
}

/// Returns the platform directories of this application
pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "media-sleuth", "media-sleuth")
}

/// The complete configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,

    pub cache: CacheConfig,

    pub media_dirs: Vec<MediaDirectory>,

    /// File this configuration was read from, `None` for built-in defaults
    #[serde(skip)]
    pub file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache: CacheConfig::default(),
            media_dirs: Vec::new(),
            file: None,
        }
    }
}

/// Settings of the durable cache tier
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Cache location, the system cache directory if unset
    pub dir: Option<PathBuf>,

    /// Age after which cached records are fetched again, never if unset
    pub ttl_hours: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            ttl_hours: Some(24 * 7),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_hours.map(|hours| Duration::from_secs(hours * 60 * 60))
    }
}

/// A directory of media files sharing one naming pattern
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawMediaDirectory")]
pub struct MediaDirectory {
    pub root: PathBuf,
    pub mode: Mode,
    pub pattern: Pattern,
    /// Ids of the sources to search, in order
    pub sources: Vec<String>,
    /// Lowercase file extensions without the leading dot
    pub extensions: Vec<String>,
    /// Junk removed from search terms
    pub strip_tokens: Vec<Regex>,
    /// Files whose path matches one of these are left alone
    pub ignore_patterns: Vec<Regex>,
    /// Remove directories emptied by renaming
    pub prune_empty_dirs: bool,
}

impl MediaDirectory {
    /// Creates a media directory with default settings for the mode
    pub fn new(root: impl Into<PathBuf>, mode: Mode) -> Result<Self, ConfigError> {
        RawMediaDirectory {
            root: root.into(),
            mode,
            pattern: None,
            sources: default_sources(),
            extensions: None,
            strip_tokens: None,
            ignore_patterns: Vec::new(),
            prune_empty_dirs: false,
        }
        .try_into()
    }

    /// Replaces the naming pattern
    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Returns true if the file has one of the configured extensions
    pub fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
    }

    /// Returns true if the path matches one of the ignore patterns
    pub fn is_ignored(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.ignore_patterns.iter().any(|regex| regex.is_match(&path))
    }
}

/// A media directory as written in the configuration file
#[derive(Debug, Deserialize)]
struct RawMediaDirectory {
    root: PathBuf,
    mode: Mode,
    pattern: Option<String>,
    #[serde(default = "default_sources")]
    sources: Vec<String>,
    extensions: Option<Vec<String>>,
    strip_tokens: Option<Vec<String>>,
    #[serde(default)]
    ignore_patterns: Vec<String>,
    #[serde(default)]
    prune_empty_dirs: bool,
}

fn default_sources() -> Vec<String> {
    vec![crate::metadata_retrieval::TvMazeSource::ID.to_string()]
}

fn compile_regexes(expressions: &[String]) -> Result<Vec<Regex>, ConfigError> {
    expressions
        .iter()
        .map(|expression| {
            Regex::new(expression).map_err(|source| ConfigError::InvalidRegex {
                regex: expression.clone(),
                source,
            })
        })
        .collect()
}

impl TryFrom<RawMediaDirectory> for MediaDirectory {
    type Error = ConfigError;

    fn try_from(raw: RawMediaDirectory) -> Result<Self, Self::Error> {
        let pattern = raw.pattern.unwrap_or_else(|| {
            match raw.mode {
                Mode::TvShow => DEFAULT_TV_PATTERN,
                Mode::Film => DEFAULT_FILM_PATTERN,
            }
            .to_string()
        });
        let compiled =
            Pattern::compile(&pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;

        if raw.sources.is_empty() {
            return Err(ConfigError::NoSources(raw.root));
        }

        let extensions = raw
            .extensions
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect())
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();

        let strip_tokens = raw
            .strip_tokens
            .unwrap_or_else(|| DEFAULT_STRIP_TOKENS.iter().map(|t| t.to_string()).collect());

        Ok(Self {
            root: raw.root,
            mode: raw.mode,
            pattern: compiled,
            sources: raw.sources,
            extensions,
            strip_tokens: compile_regexes(&strip_tokens)?,
            ignore_patterns: compile_regexes(&raw.ignore_patterns)?,
            prune_empty_dirs: raw.prune_empty_dirs,
        })
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let proj_dirs = project_dirs().ok_or(ConfigError::ConfigDirectoryNotFound)?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Loads the configuration
    ///
    /// An explicitly given file must exist. Without one, the default location
    /// is tried and defaults are used if no file is there. The file that was
    /// read is kept in [`Config::file`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let path = Self::default_path()?;
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFailed {
            path: path.clone(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseFailed {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            file: Some(path),
            ..config
        })
    }

    /// Finds the media directory containing `path`
    ///
    /// The most specific root wins when roots are nested.
    pub fn media_dir_for(&self, path: &Path) -> Result<&MediaDirectory, ConfigError> {
        let canonical = |p: &Path| fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
        let path = canonical(path);

        self.media_dirs
            .iter()
            .filter(|dir| path.starts_with(canonical(&dir.root)))
            .max_by_key(|dir| dir.root.components().count())
            .ok_or(ConfigError::UnknownMediaDirectory(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        log_level = "debug"

        [cache]
        enabled = false
        ttl_hours = 12

        [[media_dirs]]
        root = "/media/tv"
        mode = "tv_show"
        strip_tokens = ["(?i)proper"]

        [[media_dirs]]
        root = "/media/films"
        mode = "film"
        pattern = "%t (%y).%x"
        extensions = [".AVI", "mkv"]
        prune_empty_dirs = true
    "#;

    #[test]
    fn test_config_deserialization() {
        let config: Config = toml::from_str(CONFIG).unwrap();
        assert_eq!(config.log_level, "debug");
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(12 * 3600)));

        let tv = &config.media_dirs[0];
        assert_eq!(tv.mode, Mode::TvShow);
        assert_eq!(tv.pattern.as_str(), DEFAULT_TV_PATTERN);
        assert_eq!(tv.sources, vec!["tvmaze".to_string()]);
        assert_eq!(tv.strip_tokens.len(), 1);
        assert!(!tv.prune_empty_dirs);

        let films = &config.media_dirs[1];
        assert_eq!(films.pattern.as_str(), "%t (%y).%x");
        assert_eq!(films.extensions, vec!["avi".to_string(), "mkv".to_string()]);
        assert!(films.prune_empty_dirs);
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.log_level, "warn");
        assert!(config.cache.enabled);
        assert!(config.media_dirs.is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let toml_str = r#"
            [[media_dirs]]
            root = "/media/tv"
            mode = "tv_show"
            pattern = "%n/{Season %s"
        "#;
        let error = toml::from_str::<Config>(toml_str).unwrap_err();
        assert!(error.to_string().contains("Invalid pattern"));
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let toml_str = r#"
            [[media_dirs]]
            root = "/media/tv"
            mode = "tv_show"
            strip_tokens = ["(unclosed"]
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_media_dir_lookup() {
        let config: Config = toml::from_str(CONFIG).unwrap();
        let dir = config
            .media_dir_for(Path::new("/media/films/Heat.avi"))
            .unwrap();
        assert_eq!(dir.mode, Mode::Film);
        assert!(matches!(
            config.media_dir_for(Path::new("/elsewhere")),
            Err(ConfigError::UnknownMediaDirectory(_))
        ));
    }

    #[test]
    fn test_extension_and_ignore_checks() {
        let mut dir = MediaDirectory::new("/media/tv", Mode::TvShow).unwrap();
        assert!(dir.accepts_extension(Path::new("a/b.MKV")));
        assert!(!dir.accepts_extension(Path::new("a/b.nfo")));
        assert!(!dir.accepts_extension(Path::new("a/b")));

        dir.ignore_patterns = vec![Regex::new(r"(?i)sample").unwrap()];
        assert!(dir.is_ignored(Path::new("/media/tv/Show/Sample/a.avi")));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(ConfigError::ReadFailed { .. })));
    }

    #[test]
    fn test_load_remembers_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, CONFIG).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.file.as_deref(), Some(path.as_path()));
        assert_eq!(config.media_dirs.len(), 2);
        assert_eq!(Config::default().file, None);
    }
}
