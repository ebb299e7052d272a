//! File resolver module for discovering media files
//!
//! This module scans a media directory recursively and collects the files
//! that should be organized. A file qualifies by its extension or, failing
//! that, by a MIME type sniffed from its content.

use crate::config::MediaDirectory;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during file resolution
#[derive(Debug, Error)]
pub enum FileResolverError {
    /// Path is not a directory
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Failed to read directory
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed { path: PathBuf, source: io::Error },

    /// Failed to read directory entry
    #[error("Failed to read directory entry: {0}")]
    ReadEntryFailed(#[from] io::Error),
}

/// Represents a discovered media file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VideoFile {
    /// Path to the media file
    pub path: PathBuf,
}

/// Scans a media directory recursively for media files
///
/// Files matching one of the directory's ignore patterns are skipped. The
/// result is sorted by path so runs over the same tree plan the same
/// operations.
pub fn scan_for_videos(media_dir: &MediaDirectory) -> Result<Vec<VideoFile>, FileResolverError> {
    let mut video_files = Vec::new();
    scan_directory_recursive(media_dir, &media_dir.root, &mut video_files)?;
    video_files.sort();
    Ok(video_files)
}

fn scan_directory_recursive(
    media_dir: &MediaDirectory,
    dir_path: &Path,
    video_files: &mut Vec<VideoFile>,
) -> Result<(), FileResolverError> {
    if !dir_path.is_dir() {
        return Err(FileResolverError::NotADirectory(dir_path.to_path_buf()));
    }

    for entry in fs::read_dir(dir_path).map_err(|e| FileResolverError::ReadDirectoryFailed {
        path: dir_path.to_path_buf(),
        source: e,
    })? {
        let entry = entry?;
        let path = entry.path();

        if media_dir.is_ignored(&path) {
            debug!(path = %path.display(), "ignoring path");
            continue;
        }

        if path.is_dir() {
            scan_directory_recursive(media_dir, &path, video_files)?;
        } else if path.is_file()
            && (media_dir.accepts_extension(&path) || is_video_file(&path))
        {
            video_files.push(VideoFile { path });
        }
    }

    Ok(())
}

/// Sniffs the first 8KB of a file for a video MIME type
fn is_video_file(file_path: &Path) -> bool {
    const BUFFER_SIZE: usize = 8192;

    let Ok(mut file) = File::open(file_path) else {
        return false;
    };

    let mut buffer = vec![0u8; BUFFER_SIZE];
    let Ok(bytes_read) = file.read(&mut buffer) else {
        return false;
    };
    buffer.truncate(bytes_read);

    infer::is_video(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mode;
    use regex::Regex;
    use tempfile::TempDir;

    fn touch(dir: &Path, relative: &str) -> PathBuf {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn test_scan_nonexistent_directory() {
        let media_dir =
            MediaDirectory::new("/nonexistent/path/that/does/not/exist", Mode::TvShow).unwrap();
        assert!(matches!(
            scan_for_videos(&media_dir),
            Err(FileResolverError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_scan_file_instead_of_directory() {
        let dir = TempDir::new().unwrap();
        let file = touch(dir.path(), "test_file.txt");

        let media_dir = MediaDirectory::new(file, Mode::TvShow).unwrap();
        assert!(scan_for_videos(&media_dir).is_err());
    }

    #[test]
    fn test_scan_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        let episode = touch(dir.path(), "Heroes/Season 1/01 01 - Genesis.AVI");
        let film = touch(dir.path(), "Heat (1995).mkv");
        touch(dir.path(), "Heroes/Season 1/notes.txt");
        touch(dir.path(), "Heroes/folder.jpg");

        let media_dir = MediaDirectory::new(dir.path(), Mode::TvShow).unwrap();
        let found = scan_for_videos(&media_dir).unwrap();

        let mut expected = vec![VideoFile { path: episode }, VideoFile { path: film }];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_scan_skips_ignored_paths() {
        let dir = TempDir::new().unwrap();
        let kept = touch(dir.path(), "Heroes/S01E01.avi");
        touch(dir.path(), "Heroes/Sample/S01E01.sample.avi");

        let mut media_dir = MediaDirectory::new(dir.path(), Mode::TvShow).unwrap();
        media_dir.ignore_patterns = vec![Regex::new(r"(?i)[/\\]sample[/\\]").unwrap()];

        let found = scan_for_videos(&media_dir).unwrap();
        assert_eq!(found, vec![VideoFile { path: kept }]);
    }
}
