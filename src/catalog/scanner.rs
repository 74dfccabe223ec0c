// Library scanner - walks the music directory and folds tagged files into artist/album/track
// Anything without the tags we need is counted and left out, never guessed at.

use super::{CatalogError, Node};
use crate::history::PersistentStore;
use id3::TagLike;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};
use xxhash_rust::xxh64::xxh64;

pub const ROOT_NAME: &str = "All Music";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub loaded: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct ScanReport {
    pub root: Node,
    pub loaded: usize,
    pub skipped: usize,
}

/// The tags a file needs before it can appear in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackTags {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub track_number: u32,
    pub disc_number: Option<u32>,
}

impl TrackTags {
    /// Stable id derived from the tags alone, so moving a file keeps its history.
    pub fn fingerprint(&self) -> String {
        let normalized = format!(
            "{}|{}|{}|{}",
            self.artist.trim().to_lowercase(),
            self.album.trim().to_lowercase(),
            self.title.trim().to_lowercase(),
            self.track_number
        );
        format!("{:016x}", xxh64(normalized.as_bytes(), 0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagFormat {
    Id3,
    Mp4,
}

#[derive(Clone)]
pub struct CatalogScanner {
    supported_extensions: Vec<(&'static str, TagFormat)>,
}

impl Default for CatalogScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map_or(false, |name| name.starts_with('.'))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl CatalogScanner {
    pub fn new() -> Self {
        Self {
            supported_extensions: vec![
                ("mp3", TagFormat::Id3),
                ("m4a", TagFormat::Mp4),
                ("mp4", TagFormat::Mp4),
            ],
        }
    }

    fn tag_format(&self, path: &Path) -> Option<TagFormat> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        self.supported_extensions
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, format)| *format)
    }

    /// Builds the catalog under `music_dir`, registering every loaded file with `store`.
    pub fn scan<F>(
        &self,
        music_dir: &Path,
        store: &mut dyn PersistentStore,
        mut on_progress: F,
    ) -> Result<ScanReport, CatalogError>
    where
        F: FnMut(ScanProgress),
    {
        if !music_dir.is_dir() {
            return Err(CatalogError::MissingRoot(music_dir.to_path_buf()));
        }
        info!("Scanning {}", music_dir.display());

        let mut root = Node::folder(ROOT_NAME);
        let mut progress = ScanProgress::default();

        let walker = WalkDir::new(music_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            // The root itself may well live somewhere dotted (temp dirs do)
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Unreadable entry: {}", e);
                    progress.skipped += 1;
                    on_progress(progress);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(format) = self.tag_format(path) else {
                continue;
            };

            let Some(tags) = read_tags(path, format) else {
                debug!("Missing required tags, skipping {}", path.display());
                progress.skipped += 1;
                on_progress(progress);
                continue;
            };

            let fingerprint = tags.fingerprint();
            store.record_file(&fingerprint, &tags.artist, &tags.album, &tags.title)?;

            root.folder_entry(&tags.artist)
                .folder_entry(&tags.album)
                .add(Node::track(
                    tags.title,
                    path,
                    tags.track_number,
                    tags.disc_number,
                    Some(fingerprint),
                ));

            progress.loaded += 1;
            on_progress(progress);
        }

        root.sort_all();
        root.toggle_active();

        info!(
            loaded = progress.loaded,
            skipped = progress.skipped,
            "Scan finished"
        );
        Ok(ScanReport {
            root,
            loaded: progress.loaded,
            skipped: progress.skipped,
        })
    }
}

fn read_tags(path: &Path, format: TagFormat) -> Option<TrackTags> {
    match format {
        TagFormat::Id3 => {
            let tag = id3::Tag::read_from_path(path).ok()?;
            Some(TrackTags {
                artist: non_empty(tag.album_artist()).or_else(|| non_empty(tag.artist()))?,
                album: non_empty(tag.album())?,
                title: non_empty(tag.title())?,
                track_number: tag.track()?,
                disc_number: tag.disc(),
            })
        }
        TagFormat::Mp4 => {
            let tag = mp4ameta::Tag::read_from_path(path).ok()?;
            Some(TrackTags {
                artist: non_empty(tag.album_artist()).or_else(|| non_empty(tag.artist()))?,
                album: non_empty(tag.album())?,
                title: non_empty(tag.title())?,
                track_number: tag.track_number().map(u32::from)?,
                disc_number: tag.disc_number().map(u32::from),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryDatabase;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write_mp3(
        path: PathBuf,
        artist: Option<&str>,
        album: &str,
        title: &str,
        track: Option<u32>,
    ) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();

        let mut tag = id3::Tag::new();
        if let Some(artist) = artist {
            tag.set_artist(artist);
        }
        tag.set_album(album);
        tag.set_title(title);
        if let Some(track) = track {
            tag.set_track(track);
        }
        tag.write_to_path(&path, id3::Version::Id3v24).unwrap();
    }

    #[test]
    fn test_scan_builds_sorted_tree() {
        let dir = tempdir().unwrap();
        let music = dir.path();
        write_mp3(music.join("b/02.mp3"), Some("Beta"), "Second", "Two", Some(2));
        write_mp3(music.join("b/01.mp3"), Some("Beta"), "Second", "One", Some(1));
        write_mp3(music.join("a/x.mp3"), Some("alpha"), "First", "Only", Some(1));
        fs::write(music.join("cover.jpg"), b"not audio").unwrap();

        let mut store = HistoryDatabase::in_memory().unwrap();
        let mut updates = Vec::new();
        let report = CatalogScanner::new()
            .scan(music, &mut store, |p| updates.push(p))
            .unwrap();

        assert_eq!(report.loaded, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(updates.last(), Some(&ScanProgress { loaded: 3, skipped: 0 }));
        assert_eq!(store.file_count().unwrap(), 3);

        let root = &report.root;
        assert_eq!(root.name, ROOT_NAME);
        assert!(root.is_active());
        let artists: Vec<_> = root.children().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(artists, vec!["alpha", "Beta"]);

        let album = &root.children()[1].children()[0];
        let titles: Vec<_> = album.children().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two"]);
        assert!(album.children()[0].fingerprint.is_some());
    }

    #[test]
    fn test_untagged_files_are_tallied() {
        let dir = tempdir().unwrap();
        let music = dir.path();
        write_mp3(music.join("good.mp3"), Some("A"), "B", "C", Some(1));
        write_mp3(music.join("no_track.mp3"), Some("A"), "B", "D", None);
        write_mp3(music.join("no_artist.mp3"), None, "B", "E", Some(2));
        fs::write(music.join("garbage.mp3"), b"definitely not an mp3").unwrap();
        write_mp3(music.join(".hidden/secret.mp3"), Some("A"), "B", "F", Some(3));

        let mut store = HistoryDatabase::in_memory().unwrap();
        let report = CatalogScanner::new().scan(music, &mut store, |_| {}).unwrap();

        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped, 3);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let mut store = HistoryDatabase::in_memory().unwrap();
        let result = CatalogScanner::new().scan(&dir.path().join("nope"), &mut store, |_| {});

        assert!(matches!(result, Err(CatalogError::MissingRoot(_))));
    }

    #[test]
    fn test_fingerprint_ignores_case_and_padding() {
        let tags = TrackTags {
            artist: "Artist".into(),
            album: "Album".into(),
            title: "Title".into(),
            track_number: 4,
            disc_number: None,
        };
        let shouted = TrackTags {
            artist: " ARTIST ".into(),
            album: "album".into(),
            title: "TITLE".into(),
            disc_number: Some(2),
            ..tags.clone()
        };

        assert_eq!(tags.fingerprint(), shouted.fingerprint());
        assert_eq!(tags.fingerprint().len(), 16);
        assert_ne!(
            tags.fingerprint(),
            TrackTags { track_number: 5, ..tags.clone() }.fingerprint()
        );
    }
}
