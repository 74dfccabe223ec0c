// Catalog - the music library as a tree, plus the ways it gets built and stored
// The scanner produces it, the codec persists it, the UI owns it exclusively.

pub mod codec;
pub mod scanner;
pub mod tree;

pub use codec::{load_catalog, save_catalog, CatalogError};
pub use scanner::{CatalogScanner, ScanProgress, ScanReport};
pub use tree::Node;

use std::path::PathBuf;

/// Immutable copy of a track, taken out of the tree at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRecord {
    pub name: String,
    pub path: PathBuf,
    pub fingerprint: Option<String>,
}

/// Owner of the catalog root. Only the UI domain holds one.
#[derive(Debug, Clone)]
pub struct TrackTree {
    root: Node,
}

impl TrackTree {
    pub fn new(root: Node) -> Self {
        Self { root }
    }

    pub fn count_visible(&self) -> usize {
        self.root.count_visible()
    }

    pub fn label_at(&self, position: usize) -> Option<String> {
        self.root.label_at(position)
    }

    pub fn labels_in_range(&self, min: usize, max: usize) -> Vec<String> {
        self.root.labels_in_range(min, max)
    }

    /// Flips the folder at `position`. Tracks have nothing to fold, so they are left alone.
    pub fn toggle_at(&mut self, position: usize) -> bool {
        match self.root.get_mut(position) {
            Some(node) if !node.is_leaf() => {
                node.toggle_active();
                true
            }
            _ => false,
        }
    }

    /// Expands everything under `position` and copies out the tracks to enqueue.
    pub fn activate_all_at(&mut self, position: usize) -> Vec<TrackRecord> {
        match self.root.get_mut(position) {
            Some(node) => node
                .activate_all_descendants()
                .into_iter()
                .filter_map(Node::track_record)
                .collect(),
            None => Vec::new(),
        }
    }
}
