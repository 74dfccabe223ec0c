// Catalog persistence - the scanned tree as pretty JSON on disk
// Loading is strict: a broken catalog is a startup failure, not something to limp along with.

use super::Node;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog root {0} is not a directory")]
    MissingRoot(PathBuf),
    #[error("failed to access catalog at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog node '{name}': {reason}")]
    Invalid { name: String, reason: &'static str },
    #[error(transparent)]
    Store(#[from] crate::history::StoreError),
}

pub fn save_catalog(path: &Path, root: &Node) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CatalogError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let content = serde_json::to_string_pretty(root)?;
    fs::write(path, content).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Saved catalog to {}", path.display());
    Ok(())
}

/// Reads a catalog and activates its root so the artists are showing.
pub fn load_catalog(path: &Path) -> Result<Node, CatalogError> {
    let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut root = parse_catalog(&content)?;
    root.toggle_active();

    debug!(nodes = root.count_visible(), "Loaded catalog from {}", path.display());
    Ok(root)
}

pub fn parse_catalog(content: &str) -> Result<Node, CatalogError> {
    let root: Node = serde_json::from_str(content)?;
    validate(&root)?;
    Ok(root)
}

// Tracks are exactly the leaves: they carry a path and a track number, folders never carry a path.
// The root alone may be an empty folder (nothing scanned yet).
fn validate(root: &Node) -> Result<(), CatalogError> {
    let mut stack: Vec<&Node> = root.children().iter().collect();
    if root.path.is_some() {
        return Err(invalid(root, "folder carries a path"));
    }

    while let Some(node) = stack.pop() {
        if node.is_leaf() {
            if node.path.is_none() {
                return Err(invalid(node, "track has no path"));
            }
            if node.track_number.is_none() {
                return Err(invalid(node, "track has no track number"));
            }
        } else if node.path.is_some() {
            return Err(invalid(node, "folder carries a path"));
        }
        stack.extend(node.children().iter());
    }

    Ok(())
}

fn invalid(node: &Node, reason: &'static str) -> CatalogError {
    CatalogError::Invalid {
        name: node.name.clone(),
        reason,
    }
}
