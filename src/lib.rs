// treeplay library - terminal music browser and player
// The tree and its scroll window live with the UI; playback runs on its own executor

pub mod catalog; // library tree, scanning, JSON persistence
pub mod config; // settings and preferences
pub mod history; // what got played, in SQLite
pub mod logging; // file logging + stderr redirect
pub mod playback; // queue, transport, audio backend
pub mod ui; // terminal interface
pub mod view; // scroll window over the tree

// Export the stuff the binary actually uses
pub use catalog::{Node, TrackRecord, TrackTree};
pub use config::Config;
pub use playback::{PlaybackEngine, PlayerUpdate};
pub use view::ViewPort;
