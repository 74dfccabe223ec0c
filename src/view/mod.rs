// ViewPort - the scroll window over the catalog's visible sequence
// Window bounds are 1-based positions into the tree; the cursor is a row inside the window.
// After every public call: 1 <= min <= max <= total, max - min + 1 <= height,
// and 1 <= cursor <= max - min + 1.

use crate::catalog::{TrackRecord, TrackTree};
use std::collections::VecDeque;
use tracing::debug;

/// What the screen needs after a ViewPort operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redraw {
    None,
    /// Only the cursor indicator moved (rows are 1-based window rows).
    Cursor { from: usize, to: usize },
    Full,
}

#[derive(Debug, Clone)]
pub struct ViewPort {
    min: usize,
    max: usize,
    cursor: usize,
    total: usize,
    height: usize,
    lines: VecDeque<String>,
}

impl ViewPort {
    pub fn new(tree: &TrackTree, height: usize) -> Self {
        let height = height.max(1);
        let total = tree.count_visible();
        let mut view = Self {
            min: 1,
            max: total.min(height),
            cursor: 1,
            total,
            height,
            lines: VecDeque::with_capacity(height),
        };
        view.rebuild_lines(tree);
        view
    }

    pub fn window(&self) -> (usize, usize) {
        (self.min, self.max)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn lines(&self) -> &VecDeque<String> {
        &self.lines
    }

    /// Visible-sequence position under the cursor.
    pub fn selected_position(&self) -> usize {
        self.min + self.cursor - 1
    }

    fn window_len(&self) -> usize {
        self.max - self.min + 1
    }

    pub fn rebuild_lines(&mut self, tree: &TrackTree) {
        self.lines.clear();
        self.lines.extend(tree.labels_in_range(self.min, self.max));
    }

    pub fn scroll_up(&mut self, tree: &TrackTree) -> Redraw {
        if self.cursor > 1 {
            self.cursor -= 1;
            return Redraw::Cursor {
                from: self.cursor + 1,
                to: self.cursor,
            };
        }
        if self.min == 1 {
            return Redraw::None;
        }

        self.min -= 1;
        self.max -= 1;
        self.lines.pop_back();
        self.lines
            .push_front(tree.label_at(self.min).unwrap_or_default());
        Redraw::Full
    }

    pub fn scroll_down(&mut self, tree: &TrackTree) -> Redraw {
        if self.selected_position() == self.total {
            return Redraw::None;
        }
        if self.cursor < self.window_len() {
            self.cursor += 1;
            return Redraw::Cursor {
                from: self.cursor - 1,
                to: self.cursor,
            };
        }
        if self.max >= self.total {
            return Redraw::None;
        }

        self.min += 1;
        self.max += 1;
        self.lines.pop_front();
        self.lines
            .push_back(tree.label_at(self.max).unwrap_or_default());
        Redraw::Full
    }

    /// Reflows for a new window height. Growing keeps the node under the cursor
    /// on screen with the bottom edge pinned; shrinking keeps the top edge.
    pub fn resize(&mut self, tree: &TrackTree, new_rows: usize) -> Redraw {
        let new_rows = new_rows.max(1);
        let expanding = new_rows > self.height;

        if expanding && self.min > 1 {
            let point = self.selected_position();
            if self.max + 1 > new_rows {
                self.min = self.max + 1 - new_rows;
            } else {
                // Not enough rows above the bottom edge: top out at 1 and grow downwards
                let leftover = new_rows - self.max;
                self.min = 1;
                self.max = (self.max + leftover).min(self.total);
            }
            self.cursor = point - self.min + 1;
        } else if expanding {
            self.max = self.total.min(new_rows);
        } else {
            let full_range = self.min == 1 && self.max == self.total;
            self.max = if full_range {
                self.total.min(new_rows)
            } else {
                (self.min + new_rows - 1).min(self.total)
            };
            self.cursor = self.cursor.min(new_rows);
        }

        self.height = new_rows;
        self.cursor = self.cursor.clamp(1, self.window_len());
        debug!(
            rows = new_rows,
            min = self.min,
            max = self.max,
            cursor = self.cursor,
            "Resized view"
        );
        self.rebuild_lines(tree);
        Redraw::Full
    }

    /// Expands or collapses the folder under the cursor.
    pub fn toggle_folder(&mut self, tree: &mut TrackTree) -> Redraw {
        let old_total = self.total;
        if !tree.toggle_at(self.selected_position()) {
            return Redraw::None;
        }
        let new_total = tree.count_visible();
        self.reflow(tree, old_total, new_total, true);
        Redraw::Full
    }

    /// Force-expands the subtree under the cursor and hands back its tracks.
    /// Unlike a fold toggle, the cursor keeps its row even if the window moves.
    pub fn enqueue_selection(&mut self, tree: &mut TrackTree) -> Vec<TrackRecord> {
        let old_total = self.total;
        let records = tree.activate_all_at(self.selected_position());
        let new_total = tree.count_visible();
        self.reflow(tree, old_total, new_total, false);
        records
    }

    fn reflow(
        &mut self,
        tree: &TrackTree,
        old_total: usize,
        new_total: usize,
        track_cursor: bool,
    ) {
        if old_total > new_total && self.max > new_total {
            let point = self.selected_position();
            self.min = (new_total + 1).saturating_sub(self.height).max(1);
            self.max = new_total;
            if track_cursor {
                self.cursor = point.saturating_sub(self.min) + 1;
            }
        } else if old_total < new_total && old_total < self.height {
            self.min = 1;
            self.max = new_total.min(self.height);
        }

        self.total = new_total;
        self.cursor = self.cursor.clamp(1, self.window_len());
        self.rebuild_lines(tree);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Node;
    use proptest::prelude::*;

    /// Root plus `tracks` leaves, everything visible.
    fn flat_tree(tracks: usize) -> TrackTree {
        let mut root = Node::folder("All Music");
        for n in 1..=tracks {
            let path = format!("/{n}.mp3");
            root.add(Node::track(format!("Song {n}"), path, n as u32, None, None));
        }
        root.toggle_active();
        TrackTree::new(root)
    }

    /// Root with `folders` albums of `per_folder` tracks each; albums expanded when `open`.
    fn album_tree(folders: usize, per_folder: usize, open: bool) -> TrackTree {
        let mut root = Node::folder("All Music");
        for f in 0..folders {
            let mut album = Node::folder(format!("Album {f}"));
            for t in 1..=per_folder {
                album.add(Node::track(
                    format!("Track {t}"),
                    format!("/{f}/{t}.mp3"),
                    t as u32,
                    None,
                    None,
                ));
            }
            if open {
                album.toggle_active();
            }
            root.add(album);
        }
        root.toggle_active();
        TrackTree::new(root)
    }

    fn placed(tree: &TrackTree, height: usize, min: usize, max: usize, cursor: usize) -> ViewPort {
        let mut view = ViewPort::new(tree, height);
        view.min = min;
        view.max = max;
        view.cursor = cursor;
        view.rebuild_lines(tree);
        view
    }

    fn assert_invariants(view: &ViewPort) {
        assert!(1 <= view.min, "{view:?}");
        assert!(view.min <= view.max, "{view:?}");
        assert!(view.max <= view.total, "{view:?}");
        assert!(view.max - view.min + 1 <= view.height, "{view:?}");
        assert!(1 <= view.cursor && view.cursor <= view.max - view.min + 1, "{view:?}");
        assert_eq!(view.lines.len(), view.max - view.min + 1, "{view:?}");
    }

    #[test]
    fn test_new_window_fits_tree() {
        let tree = flat_tree(3);
        let view = ViewPort::new(&tree, 10);
        assert_eq!(view.window(), (1, 4));
        assert_eq!(view.lines()[0], "▾ All Music");
        assert_invariants(&view);
    }

    #[test]
    fn test_scroll_down_moves_cursor_then_slides() {
        let tree = flat_tree(11);
        let mut view = ViewPort::new(&tree, 5);

        for row in 2..=5 {
            assert_eq!(view.scroll_down(&tree), Redraw::Cursor { from: row - 1, to: row });
        }
        assert_eq!(view.scroll_down(&tree), Redraw::Full);
        assert_eq!(view.window(), (2, 6));
        assert_eq!(view.cursor(), 5);
        assert_eq!(view.lines().back().unwrap(), &tree.label_at(6).unwrap());
        assert_eq!(view.lines().front().unwrap(), &tree.label_at(2).unwrap());
    }

    #[test]
    fn test_scroll_down_stops_at_end() {
        let tree = flat_tree(6);
        let mut view = ViewPort::new(&tree, 5);
        for _ in 0..20 {
            view.scroll_down(&tree);
            assert_invariants(&view);
        }
        assert_eq!(view.window(), (3, 7));
        assert_eq!(view.selected_position(), 7);
        assert_eq!(view.scroll_down(&tree), Redraw::None);
    }

    #[test]
    fn test_scroll_down_in_short_tree_stops_at_last_node() {
        let tree = flat_tree(2);
        let mut view = ViewPort::new(&tree, 10);
        view.scroll_down(&tree);
        view.scroll_down(&tree);
        assert_eq!(view.scroll_down(&tree), Redraw::None);
        assert_eq!(view.cursor(), 3);
    }

    #[test]
    fn test_scroll_up_slides_back() {
        let tree = flat_tree(20);
        let mut view = placed(&tree, 5, 10, 14, 1);

        assert_eq!(view.scroll_up(&tree), Redraw::Full);
        assert_eq!(view.window(), (9, 13));
        assert_eq!(view.lines().front().unwrap(), &tree.label_at(9).unwrap());
        assert_eq!(view.lines().len(), 5);

        let mut view = placed(&tree, 5, 1, 5, 1);
        assert_eq!(view.scroll_up(&tree), Redraw::None);
        view.cursor = 3;
        assert_eq!(view.scroll_up(&tree), Redraw::Cursor { from: 3, to: 2 });
    }

    #[test]
    fn test_resize_grow_keeps_cursor_node() {
        let tree = flat_tree(49);
        let mut view = placed(&tree, 10, 30, 39, 2);

        assert_eq!(view.resize(&tree, 15), Redraw::Full);
        assert_eq!(view.window(), (25, 39));
        assert_eq!(view.cursor(), 7);
        assert_eq!(view.selected_position(), 31);
        assert_invariants(&view);
    }

    #[test]
    fn test_resize_grow_past_top() {
        let tree = flat_tree(49);
        let mut view = placed(&tree, 10, 5, 14, 7);

        view.resize(&tree, 20);
        // Deliberately not (1,21)/10: that window would hold 21 rows and lose the selected node
        assert_eq!(view.window(), (1, 20));
        assert_eq!(view.selected_position(), 11);
        assert_eq!(view.cursor(), 11);
        assert_invariants(&view);
    }

    #[test]
    fn test_resize_grow_from_top_extends_down() {
        let tree = flat_tree(12);
        let mut view = placed(&tree, 5, 1, 5, 4);

        view.resize(&tree, 30);
        assert_eq!(view.window(), (1, 13));
        assert_eq!(view.cursor(), 4);
        assert_invariants(&view);
    }

    #[test]
    fn test_resize_shrink_clamps_cursor() {
        let tree = flat_tree(49);
        let mut view = placed(&tree, 10, 20, 29, 8);

        view.resize(&tree, 5);
        assert_eq!(view.window(), (20, 24));
        assert_eq!(view.cursor(), 5);
        assert_invariants(&view);
    }

    #[test]
    fn test_resize_shrink_full_range() {
        let tree = flat_tree(5);
        let mut view = ViewPort::new(&tree, 10);
        view.cursor = 6;

        view.resize(&tree, 4);
        assert_eq!(view.window(), (1, 4));
        assert_eq!(view.cursor(), 4);
        assert_invariants(&view);
    }

    #[test]
    fn test_collapse_past_window() {
        // Tree already shrunk to 20 visible nodes; the view still thinks 50
        let tree = flat_tree(19);
        let mut view = placed(&tree, 10, 1, 10, 1);
        view.total = 50;
        view.min = 30;
        view.max = 39;
        view.cursor = 4;

        view.reflow(&tree, 50, 20, true);
        assert_eq!(view.window(), (11, 20));
        assert_eq!(view.total(), 20);
        assert_invariants(&view);
    }

    #[test]
    fn test_collapse_keeps_folder_under_cursor() {
        // Albums start at positions 2, 12, 22, 32, 42
        let mut tree = album_tree(5, 9, true);
        assert_eq!(tree.count_visible(), 51);
        let mut view = placed(&tree, 10, 40, 49, 3);
        assert_eq!(view.selected_position(), 42);

        assert_eq!(view.toggle_folder(&mut tree), Redraw::Full);
        assert_eq!(view.total(), 42);
        assert_eq!(view.window(), (33, 42));
        assert_eq!(view.selected_position(), 42);
        assert_eq!(view.lines().back().unwrap(), "  ▸ Album 4");
        assert_invariants(&view);
    }

    #[test]
    fn test_collapse_inside_window_leaves_it() {
        let mut tree = album_tree(5, 9, true);
        let mut view = placed(&tree, 10, 1, 10, 2);

        view.toggle_folder(&mut tree);
        assert_eq!(view.total(), 42);
        assert_eq!(view.window(), (1, 10));
        assert_eq!(view.cursor(), 2);
        assert_eq!(view.lines()[2], "  ▸ Album 1");
    }

    #[test]
    fn test_expand_small_tree_grows_window() {
        let mut tree = album_tree(3, 3, false);
        let mut view = ViewPort::new(&tree, 10);
        assert_eq!(view.window(), (1, 4));

        view.scroll_down(&tree);
        view.toggle_folder(&mut tree);
        assert_eq!(view.window(), (1, 7));

        for _ in 0..4 {
            view.scroll_down(&tree);
        }
        assert_eq!(view.selected_position(), 6);
        view.toggle_folder(&mut tree);
        assert_eq!(view.window(), (1, 10));
        assert_eq!(view.total(), 10);

        // A full page already: the window stays put
        for _ in 0..4 {
            view.scroll_down(&tree);
        }
        view.toggle_folder(&mut tree);
        assert_eq!(view.total(), 13);
        assert_eq!(view.window(), (1, 10));
        assert_invariants(&view);
    }

    #[test]
    fn test_toggle_on_track_does_nothing() {
        let mut tree = flat_tree(3);
        let mut view = ViewPort::new(&tree, 10);
        view.scroll_down(&tree);

        assert_eq!(view.toggle_folder(&mut tree), Redraw::None);
        assert_eq!(view.total(), 4);
    }

    #[test]
    fn test_enqueue_expands_and_returns_tracks() {
        let mut tree = album_tree(2, 3, false);
        let mut view = ViewPort::new(&tree, 10);
        view.scroll_down(&tree);

        let records = view.enqueue_selection(&mut tree);
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Track 1", "Track 2", "Track 3"]);
        assert_eq!(view.total(), 6);
        assert_eq!(view.window(), (1, 6));
        assert_eq!(view.cursor(), 2);
        assert_eq!(view.lines()[1], "  ▾ Album 0");
    }

    #[test]
    fn test_enqueue_keeps_cursor_row() {
        let mut tree = album_tree(4, 5, false);
        let mut view = ViewPort::new(&tree, 3);
        view.scroll_down(&tree);
        view.scroll_down(&tree);
        view.scroll_down(&tree);
        assert_eq!(view.window(), (2, 4));
        assert_eq!(view.cursor(), 3);

        // Old total 5 is already more than a page, so the window does not move
        let records = view.enqueue_selection(&mut tree);
        assert_eq!(records.len(), 5);
        assert_eq!(view.total(), 10);
        assert_eq!(view.window(), (2, 4));
        assert_eq!(view.cursor(), 3);
    }

    #[test]
    fn test_enqueue_track_returns_it() {
        let mut tree = flat_tree(3);
        let mut view = ViewPort::new(&tree, 10);
        view.scroll_down(&tree);
        view.scroll_down(&tree);

        let records = view.enqueue_selection(&mut tree);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Song 2");
        assert_eq!(view.total(), 4);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Up,
        Down,
        Toggle,
        Resize(usize),
        Enqueue,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            1 => Just(Op::Up),
            2 => Just(Op::Down),
            1 => Just(Op::Toggle),
            1 => (1usize..26).prop_map(Op::Resize),
            1 => Just(Op::Enqueue),
        ]
    }

    proptest! {
        #[test]
        fn invariants_hold_under_mixed_operations(
            folders in 1usize..8,
            per_folder in 1usize..9,
            height in 1usize..20,
            ops in proptest::collection::vec(op(), 1..300),
        ) {
            let mut tree = album_tree(folders, per_folder, false);
            let mut view = ViewPort::new(&tree, height);

            for op in ops {
                match op {
                    Op::Up => {
                        view.scroll_up(&tree);
                    }
                    Op::Down => {
                        view.scroll_down(&tree);
                    }
                    Op::Toggle => {
                        view.toggle_folder(&mut tree);
                    }
                    Op::Resize(rows) => {
                        view.resize(&tree, rows);
                    }
                    Op::Enqueue => {
                        view.enqueue_selection(&mut tree);
                    }
                }
                prop_assert_eq!(view.total(), tree.count_visible());
                assert_invariants(&view);
                for (row, line) in view.lines().iter().enumerate() {
                    prop_assert_eq!(Some(line.clone()), tree.label_at(view.min + row));
                }
            }
        }
    }
}
