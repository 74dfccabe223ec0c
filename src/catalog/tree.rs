// Catalog tree - artist -> album -> track, folded and unfolded from the UI
// Everything here addresses nodes by their position in the *visible sequence*:
// root is 1, and a node's children follow it only while that node is active.

use super::TrackRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;

pub const EXPANDED_GLYPH: &str = "▾";
pub const COLLAPSED_GLYPH: &str = "▸";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_number: Option<u32>,
    #[serde(skip)]
    active: bool,
    #[serde(default)]
    children: Vec<Node>,
}

/// One entry of the visible sequence, as produced by [`Node::visible`].
#[derive(Debug, Clone, Copy)]
pub struct VisibleNode<'a> {
    pub position: usize,
    pub depth: usize,
    /// Number of children the parent has (drives track number padding).
    pub siblings: usize,
    pub node: &'a Node,
}

impl VisibleNode<'_> {
    pub fn label(&self) -> String {
        format_label(self.node, self.depth, self.siblings)
    }
}

/// Lazy pre-order walk over the visible sequence. Explicit stack, no recursion.
pub struct Visible<'a> {
    stack: Vec<(&'a Node, usize, usize)>,
    position: usize,
}

impl<'a> Iterator for Visible<'a> {
    type Item = VisibleNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (node, depth, siblings) = self.stack.pop()?;
        self.position += 1;

        if node.active {
            let count = node.children.len();
            self.stack
                .extend(node.children.iter().rev().map(|child| (child, depth + 1, count)));
        }

        Some(VisibleNode {
            position: self.position,
            depth,
            siblings,
            node,
        })
    }
}

impl Node {
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            fingerprint: None,
            track_number: None,
            disc_number: None,
            active: false,
            children: Vec::new(),
        }
    }

    pub fn track(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        track_number: u32,
        disc_number: Option<u32>,
        fingerprint: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            fingerprint,
            track_number: Some(track_number),
            disc_number,
            active: false,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn add(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Child folder with this exact name, created at the end if missing.
    pub fn folder_entry(&mut self, name: &str) -> &mut Node {
        let index = match self.children.iter().position(|child| child.name == name) {
            Some(index) => index,
            None => {
                self.children.push(Node::folder(name));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Flips this node only; descendants keep their own flags.
    pub fn toggle_active(&mut self) {
        self.active = !self.active;
    }

    /// Stable sort of the direct children: disc, then track number (absent sorts last), then name.
    pub fn sort(&mut self) {
        self.children.sort_by(compare_siblings);
    }

    /// Sorts every node of the subtree.
    pub fn sort_all(&mut self) {
        let mut stack: Vec<&mut Node> = vec![self];
        while let Some(node) = stack.pop() {
            node.sort();
            stack.extend(node.children.iter_mut());
        }
    }

    pub fn visible(&self) -> Visible<'_> {
        Visible {
            stack: vec![(self, 0, self.children.len())],
            position: 0,
        }
    }

    /// Size of the visible sequence rooted here.
    pub fn count_visible(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&Node> = vec![self];
        while let Some(node) = stack.pop() {
            if node.active {
                stack.extend(node.children.iter());
            }
            count += 1;
        }
        count
    }

    /// Force-expands every folder under (and including) this node and returns
    /// the tracks beneath it in visible order.
    pub fn activate_all_descendants(&mut self) -> Vec<&Node> {
        let mut stack: Vec<&mut Node> = vec![&mut *self];
        while let Some(node) = stack.pop() {
            if !node.is_leaf() {
                node.active = true;
            }
            stack.extend(node.children.iter_mut());
        }

        let this: &Node = self;
        this.visible()
            .map(|entry| entry.node)
            .filter(|node| node.is_leaf() && node.path.is_some())
            .collect()
    }

    pub fn get(&self, position: usize) -> Option<&Node> {
        if position == 0 {
            return None;
        }
        self.visible().nth(position - 1).map(|entry| entry.node)
    }

    /// # Panics
    ///
    /// When `position` is outside `1..=count_visible()`.
    pub fn node_at(&self, position: usize) -> &Node {
        match self.get(position) {
            Some(node) => node,
            None => panic!(
                "position {position} outside visible range 1..={}",
                self.count_visible()
            ),
        }
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut Node> {
        if position == 0 {
            return None;
        }

        let mut node = self;
        let mut start = 1;
        while position != start {
            if !node.active {
                return None;
            }
            let mut offset = start + 1;
            let index = node.children.iter().position(|child| {
                let span = child.count_visible();
                if position < offset + span {
                    true
                } else {
                    offset += span;
                    false
                }
            })?;
            start = offset;
            node = &mut node.children[index];
        }
        Some(node)
    }

    pub fn label_at(&self, position: usize) -> Option<String> {
        if position == 0 {
            return None;
        }
        self.visible().nth(position - 1).map(|entry| entry.label())
    }

    /// Labels for positions `min..=max`, stopping as soon as `max` is passed.
    pub fn labels_in_range(&self, min: usize, max: usize) -> Vec<String> {
        if min == 0 || max < min {
            return Vec::new();
        }
        self.visible()
            .skip(min - 1)
            .take(max - min + 1)
            .map(|entry| entry.label())
            .collect()
    }

    pub fn track_record(&self) -> Option<TrackRecord> {
        let path = self.path.clone()?;
        Some(TrackRecord {
            name: self.name.clone(),
            path,
            fingerprint: self.fingerprint.clone(),
        })
    }
}

fn compare_siblings(a: &Node, b: &Node) -> Ordering {
    absent_last(a.disc_number, b.disc_number)
        .then_with(|| absent_last(a.track_number, b.track_number))
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

fn absent_last(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn digit_count(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

fn format_label(node: &Node, depth: usize, siblings: usize) -> String {
    let mut label = "  ".repeat(depth);
    match node.track_number {
        Some(number) if node.is_leaf() => {
            let width = digit_count(siblings).max(2);
            label.push_str(&format!("  {number:0width$}. {}", node.name));
        }
        _ => {
            let glyph = if node.active { EXPANDED_GLYPH } else { COLLAPSED_GLYPH };
            label.push_str(&format!("{glyph} {}", node.name));
        }
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn album(name: &str, tracks: u32) -> Node {
        let mut album = Node::folder(name);
        for n in 1..=tracks {
            album.add(Node::track(
                format!("{name} {n}"),
                format!("/music/{name}/{n}.mp3"),
                n,
                None,
                None,
            ));
        }
        album
    }

    fn library() -> Node {
        let mut root = Node::folder("All Music");
        let mut artist = Node::folder("Artist");
        artist.add(album("Second", 2));
        artist.add(album("First", 3));
        root.add(artist);
        root.add(Node::folder("Empty Artist"));
        root.toggle_active();
        root
    }

    #[test]
    fn test_count_visible_follows_active_chain() {
        let mut root = library();
        assert_eq!(root.count_visible(), 3);

        root.get_mut(2).unwrap().toggle_active();
        assert_eq!(root.count_visible(), 5);

        // Expanding an album under a collapsed artist does not make it visible
        root.get_mut(2).unwrap().toggle_active();
        root.children[0].children[0].toggle_active();
        assert_eq!(root.count_visible(), 3);
        assert_eq!(root.count_visible(), root.visible().count());
    }

    #[test]
    fn test_sort_orders_by_disc_track_then_name() {
        let mut folder = Node::folder("Album");
        folder.add(Node::track("b", "/b", 2, Some(1), None));
        folder.add(Node::track("a", "/a", 1, None, None));
        folder.add(Node::track("c", "/c", 1, Some(2), None));
        folder.add(Node::track("d", "/d", 1, Some(1), None));
        folder.add(Node::folder("zeta"));
        folder.add(Node::folder("Alpha"));
        folder.sort();

        let names: Vec<_> = folder.children().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["d", "b", "c", "a", "Alpha", "zeta"]);
    }

    #[test]
    fn test_activate_all_descendants_returns_tracks_in_order() {
        let mut root = library();
        root.sort_all();

        let artist = root.get_mut(2).unwrap();
        let names: Vec<String> = artist
            .activate_all_descendants()
            .iter()
            .map(|n| n.name.clone())
            .collect();
        assert_eq!(names, ["First 1", "First 2", "First 3", "Second 1", "Second 2"]);

        // root, artist, 2 albums, 5 tracks, empty artist
        assert_eq!(root.count_visible(), 10);
    }

    #[test]
    fn test_get_mut_matches_get() {
        let mut root = library();
        root.get_mut(2).unwrap().activate_all_descendants();

        for position in 1..=root.count_visible() {
            let expected = root.get(position).unwrap().name.clone();
            assert_eq!(root.get_mut(position).unwrap().name, expected);
        }
        assert!(root.get(0).is_none());
        assert!(root.get_mut(root.count_visible() + 1).is_none());
    }

    #[test]
    #[should_panic(expected = "outside visible range")]
    fn test_node_at_out_of_range_panics() {
        library().node_at(4);
    }

    #[test]
    fn test_labels_in_range() {
        let mut root = library();
        root.sort_all();
        root.get_mut(2).unwrap().activate_all_descendants();

        let labels = root.labels_in_range(1, 5);
        assert_eq!(
            labels,
            [
                "▾ All Music",
                "  ▾ Artist",
                "    ▾ First",
                "        01. First 1",
                "        02. First 2",
            ]
        );
        assert_eq!(root.label_at(10).as_deref(), Some("  ▸ Empty Artist"));
        assert_eq!(root.labels_in_range(9, 40).len(), 2);
    }

    #[test]
    fn test_track_number_padding_grows_with_album_size() {
        let mut root = Node::folder("All Music");
        root.add(album("Big", 120));
        root.toggle_active();
        root.get_mut(2).unwrap().toggle_active();

        assert_eq!(root.label_at(3).as_deref(), Some("      001. Big 1"));
    }

    fn reference_count(node: &Node) -> usize {
        let below = if node.active {
            node.children.iter().map(reference_count).sum()
        } else {
            0
        };
        1 + below
    }

    fn arbitrary_tree() -> impl Strategy<Value = Node> {
        let leaf = (1u32..30).prop_map(|n| {
            Node::track(format!("Track {n}"), format!("/music/{n}.mp3"), n, None, None)
        });
        leaf.prop_recursive(5, 96, 6, |inner| {
            (any::<bool>(), proptest::collection::vec(inner, 0..6)).prop_map(
                |(active, children)| {
                    let mut folder = Node::folder("Folder");
                    folder.active = active;
                    for child in children {
                        folder.add(child);
                    }
                    folder
                },
            )
        })
    }

    proptest! {
        #[test]
        fn count_visible_matches_reachable_positions(mut root in arbitrary_tree()) {
            let total = root.count_visible();
            prop_assert_eq!(total, root.visible().count());
            prop_assert_eq!(total, reference_count(&root));

            for position in 1..=total {
                prop_assert!(root.get(position).is_some());
            }
            prop_assert!(root.get(total + 1).is_none());
            prop_assert!(root.get_mut(total + 1).is_none());

            let positions: Vec<usize> = root.visible().map(|v| v.position).collect();
            prop_assert_eq!(positions, (1..=total).collect::<Vec<_>>());
        }
    }
}
