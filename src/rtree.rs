//! A 2-D R*-tree over zero-area rectangles (points), keyed by MMSI.
//!
//! Nodes live in an arena (`nodes`) addressed by index so that deletion,
//! condensation and forced re-insertion can walk up and down the tree
//! without fighting the borrow checker over cyclic parent/child ownership.
//! Every node keeps a `parent` back-reference; an entry's position within
//! its parent is found by a linear scan (node fan-out is bounded by `M`,
//! so this is cheap) rather than cached, to keep that invariant trivially
//! correct across splits and condensation.

use crate::spatial::Rectangle;
use std::collections::HashMap;
use thiserror::Error;

/// Maximum entries per node before it must split.
pub const MAX_ENTRIES: usize = 10;
/// Minimum entries per non-root node, enforced after every insert/delete.
pub const MIN_ENTRIES: usize = 4;
/// Entries forcibly re-inserted on first overflow at a level (~30% of M).
const FORCED_REINSERT_COUNT: usize = 3;

type NodeId = usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("mmsi {0} not present in index")]
    NotFound(u32),
    #[error("rectangle is not valid (non-finite or out of range coordinates)")]
    InvalidRectangle,
}

#[derive(Debug, Clone, Copy)]
enum Entry {
    Leaf { mbr: Rectangle, mmsi: u32 },
    Internal { mbr: Rectangle, child: NodeId },
}

impl Entry {
    fn mbr(&self) -> Rectangle {
        match self {
            Entry::Leaf { mbr, .. } => *mbr,
            Entry::Internal { mbr, .. } => *mbr,
        }
    }

    fn set_mbr(&mut self, new_mbr: Rectangle) {
        match self {
            Entry::Leaf { mbr, .. } => *mbr = new_mbr,
            Entry::Internal { mbr, .. } => *mbr = new_mbr,
        }
    }

    fn child(&self) -> Option<NodeId> {
        match self {
            Entry::Internal { child, .. } => Some(*child),
            Entry::Leaf { .. } => None,
        }
    }
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    is_leaf: bool,
    entries: Vec<Entry>,
}

/// A concurrent-friendly (single-writer-many-reader once wrapped by the
/// caller in a `RwLock`, see `vessel::VesselStore`) spatial index.
pub struct RTree {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    root: NodeId,
    /// Distance, in edges, from the root to a leaf. Leaves are level 0.
    height: usize,
    locations: HashMap<u32, NodeId>,
}

impl Default for RTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RTree {
    pub fn new() -> Self {
        let root_node = Node {
            parent: None,
            is_leaf: true,
            entries: Vec::new(),
        };
        RTree {
            nodes: vec![Some(root_node)],
            free: Vec::new(),
            root: 0,
            height: 0,
            locations: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn contains(&self, mmsi: u32) -> bool {
        self.locations.contains_key(&mmsi)
    }

    /// Inserts (or, if already present, silently duplicates -- callers are
    /// expected to `update` rather than `insert` twice for the same mmsi)
    /// a point into the index.
    pub fn insert(&mut self, mmsi: u32, rect: Rectangle) -> Result<(), Error> {
        if !rect.is_valid() {
            return Err(Error::InvalidRectangle);
        }
        let entry = Entry::Leaf { mbr: rect, mmsi };
        let mut overflow_treated = vec![false; self.height + 1];
        self.insert_at_level(entry, 0, &mut overflow_treated);
        Ok(())
    }

    /// Removes `mmsi` from the index.
    pub fn delete(&mut self, mmsi: u32) -> Result<(), Error> {
        let leaf_id = self.locations.remove(&mmsi).ok_or(Error::NotFound(mmsi))?;
        let node = self.nodes[leaf_id].as_mut().expect("leaf node present");
        let idx = node
            .entries
            .iter()
            .position(|e| matches!(e, Entry::Leaf { mmsi: m, .. } if *m == mmsi))
            .ok_or(Error::NotFound(mmsi))?;
        node.entries.remove(idx);

        self.condense(leaf_id);
        self.collapse_root();
        Ok(())
    }

    /// Re-positions `mmsi`, implemented as delete-then-insert per the
    /// component design. Fails if `mmsi` wasn't already indexed.
    pub fn update(&mut self, mmsi: u32, rect: Rectangle) -> Result<(), Error> {
        self.delete(mmsi)?;
        self.insert(mmsi, rect)
    }

    /// Returns every mmsi whose indexed rectangle overlaps `query`. Does
    /// not itself handle antimeridian-spanning queries -- callers split
    /// those with `spatial::split_antimeridian` and union the results.
    pub fn find_within(&self, query: Rectangle) -> Vec<u32> {
        let mut out = Vec::new();
        self.search(self.root, &query, &mut out);
        out
    }

    fn search(&self, node_id: NodeId, query: &Rectangle, out: &mut Vec<u32>) {
        let node = self.nodes[node_id].as_ref().expect("node present");
        for entry in &node.entries {
            match entry {
                Entry::Leaf { mbr, mmsi } => {
                    if mbr.overlaps(query) {
                        out.push(*mmsi);
                    }
                }
                Entry::Internal { mbr, child } => {
                    if mbr.overlaps(query) {
                        self.search(*child, query, out);
                    }
                }
            }
        }
    }

    // -- insertion -----------------------------------------------------

    fn insert_at_level(&mut self, entry: Entry, level: usize, overflow_treated: &mut [bool]) {
        let incoming_mbr = entry.mbr();
        let target = self.choose_subtree(level, incoming_mbr);
        if let Entry::Leaf { mmsi, .. } = &entry {
            self.locations.insert(*mmsi, target);
        }
        self.nodes[target]
            .as_mut()
            .expect("node present")
            .entries
            .push(entry);
        if self.nodes[target].as_ref().unwrap().entries.len() > MAX_ENTRIES {
            self.overflow_treatment(target, level, overflow_treated);
        } else {
            self.sync_up(target);
        }
    }

    /// Descends from the root to the node at `target_level`, choosing at
    /// each step the child entry that minimizes overlap-enlargement (when
    /// the children being chosen among are leaves) or area-enlargement
    /// (otherwise) with respect to `incoming_mbr`, breaking ties by
    /// enlargement then by current area.
    fn choose_subtree(&self, target_level: usize, incoming_mbr: Rectangle) -> NodeId {
        let mut current = self.root;
        let mut current_level = self.height;
        while current_level > target_level {
            let children_are_leaves = current_level == 1;
            let node = self.nodes[current].as_ref().expect("node present");
            let candidate_mbrs: Vec<Rectangle> = node.entries.iter().map(Entry::mbr).collect();
            let best = (0..node.entries.len())
                .min_by(|&a, &b| {
                    let score = |i: usize| -> (f64, f64, f64) {
                        let mbr = candidate_mbrs[i];
                        let enlarged = mbr.union(&incoming_mbr);
                        if children_are_leaves {
                            let overlap_before: f64 = candidate_mbrs
                                .iter()
                                .enumerate()
                                .filter(|(j, _)| *j != i)
                                .map(|(_, other)| mbr.overlap_area(other))
                                .sum();
                            let overlap_after: f64 = candidate_mbrs
                                .iter()
                                .enumerate()
                                .filter(|(j, _)| *j != i)
                                .map(|(_, other)| enlarged.overlap_area(other))
                                .sum();
                            (overlap_after - overlap_before, mbr.enlargement(&enlarged), mbr.area())
                        } else {
                            (mbr.enlargement(&enlarged), mbr.area(), 0.0)
                        }
                    };
                    score(a)
                        .partial_cmp(&score(b))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .expect("node is never empty on descent");
            current = node.entries[best].child().expect("internal node entries have children");
            current_level -= 1;
        }
        current
    }

    fn overflow_treatment(&mut self, node_id: NodeId, level: usize, overflow_treated: &mut [bool]) {
        let is_root = self.nodes[node_id].as_ref().unwrap().parent.is_none();
        if !is_root && !overflow_treated[level] {
            overflow_treated[level] = true;
            self.forced_reinsert(node_id, level, overflow_treated);
        } else {
            self.split(node_id, level, overflow_treated);
        }
    }

    fn forced_reinsert(&mut self, node_id: NodeId, level: usize, overflow_treated: &mut [bool]) {
        let node_center = self.node_mbr(node_id).center();
        let mut entries = self.nodes[node_id].as_mut().unwrap().entries.clone();
        entries.sort_by(|a, b| {
            let da = dist2(a.mbr().center(), node_center);
            let db = dist2(b.mbr().center(), node_center);
            db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
        });
        let removed: Vec<Entry> = entries.drain(0..FORCED_REINSERT_COUNT).collect();
        self.nodes[node_id].as_mut().unwrap().entries = entries;
        if let Some(parent) = self.nodes[node_id].as_ref().unwrap().parent {
            self.update_parent_mbr(parent, node_id);
        }
        self.sync_up(node_id);

        for entry in removed.into_iter().rev() {
            match entry {
                Entry::Leaf { mbr, mmsi } => {
                    self.insert_at_level(Entry::Leaf { mbr, mmsi }, level, overflow_treated)
                }
                Entry::Internal { mbr, child } => {
                    self.insert_at_level(Entry::Internal { mbr, child }, level, overflow_treated)
                }
            }
        }
    }

    fn split(&mut self, node_id: NodeId, level: usize, overflow_treated: &mut [bool]) {
        let node = self.nodes[node_id].take().unwrap();
        let is_leaf = node.is_leaf;
        let parent = node.parent;
        let (group1, group2) = choose_split(node.entries);

        self.nodes[node_id] = Some(Node {
            parent,
            is_leaf,
            entries: group1,
        });
        let new_id = self.alloc_node(Node {
            parent,
            is_leaf,
            entries: group2,
        });
        self.reparent_children(node_id);
        self.reparent_children(new_id);
        self.reindex_leaves(node_id);
        self.reindex_leaves(new_id);

        match parent {
            None => {
                let mbr_a = self.node_mbr(node_id);
                let mbr_b = self.node_mbr(new_id);
                let new_root = self.alloc_node(Node {
                    parent: None,
                    is_leaf: false,
                    entries: vec![
                        Entry::Internal { mbr: mbr_a, child: node_id },
                        Entry::Internal { mbr: mbr_b, child: new_id },
                    ],
                });
                self.nodes[node_id].as_mut().unwrap().parent = Some(new_root);
                self.nodes[new_id].as_mut().unwrap().parent = Some(new_root);
                self.root = new_root;
                self.height += 1;
            }
            Some(parent_id) => {
                self.nodes[new_id].as_mut().unwrap().parent = Some(parent_id);
                self.update_parent_mbr(parent_id, node_id);
                let mbr_b = self.node_mbr(new_id);
                self.nodes[parent_id]
                    .as_mut()
                    .unwrap()
                    .entries
                    .push(Entry::Internal { mbr: mbr_b, child: new_id });
                if self.nodes[parent_id].as_ref().unwrap().entries.len() > MAX_ENTRIES {
                    self.overflow_treatment(parent_id, level + 1, overflow_treated);
                } else {
                    self.sync_up(parent_id);
                }
            }
        }
    }

    fn reparent_children(&mut self, node_id: NodeId) {
        let children: Vec<NodeId> = {
            let node = self.nodes[node_id].as_ref().unwrap();
            if node.is_leaf {
                return;
            }
            node.entries.iter().filter_map(Entry::child).collect()
        };
        for child in children {
            self.nodes[child].as_mut().unwrap().parent = Some(node_id);
        }
    }

    fn reindex_leaves(&mut self, node_id: NodeId) {
        let node = self.nodes[node_id].as_ref().unwrap();
        if !node.is_leaf {
            return;
        }
        let mmsis: Vec<u32> = node
            .entries
            .iter()
            .filter_map(|e| match e {
                Entry::Leaf { mmsi, .. } => Some(*mmsi),
                Entry::Internal { .. } => None,
            })
            .collect();
        for mmsi in mmsis {
            self.locations.insert(mmsi, node_id);
        }
    }

    fn alloc_node(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn node_mbr(&self, node_id: NodeId) -> Rectangle {
        let node = self.nodes[node_id].as_ref().unwrap();
        Rectangle::union_all(node.entries.iter().map(Entry::mbr).collect::<Vec<_>>().iter())
            .expect("a node always has at least one entry once construction is complete")
    }

    fn update_parent_mbr(&mut self, parent_id: NodeId, child_id: NodeId) {
        let new_mbr = self.node_mbr(child_id);
        let parent = self.nodes[parent_id].as_mut().unwrap();
        let idx = parent
            .entries
            .iter()
            .position(|e| e.child() == Some(child_id))
            .expect("child is registered in its parent");
        parent.entries[idx].set_mbr(new_mbr);
    }

    /// Recomputes and propagates MBRs from `node_id` up to the root.
    fn sync_up(&mut self, node_id: NodeId) {
        let mut current = node_id;
        while let Some(parent_id) = self.nodes[current].as_ref().unwrap().parent {
            self.update_parent_mbr(parent_id, current);
            current = parent_id;
        }
    }

    // -- deletion --------------------------------------------------------

    fn condense(&mut self, start: NodeId) {
        let mut orphans: Vec<(usize, Entry)> = Vec::new();
        let mut current = start;
        let mut level = 0usize;
        loop {
            let (parent_opt, entries_len) = {
                let node = self.nodes[current].as_ref().unwrap();
                (node.parent, node.entries.len())
            };
            match parent_opt {
                Some(parent_id) if entries_len < MIN_ENTRIES => {
                    let node = self.nodes[current].take().unwrap();
                    self.free.push(current);
                    for e in node.entries {
                        if let Entry::Leaf { mmsi, .. } = &e {
                            self.locations.remove(mmsi);
                        }
                        orphans.push((level, e));
                    }
                    let parent = self.nodes[parent_id].as_mut().unwrap();
                    let idx = parent
                        .entries
                        .iter()
                        .position(|e| e.child() == Some(current))
                        .expect("child is registered in its parent");
                    parent.entries.remove(idx);
                    current = parent_id;
                    level += 1;
                }
                _ => {
                    self.sync_up(current);
                    break;
                }
            }
        }
        for (lvl, entry) in orphans {
            let mut overflow_treated = vec![false; self.height + 1];
            self.insert_at_level(entry, lvl, &mut overflow_treated);
        }
    }

    fn collapse_root(&mut self) {
        loop {
            let (is_leaf, entries_len) = {
                let root = self.nodes[self.root].as_ref().unwrap();
                (root.is_leaf, root.entries.len())
            };
            if is_leaf || entries_len != 1 {
                break;
            }
            let only_child = self.nodes[self.root].as_ref().unwrap().entries[0]
                .child()
                .expect("internal root entry has a child");
            let old_root = self.root;
            self.nodes[only_child].as_mut().unwrap().parent = None;
            self.root = only_child;
            self.nodes[old_root] = None;
            self.free.push(old_root);
            self.height -= 1;
        }
    }
}

fn dist2(a: crate::spatial::Point, b: crate::spatial::Point) -> f64 {
    let dlat = a.lat - b.lat;
    let dlon = a.lon - b.lon;
    dlat * dlat + dlon * dlon
}

/// R*-tree split: for each axis, sort entries by lower and by upper
/// bound; for each of the `M - 2m + 2` valid split points sum the margins
/// of the two resulting groups. The axis with the smaller total margin
/// sum wins; within it, the distribution with the smallest overlap (ties
/// broken by smaller combined area) is used.
fn choose_split(entries: Vec<Entry>) -> (Vec<Entry>, Vec<Entry>) {
    let n = entries.len();
    let axes: [fn(&Rectangle) -> (f64, f64); 2] = [
        |r: &Rectangle| (r.min.lat, r.max.lat),
        |r: &Rectangle| (r.min.lon, r.max.lon),
    ];

    let mut best_axis_margin_sum = f64::INFINITY;
    let mut best_axis = 0usize;
    let mut per_axis_orders: Vec<[Vec<usize>; 2]> = Vec::with_capacity(2);

    for (axis_idx, axis_fn) in axes.iter().enumerate() {
        let mut by_min: Vec<usize> = (0..n).collect();
        by_min.sort_by(|&a, &b| axis_fn(&entries[a].mbr()).0.partial_cmp(&axis_fn(&entries[b].mbr()).0).unwrap());
        let mut by_max: Vec<usize> = (0..n).collect();
        by_max.sort_by(|&a, &b| axis_fn(&entries[a].mbr()).1.partial_cmp(&axis_fn(&entries[b].mbr()).1).unwrap());

        let mut margin_sum = 0.0;
        for order in [&by_min, &by_max] {
            for split_point in MIN_ENTRIES..=(n - MIN_ENTRIES) {
                let (g1, g2) = order.split_at(split_point);
                let mbr1 = group_mbr(&entries, g1);
                let mbr2 = group_mbr(&entries, g2);
                margin_sum += mbr1.margin() + mbr2.margin();
            }
        }
        per_axis_orders.push([by_min, by_max]);
        if margin_sum < best_axis_margin_sum {
            best_axis_margin_sum = margin_sum;
            best_axis = axis_idx;
        }
    }

    let orders = &per_axis_orders[best_axis];
    let mut best_overlap = f64::INFINITY;
    let mut best_area = f64::INFINITY;
    let mut best_split: Option<(Vec<usize>, Vec<usize>)> = None;

    for order in orders {
        for split_point in MIN_ENTRIES..=(n - MIN_ENTRIES) {
            let (g1, g2) = order.split_at(split_point);
            let mbr1 = group_mbr(&entries, g1);
            let mbr2 = group_mbr(&entries, g2);
            let overlap = mbr1.overlap_area(&mbr2);
            let area = mbr1.area() + mbr2.area();
            if overlap < best_overlap || (overlap == best_overlap && area < best_area) {
                best_overlap = overlap;
                best_area = area;
                best_split = Some((g1.to_vec(), g2.to_vec()));
            }
        }
    }

    let (idx1, idx2) = best_split.expect("at least one valid distribution always exists");
    let mut entries: Vec<Option<Entry>> = entries.into_iter().map(Some).collect();
    let group1 = idx1.iter().map(|&i| entries[i].take().unwrap()).collect();
    let group2 = idx2.iter().map(|&i| entries[i].take().unwrap()).collect();
    (group1, group2)
}

fn group_mbr(entries: &[Entry], idx: &[usize]) -> Rectangle {
    Rectangle::union_all(idx.iter().map(|&i| entries[i].mbr()).collect::<Vec<_>>().iter())
        .expect("split groups are never empty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Point;

    fn pt(lat: f64, lon: f64) -> Rectangle {
        Point::new(lat, lon).as_rectangle()
    }

    #[test]
    fn insert_and_find_within() {
        let mut tree = RTree::new();
        tree.insert(1, pt(0.0, 0.0)).unwrap();
        tree.insert(2, pt(10.0, 10.0)).unwrap();
        tree.insert(3, pt(-10.0, 10.0)).unwrap();
        tree.insert(4, pt(10.0, -10.0)).unwrap();
        tree.insert(5, pt(-10.0, -10.0)).unwrap();
        tree.insert(6, pt(50.0, 0.0)).unwrap();
        tree.insert(7, pt(0.0, 50.0)).unwrap();

        let mut found = tree.find_within(Rectangle::new(Point::new(-10.0, -10.0), Point::new(10.0, 10.0)));
        found.sort();
        assert_eq!(found, vec![1, 2, 3, 4, 5]);

        let mut found2 = tree.find_within(Rectangle::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0)));
        found2.sort();
        assert_eq!(found2, vec![1, 2]);
    }

    #[test]
    fn delete_then_not_found() {
        let mut tree = RTree::new();
        tree.insert(42, pt(1.0, 1.0)).unwrap();
        assert!(tree.contains(42));
        tree.delete(42).unwrap();
        assert!(!tree.contains(42));
        assert_eq!(tree.delete(42), Err(Error::NotFound(42)));
    }

    #[test]
    fn update_moves_point() {
        let mut tree = RTree::new();
        tree.insert(1, pt(0.0, 0.0)).unwrap();
        tree.update(1, pt(90.0, 0.0)).unwrap();
        assert!(tree.find_within(Rectangle::new(Point::new(-1.0, -1.0), Point::new(1.0, 1.0))).is_empty());
        assert_eq!(tree.find_within(Rectangle::new(Point::new(89.0, -1.0), Point::new(90.0, 1.0))), vec![1]);
    }

    #[test]
    fn many_inserts_trigger_splits_and_stay_queryable() {
        let mut tree = RTree::new();
        for i in 0..500u32 {
            let lat = ((i % 180) as f64) - 89.0;
            let lon = ((i % 360) as f64) - 179.0;
            tree.insert(i, pt(lat, lon)).unwrap();
        }
        assert_eq!(tree.len(), 500);
        let all = tree.find_within(Rectangle::new(Point::new(-90.0, -180.0), Point::new(90.0, 180.0)));
        assert_eq!(all.len(), 500);
    }

    #[test]
    fn deletes_interleaved_with_inserts_keep_index_consistent() {
        let mut tree = RTree::new();
        for i in 0..200u32 {
            tree.insert(i, pt((i % 90) as f64, (i % 180) as f64)).unwrap();
        }
        for i in (0..200u32).step_by(2) {
            tree.delete(i).unwrap();
        }
        assert_eq!(tree.len(), 100);
        for i in (1..200u32).step_by(2) {
            assert!(tree.contains(i));
        }
    }

    #[test]
    fn rejects_invalid_rectangle() {
        let mut tree = RTree::new();
        let bad = Rectangle::new(Point::new(f64::NAN, 0.0), Point::new(0.0, 0.0));
        assert_eq!(tree.insert(1, bad), Err(Error::InvalidRectangle));
    }
}
