// src/union_find.rs - Disjoint-set forest stored as an index arena

use crate::grid::Label;

#[derive(Debug, Clone, Copy)]
struct Node {
    parent: usize,
    rank: u8,
    label: Option<Label>,
}

/// Union-find over `0..len` with union-by-rank and path compression.
///
/// Only roots carry an authoritative label and rank; parent links of non-roots are
/// back-references that `find` is free to rewrite.
#[derive(Debug, Clone)]
pub struct UnionFind {
    nodes: Vec<Node>,
}

impl UnionFind {
    /// Create `len` singleton sets without labels
    pub fn new(len: usize) -> Self {
        Self {
            nodes: (0..len)
                .map(|i| Node { parent: i, rank: 0, label: None })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Attach a label to the set containing `i`
    pub fn set_label(&mut self, i: usize, label: Label) {
        let root = self.find(i);
        self.nodes[root].label = Some(label);
    }

    /// Label of the set containing `i`
    pub fn label(&mut self, i: usize) -> Option<Label> {
        let root = self.find(i);
        self.nodes[root].label
    }

    /// Root of the set containing `i`; every node on the path is relinked to the root
    pub fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.nodes[root].parent != root {
            root = self.nodes[root].parent;
        }

        let mut current = i;
        while self.nodes[current].parent != root {
            let next = self.nodes[current].parent;
            self.nodes[current].parent = root;
            current = next;
        }

        root
    }

    /// Merge the sets of `a` and `b`, returning the surviving root.
    ///
    /// The surviving root keeps its own label, falling back to the absorbed root's.
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return root_a;
        }

        let (winner, loser) = match self.nodes[root_a].rank.cmp(&self.nodes[root_b].rank) {
            std::cmp::Ordering::Less => (root_b, root_a),
            std::cmp::Ordering::Greater => (root_a, root_b),
            std::cmp::Ordering::Equal => {
                self.nodes[root_a].rank = self.nodes[root_a].rank.saturating_add(1);
                (root_a, root_b)
            }
        };

        self.nodes[loser].parent = winner;
        if self.nodes[winner].label.is_none() {
            self.nodes[winner].label = self.nodes[loser].label;
        }
        self.nodes[loser].label = None;

        winner
    }

    pub fn same_set(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons_are_their_own_roots() {
        let mut forest = UnionFind::new(4);
        for i in 0..4 {
            assert_eq!(forest.find(i), i);
        }
        assert!(!forest.same_set(0, 1));
    }

    #[test]
    fn union_is_transitive() {
        let mut forest = UnionFind::new(6);
        forest.union(0, 1);
        forest.union(2, 3);
        forest.union(1, 3);

        assert!(forest.same_set(0, 2));
        assert!(!forest.same_set(0, 4));
        assert_eq!(forest.find(5), 5);
    }

    #[test]
    fn label_lives_on_root() {
        let mut forest = UnionFind::new(3);
        forest.set_label(0, 7);
        forest.union(1, 0);
        forest.union(2, 1);

        for i in 0..3 {
            assert_eq!(forest.label(i), Some(7));
        }
    }

    #[test]
    fn find_compresses_long_chains() {
        let mut forest = UnionFind::new(64);
        for i in 1..64 {
            forest.union(i - 1, i);
        }
        let root = forest.find(63);
        for i in 0..64 {
            assert_eq!(forest.nodes[i].parent, root);
        }
    }
}
