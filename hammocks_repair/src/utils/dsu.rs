use std::collections::HashMap;
use std::hash::Hash;

use petgraph::unionfind::UnionFind;

#[derive(Debug, Clone)]
/// Disjoint-set union over arbitrary keys
///
/// Keys are mapped to dense indices of a [`UnionFind`] (union by rank, path compression).
pub struct DisjointSets<T> {
    index: HashMap<T, usize>,
    elements: Vec<T>,
    sets: UnionFind<usize>,
}

impl<T> Default for DisjointSets<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            elements: Vec::new(),
            sets: UnionFind::default(),
        }
    }
}

impl<T: Copy + Eq + Hash> DisjointSets<T> {
    /// Create an empty structure
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `x` as a singleton set (no-op if it is already known)
    pub fn make_set(&mut self, x: T) -> usize {
        if let Some(i) = self.index.get(&x) {
            return *i;
        }
        let i = self.sets.new_set();
        self.index.insert(x, i);
        self.elements.push(x);
        i
    }

    /// Representative of the set containing `x`
    pub fn find(&mut self, x: T) -> Option<T> {
        let i = *self.index.get(&x)?;
        let root = self.sets.find_mut(i);
        Some(self.elements[root])
    }

    /// Merge the sets containing `a` and `b` (both are added if unknown)
    pub fn union(&mut self, a: T, b: T) {
        let a = self.make_set(a);
        let b = self.make_set(b);
        self.sets.union(a, b);
    }

    /// Number of known elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether no element was added yet
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All sets, ordered by their first inserted element; elements keep insertion order
    pub fn components(&mut self) -> Vec<Vec<T>> {
        let mut root_to_component: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<Vec<T>> = Vec::new();
        for i in 0..self.elements.len() {
            let root = self.sets.find_mut(i);
            let c = *root_to_component.entry(root).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[c].push(self.elements[i]);
        }
        components
    }
}
