//! Arena-indexed union-find
//!
//! Elements are dense indices into the caller's record slice.

/// Disjoint sets over `0..len` with path halving and union by rank
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Representative of the set containing `x`
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Merge the sets of `a` and `b`; false if they were already joined
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }

        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
        true
    }

    pub fn connected(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Sets with at least two members
    ///
    /// Members ascend; sets are ordered by their smallest member.
    pub fn components(&mut self) -> Vec<Vec<usize>> {
        let mut by_root: Vec<Vec<usize>> = vec![Vec::new(); self.len()];
        for x in 0..self.len() {
            let root = self.find(x);
            by_root[root].push(x);
        }

        let mut components: Vec<Vec<usize>> =
            by_root.into_iter().filter(|members| members.len() > 1).collect();
        components.sort_by_key(|members| members[0]);
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons() {
        let mut uf = UnionFind::new(3);
        assert!(!uf.connected(0, 1));
        assert!(uf.components().is_empty());
    }

    #[test]
    fn test_union_is_transitive() {
        let mut uf = UnionFind::new(5);
        assert!(uf.union(0, 1));
        assert!(uf.union(1, 2));
        assert!(!uf.union(0, 2));

        assert!(uf.connected(0, 2));
        assert!(!uf.connected(0, 3));
        assert_eq!(uf.components(), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_union_order_does_not_matter() {
        let mut forward = UnionFind::new(6);
        forward.union(0, 4);
        forward.union(4, 5);
        forward.union(1, 3);

        let mut backward = UnionFind::new(6);
        backward.union(3, 1);
        backward.union(5, 4);
        backward.union(4, 0);

        assert_eq!(forward.components(), backward.components());
        assert_eq!(forward.components(), vec![vec![0, 4, 5], vec![1, 3]]);
    }
}
