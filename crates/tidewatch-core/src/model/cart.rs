//! CART tree growth over a binned matrix.
//!
//! Split search builds one histogram of node statistics per candidate
//! feature, then scans bin boundaries left to right. Gain is
//! `score(L) + score(R) - score(parent)` for both criteria:
//!   - regression: score = sum² / n (reduction in squared error)
//!   - Gini:       score = Σ count² / n (n-weighted reduction in impurity)

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::binning::BinnedMatrix;

const MIN_GAIN: f64 = 1e-12;

// ── Criteria ──────────────────────────────────────────────────────────────────

/// Node statistics and the scoring rule a tree is grown against.
pub trait Criterion: Sync {
    type Stats: Clone;
    type Leaf: Clone;

    fn empty(&self) -> Self::Stats;
    fn add(&self, stats: &mut Self::Stats, row: usize);
    fn merge(&self, into: &mut Self::Stats, other: &Self::Stats);
    fn subtract(&self, total: &Self::Stats, part: &Self::Stats) -> Self::Stats;
    fn count(&self, stats: &Self::Stats) -> usize;
    fn score(&self, stats: &Self::Stats) -> f64;
    fn leaf(&self, stats: &Self::Stats) -> Self::Leaf;
    /// No split can improve this node.
    fn is_pure(&self, stats: &Self::Stats) -> bool;
}

/// Squared-error regression on a target vector.
pub struct Regression<'a> {
    pub targets: &'a [f64],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SumStats {
    n: usize,
    sum: f64,
    sum_sq: f64,
}

impl Criterion for Regression<'_> {
    type Stats = SumStats;
    type Leaf = f64;

    fn empty(&self) -> SumStats {
        SumStats::default()
    }

    fn add(&self, s: &mut SumStats, row: usize) {
        let y = self.targets[row];
        s.n += 1;
        s.sum += y;
        s.sum_sq += y * y;
    }

    fn merge(&self, into: &mut SumStats, other: &SumStats) {
        into.n += other.n;
        into.sum += other.sum;
        into.sum_sq += other.sum_sq;
    }

    fn subtract(&self, total: &SumStats, part: &SumStats) -> SumStats {
        SumStats { n: total.n - part.n, sum: total.sum - part.sum, sum_sq: total.sum_sq - part.sum_sq }
    }

    fn count(&self, s: &SumStats) -> usize {
        s.n
    }

    fn score(&self, s: &SumStats) -> f64 {
        if s.n == 0 {
            0.0
        } else {
            s.sum * s.sum / s.n as f64
        }
    }

    fn leaf(&self, s: &SumStats) -> f64 {
        if s.n == 0 {
            0.0
        } else {
            s.sum / s.n as f64
        }
    }

    fn is_pure(&self, s: &SumStats) -> bool {
        s.n < 2 || s.sum_sq - self.score(s) <= MIN_GAIN
    }
}

/// Gini impurity on class indices `0..n_classes`.
pub struct Gini<'a> {
    pub labels: &'a [usize],
    pub n_classes: usize,
}

impl Criterion for Gini<'_> {
    type Stats = Vec<u32>;
    /// Class distribution at the leaf, summing to 1.
    type Leaf = Vec<f64>;

    fn empty(&self) -> Vec<u32> {
        vec![0; self.n_classes]
    }

    fn add(&self, s: &mut Vec<u32>, row: usize) {
        s[self.labels[row]] += 1;
    }

    fn merge(&self, into: &mut Vec<u32>, other: &Vec<u32>) {
        for (a, b) in into.iter_mut().zip(other) {
            *a += b;
        }
    }

    fn subtract(&self, total: &Vec<u32>, part: &Vec<u32>) -> Vec<u32> {
        total.iter().zip(part).map(|(a, b)| a - b).collect()
    }

    fn count(&self, s: &Vec<u32>) -> usize {
        s.iter().map(|&c| c as usize).sum()
    }

    fn score(&self, s: &Vec<u32>) -> f64 {
        let n = self.count(s);
        if n == 0 {
            return 0.0;
        }
        s.iter().map(|&c| (c as f64).powi(2)).sum::<f64>() / n as f64
    }

    fn leaf(&self, s: &Vec<u32>) -> Vec<f64> {
        let n = self.count(s).max(1) as f64;
        s.iter().map(|&c| c as f64 / n).collect()
    }

    fn is_pure(&self, s: &Vec<u32>) -> bool {
        s.iter().filter(|&&c| c > 0).count() <= 1
    }
}

// ── Trees ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node<L> {
    Split {
        feature: usize,
        /// Training-time bin boundary; rows with code `<= bin` go left.
        bin: u8,
        /// Raw-value boundary; `x <= threshold` goes left.
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf(L),
}

/// Flat binary tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree<L> {
    nodes: Vec<Node<L>>,
}

impl<L> Tree<L> {
    pub fn leaf(&self, x: &[f64]) -> &L {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf(v) => return v,
                Node::Split { feature, threshold, left, right, .. } => {
                    i = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Same traversal on a training row's bin codes.
    pub fn leaf_binned(&self, data: &BinnedMatrix, row: usize) -> &L {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf(v) => return v,
                Node::Split { feature, bin, left, right, .. } => {
                    i = if data.code(*feature, row) <= *bin { *left } else { *right };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk<L>(nodes: &[Node<L>], i: usize) -> usize {
            match &nodes[i] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Growth limits for one tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` considers all.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self { max_depth: 8, min_samples_split: 2, min_samples_leaf: 1, max_features: None }
    }
}

/// A fitted tree plus the total split gain credited to each feature.
pub struct Grown<L> {
    pub tree: Tree<L>,
    pub gains: Vec<f64>,
}

struct SplitCandidate {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct Builder<'a, C: Criterion> {
    data: &'a BinnedMatrix,
    criterion: &'a C,
    params: TreeParams,
    nodes: Vec<Node<C::Leaf>>,
    gains: Vec<f64>,
}

/// Grow one tree on `rows` (duplicates allowed, e.g. a bootstrap sample).
pub fn grow<C: Criterion, R: Rng + ?Sized>(
    data: &BinnedMatrix,
    rows: Vec<usize>,
    criterion: &C,
    params: TreeParams,
    rng: &mut R,
) -> Grown<C::Leaf> {
    let mut b = Builder {
        data,
        criterion,
        params,
        nodes: Vec::new(),
        gains: vec![0.0; data.n_features()],
    };
    b.build(rows, 0, rng);
    Grown { tree: Tree { nodes: b.nodes }, gains: b.gains }
}

impl<C: Criterion> Builder<'_, C> {
    fn build<R: Rng + ?Sized>(&mut self, rows: Vec<usize>, depth: usize, rng: &mut R) -> usize {
        let mut stats = self.criterion.empty();
        for &r in &rows {
            self.criterion.add(&mut stats, r);
        }
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf(self.criterion.leaf(&stats)));

        if depth >= self.params.max_depth
            || rows.len() < self.params.min_samples_split.max(2)
            || rows.len() < 2 * self.params.min_samples_leaf.max(1)
            || self.criterion.is_pure(&stats)
        {
            return id;
        }

        let Some(split) = self.best_split(&rows, &stats, rng) else {
            return id;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| (self.data.code(split.feature, r) as usize) <= split.bin);
        self.gains[split.feature] += split.gain;

        let l = self.build(left, depth + 1, rng);
        let r = self.build(right, depth + 1, rng);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            bin: split.bin as u8,
            threshold: self.data.feature(split.feature).threshold(split.bin),
            left: l,
            right: r,
        };
        id
    }

    fn candidate_features<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let p = self.data.n_features();
        match self.params.max_features {
            Some(k) if k < p => index::sample(rng, p, k.max(1)).into_vec(),
            _ => (0..p).collect(),
        }
    }

    fn best_split<R: Rng + ?Sized>(
        &self,
        rows: &[usize],
        parent: &C::Stats,
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let parent_score = self.criterion.score(parent);
        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<SplitCandidate> = None;

        for f in self.candidate_features(rng) {
            let n_bins = self.data.feature(f).n_bins();
            if n_bins < 2 {
                continue;
            }
            let mut hist = vec![self.criterion.empty(); n_bins];
            for &r in rows {
                self.criterion.add(&mut hist[self.data.code(f, r) as usize], r);
            }

            let mut left = self.criterion.empty();
            for (b, h) in hist.iter().enumerate().take(n_bins - 1) {
                self.criterion.merge(&mut left, h);
                let n_left = self.criterion.count(&left);
                if n_left < min_leaf {
                    continue;
                }
                let right = self.criterion.subtract(parent, &left);
                if self.criterion.count(&right) < min_leaf {
                    break;
                }
                let gain = self.criterion.score(&left) + self.criterion.score(&right) - parent_score;
                // Ties keep the earlier (feature, bin).
                if gain > MIN_GAIN && best.as_ref().map_or(true, |s| gain > s.gain) {
                    best = Some(SplitCandidate { feature: f, bin: b, gain });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y depends only on feature 1 crossing 5.
        let rows: Vec<Vec<f64>> = (0..200).map(|i| vec![(i % 7) as f64, (i % 10) as f64]).collect();
        let y = rows.iter().map(|r| if r[1] <= 5.0 { 1.0 } else { 3.0 }).collect();
        (rows, y)
    }

    #[test]
    fn regression_stump_finds_the_step() {
        let (rows, y) = step_data();
        let data = BinnedMatrix::fit(&rows, 64).unwrap();
        let crit = Regression { targets: &y };
        let params = TreeParams { max_depth: 1, ..TreeParams::default() };
        let g = grow(&data, (0..rows.len()).collect(), &crit, params, &mut StdRng::seed_from_u64(0));
        assert_eq!(g.tree.depth(), 1);
        assert_relative_eq!(*g.tree.leaf(&[0.0, 5.0]), 1.0);
        assert_relative_eq!(*g.tree.leaf(&[0.0, 5.5]), 3.0);
        assert!(g.gains[1] > 0.0);
        assert_eq!(g.gains[0], 0.0);
    }

    #[test]
    fn raw_and_binned_traversal_agree() {
        let rows: Vec<Vec<f64>> = (0..300)
            .map(|i| vec![((i * 31) % 97) as f64 * 0.5, ((i * 17) % 53) as f64])
            .collect();
        let y: Vec<f64> = rows.iter().map(|r| (r[0] * 0.1).sin() + r[1] * 0.02).collect();
        let data = BinnedMatrix::fit(&rows, 16).unwrap();
        let crit = Regression { targets: &y };
        let g = grow(&data, (0..rows.len()).collect(), &crit, TreeParams::default(), &mut StdRng::seed_from_u64(1));
        for (i, r) in rows.iter().enumerate() {
            assert_eq!(g.tree.leaf(r), g.tree.leaf_binned(&data, i));
        }
    }

    #[test]
    fn depth_and_leaf_size_limits() {
        let (rows, y) = step_data();
        let data = BinnedMatrix::fit(&rows, 64).unwrap();
        let crit = Regression { targets: &y };
        let params = TreeParams { max_depth: 0, ..TreeParams::default() };
        let g = grow(&data, (0..rows.len()).collect(), &crit, params, &mut StdRng::seed_from_u64(0));
        assert_eq!(g.tree.n_nodes(), 1);
        assert_relative_eq!(*g.tree.leaf(&[0.0, 0.0]), 1.8, epsilon = 1e-12);

        let params = TreeParams { min_samples_leaf: 150, ..TreeParams::default() };
        let g = grow(&data, (0..rows.len()).collect(), &crit, params, &mut StdRng::seed_from_u64(0));
        assert_eq!(g.tree.n_nodes(), 1);
    }

    #[test]
    fn gini_separates_classes() {
        let rows: Vec<Vec<f64>> = (0..90).map(|i| vec![i as f64]).collect();
        let labels: Vec<usize> = (0..90).map(|i| i / 30).collect();
        let data = BinnedMatrix::fit(&rows, 64).unwrap();
        let crit = Gini { labels: &labels, n_classes: 3 };
        let g = grow(&data, (0..90).collect(), &crit, TreeParams::default(), &mut StdRng::seed_from_u64(0));
        assert_eq!(g.tree.leaf(&[10.0]), &vec![1.0, 0.0, 0.0]);
        assert_eq!(g.tree.leaf(&[45.0]), &vec![0.0, 1.0, 0.0]);
        assert_eq!(g.tree.leaf(&[80.0]), &vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn pure_node_is_a_leaf() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let labels = vec![2usize; 20];
        let data = BinnedMatrix::fit(&rows, 64).unwrap();
        let crit = Gini { labels: &labels, n_classes: 3 };
        let g = grow(&data, (0..20).collect(), &crit, TreeParams::default(), &mut StdRng::seed_from_u64(0));
        assert_eq!(g.tree.n_nodes(), 1);
    }

    #[test]
    fn serde_round_trip() {
        let (rows, y) = step_data();
        let data = BinnedMatrix::fit(&rows, 64).unwrap();
        let crit = Regression { targets: &y };
        let g = grow(&data, (0..rows.len()).collect(), &crit, TreeParams::default(), &mut StdRng::seed_from_u64(0));
        let json = serde_json::to_string(&g.tree).unwrap();
        let back: Tree<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.n_nodes(), g.tree.n_nodes());
        assert_eq!(back.leaf(&[0.0, 9.0]), g.tree.leaf(&[0.0, 9.0]));
    }
}
