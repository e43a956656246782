#![allow(dead_code)]

use bionj::{Algorithm, NeighbourJoining, NjConfig, NjError, PhyloTree};
use std::collections::{BTreeMap, BTreeSet};

pub type BuildFn = fn(&NeighbourJoining<'_, f64>) -> Result<PhyloTree<f64>, NjError>;

// ---------------------------------------------------------------------------
// A small Newick reader, enough to check the trees this crate writes.

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf { name: String, length: f64 },
    Internal { children: Vec<Node>, length: f64 },
}

impl Node {
    fn length(&self) -> f64 {
        match self {
            Node::Leaf { length, .. } => *length,
            Node::Internal { length, .. } => *length,
        }
    }
}

struct NewickReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> NewickReader<'a> {
    fn peek(&self) -> u8 {
        self.bytes[self.pos]
    }

    fn node(&mut self) -> Node {
        if self.peek() == b'(' {
            self.pos += 1;
            let mut children = vec![self.node()];
            while self.peek() == b',' {
                self.pos += 1;
                children.push(self.node());
            }
            assert_eq!(b')', self.peek(), "unbalanced newick expression");
            self.pos += 1;
            let length = self.branch_length();
            Node::Internal { children, length }
        } else {
            let name = self.name();
            let length = self.branch_length();
            Node::Leaf { name, length }
        }
    }

    fn name(&mut self) -> String {
        let start = self.pos;
        while self.pos < self.bytes.len() && !b":,()".contains(&self.bytes[self.pos]) {
            self.pos += 1;
        }
        String::from_utf8(self.bytes[start..self.pos].to_vec()).expect("invalid newick name")
    }

    fn branch_length(&mut self) -> f64 {
        if self.pos >= self.bytes.len() || self.peek() != b':' {
            return 0.0;
        }
        self.pos += 1;
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_digit()
                || b".eE+-".contains(&self.bytes[self.pos]))
        {
            self.pos += 1;
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .expect("invalid newick length")
            .parse()
            .expect("invalid newick length")
    }
}

pub fn parse_newick(text: &str) -> Node {
    let trimmed = text.trim().trim_end_matches(';');
    let mut reader = NewickReader {
        bytes: trimmed.as_bytes(),
        pos: 0,
    };
    let node = reader.node();
    assert_eq!(trimmed.len(), reader.pos, "trailing newick content");
    node
}

// ---------------------------------------------------------------------------
// Tree comparison helpers. Unrooted trees are compared by their sets of
// nontrivial leaf bipartitions; a split is canonicalized as the side that
// does not contain the lexicographically smallest taxon.

fn leaves_below(node: &Node, out: &mut BTreeSet<String>) {
    match node {
        Node::Leaf { name, .. } => {
            out.insert(name.clone());
        }
        Node::Internal { children, .. } => {
            for child in children {
                leaves_below(child, out);
            }
        }
    }
}

fn collect_internal_clades(
    node: &Node,
    is_root: bool,
    clades: &mut Vec<(BTreeSet<String>, f64)>,
) -> BTreeSet<String> {
    match node {
        Node::Leaf { name, .. } => BTreeSet::from([name.clone()]),
        Node::Internal { children, length } => {
            let mut union = BTreeSet::new();
            for child in children {
                union.extend(collect_internal_clades(child, false, clades));
            }
            if !is_root {
                clades.push((union.clone(), *length));
            }
            union
        }
    }
}

fn canonical(split: &BTreeSet<String>, all: &BTreeSet<String>) -> BTreeSet<String> {
    let reference = all.iter().next().expect("empty tree");
    if split.contains(reference) {
        all.difference(split).cloned().collect()
    } else {
        split.clone()
    }
}

/// The nontrivial bipartitions of the unrooted tree.
pub fn splits(newick: &str) -> BTreeSet<BTreeSet<String>> {
    split_lengths(newick).into_keys().collect()
}

/// The nontrivial bipartitions together with their branch lengths.
pub fn split_lengths(newick: &str) -> BTreeMap<BTreeSet<String>, f64> {
    let root = parse_newick(newick);
    let mut all = BTreeSet::new();
    leaves_below(&root, &mut all);
    let mut clades = Vec::new();
    collect_internal_clades(&root, true, &mut clades);
    clades
        .into_iter()
        .filter(|(clade, _)| clade.len() >= 2 && clade.len() <= all.len() - 2)
        .map(|(clade, length)| (canonical(&clade, &all), length))
        .collect()
}

/// Branch lengths of the pendant edges, keyed by taxon name.
pub fn leaf_lengths(newick: &str) -> BTreeMap<String, f64> {
    fn walk(node: &Node, out: &mut BTreeMap<String, f64>) {
        match node {
            Node::Leaf { name, length } => {
                out.insert(name.clone(), *length);
            }
            Node::Internal { children, .. } => {
                for child in children {
                    walk(child, out);
                }
            }
        }
    }
    let root = parse_newick(newick);
    let mut out = BTreeMap::new();
    walk(&root, &mut out);
    out
}

/// Sums of branch lengths along the tree path between every pair of leaves.
pub fn path_distances(newick: &str) -> BTreeMap<(String, String), f64> {
    fn descend(node: &Node, pairs: &mut BTreeMap<(String, String), f64>) -> Vec<(String, f64)> {
        match node {
            Node::Leaf { name, .. } => vec![(name.clone(), 0.0)],
            Node::Internal { children, .. } => {
                let lists: Vec<Vec<(String, f64)>> = children
                    .iter()
                    .map(|child| {
                        descend(child, pairs)
                            .into_iter()
                            .map(|(name, distance)| (name, distance + child.length()))
                            .collect()
                    })
                    .collect();
                for i in 0..lists.len() {
                    for j in (i + 1)..lists.len() {
                        for (n1, d1) in &lists[i] {
                            for (n2, d2) in &lists[j] {
                                let key = if n1 < n2 {
                                    (n1.clone(), n2.clone())
                                } else {
                                    (n2.clone(), n1.clone())
                                };
                                pairs.insert(key, d1 + d2);
                            }
                        }
                    }
                }
                lists.concat()
            }
        }
    }
    let root = parse_newick(newick);
    let mut pairs = BTreeMap::new();
    descend(&root, &mut pairs);
    pairs
}

// ---------------------------------------------------------------------------
// Deterministic additive test matrices: pairwise path lengths of a randomly
// grown binary tree with branch lengths in [0.5, 1.5). Every engine must
// recover such a tree exactly, so the three algorithms can be compared
// against each other on inputs of any size.

struct Lcg(u64);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    fn next_index(&mut self, bound: usize) -> usize {
        (self.next_f64() * bound as f64) as usize % bound
    }
}

enum GrownNode {
    Leaf(usize),
    Join {
        left: Box<GrownNode>,
        right: Box<GrownNode>,
        left_length: f64,
        right_length: f64,
    },
}

fn fill_distances(node: &GrownNode, matrix: &mut [Vec<f64>]) -> Vec<(usize, f64)> {
    match node {
        GrownNode::Leaf(index) => vec![(*index, 0.0)],
        GrownNode::Join {
            left,
            right,
            left_length,
            right_length,
        } => {
            let below_left: Vec<(usize, f64)> = fill_distances(left, matrix)
                .into_iter()
                .map(|(i, d)| (i, d + left_length))
                .collect();
            let below_right: Vec<(usize, f64)> = fill_distances(right, matrix)
                .into_iter()
                .map(|(i, d)| (i, d + right_length))
                .collect();
            for (i, di) in &below_left {
                for (j, dj) in &below_right {
                    matrix[*i][*j] = di + dj;
                    matrix[*j][*i] = di + dj;
                }
            }
            let mut all = below_left;
            all.extend(below_right);
            all
        }
    }
}

pub fn random_additive_matrix(n: usize, seed: u64) -> (Vec<String>, Vec<Vec<f64>>) {
    let mut rng = Lcg(seed);
    let mut roots: Vec<GrownNode> = (0..n).map(GrownNode::Leaf).collect();
    while roots.len() > 1 {
        let first = roots.swap_remove(rng.next_index(roots.len()));
        let second = roots.swap_remove(rng.next_index(roots.len()));
        roots.push(GrownNode::Join {
            left: Box::new(first),
            right: Box::new(second),
            left_length: 0.5 + rng.next_f64(),
            right_length: 0.5 + rng.next_f64(),
        });
    }
    let root = roots.pop().expect("empty tree");
    let mut matrix = vec![vec![0.0; n]; n];
    fill_distances(&root, &mut matrix);
    let names = (0..n).map(|i| format!("T{i:02}")).collect();
    (names, matrix)
}

fn build(
    names: &[String],
    distances: &[Vec<f64>],
    algorithm: Algorithm,
    build_fn: BuildFn,
) -> Result<PhyloTree<f64>, NjError> {
    let config = NjConfig::builder().algorithm(algorithm).build();
    let builder = NeighbourJoining::new(names, distances, config);
    build_fn(&builder)
}

fn build_newick(
    names: &[String],
    distances: &[Vec<f64>],
    algorithm: Algorithm,
    build_fn: BuildFn,
) -> String {
    build(names, distances, algorithm, build_fn)
        .unwrap()
        .to_newick()
        .unwrap()
}

fn names_of(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

const ALL_ALGORITHMS: [Algorithm; 3] =
    [Algorithm::Classic, Algorithm::Bionj, Algorithm::RapidBionj];

// ---------------------------------------------------------------------------
// The scenarios, shared between the serial and parallel entry points.

pub fn test_three_taxa(build_fn: BuildFn) {
    let names = names_of(&["A", "B", "C"]);
    let distances = vec![
        vec![0.0, 2.0, 3.0],
        vec![2.0, 0.0, 4.0],
        vec![3.0, 4.0, 0.0],
    ];
    for algorithm in ALL_ALGORITHMS {
        let newick = build_newick(&names, &distances, algorithm, build_fn);
        assert_eq!("(A:0.5,B:1.5,C:2.5);\n", newick);
    }
}

pub fn test_additive_four_taxa(build_fn: BuildFn) {
    // Path lengths of ((A:1,B:2):1,(C:3,D:4):0);
    let names = names_of(&["A", "B", "C", "D"]);
    let distances = vec![
        vec![0.0, 3.0, 5.0, 6.0],
        vec![3.0, 0.0, 6.0, 7.0],
        vec![5.0, 6.0, 0.0, 7.0],
        vec![6.0, 7.0, 7.0, 0.0],
    ];
    for algorithm in ALL_ALGORITHMS {
        let newick = build_newick(&names, &distances, algorithm, build_fn);
        let expected: BTreeSet<BTreeSet<String>> =
            BTreeSet::from([BTreeSet::from([String::from("C"), String::from("D")])]);
        assert_eq!(expected, splits(&newick));
        let recovered = path_distances(&newick);
        for (r, row) in distances.iter().enumerate() {
            for (c, &expected_distance) in row.iter().enumerate().skip(r + 1) {
                let key = (names[r].clone(), names[c].clone());
                let observed = recovered[&key];
                assert!(
                    (observed - expected_distance).abs() <= 1e-9,
                    "path {key:?} was {observed}, expected {expected_distance}"
                );
            }
        }
    }
}

pub fn test_symmetrization_noise(build_fn: BuildFn) {
    let names = names_of(&["A", "B", "C", "D"]);
    let clean = vec![
        vec![0.0, 3.0, 5.0, 6.0],
        vec![3.0, 0.0, 6.0, 7.0],
        vec![5.0, 6.0, 0.0, 7.0],
        vec![6.0, 7.0, 7.0, 0.0],
    ];
    let mut noisy = clean.clone();
    noisy[2][0] += 1e-12;
    noisy[0][2] -= 1e-12;
    noisy[3][1] += 1e-12;
    for algorithm in ALL_ALGORITHMS {
        let from_clean = build_newick(&names, &clean, algorithm, build_fn);
        let mut averaged = clean.clone();
        averaged[3][1] += 0.5e-12;
        averaged[1][3] += 0.5e-12;
        let from_averaged = build_newick(&names, &averaged, algorithm, build_fn);
        let from_noisy = build_newick(&names, &noisy, algorithm, build_fn);
        assert_eq!(from_averaged, from_noisy);
        assert_eq!(splits(&from_clean), splits(&from_noisy));
    }
}

pub fn test_algorithm_agreement(build_fn: BuildFn) {
    let (names, distances) = random_additive_matrix(20, 0x5eed_0001);
    let nj = build_newick(&names, &distances, Algorithm::Classic, build_fn);
    let bionj = build_newick(&names, &distances, Algorithm::Bionj, build_fn);
    let rapid = build_newick(&names, &distances, Algorithm::RapidBionj, build_fn);

    assert_eq!(splits(&nj), splits(&bionj));
    assert_eq!(splits(&bionj), splits(&rapid));

    let bionj_internal = split_lengths(&bionj);
    let rapid_internal = split_lengths(&rapid);
    for (split, length) in &bionj_internal {
        assert!((length - rapid_internal[split]).abs() <= 1e-9);
    }
    let bionj_leaves = leaf_lengths(&bionj);
    let rapid_leaves = leaf_lengths(&rapid);
    for (name, length) in &bionj_leaves {
        assert!((length - rapid_leaves[name]).abs() <= 1e-9);
    }
}

pub fn test_purge_correctness(build_fn: BuildFn) {
    // 50 taxa: the sorted rows are purged when the rank first reaches 33,
    // and again as the purge threshold keeps resetting to two thirds.
    let (names, distances) = random_additive_matrix(50, 0x5eed_0002);
    let bionj = build_newick(&names, &distances, Algorithm::Bionj, build_fn);
    let rapid = build_newick(&names, &distances, Algorithm::RapidBionj, build_fn);
    assert_eq!(splits(&bionj), splits(&rapid));
    let bionj_internal = split_lengths(&bionj);
    let rapid_internal = split_lengths(&rapid);
    for (split, length) in &bionj_internal {
        assert!((length - rapid_internal[split]).abs() <= 1e-9);
    }
}

pub fn test_all_zero_matrix(build_fn: BuildFn) {
    let names = names_of(&["A", "B", "C", "D", "E"]);
    let distances = vec![vec![0.0; 5]; 5];
    for algorithm in ALL_ALGORITHMS {
        let newick = build_newick(&names, &distances, algorithm, build_fn);
        for (_, length) in leaf_lengths(&newick) {
            assert_eq!(0.0, length);
        }
        for (_, length) in split_lengths(&newick) {
            assert_eq!(0.0, length);
        }
    }
}

pub fn test_additive_path_sums(build_fn: BuildFn) {
    let (names, distances) = random_additive_matrix(12, 0x5eed_0003);
    for algorithm in ALL_ALGORITHMS {
        let newick = build_newick(&names, &distances, algorithm, build_fn);
        let recovered = path_distances(&newick);
        for (r, row) in distances.iter().enumerate() {
            for (c, &expected) in row.iter().enumerate().skip(r + 1) {
                let key = (names[r].clone(), names[c].clone());
                let observed = recovered[&key];
                assert!(
                    (observed - expected).abs() <= 1e-9,
                    "path {key:?} was {observed}, expected {expected}"
                );
            }
        }
    }
}

pub fn test_cluster_counts(build_fn: BuildFn) {
    let (names, distances) = random_additive_matrix(7, 0x5eed_0004);
    for algorithm in ALL_ALGORITHMS {
        let tree = build(&names, &distances, algorithm, build_fn).unwrap();
        assert_eq!(2 * 7 - 2, tree.len());
        assert_eq!(7, tree.n_leaves());
        assert_eq!(5, tree.n_internal());
    }
}

pub fn test_newick_round_trip(build_fn: BuildFn) {
    let (names, distances) = random_additive_matrix(9, 0x5eed_0005);
    for algorithm in ALL_ALGORITHMS {
        let first = build_newick(&names, &distances, algorithm, build_fn);
        let reparsed = parse_newick(&first);
        let mut observed = BTreeSet::new();
        leaves_below(&reparsed, &mut observed);
        assert_eq!(names.iter().cloned().collect::<BTreeSet<_>>(), observed);
        // Writing the same tree again must give the same text.
        let second = build_newick(&names, &distances, algorithm, build_fn);
        assert_eq!(first, second);
    }
}

pub fn test_too_few_taxa(build_fn: BuildFn) {
    let names = names_of(&["A", "B"]);
    let distances = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
    let builder = NeighbourJoining::default_config(&names, &distances);
    let result = build_fn(&builder);
    assert!(matches!(result, Err(NjError::TooFewTaxa(2))));
}

pub fn test_mismatched_matrix(build_fn: BuildFn) {
    let names = names_of(&["A", "B", "C"]);
    let distances = vec![vec![0.0, 2.0, 3.0], vec![2.0, 0.0, 4.0]];
    let builder = NeighbourJoining::default_config(&names, &distances);
    let result = build_fn(&builder);
    assert!(matches!(result, Err(NjError::InputFormat(..))));
}
