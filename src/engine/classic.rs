use crate::engine::{flt, half, t_multiplier, Position};
use crate::matrix::SquareMatrix;
use crate::tree::{ClusterId, PhyloTree};
use num_traits::Float;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Classical neighbour joining over a shrinking distance matrix.
///
/// Also the shared core of the BIONJ engines: it owns the distance matrix,
/// the mapping from live rows to cluster ids and the growing forest, and the
/// derived engines reuse its scan, bookkeeping and termination steps.
pub(crate) struct NjEngine<T> {
    pub(crate) d: SquareMatrix<T>,
    pub(crate) row_to_cluster: Vec<ClusterId>,
    pub(crate) forest: PhyloTree<T>,
    pub(crate) row_minima: Vec<Position<T>>,
    pub(crate) scaled_totals: Vec<T>,
    refresh_interval: usize,
    joins_since_refresh: usize,
}

impl<T: Float + Send + Sync> NjEngine<T> {
    /// Builds the engine state from named taxa and their pairwise distances.
    /// The matrix is symmetrized on construction by averaging each pair of
    /// mirrored entries, and the row totals are computed once.
    pub(crate) fn new(names: &[String], distances: &[Vec<T>], refresh_interval: usize) -> Self {
        let n = names.len();
        let mut d = SquareMatrix::with_rank(n);
        for (row, source) in d.rows.iter_mut().zip(distances.iter()) {
            row.copy_from_slice(source);
        }
        for r in 0..n {
            for c in 0..r {
                let mean = (d.rows[r][c] + d.rows[c][r]) * half();
                d.rows[r][c] = mean;
                d.rows[c][r] = mean;
            }
        }
        d.recompute_row_totals();

        let mut forest = PhyloTree::with_capacity(n);
        for name in names {
            forest.add_leaf(name.clone());
        }
        NjEngine {
            d,
            row_to_cluster: (0..n as ClusterId).collect(),
            forest,
            row_minima: Vec::with_capacity(n),
            scaled_totals: vec![T::zero(); n],
            refresh_interval,
            joins_since_refresh: 0,
        }
    }

    fn scale_totals(&mut self) {
        let n = self.d.n;
        let multiplier = t_multiplier::<T>(n);
        for r in 0..n {
            self.scaled_totals[r] = self.d.row_totals[r] * multiplier;
        }
    }

    #[cfg(feature = "parallel")]
    fn scale_totals_par(&mut self) {
        let n = self.d.n;
        let multiplier = t_multiplier::<T>(n);
        let totals = &self.d.row_totals;
        self.scaled_totals[..n]
            .par_iter_mut()
            .enumerate()
            .for_each(|(r, scaled)| *scaled = totals[r] * multiplier);
    }

    /// The minimum of `Q[row][col] = D[row][col] - t[row] - t[col]` over
    /// columns below `row`, ties to the smallest column. Rather than
    /// dividing distances by (n - 2) repeatedly it works with pre-scaled row
    /// totals; `t[row]` is constant within the row so it is subtracted once
    /// at the end.
    fn row_minimum(&self, row: usize) -> Position<T> {
        let tot = &self.scaled_totals;
        let mut pos = Position {
            row,
            column: 0,
            value: T::infinity(),
        };
        for (col, &distance) in self.d.rows[row][..row].iter().enumerate() {
            let value = distance - tot[col];
            if value < pos.value {
                pos.column = col;
                pos.value = value;
            }
        }
        pos.value = pos.value - tot[row];
        pos
    }

    /// Fills `row_minima` with each row's Q-minimum. Row 0 has no columns
    /// below it and gets an infinite placeholder.
    pub(crate) fn row_minima(&mut self) {
        let n = self.d.n;
        self.scale_totals();
        self.row_minima.clear();
        self.row_minima.push(Position::infinite(0));
        for row in 1..n {
            let pos = self.row_minimum(row);
            self.row_minima.push(pos);
        }
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn row_minima_par(&mut self) {
        let n = self.d.n;
        self.scale_totals_par();
        let minima: Vec<Position<T>> = (1..n)
            .into_par_iter()
            .map(|row| self.row_minimum(row))
            .collect();
        self.row_minima.clear();
        self.row_minima.push(Position::infinite(0));
        self.row_minima.extend(minima);
    }

    /// Reduces the per-row minima to the global best, lexicographically on
    /// (value, row, column) so that ties resolve the same way regardless of
    /// scan order or thread count.
    pub(crate) fn best_entry(&self) -> Position<T> {
        let mut best = Position::infinite(0);
        for pos in &self.row_minima {
            if pos.better_than(&best) {
                best = *pos;
            }
        }
        best
    }

    /// Branch lengths from the joined rows to the new internal node.
    pub(crate) fn branch_lengths(&self, a: usize, b: usize) -> (T, T) {
        let n = self.d.n;
        let multiplier = if n < 3 {
            T::zero()
        } else {
            half::<T>() / flt(n - 2)
        };
        let median = half::<T>() * self.d.rows[a][b];
        let fudge = (self.d.row_totals[a] - self.d.row_totals[b]) * multiplier;
        (median + fudge, median - fudge)
    }

    /// Joins rows `a` and `b` (with `a < b`) by the classical NJ reduction:
    /// the new node's row replaces row `a` as the equal-weight combination
    /// of the two old rows, and row `b` is swapped out. Row totals are
    /// adjusted on the fly.
    pub(crate) fn join(&mut self, a: usize, b: usize) {
        let n = self.d.n;
        let (a_length, b_length) = self.branch_lengths(a, b);
        let lambda = half::<T>();
        let mu = T::one() - lambda;
        let correction = -(lambda * a_length) - mu * b_length;
        for i in 0..n {
            if i == a || i == b {
                continue;
            }
            let d_ai = self.d.rows[a][i];
            let d_bi = self.d.rows[b][i];
            let d_ci = lambda * d_ai + mu * d_bi + correction;
            self.d.rows[a][i] = d_ci;
            self.d.rows[i][a] = d_ci;
            self.d.row_totals[i] = self.d.row_totals[i] + d_ci - d_ai - d_bi;
            self.d.row_totals[a] = self.d.row_totals[a] + d_ci - d_ai;
        }
        // The b column is about to vanish from a's row.
        self.d.row_totals[a] = self.d.row_totals[a] - self.d.rows[a][b];
        self.append_join(a, b, a_length, b_length);
    }

    /// Records the join in the forest and removes row `b` from view. Shared
    /// by every engine's reduction step.
    pub(crate) fn append_join(&mut self, a: usize, b: usize, a_length: T, b_length: T) {
        let n = self.d.n;
        let new_id = self.forest.join2(
            self.row_to_cluster[a],
            a_length,
            self.row_to_cluster[b],
            b_length,
        );
        self.row_to_cluster[a] = new_id;
        self.row_to_cluster[b] = self.row_to_cluster[n - 1];
        self.d.remove_row(b);
    }

    /// Closes the unrooted tree from the three remaining rows.
    pub(crate) fn finish(&mut self) {
        let h = half::<T>();
        let d01 = h * self.d.rows[0][1];
        let d02 = h * self.d.rows[0][2];
        let d12 = h * self.d.rows[1][2];
        self.forest.join3(
            self.row_to_cluster[0],
            d01 + d02 - d12,
            self.row_to_cluster[1],
            d01 + d12 - d02,
            self.row_to_cluster[2],
            d02 + d12 - d01,
        );
        self.d.n = 0;
    }

    /// Counts a completed join and recomputes the row totals from scratch
    /// whenever the configured interval elapses. Returns whether a refresh
    /// happened, so engines with derived caches can resynchronize.
    pub(crate) fn maybe_refresh(&mut self) -> bool {
        self.joins_since_refresh += 1;
        if self.joins_since_refresh >= self.refresh_interval {
            self.d.recompute_row_totals();
            self.joins_since_refresh = 0;
            return true;
        }
        false
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn maybe_refresh_par(&mut self) -> bool {
        self.joins_since_refresh += 1;
        if self.joins_since_refresh >= self.refresh_interval {
            self.d.recompute_row_totals_par();
            self.joins_since_refresh = 0;
            return true;
        }
        false
    }

    pub(crate) fn run(mut self) -> PhyloTree<T> {
        while self.d.n > 3 {
            self.row_minima();
            let best = self.best_entry();
            self.join(best.column, best.row);
            self.maybe_refresh();
        }
        self.finish();
        self.forest
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn run_par(mut self) -> PhyloTree<T> {
        while self.d.n > 3 {
            self.row_minima_par();
            let best = self.best_entry();
            self.join(best.column, best.row);
            self.maybe_refresh_par();
        }
        self.finish();
        self.forest
    }
}
