use crate::engine::classic::NjEngine;
use crate::engine::{flt, half};
use crate::matrix::SquareMatrix;
use crate::tree::PhyloTree;
use num_traits::Float;

/// BIONJ: neighbour joining with a matrix of variance estimates.
///
/// The variance matrix starts as a copy of the distance matrix and is
/// reduced alongside it. At each join it determines the weighting `lambda`
/// of the two old rows in the replacement row, instead of NJ's fixed
/// equal weights.
pub(crate) struct BionjEngine<T> {
    pub(crate) core: NjEngine<T>,
    pub(crate) variance: SquareMatrix<T>,
}

impl<T: Float + Send + Sync> BionjEngine<T> {
    pub(crate) fn new(names: &[String], distances: &[Vec<T>], refresh_interval: usize) -> Self {
        let core = NjEngine::new(names, distances, refresh_interval);
        let variance = core.d.clone();
        BionjEngine { core, variance }
    }

    /// The weighting of row `a` in the reduced row, from Gascuel's
    /// first-order variance model, clamped to [0, 1]. A zero pair variance
    /// degenerates to the NJ equal weighting.
    fn choose_lambda(&self, a: usize, b: usize, v_ab: T) -> T {
        if v_ab == T::zero() {
            return half();
        }
        let n = self.core.d.n;
        let mut sum = T::zero();
        for i in 0..n {
            if i != a && i != b {
                sum = sum + self.variance.rows[b][i] - self.variance.rows[a][i];
            }
        }
        let two = T::one() + T::one();
        let lambda = half::<T>() + sum / (two * flt::<T>(n - 2) * v_ab);
        lambda.max(T::zero()).min(T::one())
    }

    /// Joins rows `a` and `b` (with `a < b`), reducing the distance and
    /// variance matrices together with the lambda-weighted combination.
    pub(crate) fn join(&mut self, a: usize, b: usize) {
        let n = self.core.d.n;
        let (a_length, b_length) = self.core.branch_lengths(a, b);
        let v_ab = self.variance.rows[b][a];
        let lambda = self.choose_lambda(a, b, v_ab);
        let mu = T::one() - lambda;
        let d_correction = -(lambda * a_length) - mu * b_length;
        let v_correction = -(lambda * mu) * v_ab;
        for i in 0..n {
            if i == a || i == b {
                continue;
            }
            let d_ai = self.core.d.rows[a][i];
            let d_bi = self.core.d.rows[b][i];
            let d_ci = lambda * d_ai + mu * d_bi + d_correction;
            self.core.d.rows[a][i] = d_ci;
            self.core.d.rows[i][a] = d_ci;
            self.core.d.row_totals[i] = self.core.d.row_totals[i] + d_ci - d_ai - d_bi;

            let v_ci =
                lambda * self.variance.rows[a][i] + mu * self.variance.rows[b][i] + v_correction;
            self.variance.rows[a][i] = v_ci;
            self.variance.rows[i][a] = v_ci;
        }
        // The a-row was rewritten with per-column corrections, so its total
        // is rebuilt from the row rather than adjusted incrementally.
        let mut replacement_total = T::zero();
        for i in 0..n {
            if i != a && i != b {
                replacement_total = replacement_total + self.core.d.rows[a][i];
            }
        }
        self.core.d.row_totals[a] = replacement_total;
        self.core.append_join(a, b, a_length, b_length);
        self.variance.remove_row(b);
    }

    pub(crate) fn run(mut self) -> PhyloTree<T> {
        while self.core.d.n > 3 {
            self.core.row_minima();
            let best = self.core.best_entry();
            self.join(best.column, best.row);
            self.core.maybe_refresh();
        }
        self.core.finish();
        self.core.forest
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn run_par(mut self) -> PhyloTree<T> {
        while self.core.d.n > 3 {
            self.core.row_minima_par();
            let best = self.core.best_entry();
            self.join(best.column, best.row);
            self.core.maybe_refresh_par();
        }
        self.core.finish();
        self.core.forest
    }
}
