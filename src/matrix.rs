use num_traits::Float;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A dense square matrix of floating point values with a cached total per
/// row. Used for the distance matrix and, in BIONJ, for the matrix of
/// variance estimates.
///
/// The matrix shrinks by one rank per join via [`SquareMatrix::remove_row`],
/// which swaps the removed row and column with the last live ones rather
/// than reallocating. Rows stay contiguous; entries at indices >= `n` are
/// out of view, not erased. Diagonal entries are never consulted by the
/// joining engines, so writes landing on the diagonal are permitted.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SquareMatrix<T> {
    /// The live rank. Only the leading `n`x`n` block is meaningful.
    pub(crate) n: usize,
    pub(crate) rows: Vec<Vec<T>>,
    pub(crate) row_totals: Vec<T>,
}

impl<T: Float + Send + Sync> SquareMatrix<T> {
    pub(crate) fn with_rank(rank: usize) -> Self {
        SquareMatrix {
            n: rank,
            rows: vec![vec![T::zero(); rank]; rank],
            row_totals: vec![T::zero(); rank],
        }
    }

    /// Removes row and column `k` by overwriting them with the last live row
    /// and column, then shrinking the rank. Symmetry of the live block is
    /// preserved because the last row and column are the ones dropped out of
    /// view.
    pub(crate) fn remove_row(&mut self, k: usize) {
        let last = self.n - 1;
        for r in 0..self.n {
            self.rows[r][k] = self.rows[r][last];
        }
        self.rows.swap(k, last);
        self.row_totals[k] = self.row_totals[last];
        self.n -= 1;
    }

    /// Recomputes every row total from the live block. The engines maintain
    /// totals incrementally; this exists to shed accumulated rounding error
    /// when a caller asks for a periodic refresh.
    pub(crate) fn recompute_row_totals(&mut self) {
        for r in 0..self.n {
            self.row_totals[r] = self.row_total_of(r);
        }
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn recompute_row_totals_par(&mut self) {
        let n = self.n;
        let rows = &self.rows;
        self.row_totals[..n]
            .par_iter_mut()
            .enumerate()
            .for_each(|(r, total)| {
                let row = &rows[r][..n];
                let mut sum = T::zero();
                for (c, &value) in row.iter().enumerate() {
                    if c != r {
                        sum = sum + value;
                    }
                }
                *total = sum;
            });
    }

    fn row_total_of(&self, r: usize) -> T {
        let mut total = T::zero();
        for c in 0..self.n {
            if c != r {
                total = total + self.rows[r][c];
            }
        }
        total
    }
}
