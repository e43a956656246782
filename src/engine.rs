use num_traits::Float;

pub(crate) mod bionj;
pub(crate) mod classic;
pub(crate) mod rapid;

/// A position (row, column) in the distance matrix together with the
/// Q-criterion value found there. By convention the column is always less
/// than the row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Position<T> {
    pub(crate) row: usize,
    pub(crate) column: usize,
    pub(crate) value: T,
}

impl<T: Float> Position<T> {
    pub(crate) fn infinite(row: usize) -> Self {
        Position {
            row,
            column: 0,
            value: T::infinity(),
        }
    }

    /// Lexicographic comparison on (value, row, column). Joins must be
    /// deterministic across runs and thread counts, so value ties are broken
    /// by the smallest row, then the smallest column.
    pub(crate) fn better_than(&self, other: &Position<T>) -> bool {
        if self.value != other.value {
            return self.value < other.value;
        }
        (self.row, self.column) < (other.row, other.column)
    }
}

/// `1 / (n - 2)`, the factor applied to row totals in the Q-criterion;
/// zero for ranks too small to scale.
pub(crate) fn t_multiplier<T: Float>(n: usize) -> T {
    if n <= 2 {
        T::zero()
    } else {
        T::one() / flt(n - 2)
    }
}

pub(crate) fn half<T: Float>() -> T {
    T::from(0.5).expect("Invalid float constant")
}

pub(crate) fn flt<T: Float>(value: usize) -> T {
    T::from(value).expect("Matrix rank out of float range")
}
