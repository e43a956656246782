// Defaults for parameters
const ALGORITHM_DEFAULT: Algorithm = Algorithm::Bionj;
const ROW_TOTAL_REFRESH_DEFAULT: usize = usize::MAX; // Set to a value that will never be triggered

// Valid minimums/left bounds of parameters
const ROW_TOTAL_REFRESH_MINIMUM: usize = 1;

/// The joining algorithm options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Classical neighbour joining. Picks the pair minimizing the
    /// Q-criterion and reduces the two rows with equal weights.
    Classic,
    /// Neighbour joining with a matrix of variance estimates, used to pick
    /// a weighted combination of the two joined rows at each reduction.
    Bionj,
    /// BIONJ accelerated RapidNJ-style: every row of the distance matrix is
    /// kept sorted in an auxiliary matrix, so each row scan can stop at an
    /// admissible bound instead of walking the whole row.
    RapidBionj,
}

/// A wrapper around the configuration used by the neighbour joining engines.
/// Only use if you want to tune the run. Otherwise use
/// `NeighbourJoining::default_config()` to instantiate with defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct NjConfig {
    pub(crate) algorithm: Algorithm,
    pub(crate) row_total_refresh: usize,
}

/// Builder object to set custom configuration values.
pub struct NjConfigBuilder {
    algorithm: Option<Algorithm>,
    row_total_refresh: Option<usize>,
}

impl NjConfig {
    pub(crate) fn default() -> Self {
        Self::builder().build()
    }

    /// Enters the builder pattern, allowing custom configuration values to
    /// be set using the various setter methods.
    ///
    /// # Returns
    /// * the configuration builder
    pub fn builder() -> NjConfigBuilder {
        NjConfigBuilder {
            algorithm: None,
            row_total_refresh: None,
        }
    }
}

impl NjConfigBuilder {
    /// Sets the joining algorithm. All three algorithms produce an unrooted
    /// binary tree; `Bionj` and `RapidBionj` produce identical trees, with
    /// `RapidBionj` trading memory for speed on larger matrices.
    /// Defaults to `Bionj`.
    ///
    /// # Parameters
    /// * algorithm - the joining algorithm
    ///
    /// # Returns
    /// * the configuration builder
    pub fn algorithm(mut self, algorithm: Algorithm) -> NjConfigBuilder {
        self.algorithm = Some(algorithm);
        self
    }

    /// Sets the row-total refresh interval - every this many joins, the
    /// cached row totals are recomputed from the distance matrix to shed
    /// accumulated rounding error. The incremental total maintenance is
    /// accurate to well below branch-length precision for typical inputs,
    /// so by default no refresh is performed.
    ///
    /// # Parameters
    /// * interval - the number of joins between refreshes
    ///
    /// # Returns
    /// * the configuration builder
    pub fn row_total_refresh(mut self, interval: usize) -> NjConfigBuilder {
        let valid_interval = NjConfigBuilder::validate_input_left_bound(
            interval,
            ROW_TOTAL_REFRESH_MINIMUM,
            "row_total_refresh",
        );
        self.row_total_refresh = Some(valid_interval);
        self
    }

    /// Finishes the building of the configuration. A call to this method is
    /// required to exit the builder pattern and complete the construction.
    ///
    /// # Returns
    /// * The completed configuration.
    pub fn build(self) -> NjConfig {
        NjConfig {
            algorithm: self.algorithm.unwrap_or(ALGORITHM_DEFAULT),
            row_total_refresh: self.row_total_refresh.unwrap_or(ROW_TOTAL_REFRESH_DEFAULT),
        }
    }

    fn validate_input_left_bound(input_param: usize, left_bound: usize, param: &str) -> usize {
        if input_param < left_bound {
            log::warn!("{param} ({input_param}) cannot be lower than {left_bound}. Set to {left_bound}.");
            left_bound
        } else {
            input_param
        }
    }
}
