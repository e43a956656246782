use crate::config::{Algorithm, NjConfig};
use crate::engine::bionj::BionjEngine;
use crate::engine::classic::NjEngine;
use crate::engine::rapid::RapidBionjEngine;
use crate::error::NjError;
use crate::tree::PhyloTree;
use crate::validation::InputValidator;
use num_traits::Float;

/// Distance-based phylogenetic tree construction in Rust. Generic over
/// floating point numeric types.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighbourJoining<'a, T> {
    names: &'a [String],
    distances: &'a [Vec<T>],
    config: NjConfig,
}

impl<'a, T: Float + Send + Sync> NeighbourJoining<'a, T> {
    /// Creates an instance of the tree builder using a custom configuration.
    ///
    /// # Parameters
    /// * `names` - one name per taxon, in matrix order.
    /// * `distances` - the square matrix of pairwise distances between the
    ///                 taxa. It should be symmetric; mirrored entries that
    ///                 disagree (for example by parsing noise) are averaged.
    /// * `config` - the configuration.
    ///
    /// # Returns
    /// * The tree builder instance.
    ///
    /// # Examples
    /// ```
    ///use bionj::{Algorithm, NeighbourJoining, NjConfig};
    ///
    ///let names: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
    ///let distances = vec![
    ///    vec![0.0, 3.0, 5.0, 6.0],
    ///    vec![3.0, 0.0, 6.0, 7.0],
    ///    vec![5.0, 6.0, 0.0, 7.0],
    ///    vec![6.0, 7.0, 7.0, 0.0],
    ///];
    ///let config = NjConfig::builder().algorithm(Algorithm::RapidBionj).build();
    ///let builder = NeighbourJoining::new(&names, &distances, config);
    /// ```
    pub fn new(names: &'a [String], distances: &'a [Vec<T>], config: NjConfig) -> Self {
        NeighbourJoining {
            names,
            distances,
            config,
        }
    }

    /// Creates an instance of the tree builder using the default
    /// configuration (the BIONJ algorithm).
    ///
    /// # Parameters
    /// * `names` - one name per taxon, in matrix order.
    /// * `distances` - the square matrix of pairwise distances.
    ///
    /// # Returns
    /// * The tree builder instance.
    ///
    /// # Examples
    /// ```
    ///use bionj::NeighbourJoining;
    ///
    ///let names: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
    ///let distances = vec![
    ///    vec![0.0, 2.0, 3.0],
    ///    vec![2.0, 0.0, 4.0],
    ///    vec![3.0, 4.0, 0.0],
    ///];
    ///let builder = NeighbourJoining::default_config(&names, &distances);
    ///let tree = builder.build_tree().unwrap();
    ///assert_eq!("(A:0.5,B:1.5,C:2.5);\n", tree.to_newick().unwrap());
    /// ```
    pub fn default_config(names: &'a [String], distances: &'a [Vec<T>]) -> Self {
        NeighbourJoining::new(names, distances, NjConfig::default())
    }

    /// Builds the unrooted tree by iteratively joining the closest pair of
    /// clusters under the Q-criterion until three remain, then closing the
    /// tree with a single three-way join.
    ///
    /// # Returns
    /// * A result that, if successful, contains the finished tree. An error
    ///   is returned if fewer than three taxa were supplied, if the matrix
    ///   is not square over the taxa, or if it contains non-finite values.
    #[cfg(feature = "serial")]
    pub fn build_tree(&self) -> Result<PhyloTree<T>, NjError> {
        self.validate_input_data()?;
        let refresh = self.config.row_total_refresh;
        let tree = match self.config.algorithm {
            Algorithm::Classic => NjEngine::new(self.names, self.distances, refresh).run(),
            Algorithm::Bionj => BionjEngine::new(self.names, self.distances, refresh).run(),
            Algorithm::RapidBionj => {
                RapidBionjEngine::new(self.names, self.distances, refresh).run()
            }
        };
        Ok(tree)
    }

    /// As [`NeighbourJoining::build_tree`], with the row-minimum scans (and
    /// the other embarrassingly parallel passes) spread across the rayon
    /// thread pool. Produces the identical tree: ties between candidate
    /// joins are broken lexicographically, not by scan completion order.
    #[cfg(feature = "parallel")]
    pub fn build_tree_par(&self) -> Result<PhyloTree<T>, NjError> {
        self.validate_input_data()?;
        let refresh = self.config.row_total_refresh;
        let tree = match self.config.algorithm {
            Algorithm::Classic => NjEngine::new(self.names, self.distances, refresh).run_par(),
            Algorithm::Bionj => BionjEngine::new(self.names, self.distances, refresh).run_par(),
            Algorithm::RapidBionj => {
                RapidBionjEngine::new(self.names, self.distances, refresh).run_par()
            }
        };
        Ok(tree)
    }

    fn validate_input_data(&self) -> Result<(), NjError> {
        InputValidator::new(self.names, self.distances).validate_input_data()
    }
}
