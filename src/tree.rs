use crate::error::NjError;
use crate::newick;
use num_traits::Float;
use std::io::Write;

/// Dense identifier of a cluster in the forest arena. The arena only ever
/// appends, so an id stays valid for the life of the tree.
pub(crate) type ClusterId = u32;

/// A link from an internal node down to the cluster it joined, together
/// with the length of the connecting branch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Link<T> {
    pub(crate) child: ClusterId,
    pub(crate) length: T,
}

/// A node in the growing forest: either a taxon read from the input, or an
/// internal node created by a join. The terminal three-way join that closes
/// the unrooted tree is the only internal node with three links.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cluster<T> {
    Leaf { name: String },
    Internal { links: Vec<Link<T>> },
}

/// An unrooted phylogenetic tree over the input taxa, produced by one of
/// the joining engines. Internally an append-only arena of clusters; the
/// last cluster appended is the three-way root of the unrooted tree.
#[derive(Debug, Clone, PartialEq)]
pub struct PhyloTree<T> {
    pub(crate) clusters: Vec<Cluster<T>>,
}

impl<T: Float> PhyloTree<T> {
    pub(crate) fn with_capacity(n_taxa: usize) -> Self {
        // N leaves plus N - 2 joins.
        PhyloTree {
            clusters: Vec::with_capacity(2 * n_taxa),
        }
    }

    pub(crate) fn add_leaf(&mut self, name: String) -> ClusterId {
        self.clusters.push(Cluster::Leaf { name });
        (self.clusters.len() - 1) as ClusterId
    }

    pub(crate) fn join2(
        &mut self,
        a: ClusterId,
        a_length: T,
        b: ClusterId,
        b_length: T,
    ) -> ClusterId {
        self.clusters.push(Cluster::Internal {
            links: vec![
                Link {
                    child: a,
                    length: a_length,
                },
                Link {
                    child: b,
                    length: b_length,
                },
            ],
        });
        (self.clusters.len() - 1) as ClusterId
    }

    pub(crate) fn join3(
        &mut self,
        a: ClusterId,
        a_length: T,
        b: ClusterId,
        b_length: T,
        c: ClusterId,
        c_length: T,
    ) -> ClusterId {
        self.clusters.push(Cluster::Internal {
            links: vec![
                Link {
                    child: a,
                    length: a_length,
                },
                Link {
                    child: b,
                    length: b_length,
                },
                Link {
                    child: c,
                    length: c_length,
                },
            ],
        });
        (self.clusters.len() - 1) as ClusterId
    }

    /// The total number of clusters: leaves plus internal joins.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// The number of taxa in the tree.
    pub fn n_leaves(&self) -> usize {
        self.clusters
            .iter()
            .filter(|cluster| matches!(cluster, Cluster::Leaf { .. }))
            .count()
    }

    /// The number of internal nodes in the tree.
    pub fn n_internal(&self) -> usize {
        self.clusters.len() - self.n_leaves()
    }

    /// Serializes the tree to a Newick expression, terminated by `;` and a
    /// newline. Branch lengths are written with 8 significant digits.
    ///
    /// # Returns
    /// * A result that, if successful, contains the Newick string. An error
    ///   is returned only if the cluster arena contains a cycle, which
    ///   indicates a bug in the joining engines.
    pub fn to_newick(&self) -> Result<String, NjError> {
        let mut buffer = Vec::new();
        self.write_newick(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|_| NjError::InternalInvariant(String::from("non-UTF8 newick output")))
    }

    /// Serializes the tree as a Newick expression into `out`.
    pub fn write_newick<W: Write>(&self, out: &mut W) -> Result<(), NjError> {
        newick::write_tree(self, out)
    }
}
