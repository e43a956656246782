use crate::engine::bionj::BionjEngine;
use crate::engine::{t_multiplier, Position};
use crate::matrix::SquareMatrix;
use crate::sort::mirrored_heapsort;
use crate::tree::{ClusterId, PhyloTree};
use num_traits::Float;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "parallel")]
use std::sync::Mutex;

/// BIONJ accelerated RapidNJ-style.
///
/// Alongside the distance matrix it keeps, per row, the same distances
/// sorted ascending (`sorted_entries`) with the owning cluster ids in the
/// matching permutation (`entry_clusters`). A row scan walks the sorted
/// entries and stops as soon as no remaining entry can beat the best
/// Q-value seen so far. Entries belonging to clusters that a join has
/// consumed go stale in place; their `-inf` cluster totals push their
/// Q-values above any live candidate until a periodic purge compacts them
/// away.
pub(crate) struct RapidBionjEngine<T> {
    bionj: BionjEngine<T>,
    /// Maps every cluster ever created to its current row; -1 once a join
    /// has consumed it.
    cluster_to_row: Vec<isize>,
    /// Row totals indexed by cluster id rather than row; -inf for dead
    /// clusters.
    cluster_totals: Vec<T>,
    scaled_cluster_totals: Vec<T>,
    row_order_chosen: Vec<bool>,
    row_scan_order: Vec<usize>,
    sorted_entries: Vec<Vec<T>>,
    entry_clusters: Vec<Vec<ClusterId>>,
    operation_count: u64,
}

/// Copies row `r` of the distance matrix, minus its diagonal entry, into
/// `values`, writes the matching cluster ids into `ids`, terminates both
/// with a sentinel and sorts them together ascending by distance.
fn sort_row_into<T: Float>(
    d: &SquareMatrix<T>,
    row_to_cluster: &[ClusterId],
    r: usize,
    values: &mut [T],
    ids: &mut [ClusterId],
) {
    let mut w = 0;
    for i in 0..d.n {
        values[w] = d.rows[r][i];
        ids[w] = row_to_cluster[i];
        if i != r {
            w += 1;
        }
    }
    values[w] = T::infinity();
    ids[w] = 0;
    mirrored_heapsort(&mut values[..w], &mut ids[..w]);
}

/// Compacts one sorted row in place, dropping entries whose cluster has
/// been consumed. Stops at (and keeps) the sentinel; the surviving prefix
/// stays ascending because no reordering happens.
fn purge_row_in_place<T: Float>(values: &mut [T], ids: &mut [ClusterId], cluster_to_row: &[isize]) {
    let mut w = 0;
    let mut i = 0;
    loop {
        let value = values[i];
        let id = ids[i];
        values[w] = value;
        ids[w] = id;
        if T::infinity() <= value {
            break;
        }
        if cluster_to_row[id as usize] >= 0 {
            w += 1;
        }
        i += 1;
    }
}

impl<T: Float + Send + Sync> RapidBionjEngine<T> {
    pub(crate) fn new(names: &[String], distances: &[Vec<T>], refresh_interval: usize) -> Self {
        RapidBionjEngine {
            bionj: BionjEngine::new(names, distances, refresh_interval),
            cluster_to_row: Vec::new(),
            cluster_totals: Vec::new(),
            scaled_cluster_totals: Vec::new(),
            row_order_chosen: Vec::new(),
            row_scan_order: Vec::new(),
            sorted_entries: Vec::new(),
            entry_clusters: Vec::new(),
            operation_count: 0,
        }
    }

    fn allocate(&mut self) {
        let n = self.bionj.core.d.n;
        self.cluster_to_row = (0..n).map(|r| r as isize).collect();
        self.cluster_totals = self.bionj.core.d.row_totals[..n].to_vec();
        self.scaled_cluster_totals = vec![T::zero(); n];
        self.row_order_chosen = vec![false; n];
        self.row_scan_order = vec![0; n];
        self.sorted_entries = vec![vec![T::zero(); n]; n];
        self.entry_clusters = vec![vec![0; n]; n];
    }

    fn prepare(&mut self) {
        self.allocate();
        for r in 0..self.bionj.core.d.n {
            self.sort_row(r);
        }
    }

    #[cfg(feature = "parallel")]
    fn prepare_par(&mut self) {
        self.allocate();
        let d = &self.bionj.core.d;
        let map = &self.bionj.core.row_to_cluster;
        self.sorted_entries
            .par_iter_mut()
            .zip(self.entry_clusters.par_iter_mut())
            .enumerate()
            .for_each(|(r, (values, ids))| sort_row_into(d, map, r, values, ids));
    }

    fn sort_row(&mut self, r: usize) {
        sort_row_into(
            &self.bionj.core.d,
            &self.bionj.core.row_to_cluster,
            r,
            &mut self.sorted_entries[r],
            &mut self.entry_clusters[r],
        );
    }

    /// Rescales the per-cluster totals by `1 / (n - 2)` and returns the
    /// largest scaled total among live clusters, the `M` of the admissible
    /// bound.
    fn refresh_scaled_cluster_totals(&mut self) -> T {
        let n = self.bionj.core.d.n;
        let count = self.cluster_totals.len();
        let multiplier = t_multiplier::<T>(n);
        let mut max_tot = T::zero();
        self.scaled_cluster_totals.resize(count, T::zero());
        for id in 0..count {
            self.scaled_cluster_totals[id] = self.cluster_totals[id] * multiplier;
            if self.cluster_to_row[id] >= 0 && max_tot < self.scaled_cluster_totals[id] {
                max_tot = self.scaled_cluster_totals[id];
            }
        }
        max_tot
    }

    /// Rigs the order in which rows are scanned, putting the rows involved
    /// in the smallest minima of the previous iteration first. They are the
    /// most likely to produce the new global minimum, which tightens the
    /// shared bound early and lets later rows stop sooner.
    fn decide_row_scan_order(&mut self) {
        let n = self.bionj.core.d.n;
        self.bionj
            .core
            .row_minima
            .sort_by(|a, b| a.value.partial_cmp(&b.value).expect("Invalid float"));
        for chosen in self.row_order_chosen.iter_mut() {
            *chosen = false;
        }
        let mut w = 0;
        for pos in &self.bionj.core.row_minima {
            if !(pos.value < T::infinity()) {
                break;
            }
            for index in [pos.row, pos.column] {
                if index < n && !self.row_order_chosen[index] {
                    self.row_scan_order[w] = index;
                    w += 1;
                }
                self.row_order_chosen[index] = true;
            }
        }
        for r in 0..n {
            if !self.row_order_chosen[r] {
                self.row_scan_order[w] = r;
                w += 1;
            }
        }
        debug_assert_eq!(n, w);
    }

    /// Walks the sorted entries of `row` until the admissible bound
    /// `q_best + max_tot + t_row` says no later entry can improve on the
    /// best Q-value known. Entries of consumed clusters either fail the
    /// Q test outright (their totals are -inf) or are skipped by the
    /// liveness lookup. Returns the row's minimum, normalized so that
    /// column < row, and the number of entries examined.
    fn row_minimum_bounded(&self, row: usize, max_tot: T, mut q_best: T) -> (Position<T>, u64) {
        let n = self.bionj.core.d.n;
        let multiplier = t_multiplier::<T>(n);
        let tot = &self.scaled_cluster_totals;
        let row_total = self.bionj.core.d.row_totals[row] * multiplier;
        let mut bound = q_best + max_tot + row_total;
        let mut pos = Position::infinite(row);
        let values = &self.sorted_entries[row];
        let ids = &self.entry_clusters[row];
        let mut visited: u64 = 0;
        for (i, &distance) in values.iter().enumerate() {
            if !(distance < bound) {
                break;
            }
            visited = i as u64 + 1;
            let cluster = ids[i] as usize;
            let q = distance - tot[cluster] - row_total;
            if q < pos.value {
                let other_row = self.cluster_to_row[cluster];
                if other_row >= 0 {
                    let other_row = other_row as usize;
                    pos.column = other_row.min(row);
                    pos.row = other_row.max(row);
                    pos.value = q;
                    if q < q_best {
                        q_best = q;
                        bound = q_best + max_tot + row_total;
                    }
                }
            }
        }
        (pos, visited + 1)
    }

    /// Fills the per-row minima by bounded scans, visiting rows in the
    /// order chosen from the previous iteration and carrying the best
    /// Q-value forward so the bound tightens monotonically.
    fn row_minima(&mut self) {
        let n = self.bionj.core.d.n;
        let max_tot = self.refresh_scaled_cluster_totals();
        self.decide_row_scan_order();
        self.bionj.core.row_minima.clear();
        self.bionj.core.row_minima.resize(n, Position::infinite(0));
        let mut q_best = T::infinity();
        for index in 0..n {
            let row = self.row_scan_order[index];
            let (pos, ops) = self.row_minimum_bounded(row, max_tot, q_best);
            self.operation_count += ops;
            if pos.value < q_best {
                q_best = pos.value;
            }
            self.bionj.core.row_minima[row] = pos;
        }
    }

    /// Parallel variant of [`RapidBionjEngine::row_minima`]. Workers share
    /// the bound through a mutex; a stale read only costs extra scanning,
    /// and each update re-compares under the lock so a tighter bound is
    /// never overwritten by a looser one.
    #[cfg(feature = "parallel")]
    fn row_minima_par(&mut self) {
        let n = self.bionj.core.d.n;
        let max_tot = self.refresh_scaled_cluster_totals();
        self.decide_row_scan_order();
        self.bionj.core.row_minima.clear();
        self.bionj.core.row_minima.resize(n, Position::infinite(0));
        let q_best = Mutex::new(T::infinity());
        let operations = AtomicU64::new(0);
        let scan_order = &self.row_scan_order[..n];
        let minima: Vec<(usize, Position<T>)> = scan_order
            .par_iter()
            .map(|&row| {
                let current = *q_best.lock().expect("bound lock poisoned");
                let (pos, ops) = self.row_minimum_bounded(row, max_tot, current);
                operations.fetch_add(ops, Ordering::Relaxed);
                if pos.value < current {
                    let mut shared = q_best.lock().expect("bound lock poisoned");
                    if pos.value < *shared {
                        *shared = pos.value;
                    }
                }
                (row, pos)
            })
            .collect();
        for (row, pos) in minima {
            self.bionj.core.row_minima[row] = pos;
        }
        self.operation_count += operations.into_inner();
    }

    /// Joins rows `a` and `b` via the BIONJ reduction, then brings the
    /// cluster directory and the sorted matrices back in step: the consumed
    /// clusters are unmapped, the new cluster takes row `a`, the cluster
    /// moved by the swap-and-shrink is remapped to row `b`, the sorted rows
    /// mirror the same swap, and row `a` is re-sorted from its new
    /// contents. Other rows keep stale entries until the next purge.
    fn join(&mut self, a: usize, b: usize) {
        let n_before = self.bionj.core.d.n;
        let cluster_a = self.bionj.core.row_to_cluster[a] as usize;
        let cluster_b = self.bionj.core.row_to_cluster[b] as usize;
        let moved_cluster = self.bionj.core.row_to_cluster[n_before - 1] as usize;
        self.cluster_to_row[cluster_a] = -1;
        self.cluster_to_row[cluster_b] = -1;
        self.bionj.join(a, b);
        let n = self.bionj.core.d.n;
        self.cluster_to_row.push(a as isize);
        self.cluster_totals.push(self.bionj.core.d.row_totals[a]);
        if b < n {
            self.cluster_to_row[moved_cluster] = b as isize;
        }
        self.sorted_entries.swap(b, n_before - 1);
        self.entry_clusters.swap(b, n_before - 1);
        self.refresh_cluster_totals();
        self.sort_row(a);
    }

    /// Rebuilds the per-cluster totals from the live rows. Dead clusters
    /// get -inf, which keeps their Q-values out of contention without a
    /// liveness branch in the scan.
    fn refresh_cluster_totals(&mut self) {
        let n = self.bionj.core.d.n;
        for total in self.cluster_totals.iter_mut() {
            *total = T::neg_infinity();
        }
        for r in 0..n {
            let cluster = self.bionj.core.row_to_cluster[r] as usize;
            self.cluster_totals[cluster] = self.bionj.core.d.row_totals[r];
        }
    }

    fn purge(&mut self) {
        let n = self.bionj.core.d.n;
        let cluster_to_row = &self.cluster_to_row;
        for (values, ids) in self.sorted_entries[..n]
            .iter_mut()
            .zip(self.entry_clusters[..n].iter_mut())
        {
            purge_row_in_place(values, ids, cluster_to_row);
        }
        log::debug!("purged stale sorted entries at rank {n}");
    }

    #[cfg(feature = "parallel")]
    fn purge_par(&mut self) {
        let n = self.bionj.core.d.n;
        let cluster_to_row = &self.cluster_to_row;
        self.sorted_entries[..n]
            .par_iter_mut()
            .zip(self.entry_clusters[..n].par_iter_mut())
            .for_each(|(values, ids)| purge_row_in_place(values, ids, cluster_to_row));
        log::debug!("purged stale sorted entries at rank {n}");
    }

    pub(crate) fn run(mut self) -> PhyloTree<T> {
        self.prepare();
        let mut next_purge = self.bionj.core.d.n * 2 / 3;
        while self.bionj.core.d.n > 3 {
            self.row_minima();
            let best = self.bionj.core.best_entry();
            self.join(best.column, best.row);
            if self.bionj.core.maybe_refresh() {
                self.refresh_cluster_totals();
            }
            if self.bionj.core.d.n == next_purge {
                self.purge();
                next_purge = self.bionj.core.d.n * 2 / 3;
            }
        }
        self.bionj.core.finish();
        log::debug!(
            "bounded row scans examined {} sorted entries",
            self.operation_count
        );
        self.bionj.core.forest
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn run_par(mut self) -> PhyloTree<T> {
        self.prepare_par();
        let mut next_purge = self.bionj.core.d.n * 2 / 3;
        while self.bionj.core.d.n > 3 {
            self.row_minima_par();
            let best = self.bionj.core.best_entry();
            self.join(best.column, best.row);
            if self.bionj.core.maybe_refresh_par() {
                self.refresh_cluster_totals();
            }
            if self.bionj.core.d.n == next_purge {
                self.purge_par();
                next_purge = self.bionj.core.d.n * 2 / 3;
            }
        }
        self.bionj.core.finish();
        log::debug!(
            "bounded row scans examined {} sorted entries",
            self.operation_count
        );
        self.bionj.core.forest
    }
}
