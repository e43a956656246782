/// Sorts `values` ascending in place by heapsort, applying every swap to
/// `mirror` in lockstep so that the pairing between the two slices is kept.
///
/// Used to keep each sorted-distance row and its parallel row of cluster ids
/// in the same permutation.
pub(crate) fn mirrored_heapsort<T, U>(values: &mut [T], mirror: &mut [U])
where
    T: PartialOrd,
{
    debug_assert_eq!(values.len(), mirror.len());
    let n = values.len();
    for start in (0..n / 2).rev() {
        sift_down(values, mirror, start, n);
    }
    for end in (1..n).rev() {
        values.swap(0, end);
        mirror.swap(0, end);
        sift_down(values, mirror, 0, end);
    }
}

fn sift_down<T, U>(values: &mut [T], mirror: &mut [U], mut root: usize, end: usize)
where
    T: PartialOrd,
{
    loop {
        let mut child = 2 * root + 1;
        if child >= end {
            break;
        }
        if child + 1 < end && values[child] < values[child + 1] {
            child += 1;
        }
        if values[root] < values[child] {
            values.swap(root, child);
            mirror.swap(root, child);
            root = child;
        } else {
            break;
        }
    }
}
