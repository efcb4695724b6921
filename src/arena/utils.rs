//! Utility functions for renumbering arenas.

/// Sorts a vector/slice by a vector of indices in O(n): afterwards `data[i]` holds what
/// was at `data[order[i]]`. `order` must be a permutation of `0..data.len()`.
/// Found on [stackoverflow](https://stackoverflow.com/a/69774341)
pub fn sort_by_indices<T>(data: &mut [T], mut order: Vec<usize>) {
    debug_assert_eq!(data.len(), order.len());
    for idx in 0..data.len() {
        if order[idx] != idx {
            let mut current_idx = idx;
            loop {
                let target_idx = order[current_idx];
                order[current_idx] = current_idx;
                if order[target_idx] == target_idx {
                    break;
                }
                data.swap(current_idx, target_idx);
                current_idx = target_idx;
            }
        }
    }
}

/// Turns a new-to-old `order` into the old-to-new map.
pub fn invert_permutation(order: &[usize]) -> Vec<usize> {
    let mut old_to_new = vec![0; order.len()];
    for (new, &old) in order.iter().enumerate() {
        old_to_new[old] = new;
    }
    old_to_new
}
