//! Fingerprint sequence similarity.
//!
//! Two measures over integer sequences:
//!
//! - [`quick_ratio`]: an O(n) multiset bound. It counts how many values the
//!   two sequences share regardless of position, so it can never be lower
//!   than the true ratio. Cheap enough to run on every candidate pair.
//! - [`ratio`]: the exact measure, 2·M/(len a + len b) where M is the total
//!   length of the longest-matching-block decomposition of the pair. This
//!   is the expensive comparison the quick bound exists to avoid.
//!
//! Both return 1.0 for two empty sequences.

use std::collections::HashMap;

/// Upper-bound similarity estimate from value multiplicities alone.
#[must_use]
pub fn quick_ratio(a: &[u32], b: &[u32]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut available: HashMap<u32, usize> = HashMap::with_capacity(b.len());
    for &value in b {
        *available.entry(value).or_insert(0) += 1;
    }

    let mut matches = 0usize;
    for &value in a {
        if let Some(count) = available.get_mut(&value) {
            if *count > 0 {
                *count -= 1;
                matches += 1;
            }
        }
    }

    2.0 * matches as f64 / total as f64
}

/// Exact similarity ratio over matching blocks.
#[must_use]
pub fn ratio(a: &[u32], b: &[u32]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_total(a, b) as f64 / total as f64
}

/// Total matched length over the recursive longest-match decomposition:
/// find the longest matching block, then repeat on the pieces to its left
/// and right.
fn matching_total(a: &[u32], b: &[u32]) -> usize {
    let mut b_indices: HashMap<u32, Vec<usize>> = HashMap::with_capacity(b.len());
    for (j, &value) in b.iter().enumerate() {
        b_indices.entry(value).or_default().push(j);
    }

    let mut total = 0usize;
    let mut regions = vec![(0usize, a.len(), 0usize, b.len())];
    while let Some((alo, ahi, blo, bhi)) = regions.pop() {
        let (i, j, size) = longest_match(a, &b_indices, alo, ahi, blo, bhi);
        if size > 0 {
            total += size;
            regions.push((alo, i, blo, j));
            regions.push((i + size, ahi, j + size, bhi));
        }
    }
    total
}

/// Longest block such that `a[i..i+size] == b[j..j+size]` within the given
/// bounds, preferring the earliest start on ties.
fn longest_match(
    a: &[u32],
    b_indices: &HashMap<u32, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0usize);
    // lengths[j] = length of the match ending at a[i], b[j]
    let mut lengths: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
        let mut next_lengths: HashMap<usize, usize> = HashMap::new();
        if let Some(indices) = b_indices.get(&a[i]) {
            for &j in indices {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let size = if j > blo {
                    lengths.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                next_lengths.insert(j, size);
                if size > best.2 {
                    best = (i + 1 - size, j + 1 - size, size);
                }
            }
        }
        lengths = next_lengths;
    }
    best
}
