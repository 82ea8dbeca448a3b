//! Sorting and overlap-filtering for the Smith-Waterman per-base best
//! lists, used to turn the raw `ref_bests`/`qry_bests` entries into a
//! non-redundant set of alternative alignments.

use crate::align::{
    matrix::{AlignmentMatrix, ScoreEntry},
    two_bit::Direction,
};
use std::cmp::Ordering;

/// A per-base best entry with its alignment span recovered from the
/// direction matrix. Coordinates are base positions within the aligned
/// window (index 0, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AltAlignment {
    pub entry:     ScoreEntry,
    pub qry_start: usize,
    pub qry_end:   usize,
    pub ref_start: usize,
    pub ref_end:   usize,
}

/// Gathers the non-vacant entries of both per-base lists, drops duplicate
/// cells (one terminus can appear in both lists), and recovers each
/// alignment's span by walking the matrix back to its stop.
#[must_use]
pub fn collect_alt_alignments(matrix: &AlignmentMatrix) -> Vec<AltAlignment> {
    let mut entries: Vec<ScoreEntry> = Vec::new();

    for list in [&matrix.ref_bests, &matrix.qry_bests].into_iter().flatten() {
        entries.extend(list.iter().filter(|entry| entry.score != 0));
    }

    shell_sort_by(&mut entries, |a, b| a.index.cmp(&b.index));
    entries.dedup_by_key(|entry| entry.index);

    entries
        .into_iter()
        .map(|entry| {
            let (end_i, end_j) = matrix.cell_coords(entry.index);
            let (start_i, start_j) = walk_to_start(matrix, entry.index);
            AltAlignment {
                entry,
                qry_start: start_i,
                qry_end: end_i.saturating_sub(1),
                ref_start: start_j,
                ref_end: end_j.saturating_sub(1),
            }
        })
        .collect()
}

/// Matrix coordinates of the stop cell reached from `index`.
fn walk_to_start(matrix: &AlignmentMatrix, index: u64) -> (usize, usize) {
    let row_len = matrix.ref_len + 1;
    let mut idx = index as usize;

    loop {
        match matrix.directions.peek(idx) {
            Direction::Stop => break,
            Direction::Ins => idx -= row_len,
            Direction::Diag => idx -= row_len + 1,
            Direction::Del => idx -= 1,
        }
    }

    (idx / row_len, idx % row_len)
}

/// Sorts descending by score.
pub fn sort_by_score(alns: &mut [AltAlignment]) {
    shell_sort_by(alns, |a, b| b.entry.score.cmp(&a.entry.score));
}

/// Sorts ascending by query start, ties descending by score.
pub fn sort_by_qry(alns: &mut [AltAlignment]) {
    shell_sort_by(alns, |a, b| {
        a.qry_start.cmp(&b.qry_start).then(b.entry.score.cmp(&a.entry.score))
    });
}

/// Sorts ascending by reference start, ties descending by score.
pub fn sort_by_ref(alns: &mut [AltAlignment]) {
    shell_sort_by(alns, |a, b| {
        a.ref_start.cmp(&b.ref_start).then(b.entry.score.cmp(&a.entry.score))
    });
}

/// Sorts ascending by query start, then reference start, ties descending
/// by score.
pub fn sort_by_ref_qry(alns: &mut [AltAlignment]) {
    shell_sort_by(alns, |a, b| {
        a.qry_start
            .cmp(&b.qry_start)
            .then(a.ref_start.cmp(&b.ref_start))
            .then(b.entry.score.cmp(&a.entry.score))
    });
}

/// Keeps the best-scoring alignment of each cluster of query-overlapping
/// alignments.
#[must_use]
pub fn filter_overlap_qry(mut alns: Vec<AltAlignment>) -> Vec<AltAlignment> {
    sort_by_qry(&mut alns);
    filter_clusters(alns, |aln, q_end, _| aln.qry_start <= *q_end)
}

/// Keeps the best-scoring alignment of each cluster of
/// reference-overlapping alignments.
#[must_use]
pub fn filter_overlap_ref(mut alns: Vec<AltAlignment>) -> Vec<AltAlignment> {
    sort_by_ref(&mut alns);
    filter_clusters(alns, |aln, _, r_end| aln.ref_start <= *r_end)
}

/// Keeps the best-scoring alignment of each cluster of alignments
/// overlapping on either axis.
#[must_use]
pub fn filter_overlap_ref_qry(mut alns: Vec<AltAlignment>) -> Vec<AltAlignment> {
    sort_by_ref_qry(&mut alns);
    filter_clusters(alns, |aln, q_end, r_end| {
        aln.qry_start <= *q_end || aln.ref_start <= *r_end
    })
}

/// Left-to-right cluster sweep over sorted alignments: while `joins`
/// reports overlap with the running cluster, only the best-scoring member
/// survives; otherwise the kept member is emitted and a new cluster
/// starts.
fn filter_clusters<F>(alns: Vec<AltAlignment>, joins: F) -> Vec<AltAlignment>
where
    F: Fn(&AltAlignment, &usize, &usize) -> bool, {
    let mut kept = Vec::new();
    let mut alns = alns.into_iter();

    let Some(mut current) = alns.next() else {
        return kept;
    };
    let mut q_end = current.qry_end;
    let mut r_end = current.ref_end;

    for aln in alns {
        if joins(&aln, &q_end, &r_end) {
            if aln.entry.score > current.entry.score {
                current = aln;
            }
            q_end = q_end.max(aln.qry_end);
            r_end = r_end.max(aln.ref_end);
        } else {
            kept.push(current);
            current = aln;
            q_end = aln.qry_end;
            r_end = aln.ref_end;
        }
    }

    kept.push(current);
    kept
}

/// Shell sort with Knuth's 3k+1 gap sequence; `cmp` returning `Greater`
/// means the pair is out of order.
fn shell_sort_by<T, F>(items: &mut [T], cmp: F)
where
    F: Fn(&T, &T) -> Ordering, {
    let n = items.len();
    if n < 2 {
        return;
    }

    let mut gap = 1;
    while gap < n {
        gap = 3 * gap + 1;
    }
    gap = (gap - 1) / 3;

    while gap > 0 {
        for i in gap..n {
            let mut j = i;
            while j >= gap && cmp(&items[j - gap], &items[j]) == Ordering::Greater {
                items.swap(j - gap, j);
                j -= gap;
            }
        }
        gap = (gap - 1) / 3;
    }
}
