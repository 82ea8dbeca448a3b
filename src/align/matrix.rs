use crate::align::two_bit::TwoBitArray;

/// A score paired with the row-major index of the direction-matrix cell it
/// was observed at. Used for the global best and for the per-base best
/// lists in the Smith-Waterman multi-report modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreEntry {
    pub index: u64,
    pub score: i64,
}

/// A kernel's output: the packed direction matrix, the best-scoring cell,
/// and (for the Smith-Waterman ref/query scan) the best score observed at
/// each reference and query base.
///
/// The matrix has `(ref_len + 1) * (qry_len + 1)` cells stored row-major;
/// cell `i * (ref_len + 1) + j` belongs to query position `i` and reference
/// position `j`, with row 0 and column 0 as the gap row/column. When
/// present, `ref_bests` and `qry_bests` have exactly `ref_len` and
/// `qry_len` entries.
#[derive(Debug)]
pub struct AlignmentMatrix {
    pub directions: TwoBitArray,
    pub best:       ScoreEntry,
    pub ref_bests:  Option<Vec<ScoreEntry>>,
    pub qry_bests:  Option<Vec<ScoreEntry>>,
    pub ref_len:    usize,
    pub qry_len:    usize,
}

impl AlignmentMatrix {
    /// Splits a row-major cell index into `(query position, reference
    /// position)` matrix coordinates.
    #[inline]
    #[must_use]
    pub fn cell_coords(&self, index: u64) -> (usize, usize) {
        let row_len = self.ref_len as u64 + 1;
        ((index / row_len) as usize, (index % row_len) as usize)
    }

    /// The row-major index of matrix coordinates `(query position,
    /// reference position)`.
    #[inline]
    #[must_use]
    pub fn cell_index(&self, qry_pos: usize, ref_pos: usize) -> u64 {
        (qry_pos as u64) * (self.ref_len as u64 + 1) + ref_pos as u64
    }
}
