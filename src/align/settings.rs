use crate::align::{iupac::bases_match, two_bit::Direction};

/// Number of slots per axis of the substitution matrix: one for each letter
/// of the alphabet, indexed by `(byte & 0x1F) - 1` so that case is ignored
/// and the IUPAC ambiguity letters are first-class.
pub const ALPHABET_LEN: usize = 26;

/// Default score for a pair of letters whose IUPAC sets intersect.
pub const DEFAULT_MATCH: i16 = 5;
/// Default score for a pair of letters whose IUPAC sets are disjoint.
pub const DEFAULT_MISMATCH: i16 = -4;
/// Default penalty for the first position of a gap.
pub const DEFAULT_GAP_OPEN: i32 = -10;
/// Default penalty for each gap position after the first.
pub const DEFAULT_GAP_EXTEND: i32 = -1;
/// Default minimum score for keeping a non-best alignment in the
/// Smith-Waterman multi-report modes.
pub const DEFAULT_MIN_SCORE: i64 = 100;
/// Default minimum number of aligned bases for keeping a non-best alignment.
pub const DEFAULT_MIN_BASES: usize = 50;

/// Which alignment kernel to run. Exactly one kernel is always selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Kernel {
    /// Global alignment with a full direction matrix (Needleman-Wunsch).
    #[default]
    Needleman,
    /// Local alignment (Smith-Waterman).
    Waterman,
    /// Linear-space global alignment (Hirschberg).
    Hirschberg,
}

/// Smith-Waterman multi-alignment reporting mode. The two scan modes are
/// mutually exclusive and both imply per-base bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiReport {
    /// Report only the single best local alignment.
    #[default]
    Off,
    /// Track the best alignment ending at each reference and query base.
    RefQueryScan,
    /// Emit one CIGAR line per local-alignment terminus above `min_score`.
    MatrixScan,
}

/// A total order over {diagonal, up, left} used to break score ties.
///
/// The names read best-first: `MatchInsDel` prefers matches/mismatches, then
/// insertions, then deletions. All six legal orderings are provided, so
/// every cell has a uniquely determined direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    #[default]
    MatchInsDel,
    MatchDelIns,
    InsMatchDel,
    DelMatchIns,
    InsDelMatch,
    DelInsMatch,
}

impl TieBreak {
    /// Picks the best of the three candidate scores, breaking ties by this
    /// ordering. Each arm tests the preferred direction first so that equal
    /// scores always resolve to the higher-ranked move.
    #[inline]
    #[must_use]
    pub fn choose(self, diag: i64, up: i64, left: i64) -> (Direction, i64) {
        match self {
            TieBreak::MatchInsDel => {
                if diag >= up && diag >= left {
                    (Direction::Diag, diag)
                } else if up >= left {
                    (Direction::Ins, up)
                } else {
                    (Direction::Del, left)
                }
            }
            TieBreak::MatchDelIns => {
                if diag >= left && diag >= up {
                    (Direction::Diag, diag)
                } else if left >= up {
                    (Direction::Del, left)
                } else {
                    (Direction::Ins, up)
                }
            }
            TieBreak::InsMatchDel => {
                if up >= diag && up >= left {
                    (Direction::Ins, up)
                } else if diag >= left {
                    (Direction::Diag, diag)
                } else {
                    (Direction::Del, left)
                }
            }
            TieBreak::DelMatchIns => {
                if left >= diag && left >= up {
                    (Direction::Del, left)
                } else if diag >= up {
                    (Direction::Diag, diag)
                } else {
                    (Direction::Ins, up)
                }
            }
            TieBreak::InsDelMatch => {
                if up >= left && up >= diag {
                    (Direction::Ins, up)
                } else if left >= diag {
                    (Direction::Del, left)
                } else {
                    (Direction::Diag, diag)
                }
            }
            TieBreak::DelInsMatch => {
                if left >= up && left >= diag {
                    (Direction::Del, left)
                } else if up >= diag {
                    (Direction::Ins, up)
                } else {
                    (Direction::Diag, diag)
                }
            }
        }
    }
}

/// Settings shared by all three kernels: the substitution matrix, the affine
/// gap penalties, the tie-break order, kernel selection, and the
/// Smith-Waterman multi-report options.
///
/// The matrix is read-only while a kernel runs; concurrent readers of one
/// settings object are fine.
#[derive(Debug, Clone)]
pub struct AlnSettings {
    pub(crate) matrix: [[i16; ALPHABET_LEN]; ALPHABET_LEN],

    pub gap_open:   i32,
    pub gap_extend: i32,
    pub tie_break:  TieBreak,
    pub kernel:     Kernel,
    pub multi:      MultiReport,
    /// Minimum score for a non-best alignment to be recorded or emitted in
    /// the multi-report modes.
    pub min_score:  i64,
    /// Minimum number of aligned bases for a non-best alignment to be kept.
    pub min_bases:  usize,
}

impl Default for AlnSettings {
    fn default() -> Self {
        Self {
            matrix:     default_matrix(),
            gap_open:   DEFAULT_GAP_OPEN,
            gap_extend: DEFAULT_GAP_EXTEND,
            tie_break:  TieBreak::default(),
            kernel:     Kernel::default(),
            multi:      MultiReport::default(),
            min_score:  DEFAULT_MIN_SCORE,
            min_bases:  DEFAULT_MIN_BASES,
        }
    }
}

impl AlnSettings {
    /// Substitution score for two raw symbols; case is ignored.
    #[inline]
    #[must_use]
    pub fn score(&self, ref_base: u8, qry_base: u8) -> i16 {
        self.matrix[((ref_base & 0x1F) - 1) as usize][((qry_base & 0x1F) - 1) as usize]
    }

    /// Substitution score for two bytes already in lookup-index form; skips
    /// the masking of [`score`] in the kernel inner loops.
    ///
    /// [`score`]: AlnSettings::score
    #[inline]
    #[must_use]
    pub fn score_indexed(&self, ref_base: u8, qry_base: u8) -> i16 {
        self.matrix[ref_base as usize][qry_base as usize]
    }

    /// Overrides the score of one (reference symbol, query symbol) cell.
    /// Case is ignored.
    pub fn set_score(&mut self, ref_base: u8, qry_base: u8, score: i16) {
        self.matrix[((ref_base & 0x1F) - 1) as usize][((qry_base & 0x1F) - 1) as usize] = score;
    }
}

/// Builds the default substitution matrix: every cell defined, with
/// intersecting IUPAC pairs scoring [`DEFAULT_MATCH`] and everything else
/// [`DEFAULT_MISMATCH`].
fn default_matrix() -> [[i16; ALPHABET_LEN]; ALPHABET_LEN] {
    let mut matrix = [[DEFAULT_MISMATCH; ALPHABET_LEN]; ALPHABET_LEN];

    for (ri, row) in matrix.iter_mut().enumerate() {
        for (qi, cell) in row.iter_mut().enumerate() {
            if bases_match(b'A' + ri as u8, b'A' + qi as u8) {
                *cell = DEFAULT_MATCH;
            }
        }
    }

    matrix
}
