use crate::{
    align::{
        cell::gap_successor,
        matrix::{AlignmentMatrix, ScoreEntry},
        settings::{AlnSettings, MultiReport},
        two_bit::{Direction, TwoBitArray},
    },
    error::{AlnError, try_filled_vec},
    seq::Sequence,
};
use std::io::Write;

/// Runs a local (Smith-Waterman) alignment over the aligned sub-ranges of
/// `ref_seq` and `qry_seq`, which must be in lookup-index form.
///
/// Row 0 and column 0 are all `Stop`/0, and any cell whose best candidate
/// is non-positive becomes a `Stop` with score 0, so every recorded score
/// is non-negative. The global best is the maximum over the whole matrix,
/// with ties resolving to the latest cell in row-major order.
///
/// In [`MultiReport::RefQueryScan`] mode the best alignment terminus at
/// each reference and query base is tracked. In
/// [`MultiReport::MatrixScan`] mode, one tab-separated line per
/// local-alignment terminus scoring at least `min_score` is written to
/// `scan` as the pass discovers them.
///
/// ## Errors
///
/// Returns [`AlnError::Memory`] on allocation failure and propagates IO
/// errors from the scan sink. Nothing is retained on failure.
pub fn waterman(
    ref_seq: &Sequence, qry_seq: &Sequence, settings: &AlnSettings, mut scan: Option<&mut dyn Write>,
) -> Result<AlignmentMatrix, AlnError> {
    let r = ref_seq.window();
    let q = qry_seq.window();
    let m = r.len();
    let n = q.len();
    let row_len = m + 1;

    let mut dirs = TwoBitArray::new(row_len * (n + 1))?;
    let mut prev = try_filled_vec(0i64, row_len, "score row")?;
    let mut cur = try_filled_vec(0i64, row_len, "score row")?;

    let mut best = ScoreEntry::default();
    let mut tracker = match settings.multi {
        MultiReport::RefQueryScan => Some(MultiTracker::new(m, n)?),
        _ => None,
    };

    // Row 0 and the direction matrix start as all stops; only the cursor
    // needs to move past the gap row.
    dirs.advance_by(row_len);

    for i in 1..=n {
        cur[0] = 0;
        dirs.advance();

        let qry_base = q[i - 1];
        let mut left_dir = Direction::Stop;

        for j in 1..=m {
            let above_dir = dirs.peek((i - 1) * row_len + j);

            let diag = prev[j - 1] + i64::from(settings.score_indexed(r[j - 1], qry_base));
            let up = gap_successor(prev[j], above_dir, Direction::Ins, settings);
            let left = gap_successor(cur[j - 1], left_dir, Direction::Del, settings);

            let (mut dir, mut score) = settings.tie_break.choose(diag, up, left);
            if score <= 0 {
                dir = Direction::Stop;
                score = 0;
            }

            dirs.set(dir);
            dirs.advance();
            cur[j] = score;
            left_dir = dir;

            let index = (i as u64) * (row_len as u64) + j as u64;
            if score > 0 && score >= best.score {
                // The displaced best is still a genuine terminus; offering
                // it to the per-base lists keeps alignments that only lost
                // the global title to a later tie or higher score.
                if best.score > 0
                    && best.score >= settings.min_score
                    && let Some(tracker) = &mut tracker
                {
                    let (best_i, best_j) = split_index(best.index, row_len as u64);
                    let best_dir = dirs.peek(best.index as usize);
                    tracker.record(best_dir, best.index, best.score, best_i, best_j, row_len as u64);
                }
                best = ScoreEntry { index, score };
            } else if score >= settings.min_score && score > 0 {
                if let Some(tracker) = &mut tracker {
                    tracker.record(dir, index, score, i, j, row_len as u64);
                }
            }
        }

        // The previous row is complete on both sides now, so its cells can
        // be judged as local-alignment termini.
        if settings.multi == MultiReport::MatrixScan
            && let Some(out) = scan.as_deref_mut()
        {
            scan_finished_row(&dirs, &prev, Some(&cur), i - 1, row_len, settings, out)?;
        }

        std::mem::swap(&mut prev, &mut cur);
    }

    if settings.multi == MultiReport::MatrixScan
        && n > 0
        && let Some(out) = scan.as_deref_mut()
    {
        scan_finished_row(&dirs, &prev, None, n, row_len, settings, out)?;
    }

    let (ref_bests, qry_bests) = match tracker {
        Some(tracker) => (Some(tracker.ref_bests), Some(tracker.qry_bests)),
        None => (None, None),
    };

    Ok(AlignmentMatrix {
        directions: dirs,
        best,
        ref_bests,
        qry_bests,
        ref_len: m,
        qry_len: n,
    })
}

#[inline]
fn split_index(index: u64, row_len: u64) -> (usize, usize) {
    ((index / row_len) as usize, (index % row_len) as usize)
}

/// Per-base best-alignment bookkeeping for the ref/query scan mode.
///
/// `ref_bests[j]` and `qry_bests[i]` track the highest-scoring alignment
/// terminus seen at reference base `j` and query base `i`. When a new
/// terminus displaces a recorded one, the displaced entry moves into the
/// parallel `old_*` array, so a later cell extending the displaced
/// alignment is still recognized as a continuation rather than a new
/// alignment. Zero-score entries are vacant.
struct MultiTracker {
    ref_bests: Vec<ScoreEntry>,
    qry_bests: Vec<ScoreEntry>,
    old_ref:   Vec<ScoreEntry>,
    old_qry:   Vec<ScoreEntry>,
}

impl MultiTracker {
    fn new(ref_len: usize, qry_len: usize) -> Result<Self, AlnError> {
        Ok(Self {
            ref_bests: try_filled_vec(ScoreEntry::default(), ref_len, "reference best-score list")?,
            qry_bests: try_filled_vec(ScoreEntry::default(), qry_len, "query best-score list")?,
            old_ref:   try_filled_vec(ScoreEntry::default(), ref_len, "reference best-score list")?,
            old_qry:   try_filled_vec(ScoreEntry::default(), qry_len, "query best-score list")?,
        })
    }

    /// Considers the cell at matrix coordinates `(i, j)` (both at least 1)
    /// as a candidate for the per-base best lists.
    ///
    /// A candidate shadows a side when the slot at its predecessor's
    /// coordinate on that side holds (currently or as a displaced old
    /// entry) exactly the predecessor cell with a score not above the
    /// candidate's: the candidate is then the same alignment one step
    /// later, and recording it would double-count the path. Shadowed sides
    /// are skipped; the other side is still updated on its own merits.
    fn record(&mut self, dir: Direction, index: u64, score: i64, i: usize, j: usize, row_len: u64) {
        let pred = match dir {
            Direction::Stop => None,
            Direction::Ins => Some((i - 1, j, index - row_len)),
            Direction::Diag => Some((i - 1, j - 1, index - row_len - 1)),
            Direction::Del => Some((i, j - 1, index - 1)),
        };

        let shadows =
            |entry: ScoreEntry, pred_index: u64| entry.score != 0 && entry.index == pred_index && entry.score <= score;

        let ref_shadowed = pred.is_some_and(|(_, pred_j, pred_index)| {
            pred_j >= 1
                && (shadows(self.ref_bests[pred_j - 1], pred_index) || shadows(self.old_ref[pred_j - 1], pred_index))
        });

        if !ref_shadowed && score > self.ref_bests[j - 1].score {
            self.old_ref[j - 1] = self.ref_bests[j - 1];
            self.ref_bests[j - 1] = ScoreEntry { index, score };
        }

        let qry_shadowed = pred.is_some_and(|(pred_i, _, pred_index)| {
            pred_i >= 1
                && (shadows(self.qry_bests[pred_i - 1], pred_index) || shadows(self.old_qry[pred_i - 1], pred_index))
        });

        if !qry_shadowed && score > self.qry_bests[i - 1].score {
            self.old_qry[i - 1] = self.qry_bests[i - 1];
            self.qry_bests[i - 1] = ScoreEntry { index, score };
        }
    }
}

/// Emits a scan line for every terminus in a finished row.
///
/// A cell ends a local alignment unless one of its down, right, or
/// lower-right neighbors both points back at it and scores at least
/// `min_score`. `next_row` is `None` for the final row of the matrix.
fn scan_finished_row(
    dirs: &TwoBitArray, row: &[i64], next_row: Option<&[i64]>, row_i: usize, row_len: usize, settings: &AlnSettings,
    out: &mut dyn Write,
) -> Result<(), AlnError> {
    let m = row_len - 1;

    for j in 1..=m {
        let score = row[j];
        if score <= 0 || score < settings.min_score {
            continue;
        }

        let continued_right =
            j < m && dirs.peek(row_i * row_len + j + 1) == Direction::Del && row[j + 1] >= settings.min_score;

        let continued_below = next_row.is_some_and(|next| {
            (dirs.peek((row_i + 1) * row_len + j) == Direction::Ins && next[j] >= settings.min_score)
                || (j < m
                    && dirs.peek((row_i + 1) * row_len + j + 1) == Direction::Diag
                    && next[j + 1] >= settings.min_score)
        });

        if !continued_right && !continued_below {
            write_scan_line(dirs, row_len, row_i * row_len + j, score, out)?;
        }
    }

    Ok(())
}

/// Writes one `score\tqry_end\tref_end\tCIGAR\tqry_start\tref_start` line
/// by walking the direction matrix back from `index` to a stop.
///
/// The CIGAR is run-length encoded in traceback (end to start) order with
/// `I`/`X`/`D` symbols; `X` covers matches and mismatches alike at this
/// stage, and single-step runs omit the count.
fn write_scan_line(
    dirs: &TwoBitArray, row_len: usize, index: usize, score: i64, out: &mut dyn Write,
) -> Result<(), AlnError> {
    write!(out, "{score}\t{}\t{}\t", index / row_len, index % row_len)?;

    let mut idx = index;
    let mut dir = dirs.peek(idx);
    let mut run_sym = 0u8;
    let mut run_len = 0u32;

    while dir != Direction::Stop {
        let sym = match dir {
            Direction::Ins => b'I',
            Direction::Diag => b'X',
            Direction::Del => b'D',
            Direction::Stop => unreachable!(),
        };

        if run_len > 0 && sym != run_sym {
            write_cigar_run(out, run_len, run_sym)?;
            run_len = 0;
        }
        run_sym = sym;
        run_len += 1;

        idx -= match dir {
            Direction::Ins => row_len,
            Direction::Diag => row_len + 1,
            Direction::Del => 1,
            Direction::Stop => 0,
        };
        dir = dirs.peek(idx);
    }

    if run_len > 0 {
        write_cigar_run(out, run_len, run_sym)?;
    }

    writeln!(out, "\t{}\t{}", idx / row_len, idx % row_len)?;
    Ok(())
}

#[inline]
fn write_cigar_run(out: &mut dyn Write, len: u32, sym: u8) -> std::io::Result<()> {
    if len > 1 {
        write!(out, "{len}{}", sym as char)
    } else {
        write!(out, "{}", sym as char)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::align::settings::Kernel;
    use pretty_assertions::assert_eq;

    fn indexed(id: &str, seq: &[u8]) -> Sequence {
        let mut seq = Sequence::new(id, seq.to_vec());
        seq.to_index();
        seq
    }

    fn local_settings(multi: MultiReport, min_score: i64) -> AlnSettings {
        AlnSettings {
            kernel: Kernel::Waterman,
            multi,
            min_score,
            ..AlnSettings::default()
        }
    }

    #[test]
    fn test_best_local_span() {
        let r = indexed("r", b"GATTACA");
        let q = indexed("q", b"GCATGCU");
        let matrix = waterman(&r, &q, &local_settings(MultiReport::Off, 100), None).unwrap();

        // Two exact matched bases; the latest score-10 cell in row-major
        // order ends the "AT" span at query base 4 / reference base 3.
        assert_eq!(matrix.best.score, 10);
        assert_eq!(matrix.cell_coords(matrix.best.index), (4, 3));
    }

    #[test]
    fn test_zero_cells_are_stops() {
        let r = indexed("r", b"AAAA");
        let q = indexed("q", b"TTTT");
        let matrix = waterman(&r, &q, &local_settings(MultiReport::Off, 100), None).unwrap();

        assert_eq!(matrix.best.score, 0);
        for idx in 0..matrix.directions.len() {
            assert_eq!(matrix.directions.peek(idx), Direction::Stop);
        }
    }

    /// A local alignment of anything against an empty sequence is empty:
    /// no cell can score above zero, unlike the global kernels, which
    /// report one deletion per reference base.
    #[test]
    fn test_empty_query_yields_empty_alignment() {
        let r = indexed("r", b"AAAA");
        let q = indexed("q", b"");
        let matrix = waterman(&r, &q, &local_settings(MultiReport::Off, 100), None).unwrap();

        assert_eq!(matrix.best.score, 0);
        assert_eq!(matrix.best.index, 0);
    }

    #[test]
    fn test_traceback_from_best_terminates() {
        let r = indexed("r", b"ACGTACGT");
        let q = indexed("q", b"CGTACG");
        let matrix = waterman(&r, &q, &local_settings(MultiReport::Off, 100), None).unwrap();

        let row_len = matrix.ref_len + 1;
        let mut idx = matrix.best.index as usize;
        let mut steps = 0;

        loop {
            match matrix.directions.peek(idx) {
                Direction::Stop => break,
                Direction::Ins => idx -= row_len,
                Direction::Diag => idx -= row_len + 1,
                Direction::Del => idx -= 1,
            }
            steps += 1;
            assert!(steps <= matrix.ref_len + matrix.qry_len + 1);
        }

        assert_eq!(steps, 6);
    }

    #[test]
    fn test_ref_query_scan_keeps_displaced_repeat() {
        // Two exact copies of the query in the reference: the second copy
        // wins the global best on the row-major tie, and the first copy
        // must survive in the per-base best lists.
        let r = indexed("r", b"ACGTTTTTTACGT");
        let q = indexed("q", b"ACGT");
        let matrix = waterman(&r, &q, &local_settings(MultiReport::RefQueryScan, 10), None).unwrap();

        assert_eq!(matrix.best.score, 20);
        assert_eq!(matrix.cell_coords(matrix.best.index), (4, 13));

        let ref_bests = matrix.ref_bests.as_ref().unwrap();
        assert_eq!(ref_bests.len(), 13);

        // The first copy ends at reference base 4 (matrix column 4)
        let first = ref_bests[3];
        assert_eq!(first.score, 20);
        assert_eq!(matrix.cell_coords(first.index), (4, 4));

        let qry_bests = matrix.qry_bests.as_ref().unwrap();
        assert_eq!(qry_bests.len(), 4);
        assert_eq!(qry_bests[3].score, 20);
    }

    #[test]
    fn test_recorded_entries_end_at_their_own_base() {
        let r = indexed("r", b"ACGTACGT");
        let q = indexed("q", b"ACGTACGT");
        let matrix = waterman(&r, &q, &local_settings(MultiReport::RefQueryScan, 5), None).unwrap();

        assert_eq!(matrix.best.score, 40);

        for (slot, entry) in matrix.ref_bests.as_ref().unwrap().iter().enumerate() {
            if entry.score == 0 {
                continue;
            }
            let (i, j) = matrix.cell_coords(entry.index);
            assert_eq!(j, slot + 1, "slot {slot} holds a foreign terminus");
            assert!(i >= 1);
        }

        for (slot, entry) in matrix.qry_bests.as_ref().unwrap().iter().enumerate() {
            if entry.score == 0 {
                continue;
            }
            let (i, _) = matrix.cell_coords(entry.index);
            assert_eq!(i, slot + 1, "slot {slot} holds a foreign terminus");
        }
    }

    #[test]
    fn test_shadow_suppresses_continuation_of_recorded_path() {
        let mut tracker = MultiTracker::new(8, 8).unwrap();
        let row_len = 9u64;

        // A diagonal path terminus recorded at (2, 2)
        tracker.record(Direction::Diag, 2 * row_len + 2, 10, 2, 2, row_len);
        assert_eq!(tracker.ref_bests[1].score, 10);
        assert_eq!(tracker.qry_bests[1].score, 10);

        // Its one-step continuation must not also be recorded
        tracker.record(Direction::Diag, 3 * row_len + 3, 15, 3, 3, row_len);
        assert_eq!(tracker.ref_bests[2].score, 0);
        assert_eq!(tracker.qry_bests[2].score, 0);

        // A genuinely different path ending at the same bases is recorded
        tracker.record(Direction::Diag, 7 * row_len + 3, 12, 7, 3, row_len);
        assert_eq!(tracker.ref_bests[2].score, 12);
    }

    #[test]
    fn test_shadow_recognizes_displaced_entry() {
        let mut tracker = MultiTracker::new(8, 8).unwrap();
        let row_len = 9u64;

        // Path A terminus at (2, 2), then a stronger unrelated path B takes
        // the same slots.
        tracker.record(Direction::Diag, 2 * row_len + 2, 10, 2, 2, row_len);
        tracker.record(Direction::Ins, 6 * row_len + 2, 20, 6, 2, row_len);
        assert_eq!(tracker.ref_bests[1].score, 20);
        assert_eq!(tracker.old_ref[1].score, 10);

        // A continuation of the displaced path A must still be shadowed
        tracker.record(Direction::Diag, 3 * row_len + 3, 15, 3, 3, row_len);
        assert_eq!(tracker.ref_bests[2].score, 0);
    }

    #[test]
    fn test_matrix_scan_emits_terminal_cigar() {
        let r = indexed("r", b"ACGTGGGG");
        let q = indexed("q", b"ACGT");
        let settings = local_settings(MultiReport::MatrixScan, 15);

        let mut out = Vec::new();
        let matrix = waterman(&r, &q, &settings, Some(&mut out)).unwrap();
        assert_eq!(matrix.best.score, 20);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        // Only the full span ends a path above the threshold; its prefix at
        // (3, 3) is continued by the diagonal cell below it.
        assert_eq!(lines, vec!["20\t4\t4\t4X\t0\t0"]);
    }

    #[test]
    fn test_scan_line_run_length_encoding() {
        // Hand-built path on a 6-wide matrix (m = 5), walked back from
        // (3, 5): two deletions, two diagonals, one insertion.
        let row_len = 6;
        let mut dirs = TwoBitArray::new(row_len * 4).unwrap();

        for (idx, dir) in [
            (3 * row_len + 5, Direction::Del),
            (3 * row_len + 4, Direction::Del),
            (3 * row_len + 3, Direction::Diag),
            (2 * row_len + 2, Direction::Diag),
            (row_len + 1, Direction::Ins),
        ] {
            dirs.seek(idx);
            dirs.set(dir);
        }

        let mut out = Vec::new();
        write_scan_line(&dirs, row_len, 3 * row_len + 5, 42, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "42\t3\t5\t2D2XI\t0\t1\n");
    }
}
