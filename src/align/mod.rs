//! The alignment core: packed direction storage, scoring settings, the
//! three kernels, the traceback builder, and the multi-alignment filters.

pub mod cell;
pub mod hirschberg;
pub mod iupac;
pub mod matrix;
pub mod multi;
pub mod needleman;
pub mod settings;
pub mod traceback;
pub mod two_bit;
pub mod waterman;

pub use hirschberg::hirschberg;
pub use matrix::{AlignmentMatrix, ScoreEntry};
pub use needleman::needleman;
pub use settings::{AlnSettings, Kernel, MultiReport, TieBreak};
pub use traceback::{Alignment, AlnCode};
pub use two_bit::{Direction, TwoBitArray};
pub use waterman::waterman;
