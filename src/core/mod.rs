pub mod gene;
pub mod index;
pub mod interval;
pub mod motif;

pub use gene::{GeneKey, GeneTss};
pub use index::IntervalIndex;
pub use interval::Interval;
pub use motif::{MotifHit, PeakMotif, Strand};
