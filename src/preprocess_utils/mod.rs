//! Peak/motif preprocessing operations.
//!
//! The typical order is [`download_motif`] once, then per peak set
//! [`query_motif`] -> [`get_motif`] -> [`create_peak_motif`], followed by
//! [`add_atpm`] and [`add_exp`] for each cell type.

mod atpm;
mod download;
mod expression;
mod peak_motif;
mod query;
mod tracks;

pub use atpm::{add_atpm, add_atpm_counts, normalize_counts};
pub use download::{download_motif, DEFAULT_INDEX_URL, DEFAULT_MOTIF_URL};
pub use expression::{add_exp, ExpressionOptions, ExpressionSummary};
pub use peak_motif::{create_peak_motif, PeakMotifSummary};
pub use query::{get_motif, query_motif, GET_MOTIF_FILE, QUERY_MOTIF_FILE};
pub use tracks::{
    TrackSummary, ATPM_GROUP, DATA, EXPRESSION_NEGATIVE_GROUP, EXPRESSION_POSITIVE_GROUP,
    MOTIF_NAMES, PEAK_NAMES, TSS_GROUP,
};
