pub mod annotation;
pub mod bed;
pub mod download;
pub mod expression;
pub mod zarr;

pub use annotation::load_gene_tss;
pub use expression::load_expression;
pub use zarr::{StoredArray, ZarrStore};
