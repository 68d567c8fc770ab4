pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod preprocess_utils;

pub use preprocess_utils::{
    add_atpm, add_exp, create_peak_motif, download_motif, get_motif, query_motif,
};
