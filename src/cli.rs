use crate::{
    core::GeneKey,
    preprocess_utils::{DEFAULT_INDEX_URL, DEFAULT_MOTIF_URL},
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface definition.
#[derive(Debug, Parser)]
#[command(
    name = "peakmotif",
    version,
    about = "Peak/motif preprocessing: motif queries, peak-motif matrices and celltype tracks"
)]
pub struct Cli {
    /// Worker threads for overlap searches (defaults to all cores).
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download a motif scan and its tabix index.
    DownloadMotif {
        /// URL of the bgzipped motif BED.
        #[arg(long = "motif-url", default_value = DEFAULT_MOTIF_URL)]
        motif_url: String,

        /// URL of the matching tabix index.
        #[arg(long = "index-url", default_value = DEFAULT_INDEX_URL)]
        index_url: String,

        /// Directory receiving both files.
        #[arg(short = 'o', long = "out", value_name = "DIR")]
        out: PathBuf,
    },
    /// Write the motif records overlapping any peak to <OUT>/query_motif.bed.
    QueryMotif {
        /// Peak BED file.
        #[arg(long, value_name = "BED")]
        peaks: PathBuf,

        /// Motif scan BED (plain, gzip or bgzip).
        #[arg(long, value_name = "BED")]
        motifs: PathBuf,

        #[arg(short = 'o', long = "out", value_name = "DIR")]
        out: PathBuf,
    },
    /// Pair peaks with overlapping motifs into <OUT>/get_motif.bed.
    GetMotif {
        #[arg(long, value_name = "BED")]
        peaks: PathBuf,

        /// Motif BED, usually the query-motif output.
        #[arg(long, value_name = "BED")]
        motifs: PathBuf,

        #[arg(short = 'o', long = "out", value_name = "DIR")]
        out: PathBuf,
    },
    /// Build the peak x motif matrix store.
    CreatePeakMotif {
        /// Peak/motif pairs produced by get-motif.
        #[arg(long = "peak-motif", value_name = "BED")]
        peak_motif: PathBuf,

        /// Peak BED defining the matrix rows.
        #[arg(long, value_name = "BED")]
        peaks: PathBuf,

        /// Output store directory (replaced if present).
        #[arg(short = 'o', long, value_name = "ZARR")]
        output: PathBuf,
    },
    /// Add a per-peak aTPM track for one celltype.
    AddAtpm {
        #[arg(long, value_name = "ZARR")]
        zarr: PathBuf,

        /// BED with chrom, start, end, value.
        #[arg(long, value_name = "BED")]
        bed: PathBuf,

        #[arg(long)]
        celltype: String,

        /// Treat the value column as raw counts and normalize them.
        #[arg(long)]
        counts: bool,
    },
    /// Add strand-specific expression and TSS tracks for one celltype.
    AddExp {
        #[arg(long, value_name = "ZARR")]
        zarr: PathBuf,

        /// Expression table (CSV/TSV) with a TPM column.
        #[arg(long, value_name = "FILE")]
        rna: PathBuf,

        /// Accessible peaks of this celltype.
        #[arg(long, value_name = "BED")]
        atac: PathBuf,

        #[arg(long)]
        celltype: String,

        /// Gene annotation GTF (plain or gzip).
        #[arg(long, value_name = "GTF")]
        annotation: PathBuf,

        /// Flank around each peak searched for TSSs.
        #[arg(long = "extend-bp", default_value_t = 300)]
        extend_bp: u64,

        /// Identifier joining expression rows to genes.
        #[arg(long = "gene-key", value_enum, default_value_t = GeneKey::GeneName)]
        gene_key: GeneKey,

        /// Store raw TPM instead of log10(TPM + 1).
        #[arg(long = "no-log")]
        no_log: bool,
    },
    /// Run the full preprocessing chain from a TOML config.
    Pipeline {
        #[arg(long, value_name = "TOML")]
        config: PathBuf,
    },
}
