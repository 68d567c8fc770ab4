pub mod motifs;
pub mod pipeline;
pub mod store;

use crate::cli::{Cli, Command};
use anyhow::{Context, Result};

pub fn run(cli: Cli) -> Result<()> {
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure worker threads")?;
    }

    match cli.command {
        Command::DownloadMotif {
            motif_url,
            index_url,
            out,
        } => motifs::download(motif_url, index_url, out),
        Command::QueryMotif {
            peaks,
            motifs: motif_bed,
            out,
        } => motifs::query(peaks, motif_bed, out),
        Command::GetMotif {
            peaks,
            motifs: motif_bed,
            out,
        } => motifs::intersect(peaks, motif_bed, out),
        Command::CreatePeakMotif {
            peak_motif,
            peaks,
            output,
        } => store::create(peak_motif, peaks, output),
        Command::AddAtpm {
            zarr,
            bed,
            celltype,
            counts,
        } => store::atpm(zarr, bed, celltype, counts),
        Command::AddExp {
            zarr,
            rna,
            atac,
            celltype,
            annotation,
            extend_bp,
            gene_key,
            no_log,
        } => store::expression(
            zarr, rna, atac, celltype, annotation, extend_bp, gene_key, no_log,
        ),
        Command::Pipeline { config } => pipeline::run(config),
    }
}
