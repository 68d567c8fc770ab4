use crate::{
    core::GeneKey,
    preprocess_utils::{
        add_atpm, add_atpm_counts, add_exp, create_peak_motif, ExpressionOptions,
    },
};
use anyhow::Result;
use std::path::PathBuf;

pub fn create(peak_motif: PathBuf, peaks: PathBuf, output: PathBuf) -> Result<()> {
    let summary = create_peak_motif(&peak_motif, &output, &peaks)?;
    println!(
        "{}\tpeaks={}\tmotifs={}\tnonzero={}",
        output.display(),
        summary.peaks,
        summary.motifs,
        summary.nonzero
    );
    Ok(())
}

pub fn atpm(zarr: PathBuf, bed: PathBuf, celltype: String, counts: bool) -> Result<()> {
    let summary = if counts {
        add_atpm_counts(&zarr, &bed, &celltype)?
    } else {
        add_atpm(&zarr, &bed, &celltype)?
    };
    println!(
        "{}\tmatched={}\tunmatched={}",
        summary.celltype, summary.matched, summary.unmatched
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn expression(
    zarr: PathBuf,
    rna: PathBuf,
    atac: PathBuf,
    celltype: String,
    annotation: PathBuf,
    extend_bp: u64,
    gene_key: GeneKey,
    no_log: bool,
) -> Result<()> {
    let options = ExpressionOptions {
        extend_bp,
        gene_key,
        log_transform: !no_log,
    };
    let summary = add_exp(&zarr, &rna, &atac, &celltype, &annotation, &options)?;
    println!(
        "{}\ttss_peaks={}\texpressed_peaks={}\texpressed_genes={}",
        summary.celltype, summary.tss_peaks, summary.expressed_peaks, summary.expressed_genes
    );
    Ok(())
}
