use crate::{
    config::PipelineConfig,
    preprocess_utils::{
        add_atpm, add_atpm_counts, add_exp, create_peak_motif, download_motif, get_motif,
        query_motif,
    },
};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tracing::info;

pub fn run(config_path: PathBuf) -> Result<()> {
    let config = PipelineConfig::load(&config_path)?;
    execute(&config)
}

/// Runs query -> intersect -> matrix, then the per-celltype tracks.
pub fn execute(config: &PipelineConfig) -> Result<()> {
    let motif_path = match (&config.motif.path, &config.motif.download) {
        (Some(path), _) => path.clone(),
        (None, Some(download)) => {
            log_step(format!("downloading motif scan into {}", download.dir.display()));
            download_motif(&download.url, &download.index_url, &download.dir)?
        }
        (None, None) => bail!("[motif] needs either `path` or a `download` table"),
    };

    log_step(format!("querying motifs in {}", motif_path.display()));
    let queried = query_motif(&config.peaks, &motif_path, &config.output.dir)?;
    log_step("intersecting peaks with motif hits");
    let pairs = get_motif(&config.peaks, &queried, &config.output.dir)?;

    let zarr = config.zarr_path();
    log_step(format!("building peak-motif store {}", zarr.display()));
    create_peak_motif(&pairs, &zarr, &config.peaks)?;

    for celltype in &config.celltypes {
        if let Some(atpm) = &celltype.atpm {
            log_step(format!("adding aTPM for {}", celltype.name));
            if celltype.counts {
                add_atpm_counts(&zarr, atpm, &celltype.name)?;
            } else {
                add_atpm(&zarr, atpm, &celltype.name)?;
            }
        }
        if let Some(rna) = &celltype.rna {
            let annotation = config
                .expression
                .annotation
                .as_ref()
                .context("expression requested without an annotation")?;
            let atac = celltype
                .atac_peaks()
                .context("expression requested without accessible peaks")?;
            log_step(format!("adding expression for {}", celltype.name));
            add_exp(
                &zarr,
                rna,
                atac,
                &celltype.name,
                annotation,
                &config.expression.options(),
            )?;
        }
    }

    println!("{}", zarr.display());
    Ok(())
}

fn log_step(msg: impl AsRef<str>) {
    info!("[peakmotif::pipeline] {}", msg.as_ref());
}
