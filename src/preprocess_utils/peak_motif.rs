use super::tracks::{DATA, MOTIF_NAMES, PEAK_NAMES};
use crate::{
    core::Interval,
    io::{
        bed::{read_peak_motifs, read_unique_peaks},
        ZarrStore,
    },
};
use anyhow::{bail, Context, Result};
use ndarray::Array2;
use serde_json::{Map, Value};
use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeakMotifSummary {
    pub peaks: usize,
    pub motifs: usize,
    pub nonzero: usize,
    pub skipped_records: usize,
}

/// Builds the peak x motif score matrix and writes it as a new store.
///
/// Rows follow `peak_bed`; columns are the sorted motif names found in
/// `peak_motif_bed`. Scores of repeated (peak, motif) pairs are summed.
pub fn create_peak_motif(
    peak_motif_bed: &Path,
    output: &Path,
    peak_bed: &Path,
) -> Result<PeakMotifSummary> {
    let peaks = read_unique_peaks(peak_bed)?;
    if peaks.is_empty() {
        bail!("no peaks found in {}", peak_bed.display());
    }
    let records = read_peak_motifs(peak_motif_bed)?;

    let motif_names: Vec<String> = records
        .iter()
        .map(|record| record.motif.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let columns: HashMap<&str, usize> = motif_names
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();
    let rows: HashMap<&Interval, usize> = peaks
        .iter()
        .enumerate()
        .map(|(idx, peak)| (peak, idx))
        .collect();

    let mut matrix = Array2::<f32>::zeros((peaks.len(), motif_names.len()));
    let mut skipped = 0usize;
    for record in &records {
        let Some(&row) = rows.get(&record.peak) else {
            skipped += 1;
            continue;
        };
        let col = columns[record.motif.as_str()];
        matrix[[row, col]] += record.score;
    }
    if skipped > 0 {
        warn!(
            skipped,
            source = %peak_motif_bed.display(),
            "create_peak_motif: records reference peaks absent from the peak set"
        );
    }
    let nonzero = matrix.iter().filter(|value| **value != 0.0).count();

    let store = ZarrStore::create(output)
        .with_context(|| format!("failed to create store {}", output.display()))?;
    let peak_names: Vec<String> = peaks.iter().map(Interval::name).collect();
    store.write_strings(PEAK_NAMES, &peak_names)?;
    store.write_strings(MOTIF_NAMES, &motif_names)?;
    let values = matrix
        .as_slice()
        .context("peak-motif matrix is not contiguous")?;
    store
        .write(DATA, &[peaks.len(), motif_names.len()], values)
        .with_context(|| format!("failed to write matrix to {}", output.display()))?;

    let mut attrs = Map::new();
    attrs.insert("n_peaks".to_string(), Value::from(peaks.len()));
    attrs.insert("n_motifs".to_string(), Value::from(motif_names.len()));
    attrs.insert(
        "peak_motif_source".to_string(),
        Value::from(peak_motif_bed.display().to_string()),
    );
    store.update_attributes("", attrs)?;

    let summary = PeakMotifSummary {
        peaks: peaks.len(),
        motifs: motif_names.len(),
        nonzero,
        skipped_records: skipped,
    };
    info!(
        peaks = summary.peaks,
        motifs = summary.motifs,
        nonzero = summary.nonzero,
        output = %output.display(),
        "create_peak_motif: wrote peak-motif matrix"
    );
    Ok(summary)
}
