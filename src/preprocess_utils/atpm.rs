use super::tracks::{validate_celltype, PeakRows, TrackSummary, ATPM_GROUP};
use crate::{core::Interval, io::bed::read_peak_values};
use anyhow::{bail, Result};
use std::path::Path;
use tracing::{info, warn};

const ATPM_SCALE: f64 = 1e5;

/// Adds the aTPM track of `celltype` to an existing peak store.
///
/// `bed_file` holds chrom, start, end, aTPM. Values are aligned to the
/// store's peaks by name; store peaks missing from the file get 0.
pub fn add_atpm(zarr_file: &Path, bed_file: &Path, celltype: &str) -> Result<TrackSummary> {
    validate_celltype(celltype)?;
    let values = read_peak_values(bed_file, 3)?;
    write_atpm(zarr_file, celltype, &values)
}

/// Like [`add_atpm`], but the value column holds raw per-peak counts that
/// are normalized with [`normalize_counts`] first.
pub fn add_atpm_counts(zarr_file: &Path, bed_file: &Path, celltype: &str) -> Result<TrackSummary> {
    validate_celltype(celltype)?;
    let mut values = read_peak_values(bed_file, 3)?;
    normalize_counts(&mut values)?;
    write_atpm(zarr_file, celltype, &values)
}

/// Converts raw counts to `log10(count / total * 1e5 + 1)`.
pub fn normalize_counts(values: &mut [(Interval, f32)]) -> Result<()> {
    if let Some((peak, count)) = values.iter().find(|(_, count)| *count < 0.0) {
        bail!("negative count {count} for peak {peak}");
    }
    let total: f64 = values.iter().map(|(_, count)| f64::from(*count)).sum();
    if total <= 0.0 {
        bail!("counts sum to zero; cannot normalize");
    }
    for (_, count) in values.iter_mut() {
        *count = (f64::from(*count) / total * ATPM_SCALE + 1.0).log10() as f32;
    }
    Ok(())
}

fn write_atpm(
    zarr_file: &Path,
    celltype: &str,
    values: &[(Interval, f32)],
) -> Result<TrackSummary> {
    let rows = PeakRows::open(zarr_file)?;
    let lookup = rows.lookup();
    let mut track = vec![0f32; rows.len()];
    let mut matched = 0usize;
    let mut unmatched = 0usize;
    for (peak, value) in values {
        match lookup.get(peak.name().as_str()) {
            Some(&row) => {
                track[row] = *value;
                matched += 1;
            }
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        warn!(
            celltype,
            unmatched, "add_atpm: peaks not present in the store were ignored"
        );
    }
    rows.write_track(ATPM_GROUP, celltype, &track)?;

    let summary = TrackSummary {
        celltype: celltype.to_string(),
        peaks: rows.len(),
        matched,
        unmatched,
    };
    info!(
        celltype,
        peaks = summary.peaks,
        matched,
        store = %zarr_file.display(),
        "add_atpm: stored accessibility track"
    );
    Ok(summary)
}
