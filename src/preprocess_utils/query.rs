use crate::{
    core::{Interval, IntervalIndex, PeakMotif},
    io::{
        bed::{
            is_bgzf, parse_interval, read_motif_hits, read_peaks, visit_records,
            write_peak_motifs,
        },
        download::index_path_for,
    },
};
use anyhow::{Context, Result};
use noodles_tabix as tabix;
use rayon::prelude::*;
use std::{
    collections::HashMap,
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

pub const QUERY_MOTIF_FILE: &str = "query_motif.bed";
pub const GET_MOTIF_FILE: &str = "get_motif.bed";

/// Extracts the motif records that overlap any peak.
///
/// Writes `<base_dir>/query_motif.bed` holding the matching motif lines
/// unchanged, each at most once. A BGZF motif file with a `<motif>.tbi`
/// beside it is queried through the index, one merged peak region at a
/// time; anything else is scanned from start to end in file order.
pub fn query_motif(peak_bed: &Path, motif_bed: &Path, base_dir: &Path) -> Result<PathBuf> {
    let peaks = read_peaks(peak_bed)?;
    let n_peaks = peaks.len();

    fs::create_dir_all(base_dir)
        .with_context(|| format!("failed to create {}", base_dir.display()))?;
    let output = base_dir.join(QUERY_MOTIF_FILE);
    let file =
        File::create(&output).with_context(|| format!("unable to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    let index = index_path_for(motif_bed);
    let indexed = index.is_file() && is_bgzf(motif_bed)?;
    if index.is_file() && !indexed {
        warn!(
            index = %index.display(),
            "query_motif: motif file is not BGZF compressed, ignoring its index"
        );
    }
    let (scanned, kept) = if indexed {
        query_indexed(motif_bed, &merge_regions(&peaks), &mut writer)?
    } else {
        query_scan(motif_bed, peaks, &mut writer)?
    };
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", output.display()))?;

    info!(
        peaks = n_peaks,
        indexed,
        scanned,
        kept,
        output = %output.display(),
        "query_motif: selected motif records overlapping peaks"
    );
    Ok(output)
}

/// Collapses overlapping or touching peaks per chromosome.
///
/// Chromosomes keep the order of their first peak; regions within a
/// chromosome are sorted by position.
fn merge_regions(peaks: &[Interval]) -> Vec<Interval> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_chrom: HashMap<&str, Vec<(u64, u64)>> = HashMap::new();
    for peak in peaks {
        by_chrom
            .entry(peak.chrom.as_str())
            .or_insert_with(|| {
                order.push(peak.chrom.as_str());
                Vec::new()
            })
            .push((peak.start, peak.end));
    }

    let mut merged = Vec::new();
    for chrom in order {
        let mut spans = by_chrom.remove(chrom).unwrap_or_default();
        spans.sort_unstable();
        let mut current: Option<(u64, u64)> = None;
        for (start, end) in spans {
            current = match current {
                Some((open, close)) if start <= close => Some((open, close.max(end))),
                Some((open, close)) => {
                    merged.push(region(chrom, open, close));
                    Some((start, end))
                }
                None => Some((start, end)),
            };
        }
        if let Some((open, close)) = current {
            merged.push(region(chrom, open, close));
        }
    }
    merged
}

fn region(chrom: &str, start: u64, end: u64) -> Interval {
    Interval {
        chrom: chrom.to_string(),
        start,
        end,
    }
}

fn query_indexed<W: Write>(
    motif_bed: &Path,
    regions: &[Interval],
    writer: &mut W,
) -> Result<(usize, usize)> {
    let mut reader = tabix::io::indexed_reader::Builder::default()
        .build_from_path(motif_bed)
        .with_context(|| format!("failed to open {} with its tabix index", motif_bed.display()))?;

    let mut scanned = 0usize;
    let mut kept = 0usize;
    let mut previous: Option<&Interval> = None;
    for region in regions {
        // 1-based, closed
        let query_region = format!("{}:{}-{}", region.chrom, region.start + 1, region.end).parse()?;
        let query = match reader.query(&query_region) {
            Ok(query) => query,
            Err(err) if err.kind() == io::ErrorKind::InvalidInput => {
                debug!(chrom = %region.chrom, "query_motif: contig absent from motif index");
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to query {} for {region}", motif_bed.display())
                })
            }
        };
        for result in query {
            let record =
                result.with_context(|| format!("failed to read {}", motif_bed.display()))?;
            let line: &str = record.as_ref();
            scanned += 1;
            let fields: Vec<&str> = line.split('\t').collect();
            let hit = parse_interval(&fields)
                .with_context(|| format!("invalid record in {}: {line}", motif_bed.display()))?;
            // regions are disjoint and sorted, so a repeat can only come from the previous one
            if previous.is_some_and(|prev| prev.overlaps(&hit)) {
                continue;
            }
            writeln!(writer, "{line}")?;
            kept += 1;
        }
        previous = Some(region);
    }
    Ok((scanned, kept))
}

fn query_scan<W: Write>(
    motif_bed: &Path,
    peaks: Vec<Interval>,
    writer: &mut W,
) -> Result<(usize, usize)> {
    let index = IntervalIndex::new(peaks.into_iter().map(|peak| (peak, ())));
    let mut scanned = 0usize;
    let mut kept = 0usize;
    visit_records(motif_bed, |line, fields| {
        scanned += 1;
        let motif = parse_interval(fields)?;
        if index.overlaps_any(&motif.chrom, motif.start, motif.end) {
            writeln!(writer, "{line}")?;
            kept += 1;
        }
        Ok(())
    })?;
    Ok((scanned, kept))
}

/// Pairs every peak with each motif hit overlapping it.
///
/// Writes `<base_dir>/get_motif.bed` with columns chrom, start, end (of the
/// peak), motif, score, strand. Peaks keep their input order; hits within a
/// peak are ordered by position.
pub fn get_motif(peak_file: &Path, motif_file: &Path, base_dir: &Path) -> Result<PathBuf> {
    let peaks = read_peaks(peak_file)?;
    let hits = read_motif_hits(motif_file)?;
    let n_hits = hits.len();
    let index = IntervalIndex::new(hits.into_iter().map(|hit| (hit.interval.clone(), hit)));

    let rows: Vec<Vec<PeakMotif>> = peaks
        .par_iter()
        .map(|peak| {
            index
                .overlapping(&peak.chrom, peak.start, peak.end)
                .map(|hit| PeakMotif::new(peak, hit))
                .collect()
        })
        .collect();

    fs::create_dir_all(base_dir)
        .with_context(|| format!("failed to create {}", base_dir.display()))?;
    let output = base_dir.join(GET_MOTIF_FILE);
    let written = write_peak_motifs(&output, rows.iter().flatten())?;
    let covered = rows.iter().filter(|r| !r.is_empty()).count();

    info!(
        peaks = peaks.len(),
        motif_hits = n_hits,
        peaks_with_motifs = covered,
        rows = written,
        output = %output.display(),
        "get_motif: intersected peaks with motif hits"
    );
    Ok(output)
}
