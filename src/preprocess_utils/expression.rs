use super::tracks::{
    validate_celltype, PeakRows, EXPRESSION_NEGATIVE_GROUP, EXPRESSION_POSITIVE_GROUP, TSS_GROUP,
};
use crate::{
    core::{GeneKey, GeneTss, Interval, IntervalIndex, Strand},
    io::{bed::read_peaks, load_expression, load_gene_tss},
};
use anyhow::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path};
use tracing::{info, warn};

/// Tuning for [`add_exp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionOptions {
    /// Flank added to both sides of a peak when looking for TSSs.
    pub extend_bp: u64,
    pub gene_key: GeneKey,
    /// Store `log10(TPM + 1)` instead of raw TPM.
    pub log_transform: bool,
}

impl Default for ExpressionOptions {
    fn default() -> Self {
        Self {
            extend_bp: 300,
            gene_key: GeneKey::GeneName,
            log_transform: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionSummary {
    pub celltype: String,
    pub peaks: usize,
    pub accessible_peaks: usize,
    pub expressed_genes: usize,
    pub tss_peaks: usize,
    pub expressed_peaks: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct PeakExpression {
    positive: f32,
    negative: f32,
    tss: bool,
}

/// Adds strand-specific expression and TSS flags for `celltype`.
///
/// Only peaks listed in `atac_file` and present in the store receive values.
/// A gene contributes to a peak when its TSS lies within
/// `options.extend_bp` of the peak; per strand the highest expression wins.
pub fn add_exp(
    zarr_file: &Path,
    rna_file: &Path,
    atac_file: &Path,
    celltype: &str,
    annotation: &Path,
    options: &ExpressionOptions,
) -> Result<ExpressionSummary> {
    validate_celltype(celltype)?;
    let rows = PeakRows::open(zarr_file)?;
    let lookup = rows.lookup();

    let mut seen = HashSet::new();
    let accessible: Vec<(usize, Interval)> = read_peaks(atac_file)?
        .into_iter()
        .filter_map(|peak| {
            let row = *lookup.get(peak.name().as_str())?;
            seen.insert(row).then_some((row, peak))
        })
        .collect();
    if accessible.is_empty() {
        warn!(
            celltype,
            atac = %atac_file.display(),
            "add_exp: no accessible peaks match the store; tracks will be empty"
        );
    }

    let expression = load_expression(rna_file, options.gene_key)?;
    let genes = load_gene_tss(annotation)?;
    let expressed_genes = genes
        .iter()
        .map(|gene| gene.key(options.gene_key))
        .filter(|key| expression.contains_key(*key))
        .collect::<HashSet<_>>()
        .len();
    if expressed_genes == 0 {
        warn!(
            celltype,
            gene_key = options.gene_key.column(),
            "add_exp: no expression rows match annotated genes"
        );
    }

    let tss_entries = genes
        .into_iter()
        .map(|gene| -> Result<(Interval, GeneTss)> {
            let tss = Interval::new(gene.chrom.clone(), gene.position, gene.position + 1)?;
            Ok((tss, gene))
        })
        .collect::<Result<Vec<_>>>()?;
    let tss_index = IntervalIndex::new(tss_entries);

    let assigned: Vec<(usize, PeakExpression)> = accessible
        .par_iter()
        .map(|(row, peak)| {
            let window = peak.extend(options.extend_bp);
            let mut values = PeakExpression::default();
            for gene in tss_index.overlapping(&window.chrom, window.start, window.end) {
                values.tss = true;
                let Some(tpm) = expression.get(gene.key(options.gene_key)) else {
                    continue;
                };
                let value = if options.log_transform {
                    (tpm + 1.0).log10()
                } else {
                    *tpm
                };
                match gene.strand {
                    Strand::Forward => values.positive = values.positive.max(value),
                    Strand::Reverse => values.negative = values.negative.max(value),
                    Strand::Unknown => {
                        values.positive = values.positive.max(value);
                        values.negative = values.negative.max(value);
                    }
                }
            }
            (*row, values)
        })
        .collect();

    let mut positive = vec![0f32; rows.len()];
    let mut negative = vec![0f32; rows.len()];
    let mut tss = vec![0u8; rows.len()];
    let mut expressed_peaks = 0usize;
    for (row, values) in &assigned {
        positive[*row] = values.positive;
        negative[*row] = values.negative;
        tss[*row] = u8::from(values.tss);
        if values.positive > 0.0 || values.negative > 0.0 {
            expressed_peaks += 1;
        }
    }

    rows.write_track(EXPRESSION_POSITIVE_GROUP, celltype, &positive)?;
    rows.write_track(EXPRESSION_NEGATIVE_GROUP, celltype, &negative)?;
    rows.write_track(TSS_GROUP, celltype, &tss)?;

    let summary = ExpressionSummary {
        celltype: celltype.to_string(),
        peaks: rows.len(),
        accessible_peaks: accessible.len(),
        expressed_genes,
        tss_peaks: tss.iter().filter(|flag| **flag == 1).count(),
        expressed_peaks,
    };
    info!(
        celltype,
        peaks = summary.peaks,
        accessible = summary.accessible_peaks,
        store_peaks_without_atac = summary.peaks - summary.accessible_peaks,
        expressed_genes,
        tss_peaks = summary.tss_peaks,
        expressed_peaks,
        "add_exp: stored expression and TSS tracks"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ZarrStore;
    use crate::preprocess_utils::PEAK_NAMES;
    use std::fs;

    const GTF: &str = "\
chr1\tTEST\tgene\t1001\t5000\t.\t+\t.\tgene_id \"ENSG1.1\"; gene_name \"UP\";
chr1\tTEST\tgene\t2000\t2250\t.\t-\t.\tgene_id \"ENSG2.1\"; gene_name \"DOWN\";
chr1\tTEST\tgene\t9001\t9500\t.\t+\t.\tgene_id \"ENSG3.1\"; gene_name \"SILENT\";
chr2\tTEST\tgene\t101\t900\t.\t+\t.\tgene_id \"ENSG4.1\"; gene_name \"FAR\";
";

    struct Fixture {
        _dir: tempfile::TempDir,
        zarr: std::path::PathBuf,
        rna: std::path::PathBuf,
        atac: std::path::PathBuf,
        gtf: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let zarr = dir.path().join("p.zarr");
        let store = ZarrStore::create(&zarr).unwrap();
        let names = [
            "chr1:900-1100",
            "chr1:2300-2400",
            "chr1:8000-8100",
            "chr1:9000-9100",
            "chr2:2000-2100",
        ]
        .map(String::from);
        store.write_strings(PEAK_NAMES, &names).unwrap();

        let rna = dir.path().join("rna.csv");
        fs::write(&rna, "gene_name,gene_id,TPM\nUP,ENSG1.1,9\nDOWN,ENSG2.1,99\nFAR,ENSG4.1,5\n")
            .unwrap();
        let atac = dir.path().join("atac.bed");
        fs::write(
            &atac,
            "chr1\t900\t1100\nchr1\t2300\t2400\nchr1\t9000\t9100\nchr2\t2000\t2100\nchr7\t0\t10\n",
        )
        .unwrap();
        let gtf = dir.path().join("genes.gtf");
        fs::write(&gtf, GTF).unwrap();

        Fixture {
            _dir: dir,
            zarr,
            rna,
            atac,
            gtf,
        }
    }

    #[test]
    fn assigns_strand_specific_expression() -> Result<()> {
        let fx = fixture();
        let summary = add_exp(
            &fx.zarr,
            &fx.rna,
            &fx.atac,
            "HepG2",
            &fx.gtf,
            &ExpressionOptions::default(),
        )?;

        assert_eq!(summary.peaks, 5);
        assert_eq!(summary.accessible_peaks, 4);
        assert_eq!(summary.expressed_genes, 3);
        assert_eq!(summary.tss_peaks, 3);
        assert_eq!(summary.expressed_peaks, 2);

        let store = ZarrStore::open(&fx.zarr)?;
        let positive = store.read::<f32>("expression_positive/HepG2")?.data;
        let negative = store.read::<f32>("expression_negative/HepG2")?.data;
        let tss = store.read::<u8>("tss/HepG2")?.data;

        assert!((positive[0] - 1.0).abs() < 1e-6);
        assert_eq!(negative[0], 0.0);
        assert!((negative[1] - 2.0).abs() < 1e-6);
        assert_eq!(positive[1], 0.0);
        assert_eq!(tss, vec![1, 1, 0, 1, 0]);
        assert_eq!(positive[3], 0.0);
        assert_eq!(positive[4], 0.0);
        Ok(())
    }

    #[test]
    fn narrow_window_and_raw_values() -> Result<()> {
        let fx = fixture();
        let options = ExpressionOptions {
            extend_bp: 0,
            gene_key: GeneKey::GeneId,
            log_transform: false,
        };
        let summary = add_exp(&fx.zarr, &fx.rna, &fx.atac, "raw", &fx.gtf, &options)?;
        assert_eq!(summary.tss_peaks, 2);

        let store = ZarrStore::open(&fx.zarr)?;
        let positive = store.read::<f32>("expression_positive/raw")?.data;
        let negative = store.read::<f32>("expression_negative/raw")?.data;
        assert_eq!(positive[0], 9.0);
        assert_eq!(negative[1], 0.0);
        Ok(())
    }

    #[test]
    fn unstranded_genes_fill_both_strands() -> Result<()> {
        let fx = fixture();
        fs::write(
            &fx.gtf,
            "chr1\tTEST\tgene\t9051\t9800\t.\t.\t.\tgene_id \"ENSG5.1\"; gene_name \"BOTH\";\n",
        )?;
        fs::write(&fx.rna, "gene_name,TPM\nBOTH,999\n")?;

        let summary = add_exp(
            &fx.zarr,
            &fx.rna,
            &fx.atac,
            "unstranded",
            &fx.gtf,
            &ExpressionOptions::default(),
        )?;
        assert_eq!(summary.tss_peaks, 1);
        assert_eq!(summary.expressed_peaks, 1);

        let store = ZarrStore::open(&fx.zarr)?;
        let positive = store.read::<f32>("expression_positive/unstranded")?.data;
        let negative = store.read::<f32>("expression_negative/unstranded")?.data;
        assert!((positive[3] - 3.0).abs() < 1e-6);
        assert!((negative[3] - 3.0).abs() < 1e-6);
        assert_eq!(store.read::<u8>("tss/unstranded")?.data, vec![0, 0, 0, 1, 0]);
        Ok(())
    }
}
