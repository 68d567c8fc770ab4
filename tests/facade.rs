use anyhow::Result;
use peakmotif::preprocess_utils::{
    self, ExpressionOptions, ExpressionSummary, PeakMotifSummary, TrackSummary,
};
use std::path::{Path, PathBuf};

type MotifStep = fn(&Path, &Path, &Path) -> Result<PathBuf>;
type Download = fn(&str, &str, &Path) -> Result<PathBuf>;
type Matrix = fn(&Path, &Path, &Path) -> Result<PeakMotifSummary>;
type Atpm = fn(&Path, &Path, &str) -> Result<TrackSummary>;
type Expression =
    fn(&Path, &Path, &Path, &str, &Path, &ExpressionOptions) -> Result<ExpressionSummary>;

#[test]
fn crate_root_exposes_the_six_operations() {
    let pairs: [(usize, usize); 6] = [
        (
            peakmotif::add_atpm as Atpm as usize,
            preprocess_utils::add_atpm as Atpm as usize,
        ),
        (
            peakmotif::add_exp as Expression as usize,
            preprocess_utils::add_exp as Expression as usize,
        ),
        (
            peakmotif::create_peak_motif as Matrix as usize,
            preprocess_utils::create_peak_motif as Matrix as usize,
        ),
        (
            peakmotif::download_motif as Download as usize,
            preprocess_utils::download_motif as Download as usize,
        ),
        (
            peakmotif::get_motif as MotifStep as usize,
            preprocess_utils::get_motif as MotifStep as usize,
        ),
        (
            peakmotif::query_motif as MotifStep as usize,
            preprocess_utils::query_motif as MotifStep as usize,
        ),
    ];
    for (root, inner) in pairs {
        assert_eq!(root, inner);
    }
}

#[test]
fn reexport_behaves_like_the_internal_function() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let peaks = dir.path().join("peaks.bed");
    let motifs = dir.path().join("motifs.bed");
    std::fs::write(&peaks, "chr1\t0\t100\n")?;
    std::fs::write(&motifs, "chr1\t10\t20\tCTCF\t1\t+\nchr1\t200\t220\tAP1\t1\t+\n")?;

    let via_root = peakmotif::query_motif(&peaks, &motifs, &dir.path().join("root"))?;
    let via_inner = preprocess_utils::query_motif(&peaks, &motifs, &dir.path().join("inner"))?;
    assert_eq!(
        std::fs::read_to_string(via_root)?,
        std::fs::read_to_string(via_inner)?
    );
    Ok(())
}
