use crate::core::{Interval, MotifHit, PeakMotif};
use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;
use noodles_bgzf as bgzf;
use std::{
    collections::HashSet,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::Path,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    Plain,
    Gzip,
    Bgzf,
}

impl Compression {
    fn detect(prefix: &[u8]) -> Self {
        if prefix.len() < 2 || prefix[0] != 0x1f || prefix[1] != 0x8b {
            return Compression::Plain;
        }
        let has_extra = prefix.get(3).map(|flags| flags & 0x04 != 0).unwrap_or(false);
        if has_extra && prefix.get(12) == Some(&b'B') && prefix.get(13) == Some(&b'C') {
            Compression::Bgzf
        } else {
            Compression::Gzip
        }
    }
}

fn sniff(file: &mut File, path: &Path) -> Result<Compression> {
    let mut prefix = Vec::with_capacity(18);
    std::io::Read::by_ref(file)
        .take(18)
        .read_to_end(&mut prefix)
        .with_context(|| format!("failed to read {}", path.display()))?;
    file.seek(SeekFrom::Start(0))?;
    Ok(Compression::detect(&prefix))
}

/// Whether `path` is BGZF compressed and can therefore carry a tabix index.
pub fn is_bgzf(path: &Path) -> Result<bool> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(sniff(&mut file, path)? == Compression::Bgzf)
}

/// Opens a text file that may be plain, gzip, or BGZF compressed.
pub fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;

    let reader: Box<dyn BufRead> = match sniff(&mut file, path)? {
        Compression::Bgzf => Box::new(BufReader::new(bgzf::io::Reader::new(file))),
        Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        Compression::Plain => Box::new(BufReader::new(file)),
    };
    Ok(reader)
}

fn is_skippable(line: &str) -> bool {
    line.trim().is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

/// Calls `visitor` with the raw line and its tab-separated fields for every
/// data line. Errors are reported with the file and line number.
pub fn visit_records<F>(path: &Path, mut visitor: F) -> Result<()>
where
    F: FnMut(&str, &[&str]) -> Result<()>,
{
    let mut reader = open_text(path)?;
    let mut buffer = String::new();
    let mut line_no = 0usize;
    loop {
        buffer.clear();
        let bytes = reader
            .read_line(&mut buffer)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if bytes == 0 {
            break;
        }
        line_no += 1;
        let line = buffer.trim_end_matches(['\n', '\r']);
        if is_skippable(line) {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        visitor(line, &fields)
            .with_context(|| format!("invalid record at {}:{}", path.display(), line_no))?;
    }
    Ok(())
}

pub fn parse_interval(fields: &[&str]) -> Result<Interval> {
    if fields.len() < 3 {
        bail!(
            "BED record needs at least 3 columns (chrom, start, end), got {}",
            fields.len()
        );
    }
    let start: u64 = fields[1]
        .trim()
        .parse()
        .with_context(|| format!("invalid start `{}`", fields[1]))?;
    let end: u64 = fields[2]
        .trim()
        .parse()
        .with_context(|| format!("invalid end `{}`", fields[2]))?;
    Interval::new(fields[0].trim(), start, end)
}

pub fn read_peaks(path: &Path) -> Result<Vec<Interval>> {
    let mut peaks = Vec::new();
    visit_records(path, |_, fields| {
        peaks.push(parse_interval(fields)?);
        Ok(())
    })?;
    Ok(peaks)
}

/// Reads peaks that must be unique, as they become matrix rows.
pub fn read_unique_peaks(path: &Path) -> Result<Vec<Interval>> {
    let peaks = read_peaks(path)?;
    let mut seen = HashSet::with_capacity(peaks.len());
    for peak in &peaks {
        if !seen.insert(peak) {
            bail!("duplicate peak {} in {}", peak, path.display());
        }
    }
    Ok(peaks)
}

/// Reads peaks paired with a numeric value from the 0-based `column`.
pub fn read_peak_values(path: &Path, column: usize) -> Result<Vec<(Interval, f32)>> {
    let mut values = Vec::new();
    visit_records(path, |_, fields| {
        let peak = parse_interval(fields)?;
        let raw = fields
            .get(column)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .with_context(|| format!("missing value column {}", column + 1))?;
        let value: f32 = raw
            .parse()
            .with_context(|| format!("invalid value `{raw}` in column {}", column + 1))?;
        if !value.is_finite() {
            bail!("value `{raw}` in column {} is not finite", column + 1);
        }
        values.push((peak, value));
        Ok(())
    })?;
    Ok(values)
}

pub fn read_motif_hits(path: &Path) -> Result<Vec<MotifHit>> {
    let mut hits = Vec::new();
    visit_records(path, |_, fields| {
        hits.push(MotifHit::from_fields(fields)?);
        Ok(())
    })?;
    Ok(hits)
}

pub fn read_peak_motifs(path: &Path) -> Result<Vec<PeakMotif>> {
    let mut rows = Vec::new();
    visit_records(path, |_, fields| {
        rows.push(PeakMotif::from_fields(fields)?);
        Ok(())
    })?;
    Ok(rows)
}

pub fn write_peak_motifs<'a, I>(path: &Path, rows: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a PeakMotif>,
{
    let file =
        File::create(path).with_context(|| format!("unable to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;
    for row in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.peak.chrom, row.peak.start, row.peak.end, row.motif, row.score, row.strand
        )?;
        count += 1;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(count)
}
