use super::Interval;
use anyhow::{bail, Context, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
    Unknown,
}

impl Strand {
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            "." | "" => Ok(Strand::Unknown),
            other => bail!("unsupported strand `{other}`"),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unknown => '.',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A scored motif archetype occurrence from a motif scan BED.
///
/// Columns: chrom, start, end, motif name, score, strand. Any further columns
/// are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct MotifHit {
    pub interval: Interval,
    pub motif: String,
    pub score: f32,
    pub strand: Strand,
}

impl MotifHit {
    pub fn from_fields(fields: &[&str]) -> Result<Self> {
        if fields.len() < 5 {
            bail!(
                "motif record needs at least 5 columns (chrom, start, end, motif, score), got {}",
                fields.len()
            );
        }
        let start: u64 = fields[1]
            .parse()
            .with_context(|| format!("invalid motif start `{}`", fields[1]))?;
        let end: u64 = fields[2]
            .parse()
            .with_context(|| format!("invalid motif end `{}`", fields[2]))?;
        let interval = Interval::new(fields[0], start, end)?;

        let motif = fields[3].trim();
        if motif.is_empty() {
            bail!("motif name may not be empty");
        }
        let score: f32 = fields[4]
            .parse()
            .with_context(|| format!("invalid motif score `{}`", fields[4]))?;
        let strand = match fields.get(5) {
            Some(token) => Strand::parse(token)?,
            None => Strand::Unknown,
        };

        Ok(Self {
            interval,
            motif: motif.to_string(),
            score,
            strand,
        })
    }
}

/// One row of a peak/motif intersection: the peak coordinates paired with
/// the motif that overlaps it.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakMotif {
    pub peak: Interval,
    pub motif: String,
    pub score: f32,
    pub strand: Strand,
}

impl PeakMotif {
    pub fn new(peak: &Interval, hit: &MotifHit) -> Self {
        Self {
            peak: peak.clone(),
            motif: hit.motif.clone(),
            score: hit.score,
            strand: hit.strand,
        }
    }

    pub fn from_fields(fields: &[&str]) -> Result<Self> {
        let hit = MotifHit::from_fields(fields)?;
        Ok(Self {
            peak: hit.interval,
            motif: hit.motif,
            score: hit.score,
            strand: hit.strand,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_archetype_record() {
        let fields = ["chr1", "10", "22", "AHR", "9.81", "-", "AHR_MA0006.1"];
        let hit = MotifHit::from_fields(&fields).unwrap();
        assert_eq!(hit.interval, Interval::new("chr1", 10, 22).unwrap());
        assert_eq!(hit.motif, "AHR");
        assert!((hit.score - 9.81).abs() < 1e-6);
        assert_eq!(hit.strand, Strand::Reverse);
    }

    #[test]
    fn strand_column_is_optional() {
        let hit = MotifHit::from_fields(&["chr1", "10", "22", "CTCF", "3"]).unwrap();
        assert_eq!(hit.strand, Strand::Unknown);
    }

    #[test]
    fn rejects_short_or_malformed_records() {
        assert!(MotifHit::from_fields(&["chr1", "10", "22", "CTCF"]).is_err());
        assert!(MotifHit::from_fields(&["chr1", "10", "22", "CTCF", "high"]).is_err());
        assert!(MotifHit::from_fields(&["chr1", "10", "22", "CTCF", "1", "*"]).is_err());
    }
}
