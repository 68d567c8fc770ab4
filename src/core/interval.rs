use anyhow::{bail, Context, Result};
use std::{fmt, str::FromStr};

/// Half-open, 0-based genomic interval as found in BED files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Result<Self> {
        let chrom = chrom.into();
        if chrom.is_empty() {
            bail!("interval chromosome may not be empty");
        }
        if start >= end {
            bail!("interval {chrom}:{start}-{end} must satisfy start < end");
        }
        Ok(Self { chrom, start, end })
    }

    /// Canonical `chrom:start-end` label used for peak names in the store.
    pub fn name(&self) -> String {
        self.to_string()
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.chrom == other.chrom && self.start < other.end && other.start < self.end
    }

    /// Widens both sides by `flank` bases, clamping the start at zero.
    pub fn extend(&self, flank: u64) -> Interval {
        Interval {
            chrom: self.chrom.clone(),
            start: self.start.saturating_sub(flank),
            end: self.end.saturating_add(flank),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(name: &str) -> Result<Self> {
        let (chrom, range) = name
            .rsplit_once(':')
            .with_context(|| format!("peak name `{name}` must look like chrom:start-end"))?;
        let (start, end) = range
            .split_once('-')
            .with_context(|| format!("peak name `{name}` must look like chrom:start-end"))?;
        let start: u64 = start
            .parse()
            .with_context(|| format!("invalid start coordinate in `{name}`"))?;
        let end: u64 = end
            .parse()
            .with_context(|| format!("invalid end coordinate in `{name}`"))?;
        Interval::new(chrom, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trips_through_parse() {
        let peak = Interval::new("chr1", 100, 250).unwrap();
        assert_eq!(peak.name(), "chr1:100-250");
        let parsed: Interval = "chr1:100-250".parse().unwrap();
        assert_eq!(parsed, peak);
    }

    #[test]
    fn contig_names_may_contain_colons() {
        let parsed: Interval = "HLA-A*01:01:01:01:5-10".parse().unwrap();
        assert_eq!(parsed.chrom, "HLA-A*01:01:01:01");
        assert_eq!((parsed.start, parsed.end), (5, 10));
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a = Interval::new("chr1", 0, 10).unwrap();
        let b = Interval::new("chr1", 10, 20).unwrap();
        let c = Interval::new("chr1", 9, 11).unwrap();
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn rejects_inverted_coordinates() {
        assert!(Interval::new("chr1", 10, 10).is_err());
        assert!("chr1:20-10".parse::<Interval>().is_err());
        assert!("chr1-20".parse::<Interval>().is_err());
    }

    #[test]
    fn extend_clamps_at_zero() {
        let peak = Interval::new("chr2", 100, 200).unwrap();
        let wide = peak.extend(300);
        assert_eq!((wide.start, wide.end), (0, 500));
    }
}
