use crate::{
    core::{gene::strip_version, GeneTss, Strand},
    io::bed::visit_records,
};
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Loads gene TSS positions from a GTF (plain or gzip). Only `gene` features
/// are used; the TSS is the 5' end of the gene on its strand.
pub fn load_gene_tss(path: &Path) -> Result<Vec<GeneTss>> {
    let mut genes = Vec::new();
    visit_records(path, |_, fields| {
        if fields.len() < 9 {
            bail!("GTF record needs 9 columns, got {}", fields.len());
        }
        if fields[2] != "gene" {
            return Ok(());
        }
        let start: u64 = fields[3]
            .parse()
            .with_context(|| format!("invalid GTF start `{}`", fields[3]))?;
        let end: u64 = fields[4]
            .parse()
            .with_context(|| format!("invalid GTF end `{}`", fields[4]))?;
        if start == 0 || end < start {
            bail!("GTF coordinates {start}-{end} are not 1-based inclusive");
        }
        let strand = Strand::parse(fields[6])?;
        let position = match strand {
            Strand::Reverse => end - 1,
            _ => start - 1,
        };

        let gene_id = attribute(fields[8], "gene_id")
            .context("GTF gene record without gene_id")?;
        let gene_name = attribute(fields[8], "gene_name").unwrap_or(gene_id);

        genes.push(GeneTss {
            chrom: fields[0].to_string(),
            position,
            strand,
            gene_id: strip_version(gene_id).to_string(),
            gene_name: gene_name.to_string(),
        });
        Ok(())
    })?;

    if genes.is_empty() {
        bail!("no gene features found in {}", path.display());
    }
    Ok(genes)
}

fn attribute<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
    raw.split(';').find_map(|entry| {
        let (key, value) = entry.trim().split_once(char::is_whitespace)?;
        (key == name).then(|| value.trim().trim_matches('"'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const GTF: &str = "\
##description: test annotation
chr1\tHAVANA\tgene\t11869\t14409\t.\t+\t.\tgene_id \"ENSG00000223972.5\"; gene_type \"transcribed_unprocessed_pseudogene\"; gene_name \"DDX11L1\";
chr1\tHAVANA\ttranscript\t11869\t14409\t.\t+\t.\tgene_id \"ENSG00000223972.5\"; transcript_id \"ENST00000456328.2\";
chr1\tHAVANA\tgene\t14404\t29570\t.\t-\t.\tgene_id \"ENSG00000227232.5\"; gene_name \"WASH7P\";
chr2\tENSEMBL\tgene\t100\t200\t.\t+\t.\tgene_id \"ENSG00000000001\";
";

    #[test]
    fn loads_strand_aware_tss() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("genes.gtf");
        fs::write(&path, GTF)?;
        let genes = load_gene_tss(&path)?;
        assert_eq!(genes.len(), 3);

        assert_eq!(genes[0].gene_id, "ENSG00000223972");
        assert_eq!(genes[0].gene_name, "DDX11L1");
        assert_eq!(genes[0].position, 11868);
        assert_eq!(genes[0].strand, Strand::Forward);

        assert_eq!(genes[1].gene_name, "WASH7P");
        assert_eq!(genes[1].position, 29569);
        assert_eq!(genes[1].strand, Strand::Reverse);

        assert_eq!(genes[2].gene_name, "ENSG00000000001");
        Ok(())
    }

    #[test]
    fn parses_attributes() {
        let raw = "gene_id \"A.1\"; gene_name \"Alpha\";";
        assert_eq!(attribute(raw, "gene_name"), Some("Alpha"));
        assert_eq!(attribute(raw, "gene_type"), None);
    }
}
