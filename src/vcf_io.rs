//! Variant catalog reading and genotyped output writing
//!

use std::fs::File;
use std::io::{BufWriter, Write};

use itertools::Itertools;
use log::{info, warn};
use rust_htslib::bcf::{self, Read};
use simple_error::{bail, SimpleResult};

use crate::genome_ref_utils::GenomeRef;
use crate::genotype::GENOTYPE_FORMAT;
use crate::variant::{Variant, VariantInfo};

/// Fetch one integer INFO value from a bcf record, tolerating both Integer and String
/// typed declarations. Missing entries and `.` values map to None.
///
fn get_info_i64(record: &bcf::Record, key: &[u8]) -> Option<i64> {
    if let Ok(Some(values)) = record.info(key).integer() {
        return values
            .first()
            .filter(|&&x| x != i32::MIN && x != i32::MIN + 1)
            .map(|&x| x as i64);
    }

    if let Ok(Some(values)) = record.info(key).string() {
        if let Some(&value) = values.first() {
            if let Ok(text) = std::str::from_utf8(value) {
                return text.trim().parse::<i64>().ok();
            }
        }
    }

    None
}

fn is_sequence_allele(allele: &[u8]) -> bool {
    !allele.is_empty()
        && allele
            .iter()
            .all(|c| matches!(c.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T' | b'N'))
}

/// Read the candidate variant catalog into position-sorted per-contig variant records
///
/// Records with symbolic or breakend alleles are skipped with a warning; only
/// insertion/deletion-shaped variants are modeled.
///
pub fn read_variant_catalog(filename: &str) -> SimpleResult<Vec<Variant>> {
    info!("Reading variant catalog from file '{filename}'");

    let mut reader = match bcf::Reader::from_path(filename) {
        Ok(x) => x,
        Err(e) => bail!("Unable to open variant catalog '{}': {}", filename, e),
    };
    let header = reader.header().clone();

    let mut variants = Vec::new();
    for result in reader.records() {
        let record = match result {
            Ok(x) => x,
            Err(e) => bail!("Failed to parse variant record in '{}': {}", filename, e),
        };

        let rid = match record.rid() {
            Some(x) => x,
            None => continue,
        };
        let chrom = match header.rid2name(rid) {
            Ok(x) => String::from_utf8_lossy(x).to_string(),
            Err(e) => bail!("Invalid contig id in '{}': {}", filename, e),
        };

        let alleles = record.alleles();
        if alleles.len() < 2 {
            continue;
        }
        if !alleles.iter().all(|x| is_sequence_allele(x)) {
            warn!(
                "skipping variant with non-sequence allele at {}:{}",
                chrom,
                record.pos() + 1
            );
            continue;
        }

        let info = VariantInfo {
            sv_len: get_info_i64(&record, b"SVLEN"),
            trr_begin: get_info_i64(&record, b"TRRBEGIN"),
            trr_end: get_info_i64(&record, b"TRREND"),
            reg_begin: get_info_i64(&record, b"REGBEGIN"),
            reg_end: get_info_i64(&record, b"REGEND"),
        };

        variants.push(Variant {
            chrom,
            pos: record.pos(),
            id: String::from_utf8_lossy(&record.id()).to_string(),
            ref_allele: alleles[0].to_vec(),
            alt_alleles: alleles[1..].iter().map(|x| x.to_vec()).collect(),
            info,
            genotype_rows: Vec::new(),
            format: String::new(),
        });
    }

    info!("Read {} candidate variants", variants.len());
    Ok(variants)
}

fn get_info_string(variant: &Variant) -> String {
    let info = &variant.info;
    let entries: Vec<String> = [
        ("SVLEN", info.sv_len),
        ("TRRBEGIN", info.trr_begin),
        ("TRREND", info.trr_end),
        ("REGBEGIN", info.reg_begin),
        ("REGEND", info.reg_end),
    ]
    .iter()
    .filter_map(|&(key, value)| value.map(|x| format!("{key}={x}")))
    .collect();

    if entries.is_empty() {
        String::from(".")
    } else {
        entries.join(";")
    }
}

fn write_vcf_header(
    writer: &mut impl Write,
    reference: &GenomeRef,
    sample_name: &str,
) -> std::io::Result<()> {
    writeln!(writer, "##fileformat=VCFv4.2")?;
    writeln!(
        writer,
        "##source={} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )?;

    let mut chrom_names: Vec<&String> = reference.chroms.keys().collect();
    chrom_names.sort();
    for chrom in chrom_names {
        writeln!(
            writer,
            "##contig=<ID={},length={}>",
            chrom,
            reference.chroms[chrom].len()
        )?;
    }

    for key in ["SVLEN", "TRRBEGIN", "TRREND", "REGBEGIN", "REGEND"] {
        writeln!(
            writer,
            "##INFO=<ID={key},Number=1,Type=Integer,Description=\"{key} hint\">"
        )?;
    }

    writeln!(writer, "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">")?;
    writeln!(writer, "##FORMAT=<ID=AD,Number=.,Type=Integer,Description=\"Read depth best supporting each allele under the alignment model, with total\">")?;
    writeln!(writer, "##FORMAT=<ID=VA,Number=.,Type=Integer,Description=\"Read depth best supporting each allele under the CIGAR evidence model, with total\">")?;
    writeln!(writer, "##FORMAT=<ID=PL,Number=G,Type=Integer,Description=\"Phred-scaled genotype likelihoods\">")?;
    writeln!(writer, "##FORMAT=<ID=REFREADS,Number=1,Type=String,Description=\"Names of reads voting for the reference allele\">")?;
    writeln!(writer, "##FORMAT=<ID=ALTREADS,Number=1,Type=String,Description=\"Names of reads voting for the first alternate allele\">")?;

    writeln!(
        writer,
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t{sample_name}"
    )
}

/// Write the genotyped catalog as VCF text
///
/// Each variant carries its result string verbatim in the sample column; with the `multi`
/// model the record reports the last model row. Variants without a result (skipped contig)
/// are omitted.
///
pub fn write_genotyped_catalog(
    filename: &str,
    variants: &[Variant],
    reference: &GenomeRef,
    sample_name: &str,
) -> SimpleResult<()> {
    info!("Writing genotyped catalog to file '{filename}'");

    let file = match File::create(filename) {
        Ok(x) => x,
        Err(e) => bail!("Unable to create output file '{}': {}", filename, e),
    };
    let mut writer = BufWriter::new(file);

    if let Err(e) = write_catalog_impl(&mut writer, variants, reference, sample_name) {
        bail!("Failed writing output file '{}': {}", filename, e);
    }
    Ok(())
}

fn write_catalog_impl(
    writer: &mut impl Write,
    variants: &[Variant],
    reference: &GenomeRef,
    sample_name: &str,
) -> std::io::Result<()> {
    write_vcf_header(writer, reference, sample_name)?;

    for variant in variants {
        let sample_field = match variant.genotype_rows.last() {
            Some(x) => x,
            None => continue,
        };
        let alts = variant
            .alt_alleles
            .iter()
            .map(|x| String::from_utf8_lossy(x))
            .join(",");
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t.\t.\t{}\t{}\t{}",
            variant.chrom,
            variant.pos + 1,
            variant.id,
            String::from_utf8_lossy(&variant.ref_allele),
            alts,
            get_info_string(variant),
            GENOTYPE_FORMAT,
            sample_field
        )?;
    }
    Ok(())
}
