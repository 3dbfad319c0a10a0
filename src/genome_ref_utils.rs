//! In-memory reference genome with clamped interval access
//!

use std::collections::HashMap;
use std::fs::File;

use bio::io::fasta;
use log::info;
use unwrap::unwrap;

#[derive(Default)]
pub struct GenomeRef {
    /// A map from chrom name to chrom sequence
    pub chroms: HashMap<String, Vec<u8>>,
}

impl GenomeRef {
    /// Convert all bases besides "ACGTN" to "N"
    pub fn simplify_ambiguous_dna_bases(&mut self) {
        let allowed_lut = {
            let mut x = [false; 256];
            for &c in b"ACGTN" {
                x[c as usize] = true;
            }
            x
        };
        for seq in self.chroms.values_mut() {
            for c in seq.iter_mut().filter(|x| !allowed_lut[**x as usize]) {
                *c = b'N';
            }
        }
    }

    /// Read the reference interval `[beg, end)` on `chrom`, clamped to the contig bounds
    ///
    /// Returns None if the contig is not present in the reference. An interval that is empty
    /// after clamping yields an empty sequence.
    ///
    pub fn read_region(&self, chrom: &str, beg: i64, end: i64) -> Option<Vec<u8>> {
        let chrom_seq = self.chroms.get(chrom)?;
        let beg = beg.clamp(0, chrom_seq.len() as i64) as usize;
        let end = end.clamp(0, chrom_seq.len() as i64) as usize;
        if beg >= end {
            return Some(Vec::new());
        }
        Some(chrom_seq[beg..end].to_vec())
    }

    pub fn has_chrom(&self, chrom: &str) -> bool {
        self.chroms.contains_key(chrom)
    }
}

/// Read fasta file pointer into GenomeRef data structure
///
/// This method converts all input characters to upper-case
///
pub fn get_genome_ref_from_fasta_fp(file: File) -> GenomeRef {
    let reader = fasta::Reader::new(file);

    let mut genome_ref = GenomeRef::default();

    for result in reader.records() {
        let record = result.expect("Error during fasta record parsing");

        genome_ref
            .chroms
            .insert(record.id().to_string(), record.seq().to_ascii_uppercase());
    }
    genome_ref
}

/// Read fasta file into GenomeRef data structure
///
/// This method converts all input characters to upper-case
///
pub fn get_genome_ref_from_fasta(filename: &str) -> GenomeRef {
    info!("Reading reference genome from file '{filename}'");

    let file = unwrap!(
        File::open(filename),
        "Unable to open reference fasta file: '{}'",
        filename,
    );

    get_genome_ref_from_fasta_fp(file)
}
