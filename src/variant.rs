//! Internal representation of candidate structural variants
//!

use std::ops::Range;

/// Recognized INFO hints for a candidate variant
///
/// Missing keys and `.` values are both represented as None.
///
#[derive(Clone, Debug, Default)]
pub struct VariantInfo {
    /// Structural variant length; the sign convention of the caller is ignored downstream
    pub sv_len: Option<i64>,

    /// Tandem-repeat region bounds around the variant
    pub trr_begin: Option<i64>,
    pub trr_end: Option<i64>,

    /// Explicit evidence-region bounds around the variant
    pub reg_begin: Option<i64>,
    pub reg_end: Option<i64>,
}

/// One candidate insertion/deletion variant from the input catalog
///
/// Positions are zero-based. The genotyper writes its per-model result rows back into
/// `genotype_rows` and sets `format`.
///
#[derive(Clone, Debug)]
pub struct Variant {
    pub chrom: String,
    pub pos: i64,
    pub id: String,
    pub ref_allele: Vec<u8>,
    pub alt_alleles: Vec<Vec<u8>>,
    pub info: VariantInfo,

    /// One result string per genotyping model row, in model order
    pub genotype_rows: Vec<String>,

    /// Colon-joined keys describing the genotype_rows entries
    pub format: String,
}

impl Variant {
    pub fn new(
        chrom: &str,
        pos: i64,
        ref_allele: &[u8],
        alt_alleles: &[&[u8]],
        info: VariantInfo,
    ) -> Self {
        assert!(!ref_allele.is_empty());
        assert!(alt_alleles.iter().all(|x| !x.is_empty()));
        Self {
            chrom: chrom.to_string(),
            pos,
            id: String::from("."),
            ref_allele: ref_allele.to_vec(),
            alt_alleles: alt_alleles.iter().map(|x| x.to_vec()).collect(),
            info,
            genotype_rows: Vec::new(),
            format: String::new(),
        }
    }

    pub fn n_alts(&self) -> usize {
        self.alt_alleles.len()
    }

    /// Allele count including the reference allele
    pub fn n_alleles(&self) -> usize {
        self.n_alts() + 1
    }

    pub fn ref_len(&self) -> usize {
        self.ref_allele.len()
    }

    pub fn alt_lens(&self) -> Vec<usize> {
        self.alt_alleles.iter().map(|x| x.len()).collect()
    }

    pub fn max_alt_len(&self) -> usize {
        self.alt_lens().into_iter().max().unwrap_or(0)
    }
}

/// Split the position-sorted variant list into contiguous same-contig chunks of at most
/// `max_chunk_size` variants
///
/// Chunks are the unit of parallel work; each chunk is processed sequentially.
///
pub fn get_variant_chunks(variants: &[Variant], max_chunk_size: usize) -> Vec<Range<usize>> {
    assert!(max_chunk_size > 0);

    let mut chunks = Vec::new();
    let mut chunk_start = 0;
    for index in 1..=variants.len() {
        let chunk_len = index - chunk_start;
        let chrom_break =
            index < variants.len() && variants[index].chrom != variants[chunk_start].chrom;
        if index == variants.len() || chrom_break || chunk_len >= max_chunk_size {
            chunks.push(chunk_start..index);
            chunk_start = index;
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_variant(chrom: &str, pos: i64) -> Variant {
        Variant::new(chrom, pos, b"A", &[b"ATT"], VariantInfo::default())
    }

    #[test]
    fn test_allele_accessors() {
        let v = Variant::new(
            "chr1",
            100,
            b"ACGT",
            &[b"A", b"ACGTACGTA"],
            VariantInfo::default(),
        );
        assert_eq!(v.n_alts(), 2);
        assert_eq!(v.n_alleles(), 3);
        assert_eq!(v.ref_len(), 4);
        assert_eq!(v.alt_lens(), vec![1, 9]);
        assert_eq!(v.max_alt_len(), 9);
    }

    #[test]
    fn test_get_variant_chunks() {
        let variants = vec![
            test_variant("chr1", 100),
            test_variant("chr1", 200),
            test_variant("chr1", 300),
            test_variant("chr2", 100),
            test_variant("chr2", 150),
        ];

        let chunks = get_variant_chunks(&variants, 100);
        assert_eq!(chunks, vec![0..3, 3..5]);

        let chunks = get_variant_chunks(&variants, 2);
        assert_eq!(chunks, vec![0..2, 2..3, 3..5]);

        assert!(get_variant_chunks(&[], 10).is_empty());
    }
}
