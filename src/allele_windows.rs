//! Construction of the reference and alternate allele windows for alignment
//!

use crate::cli::Settings;
use crate::genome_ref_utils::GenomeRef;
use crate::variant::Variant;

pub struct AlleleWindows {
    pub ref_seq: Vec<u8>,
    pub alt_seqs: Vec<Vec<u8>>,
}

/// Build the reference window and one candidate window per alternate allele
///
/// Windows are anchored at the left breakpoint by default, or at the right breakpoint under
/// `genotypeRightBreakpoint`. Intervals reaching past the contig edges are clamped by the
/// reference reader. Returns None when the variant's contig is absent from the reference.
///
pub fn build_allele_windows(
    reference: &GenomeRef,
    variant: &Variant,
    w_size_actual: i64,
    settings: &Settings,
) -> Option<AlleleWindows> {
    let b = variant.pos;
    let w = w_size_actual;
    let ref_len = variant.ref_len() as i64;

    if !reference.has_chrom(&variant.chrom) {
        return None;
    }
    let read = |beg: i64, end: i64| reference.read_region(&variant.chrom, beg, end).unwrap();

    let ref_seq = if settings.genotype_right_breakpoint {
        read(b - w + ref_len, b + ref_len + w)
    } else {
        read(b - w, b + w)
    };

    let mut alt_seqs = Vec::with_capacity(variant.n_alts());
    for alt in variant.alt_alleles.iter() {
        let alt_len = alt.len() as i64;

        let seq = if !settings.genotype_right_breakpoint {
            let mut seq = read(b - w, b);
            if alt_len < w {
                seq.extend_from_slice(alt);
                seq.extend(read(b + ref_len, b + ref_len + w - alt_len));
            } else {
                seq.extend_from_slice(&alt[..w as usize]);
            }
            seq
        } else {
            let mut seq = if alt_len < w {
                let mut seq = read(b - w + alt_len, b);
                seq.extend_from_slice(alt);
                seq
            } else {
                alt[(alt_len - w) as usize..].to_vec()
            };
            seq.extend(read(b + ref_len, b + ref_len + w));
            seq
        };
        alt_seqs.push(seq);
    }

    Some(AlleleWindows { ref_seq, alt_seqs })
}

/// Collapse runs of identical adjacent bases, keeping the first base of each run
///
pub fn mask_homopolymers(seq: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len());
    let mut last = None;
    for &c in seq {
        if Some(c) != last {
            out.push(c);
            last = Some(c);
        }
    }
    out
}

/// The effective half-window size for a chunk of variants
///
/// With `dynamicWSize` the base window grows by the largest of SVLEN and alt-allele length
/// seen anywhere in the chunk, so that the windows of every chunk variant fully contain its
/// allele sequence.
///
pub fn get_w_size_actual(variants: &[Variant], settings: &Settings) -> i64 {
    if !settings.dynamic_w_size {
        return settings.w_size;
    }

    let mut max_allele_len = 0i64;
    for variant in variants {
        let sv_len = variant.info.sv_len.map_or(0, |x| x.abs());
        max_allele_len = max_allele_len
            .max(variant.max_alt_len() as i64)
            .max(sv_len);
    }
    settings.w_size + max_allele_len
}
