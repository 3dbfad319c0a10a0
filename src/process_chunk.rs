//! The per-chunk genotyping pipeline
//!

use log::{debug, warn};
use rust_htslib::bam;

use crate::allele_windows::{
    build_allele_windows, get_w_size_actual, mask_homopolymers, AlleleWindows,
};
use crate::bam_utils::get_simplified_dna_seq;
use crate::banded_align::{get_banded_alignment_scores, AlignmentWeights};
use crate::cli::Settings;
use crate::genome_ref_utils::GenomeRef;
use crate::genotype::{get_gt_string, update_variant_calls, ModelCounts, GENOTYPE_FORMAT};
use crate::read_crop::get_read_crop_range;
use crate::read_evidence::VarAlignInfo;
use crate::read_selection::select_candidate_reads;
use crate::score_models::get_model_rows;
use crate::variant::Variant;

/// The reference interval to fetch reads from for a chunk of variants
///
/// Covers every chunk variant's selection window, clamped at the contig start.
///
pub fn get_chunk_fetch_region(
    variants: &[Variant],
    w_size_actual: i64,
    settings: &Settings,
) -> (i64, i64) {
    assert!(!variants.is_empty());

    let mut genome_begin = variants.first().unwrap().pos;
    let mut genome_end = variants.last().unwrap().pos + 1;

    if settings.genotype_right_breakpoint {
        let min_ref_len = variants.iter().map(|x| x.ref_len()).min().unwrap() as i64;
        let max_ref_len = variants.iter().map(|x| x.ref_len()).max().unwrap() as i64;
        genome_begin += min_ref_len;
        genome_end += max_ref_len;
    }

    genome_begin = if w_size_actual >= genome_begin {
        1
    } else {
        genome_begin - w_size_actual
    };
    genome_end += w_size_actual;

    (genome_begin, genome_end)
}

/// Align each candidate read against the allele windows and record the scores
///
fn align_candidate_reads(
    windows: &AlleleWindows,
    candidates: &[&bam::Record],
    align_infos: &mut [VarAlignInfo],
    variant: &Variant,
    w_size_actual: i64,
    settings: &Settings,
) {
    let weights = AlignmentWeights::from_settings(settings);

    let mut subjects: Vec<&[u8]> = Vec::with_capacity(windows.alt_seqs.len() + 1);
    subjects.push(&windows.ref_seq);
    for alt_seq in windows.alt_seqs.iter() {
        subjects.push(alt_seq);
    }

    for (record, vai) in candidates.iter().zip(align_infos.iter_mut()) {
        let seq = get_simplified_dna_seq(record);
        let query = if settings.crop_read {
            let (crop_beg, crop_end) = get_read_crop_range(record, variant, w_size_actual, settings);
            &seq[crop_beg..crop_end]
        } else {
            &seq[..]
        };

        let scores =
            get_banded_alignment_scores(query, &subjects, &weights, settings.banded_alignment_percent);
        vai.align_scores.copy_from_slice(&scores);
    }
}

fn process_variant(
    reference: &GenomeRef,
    reads: &[bam::Record],
    variant: &mut Variant,
    w_size_actual: i64,
    settings: &Settings,
) {
    let windows = match build_allele_windows(reference, variant, w_size_actual, settings) {
        Some(x) => x,
        None => {
            warn!(
                "reference has no entry for contig '{}', skipping variant at {}:{}",
                variant.chrom,
                variant.chrom,
                variant.pos + 1
            );
            return;
        }
    };

    if settings.output_ref_alt {
        eprintln!(
            "{} {} ref {}",
            variant.chrom,
            variant.pos + 1,
            String::from_utf8_lossy(&windows.ref_seq)
        );
        for (alt_index, alt_seq) in windows.alt_seqs.iter().enumerate() {
            eprintln!(
                "{} {} alt{} {}",
                variant.chrom,
                variant.pos + 1,
                alt_index + 1,
                String::from_utf8_lossy(alt_seq)
            );
        }
        return;
    }

    let windows = if settings.mask {
        AlleleWindows {
            ref_seq: mask_homopolymers(&windows.ref_seq),
            alt_seqs: windows.alt_seqs,
        }
    } else {
        windows
    };

    let (candidates, mut align_infos) =
        select_candidate_reads(reads, variant, w_size_actual, settings);

    align_candidate_reads(
        &windows,
        &candidates,
        &mut align_infos,
        variant,
        w_size_actual,
        settings,
    );

    let mut rows = Vec::new();
    for model in get_model_rows(settings.gt_model) {
        let mut counts = ModelCounts::new(variant.n_alleles());
        update_variant_calls(model, variant, &align_infos, w_size_actual, settings, &mut counts);
        let row = get_gt_string(&counts);
        debug!(
            "{} {}:{} {} candidates={}",
            model,
            variant.chrom,
            variant.pos + 1,
            row,
            candidates.len()
        );
        rows.push(row);
    }

    variant.genotype_rows = rows;
    variant.format = GENOTYPE_FORMAT.to_string();
}

/// Genotype every variant of one chunk against the chunk's position-sorted reads
///
/// Variants are mutated in place; a variant whose contig is missing from the reference is
/// left without a result. Execution is sequential and deterministic for a given input.
///
pub fn process_chunk(
    reference: &GenomeRef,
    reads: &[bam::Record],
    variants: &mut [Variant],
    settings: &Settings,
) {
    if variants.is_empty() {
        return;
    }

    let w_size_actual = get_w_size_actual(variants, settings);

    for variant in variants.iter_mut() {
        process_variant(reference, reads, variant, w_size_actual, settings);
    }
}
