//! Aggregation of per-read allele preferences into diploid genotype likelihoods
//!

use itertools::Itertools;
use log::debug;

use crate::cli::{GenotypeModel, Settings};
use crate::read_evidence::VarAlignInfo;
use crate::variant::Variant;

/// Reads whose preference spread does not exceed this many bits are uninformative
pub const MINIMUM_PREF_DIFF: f64 = 2.0;

/// Floor on per-genotype log10 likelihood ratios in the result string
const LL_THRESHOLD: f64 = -25.5;

/// log2(10), matching the constant the PL scaling was calibrated with
const LG10: f64 = 3.322;

/// Keys of the per-variant result string, in emission order
pub const GENOTYPE_FORMAT: &str = "GT:AD:VA:PL:REFREADS:ALTREADS";

/// Accumulated per-model genotyping state for one variant
///
#[derive(Clone, Debug)]
pub struct ModelCounts {
    /// Relative genotype log-likelihoods in log-2 scale, triangular diploid indexing
    pub genotype_lls: Vec<f64>,

    /// Reads best-supporting each allele under the alignment-score model; the final slot
    /// counts every read the model saw
    pub allele_depth: Vec<usize>,

    /// Reads best-supporting each allele under the CIGAR-evidence model; the final slot
    /// counts every read the model saw
    pub va_counts: Vec<usize>,

    /// Comma-joined names of the reads voting for each allele
    pub va_read_names: Vec<String>,
}

impl ModelCounts {
    pub fn new(n_alleles: usize) -> Self {
        Self {
            genotype_lls: vec![0.0; n_alleles * (n_alleles + 1) / 2],
            allele_depth: vec![0; n_alleles + 1],
            va_counts: vec![0; n_alleles + 1],
            va_read_names: vec![String::new(); n_alleles + 1],
        }
    }
}

fn append_read_name(names: &mut String, qname: &str) {
    if !names.is_empty() {
        names.push(',');
    }
    names.push_str(qname);
}

/// Fold one read's normalized preference vector into the genotype likelihood vector
///
/// `prefs` must already be normalized to min zero. For a heterozygous genotype the
/// contribution depends on how far apart the two allele preferences sit; a clearly
/// dominated allele costs the dominating preference plus one bit.
///
pub fn accumulate_genotype_prefs(prefs: &[f64], genotype_lls: &mut [f64]) {
    let mut index = 0;
    for a1 in 0..prefs.len() {
        for a2 in 0..=a1 {
            if a1 != a2 {
                if prefs[a1] == prefs[a2] {
                    genotype_lls[index] += prefs[a1];
                } else if prefs[a1] > prefs[a2] + 2.0 {
                    genotype_lls[index] += prefs[a2] + 1.0;
                } else if prefs[a2] > prefs[a1] + 2.0 {
                    genotype_lls[index] += prefs[a1] + 1.0;
                } else if prefs[a1] > prefs[a2] {
                    genotype_lls[index] += (prefs[a1] + prefs[a2]) / 2.0;
                }
            } else {
                genotype_lls[index] += prefs[a1];
            }
            index += 1;
        }
    }
}

/// Score every candidate read of a variant under one genotyping model and fold the results
/// into the model's counts
///
pub fn update_variant_calls(
    model: GenotypeModel,
    variant: &Variant,
    vais: &[VarAlignInfo],
    w_size_actual: i64,
    settings: &Settings,
    counts: &mut ModelCounts,
) {
    let n_alleles = variant.n_alleles();
    let ref_len = variant.ref_len();
    let alt_lens = variant.alt_lens();

    for vai in vais {
        let mut prefs = vec![0.0; n_alleles];

        if model == GenotypeModel::Ad || model == GenotypeModel::Joint {
            let best = vai.alignment_preference(w_size_actual, settings, &mut prefs);
            if let Some(best) = best {
                counts.allele_depth[best] += 1;
            }
            // The total slot counts the read whether or not a best allele exists
            counts.allele_depth[n_alleles] += 1;
        }

        if model == GenotypeModel::Va || model == GenotypeModel::Joint {
            let best = vai.va_preference(ref_len, &alt_lens, settings, &mut prefs);
            if let Some(best) = best {
                counts.va_counts[best] += 1;
                append_read_name(&mut counts.va_read_names[best], &vai.qname);
            }
            counts.va_counts[n_alleles] += 1;
            debug!(
                "va {} nD={} nI={} prefs={:?} best={:?}",
                vai.qname, vai.n_del, vai.n_ins, prefs, best
            );
        }

        if model == GenotypeModel::VaOld {
            let mut best_i = 0;
            let mut best_score = 0.0;
            for (alt_index, &alt_len) in alt_lens.iter().enumerate() {
                let supports = vai.supports(ref_len as f64, alt_len as f64, settings);
                let rejects = vai.rejects(ref_len as f64, alt_len as f64, settings);
                let c_score =
                    settings.overlap_bits * (rejects as i32 as f64 - supports as i32 as f64);
                prefs[alt_index + 1] += c_score;
                if c_score < best_score {
                    best_score = c_score;
                    best_i = alt_index + 1;
                }
            }
            counts.va_counts[best_i] += 1;
            counts.va_counts[n_alleles] += 1;
        }

        if model == GenotypeModel::Presence {
            if vai.indel_present(settings) {
                prefs[0] += settings.overlap_bits;
            } else {
                prefs[1] += settings.overlap_bits;
            }
            for pref in prefs.iter_mut().skip(2) {
                *pref += settings.overlap_bits;
            }
        }

        let min_pref = prefs.iter().cloned().fold(f64::MAX, f64::min);
        let max_pref = prefs.iter().cloned().fold(f64::MIN, f64::max);
        for pref in prefs.iter_mut() {
            *pref -= min_pref;
        }

        if max_pref - min_pref > MINIMUM_PREF_DIFF {
            accumulate_genotype_prefs(&prefs, &mut counts.genotype_lls);
        }
    }
}

/// Turn a model's accumulated counts into the genotype field string
///
/// The stored likelihoods are negated once so the best genotype is the maximum; the
/// `(a1, a2)` pair tracking follows the triangular genotype indexing in step with the scan.
///
pub fn get_gt_string(counts: &ModelCounts) -> String {
    let lls: Vec<f64> = counts.genotype_lls.iter().map(|x| -x).collect();

    let mut max_p = lls[0];
    let mut a1 = 0usize;
    let mut a2 = 0usize;
    let mut max_a1 = 0usize;
    let mut max_a2 = 0usize;

    for &ll in lls.iter() {
        if ll > max_p {
            max_p = ll;
            max_a1 = a1;
            max_a2 = a2;
        }
        if a2 < a1 {
            a2 += 1;
        } else {
            a1 += 1;
            a2 = 0;
        }
    }

    let ads = counts.allele_depth.iter().join(",");
    let vas = counts.va_counts.iter().join(",");
    let pls = lls
        .iter()
        .map(|&ll| {
            let lp = ((ll - max_p) / LG10).max(LL_THRESHOLD);
            (-10.0 * lp) as i32
        })
        .join(",");

    format!(
        "{}/{}:{}:{}:{}:{}:{}",
        max_a2, max_a1, ads, vas, pls, counts.va_read_names[0], counts.va_read_names[1]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_utils::get_test_settings;
    use crate::read_evidence::{VarAlignInfo, NO_ALIGNMENT};
    use crate::variant::VariantInfo;

    fn get_test_variant() -> Variant {
        Variant::new("chr1", 1000, b"A", &[b"ATTATTATT"], VariantInfo::default())
    }

    fn get_alt_supporting_vai(name: &str) -> VarAlignInfo {
        let mut vai = VarAlignInfo::new(2);
        vai.qname = name.to_string();
        vai.align_scores = vec![150, 200];
        vai.aligns_left = true;
        vai.aligns_right = true;
        vai.n_ins = 8;
        vai
    }

    fn get_ref_supporting_vai(name: &str) -> VarAlignInfo {
        let mut vai = VarAlignInfo::new(2);
        vai.qname = name.to_string();
        vai.align_scores = vec![200, 150];
        vai.aligns_left = true;
        vai.aligns_right = true;
        vai
    }

    #[test]
    fn test_accumulate_genotype_prefs() {
        // Hom-alt preference: dominated het cells get min + 1
        let mut lls = vec![0.0; 3];
        accumulate_genotype_prefs(&[20.0, 0.0], &mut lls);
        assert_eq!(lls, vec![20.0, 1.0, 0.0]);

        // Close preferences average in the het cell when the later allele dominates
        let mut lls = vec![0.0; 3];
        accumulate_genotype_prefs(&[0.0, 1.5], &mut lls);
        assert_eq!(lls, vec![0.0, 0.75, 1.5]);

        // but the mirrored case adds nothing to the het cell
        let mut lls = vec![0.0; 3];
        accumulate_genotype_prefs(&[1.5, 0.0], &mut lls);
        assert_eq!(lls, vec![1.5, 0.0, 0.0]);

        // Equal preferences contribute the shared value
        let mut lls = vec![0.0; 3];
        accumulate_genotype_prefs(&[3.0, 3.0], &mut lls);
        assert_eq!(lls, vec![3.0, 3.0, 3.0]);

        // Three alleles fill the 6-genotype triangle
        let mut lls = vec![0.0; 6];
        accumulate_genotype_prefs(&[10.0, 0.0, 10.0], &mut lls);
        assert_eq!(lls, vec![10.0, 1.0, 0.0, 10.0, 1.0, 10.0]);
    }

    #[test]
    fn test_update_variant_calls_joint() {
        let mut settings = get_test_settings();
        settings.w_size = 100;
        let variant = get_test_variant();
        let vais = vec![get_alt_supporting_vai("read1")];

        let mut counts = ModelCounts::new(2);
        update_variant_calls(
            GenotypeModel::Joint,
            &variant,
            &vais,
            100,
            &settings,
            &mut counts,
        );

        assert_eq!(counts.allele_depth, vec![0, 1, 1]);
        assert_eq!(counts.va_counts, vec![0, 1, 1]);
        assert_eq!(counts.va_read_names[1], "read1");
        assert_eq!(counts.genotype_lls, vec![20.0, 1.0, 0.0]);

        assert_eq!(get_gt_string(&counts), "1/1:0,1,1:0,1,1:60,3,0::read1");
    }

    #[test]
    fn test_update_variant_calls_het() {
        let mut settings = get_test_settings();
        settings.w_size = 100;
        let variant = get_test_variant();

        let mut vais = Vec::new();
        for i in 0..5 {
            vais.push(get_alt_supporting_vai(&format!("alt{i}")));
            vais.push(get_ref_supporting_vai(&format!("ref{i}")));
        }

        let mut counts = ModelCounts::new(2);
        update_variant_calls(
            GenotypeModel::Joint,
            &variant,
            &vais,
            100,
            &settings,
            &mut counts,
        );

        assert_eq!(counts.allele_depth, vec![5, 5, 10]);
        assert_eq!(counts.va_counts, vec![5, 5, 10]);

        let gt_string = get_gt_string(&counts);
        assert!(gt_string.starts_with("0/1:"));
        assert_eq!(counts.va_read_names[0], "ref0,ref1,ref2,ref3,ref4");
    }

    #[test]
    fn test_ad_total_counts_no_best_reads() {
        let settings = get_test_settings();
        let variant = get_test_variant();

        // No alignment was computed for this read: no per-allele depth, but the total
        // slot still counts it
        let mut vai = VarAlignInfo::new(2);
        vai.qname = String::from("lost");
        vai.align_scores = vec![NO_ALIGNMENT, NO_ALIGNMENT];

        let mut counts = ModelCounts::new(2);
        update_variant_calls(
            GenotypeModel::Ad,
            &variant,
            &[vai],
            100,
            &settings,
            &mut counts,
        );

        assert_eq!(counts.allele_depth, vec![0, 0, 1]);
        assert_eq!(counts.genotype_lls, vec![0.0, 0.0, 0.0]);

        // An uninformative variant still emits a valid homozygous-reference record
        assert_eq!(get_gt_string(&counts), "0/0:0,0,1:0,0,0:0,0,0::");
    }

    #[test]
    fn test_update_variant_calls_presence() {
        let settings = get_test_settings();
        let variant = get_test_variant();

        let mut with_indel = VarAlignInfo::new(2);
        with_indel.n_ins = 8;
        let without_indel = VarAlignInfo::new(2);

        let mut counts = ModelCounts::new(2);
        update_variant_calls(
            GenotypeModel::Presence,
            &variant,
            &[with_indel, without_indel],
            100,
            &settings,
            &mut counts,
        );

        // One read penalizes the reference, the other the alternate
        assert_eq!(counts.genotype_lls, vec![10.0, 2.0, 10.0]);
    }

    #[test]
    fn test_update_variant_calls_va_old() {
        let settings = get_test_settings();
        let variant = get_test_variant();

        let mut supporting = VarAlignInfo::new(2);
        supporting.aligns_left = true;
        supporting.aligns_right = true;
        supporting.n_ins = 8;

        let mut rejecting = VarAlignInfo::new(2);
        rejecting.aligns_left = true;
        rejecting.aligns_right = true;

        let mut counts = ModelCounts::new(2);
        update_variant_calls(
            GenotypeModel::VaOld,
            &variant,
            &[supporting, rejecting],
            100,
            &settings,
            &mut counts,
        );

        // The supporting read votes the alt allele; the rejecting read still bumps the
        // reference slot by default
        assert_eq!(counts.va_counts, vec![1, 1, 2]);

        // supporting: prefs[1] -= overlap_bits; rejecting: prefs[1] += overlap_bits
        assert_eq!(counts.genotype_lls, vec![10.0, 2.0, 10.0]);
    }

    #[test]
    fn test_gt_string_pairs_follow_triangular_order() {
        // Three alleles, best likelihood placed at each triangular index in turn
        let expected_pairs = ["0/0", "0/1", "1/1", "0/2", "1/2", "2/2"];
        for (best_index, expected) in expected_pairs.iter().enumerate() {
            let mut counts = ModelCounts::new(3);
            counts.genotype_lls = vec![50.0; 6];
            counts.genotype_lls[best_index] = 0.0;
            let gt_string = get_gt_string(&counts);
            assert!(
                gt_string.starts_with(&format!("{expected}:")),
                "index {best_index}: got {gt_string}"
            );
        }
    }

    #[test]
    fn test_gt_string_pl_floor() {
        let mut counts = ModelCounts::new(2);
        counts.genotype_lls = vec![100.0, 5.0, 0.0];
        let gt_string = get_gt_string(&counts);

        // lp for the first genotype falls below LL_THRESHOLD and clamps to PL 255
        assert_eq!(gt_string, "1/1:0,0,0:0,0,0:255,15,0::");
    }
}
