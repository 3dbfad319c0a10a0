//! Per-read allele preference scorers
//!
//! Preference vectors are in log-2 units: `prefs[i] = x` means allele `i` is `2^x` times
//! less likely than the best-supported allele for this read. Scorers add onto the vector
//! they are handed so that models can be applied cumulatively.
//!

use log::warn;

use crate::cli::{GenotypeModel, Settings};
use crate::read_evidence::{VarAlignInfo, NO_ALIGNMENT};

/// The base models evaluated for a requested model name
///
/// `multi` expands into one result row per base model; every other name is a single row.
///
pub fn get_model_rows(model: GenotypeModel) -> Vec<GenotypeModel> {
    use GenotypeModel::*;
    match model {
        Multi => vec![Ad, Va, Joint, Presence, VaOld],
        m => vec![m],
    }
}

impl VarAlignInfo {
    /// Allele preference from the per-allele alignment scores
    ///
    /// Returns the index of the best-supported allele, or None when no allele aligns well
    /// enough to judge. Score differences convert to bits through `logScaleFactor` and are
    /// capped at `maxAlignBits`; alleles scoring below the minimum are held at the cap
    /// distance from the best.
    ///
    pub fn alignment_preference(
        &self,
        w_size_actual: i64,
        settings: &Settings,
        prefs: &mut [f64],
    ) -> Option<usize> {
        let min_align_score = (1.2 * w_size_actual as f64) as i32;

        let mut max_score = self.align_scores[0];
        let mut max_i = 0;
        for (i, &score) in self.align_scores.iter().enumerate() {
            if score > max_score {
                max_i = i;
                max_score = score;
            }
        }

        if max_score == NO_ALIGNMENT || max_score <= min_align_score {
            return None;
        }

        for (i, &score) in self.align_scores.iter().enumerate() {
            let mut d = (max_score - score) as f64 / settings.log_scale_factor;
            if score == NO_ALIGNMENT || score <= min_align_score {
                d = (max_score - min_align_score) as f64 / settings.log_scale_factor;
            }
            if d > settings.max_align_bits {
                d = settings.max_align_bits;
            }
            if d < 0.0 {
                warn!("negative alignment preference for read {}", self.qname);
            }
            prefs[i] += d;
        }

        Some(max_i)
    }

    /// Allele preference from CIGAR indel evidence
    ///
    /// A soft-clipped read disfavors the reference and judges nothing else. A read that
    /// does not span the variant region on both sides is uninformative. Otherwise the
    /// allele whose length change is closest to the read's net indel content wins and all
    /// other alleles are penalized by `overlapBits`.
    ///
    pub fn va_preference(
        &self,
        ref_len: usize,
        alt_lens: &[usize],
        settings: &Settings,
        prefs: &mut [f64],
    ) -> Option<usize> {
        if self.soft_clipped {
            prefs[0] += settings.overlap_bits;
            return None;
        }

        if !self.aligns_left || !self.aligns_right {
            return None;
        }

        let ins_del = self.n_ins as i64 - self.n_del as i64;
        let mut min_d = ins_del.abs();
        let mut min_i = 0;

        for (i, &alt_len) in alt_lens.iter().enumerate() {
            let c_d = alt_len as i64 - ref_len as i64;
            if (c_d - ins_del).abs() < min_d {
                min_i = i + 1;
                min_d = (c_d - ins_del).abs();
            }
        }

        for (i, pref) in prefs.iter_mut().enumerate() {
            if i != min_i {
                *pref += settings.overlap_bits;
            }
        }

        Some(min_i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::test_utils::get_test_settings;
    use strum::EnumCount;

    fn get_spanning_vai(scores: &[i32]) -> VarAlignInfo {
        let mut vai = VarAlignInfo::new(scores.len());
        vai.align_scores.copy_from_slice(scores);
        vai.aligns_left = true;
        vai.aligns_right = true;
        vai
    }

    #[test]
    fn test_model_rows() {
        assert_eq!(get_model_rows(GenotypeModel::Joint), vec![GenotypeModel::Joint]);

        let rows = get_model_rows(GenotypeModel::Multi);
        assert_eq!(rows.len(), GenotypeModel::COUNT - 1);
        assert!(!rows.contains(&GenotypeModel::Multi));
    }

    #[test]
    fn test_alignment_preference() {
        let mut settings = get_test_settings();
        settings.w_size = 100;
        let vai = get_spanning_vai(&[150, 200]);

        let mut prefs = vec![0.0; 2];
        let best = vai.alignment_preference(100, &settings, &mut prefs);

        // d = (200 - 150) / 2 = 25, capped at max_align_bits
        assert_eq!(best, Some(1));
        assert_eq!(prefs, vec![10.0, 0.0]);
    }

    #[test]
    fn test_alignment_preference_uncapped_difference() {
        let settings = get_test_settings();
        let vai = get_spanning_vai(&[190, 200]);

        let mut prefs = vec![0.0; 2];
        let best = vai.alignment_preference(100, &settings, &mut prefs);

        assert_eq!(best, Some(1));
        assert_eq!(prefs, vec![5.0, 0.0]);
    }

    #[test]
    fn test_alignment_preference_no_best() {
        let settings = get_test_settings();

        // All scores unset
        let vai = get_spanning_vai(&[NO_ALIGNMENT, NO_ALIGNMENT]);
        let mut prefs = vec![0.0; 2];
        assert_eq!(vai.alignment_preference(100, &settings, &mut prefs), None);
        assert_eq!(prefs, vec![0.0, 0.0]);

        // Best score does not clear the minimum of floor(1.2 * 100)
        let vai = get_spanning_vai(&[80, 120]);
        assert_eq!(vai.alignment_preference(100, &settings, &mut prefs), None);
        assert_eq!(prefs, vec![0.0, 0.0]);
    }

    #[test]
    fn test_alignment_preference_low_scoring_allele() {
        let settings = get_test_settings();
        let vai = get_spanning_vai(&[200, NO_ALIGNMENT, 199]);

        let mut prefs = vec![0.0; 3];
        let best = vai.alignment_preference(100, &settings, &mut prefs);

        // The unaligned allele is held at the (capped) distance from the minimum score
        assert_eq!(best, Some(0));
        assert_eq!(prefs, vec![0.0, 10.0, 0.5]);
    }

    #[test]
    fn test_va_preference_insertion() {
        let settings = get_test_settings();
        let mut vai = get_spanning_vai(&[0, 0]);
        vai.n_ins = 8;

        // 9bp alt vs 1bp ref: length change 8 matches the read's net insertion exactly
        let mut prefs = vec![0.0; 2];
        let best = vai.va_preference(1, &[9], &settings, &mut prefs);

        assert_eq!(best, Some(1));
        assert_eq!(prefs, vec![10.0, 0.0]);
    }

    #[test]
    fn test_va_preference_reference_read() {
        let settings = get_test_settings();
        let vai = get_spanning_vai(&[0, 0]);

        let mut prefs = vec![0.0; 2];
        let best = vai.va_preference(1, &[9], &settings, &mut prefs);

        assert_eq!(best, Some(0));
        assert_eq!(prefs, vec![0.0, 10.0]);
    }

    #[test]
    fn test_va_preference_tie_keeps_reference() {
        let settings = get_test_settings();
        let mut vai = get_spanning_vai(&[0, 0]);
        vai.n_ins = 1;

        // |0 - 1| == |2 - 1|: the strict comparison keeps the reference allele
        let mut prefs = vec![0.0; 2];
        let best = vai.va_preference(1, &[3], &settings, &mut prefs);
        assert_eq!(best, Some(0));
    }

    #[test]
    fn test_va_preference_soft_clipped() {
        let settings = get_test_settings();
        let mut vai = get_spanning_vai(&[0, 0]);
        vai.soft_clipped = true;

        let mut prefs = vec![0.0; 2];
        let best = vai.va_preference(1, &[9], &settings, &mut prefs);

        assert_eq!(best, None);
        assert_eq!(prefs, vec![10.0, 0.0]);
    }

    #[test]
    fn test_va_preference_non_spanning() {
        let settings = get_test_settings();
        let mut vai = get_spanning_vai(&[0, 0]);
        vai.aligns_right = false;
        vai.n_ins = 8;

        let mut prefs = vec![0.0; 2];
        assert_eq!(vai.va_preference(1, &[9], &settings, &mut prefs), None);
        assert_eq!(prefs, vec![0.0, 0.0]);
    }

    #[test]
    fn test_va_preference_multiple_alts() {
        let settings = get_test_settings();
        let mut vai = get_spanning_vai(&[0, 0, 0]);
        vai.n_ins = 11;

        // Length changes are 4 and 9: the 10bp insertion allele is closest to 11
        let mut prefs = vec![0.0; 3];
        let best = vai.va_preference(1, &[5, 10], &settings, &mut prefs);

        assert_eq!(best, Some(2));
        assert_eq!(prefs, vec![10.0, 10.0, 0.0]);
    }
}
