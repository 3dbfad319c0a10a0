//! Banded affine-gap local alignment of one read window against a set of allele windows
//!

use crate::cli::Settings;

pub struct AlignmentWeights {
    pub match_: i32,
    pub mismatch: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl AlignmentWeights {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            match_: settings.match_score,
            mismatch: settings.mismatch,
            gap_open: settings.gap_open,
            gap_extend: settings.gap_extend,
        }
    }
}

const NEG_INF: i32 = i32::MIN / 4;

/// Score-only banded local alignment (Smith-Waterman, affine gaps)
///
/// Rows iterate the query, columns the subject; a cell (i, j) is inside the band when
/// `j - i` lies in `[-v_band, +h_band]`. A gap of length k scores
/// `gap_open + (k - 1) * gap_extend`.
///
fn banded_local_score(
    query: &[u8],
    subject: &[u8],
    weights: &AlignmentWeights,
    v_band: i64,
    h_band: i64,
) -> i32 {
    let qlen = query.len();
    let slen = subject.len();
    if qlen == 0 || slen == 0 {
        return 0;
    }

    // h holds the previous row's scores during the sweep, f the previous row's vertical-gap
    // scores. Column 0 is the local-alignment boundary and stays at zero.
    let mut h = vec![0i32; slen + 1];
    let mut f = vec![NEG_INF; slen + 1];
    let mut best = 0;

    for i in 1..=qlen as i64 {
        let j_lo = std::cmp::max(1, i - v_band);
        let j_hi = std::cmp::min(slen as i64, i + h_band);
        if j_lo > j_hi {
            continue;
        }

        let q_base = query[i as usize - 1];
        let mut e = NEG_INF;
        let mut h_left = if j_lo == 1 { 0 } else { NEG_INF };
        let mut diag = if j_lo == 1 {
            0
        } else {
            h[(j_lo - 1) as usize]
        };

        for j in j_lo..=j_hi {
            let ju = j as usize;

            // The cell above falls outside the band on the last diagonal of each row
            let above_in_band = j - (i - 1) <= h_band;
            let h_above = if above_in_band { h[ju] } else { NEG_INF };
            let f_above = if above_in_band { f[ju] } else { NEG_INF };

            e = std::cmp::max(h_left + weights.gap_open, e + weights.gap_extend);
            let f_cur = std::cmp::max(h_above + weights.gap_open, f_above + weights.gap_extend);

            let sub = if q_base == subject[ju - 1] {
                weights.match_
            } else {
                weights.mismatch
            };
            let h_cur = std::cmp::max(std::cmp::max(diag + sub, 0), std::cmp::max(e, f_cur));

            if h_cur > best {
                best = h_cur;
            }

            diag = h_above;
            f[ju] = f_cur;
            h[ju] = h_cur;
            h_left = h_cur;
        }
    }

    best
}

/// Align one query window against each subject window and report the local score per subject
///
/// The vertical band derives from the first subject (the reference window), matching the
/// shared-band setup the scores feed into downstream; the horizontal band derives from the
/// query. Both are `bandedAlignmentPercent` of the respective length, rounded.
///
pub fn get_banded_alignment_scores(
    query: &[u8],
    subjects: &[&[u8]],
    weights: &AlignmentWeights,
    banded_alignment_percent: f64,
) -> Vec<i32> {
    let band_fac = banded_alignment_percent.min(100.0) / 100.0;
    let v_band = (subjects.first().map_or(0, |x| x.len()) as f64 * band_fac).round() as i64;
    let h_band = (query.len() as f64 * band_fac).round() as i64;

    subjects
        .iter()
        .map(|subject| banded_local_score(query, subject, weights, v_band, h_band))
        .collect()
}
