//! Extraction of the read subsequence expected to overlap the variant window
//!

use log::{debug, warn};
use rust_htslib::bam::{self, record::Cigar};

use crate::cli::Settings;
use crate::variant::Variant;

/// Locate the infix of the read sequence covering the variant window
///
/// Walks the CIGAR to translate the window-anchoring reference position into a read
/// position, then applies the window-width crop around it. Returns `(begin, end)` bounds
/// into the read sequence; the bounds are clamped so that the crop is never empty.
///
pub fn get_read_crop_range(
    record: &bam::Record,
    variant: &Variant,
    w_size_actual: i64,
    settings: &Settings,
) -> (usize, usize) {
    let cigar = record.cigar();
    let seq_len = record.seq_len() as i64;
    if cigar.is_empty() {
        return (0, seq_len as usize);
    }

    let mut align_pos = record.pos();
    let mut read_pos: i64 = 0;
    let mut last_read_pos: i64 = 0;
    let mut cigar_index = 0;
    let mut last_op = cigar[0];

    // The window-anchoring position: window start for the left breakpoint, window end for
    // the right breakpoint
    let search_pos = if settings.genotype_right_breakpoint {
        variant.pos + variant.ref_len() as i64 + w_size_actual
    } else {
        variant.pos - w_size_actual
    };
    let search_pos = search_pos.max(0);

    while align_pos < search_pos && cigar_index < cigar.len() {
        last_read_pos = read_pos;
        last_op = cigar[cigar_index];

        use Cigar::*;
        match last_op {
            Del(len) => {
                align_pos += len as i64;
            }
            Match(len) | Equal(len) | Diff(len) => {
                align_pos += len as i64;
                read_pos += len as i64;
            }
            SoftClip(len) | Ins(len) => {
                read_pos += len as i64;
            }
            HardClip(_) => {}
            c => {
                warn!("cigar operation {} not accounted for", c.char());
            }
        }
        cigar_index += 1;
    }

    // A clip op cannot anchor the window; back out its read advance
    if matches!(last_op, Cigar::SoftClip(_) | Cigar::HardClip(_)) {
        read_pos = last_read_pos;
    }

    let mut r_beg;
    let mut r_end;
    if settings.genotype_right_breakpoint {
        if align_pos >= search_pos - 2 * w_size_actual {
            let r_shift = search_pos - align_pos;
            r_beg = read_pos - 2 * w_size_actual + r_shift;
            r_end = read_pos + r_shift;
        } else {
            r_beg = read_pos;
            r_end = read_pos + w_size_actual;
            debug!(
                "read {} ends {}bp short of the right-breakpoint window at {}",
                String::from_utf8_lossy(record.qname()),
                search_pos - align_pos,
                variant.pos
            );
        }
    } else {
        let r_shift = align_pos - search_pos;
        r_beg = read_pos - r_shift;
        r_end = read_pos + 2 * w_size_actual - r_shift;
        if r_shift < 0 {
            debug!(
                "read {} ends before the left-breakpoint window at {}",
                String::from_utf8_lossy(record.qname()),
                variant.pos
            );
        }
    }

    if r_beg < 0 {
        r_beg = 0;
    }
    if r_end < 2 * w_size_actual {
        r_end = 2 * w_size_actual;
    }
    if r_end > seq_len {
        r_end = seq_len;
    }
    if r_beg == r_end {
        r_beg -= 1;
    }
    let r_beg = r_beg.clamp(0, r_end);

    (r_beg as usize, r_end as usize)
}
