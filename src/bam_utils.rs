//! BAM record and cigar-processing utilities shared across the genotyping pipeline
//!

use rust_htslib::bam::{self, record::Cigar};

/// A utility method to track ref positions while iterating through a cigar string
pub fn update_ref_pos(c: &Cigar, ref_pos: &mut i64) {
    use Cigar::*;
    if let Del(len) | RefSkip(len) | Diff(len) | Equal(len) | Match(len) = c {
        *ref_pos += *len as i64;
    }
}

/// Report the end reference position of a bam record
///
/// The end position is the zero-indexed right-most mapped position + 1
///
pub fn get_alignment_end(record: &bam::Record) -> i64 {
    let mut ref_pos = record.pos();
    for c in record.cigar().iter() {
        update_ref_pos(c, &mut ref_pos);
    }
    ref_pos
}

/// Return true if either edge of the alignment is hard-clipped
///
pub fn has_terminal_hard_clip(cigar: &[Cigar]) -> bool {
    let is_hard = |c: Option<&Cigar>| matches!(c, Some(Cigar::HardClip(_)));
    is_hard(cigar.first()) || is_hard(cigar.last())
}

/// Length of the soft-clip segment at one edge of the alignment, or 0 if that edge is not
/// soft-clipped
///
pub fn terminal_soft_clip_len(cigar: &[Cigar], right_side: bool) -> usize {
    let c = if right_side {
        cigar.last()
    } else {
        cigar.first()
    };
    match c {
        Some(Cigar::SoftClip(len)) => *len as usize,
        _ => 0,
    }
}

/// Get sequence from bam record, but convert any non-ACGT bases to N
///
pub fn get_simplified_dna_seq(record: &bam::Record) -> Vec<u8> {
    let allowed_lut = {
        let mut x = [false; 256];
        for &c in b"ACGTN" {
            x[c as usize] = true;
        }
        x
    };
    let seq = record.seq();
    (0..seq.len())
        .map(|i| {
            let b = seq[i];
            if allowed_lut[b as usize] { b } else { b'N' }
        })
        .collect()
}

#[cfg(test)]
pub mod test_utils {
    use rust_htslib::bam::{header, Header, HeaderView};

    /// Single-contig header sufficient for building test records from SAM lines
    pub fn get_test_header() -> HeaderView {
        let mut _header = Header::new();
        _header.push_record(
            header::HeaderRecord::new(b"SQ")
                .push_tag(b"SN", "chr1")
                .push_tag(b"LN", 10000000),
        );
        HeaderView::from_header(&_header)
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::get_test_header;
    use super::*;

    #[test]
    fn test_get_alignment_end() {
        let header = get_test_header();

        let sam_line = b"qname\t0\tchr1\t10\t60\t5S5M10D5I5M\t*\t0\t0\tACGCCGTATCGTCTCGAGGA\tDDDDDEEEEEDDDDDEEEEE";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        assert_eq!(get_alignment_end(&rec), 29);
    }

    #[test]
    fn test_has_terminal_hard_clip() {
        assert!(has_terminal_hard_clip(&[
            Cigar::HardClip(5),
            Cigar::Match(10)
        ]));
        assert!(has_terminal_hard_clip(&[
            Cigar::Match(10),
            Cigar::HardClip(5)
        ]));
        assert!(!has_terminal_hard_clip(&[
            Cigar::SoftClip(5),
            Cigar::Match(10)
        ]));
    }

    #[test]
    fn test_terminal_soft_clip_len() {
        let cigar = [Cigar::SoftClip(7), Cigar::Match(10), Cigar::SoftClip(3)];
        assert_eq!(terminal_soft_clip_len(&cigar, false), 7);
        assert_eq!(terminal_soft_clip_len(&cigar, true), 3);

        let cigar = [Cigar::Match(10)];
        assert_eq!(terminal_soft_clip_len(&cigar, false), 0);
        assert_eq!(terminal_soft_clip_len(&cigar, true), 0);
    }

    #[test]
    fn test_get_simplified_dna_seq() {
        let header = get_test_header();
        let sam_line = b"qname\t0\tchr1\t10\t60\t8M\t*\t0\t0\tACGTRYMN\tDDDDDEEE";
        let rec = bam::Record::from_sam(&header, sam_line).unwrap();
        assert_eq!(get_simplified_dna_seq(&rec), b"ACGTNNNN".to_vec());
    }
}
