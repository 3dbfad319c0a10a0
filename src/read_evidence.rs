//! Per-read, per-variant alignment evidence extracted from mapped CIGAR strings
//!

use log::warn;
use rust_htslib::bam::{self, record::Cigar};

use crate::cli::Settings;
use crate::variant::Variant;

/// Sentinel for "no alignment score computed / rejected"
pub const NO_ALIGNMENT: i32 = -10_000;

/// Stores information on how a read aligns across a variant
///
#[derive(Clone, Debug)]
pub struct VarAlignInfo {
    pub qname: String,

    /// Summed deletion lengths inside the variant region, counting ops >= minDelIns only
    pub n_del: usize,

    /// Summed insertion lengths inside the variant region, counting ops >= minDelIns only
    pub n_ins: usize,

    /// Local alignment score against each allele window; index 0 is the reference allele
    pub align_scores: Vec<i32>,

    /// The breakpoint-side terminal soft-clip exceeds the configured maximum
    pub soft_clipped: bool,

    /// The read begins strictly left of the variant region
    pub aligns_left: bool,

    /// The read extends strictly right of the variant region
    pub aligns_right: bool,
}

impl VarAlignInfo {
    pub fn new(n_alleles: usize) -> Self {
        Self {
            qname: String::new(),
            n_del: 0,
            n_ins: 0,
            align_scores: vec![NO_ALIGNMENT; n_alleles],
            soft_clipped: false,
            aligns_left: false,
            aligns_right: false,
        }
    }

    pub fn reset(&mut self) {
        self.qname.clear();
        self.n_del = 0;
        self.n_ins = 0;
        self.align_scores.fill(NO_ALIGNMENT);
        self.soft_clipped = false;
        self.aligns_left = false;
        self.aligns_right = false;
    }

    pub fn n_alleles(&self) -> usize {
        self.align_scores.len()
    }

    /// The read spans the variant region on both sides
    pub fn aligns_across(&self) -> bool {
        self.aligns_left && self.aligns_right
    }

    /// Indel evidence meets the presence-model threshold
    pub fn indel_present(&self, settings: &Settings) -> bool {
        self.n_ins >= settings.min_present || self.n_del >= settings.min_present
    }

    /// Alternate allele is supported as judged from the alignment record
    ///
    /// Support and rejection here are not reliable for very long variants; the size-matched
    /// evidence model covers those.
    ///
    pub fn supports(&self, ref_len: f64, alt_len: f64, settings: &Settings) -> bool {
        let (evidence, allele_len) = if alt_len > ref_len {
            (self.n_ins as f64, alt_len)
        } else {
            (self.n_del as f64, ref_len)
        };
        (self.aligns_across()
            && evidence > allele_len * settings.alt_thresh_fraction
            && evidence < allele_len * settings.alt_thresh_fraction_max)
            || self.soft_clipped
    }

    /// Alternate allele is rejected as judged from the alignment record
    pub fn rejects(&self, ref_len: f64, alt_len: f64, settings: &Settings) -> bool {
        let (evidence, allele_len) = if alt_len > ref_len {
            (self.n_ins as f64, alt_len)
        } else {
            (self.n_del as f64, ref_len)
        };
        self.aligns_across() && evidence < allele_len * settings.ref_thresh_fraction && !self.soft_clipped
    }
}

/// The evidence-counting region for a variant: the variant interval padded by varWindow,
/// expanded by any tandem-repeat or explicit region hints carried on the variant
///
pub fn get_variant_region(variant: &Variant, settings: &Settings) -> (i64, i64) {
    let mut region_beg = variant.pos - settings.var_window;
    let mut region_end = variant.pos + variant.ref_len() as i64 + settings.var_window;

    for hint in [variant.info.trr_begin, variant.info.reg_begin]
        .into_iter()
        .flatten()
    {
        region_beg = region_beg.min(hint - settings.var_window);
    }
    for hint in [variant.info.trr_end, variant.info.reg_end]
        .into_iter()
        .flatten()
    {
        region_end = region_end.max(hint + settings.var_window);
    }

    (region_beg, region_end)
}

/// Examine an alignment record for evidence of supporting a variant and write the evidence
/// into the VarAlignInfo record
///
pub fn examine_alignment(
    record: &bam::Record,
    variant: &Variant,
    settings: &Settings,
    vai: &mut VarAlignInfo,
) {
    vai.reset();
    vai.qname = String::from_utf8_lossy(record.qname()).to_string();

    let (region_beg, region_end) = get_variant_region(variant, settings);

    let cigar = record.cigar();
    if cigar.is_empty() {
        return;
    }

    let mut align_pos = record.pos();
    let mut cigar_index = 0;
    let mut last_op = cigar[0];

    if align_pos < region_beg {
        vai.aligns_left = true;
    }

    // Find the first op that reaches the region
    while align_pos < region_beg && cigar_index < cigar.len() {
        last_op = cigar[cigar_index];
        use Cigar::*;
        if let Match(len) | Equal(len) | Diff(len) | Del(len) = last_op {
            align_pos += len as i64;
        }
        cigar_index += 1;
    }

    // A deletion reaching into the region contributes its overshoot
    if align_pos > region_beg
        && matches!(last_op, Cigar::Del(_))
        && align_pos - region_beg >= settings.min_del_ins as i64
    {
        vai.n_del = (align_pos - region_beg) as usize;
    }

    // Count indel content until the walk leaves the region
    while align_pos < region_end && cigar_index < cigar.len() {
        use Cigar::*;
        match cigar[cigar_index] {
            Del(len) => {
                if len as usize >= settings.min_del_ins {
                    vai.n_del += len as usize;
                }
                align_pos += len as i64;
            }
            Match(len) | Equal(len) | Diff(len) => {
                align_pos += len as i64;
            }
            Ins(len) => {
                if len as usize >= settings.min_del_ins {
                    vai.n_ins += len as usize;
                }
            }
            SoftClip(len) => {
                if len as usize > settings.max_soft_clipped {
                    let terminal = if settings.genotype_right_breakpoint {
                        cigar_index == 0
                    } else {
                        cigar_index == cigar.len() - 1
                    };
                    if terminal {
                        vai.soft_clipped = true;
                    }
                }
            }
            HardClip(_) => {}
            c => {
                warn!("cigar operation {} not accounted for", c.char());
            }
        }
        cigar_index += 1;
    }

    if align_pos > region_end {
        vai.aligns_right = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bam_utils::test_utils::get_test_header;
    use crate::cli::test_utils::get_test_settings;
    use crate::variant::VariantInfo;

    fn get_test_variant() -> Variant {
        Variant::new("chr1", 1000, b"A", &[b"ATTATTATT"], VariantInfo::default())
    }

    fn record_from_parts(pos_1based: i64, cigar: &str, read_len: usize) -> bam::Record {
        let header = get_test_header();
        let seq = "A".repeat(read_len);
        let qual = "D".repeat(read_len);
        let sam_line =
            format!("qname\t0\tchr1\t{pos_1based}\t60\t{cigar}\t*\t0\t0\t{seq}\t{qual}");
        bam::Record::from_sam(&header, sam_line.as_bytes()).unwrap()
    }

    #[test]
    fn test_spanning_read_without_indels() {
        let settings = get_test_settings();
        let variant = get_test_variant();
        let mut vai = VarAlignInfo::new(2);

        // pos 800 (0-based), 400M: covers [800, 1200) around region [900, 1101)
        let record = record_from_parts(801, "400M", 400);
        examine_alignment(&record, &variant, &settings, &mut vai);

        assert!(vai.aligns_left);
        assert!(vai.aligns_right);
        assert_eq!(vai.n_del, 0);
        assert_eq!(vai.n_ins, 0);
        assert!(!vai.soft_clipped);
        assert_eq!(vai.qname, "qname");
    }

    #[test]
    fn test_deletions_inside_region() {
        let settings = get_test_settings();
        let variant = get_test_variant();
        let mut vai = VarAlignInfo::new(2);

        // 100M to ref pos 950, 50D + 100M + 20D + 300M: both deletions count
        let record = record_from_parts(851, "100M50D100M20D300M", 500);
        examine_alignment(&record, &variant, &settings, &mut vai);

        assert_eq!(vai.n_del, 70);
        assert!(vai.aligns_left);
        assert!(vai.aligns_right);
    }

    #[test]
    fn test_deletion_overshoot_into_region() {
        let settings = get_test_settings();
        let variant = get_test_variant();
        let mut vai = VarAlignInfo::new(2);

        // The 150D op reaches 50bp past the region start: the overshoot seeds n_del
        let record = record_from_parts(701, "100M150D300M", 400);
        examine_alignment(&record, &variant, &settings, &mut vai);

        assert_eq!(vai.n_del, 50);
        assert!(vai.aligns_right);
    }

    #[test]
    fn test_short_indels_ignored() {
        let settings = get_test_settings();
        let variant = get_test_variant();
        let mut vai = VarAlignInfo::new(2);

        // 4bp ops fall below the default min_del_ins of 5
        let record = record_from_parts(801, "200M4D100M4I96M", 400);
        examine_alignment(&record, &variant, &settings, &mut vai);

        assert_eq!(vai.n_del, 0);
        assert_eq!(vai.n_ins, 0);
    }

    #[test]
    fn test_terminal_soft_clip_flags() {
        let mut settings = get_test_settings();
        let variant = get_test_variant();
        let mut vai = VarAlignInfo::new(2);

        // Left-breakpoint mode flags a long trailing clip inside the region
        let record = record_from_parts(951, "100M600S", 700);
        examine_alignment(&record, &variant, &settings, &mut vai);
        assert!(vai.soft_clipped);
        assert!(!vai.aligns_right);

        // Right-breakpoint mode flags a long leading clip instead
        settings.genotype_right_breakpoint = true;
        let record = record_from_parts(951, "600S100M", 700);
        examine_alignment(&record, &variant, &settings, &mut vai);
        assert!(vai.soft_clipped);

        // A clip at the tolerated length is not flagged
        let record = record_from_parts(951, "500S100M", 600);
        examine_alignment(&record, &variant, &settings, &mut vai);
        assert!(!vai.soft_clipped);
    }

    #[test]
    fn test_region_hint_expansion() {
        let settings = get_test_settings();
        let mut variant = get_test_variant();
        let mut vai = VarAlignInfo::new(2);

        // The 20I sits past the default region end and is only seen with the TRREND hint
        let record = record_from_parts(801, "400M20I100M", 520);
        examine_alignment(&record, &variant, &settings, &mut vai);
        assert_eq!(vai.n_ins, 0);

        variant.info.trr_end = Some(1400);
        examine_alignment(&record, &variant, &settings, &mut vai);
        assert_eq!(vai.n_ins, 20);
    }

    #[test]
    fn test_supports_and_rejects() {
        let settings = get_test_settings();
        let mut vai = VarAlignInfo::new(2);
        vai.aligns_left = true;
        vai.aligns_right = true;

        // 9bp insertion allele: n_ins = 8 sits inside (0.4, 2.0) of allele length
        vai.n_ins = 8;
        assert!(vai.supports(1.0, 9.0, &settings));
        assert!(!vai.rejects(1.0, 9.0, &settings));

        // No insertion evidence: rejected, not supported
        vai.n_ins = 0;
        assert!(!vai.supports(1.0, 9.0, &settings));
        assert!(vai.rejects(1.0, 9.0, &settings));

        // Soft-clipped reads support and never reject
        vai.soft_clipped = true;
        assert!(vai.supports(1.0, 9.0, &settings));
        assert!(!vai.rejects(1.0, 9.0, &settings));

        // Deletion-shaped allele draws on n_del and the ref length
        let mut vai = VarAlignInfo::new(2);
        vai.aligns_left = true;
        vai.aligns_right = true;
        vai.n_del = 40;
        assert!(vai.supports(80.0, 1.0, &settings));
        assert!(!vai.rejects(80.0, 1.0, &settings));
    }
}
