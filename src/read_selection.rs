//! Selection of the candidate read set for one variant
//!

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use rust_htslib::bam;

use crate::bam_utils::{get_alignment_end, has_terminal_hard_clip, terminal_soft_clip_len};
use crate::cli::Settings;
use crate::read_evidence::{examine_alignment, VarAlignInfo};
use crate::variant::Variant;

/// Filter the position-sorted chunk reads down to the candidate set for one variant, and
/// extract CIGAR evidence for each candidate
///
/// At most `maxBARcount` candidates are returned. A query name occurring more than once
/// keeps only its last record; the earlier slot is overwritten in place so candidate order
/// is preserved.
///
pub fn select_candidate_reads<'a>(
    reads: &'a [bam::Record],
    variant: &Variant,
    w_size_actual: i64,
    settings: &Settings,
) -> (Vec<&'a bam::Record>, Vec<VarAlignInfo>) {
    let mut sel_beg = variant.pos - w_size_actual;
    let mut sel_end = variant.pos + w_size_actual;
    if settings.genotype_right_breakpoint {
        sel_beg += variant.ref_len() as i64;
        sel_end += variant.ref_len() as i64;
    }

    // The evidence buffer is reused across records and copied into the kept slot
    let mut vai = VarAlignInfo::new(variant.n_alleles());

    let mut candidates: Vec<&bam::Record> = Vec::new();
    let mut align_infos: Vec<VarAlignInfo> = Vec::new();
    let mut name_cache: HashMap<Vec<u8>, usize> = HashMap::new();

    for record in reads {
        if candidates.len() >= settings.max_bar_count || record.pos() >= sel_end {
            break;
        }

        // Ignore the read if it does not stretch to the region we are interested in
        if get_alignment_end(record) < sel_beg {
            continue;
        }
        if record.mapq() < settings.min_map_q {
            continue;
        }
        if record.is_duplicate() || record.is_quality_check_failed() {
            continue;
        }

        let cigar = record.cigar();
        if has_terminal_hard_clip(&cigar) {
            continue;
        }
        if terminal_soft_clip_len(&cigar, settings.genotype_right_breakpoint)
            > settings.max_soft_clipped
        {
            continue;
        }

        examine_alignment(record, variant, settings, &mut vai);

        // Prevent multiple alignments of the same read from being used: the last record wins
        match name_cache.entry(record.qname().to_vec()) {
            Entry::Occupied(entry) => {
                let index = *entry.get();
                candidates[index] = record;
                align_infos[index] = vai.clone();
            }
            Entry::Vacant(entry) => {
                entry.insert(candidates.len());
                candidates.push(record);
                align_infos.push(vai.clone());
            }
        }
    }

    (candidates, align_infos)
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

    fn record_from_line(
        qname: &str,
        flag: u16,
        pos_1based: i64,
        mapq: u8,
        cigar: &str,
        read_len: usize,
    ) -> bam::Record {
        let header = get_test_header();
        let seq = "A".repeat(read_len);
        let qual = "D".repeat(read_len);
        let sam_line =
            format!("{qname}\t{flag}\tchr1\t{pos_1based}\t{mapq}\t{cigar}\t*\t0\t0\t{seq}\t{qual}");
        bam::Record::from_sam(&header, sam_line.as_bytes()).unwrap()
    }

    #[test]
    fn test_filters_and_order() {
        let settings = get_test_settings();
        let variant = get_test_variant();

        let reads = vec![
            // Ends before the selection window
            record_from_line("ends_early", 0, 501, 60, "100M", 100),
            // Passes all filters
            record_from_line("good1", 0, 801, 60, "400M", 400),
            // Below the mapping quality threshold
            record_from_line("low_mapq", 0, 811, 10, "400M", 400),
            // Marked duplicate
            record_from_line("dup_flag", 1024, 821, 60, "400M", 400),
            // QC fail
            record_from_line("qc_fail", 512, 831, 60, "400M", 400),
            // Hard-clipped edge
            record_from_line("hard_clip", 0, 841, 60, "5H400M", 400),
            // Long leading soft-clip on the breakpoint side
            record_from_line("soft_clip", 0, 851, 60, "600S300M", 900),
            // Passes all filters
            record_from_line("good2", 0, 901, 60, "400M", 400),
            // Starts at the selection window end: iteration stops here
            record_from_line("at_end", 0, 1101, 60, "400M", 400),
            record_from_line("good3", 0, 1111, 60, "400M", 400),
        ];

        let (candidates, align_infos) = select_candidate_reads(&reads, &variant, 100, &settings);

        let names: Vec<&str> = candidates
            .iter()
            .map(|x| std::str::from_utf8(x.qname()).unwrap())
            .collect();
        assert_eq!(names, vec!["good1", "good2"]);

        assert_eq!(align_infos.len(), 2);
        assert_eq!(align_infos[0].qname, "good1");
        assert_eq!(align_infos[1].qname, "good2");
        assert!(align_infos.iter().all(|x| x.n_alleles() == 2));
    }

    #[test]
    fn test_duplicate_qname_last_wins() {
        let settings = get_test_settings();
        let variant = get_test_variant();

        let reads = vec![
            record_from_line("shared", 0, 801, 60, "400M", 400),
            record_from_line("other", 0, 821, 60, "400M", 400),
            record_from_line("shared", 0, 841, 60, "400M", 400),
        ];

        let (candidates, align_infos) = select_candidate_reads(&reads, &variant, 100, &settings);

        // The later "shared" record replaces the earlier one in its original slot
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].pos(), 840);
        assert_eq!(candidates[1].pos(), 820);
        assert_eq!(align_infos[0].qname, "shared");
        assert_eq!(align_infos[1].qname, "other");
    }

    #[test]
    fn test_max_bar_count_cap() {
        let mut settings = get_test_settings();
        settings.max_bar_count = 2;
        let variant = get_test_variant();

        let reads = vec![
            record_from_line("r1", 0, 801, 60, "400M", 400),
            record_from_line("r2", 0, 811, 60, "400M", 400),
            record_from_line("r3", 0, 821, 60, "400M", 400),
        ];

        let (candidates, _) = select_candidate_reads(&reads, &variant, 100, &settings);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_right_breakpoint_selection_shift() {
        let mut settings = get_test_settings();
        settings.genotype_right_breakpoint = true;
        let variant = get_test_variant();

        // Selection window shifts right by the ref allele length (1bp): [901, 1101)
        let reads = vec![
            record_from_line("in_window", 0, 1051, 60, "400M", 400),
            record_from_line("past_window", 0, 1102, 60, "400M", 400),
        ];

        let (candidates, _) = select_candidate_reads(&reads, &variant, 100, &settings);
        assert_eq!(candidates.len(), 1);
    }
}
