//! Genotype insertion/deletion structural variants from long-read alignments
//!

pub mod allele_windows;
pub mod bam_utils;
pub mod banded_align;
pub mod cli;
pub mod genome_ref_utils;
pub mod genotype;
pub mod process_chunk;
pub mod read_crop;
pub mod read_evidence;
pub mod read_selection;
pub mod score_models;
pub mod variant;
pub mod vcf_io;
pub mod worker_thread_data;

pub use process_chunk::process_chunk;
