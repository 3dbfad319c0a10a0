use std::sync::{Arc, Mutex};

use rust_htslib::bam;
use unwrap::unwrap;

/// For worker threads making indexed bam reads, this provides a persistent worker specific
/// reader for each input alignment file
pub struct BamReaderWorkerThreadData {
    pub bam_readers: Vec<bam::IndexedReader>,
}

impl BamReaderWorkerThreadData {
    pub fn new(bam_filenames: &[String], ref_filename: &str) -> Self {
        let mut bam_readers = Vec::new();
        for bam_filename in bam_filenames {
            let mut reader = unwrap!(
                bam::IndexedReader::from_path(bam_filename),
                "Unable to open alignment file or its index: '{}'",
                bam_filename,
            );
            unwrap!(
                reader.set_reference(ref_filename),
                "Unable to attach reference '{}' to alignment file reader",
                ref_filename,
            );
            bam_readers.push(reader);
        }
        Self { bam_readers }
    }
}

pub type BamReaderWorkerThreadDataSet = Arc<Vec<Mutex<BamReaderWorkerThreadData>>>;

pub fn get_bam_reader_worker_thread_data(
    thread_count: usize,
    bam_filenames: &[String],
    ref_filename: &str,
) -> BamReaderWorkerThreadDataSet {
    let mut worker_thread_data = Vec::new();
    for _ in 0..thread_count {
        worker_thread_data.push(Mutex::new(BamReaderWorkerThreadData::new(
            bam_filenames,
            ref_filename,
        )));
    }
    Arc::new(worker_thread_data)
}
