use std::path::Path;
use std::process;
use std::sync::mpsc::channel;
use std::time::Instant;

use hhmmss::Hhmmss;
use log::info;
use rust_htslib::bam::{self, Read};
use simple_error::{bail, SimpleResult};
use unwrap::unwrap;

use lrgt::allele_windows::get_w_size_actual;
use lrgt::cli;
use lrgt::genome_ref_utils::{get_genome_ref_from_fasta, GenomeRef};
use lrgt::process_chunk::{get_chunk_fetch_region, process_chunk};
use lrgt::variant::{get_variant_chunks, Variant};
use lrgt::vcf_io::{read_variant_catalog, write_genotyped_catalog};
use lrgt::worker_thread_data::{get_bam_reader_worker_thread_data, BamReaderWorkerThreadDataSet};

static PROG_NAME: &str = env!("CARGO_PKG_NAME");

fn setup_logger(debug: bool) -> Result<(), fern::InitError> {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                PROG_NAME,
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

/// Resolve the alignment input argument into bam paths: either a single `.bam` file, or a
/// file listing one bam path per line
///
fn get_bam_filenames(bam_arg: &str) -> SimpleResult<Vec<String>> {
    let mut paths = Vec::new();
    if bam_arg.ends_with(".bam") {
        paths.push(bam_arg.to_string());
    } else {
        let list = match std::fs::read_to_string(bam_arg) {
            Ok(x) => x,
            Err(e) => bail!("Unable to read alignment file list '{}': {}", bam_arg, e),
        };
        for line in list.lines().map(str::trim).filter(|x| !x.is_empty()) {
            if !line.ends_with(".bam") {
                bail!("Input file '{}' has unrecognized extension", line);
            }
            paths.push(line.to_string());
        }
    }

    if paths.is_empty() {
        bail!("No alignment files found for input '{}'", bam_arg);
    }

    for path in paths.iter() {
        if !Path::new(path).exists() {
            bail!("Input file '{}' does not exist", path);
        }
        let index_path = format!("{path}.bai");
        if !Path::new(&index_path).exists() {
            bail!("Input file '{}' has no corresponding '.bai' index", path);
        }
    }

    Ok(paths)
}

/// Fetch the chunk's reads from every input file and genotype the chunk variants
///
fn process_one_chunk(
    worker_thread_dataset: &BamReaderWorkerThreadDataSet,
    reference: &GenomeRef,
    mut chunk_variants: Vec<Variant>,
    settings: &cli::Settings,
) -> Vec<Variant> {
    let worker_index = rayon::current_thread_index().unwrap();
    let mut worker_data = worker_thread_dataset[worker_index].lock().unwrap();
    let bam_readers = &mut worker_data.bam_readers;

    let w_size_actual = get_w_size_actual(&chunk_variants, settings);
    let (fetch_beg, fetch_end) = get_chunk_fetch_region(&chunk_variants, w_size_actual, settings);
    let chrom = chunk_variants[0].chrom.clone();

    let mut reads: Vec<bam::Record> = Vec::new();
    let reader_count = bam_readers.len();
    for reader in bam_readers.iter_mut() {
        // Input files with no reads on this contig are quietly ignored
        let tid = match reader.header().tid(chrom.as_bytes()) {
            Some(x) => x,
            None => continue,
        };
        unwrap!(
            reader.fetch((tid, fetch_beg, fetch_end)),
            "Failed to fetch region {}:{}-{}",
            chrom,
            fetch_beg,
            fetch_end,
        );

        let mut record = bam::Record::new();
        while let Some(r) = reader.read(&mut record) {
            unwrap!(r, "Failed to parse alignment record");
            reads.push(record.clone());
        }
    }

    if reader_count > 1 {
        reads.sort_by_key(|x| x.pos());
    }

    process_chunk(reference, &reads, &mut chunk_variants, settings);
    chunk_variants
}

fn run(settings: &cli::Settings) -> SimpleResult<()> {
    info!("Starting {PROG_NAME} {}", env!("CARGO_PKG_VERSION"));
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.thread_count);

    let start = Instant::now();

    let bam_filenames = get_bam_filenames(&settings.bam_filename)?;

    let mut reference = get_genome_ref_from_fasta(&settings.ref_filename);
    reference.simplify_ambiguous_dna_bases();

    let mut variants = read_variant_catalog(&settings.vcf_filename)?;
    let chunks = get_variant_chunks(&variants, settings.chunk_size);
    info!(
        "Genotyping {} variants in {} chunks",
        variants.len(),
        chunks.len()
    );

    let worker_thread_dataset = get_bam_reader_worker_thread_data(
        settings.thread_count,
        &bam_filenames,
        &settings.ref_filename,
    );

    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.thread_count)
        .build()
        .unwrap();

    let (tx, rx) = channel();
    {
        let variants = &variants;
        let reference = &reference;
        let chunks = &chunks;
        let worker_thread_dataset = &worker_thread_dataset;
        worker_pool.scope(move |scope| {
            for (chunk_index, chunk_range) in chunks.iter().enumerate() {
                let tx = tx.clone();
                let chunk_variants = variants[chunk_range.clone()].to_vec();
                scope.spawn(move |_| {
                    let processed = process_one_chunk(
                        worker_thread_dataset,
                        reference,
                        chunk_variants,
                        settings,
                    );
                    tx.send((chunk_index, processed)).unwrap();
                });
            }
        });
    }

    for (chunk_index, processed) in rx {
        let chunk_range = chunks[chunk_index].clone();
        for (variant, result) in variants[chunk_range].iter_mut().zip(processed) {
            *variant = result;
        }
    }

    let sample_name = Path::new(&bam_filenames[0])
        .file_stem()
        .map(|x| x.to_string_lossy().to_string())
        .unwrap_or_else(|| String::from("SAMPLE"));
    write_genotyped_catalog(
        &settings.output_filename,
        &variants,
        &reference,
        &sample_name,
    )?;

    info!(
        "{PROG_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    let settings = cli::parse_settings();
    setup_logger(settings.debug).unwrap();
    let settings = cli::validate_and_fix_settings(settings);

    if let Err(err) = run(&settings) {
        eprintln!("{}", err);
        process::exit(2);
    }
}
