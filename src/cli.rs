use clap::{ArgAction, Parser};
use simple_error::{bail, SimpleResult};

/// The per-read evidence models available for genotyping
///
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum, strum::Display, strum::EnumCount)]
#[value(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenotypeModel {
    /// Alignment-score depth model
    Ad,

    /// CIGAR indel-evidence model
    Va,

    /// Legacy span/support CIGAR model
    VaOld,

    /// Indel-presence model
    Presence,

    /// Ad and Va applied cumulatively
    Joint,

    /// All five models, one result row each
    Multi,
}

#[derive(Parser)]
#[command(
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(rename_all = "kebab_case")]
pub struct Settings {
    /// Alignment file in BAM format, or a file listing one BAM path per line
    #[arg(short = 'b', long = "bam", value_name = "FILE", required = true)]
    pub bam_filename: String,

    /// Indexed reference genome in FASTA format
    #[arg(short = 'f', long = "ref", value_name = "FILE", required = true)]
    pub ref_filename: String,

    /// Candidate variant catalog in VCF format
    #[arg(short = 'v', long = "vcf", value_name = "FILE", required = true)]
    pub vcf_filename: String,

    /// Output VCF path for the genotyped catalog
    #[arg(short = 'o', long = "output", value_name = "FILE", required = true)]
    pub output_filename: String,

    /// Number of threads to use. Defaults to all logical cpus detected.
    #[arg(long = "threads", value_name = "THREAD_COUNT")]
    thread_count_option: Option<usize>,

    /// This value will be filled in by thread_count_option
    #[arg(hide = true, default_value_t = 0)]
    pub thread_count: usize,

    /// Genotyping model
    #[arg(long, value_enum, default_value_t = GenotypeModel::Joint)]
    pub gt_model: GenotypeModel,

    /// Half-window size around the variant breakpoint used for allele windows
    #[arg(long, default_value_t = 500)]
    pub w_size: i64,

    /// Grow the window by the largest SVLEN/alt-allele length in each chunk
    #[arg(long)]
    pub dynamic_w_size: bool,

    /// Anchor allele windows at the right breakpoint of the variant
    #[arg(long)]
    pub genotype_right_breakpoint: bool,

    /// Padding on each side of the variant for CIGAR evidence counting
    #[arg(long, default_value_t = 100)]
    pub var_window: i64,

    /// Minimum CIGAR operation length contributing to indel evidence counts
    #[arg(long, default_value_t = 5)]
    pub min_del_ins: usize,

    /// Terminal soft-clips longer than this mark (or reject) a read as clipped
    #[arg(long, default_value_t = 500)]
    pub max_soft_clipped: usize,

    /// Maximum candidate reads evaluated per variant
    #[arg(long, default_value_t = 200)]
    pub max_bar_count: usize,

    /// Minimum read mapping quality
    #[arg(long, default_value_t = 30)]
    pub min_map_q: u8,

    /// Alignment match score
    #[arg(long = "match", default_value_t = 1, allow_hyphen_values = true)]
    pub match_score: i32,

    /// Alignment mismatch score
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub mismatch: i32,

    /// Alignment gap-open score (applied to the first gap base)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub gap_open: i32,

    /// Alignment gap-extend score
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub gap_extend: i32,

    /// Alignment band width as a percent of sequence length
    #[arg(long, default_value_t = 10.0)]
    pub banded_alignment_percent: f64,

    /// Divisor converting alignment score differences into log-2 preference units
    #[arg(long, default_value_t = 2.0)]
    pub log_scale_factor: f64,

    /// Cap on the log-2 preference contributed by alignment scores per read
    #[arg(long, default_value_t = 10.0)]
    pub max_align_bits: f64,

    /// Log-2 preference contributed by CIGAR span evidence per read
    #[arg(long, default_value_t = 10.0)]
    pub overlap_bits: f64,

    /// Lower support fraction of allele length for the legacy model
    #[arg(long, default_value_t = 0.4)]
    pub alt_thresh_fraction: f64,

    /// Upper support fraction of allele length for the legacy model
    #[arg(long, default_value_t = 2.0)]
    pub alt_thresh_fraction_max: f64,

    /// Rejection fraction of allele length for the legacy model
    #[arg(long, default_value_t = 0.1)]
    pub ref_thresh_fraction: f64,

    /// Minimum indel evidence length for the presence model
    #[arg(long, default_value_t = 5)]
    pub min_present: usize,

    /// Crop reads to the variant window before alignment
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    pub crop_read: bool,

    /// Collapse homopolymer runs in the reference window before alignment
    #[arg(long)]
    pub mask: bool,

    /// Maximum number of variants per work chunk
    #[arg(long, default_value_t = 1000)]
    pub chunk_size: usize,

    /// Print constructed ref/alt windows instead of genotyping
    #[arg(long)]
    pub output_ref_alt: bool,

    /// Turn on extra debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Validate settings and update parameters that can't be processed automatically by clap
///
pub fn validate_and_fix_settings_impl(mut settings: Settings) -> SimpleResult<Settings> {
    settings.thread_count = match settings.thread_count_option {
        Some(count) => {
            if count == 0 {
                bail!("--threads argument must be greater than 0");
            }
            count
        }
        None => num_cpus::get(),
    };

    if settings.w_size <= 0 {
        bail!("--w-size must be greater than 0");
    }
    if settings.var_window < 0 {
        bail!("--var-window must not be negative");
    }
    if settings.banded_alignment_percent <= 0.0 {
        bail!("--banded-alignment-percent must be greater than 0");
    }
    settings.banded_alignment_percent = settings.banded_alignment_percent.min(100.0);

    if settings.log_scale_factor <= 0.0 {
        bail!("--log-scale-factor must be greater than 0");
    }
    if settings.chunk_size == 0 {
        bail!("--chunk-size must be greater than 0");
    }

    Ok(settings)
}

pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_and_fix_settings_impl(settings) {
        Ok(x) => x,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}
