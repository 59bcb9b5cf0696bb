use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "lawmd",
    version,
    about = "Chinese law text to structured Markdown conversion and verification"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Convert(ConvertArgs),
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    pub input: PathBuf,

    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LawDecision::Auto)]
    pub law_decision: LawDecision,

    #[arg(long, default_value_t = false)]
    pub skip_stage3_check: bool,

    #[arg(long, default_value_t = 2)]
    pub stage3_max_retries: usize,

    #[arg(long, default_value_t = false)]
    pub no_stage3_strict: bool,

    #[arg(long, value_enum, default_value_t = ArtifactLevel::Minimal)]
    pub artifact_level: ArtifactLevel,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LawDecision {
    Auto,
    Law,
    NonLaw,
}

impl LawDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Law => "law",
            Self::NonLaw => "non-law",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ArtifactLevel {
    Minimal,
    Standard,
    Debug,
}

impl ArtifactLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Debug => "debug",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(long)]
    pub stage1: PathBuf,

    #[arg(long)]
    pub stage2: PathBuf,

    #[arg(long, value_enum, default_value_t = LawDecision::Auto)]
    pub law_decision: LawDecision,

    #[arg(long, default_value = "")]
    pub stage2_reason: String,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub strict: bool,
}
