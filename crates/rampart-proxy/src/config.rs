//! Command line interface.

use crate::aggregate::ReportFormat;
use crate::delay::DelayRange;
use clap::Parser;
use std::path::PathBuf;

/// Contract-testing reverse proxy: forwards or mocks HTTP exchanges,
/// validates each against an API specification, and answers operator
/// commands on the reserved `/@@@proxy` path prefix.
#[derive(Parser, Debug)]
#[command(name = "rampart", version, about)]
#[command(group(clap::ArgGroup::new("upstream").required(true).args(["target", "mock_dir"])))]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8099)]
    pub port: u16,

    /// Forward requests to this backend URL (proxy mode)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Serve canned responses from this directory (mock mode)
    #[arg(short, long)]
    pub mock_dir: Option<PathBuf>,

    /// Specification file path or URL to validate exchanges against
    #[arg(short = 'r', long)]
    pub spec: String,

    /// Base URI overriding the one declared in the specification
    #[arg(short, long)]
    pub base_uri: Option<String>,

    /// Mirror reports and usage summaries into this directory
    #[arg(short, long)]
    pub save_dir: Option<PathBuf>,

    /// File format for mirrored reports
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: ReportFormat,

    /// Exempt X- headers from validation and usage tracking
    #[arg(short, long)]
    pub ignore_x_headers: bool,

    /// Response delay in milliseconds, `MAX` or `MIN-MAX`
    #[arg(short, long, default_value = "0")]
    pub delay: DelayRange,

    /// Bind the listening socket before the specification finishes loading
    #[arg(short, long)]
    pub async_start: bool,
}
