//! File-backed mirroring of report entries and usage summaries.

use super::entry::ReportEntry;
use rampart_contract::Coverage;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Output format for mirrored report files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

/// Writes every recorded entry (and, on the final usage flush, each
/// title's usage summary) into a directory. Failures are the caller's to
/// log; they never affect the in-memory state.
pub struct FileSink {
    dir: PathBuf,
    format: ReportFormat,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, format: ReportFormat) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        info!("mirroring reports to {:?} as {:?}", dir, format);
        Ok(Self { dir, format })
    }

    pub fn write_entry(&self, entry: &ReportEntry) -> std::io::Result<()> {
        let path = self
            .dir
            .join(format!("rampart-violations-{}.{}", entry.seq, self.format.extension()));
        match self.format {
            ReportFormat::Json => write_json(&path, &entry.to_document()),
            ReportFormat::Text => {
                let mut out = String::new();
                out.push_str(&format!("Request: {}\n", entry.request.request_line()));
                push_lines(&mut out, "Request violations", &entry.report.request_violations);
                out.push_str(&format!("Response status: {}\n", entry.response.status));
                push_lines(&mut out, "Response violations", &entry.report.response_violations);
                fs::write(&path, out)
            }
        }
    }

    pub fn write_usage(&self, title: &str, unused: &Coverage) -> std::io::Result<()> {
        let path = self.dir.join(format!(
            "rampart-usage-{}.{}",
            sanitize(title),
            self.format.extension()
        ));
        match self.format {
            ReportFormat::Json => write_json(&path, unused),
            ReportFormat::Text => {
                let mut out = String::new();
                push_lines(&mut out, "Unused resources", &set_lines(&unused.resources));
                push_lines(&mut out, "Unused actions", &set_lines(&unused.actions));
                push_lines(
                    &mut out,
                    "Unused request headers",
                    &set_lines(&unused.request_headers),
                );
                push_lines(
                    &mut out,
                    "Unused query parameters",
                    &set_lines(&unused.query_parameters),
                );
                push_lines(
                    &mut out,
                    "Unused form parameters",
                    &set_lines(&unused.form_parameters),
                );
                push_lines(
                    &mut out,
                    "Unused response headers",
                    &set_lines(&unused.response_headers),
                );
                push_lines(
                    &mut out,
                    "Unused response codes",
                    &set_lines(&unused.response_codes),
                );
                fs::write(&path, out)
            }
        }
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    let mut file = fs::File::create(path)?;
    file.write_all(json.as_bytes())
}

fn push_lines(out: &mut String, heading: &str, lines: &[String]) {
    out.push_str(heading);
    out.push_str(":\n");
    for line in lines {
        out.push_str("  - ");
        out.push_str(line);
        out.push('\n');
    }
}

fn set_lines(set: &std::collections::BTreeSet<String>) -> Vec<String> {
    set.iter().cloned().collect()
}

/// Title characters that are unsafe in filenames become dashes.
fn sanitize(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect()
}
