//! Thread-safe accumulation of violation reports and specification usage.

mod entry;
mod sink;

pub use entry::{ReportEntry, ReportEntryDocument};
pub use sink::{FileSink, ReportFormat};

use parking_lot::Mutex;
use rampart_contract::{CapturedRequest, CapturedResponse, Coverage, Report, Usage};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error};

/// Shared store of report entries (keyed by specification title, insertion
/// order preserved) and per-title usage accumulators.
///
/// Mutations and reads are mutually exclusive behind coarse locks: an
/// entry is visible to readers as soon as `add_report` returns, and a
/// reader never observes a partially appended entry.
pub struct Aggregator {
    reports: Mutex<HashMap<String, Vec<ReportEntry>>>,
    usage: Mutex<HashMap<String, Usage>>,
    next_seq: AtomicU64,
    sink: Option<FileSink>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Aggregator that also mirrors entries and usage summaries to files.
    pub fn with_sink(sink: FileSink) -> Self {
        Self::build(Some(sink))
    }

    fn build(sink: Option<FileSink>) -> Self {
        Self {
            reports: Mutex::new(HashMap::new()),
            usage: Mutex::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            sink,
        }
    }

    /// Record one tested exchange: append an entry under the report's
    /// specification title and fold its coverage into that title's usage.
    pub fn add_report(
        &self,
        report: Report,
        request: CapturedRequest,
        response: CapturedResponse,
    ) {
        let title = report.title().to_string();

        {
            let mut usage = self.usage.lock();
            usage
                .entry(title.clone())
                .or_insert_with(|| Usage::new(&report.specification))
                .fold(&report);
        }

        // sequence assignment and append happen under one lock so entries
        // within a title are stored in id order even under contention
        let entry = {
            let mut reports = self.reports.lock();
            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
            let entry = ReportEntry {
                seq,
                report,
                request,
                response,
            };
            reports
                .entry(title.clone())
                .or_default()
                .push(entry.clone());
            entry
        };

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.write_entry(&entry) {
                error!("failed to mirror report entry {}: {e}", entry.seq);
            }
        }
        debug!(title = %title, seq = entry.seq, "recorded report entry");
    }

    /// Entries for one title, in insertion order.
    pub fn reports_for(&self, title: &str) -> Vec<ReportEntry> {
        self.reports
            .lock()
            .get(title)
            .cloned()
            .unwrap_or_default()
    }

    /// Total entry count across all titles.
    pub fn report_count(&self) -> usize {
        self.reports.lock().values().map(Vec::len).sum()
    }

    /// The `reports` command document: title to ordered entry documents.
    pub fn reports_document(&self) -> BTreeMap<String, Vec<ReportEntryDocument>> {
        let reports = self.reports.lock();
        reports
            .iter()
            .map(|(title, entries)| {
                (
                    title.clone(),
                    entries.iter().map(ReportEntry::to_document).collect(),
                )
            })
            .collect()
    }

    /// Atomically drop every entry across all titles and reset the
    /// sequence counter.
    pub fn flush_reports(&self) {
        let mut reports = self.reports.lock();
        reports.clear();
        self.next_seq.store(0, Ordering::SeqCst);
        debug!("report store cleared");
    }

    /// The `usage` command document: title to the seven unused sets.
    pub fn usage_document(&self) -> BTreeMap<String, Coverage> {
        let usage = self.usage.lock();
        usage
            .iter()
            .map(|(title, usage)| (title.clone(), usage.unused()))
            .collect()
    }

    /// Atomically replace the usage store with a fresh empty one, first
    /// mirroring each title's summary when a sink is configured.
    pub fn flush_usage(&self) {
        let mut usage = self.usage.lock();
        let drained = std::mem::take(&mut *usage);
        drop(usage);

        if let Some(sink) = &self.sink {
            for (title, usage) in &drained {
                if let Err(e) = sink.write_usage(title, &usage.unused()) {
                    error!("failed to mirror usage for '{title}': {e}");
                }
            }
        }
        debug!("usage store cleared");
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
