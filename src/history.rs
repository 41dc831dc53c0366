//! history.rs: bounded in-memory log of optimization runs plus running
//! totals for `/stats`.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::pipeline::OptimizationReport;

const MAX_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub ts_unix: u64,
    pub slug: String,
    pub fingerprint: String,
    pub qa_score: u32,
    pub passed: bool,
    pub word_count: usize,
    pub links_added: usize,
    pub duration_ms: u64,
}

impl From<&OptimizationReport> for RunRecord {
    fn from(r: &OptimizationReport) -> Self {
        Self {
            ts_unix: now_unix(),
            slug: r.contract.slug.clone(),
            fingerprint: r.fingerprint.clone(),
            qa_score: r.qa.score,
            passed: r.qa.passed,
            word_count: r.contract.word_count,
            links_added: r.links_added,
            duration_ms: r.duration_ms,
        }
    }
}

/// Totals since process start; unaffected by eviction from the bounded log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_runs: u64,
    pub passed_runs: u64,
    pub avg_qa_score: f64,
    pub total_words: u64,
    pub total_links: u64,
}

#[derive(Debug, Default)]
struct Totals {
    runs: u64,
    passed: u64,
    qa_sum: u64,
    words: u64,
    links: u64,
}

#[derive(Debug)]
struct Inner {
    rows: VecDeque<RunRecord>,
    totals: Totals,
}

#[derive(Debug)]
pub struct RunHistory {
    inner: Mutex<Inner>,
    cap: usize,
}

impl RunHistory {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, MAX_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                rows: VecDeque::with_capacity(cap),
                totals: Totals::default(),
            }),
            cap,
        }
    }

    pub fn record(&self, report: &OptimizationReport) {
        self.push(RunRecord::from(report));
    }

    pub fn push(&self, row: RunRecord) {
        let mut g = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let t = &mut g.totals;
        t.runs += 1;
        t.passed += u64::from(row.passed);
        t.qa_sum += u64::from(row.qa_score);
        t.words += row.word_count as u64;
        t.links += row.links_added as u64;

        g.rows.push_back(row);
        while g.rows.len() > self.cap {
            g.rows.pop_front();
        }
    }

    /// Oldest first.
    pub fn snapshot_last_n(&self, n: usize) -> Vec<RunRecord> {
        let g = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let start = g.rows.len().saturating_sub(n);
        g.rows.iter().skip(start).cloned().collect()
    }

    pub fn global_stats(&self) -> GlobalStats {
        let g = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let t = &g.totals;
        GlobalStats {
            total_runs: t.runs,
            passed_runs: t.passed,
            avg_qa_score: if t.runs == 0 {
                0.0
            } else {
                t.qa_sum as f64 / t.runs as f64
            },
            total_words: t.words,
            total_links: t.links,
        }
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
