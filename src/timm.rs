//! Named wall-clock timers for instrumenting hot paths.
//!
//! A [`TimingRegistry`] maps names to records. The table is guarded by one mutex (only taken to
//! look up or add a name); each record has its own mutex for start/stop. Start timestamps are kept
//! per thread, so the same function may be timed concurrently from several threads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

/// Handle of a named timer in one registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FuncId(usize);

/// Accumulated measurements of one timer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimingRecord {
    /// Timer name.
    pub name: String,
    /// Completed start/stop pairs.
    pub calls: u64,
    /// Sum of all measured durations.
    pub total: Duration,
    /// Shortest measured duration.
    pub min: Duration,
    /// Longest measured duration.
    pub max: Duration,
    /// Mismatched calls: stop without start, or start while already running on that thread.
    pub errors: u64,
    /// Distinct threads that completed at least one measurement.
    pub threads: usize,
}

impl TimingRecord {
    /// Mean duration per call.
    pub fn average(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total / n,
            Err(_) => Duration::from_secs_f64(self.total.as_secs_f64() / self.calls as f64),
        }
    }
}

#[derive(Debug, Default)]
struct Entry {
    record: TimingRecord,
    running: HashMap<ThreadId, Instant>,
    seen: Vec<ThreadId>,
}

#[derive(Debug, Default)]
struct Table {
    ids: HashMap<String, FuncId>,
    entries: Vec<Arc<Mutex<Entry>>>,
}

/// Registry of named timers. Grows without limit.
#[derive(Debug, Default)]
pub struct TimingRegistry {
    table: Mutex<Table>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TimingRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the timer called `name`, creating it on first use.
    pub fn func_id(&self, name: &str) -> FuncId {
        let mut table = lock(&self.table);
        if let Some(&id) = table.ids.get(name) {
            return id;
        }
        let id = FuncId(table.entries.len());
        table.entries.push(Arc::new(Mutex::new(Entry {
            record: TimingRecord {
                name: name.to_string(),
                ..Default::default()
            },
            ..Default::default()
        })));
        table.ids.insert(name.to_string(), id);
        id
    }

    fn entry(&self, id: FuncId) -> Option<Arc<Mutex<Entry>>> {
        lock(&self.table).entries.get(id.0).cloned()
    }

    /// Start timing `id` on the calling thread.
    pub fn start(&self, id: FuncId) {
        let Some(entry) = self.entry(id) else {
            tracing::warn!(id = id.0, "timing start for unknown id");
            return;
        };
        let mut e = lock(&entry);
        let thread = std::thread::current().id();
        if e.running.insert(thread, Instant::now()).is_some() {
            e.record.errors += 1;
        }
    }

    /// Stop timing `id` on the calling thread and record the elapsed time.
    pub fn stop(&self, id: FuncId) {
        let now = Instant::now();
        let Some(entry) = self.entry(id) else {
            tracing::warn!(id = id.0, "timing stop for unknown id");
            return;
        };
        let thread = std::thread::current().id();
        let mut e = lock(&entry);
        let Some(started) = e.running.remove(&thread) else {
            e.record.errors += 1;
            tracing::debug!(name = %e.record.name, "timing stop without start");
            return;
        };
        let d = now.duration_since(started);
        if !e.seen.contains(&thread) {
            e.seen.push(thread);
        }
        let threads = e.seen.len();
        let r = &mut e.record;
        r.min = if r.calls == 0 { d } else { r.min.min(d) };
        r.max = r.max.max(d);
        r.total += d;
        r.calls += 1;
        r.threads = threads;
    }

    /// Snapshot of every record, in creation order.
    pub fn records(&self) -> Vec<TimingRecord> {
        let entries: Vec<_> = lock(&self.table).entries.clone();
        entries.iter().map(|e| lock(e).record.clone()).collect()
    }

    /// Log one line per timer that was used.
    pub fn log_report(&self) {
        for r in self.records() {
            if r.calls == 0 && r.errors == 0 {
                continue;
            }
            tracing::info!(
                name = %r.name,
                calls = r.calls,
                total_ms = r.total.as_secs_f64() * 1000.0,
                avg_us = r.average().as_secs_f64() * 1e6,
                min_us = r.min.as_secs_f64() * 1e6,
                max_us = r.max.as_secs_f64() * 1e6,
                errors = r.errors,
                threads = r.threads,
                "timing"
            );
        }
    }

    /// Clear all measurements, keeping the registered names and ids.
    pub fn reset(&self) {
        let entries: Vec<_> = lock(&self.table).entries.clone();
        for entry in entries {
            let mut e = lock(&entry);
            let name = std::mem::take(&mut e.record.name);
            *e = Entry {
                record: TimingRecord {
                    name,
                    ..Default::default()
                },
                ..Default::default()
            };
        }
    }

    /// Time `id` until the returned guard is dropped.
    pub fn guard(&self, id: FuncId) -> TimingGuard<'_> {
        self.start(id);
        TimingGuard { registry: self, id }
    }
}

/// Process-wide registry.
pub fn global() -> &'static TimingRegistry {
    static GLOBAL: OnceLock<TimingRegistry> = OnceLock::new();
    GLOBAL.get_or_init(TimingRegistry::new)
}

/// Stops its timer when dropped.
#[derive(Debug)]
pub struct TimingGuard<'a> {
    registry: &'a TimingRegistry,
    id: FuncId,
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        self.registry.stop(self.id);
    }
}

#[cfg(test)]
#[path = "../tests/unit/timm.rs"]
mod tests;
