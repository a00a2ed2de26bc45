//! Resource-leak oracle
//!
//! After a full attach, up, down, detach, deinit cycle a test asks a
//! [`ResourceProbe`] for its counters and runs a [`ResourceCheck`] against
//! them. The check is a pass/fail oracle: it reads counters and never changes
//! them, and nothing in the lifecycle layer depends on it.
//!
//! Counters a platform cannot measure are reported as `None` and skipped.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Point-in-time resource counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounters {
    /// Lowest free stack seen on the main task, in bytes
    pub stack_min_free: Option<i64>,
    /// Lowest free heap seen since start, in bytes
    pub heap_min_free: Option<i64>,
    /// Allocations not yet freed
    pub heap_allocations: i64,
    /// OS resources (tasks, mutexes, queues) not yet freed
    pub os_resources: i64,
    /// UART handles still open
    pub uart_handles: i64,
    /// I2C handles still open
    pub i2c_handles: i64,
    /// SPI handles still open
    pub spi_handles: i64,
}

/// Limits a clean run must respect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceThresholds {
    /// Minimum acceptable `stack_min_free`
    pub stack_min_free: i64,
    /// Minimum acceptable `heap_min_free`
    pub heap_min_free: i64,
    /// OS resources that are expected to stay allocated (monitor tasks and
    /// the like)
    pub os_resources_baseline: i64,
}

impl Default for ResourceThresholds {
    fn default() -> Self {
        Self {
            stack_min_free: 1024,
            heap_min_free: 4096,
            os_resources_baseline: 0,
        }
    }
}

/// Source of [`ResourceCounters`]
pub trait ResourceProbe {
    /// Read the counters now
    fn counters(&self) -> ResourceCounters;
}

/// Kinds of resource a driver may hold while an interface is up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    /// One heap allocation
    HeapAllocation,
    /// One OS task, mutex or queue
    OsResource,
    /// One UART handle
    Uart,
    /// One I2C handle
    I2c,
    /// One SPI handle
    Spi,
}

/// In-memory probe that mock drivers charge and refund.
///
/// Stack and heap watermarks are not measured unless set explicitly.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    heap_allocations: AtomicI64,
    os_resources: AtomicI64,
    uart_handles: AtomicI64,
    i2c_handles: AtomicI64,
    spi_handles: AtomicI64,
    watermarks: Mutex<(Option<i64>, Option<i64>)>,
}

impl ResourceLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, resource: Resource) -> &AtomicI64 {
        match resource {
            Resource::HeapAllocation => &self.heap_allocations,
            Resource::OsResource => &self.os_resources,
            Resource::Uart => &self.uart_handles,
            Resource::I2c => &self.i2c_handles,
            Resource::Spi => &self.spi_handles,
        }
    }

    /// Record `resource` as taken
    pub fn acquire(&self, resource: Resource) {
        self.counter(resource).fetch_add(1, Ordering::SeqCst);
    }

    /// Record `resource` as given back
    pub fn release(&self, resource: Resource) {
        self.counter(resource).fetch_sub(1, Ordering::SeqCst);
    }

    /// Outstanding count of one resource kind
    pub fn outstanding(&self, resource: Resource) -> i64 {
        self.counter(resource).load(Ordering::SeqCst)
    }

    /// Report stack and heap low-water marks
    pub fn set_watermarks(&self, stack_min_free: Option<i64>, heap_min_free: Option<i64>) {
        *self.watermarks.lock() = (stack_min_free, heap_min_free);
    }
}

impl ResourceProbe for ResourceLedger {
    fn counters(&self) -> ResourceCounters {
        let (stack_min_free, heap_min_free) = *self.watermarks.lock();
        ResourceCounters {
            stack_min_free,
            heap_min_free,
            heap_allocations: self.outstanding(Resource::HeapAllocation),
            os_resources: self.outstanding(Resource::OsResource),
            uart_handles: self.outstanding(Resource::Uart),
            i2c_handles: self.outstanding(Resource::I2c),
            spi_handles: self.outstanding(Resource::Spi),
        }
    }
}

impl ResourceProbe for ResourceCounters {
    fn counters(&self) -> ResourceCounters {
        *self
    }
}

/// Outcome of one [`ResourceCheck::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReport {
    clean: bool,
    lines: Vec<String>,
    failures: BTreeMap<&'static str, i64>,
}

impl ResourceReport {
    /// Whether every measured counter is within its threshold
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    /// Human-readable lines, each starting with the prefix given to `run`
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Failed counters by name, with the value that failed
    pub fn failures(&self) -> &BTreeMap<&'static str, i64> {
        &self.failures
    }
}

impl fmt::Display for ResourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Compares a probe's counters with thresholds
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceCheck {
    thresholds: ResourceThresholds,
}

impl ResourceCheck {
    /// Check against `thresholds`
    pub fn new(thresholds: ResourceThresholds) -> Self {
        Self { thresholds }
    }

    /// Read `probe` and judge it.
    ///
    /// Every report line starts with `prefix`; lines for failed counters
    /// carry `error_marker` after the prefix so a log scraper can find them.
    pub fn run(
        &self,
        probe: &dyn ResourceProbe,
        prefix: &str,
        error_marker: &str,
    ) -> ResourceReport {
        let counters = probe.counters();
        let limits = self.thresholds;
        let mut report = Reporter::new(prefix, error_marker);

        if let Some(free) = counters.stack_min_free.filter(|free| *free >= 0) {
            report.check(
                "stack_min_free",
                free,
                free >= limits.stack_min_free,
                format!(
                    "main task stack had a minimum of {free} byte(s) free (minimum is {}).",
                    limits.stack_min_free
                ),
            );
        }
        if let Some(free) = counters.heap_min_free.filter(|free| *free >= 0) {
            report.check(
                "heap_min_free",
                free,
                free >= limits.heap_min_free,
                format!(
                    "heap had a minimum of {free} byte(s) free (minimum is {}).",
                    limits.heap_min_free
                ),
            );
        }

        let outstanding = counters.heap_allocations;
        report.check_quiet(
            "heap_allocations",
            outstanding,
            outstanding <= 0,
            format!("{outstanding} outstanding allocation(s)."),
        );

        let os = counters.os_resources;
        let baseline = limits.os_resources_baseline;
        report.check_quiet(
            "os_resources",
            os,
            os == baseline,
            format!(
                "expected {baseline} outstanding OS resource(s) (tasks etc.) but got {os}; \
                 they might yet be cleaned up."
            ),
        );

        for (name, label, count) in [
            ("uart_handles", "UART", counters.uart_handles),
            ("i2c_handles", "I2C", counters.i2c_handles),
            ("spi_handles", "SPI", counters.spi_handles),
        ] {
            report.check_quiet(
                name,
                count,
                count <= 0,
                format!("{count} {label} resource(s) outstanding."),
            );
        }

        if report.clean {
            report.line(
                "",
                format!("resources are good ({baseline} outstanding OS resource(s), as expected)."),
            );
        } else {
            tracing::warn!(failures = ?report.failures, "resource check failed");
        }
        report.finish()
    }
}

struct Reporter<'a> {
    prefix: &'a str,
    error_marker: &'a str,
    clean: bool,
    lines: Vec<String>,
    failures: BTreeMap<&'static str, i64>,
}

impl<'a> Reporter<'a> {
    fn new(prefix: &'a str, error_marker: &'a str) -> Self {
        Self {
            prefix,
            error_marker,
            clean: true,
            lines: Vec::new(),
            failures: BTreeMap::new(),
        }
    }

    fn line(&mut self, marker: &str, message: String) {
        self.lines.push(format!("{}{marker}{message}", self.prefix));
    }

    /// Watermarks are always reported
    fn check(&mut self, name: &'static str, value: i64, ok: bool, message: String) {
        if !ok {
            self.fail(name, value);
        }
        let marker = if ok { "" } else { self.error_marker };
        self.line(marker, message);
    }

    /// Leak counters are only reported when they fail
    fn check_quiet(&mut self, name: &'static str, value: i64, ok: bool, message: String) {
        if !ok {
            self.fail(name, value);
            let marker = self.error_marker;
            self.line(marker, message);
        }
    }

    fn fail(&mut self, name: &'static str, value: i64) {
        self.clean = false;
        self.failures.insert(name, value);
    }

    fn finish(self) -> ResourceReport {
        ResourceReport {
            clean: self.clean,
            lines: self.lines,
            failures: self.failures,
        }
    }
}
