// Snapshot management for stepping backward and forward through a simulation

use crate::memory::stack::{CallStack, ReturnOutcome};
use crate::memory::Memory;
use crate::simulator::overflow::OverflowReport;

/// Trace of everything a simulation did, one line per event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceLog {
    pub lines: Vec<TraceLine>,
}

impl TraceLog {
    pub fn new() -> Self {
        TraceLog { lines: Vec::new() }
    }

    /// Append a line attributed to `step`
    pub fn record(&mut self, step: usize, text: String) {
        self.lines.push(TraceLine { step, text });
    }

    /// Get all lines as plain strings
    pub fn get_output(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.text.clone()).collect()
    }
}

/// A line of trace output with the step that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    pub step: usize,
    pub text: String,
}

/// Snapshot of simulation state after one step
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub label: String,
    pub memory: Memory,
    pub stack: CallStack,
    pub trace: TraceLog,
    pub last_report: Option<OverflowReport>,
    pub last_return: Option<ReturnOutcome>,
}

impl Snapshot {
    /// Estimate the memory usage of this snapshot in bytes
    pub fn estimated_size(&self) -> usize {
        // Rough estimate: frames ~128 bytes, trace lines ~64 bytes
        let stack_size = self.stack.depth() * 128;
        let trace_size = self.trace.lines.len() * 64;
        let report_size = self
            .last_report
            .as_ref()
            .map_or(0, |r| r.bytes_written * 2 + 64);

        self.memory.capacity() + stack_size + trace_size + report_size
    }
}

/// Manages execution history for stepping through a simulation
#[derive(Debug)]
pub struct SnapshotManager {
    snapshots: Vec<Snapshot>,
    max_memory: usize,
    current_memory: usize,
}

impl SnapshotManager {
    pub fn new(max_memory: usize) -> Self {
        SnapshotManager {
            snapshots: Vec::new(),
            max_memory,
            current_memory: 0,
        }
    }

    /// Add a snapshot to history
    pub fn push(&mut self, snapshot: Snapshot) -> Result<(), String> {
        let snapshot_size = snapshot.estimated_size();

        if self.current_memory + snapshot_size > self.max_memory {
            return Err(format!(
                "Snapshot memory limit exceeded: {} + {} > {}",
                self.current_memory, snapshot_size, self.max_memory
            ));
        }

        self.current_memory += snapshot_size;
        self.snapshots.push(snapshot);
        Ok(())
    }

    /// Drop every snapshot after `len` entries
    pub fn truncate(&mut self, len: usize) {
        for dropped in self.snapshots.drain(len.min(self.snapshots.len())..) {
            self.current_memory -= dropped.estimated_size();
        }
    }

    /// Get a snapshot by index
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
