//! Simulation session
//!
//! [`Simulation`] ties one [`Memory`], one [`CallingConvention`] and one [`CallStack`]
//! together and records a [`Snapshot`] after every successful step, so the whole run can
//! be replayed backward and forward.
//!
//! Each step (`call`, `ret`, `write_buffer`) either completes or fails without touching
//! the session. Stepping through history restores a snapshot into the live state; a new
//! step taken from an earlier position discards the snapshots after it.

use crate::abi::CallingConvention;
use crate::memory::stack::{CallStack, FrameDecl, ReturnOutcome, StackFrame};
use crate::memory::Memory;
use crate::simulator::config::SimConfig;
use crate::simulator::constants::{DEFAULT_SNAPSHOT_LIMIT, ENTRY_POINT};
use crate::simulator::errors::SimError;
use crate::simulator::overflow::{OverflowEngine, OverflowReport};
use crate::snapshot::{Snapshot, SnapshotManager, TraceLog};

/// One stack simulation
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    convention: CallingConvention,
    memory: Memory,
    stack: CallStack,
    trace: TraceLog,
    last_report: Option<OverflowReport>,
    last_return: Option<ReturnOutcome>,
    history: SnapshotManager,
    history_position: usize,
}

impl Simulation {
    /// Create a session with the default snapshot limit
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        Self::with_snapshot_limit(config, DEFAULT_SNAPSHOT_LIMIT)
    }

    pub fn with_snapshot_limit(config: SimConfig, snapshot_limit: usize) -> Result<Self, SimError> {
        config.validate()?;
        let convention = config.calling_convention()?;
        let memory = config.memory()?;
        let stack = CallStack::new(&memory, ENTRY_POINT);

        let mut sim = Simulation {
            config,
            convention,
            memory,
            stack,
            trace: TraceLog::new(),
            last_report: None,
            last_return: None,
            history: SnapshotManager::new(snapshot_limit),
            history_position: 0,
        };
        let label = format!(
            "start: {:?}, {}-byte words, {:?}, {} bytes, return value in {:?}",
            sim.config.convention,
            sim.config.word_size,
            sim.config.growth,
            sim.config.capacity,
            sim.convention.return_location()
        );
        sim.commit(label);
        Ok(sim)
    }

    /// Call a function: push its frame on top of the stack
    pub fn call(&mut self, decl: &FrameDecl) -> Result<&StackFrame, SimError> {
        let frame = self
            .stack
            .call(&mut self.memory, &self.convention, decl)?
            .clone();

        self.last_report = None;
        self.last_return = None;
        self.commit(format!(
            "call {}() → frame #{} fp=0x{:08x} sp=0x{:08x}, returns to 0x{:08x}",
            frame.function,
            frame.id,
            frame.frame_pointer,
            frame.stack_pointer,
            frame.return_address
        ));
        self.current_frame()
    }

    /// Return from the topmost frame, loading whatever its saved slots now contain
    pub fn ret(&mut self) -> Result<ReturnOutcome, SimError> {
        let outcome = self.stack.ret(&self.memory)?;

        let mut line = format!(
            "ret from {}() → ip=0x{:08x} fp=0x{:08x}",
            outcome.frame.function, outcome.return_address, outcome.caller_frame_pointer
        );
        if outcome.is_hijacked() {
            line.push_str(&format!(
                " (HIJACKED, expected 0x{:08x})",
                outcome.frame.return_address
            ));
        }

        self.last_report = None;
        self.last_return = Some(outcome.clone());
        self.commit(line);
        Ok(outcome)
    }

    /// Write `payload` into a local of the topmost frame
    pub fn write_buffer(&mut self, buffer: &str, payload: &[u8]) -> Result<OverflowReport, SimError> {
        let id = self.stack.current_frame()?.id;
        self.write_buffer_in(id, buffer, payload)
    }

    /// Write `payload` into a local of any live frame
    pub fn write_buffer_in(
        &mut self,
        frame_id: usize,
        buffer: &str,
        payload: &[u8],
    ) -> Result<OverflowReport, SimError> {
        let frame = self
            .stack
            .frame(frame_id)
            .cloned()
            .ok_or(SimError::EmptyStack)?;
        let report = OverflowEngine::new(&mut self.memory).write_buffer(&frame, buffer, payload)?;

        let fields: Vec<String> = report
            .summary()
            .iter()
            .map(|(field, len)| format!("{}({})", field, len))
            .collect();
        let mut line = format!(
            "write {} bytes into {}.{}: {}",
            report.bytes_written,
            frame.function,
            buffer,
            fields.join(" ")
        );
        if let Some(address) = report.hijacked_return_address {
            line.push_str(&format!(" → return address now 0x{:08x}", address));
        }

        self.last_report = Some(report.clone());
        self.last_return = None;
        self.commit(line);
        Ok(report)
    }

    /// Get the current (top) frame
    pub fn current_frame(&self) -> Result<&StackFrame, SimError> {
        self.stack.current_frame()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn convention(&self) -> &CallingConvention {
        &self.convention
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    pub fn last_report(&self) -> Option<&OverflowReport> {
        self.last_report.as_ref()
    }

    pub fn last_return(&self) -> Option<&ReturnOutcome> {
        self.last_return.as_ref()
    }

    /// Index of the snapshot currently shown
    pub fn history_position(&self) -> usize {
        self.history_position
    }

    pub fn total_snapshots(&self) -> usize {
        self.history.len()
    }

    pub fn snapshot(&self, index: usize) -> Option<&Snapshot> {
        self.history.get(index)
    }

    /// Label of the snapshot currently shown
    pub fn current_label(&self) -> &str {
        self.history
            .get(self.history_position)
            .map_or("live state, history full", |s| s.label.as_str())
    }

    pub fn step_forward(&mut self) -> Result<(), String> {
        if self.history_position + 1 >= self.history.len() {
            return Err("Already at the last step".to_string());
        }
        self.restore(self.history_position + 1)
    }

    pub fn step_backward(&mut self) -> Result<(), String> {
        if self.history_position == 0 {
            return Err("Already at the first step".to_string());
        }
        self.restore(self.history_position - 1)
    }

    pub fn rewind_to_start(&mut self) -> Result<(), String> {
        self.restore(0)
    }

    pub fn jump_to_end(&mut self) -> Result<(), String> {
        self.restore(self.history.len().saturating_sub(1))
    }

    fn restore(&mut self, index: usize) -> Result<(), String> {
        let snapshot = self
            .history
            .get(index)
            .ok_or_else(|| format!("No snapshot at step {}", index))?;
        self.memory = snapshot.memory.clone();
        self.stack = snapshot.stack.clone();
        self.trace = snapshot.trace.clone();
        self.last_report = snapshot.last_report.clone();
        self.last_return = snapshot.last_return.clone();
        self.history_position = index;
        Ok(())
    }

    /// Log the step and record a snapshot of the new state
    fn commit(&mut self, label: String) {
        if !self.history.is_empty() {
            self.history.truncate(self.history_position + 1);
        }
        let step = self.history.len();
        self.trace.record(step, label.clone());

        let snapshot = Snapshot {
            label,
            memory: self.memory.clone(),
            stack: self.stack.clone(),
            trace: self.trace.clone(),
            last_report: self.last_report.clone(),
            last_return: self.last_return.clone(),
        };
        match self.history.push(snapshot) {
            Ok(()) => self.history_position = self.history.len() - 1,
            Err(message) => {
                // Live state is one past the last recorded snapshot
                self.history_position = self.history.len();
                self.trace.record(step, format!("history not recorded: {}", message));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::stack::FieldKind;

    fn classic() -> FrameDecl {
        FrameDecl::new("function")
            .local("buffer1", 5)
            .local("buffer2", 10)
    }

    #[test]
    fn test_session_records_history() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        sim.call(&FrameDecl::new("main").local("x", 4)).unwrap();
        sim.call(&classic()).unwrap();
        sim.write_buffer("buffer1", &[0x41; 26]).unwrap();
        sim.ret().unwrap();

        assert_eq!(sim.total_snapshots(), 5);
        assert_eq!(sim.history_position(), 4);
        assert_eq!(sim.trace().lines.len(), 5);
        assert!(sim.trace().get_output()[0].ends_with("return value in Register"));
        assert!(sim.trace().get_output()[3].starts_with("write 26 bytes into function.buffer1"));
    }

    #[test]
    fn test_step_backward_restores_state() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        sim.call(&classic()).unwrap();
        let before = sim.memory().clone();
        sim.write_buffer("buffer1", &[0x41; 8]).unwrap();

        sim.step_backward().unwrap();
        assert_eq!(sim.memory(), &before);
        assert!(sim.last_report().is_none());

        sim.step_forward().unwrap();
        let report = sim.last_report().unwrap();
        assert!(report.touched(&FieldKind::Local("buffer1".into())).is_some());
        assert!(sim.step_forward().is_err());
    }

    #[test]
    fn test_new_step_discards_future() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        sim.call(&classic()).unwrap();
        sim.ret().unwrap();
        sim.rewind_to_start().unwrap();
        assert!(sim.stack().is_empty());

        sim.call(&FrameDecl::new("other")).unwrap();
        assert_eq!(sim.total_snapshots(), 2);
        assert_eq!(sim.current_frame().unwrap().function, "other");
    }

    #[test]
    fn test_failed_step_changes_nothing() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        sim.call(&classic()).unwrap();
        let memory = sim.memory().clone();

        assert!(matches!(
            sim.write_buffer("nope", b"AAAA"),
            Err(SimError::UnknownBuffer { .. })
        ));
        assert_eq!(sim.memory(), &memory);
        assert_eq!(sim.total_snapshots(), 2);
    }

    #[test]
    fn test_snapshot_limit_keeps_running() {
        let mut sim = Simulation::with_snapshot_limit(SimConfig::default(), 400).unwrap();
        sim.call(&classic()).unwrap();
        assert_eq!(sim.total_snapshots(), 1);
        assert_eq!(sim.stack().depth(), 1);
        assert!(sim.trace().get_output()[2].starts_with("history not recorded"));
        assert_eq!(sim.history_position(), 1);
        assert_eq!(sim.current_label(), "live state, history full");

        // One step back lands on the last recorded state, not before it
        sim.step_backward().unwrap();
        assert_eq!(sim.history_position(), 0);
        assert!(sim.stack().is_empty());
        assert!(sim.step_forward().is_err());
    }

    #[test]
    fn test_unrecorded_steps_keep_position_past_history() {
        let mut sim = Simulation::with_snapshot_limit(SimConfig::default(), 400).unwrap();
        sim.call(&FrameDecl::new("f").local("x", 4)).unwrap();
        sim.write_buffer("x", b"AAAA").unwrap();
        sim.ret().unwrap();

        assert_eq!(sim.total_snapshots(), 1);
        assert_eq!(sim.history_position(), 1);
        sim.step_backward().unwrap();
        assert_eq!(sim.history_position(), 0);
    }
}
