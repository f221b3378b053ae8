//! Scenario files
//!
//! A scenario is a TOML document holding a [`SimConfig`] and an ordered list of steps that
//! are replayed against a fresh [`Simulation`]:
//!
//! ```toml
//! [config]
//! convention = "stack-only"
//! word_size = 4
//! growth = "toward-low"
//! capacity = 256
//!
//! [[step]]
//! op = "call"
//! function = "function"
//! locals = [{ name = "buffer1", size = 5 }, { name = "buffer2", size = 10 }]
//! params = [{ name = "a", size = 4, value = 1 }]
//!
//! [[step]]
//! op = "write"
//! buffer = "buffer1"
//! payload = { fill = 0x41, count = 26 }
//!
//! [[step]]
//! op = "ret"
//! ```

pub mod payload;

use crate::memory::stack::{FrameDecl, ReturnOutcome};
use crate::simulator::{OverflowReport, SimConfig, SimError, Simulation};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use payload::Payload;

/// The classic `function(1, 2, 3)` example with `buffer1[5]` and `buffer2[10]`
pub const CLASSIC: &str = include_str!("../../scenarios/classic.toml");

/// Scenario loading and replay errors
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenario file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid scenario TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid payload in step {step}: {reason}")]
    InvalidPayload { step: usize, reason: String },

    #[error("Step {step} ({op}) failed: {source}")]
    Step {
        step: usize,
        op: &'static str,
        #[source]
        source: SimError,
    },

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// One scripted action
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Step {
    Call(FrameDecl),
    Write {
        buffer: String,
        /// Call id of the target frame; the topmost frame when absent
        #[serde(default)]
        frame: Option<usize>,
        payload: Payload,
    },
    Ret,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Call(_) => "call",
            Step::Write { .. } => "write",
            Step::Ret => "ret",
        }
    }
}

/// What a replayed step produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Called { function: String, id: usize },
    Wrote(OverflowReport),
    Returned(ReturnOutcome),
}

/// Configuration plus steps
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub config: SimConfig,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_toml(source: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&source)
    }

    pub fn classic() -> Result<Self, ScenarioError> {
        Self::from_toml(CLASSIC)
    }

    /// Create a session from the config and replay every step
    pub fn simulate(&self) -> Result<(Simulation, Vec<StepOutcome>), ScenarioError> {
        let mut sim = Simulation::new(self.config)?;
        let outcomes = self.run(&mut sim)?;
        Ok((sim, outcomes))
    }

    /// Replay the steps against `sim`, stopping at the first failure
    pub fn run(&self, sim: &mut Simulation) -> Result<Vec<StepOutcome>, ScenarioError> {
        let mut outcomes = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let wrap = |source: SimError| ScenarioError::Step {
                step: index + 1,
                op: step.name(),
                source,
            };
            let outcome = match step {
                Step::Call(decl) => {
                    let frame = sim.call(decl).map_err(wrap)?;
                    StepOutcome::Called {
                        function: frame.function.clone(),
                        id: frame.id,
                    }
                }
                Step::Write {
                    buffer,
                    frame,
                    payload,
                } => {
                    let bytes = payload
                        .to_bytes(sim.config().word_size, sim.config().byte_order)
                        .map_err(|reason| ScenarioError::InvalidPayload {
                            step: index + 1,
                            reason,
                        })?;
                    let report = match frame {
                        Some(id) => sim.write_buffer_in(*id, buffer, &bytes),
                        None => sim.write_buffer(buffer, &bytes),
                    }
                    .map_err(wrap)?;
                    StepOutcome::Wrote(report)
                }
                Step::Ret => StepOutcome::Returned(sim.ret().map_err(wrap)?),
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        let scenario = Scenario::from_toml(
            r#"
            [config]
            capacity = 128

            [[step]]
            op = "call"
            function = "f"
            locals = [{ name = "buf", size = 8 }]

            [[step]]
            op = "write"
            buffer = "buf"
            payload = { text = "hi" }

            [[step]]
            op = "ret"
            "#,
        )
        .unwrap();

        assert_eq!(scenario.config.capacity, 128);
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(
            scenario.steps[0],
            Step::Call(FrameDecl::new("f").local("buf", 8))
        );
        assert!(matches!(&scenario.steps[1], Step::Write { buffer, frame: None, .. } if buffer == "buf"));
        assert_eq!(scenario.steps[2], Step::Ret);
    }

    #[test]
    fn test_unknown_op_rejected() {
        let err = Scenario::from_toml("[[step]]\nop = \"jump\"\n").unwrap_err();
        assert!(matches!(err, ScenarioError::Toml(_)));
    }

    #[test]
    fn test_failing_step_is_numbered() {
        let scenario = Scenario::from_toml("[[step]]\nop = \"ret\"\n").unwrap();
        let err = scenario.simulate().unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::Step { step: 1, op: "ret", source: SimError::EmptyStack }
        ));
    }

    #[test]
    fn test_classic_parses() {
        let scenario = Scenario::classic().unwrap();
        assert!(!scenario.steps.is_empty());
    }
}
