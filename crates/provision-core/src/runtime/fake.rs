//! In-memory [`System`] for tests

use super::system::{CommandOutput, System};
use crate::error::{ProvisionError, Result};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// A recorded call to [`System::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Fake search path plus scripted process results.
///
/// Programs are "on PATH" once registered with [`FakeSystem::with_program`].
/// Each `run` pops the next scripted result for that program, or fails with
/// an execution error if none is left.
#[derive(Debug, Default)]
pub struct FakeSystem {
    programs: HashMap<String, PathBuf>,
    responses: Mutex<HashMap<PathBuf, VecDeque<Result<CommandOutput>>>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, name: &str) -> Self {
        self.programs
            .insert(name.to_string(), PathBuf::from(format!("/fake/bin/{}", name)));
        self
    }

    /// Script the next result of running `name`
    pub fn respond(self, name: &str, result: Result<CommandOutput>) -> Self {
        let path = PathBuf::from(format!("/fake/bin/{}", name));
        self.responses
            .lock()
            .unwrap()
            .entry(path)
            .or_default()
            .push_back(result);
        self
    }

    pub fn respond_ok(self, name: &str, stdout: &str) -> Self {
        self.respond(
            name,
            Ok(CommandOutput {
                success: true,
                code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
        )
    }

    pub fn respond_exit(self, name: &str, code: i32, stderr: &str) -> Self {
        self.respond(
            name,
            Ok(CommandOutput {
                success: false,
                code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
        )
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Number of times `name` was run
    pub fn runs_of(&self, name: &str) -> usize {
        let path = PathBuf::from(format!("/fake/bin/{}", name));
        self.invocations()
            .iter()
            .filter(|inv| inv.program == path)
            .count()
    }
}

impl System for FakeSystem {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        self.programs.get(program).cloned()
    }

    async fn run(&self, program: &Path, args: &[String], _limit: Duration) -> Result<CommandOutput> {
        self.invocations.lock().unwrap().push(Invocation {
            program: program.to_path_buf(),
            args: args.to_vec(),
        });

        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(program)
            .and_then(VecDeque::pop_front);

        next.unwrap_or_else(|| {
            Err(ProvisionError::Execution {
                command: program.display().to_string(),
                message: "no scripted response".to_string(),
            })
        })
    }
}
