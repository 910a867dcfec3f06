//! Process execution seam. Every child process the bootstrap spawns goes
//! through a [`CommandRunner`], so sequencing can be tested without Python.

use std::io;
use std::process::{Command, Output, Stdio};

/// Exit status plus whatever was captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout followed by stderr, trimmed; what diagnostics print.
    pub fn combined(&self) -> String {
        let out = self.stdout.trim_end();
        let err = self.stderr.trim_end();
        match (out.is_empty(), err.is_empty()) {
            (true, _) => err.to_string(),
            (false, true) => out.to_string(),
            (false, false) => format!("{}\n{}", out, err),
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(out: Output) -> Self {
        Self {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        }
    }
}

pub trait CommandRunner {
    /// Run to completion with stdout/stderr captured and stdin closed.
    fn capture(&mut self, cmd: &mut Command) -> io::Result<CommandOutput>;

    /// Run to completion with all three streams inherited from this process.
    /// Captured fields of the result are empty.
    fn run_inherited(&mut self, cmd: &mut Command) -> io::Result<CommandOutput>;
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn capture(&mut self, cmd: &mut Command) -> io::Result<CommandOutput> {
        cmd.stdin(Stdio::null())
            .output()
            .map(CommandOutput::from)
    }

    fn run_inherited(&mut self, cmd: &mut Command) -> io::Result<CommandOutput> {
        let status = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        Ok(CommandOutput {
            code: status.code(),
            ..Default::default()
        })
    }
}

/// Scripted runner for tests (also used by `pipstrap-pack` via the `test-util` feature).
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use super::*;
    use std::path::PathBuf;

    /// Snapshot of a `Command` at the moment it was run.
    #[derive(Debug, Clone)]
    pub struct Invocation {
        pub program: String,
        pub args: Vec<String>,
        /// Explicit env changes; `None` value means removed.
        pub envs: Vec<(String, Option<String>)>,
        pub cwd: Option<PathBuf>,
        pub inherited: bool,
    }

    impl Invocation {
        fn snapshot(cmd: &Command, inherited: bool) -> Self {
            Self {
                program: cmd.get_program().to_string_lossy().into_owned(),
                args: cmd
                    .get_args()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect(),
                envs: cmd
                    .get_envs()
                    .map(|(k, v)| {
                        (
                            k.to_string_lossy().into_owned(),
                            v.map(|v| v.to_string_lossy().into_owned()),
                        )
                    })
                    .collect(),
                cwd: cmd.get_current_dir().map(PathBuf::from),
                inherited,
            }
        }

        pub fn has_arg(&self, arg: &str) -> bool {
            self.args.iter().any(|a| a == arg)
        }

        pub fn env(&self, key: &str) -> Option<&str> {
            self.envs
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.as_deref())
        }

        pub fn command_line(&self) -> String {
            std::iter::once(self.program.as_str())
                .chain(self.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ")
        }
    }

    type Matcher = Box<dyn Fn(&Invocation) -> bool>;
    type Responder = Box<dyn FnMut(&Invocation) -> io::Result<CommandOutput>>;

    /// Runs nothing. The first matching rule answers; unmatched commands succeed
    /// with empty output.
    #[derive(Default)]
    pub struct ScriptedRunner {
        pub calls: Vec<Invocation>,
        rules: Vec<(Matcher, Responder)>,
    }

    impl ScriptedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(
            self,
            matcher: impl Fn(&Invocation) -> bool + 'static,
            output: CommandOutput,
        ) -> Self {
            self.on_run(matcher, move |_| Ok(output.clone()))
        }

        pub fn on_run(
            mut self,
            matcher: impl Fn(&Invocation) -> bool + 'static,
            responder: impl FnMut(&Invocation) -> io::Result<CommandOutput> + 'static,
        ) -> Self {
            self.rules.push((Box::new(matcher), Box::new(responder)));
            self
        }

        pub fn called(&self, pred: impl Fn(&Invocation) -> bool) -> bool {
            self.calls.iter().any(pred)
        }

        fn dispatch(&mut self, inv: Invocation) -> io::Result<CommandOutput> {
            let result = match self.rules.iter_mut().find(|(m, _)| m(&inv)) {
                Some((_, respond)) => respond(&inv),
                None => Ok(CommandOutput::ok("")),
            };
            self.calls.push(inv);
            result
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn capture(&mut self, cmd: &mut Command) -> io::Result<CommandOutput> {
            self.dispatch(Invocation::snapshot(cmd, false))
        }

        fn run_inherited(&mut self, cmd: &mut Command) -> io::Result<CommandOutput> {
            self.dispatch(Invocation::snapshot(cmd, true))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedRunner;
    use super::*;

    #[test]
    fn test_combined_output() {
        let out = CommandOutput {
            code: Some(1),
            stdout: "Collecting numpy\n".into(),
            stderr: "ERROR: no matching distribution\n".into(),
        };
        assert_eq!(
            out.combined(),
            "Collecting numpy\nERROR: no matching distribution"
        );
        assert!(!out.success());
        assert_eq!(CommandOutput::failed(2, "boom").combined(), "boom");
    }

    #[test]
    fn test_scripted_runner_first_rule_wins() {
        let mut runner = ScriptedRunner::new()
            .on(|inv| inv.has_arg("--version"), CommandOutput::ok("Python 3.11.4"))
            .on(|_| true, CommandOutput::failed(1, "nope"));

        let v = runner
            .capture(Command::new("python3").arg("--version"))
            .unwrap();
        assert_eq!(v.stdout, "Python 3.11.4");
        let other = runner.capture(Command::new("python3").arg("-c")).unwrap();
        assert_eq!(other.code, Some(1));
        assert_eq!(runner.calls.len(), 2);
        assert_eq!(runner.calls[0].command_line(), "python3 --version");
    }
}
