//! Blocking subprocess execution with a hard deadline.

use super::error::EngineError;
use regex::Regex;
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

static ERROR_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"failed|timelimit|error|no such file|not found").expect("valid error-token regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// First line of either stream that carries an error token.
    pub fn error_line(&self) -> Option<&str> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .find(|line| ERROR_TOKEN.is_match(line))
    }

    /// Text saved for intermediate logs.
    pub fn transcript(&self) -> String {
        format!(
            "STDOUT ---------\n{}\nSTDERR ---------\n{}",
            self.stdout, self.stderr
        )
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

/// Runs `program` to completion or until `timeout` elapses, in which case the
/// child is killed. Exit status is returned alongside the captured output and
/// not interpreted.
pub fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<(ExitStatus, ProcessOutput), EngineError> {
    trace!(program, ?args, ?timeout, "Spawning process.");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| EngineError::execution(program, format!("could not start: {e}")))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            warn!(program, ?timeout, "Process exceeded its time budget, killing it.");
            let _ = child.kill();
            let _ = child.wait();
            return Err(EngineError::Timeout {
                engine: program.to_string(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    let output = ProcessOutput {
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    };
    debug!(program, code = ?status.code(), "Process finished.");
    Ok((status, output))
}

/// Like [`run_command`], but a non-zero exit or an error token in the output
/// is an execution failure.
pub fn run_checked(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<ProcessOutput, EngineError> {
    let (status, output) = run_command(program, args, timeout)?;
    if !status.success() {
        let code = status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        return Err(EngineError::execution(
            program,
            format!("return code from {program} is {code}"),
        ));
    }
    if let Some(line) = output.error_line() {
        return Err(EngineError::execution(
            program,
            format!("an error flag was detected in the output: {}", line.trim()),
        ));
    }
    Ok(output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_output_of_successful_command() {
        let output = run_checked("sh", &["-c", "echo CCO"], Duration::from_secs(5)).unwrap();
        assert_eq!(output.stdout.trim(), "CCO");
    }

    #[test]
    fn non_zero_exit_is_an_execution_failure() {
        let err = run_checked("sh", &["-c", "exit 3"], Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, EngineError::Execution { ref reason, .. } if reason.contains('3')));
    }

    #[test]
    fn error_token_in_stderr_is_an_execution_failure() {
        let err = run_checked(
            "sh",
            &["-c", "echo '0 molecules converted' ; echo 'file not found' 1>&2"],
            Duration::from_secs(5),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Execution { .. }));
    }

    #[test]
    fn slow_command_times_out() {
        let started = Instant::now();
        let err = run_command("sh", &["-c", "sleep 5"], Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_program_is_an_execution_failure() {
        let err = run_command("ligprep-no-such-binary", &[], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, EngineError::Execution { .. }));
    }
}
