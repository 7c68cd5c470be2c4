//! LLM Subprocess: runs a local CLI as the topic generator.
//!
//! The configured command receives the prompt as its last argument and must
//! print the model answer on stdout within `timeout_secs`; a stuck process is
//! killed. Retry logic: 1 retry on failure, none after a timeout.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::generator::TopicGenerator;
use crate::config::GeneratorConfig;
use crate::{TopicsError, TopicsResult};

/// Maximum retries.
const MAX_RETRIES: u32 = 1;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(cfg: &GeneratorConfig) -> Self {
        let mut parts = cfg.command.iter().cloned();
        let program = parts.next().unwrap_or_default();
        Self::new(program, parts.collect(), Duration::from_secs(cfg.timeout_secs))
    }

    fn execute(&self, prompt: &str) -> TopicsResult<String> {
        if self.program.is_empty() {
            return Err(TopicsError::Config("Generator command is empty".into()));
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TopicsError::Provider(format!("Failed to spawn `{}`: {}", self.program, e))
            })?;

        // Drained on threads: the child must never block on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait_with_deadline(&mut child)?;
        let stdout = join_output(stdout);
        let stderr = join_output(stderr);

        if !status.success() {
            return Err(TopicsError::Provider(format!(
                "`{}` failed (exit {}): {}",
                self.program, status, stderr
            )));
        }
        if stdout.trim().is_empty() {
            return Err(TopicsError::Provider(format!("`{}` returned empty response", self.program)));
        }
        Ok(stdout)
    }

    fn wait_with_deadline(&self, child: &mut Child) -> TopicsResult<std::process::ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let polled = child
                .try_wait()
                .map_err(|e| TopicsError::Provider(format!("Subprocess wait failed: {}", e)))?;
            if let Some(status) = polled {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    tracing::warn!(program = %self.program, error = %e, "Failed to kill timed-out subprocess");
                }
                let _ = child.wait();
                return Err(TopicsError::Timeout { after: self.timeout });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_output(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

impl TopicGenerator for CommandGenerator {
    fn generate(&self, prompt: &str) -> TopicsResult<String> {
        tracing::info!(program = %self.program, prompt_len = prompt.len(), "LLM subprocess call starting");
        let mut last_err = None;

        for attempt in 0..=MAX_RETRIES {
            match self.execute(prompt) {
                Ok(response) => return Ok(response),
                Err(e @ TopicsError::Timeout { .. }) => {
                    tracing::warn!(program = %self.program, error = %e, "LLM subprocess timed out");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        "LLM subprocess attempt {}/{} failed: {}",
                        attempt + 1,
                        MAX_RETRIES + 1,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }

        tracing::error!(program = %self.program, "LLM subprocess: all retries exhausted");
        Err(last_err.unwrap_or_else(|| TopicsError::Provider("All retries failed".into())))
    }
}
