use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fileexec::errors::FileExecError;
use fileexec::exec::{CapturedOutput, CommandRunner, RunFuture};

type Responder = Arc<dyn Fn(&str, Duration) -> CapturedOutput + Send + Sync>;

/// A fake runner that:
/// - records every command line it was asked to run, in call order
/// - answers from a per-command script, falling back to a default response
///   (successful, empty stdout) for anything unscripted.
#[derive(Clone)]
pub struct FakeRunner {
    responses: Arc<Mutex<HashMap<String, Responder>>>,
    fallback: Arc<Mutex<Responder>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRunner {
    pub fn new() -> Self {
        let fallback: Responder = Arc::new(|_: &str, _: Duration| CapturedOutput::success(Vec::new()));
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            fallback: Arc::new(Mutex::new(fallback)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer `command` with a successful run printing `stdout`.
    pub fn with_stdout(self, command: &str, stdout: &str) -> Self {
        let stdout = stdout.as_bytes().to_vec();
        self.with_response(command, move |_, _| CapturedOutput::success(stdout.clone()))
    }

    /// Answer `command` with a timeout after printing `stdout`.
    pub fn with_timeout(self, command: &str, stdout: &str) -> Self {
        let stdout = stdout.as_bytes().to_vec();
        self.with_response(command, move |cmd, timeout| CapturedOutput {
            stdout: stdout.clone(),
            stderr: Vec::new(),
            error: Some(FileExecError::ProcessTimeout {
                command: cmd.to_string(),
                timeout,
                stderr: String::new(),
            }),
        })
    }

    /// Answer `command` with a non-zero exit after printing `stdout`.
    pub fn with_exit(self, command: &str, code: i32, stdout: &str, stderr: &str) -> Self {
        let stdout = stdout.as_bytes().to_vec();
        let stderr = stderr.to_string();
        self.with_response(command, move |cmd, _| CapturedOutput {
            stdout: stdout.clone(),
            stderr: stderr.as_bytes().to_vec(),
            error: Some(FileExecError::ProcessExit {
                command: cmd.to_string(),
                code: Some(code),
                status: format!("exit status: {code}"),
                stderr: stderr.clone(),
            }),
        })
    }

    pub fn with_response<F>(self, command: &str, respond: F) -> Self
    where
        F: Fn(&str, Duration) -> CapturedOutput + Send + Sync + 'static,
    {
        self.responses
            .lock()
            .unwrap()
            .insert(command.to_string(), Arc::new(respond));
        self
    }

    /// Response for every command without its own script.
    pub fn with_fallback<F>(self, respond: F) -> Self
    where
        F: Fn(&str, Duration) -> CapturedOutput + Send + Sync + 'static,
    {
        *self.fallback.lock().unwrap() = Arc::new(respond);
        self
    }

    /// Commands run so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Commands run so far, sorted. Commands of one dispatch run concurrently,
    /// so their call order is not deterministic.
    pub fn sorted_calls(&self) -> Vec<String> {
        let mut calls = self.calls();
        calls.sort();
        calls
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl CommandRunner for FakeRunner {
    fn run<'a>(&'a self, command: &'a str, timeout: Duration) -> RunFuture<'a> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(command.to_string());
            let respond = self
                .responses
                .lock()
                .unwrap()
                .get(command)
                .cloned()
                .unwrap_or_else(|| Arc::clone(&self.fallback.lock().unwrap()));
            tokio::task::yield_now().await;
            respond(command, timeout)
        })
    }
}
