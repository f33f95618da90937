//! In-process completion backends and sleepers for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{CompletionBackend, LlmError, Sampling, Sleeper};

enum Mode {
    Scripted(Mutex<VecDeque<Result<String, LlmError>>>),
    FailingThen { failures: usize, reply: String },
    AlwaysFailing,
    Hanging,
}

/// Replays canned replies and records every prompt it receives.
pub struct ScriptedBackend {
    mode: Mode,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self::with_mode(Mode::Scripted(Mutex::new(replies.into())))
    }

    pub fn replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn failing_then(reply: impl Into<String>, failures: usize) -> Self {
        Self::with_mode(Mode::FailingThen {
            failures,
            reply: reply.into(),
        })
    }

    pub fn always_failing() -> Self {
        Self::with_mode(Mode::AlwaysFailing)
    }

    pub fn hanging() -> Self {
        Self::with_mode(Mode::Hanging)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

fn service_unavailable() -> LlmError {
    LlmError::Api {
        status: 503,
        message: "overloaded".to_string(),
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, prompt: &str, _sampling: Sampling) -> Result<String, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        match &self.mode {
            Mode::Scripted(replies) => replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(service_unavailable())),
            Mode::FailingThen { failures, reply } => {
                if call < *failures {
                    Err(service_unavailable())
                } else {
                    Ok(reply.clone())
                }
            }
            Mode::AlwaysFailing => Err(service_unavailable()),
            Mode::Hanging => std::future::pending().await,
        }
    }
}

/// Records requested delays instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}
