//! Sequential conversation runner
//!
//! Sends the scripted prompts to a [`ResponseSource`] one at a time, sleeps
//! a fixed delay after every call, and measures each reply as it arrives.
//! A failed call never aborts the session: the reply is replaced by an
//! error-marker string that downstream metrics skip.

use std::thread;
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::cycles::CycleDetector;
use crate::metrics::MetricCalculator;
use crate::session::Session;
use crate::{Error, Result};

/// Anything that can answer a prompt for a model.
///
/// Vendor HTTP clients implement this outside the crate; [`ScriptedSource`]
/// replays canned replies.
pub trait ResponseSource {
    /// Produce a reply to `prompt` given the model's earlier replies.
    ///
    /// # Errors
    ///
    /// Returns an error when no reply could be obtained (network failure,
    /// rate limit, missing credentials).
    fn respond(&mut self, model: &str, prompt: &str, history: &[String]) -> Result<String>;
}

/// Replays a fixed script of replies and failures.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: Vec<std::result::Result<String, String>>,
    cursor: usize,
    repeat: bool,
}

impl ScriptedSource {
    /// Replay `replies` once, then fail.
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: replies.into_iter().map(|r| Ok(r.into())).collect(),
            cursor: 0,
            repeat: false,
        }
    }

    /// Start over from the first entry once the script is exhausted.
    #[must_use]
    pub const fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Append a failure with the given message.
    #[must_use]
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.script.push(Err(message.into()));
        self
    }

    /// Append a reply.
    #[must_use]
    pub fn then_reply(mut self, reply: impl Into<String>) -> Self {
        self.script.push(Ok(reply.into()));
        self
    }
}

impl ResponseSource for ScriptedSource {
    fn respond(&mut self, model: &str, _prompt: &str, _history: &[String]) -> Result<String> {
        if self.cursor >= self.script.len() && self.repeat && !self.script.is_empty() {
            self.cursor = 0;
        }
        let entry = self.script.get(self.cursor).cloned().ok_or_else(|| Error::ResponseSource {
            model: model.to_string(),
            message: "script exhausted".to_string(),
        })?;
        self.cursor += 1;
        entry.map_err(|message| Error::ResponseSource {
            model: model.to_string(),
            message,
        })
    }
}

/// Runs scripted conversations against a response source.
#[derive(Debug)]
pub struct ConversationRunner<'a, S> {
    config: &'a AnalysisConfig,
    calculator: MetricCalculator,
    detector: CycleDetector,
    source: S,
    delay: Duration,
}

impl<'a, S: ResponseSource> ConversationRunner<'a, S> {
    /// Create a runner; the post-call delay defaults to
    /// `config.rate_limit_delay_ms`.
    #[must_use]
    pub fn new(config: &'a AnalysisConfig, calculator: MetricCalculator, source: S) -> Self {
        Self {
            config,
            calculator,
            detector: CycleDetector::new(config),
            source,
            delay: Duration::from_millis(config.rate_limit_delay_ms),
        }
    }

    /// Override the fixed post-call delay.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Run one conversation.
    pub fn run_session(&mut self, model: &str, session_id: &str) -> Session {
        let prompts = self.config.conversation_prompts().to_vec();
        let mut responses: Vec<String> = Vec::with_capacity(prompts.len());
        let mut metrics = Vec::with_capacity(prompts.len());

        for (position, prompt) in prompts.iter().enumerate() {
            let response = match self.source.respond(model, prompt, &responses) {
                Ok(text) => text,
                Err(e) => {
                    warn!(model, session_id, position, error = %e, "response source failed");
                    format!("Error getting response: {e}")
                }
            };
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            metrics.push(self.calculator.measure(&response, position, &responses));
            responses.push(response);
        }

        let session = Session::builder(model, session_id)
            .timestamp(Local::now().naive_local())
            .prompts(prompts)
            .responses(responses)
            .metrics(metrics)
            .build();
        let session = self.detector.analyze(session);
        debug!(
            model,
            session_id,
            errors = session.error_count(self.config),
            has_cycles = session.cycles().is_some(),
            "session complete"
        );
        session
    }

    /// Run `count` sessions for `model`, numbered from 0.
    pub fn collect(&mut self, model: &str, count: usize) -> Vec<Session> {
        let sessions: Vec<Session> = (0..count)
            .map(|i| self.run_session(model, &i.to_string()))
            .collect();
        info!(model, sessions = sessions.len(), "collection finished");
        sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::StrategyKind;

    fn runner<S: ResponseSource>(config: &AnalysisConfig, source: S) -> ConversationRunner<'_, S> {
        let calculator =
            MetricCalculator::new(config, StrategyKind::Semantic.build(&config.error_markers));
        ConversationRunner::new(config, calculator, source).with_delay(Duration::ZERO)
    }

    fn short_config() -> AnalysisConfig {
        AnalysisConfig {
            conversation_length: 4,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_scripted_source_replays_then_fails() {
        let mut source = ScriptedSource::new(["one"]).then_fail("rate limited");
        assert_eq!(source.respond("m", "p", &[]).unwrap(), "one");
        let err = source.respond("m", "p", &[]).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
        assert!(source.respond("m", "p", &[]).is_err());
    }

    #[test]
    fn test_failed_call_becomes_error_marker() {
        let config = short_config();
        let source = ScriptedSource::new(["building ideas", "more building"])
            .then_fail("429 Too Many Requests")
            .then_reply("novel merging");
        let session = runner(&config, source).run_session("gpt-3.5-turbo", "0");

        assert_eq!(session.responses().len(), 4);
        assert!(session.responses()[2].starts_with("Error getting response:"));
        assert!(session.metrics()[2].coherence().abs() < f64::EPSILON);
        assert_eq!(session.error_count(&config), 1);
        assert!(session.cycles().is_some());
        assert!(session.statistics().is_some());
    }

    #[test]
    fn test_collect_numbers_sessions() {
        let config = short_config();
        let source = ScriptedSource::new(["a b", "c d"]).repeating();
        let sessions = runner(&config, source).collect("m", 3);
        let ids: Vec<&str> = sessions.iter().map(Session::session_id).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert!(sessions.iter().all(|s| s.prompts().len() == 4));
    }
}
