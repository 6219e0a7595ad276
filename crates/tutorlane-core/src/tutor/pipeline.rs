//! End-to-end turn processing.
//!
//! ```text
//! TurnQueue lane
//!   -> InputGate            (rejected: clarify fallback, no provider call)
//!   -> ResponseCache        (skipped while a question is pending)
//!   -> CircuitBreaker open? (fallback: quick tips)
//!   -> RetryHandler -> CircuitBreaker -> LlmProvider (timeout + cancellation)
//!   -> TutorPlan -> spoken utterance
//!   -> content guard -> commit (history, pending question, cache) -> telemetry
//! ```
//!
//! Session state is only mutated inside short synchronous sections that
//! first claim the lane ticket's commit point. A turn cancelled before that
//! claim is superseded and commits no history, pending question, cache entry
//! or telemetry; a turn cancelled after it still delivers its reply.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tutorlane_types::breaker::BreakerStatus;
use tutorlane_types::config::TutorConfig;
use tutorlane_types::gate::{GateReason, GatingMetrics};
use tutorlane_types::lesson::{LessonContext, Subject};
use tutorlane_types::llm::{CompletionRequest, CompletionResponse, LlmError, TutorPlan};
use tutorlane_types::telemetry::TelemetryEntry;
use tutorlane_types::turn::{Turn, TurnRequest, TurnResult};

use super::prompt::{PendingVerdict, TutorPromptBuilder};
use super::utterance::to_spoken;
use crate::answer::{check_answer, extract_question};
use crate::cache::{CacheStats, ResponseCache};
use crate::fallback::{FallbackReason, FallbackSelector};
use crate::gate::InputGate;
use crate::guard::{self, GuardContext, GuardOutcome};
use crate::lesson::LessonCatalog;
use crate::llm::{BoxLlmProvider, CircuitBreaker, RetryHandler, RetryOutcome, RetryPolicy};
use crate::session::{
    LaneTicket, QueueError, SessionHandle, SessionRegistry, SessionState, TurnQueue, lock_session,
};
use crate::telemetry::{TelemetryLogger, TelemetrySink};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("turn superseded by a newer turn")]
    Superseded,

    #[error("turn pipeline is shutting down")]
    ShuttingDown,
}

impl From<QueueError> for TurnError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Superseded => TurnError::Superseded,
            QueueError::Closed => TurnError::ShuttingDown,
        }
    }
}

/// Knobs the pipeline reads on every turn.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub allow_barge_in: bool,
    pub provider_timeout: Duration,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
    pub idle_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &TutorConfig) -> Self {
        Self {
            allow_barge_in: config.session.allow_barge_in,
            provider_timeout: Duration::from_millis(config.provider.timeout_ms),
            max_tokens: config.provider.max_tokens,
            temperature: Some(config.provider.temperature),
            idle_timeout: Duration::from_secs(config.session.idle_timeout_secs),
        }
    }
}

/// Combined observability snapshot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetrics {
    pub gating: GatingMetrics,
    pub cache: CacheStats,
    pub breaker: BreakerStatus,
    pub active_sessions: usize,
    pub active_lanes: usize,
    pub provider: Option<String>,
}

/// What one turn produced before it is turned into a [`TurnResult`].
#[derive(Debug, Default)]
struct Reply {
    content: String,
    subject: Subject,
    used_fallback: bool,
    used_cache: bool,
    breaker_open: bool,
    retry_count: u32,
    tokens_used: u32,
    banner: Option<String>,
    gate_reason: Option<GateReason>,
    error: Option<String>,
}

pub struct TurnPipeline {
    gate: InputGate,
    queue: TurnQueue,
    sessions: SessionRegistry,
    cache: ResponseCache,
    breaker: CircuitBreaker,
    retry: RetryHandler,
    fallback: FallbackSelector,
    telemetry: TelemetryLogger,
    provider: Option<BoxLlmProvider>,
    lessons: Arc<dyn LessonCatalog>,
    settings: PipelineSettings,
}

impl std::fmt::Debug for TurnPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnPipeline")
            .field("provider", &self.provider_name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl TurnPipeline {
    /// Build every component from configuration.
    ///
    /// `provider` is `None` when provider mode is disabled; every turn that
    /// reaches the provider step then takes the practice-mode fallback.
    pub fn new(
        config: &TutorConfig,
        provider: Option<BoxLlmProvider>,
        lessons: Arc<dyn LessonCatalog>,
    ) -> Self {
        Self {
            gate: InputGate::new(config.gating.thresholds()),
            queue: TurnQueue::new(),
            sessions: SessionRegistry::new(config.gating.recent_input_window),
            cache: ResponseCache::from_config(&config.cache),
            breaker: CircuitBreaker::new(&config.breaker),
            retry: RetryHandler::new(RetryPolicy::from_config(&config.retry)),
            fallback: FallbackSelector::new(),
            telemetry: TelemetryLogger::from_config(&config.telemetry),
            provider,
            lessons,
            settings: PipelineSettings::from_config(config),
        }
    }

    pub fn with_telemetry_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        let logger = std::mem::replace(&mut self.telemetry, TelemetryLogger::new(false, 1));
        self.telemetry = logger.with_sink(sink);
        self
    }

    pub fn gate(&self) -> &InputGate {
        &self.gate
    }

    pub fn queue(&self) -> &TurnQueue {
        &self.queue
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn telemetry(&self) -> &TelemetryLogger {
        &self.telemetry
    }

    pub fn lessons(&self) -> &dyn LessonCatalog {
        self.lessons.as_ref()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_ref().map(BoxLlmProvider::name)
    }

    /// Process one inbound turn in its session lane.
    pub async fn process_turn(&self, request: TurnRequest) -> Result<TurnResult, TurnError> {
        let session_id = request.session_id.clone();
        self.queue
            .enqueue(&session_id, self.settings.allow_barge_in, |ticket| {
                self.run_turn(request, ticket)
            })
            .await
            .map_err(|error| {
                tracing::debug!(session_id = %session_id, %error, "turn not delivered");
                TurnError::from(error)
            })
    }

    /// Cancel whatever the session is doing without submitting a new turn.
    pub fn cancel_session(&self, session_id: &str) -> usize {
        self.queue.cancel_session(session_id)
    }

    /// Evict sessions and lanes idle past the configured timeout.
    pub fn purge_idle(&self) -> (usize, usize) {
        let sessions = self.sessions.purge_idle(self.settings.idle_timeout);
        let lanes = self.queue.purge_idle(self.settings.idle_timeout);
        (sessions, lanes)
    }

    pub fn shutdown(&self) {
        self.queue.shutdown();
    }

    pub fn metrics(&self) -> PipelineMetrics {
        PipelineMetrics {
            gating: self.gate.metrics(),
            cache: self.cache.stats(),
            breaker: self.breaker.status(),
            active_sessions: self.sessions.len(),
            active_lanes: self.queue.active_lanes(),
            provider: self.provider_name().map(str::to_string),
        }
    }

    async fn run_turn(&self, request: TurnRequest, ticket: LaneTicket) -> TurnResult {
        let started = Instant::now();
        let turn = Turn::from_request(request);
        let session = self.sessions.get_or_create(&turn.session_id);
        let lesson = turn
            .lesson_id
            .as_deref()
            .and_then(|id| self.lessons.get_context(id));

        let reply = self.respond(turn.clone(), &session, lesson.as_ref(), &ticket).await;
        let Some(reply) = reply else {
            tracing::debug!(session_id = %turn.session_id, "turn superseded before commit");
            return TurnResult::default();
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            session_id = %turn.session_id,
            lesson_id = ?turn.lesson_id,
            used_fallback = reply.used_fallback,
            used_cache = reply.used_cache,
            retry_count = reply.retry_count,
            latency_ms,
            "turn completed"
        );
        self.telemetry.log_turn(TelemetryEntry {
            timestamp: turn.timestamp,
            session_id: turn.session_id.clone(),
            lesson_id: turn.lesson_id.clone(),
            subject: reply.subject,
            input: turn.raw_message.clone(),
            output: reply.content.clone(),
            used_fallback: reply.used_fallback,
            used_cache: reply.used_cache,
            retry_count: reply.retry_count,
            latency_ms,
            tokens_used: reply.tokens_used,
            speech_duration_ms: turn.speech_duration_ms,
            speech_confidence: turn.speech_confidence,
            gate_reason: reply.gate_reason.map(|r| r.as_str().to_string()),
            error: reply.error.clone(),
        });

        TurnResult {
            content: reply.content,
            used_fallback: reply.used_fallback,
            used_cache: reply.used_cache,
            breaker_open: reply.breaker_open,
            retry_count: reply.retry_count,
            tokens_used: reply.tokens_used,
            banner: reply.banner,
            queue_depth: ticket.queue_depth,
        }
    }

    /// Produce the reply for a turn, or `None` if it was superseded before
    /// its commit point. Cache and telemetry writes only follow a commit.
    async fn respond(
        &self,
        turn: Turn,
        session: &SessionHandle,
        lesson: Option<&LessonContext>,
        ticket: &LaneTicket,
    ) -> Option<Reply> {
        let cancel = &ticket.cancellation;
        let subject = lesson.map(|l| l.subject).unwrap_or_default();

        let decision = {
            let mut state = lock_session(session);
            state.touch();
            self.gate.validate(&turn, &mut state.recent_inputs)
        };
        if let Some(reason) = decision.reason {
            let mut reply = self.fallback_reply(session, subject, lesson, None, FallbackReason::Gated(reason), ticket)?;
            reply.gate_reason = Some(reason);
            return Some(reply);
        }
        let normalized = decision.normalized_input.unwrap_or_default();
        if normalized.is_empty() {
            // Speech was long and clear enough but produced no words.
            let reason = FallbackReason::Gated(GateReason::InsufficientInput);
            return self.fallback_reply(session, subject, lesson, None, reason, ticket);
        }
        let turn = turn.normalized(normalized);

        let pending = lock_session(session).pending_question().cloned();
        if pending.is_none() {
            if let Some(hit) = self.cache.get(turn.lesson_id.as_deref(), &turn.normalized_message) {
                tracing::debug!(session_id = %turn.session_id, "cache hit");
                let guarded = self.commit_response(session, lesson, &hit.content, ticket)?;
                return Some(Reply {
                    content: guarded.content,
                    subject,
                    used_cache: true,
                    ..Default::default()
                });
            }
        }

        if self.breaker.is_open() {
            let mut reply = self.fallback_reply(
                session,
                subject,
                lesson,
                Some(&turn.raw_message),
                FallbackReason::BreakerOpen,
                ticket,
            )?;
            reply.breaker_open = true;
            return Some(reply);
        }

        let Some(provider) = &self.provider else {
            return self.fallback_reply(
                session,
                subject,
                lesson,
                Some(&turn.raw_message),
                FallbackReason::ProviderOffline,
                ticket,
            );
        };

        let check = pending
            .as_ref()
            .map(|p| check_answer(&turn.raw_message, &p.expected_answer, p.question_type, &p.options));
        let verdict = pending
            .as_ref()
            .zip(check.as_ref())
            .map(|(question, check)| PendingVerdict { question, check });
        let recent: Vec<String> = lock_session(session)
            .recent_responses()
            .map(str::to_string)
            .collect();
        let request = CompletionRequest {
            system: TutorPromptBuilder::build(lesson, verdict, &recent),
            user_message: turn.raw_message.trim().to_string(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let outcome = self.call_provider(provider, &request, cancel).await;
        if outcome.was_cancelled() || cancel.is_cancelled() {
            return None;
        }

        let retry_count = outcome.retry_count;
        let spoken = outcome
            .result
            .as_ref()
            .map(|response| to_spoken(&TutorPlan::from_model_output(&response.content)))
            .filter(|spoken| !spoken.is_empty());

        let (Some(spoken), Some(response)) = (spoken, outcome.result.as_ref()) else {
            let error = outcome
                .error
                .clone()
                .unwrap_or_else(|| LlmError::Deserialization("empty model output".to_string()));
            let reason = match &error {
                LlmError::CircuitOpen => FallbackReason::BreakerOpen,
                e if e.is_permanent() => FallbackReason::ProviderOffline,
                _ => FallbackReason::RetriesExhausted,
            };
            tracing::warn!(session_id = %turn.session_id, %error, %reason, "provider path failed, using fallback");
            let mut reply =
                self.fallback_reply(session, subject, lesson, Some(&turn.raw_message), reason, ticket)?;
            reply.breaker_open = reason == FallbackReason::BreakerOpen;
            reply.retry_count = retry_count;
            reply.error = Some(error.to_string());
            return Some(reply);
        };

        let guarded = self.commit_response(session, lesson, &spoken, ticket)?;
        if pending.is_none() && guarded.kept_candidate() {
            self.cache.set(
                turn.lesson_id.as_deref(),
                &turn.normalized_message,
                guarded.content.clone(),
                subject,
            );
        }

        Some(Reply {
            content: guarded.content,
            subject,
            retry_count,
            tokens_used: response.usage.total(),
            ..Default::default()
        })
    }

    async fn call_provider(
        &self,
        provider: &BoxLlmProvider,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> RetryOutcome<CompletionResponse> {
        let timeout = self.settings.provider_timeout;
        self.retry
            .retry(cancel, |attempt| async move {
                tracing::debug!(attempt, provider = provider.name(), "calling provider");
                self.breaker
                    .execute(|| async {
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => Err(LlmError::Cancelled),
                            result = tokio::time::timeout(timeout, provider.complete(request)) => {
                                result.unwrap_or_else(|_| Err(LlmError::Timeout {
                                    after_ms: timeout.as_millis() as u64,
                                }))
                            }
                        }
                    })
                    .await
            })
            .await
    }

    /// Guard a candidate against the session's history.
    fn guard_locked(
        state: &mut SessionState,
        lesson: Option<&LessonContext>,
        candidate: &str,
    ) -> GuardOutcome {
        let recent: Vec<String> = state.recent_responses().map(str::to_string).collect();
        let mut cursor = state.repeat_cursor;
        let outcome = guard::apply(
            candidate,
            &mut GuardContext {
                lesson,
                recent_responses: &recent,
                repeat_cursor: &mut cursor,
            },
        );
        state.repeat_cursor = cursor;
        if outcome.blocked {
            tracing::info!("unsafe candidate replaced");
        }
        outcome
    }

    /// Guard and record a provider or cache response; sets the pending
    /// question from whatever the final text asks.
    fn commit_response(
        &self,
        session: &SessionHandle,
        lesson: Option<&LessonContext>,
        candidate: &str,
        ticket: &LaneTicket,
    ) -> Option<GuardOutcome> {
        let mut state = lock_session(session);
        if !ticket.try_commit() {
            return None;
        }
        let outcome = Self::guard_locked(&mut state, lesson, candidate);
        state.record_response(outcome.content.clone());
        state.set_pending_question(extract_question(&outcome.content));
        state.touch();
        Some(outcome)
    }

    /// Select, guard and record scripted content.
    fn fallback_reply(
        &self,
        session: &SessionHandle,
        subject: Subject,
        lesson: Option<&LessonContext>,
        user_input: Option<&str>,
        reason: FallbackReason,
        ticket: &LaneTicket,
    ) -> Option<Reply> {
        let mut state = lock_session(session);
        if !ticket.try_commit() {
            return None;
        }
        let picked = self
            .fallback
            .select(subject, user_input, Some(&mut *state), reason);
        let outcome = Self::guard_locked(&mut state, lesson, &picked.content);
        state.record_response(outcome.content.clone());
        state.touch();
        Some(Reply {
            content: outcome.content,
            subject,
            used_fallback: true,
            banner: Some(picked.banner),
            ..Default::default()
        })
    }
}
