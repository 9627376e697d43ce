//! The local worker: runs units on tokio tasks with real I/O.
//!
//! Each unit waits for a slot (bounded by the schedule-to-start timeout),
//! then runs on its own task under the unit's retry policy, with a
//! start-to-close timeout per attempt. Cancelling the worker's token aborts
//! every in-flight task and interrupts any retry sleep.

use agentflow_core::error::{Error, ProviderError, Result, ToolError};
use agentflow_core::provider::{ProviderRequest, ProviderResponse};
use agentflow_core::tool::{ToolCallRequest, ToolRegistry, ToolResult, ToolSet};
use agentflow_core::unit::{UnitExecutor, UnitId};
use agentflow_providers::ProviderRouter;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::invocation::ToolInvoker;
use crate::retry::{RetryFailure, RetryPolicy, run_with_retry};
use crate::settings::WorkflowSettings;

pub struct LocalWorker {
    providers: Arc<ProviderRouter>,
    tools: ToolInvoker,
    model_policy: RetryPolicy,
    quick_policy: RetryPolicy,
    model_timeout: Duration,
    quick_timeout: Duration,
    schedule_to_start: Duration,
    slots: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl LocalWorker {
    pub fn new(
        providers: Arc<ProviderRouter>,
        registry: Arc<ToolRegistry>,
        settings: &WorkflowSettings,
    ) -> Self {
        Self {
            providers,
            tools: ToolInvoker::new(
                registry,
                settings.retry.tool.clone(),
                settings.timeouts.tool_start_to_close,
            ),
            model_policy: settings.retry.model.clone(),
            quick_policy: settings.retry.quick.clone(),
            model_timeout: settings.timeouts.model_start_to_close,
            quick_timeout: settings.timeouts.quick_start_to_close,
            schedule_to_start: settings.timeouts.schedule_to_start,
            slots: Arc::new(Semaphore::new(settings.max_concurrent_units.max(1))),
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` instead of the worker's own token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Free worker slots right now.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait for a slot, then run `work` on its own task.
    async fn dispatch<T, F>(&self, unit: &UnitId, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let acquire = tokio::time::timeout(self.schedule_to_start, self.slots.clone().acquire_owned());
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            acquired = acquire => match acquired {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => {
                    return Err(Error::Unit {
                        unit: unit.to_string(),
                        reason: "worker is shut down".into(),
                    });
                }
                Err(_) => {
                    warn!(unit = %unit, "Unit was not scheduled in time");
                    return Err(Error::Unit {
                        unit: unit.to_string(),
                        reason: format!(
                            "not scheduled within {}s",
                            self.schedule_to_start.as_secs()
                        ),
                    });
                }
            },
        };

        debug!(unit = %unit, "Unit started");
        let mut handle = tokio::spawn(async move {
            let _permit = permit;
            work.await
        });

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                handle.abort();
                info!(unit = %unit, "Unit aborted by cancellation");
                Err(Error::Cancelled)
            }
            joined = &mut handle => joined.unwrap_or_else(|e| {
                Err(Error::Unit {
                    unit: unit.to_string(),
                    reason: format!("unit task failed: {e}"),
                })
            }),
        }
    }
}

#[async_trait]
impl UnitExecutor for LocalWorker {
    async fn greet(&self, unit: UnitId, request_text: &str) -> Result<String> {
        let policy = self.quick_policy.clone();
        let timeout = self.quick_timeout;
        let cancel = self.cancel.clone();
        let label = unit.to_string();
        let text = request_text.trim().to_string();

        self.dispatch(&unit, async move {
            run_with_retry(&policy, &cancel, &label, |_| {
                let text = text.clone();
                async move {
                    tokio::time::timeout(timeout, async move { Ok(format!("Hello, {text}!")) })
                        .await
                        .unwrap_or_else(|_| {
                            Err(Error::Unit {
                                unit: "greeting".into(),
                                reason: format!("no acknowledgment within {}s", timeout.as_secs()),
                            })
                        })
                }
            })
            .await
            .map_err(|failure| match failure {
                RetryFailure::Exhausted { error, .. } | RetryFailure::Fatal { error, .. } => error,
                RetryFailure::Cancelled { .. } => Error::Cancelled,
            })
        })
        .await
    }

    async fn call_model(&self, unit: UnitId, request: ProviderRequest) -> Result<ProviderResponse> {
        let providers = Arc::clone(&self.providers);
        let policy = self.model_policy.clone();
        let timeout = self.model_timeout;
        let cancel = self.cancel.clone();
        let label = unit.to_string();

        self.dispatch(&unit, async move {
            let result = run_with_retry(&policy, &cancel, &label, |attempt| {
                let providers = Arc::clone(&providers);
                let request = request.clone();
                async move {
                    let provider = providers.get(request.provider)?;
                    debug!(provider = provider.name(), attempt, "Calling provider");
                    match tokio::time::timeout(timeout, provider.complete(request)).await {
                        Ok(result) => result,
                        Err(_) => Err(ProviderError::Timeout(format!(
                            "no response within {}s",
                            timeout.as_secs()
                        ))),
                    }
                }
            })
            .await;

            result.map_err(|failure| match failure {
                RetryFailure::Exhausted { error, attempts } | RetryFailure::Fatal { error, attempts } => {
                    Error::ModelCall {
                        unit: label.clone(),
                        attempts,
                        source: error,
                    }
                }
                RetryFailure::Cancelled { .. } => Error::Cancelled,
            })
        })
        .await
    }

    async fn call_tool(&self, unit: UnitId, call: ToolCallRequest, tools: &ToolSet) -> ToolResult {
        let invoker = self.tools.clone();
        let cancel = self.cancel.clone();
        let label = unit.to_string();
        let tools = tools.clone();
        let call_id = call.call_id.clone();
        let tool_name = call.tool_name.clone();

        let dispatched = self
            .dispatch(&unit, async move {
                Ok(invoker.invoke(&label, call, &tools, &cancel).await)
            })
            .await;

        dispatched.unwrap_or_else(|e| {
            ToolResult::captured(
                call_id,
                &tool_name,
                &ToolError::Unavailable {
                    tool_name: tool_name.clone(),
                    reason: e.to_string(),
                },
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_core::agent::ProviderKind;
    use agentflow_core::message::Message;
    use agentflow_core::provider::Provider;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Returns scripted results in order; repeats the last one when the script runs out.
    struct ScriptedProvider {
        script: Mutex<Vec<std::result::Result<ProviderResponse, ProviderError>>>,
        calls: AtomicU32,
        delay: Duration,
    }

    impl ScriptedProvider {
        fn new(script: Vec<std::result::Result<ProviderResponse, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
                delay: Duration::ZERO,
            }
        }

        fn slow(delay: Duration) -> Self {
            let mut p = Self::new(vec![Ok(reply("late"))]);
            p.delay = delay;
            p
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            }
        }
    }

    fn reply(text: &str) -> ProviderResponse {
        ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model: "gpt-4".into(),
        }
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            provider: ProviderKind::OpenAi,
            model: "gpt-4".into(),
            messages: vec![Message::user("hi")],
            tools: vec![],
            temperature: None,
            max_tokens: None,
        }
    }

    fn worker(provider: Arc<ScriptedProvider>) -> LocalWorker {
        let router = ProviderRouter::new().with(ProviderKind::OpenAi, provider);
        LocalWorker::new(
            Arc::new(router),
            Arc::new(ToolRegistry::new()),
            &WorkflowSettings::default(),
        )
    }

    #[tokio::test]
    async fn greeting_acknowledges_request() {
        let w = worker(Arc::new(ScriptedProvider::new(vec![Ok(reply("x"))])));
        let ack = w.greet(UnitId::Greeting, " Hello ").await.unwrap();
        assert_eq!(ack, "Hello, Hello!");
        assert_eq!(w.available_slots(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn model_call_retries_server_errors() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::ServerError {
                status_code: 503,
                message: "unavailable".into(),
            }),
            Ok(reply("recovered")),
        ]));
        let w = worker(provider.clone());
        let response = w
            .call_model(UnitId::Model { iteration: 1 }, request())
            .await
            .unwrap();
        assert_eq!(response.message.text(), "recovered");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn authentication_failure_is_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(
            ProviderError::AuthenticationFailed("invalid api key".into()),
        )]));
        let w = worker(provider.clone());
        let err = w
            .call_model(UnitId::Model { iteration: 1 }, request())
            .await
            .unwrap_err();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        match err {
            Error::ModelCall { unit, attempts, source } => {
                assert_eq!(unit, "model#1");
                assert_eq!(attempts, 1);
                assert!(matches!(source, ProviderError::AuthenticationFailed(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn missing_provider_is_fatal() {
        let w = LocalWorker::new(
            Arc::new(ProviderRouter::new()),
            Arc::new(ToolRegistry::new()),
            &WorkflowSettings::default(),
        );
        let err = w
            .call_model(UnitId::Model { iteration: 1 }, request())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ModelCall {
                attempts: 1,
                source: ProviderError::NotConfigured(_),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_hits_start_to_close_timeout() {
        let provider = Arc::new(ScriptedProvider::slow(Duration::from_secs(120)));
        let w = worker(provider.clone());
        let err = w
            .call_model(UnitId::Model { iteration: 1 }, request())
            .await
            .unwrap_err();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert!(err.to_string().contains("no response within 60s"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_in_flight_unit() {
        let provider = Arc::new(ScriptedProvider::slow(Duration::from_secs(30)));
        let w = worker(provider);
        let token = w.cancellation_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let err = w
            .call_model(UnitId::Model { iteration: 1 }, request())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn unit_waits_for_a_slot_then_gives_up() {
        let mut settings = WorkflowSettings::default();
        settings.max_concurrent_units = 1;
        let router = ProviderRouter::new().with(
            ProviderKind::OpenAi,
            Arc::new(ScriptedProvider::slow(Duration::from_secs(50))),
        );
        let w = Arc::new(LocalWorker::new(
            Arc::new(router),
            Arc::new(ToolRegistry::new()),
            &settings,
        ));

        let busy = Arc::clone(&w);
        let first = tokio::spawn(async move {
            busy.call_model(UnitId::Model { iteration: 1 }, request()).await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = w.greet(UnitId::Greeting, "hi").await.unwrap_err();
        assert!(err.to_string().contains("not scheduled within 30s"));
        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn unknown_tool_is_captured_not_raised() {
        let w = worker(Arc::new(ScriptedProvider::new(vec![Ok(reply("x"))])));
        let call = ToolCallRequest {
            call_id: "c9".into(),
            tool_name: "missing".into(),
            raw_arguments: "{}".into(),
        };
        let unit = UnitId::Tool {
            iteration: 1,
            index: 0,
            call_id: "c9".into(),
        };
        let result = w.call_tool(unit, call, &ToolSet::default()).await;
        assert!(result.is_error);
        assert_eq!(result.call_id, "c9");
    }
}
