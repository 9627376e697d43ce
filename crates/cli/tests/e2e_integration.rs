//! End-to-end integration tests for AgentFlow executions.
//!
//! These tests drive the full pipeline: request validation, the greeting
//! unit, the conversation loop, the built-in benefits tools, retries, the
//! execution journal and cancellation. Only the LLM is scripted.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentflow_config::AppConfig;
use agentflow_core::agent::{AgentDefinition, Completion, ExecutionRequest, ProviderKind};
use agentflow_core::error::{Error, ErrorKind, ProviderError, ProviderErrorKind};
use agentflow_core::message::{Message, Role};
use agentflow_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use agentflow_core::tool::{ToolCallRequest, ToolRegistry};
use agentflow_providers::ProviderRouter;
use agentflow_tools::{benefits_agent, default_registry};
use agentflow_workflow::{History, OrchestratorState, WorkflowRuntime, WorkflowSettings};
use tokio_util::sync::CancellationToken;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted outcomes in sequence and keeps
/// every request it was sent.
struct ScriptedProvider {
    outcomes: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Duration,
}

impl ScriptedProvider {
    fn new(outcomes: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    fn replies(responses: Vec<ProviderResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    fn slow(delay: Duration, response: ProviderResponse) -> Self {
        Self {
            delay,
            ..Self::replies(vec![response])
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, n: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[n].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let outcomes = self.outcomes.lock().unwrap();
        match outcomes.get(n) {
            Some(outcome) => outcome.clone(),
            None => panic!(
                "ScriptedProvider exhausted: call #{n}, have {}",
                outcomes.len()
            ),
        }
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "gpt-4".into(),
    }
}

fn tool_response(calls: Vec<ToolCallRequest>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tool_calls("", calls),
        usage: None,
        model: "gpt-4".into(),
    }
}

fn tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest {
        call_id: id.into(),
        tool_name: name.into(),
        raw_arguments: args.to_string(),
    }
}

fn pension_args() -> serde_json::Value {
    serde_json::json!({
        "current_salary": 85000,
        "years_of_service": 10,
        "retirement_age": 65
    })
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    provider: Arc<ScriptedProvider>,
    tools: Arc<ToolRegistry>,
    runtime: WorkflowRuntime,
}

impl Harness {
    fn new(provider: ScriptedProvider) -> Self {
        Self::with_settings(provider, WorkflowSettings::default())
    }

    fn with_settings(provider: ScriptedProvider, settings: WorkflowSettings) -> Self {
        let provider = Arc::new(provider);
        let tools = Arc::new(default_registry());
        let router = ProviderRouter::new().with(ProviderKind::OpenAi, provider.clone());
        let runtime = WorkflowRuntime::new(Arc::new(router), Arc::clone(&tools), settings);
        Self {
            provider,
            tools,
            runtime,
        }
    }

    fn agent(&self) -> AgentDefinition {
        benefits_agent(&self.tools)
    }

    fn request(&self, text: &str) -> ExecutionRequest {
        ExecutionRequest {
            request_text: text.into(),
            request_files: vec![],
            agents: vec![self.agent()],
        }
    }
}

/// The tool messages the model saw in request `n`, in order.
fn tool_messages(request: &ProviderRequest) -> Vec<(String, serde_json::Value)> {
    request
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| {
            (
                m.tool_call_id.clone().unwrap_or_default(),
                serde_json::from_str(&m.text()).unwrap(),
            )
        })
        .collect()
}

// ── Happy paths ──────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_plain_answer_is_trimmed() {
    let h = Harness::new(ScriptedProvider::replies(vec![text_response(
        "  Hello! How can I help with your benefits?\n",
    )]));

    let response = h.runtime.execute(h.request("Hello")).await.unwrap();
    assert_eq!(response.result_text, "Hello! How can I help with your benefits?");
    assert_eq!(response.completion, Completion::Answered);
    assert_eq!(h.provider.calls(), 1);

    let first = h.provider.request(0);
    assert_eq!(first.messages[0].role, Role::System);
    assert!(first.messages[0].text().contains("Employee Benefits Assistant"));
    assert_eq!(first.messages[1].text(), "Hello");
    assert_eq!(first.tools.len(), 5);
    assert_eq!(first.model, "gpt-4");
}

#[tokio::test]
async fn e2e_pension_tool_then_answer() {
    let h = Harness::new(ScriptedProvider::replies(vec![
        tool_response(vec![tool_call("call_1", "calculate_pension", pension_args())]),
        text_response("Your projected pension is shown above."),
    ]));

    let response = h
        .runtime
        .execute(h.request("What will my pension be? I earn $85,000 with 10 years."))
        .await
        .unwrap();
    assert_eq!(response.result_text, "Your projected pension is shown above.");
    assert_eq!(h.provider.calls(), 2);

    // The second model call carries the tool result as a tool message.
    let second = h.provider.request(1);
    let results = tool_messages(&second);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "call_1");
    assert!(results[0].1.get("error").is_none(), "unexpected error: {}", results[0].1);
}

#[tokio::test]
async fn e2e_parallel_calls_are_answered_in_request_order() {
    let h = Harness::new(ScriptedProvider::replies(vec![
        tool_response(vec![
            tool_call(
                "call_a",
                "pto_balance_lookup",
                serde_json::json!({"employee_id": "E1001"}),
            ),
            tool_call("call_b", "calculate_pension", pension_args()),
            tool_call("call_c", "no_such_tool", serde_json::json!({})),
        ]),
        text_response("Done."),
    ]));

    let response = h.runtime.execute(h.request("PTO and pension please")).await.unwrap();
    assert_eq!(response.result_text, "Done.");

    let results = tool_messages(&h.provider.request(1));
    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["call_a", "call_b", "call_c"]);
    assert!(results[2].1["error"].as_str().unwrap().contains("no_such_tool"));
}

#[tokio::test]
async fn e2e_file_urls_reach_the_model() {
    let h = Harness::new(ScriptedProvider::replies(vec![text_response("Got the file.")]));
    let mut request = h.request("Please review my enrollment form");
    request.request_files = vec!["https://files.example.com/form.pdf".into()];

    h.runtime.execute(request).await.unwrap();
    let user = &h.provider.request(0).messages[1];
    assert_eq!(user.role, Role::User);
    let serialized = serde_json::to_string(user).unwrap();
    assert!(serialized.contains("https://files.example.com/form.pdf"));
}

// ── Tool failures stay in the conversation ───────────────────────────────

#[tokio::test]
async fn e2e_invalid_tool_argument_is_reported_to_the_model() {
    let h = Harness::new(ScriptedProvider::replies(vec![
        tool_response(vec![tool_call(
            "call_1",
            "calculate_pension",
            serde_json::json!({
                "current_salary": "not a number",
                "years_of_service": 10,
                "retirement_age": 65
            }),
        )]),
        text_response("Could you give me your salary as a number?"),
    ]));

    let response = h.runtime.execute(h.request("My pension?")).await.unwrap();
    assert_eq!(response.completion, Completion::Answered);
    assert_eq!(response.result_text, "Could you give me your salary as a number?");

    let results = tool_messages(&h.provider.request(1));
    assert_eq!(results[0].1["field"], "current_salary");
    assert!(results[0].1["error"].as_str().unwrap().contains("current_salary"));
}

#[tokio::test]
async fn e2e_malformed_arguments_do_not_fail_the_execution() {
    let h = Harness::new(ScriptedProvider::replies(vec![
        tool_response(vec![ToolCallRequest {
            call_id: "call_1".into(),
            tool_name: "calculate_pension".into(),
            raw_arguments: "{\"current_salary\": ".into(),
        }]),
        text_response("Sorry, let me try again later."),
    ]));

    let response = h.runtime.execute(h.request("Pension?")).await.unwrap();
    assert_eq!(response.result_text, "Sorry, let me try again later.");
    let results = tool_messages(&h.provider.request(1));
    assert!(results[0].1["error"].as_str().unwrap().contains("Malformed"));
}

// ── Iteration limit ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_iteration_limit_returns_a_diagnostic() {
    let looping = || tool_response(vec![tool_call("call_1", "calculate_pension", pension_args())]);
    let settings = WorkflowSettings::default().with_max_iterations(2);
    let h = Harness::with_settings(
        ScriptedProvider::replies(vec![looping(), looping(), looping()]),
        settings,
    );

    let response = h.runtime.execute(h.request("Loop forever")).await.unwrap();
    assert_eq!(response.completion, Completion::IterationLimit { iterations: 2 });
    assert!(response.result_text.contains("maximum"));
    assert!(response.result_text.contains('2'));
    assert_eq!(h.provider.calls(), 2);
}

// ── Model failures and retries ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn e2e_rate_limits_exhaust_the_model_retries() {
    let limited = || {
        Err(ProviderError::RateLimited {
            retry_after_secs: None,
        })
    };
    let h = Harness::new(ScriptedProvider::new(vec![limited(), limited(), limited()]));

    let report = h
        .runtime
        .run(h.request("Hello"), History::new(), CancellationToken::new())
        .await;
    let err = report.result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider(ProviderErrorKind::RateLimit));
    assert!(matches!(err, Error::ModelCall { attempts: 3, .. }));
    assert_eq!(h.provider.calls(), 3);
    assert_eq!(report.transitions.last(), Some(&OrchestratorState::Failed));
}

#[tokio::test(start_paused = true)]
async fn e2e_rate_limit_then_success_recovers() {
    let h = Harness::new(ScriptedProvider::new(vec![
        Err(ProviderError::RateLimited {
            retry_after_secs: Some(3),
        }),
        Ok(text_response("Recovered.")),
    ]));

    let response = h.runtime.execute(h.request("Hello")).await.unwrap();
    assert_eq!(response.result_text, "Recovered.");
    assert_eq!(h.provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn e2e_authentication_failure_is_not_retried() {
    let h = Harness::new(ScriptedProvider::new(vec![Err(
        ProviderError::AuthenticationFailed("invalid api key".into()),
    )]));

    let err = h.runtime.execute(h.request("Hello")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Provider(ProviderErrorKind::Authentication));
    assert!(matches!(err, Error::ModelCall { attempts: 1, .. }));
    assert_eq!(h.provider.calls(), 1);
}

// ── Validation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_invalid_requests_run_no_units() {
    let h = Harness::new(ScriptedProvider::replies(vec![]));

    let no_agents = ExecutionRequest {
        request_text: "Hello".into(),
        request_files: vec![],
        agents: vec![],
    };
    let report = h
        .runtime
        .run(no_agents, History::new(), CancellationToken::new())
        .await;
    assert_eq!(report.result.unwrap_err().kind(), ErrorKind::InvalidRequest);
    assert!(report.history.is_empty());

    let mut bad_model = h.request("Hello");
    bad_model.agents[0].model = "gpt-2".into();
    let err = h.runtime.execute(bad_model).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn e2e_unsupported_provider_fails_tool_conversion() {
    let h = Harness::new(ScriptedProvider::replies(vec![]));
    let mut request = h.request("Hello");
    request.agents[0].provider = "ANTHROPIC".into();
    request.agents[0].model = "claude-3-5-sonnet-20241022".into();

    let err = h.runtime.execute(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ToolConversion);
    assert_eq!(h.provider.calls(), 0);
}

// ── Durability ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_resume_replays_the_journal_without_side_effects() {
    let h = Harness::new(ScriptedProvider::replies(vec![
        tool_response(vec![tool_call("call_1", "calculate_pension", pension_args())]),
        text_response("Here is your projection."),
    ]));

    let first = h
        .runtime
        .run(h.request("Pension?"), History::new(), CancellationToken::new())
        .await;
    let first_response = first.result.unwrap();
    // greeting, two model calls and one tool call
    assert_eq!(first.history.len(), 4);
    assert_eq!(h.provider.calls(), 2);

    let second = h.runtime.resume(h.request("Pension?"), first.history).await;
    assert_eq!(second.result.unwrap(), first_response);
    assert_eq!(second.replayed_units, 4);
    assert_eq!(h.provider.calls(), 2);
}

#[tokio::test]
async fn e2e_journal_survives_a_round_trip_through_disk() {
    let h = Harness::new(ScriptedProvider::replies(vec![text_response("Saved.")]));
    let report = h
        .runtime
        .run(h.request("Hello"), History::new(), CancellationToken::new())
        .await;
    assert!(report.result.is_ok());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    report.history.save(&path).unwrap();
    let loaded = History::load(&path).unwrap();
    assert_eq!(loaded.execution_id(), Some(report.execution_id.as_str()));

    let resumed = h.runtime.resume(h.request("Hello"), loaded).await;
    assert_eq!(resumed.result.unwrap().result_text, "Saved.");
    assert_eq!(resumed.execution_id, report.execution_id);
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn e2e_changed_request_against_old_journal_is_nondeterministic() {
    let h = Harness::new(ScriptedProvider::replies(vec![
        text_response("First."),
        text_response("Second."),
    ]));
    let first = h
        .runtime
        .run(h.request("Hello"), History::new(), CancellationToken::new())
        .await;
    assert!(first.result.is_ok());

    let second = h.runtime.resume(h.request("Something else"), first.history).await;
    assert_eq!(second.result.unwrap_err().kind(), ErrorKind::NonDeterminism);
}

#[tokio::test(start_paused = true)]
async fn e2e_cancellation_ends_the_execution() {
    let h = Harness::new(ScriptedProvider::slow(
        Duration::from_secs(45),
        text_response("Too late."),
    ));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        trigger.cancel();
    });

    let report = h.runtime.run(h.request("Hello"), History::new(), cancel).await;
    assert_eq!(report.result.unwrap_err().kind(), ErrorKind::Cancelled);
    assert_eq!(report.transitions.last(), Some(&OrchestratorState::Failed));
}

// ── Tool schema conversion ───────────────────────────────────────────────

#[tokio::test]
async fn e2e_tool_schema_is_identical_on_every_model_call() {
    let h = Harness::new(ScriptedProvider::replies(vec![
        tool_response(vec![tool_call(
            "call_1",
            "pto_balance_lookup",
            serde_json::json!({"employee_id": "E1001"}),
        )]),
        text_response("You have PTO left."),
    ]));

    h.runtime.execute(h.request("PTO?")).await.unwrap();
    let first = serde_json::to_string(&h.provider.request(0).tools).unwrap();
    let second = serde_json::to_string(&h.provider.request(1).tools).unwrap();
    assert_eq!(first, second);

    let direct = agentflow_providers::convert(&h.agent().tools, ProviderKind::OpenAi).unwrap();
    assert_eq!(first, serde_json::to_string(&direct).unwrap());
}

#[test]
fn e2e_openai_schema_lists_every_input_as_required() {
    let tools = default_registry();
    let agent = benefits_agent(&tools);
    let specs = agentflow_providers::convert(&agent.tools, ProviderKind::OpenAi).unwrap();

    for (spec, def) in specs.iter().zip(&agent.tools) {
        assert_eq!(spec.function.name, def.name);
        let declared: Vec<&str> = def.inputs.iter().map(|i| i.name.as_str()).collect();
        let required: Vec<&str> = spec
            .function
            .parameters
            .required
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(required, declared);
        assert!(!spec.function.parameters.additional_properties);
    }
}

// ── Configuration ────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_config_file_drives_the_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[execution]
max_iterations = 1
"#,
    )
    .unwrap();
    let config = AppConfig::load_from(&path).unwrap();
    let settings = WorkflowSettings::from_config(&config);
    assert_eq!(settings.max_iterations, 1);

    let looping = || tool_response(vec![tool_call("call_1", "calculate_pension", pension_args())]);
    let h = Harness::with_settings(ScriptedProvider::replies(vec![looping(), looping()]), settings);
    let response = h.runtime.execute(h.request("Loop")).await.unwrap();
    assert_eq!(response.completion, Completion::IterationLimit { iterations: 1 });
    assert_eq!(h.provider.calls(), 1);
}
