//! Execution history and replay.
//!
//! [`RecordingExecutor`] wraps another [`UnitExecutor`] and journals every
//! completed unit: its id, a SHA-256 fingerprint of its canonical JSON input,
//! and its output. Given a previous [`History`], units already present are
//! answered from the journal instead of running again, which is how an
//! interrupted execution resumes without repeating side effects.
//!
//! Failed units are never recorded; a resumed execution retries them.

use agentflow_core::error::{Error, Result, ToolError};
use agentflow_core::provider::{ProviderRequest, ProviderResponse};
use agentflow_core::tool::{ToolCallRequest, ToolResult, ToolSet};
use agentflow_core::unit::{UnitExecutor, UnitId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One completed unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub unit: UnitId,
    pub input_fingerprint: String,
    pub output: Value,
    pub recorded_at: DateTime<Utc>,
}

/// The journal of an execution's completed units, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    execution_id: Option<String>,
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// The execution this journal belongs to, once one has started recording into it.
    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }

    pub fn set_execution_id(&mut self, execution_id: impl Into<String>) {
        self.execution_id = Some(execution_id.into());
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, unit: &UnitId) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| &e.unit == unit)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a unit. A unit already in the journal keeps its first entry.
    pub fn record(&mut self, entry: HistoryEntry) {
        if self.get(&entry.unit).is_none() {
            self.entries.push(entry);
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read history {}: {e}", path.display()),
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| Error::Config {
            message: format!("failed to write history {}: {e}", path.display()),
        })
    }
}

/// SHA-256 of the canonical JSON form of `input`, hex encoded.
///
/// serde_json objects are key-ordered, so equal inputs always hash equally.
pub fn fingerprint<T: Serialize + ?Sized>(input: &T) -> Result<String> {
    let bytes = serde_json::to_vec(input)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Journals unit outputs and replays them on resume.
pub struct RecordingExecutor {
    inner: Arc<dyn UnitExecutor>,
    history: Mutex<History>,
    replayed: AtomicUsize,
    /// Set when a tool unit diverged from the journal; later model calls fail with it
    diverged: Mutex<Option<(String, String)>>,
    cancel: Option<CancellationToken>,
}

impl RecordingExecutor {
    pub fn new(inner: Arc<dyn UnitExecutor>) -> Self {
        Self::resume(inner, History::new())
    }

    /// Continue from `history`: recorded units are replayed, the rest run on `inner`.
    pub fn resume(inner: Arc<dyn UnitExecutor>, history: History) -> Self {
        Self {
            inner,
            history: Mutex::new(history),
            replayed: AtomicUsize::new(0),
            diverged: Mutex::new(None),
            cancel: None,
        }
    }

    /// Stop recording tool results once `cancel` fires; they would only hold the cancellation.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn history(&self) -> History {
        self.lock().clone()
    }

    /// How many units were answered from the journal.
    pub fn replayed_units(&self) -> usize {
        self.replayed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, History> {
        // A poisoned journal is still a valid journal.
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The divergence a tool unit ran into, if any.
    pub fn divergence(&self) -> Option<Error> {
        let diverged = self.diverged.lock().unwrap_or_else(|e| e.into_inner());
        diverged.as_ref().map(|(unit, reason)| Error::NonDeterminism {
            unit: unit.clone(),
            reason: reason.clone(),
        })
    }

    fn lookup<T: DeserializeOwned>(&self, unit: &UnitId, fingerprint: &str) -> Result<Option<T>> {
        let history = self.lock();
        let Some(entry) = history.get(unit) else {
            return Ok(None);
        };
        if entry.input_fingerprint != fingerprint {
            warn!(unit = %unit, "Recorded input differs from the re-derived input");
            return Err(Error::NonDeterminism {
                unit: unit.to_string(),
                reason: format!(
                    "recorded input {} but re-derived input {}",
                    short(&entry.input_fingerprint),
                    short(fingerprint)
                ),
            });
        }
        let output = serde_json::from_value(entry.output.clone())?;
        self.replayed.fetch_add(1, Ordering::SeqCst);
        debug!(unit = %unit, "Replayed unit from history");
        Ok(Some(output))
    }

    fn record<T: Serialize>(&self, unit: UnitId, fingerprint: String, output: &T) -> Result<()> {
        let entry = HistoryEntry {
            unit,
            input_fingerprint: fingerprint,
            output: serde_json::to_value(output)?,
            recorded_at: Utc::now(),
        };
        self.lock().record(entry);
        Ok(())
    }
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

#[async_trait]
impl UnitExecutor for RecordingExecutor {
    async fn greet(&self, unit: UnitId, request_text: &str) -> Result<String> {
        let fp = fingerprint(&json!({ "request_text": request_text }))?;
        if let Some(ack) = self.lookup(&unit, &fp)? {
            return Ok(ack);
        }
        let ack = self.inner.greet(unit.clone(), request_text).await?;
        self.record(unit, fp, &ack)?;
        Ok(ack)
    }

    async fn call_model(&self, unit: UnitId, request: ProviderRequest) -> Result<ProviderResponse> {
        if let Some(e) = self.divergence() {
            return Err(e);
        }
        let fp = fingerprint(&request)?;
        if let Some(response) = self.lookup(&unit, &fp)? {
            return Ok(response);
        }
        let response = self.inner.call_model(unit.clone(), request).await?;
        self.record(unit, fp, &response)?;
        Ok(response)
    }

    async fn call_tool(&self, unit: UnitId, call: ToolCallRequest, tools: &ToolSet) -> ToolResult {
        // call_tool cannot fail, so journal problems degrade to running the unit unrecorded.
        let fp = match fingerprint(&json!({ "call": &call, "tools": tools })) {
            Ok(fp) => fp,
            Err(e) => {
                warn!(unit = %unit, error = %e, "Could not fingerprint tool call");
                return self.inner.call_tool(unit, call, tools).await;
            }
        };

        match self.lookup::<ToolResult>(&unit, &fp) {
            Ok(Some(result)) => return result,
            Ok(None) => {}
            Err(e) => {
                if let Error::NonDeterminism { unit, reason } = &e {
                    let mut diverged = self.diverged.lock().unwrap_or_else(|e| e.into_inner());
                    diverged.get_or_insert_with(|| (unit.clone(), reason.clone()));
                }
                return ToolResult::captured(
                    call.call_id,
                    &call.tool_name,
                    &ToolError::ExecutionFailed {
                        tool_name: call.tool_name.clone(),
                        reason: e.to_string(),
                    },
                );
            }
        }

        let result = self.inner.call_tool(unit.clone(), call, tools).await;
        let cancelled = self.cancel.as_ref().is_some_and(|c| c.is_cancelled());
        if !cancelled && let Err(e) = self.record(unit, fp, &result) {
            warn!(error = %e, "Could not record tool result");
        }
        result
    }
}
