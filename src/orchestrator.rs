// Orchestrator - composes routing, delegation and stream interpretation

use crate::catalog::{Catalog, ValidationMode};
use crate::error::{Result, RouterError};
use crate::events::RawEvent;
use crate::gateway::DelegationGateway;
use crate::interpreter::{EventInterpreter, OutputItem};
use crate::routing::{self, RoutingDecision};
use futures_util::stream::{self, BoxStream, StreamExt};
use std::path::Path;
use std::sync::Arc;

/// One incoming user request
#[derive(Debug, Clone)]
pub struct Request {
    pub query: String,

    /// Explicit routing override naming the expert to use
    pub target: Option<String>,

    /// Conversation identifier forwarded to the expert
    pub context_id: String,

    pub task_id: String,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            target: None,
            context_id: uuid::Uuid::new_v4().to_string(),
            task_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        let target = target.into();
        self.target = (!target.is_empty()).then_some(target);
        self
    }

    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = context_id.into();
        self
    }
}

/// Lifecycle of one request through the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Routing,
    Delegating,
    Streaming,
    Completed,
    Failed,
}

/// Composition root: routes a request once, delegates to the chosen expert
/// and surfaces the interpreted output stream. Holds no per-request state -
/// concurrent requests only share the catalog snapshot and the gateway.
pub struct Orchestrator {
    catalog: Arc<Catalog>,
    gateway: Arc<dyn DelegationGateway>,
}

impl Orchestrator {
    pub fn new(catalog: Arc<Catalog>, gateway: Arc<dyn DelegationGateway>) -> Self {
        Self { catalog, gateway }
    }

    /// Decide which expert should handle a query. Always produces a
    /// decision; the fallback guarantees totality.
    pub fn route(&self, query: &str, target: Option<&str>) -> RoutingDecision {
        let snapshot = self.catalog.snapshot();
        let decision = routing::select(query, target, &snapshot);
        tracing::info!(
            selected = %decision.selected,
            confidence = decision.confidence,
            reason = %decision.reason,
            "routing decision"
        );
        decision
    }

    /// Handle a request end to end, streaming interpreted output items in
    /// classification order. Failure to reach the expert is returned as an
    /// error; transport failures mid-stream become a terminal `Error` item.
    /// Dropping the returned stream cancels the delegation session.
    pub async fn stream(&self, request: Request) -> Result<BoxStream<'static, OutputItem>> {
        let snapshot = self.catalog.snapshot();

        tracing::debug!(phase = ?RequestPhase::Routing, task_id = %request.task_id, "handling request");
        let decision = routing::select(&request.query, request.target.as_deref(), &snapshot);
        tracing::info!(
            selected = %decision.selected,
            confidence = decision.confidence,
            reason = %decision.reason,
            fallbacks = ?decision.fallbacks,
            "routing decision"
        );

        let expert = snapshot
            .get(&decision.selected)
            .ok_or_else(|| RouterError::UnknownTarget(decision.selected.clone()))?;

        tracing::debug!(phase = ?RequestPhase::Delegating, expert = %expert.name, "opening session");
        let raw = self
            .gateway
            .streaming_call(
                expert,
                &request.query,
                &request.context_id,
                &request.task_id,
                request.target.as_deref(),
            )
            .await?;

        tracing::debug!(phase = ?RequestPhase::Streaming, expert = %expert.name, "consuming events");
        let state = (raw.fuse(), EventInterpreter::new(), Some(expert.name.clone()));
        let output = stream::unfold(state, |(mut raw, mut interp, mut root)| async move {
            loop {
                if interp.is_finished() {
                    // Terminal error already emitted; end the stream
                    return None;
                }
                let Some(item) = raw.next().await else {
                    // Session over: append the observed agent tree once,
                    // as a text footer after the answer
                    let tree = root
                        .take()
                        .map(|r| interp.agent_tree(&r))
                        .unwrap_or_default();
                    if tree.is_empty() {
                        return None;
                    }
                    let footer = vec![OutputItem::Text(format!("\n\n{tree}"))];
                    return Some((stream::iter(footer), (raw, interp, root)));
                };
                let event = match item {
                    Ok(event) => event,
                    // A broken transport ends the request the same way an
                    // in-band error event does
                    Err(err) => RawEvent::Error {
                        message: err.to_string(),
                    },
                };
                let items = interp.consume(event);
                if !items.is_empty() {
                    return Some((stream::iter(items), (raw, interp, root)));
                }
            }
        })
        .flatten()
        .boxed();

        Ok(output)
    }

    /// Single-shot, non-streaming delegation of a request
    pub async fn ask(&self, request: Request) -> Result<String> {
        let snapshot = self.catalog.snapshot();
        let decision = routing::select(&request.query, request.target.as_deref(), &snapshot);
        tracing::info!(
            selected = %decision.selected,
            reason = %decision.reason,
            "routing decision (direct)"
        );

        let expert = snapshot
            .get(&decision.selected)
            .ok_or_else(|| RouterError::UnknownTarget(decision.selected.clone()))?;

        let answer = self.gateway.direct_call(expert, &request.query).await?;
        Ok(answer)
    }

    /// Names of the active experts in the current snapshot
    pub fn available_experts(&self) -> Vec<String> {
        self.catalog
            .snapshot()
            .active()
            .map(|e| e.name.clone())
            .collect()
    }

    /// Atomically swap in a freshly loaded catalog snapshot
    pub fn reload<P: AsRef<Path>>(&self, path: P, mode: ValidationMode) -> Result<usize> {
        Ok(self.catalog.reload(path, mode)?)
    }
}
