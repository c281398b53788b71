//! Span helpers for agent, model, tool and A2A operations.

use tracing::Span;

/// Span for one agent run.
///
/// ```
/// use w3a_telemetry::agent_run_span;
/// let span = agent_run_span("web3_agent", "inv-123");
/// let _enter = span.enter();
/// ```
pub fn agent_run_span(agent_name: &str, invocation_id: &str) -> Span {
    tracing::info_span!(
        "agent.run",
        agent.name = agent_name,
        invocation.id = invocation_id,
        otel.kind = "internal"
    )
}

/// Span for a model API call.
pub fn model_call_span(model_name: &str) -> Span {
    tracing::info_span!("model.call", model.name = model_name, otel.kind = "client")
}

pub fn tool_execute_span(tool_name: &str) -> Span {
    tracing::info_span!("tool.execute", tool.name = tool_name, otel.kind = "internal")
}

/// Span for one JSON-RPC request handled by the A2A server.
pub fn a2a_request_span(method: &str, task_id: Option<&str>) -> Span {
    tracing::info_span!(
        "a2a.request",
        rpc.method = method,
        task.id = task_id.unwrap_or(""),
        otel.kind = "server"
    )
}
