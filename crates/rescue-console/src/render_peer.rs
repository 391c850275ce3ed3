use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderTarget {
    Robot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderVerb {
    Move,
    ToggleTool,
    DropItem,
}

impl RenderTarget {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Robot => "Robot",
        }
    }
}

impl RenderVerb {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Move => "Move",
            Self::ToggleTool => "ToggleTool",
            Self::DropItem => "DropItem",
        }
    }
}

/// Fire-and-forget command sink for the rendering runtime.
pub(crate) trait RenderPeer: Send + Sync {
    fn send_command(&self, target: RenderTarget, verb: RenderVerb, payload: Value);
}

#[derive(Debug, Default)]
pub(crate) struct TracingRenderPeer;

impl RenderPeer for TracingRenderPeer {
    fn send_command(&self, target: RenderTarget, verb: RenderVerb, payload: Value) {
        tracing::info!(
            target_object = target.as_str(),
            verb = verb.as_str(),
            payload = %payload,
            "render command"
        );
    }
}
