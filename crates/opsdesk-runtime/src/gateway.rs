use std::sync::Arc;

use opsdesk_core::catalog::ActionConfig;
use opsdesk_core::gate::normalize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::RuntimeEvent;

// ---------------------------------------------------------------------------
// StartIntent
// ---------------------------------------------------------------------------

/// A gated request to start an action, carrying the canonical id. Consumed
/// by the runtime dispatcher, which routes it to the streaming or polling
/// tracker.
#[derive(Debug, Clone)]
pub struct StartIntent {
    pub action_id: String,
    pub context: Value,
    pub config: Value,
    pub source: Option<String>,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// The only sanctioned entry point for starting an action. Everything is
/// normalized through the executability gate first; a rejection produces a
/// developer warning and nothing else — no record, no network call.
#[derive(Clone)]
pub struct Gateway {
    actions: Arc<ActionConfig>,
    intents: mpsc::UnboundedSender<StartIntent>,
    events: broadcast::Sender<RuntimeEvent>,
}

impl Gateway {
    pub(crate) fn new(
        actions: Arc<ActionConfig>,
        intents: mpsc::UnboundedSender<StartIntent>,
        events: broadcast::Sender<RuntimeEvent>,
    ) -> Self {
        Gateway {
            actions,
            intents,
            events,
        }
    }

    /// Gate `id` and, if it is executable, announce a start intent.
    /// Returns whether the request was accepted.
    pub fn start_action(
        &self,
        id: &str,
        context: Value,
        config: Value,
        source: Option<&str>,
    ) -> bool {
        let Some(canonical) = normalize(&self.actions, id) else {
            warn!(action = %id, source = ?source, "dispatch rejected: not on the executable allow-list");
            if cfg!(debug_assertions) {
                // Development builds surface the rejection to the user;
                // production stays silent.
                let _ = self.events.send(RuntimeEvent::Notice {
                    message: format!("action '{id}' is not executable"),
                });
            }
            return false;
        };

        let intent = StartIntent {
            action_id: canonical.to_string(),
            context,
            config,
            source: source.map(str::to_string),
        };
        if self.intents.send(intent).is_err() {
            warn!(action = %canonical, "runtime dispatcher is gone; intent dropped");
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gateway() -> (Gateway, mpsc::UnboundedReceiver<StartIntent>) {
        let (intents, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(16);
        let gateway = Gateway::new(Arc::new(ActionConfig::builtin()), intents, events);
        (gateway, rx)
    }

    #[test]
    fn rejected_id_emits_nothing() {
        let (gateway, mut rx) = gateway();
        let accepted = gateway.start_action("nonexistent.action", Value::Null, Value::Null, None);
        assert!(!accepted);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn defined_but_not_executable_is_rejected() {
        let (gateway, mut rx) = gateway();
        assert!(!gateway.start_action("phone.transcribe", Value::Null, Value::Null, None));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn alias_dispatch_carries_the_canonical_id() {
        let (gateway, mut rx) = gateway();
        let accepted = gateway.start_action(
            "inbox.draftReply",
            json!({"message_id": "m-1"}),
            json!({"tone": "friendly"}),
            Some("inbox-toolbar"),
        );
        assert!(accepted);
        let intent = rx.try_recv().unwrap();
        assert_eq!(intent.action_id, "inbox.draft_reply");
        assert_eq!(intent.context, json!({"message_id": "m-1"}));
        assert_eq!(intent.config, json!({"tone": "friendly"}));
        assert_eq!(intent.source.as_deref(), Some("inbox-toolbar"));
    }

    #[test]
    fn rejection_notifies_development_builds() {
        let (intents, _rx) = mpsc::unbounded_channel();
        let (events, mut notices) = broadcast::channel(16);
        let gateway = Gateway::new(Arc::new(ActionConfig::builtin()), intents, events);
        gateway.start_action("nonexistent.action", Value::Null, Value::Null, None);
        if cfg!(debug_assertions) {
            assert!(matches!(
                notices.try_recv(),
                Ok(RuntimeEvent::Notice { .. })
            ));
        } else {
            assert!(notices.try_recv().is_err());
        }
    }
}
