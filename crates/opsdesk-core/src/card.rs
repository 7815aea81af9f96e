use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// PresentationCard
// ---------------------------------------------------------------------------

/// A typed, UI-ready rendering of a finished action's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresentationCard {
    Summary {
        text: String,
    },
    Draft {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tone: Option<String>,
        addressed_points: Vec<String>,
    },
    Tasks {
        items: Vec<String>,
    },
    Extraction {
        fields: BTreeMap<String, String>,
        highlights: Vec<String>,
    },
    Classification {
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    Notification {
        text: String,
    },
    Plan {
        steps: Vec<String>,
    },
    Reply {
        text: String,
    },
}

// ---------------------------------------------------------------------------
// to_presentation
// ---------------------------------------------------------------------------

/// Convert a backend output envelope into a presentation card.
///
/// The envelope is discriminated by its `kind` field. Missing or empty
/// required fields yield `None` (no malformed card), and unknown kinds yield
/// `None` so new backend shapes render nothing instead of crashing the UI.
pub fn to_presentation(output: &Value) -> Option<PresentationCard> {
    match output.get("kind")?.as_str()? {
        "summary" => Some(PresentationCard::Summary {
            text: non_empty_str(output, "text")?,
        }),
        "draft" => Some(PresentationCard::Draft {
            text: non_empty_str(output, "text")?,
            tone: opt_str(output, "tone"),
            addressed_points: str_list(output, "addressed_points"),
        }),
        "tasks" => {
            let items = str_list(output, "items");
            if items.is_empty() {
                return None;
            }
            Some(PresentationCard::Tasks { items })
        }
        "extraction" => {
            let fields = str_map(output, "fields");
            if fields.is_empty() {
                return None;
            }
            Some(PresentationCard::Extraction {
                fields,
                highlights: str_list(output, "highlights"),
            })
        }
        "classification" => Some(PresentationCard::Classification {
            label: non_empty_str(output, "label")?,
            confidence: output.get("confidence").and_then(Value::as_f64),
        }),
        "notification" => Some(PresentationCard::Notification {
            text: non_empty_str(output, "text")?,
        }),
        "plan" => {
            let steps = str_list(output, "steps");
            if steps.is_empty() {
                return None;
            }
            Some(PresentationCard::Plan { steps })
        }
        "reply" => Some(PresentationCard::Reply {
            text: non_empty_str(output, "text")?,
        }),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn non_empty_str(envelope: &Value, key: &str) -> Option<String> {
    envelope
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn opt_str(envelope: &Value, key: &str) -> Option<String> {
    envelope
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn str_list(envelope: &Value, key: &str) -> Vec<String> {
    envelope
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn str_map(envelope: &Value, key: &str) -> BTreeMap<String, String> {
    envelope
        .get(key)
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_card() {
        let card = to_presentation(&json!({ "kind": "summary", "text": "All good." }));
        assert_eq!(
            card,
            Some(PresentationCard::Summary {
                text: "All good.".into()
            })
        );
    }

    #[test]
    fn draft_card_with_optional_fields() {
        let card = to_presentation(&json!({
            "kind": "draft",
            "text": "Dear customer…",
            "tone": "friendly",
            "addressed_points": ["pricing", "delivery"]
        }))
        .unwrap();
        match card {
            PresentationCard::Draft {
                text,
                tone,
                addressed_points,
            } => {
                assert_eq!(text, "Dear customer…");
                assert_eq!(tone.as_deref(), Some("friendly"));
                assert_eq!(addressed_points, vec!["pricing", "delivery"]);
            }
            other => panic!("expected draft, got {other:?}"),
        }
    }

    #[test]
    fn draft_card_without_optionals() {
        let card = to_presentation(&json!({ "kind": "draft", "text": "Hi" })).unwrap();
        match card {
            PresentationCard::Draft {
                tone,
                addressed_points,
                ..
            } => {
                assert!(tone.is_none());
                assert!(addressed_points.is_empty());
            }
            other => panic!("expected draft, got {other:?}"),
        }
    }

    #[test]
    fn tasks_card_requires_items() {
        let card = to_presentation(&json!({ "kind": "tasks", "items": ["call back"] }));
        assert!(matches!(card, Some(PresentationCard::Tasks { .. })));
        assert_eq!(to_presentation(&json!({ "kind": "tasks", "items": [] })), None);
        assert_eq!(to_presentation(&json!({ "kind": "tasks" })), None);
    }

    #[test]
    fn extraction_card_requires_fields() {
        let card = to_presentation(&json!({
            "kind": "extraction",
            "fields": { "vat_id": "DE123", "total": "99.00" },
            "highlights": ["total"]
        }))
        .unwrap();
        match card {
            PresentationCard::Extraction { fields, highlights } => {
                assert_eq!(fields.get("vat_id").map(String::as_str), Some("DE123"));
                assert_eq!(highlights, vec!["total"]);
            }
            other => panic!("expected extraction, got {other:?}"),
        }
        assert_eq!(
            to_presentation(&json!({ "kind": "extraction", "fields": {} })),
            None
        );
    }

    #[test]
    fn classification_card() {
        let card = to_presentation(&json!({
            "kind": "classification",
            "label": "complaint",
            "confidence": 0.92
        }));
        assert_eq!(
            card,
            Some(PresentationCard::Classification {
                label: "complaint".into(),
                confidence: Some(0.92)
            })
        );
        assert_eq!(to_presentation(&json!({ "kind": "classification" })), None);
    }

    #[test]
    fn notification_and_reply_cards() {
        assert!(matches!(
            to_presentation(&json!({ "kind": "notification", "text": "Order shipped" })),
            Some(PresentationCard::Notification { .. })
        ));
        assert!(matches!(
            to_presentation(&json!({ "kind": "reply", "text": "Thanks!" })),
            Some(PresentationCard::Reply { .. })
        ));
    }

    #[test]
    fn plan_card_requires_steps() {
        assert!(matches!(
            to_presentation(&json!({ "kind": "plan", "steps": ["open", "greet"] })),
            Some(PresentationCard::Plan { .. })
        ));
        assert_eq!(to_presentation(&json!({ "kind": "plan", "steps": [] })), None);
    }

    #[test]
    fn blank_required_text_yields_none() {
        assert_eq!(
            to_presentation(&json!({ "kind": "summary", "text": "   " })),
            None
        );
    }

    #[test]
    fn unknown_kind_yields_none() {
        assert_eq!(
            to_presentation(&json!({ "kind": "hologram", "text": "hi" })),
            None
        );
    }

    #[test]
    fn non_envelope_values_yield_none() {
        assert_eq!(to_presentation(&json!("just a string")), None);
        assert_eq!(to_presentation(&json!({ "text": "no kind" })), None);
        assert_eq!(to_presentation(&Value::Null), None);
    }
}
