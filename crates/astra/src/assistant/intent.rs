//! Intent classification: model reply parsing plus a deterministic keyword fallback.

use serde_json::{Map, Value};

use super::domain::{Intent, IntentAnalysis};
use crate::inference::extract_json;
use crate::opportunities::OpportunityKind;

pub(crate) const KEYWORD_CONFIDENCE: f32 = 0.5;
pub(crate) const GENERAL_CONFIDENCE: f32 = 0.2;

pub(crate) const INTENT_SYSTEM: &str = "Classify the user's message for an opportunity-matching \
     platform. Reply with a JSON object {\"intent\": one of search_opportunities, \
     application_status, join_queue, leave_queue, readiness_check, general, \
     \"confidence\": number 0-1, \"parameters\": object}. For search_opportunities include \
     \"query\" and, when obvious, \"kind\" (program, job, grant, scholarship, internship).";

/// Checked in order; the first matching group wins.
const KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::LeaveQueue,
        &["leave the queue", "leave queue", "exit the queue", "drop out of the queue", "leave the interview"],
    ),
    (
        Intent::JoinQueue,
        &["join the queue", "join queue", "join the interview", "get in line", "queue up"],
    ),
    (
        Intent::ReadinessCheck,
        &["ready", "readiness", "eligible", "eligibility", "qualify", "my chances"],
    ),
    (
        Intent::ApplicationStatus,
        &["my application", "application status", "applied", "status of", "hear back"],
    ),
    (
        Intent::SearchOpportunities,
        &[
            "find", "search", "looking for", "opportunit", "job", "grant", "scholarship",
            "internship", "program",
        ],
    ),
];

pub(crate) fn classify_keywords(message: &str) -> IntentAnalysis {
    let lowered = message.to_lowercase();
    let intent = KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|word| lowered.contains(word)))
        .map(|(intent, _)| *intent);

    match intent {
        Some(intent) => IntentAnalysis {
            intent,
            confidence: KEYWORD_CONFIDENCE,
            parameters: keyword_parameters(intent, message, &lowered),
        },
        None => IntentAnalysis {
            intent: Intent::General,
            confidence: GENERAL_CONFIDENCE,
            parameters: Map::new(),
        },
    }
}

fn keyword_parameters(intent: Intent, message: &str, lowered: &str) -> Map<String, Value> {
    let mut parameters = Map::new();
    if intent == Intent::SearchOpportunities {
        parameters.insert("query".to_string(), Value::String(message.trim().to_string()));
        let kind = [
            OpportunityKind::Internship,
            OpportunityKind::Scholarship,
            OpportunityKind::Grant,
            OpportunityKind::Program,
            OpportunityKind::Job,
        ]
        .into_iter()
        .find(|kind| lowered.contains(kind.label()));
        if let Some(kind) = kind {
            parameters.insert("kind".to_string(), Value::String(kind.label().to_string()));
        }
    }
    parameters
}

/// `None` when the reply names no known intent.
pub(crate) fn parse_intent_reply(reply: &str) -> Option<IntentAnalysis> {
    let value = extract_json(reply)?;
    let intent = Intent::parse(value.get("intent")?.as_str()?.trim())?;
    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .map_or(KEYWORD_CONFIDENCE, |confidence| confidence.clamp(0.0, 1.0) as f32);
    let parameters = match value.get("parameters") {
        Some(Value::Object(parameters)) => parameters.clone(),
        _ => Map::new(),
    };
    Some(IntentAnalysis {
        intent,
        confidence,
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_phrases_win_over_generic_words() {
        let analysis = classify_keywords("Can I leave the queue for the data program?");
        assert_eq!(analysis.intent, Intent::LeaveQueue);
        assert_eq!(analysis.confidence, KEYWORD_CONFIDENCE);
    }

    #[test]
    fn search_extracts_query_and_kind() {
        let analysis = classify_keywords("Find me a paid internship in Nairobi");
        assert_eq!(analysis.intent, Intent::SearchOpportunities);
        assert_eq!(analysis.parameters["kind"], "internship");
        assert_eq!(analysis.parameters["query"], "Find me a paid internship in Nairobi");
    }

    #[test]
    fn unmatched_messages_are_general() {
        let analysis = classify_keywords("Hello there");
        assert_eq!(analysis.intent, Intent::General);
        assert_eq!(analysis.confidence, GENERAL_CONFIDENCE);
        assert!(analysis.parameters.is_empty());
    }

    #[test]
    fn model_replies_are_validated() {
        let parsed = parse_intent_reply(
            r#"{"intent": "readiness_check", "confidence": 1.7, "parameters": {"opportunity": "x"}}"#,
        )
        .expect("parses");
        assert_eq!(parsed.intent, Intent::ReadinessCheck);
        assert_eq!(parsed.confidence, 1.0);

        assert!(parse_intent_reply(r#"{"intent": "book_flight"}"#).is_none());
    }
}
