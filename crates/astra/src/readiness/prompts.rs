//! Prompt construction and reply parsing for readiness evaluations.

use serde_json::{Map, Value};

use super::domain::Verdict;
use crate::identity::UserProfile;
use crate::inference::extract_json;
use crate::opportunities::Opportunity;

pub const ELIGIBILITY_FALLBACK_SCORE: u8 = 65;
pub const ELIGIBILITY_FALLBACK_FEEDBACK: &str = "We could not complete a detailed review right now. \
     Based on your profile you appear to be a reasonable fit for this opportunity. Review the \
     requirements carefully and make sure your profile highlights relevant experience.";

pub const MOCK_FALLBACK_SCORE: u8 = 70;
pub const MOCK_FALLBACK_FEEDBACK: &str = "Your practice application has been recorded. We could not \
     generate detailed feedback right now. Check that each answer is specific, addresses the \
     opportunity's requirements, and gives concrete examples.";

pub(crate) const ELIGIBILITY_SYSTEM: &str = "You assess how ready an applicant is for an \
     opportunity. Reply with a JSON object {\"score\": integer 0-100, \"feedback\": string, \
     \"improvementSteps\": [string]}. Be encouraging and specific.";

pub(crate) const MOCK_SYSTEM: &str = "You review practice applications. Reply with a JSON object \
     {\"score\": integer 0-100, \"feedback\": string, \"strengths\": [string], \
     \"improvements\": [string]}.";

pub(crate) fn eligibility_prompt(opportunity: &Opportunity, applicant: &UserProfile) -> String {
    let details = &applicant.details;
    let mut prompt = String::new();
    prompt.push_str("Opportunity\n");
    push_line(&mut prompt, "Title", &opportunity.title);
    push_line(&mut prompt, "Kind", opportunity.kind.label());
    push_line(&mut prompt, "Organization", &opportunity.organization_name);
    push_line(&mut prompt, "Description", &opportunity.description);
    push_line(&mut prompt, "Requirements", &opportunity.requirements.join("; "));

    prompt.push_str("\nApplicant\n");
    push_line(&mut prompt, "Name", &applicant.full_name);
    push_line(&mut prompt, "Headline", &details.headline);
    push_line(&mut prompt, "Bio", &details.bio);
    push_line(&mut prompt, "Skills", &details.skills.join(", "));
    push_line(&mut prompt, "Education", &details.education);
    push_line(&mut prompt, "Experience", &details.experience);
    push_line(&mut prompt, "Location", &details.location);
    prompt
}

pub(crate) fn mock_prompt(opportunity: &Opportunity, data: &Map<String, Value>) -> String {
    let mut prompt = String::new();
    prompt.push_str("Opportunity\n");
    push_line(&mut prompt, "Title", &opportunity.title);
    push_line(&mut prompt, "Description", &opportunity.description);
    push_line(&mut prompt, "Requirements", &opportunity.requirements.join("; "));

    prompt.push_str("\nPractice application\n");
    for (field, answer) in data {
        match answer {
            Value::String(text) => push_line(&mut prompt, field, text),
            other => push_line(&mut prompt, field, &other.to_string()),
        }
    }
    prompt
}

fn push_line(prompt: &mut String, label: &str, value: &str) {
    let value = value.trim();
    let value = if value.is_empty() { "(not provided)" } else { value };
    prompt.push_str(label);
    prompt.push_str(": ");
    prompt.push_str(value);
    prompt.push('\n');
}

/// `{score, feedback, improvementSteps[]}`; `None` when the reply is unusable.
pub(crate) fn parse_eligibility(reply: &str) -> Option<Verdict> {
    let value = extract_json(reply)?;
    let (score, mut feedback) = score_and_feedback(&value)?;
    append_list(&mut feedback, "Improvement steps", &strings(&value, "improvementSteps"), true);
    Some(Verdict::new(score, feedback))
}

/// `{score, feedback, strengths[], improvements[]}`.
pub(crate) fn parse_mock(reply: &str) -> Option<Verdict> {
    let value = extract_json(reply)?;
    let (score, mut feedback) = score_and_feedback(&value)?;
    append_list(&mut feedback, "Strengths", &strings(&value, "strengths"), false);
    append_list(&mut feedback, "Improvements", &strings(&value, "improvements"), true);
    Some(Verdict::new(score, feedback))
}

fn score_and_feedback(value: &Value) -> Option<(i64, String)> {
    let score = match value.get("score")? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|score| score.round() as i64))?,
        Value::String(text) => text.trim().parse::<f64>().ok()?.round() as i64,
        _ => return None,
    };
    let feedback = value.get("feedback")?.as_str()?.trim();
    if feedback.is_empty() {
        return None;
    }
    Some((score, feedback.to_string()))
}

fn strings(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn append_list(feedback: &mut String, heading: &str, items: &[String], numbered: bool) {
    if items.is_empty() {
        return;
    }
    feedback.push_str("\n\n");
    feedback.push_str(heading);
    feedback.push(':');
    for (index, item) in items.iter().enumerate() {
        if numbered {
            feedback.push_str(&format!("\n{}. {item}", index + 1));
        } else {
            feedback.push_str(&format!("\n- {item}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eligibility_feedback_lists_numbered_steps() {
        let verdict = parse_eligibility(
            r#"{"score": 81, "feedback": "Strong match.", "improvementSteps": ["Add a portfolio", "Mention SQL"]}"#,
        )
        .expect("parses");
        assert_eq!(verdict.score, 81);
        assert_eq!(
            verdict.feedback,
            "Strong match.\n\nImprovement steps:\n1. Add a portfolio\n2. Mention SQL"
        );
        assert!(!verdict.fallback);
    }

    #[test]
    fn fractional_and_textual_scores_are_rounded() {
        assert_eq!(
            parse_eligibility(r#"{"score": 77.6, "feedback": "ok"}"#).map(|v| v.score),
            Some(78)
        );
        assert_eq!(
            parse_eligibility(r#"{"score": "64", "feedback": "ok"}"#).map(|v| v.score),
            Some(64)
        );
    }

    #[test]
    fn replies_without_feedback_are_unusable() {
        assert!(parse_eligibility(r#"{"score": 90}"#).is_none());
        assert!(parse_eligibility(r#"{"score": 90, "feedback": "  "}"#).is_none());
        assert!(parse_mock("I'd rate this a 7/10").is_none());
    }

    #[test]
    fn mock_feedback_separates_strengths_and_improvements() {
        let verdict = parse_mock(
            r#"{"score": 58, "feedback": "Decent draft.", "strengths": ["Clear goals"], "improvements": ["Quantify impact"]}"#,
        )
        .expect("parses");
        assert_eq!(
            verdict.feedback,
            "Decent draft.\n\nStrengths:\n- Clear goals\n\nImprovements:\n1. Quantify impact"
        );
    }
}
