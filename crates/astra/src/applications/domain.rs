use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::DocumentRef;
use crate::ids::{ApplicationId, OpportunityId, UserId};
use crate::validation::{limit_text, Validate};

const MAX_NOTES: usize = 10_000;
const MAX_FEEDBACK: usize = 10_000;

/// Review stage set by the opportunity owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Reviewing,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Reviewing => "reviewing",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(ApplicationStatus::Pending),
            "reviewing" => Some(ApplicationStatus::Reviewing),
            "accepted" => Some(ApplicationStatus::Accepted),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

/// One applicant's relationship to one opportunity.
///
/// `queue_position` is set exactly when `in_interview_queue` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub opportunity_id: OpportunityId,
    pub applicant_id: UserId,
    pub status: ApplicationStatus,
    pub is_qualified: bool,
    pub qualification_date: Option<DateTime<Utc>>,
    pub in_interview_queue: bool,
    pub queue_position: Option<u32>,
    pub joined_queue_at: Option<DateTime<Utc>>,
    pub notes: String,
    pub feedback: Option<String>,
    pub documents: Vec<DocumentRef>,
    pub custom_answers: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn new(
        opportunity_id: OpportunityId,
        applicant_id: UserId,
        submission: ApplicationSubmission,
        custom_answers: BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ApplicationId::generate(),
            opportunity_id,
            applicant_id,
            status: ApplicationStatus::Pending,
            is_qualified: false,
            qualification_date: None,
            in_interview_queue: false,
            queue_position: None,
            joined_queue_at: None,
            notes: submission.notes.unwrap_or_default(),
            feedback: None,
            documents: submission.documents,
            custom_answers,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_submitted_by(&self, user: UserId) -> bool {
        self.applicant_id == user
    }

    pub(crate) fn queue_entry(&self) -> Option<QueueEntryView> {
        let position = self.queue_position.filter(|_| self.in_interview_queue)?;
        Some(QueueEntryView {
            application_id: self.id,
            applicant_id: self.applicant_id,
            position,
            joined_queue_at: self.joined_queue_at,
        })
    }
}

/// Body of `POST /opportunities/{id}/apply`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationSubmission {
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

impl Validate for ApplicationSubmission {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(notes) = &self.notes {
            limit_text("notes", notes, MAX_NOTES)?;
        }
        DocumentRef::validate_all("documents", &self.documents)
    }
}

/// Which side of an application an action belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Applicant,
    Owner,
}

/// Single tagged change applied through `PUT /applications/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ApplicationUpdate {
    UpdateNotes { notes: String },
    UpdateDocuments { documents: Vec<DocumentRef> },
    JoinQueue,
    LeaveQueue,
    Qualify,
    Disqualify,
    SetStatus { status: ApplicationStatus },
    SetFeedback { feedback: Option<String> },
}

impl ApplicationUpdate {
    pub fn party(&self) -> Party {
        match self {
            ApplicationUpdate::UpdateNotes { .. }
            | ApplicationUpdate::UpdateDocuments { .. }
            | ApplicationUpdate::JoinQueue
            | ApplicationUpdate::LeaveQueue => Party::Applicant,
            ApplicationUpdate::Qualify
            | ApplicationUpdate::Disqualify
            | ApplicationUpdate::SetStatus { .. }
            | ApplicationUpdate::SetFeedback { .. } => Party::Owner,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationUpdate::UpdateNotes { .. } => "update_notes",
            ApplicationUpdate::UpdateDocuments { .. } => "update_documents",
            ApplicationUpdate::JoinQueue => "join_queue",
            ApplicationUpdate::LeaveQueue => "leave_queue",
            ApplicationUpdate::Qualify => "qualify",
            ApplicationUpdate::Disqualify => "disqualify",
            ApplicationUpdate::SetStatus { .. } => "set_status",
            ApplicationUpdate::SetFeedback { .. } => "set_feedback",
        }
    }
}

impl Validate for ApplicationUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ApplicationUpdate::UpdateNotes { notes } => limit_text("notes", notes, MAX_NOTES),
            ApplicationUpdate::UpdateDocuments { documents } => {
                DocumentRef::validate_all("documents", documents)
            }
            ApplicationUpdate::SetFeedback {
                feedback: Some(feedback),
            } => limit_text("feedback", feedback, MAX_FEEDBACK),
            _ => Ok(()),
        }
    }
}

/// Write scoped to the columns one non-queue action owns.
///
/// Stores apply it to the current row, so concurrent actions by the other party survive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationPatch {
    Notes(String),
    Documents(Vec<DocumentRef>),
    Qualify,
    Status(ApplicationStatus),
    Feedback(Option<String>),
}

impl ApplicationPatch {
    pub fn apply(self, application: &mut Application, now: DateTime<Utc>) {
        match self {
            ApplicationPatch::Notes(notes) => application.notes = notes,
            ApplicationPatch::Documents(documents) => application.documents = documents,
            ApplicationPatch::Qualify => {
                application.is_qualified = true;
                application.qualification_date.get_or_insert(now);
            }
            ApplicationPatch::Status(status) => application.status = status,
            ApplicationPatch::Feedback(feedback) => application.feedback = feedback,
        }
        application.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntryView {
    pub application_id: ApplicationId,
    pub applicant_id: UserId,
    pub position: u32,
    pub joined_queue_at: Option<DateTime<Utc>>,
}

/// Interview queue as shown to the owner (every entry) or an applicant (their own entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewQueueView {
    pub opportunity_id: OpportunityId,
    pub total: usize,
    pub entries: Vec<QueueEntryView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_actions_are_tagged_and_assigned_to_a_party() {
        let update: ApplicationUpdate =
            serde_json::from_value(json!({ "action": "join_queue" })).expect("parses");
        assert_eq!(update, ApplicationUpdate::JoinQueue);
        assert_eq!(update.party(), Party::Applicant);

        let update: ApplicationUpdate =
            serde_json::from_value(json!({ "action": "set_status", "status": "reviewing" }))
                .expect("parses");
        assert_eq!(update.party(), Party::Owner);
        assert_eq!(update.label(), "set_status");
    }

    #[test]
    fn unknown_actions_are_rejected() {
        let parsed =
            serde_json::from_value::<ApplicationUpdate>(json!({ "action": "promote" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn qualify_patch_keeps_the_first_qualification_date() {
        let first = Utc::now();
        let mut application = Application::new(
            OpportunityId::generate(),
            UserId::generate(),
            ApplicationSubmission::default(),
            BTreeMap::new(),
            first,
        );
        ApplicationPatch::Qualify.apply(&mut application, first);
        let later = first + chrono::Duration::minutes(5);
        ApplicationPatch::Qualify.apply(&mut application, later);

        assert!(application.is_qualified);
        assert_eq!(application.qualification_date, Some(first));
        assert_eq!(application.updated_at, later);
    }

    #[test]
    fn queue_entry_requires_membership() {
        let now = Utc::now();
        let mut application = Application::new(
            OpportunityId::generate(),
            UserId::generate(),
            ApplicationSubmission::default(),
            BTreeMap::new(),
            now,
        );
        assert!(application.queue_entry().is_none());

        application.in_interview_queue = true;
        application.queue_position = Some(2);
        let entry = application.queue_entry().expect("queued");
        assert_eq!(entry.position, 2);
    }
}
