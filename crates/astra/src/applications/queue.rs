//! Ordering rules of an opportunity's interview queue, independent of storage.

use chrono::{DateTime, Utc};

use super::domain::Application;
use crate::ids::ApplicationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("the applicant has not been qualified for interviews")]
    NotQualified,
    #[error("the application is already in the interview queue")]
    AlreadyQueued,
    #[error("the application is not in the interview queue")]
    NotQueued,
}

/// State change applied to one application and its opportunity's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueTransition {
    Join,
    Leave,
    /// Owner-forced leave that also clears qualification; never fails.
    Disqualify,
    /// Applicant deletes the application; leaves first when queued.
    Withdraw,
}

impl QueueTransition {
    pub const fn label(self) -> &'static str {
        match self {
            QueueTransition::Join => "join",
            QueueTransition::Leave => "leave",
            QueueTransition::Disqualify => "disqualify",
            QueueTransition::Withdraw => "withdraw",
        }
    }
}

/// Queue members in interview order; member `i` holds position `i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterviewQueue {
    members: Vec<ApplicationId>,
}

impl InterviewQueue {
    /// Rebuild from stored positions, keeping their relative order.
    pub fn from_members<I>(members: I) -> Self
    where
        I: IntoIterator<Item = (ApplicationId, u32)>,
    {
        let mut members: Vec<_> = members.into_iter().collect();
        members.sort_by_key(|(id, position)| (*position, *id));
        Self {
            members: members.into_iter().map(|(id, _)| id).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: ApplicationId) -> bool {
        self.members.contains(&id)
    }

    pub fn position_of(&self, id: ApplicationId) -> Option<u32> {
        self.members
            .iter()
            .position(|member| *member == id)
            .map(|index| index as u32 + 1)
    }

    /// Append at max + 1 and return the new position.
    pub fn join(&mut self, id: ApplicationId) -> Result<u32, QueueError> {
        if self.contains(id) {
            return Err(QueueError::AlreadyQueued);
        }
        self.members.push(id);
        Ok(self.members.len() as u32)
    }

    /// Remove a member; everyone behind it moves up one place.
    pub fn leave(&mut self, id: ApplicationId) -> Result<(), QueueError> {
        let index = self
            .members
            .iter()
            .position(|member| *member == id)
            .ok_or(QueueError::NotQueued)?;
        self.members.remove(index);
        Ok(())
    }

    /// Contiguous `1..=N` positions in queue order.
    pub fn positions(&self) -> Vec<(ApplicationId, u32)> {
        self.members
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index as u32 + 1))
            .collect()
    }
}

/// Apply `transition` to `application` and its opportunity's `queue`.
///
/// On success the application's queue columns agree with `queue`, and
/// `queue.positions()` holds every surviving member's compacted position.
pub fn apply_transition(
    queue: &mut InterviewQueue,
    application: &mut Application,
    transition: QueueTransition,
    now: DateTime<Utc>,
) -> Result<(), QueueError> {
    match transition {
        QueueTransition::Join => {
            if !application.is_qualified {
                return Err(QueueError::NotQualified);
            }
            if application.in_interview_queue {
                return Err(QueueError::AlreadyQueued);
            }
            let position = queue.join(application.id)?;
            application.in_interview_queue = true;
            application.queue_position = Some(position);
            application.joined_queue_at = Some(now);
        }
        QueueTransition::Leave => {
            if !application.in_interview_queue {
                return Err(QueueError::NotQueued);
            }
            depart(queue, application);
        }
        QueueTransition::Disqualify => {
            if application.in_interview_queue {
                depart(queue, application);
            }
            application.is_qualified = false;
            application.qualification_date = None;
        }
        QueueTransition::Withdraw => {
            if application.in_interview_queue {
                depart(queue, application);
            }
        }
    }

    application.updated_at = now;
    if let Some(position) = queue.position_of(application.id) {
        application.queue_position = Some(position);
    }
    Ok(())
}

fn depart(queue: &mut InterviewQueue, application: &mut Application) {
    // A flag without a queue entry is repaired rather than rejected.
    let _ = queue.leave(application.id);
    application.in_interview_queue = false;
    application.queue_position = None;
    application.joined_queue_at = None;
}
