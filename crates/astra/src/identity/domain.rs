use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::UserId;
use crate::validation::{limit_text, require_text, require_url, Validate};

const MAX_SKILLS: usize = 50;
const MAX_DOCUMENTS: usize = 20;

/// Account role; individuals apply, organizations post opportunities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Individual,
    Organization,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Individual => "individual",
            Role::Organization => "organization",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "individual" => Some(Role::Individual),
            "organization" => Some(Role::Organization),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotSubmitted,
    Submitted,
}

/// Reference to an uploaded file held by the document host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentRef {
    pub name: String,
    pub url: String,
}

impl DocumentRef {
    pub(crate) fn validate_all(field: &str, documents: &[DocumentRef]) -> Result<(), ValidationError> {
        if documents.len() > MAX_DOCUMENTS {
            return Err(ValidationError::new(
                field,
                format!("at most {MAX_DOCUMENTS} documents are accepted"),
            ));
        }
        for (index, document) in documents.iter().enumerate() {
            require_text(&format!("{field}[{index}].name"), &document.name, 200)?;
            require_url(&format!("{field}[{index}].url"), &document.url)?;
        }
        Ok(())
    }
}

/// Organization identity-verification submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KycSubmission {
    pub organization_name: String,
    pub registration_number: String,
    pub country: String,
    pub contact_email: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentRef>,
}

impl Validate for KycSubmission {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("organization_name", &self.organization_name, 200)?;
        require_text("registration_number", &self.registration_number, 100)?;
        require_text("country", &self.country, 100)?;
        require_text("contact_email", &self.contact_email, 254)?;
        if !self.contact_email.contains('@') {
            return Err(ValidationError::new(
                "contact_email",
                "must be an e-mail address",
            ));
        }
        if let Some(website) = &self.website {
            require_url("website", website)?;
        }
        DocumentRef::validate_all("documents", &self.documents)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycRecord {
    pub status: KycStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submission: Option<KycSubmission>,
}

impl Default for KycRecord {
    fn default() -> Self {
        Self {
            status: KycStatus::NotSubmitted,
            submitted_at: None,
            submission: None,
        }
    }
}

/// Self-described background used by readiness assessments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDetails {
    pub headline: String,
    pub bio: String,
    pub skills: Vec<String>,
    pub education: String,
    pub experience: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Option<String>,
    pub full_name: String,
    pub role: Role,
    pub kyc: KycRecord,
    pub details: ApplicantDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// First sighting of a token subject.
    pub fn provision(id: UserId, email: Option<String>, now: DateTime<Utc>) -> Self {
        let full_name = email
            .as_deref()
            .and_then(|address| address.split('@').next())
            .unwrap_or_default()
            .to_string();

        Self {
            id,
            email,
            full_name,
            role: Role::Individual,
            kyc: KycRecord::default(),
            details: ApplicantDetails::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_post_opportunities(&self) -> bool {
        self.role == Role::Organization && self.kyc.status == KycStatus::Submitted
    }

    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Authenticated caller attached to each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub email: Option<String>,
    pub role: Role,
}

/// Partial profile edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    pub education: Option<String>,
    pub experience: Option<String>,
    pub location: Option<String>,
}

impl Validate for ProfileUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.full_name {
            require_text("full_name", name, 200)?;
        }
        if let Some(headline) = &self.headline {
            limit_text("headline", headline, 200)?;
        }
        if let Some(bio) = &self.bio {
            limit_text("bio", bio, 4000)?;
        }
        if let Some(skills) = &self.skills {
            if skills.len() > MAX_SKILLS {
                return Err(ValidationError::new(
                    "skills",
                    format!("at most {MAX_SKILLS} skills are accepted"),
                ));
            }
            for (index, skill) in skills.iter().enumerate() {
                require_text(&format!("skills[{index}]"), skill, 100)?;
            }
        }
        if let Some(education) = &self.education {
            limit_text("education", education, 4000)?;
        }
        if let Some(experience) = &self.experience {
            limit_text("experience", experience, 4000)?;
        }
        if let Some(location) = &self.location {
            limit_text("location", location, 200)?;
        }
        Ok(())
    }
}

impl ProfileUpdate {
    pub(crate) fn apply(self, profile: &mut UserProfile) {
        if let Some(name) = self.full_name {
            profile.full_name = name.trim().to_string();
        }
        let details = &mut profile.details;
        if let Some(headline) = self.headline {
            details.headline = headline;
        }
        if let Some(bio) = self.bio {
            details.bio = bio;
        }
        if let Some(skills) = self.skills {
            details.skills = skills.into_iter().map(|skill| skill.trim().to_string()).collect();
        }
        if let Some(education) = self.education {
            details.education = education;
        }
        if let Some(experience) = self.experience {
            details.experience = experience;
        }
        if let Some(location) = self.location {
            details.location = location;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchRoleRequest {
    pub role: Role,
}

impl Validate for SwitchRoleRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}
