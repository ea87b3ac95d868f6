use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::ids::{OpportunityId, UserId};
use crate::validation::{limit_text, require_text, Validate};

const MAX_CUSTOM_FIELDS: usize = 50;
const MAX_REQUIREMENTS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    Program,
    Job,
    Grant,
    Scholarship,
    Internship,
}

impl OpportunityKind {
    pub const fn label(self) -> &'static str {
        match self {
            OpportunityKind::Program => "program",
            OpportunityKind::Job => "job",
            OpportunityKind::Grant => "grant",
            OpportunityKind::Scholarship => "scholarship",
            OpportunityKind::Internship => "internship",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "program" => Some(OpportunityKind::Program),
            "job" => Some(OpportunityKind::Job),
            "grant" => Some(OpportunityKind::Grant),
            "scholarship" => Some(OpportunityKind::Scholarship),
            "internship" => Some(OpportunityKind::Internship),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Open,
    Closed,
}

impl OpportunityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OpportunityStatus::Open => "open",
            OpportunityStatus::Closed => "closed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "open" => Some(OpportunityStatus::Open),
            "closed" => Some(OpportunityStatus::Closed),
            _ => None,
        }
    }
}

/// Input widget of an owner-defined application question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Date,
    Url,
    Select,
}

/// Extra question an owner attaches to the opportunity's application form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomField {
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub owner_id: UserId,
    pub title: String,
    pub organization_name: String,
    pub kind: OpportunityKind,
    pub description: String,
    pub requirements: Vec<String>,
    pub location: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: OpportunityStatus,
    pub custom_fields: Vec<CustomField>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }

    /// Open and, when a deadline is set, not yet past it.
    pub fn accepts_applications(&self, today: NaiveDate) -> bool {
        self.status == OpportunityStatus::Open
            && self.deadline.map_or(true, |deadline| today <= deadline)
    }

    pub(crate) fn matches(&self, filter: &OpportunityFilter) -> bool {
        if !filter.include_closed && self.status == OpportunityStatus::Closed {
            return false;
        }
        if let Some(kind) = filter.kind {
            if self.kind != kind {
                return false;
            }
        }
        match filter.search_term() {
            Some(term) => [&self.title, &self.description, &self.organization_name]
                .iter()
                .any(|text| text.to_lowercase().contains(&term)),
            None => true,
        }
    }
}

/// Listing query; `q` is a case-insensitive substring match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpportunityFilter {
    #[serde(default)]
    pub kind: Option<OpportunityKind>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub include_closed: bool,
}

impl OpportunityFilter {
    pub fn search_term(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewOpportunity {
    pub title: String,
    /// Defaults to the organization name given during KYC.
    #[serde(default)]
    pub organization_name: Option<String>,
    pub kind: OpportunityKind,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
}

impl Validate for NewOpportunity {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, 200)?;
        if let Some(name) = &self.organization_name {
            require_text("organization_name", name, 200)?;
        }
        require_text("description", &self.description, 20_000)?;
        validate_requirements(&self.requirements)?;
        if let Some(location) = &self.location {
            limit_text("location", location, 200)?;
        }
        validate_custom_fields(&self.custom_fields)
    }
}

/// Partial edit of an opportunity; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpportunityUpdate {
    pub title: Option<String>,
    pub organization_name: Option<String>,
    pub kind: Option<OpportunityKind>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub location: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: Option<OpportunityStatus>,
}

impl Validate for OpportunityUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            require_text("title", title, 200)?;
        }
        if let Some(name) = &self.organization_name {
            require_text("organization_name", name, 200)?;
        }
        if let Some(description) = &self.description {
            require_text("description", description, 20_000)?;
        }
        if let Some(requirements) = &self.requirements {
            validate_requirements(requirements)?;
        }
        if let Some(location) = &self.location {
            limit_text("location", location, 200)?;
        }
        Ok(())
    }
}

impl OpportunityUpdate {
    pub(crate) fn apply(self, opportunity: &mut Opportunity) {
        if let Some(title) = self.title {
            opportunity.title = title.trim().to_string();
        }
        if let Some(name) = self.organization_name {
            opportunity.organization_name = name.trim().to_string();
        }
        if let Some(kind) = self.kind {
            opportunity.kind = kind;
        }
        if let Some(description) = self.description {
            opportunity.description = description;
        }
        if let Some(requirements) = self.requirements {
            opportunity.requirements = requirements;
        }
        if let Some(location) = self.location {
            opportunity.location = Some(location).filter(|value| !value.trim().is_empty());
        }
        if let Some(deadline) = self.deadline {
            opportunity.deadline = Some(deadline);
        }
        if let Some(status) = self.status {
            opportunity.status = status;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomFieldsUpdate {
    pub fields: Vec<CustomField>,
}

impl Validate for CustomFieldsUpdate {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_custom_fields(&self.fields)
    }
}

fn validate_requirements(requirements: &[String]) -> Result<(), ValidationError> {
    if requirements.len() > MAX_REQUIREMENTS {
        return Err(ValidationError::new(
            "requirements",
            format!("at most {MAX_REQUIREMENTS} requirements are accepted"),
        ));
    }
    for (index, requirement) in requirements.iter().enumerate() {
        require_text(&format!("requirements[{index}]"), requirement, 1000)?;
    }
    Ok(())
}

pub(crate) fn validate_custom_fields(fields: &[CustomField]) -> Result<(), ValidationError> {
    if fields.len() > MAX_CUSTOM_FIELDS {
        return Err(ValidationError::new(
            "fields",
            format!("at most {MAX_CUSTOM_FIELDS} custom fields are accepted"),
        ));
    }

    let mut seen = HashSet::new();
    for (index, field) in fields.iter().enumerate() {
        let path = format!("fields[{index}]");
        require_text(&format!("{path}.id"), &field.id, 64)?;
        require_text(&format!("{path}.label"), &field.label, 200)?;
        if !seen.insert(field.id.as_str()) {
            return Err(ValidationError::new(
                format!("{path}.id"),
                format!("duplicate field id '{}'", field.id),
            ));
        }
        match field.kind {
            FieldKind::Select => {
                if field.options.is_empty() {
                    return Err(ValidationError::new(
                        format!("{path}.options"),
                        "select fields need at least one option",
                    ));
                }
                for (option_index, option) in field.options.iter().enumerate() {
                    require_text(&format!("{path}.options[{option_index}]"), option, 200)?;
                }
            }
            _ if !field.options.is_empty() => {
                return Err(ValidationError::new(
                    format!("{path}.options"),
                    "only select fields take options",
                ));
            }
            _ => {}
        }
    }
    Ok(())
}
