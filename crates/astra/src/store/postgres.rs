//! PostgreSQL backend built on a `sqlx` connection pool.
//!
//! Queue transitions lock the opportunity row, apply the shared ordering rules, and
//! renumber the survivors with one window-function statement before committing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{
    ApplicationStore, AssessmentStore, OpportunityStore, StoreError, TransitionError, UserStore,
};
use crate::applications::{
    apply_transition, Application, ApplicationPatch, ApplicationStatus, InterviewQueue,
    QueueTransition,
};
use crate::config::DatabaseConfig;
use crate::identity::{ApplicantDetails, DocumentRef, KycRecord, Role, UserProfile};
use crate::ids::{ApplicationId, AssessmentId, OpportunityId, UserId};
use crate::opportunities::{
    CustomField, Opportunity, OpportunityFilter, OpportunityKind, OpportunityStatus,
};
use crate::readiness::{AssessmentStatus, ReadinessAssessment};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const USER_COLUMNS: &str =
    "id, email, full_name, role, kyc, details, created_at, updated_at";
const OPPORTUNITY_COLUMNS: &str = "id, owner_id, title, organization_name, kind, description, \
     requirements, location, deadline, status, custom_fields, created_at, updated_at";
const APPLICATION_COLUMNS: &str = "id, opportunity_id, applicant_id, status, is_qualified, \
     qualification_date, in_interview_queue, queue_position, joined_queue_at, notes, feedback, \
     documents, custom_answers, created_at, updated_at";
const ASSESSMENT_COLUMNS: &str = "id, opportunity_id, applicant_id, status, eligibility_score, \
     eligibility_feedback, mock_application_completed, mock_application_score, \
     mock_application_feedback, mock_application_data, created_at, updated_at";

const RENUMBER_QUEUE: &str = r#"
    UPDATE applications AS a
    SET queue_position = ranked.position
    FROM (
        SELECT id, (ROW_NUMBER() OVER (ORDER BY queue_position, id))::INTEGER AS position
        FROM applications
        WHERE opportunity_id = $1 AND in_interview_queue
    ) AS ranked
    WHERE a.id = ranked.id AND a.queue_position IS DISTINCT FROM ranked.position
"#;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not set".to_string()))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await
            .map_err(|err| map_sqlx_error("connect", err))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema; every statement is idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in schema_statements() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|err| map_sqlx_error("migrate", err))?;
        }
        debug!("database schema applied");
        Ok(())
    }
}

fn schema_statements() -> impl Iterator<Item = &'static str> {
    SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Unavailable(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {operation}"))
        }
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

fn decode<T>(column: &str, raw: &str, parse: fn(&str) -> Option<T>) -> Result<T, StoreError> {
    parse(raw).ok_or_else(|| StoreError::Unavailable(format!("unexpected {column} value `{raw}`")))
}

fn position_from_row(raw: Option<i32>) -> Option<u32> {
    raw.and_then(|position| u32::try_from(position).ok())
}

/// `%term%` pattern with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: Option<String>,
    full_name: String,
    role: String,
    kyc: Json<KycRecord>,
    details: Json<ApplicantDetails>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId(row.id),
            email: row.email,
            full_name: row.full_name,
            role: decode("role", &row.role, Role::parse)?,
            kyc: row.kyc.0,
            details: row.details.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct OpportunityRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    organization_name: String,
    kind: String,
    description: String,
    requirements: Json<Vec<String>>,
    location: Option<String>,
    deadline: Option<NaiveDate>,
    status: String,
    custom_fields: Json<Vec<CustomField>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OpportunityRow> for Opportunity {
    type Error = StoreError;

    fn try_from(row: OpportunityRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OpportunityId(row.id),
            owner_id: UserId(row.owner_id),
            title: row.title,
            organization_name: row.organization_name,
            kind: decode("kind", &row.kind, OpportunityKind::parse)?,
            description: row.description,
            requirements: row.requirements.0,
            location: row.location,
            deadline: row.deadline,
            status: decode("status", &row.status, OpportunityStatus::parse)?,
            custom_fields: row.custom_fields.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ApplicationRow {
    id: Uuid,
    opportunity_id: Uuid,
    applicant_id: Uuid,
    status: String,
    is_qualified: bool,
    qualification_date: Option<DateTime<Utc>>,
    in_interview_queue: bool,
    queue_position: Option<i32>,
    joined_queue_at: Option<DateTime<Utc>>,
    notes: String,
    feedback: Option<String>,
    documents: Json<Vec<DocumentRef>>,
    custom_answers: Json<BTreeMap<String, String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for Application {
    type Error = StoreError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ApplicationId(row.id),
            opportunity_id: OpportunityId(row.opportunity_id),
            applicant_id: UserId(row.applicant_id),
            status: decode("status", &row.status, ApplicationStatus::parse)?,
            is_qualified: row.is_qualified,
            qualification_date: row.qualification_date,
            in_interview_queue: row.in_interview_queue,
            queue_position: position_from_row(row.queue_position),
            joined_queue_at: row.joined_queue_at,
            notes: row.notes,
            feedback: row.feedback,
            documents: row.documents.0,
            custom_answers: row.custom_answers.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AssessmentRow {
    id: Uuid,
    opportunity_id: Uuid,
    applicant_id: Uuid,
    status: String,
    eligibility_score: i16,
    eligibility_feedback: String,
    mock_application_completed: bool,
    mock_application_score: Option<i16>,
    mock_application_feedback: Option<String>,
    mock_application_data: Option<Json<Map<String, Value>>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn score_from_row(raw: i16) -> u8 {
    raw.clamp(0, 100) as u8
}

impl TryFrom<AssessmentRow> for ReadinessAssessment {
    type Error = StoreError;

    fn try_from(row: AssessmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AssessmentId(row.id),
            opportunity_id: OpportunityId(row.opportunity_id),
            applicant_id: UserId(row.applicant_id),
            status: decode("status", &row.status, AssessmentStatus::parse)?,
            eligibility_score: score_from_row(row.eligibility_score),
            eligibility_feedback: row.eligibility_feedback,
            mock_application_completed: row.mock_application_completed,
            mock_application_score: row.mock_application_score.map(score_from_row),
            mock_application_feedback: row.mock_application_feedback,
            mock_application_data: row.mock_application_data.map(|data| data.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn fetch_user(&self, id: UserId) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("fetch_user", err))?;
        row.map(UserProfile::try_from).transpose()
    }

    async fn insert_user(&self, user: UserProfile) -> Result<UserProfile, StoreError> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.role.label())
        .bind(Json(&user.kyc))
        .bind(Json(&user.details))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::Conflict("user already exists")
            } else {
                map_sqlx_error("insert_user", err)
            }
        })?;
        Ok(user)
    }

    async fn update_user(&self, user: UserProfile) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, full_name = $3, role = $4, kyc = $5, details = $6, \
             updated_at = $7 WHERE id = $1",
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.role.label())
        .bind(Json(&user.kyc))
        .bind(Json(&user.details))
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("update_user", err))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }
}

#[async_trait]
impl OpportunityStore for PgStore {
    async fn insert_opportunity(
        &self,
        opportunity: Opportunity,
    ) -> Result<Opportunity, StoreError> {
        sqlx::query(&format!(
            "INSERT INTO opportunities ({OPPORTUNITY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"
        ))
        .bind(opportunity.id.as_uuid())
        .bind(opportunity.owner_id.as_uuid())
        .bind(&opportunity.title)
        .bind(&opportunity.organization_name)
        .bind(opportunity.kind.label())
        .bind(&opportunity.description)
        .bind(Json(&opportunity.requirements))
        .bind(&opportunity.location)
        .bind(opportunity.deadline)
        .bind(opportunity.status.label())
        .bind(Json(&opportunity.custom_fields))
        .bind(opportunity.created_at)
        .bind(opportunity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::Conflict("opportunity already exists")
            } else {
                map_sqlx_error("insert_opportunity", err)
            }
        })?;
        Ok(opportunity)
    }

    async fn update_opportunity(&self, opportunity: Opportunity) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE opportunities SET title = $2, organization_name = $3, kind = $4, \
             description = $5, requirements = $6, location = $7, deadline = $8, status = $9, \
             custom_fields = $10, updated_at = $11 WHERE id = $1",
        )
        .bind(opportunity.id.as_uuid())
        .bind(&opportunity.title)
        .bind(&opportunity.organization_name)
        .bind(opportunity.kind.label())
        .bind(&opportunity.description)
        .bind(Json(&opportunity.requirements))
        .bind(&opportunity.location)
        .bind(opportunity.deadline)
        .bind(opportunity.status.label())
        .bind(Json(&opportunity.custom_fields))
        .bind(opportunity.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("update_opportunity", err))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("opportunity"));
        }
        Ok(())
    }

    async fn fetch_opportunity(
        &self,
        id: OpportunityId,
    ) -> Result<Option<Opportunity>, StoreError> {
        let row = sqlx::query_as::<_, OpportunityRow>(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("fetch_opportunity", err))?;
        row.map(Opportunity::try_from).transpose()
    }

    async fn delete_opportunity(&self, id: OpportunityId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM opportunities WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|err| map_sqlx_error("delete_opportunity", err))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("opportunity"));
        }
        Ok(())
    }

    async fn list_opportunities(
        &self,
        filter: &OpportunityFilter,
    ) -> Result<Vec<Opportunity>, StoreError> {
        let rows = sqlx::query_as::<_, OpportunityRow>(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities \
             WHERE ($1 OR status = 'open') \
               AND ($2::TEXT IS NULL OR kind = $2) \
               AND ($3::TEXT IS NULL OR title ILIKE $3 OR description ILIKE $3 \
                    OR organization_name ILIKE $3) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.include_closed)
        .bind(filter.kind.map(OpportunityKind::label))
        .bind(filter.search_term().as_deref().map(like_pattern))
        .fetch_all(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("list_opportunities", err))?;
        rows.into_iter().map(Opportunity::try_from).collect()
    }
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, StoreError> {
        sqlx::query(&format!(
            "INSERT INTO applications ({APPLICATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(application.id.as_uuid())
        .bind(application.opportunity_id.as_uuid())
        .bind(application.applicant_id.as_uuid())
        .bind(application.status.label())
        .bind(application.is_qualified)
        .bind(application.qualification_date)
        .bind(application.in_interview_queue)
        .bind(application.queue_position.map(|position| position as i32))
        .bind(application.joined_queue_at)
        .bind(&application.notes)
        .bind(&application.feedback)
        .bind(Json(&application.documents))
        .bind(Json(&application.custom_answers))
        .bind(application.created_at)
        .bind(application.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::Conflict("application already exists")
            } else {
                map_sqlx_error("insert_application", err)
            }
        })?;
        Ok(application)
    }

    async fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("fetch_application", err))?;
        row.map(Application::try_from).transpose()
    }

    async fn fetch_application_for(
        &self,
        opportunity_id: OpportunityId,
        applicant_id: UserId,
    ) -> Result<Option<Application>, StoreError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE opportunity_id = $1 AND applicant_id = $2"
        ))
        .bind(opportunity_id.as_uuid())
        .bind(applicant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("fetch_application_for", err))?;
        row.map(Application::try_from).transpose()
    }

    async fn patch_application(
        &self,
        id: ApplicationId,
        patch: ApplicationPatch,
        now: DateTime<Utc>,
    ) -> Result<Application, StoreError> {
        let assignments = match &patch {
            ApplicationPatch::Notes(_) => "notes = $3",
            ApplicationPatch::Documents(_) => "documents = $3",
            ApplicationPatch::Qualify => {
                "is_qualified = TRUE, qualification_date = COALESCE(qualification_date, $2)"
            }
            ApplicationPatch::Status(_) => "status = $3",
            ApplicationPatch::Feedback(_) => "feedback = $3",
        };
        let sql = format!(
            "UPDATE applications SET {assignments}, updated_at = $2 WHERE id = $1 \
             RETURNING {APPLICATION_COLUMNS}"
        );
        let query = sqlx::query_as::<_, ApplicationRow>(&sql)
            .bind(id.as_uuid())
            .bind(now);
        let query = match patch {
            ApplicationPatch::Notes(notes) => query.bind(notes),
            ApplicationPatch::Documents(documents) => query.bind(Json(documents)),
            ApplicationPatch::Qualify => query,
            ApplicationPatch::Status(status) => query.bind(status.label()),
            ApplicationPatch::Feedback(feedback) => query.bind(feedback),
        };
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_sqlx_error("patch_application", err))?
            .ok_or(StoreError::NotFound("application"))?;
        Application::try_from(row)
    }

    async fn applications_for_opportunity(
        &self,
        opportunity_id: OpportunityId,
    ) -> Result<Vec<Application>, StoreError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE opportunity_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(opportunity_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("applications_for_opportunity", err))?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn applications_for_applicant(
        &self,
        applicant_id: UserId,
    ) -> Result<Vec<Application>, StoreError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE applicant_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(applicant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("applications_for_applicant", err))?;
        rows.into_iter().map(Application::try_from).collect()
    }

    async fn interview_queue(
        &self,
        opportunity_id: OpportunityId,
    ) -> Result<Vec<Application>, StoreError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications \
             WHERE opportunity_id = $1 AND in_interview_queue ORDER BY queue_position"
        ))
        .bind(opportunity_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("interview_queue", err))?;
        rows.into_iter().map(Application::try_from).collect()
    }

    #[instrument(skip(self), fields(application_id = %id), err)]
    async fn transition_queue(
        &self,
        id: ApplicationId,
        transition: QueueTransition,
        now: DateTime<Utc>,
    ) -> Result<Option<Application>, TransitionError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| map_sqlx_error("begin_transaction", err))?;

        let opportunity_id: Uuid =
            sqlx::query_scalar("SELECT opportunity_id FROM applications WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|err| map_sqlx_error("locate_application", err))?
                .ok_or(StoreError::NotFound("application"))?;

        // Serializes every queue transition of this opportunity.
        sqlx::query("SELECT id FROM opportunities WHERE id = $1 FOR UPDATE")
            .bind(opportunity_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|err| map_sqlx_error("lock_opportunity", err))?
            .ok_or(StoreError::NotFound("opportunity"))?;

        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|err| map_sqlx_error("fetch_application", err))?
        .ok_or(StoreError::NotFound("application"))?;
        let mut application = Application::try_from(row)?;

        let members: Vec<(Uuid, Option<i32>)> = sqlx::query_as(
            "SELECT id, queue_position FROM applications \
             WHERE opportunity_id = $1 AND in_interview_queue",
        )
        .bind(opportunity_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|err| map_sqlx_error("load_queue", err))?;
        let mut queue = InterviewQueue::from_members(members.into_iter().filter_map(
            |(member, position)| {
                position_from_row(position).map(|position| (ApplicationId(member), position))
            },
        ));

        apply_transition(&mut queue, &mut application, transition, now)?;

        if transition == QueueTransition::Withdraw {
            sqlx::query("DELETE FROM applications WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|err| map_sqlx_error("withdraw_application", err))?;
        } else {
            sqlx::query(
                "UPDATE applications SET is_qualified = $2, qualification_date = $3, \
                 in_interview_queue = $4, queue_position = $5, joined_queue_at = $6, \
                 updated_at = $7 WHERE id = $1",
            )
            .bind(id.as_uuid())
            .bind(application.is_qualified)
            .bind(application.qualification_date)
            .bind(application.in_interview_queue)
            .bind(application.queue_position.map(|position| position as i32))
            .bind(application.joined_queue_at)
            .bind(application.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|err| map_sqlx_error("update_queue_membership", err))?;
        }

        sqlx::query(RENUMBER_QUEUE)
            .bind(opportunity_id)
            .execute(&mut *tx)
            .await
            .map_err(|err| map_sqlx_error("renumber_queue", err))?;

        tx.commit()
            .await
            .map_err(|err| map_sqlx_error("commit_transaction", err))?;

        Ok((transition != QueueTransition::Withdraw).then_some(application))
    }
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn insert_assessment(
        &self,
        assessment: ReadinessAssessment,
    ) -> Result<ReadinessAssessment, StoreError> {
        sqlx::query(&format!(
            "INSERT INTO readiness_assessments ({ASSESSMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(assessment.id.as_uuid())
        .bind(assessment.opportunity_id.as_uuid())
        .bind(assessment.applicant_id.as_uuid())
        .bind(assessment.status.label())
        .bind(i16::from(assessment.eligibility_score))
        .bind(&assessment.eligibility_feedback)
        .bind(assessment.mock_application_completed)
        .bind(assessment.mock_application_score.map(i16::from))
        .bind(&assessment.mock_application_feedback)
        .bind(assessment.mock_application_data.as_ref().map(Json))
        .bind(assessment.created_at)
        .bind(assessment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::Conflict("assessment already exists")
            } else {
                map_sqlx_error("insert_assessment", err)
            }
        })?;
        Ok(assessment)
    }

    async fn update_assessment(&self, assessment: ReadinessAssessment) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE readiness_assessments SET status = $2, eligibility_score = $3, \
             eligibility_feedback = $4, mock_application_completed = $5, \
             mock_application_score = $6, mock_application_feedback = $7, \
             mock_application_data = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(assessment.id.as_uuid())
        .bind(assessment.status.label())
        .bind(i16::from(assessment.eligibility_score))
        .bind(&assessment.eligibility_feedback)
        .bind(assessment.mock_application_completed)
        .bind(assessment.mock_application_score.map(i16::from))
        .bind(&assessment.mock_application_feedback)
        .bind(assessment.mock_application_data.as_ref().map(Json))
        .bind(assessment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("update_assessment", err))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("assessment"));
        }
        Ok(())
    }

    async fn fetch_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Option<ReadinessAssessment>, StoreError> {
        let row = sqlx::query_as::<_, AssessmentRow>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM readiness_assessments WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("fetch_assessment", err))?;
        row.map(ReadinessAssessment::try_from).transpose()
    }

    async fn fetch_assessment_for(
        &self,
        opportunity_id: OpportunityId,
        applicant_id: UserId,
    ) -> Result<Option<ReadinessAssessment>, StoreError> {
        let row = sqlx::query_as::<_, AssessmentRow>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM readiness_assessments \
             WHERE opportunity_id = $1 AND applicant_id = $2"
        ))
        .bind(opportunity_id.as_uuid())
        .bind(applicant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error("fetch_assessment_for", err))?;
        row.map(ReadinessAssessment::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_splits_into_idempotent_statements() {
        let statements: Vec<_> = schema_statements().collect();
        assert!(statements.len() >= 5);
        assert!(statements
            .iter()
            .all(|statement| statement.contains("IF NOT EXISTS")));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("rust"), "%rust%");
    }

    #[test]
    fn negative_positions_are_discarded() {
        assert_eq!(position_from_row(Some(3)), Some(3));
        assert_eq!(position_from_row(Some(-1)), None);
        assert_eq!(position_from_row(None), None);
    }
}
