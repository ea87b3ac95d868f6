use astra::applications::{ApplicationSubmission, ApplicationUpdate};
use astra::error::{AppError, DomainError};
use astra::identity::{KycSubmission, Principal, Role, TokenClaims};
use astra::ids::ApplicationId;
use astra::inference::DisabledInference;
use astra::opportunities::{NewOpportunity, Opportunity, OpportunityKind};
use astra::store::InMemoryStore;
use astra::Astra;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const NAMES: [&str; 12] = [
    "ada", "bayo", "chidi", "dede", "efua", "femi", "gift", "halima", "ife", "jomo", "kofi",
    "lerato",
];

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of applicants joining the interview queue
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(2..=12))]
    pub(crate) applicants: u8,
    /// 1-based queue position of the applicant who leaves
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=12))]
    pub(crate) leaver: u8,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let applicants = usize::from(args.applicants);
    let leaver = usize::from(args.leaver).min(applicants);
    let astra = Astra::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(DisabledInference),
        Duration::from_secs(1),
    );

    println!("Astra interview queue demo");
    let org = organization(&astra).await?;
    let opportunity = astra
        .opportunities
        .create(
            &org,
            NewOpportunity {
                title: "Robotics Residency".to_string(),
                organization_name: None,
                kind: OpportunityKind::Program,
                description: "Twelve weeks building field robots with mentors.".to_string(),
                requirements: vec!["Basic Python".to_string()],
                location: Some("Kampala".to_string()),
                deadline: None,
                custom_fields: Vec::new(),
            },
        )
        .await
        .map_err(step("publish opportunity"))?;
    println!(
        "- {} published \"{}\"",
        opportunity.organization_name, opportunity.title
    );

    let mut queued = Vec::with_capacity(applicants);
    for name in NAMES.iter().take(applicants) {
        let applicant = individual(&astra, name).await?;
        let application = astra
            .applications
            .apply(&applicant, opportunity.id, ApplicationSubmission::default())
            .await
            .map_err(step("apply"))?;
        astra
            .applications
            .update(&org, application.id, ApplicationUpdate::Qualify)
            .await
            .map_err(step("qualify"))?;
        let joined = astra
            .applications
            .update(&applicant, application.id, ApplicationUpdate::JoinQueue)
            .await
            .map_err(step("join queue"))?;
        println!(
            "- {name} joined the queue at position {}",
            joined.queue_position.unwrap_or_default()
        );
        queued.push((name, applicant, application.id));
    }

    let (name, applicant, application_id) = &queued[leaver - 1];
    astra
        .applications
        .update(applicant, *application_id, ApplicationUpdate::LeaveQueue)
        .await
        .map_err(step("leave queue"))?;
    println!("- {name} left the queue");

    print_queue(&astra, &org, &opportunity, &queued).await?;

    let (name, applicant, _) = &queued[0];
    let assessed = astra
        .readiness
        .assess_eligibility(applicant, opportunity.id)
        .await
        .map_err(step("readiness assessment"))?;
    let assessment = assessed.assessment();
    println!(
        "\nReadiness for {name}: score {} (inference disabled, fallback applied)",
        assessment.eligibility_score
    );
    println!("{}", assessment.eligibility_feedback);
    Ok(())
}

async fn print_queue(
    astra: &Astra<InMemoryStore>,
    org: &Principal,
    opportunity: &Opportunity,
    queued: &[(&&str, Principal, ApplicationId)],
) -> Result<(), AppError> {
    let view = astra
        .applications
        .interview_queue(org, opportunity.id)
        .await
        .map_err(step("view queue"))?;
    println!("\nInterview queue ({} waiting)", view.total);
    for entry in &view.entries {
        let name = queued
            .iter()
            .find(|(_, _, id)| *id == entry.application_id)
            .map_or("unknown", |(name, _, _)| **name);
        println!("  {}. {name}", entry.position);
    }
    Ok(())
}

async fn organization(astra: &Astra<InMemoryStore>) -> Result<Principal, AppError> {
    let principal = individual(astra, "kestrel").await?;
    let principal = astra
        .identity
        .switch_role(&principal, Role::Organization)
        .await
        .map_err(step("switch role"))?
        .principal();
    let profile = astra
        .identity
        .submit_kyc(
            &principal,
            KycSubmission {
                organization_name: "Kestrel Labs".to_string(),
                registration_number: "KL-301".to_string(),
                country: "Uganda".to_string(),
                contact_email: "ops@kestrel.example".to_string(),
                website: None,
                documents: Vec::new(),
            },
        )
        .await
        .map_err(step("submit kyc"))?;
    Ok(profile.principal())
}

async fn individual(astra: &Astra<InMemoryStore>, name: &str) -> Result<Principal, AppError> {
    let claims = TokenClaims {
        sub: Uuid::now_v7(),
        email: Some(format!("{name}@example.org")),
        exp: u64::MAX,
    };
    astra
        .identity
        .resolve_principal(&claims)
        .await
        .map_err(step("provision user"))
}

fn step(label: &'static str) -> impl Fn(DomainError) -> AppError {
    move |err| AppError::Server(format!("demo step '{label}' failed: {err}"))
}
