//! Operational entry point for the approval workflow engine
//!
//! Wires configuration, the database context and the engine together, and
//! exposes inspection commands for operators. The request-facing API
//! surface (HTTP routing, validation) lives outside this repository and
//! calls into approval-core directly.

use anyhow::{anyhow, Context};
use approval_core::store::config_store;
use approval_core::{
    ApprovalEngine, ContextProvider, CounterReferenceGenerator, ServiceConfig, StaticContext,
};
use approval_types::{
    Actor, AssetTypeId, DepartmentId, EmployeeId, HeaderId, HeaderStatus, JobRoleId,
    OperationKind, OrgId, StepId,
};
use clap::{Arg, ArgAction, Command};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("approval-server")
        .version("1.0.0")
        .about("Asset approval workflow engine")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/app/config/approval.json"),
        )
        .arg(
            Arg::new("database-url")
                .long("database-url")
                .value_name("URL")
                .help("Database url, overriding the config file"),
        )
        .arg(
            Arg::new("migrate")
                .long("migrate")
                .help("Run database migrations and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("status")
                .long("status")
                .value_name("HEADER_ID")
                .help("Print the status of one workflow"),
        )
        .arg(
            Arg::new("history")
                .long("history")
                .value_name("HEADER_ID")
                .help("Print the audit history of one workflow"),
        )
        .arg(
            Arg::new("counts")
                .long("counts")
                .help("Print workflow counts per status for --org")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check-required")
                .long("check-required")
                .help("Check whether --asset-type requires approval in --org")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("pending")
                .long("pending")
                .help("List pending approvals for --employee/--job-role in --org")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("sequences")
                .long("sequences")
                .help("List configured approval sequences")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("grants")
                .long("grants")
                .help("List configured step grants")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("step")
                .long("step")
                .value_name("STEP_ID")
                .help("Step id filter for --grants"),
        )
        .arg(
            Arg::new("org")
                .long("org")
                .value_name("ORG_ID")
                .help("Organization id for queries"),
        )
        .arg(
            Arg::new("asset-type")
                .long("asset-type")
                .value_name("ASSET_TYPE_ID")
                .help("Asset type id for queries"),
        )
        .arg(
            Arg::new("operation")
                .long("operation")
                .value_name("KIND")
                .help("Operation kind filter (MAINTENANCE, SCRAP, SCRAP_SALE)"),
        )
        .arg(
            Arg::new("employee")
                .long("employee")
                .value_name("EMPLOYEE_ID")
                .help("Acting employee id for --pending"),
        )
        .arg(
            Arg::new("job-role")
                .long("job-role")
                .value_name("JOB_ROLE_ID")
                .help("Acting job role for --pending"),
        )
        .arg(
            Arg::new("department")
                .long("department")
                .value_name("DEPARTMENT_ID")
                .help("Acting department for --pending"),
        )
        .get_matches();

    let config = match matches.get_one::<String>("database-url") {
        Some(url) => ServiceConfig::from_database_url(url.as_str()),
        None => {
            let path = matches.get_one::<String>("config").unwrap();
            ServiceConfig::from_file(path)
                .with_context(|| format!("failed to load configuration from {}", path))?
        }
    };

    let context = Arc::new(
        StaticContext::connect(&config.database)
            .await
            .context("failed to open the approval database")?,
    );

    if matches.get_flag("migrate") {
        // StaticContext::connect already migrated when configured to;
        // an explicit --migrate run is the operator's no-op safety check.
        let pool = context.pool().await?;
        approval_core::run_migrations(&pool).await?;
        log::info!("Migrations are up to date");
        return Ok(());
    }

    let numbering = Arc::new(CounterReferenceGenerator::from_config(&config.numbering));
    let engine = ApprovalEngine::new(context.clone(), numbering);

    if let Some(header_id) = matches.get_one::<String>("status") {
        let header_id = HeaderId::from_string(header_id).map_err(|e| anyhow!(e))?;
        let status = engine.header_status(&header_id).await?;
        println!("{}", status);
        return Ok(());
    }

    if let Some(header_id) = matches.get_one::<String>("history") {
        let header_id = HeaderId::from_string(header_id).map_err(|e| anyhow!(e))?;
        for entry in engine.history(&header_id).await? {
            let detail = entry
                .detail_id
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{}  {:<14}  actor={}  detail={}  note={}",
                entry.recorded_at,
                entry.action.as_str(),
                entry.actor,
                detail,
                entry.note.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    }

    if matches.get_flag("counts") {
        let org = require_org(&matches)?;
        let counts = engine.status_counts(&org).await?;
        for status in [
            HeaderStatus::Initiated,
            HeaderStatus::InProgress,
            HeaderStatus::Completed,
            HeaderStatus::Cancelled,
        ] {
            println!("{:<12} {}", status.as_str(), counts.get(status));
        }
        println!("{:<12} {}", "TOTAL", counts.total());
        return Ok(());
    }

    if matches.get_flag("check-required") {
        let org = require_org(&matches)?;
        let asset_type = matches
            .get_one::<String>("asset-type")
            .map(|a| AssetTypeId::new(a.as_str()))
            .ok_or_else(|| anyhow!("--check-required needs --asset-type"))?;
        let required = engine.is_workflow_required(&asset_type, &org).await?;
        println!("{}", if required { "required" } else { "bypassed" });
        return Ok(());
    }

    if matches.get_flag("pending") {
        let org = require_org(&matches)?;
        let employee = matches
            .get_one::<String>("employee")
            .map(|e| EmployeeId::new(e.as_str()))
            .ok_or_else(|| anyhow!("--pending needs --employee"))?;
        let job_role = matches
            .get_one::<String>("job-role")
            .map(|r| JobRoleId::new(r.as_str()))
            .ok_or_else(|| anyhow!("--pending needs --job-role"))?;

        let mut actor = Actor::new(employee, job_role);
        if let Some(department) = matches.get_one::<String>("department") {
            actor = actor.in_department(DepartmentId::new(department.as_str()));
        }

        for pending in engine.pending_for_actor(&org, &actor).await? {
            println!(
                "{}  {}  seq={}  step={}  subject={}  detail={}",
                pending.workflow_no,
                pending.operation,
                pending.sequence_no,
                pending.step_id,
                pending.subject,
                pending.detail_id
            );
        }
        return Ok(());
    }

    if matches.get_flag("sequences") {
        let asset_type = matches
            .get_one::<String>("asset-type")
            .map(|a| AssetTypeId::new(a.as_str()));
        let operation = matches
            .get_one::<String>("operation")
            .map(|code| OperationKind::parse(code))
            .transpose()
            .map_err(|e| anyhow!("unknown operation kind: {}", e))?;

        let pool = context.pool().await?;
        let mut conn = pool.acquire().await?;
        let rows =
            config_store::list_sequences(&mut *conn, asset_type.as_ref(), operation).await?;
        for row in rows {
            println!(
                "{}  {}  {}  seq={}  step={}",
                row.org_id, row.asset_type_id, row.operation, row.sequence_no, row.step_id
            );
        }
        return Ok(());
    }

    if matches.get_flag("grants") {
        let step = matches.get_one::<String>("step").map(|s| StepId::new(s.as_str()));
        let job_role = matches
            .get_one::<String>("job-role")
            .map(|r| JobRoleId::new(r.as_str()));

        let pool = context.pool().await?;
        let mut conn = pool.acquire().await?;
        let rows = config_store::list_grants(&mut *conn, step.as_ref(), job_role.as_ref()).await?;
        for row in rows {
            println!(
                "step={}  role={}  department={}  employee={}",
                row.step_id,
                row.grant.job_role,
                row.grant
                    .department
                    .as_ref()
                    .map(|d| d.as_str())
                    .unwrap_or("*"),
                row.grant
                    .employee
                    .as_ref()
                    .map(|e| e.as_str())
                    .unwrap_or("*")
            );
        }
        return Ok(());
    }

    log::info!("No command given; database is reachable and migrated. See --help.");
    Ok(())
}

fn require_org(matches: &clap::ArgMatches) -> anyhow::Result<OrgId> {
    matches
        .get_one::<String>("org")
        .map(|org| OrgId::new(org.as_str()))
        .ok_or_else(|| anyhow!("this command needs --org"))
}
