//! Provision the first admin account.
//!
//! Runs in-process as the system actor, so it works before any admin exists.
//! The attempt is audited with origin `service`.

use anyhow::Context;
use clap::Parser;

use lexportal_api::app::services::AppServices;
use lexportal_infra::AppConfig;
use lexportal_observability::LogConfig;
use lexportal_provisioning::{AuditDispatch, AuditOrigin, Caller, NewAccountRequest, Password};

#[derive(Parser)]
#[command(name = "bootstrap-admin", about = "Create an admin account in both stores")]
struct Args {
    /// Email address of the new admin.
    #[arg(long)]
    email: String,

    #[arg(long)]
    full_name: String,

    /// Read from the environment so it stays out of shell history.
    #[arg(long, env = "LEXPORTAL_BOOTSTRAP_PASSWORD", hide_env_values = true)]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    // The process exits right after; a detached write could be lost.
    config.provisioning.audit_dispatch = AuditDispatch::Inline;

    lexportal_observability::init(&LogConfig {
        json: config.log.json,
        ..LogConfig::default()
    });

    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialize stores")?;

    let request = NewAccountRequest {
        email: args.email,
        password: Password::new(args.password),
        full_name: args.full_name,
        role: "admin".to_string(),
        staff_role: None,
    };

    let account = services
        .provisioning()
        .provision_account(&Caller::System, AuditOrigin::Service, &request)
        .await
        .context("failed to provision admin account")?;

    tracing::info!(account_id = %account.id, email = %account.email, "admin account provisioned");
    println!("{}", account.id);
    Ok(())
}
