//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the concrete adapters from a validated configuration
//! - Wire them into a [`FailoverController`]
//! - Resolve the initial holder
//!
//! # Design Decisions
//! - Configuration is validated before this point; only adapter
//!   construction can fail here

use std::sync::Arc;

use thiserror::Error;

use crate::alert::SendmailMailer;
use crate::config::FailoverConfig;
use crate::failover::{Collaborators, FailoverController, HttpVerifier};
use crate::health::MtrMeasurer;
use crate::remote::SshExecutor;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to build HTTP verifier: {0}")]
    Verifier(#[from] reqwest::Error),
}

/// Production adapters for `config`.
pub fn collaborators(config: &FailoverConfig) -> Result<Collaborators, StartupError> {
    let timeout = config.check_timeout();
    let ssh = Arc::new(SshExecutor::new(config.ssh_opts.clone(), timeout));
    let measurer = Arc::new(MtrMeasurer::new(
        ssh.clone(),
        config.network_health_check.report_cycles,
    ));
    let verifier = Arc::new(HttpVerifier::new()?);
    let mailer = Arc::new(SendmailMailer::new(
        config.alerting.sendmail_path.clone(),
        config.alerting.from.clone(),
        timeout,
    ));

    Ok(Collaborators {
        measurer,
        executor: ssh,
        verifier,
        mailer,
    })
}

/// Build the controller and resolve who holds the failover IP.
pub async fn build_controller(config: &FailoverConfig) -> Result<FailoverController, StartupError> {
    let deps = collaborators(config)?;
    let mut controller = FailoverController::new(config, deps);

    tracing::info!(
        failover_ip = %config.failover_ip,
        server_a = %config.server_a.ip,
        server_b = %config.server_b.ip,
        check_ip = %config.network_health_check.check_ip,
        state_file = ?config.controller.state_file,
        "Starting failover controller"
    );
    controller.initialize().await;
    Ok(controller)
}
