//! Supervises server launch sequencing.

use std::sync::Arc;

use tracing::{error, info};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::server::Server;
use crate::services::{ConfiguredServiceFactory, SharedServices};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to launch the server.
pub(crate) struct LaunchPlan<L, S> {
    pub(crate) loader: L,
    pub(crate) reporter: Arc<dyn HealthReporter>,
    pub(crate) shutdown: S,
}

/// Runs the server using the production collaborators until a termination
/// signal arrives.
///
/// # Errors
///
/// Returns an error when configuration or telemetry fails, when the listen
/// address cannot be bound, or when signal handlers cannot be installed.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal,
    })
}

/// Runs the server with injected collaborators.
pub(crate) fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
    } = plan;

    let daemon = bootstrap_with(&loader, reporter)?;
    let config = daemon.config();
    let services =
        SharedServices::install_global(ConfiguredServiceFactory::new(config.data_dir()));

    let server = Server::bind(config, services).inspect_err(|error| {
        error!(
            target: PROCESS_TARGET,
            listen = %config.listen(),
            address_in_use = error.is_address_in_use(),
            %error,
            "failed to bind listen address"
        );
    })?;
    let running = daemon.start(server)?;
    shutdown.wait()?;
    daemon.stop(running)?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
