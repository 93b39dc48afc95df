//! The `server` command: wire the environment, start services, wait for a
//! signal, shut down.

use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::bus::LocalBus;
use crate::config::{ConfigStore, ConfigWatcher, LoadedConfig};
use crate::environment::{EnvOption, Environment};
use crate::error::CasaError;
use crate::lifecycle::{OsSignalHandler, ShutdownCoordinator, StartupOrchestrator};
use crate::observability::{BrokerLogFilter, TracingLogger};
use crate::service::manifest;

/// Build the runtime. `cores == 0` uses every available core.
pub fn build_runtime(cores: usize) -> std::io::Result<Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if cores > 0 {
        builder.worker_threads(cores);
    }
    builder.enable_all().build()
}

/// Run the supervisor until a shutdown signal has been handled.
///
/// Returns the process exit status.
pub async fn run(loaded: LoadedConfig) -> Result<i32, CasaError> {
    let store = Arc::new(ConfigStore::new(loaded.config));

    let mut env = Environment::new([
        EnvOption::Logger(Arc::new(TracingLogger)),
        EnvOption::Config(store.clone()),
        EnvOption::SignalHandler(Arc::new(OsSignalHandler)),
    ]);

    let filter = BrokerLogFilter::new(env.logger().clone());
    let bus = LocalBus::bind_with_logger(&store.load().mqtt, Arc::new(filter))?;
    env.with_options([EnvOption::Bus(Arc::new(bus))]);
    manifest::register_builtin(&env);

    let _watcher = match ConfigWatcher::new(&loaded.path, store.clone()).run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, changes need a restart");
            None
        }
    };

    let env = Arc::new(env);
    serve(env, StartupOrchestrator::new()).await
}

/// Start services, wait for a signal, then shut down.
///
/// A signal during startup abandons the startup pass before any service is
/// stopped, so nothing is started once shutdown has begun. Starts already in
/// flight are told through the shutdown broadcast.
pub async fn serve(env: Arc<Environment>, startup: StartupOrchestrator) -> Result<i32, CasaError> {
    let coordinator = ShutdownCoordinator::new();
    let signal = env.signal_handler().wait();
    tokio::pin!(signal);

    let early = tokio::select! {
        signal = &mut signal => Some(signal),
        _ = startup.start_all(&env) => None,
    };

    let signal = match early {
        Some(signal) => signal,
        None => {
            tracing::info!("Startup finished, waiting for shutdown signal");
            signal.await
        }
    };

    let report = coordinator.on_signal(&env, signal).await;
    Ok(report.exit_code())
}
