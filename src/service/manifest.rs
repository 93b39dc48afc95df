//! Statically known services.
//!
//! Every service the binary can run is listed here. Adding a service means
//! adding a line to [`builtin_services`].

use std::sync::Arc;

use super::{LoggerService, Service};
use crate::bus::MessageBus;
use crate::environment::Environment;

/// The built-in services, keyed by the name used under `Services.<name>`.
pub fn builtin_services(bus: Arc<dyn MessageBus>) -> Vec<(&'static str, Arc<dyn Service>)> {
    vec![(LoggerService::NAME, Arc::new(LoggerService::new(bus)))]
}

/// Register every built-in service with the environment's registry.
///
/// Call after the message bus has been wired in.
pub fn register_builtin(env: &Environment) {
    for (name, service) in builtin_services(env.bus().clone()) {
        env.register_service(name, service);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::NullMessageBus;

    #[test]
    fn test_manifest_lists_logger() {
        let names: Vec<_> = builtin_services(Arc::new(NullMessageBus))
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["Logger"]);
    }

    #[test]
    fn test_register_builtin() {
        let env = Environment::new([]);
        register_builtin(&env);
        assert!(env.get_service("Logger").is_some());
        assert_eq!(env.all_services().len(), 1);
    }
}
