pub mod event_info;
pub mod manager;
pub mod trace;
pub mod traits;

pub use event_info::EventInfoPlugin;
pub use manager::DefaultPluginManager;
pub use trace::TracePlugin;
pub use traits::{HookPoint, Plugin, PluginManager};

use std::sync::Arc;

use crate::config::Config;

/// Bundled plugins switched on in the config.
pub fn create_plugins(config: &Config) -> Vec<Arc<dyn Plugin>> {
    let mut plugins: Vec<Arc<dyn Plugin>> = Vec::new();
    if config.plugins.trace.enabled {
        plugins.push(Arc::new(TracePlugin::new(config.plugins.trace.auto_measure)));
    }
    if config.plugins.event_info.enabled {
        plugins.push(Arc::new(EventInfoPlugin::new(true)));
    }
    plugins
}

/// Create the default plugin manager instance.
pub fn create_plugin_manager(plugins: Vec<Arc<dyn Plugin>>) -> Box<dyn PluginManager> {
    Box::new(DefaultPluginManager::new(plugins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_plugins_by_default() {
        assert!(create_plugins(&Config::default()).is_empty());
    }

    #[test]
    fn config_switches_on_bundled_plugins() {
        let mut config = Config::default();
        config.plugins.trace.enabled = true;
        config.plugins.event_info.enabled = true;
        let manager = create_plugin_manager(create_plugins(&config));
        assert_eq!(manager.list_plugins(), vec!["trace", "event-info"]);
    }
}
