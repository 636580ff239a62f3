use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{HookPoint, Plugin, PluginManager};
use crate::agent::context::InvocationContext;
use crate::agent::traits::Outcome;
use crate::config::Config;
use crate::report::{PluginMeta, Report};

/// Default in-process plugin manager.
///
/// Plugins are unique by name; a later registration replaces an earlier one
/// in place. Hooks run in registration order over enabled plugins only.
pub struct DefaultPluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl DefaultPluginManager {
    pub fn new(plugins: impl IntoIterator<Item = Arc<dyn Plugin>>) -> Self {
        let mut unique: Vec<Arc<dyn Plugin>> = Vec::new();
        for plugin in plugins {
            if let Some(slot) = unique.iter_mut().find(|p| p.name() == plugin.name()) {
                tracing::debug!(plugin = plugin.name(), "Replacing duplicate plugin");
                *slot = plugin;
            } else {
                unique.push(plugin);
            }
        }
        Self { plugins: unique }
    }

    fn active(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter().filter(|p| p.enabled())
    }
}

impl Default for DefaultPluginManager {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

fn log_hook_error(hook: HookPoint, plugin: &dyn Plugin, err: &anyhow::Error) {
    tracing::error!(
        plugin = plugin.name(),
        hook = hook.as_str(),
        "Plugin hook failed: {err:#}"
    );
}

#[async_trait]
impl PluginManager for DefaultPluginManager {
    fn list_plugins(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    fn meta(&self) -> Vec<PluginMeta> {
        self.plugins.iter().map(|p| p.meta()).collect()
    }

    async fn pre_setup(&self, config: &mut Config) {
        for plugin in self.active() {
            if let Err(e) = plugin.pre_setup(config).await {
                log_hook_error(HookPoint::PreSetup, plugin.as_ref(), &e);
            }
        }
    }

    async fn post_setup(&self, config: &Config) {
        for plugin in self.active() {
            if let Err(e) = plugin.post_setup(config).await {
                log_hook_error(HookPoint::PostSetup, plugin.as_ref(), &e);
            }
        }
    }

    async fn pre_invoke(&self, event: &serde_json::Value, ctx: &InvocationContext) {
        for plugin in self.active() {
            if let Err(e) = plugin.pre_invoke(event, ctx).await {
                log_hook_error(HookPoint::PreInvoke, plugin.as_ref(), &e);
            }
        }
    }

    async fn post_invoke(&self, event: &serde_json::Value, ctx: &InvocationContext) {
        for plugin in self.active() {
            if let Err(e) = plugin.post_invoke(event, ctx).await {
                log_hook_error(HookPoint::PostInvoke, plugin.as_ref(), &e);
            }
        }
    }

    async fn post_response(
        &self,
        event: &serde_json::Value,
        ctx: &InvocationContext,
        outcome: &Outcome,
    ) {
        for plugin in self.active() {
            if let Err(e) = plugin.post_response(event, ctx, outcome).await {
                log_hook_error(HookPoint::PostResponse, plugin.as_ref(), &e);
            }
        }
    }

    async fn pre_report(&self, report: &mut Report, ctx: &InvocationContext) {
        for plugin in self.active() {
            if let Err(e) = plugin.pre_report(report, ctx).await {
                log_hook_error(HookPoint::PreReport, plugin.as_ref(), &e);
            }
        }
    }

    async fn post_report(&self, report: &Report) {
        for plugin in self.active() {
            if let Err(e) = plugin.post_report(report).await {
                log_hook_error(HookPoint::PostReport, plugin.as_ref(), &e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::context::LambdaContext;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct Recording {
        name: &'static str,
        version: &'static str,
        enabled: bool,
        fail: bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Recording {
        fn new(name: &'static str, calls: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                version: "0.1.0",
                enabled: true,
                fail: false,
                calls: Arc::clone(calls),
            }
        }
    }

    #[async_trait]
    impl Plugin for Recording {
        fn name(&self) -> &str {
            self.name
        }
        fn version(&self) -> &str {
            self.version
        }
        fn homepage(&self) -> &str {
            "https://example.com"
        }
        fn enabled(&self) -> bool {
            self.enabled
        }

        async fn pre_invoke(
            &self,
            _event: &serde_json::Value,
            _ctx: &InvocationContext,
        ) -> anyhow::Result<()> {
            self.calls.lock().push(format!("{}@{}", self.name, self.version));
            if self.fail {
                anyhow::bail!("plugin exploded");
            }
            Ok(())
        }

        async fn pre_setup(&self, config: &mut Config) -> anyhow::Result<()> {
            config.install_method = format!("{}-install", self.name);
            Ok(())
        }
    }

    fn ctx() -> InvocationContext {
        InvocationContext::unreported(LambdaContext::local("fn", Duration::from_secs(1)))
    }

    #[test]
    fn later_registration_wins() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let first = Recording::new("dup", &calls);
        let second = Recording {
            version: "2.0.0",
            ..Recording::new("dup", &calls)
        };
        let manager = DefaultPluginManager::new(vec![
            Arc::new(first) as Arc<dyn Plugin>,
            Arc::new(Recording::new("other", &calls)),
            Arc::new(second),
        ]);

        assert_eq!(manager.list_plugins(), vec!["dup", "other"]);
        assert_eq!(manager.meta()[0].version, "2.0.0");
    }

    #[tokio::test]
    async fn failing_hook_does_not_stop_others() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let failing = Recording {
            fail: true,
            ..Recording::new("failing", &calls)
        };
        let manager = DefaultPluginManager::new(vec![
            Arc::new(failing) as Arc<dyn Plugin>,
            Arc::new(Recording::new("after", &calls)),
        ]);

        manager.pre_invoke(&serde_json::json!({}), &ctx()).await;
        assert_eq!(*calls.lock(), vec!["failing@0.1.0", "after@0.1.0"]);
    }

    #[tokio::test]
    async fn disabled_plugins_are_listed_but_not_called() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let disabled = Recording {
            enabled: false,
            ..Recording::new("off", &calls)
        };
        let manager = DefaultPluginManager::new(vec![Arc::new(disabled) as Arc<dyn Plugin>]);

        manager.pre_invoke(&serde_json::json!({}), &ctx()).await;
        assert!(calls.lock().is_empty());
        assert!(!manager.meta()[0].enabled);
    }

    #[tokio::test]
    async fn pre_setup_can_modify_config() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let manager =
            DefaultPluginManager::new(vec![Arc::new(Recording::new("tweak", &calls)) as Arc<dyn Plugin>]);
        let mut config = Config::default();
        manager.pre_setup(&mut config).await;
        assert_eq!(config.install_method, "tweak-install");
    }

    #[test]
    fn hook_points_have_wire_names() {
        assert_eq!(HookPoint::PostResponse.to_string(), "post:response");
        assert_eq!(HookPoint::PreSetup.as_str(), "pre:setup");
    }
}
