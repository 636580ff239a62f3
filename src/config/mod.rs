pub mod collector;
pub mod schema;

pub use collector::{collector_endpoint, collector_hostname, collector_path, SUPPORTED_REGIONS};
pub use schema::{
    parse_bool_flag, Config, EventInfoConfig, PluginsConfig, TraceConfig, MAX_EXECUTION_SECS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reexported_config_default_is_constructible() {
        let config = Config::default();

        assert!(config.enabled);
        assert!(config.collector_url().is_ok());
        assert_eq!(SUPPORTED_REGIONS.len(), 12);
    }
}
