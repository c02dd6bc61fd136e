use drl_core::Settings;
use tower_lsp::lsp_types::ConfigurationItem;
use tracing::{info, warn};

use super::state::DrlLanguageServer;

pub(crate) const CONFIG_SECTION: &str = "drl";

/// Settings from the client's `drl` section; defaults when it is missing or
/// malformed.
pub(crate) fn settings_from_section(value: Option<serde_json::Value>) -> Settings {
    match value {
        None | Some(serde_json::Value::Null) => Settings::default(),
        Some(value) => Settings::from_value(value).unwrap_or_else(|err| {
            warn!(error = %err, "invalid drl settings, using defaults");
            Settings::default()
        }),
    }
}

impl DrlLanguageServer {
    pub(crate) async fn load_config(&self) {
        let items = vec![ConfigurationItem {
            scope_uri: None,
            section: Some(CONFIG_SECTION.to_string()),
        }];

        let value = match self.client.configuration(items).await {
            Ok(values) => values.into_iter().next(),
            Err(err) => {
                warn!(error = %err, "client did not return configuration");
                None
            }
        };
        let settings = settings_from_section(value);
        if settings == self.engine.settings() {
            return;
        }
        info!(?settings, "applying drl settings");
        self.engine.update_settings(settings);
        self.restart_sweeper();
    }

    /// (Re)start the idle-entry sweeper for the engine's current caches.
    pub(crate) fn restart_sweeper(&self) {
        let handle = self.engine.start_sweeper();
        let mut guard = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = guard.replace(handle) {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_from_section() {
        assert_eq!(settings_from_section(None), Settings::default());
        assert_eq!(settings_from_section(Some(serde_json::Value::Null)), Settings::default());

        let settings = settings_from_section(Some(json!({"maxNumberOfProblems": 5, "enableCaching": false})));
        assert_eq!(settings.max_number_of_problems, 5);
        assert!(!settings.enable_caching);

        // wrong shape for a known key
        assert_eq!(settings_from_section(Some(json!({"enableCaching": "yes"}))), Settings::default());
    }
}
