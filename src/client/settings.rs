//! Saving companion settings from the dashboard's settings dialog.
//!
//! The dialog has tabs; which requests a save sends depends on the tab
//! that is active. Behaviour goes out as a `settings` command, appearance
//! as a `skin` message.

use serde_json::{Map, Value, json};

use super::error::ClientError;
use super::session::ClientSession;
use super::state::CommandResult;
use crate::domain::BehaviorMode;
use crate::ws::messages::SETTINGS_COMMAND;

/// Which part of the settings dialog is being saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTab {
    /// Name and behaviour mode.
    General,
    /// Skin.
    Appearance,
    /// Both, behaviour first.
    All,
}

/// Values edited in the settings dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionSettings {
    /// Display name.
    pub name: String,
    /// Combat stance.
    pub behavior_mode: BehaviorMode,
    /// Skin type (`"default"`, `"alex"`, `"custom"`, ...).
    pub skin_type: String,
    /// Custom skin location when `skin_type` is `"custom"`.
    pub skin_path: Option<String>,
}

impl CompanionSettings {
    fn behavior_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("name".to_string(), json!(self.name));
        params.insert("behaviorMode".to_string(), json!(self.behavior_mode));
        params
    }
}

impl ClientSession {
    /// Saves the settings shown on `tab` for `companion_id`.
    ///
    /// Requests go out one at a time; the first failure stops the
    /// sequence. Returns the results in the order the requests were sent.
    ///
    /// # Errors
    ///
    /// Any [`ClientError`] from the underlying requests.
    pub async fn save_settings(
        &self,
        companion_id: &str,
        tab: SettingsTab,
        settings: &CompanionSettings,
    ) -> Result<Vec<CommandResult>, ClientError> {
        let mut results = Vec::with_capacity(2);

        if matches!(tab, SettingsTab::General | SettingsTab::All) {
            let result = self
                .send_command(
                    SETTINGS_COMMAND,
                    Some(companion_id),
                    settings.behavior_params(),
                )
                .await?;
            let ok = result.success;
            results.push(result);
            if !ok {
                return Ok(results);
            }
        }

        if matches!(tab, SettingsTab::Appearance | SettingsTab::All) {
            let result = self
                .change_skin(
                    companion_id,
                    &settings.skin_type,
                    settings.skin_path.as_deref(),
                )
                .await?;
            results.push(result);
        }

        Ok(results)
    }
}
