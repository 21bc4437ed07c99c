// =============================================================================
// SETTINGS REPOSITORY
// =============================================================================
// The single global settings document, kept in <data_dir>/settings.json
// regardless of which record backend is active.
//
// UPDATE SEMANTICS:
// - each named section merges its own fields (one level deep)
// - fields and sections not mentioned are preserved
// - unknown top-level keys are replaced wholesale
// =============================================================================

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::Settings;
use crate::store::file::write_json_atomic;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    path: PathBuf,
}

impl SettingsRepository {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SETTINGS_FILE),
        }
    }

    /// Write the default document if no settings file exists yet.
    pub async fn ensure_exists(&self) -> AppResult<()> {
        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        self.save(&Settings::default()).await
    }

    /// Current settings.
    ///
    /// A missing file is created with defaults. An unreadable or corrupt
    /// file yields defaults without touching the file.
    pub async fn get(&self) -> Settings {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let defaults = Settings::default();
                if let Err(e) = self.save(&defaults).await {
                    tracing::warn!(error = %e, "Could not persist default settings");
                }
                return defaults;
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to read settings");
                return Settings::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Settings file is corrupt, using defaults"
            );
            Settings::default()
        })
    }

    /// Merge `patch` into the stored document and persist the result.
    pub async fn update(&self, patch: Value) -> AppResult<Settings> {
        let Value::Object(patch) = patch else {
            return Err(AppError::Validation(
                "Settings update must be a JSON object".to_string(),
            ));
        };

        let current = self.get().await;
        let mut doc = serde_json::to_value(&current)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        merge_sections(&mut doc, patch);

        let updated: Settings =
            serde_json::from_value(doc).map_err(|e| AppError::Validation(e.to_string()))?;
        updated.validate().map_err(AppError::Validation)?;

        self.save(&updated).await?;
        tracing::info!("Settings updated");
        Ok(updated)
    }

    async fn save(&self, settings: &Settings) -> AppResult<()> {
        write_json_atomic(&self.path, settings).await.map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to write settings");
            AppError::StoreUnavailable(format!("settings file: {e}"))
        })
    }
}

fn merge_sections(doc: &mut Value, patch: serde_json::Map<String, Value>) {
    let Value::Object(doc) = doc else {
        return;
    };

    for (key, value) in patch {
        if !Settings::SECTIONS.contains(&key.as_str()) {
            doc.insert(key, value);
            continue;
        }

        // A section only ever merges; null or scalar sections change nothing
        let Value::Object(fields) = value else {
            continue;
        };
        match doc.get_mut(&key) {
            Some(Value::Object(section)) => section.extend(fields),
            _ => {
                doc.insert(key, Value::Object(fields));
            }
        }
    }
}
