use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
    value::{Uncased, UncasedStr},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "signflow";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "SIGNFLOW_";

pub const DEFAULT_FONT_SIZE: f64 = 14.0;
pub const DEFAULT_INITIAL_SCALE: f64 = 1.2;
pub const DEFAULT_ZOOM_STEP: f64 = 0.2;
pub const DEFAULT_MIN_ZOOM_SCALE: f64 = 0.6;
pub const DEFAULT_IMAGE_WIDTH: f64 = 140.0;
pub const DEFAULT_IMAGE_HEIGHT: f64 = 80.0;
pub const DEFAULT_SIGNATURE_SCALE: f64 = 1.5;

const MIN_FONT_SIZE: f64 = 6.0;
const MAX_FONT_SIZE: f64 = 96.0;
const MAX_SCALE: f64 = 5.0;
const MIN_PLACEMENT_SIZE: f64 = 40.0;

/// Where a new signature lands before the user moves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignaturePlacementDefaults {
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl Default for SignaturePlacementDefaults {
    fn default() -> Self {
        Self {
            page: 1,
            x: 50.0,
            y: 50.0,
            size: 120.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorSettings {
    /// Font size in points for edits opened on empty page area.
    pub default_font_size: f64,
    pub initial_scale: f64,
    pub zoom_step: f64,
    /// Zooming out stops once the scale is at or below this.
    pub min_zoom_scale: f64,
    pub image_width: f64,
    pub image_height: f64,
    pub signature_scale: f64,
    pub signature_placement: SignaturePlacementDefaults,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            default_font_size: DEFAULT_FONT_SIZE,
            initial_scale: DEFAULT_INITIAL_SCALE,
            zoom_step: DEFAULT_ZOOM_STEP,
            min_zoom_scale: DEFAULT_MIN_ZOOM_SCALE,
            image_width: DEFAULT_IMAGE_WIDTH,
            image_height: DEFAULT_IMAGE_HEIGHT,
            signature_scale: DEFAULT_SIGNATURE_SCALE,
            signature_placement: SignaturePlacementDefaults::default(),
        }
    }
}

impl EditorSettings {
    /// Replaces out-of-range numbers with defaults.
    pub fn normalized(mut self) -> Self {
        self.default_font_size = if self.default_font_size.is_finite() {
            self.default_font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
        } else {
            DEFAULT_FONT_SIZE
        };
        self.initial_scale = positive_or(self.initial_scale, DEFAULT_INITIAL_SCALE).min(MAX_SCALE);
        self.zoom_step = positive_or(self.zoom_step, DEFAULT_ZOOM_STEP);
        self.min_zoom_scale = positive_or(self.min_zoom_scale, DEFAULT_MIN_ZOOM_SCALE);
        self.image_width = positive_or(self.image_width, DEFAULT_IMAGE_WIDTH);
        self.image_height = positive_or(self.image_height, DEFAULT_IMAGE_HEIGHT);
        self.signature_scale = positive_or(self.signature_scale, DEFAULT_SIGNATURE_SCALE);

        let fallback = SignaturePlacementDefaults::default();
        let placement = &mut self.signature_placement;
        placement.page = placement.page.max(1);
        placement.x = non_negative_or(placement.x, fallback.x);
        placement.y = non_negative_or(placement.y, fallback.y);
        placement.size = if placement.size.is_finite() {
            placement.size.max(MIN_PLACEMENT_SIZE)
        } else {
            fallback.size
        };

        self
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn non_negative_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

/// `SIGNFLOW_ZOOM_STEP` -> `zoomStep`, `SIGNFLOW_SIGNATURE_PLACEMENT__PAGE` ->
/// `signaturePlacement.page`.
fn env_key(key: &UncasedStr) -> Uncased<'_> {
    let path = key
        .as_str()
        .split("__")
        .map(|segment| {
            let mut camel = String::with_capacity(segment.len());
            let mut upper_next = false;
            for ch in segment.chars() {
                if ch == '_' {
                    upper_next = !camel.is_empty();
                } else if upper_next {
                    camel.extend(ch.to_uppercase());
                    upper_next = false;
                } else {
                    camel.extend(ch.to_lowercase());
                }
            }
            camel
        })
        .collect::<Vec<_>>()
        .join(".");
    Uncased::from_owned(path)
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<EditorSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".signflow"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        let settings = Self::load_from_disk(&config_path);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<EditorSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: EditorSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &Path) -> EditorSettings {
        let mut figment = Figment::from(Serialized::defaults(EditorSettings::default()));
        if path.is_file() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::info!(path = %path.display(), "no signflow settings file, using defaults");
        }
        let figment = figment.merge(
            Env::prefixed(SETTINGS_ENV_PREFIX)
                .map(env_key)
                .lowercase(false),
        );

        figment
            .extract::<EditorSettings>()
            .map(EditorSettings::normalized)
            .unwrap_or_else(|error| {
                tracing::warn!(
                    path = %path.display(),
                    %error,
                    "ignoring unreadable editor settings"
                );
                EditorSettings::default()
            })
    }

    /// Writes next to the target and swaps it in, so readers never see half a file.
    fn persist(&self, settings: &EditorSettings) -> Result<(), SettingsError> {
        let target = self.config_path.as_path();
        if let Some(dir) = target.parent() {
            std::fs::create_dir_all(dir).context(ConfigDirSnafu {
                stage: "settings-store-config-dir",
                dir: dir.to_path_buf(),
            })?;
        }

        let json = serde_json::to_vec_pretty(settings).context(EncodeSnafu {
            stage: "settings-store-encode",
        })?;
        let staged = target.with_extension("json.tmp");
        std::fs::write(&staged, json).context(StageSnafu {
            stage: "settings-store-stage",
            staged: staged.clone(),
        })?;
        std::fs::rename(&staged, target).context(SwapSnafu {
            stage: "settings-store-swap",
            target: target.to_path_buf(),
        })?;

        tracing::info!(path = %target.display(), "editor settings saved");
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("cannot create the signflow config directory {dir:?} on `{stage}`: {source}"))]
    ConfigDir {
        stage: &'static str,
        dir: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("editor settings are not representable as JSON on `{stage}`: {source}"))]
    Encode {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("cannot stage editor settings at {staged:?} on `{stage}`: {source}"))]
    Stage {
        stage: &'static str,
        staged: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("cannot swap staged editor settings into {target:?} on `{stage}`: {source}"))]
    Swap {
        stage: &'static str,
        target: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.settings().initial_scale, DEFAULT_INITIAL_SCALE);
        assert_eq!(store.settings().default_font_size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "defaultFontSize": 18, "signaturePlacement": { "page": 3 } }"#,
        )
        .unwrap();

        let settings = SettingsStore::new(path).settings();
        assert_eq!(settings.default_font_size, 18.0);
        assert_eq!(settings.signature_placement.page, 3);
        assert_eq!(settings.signature_placement.size, 120.0);
        assert_eq!(settings.zoom_step, DEFAULT_ZOOM_STEP);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path);
        assert_eq!(*store.settings(), EditorSettings::default());
    }

    #[test]
    fn update_persists_normalized_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let store = SettingsStore::new(path.clone());

        store
            .update(EditorSettings {
                default_font_size: 400.0,
                zoom_step: -1.0,
                image_width: 220.0,
                ..EditorSettings::default()
            })
            .unwrap();

        assert_eq!(store.settings().default_font_size, MAX_FONT_SIZE);
        assert_eq!(store.settings().zoom_step, DEFAULT_ZOOM_STEP);
        assert!(!path.with_extension("json.tmp").exists());

        let reloaded = SettingsStore::new(path).settings();
        assert_eq!(reloaded.image_width, 220.0);
        assert_eq!(*reloaded, *store.settings());
    }

    #[test]
    fn unwritable_config_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, "a file, not a directory").unwrap();
        let store = SettingsStore::new(blocker.join("settings.json"));

        let error = store.update(EditorSettings::default()).unwrap_err();
        assert!(matches!(error, SettingsError::ConfigDir { .. }));
        assert_eq!(*store.settings(), EditorSettings::default());
    }

    #[test]
    fn unknown_legacy_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "locale": "fr-FR", "zoomStep": 0.5 }"#).unwrap();

        let settings = SettingsStore::new(path).settings();
        assert_eq!(settings.zoom_step, 0.5);
    }

    #[test]
    fn env_keys_become_camel_case_paths() {
        assert_eq!(env_key(UncasedStr::new("zoom_step")).as_str(), "zoomStep");
        assert_eq!(
            env_key(UncasedStr::new("SIGNATURE_PLACEMENT__PAGE")).as_str(),
            "signaturePlacement.page"
        );
    }
}
