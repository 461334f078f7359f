//! src/config.rs
//! ============================================================================
//! # Config: Viewer Settings Loader and Saver
//!
//! Persists the viewer's settings as TOML in the platform config directory
//! resolved by the [`directories`](https://docs.rs/directories) crate:
//! fonts, zoom, the root mode of the file tree and the session state used to
//! restore the last document on startup.
//!
//! Missing keys fall back to their defaults so older files keep loading.
//!
//! ## Example
//! ```rust,ignore
//! let mut config = Config::load().await?;
//! config.appearance.zoom_in();
//! config.save().await?;
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tokio::fs as TokioFs;

use crate::model::tree::RootMode;

pub const ZOOM_MIN: u16 = 50;
pub const ZOOM_MAX: u16 = 200;
pub const ZOOM_STEP: u16 = 10;
pub const ZOOM_DEFAULT: u16 = 100;

/// Fonts and zoom of the preview pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    pub font_family: String,

    pub code_font_family: String,

    /// Percent, 50..=200.
    pub zoom: u16,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            font_family: "Segoe UI".to_string(),
            code_font_family: "JetBrains Mono".to_string(),
            zoom: ZOOM_DEFAULT,
        }
    }
}

impl AppearanceConfig {
    /// Set the zoom, clamped to the supported range. Returns the value kept.
    pub fn set_zoom(&mut self, zoom: u16) -> u16 {
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
        self.zoom
    }

    pub fn zoom_in(&mut self) -> u16 {
        self.set_zoom(self.zoom.saturating_add(ZOOM_STEP))
    }

    pub fn zoom_out(&mut self) -> u16 {
        self.set_zoom(self.zoom.saturating_sub(ZOOM_STEP))
    }

    pub fn reset_zoom(&mut self) -> u16 {
        self.set_zoom(ZOOM_DEFAULT)
    }
}

/// What the file tree is rooted at on startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RootSetting {
    #[default]
    Volumes,

    Folder(PathBuf),
}

impl From<&RootSetting> for RootMode {
    fn from(setting: &RootSetting) -> Self {
        match setting {
            RootSetting::Volumes => Self::Volumes,
            RootSetting::Folder(path) => Self::Folder(path.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TreeConfig {
    pub root: RootSetting,
}

/// Session state remembered between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionState {
    /// Last document shown in the preview.
    pub last_file: Option<PathBuf>,

    /// Last node selected in the tree (file or directory).
    pub last_expanded_path: Option<PathBuf>,
}

/// Main configuration struct for the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub appearance: AppearanceConfig,

    #[serde(default)]
    pub tree: TreeConfig,

    #[serde(default)]
    pub session: SessionState,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            appearance: AppearanceConfig::default(),
            tree: TreeConfig::default(),
            session: SessionState::default(),
        }
    }
}

impl Config {
    /// Loads config from the platform config dir, writing defaults on first run.
    ///
    /// The file lives at `$XDG_CONFIG_HOME/mdview/config.toml` on Linux and
    /// the equivalent on Windows and macOS.
    pub async fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path).await
    }

    /// Loads config from an explicit file, creating it with defaults if absent.
    pub async fn load_from(path: &Path) -> anyhow::Result<Self> {
        if TokioFs::try_exists(path).await.unwrap_or(false) {
            info!("Loading config from {}", path.display());
            let text = TokioFs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let mut cfg: Self =
                toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
            cfg.normalize();

            Ok(cfg)
        } else {
            info!(
                "No config file found at {}, using default configuration. Creating it now.",
                path.display()
            );

            let default_config = Self::default();
            default_config.save_to(path).await?;

            Ok(default_config)
        }
    }

    /// Saves config to the platform config dir.
    pub async fn save(&self) -> anyhow::Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path).await
    }

    pub async fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        info!("Saving config to {}", path.display());

        if let Some(parent) = path.parent() {
            TokioFs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        TokioFs::write(path, toml_str)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        Ok(())
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the config directory (without filename).
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "mdview", "mdview")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Bring hand-edited values back into range.
    fn normalize(&mut self) {
        let zoom = self.appearance.zoom;
        if self.appearance.set_zoom(zoom) != zoom {
            warn!(zoom, kept = self.appearance.zoom, "Zoom out of range in config");
        }
    }
}

/// Settings the viewer session reads and updates.
pub trait SettingsStore {
    /// Node to re-select on startup when no document is restored.
    fn last_expanded_path(&self) -> Option<&Path>;

    fn last_file(&self) -> Option<&Path>;

    /// A document was successfully opened or selected.
    fn record_current_file(&mut self, path: &Path);

    /// A tree node (typically a directory) was selected.
    fn record_selected_path(&mut self, path: &Path);

    fn appearance(&self) -> &AppearanceConfig;

    fn appearance_mut(&mut self) -> &mut AppearanceConfig;
}

impl SettingsStore for Config {
    fn last_expanded_path(&self) -> Option<&Path> {
        self.session.last_expanded_path.as_deref()
    }

    fn last_file(&self) -> Option<&Path> {
        self.session.last_file.as_deref()
    }

    fn record_current_file(&mut self, path: &Path) {
        self.session.last_file = Some(path.to_path_buf());
        self.session.last_expanded_path = Some(path.to_path_buf());
    }

    fn record_selected_path(&mut self, path: &Path) {
        self.session.last_expanded_path = Some(path.to_path_buf());
    }

    fn appearance(&self) -> &AppearanceConfig {
        &self.appearance
    }

    fn appearance_mut(&mut self) -> &mut AppearanceConfig {
        &mut self.appearance
    }
}
