use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppSettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings path unavailable")]
    MissingSettingsPath,
}

pub type Result<T> = std::result::Result<T, AppSettingsError>;

/// Where transforms execute: the hosted processing service, or a service
/// running on the editor's own machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMethod {
    #[default]
    Cloud,
    Local,
}

impl ProcessingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMethod::Cloud => "cloud",
            ProcessingMethod::Local => "local",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cloud" => Some(ProcessingMethod::Cloud),
            "local" => Some(ProcessingMethod::Local),
            _ => None,
        }
    }
}

/// User preferences that survive across editing sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub processing_method: ProcessingMethod,
    #[serde(default = "default_live_preview")]
    pub live_preview_enabled: bool,
    #[serde(default)]
    pub last_gallery: Option<String>,
}

fn default_live_preview() -> bool {
    true
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            processing_method: ProcessingMethod::Cloud,
            live_preview_enabled: true,
            last_gallery: None,
        }
    }
}

impl AppSettings {
    pub fn load() -> Result<Self> {
        load_impl()
    }

    pub fn save(&self) -> Result<()> {
        save_impl(self)
    }

    pub fn set_processing_method(&mut self, method: ProcessingMethod) {
        self.processing_method = method;
    }

    pub fn set_live_preview_enabled(&mut self, enabled: bool) {
        self.live_preview_enabled = enabled;
    }

    pub fn set_last_gallery(&mut self, gallery_id: impl Into<String>) {
        self.last_gallery = Some(gallery_id.into());
    }
}

#[cfg(target_os = "windows")]
fn load_impl() -> Result<AppSettings> {
    use winreg::enums::{HKEY_CURRENT_USER, KEY_READ};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = hkcu
        .open_subkey_with_flags("Software\\ApexMedia", KEY_READ)
        .ok();

    let mut settings = AppSettings::default();
    if let Some(key) = key {
        if let Ok(raw) = key.get_value::<String, _>("ProcessingMethod") {
            if let Some(method) = ProcessingMethod::parse(&raw) {
                settings.processing_method = method;
            }
        }
        if let Ok(flag) = key.get_value::<u32, _>("LivePreviewEnabled") {
            settings.live_preview_enabled = flag != 0;
        }
        if let Ok(gallery) = key.get_value::<String, _>("LastGallery") {
            settings.last_gallery = Some(gallery);
        }
    }

    Ok(settings)
}

#[cfg(target_os = "windows")]
fn save_impl(settings: &AppSettings) -> Result<()> {
    use winreg::enums::{HKEY_CURRENT_USER, KEY_WRITE};
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _) = hkcu.create_subkey_with_flags("Software\\ApexMedia", KEY_WRITE)?;

    key.set_value(
        "ProcessingMethod",
        &settings.processing_method.as_str(),
    )?;
    key.set_value(
        "LivePreviewEnabled",
        &u32::from(settings.live_preview_enabled),
    )?;
    if let Some(gallery) = &settings.last_gallery {
        key.set_value("LastGallery", &gallery.as_str())?;
    } else {
        let _ = key.delete_value("LastGallery");
    }

    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn load_impl() -> Result<AppSettings> {
    let path = settings_file_path()?;
    if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        let settings: AppSettings = serde_json::from_str(&content)?;
        Ok(settings)
    } else {
        Ok(AppSettings::default())
    }
}

#[cfg(not(target_os = "windows"))]
fn save_impl(settings: &AppSettings) -> Result<()> {
    let path = settings_file_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let payload = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, payload)?;
    Ok(())
}

#[cfg(target_os = "macos")]
fn settings_file_path() -> Result<std::path::PathBuf> {
    let base = directories::BaseDirs::new().ok_or(AppSettingsError::MissingSettingsPath)?;
    let mut path = base.home_dir().to_path_buf();
    path.push("Library");
    path.push("Preferences");
    path.push("com.apexmedia");
    std::fs::create_dir_all(&path)?;
    path.push("settings.json");
    Ok(path)
}

#[cfg(all(not(target_os = "macos"), not(target_os = "windows")))]
fn settings_file_path() -> Result<std::path::PathBuf> {
    let base = directories::BaseDirs::new().ok_or(AppSettingsError::MissingSettingsPath)?;
    let mut path = base.config_dir().to_path_buf();
    path.push("apexmedia");
    std::fs::create_dir_all(&path)?;
    path.push("settings.json");
    Ok(path)
}
