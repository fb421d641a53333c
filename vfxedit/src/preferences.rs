use vfxedit_core::settings::Settings;

const DOCUMENTATION: &str = r#"# vfxedit settings. You may edit this file, but be aware that formatting and comments will not
# be preserved when it is rewritten with `vfxedit settings --save`.

# max_undo_size: how many edits each open document can undo.
# verify_on_load: re-encode every loaded container and report where it differs from the file.
# log_debug: log at debug level even without -v.

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

pub struct Preferences {
    failed_to_load: bool,
    /// Where these were read from, and where they are saved.
    path: Option<std::path::PathBuf>,
    pub settings: Settings,
}
impl Preferences {
    const FILENAME: &'static str = "settings.toml";
    /// Read settings from `path`, or from the preferences directory if None.
    /// Falls back to defaults if that fails.
    #[must_use]
    pub fn load(path: Option<std::path::PathBuf>) -> Self {
        let path = path.or_else(|| {
            let mut dir = preferences_dir()?;
            dir.push(Self::FILENAME);
            Some(dir)
        });
        match path {
            None => Self::no_path(),
            Some(path) => Self::load_or_default(path),
        }
    }
    #[must_use]
    fn no_path() -> Self {
        log::warn!("Settings weren't available, defaulting.");
        Self {
            failed_to_load: true,
            path: None,
            settings: Settings::default(),
        }
    }
    #[must_use]
    fn load_or_default(path: std::path::PathBuf) -> Self {
        let settings: anyhow::Result<Settings> = try_block::try_block! {
            let string = std::fs::read_to_string(&path)?;
            let settings: Settings = toml::from_str(&string)?;
            Ok(settings)
        };
        match settings {
            Ok(settings) => {
                log::debug!("settings loaded from {}", path.display());
                Self {
                    failed_to_load: false,
                    path: Some(path),
                    settings,
                }
            }
            Err(err) => {
                log::info!("using default settings, {} unreadable: {err}", path.display());
                Self {
                    failed_to_load: true,
                    path: Some(path),
                    settings: Settings::default(),
                }
            }
        }
    }
    /// Return true if loading the user's settings failed and defaults are in use.
    #[must_use]
    pub fn did_fail_to_load(&self) -> bool {
        self.failed_to_load
    }
    #[must_use]
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::ser::to_string_pretty(&self.settings)?)
    }
    pub fn save(&self) -> anyhow::Result<&std::path::Path> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        if let Some(parent) = path.parent() {
            // Explicity do *not* create recursively. If not found, the user probably has a good reason.
            // Ignore errors (could already exist). Any real errors will be emitted by file access below.
            let _ = std::fs::DirBuilder::new().create(parent);
        }
        // Prefix some documentation.
        let string = DOCUMENTATION.to_owned() + &self.to_toml()?;
        std::fs::write(path, string)?;
        Ok(path)
    }
}
