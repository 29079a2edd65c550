//! The `settings` command, for inspecting and editing `settings.toml`.
use crate::log::LOG_LEVEL_ENV_VAR;
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::env;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Subcommands for settings
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Edit the settings file in a text editor, creating it first if needed
    Edit,
    /// Get the path to where the settings file is read from
    Path,
    /// Show the settings a run would use
    Show,
    /// Write the contents of a placeholder `settings.toml` to the console
    DumpDefault,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        let file_path = get_settings_file_path();
        match self {
            Self::Edit => edit_settings_file(&file_path)?,
            Self::Path => println!("{}", file_path.display()),
            Self::Show => {
                let env_log_level = env::var(LOG_LEVEL_ENV_VAR).ok();
                print!("{}", effective_settings(&file_path, env_log_level)?);
            }
            Self::DumpDefault => print!("{}", Settings::default_file_contents()?),
        }

        Ok(())
    }
}

/// Write a placeholder settings file, unless there is a file there already
fn ensure_settings_file_exists(file_path: &Path) -> Result<()> {
    if file_path.is_file() {
        return Ok(());
    }

    if let Some(dir_path) = file_path.parent() {
        fs::create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }
    fs::write(file_path, Settings::default_file_contents()?)?;

    Ok(())
}

/// Open the settings file in the user's editor, then check that the edited file is usable
fn edit_settings_file(file_path: &Path) -> Result<()> {
    ensure_settings_file_exists(file_path)?;

    println!("Opening settings file for editing: {}", file_path.display());
    edit::edit_file(file_path)?;

    Settings::load_from_path(file_path)
        .context("The edited settings file is invalid and will not be used until it is fixed")?;
    println!("Settings saved");

    Ok(())
}

/// The settings a run would use, as TOML, with a comment saying where they came from.
///
/// # Arguments
///
/// * `file_path` - The settings file
/// * `env_log_level` - The value of `OFFGRID_LOG_LEVEL`, if set
fn effective_settings(file_path: &Path, env_log_level: Option<String>) -> Result<String> {
    let mut settings = Settings::load_from_path(file_path)?;

    let mut out = if file_path.is_file() {
        format!("# Settings from {}\n", file_path.display())
    } else {
        format!(
            "# No settings file at {}, so the defaults are used\n",
            file_path.display()
        )
    };
    if let Some(log_level) = env_log_level {
        writeln!(&mut out, "# log_level is set by {LOG_LEVEL_ENV_VAR}")?;
        settings.log_level = log_level;
    }
    out.push_str(&toml::to_string(&settings)?);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_settings_file_exists() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("offgrid").join("settings.toml");
        ensure_settings_file_exists(&file_path).unwrap();
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            Settings::default_file_contents().unwrap()
        );

        // An existing file is left alone
        fs::write(&file_path, "log_level = \"warn\"").unwrap();
        ensure_settings_file_exists(&file_path).unwrap();
        assert_eq!(
            fs::read_to_string(&file_path).unwrap(),
            "log_level = \"warn\""
        );
    }

    #[test]
    fn test_effective_settings_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("settings.toml");
        let shown = effective_settings(&file_path, None).unwrap();
        assert!(shown.starts_with("# No settings file at"));
        assert!(shown.contains("log_level = \"info\""));
        assert!(shown.contains("overwrite = false"));
    }

    #[test]
    fn test_effective_settings_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("settings.toml");
        fs::write(&file_path, "log_level = \"warn\"\ndebug_model = true").unwrap();

        let shown = effective_settings(&file_path, None).unwrap();
        assert!(shown.starts_with(&format!("# Settings from {}", file_path.display())));
        assert!(shown.contains("log_level = \"warn\""));
        assert!(shown.contains("debug_model = true"));

        // The environment variable takes precedence over the file
        let shown = effective_settings(&file_path, Some("debug".into())).unwrap();
        assert!(shown.contains("# log_level is set by OFFGRID_LOG_LEVEL"));
        assert!(shown.contains("log_level = \"debug\""));
    }

    #[test]
    fn test_effective_settings_invalid_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("settings.toml");
        fs::write(&file_path, "log_level = \"loud\"").unwrap();
        assert!(effective_settings(&file_path, None).is_err());
    }
}
