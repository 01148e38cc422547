use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "filemonitor.toml";

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub path: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub enabled: Option<bool>,
    pub verbose: Option<bool>,
}

/// Values given on the command line; they win over the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub path: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub start: bool,
    pub verbose: bool,
    pub json: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub path: PathBuf,
    pub backup_dir: PathBuf,
    /// Whether the backup directory was chosen rather than derived from the file
    pub backup_dir_explicit: bool,
    pub enabled: bool,
    pub verbose: bool,
    pub json: bool,
}

pub fn load_config(file_path: &Path) -> Result<ConfigFile> {
    let config_str = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read config file {}", file_path.display()))?;
    let config: ConfigFile = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file {}", file_path.display()))?;
    Ok(config)
}

/// Loads the default config file if there is one.
pub fn load_default_config(file_path: &Path) -> Result<ConfigFile> {
    if !file_path.exists() {
        return Ok(ConfigFile::default());
    }
    load_config(file_path)
}

/// Backup location used when none is configured: `<dir>/Backup - <stem>`.
pub fn default_backup_dir(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = file.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("Backup - {}", stem))
}

impl Settings {
    pub fn resolve(config: ConfigFile, overrides: Overrides) -> Result<Self> {
        let Some(path) = overrides.path.or(config.path) else {
            bail!("No file to monitor; pass one on the command line or set `path` in the config");
        };
        let explicit_dir = overrides.backup_dir.or(config.backup_dir);
        let backup_dir_explicit = explicit_dir.is_some();
        let backup_dir = explicit_dir.unwrap_or_else(|| default_backup_dir(&path));

        Ok(Self {
            path,
            backup_dir,
            backup_dir_explicit,
            enabled: overrides.start || config.enabled.unwrap_or(false),
            verbose: overrides.verbose || config.verbose.unwrap_or(false),
            json: overrides.json,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_all_keys() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("filemonitor.toml");
        fs::write(
            &file,
            concat!(
                "path = \"/maps/map.ut2\"\n",
                "backup_dir = \"/backups\"\n",
                "enabled = true\n",
                "verbose = false\n",
            ),
        )
        .unwrap();

        let config = load_config(&file).unwrap();
        assert_eq!(config.path, Some(PathBuf::from("/maps/map.ut2")));
        assert_eq!(config.backup_dir, Some(PathBuf::from("/backups")));
        assert_eq!(config.enabled, Some(true));
        assert_eq!(config.verbose, Some(false));
    }

    #[test]
    fn missing_default_config_is_empty() {
        let tmp = TempDir::new().unwrap();
        let config = load_default_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn missing_named_config_and_garbage_are_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(load_config(&tmp.path().join("nope.toml")).is_err());

        let bad = tmp.path().join("bad.toml");
        fs::write(&bad, "path = [").unwrap();
        let err = load_config(&bad).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn backup_dir_defaults_next_to_file() {
        assert_eq!(
            default_backup_dir(Path::new("/maps/CTF-Face.unr")),
            PathBuf::from("/maps/Backup - CTF-Face")
        );
    }

    #[test]
    fn command_line_wins() {
        let config = ConfigFile {
            path: Some(PathBuf::from("/maps/a.ut2")),
            backup_dir: Some(PathBuf::from("/from-config")),
            enabled: Some(false),
            verbose: Some(true),
        };
        let overrides = Overrides {
            path: Some(PathBuf::from("/maps/b.ut2")),
            start: true,
            ..Overrides::default()
        };

        let settings = Settings::resolve(config, overrides).unwrap();
        assert_eq!(settings.path, PathBuf::from("/maps/b.ut2"));
        assert_eq!(settings.backup_dir, PathBuf::from("/from-config"));
        assert!(settings.backup_dir_explicit);
        assert!(settings.enabled);
        assert!(settings.verbose);
        assert!(!settings.json);
    }

    #[test]
    fn derived_backup_dir_is_not_explicit() {
        let overrides = Overrides {
            path: Some(PathBuf::from("/maps/map.ut2")),
            ..Overrides::default()
        };
        let settings = Settings::resolve(ConfigFile::default(), overrides).unwrap();
        assert_eq!(settings.backup_dir, PathBuf::from("/maps/Backup - map"));
        assert!(!settings.backup_dir_explicit);
        assert!(!settings.enabled);
    }

    #[test]
    fn file_is_required() {
        assert!(Settings::resolve(ConfigFile::default(), Overrides::default()).is_err());
    }
}
