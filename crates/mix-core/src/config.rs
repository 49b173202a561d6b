use crate::CoreError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the project directory under the home directory in installed mode.
pub const INSTALLED_DIR: &str = ".mix";

/// Where mix looks for its project files when no directory is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    /// Work in the current directory.
    Development,
    /// Work in `~/.mix`.
    #[default]
    Installed,
}

impl FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "installed" | "install" => Ok(Self::Installed),
            other => Err(format!(
                "unknown mode '{other}' (expected 'dev' or 'installed')"
            )),
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "dev",
            Self::Installed => "installed",
        })
    }
}

/// Process-wide settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mode: RuntimeMode,
    pub project_dir: PathBuf,
    pub backend: String,
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// An explicit directory wins; otherwise development mode uses the current
    /// directory and installed mode uses `$HOME/.mix`.
    pub fn resolve(
        mode: RuntimeMode,
        dir_override: Option<&str>,
        backend: &str,
    ) -> Result<Self, CoreError> {
        let project_dir = match (dir_override, mode) {
            (Some(dir), _) => expand_tilde(dir),
            (None, RuntimeMode::Development) => std::env::current_dir()?,
            (None, RuntimeMode::Installed) => home_dir()?.join(INSTALLED_DIR),
        };
        Ok(Self {
            mode,
            project_dir,
            backend: backend.to_owned(),
        })
    }

    /// Settings for an explicit project directory.
    pub fn for_dir(project_dir: impl Into<PathBuf>, backend: &str) -> Self {
        Self {
            mode: RuntimeMode::Development,
            project_dir: project_dir.into(),
            backend: backend.to_owned(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

fn home_dir() -> Result<PathBuf, CoreError> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| CoreError::Config("neither HOME nor USERPROFILE is set".to_owned()))
}

/// Expand a leading `~/` to the home directory, if one is known.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_modes() {
        assert_eq!("dev".parse::<RuntimeMode>().unwrap(), RuntimeMode::Development);
        assert_eq!(
            "Development".parse::<RuntimeMode>().unwrap(),
            RuntimeMode::Development
        );
        assert_eq!(
            "installed".parse::<RuntimeMode>().unwrap(),
            RuntimeMode::Installed
        );
        assert!("prod-ish".parse::<RuntimeMode>().is_err());
        assert_eq!(RuntimeMode::default(), RuntimeMode::Installed);
    }

    #[test]
    fn mode_display_parses_back() {
        for mode in [RuntimeMode::Development, RuntimeMode::Installed] {
            assert_eq!(mode.to_string().parse::<RuntimeMode>().unwrap(), mode);
        }
    }

    #[test]
    fn explicit_dir_wins_over_mode() {
        let s = Settings::resolve(RuntimeMode::Installed, Some("/srv/mix"), "mock").unwrap();
        assert_eq!(s.project_dir(), Path::new("/srv/mix"));
        assert_eq!(s.backend, "mock");
        assert_eq!(s.mode, RuntimeMode::Installed);
    }

    #[test]
    fn development_uses_current_directory() {
        let s = Settings::resolve(RuntimeMode::Development, None, "winget").unwrap();
        assert_eq!(s.project_dir, std::env::current_dir().unwrap());
    }

    #[test]
    fn expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("rel/~/x"), PathBuf::from("rel/~/x"));
    }
}
