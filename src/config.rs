//! Configuration parsing and path resolution.
//!
//! `seev.toml` is optional: every setting has a default, and environment
//! variables override whatever the file says. A file is searched for in
//! `./seev.toml`, `~/.config/seev/seev.toml` and `~/.seev.toml` unless an
//! explicit `--config` path is given.
//!
//! ```toml
//! markdown_path = "~/notes/WORKLOG.md"
//! db_path = "~/.seev/db.sqlite3"
//! track_emails = ["me@example.com"]
//!
//! [server]
//! bind = "127.0.0.1:7341"
//!
//! [generate]
//! conversation_limit = 3
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_MD_PATH: &str = "SEEV_MD_PATH";
pub const ENV_DB_PATH: &str = "SEEV_DB_PATH";
pub const ENV_TRACK_EMAILS: &str = "SEEV_TRACK_EMAILS";

const DEFAULT_MARKDOWN_PATH: &str = "WORKLOG.md";
const DEFAULT_DB_PATH: &str = "~/.seev/db.sqlite3";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub markdown_path: Option<PathBuf>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub track_emails: Vec<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generate: GenerateConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerateConfig {
    /// Maximum number of conversations quoted under Goals & Context.
    #[serde(default = "default_conversation_limit")]
    pub conversation_limit: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            conversation_limit: default_conversation_limit(),
        }
    }
}

fn default_conversation_limit() -> usize {
    3
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }
    if config.generate.conversation_limit == 0 {
        bail!("generate.conversation_limit must be >= 1");
    }

    Ok(config)
}

/// Load `explicit` if given (it must exist), otherwise the first config file
/// found in the standard locations, otherwise defaults.
pub fn discover_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let home = home_dir();
    for candidate in candidate_paths(&cwd, home.as_deref()) {
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading config");
            return load_config(&candidate);
        }
    }
    Ok(Config::default())
}

/// Standard config locations in search order.
pub fn candidate_paths(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = vec![cwd.join("seev.toml")];
    if let Some(home) = home {
        paths.push(home.join(".config").join("seev").join("seev.toml"));
        paths.push(home.join(".seev.toml"));
    }
    paths
}

pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Expand a leading `~/` against `home`.
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Markdown path precedence: explicit argument, then `SEEV_MD_PATH`, then
/// the config file, then `./WORKLOG.md`.
pub fn resolve_markdown_path(
    explicit: Option<&Path>,
    env: Option<String>,
    configured: Option<&Path>,
    home: Option<&Path>,
) -> PathBuf {
    let chosen = explicit
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| env.map(PathBuf::from))
        .or_else(|| configured.map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MARKDOWN_PATH));
    expand_home(&chosen, home)
}

/// Database path precedence: `SEEV_DB_PATH`, then the config file, then
/// `~/.seev/db.sqlite3`.
pub fn resolve_db_path(env: Option<String>, configured: Option<&Path>, home: Option<&Path>) -> PathBuf {
    let chosen = env
        .map(PathBuf::from)
        .or_else(|| configured.map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
    expand_home(&chosen, home)
}

/// Parse a comma separated email list, dropping blanks.
pub fn split_emails(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn markdown_path(&self, explicit: Option<&Path>) -> PathBuf {
        resolve_markdown_path(
            explicit,
            env_value(ENV_MD_PATH),
            self.markdown_path.as_deref(),
            home_dir().as_deref(),
        )
    }

    pub fn db_path(&self) -> PathBuf {
        resolve_db_path(
            env_value(ENV_DB_PATH),
            self.db_path.as_deref(),
            home_dir().as_deref(),
        )
    }

    /// Author filters for git queries: `SEEV_TRACK_EMAILS`, then
    /// `track_emails`, then the local git identity. May be empty, in which
    /// case commits from every author are included.
    pub fn tracked_emails(&self) -> Vec<String> {
        if let Some(value) = env_value(ENV_TRACK_EMAILS) {
            let emails = split_emails(&value);
            if !emails.is_empty() {
                return emails;
            }
        }
        if !self.track_emails.is_empty() {
            return self.track_emails.clone();
        }
        crate::git::git_author_pattern(None).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seev.toml");
        std::fs::write(&path, "markdown_path = \"log.md\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.markdown_path, Some(PathBuf::from("log.md")));
        assert_eq!(cfg.server.bind, "127.0.0.1:7341");
        assert_eq!(cfg.generate.conversation_limit, 3);
        assert!(cfg.track_emails.is_empty());
    }

    #[test]
    fn test_load_config_full() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seev.toml");
        std::fs::write(
            &path,
            r#"
db_path = "/tmp/seev.sqlite3"
track_emails = ["a@example.com", "b@example.com"]

[server]
bind = "0.0.0.0:9000"

[generate]
conversation_limit = 5
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.track_emails.len(), 2);
        assert_eq!(cfg.server.bind, "0.0.0.0:9000");
        assert_eq!(cfg.generate.conversation_limit, 5);
    }

    #[test]
    fn test_load_config_validation() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("seev.toml");
        std::fs::write(&path, "[generate]\nconversation_limit = 0\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("conversation_limit"));

        std::fs::write(&path, "[server]\nbind = \"\"\n").unwrap();
        assert!(load_config(&path).is_err());

        std::fs::write(&path, "markdown_path = [").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(discover_config(Some(&tmp.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_candidate_paths_order() {
        let paths = candidate_paths(Path::new("/work"), Some(Path::new("/home/me")));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/work/seev.toml"),
                PathBuf::from("/home/me/.config/seev/seev.toml"),
                PathBuf::from("/home/me/.seev.toml"),
            ]
        );
        assert_eq!(candidate_paths(Path::new("/work"), None).len(), 1);
    }

    #[test]
    fn test_markdown_path_precedence() {
        let home = Some(Path::new("/home/me"));
        let configured = Some(Path::new("~/notes/log.md"));

        assert_eq!(
            resolve_markdown_path(Some(Path::new("x.md")), Some("env.md".into()), configured, home),
            PathBuf::from("x.md")
        );
        assert_eq!(
            resolve_markdown_path(None, Some("env.md".into()), configured, home),
            PathBuf::from("env.md")
        );
        assert_eq!(
            resolve_markdown_path(None, None, configured, home),
            PathBuf::from("/home/me/notes/log.md")
        );
        assert_eq!(resolve_markdown_path(None, None, None, home), PathBuf::from("WORKLOG.md"));
    }

    #[test]
    fn test_db_path_precedence() {
        let home = Some(Path::new("/home/me"));
        assert_eq!(
            resolve_db_path(Some("/tmp/a.db".into()), Some(Path::new("b.db")), home),
            PathBuf::from("/tmp/a.db")
        );
        assert_eq!(resolve_db_path(None, Some(Path::new("b.db")), home), PathBuf::from("b.db"));
        assert_eq!(
            resolve_db_path(None, None, home),
            PathBuf::from("/home/me/.seev/db.sqlite3")
        );
    }

    #[test]
    fn test_split_emails() {
        assert_eq!(split_emails(" a@x.io, ,b@x.io,"), vec!["a@x.io", "b@x.io"]);
        assert!(split_emails(" , ").is_empty());
    }
}
