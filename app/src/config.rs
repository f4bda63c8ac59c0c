use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Guestbook server
///
/// Every flag can also be set through its environment variable or a `.env`
/// file in the working directory.
#[derive(Debug, Clone, Parser)]
#[command(name = "guestbook-server")]
#[command(author, version, about, long_about = None)]
pub struct Settings {
    /// Port for the HTTP API
    #[arg(long, env = "PORT", default_value_t = 3030)]
    pub port: u16,

    /// SQLite database file
    #[arg(long = "database", env = "DATABASE_PATH", default_value = "data/guestbook.db")]
    pub database_path: PathBuf,

    /// Directory uploaded images are written to
    #[arg(long, env = "UPLOAD_DIR", default_value = "data/uploads")]
    pub upload_dir: PathBuf,

    /// URL prefix under which uploads are served
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "/uploads")]
    pub public_base_url: String,

    /// Admin secret; admin access is disabled when empty
    #[arg(long, env = "ADMIN_KEY", default_value = "", hide_env_values = true)]
    pub admin_key: String,

    /// Secret for signing verification grants; random per process when unset
    #[arg(long, env = "GRANT_SECRET", hide_env_values = true)]
    pub grant_secret: Option<String>,

    /// Lifetime of a verification grant in seconds
    #[arg(long, env = "GRANT_TTL_SECS", default_value_t = 1800)]
    pub grant_ttl_secs: u64,

    /// Directory for rolling log files
    #[arg(long, env = "LOG_DIR", default_value = "data/logs")]
    pub log_dir: PathBuf,

    /// Single allowed browser origin; any origin when unset
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,
}

impl Settings {
    /// Load `.env` (if present) and parse flags with environment fallbacks
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::parse()
    }

    pub fn grant_ttl(&self) -> Duration {
        Duration::from_secs(self.grant_ttl_secs)
    }

    /// Blank grant secrets count as unset
    pub fn grant_secret(&self) -> Option<&str> {
        self.grant_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let settings = Settings::try_parse_from([
            "guestbook-server",
            "--port",
            "8080",
            "--database",
            "/tmp/gb.db",
            "--admin-key",
            "s3cret",
            "--grant-secret",
            "   ",
            "--grant-ttl-secs",
            "60",
        ])
        .unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.database_path, PathBuf::from("/tmp/gb.db"));
        assert_eq!(settings.admin_key, "s3cret");
        assert_eq!(settings.grant_secret(), None);
        assert_eq!(settings.grant_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Settings::try_parse_from(["guestbook-server", "--port", "not-a-port"]).is_err());
    }
}
