use std::env;
use std::path::PathBuf;

/// Authentication mode for the application.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// No authentication required - all users can access the app.
    Unauthenticated,
    /// Password authentication with an Argon2 hash.
    Password(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub migrations_path: PathBuf,
    pub static_path: PathBuf,
    pub auth_mode: AuthMode,
    /// ISO 4217 currency code used for all money display.
    pub currency: String,
    /// BCP 47 locale tag controlling number separators.
    pub locale: String,
    /// Default title printed on exported reports.
    pub report_title: String,
}

/// The magic value that disables authentication.
pub const UNAUTHENTICATED_MAGIC: &str = "DANGEROUSLY_ALLOW_UNAUTHENTICATED_USERS";

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let auth_mode = match env::var("QM_PASSWORD_HASH") {
            Ok(hash) if hash == UNAUTHENTICATED_MAGIC => AuthMode::Unauthenticated,
            Ok(hash) if hash.starts_with("$argon2id$") => AuthMode::Password(hash),
            Ok(hash) if hash.is_empty() => {
                panic!(
                    "QM_PASSWORD_HASH is empty. Set a valid Argon2 hash or '{}' to \
                     explicitly allow unauthenticated access.",
                    UNAUTHENTICATED_MAGIC
                );
            }
            Ok(hash) => {
                panic!(
                    "Invalid QM_PASSWORD_HASH: must start with '$argon2id$' or be set \
                     to '{}'. Got: {}...",
                    UNAUTHENTICATED_MAGIC,
                    &hash[..hash.len().min(20)]
                );
            }
            Err(_) => {
                panic!(
                    "QM_PASSWORD_HASH environment variable is not set. Set a valid \
                     Argon2 hash or '{}' to explicitly allow unauthenticated access.",
                    UNAUTHENTICATED_MAGIC
                );
            }
        };

        Self {
            host: env::var("QM_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("QM_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(7080),
            database_path: env::var("QM_DATABASE_URL")
                .map(|v| {
                    PathBuf::from(
                        v.strip_prefix("sqlite://")
                            .or_else(|| v.strip_prefix("sqlite:"))
                            .unwrap_or(&v),
                    )
                })
                .unwrap_or_else(|_| PathBuf::from("data/quartermaster.db")),
            migrations_path: env::var("QM_MIGRATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("migrations")),
            static_path: env::var("QM_STATIC_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static")),
            auth_mode,
            currency: env::var("QM_CURRENCY").unwrap_or_else(|_| "BRL".into()),
            locale: env::var("QM_LOCALE").unwrap_or_else(|_| "pt-BR".into()),
            report_title: env::var("QM_REPORT_TITLE")
                .unwrap_or_else(|_| "Event Cost Report".into()),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
