use std::env;
use std::env::current_dir;
use std::fmt::Display;
use std::path::Path;

use config::Config;
use config::ConfigError;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgSslMode;

/// Global configuration, loaded once at startup. See `get_configuration`.
#[derive(Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    #[serde(default)]
    pub admin: AdminSettings,
}

/// Server configuration
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    /// Should be localhost on dev machine, 0.0.0.0 on prod
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

/// Database configuration
#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: Secret<String>,
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub database_name: String,

    /// Should be `true` in production.
    /// https://www.postgresql.org/docs/current/libpq-ssl.html#LIBPQ-SSL-SSLMODE-STATEMENTS
    pub require_ssl: bool,

    /// CA certificate used to verify the server; only honoured if the file
    /// exists
    #[serde(default)]
    pub ssl_root_cert: Option<String>,
}

/// Admin viewer configuration. A missing token does not prevent startup; the
/// admin endpoint will refuse every request instead.
#[derive(Deserialize, Clone, Default)]
pub struct AdminSettings {
    #[serde(default)]
    pub token: Option<Secret<String>>,
}

impl AdminSettings {
    /// The configured token, if it is present and non-blank
    pub fn token(&self) -> Option<&Secret<String>> {
        self.token
            .as_ref()
            .filter(|t| !t.expose_secret().trim().is_empty())
    }
}

impl DatabaseSettings {
    /// Connection options for the named database. The password stays wrapped
    /// until it is handed to sqlx.
    pub fn connection(&self) -> PgConnectOptions {
        self.connection_without_db().database(&self.database_name)
    }

    /// Connection options for the Postgres instance, without selecting a
    /// database. Used by tests to create a throwaway database.
    pub fn connection_without_db(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .username(&self.username)
            .password(self.password.expose_secret())
            .host(&self.host)
            .port(self.port);

        match self.ssl_root_cert.as_deref().filter(|p| !p.is_empty()) {
            Some(ca) if Path::new(ca).exists() => options
                .ssl_root_cert(ca)
                // chain is verified, hostname is not
                .ssl_mode(PgSslMode::VerifyCa),
            Some(ca) => {
                tracing::warn!(ssl_root_cert = %ca, "CA certificate not found, ignoring");
                options.ssl_mode(self.ssl_mode())
            }
            None => options.ssl_mode(self.ssl_mode()),
        }
    }

    fn ssl_mode(&self) -> PgSslMode {
        match self.require_ssl {
            true => PgSslMode::Require,
            false => PgSslMode::Prefer,
        }
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Display for Environment {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Environment::Local => "local",
                Environment::Production => "production",
            }
        )
    }
}

impl TryFrom<String> for Environment {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            e => Err(format!("Invalid environment: {e}")),
        }
    }
}

/// Deployment variables that predate the `APP_` scheme, mapped onto their
/// settings keys. These take precedence over everything else.
const DEPLOYMENT_VARS: [(&str, &str); 7] = [
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.database_name"),
    ("DB_USER", "database.username"),
    ("DB_PASS", "database.password"),
    ("DB_SSL_CA_PATH", "database.ssl_root_cert"),
    ("ADMIN_TOKEN", "admin.token"),
];

/// Load yaml configuration files at `<project_root>/configuration`, then
/// overlay environment variables.
///
/// Database fields must all be present, otherwise initialisation fails and the
/// server does not start.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let cfg_dir = current_dir()
        .map_err(|e| ConfigError::Foreign(Box::new(e)))?
        .join("configuration");

    let env: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".to_string())
        .try_into()
        .map_err(ConfigError::Message)?;

    let mut builder = Config::builder()
        .add_source(config::File::from(cfg_dir.join("base.yaml")))
        .add_source(config::File::from(cfg_dir.join(format!("{env}.yaml"))))
        // `APP_APPLICATION__PORT=5001` -> `Settings.application.port`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        );

    for (var, key) in DEPLOYMENT_VARS {
        builder = builder.set_override_option(key, env::var(var).ok())?;
    }

    builder.build()?.try_deserialize::<Settings>()
}
