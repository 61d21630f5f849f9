use std::{env, str::FromStr, time::Duration};

use derive_more::{Display, Error};
use dotenv::dotenv;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_MAIL_FROM: &str = "Eventora <no-reply@eventora.com>";

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display(fmt = "environment variable '{}' must be set", name)]
    Missing { name: &'static str },

    #[display(fmt = "environment variable '{}' has invalid value '{}'", name, value)]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { url: String },
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTransport {
    Log,
    Smtp(SmtpSettings),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub store: StoreBackend,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub jwt_secret: String,
    pub admin_emails: Vec<String>,
    pub mail_transport: MailTransport,
    pub mail_from: String,
    pub reminder_interval: Duration,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match lookup("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres {
                url: required(&lookup, "DATABASE_URL")?,
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let mail_transport = match lookup("MAIL_TRANSPORT").as_deref() {
            None | Some("log") => MailTransport::Log,
            Some("smtp") => MailTransport::Smtp(SmtpSettings {
                host: required(&lookup, "SMTP_HOST")?,
                port: parsed(&lookup, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
                username: required(&lookup, "SMTP_USERNAME")?,
                password: required(&lookup, "SMTP_PASSWORD")?,
            }),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "MAIL_TRANSPORT",
                    value: other.to_string(),
                })
            }
        };

        let admin_emails = lookup("ADMIN_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(|email| email.trim().to_lowercase())
                    .filter(|email| !email.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parsed(&lookup, "PORT", DEFAULT_PORT)?,
            store,
            db_max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            db_acquire_timeout: Duration::from_secs(parsed(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            )?),
            jwt_secret: required(&lookup, "JWT_SECRET")?,
            admin_emails,
            mail_transport,
            mail_from: lookup("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            reminder_interval: Duration::from_secs(non_zero(
                &lookup,
                "REMINDER_INTERVAL_SECS",
                DEFAULT_REMINDER_INTERVAL_SECS,
            )?),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }
}

fn required<F>(lookup: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing { name })
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Like [`parsed`], but a zero value is rejected.
fn non_zero<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parsed(lookup, name, default)? {
        0 => Err(ConfigError::Invalid {
            name,
            value: "0".to_string(),
        }),
        value => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_for_memory_store() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.port, 8080);
        assert_eq!(config.mail_transport, MailTransport::Log);
        assert_eq!(config.reminder_interval, Duration::from_secs(86_400));
        assert!(config.admin_emails.is_empty());
    }

    #[test]
    fn postgres_store_requires_database_url() {
        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "environment variable 'DATABASE_URL' must be set"
        );
    }

    #[test]
    fn admin_emails_are_normalized() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
            ("ADMIN_EMAILS", " Admin@Eventora.com, ,ops@eventora.com"),
        ]))
        .unwrap();
        assert_eq!(
            config.admin_emails,
            vec!["admin@eventora.com".to_string(), "ops@eventora.com".to_string()]
        );
        assert!(config.is_admin_email("ADMIN@eventora.com"));
        assert!(!config.is_admin_email("guest@eventora.com"));
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn zero_reminder_interval_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
            ("REMINDER_INTERVAL_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "REMINDER_INTERVAL_SECS",
                ..
            }
        ));

        let config = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
            ("REMINDER_INTERVAL_SECS", "90"),
        ]))
        .unwrap();
        assert_eq!(config.reminder_interval, Duration::from_secs(90));
    }

    #[test]
    fn smtp_transport_reads_credentials() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "s3cret"),
            ("MAIL_TRANSPORT", "smtp"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_USERNAME", "mailer"),
            ("SMTP_PASSWORD", "pw"),
        ]))
        .unwrap();
        assert_eq!(
            config.mail_transport,
            MailTransport::Smtp(SmtpSettings {
                host: "smtp.example.com".to_string(),
                port: 587,
                username: "mailer".to_string(),
                password: "pw".to_string(),
            })
        );
    }
}
