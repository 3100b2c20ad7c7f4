use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use staffhub_core::AppError;
use staffhub_domain::DEFAULT_PAGE_SIZE;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct SmtpRuntimeConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub enum EmailProviderConfig {
    Console,
    Smtp(SmtpRuntimeConfig),
}

#[derive(Debug, Clone)]
pub enum StoreBackendConfig {
    Memory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub endpoint: String,
    pub max_attempts: u8,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub store_backend: StoreBackendConfig,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub blob_root: PathBuf,
    pub public_files_url: String,
    pub page_size: usize,
    pub email_notifications: bool,
    pub webhook: Option<WebhookConfig>,
    pub email_provider: EmailProviderConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_owned())
            .as_str()
        {
            "postgres" => StoreBackendConfig::Postgres {
                database_url: required_non_empty_env("DATABASE_URL")?,
            },
            "memory" => StoreBackendConfig::Memory,
            other => {
                return Err(AppError::Validation(format!(
                    "STORE_BACKEND must be either 'postgres' or 'memory', got '{other}'"
                )));
            }
        };
        if migrate_only && matches!(store_backend, StoreBackendConfig::Memory) {
            return Err(AppError::Validation(
                "the migrate command requires STORE_BACKEND=postgres".to_owned(),
            ));
        }

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parse_env("API_PORT", 3001_u16)?;

        let blob_root = PathBuf::from(
            env::var("BLOB_ROOT").unwrap_or_else(|_| "./data/blobs".to_owned()),
        );
        let public_files_url = env::var("PUBLIC_FILES_URL")
            .unwrap_or_else(|_| format!("http://{api_host}:{api_port}/files"));

        let page_size = parse_env("PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(AppError::Validation(
                "PAGE_SIZE must be greater than zero".to_owned(),
            ));
        }

        let email_notifications = env::var("NOTIFY_BY_EMAIL")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");

        let webhook = env::var("NOTIFICATION_WEBHOOK_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(|endpoint| -> Result<WebhookConfig, AppError> {
                Ok(WebhookConfig {
                    endpoint,
                    max_attempts: parse_env("NOTIFICATION_WEBHOOK_MAX_ATTEMPTS", 3_u8)?,
                    retry_backoff_ms: parse_env("NOTIFICATION_WEBHOOK_BACKOFF_MS", 250_u64)?,
                })
            })
            .transpose()?;

        let email_provider = match env::var("EMAIL_PROVIDER")
            .unwrap_or_else(|_| "console".to_owned())
            .as_str()
        {
            "console" => EmailProviderConfig::Console,
            "smtp" => {
                let port = required_non_empty_env("SMTP_PORT")?
                    .parse::<u16>()
                    .map_err(|error| AppError::Validation(format!("invalid SMTP_PORT: {error}")))?;
                EmailProviderConfig::Smtp(SmtpRuntimeConfig {
                    host: required_non_empty_env("SMTP_HOST")?,
                    port,
                    username: required_non_empty_env("SMTP_USERNAME")?,
                    password: required_non_empty_env("SMTP_PASSWORD")?,
                    from_address: required_non_empty_env("SMTP_FROM_ADDRESS")?,
                })
            }
            other => {
                return Err(AppError::Validation(format!(
                    "EMAIL_PROVIDER must be either 'console' or 'smtp', got '{other}'"
                )));
            }
        };

        Ok(Self {
            migrate_only,
            store_backend,
            frontend_url,
            api_host,
            api_port,
            blob_root,
            public_files_url,
            page_size,
            email_notifications,
            webhook,
            email_provider,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}
