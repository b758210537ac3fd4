//! Environment-driven application configuration.
//!
//! Every setting is read through [`mockable::Env`] so the parsing rules can
//! be exercised with a `MockEnv`. Optional integrations (R2, SendGrid, SMTP,
//! Razorpay, Firebase) are disabled with a warning when their credentials
//! are absent; malformed values are always errors.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;
use mockable::Env;
use tracing::warn;
use url::Url;
use zeroize::Zeroizing;

use digidiploma::domain::Email;
use digidiploma::outbound::email::SmtpConfig;
use digidiploma::outbound::fcm::FcmConfig;
use digidiploma::outbound::mongo::MongoConfig;
use digidiploma::outbound::razorpay::RazorpayConfig;
use digidiploma::outbound::storage::R2Config;

const BOOL_EXPECTED: &str = "1|0|true|false|yes|no|y|n";
const DEV_JWT_SECRET: &str = "digidiploma-development-secret";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_DATABASE: &str = "digidiploma";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_EMAIL_FROM: &str = "noreply@digidiploma.in";
const DEFAULT_EMAIL_FROM_NAME: &str = "DigiDiploma";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_TOKEN_HOURS: i64 = 168;
const DEFAULT_REFRESH_GRACE_HOURS: i64 = 720;
const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u32 = 900;

/// Build mode for configuration validation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuildMode {
    /// Debug builds fall back to a development JWT secret.
    Debug,
    /// Release builds require `JWT_SECRET`.
    Release,
}

impl BuildMode {
    /// Determine the build mode from `cfg!(debug_assertions)`.
    #[must_use]
    pub fn from_debug_assertions() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }
}

/// Errors raised while reading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    /// A variable is present but contains an invalid value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    fn invalid(name: &'static str, value: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidEnv {
            name,
            value: value.into(),
            expected,
        }
    }
}

/// Where uploaded files go.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub r2: Option<R2Config>,
    pub r2_public_url: Option<String>,
    pub force_r2: bool,
}

/// Outgoing mail transports, tried in order SendGrid then SMTP.
#[derive(Clone)]
pub struct EmailConfig {
    pub from: Email,
    pub from_name: String,
    pub sendgrid_api_key: Option<Zeroizing<String>>,
    pub smtp: Option<SmtpConfig>,
}

/// Global per-IP request budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    /// Peers whose `X-Forwarded-For` names the real client.
    pub trusted_proxies: Vec<IpAddr>,
}

/// Fully parsed application settings.
#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub public_base_url: String,
    pub cors_origins: Vec<Url>,
    pub frontend_url: String,
    /// `None` selects the in-memory adapters.
    pub mongo: Option<MongoConfig>,
    pub jwt_secret: Zeroizing<String>,
    pub token_lifetime: Duration,
    pub refresh_grace: Duration,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub admin_email: Option<Email>,
    pub razorpay: Option<RazorpayConfig>,
    pub fcm: Option<FcmConfig>,
    pub rate_limit: RateLimitConfig,
    pub maintenance: bool,
}

impl AppConfig {
    /// Read every setting from `env`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a value is malformed or, in release
    /// builds, when `JWT_SECRET` is missing.
    pub fn from_env<E: Env>(env: &E, mode: BuildMode) -> Result<Self, ConfigError> {
        let bind_addr = parse_or(env, "BIND_ADDR", DEFAULT_BIND_ADDR, "host:port")?;
        let frontend_url = non_empty(env, "FRONTEND_URL")
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        Ok(Self {
            bind_addr,
            public_base_url: non_empty(env, "PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_owned()),
            cors_origins: cors_origins_from_env(env)?,
            frontend_url,
            mongo: non_empty(env, "MONGODB_URI").map(|uri| {
                let database =
                    non_empty(env, "MONGODB_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_owned());
                MongoConfig::new(uri, database)
            }),
            jwt_secret: jwt_secret_from_env(env, mode)?,
            token_lifetime: hours(env, "JWT_EXPIRES_IN_HOURS", DEFAULT_TOKEN_HOURS)?,
            refresh_grace: hours(env, "JWT_REFRESH_GRACE_HOURS", DEFAULT_REFRESH_GRACE_HOURS)?,
            storage: storage_from_env(env)?,
            email: email_from_env(env)?,
            admin_email: optional_email(env, "ADMIN_EMAIL")?,
            razorpay: razorpay_from_env(env),
            fcm: fcm_from_env(env),
            rate_limit: RateLimitConfig {
                max_requests: parse_or(
                    env,
                    "RATE_LIMIT_MAX",
                    &DEFAULT_RATE_LIMIT_MAX.to_string(),
                    "a positive integer",
                )?,
                window: Duration::seconds(i64::from(parse_or::<_, u32>(
                    env,
                    "RATE_LIMIT_WINDOW_SECS",
                    &DEFAULT_RATE_LIMIT_WINDOW_SECS.to_string(),
                    "a positive integer",
                )?)),
                trusted_proxies: trusted_proxies_from_env(env)?,
            },
            maintenance: flag(env, "MAINTENANCE_MODE")?,
        })
    }

    /// Frontend page receiving password-reset tokens.
    pub fn reset_url(&self) -> String {
        format!("{}/reset-password", self.frontend_url)
    }
}

fn non_empty<E: Env>(env: &E, name: &str) -> Option<String> {
    env.string(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_or<E, T>(
    env: &E,
    name: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError>
where
    E: Env,
    T: std::str::FromStr,
{
    let value = non_empty(env, name).unwrap_or_else(|| default.to_owned());
    value
        .parse()
        .map_err(|_| ConfigError::invalid(name, value, expected))
}

fn hours<E: Env>(env: &E, name: &'static str, default: i64) -> Result<Duration, ConfigError> {
    let value: i64 = parse_or(env, name, &default.to_string(), "a positive number of hours")?;
    if value <= 0 {
        return Err(ConfigError::invalid(
            name,
            value.to_string(),
            "a positive number of hours",
        ));
    }
    Ok(Duration::hours(value))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

fn flag<E: Env>(env: &E, name: &'static str) -> Result<bool, ConfigError> {
    match non_empty(env, name) {
        Some(value) => {
            parse_bool(&value).ok_or_else(|| ConfigError::invalid(name, value, BOOL_EXPECTED))
        }
        None => Ok(false),
    }
}

fn optional_email<E: Env>(env: &E, name: &'static str) -> Result<Option<Email>, ConfigError> {
    non_empty(env, name)
        .map(|value| {
            Email::new(&value).map_err(|_| ConfigError::invalid(name, value, "an email address"))
        })
        .transpose()
}

fn cors_origins_from_env<E: Env>(env: &E) -> Result<Vec<Url>, ConfigError> {
    let raw = non_empty(env, "CORS_ORIGINS").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_owned());
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            Url::parse(origin)
                .map_err(|_| ConfigError::invalid("CORS_ORIGINS", origin, "comma-separated URLs"))
        })
        .collect()
}

fn trusted_proxies_from_env<E: Env>(env: &E) -> Result<Vec<IpAddr>, ConfigError> {
    let Some(raw) = non_empty(env, "TRUSTED_PROXIES") else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(|ip| {
            ip.parse()
                .map_err(|_| ConfigError::invalid("TRUSTED_PROXIES", ip, "comma-separated IP addresses"))
        })
        .collect()
}

fn jwt_secret_from_env<E: Env>(env: &E, mode: BuildMode) -> Result<Zeroizing<String>, ConfigError> {
    match non_empty(env, "JWT_SECRET") {
        Some(secret) => Ok(Zeroizing::new(secret)),
        None if mode == BuildMode::Debug => {
            warn!("JWT_SECRET not set; using development secret");
            Ok(Zeroizing::new(DEV_JWT_SECRET.to_owned()))
        }
        None => Err(ConfigError::MissingEnv { name: "JWT_SECRET" }),
    }
}

fn storage_from_env<E: Env>(env: &E) -> Result<StorageConfig, ConfigError> {
    let credentials = (
        non_empty(env, "R2_ACCOUNT_ID"),
        non_empty(env, "R2_ACCESS_KEY_ID"),
        non_empty(env, "R2_SECRET_ACCESS_KEY"),
        non_empty(env, "R2_BUCKET_NAME"),
    );
    let r2 = match credentials {
        (Some(account_id), Some(access_key_id), Some(secret_access_key), Some(bucket)) => {
            Some(R2Config {
                account_id,
                access_key_id,
                secret_access_key,
                bucket,
            })
        }
        (None, None, None, None) => None,
        _ => {
            warn!("R2 credentials incomplete; storing uploads on local disk");
            None
        }
    };
    let force_r2 = flag(env, "FORCE_R2")?;
    if force_r2 && r2.is_none() {
        warn!("FORCE_R2 set without R2 credentials; uploads use local disk");
    }

    Ok(StorageConfig {
        upload_dir: PathBuf::from(
            non_empty(env, "UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_owned()),
        ),
        r2,
        r2_public_url: non_empty(env, "R2_PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_owned()),
        force_r2,
    })
}

fn email_from_env<E: Env>(env: &E) -> Result<EmailConfig, ConfigError> {
    let from = match optional_email(env, "EMAIL_FROM")? {
        Some(from) => from,
        None => Email::new(DEFAULT_EMAIL_FROM)
            .map_err(|_| ConfigError::invalid("EMAIL_FROM", DEFAULT_EMAIL_FROM, "an email address"))?,
    };
    let smtp = match non_empty(env, "SMTP_HOST") {
        Some(host) => Some(SmtpConfig {
            host,
            port: parse_or(env, "SMTP_PORT", &DEFAULT_SMTP_PORT.to_string(), "a port number")?,
            username: non_empty(env, "SMTP_USER"),
            password: non_empty(env, "SMTP_PASS"),
        }),
        None => None,
    };
    let sendgrid_api_key = non_empty(env, "SENDGRID_API_KEY").map(Zeroizing::new);
    if sendgrid_api_key.is_none() && smtp.is_none() {
        warn!("no email transport configured; outgoing mail is logged only");
    }

    Ok(EmailConfig {
        from,
        from_name: non_empty(env, "EMAIL_FROM_NAME")
            .unwrap_or_else(|| DEFAULT_EMAIL_FROM_NAME.to_owned()),
        sendgrid_api_key,
        smtp,
    })
}

fn razorpay_from_env<E: Env>(env: &E) -> Option<RazorpayConfig> {
    match (
        non_empty(env, "RAZORPAY_KEY_ID"),
        non_empty(env, "RAZORPAY_KEY_SECRET"),
    ) {
        (Some(key_id), Some(key_secret)) => {
            let webhook_secret = non_empty(env, "RAZORPAY_WEBHOOK_SECRET").map(Zeroizing::new);
            if webhook_secret.is_none() {
                warn!("RAZORPAY_WEBHOOK_SECRET not set; webhooks will be rejected");
            }
            Some(RazorpayConfig {
                key_id,
                key_secret: Zeroizing::new(key_secret),
                webhook_secret,
            })
        }
        _ => {
            warn!("Razorpay credentials not set; payment endpoints are disabled");
            None
        }
    }
}

fn fcm_from_env<E: Env>(env: &E) -> Option<FcmConfig> {
    match (
        non_empty(env, "FIREBASE_PROJECT_ID"),
        non_empty(env, "FIREBASE_CLIENT_EMAIL"),
        non_empty(env, "FIREBASE_PRIVATE_KEY"),
    ) {
        (Some(project_id), Some(client_email), Some(private_key)) => Some(FcmConfig {
            project_id,
            client_email,
            private_key,
        }),
        _ => {
            warn!("Firebase credentials not set; push notifications are disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockable::MockEnv;
    use rstest::rstest;
    use std::collections::HashMap;

    fn mock_env(vars: &[(&str, &str)]) -> MockEnv {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        let mut env = MockEnv::new();
        env.expect_string()
            .times(0..)
            .returning(move |key| vars.get(key).cloned());
        env
    }

    fn expect_error(result: Result<AppConfig, ConfigError>, label: &str) -> ConfigError {
        match result {
            Ok(_) => panic!("{label}"),
            Err(error) => error,
        }
    }

    #[rstest]
    fn debug_defaults_apply_when_nothing_is_set() {
        let config = AppConfig::from_env(&mock_env(&[]), BuildMode::Debug).expect("config");

        assert_eq!(config.bind_addr, "0.0.0.0:5000".parse().expect("addr"));
        assert_eq!(config.public_base_url, "http://localhost:5000");
        assert_eq!(config.reset_url(), "http://localhost:5173/reset-password");
        assert_eq!(
            config.cors_origins,
            vec![Url::parse("http://localhost:5173").expect("url")]
        );
        assert!(config.mongo.is_none());
        assert_eq!(config.jwt_secret.as_str(), DEV_JWT_SECRET);
        assert_eq!(config.token_lifetime, Duration::hours(168));
        assert_eq!(config.refresh_grace, Duration::hours(720));
        assert_eq!(config.storage.upload_dir, PathBuf::from("uploads"));
        assert!(config.storage.r2.is_none());
        assert_eq!(config.email.from.as_ref(), "noreply@digidiploma.in");
        assert!(config.razorpay.is_none());
        assert!(config.fcm.is_none());
        assert_eq!(
            config.rate_limit,
            RateLimitConfig {
                max_requests: 100,
                window: Duration::seconds(900),
                trusted_proxies: Vec::new(),
            }
        );
        assert!(!config.maintenance);
    }

    #[rstest]
    fn release_requires_jwt_secret() {
        let error = expect_error(
            AppConfig::from_env(&mock_env(&[]), BuildMode::Release),
            "expected missing JWT secret to fail",
        );
        assert!(matches!(error, ConfigError::MissingEnv { name: "JWT_SECRET" }));
    }

    #[rstest]
    fn reads_integrations_when_fully_configured() {
        let env = mock_env(&[
            ("JWT_SECRET", "s3cret"),
            ("MONGODB_URI", "mongodb://db:27017"),
            ("CORS_ORIGINS", "https://digidiploma.in, http://localhost:5173"),
            ("FRONTEND_URL", "https://digidiploma.in/"),
            ("R2_ACCOUNT_ID", "acc"),
            ("R2_ACCESS_KEY_ID", "key"),
            ("R2_SECRET_ACCESS_KEY", "secret"),
            ("R2_BUCKET_NAME", "materials"),
            ("R2_PUBLIC_URL", "https://pub-1.r2.dev/"),
            ("FORCE_R2", "yes"),
            ("SMTP_HOST", "smtp.example.in"),
            ("SMTP_PORT", "465"),
            ("ADMIN_EMAIL", "Admin@DigiDiploma.in"),
            ("RAZORPAY_KEY_ID", "rzp_test"),
            ("RAZORPAY_KEY_SECRET", "rzp_secret"),
            ("RAZORPAY_WEBHOOK_SECRET", "whsec"),
            ("MAINTENANCE_MODE", "1"),
            ("TRUSTED_PROXIES", "10.1.0.2, ::1"),
        ]);
        let config = AppConfig::from_env(&env, BuildMode::Release).expect("config");

        assert_eq!(config.mongo.as_ref().map(MongoConfig::database), Some("digidiploma"));
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.reset_url(), "https://digidiploma.in/reset-password");
        let r2 = config.storage.r2.as_ref().expect("r2 enabled");
        assert_eq!(r2.bucket, "materials");
        assert_eq!(
            config.storage.r2_public_url.as_deref(),
            Some("https://pub-1.r2.dev")
        );
        assert!(config.storage.force_r2);
        assert_eq!(config.email.smtp.as_ref().map(|smtp| smtp.port), Some(465));
        let admin = config.admin_email.as_ref().expect("admin email");
        assert_eq!(admin.as_ref(), "admin@digidiploma.in");
        let razorpay = config.razorpay.as_ref().expect("razorpay enabled");
        assert_eq!(razorpay.key_id, "rzp_test");
        assert!(razorpay.webhook_secret.is_some());
        assert!(config.maintenance);
        assert_eq!(
            config.rate_limit.trusted_proxies,
            vec![
                "10.1.0.2".parse::<IpAddr>().expect("ip"),
                "::1".parse::<IpAddr>().expect("ip"),
            ]
        );
    }

    #[rstest]
    fn partial_r2_credentials_disable_remote_storage() {
        let env = mock_env(&[("R2_ACCOUNT_ID", "acc"), ("R2_BUCKET_NAME", "materials")]);
        let config = AppConfig::from_env(&env, BuildMode::Debug).expect("config");
        assert!(config.storage.r2.is_none());
    }

    #[rstest]
    #[case("MAINTENANCE_MODE", "maybe")]
    #[case("FORCE_R2", "sometimes")]
    #[case("BIND_ADDR", "localhost")]
    #[case("JWT_EXPIRES_IN_HOURS", "0")]
    #[case("RATE_LIMIT_MAX", "-1")]
    #[case("CORS_ORIGINS", "not a url")]
    #[case("TRUSTED_PROXIES", "10.0.0.1, proxy.internal")]
    #[case("ADMIN_EMAIL", "nobody")]
    #[case("SMTP_PORT", "smtp")]
    fn rejects_malformed_values(#[case] name: &str, #[case] value: &str) {
        let mut vars = vec![(name, value)];
        if name == "SMTP_PORT" {
            vars.push(("SMTP_HOST", "smtp.example.in"));
        }
        let error = expect_error(
            AppConfig::from_env(&mock_env(&vars), BuildMode::Debug),
            "expected malformed value to fail",
        );
        assert!(
            matches!(error, ConfigError::InvalidEnv { name: invalid, .. } if invalid == name),
            "unexpected error: {error}"
        );
    }

    #[rstest]
    #[case("1", Some(true))]
    #[case("Yes", Some(true))]
    #[case("n", Some(false))]
    #[case("FALSE", Some(false))]
    #[case("on", None)]
    fn parses_boolean_spellings(#[case] raw: &str, #[case] expected: Option<bool>) {
        assert_eq!(parse_bool(raw), expected);
    }
}
