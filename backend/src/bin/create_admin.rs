//! Create or promote a DigiDiploma administrator account in MongoDB.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use clap::Parser;
use digidiploma::domain::{
    AccountService, AuditRecorder, Email, FileStorage, NewPassword, StorageAddressing,
};
use digidiploma::outbound::argon2_hasher::Argon2PasswordHasher;
use digidiploma::outbound::email::NoopMailer;
use digidiploma::outbound::jwt::JwtTokenService;
use digidiploma::outbound::mongo::{
    MongoAuditLogRepository, MongoConfig, MongoDatabase, MongoUserRepository,
};
use digidiploma::outbound::storage::LocalBlobStore;
use mockable::{Clock, DefaultClock};
use rand::RngCore;
use tokio::runtime::Builder;
use zeroize::Zeroizing;

const DEFAULT_DATABASE: &str = "digidiploma";
const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// `create-admin` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "create-admin",
    about = "Create a DigiDiploma admin account, or promote an existing one",
    version
)]
struct CliArgs {
    /// Display name for the administrator.
    #[arg(long, value_name = "name")]
    name: String,
    /// Login email address.
    #[arg(long, value_name = "email")]
    email: String,
    /// Password. Falls back to `ADMIN_PASSWORD` when omitted.
    #[arg(long, value_name = "password")]
    password: Option<String>,
    /// MongoDB connection string. Falls back to `MONGODB_URI` when omitted.
    #[arg(long = "mongodb-uri", value_name = "uri")]
    mongodb_uri: Option<String>,
    /// Database name.
    #[arg(long, value_name = "name", default_value = DEFAULT_DATABASE)]
    database: String,
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let email = Email::new(&args.email)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error.to_string()))?;
    let raw_password = resolve_required(args.password, "--password", "ADMIN_PASSWORD")?;
    let password = NewPassword::new(&raw_password)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error.to_string()))?;
    let uri = resolve_required(args.mongodb_uri, "--mongodb-uri", "MONGODB_URI")?;

    let db = MongoDatabase::connect(&MongoConfig::new(uri.as_str(), args.database.as_str()))
        .await
        .map_err(|error| io::Error::other(format!("connect to MongoDB: {error}")))?;
    db.ensure_indexes()
        .await
        .map_err(|error| io::Error::other(format!("create MongoDB indexes: {error}")))?;

    let accounts = account_service(&db)?;
    let (admin, created) = accounts
        .ensure_admin(&args.name, email, &password)
        .await
        .map_err(|error| io::Error::other(format!("create admin: {error}")))?;

    println!("status={}", if created { "created" } else { "promoted" });
    println!("id={}", admin.id);
    println!("email={}", admin.email);
    Ok(())
}

/// Wire the account service against MongoDB.
///
/// Tokens and mail are never produced by this command, so the signer uses a
/// throwaway secret and mail is discarded.
fn account_service(db: &MongoDatabase) -> io::Result<AccountService> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let upload_dir = env::var("UPLOAD_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR), PathBuf::from);
    let storage = FileStorage::new(
        None,
        Arc::new(LocalBlobStore::open(upload_dir)?),
        StorageAddressing::default(),
        false,
        Arc::clone(&clock),
    );
    let audit = AuditRecorder::new(
        Arc::new(MongoAuditLogRepository::new(db)),
        Arc::clone(&clock),
    );
    Ok(AccountService::new(
        Arc::new(MongoUserRepository::new(db)),
        Arc::new(Argon2PasswordHasher::default()),
        Arc::new(JwtTokenService::new(&ephemeral_secret(), Duration::minutes(1))),
        Arc::new(NoopMailer),
        storage,
        audit,
        clock,
        "",
    ))
}

fn ephemeral_secret() -> Zeroizing<String> {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Zeroizing::new(hex::encode(bytes))
}

fn resolve_required(explicit: Option<String>, flag: &str, env_name: &str) -> io::Result<String> {
    resolve_with(explicit, flag, env_name, env::var(env_name).ok())
}

fn resolve_with(
    explicit: Option<String>,
    flag: &str,
    env_name: &str,
    from_env: Option<String>,
) -> io::Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{flag} must not be empty when provided"),
            ));
        }
        return Ok(value);
    }
    match from_env {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{env_name} must not be empty"),
        )),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("missing value: set {flag} or {env_name}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for argument resolution.

    use clap::Parser;
    use rstest::rstest;

    use super::{CliArgs, DEFAULT_DATABASE, resolve_with};

    #[rstest]
    fn explicit_value_wins_over_environment() {
        let value = resolve_with(
            Some("mongodb://cli".to_owned()),
            "--mongodb-uri",
            "MONGODB_URI",
            Some("mongodb://env".to_owned()),
        )
        .expect("explicit value");
        assert_eq!(value, "mongodb://cli");
    }

    #[rstest]
    fn falls_back_to_environment() {
        let value = resolve_with(
            None,
            "--mongodb-uri",
            "MONGODB_URI",
            Some("mongodb://env".to_owned()),
        )
        .expect("env value");
        assert_eq!(value, "mongodb://env");
    }

    #[rstest]
    #[case(Some("  ".to_owned()), None, "--password must not be empty")]
    #[case(None, Some(String::new()), "ADMIN_PASSWORD must not be empty")]
    #[case(None, None, "set --password or ADMIN_PASSWORD")]
    fn rejects_missing_or_blank_values(
        #[case] explicit: Option<String>,
        #[case] from_env: Option<String>,
        #[case] message: &str,
    ) {
        let error = resolve_with(explicit, "--password", "ADMIN_PASSWORD", from_env)
            .expect_err("value should be rejected");
        assert!(error.to_string().contains(message), "{error}");
    }

    #[rstest]
    fn parses_arguments_with_default_database() {
        let args = CliArgs::try_parse_from([
            "create-admin",
            "--name",
            "Site Admin",
            "--email",
            "admin@digidiploma.in",
        ])
        .expect("arguments parse");
        assert_eq!(args.database, DEFAULT_DATABASE);
        assert!(args.password.is_none());
        assert!(args.mongodb_uri.is_none());
    }
}
