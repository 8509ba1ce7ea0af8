use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::error::{AppError, AppResult};

/// Cookie carrying the session token.
pub const COOKIE_NAME: &str = "jwt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies session tokens. Stateless: a token stands on its own
/// until it expires, there is no server-side session table.
pub struct Authenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl_seconds: i64,
}

impl Authenticator {
    pub fn new(secret: &str, token_ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl_seconds,
        }
    }

    pub fn from_config(cfg: &crate::config::Config) -> anyhow::Result<Self> {
        if cfg.auth.secret().len() < 32 {
            anyhow::bail!("auth.secret_key must be at least 32 characters");
        }
        Ok(Self::new(cfg.auth.secret(), cfg.auth.token_ttl_seconds()))
    }

    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    pub fn issue(&self, username: &str) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: username.to_string(),
            iat: now,
            exp: now + self.token_ttl_seconds,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Persistence(anyhow::anyhow!("failed to sign token: {e}")))
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

pub struct Admins<'a> {
    db: &'a Database,
}

impl<'a> Admins<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<Admin>> {
        let query = "SELECT id, username, password_hash FROM admins WHERE username = ? LIMIT 1";
        let mut rows = self
            .db
            .connection()
            .query(query, libsql::params![username])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Admin {
                id: row.get(0)?,
                username: row.get(1)?,
                password_hash: row.get(2)?,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn create(&self, username: &str, password: &str) -> AppResult<()> {
        let password_hash = hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Persistence(anyhow::anyhow!("failed to hash password: {e}")))?;

        self.db
            .connection()
            .execute(
                "INSERT INTO admins (username, password_hash) VALUES (?, ?)",
                libsql::params![username, password_hash],
            )
            .await?;
        Ok(())
    }

    pub async fn verify_credentials(&self, username: &str, password: &str) -> AppResult<Admin> {
        let admin = self
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Admin not found".to_string()))?;

        if verify(password, &admin.password_hash).unwrap_or(false) {
            Ok(admin)
        } else {
            Err(AppError::Unauthorized("Auth Failed".to_string()))
        }
    }

    /// Provisions the configured admin account when the table is empty, so a
    /// fresh install can sign in.
    pub async fn ensure_default(&self, username: &str, password: &str) -> AppResult<()> {
        let mut rows = self
            .db
            .connection()
            .query("SELECT COUNT(*) FROM admins", ())
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };

        if count == 0 {
            tracing::warn!(username, "no admins configured, provisioning default admin");
            self.create(username, password).await?;
        }
        Ok(())
    }
}
