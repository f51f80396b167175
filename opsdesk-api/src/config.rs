/// Configuration management for the API server
///
/// Loaded once at startup from environment variables (and a `.env` file in
/// development).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 characters)
/// - `CORS_ORIGINS`: `*` or a comma-separated list of origins (default: `*`)
/// - `BOOTSTRAP_LEAD_EMAIL` / `BOOTSTRAP_LEAD_PASSWORD`: seed a first lead
///   when no lead exists yet (optional, both or neither)
/// - `RUST_LOG`, `LOG_FORMAT`: read by the logging setup in `main`
///
/// # Example
///
/// ```no_run
/// use opsdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub cors: CorsConfig,

    /// First lead account, created at startup if no lead exists
    pub bootstrap_lead: Option<BootstrapLead>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing secret; generate with `openssl rand -hex 32`
    pub secret: String,
}

/// Allowed CORS origins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsConfig {
    /// `Access-Control-Allow-Origin: *`
    Any,

    /// Only these origins
    Origins(Vec<String>),
}

impl CorsConfig {
    /// Parses `*` or a comma-separated origin list; blank entries are ignored
    pub fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            CorsConfig::Any
        } else {
            CorsConfig::Origins(origins)
        }
    }
}

#[derive(Clone)]
pub struct BootstrapLead {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapLead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapLead")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Fails if a required variable is missing, a number does not parse,
    /// the JWT secret is too short, or only one bootstrap variable is set.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is not a valid port: {}", e))?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is not a number: {}", e))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        validate_jwt_secret(&jwt_secret)?;

        let cors = CorsConfig::parse(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        let bootstrap_lead = bootstrap_lead(
            env::var("BOOTSTRAP_LEAD_EMAIL").ok(),
            env::var("BOOTSTRAP_LEAD_PASSWORD").ok(),
        )?;

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            cors,
            bootstrap_lead,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn validate_jwt_secret(secret: &str) -> anyhow::Result<()> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        anyhow::bail!(
            "JWT_SECRET must be at least {} characters long",
            MIN_JWT_SECRET_LENGTH
        );
    }
    Ok(())
}

fn bootstrap_lead(
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<Option<BootstrapLead>> {
    let email = email.filter(|e| !e.trim().is_empty());
    let password = password.filter(|p| !p.is_empty());

    match (email, password) {
        (Some(email), Some(password)) => Ok(Some(BootstrapLead { email, password })),
        (None, None) => Ok(None),
        _ => anyhow::bail!(
            "BOOTSTRAP_LEAD_EMAIL and BOOTSTRAP_LEAD_PASSWORD must be set together"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            cors: CorsConfig::Any,
            bootstrap_lead: None,
        };

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_cors_parse() {
        assert_eq!(CorsConfig::parse("*"), CorsConfig::Any);
        assert_eq!(CorsConfig::parse(""), CorsConfig::Any);
        assert_eq!(
            CorsConfig::parse("https://a.example, https://b.example,"),
            CorsConfig::Origins(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
    }

    #[test]
    fn test_jwt_secret_length() {
        assert!(validate_jwt_secret("short").is_err());
        assert!(validate_jwt_secret(&"x".repeat(32)).is_ok());
    }

    #[test]
    fn test_bootstrap_lead_pairs() {
        assert!(bootstrap_lead(None, None).unwrap().is_none());

        let lead = bootstrap_lead(Some("lead@example.com".into()), Some("secret1".into()))
            .unwrap()
            .unwrap();
        assert_eq!(lead.email, "lead@example.com");
        assert!(!format!("{:?}", lead).contains("secret1"));

        assert!(bootstrap_lead(Some("lead@example.com".into()), None).is_err());
        assert!(bootstrap_lead(None, Some("secret1".into())).is_err());
    }
}
