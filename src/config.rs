use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_secs: u64,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub admin_password: String,
    pub admin_session_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub slot_capacity: u64,
    pub booking_code_prefix: String,
    pub verification_code_ttl_minutes: i64,
    pub expose_verification_codes: bool,
}

/// Rules the booking lifecycle enforces.
#[derive(Clone, Debug)]
pub struct BookingPolicy {
    /// Active bookings allowed at one (date, time) slot
    pub slot_capacity: u64,
    pub code_prefix: String,
    pub query_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AuthPolicy {
    pub code_ttl: chrono::Duration,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub query_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("DB_MAX_CONNECTIONS must be a number"),
            db_timeout_secs: env::var("DB_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("DB_TIMEOUT_SECS must be a number"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "168".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a number"),
            admin_password: env::var("ADMIN_PASSWORD")
                .expect("ADMIN_PASSWORD must be set"),
            admin_session_hours: env::var("ADMIN_SESSION_HOURS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .expect("ADMIN_SESSION_HOURS must be a number"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            slot_capacity: env::var("SLOT_CAPACITY")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("SLOT_CAPACITY must be a number"),
            booking_code_prefix: env::var("BOOKING_CODE_PREFIX")
                .unwrap_or_else(|_| "CL-".to_string()),
            verification_code_ttl_minutes: env::var("VERIFICATION_CODE_TTL_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .expect("VERIFICATION_CODE_TTL_MINUTES must be a number"),
            // No SMS gateway is wired in, so codes go back in the response by default
            expose_verification_codes: env::var("EXPOSE_VERIFICATION_CODES")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }

    pub fn booking_policy(&self) -> BookingPolicy {
        BookingPolicy {
            slot_capacity: self.slot_capacity,
            code_prefix: self.booking_code_prefix.to_uppercase(),
            query_timeout: self.query_timeout(),
        }
    }

    pub fn auth_policy(&self) -> AuthPolicy {
        AuthPolicy {
            code_ttl: chrono::Duration::minutes(self.verification_code_ttl_minutes),
            jwt_secret: self.jwt_secret.clone(),
            jwt_expiration_hours: self.jwt_expiration_hours,
            query_timeout: self.query_timeout(),
        }
    }
}
