use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// How long to wait for background tasks after the server stops.
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub booking: BookingConfig,
    /// TTL for cached catalog and studio responses.
    pub cache_ttl_secs: u64,
    /// Redis backend for the response cache; in-memory when absent.
    pub redis_url: Option<String>,
}

/// Request limits per client IP: `max_requests` per `window_secs`, refilled gradually.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    /// Limit for `/auth/*`, which is credential-guessing surface.
    pub auth_max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Minutes a pending booking holds its slot while awaiting payment.
    pub payment_timeout_mins: i32,
    /// Public site URL; the payment gateway redirects the payer back here.
    pub public_base_url: String,
}

impl BookingConfig {
    /// Where the gateway sends the payer after checkout.
    pub fn return_url(&self, path: &str) -> String {
        format!("{}{path}", self.public_base_url.trim_end_matches('/'))
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} has an invalid value: '{raw}'")),
        Err(_) => default,
    }
}

impl ServerConfig {
    /// | Env Var                         | Default                 |
    /// |---------------------------------|-------------------------|
    /// | `HOST`                          | `0.0.0.0`               |
    /// | `PORT`                          | `3000`                  |
    /// | `CORS_ORIGINS`                  | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`          | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`         | `30`                    |
    /// | `RATE_LIMIT_MAX_REQUESTS`       | `100`                   |
    /// | `RATE_LIMIT_AUTH_MAX_REQUESTS`  | `10`                    |
    /// | `RATE_LIMIT_WINDOW_SECS`        | `60`                    |
    /// | `BOOKING_PAYMENT_TIMEOUT_MINS`  | `30`                    |
    /// | `PLATFORM_BASE_URL`             | `http://localhost:5173` |
    /// | `CACHE_TTL_SECS`                | `60`                    |
    /// | `REDIS_URL`                     | unset (in-memory cache) |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values; misconfiguration should fail at startup.
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            jwt: JwtConfig::from_env(),
            rate_limit: RateLimitConfig {
                max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", 100),
                auth_max_requests: env_or("RATE_LIMIT_AUTH_MAX_REQUESTS", 10),
                window_secs: env_or("RATE_LIMIT_WINDOW_SECS", 60),
            },
            booking: BookingConfig {
                payment_timeout_mins: env_or("BOOKING_PAYMENT_TIMEOUT_MINS", 30),
                public_base_url: std::env::var("PLATFORM_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:5173".into()),
            },
            cache_ttl_secs: env_or("CACHE_TTL_SECS", 60),
            redis_url: std::env::var("REDIS_URL").ok().filter(|u| !u.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_url_joins_without_double_slash() {
        let booking = BookingConfig {
            payment_timeout_mins: 30,
            public_base_url: "https://studiora.example/".into(),
        };
        assert_eq!(
            booking.return_url("/bookings/5"),
            "https://studiora.example/bookings/5"
        );
    }
}
