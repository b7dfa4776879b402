//! Per-IP request limits backed by `governor`'s keyed GCRA limiters.
//!
//! Two independent limiters exist: one for `/auth/*` and one for the rest
//! of the API. Each allows a burst of `limit` requests and replenishes one
//! request every `window / limit`. Idle keys are dropped by the
//! housekeeping job through [`RateLimiter::sweep`].

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::Quota;

use crate::config::RateLimitConfig;

type KeyedLimiter = governor::RateLimiter<
    String,
    DefaultKeyedStateStore<String>,
    DefaultClock,
    StateInformationMiddleware,
>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Auth,
    Api,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Auth => "auth",
            Bucket::Api => "api",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

pub struct RateLimiter {
    auth: KeyedLimiter,
    api: KeyedLimiter,
    clock: DefaultClock,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let window = Duration::from_secs(config.window_secs.max(1));
        Self {
            auth: keyed(config.auth_max_requests, window),
            api: keyed(config.max_requests, window),
            clock: DefaultClock::default(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request from `ip` against `bucket`.
    pub fn check(&self, bucket: Bucket, ip: &str) -> Decision {
        match self.limiter(bucket).check_key(&ip.to_string()) {
            Ok(snapshot) => Decision::Allowed {
                remaining: snapshot.remaining_burst_capacity(),
            },
            Err(not_until) => Decision::Limited {
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }

    /// Forget keys whose state has fully replenished.
    pub fn sweep(&self) {
        for limiter in [&self.auth, &self.api] {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.auth.len() + self.api.len()
    }

    fn limiter(&self, bucket: Bucket) -> &KeyedLimiter {
        match bucket {
            Bucket::Auth => &self.auth,
            Bucket::Api => &self.api,
        }
    }
}

fn keyed(limit: u32, window: Duration) -> KeyedLimiter {
    let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(window / burst.get())
        .map(|q| q.allow_burst(burst))
        .unwrap_or_else(|| Quota::per_second(burst));
    governor::RateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn limiter(api: u32, auth: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            max_requests: api,
            auth_max_requests: auth,
            window_secs: 60,
        })
    }

    #[test]
    fn allows_up_to_limit_then_blocks() {
        let limiter = limiter(2, 2);

        assert_eq!(limiter.check(Bucket::Api, "ip"), Decision::Allowed { remaining: 1 });
        assert_eq!(limiter.check(Bucket::Api, "ip"), Decision::Allowed { remaining: 0 });
        assert_matches!(
            limiter.check(Bucket::Api, "ip"),
            Decision::Limited { retry_after }
                if retry_after > Duration::ZERO && retry_after <= Duration::from_secs(30)
        );
    }

    #[test]
    fn keys_are_independent() {
        let limiter = limiter(1, 1);
        limiter.check(Bucket::Api, "a");
        assert_matches!(limiter.check(Bucket::Api, "a"), Decision::Limited { .. });
        assert_matches!(limiter.check(Bucket::Api, "b"), Decision::Allowed { .. });
    }

    #[test]
    fn buckets_are_independent() {
        let limiter = limiter(5, 1);
        limiter.check(Bucket::Auth, "ip");
        assert_matches!(limiter.check(Bucket::Auth, "ip"), Decision::Limited { .. });
        assert_matches!(
            limiter.check(Bucket::Api, "ip"),
            Decision::Allowed { remaining: 4 }
        );
    }

    #[test]
    fn zero_limit_still_allows_one_request() {
        let limiter = limiter(0, 0);
        assert_matches!(limiter.check(Bucket::Api, "ip"), Decision::Allowed { remaining: 0 });
        assert_matches!(limiter.check(Bucket::Api, "ip"), Decision::Limited { .. });
    }

    #[test]
    fn sweep_keeps_keys_that_are_still_limited() {
        let limiter = limiter(1, 1);
        limiter.check(Bucket::Api, "a");
        limiter.check(Bucket::Auth, "b");
        assert_eq!(limiter.tracked_keys(), 2);

        limiter.sweep();
        assert_eq!(limiter.tracked_keys(), 2);
        assert_matches!(limiter.check(Bucket::Api, "a"), Decision::Limited { .. });
    }
}
