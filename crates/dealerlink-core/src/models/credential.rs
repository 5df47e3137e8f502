use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Upper bound for [`Credential::issued_now`]: one hundred years.
pub const MAX_LIFETIME_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Short-lived access token obtained from the password-grant exchange.
///
/// The token itself is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            issued_at,
            expires_at,
        }
    }

    /// Credential issued now, living for `lifetime_secs` seconds.
    ///
    /// `None` when the lifetime is negative or the expiry is not representable.
    pub fn try_issued_now(token: impl Into<String>, lifetime_secs: i64) -> Option<Self> {
        if lifetime_secs < 0 {
            return None;
        }
        let issued_at = Utc::now();
        let lifetime = chrono::Duration::try_seconds(lifetime_secs)?;
        let expires_at = issued_at.checked_add_signed(lifetime)?;
        Some(Self::new(token, issued_at, expires_at))
    }

    /// Like [`try_issued_now`](Self::try_issued_now), with the lifetime clamped
    /// to `0..=MAX_LIFETIME_SECS`.
    pub fn issued_now(token: impl Into<String>, lifetime_secs: i64) -> Self {
        let issued_at = Utc::now();
        let lifetime = chrono::Duration::seconds(lifetime_secs.clamp(0, MAX_LIFETIME_SECS));
        Self::new(token, issued_at, issued_at + lifetime)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Time between issue and expiry.
    pub fn lifetime(&self) -> Duration {
        (self.expires_at - self.issued_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Valid iff `now < expires_at - safety_margin`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, safety_margin: Duration) -> bool {
        let Ok(margin) = chrono::Duration::from_std(safety_margin) else {
            return false;
        };
        match self.expires_at.checked_sub_signed(margin) {
            Some(deadline) => now < deadline,
            None => false,
        }
    }

    pub fn is_valid(&self, safety_margin: Duration) -> bool {
        self.is_valid_at(Utc::now(), safety_margin)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_until_safety_margin() {
        let issued = Utc::now();
        let cred = Credential::new("tok", issued, issued + chrono::Duration::seconds(3600));
        let margin = Duration::from_secs(60);

        assert!(cred.is_valid_at(issued, margin));
        assert!(cred.is_valid_at(issued + chrono::Duration::seconds(3539), margin));
        assert!(!cred.is_valid_at(issued + chrono::Duration::seconds(3540), margin));
        assert!(!cred.is_valid_at(issued + chrono::Duration::seconds(4000), margin));
    }

    #[test]
    fn lifetime_shorter_than_margin_is_never_valid() {
        let cred = Credential::issued_now("tok", 30);
        assert!(!cred.is_valid(Duration::from_secs(60)));
    }

    #[test]
    fn out_of_range_lifetime_is_rejected() {
        assert!(Credential::try_issued_now("tok", 10_000_000_000_000).is_none());
        assert!(Credential::try_issued_now("tok", i64::MAX).is_none());
        assert!(Credential::try_issued_now("tok", -1).is_none());

        let cred = Credential::try_issued_now("tok", 3600).unwrap();
        assert_eq!(cred.lifetime(), Duration::from_secs(3600));
    }

    #[test]
    fn issued_now_clamps_lifetime() {
        let cred = Credential::issued_now("tok", i64::MAX);
        assert_eq!(cred.lifetime(), Duration::from_secs(MAX_LIFETIME_SECS as u64));

        let cred = Credential::issued_now("tok", -5);
        assert_eq!(cred.lifetime(), Duration::ZERO);
    }

    #[test]
    fn debug_hides_token() {
        let cred = Credential::issued_now("super-secret-token", 3600);
        let rendered = format!("{:?}", cred);
        assert!(!rendered.contains("super-secret-token"));
    }
}
