//! JWT token generation and verification.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use super::gate::Rejection;
use crate::models::auth::{TokenClaims, User};

/// Default token lifetime in minutes.
pub const DEFAULT_EXPIRATION_MINUTES: i64 = 60;

/// Longest accepted token lifetime: one year.
pub const MAX_EXPIRATION_MINUTES: i64 = 365 * 24 * 60;

/// Signing and validation parameters for access tokens.
#[derive(Clone)]
pub struct JwtSettings {
    /// Shared HMAC secret.
    pub key: String,
    pub issuer: String,
    pub audience: String,
    pub expiration_minutes: i64,
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiration_minutes", &self.expiration_minutes)
            .finish()
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp_to_utc(self.claims.exp)
    }
}

/// Issues and verifies HS256 access tokens.
///
/// Holds no mutable state, so one instance is shared by every request.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenIssuer {
    /// Build an issuer, refusing a blank key, blank issuer/audience or a
    /// lifetime outside `1..=MAX_EXPIRATION_MINUTES`.
    pub fn new(settings: &JwtSettings) -> Result<Self, AuthError> {
        if settings.key.trim().is_empty() {
            return Err(AuthError::Configuration(
                "Jwt:Key is required to sign tokens".into(),
            ));
        }
        if settings.issuer.trim().is_empty() {
            return Err(AuthError::Configuration("Jwt:Issuer is required".into()));
        }
        if settings.audience.trim().is_empty() {
            return Err(AuthError::Configuration("Jwt:Audience is required".into()));
        }
        if settings.expiration_minutes <= 0 {
            return Err(AuthError::Configuration(
                "Jwt:ExpirationMinutes must be greater than zero".into(),
            ));
        }
        if settings.expiration_minutes > MAX_EXPIRATION_MINUTES {
            return Err(AuthError::Configuration(format!(
                "Jwt:ExpirationMinutes must be at most {MAX_EXPIRATION_MINUTES}"
            )));
        }
        let lifetime = Duration::try_minutes(settings.expiration_minutes).ok_or_else(|| {
            AuthError::Configuration("Jwt:ExpirationMinutes is out of range".into())
        })?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        // The accepted window is exactly [iat, exp].
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.key.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.key.as_bytes()),
            validation,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            lifetime,
        })
    }

    /// Sign a new token for `user`. Every call gets a fresh `jti`.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.issue_at(user, Utc::now())
    }

    /// Sign a token as if issued at `now`.
    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let expires = now
            .checked_add_signed(self.lifetime)
            .ok_or_else(|| AuthError::TokenError("token expiry out of range".into()))?;
        let iat = now.timestamp();
        let claims = TokenClaims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            role: user.role,
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat,
            nbf: iat,
            exp: expires.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenError(format!("jwt encode: {e}")))?;
        debug!(user_id = user.id, jti = %claims.jti, "issued access token");
        Ok(IssuedToken { token, claims })
    }

    /// Check signature, then issuer/audience/time window. Revocation is the
    /// gate's job, not this one.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, Rejection> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    Rejection::InvalidSignature
                }
                ErrorKind::ExpiredSignature => Rejection::InvalidClaims("token expired"),
                ErrorKind::ImmatureSignature => Rejection::InvalidClaims("token not yet valid"),
                ErrorKind::InvalidIssuer => Rejection::InvalidClaims("invalid issuer"),
                ErrorKind::InvalidAudience => Rejection::InvalidClaims("invalid audience"),
                ErrorKind::MissingRequiredClaim(_) => {
                    Rejection::InvalidClaims("missing required claim")
                }
                _ => Rejection::MalformedToken,
            })
    }
}

/// Convert a unix timestamp claim into a UTC instant, saturating on garbage.
pub fn timestamp_to_utc(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(ts, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;

    fn settings() -> JwtSettings {
        JwtSettings {
            key: "TestKeyForUnitTestsThatIsLongEnough123456".into(),
            issuer: "WishlistTestApi".into(),
            audience: "WishlistTestClient".into(),
            expiration_minutes: 60,
        }
    }

    fn user() -> User {
        User {
            id: 42,
            name: "JohnDoe".into(),
            role: Role::User,
        }
    }

    #[test]
    fn blank_key_is_rejected() {
        for key in ["", "   ", "\t\n"] {
            let mut s = settings();
            s.key = key.into();
            assert!(matches!(
                TokenIssuer::new(&s),
                Err(AuthError::Configuration(_))
            ));
        }
    }

    #[test]
    fn non_positive_lifetime_is_rejected() {
        let mut s = settings();
        s.expiration_minutes = 0;
        assert!(TokenIssuer::new(&s).is_err());
        s.expiration_minutes = -5;
        assert!(TokenIssuer::new(&s).is_err());
    }

    #[test]
    fn oversized_lifetime_is_a_configuration_error() {
        for minutes in [MAX_EXPIRATION_MINUTES + 1, 1_000_000_000_000, i64::MAX] {
            let mut s = settings();
            s.expiration_minutes = minutes;
            assert!(matches!(
                TokenIssuer::new(&s),
                Err(AuthError::Configuration(_))
            ));
        }
    }

    #[test]
    fn longest_lifetime_still_issues() {
        let mut s = settings();
        s.expiration_minutes = MAX_EXPIRATION_MINUTES;
        let issuer = TokenIssuer::new(&s).unwrap();
        let issued = issuer.issue(&user()).unwrap();
        assert_eq!(
            issued.claims.exp - issued.claims.iat,
            MAX_EXPIRATION_MINUTES * 60
        );
    }

    #[test]
    fn expiry_past_the_calendar_end_is_a_token_error() {
        let issuer = TokenIssuer::new(&settings()).unwrap();
        assert!(matches!(
            issuer.issue_at(&user(), DateTime::<Utc>::MAX_UTC),
            Err(AuthError::TokenError(_))
        ));
    }

    #[test]
    fn issued_token_carries_identity_claims() {
        let issuer = TokenIssuer::new(&settings()).unwrap();
        let issued = issuer.issue(&user()).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.name, "JohnDoe");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.iss, "WishlistTestApi");
        assert_eq!(claims.aud, "WishlistTestClient");
        assert_eq!(claims.exp - claims.iat, 60 * 60);
        assert_eq!(claims, issued.claims);
    }

    #[test]
    fn two_issues_yield_distinct_tokens_and_ids() {
        let issuer = TokenIssuer::new(&settings()).unwrap();
        let a = issuer.issue(&user()).unwrap();
        let b = issuer.issue(&user()).unwrap();
        assert_ne!(a.token, b.token);
        assert_ne!(a.claims.jti, b.claims.jti);
        assert!(issuer.verify(&a.token).is_ok());
        assert!(issuer.verify(&b.token).is_ok());
    }

    #[test]
    fn wrong_key_fails_signature_check() {
        let issuer = TokenIssuer::new(&settings()).unwrap();
        let mut other = settings();
        other.key = "SomeOtherKeyThatIsAlsoLongEnough987654321".into();
        let other = TokenIssuer::new(&other).unwrap();
        let token = other.issue(&user()).unwrap().token;
        assert_eq!(issuer.verify(&token), Err(Rejection::InvalidSignature));
    }

    #[test]
    fn expired_token_fails_time_check() {
        let issuer = TokenIssuer::new(&settings()).unwrap();
        let token = issuer
            .issue_at(&user(), Utc::now() - Duration::minutes(61))
            .unwrap()
            .token;
        assert_eq!(
            issuer.verify(&token),
            Err(Rejection::InvalidClaims("token expired"))
        );
    }

    #[test]
    fn future_token_is_not_yet_valid() {
        let issuer = TokenIssuer::new(&settings()).unwrap();
        let token = issuer
            .issue_at(&user(), Utc::now() + Duration::minutes(5))
            .unwrap()
            .token;
        assert_eq!(
            issuer.verify(&token),
            Err(Rejection::InvalidClaims("token not yet valid"))
        );
    }

    #[test]
    fn issuer_and_audience_must_match() {
        let issuer = TokenIssuer::new(&settings()).unwrap();

        let mut foreign_iss = settings();
        foreign_iss.issuer = "SomeoneElse".into();
        let token = TokenIssuer::new(&foreign_iss)
            .unwrap()
            .issue(&user())
            .unwrap()
            .token;
        assert_eq!(
            issuer.verify(&token),
            Err(Rejection::InvalidClaims("invalid issuer"))
        );

        let mut foreign_aud = settings();
        foreign_aud.audience = "SomeOtherClient".into();
        let token = TokenIssuer::new(&foreign_aud)
            .unwrap()
            .issue(&user())
            .unwrap()
            .token;
        assert_eq!(
            issuer.verify(&token),
            Err(Rejection::InvalidClaims("invalid audience"))
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let issuer = TokenIssuer::new(&settings()).unwrap();
        assert_eq!(issuer.verify("not.a.jwt"), Err(Rejection::MalformedToken));
        assert_eq!(issuer.verify(""), Err(Rejection::MalformedToken));
    }

    #[test]
    fn debug_output_redacts_key() {
        let rendered = format!("{:?}", settings());
        assert!(!rendered.contains("TestKeyForUnitTests"));
    }
}
