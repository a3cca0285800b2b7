//! Per-request token acceptance.
//!
//! A request moves through fixed stages and stops at the first failure:
//! bearer extraction, signature check, issuer/audience/time-window check,
//! revocation check. Only a request that clears every stage gets an
//! [`Identity`]. No stage touches the database.

use std::fmt;

use tracing::debug;

use super::blacklist::TokenBlacklist;
use super::jwt::{TokenIssuer, timestamp_to_utc};
use crate::models::auth::{Identity, TokenClaims};

/// Why a request was refused. Every variant maps to 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No `Authorization` header.
    MissingToken,
    /// Header present but not `Bearer <token>`, or the token does not parse.
    MalformedToken,
    InvalidSignature,
    /// Issuer, audience or time window rejected.
    InvalidClaims(&'static str),
    Revoked,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingToken => f.write_str("Missing authorization header"),
            Rejection::MalformedToken => f.write_str("Malformed bearer token"),
            Rejection::InvalidSignature => f.write_str("Invalid token signature"),
            Rejection::InvalidClaims(reason) => write!(f, "Invalid token: {reason}"),
            Rejection::Revoked => f.write_str("Token has been revoked"),
        }
    }
}

impl std::error::Error for Rejection {}

/// Pull the token out of an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, Rejection> {
    let header = header.ok_or(Rejection::MissingToken)?;
    let (scheme, token) = header
        .trim()
        .split_once(' ')
        .ok_or(Rejection::MalformedToken)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(Rejection::MalformedToken);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(Rejection::MalformedToken);
    }
    Ok(token)
}

/// Run every stage against an `Authorization` header value.
pub fn authenticate(
    header: Option<&str>,
    issuer: &TokenIssuer,
    blacklist: &TokenBlacklist,
) -> Result<Identity, Rejection> {
    let token = bearer_token(header)?;
    let claims = issuer.verify(token)?;
    if blacklist.is_revoked(&claims.jti) {
        debug!(jti = %claims.jti, "rejected revoked token");
        return Err(Rejection::Revoked);
    }
    identity_from_claims(claims)
}

fn identity_from_claims(claims: TokenClaims) -> Result<Identity, Rejection> {
    let user_id = claims
        .sub
        .parse::<i64>()
        .map_err(|_| Rejection::InvalidClaims("subject is not a user id"))?;
    if claims.jti.is_empty() {
        return Err(Rejection::InvalidClaims("missing token id"));
    }
    Ok(Identity {
        user_id,
        name: claims.name,
        role: claims.role,
        token_id: claims.jti,
        expires_at: timestamp_to_utc(claims.exp),
    })
}
