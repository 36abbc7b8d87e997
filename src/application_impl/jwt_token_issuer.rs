use crate::application_impl::RefreshFingerprinter;
use crate::application_port::{SessionError, TokenIssuer};
use crate::domain_model::{IssuedToken, SessionId, TokenClaims, TokenKind, TokenLifetimes, UserId};
use crate::domain_port::Clock;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct JwtConfig {
    pub access_secret: Vec<u8>,
    pub refresh_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub clock_skew: Duration,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        KeyPair {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// HS256 issuer with one secret per token kind, so a refresh token can never pass as
/// an access token or vice versa. Expiry is checked against the injected clock rather
/// than the system time `jsonwebtoken` would use.
pub struct JwtHs256Issuer {
    lifetimes: TokenLifetimes,
    access_keys: KeyPair,
    refresh_keys: KeyPair,
    validation: Validation,
    fingerprinter: RefreshFingerprinter,
    clock: Arc<dyn Clock>,
}

impl JwtHs256Issuer {
    pub fn new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;

        JwtHs256Issuer {
            lifetimes: TokenLifetimes {
                access: cfg.access_ttl,
                refresh: cfg.refresh_ttl,
                clock_skew: cfg.clock_skew,
            },
            access_keys: KeyPair::from_secret(&cfg.access_secret),
            refresh_keys: KeyPair::from_secret(&cfg.refresh_secret),
            validation,
            fingerprinter: RefreshFingerprinter::new(cfg.refresh_secret),
            clock,
        }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access_keys,
            TokenKind::Refresh => &self.refresh_keys,
        }
    }

    fn sign(
        &self,
        kind: TokenKind,
        user: &UserId,
        session: Option<&SessionId>,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<IssuedToken, SessionError> {
        let iat = issued_at.timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| SessionError::InternalError(format!("{} ttl out of range", kind)))?;
        let exp = iat
            .checked_add(ttl_secs)
            .ok_or_else(|| SessionError::InternalError(format!("{} expiry overflow", kind)))?;

        let claims = TokenClaims {
            sub: user.to_string(),
            sid: session.map(|s| s.to_string()),
            iat,
            iat_ms: issued_at.timestamp_millis(),
            exp,
            jti: Self::gen_jti(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys(kind).encoding,
        )
        .map_err(|e| SessionError::InternalError(e.to_string()))?;

        Ok(IssuedToken {
            token,
            issued_at: to_datetime(iat)?,
            expires_at: to_datetime(exp)?,
        })
    }
}

fn to_datetime(secs: i64) -> Result<DateTime<Utc>, SessionError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| SessionError::InternalError(format!("timestamp out of range: {}", secs)))
}

impl TokenIssuer for JwtHs256Issuer {
    fn issue_access(
        &self,
        user: &UserId,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, SessionError> {
        self.sign(
            TokenKind::Access,
            user,
            None,
            issued_at,
            self.lifetimes.access,
        )
    }

    fn issue_refresh(
        &self,
        user: &UserId,
        session: &SessionId,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, SessionError> {
        self.sign(
            TokenKind::Refresh,
            user,
            Some(session),
            issued_at,
            self.lifetimes.refresh,
        )
    }

    fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, SessionError> {
        let data = decode::<TokenClaims>(token, &self.keys(kind).decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    SessionError::TokenSignatureInvalid
                }
                _ => SessionError::TokenMalformed,
            })?;
        let claims = data.claims;

        if kind == TokenKind::Refresh && claims.sid.is_none() {
            return Err(SessionError::TokenMalformed);
        }

        let skew = i64::try_from(self.lifetimes.clock_skew.as_secs()).unwrap_or(i64::MAX);
        let now = self.clock.now().timestamp();
        if now > claims.exp.saturating_add(skew) {
            return Err(SessionError::TokenExpired);
        }

        Ok(claims)
    }

    fn fingerprint(&self, refresh_token: &str) -> Result<String, SessionError> {
        self.fingerprinter.fingerprint(refresh_token)
    }

    fn fingerprint_matches(&self, refresh_token: &str, fingerprint: &str) -> bool {
        self.fingerprinter.matches(refresh_token, fingerprint)
    }

    fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }
}
