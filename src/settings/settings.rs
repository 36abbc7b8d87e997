use anyhow::{Result, anyhow, bail};
use config::{Config, ConfigBuilder, File, builder::DefaultState};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub store: Store,
    pub log: Log,
}

#[derive(Deserialize)]
pub struct Auth {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    #[serde(deserialize_with = "de_duration")]
    pub access_token_expiry: Duration,
    #[serde(deserialize_with = "de_duration")]
    pub refresh_token_expiry: Duration,
    #[serde(deserialize_with = "de_duration")]
    pub clock_skew: Duration,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("access_token_secret", &"<redacted>")
            .field("refresh_token_secret", &"<redacted>")
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct Store {
    pub backend: String, // "redis" or "memory"
    pub url: String,
    pub key_prefix: String,
    #[serde(deserialize_with = "de_duration")]
    pub op_timeout: Duration,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the url may carry a password
        f.debug_struct("Store")
            .field("backend", &self.backend)
            .field("url", &"<redacted>")
            .field("key_prefix", &self.key_prefix)
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let auth = &self.auth;
        if auth.access_token_secret.is_empty() || auth.refresh_token_secret.is_empty() {
            bail!("token secrets must not be empty");
        }
        if auth.access_token_secret == auth.refresh_token_secret {
            bail!("access and refresh tokens must be signed with different secrets");
        }
        if auth.access_token_expiry.as_secs() == 0 || auth.refresh_token_expiry.as_secs() == 0 {
            bail!("token expiries must be at least one second");
        }
        if auth.refresh_token_expiry <= auth.access_token_expiry {
            bail!("refresh token expiry must exceed access token expiry");
        }
        if self.store.op_timeout.is_zero() {
            bail!("store.op_timeout must be positive");
        }
        Ok(())
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment variables recognised on top of the settings file.
const ENV_OVERRIDES: [(&str, &str); 5] = [
    ("ACCESS_TOKEN_SECRET", "auth.access_token_secret"),
    ("REFRESH_TOKEN_SECRET", "auth.refresh_token_secret"),
    ("ACCESS_TOKEN_EXPIRY", "auth.access_token_expiry"),
    ("REFRESH_TOKEN_EXPIRY", "auth.refresh_token_expiry"),
    ("STORE_URL", "store.url"),
];

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    parse_settings_with_env(path, |name| std::env::var(name).ok())
}

/// Layers defaults, the settings file and the environment (looked up through `env`).
/// An explicitly given file must exist; the default one is optional.
pub fn parse_settings_with_env(
    path: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let required = path.is_some();
    let path = path.unwrap_or(SETTINGS_PATH);

    let mut builder = defaults()?.add_source(File::with_name(path).required(required));
    for (var, key) in ENV_OVERRIDES {
        builder = builder.set_override_option(key, env(var))?;
    }

    let settings: Settings = builder
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    settings.validate()?;
    Ok(settings)
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("auth.access_token_expiry", "15m")?
        .set_default("auth.refresh_token_expiry", "7d")?
        .set_default("auth.clock_skew", "30s")?
        .set_default("store.backend", "redis")?
        .set_default("store.url", "redis://127.0.0.1:6379")?
        .set_default("store.key_prefix", "")?
        .set_default("store.op_timeout", "2s")?
        .set_default("log.filter", "info")?)
}

/// Plain seconds (`900`) or a number with one of the `s`, `m`, `h`, `d`, `w` suffixes.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: u64 = number
        .parse()
        .map_err(|_| anyhow!("invalid duration: {:?}", text))?;
    let scale = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        other => bail!("unknown duration unit {:?} in {:?}", other, text),
    };
    number
        .checked_mul(scale)
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow!("duration out of range: {:?}", text))
}

fn de_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_duration(&text).map_err(serde::de::Error::custom)
}
