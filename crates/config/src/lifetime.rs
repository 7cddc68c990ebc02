//! 令牌有效期
//!
//! 既接受整数秒，也接受 `15m` / `7d` 这种带单位的写法（s/m/h/d）。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime(Duration);

impl Lifetime {
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.as_secs())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifetimeParseError {
    #[error("lifetime is empty")]
    Empty,
    #[error("invalid lifetime amount in {0:?}")]
    InvalidAmount(String),
    #[error("unknown lifetime unit {unit:?} in {input:?} (expected s, m, h or d)")]
    UnknownUnit { input: String, unit: char },
}

impl FromStr for Lifetime {
    type Err = LifetimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let last = s.chars().last().ok_or(LifetimeParseError::Empty)?;

        if last.is_ascii_digit() {
            return s
                .parse::<u64>()
                .map(Lifetime::from_secs)
                .map_err(|_| LifetimeParseError::InvalidAmount(s.to_string()));
        }

        let multiplier = match last {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            unit => {
                return Err(LifetimeParseError::UnknownUnit {
                    input: s.to_string(),
                    unit,
                });
            }
        };

        let amount: u64 = s[..s.len() - last.len_utf8()]
            .parse()
            .map_err(|_| LifetimeParseError::InvalidAmount(s.to_string()))?;

        amount
            .checked_mul(multiplier)
            .map(Lifetime::from_secs)
            .ok_or_else(|| LifetimeParseError::InvalidAmount(s.to_string()))
    }
}

impl<'de> Deserialize<'de> for Lifetime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seconds(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Lifetime::from_secs(secs)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}
