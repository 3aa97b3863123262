use std::{fmt, str::FromStr};

use anyhow::{anyhow, Context};

/// What happens when an authenticated user posts into a room they have no
/// membership record for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MembershipPolicy {
    /// Join the user to the room, then accept the message.
    #[default]
    Open,
    /// Reject with 403.
    Enforce,
}

impl FromStr for MembershipPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(MembershipPolicy::Open),
            "enforce" => Ok(MembershipPolicy::Enforce),
            other => Err(anyhow!("unknown membership policy {other:?}, expected open or enforce")),
        }
    }
}

impl fmt::Display for MembershipPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MembershipPolicy::Open => f.write_str("open"),
            MembershipPolicy::Enforce => f.write_str("enforce"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub membership_policy: MembershipPolicy,
    pub log_filter: String,
}

impl Config {
    pub const DEFAULT_DATABASE_URL: &'static str = "sqlite://roomchat.db?mode=rwc";
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:8080";
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 16;
    pub const DEFAULT_LOG_FILTER: &'static str = "roomchat=info,tower_http=info";

    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let max_connections = match lookup("MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("MAX_CONNECTIONS={raw:?} is not a positive integer"))?,
            None => Self::DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            return Err(anyhow!("MAX_CONNECTIONS must be at least 1"));
        }

        let membership_policy = match lookup("MEMBERSHIP_POLICY") {
            Some(raw) => raw.parse().context("invalid MEMBERSHIP_POLICY")?,
            None => MembershipPolicy::default(),
        };

        Ok(Config {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| Self::DEFAULT_DATABASE_URL.to_owned()),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.to_owned()),
            max_connections,
            membership_policy,
            log_filter: lookup("RUST_LOG").unwrap_or_else(|| Self::DEFAULT_LOG_FILTER.to_owned()),
        })
    }
}
