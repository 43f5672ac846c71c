//! # Registry Configuration
//!
//! Value forwarding is configurable per route. The index width is not
//! configurable; see [`shared_types::INDEX_BITS`].

use super::errors::ConfigError;
use serde::{Deserialize, Serialize};
use shared_types::Coins;
use std::env;
use std::fmt;
use std::str::FromStr;

/// How much of the inbound value a route forwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuePolicy {
    /// Forward everything that arrived.
    #[default]
    CarryInbound,
    /// Forward nothing; the registry keeps the value.
    Absorb,
    /// Keep `fee`, forward the rest (saturating at zero).
    RetainFee {
        /// Amount kept per message.
        fee: Coins,
    },
}

impl ValuePolicy {
    /// Value to attach to the outbound message.
    #[must_use]
    pub fn outbound_value(&self, inbound: Coins) -> Coins {
        match self {
            Self::CarryInbound => inbound,
            Self::Absorb => 0,
            Self::RetainFee { fee } => inbound.saturating_sub(*fee),
        }
    }
}

impl fmt::Display for ValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CarryInbound => f.write_str("carry"),
            Self::Absorb => f.write_str("absorb"),
            Self::RetainFee { fee } => write!(f, "fee:{fee}"),
        }
    }
}

/// Parses `carry`, `absorb` or `fee:<amount>`.
impl FromStr for ValuePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidValue {
            key: "value_policy".into(),
            value: s.to_string(),
        };
        match s.trim() {
            "carry" => Ok(Self::CarryInbound),
            "absorb" => Ok(Self::Absorb),
            other => {
                let fee = other.strip_prefix("fee:").ok_or_else(invalid)?;
                let fee = fee.parse::<Coins>().map_err(|_| invalid())?;
                Ok(Self::RetainFee { fee })
            }
        }
    }
}

/// Per-route value policies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuePolicies {
    /// Child unit to authority.
    pub upward: ValuePolicy,
    /// Authority to child unit.
    pub downward: ValuePolicy,
    /// Deployment of a newly allocated unit.
    pub allocate: ValuePolicy,
    /// Failure notice after a bounce.
    pub bounce: ValuePolicy,
}

/// Registry configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Value forwarding per route.
    pub value_policy: ValuePolicies,
    /// Whether reports forwarded to the authority are bounceable.
    pub bounceable_reports: bool,
}

impl RegistryConfig {
    /// Environment variable for the upward policy.
    pub const ENV_UPWARD: &'static str = "TR_UPWARD_VALUE";
    /// Environment variable for the downward policy.
    pub const ENV_DOWNWARD: &'static str = "TR_DOWNWARD_VALUE";
    /// Environment variable for the allocation policy.
    pub const ENV_ALLOCATE: &'static str = "TR_ALLOCATE_VALUE";
    /// Environment variable for the bounce policy.
    pub const ENV_BOUNCE: &'static str = "TR_BOUNCE_VALUE";
    /// Environment variable for `bounceable_reports`.
    pub const ENV_BOUNCEABLE_REPORTS: &'static str = "TR_BOUNCEABLE_REPORTS";

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let routes = [
            ("upward", self.value_policy.upward),
            ("downward", self.value_policy.downward),
            ("allocate", self.value_policy.allocate),
            ("bounce", self.value_policy.bounce),
        ];
        for (direction, policy) in routes {
            if policy == (ValuePolicy::RetainFee { fee: 0 }) {
                return Err(ConfigError::InvalidValuePolicy {
                    direction,
                    reason: "fee must be non-zero, use carry instead".into(),
                });
            }
        }
        Ok(())
    }

    /// Parses and validates a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builds a configuration from `TR_*` environment variables, falling back
    /// to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let policies = [
            (Self::ENV_UPWARD, &mut config.value_policy.upward),
            (Self::ENV_DOWNWARD, &mut config.value_policy.downward),
            (Self::ENV_ALLOCATE, &mut config.value_policy.allocate),
            (Self::ENV_BOUNCE, &mut config.value_policy.bounce),
        ];
        for (key, slot) in policies {
            if let Some(raw) = lookup(key) {
                *slot = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.clone(),
                })?;
            }
        }

        if let Some(raw) = lookup(Self::ENV_BOUNCEABLE_REPORTS) {
            config.bounceable_reports = match raw.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: Self::ENV_BOUNCEABLE_REPORTS.to_string(),
                        value: raw,
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }
}
