//! Broker endpoint type.

use std::fmt;
use std::str::FromStr;

use crate::error::KafkaTypesError;

/// A broker endpoint as reported by the cluster coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrokerInfo {
    pub host: String,
    pub port: u16,
}

impl BrokerInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Connection string in `host:port` form, as used for bootstrap lists.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for BrokerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for BrokerInfo {
    type Err = KafkaTypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| KafkaTypesError::InvalidBrokerAddress(s.to_string()))?;
        if host.is_empty() {
            return Err(KafkaTypesError::InvalidBrokerAddress(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| KafkaTypesError::InvalidBrokerAddress(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}
