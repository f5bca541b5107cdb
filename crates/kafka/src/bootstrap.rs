//! Broker discovery.
//!
//! The fetch client does not know the cluster layout up front. At
//! initialization it asks a [`Coordinator`] for every known broker and uses
//! the resulting `host:port` list to bootstrap its backend.

use kafka_types::BrokerInfo;

use crate::error::{Error, Result};

/// Source of the cluster's broker endpoints.
///
/// Implementations typically query a coordination service. They are shared
/// between fetch clients, so they must be thread-safe.
pub trait Coordinator: Send + Sync {
    /// List every broker currently registered in the cluster.
    fn get_all_brokers(&self) -> Result<Vec<BrokerInfo>>;
}

/// A coordinator backed by a fixed broker list.
#[derive(Debug, Clone, Default)]
pub struct StaticCoordinator {
    brokers: Vec<BrokerInfo>,
}

impl StaticCoordinator {
    pub fn new(brokers: Vec<BrokerInfo>) -> Self {
        Self { brokers }
    }

    /// Parse a comma-separated `host:port` list, e.g. `"kafka-1:9092,kafka-2:9092"`.
    pub fn parse(list: &str) -> Result<Self> {
        let brokers = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<BrokerInfo>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { brokers })
    }
}

impl Coordinator for StaticCoordinator {
    fn get_all_brokers(&self) -> Result<Vec<BrokerInfo>> {
        Ok(self.brokers.clone())
    }
}

/// Query the coordinator for all brokers and format them as a bootstrap list.
///
/// Each entry has the form `host:port`. An empty cluster is reported as a
/// coordinator error, since no backend can start without a broker.
pub fn bootstrap_brokers(coordinator: &dyn Coordinator) -> Result<Vec<String>> {
    let brokers = coordinator.get_all_brokers()?;
    if brokers.is_empty() {
        return Err(Error::Coordinator(
            "coordinator returned no brokers".to_string(),
        ));
    }

    Ok(brokers.iter().map(BrokerInfo::address).collect())
}
