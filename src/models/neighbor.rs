use std::net::IpAddr;

use serde::{Deserialize, Serialize};

struct Defaults {}

impl Defaults {
    fn route_refresh() -> bool {
        true
    }
}

/// Optional session capabilities
///
/// Only capabilities that differ from these defaults end up in the speaker config.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Capabilities {
    #[serde(default = "Defaults::route_refresh")]
    pub route_refresh: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            route_refresh: Defaults::route_refresh(),
        }
    }
}

impl Capabilities {
    pub fn is_default(&self) -> bool {
        self == &Capabilities::default()
    }
}

/// Neighbor (peer session) as persisted in the speaker config
///
/// `address` is the identity of a neighbor: changing it is a delete + create.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct NeighborSpec {
    #[serde(rename = "ip_address", alias = "address")]
    pub address: IpAddr,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub router_id: Option<IpAddr>,
    #[serde(default)]
    pub local_address: Option<IpAddr>,
    #[serde(default)]
    pub local_as: Option<u32>,
    #[serde(default)]
    pub peer_as: Option<u32>,
    // Connect retry interval
    #[serde(default)]
    pub connect: Option<u32>,
    #[serde(default)]
    pub capability: Option<Capabilities>,
}

impl NeighborSpec {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address,
            description: None,
            router_id: None,
            local_address: None,
            local_as: None,
            peer_as: None,
            connect: None,
            capability: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbor_deserialize() {
        let neighbor: NeighborSpec = serde_json::from_str(
            r#"{
                "ip_address": "127.0.0.1",
                "router_id": "1.1.1.1",
                "local_address": "127.0.0.1",
                "local_as": 65001,
                "peer_as": 65010,
                "connect": 1000,
                "capability": {"route_refresh": true}
            }"#,
        )
        .unwrap();
        assert_eq!(neighbor.address, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(neighbor.peer_as, Some(65010));
        assert_eq!(neighbor.description, None);
        assert!(neighbor.capability.unwrap().is_default());
    }

    #[test]
    fn test_capability_defaults() {
        let caps: Capabilities = serde_json::from_str("{}").unwrap();
        assert!(caps.route_refresh);
        let caps: Capabilities = serde_json::from_str(r#"{"route_refresh": false}"#).unwrap();
        assert!(!caps.is_default());
    }
}
