use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Deserializer, Serialize};

use super::Community;

/// Static route to announce/withdraw on a single neighbor session
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RouteSpec {
    /// Prefix to advertise (E.g. "100.1.0.0/16" or "2620:100:ab::/64")
    #[serde(deserialize_with = "super::network")]
    pub prefix: IpNetwork,
    /// Next-hop to reach this prefix, the speaker uses `self` when omitted
    #[serde(default)]
    pub next_hop: Option<IpAddr>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub community: Vec<Community>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Community>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Community>>::deserialize(deserializer)?.unwrap_or_default())
}

impl RouteSpec {
    pub fn new(prefix: IpNetwork) -> Self {
        Self {
            prefix,
            next_hop: None,
            community: vec![],
        }
    }

    pub fn with_next_hop(mut self, next_hop: IpAddr) -> Self {
        self.next_hop = Some(next_hop);
        self
    }

    pub fn with_community(mut self, community: Community) -> Self {
        self.community.push(community);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_spec_deserialize() {
        let route: RouteSpec =
            serde_json::from_str(r#"{"prefix": "10.1.0.0/16", "community": [[65000, 1]]}"#)
                .unwrap();
        assert_eq!(route.prefix, "10.1.0.0/16".parse::<IpNetwork>().unwrap());
        assert_eq!(route.next_hop, None);
        assert_eq!(route.community, vec![Community(65000, 1)]);

        let route: RouteSpec = serde_json::from_str(
            r#"{"prefix": "2001:db8::/32", "next_hop": "2001:db8::1", "community": null}"#,
        )
        .unwrap();
        assert_eq!(route.next_hop, Some("2001:db8::1".parse().unwrap()));
        assert!(route.community.is_empty());
    }

    #[test]
    fn test_route_spec_rejects_host_bits() {
        let err = serde_json::from_str::<RouteSpec>(r#"{"prefix": "10.1.2.3/16"}"#).unwrap_err();
        assert!(err.to_string().contains("expected 10.1.0.0/16"));
        assert!(serde_json::from_str::<RouteSpec>(r#"{"prefix": "2001:db8::1/32"}"#).is_err());
        // Host routes are their own network
        assert!(serde_json::from_str::<RouteSpec>(r#"{"prefix": "10.1.2.3/32"}"#).is_ok());
    }
}
