mod community;
mod flow;
mod keywords;
mod neighbor;
mod route;

use std::fmt;
use std::str::FromStr;

use ipnetwork::IpNetwork;
use serde::{de, Deserialize, Deserializer, Serialize};

pub use community::Community;
pub use flow::{FlowAction, FlowMatch, FlowSpec, MatchValue};
pub use keywords::{Fragment, IcmpCode, IcmpType, Protocol, TcpFlag, UnknownKeyword};
pub use neighbor::{Capabilities, NeighborSpec};
pub use route::RouteSpec;

/// Whether a route/flow is being added to or removed from a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Announce,
    Withdraw,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            Direction::Announce => "announce",
            Direction::Withdraw => "withdraw",
        };
        write!(f, "{}", word)
    }
}

impl FromStr for Direction {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "announce" => Ok(Direction::Announce),
            "withdraw" => Ok(Direction::Withdraw),
            _ => Err(UnknownKeyword::new("Direction", s)),
        }
    }
}

/// Networks must be given by their network address (E.g. 10.1.0.0/16, not 10.1.2.3/16)
fn network<'de, D>(deserializer: D) -> Result<IpNetwork, D::Error>
where
    D: Deserializer<'de>,
{
    let net = IpNetwork::deserialize(deserializer)?;
    if net.network() != net.ip() {
        return Err(de::Error::custom(format!(
            "{} has host bits set, expected {}/{}",
            net,
            net.network(),
            net.prefix()
        )));
    }
    Ok(net)
}

fn optional_network<'de, D>(deserializer: D) -> Result<Option<IpNetwork>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Network(#[serde(deserialize_with = "network")] IpNetwork);

    Ok(Option::<Network>::deserialize(deserializer)?.map(|Network(net)| net))
}
