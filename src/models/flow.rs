use std::fmt;
use std::str::FromStr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use super::{Fragment, IcmpCode, IcmpType, Protocol, TcpFlag, UnknownKeyword};

/// A flow match value: either the typed scalar or a caller supplied literal
///
/// Literals are handed to the speaker as-is (E.g. ">1024&<2048" for a port range),
/// so they are only as valid as the caller made them.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MatchValue<T> {
    Value(T),
    Literal(String),
}

impl<T: FromStr> FromStr for MatchValue<T> {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse()
            .map(MatchValue::Value)
            .unwrap_or_else(|_| MatchValue::Literal(s.to_string())))
    }
}

impl<T> From<T> for MatchValue<T> {
    fn from(value: T) -> Self {
        MatchValue::Value(value)
    }
}

/// Packet match conditions, every field is optional
///
/// An empty match set matches all traffic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FlowMatch {
    #[serde(deserialize_with = "super::optional_network")]
    pub source: Option<IpNetwork>,
    #[serde(deserialize_with = "super::optional_network")]
    pub destination: Option<IpNetwork>,
    pub port: Option<MatchValue<u16>>,
    pub source_port: Option<MatchValue<u16>>,
    pub destination_port: Option<MatchValue<u16>>,
    pub protocol: Option<MatchValue<Protocol>>,
    pub tcp_flags: Option<MatchValue<TcpFlag>>,
    pub icmp_type: Option<MatchValue<IcmpType>>,
    pub icmp_code: Option<MatchValue<IcmpCode>>,
    pub fragment: Option<MatchValue<Fragment>>,
    pub packet_length: Option<MatchValue<u32>>,
}

/// Flowspec action applied to matching traffic
///
/// JSON representation is `"accept"`, `"discard"` or `{"rate_limit": 9600}`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowAction {
    Accept,
    Discard,
    RateLimit(u64),
}

impl fmt::Display for FlowAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FlowAction::Accept => f.write_str("accept"),
            FlowAction::Discard => f.write_str("discard"),
            FlowAction::RateLimit(rate) => write!(f, "rate-limit {}", rate),
        }
    }
}

impl FromStr for FlowAction {
    type Err = UnknownKeyword;

    /// Accepts "accept", "discard", "rate-limit 9600" and "rate-limit:9600"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<_> = s
            .split(|c: char| c.is_whitespace() || c == ':')
            .filter(|w| !w.is_empty())
            .collect();
        match words.as_slice() {
            ["accept"] => Ok(FlowAction::Accept),
            ["discard"] => Ok(FlowAction::Discard),
            ["rate-limit", rate] => rate
                .parse()
                .map(FlowAction::RateLimit)
                .map_err(|_| UnknownKeyword::new("FlowAction", s)),
            _ => Err(UnknownKeyword::new("FlowAction", s)),
        }
    }
}

/// Flowspec rule to announce/withdraw on a single neighbor session
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FlowSpec {
    #[serde(rename = "match", default)]
    pub matches: FlowMatch,
    pub then: FlowAction,
}

impl FlowSpec {
    pub fn new(matches: FlowMatch, then: FlowAction) -> Self {
        Self { matches, then }
    }
}
