//! Closed keyword sets of the flow grammar.
//!
//! Each enumeration is declared together with the literal the speaker expects,
//! so the table below *is* the grammar contract: serialization, parsing and
//! command emission all go through it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unsupported {kind}: '{value}'")]
pub struct UnknownKeyword {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownKeyword {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

macro_rules! keywords {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $literal:literal,)+ }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// Literal used in the speaker grammar
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $literal,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownKeyword;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($literal => Ok($name::$variant),)+
                    _ => Err(UnknownKeyword::new(stringify!($name), s)),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<$name, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

keywords! {
    /// IP protocol names
    Protocol {
        Icmp => "icmp",
        Igmp => "igmp",
        Tcp => "tcp",
        Egp => "egp",
        Udp => "udp",
        Rsvp => "rsvp",
        Gre => "gre",
        Esp => "esp",
        Ah => "ah",
        Ospf => "ospf",
        Ipip => "ipip",
        Pim => "pim",
        Sctp => "sctp",
    }
}

keywords! {
    TcpFlag {
        Fin => "fin",
        Syn => "syn",
        Rst => "rst",
        Push => "push",
        Ack => "ack",
        Urg => "urg",
        Ece => "ece",
        Cwr => "cwr",
        Ns => "ns",
    }
}

keywords! {
    IcmpType {
        EchoReply => "echo-reply",
        Unreachable => "unreachable",
        Redirect => "redirect",
        EchoRequest => "echo-request",
        RouterAdvertisement => "router-advertisement",
        RouterSolicit => "router-solicit",
        TimeExceeded => "time-exceeded",
        ParameterProblem => "parameter-problem",
        Timestamp => "timestamp",
        TimestampReply => "timestamp-reply",
        Photuris => "photuris",
        ExperimentalMobility => "experimental-mobility",
        ExtendedEchoRequest => "extended-echo-request",
        ExtendedEchoReply => "extended-echo-reply",
        ExperimentalOne => "experimental-one",
        ExperimentalTwo => "experimental-two",
    }
}

keywords! {
    IcmpCode {
        NetworkUnreachable => "network-unreachable",
        HostUnreachable => "host-unreachable",
        ProtocolUnreachable => "protocol-unreachable",
        PortUnreachable => "port-unreachable",
        FragmentationNeeded => "fragmentation-needed",
        SourceRouteFailed => "source-route-failed",
        DestinationNetworkUnknown => "destination-network-unknown",
        DestinationHostUnknown => "destination-host-unknown",
        SourceHostIsolated => "source-host-isolated",
        DestinationNetworkProhibited => "destination-network-prohibited",
        DestinationHostProhibited => "destination-host-prohibited",
        NetworkUnreachableForTos => "network-unreachable-for-tos",
        HostUnreachableForTos => "host-unreachable-for-tos",
        CommunicationProhibitedByFiltering => "communication-prohibited-by-filtering",
        HostPrecedenceViolation => "host-precedence-violation",
        PrecedenceCutoffInEffect => "precedence-cutoff-in-effect",
        RedirectForNetwork => "redirect-for-network",
        RedirectForHost => "redirect-for-host",
        RedirectForTosAndNet => "redirect-for-tos-and-net",
        RedirectForTosAndHost => "redirect-for-tos-and-host",
        TtlEqZeroDuringTransit => "ttl-eq-zero-during-transit",
        TtlEqZeroDuringReassembly => "ttl-eq-zero-during-reassembly",
        RequiredOptionMissing => "required-option-missing",
        IpHeaderBad => "ip-header-bad",
    }
}

keywords! {
    /// Fragmentation conditions
    Fragment {
        DontFragment => "dont-fragment",
        IsFragment => "is-fragment",
        FirstFragment => "first-fragment",
        LastFragment => "last-fragment",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals_round_trip() {
        for protocol in Protocol::ALL {
            assert_eq!(protocol.as_str().parse::<Protocol>().unwrap(), *protocol);
        }
        for code in IcmpCode::ALL {
            assert_eq!(code.as_str().parse::<IcmpCode>().unwrap(), *code);
        }
        assert_eq!(IcmpType::ALL.len(), 16);
        assert_eq!(TcpFlag::ALL.len(), 9);
    }

    #[test]
    fn test_unknown_keyword() {
        let err = "TCP".parse::<Protocol>().unwrap_err();
        assert_eq!(err, UnknownKeyword::new("Protocol", "TCP"));
        assert_eq!(err.to_string(), "Unsupported Protocol: 'TCP'");
    }

    #[test]
    fn test_deserialize() {
        let flag: TcpFlag = serde_json::from_str("\"push\"").unwrap();
        assert_eq!(flag, TcpFlag::Push);
        assert!(serde_json::from_str::<Fragment>("\"fragment\"").is_err());
        assert_eq!(
            serde_json::to_string(&IcmpCode::TtlEqZeroDuringTransit).unwrap(),
            "\"ttl-eq-zero-during-transit\""
        );
    }
}
