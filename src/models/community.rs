use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid community '{0}' (expected <asn>:<value>, each 0-65535)")]
pub struct InvalidCommunity(String);

/// Standard community as an (ASN, value) pair of 16-bit halves
///
/// Serialized as a two element array: `[65000, 100]`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Community(pub u16, pub u16);

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

impl TryFrom<&str> for Community {
    type Error = InvalidCommunity;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invalid = || InvalidCommunity(value.to_string());
        let (asn, comm) = value.split_once(':').ok_or_else(invalid)?;
        Ok(Community(
            asn.parse().map_err(|_| invalid())?,
            comm.parse().map_err(|_| invalid())?,
        ))
    }
}

impl FromStr for Community {
    type Err = InvalidCommunity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Community::try_from(s)
    }
}
