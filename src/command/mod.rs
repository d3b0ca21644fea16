//! Compiles structured route/flow specs into speaker command lines.
//!
//! Every command is scoped to a single session with a `neighbor <address>`
//! prefix, E.g.:
//!
//! ```text
//! neighbor 10.0.0.1 announce route 10.1.0.0/16 next-hop 10.0.0.2 community [65000:1]
//! neighbor 10.0.0.1 withdraw flow route { match { destination 10.1.0.0/24; protocol tcp; } then { discard; } }
//! ```
//!
//! Compilation is syntax generation only, input values are expected to have
//! been validated when they were deserialized.

mod flow;
mod route;

pub use flow::compile_flow;
pub use route::compile_route;

use std::fmt;
use std::net::IpAddr;

use thiserror::Error;

use crate::models::Direction;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// Literal match values are emitted verbatim, an empty one produces an invalid clause
    #[error("Empty value for flow match '{0}'")]
    EmptyLiteral(&'static str),
    /// A line break would split the command into two speaker commands
    #[error("Value for flow match '{field}' spans multiple lines: {value:?}")]
    MultiLineLiteral { field: &'static str, value: String },
}

/// Session scope shared by every command: `neighbor <addr> <direction>`
struct Scope {
    neighbor: IpAddr,
    direction: Direction,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "neighbor {} {}", self.neighbor, self.direction)
    }
}
