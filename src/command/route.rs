use std::net::IpAddr;

use itertools::Itertools;

use super::Scope;
use crate::models::{Direction, RouteSpec};

/// `neighbor <n> <direction> route <prefix> [next-hop <addr>] [community [<a>:<b> ...]]`
pub fn compile_route(direction: Direction, neighbor: IpAddr, route: &RouteSpec) -> String {
    let mut command = format!(
        "{} route {}",
        Scope {
            neighbor,
            direction
        },
        route.prefix
    );
    if let Some(next_hop) = route.next_hop {
        command.push_str(&format!(" next-hop {}", next_hop));
    }
    if !route.community.is_empty() {
        command.push_str(&format!(" community [{}]", route.community.iter().join(" ")));
    }
    command
}
