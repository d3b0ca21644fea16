use std::net::IpAddr;

use crate::models::NeighborSpec;

const INDENT: &str = "    ";

/// Render a neighbor block keyed by `address`
///
/// ```text
/// neighbor 10.0.0.1 {
///     description "edge router";
///     router-id 1.1.1.1;
///     local-address 10.0.0.2;
///     local-as 65001;
///     peer-as 65010;
///     connect 1000;
///     capability {
///         route-refresh disable;
///     }
/// }
/// ```
///
/// Unset attributes are left out so the speaker's own defaults apply, and the
/// capability block only appears when a capability differs from its default.
pub fn render(address: IpAddr, neighbor: &NeighborSpec) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(10);
    lines.push(format!("neighbor {} {{", address));
    if let Some(description) = &neighbor.description {
        lines.push(format!("{}description \"{}\";", INDENT, quote(description)));
    }
    if let Some(router_id) = neighbor.router_id {
        lines.push(format!("{}router-id {};", INDENT, router_id));
    }
    if let Some(local_address) = neighbor.local_address {
        lines.push(format!("{}local-address {};", INDENT, local_address));
    }
    if let Some(local_as) = neighbor.local_as {
        lines.push(format!("{}local-as {};", INDENT, local_as));
    }
    if let Some(peer_as) = neighbor.peer_as {
        lines.push(format!("{}peer-as {};", INDENT, peer_as));
    }
    if let Some(connect) = neighbor.connect {
        lines.push(format!("{}connect {};", INDENT, connect));
    }
    if let Some(capability) = neighbor.capability.as_ref().filter(|c| !c.is_default()) {
        lines.push(format!("{}capability {{", INDENT));
        let refresh = if capability.route_refresh {
            "enable"
        } else {
            "disable"
        };
        lines.push(format!("{0}{0}route-refresh {1};", INDENT, refresh));
        lines.push(format!("{}}}", INDENT));
    }
    lines.push("}".to_string());
    lines.join("\n")
}

/// Escape a value for use inside double quotes, on a single line
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' | '\r' => quoted.push(' '),
            c => quoted.push(c),
        }
    }
    quoted
}
