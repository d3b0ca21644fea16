use std::fmt::Display;
use std::net::IpAddr;

use super::{CompileError, Scope};
use crate::models::{Direction, FlowSpec, MatchValue};

/// `neighbor <n> <direction> flow route { match { <field> <value>; ... } then { <action>; } }`
///
/// Fields are emitted in a fixed order regardless of how the flow was built,
/// so a given spec always compiles to the same command.
pub fn compile_flow(
    direction: Direction,
    neighbor: IpAddr,
    flow: &FlowSpec,
) -> Result<String, CompileError> {
    let matches = match_clauses(flow)?;
    let body: String = matches
        .iter()
        .map(|(keyword, value)| format!(" {} {};", keyword, value))
        .collect();
    let padding = if matches.is_empty() { "" } else { " " };
    Ok(format!(
        "{} flow route {{ match {{{}{}}} then {{ {}; }} }}",
        Scope {
            neighbor,
            direction
        },
        body,
        padding,
        flow.then,
    ))
}

fn match_clauses(flow: &FlowSpec) -> Result<Vec<(&'static str, String)>, CompileError> {
    let m = &flow.matches;
    let mut clauses = Vec::with_capacity(11);
    if let Some(source) = &m.source {
        clauses.push(("source", source.to_string()));
    }
    if let Some(destination) = &m.destination {
        clauses.push(("destination", destination.to_string()));
    }
    push_value(&mut clauses, "port", &m.port)?;
    push_value(&mut clauses, "source-port", &m.source_port)?;
    push_value(&mut clauses, "destination-port", &m.destination_port)?;
    push_value(&mut clauses, "protocol", &m.protocol)?;
    push_value(&mut clauses, "tcp-flags", &m.tcp_flags)?;
    push_value(&mut clauses, "icmp-type", &m.icmp_type)?;
    push_value(&mut clauses, "icmp-code", &m.icmp_code)?;
    push_value(&mut clauses, "fragment", &m.fragment)?;
    push_value(&mut clauses, "packet-length", &m.packet_length)?;
    Ok(clauses)
}

fn push_value<T: Display>(
    clauses: &mut Vec<(&'static str, String)>,
    keyword: &'static str,
    value: &Option<MatchValue<T>>,
) -> Result<(), CompileError> {
    match value {
        None => {}
        Some(MatchValue::Value(value)) => clauses.push((keyword, value.to_string())),
        Some(MatchValue::Literal(literal)) => {
            let literal = literal.trim();
            if literal.is_empty() {
                return Err(CompileError::EmptyLiteral(keyword));
            }
            if literal.contains(|c: char| c == '\n' || c == '\r') {
                return Err(CompileError::MultiLineLiteral {
                    field: keyword,
                    value: literal.to_string(),
                });
            }
            clauses.push((keyword, literal.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlowAction, FlowMatch, Fragment, IcmpCode, IcmpType, Protocol, TcpFlag};

    fn neighbor() -> IpAddr {
        "10.0.0.1".parse().unwrap()
    }

    #[test]
    fn test_flow_empty_match() {
        for (action, clause) in [
            (FlowAction::Accept, "accept;"),
            (FlowAction::Discard, "discard;"),
            (FlowAction::RateLimit(9600), "rate-limit 9600;"),
        ] {
            let flow = FlowSpec::new(FlowMatch::default(), action);
            let command = compile_flow(Direction::Announce, neighbor(), &flow).unwrap();
            assert_eq!(
                command,
                format!(
                    "neighbor 10.0.0.1 announce flow route {{ match {{}} then {{ {} }} }}",
                    clause
                )
            );
        }
    }

    #[test]
    fn test_flow_destination_protocol_discard() {
        let flow = FlowSpec::new(
            FlowMatch {
                destination: Some("10.0.0.0/24".parse().unwrap()),
                protocol: Some(Protocol::Tcp.into()),
                ..FlowMatch::default()
            },
            FlowAction::Discard,
        );
        let command = compile_flow(Direction::Announce, neighbor(), &flow).unwrap();
        assert_eq!(
            command,
            "neighbor 10.0.0.1 announce flow route { match { destination 10.0.0.0/24; protocol tcp; } then { discard; } }"
        );
    }

    #[test]
    fn test_flow_field_order_is_fixed() {
        let flow = FlowSpec::new(
            FlowMatch {
                packet_length: Some(MatchValue::Value(1500)),
                fragment: Some(Fragment::IsFragment.into()),
                icmp_code: Some(IcmpCode::PortUnreachable.into()),
                icmp_type: Some(IcmpType::Unreachable.into()),
                tcp_flags: Some(TcpFlag::Syn.into()),
                protocol: Some(Protocol::Icmp.into()),
                destination_port: Some(MatchValue::Value(443)),
                source_port: Some(MatchValue::Value(1024)),
                port: Some(MatchValue::Value(80)),
                destination: Some("198.51.100.0/24".parse().unwrap()),
                source: Some("192.0.2.0/24".parse().unwrap()),
            },
            FlowAction::Accept,
        );
        let command = compile_flow(Direction::Withdraw, neighbor(), &flow).unwrap();
        assert_eq!(
            command,
            "neighbor 10.0.0.1 withdraw flow route { match { \
             source 192.0.2.0/24; destination 198.51.100.0/24; port 80; source-port 1024; \
             destination-port 443; protocol icmp; tcp-flags syn; icmp-type unreachable; \
             icmp-code port-unreachable; fragment is-fragment; packet-length 1500; \
             } then { accept; } }"
        );
    }

    #[test]
    fn test_flow_literal_passthrough() {
        let flow = FlowSpec::new(
            FlowMatch {
                port: Some(MatchValue::Literal(">1024&<2048".to_string())),
                ..FlowMatch::default()
            },
            FlowAction::RateLimit(0),
        );
        let command = compile_flow(Direction::Announce, neighbor(), &flow).unwrap();
        assert!(command.contains("match { port >1024&<2048; }"));
        assert!(command.contains("then { rate-limit 0; }"));
    }

    #[test]
    fn test_flow_rejects_multi_line_literal() {
        let flow = FlowSpec::new(
            FlowMatch {
                protocol: Some(MatchValue::Literal("tcp\nshutdown".to_string())),
                ..FlowMatch::default()
            },
            FlowAction::Discard,
        );
        assert_eq!(
            compile_flow(Direction::Announce, neighbor(), &flow),
            Err(CompileError::MultiLineLiteral {
                field: "protocol",
                value: "tcp\nshutdown".to_string()
            })
        );

        let flow = FlowSpec::new(
            FlowMatch {
                fragment: Some(MatchValue::Literal("  ".to_string())),
                ..FlowMatch::default()
            },
            FlowAction::Discard,
        );
        assert_eq!(
            compile_flow(Direction::Announce, neighbor(), &flow),
            Err(CompileError::EmptyLiteral("fragment"))
        );
    }
}
