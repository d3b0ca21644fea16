//! # bgpctl CLI
//!
//! The same binary runs the daemon (`bgpctl run`) and talks to a running
//! instance over its JSON-RPC API (default `127.0.0.1:5000`, see `--host` and
//! `--port`).
//!
//! ## Neighbors
//! ```sh
//! $ bgpctl neighbors add 10.0.0.1 --peer-as 65010 --local-as 65001 -d "edge router"
//! reload: done (created)
//! $ bgpctl neighbors show
//!  Neighbor   Description  Router ID  Local Address  Local AS  Peer AS
//! ----------+-------------+----------+--------------+---------+---------
//!  10.0.0.1   edge router                            65001     65010
//! $ bgpctl neighbors delete 10.0.0.1
//! reload: done
//! ```
//!
//! ## Routes
//! ```sh
//! $ bgpctl route announce 10.0.0.1 10.1.0.0/16 --next-hop 192.0.2.1 -c 65000:100
//! neighbor 10.0.0.1 announce route 10.1.0.0/16 next-hop 192.0.2.1 community [65000:100]: done
//! ```
//!
//! ## Flows
//! ```sh
//! $ bgpctl flow announce 10.0.0.1 discard --destination 10.0.0.0/24 --protocol tcp
//! neighbor 10.0.0.1 announce flow route { match { destination 10.0.0.0/24; protocol tcp; } then { discard; } }: done
//! $ bgpctl flow withdraw 10.0.0.1 rate-limit:9600 --port '>1024&<2048'
//! ```
//!
//! Anything else can be passed through with `bgpctl command "<text>"`.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use ipnetwork::IpNetwork;
use jsonrpsee::http_client::HttpClientBuilder;
use jsonrpsee::types::error::CallError;
use thiserror::Error;

use crate::api::{ApiClient, CommandOutcome, NeighborChange};
use crate::models::{
    Capabilities, Community, Direction, FlowAction, FlowMatch, FlowSpec, Fragment, IcmpCode, IcmpType,
    MatchValue, NeighborSpec, Protocol, RouteSpec, TcpFlag,
};

mod display;
mod table;

use display::NeighborSummaryRow;

#[derive(Parser, Debug)]
#[clap(name = "bgpctl", rename_all = "kebab-case")]
/// Manage a BGP speaker's neighbors, routes and flow rules
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Command,
    #[clap(long, default_value = "127.0.0.1")]
    pub host: String,
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,
    /// Show debug logs (additive for trace logs)
    #[clap(short, parse(from_occurrences), global = true)]
    pub verbose: u8,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Run the bgpctl daemon
    Run(RunOptions),
    /// View and change configured neighbors
    #[clap(alias = "n", subcommand)]
    Neighbors(Neighbors),
    /// Announce or withdraw a unicast route
    #[clap(alias = "r")]
    Route(RouteOptions),
    /// Announce or withdraw a flowspec rule
    #[clap(alias = "f")]
    Flow(FlowOptions),
    /// Send a raw command to the speaker
    #[clap(name = "command")]
    Raw(RawOptions),
    /// Ask the speaker to reload its config file
    Reload,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RunOptions {
    /// Path to bgpctl config.toml (built-in defaults if not provided)
    pub config_path: Option<PathBuf>,
    /// API listening address/port (E.g. 127.0.0.1:5000), overrides the config file value
    #[clap(long)]
    pub listen: Option<SocketAddr>,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Neighbors {
    #[clap(alias = "s")]
    Show,
    Add(NeighborOptions),
    Update(NeighborOptions),
    Delete {
        /// Neighbor IP address
        address: IpAddr,
    },
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct NeighborOptions {
    /// Neighbor IP address
    address: IpAddr,
    #[clap(short, long)]
    description: Option<String>,
    #[clap(long)]
    router_id: Option<IpAddr>,
    #[clap(long)]
    local_address: Option<IpAddr>,
    #[clap(long)]
    local_as: Option<u32>,
    #[clap(long)]
    peer_as: Option<u32>,
    /// Connect retry interval (seconds)
    #[clap(long)]
    connect: Option<u32>,
    /// Disable the route-refresh capability
    #[clap(long)]
    no_route_refresh: bool,
}

impl NeighborOptions {
    fn to_spec(&self) -> NeighborSpec {
        let mut spec = NeighborSpec::new(self.address);
        spec.description = self.description.clone();
        spec.router_id = self.router_id;
        spec.local_address = self.local_address;
        spec.local_as = self.local_as;
        spec.peer_as = self.peer_as;
        spec.connect = self.connect;
        if self.no_route_refresh {
            spec.capability = Some(Capabilities {
                route_refresh: false,
            });
        }
        spec
    }
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RouteOptions {
    /// [announce, withdraw]
    direction: Direction,
    /// Neighbor session to send the route on
    neighbor: IpAddr,
    /// Prefix to announce/withdraw
    prefix: IpNetwork,
    /// Next hop (defaults to the speaker's own address)
    #[clap(short, long)]
    next_hop: Option<IpAddr>,
    /// Communities, repeatable (e.g. -c 65000:100 -c 65000:200)
    #[clap(short, long)]
    community: Vec<Community>,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct FlowOptions {
    /// [announce, withdraw]
    direction: Direction,
    /// Neighbor session to send the flow on
    neighbor: IpAddr,
    /// Action for matching traffic: accept, discard or rate-limit:<bytes/s>
    then: FlowAction,
    #[clap(long)]
    source: Option<IpNetwork>,
    #[clap(long)]
    destination: Option<IpNetwork>,
    #[clap(long)]
    port: Option<MatchValue<u16>>,
    #[clap(long)]
    source_port: Option<MatchValue<u16>>,
    #[clap(long)]
    destination_port: Option<MatchValue<u16>>,
    #[clap(long)]
    protocol: Option<MatchValue<Protocol>>,
    #[clap(long)]
    tcp_flags: Option<MatchValue<TcpFlag>>,
    #[clap(long)]
    icmp_type: Option<MatchValue<IcmpType>>,
    #[clap(long)]
    icmp_code: Option<MatchValue<IcmpCode>>,
    #[clap(long)]
    fragment: Option<MatchValue<Fragment>>,
    #[clap(long)]
    packet_length: Option<MatchValue<u32>>,
}

impl FlowOptions {
    fn to_spec(&self) -> FlowSpec {
        let matches = FlowMatch {
            source: self.source,
            destination: self.destination,
            port: self.port.clone(),
            source_port: self.source_port.clone(),
            destination_port: self.destination_port.clone(),
            protocol: self.protocol.clone(),
            tcp_flags: self.tcp_flags.clone(),
            icmp_type: self.icmp_type.clone(),
            icmp_code: self.icmp_code.clone(),
            fragment: self.fragment.clone(),
            packet_length: self.packet_length.clone(),
        };
        FlowSpec::new(matches, self.then)
    }
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RawOptions {
    /// Command text, passed to the speaker as-is
    text: String,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{}", describe(.0))]
    Rpc(#[from] jsonrpsee::core::Error),
}

/// API errors carry the interesting part in their message
fn describe(err: &jsonrpsee::core::Error) -> String {
    match err {
        jsonrpsee::core::Error::Call(CallError::Custom(error)) => {
            format!("{} (code {})", error.message(), error.code())
        }
        other => other.to_string(),
    }
}

fn print_outcome(outcome: &CommandOutcome) {
    println!("{}: {}", outcome.command, outcome.response.green());
}

fn print_change(change: &NeighborChange) {
    let created = if change.created { " (created)" } else { "" };
    println!(
        "{}: {}{}",
        change.outcome.command,
        change.outcome.response.green(),
        created
    );
}

async fn run_cmd(args: &Args) -> Result<(), CliError> {
    let client = {
        let base = format!("http://{}:{}", args.host, args.port);
        HttpClientBuilder::default().build(base)?
    };
    match &args.cmd {
        Command::Neighbors(neighbors) => match neighbors {
            Neighbors::Show => {
                let mut table = table::OutputTable::new();
                for neighbor in client.show_neighbors().await? {
                    table.add_row(&NeighborSummaryRow(neighbor));
                }
                if table.is_empty() {
                    println!("No neighbors configured");
                } else {
                    table.print();
                }
            }
            Neighbors::Add(options) => {
                print_change(&client.add_neighbor(options.to_spec()).await?);
            }
            Neighbors::Update(options) => {
                print_change(&client.update_neighbor(options.to_spec()).await?);
            }
            Neighbors::Delete { address } => {
                print_outcome(&client.delete_neighbor(*address).await?);
            }
        },
        Command::Route(route) => {
            let mut spec = RouteSpec::new(route.prefix);
            spec.next_hop = route.next_hop;
            spec.community = route.community.clone();
            let outcome = match route.direction {
                Direction::Announce => {
                    client.announce_route(route.neighbor, spec).await?
                }
                Direction::Withdraw => {
                    client.withdraw_route(route.neighbor, spec).await?
                }
            };
            print_outcome(&outcome);
        }
        Command::Flow(flow) => {
            let spec = flow.to_spec();
            let outcome = match flow.direction {
                Direction::Announce => {
                    client.announce_flow(flow.neighbor, spec).await?
                }
                Direction::Withdraw => {
                    client.withdraw_flow(flow.neighbor, spec).await?
                }
            };
            print_outcome(&outcome);
        }
        Command::Raw(raw) => print_outcome(&client.send_command(raw.text.clone()).await?),
        Command::Reload => print_outcome(&client.reload().await?),
        Command::Run(_) => unreachable!("`run` is handled in main"),
    }
    Ok(())
}

/// bgpctl interactive commands (other than running the daemon)
pub async fn query_bgpctl(args: &Args) -> Result<(), CliError> {
    run_cmd(args).await.map_err(|err| {
        eprintln!("{}", err.to_string().red());
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route() {
        let args = Args::parse_from([
            "bgpctl",
            "route",
            "withdraw",
            "10.0.0.1",
            "10.1.0.0/16",
            "-c",
            "65000:100",
            "-c",
            "65000:200",
        ]);
        match args.cmd {
            Command::Route(route) => {
                assert_eq!(route.direction, Direction::Withdraw);
                assert_eq!(
                    route.community,
                    vec![Community(65000, 100), Community(65000, 200)]
                );
                assert_eq!(route.next_hop, None);
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_flow() {
        let args = Args::parse_from([
            "bgpctl",
            "-vv",
            "flow",
            "announce",
            "10.0.0.1",
            "rate-limit:9600",
            "--destination",
            "10.0.0.0/24",
            "--protocol",
            "tcp",
            "--port",
            ">1024&<2048",
        ]);
        assert_eq!(args.verbose, 2);
        match args.cmd {
            Command::Flow(flow) => {
                let spec = flow.to_spec();
                assert_eq!(spec.then, FlowAction::RateLimit(9600));
                assert_eq!(spec.matches.protocol, Some(MatchValue::Value(Protocol::Tcp)));
                assert_eq!(
                    spec.matches.port,
                    Some(MatchValue::Literal(">1024&<2048".to_string()))
                );
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_neighbor() {
        let args = Args::parse_from([
            "bgpctl",
            "neighbors",
            "add",
            "10.0.0.1",
            "--peer-as",
            "65010",
            "--no-route-refresh",
        ]);
        match args.cmd {
            Command::Neighbors(Neighbors::Add(options)) => {
                let spec = options.to_spec();
                assert_eq!(spec.peer_as, Some(65010));
                assert_eq!(
                    spec.capability,
                    Some(Capabilities {
                        route_refresh: false
                    })
                );
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_run() {
        let args = Args::parse_from(["bgpctl", "run", "--listen", "127.0.0.1:8179"]);
        match args.cmd {
            Command::Run(options) => {
                assert_eq!(options.config_path, None);
                assert_eq!(options.listen, Some("127.0.0.1:8179".parse().unwrap()));
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }
}
