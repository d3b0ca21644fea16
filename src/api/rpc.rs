use std::net::IpAddr;

use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use serde::{Deserialize, Serialize};

use crate::models::{FlowSpec, NeighborSpec, RouteSpec};
use crate::reconcile::Stanza;

#[rpc(client, server)]
pub trait Api {
    /// Add (or replace) a neighbor stanza and reload the speaker
    #[method(name = "add_neighbor")]
    async fn add_neighbor(&self, neighbor: NeighborSpec) -> RpcResult<NeighborChange>;
    /// Replace an existing neighbor stanza and reload the speaker
    #[method(name = "update_neighbor")]
    async fn update_neighbor(&self, neighbor: NeighborSpec) -> RpcResult<NeighborChange>;
    #[method(name = "delete_neighbor")]
    async fn delete_neighbor(&self, address: IpAddr) -> RpcResult<CommandOutcome>;
    #[method(name = "show_neighbors")]
    async fn show_neighbors(&self) -> RpcResult<Vec<NeighborSummary>>;
    #[method(name = "announce_route")]
    async fn announce_route(&self, neighbor: IpAddr, route: RouteSpec)
        -> RpcResult<CommandOutcome>;
    #[method(name = "withdraw_route")]
    async fn withdraw_route(&self, neighbor: IpAddr, route: RouteSpec)
        -> RpcResult<CommandOutcome>;
    #[method(name = "announce_flow")]
    async fn announce_flow(&self, neighbor: IpAddr, flow: FlowSpec) -> RpcResult<CommandOutcome>;
    #[method(name = "withdraw_flow")]
    async fn withdraw_flow(&self, neighbor: IpAddr, flow: FlowSpec) -> RpcResult<CommandOutcome>;
    /// Pass a raw command through to the speaker
    #[method(name = "send_command")]
    async fn send_command(&self, command: String) -> RpcResult<CommandOutcome>;
    #[method(name = "reload")]
    async fn reload(&self) -> RpcResult<CommandOutcome>;
}

/// Command sent to the speaker and what it answered
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandOutcome {
    pub command: String,
    pub response: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct NeighborChange {
    /// No stanza existed for this neighbor before the change
    pub created: bool,
    #[serde(flatten)]
    pub outcome: CommandOutcome,
}

/// Neighbor as currently written in the speaker config file
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct NeighborSummary {
    pub address: IpAddr,
    pub description: Option<String>,
    pub router_id: Option<String>,
    pub local_address: Option<String>,
    pub local_as: Option<String>,
    pub peer_as: Option<String>,
}

impl From<&Stanza> for NeighborSummary {
    fn from(stanza: &Stanza) -> Self {
        Self {
            address: stanza.address(),
            description: stanza.attribute("description"),
            router_id: stanza.attribute("router-id"),
            local_address: stanza.attribute("local-address"),
            local_as: stanza.attribute("local-as"),
            peer_as: stanza.attribute("peer-as"),
        }
    }
}
