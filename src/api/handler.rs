use std::net::{IpAddr, SocketAddr};

use jsonrpsee::core::RpcResult;
use jsonrpsee::server::{ServerBuilder, ServerHandle};
use jsonrpsee::types::error::{CallError, ErrorObject, INVALID_PARAMS_CODE};
use log::{info, warn};
use serde_json::json;
use thiserror::Error;

use super::rpc::{ApiServer, CommandOutcome, NeighborChange, NeighborSummary};
use crate::channel::{ChannelError, ControlResult};
use crate::command::{compile_flow, compile_route, CompileError};
use crate::handler::Server;
use crate::models::{Direction, FlowSpec, NeighborSpec, RouteSpec};
use crate::reconcile::ReconcileError;

pub const NOT_FOUND_CODE: i32 = 404;
pub const REJECTED_CODE: i32 = 400;
pub const RECONCILE_CODE: i32 = 500;
pub const UNAVAILABLE_CODE: i32 = 503;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Neighbor {0} is not configured")]
    NeighborNotFound(IpAddr),
    #[error("Speaker rejected '{command}': {response}")]
    Rejected { command: String, response: String },
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl From<ApiError> for jsonrpsee::core::Error {
    fn from(err: ApiError) -> Self {
        let message = err.to_string();
        let error = match err {
            ApiError::NeighborNotFound(_) => ErrorObject::owned(NOT_FOUND_CODE, message, None::<()>),
            ApiError::Rejected { command, response } => ErrorObject::owned(
                REJECTED_CODE,
                message,
                Some(json!({ "command": command, "response": response })),
            ),
            ApiError::Compile(_) | ApiError::Channel(ChannelError::InvalidCommand(_)) => {
                ErrorObject::owned(INVALID_PARAMS_CODE, message, None::<()>)
            }
            ApiError::Reconcile(_) => ErrorObject::owned(RECONCILE_CODE, message, None::<()>),
            ApiError::Channel(_) => ErrorObject::owned(UNAVAILABLE_CODE, message, None::<()>),
        };
        jsonrpsee::core::Error::Call(CallError::Custom(error))
    }
}

impl Server {
    /// Send a command and turn the speaker's verdict into an API result
    async fn execute(&self, command: String) -> Result<CommandOutcome, ApiError> {
        match self.inner.channel.send(&command).await {
            Ok(ControlResult::Success(response)) => Ok(CommandOutcome { command, response }),
            Ok(ControlResult::Failure(response)) => {
                warn!("Speaker rejected '{}': {}", command, response);
                Err(ApiError::Rejected { command, response })
            }
            Err(err) => {
                if err.is_fatal() {
                    self.inner.fatal.send_replace(true);
                }
                Err(err.into())
            }
        }
    }

    async fn change_neighbor(
        &self,
        neighbor: NeighborSpec,
        must_exist: bool,
    ) -> Result<NeighborChange, ApiError> {
        let reconciler = &self.inner.reconciler;
        let reconciled = if must_exist {
            reconciler.update(&neighbor).await?
        } else {
            reconciler.upsert(&neighbor).await?
        };
        if must_exist && !reconciled.existed {
            return Err(ApiError::NeighborNotFound(neighbor.address));
        }
        let outcome = self.execute("reload".to_string()).await?;
        Ok(NeighborChange {
            created: !reconciled.existed,
            outcome,
        })
    }

    pub async fn serve_rpc_api(
        &self,
        socket: SocketAddr,
    ) -> Result<(SocketAddr, ServerHandle), jsonrpsee::core::Error> {
        let server = ServerBuilder::default().build(socket).await?;
        let addr = server.local_addr()?;
        info!("Starting JSON-RPC server on {}...", addr);
        let handle = server.start(self.clone().into_rpc())?;
        Ok((addr, handle))
    }
}

#[async_trait::async_trait]
impl ApiServer for Server {
    async fn add_neighbor(&self, neighbor: NeighborSpec) -> RpcResult<NeighborChange> {
        Ok(self.change_neighbor(neighbor, false).await?)
    }

    async fn update_neighbor(&self, neighbor: NeighborSpec) -> RpcResult<NeighborChange> {
        Ok(self.change_neighbor(neighbor, true).await?)
    }

    async fn delete_neighbor(&self, address: IpAddr) -> RpcResult<CommandOutcome> {
        let reconciled = self
            .inner
            .reconciler
            .remove(address)
            .await
            .map_err(ApiError::from)?;
        if !reconciled.existed {
            return Err(ApiError::NeighborNotFound(address).into());
        }
        Ok(self.execute("reload".to_string()).await?)
    }

    async fn show_neighbors(&self) -> RpcResult<Vec<NeighborSummary>> {
        let stanzas = self
            .inner
            .reconciler
            .neighbors()
            .await
            .map_err(ApiError::from)?;
        Ok(stanzas.iter().map(NeighborSummary::from).collect())
    }

    async fn announce_route(&self, neighbor: IpAddr, route: RouteSpec) -> RpcResult<CommandOutcome> {
        let command = compile_route(Direction::Announce, neighbor, &route);
        Ok(self.execute(command).await?)
    }

    async fn withdraw_route(&self, neighbor: IpAddr, route: RouteSpec) -> RpcResult<CommandOutcome> {
        let command = compile_route(Direction::Withdraw, neighbor, &route);
        Ok(self.execute(command).await?)
    }

    async fn announce_flow(&self, neighbor: IpAddr, flow: FlowSpec) -> RpcResult<CommandOutcome> {
        let command = compile_flow(Direction::Announce, neighbor, &flow).map_err(ApiError::from)?;
        Ok(self.execute(command).await?)
    }

    async fn withdraw_flow(&self, neighbor: IpAddr, flow: FlowSpec) -> RpcResult<CommandOutcome> {
        let command = compile_flow(Direction::Withdraw, neighbor, &flow).map_err(ApiError::from)?;
        Ok(self.execute(command).await?)
    }

    async fn send_command(&self, command: String) -> RpcResult<CommandOutcome> {
        Ok(self.execute(command).await?)
    }

    async fn reload(&self) -> RpcResult<CommandOutcome> {
        Ok(self.execute("reload".to_string()).await?)
    }
}
