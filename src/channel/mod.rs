//! The single command/response path to the running speaker.
//!
//! Commands are written one per line and the speaker answers each with any
//! number of payload lines followed by `done` or `error`. The stream has no
//! request ids, so a reply can only be matched to its command by never having
//! more than one command outstanding.

mod codec;

pub use codec::{ControlCodec, Reply, MAX_LINE_LENGTH};

use std::fmt;
use std::io;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use log::{debug, error, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::config::Transport;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Control channel I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("No response from speaker within {0:?}")]
    Timeout(Duration),
    #[error("Speaker closed the control channel")]
    Closed,
    #[error("Control channel is broken after an earlier failure")]
    Broken,
    #[error("Speaker reply exceeded {0} bytes")]
    LineTooLong(usize),
    #[error("Speaker reply was not valid UTF-8")]
    InvalidUtf8,
    #[error("Commands must be a single line: {0:?}")]
    InvalidCommand(String),
}

impl ChannelError {
    /// The channel can no longer be trusted to pair commands with replies
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ChannelError::InvalidCommand(_))
    }
}

/// Classified reply to a single command
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "response", rename_all = "lowercase")]
pub enum ControlResult {
    Success(String),
    Failure(String),
}

impl ControlResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ControlResult::Success(_))
    }

    pub fn response(&self) -> &str {
        match self {
            ControlResult::Success(response) | ControlResult::Failure(response) => response,
        }
    }
}

impl fmt::Display for ControlResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ControlResult::Success(response) => write!(f, "success ({})", response),
            ControlResult::Failure(response) => write!(f, "failure ({})", response),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Sending,
    AwaitingResponse,
    Broken,
}

struct Pipes<W, R> {
    writer: FramedWrite<W, ControlCodec>,
    reader: FramedRead<R, ControlCodec>,
    state: ChannelState,
}

impl<W, R> Pipes<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    fn transition(&mut self, state: ChannelState) {
        trace!("Control channel {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    async fn exchange(&mut self, command: &str) -> Result<ControlResult, ChannelError> {
        self.transition(ChannelState::Sending);
        // `send` flushes, the speaker sees the whole line before we start reading
        self.writer.send(command.to_string()).await?;
        self.transition(ChannelState::AwaitingResponse);

        let mut payload: Vec<String> = vec![];
        loop {
            match self.reader.next().await {
                Some(Ok(Reply::Line(line))) => {
                    trace!("Speaker: {}", line);
                    payload.push(line);
                }
                Some(Ok(Reply::Done)) => {
                    return Ok(ControlResult::Success(response_text(payload, "done")))
                }
                Some(Ok(Reply::Error)) => {
                    return Ok(ControlResult::Failure(response_text(payload, "error")))
                }
                Some(Err(err)) => return Err(err),
                None => return Err(ChannelError::Closed),
            }
        }
    }
}

/// Payload lines, or the terminal token itself when the speaker sent nothing else
fn response_text(payload: Vec<String>, token: &str) -> String {
    if payload.is_empty() {
        token.to_string()
    } else {
        payload.join("\n")
    }
}

/// Serializes commands over one writer/reader pair
///
/// Callers queue on an async mutex (FIFO), so at most one command is ever in
/// flight. Any transport failure moves the channel to [`ChannelState::Broken`]
/// for good: after a lost reply there is no way to tell which reply belongs to
/// which command.
pub struct ControlChannel<W, R> {
    pipes: Mutex<Pipes<W, R>>,
    timeout: Duration,
}

/// Channel over whichever transport the daemon was configured with
pub type SpeakerChannel = ControlChannel<
    Box<dyn AsyncWrite + Send + Unpin>,
    Box<dyn AsyncRead + Send + Unpin>,
>;

impl<W, R> ControlChannel<W, R>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    pub fn new(writer: W, reader: R, timeout: Duration) -> Self {
        Self {
            pipes: Mutex::new(Pipes {
                writer: FramedWrite::new(writer, ControlCodec::new()),
                reader: FramedRead::new(reader, ControlCodec::new()),
                state: ChannelState::Idle,
            }),
            timeout,
        }
    }

    pub async fn state(&self) -> ChannelState {
        self.pipes.lock().await.state
    }

    /// Write `command` and wait for the speaker's verdict
    ///
    /// The timeout covers the write and the wait for the terminal token.
    pub async fn send(&self, command: &str) -> Result<ControlResult, ChannelError> {
        if command.contains(|c: char| c == '\n' || c == '\r') {
            return Err(ChannelError::InvalidCommand(command.to_string()));
        }
        let mut pipes = self.pipes.lock().await;
        if pipes.state == ChannelState::Broken {
            return Err(ChannelError::Broken);
        }
        debug!("Sending command: {}", command);
        let outcome = match tokio::time::timeout(self.timeout, pipes.exchange(command)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ChannelError::Timeout(self.timeout)),
        };
        match outcome {
            Ok(result) => {
                pipes.transition(ChannelState::Idle);
                info!("{} => {}", command, result);
                Ok(result)
            }
            Err(err) => {
                pipes.transition(ChannelState::Broken);
                error!("Control channel failed on '{}': {}", command, err);
                Err(err)
            }
        }
    }

    /// Ask the speaker to re-read its configuration file
    pub async fn reload(&self) -> Result<ControlResult, ChannelError> {
        self.send("reload").await
    }
}

/// Open the configured transport
///
/// For `pipes` the speaker must already have its end of the command pipe open.
/// On Linux the response pipe is opened read-write, so reads wait for the
/// speaker's writer instead of seeing EOF while it has none open.
pub fn connect(transport: &Transport, timeout: Duration) -> io::Result<SpeakerChannel> {
    match transport {
        Transport::Pipes { command, response } => {
            use tokio::net::unix::pipe::OpenOptions;

            let mut options = OpenOptions::new();
            #[cfg(target_os = "linux")]
            options.read_write(true);
            let reader: Box<dyn AsyncRead + Send + Unpin> =
                Box::new(options.open_receiver(response)?);
            let writer: Box<dyn AsyncWrite + Send + Unpin> =
                Box::new(OpenOptions::new().open_sender(command)?);
            info!(
                "Connected to speaker pipes {} / {}",
                command.display(),
                response.display()
            );
            Ok(ControlChannel::new(writer, reader, timeout))
        }
        Transport::Stdio => {
            info!("Using stdin/stdout as the speaker control channel");
            let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(tokio::io::stdout());
            let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(tokio::io::stdin());
            Ok(ControlChannel::new(writer, reader, timeout))
        }
    }
}
