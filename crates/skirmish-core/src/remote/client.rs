//! JSON-over-TCP implementation of [`UnitGateway`].

use std::io::{BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use super::protocol::{self, RawUnit, Request, Response};
use super::UnitGateway;
use crate::config::RemoteConfig;
use crate::entity::{Side, UnitId};
use crate::error::{TransportError, TransportResult};
use crate::order::MoveCommand;

/// Opens one connection per call, sends the request, reads exactly one JSON
/// response and closes.
///
/// # Example
///
/// ```no_run
/// use skirmish_core::config::RemoteConfig;
/// use skirmish_core::entity::Side;
/// use skirmish_core::remote::{TcpUnitClient, UnitGateway};
///
/// let mut client = TcpUnitClient::new(RemoteConfig::default());
/// let enemies = client.list_units(Side::Enemy)?;
/// println!("{} enemies", enemies.len());
/// # Ok::<(), skirmish_core::error::TransportError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TcpUnitClient {
    config: RemoteConfig,
}

impl TcpUnitClient {
    /// Creates a client. No connection is made until the first call.
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }

    /// Connection settings in use.
    #[must_use]
    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Sends one command and returns the verified payload.
    ///
    /// # Errors
    ///
    /// Every failure mode of [`TransportError`].
    pub fn call(&self, command: &str, params: Value) -> TransportResult<Option<Value>> {
        let request_id = Uuid::new_v4().to_string();
        let request = Request {
            api_version: &self.config.api_version,
            request_id: request_id.clone(),
            command,
            params,
            language: &self.config.language,
        };
        let body = serde_json::to_vec(&request).map_err(TransportError::Encode)?;

        let timeout = self.config.timeout();
        let mut stream = self.connect(timeout)?;
        stream
            .set_read_timeout(Some(timeout))
            .and_then(|()| stream.set_write_timeout(Some(timeout)))
            .map_err(|err| io_error(err, timeout))?;
        stream
            .write_all(&body)
            .and_then(|()| stream.flush())
            .map_err(|err| io_error(err, timeout))?;

        let response = read_response(&stream, timeout)?;
        response.into_payload(&request_id)
    }

    fn connect(&self, timeout: Duration) -> TransportResult<TcpStream> {
        let addrs: Vec<SocketAddr> = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|err| io_error(err, timeout))?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some(err),
            }
        }
        Err(match last_err {
            Some(err) => io_error(err, timeout),
            None => TransportError::Io(std::io::Error::new(
                ErrorKind::AddrNotAvailable,
                format!("{} resolved to no addresses", self.config.host),
            )),
        })
    }
}

impl UnitGateway for TcpUnitClient {
    fn list_units(&mut self, side: Side) -> TransportResult<Vec<RawUnit>> {
        let data = self.call(protocol::QUERY_ACTOR, protocol::query_params(side))?;
        Ok(protocol::actors_from_payload(data))
    }

    fn attack(&mut self, attacker: UnitId, target: UnitId) -> TransportResult<()> {
        self.call(protocol::ATTACK, protocol::attack_params(attacker, target))
            .map(|_| ())
    }

    fn move_unit(&mut self, command: &MoveCommand) -> TransportResult<()> {
        self.call(protocol::MOVE_ACTOR, protocol::move_params(command))
            .map(|_| ())
    }
}

/// Reads a single JSON value. The server may keep the socket open after
/// replying, so reading stops at the end of the first value.
fn read_response(stream: &TcpStream, timeout: Duration) -> TransportResult<Response> {
    let reader = BufReader::new(stream);
    let mut values = serde_json::Deserializer::from_reader(reader).into_iter::<Response>();
    match values.next() {
        None => Err(TransportError::EmptyResponse),
        Some(Ok(response)) => Ok(response),
        Some(Err(err)) if err.is_io() => Err(io_error(err.into(), timeout)),
        Some(Err(err)) if err.is_eof() => Err(TransportError::EmptyResponse),
        Some(Err(err)) => Err(TransportError::Decode(err)),
    }
}

fn io_error(err: std::io::Error, timeout: Duration) -> TransportError {
    match err.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout(timeout),
        _ => TransportError::Io(err),
    }
}
