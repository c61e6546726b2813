//! Remote unit client.
//!
//! [`UnitGateway`] is the seam between the tactical core and the game process.
//! The production implementation is [`TcpUnitClient`], one JSON request per
//! TCP connection. Tests drive the core with in-memory gateways instead.

pub mod client;
pub mod protocol;

pub use client::TcpUnitClient;
pub use protocol::{RawPosition, RawUnit};

use crate::entity::{Side, UnitId};
use crate::error::TransportResult;
use crate::order::MoveCommand;

/// Synchronous access to the game process.
///
/// Calls block for at most the configured timeout and are never retried.
/// Implementations must be `Send` so a gateway can be moved onto the loop
/// thread.
pub trait UnitGateway: Send {
    /// Lists every unit of one side.
    ///
    /// # Errors
    ///
    /// Any [`TransportError`](crate::error::TransportError); the caller treats
    /// all of them as a failed observation.
    fn list_units(&mut self, side: Side) -> TransportResult<Vec<RawUnit>>;

    /// Orders `attacker` to attack `target`.
    ///
    /// # Errors
    ///
    /// Any [`TransportError`](crate::error::TransportError).
    fn attack(&mut self, attacker: UnitId, target: UnitId) -> TransportResult<()>;

    /// Moves a unit.
    ///
    /// # Errors
    ///
    /// Any [`TransportError`](crate::error::TransportError).
    fn move_unit(&mut self, command: &MoveCommand) -> TransportResult<()>;
}

impl<G: UnitGateway + ?Sized> UnitGateway for Box<G> {
    fn list_units(&mut self, side: Side) -> TransportResult<Vec<RawUnit>> {
        (**self).list_units(side)
    }

    fn attack(&mut self, attacker: UnitId, target: UnitId) -> TransportResult<()> {
        (**self).attack(attacker, target)
    }

    fn move_unit(&mut self, command: &MoveCommand) -> TransportResult<()> {
        (**self).move_unit(command)
    }
}
