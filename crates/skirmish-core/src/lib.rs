//! # Skirmish Core
//!
//! Real-time tactical micro-management for a game-playing agent.
//!
//! Given a live stream of friendly and enemy unit observations, the core keeps
//! every controlled unit's attack assignment valid, resolves conflicts between
//! competing decision sources by priority, and nudges units into better
//! positions with a potential field.
//!
//! ## Architecture
//!
//! One tick runs the components leaves-first:
//!
//! - **Entity Store** ([`store`]): per-tick snapshot of both sides
//! - **Assignment Guard** ([`guard`]): validates, absorbs and shares targets
//! - **Interrupt Arbiter** ([`interrupt`]): hard combat overrides
//! - **Field Navigator** ([`field`]): attraction/repulsion moves
//! - **Tick Orchestrator** ([`orchestrator`]): merge by priority and dispatch
//!
//! The loop thread and the injection interface live in [`runtime`]; the game
//! process is reached through the [`remote::UnitGateway`] seam.
//!
//! ## Usage
//!
//! ```no_run
//! use skirmish_core::{CoreConfig, TacticalCore, UnitId};
//!
//! let core = TacticalCore::new(CoreConfig::with_endpoint("127.0.0.1", 7445))?;
//! core.start()?;
//! let receipt = core.submit(&[(UnitId::new(11), UnitId::new(42))]);
//! println!("{}", receipt.message);
//! core.stop();
//! # Ok::<(), skirmish_core::CoreError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod entity;
pub mod error;
pub mod field;
pub mod guard;
pub mod interrupt;
pub mod orchestrator;
pub mod order;
pub mod remote;
pub mod runtime;
pub mod spatial;
pub mod store;

pub use config::CoreConfig;
pub use entity::{GridPos, Side, TrackedEntity, UnitCategory, UnitId};
pub use error::{CoreError, CoreResult, TransportError, TransportResult};
pub use orchestrator::{Orchestrator, TickReport};
pub use order::{AttackOrder, Direction, MoveOrder, OrderReason};
pub use runtime::{SubmitReceipt, TacticalCore};

#[cfg(test)]
mod tests;
