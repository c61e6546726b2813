//! Wire format of the game process's JSON API.
//!
//! Every call is one request object and one response object:
//!
//! ```text
//! -> {"apiVersion":"1.0","requestId":"<uuid>","command":"query_actor","params":{..},"language":"zh"}
//! <- {"status":1,"requestId":"<uuid>","data":{"actors":[..]}}
//! ```
//!
//! A negative `status` means the call failed; the `error` object then carries
//! a code and message.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::entity::{GridPos, Side, UnitId};
use crate::error::{TransportError, TransportResult};
use crate::order::MoveCommand;

/// Lists units of one side.
pub const QUERY_ACTOR: &str = "query_actor";
/// Orders an attack.
pub const ATTACK: &str = "attack";
/// Moves a unit a few cells.
pub const MOVE_ACTOR: &str = "move_actor";

// =============================================================================
// Envelope
// =============================================================================

/// Outgoing request envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request<'a> {
    /// API version string.
    pub api_version: &'a str,
    /// Correlation id echoed by the server.
    pub request_id: String,
    /// Command name.
    pub command: &'a str,
    /// Command parameters.
    pub params: Value,
    /// Language of any human-readable reply text.
    pub language: &'a str,
}

/// Error detail attached to a failed response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code. Servers send either strings or numbers.
    #[serde(default)]
    pub code: Option<Value>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Incoming response envelope. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Negative on failure.
    #[serde(default)]
    pub status: Option<i64>,
    /// Echo of the request id.
    #[serde(default)]
    pub request_id: Option<String>,
    /// Command-specific payload.
    #[serde(default)]
    pub data: Option<Value>,
    /// Failure detail.
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

impl Response {
    /// Verifies correlation and status, returning the payload.
    ///
    /// A response without a `requestId` is accepted; one carrying a different
    /// id is not.
    ///
    /// # Errors
    ///
    /// [`TransportError::CorrelationMismatch`] or [`TransportError::Rejected`].
    pub fn into_payload(self, expected_id: &str) -> TransportResult<Option<Value>> {
        if let Some(received) = self.request_id {
            if received != expected_id {
                return Err(TransportError::CorrelationMismatch {
                    expected: expected_id.to_owned(),
                    received,
                });
            }
        }
        if self.status.is_some_and(|status| status < 0) {
            let body = self.error.unwrap_or_default();
            let code = match body.code {
                Some(Value::String(code)) => code,
                Some(other) => other.to_string(),
                None => "UNKNOWN".to_owned(),
            };
            return Err(TransportError::Rejected {
                code,
                message: body.message.unwrap_or_default(),
            });
        }
        Ok(self.data)
    }
}

// =============================================================================
// Units
// =============================================================================

/// Position as reported by the server.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPosition {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl From<RawPosition> for GridPos {
    fn from(pos: RawPosition) -> Self {
        GridPos::new(pos.x, pos.y)
    }
}

/// One unit from a `query_actor` reply, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawUnit {
    /// Actor id.
    pub id: UnitId,
    /// Raw type name, possibly localized.
    #[serde(rename = "type", default)]
    pub unit_type: String,
    /// Current hit points.
    #[serde(default)]
    pub hp: Option<i64>,
    /// Maximum hit points.
    #[serde(rename = "maxHp", default)]
    pub max_hp: Option<i64>,
    /// Grid position. Units without one are skipped by the store.
    #[serde(default)]
    pub position: Option<RawPosition>,
}

impl RawUnit {
    /// Convenience constructor for a positioned unit at full health.
    #[must_use]
    pub fn new(id: u64, unit_type: &str, x: i32, y: i32) -> Self {
        Self {
            id: UnitId::new(id),
            unit_type: unit_type.to_owned(),
            hp: None,
            max_hp: None,
            position: Some(RawPosition { x, y }),
        }
    }

    /// Sets absolute health, returning `self` for chaining.
    #[must_use]
    pub fn with_hp(mut self, hp: i64, max_hp: i64) -> Self {
        self.hp = Some(hp);
        self.max_hp = Some(max_hp);
        self
    }
}

/// Extracts `data.actors[]`.
///
/// A missing payload or actor list is an empty result. Entries that do not
/// decode as a [`RawUnit`] are dropped individually.
#[must_use]
pub fn actors_from_payload(data: Option<Value>) -> Vec<RawUnit> {
    let Some(Value::Array(actors)) = data.and_then(|mut data| data.get_mut("actors").map(Value::take))
    else {
        return Vec::new();
    };
    actors
        .into_iter()
        .filter_map(|actor| match serde_json::from_value::<RawUnit>(actor) {
            Ok(unit) => Some(unit),
            Err(err) => {
                tracing::trace!(error = %err, "skipping undecodable actor");
                None
            }
        })
        .collect()
}

// =============================================================================
// Parameters
// =============================================================================

/// Parameters for [`QUERY_ACTOR`].
#[must_use]
pub fn query_params(side: Side) -> Value {
    json!({
        "targets": {
            "faction": side.wire_name(),
            "range": "all",
        }
    })
}

/// Parameters for [`ATTACK`].
#[must_use]
pub fn attack_params(attacker: UnitId, target: UnitId) -> Value {
    json!({
        "attackers": { "actorId": [attacker.as_u64()] },
        "targets": { "actorId": [target.as_u64()] },
    })
}

/// Parameters for [`MOVE_ACTOR`].
#[must_use]
pub fn move_params(command: &MoveCommand) -> Value {
    json!({
        "targets": { "actorId": [command.unit.as_u64()] },
        "direction": command.direction.wire_name(),
        "distance": command.distance,
        "isAttackMove": u8::from(command.attack_move),
        "isAssaultMove": u8::from(command.assault_move),
    })
}
