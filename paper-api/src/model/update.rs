//! Records pushed through the state publisher.

use super::execution::Execution;
use super::order::Order;
use super::position::Position;
use serde::{Deserialize, Serialize};

/// The kinds of state a consumer can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatumKind {
    ActiveOrder,
    Position,
    Balance,
    TimelineItem,
}

impl DatumKind {
    pub const ALL: [DatumKind; 4] = [
        DatumKind::ActiveOrder,
        DatumKind::Position,
        DatumKind::Balance,
        DatumKind::TimelineItem,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StateUpdate {
    ActiveOrder(Order),
    Position(Position),
    Balance(Position),
    TimelineItem(Execution),
}

impl StateUpdate {
    pub fn kind(&self) -> DatumKind {
        match self {
            StateUpdate::ActiveOrder(_) => DatumKind::ActiveOrder,
            StateUpdate::Position(_) => DatumKind::Position,
            StateUpdate::Balance(_) => DatumKind::Balance,
            StateUpdate::TimelineItem(_) => DatumKind::TimelineItem,
        }
    }
}
