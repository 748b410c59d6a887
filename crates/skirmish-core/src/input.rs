//! Client commands

use crate::entity::ItemKind;
use crate::quantize::{snap_direction, snap_position};
use crate::{EntityId, Sequence, Tick};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// What the client wants to pick up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupRequest {
    pub kind: ItemKind,
    pub amount: u16,
    pub target: EntityId,
}

/// One tick's command from a client or bot
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientInputMessage {
    /// Monotonic per connection
    pub sequence: Sequence,
    /// Newest snapshot tick the client has received, doubling as the delta ack
    pub last_received_tick: Tick,
    /// Desired move direction, normalised by the simulation
    pub direction: Vec2,
    pub aim: Vec2,
    pub shoot: bool,
    pub interact: bool,
    pub run: bool,
    pub reload: bool,
    pub change_weapon: bool,
    pub slot: u8,
    pub pickup: Option<PickupRequest>,
}

impl ClientInputMessage {
    /// True if any action requires the authoritative server to resolve it
    pub fn has_action(&self) -> bool {
        self.shoot || self.interact
    }

    /// The command as it survives the wire: direction and aim snapped to their grids
    ///
    /// Clients predict with the quantized command so their replay matches
    /// what the server decodes.
    pub fn quantized(mut self) -> Self {
        self.direction = snap_direction(self.direction);
        self.aim = snap_position(self.aim);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantized_is_stable() {
        let input = ClientInputMessage {
            direction: Vec2::new(0.3, -0.9),
            aim: Vec2::new(12.34, 56.78),
            ..Default::default()
        }
        .quantized();
        assert_eq!(input.quantized(), input);
        assert!(!input.has_action());
    }
}
