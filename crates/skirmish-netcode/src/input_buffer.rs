//! Input buffering for client-side prediction
//!
//! Holds commands that have been sent to the server but not yet confirmed by
//! a snapshot's `last_input_sequence`.

use skirmish_core::{ClientInputMessage, Sequence};
use std::collections::VecDeque;

/// Buffer of unacknowledged commands, oldest first
#[derive(Debug)]
pub struct InputBuffer {
    inputs: VecDeque<ClientInputMessage>,
    /// Maximum number of inputs to buffer
    capacity: usize,
    /// Last sequence the server confirmed
    last_acknowledged: Sequence,
}

impl InputBuffer {
    /// Create a new input buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            inputs: VecDeque::with_capacity(capacity),
            capacity,
            last_acknowledged: 0,
        }
    }

    /// Add an input to the buffer
    ///
    /// Returns `Err` if the buffer is full.
    pub fn push(&mut self, input: ClientInputMessage) -> crate::Result<()> {
        if self.inputs.len() >= self.capacity {
            return Err(crate::Error::InputBufferFull);
        }
        self.inputs.push_back(input);
        Ok(())
    }

    /// Acknowledge all inputs up to and including `sequence`
    pub fn acknowledge(&mut self, sequence: Sequence) {
        self.last_acknowledged = self.last_acknowledged.max(sequence);
        while let Some(front) = self.inputs.front() {
            if front.sequence <= sequence {
                self.inputs.pop_front();
            } else {
                break;
            }
        }
    }

    /// Inputs after `sequence`, in order (for replay during reconciliation)
    pub fn inputs_after(&self, sequence: Sequence) -> impl Iterator<Item = &ClientInputMessage> {
        self.inputs.iter().filter(move |i| i.sequence > sequence)
    }

    pub fn last_acknowledged(&self) -> Sequence {
        self.last_acknowledged
    }

    /// Get the number of pending inputs
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Clear all inputs
    pub fn clear(&mut self) {
        self.inputs.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(sequence: Sequence) -> ClientInputMessage {
        ClientInputMessage {
            sequence,
            ..Default::default()
        }
    }

    #[test]
    fn test_push_and_len() {
        let mut buffer = InputBuffer::new(10);
        assert!(buffer.is_empty());

        buffer.push(input(1)).unwrap();
        buffer.push(input(2)).unwrap();

        assert_eq!(buffer.len(), 2);
        let pending: Vec<Sequence> = buffer.inputs_after(0).map(|i| i.sequence).collect();
        assert_eq!(pending, vec![1, 2]);
    }

    #[test]
    fn test_capacity_limit() {
        let mut buffer = InputBuffer::new(2);
        buffer.push(input(1)).unwrap();
        buffer.push(input(2)).unwrap();
        assert!(matches!(buffer.push(input(3)), Err(crate::Error::InputBufferFull)));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_acknowledge() {
        let mut buffer = InputBuffer::new(10);
        for seq in 1..=5 {
            buffer.push(input(seq)).unwrap();
        }

        buffer.acknowledge(3);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.inputs_after(0).next().map(|i| i.sequence), Some(4));
        assert_eq!(buffer.last_acknowledged(), 3);

        // An older acknowledgement does not move the watermark back
        buffer.acknowledge(1);
        assert_eq!(buffer.last_acknowledged(), 3);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_inputs_after() {
        let mut buffer = InputBuffer::new(10);
        for seq in 1..=5 {
            buffer.push(input(seq)).unwrap();
        }

        let after: Vec<Sequence> = buffer.inputs_after(2).map(|i| i.sequence).collect();
        assert_eq!(after, vec![3, 4, 5]);
    }
}
