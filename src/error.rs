use std::{error::Error, fmt};

use crate::packet::Packet;

const ERR_MSG_LENGTH_CAP: &str = "pipe length cap reached";
const ERR_MSG_WEIGHT_CAP: &str = "pipe weight cap reached";
const ERR_MSG_DETACHED: &str = "pin has no pipe";

/// Why a push was refused.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PushFailReason {
    /// Appending would exceed the pipe's packet-count cap.
    LengthCap,
    /// Appending would exceed the pipe's byte-weight cap.
    WeightCap,
    /// The pin is not connected to a pipe.
    Detached,
}

impl fmt::Display for PushFailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushFailReason::LengthCap => write!(f, "{ERR_MSG_LENGTH_CAP}"),
            PushFailReason::WeightCap => write!(f, "{ERR_MSG_WEIGHT_CAP}"),
            PushFailReason::Detached => write!(f, "{ERR_MSG_DETACHED}"),
        }
    }
}

/// A refused push. The packet is handed back to the caller, which may retry,
/// reroute or drop it.
pub struct PushError<T> {
    pub packet: Packet<T>,
    pub reason: PushFailReason,
}

impl<T> PushError<T> {
    pub fn length_cap(packet: Packet<T>) -> Self {
        Self {
            packet,
            reason: PushFailReason::LengthCap,
        }
    }

    pub fn weight_cap(packet: Packet<T>) -> Self {
        Self {
            packet,
            reason: PushFailReason::WeightCap,
        }
    }

    pub fn detached(packet: Packet<T>) -> Self {
        Self {
            packet,
            reason: PushFailReason::Detached,
        }
    }

    /// Recover the refused packet.
    pub fn into_packet(self) -> Packet<T> {
        self.packet
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushError")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl<T> Error for PushError<T> {}

/// Failures of graph-level lookup and wiring operations. The graph is left
/// unchanged when any of these is returned.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum GraphError {
    /// No node with that name in any of the graph's maps.
    NodeNotFound(String),
    /// The node exists but has no pin at that index.
    NoSuchPin { node: String, pin: usize },
    /// The node's pins do not carry the requested element type, or the node
    /// has no pins of the requested direction.
    TypeMismatch { node: String, element: &'static str },
    /// A node with that name is already in the graph.
    DuplicateName(String),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::NodeNotFound(name) => write!(f, "node not found: {name}"),
            GraphError::NoSuchPin { node, pin } => write!(f, "node {node} has no pin {pin}"),
            GraphError::TypeMismatch { node, element } => {
                write!(f, "node {node} does not carry element type {element}")
            }
            GraphError::DuplicateName(name) => write!(f, "node name already taken: {name}"),
        }
    }
}

impl Error for GraphError {}
