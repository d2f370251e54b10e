pub use crate::config::GraphConfig;
pub use crate::error::{GraphError, PushError, PushFailReason};
pub use crate::graph::Graph;
pub use crate::node::{
    Consume, ConsumeCtx, ConsumerNode, Node, NodeKind, Produce, ProduceCtx, ProducerNode,
    Transform, TransformCtx, TransformerNode,
};
pub use crate::packet::Packet;
pub use crate::pin::{InPin, InputPins, OutPin, OutputPins};
pub use crate::pipe::{Pipe, PipeCell};
pub use crate::samples;
pub use crate::sync::{State, TransitionSignal};
pub use crate::timer::{MonotonousTimer, Timer};
pub use crate::utils::Named;
