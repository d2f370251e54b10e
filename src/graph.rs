use ahash::AHashMap;
use std::any::type_name;
use std::collections::BTreeMap;
use std::io;
use std::thread::JoinHandle;

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::node::{Node, NodeKind};
use crate::pin::{InputPins, OutputPins};
use crate::sync::State;
use crate::utils::Named;

type Nodes = BTreeMap<String, Box<dyn Node>>;
type Connections = BTreeMap<String, BTreeMap<usize, (String, usize)>>;

/// Owner of nodes and wiring; orchestrates lifecycle transitions.
///
/// Start walks consumers, then transformers, then producers — downstream
/// first, so data does not accumulate before its consumers are ready. Pause
/// and stop walk the reverse order, so upstream stops creating data before
/// its drains go quiet. Topology changes (add / remove / connect /
/// disconnect) are serialised by the graph owner.
///
/// ```ignore
/// let mut g = Graph::new();
/// g.add(ProducerNode::new("src", 1, source))?;
/// g.add(ConsumerNode::new("sink", 1, sink))?;
/// g.connect::<u64>("src", 0, "sink", 0)?;
/// g.start();
/// // ...
/// g.stop();
/// ```
pub struct Graph {
    name: String,
    cfg: GraphConfig,
    producers: Nodes,
    transformers: Nodes,
    consumers: Nodes,
    workers: AHashMap<String, JoinHandle<()>>,
    connections: Connections,
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(cfg: GraphConfig) -> Self {
        Self {
            name: cfg.name.clone().unwrap_or_else(|| "graph".to_string()),
            cfg,
            producers: Nodes::new(),
            transformers: Nodes::new(),
            consumers: Nodes::new(),
            workers: AHashMap::new(),
            connections: Connections::new(),
        }
    }

    /// Add a node under its current name. The node starts disconnected and
    /// paused. Fails if the name is already taken.
    pub fn add(&mut self, node: impl Node + 'static) -> Result<(), GraphError> {
        let name = node.name().to_string();
        if self.lookup(&name).is_some() {
            return Err(GraphError::DuplicateName(name));
        }

        let map = match node.kind() {
            NodeKind::Producer => &mut self.producers,
            NodeKind::Transformer => &mut self.transformers,
            NodeKind::Consumer => &mut self.consumers,
        };
        map.insert(name, Box::new(node));
        Ok(())
    }

    /// Rename the node, then add it.
    pub fn add_named(&mut self, mut node: impl Node + 'static, name: &str) -> Result<(), GraphError> {
        node.rename(name);
        self.add(node)
    }

    /// Remove a node: its worker (if any) is stopped and joined, every pin
    /// is disconnected, and its edges are cleared from the registry. Returns
    /// the node handle, or `None` for an unknown name.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Node>> {
        self.lookup(name)?;

        if let Some(worker) = self.workers.remove(name) {
            if let Some(node) = self.lookup(name) {
                node.signal().transition(State::Stopped);
            }
            if worker.join().is_err() {
                tracing::error!(node = %name, "worker panicked");
            }
        }

        let mut node = self
            .producers
            .remove(name)
            .or_else(|| self.transformers.remove(name))
            .or_else(|| self.consumers.remove(name))?;
        node.sever();

        self.connections.remove(name);
        for edges in self.connections.values_mut() {
            edges.retain(|_, (consumer, _)| consumer.as_str() != name);
        }

        Some(node)
    }

    /// Look a node up by name, across all three variant maps.
    pub fn find(&self, name: &str) -> Option<&dyn Node> {
        self.lookup(name)
    }

    fn lookup(&self, name: &str) -> Option<&dyn Node> {
        self.producers
            .get(name)
            .or_else(|| self.transformers.get(name))
            .or_else(|| self.consumers.get(name))
            .map(|node| node.as_ref())
    }

    /// Wire output pin `out` of `producer` to input pin `input` of
    /// `consumer`, with the config's default pipe caps.
    pub fn connect<T: Send + 'static>(
        &mut self,
        producer: &str,
        out: usize,
        consumer: &str,
        input: usize,
    ) -> Result<(), GraphError> {
        self.connect_capped::<T>(
            producer,
            out,
            consumer,
            input,
            self.cfg.default_max_length,
            self.cfg.default_max_weight,
        )
    }

    /// Wire two pins with explicit pipe caps (0 = uncapped). Idempotent on
    /// the wiring registry: re-connecting the same pins to the same target
    /// is a no-op. On any error the graph is unchanged.
    pub fn connect_capped<T: Send + 'static>(
        &mut self,
        producer: &str,
        out: usize,
        consumer: &str,
        input: usize,
        max_length: usize,
        max_weight: usize,
    ) -> Result<(), GraphError> {
        let already = self
            .connections
            .get(producer)
            .and_then(|edges| edges.get(&out))
            .map_or(false, |(c, i)| c == consumer && *i == input);
        if already {
            return Ok(());
        }

        let outputs = self.outputs_of::<T>(producer)?;
        let inputs = self.inputs_of::<T>(consumer)?;
        if out >= outputs.len() {
            return Err(GraphError::NoSuchPin {
                node: producer.to_string(),
                pin: out,
            });
        }
        if input >= inputs.len() {
            return Err(GraphError::NoSuchPin {
                node: consumer.to_string(),
                pin: input,
            });
        }

        {
            // lock order: outpin before inpin, see DESIGN.md
            let mut outpin = outputs.pin(out);
            let mut inpin = inputs.pin(input);
            outpin.connect(&mut inpin, max_length, max_weight);
        }

        // adoption displaced whatever upstream previously fed this inpin
        for edges in self.connections.values_mut() {
            edges.retain(|_, (c, i)| !(c.as_str() == consumer && *i == input));
        }
        self.connections
            .entry(producer.to_string())
            .or_default()
            .insert(out, (consumer.to_string(), input));
        Ok(())
    }

    /// Disconnect an output pin and clear its edge record.
    pub fn disconnect_output<T: Send + 'static>(
        &mut self,
        producer: &str,
        out: usize,
    ) -> Result<(), GraphError> {
        let outputs = self.outputs_of::<T>(producer)?;
        if out >= outputs.len() {
            return Err(GraphError::NoSuchPin {
                node: producer.to_string(),
                pin: out,
            });
        }

        outputs.pin(out).disconnect();
        if let Some(edges) = self.connections.get_mut(producer) {
            edges.remove(&out);
        }
        Ok(())
    }

    /// Disconnect an input pin and clear any edge record targeting it.
    pub fn disconnect_input<T: Send + 'static>(
        &mut self,
        consumer: &str,
        input: usize,
    ) -> Result<(), GraphError> {
        let inputs = self.inputs_of::<T>(consumer)?;
        if input >= inputs.len() {
            return Err(GraphError::NoSuchPin {
                node: consumer.to_string(),
                pin: input,
            });
        }

        inputs.pin(input).disconnect();
        for edges in self.connections.values_mut() {
            edges.retain(|_, (c, i)| !(c.as_str() == consumer && *i == input));
        }
        Ok(())
    }

    fn outputs_of<T: Send + 'static>(&self, name: &str) -> Result<OutputPins<T>, GraphError> {
        let node = self
            .producers
            .get(name)
            .or_else(|| self.transformers.get(name))
            .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))?;
        node.outputs_any()
            .and_then(|any| any.downcast_ref::<OutputPins<T>>())
            .cloned()
            .ok_or_else(|| GraphError::TypeMismatch {
                node: name.to_string(),
                element: type_name::<T>(),
            })
    }

    fn inputs_of<T: Send + 'static>(&self, name: &str) -> Result<InputPins<T>, GraphError> {
        let node = self
            .consumers
            .get(name)
            .or_else(|| self.transformers.get(name))
            .ok_or_else(|| GraphError::NodeNotFound(name.to_string()))?;
        node.inputs_any()
            .and_then(|any| any.downcast_ref::<InputPins<T>>())
            .cloned()
            .ok_or_else(|| GraphError::TypeMismatch {
                node: name.to_string(),
                element: type_name::<T>(),
            })
    }

    /// Start every node, spawning a worker for each node that lacks one.
    /// Consumers first, then transformers, then producers.
    pub fn start(&mut self) {
        Self::start_section(&mut self.consumers, &mut self.workers);
        Self::start_section(&mut self.transformers, &mut self.workers);
        Self::start_section(&mut self.producers, &mut self.workers);
    }

    fn start_section(nodes: &mut Nodes, workers: &mut AHashMap<String, JoinHandle<()>>) {
        for (name, node) in nodes.iter_mut() {
            node.signal().transition(State::Started);
            if !workers.contains_key(name) {
                match node.spawn_worker() {
                    Ok(handle) => {
                        workers.insert(name.clone(), handle);
                    }
                    Err(e) => tracing::error!(node = %name, error = %e, "worker not started"),
                }
            }
        }
    }

    /// Pause every node. Producers first, then transformers, then
    /// consumers. Workers stay alive, parked on their transition signals.
    pub fn pause(&mut self) {
        Self::transition_section(&mut self.producers, State::Paused);
        Self::transition_section(&mut self.transformers, State::Paused);
        Self::transition_section(&mut self.consumers, State::Paused);
    }

    /// Stop every node and join its worker. Producers first, then
    /// transformers, then consumers. A panicked worker is reported here.
    pub fn stop(&mut self) {
        Self::stop_section(&mut self.producers, &mut self.workers);
        Self::stop_section(&mut self.transformers, &mut self.workers);
        Self::stop_section(&mut self.consumers, &mut self.workers);
    }

    fn transition_section(nodes: &mut Nodes, state: State) {
        for node in nodes.values_mut() {
            node.signal().transition(state);
        }
    }

    fn stop_section(nodes: &mut Nodes, workers: &mut AHashMap<String, JoinHandle<()>>) {
        for (name, node) in nodes.iter_mut() {
            node.signal().transition(State::Stopped);
            if let Some(worker) = workers.remove(name) {
                if worker.join().is_err() {
                    tracing::error!(node = %name, "worker panicked");
                }
            }
        }
    }

    /// Emit a Graphviz "dot" description of the current wiring.
    pub fn to_dot(&self, out: &mut impl io::Write) -> io::Result<()> {
        let dot_name = if self.name == "graph" {
            "graph1"
        } else {
            self.name.as_str()
        };
        writeln!(out, "digraph {dot_name}")?;
        writeln!(out, "{{")?;
        writeln!(out, "\trankdir = LR")?;
        writeln!(out, "\tnode [shape = record, fontname = \"Helvetica\"]")?;
        writeln!(out, "\tedge [color = \"midnightblue\", labelfontname = \"Courier\"]")?;

        for (producer, edges) in &self.connections {
            for (out_pin, (consumer, in_pin)) in edges {
                writeln!(
                    out,
                    "\t{producer} -> {consumer} [taillabel = \"{out_pin}\", headlabel = \"{in_pin}\"]"
                )?;
            }
        }

        writeln!(out, "}}")
    }
}

impl Named for Graph {
    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, to: &str) -> String {
        std::mem::replace(&mut self.name, to.to_string())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Graph {
    fn drop(&mut self) {
        self.stop();
    }
}
