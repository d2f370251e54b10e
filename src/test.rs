#[cfg(test)]
mod tests {
    use crate::graph::Graph;
    use crate::node::{
        Consume, ConsumeCtx, ConsumerNode, Produce, ProduceCtx, ProducerNode, Transform,
        TransformCtx, TransformerNode,
    };
    use crate::packet::Packet;
    use crate::samples::generic::{Delay, Generator, Ostreamer, Tee};
    use crate::samples::math::{Adder, ConstAdder};
    use crate::sync::{State, TransitionSignal};
    use crate::timer::{MonotonousTimer, Timer};
    use crate::utils::Named;

    use crossbeam::channel::{self, Receiver, Sender};
    use parking_lot::Mutex;
    use std::fmt;
    use std::io::Write;
    use std::marker::PhantomData;
    use std::ops::AddAssign;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    // ---- test-support nodes

    // Emits one default-valued packet per output pin per produce() call,
    // `remaining` times in total. The counter is shared so tests can reset
    // it between cycles.
    struct ProduceN<T> {
        remaining: Arc<AtomicUsize>,
        _elem: PhantomData<fn() -> T>,
    }

    impl<T> ProduceN<T> {
        fn new(remaining: Arc<AtomicUsize>) -> Self {
            Self {
                remaining,
                _elem: PhantomData,
            }
        }
    }

    impl<T: Default + Send + 'static> Produce for ProduceN<T> {
        type Output = T;

        fn produce(&mut self, ctx: &mut ProduceCtx<'_, T>) {
            let remaining = self.remaining.load(Ordering::Relaxed);
            if remaining == 0 {
                thread::yield_now();
                return;
            }
            self.remaining.store(remaining - 1, Ordering::Relaxed);
            for i in 0..ctx.outs() {
                ctx.output(i).push(Packet::new(T::default())).ok();
            }
        }
    }

    // Forwards input i to output i, counting per pin.
    struct TransformationCounter<T> {
        received: Arc<Vec<AtomicUsize>>,
        _elem: PhantomData<fn() -> T>,
    }

    impl<T> TransformationCounter<T> {
        fn new(received: Arc<Vec<AtomicUsize>>) -> Self {
            Self {
                received,
                _elem: PhantomData,
            }
        }
    }

    impl<T: Send + 'static> Transform for TransformationCounter<T> {
        type Input = T;
        type Output = T;

        fn ready(&mut self, index: usize, ctx: &mut TransformCtx<'_, T, T>) {
            let popped = ctx.input(index).pop();
            let Some(packet) = popped else { return };
            ctx.output(index).push(packet).ok();
            self.received[index].fetch_add(1, Ordering::Relaxed);
        }
    }

    // Pops and discards, counting per pin.
    struct ConsumptionCounter<T> {
        received: Arc<Vec<AtomicUsize>>,
        _elem: PhantomData<fn() -> T>,
    }

    impl<T> ConsumptionCounter<T> {
        fn new(received: Arc<Vec<AtomicUsize>>) -> Self {
            Self {
                received,
                _elem: PhantomData,
            }
        }
    }

    impl<T: Send + 'static> Consume for ConsumptionCounter<T> {
        type Input = T;

        fn ready(&mut self, index: usize, ctx: &mut ConsumeCtx<'_, T>) {
            if ctx.input(index).pop().is_some() {
                self.received[index].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    // Producer fed by the test through a channel.
    struct Pusher<T> {
        feed: Receiver<Packet<T>>,
    }

    impl<T: Send + 'static> Produce for Pusher<T> {
        type Output = T;

        fn produce(&mut self, ctx: &mut ProduceCtx<'_, T>) {
            if let Ok(packet) = self.feed.recv_timeout(Duration::from_millis(20)) {
                ctx.output(0).push(packet).ok();
            }
        }
    }

    // Consumer draining into a channel for the test to observe.
    struct Popper<T> {
        drain: Sender<Packet<T>>,
    }

    impl<T: Send + 'static> Consume for Popper<T> {
        type Input = T;

        fn ready(&mut self, index: usize, ctx: &mut ConsumeCtx<'_, T>) {
            loop {
                let popped = ctx.input(index).pop();
                let Some(packet) = popped else { break };
                self.drain.send(packet).ok();
            }
        }
    }

    // Inert bodies, optionally recording their transitions.
    type TransitionLog = Arc<Mutex<Vec<(String, State)>>>;

    struct DummyProduce<T> {
        log: Option<(String, TransitionLog)>,
        _elem: PhantomData<fn() -> T>,
    }

    impl<T> DummyProduce<T> {
        fn new() -> Self {
            Self {
                log: None,
                _elem: PhantomData,
            }
        }

        fn recording(name: &str, log: TransitionLog) -> Self {
            Self {
                log: Some((name.to_string(), log)),
                _elem: PhantomData,
            }
        }
    }

    fn record(log: &Option<(String, TransitionLog)>, signal: &TransitionSignal) {
        if let Some((name, log)) = log {
            let name = name.clone();
            let log = log.clone();
            signal.on_transition(move |state| log.lock().push((name.clone(), state)));
        }
    }

    impl<T: Send + 'static> Produce for DummyProduce<T> {
        type Output = T;

        fn configure(&mut self, signal: &TransitionSignal) {
            record(&self.log, signal);
        }

        fn produce(&mut self, _ctx: &mut ProduceCtx<'_, T>) {
            thread::yield_now();
        }
    }

    struct DummyConsume<T> {
        log: Option<(String, TransitionLog)>,
        _elem: PhantomData<fn() -> T>,
    }

    impl<T> DummyConsume<T> {
        fn new() -> Self {
            Self {
                log: None,
                _elem: PhantomData,
            }
        }

        fn recording(name: &str, log: TransitionLog) -> Self {
            Self {
                log: Some((name.to_string(), log)),
                _elem: PhantomData,
            }
        }
    }

    impl<T: Send + 'static> Consume for DummyConsume<T> {
        type Input = T;

        fn configure(&mut self, signal: &TransitionSignal) {
            record(&self.log, signal);
        }

        fn ready(&mut self, index: usize, ctx: &mut ConsumeCtx<'_, T>) {
            ctx.input(index).pop();
        }
    }

    struct DummyTransform<T> {
        log: Option<(String, TransitionLog)>,
        _elem: PhantomData<fn() -> T>,
    }

    impl<T> DummyTransform<T> {
        fn new() -> Self {
            Self {
                log: None,
                _elem: PhantomData,
            }
        }

        fn recording(name: &str, log: TransitionLog) -> Self {
            Self {
                log: Some((name.to_string(), log)),
                _elem: PhantomData,
            }
        }
    }

    impl<T: Send + 'static> Transform for DummyTransform<T> {
        type Input = T;
        type Output = T;

        fn configure(&mut self, signal: &TransitionSignal) {
            record(&self.log, signal);
        }

        fn ready(&mut self, index: usize, ctx: &mut TransformCtx<'_, T, T>) {
            let popped = ctx.input(index).pop();
            let Some(packet) = popped else { return };
            ctx.output(index).push(packet).ok();
        }
    }

    struct PanickingConsume;

    impl Consume for PanickingConsume {
        type Input = i32;

        fn ready(&mut self, _index: usize, _ctx: &mut ConsumeCtx<'_, i32>) {
            panic!("bad packet");
        }
    }

    // String wrapper with the `+=` the adder folds with (std's String only
    // has AddAssign<&str>).
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Text(String);

    impl From<&str> for Text {
        fn from(s: &str) -> Self {
            Text(s.to_string())
        }
    }

    impl AddAssign for Text {
        fn add_assign(&mut self, rhs: Self) {
            self.0.push_str(&rhs.0);
        }
    }

    impl fmt::Display for Text {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Clone)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(Vec::new())))
        }

        fn lines(&self) -> Vec<String> {
            String::from_utf8_lossy(&self.0.lock())
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn wait_until(cond: impl Fn() -> bool, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    fn counters(pins: usize) -> Arc<Vec<AtomicUsize>> {
        Arc::new((0..pins).map(|_| AtomicUsize::new(0)).collect())
    }

    // ---- lifecycle

    #[test]
    fn empty_graph_starts_and_stops_cleanly() {
        let mut g = Graph::new();
        g.start();
        g.stop();

        // dropping a started graph stops it too
        let mut g = Graph::new();
        g.start();
        drop(g);
    }

    #[test]
    fn unconnected_nodes_start_and_stop() {
        let mut g = Graph::new();
        g.add(ProducerNode::new("p", 1, DummyProduce::<i32>::new())).unwrap();
        g.add(TransformerNode::new("t", 1, 1, DummyTransform::<i32>::new())).unwrap();
        g.add(ConsumerNode::new("c", 1, DummyConsume::<i32>::new())).unwrap();

        assert_eq!(g.find("p").unwrap().state(), State::Paused);
        g.start();
        assert_eq!(g.find("p").unwrap().state(), State::Started);
        g.stop();
        assert_eq!(g.find("p").unwrap().state(), State::Stopped);
        assert_eq!(g.find("t").unwrap().state(), State::Stopped);
        assert_eq!(g.find("c").unwrap().state(), State::Stopped);
    }

    #[test]
    fn start_orders_downstream_first_and_pause_reverses() {
        let log: TransitionLog = Arc::new(Mutex::new(Vec::new()));
        let mut g = Graph::new();
        g.add(ProducerNode::new(
            "p",
            1,
            DummyProduce::<i32>::recording("p", log.clone()),
        ))
        .unwrap();
        g.add(TransformerNode::new(
            "t",
            1,
            1,
            DummyTransform::<i32>::recording("t", log.clone()),
        ))
        .unwrap();
        g.add(ConsumerNode::new(
            "c",
            1,
            DummyConsume::<i32>::recording("c", log.clone()),
        ))
        .unwrap();

        g.start();
        g.pause();
        g.stop();

        let entries = log.lock().clone();
        let started: Vec<&str> = entries
            .iter()
            .filter(|(_, s)| *s == State::Started)
            .map(|(n, _)| n.as_str())
            .collect();
        let paused: Vec<&str> = entries
            .iter()
            .filter(|(_, s)| *s == State::Paused)
            .map(|(n, _)| n.as_str())
            .collect();
        let stopped: Vec<&str> = entries
            .iter()
            .filter(|(_, s)| *s == State::Stopped)
            .map(|(n, _)| n.as_str())
            .collect();

        assert_eq!(started, ["c", "t", "p"]);
        assert_eq!(paused, ["p", "t", "c"]);
        assert_eq!(stopped, ["p", "t", "c"]);
    }

    // ---- counting scenarios

    #[test]
    fn count_pipeline_delivers_exactly_n() {
        let remaining = Arc::new(AtomicUsize::new(5));
        let transformed = counters(1);
        let consumed = counters(1);

        let mut g = Graph::new();
        g.add(ProducerNode::new(
            "produce_n",
            1,
            ProduceN::<i32>::new(remaining.clone()),
        ))
        .unwrap();
        g.add(TransformerNode::new(
            "transformation_counter",
            1,
            1,
            TransformationCounter::<i32>::new(transformed.clone()),
        ))
        .unwrap();
        g.add(ConsumerNode::new(
            "consumption_counter",
            1,
            ConsumptionCounter::<i32>::new(consumed.clone()),
        ))
        .unwrap();

        g.connect::<i32>("produce_n", 0, "transformation_counter", 0).unwrap();
        g.connect::<i32>("transformation_counter", 0, "consumption_counter", 0).unwrap();

        g.start();
        assert!(wait_until(
            || consumed[0].load(Ordering::Relaxed) == 5,
            Duration::from_secs(5),
        ));
        thread::sleep(Duration::from_millis(50));
        g.stop();

        assert_eq!(transformed[0].load(Ordering::Relaxed), 5);
        assert_eq!(consumed[0].load(Ordering::Relaxed), 5);
    }

    #[test]
    fn restart_cycles_deliver_full_count_each_time() {
        let remaining = Arc::new(AtomicUsize::new(3));
        let consumed = counters(1);

        let mut g = Graph::new();
        g.add(ProducerNode::new(
            "produce_n",
            1,
            ProduceN::<i32>::new(remaining.clone()),
        ))
        .unwrap();
        g.add(ConsumerNode::new(
            "consumption_counter",
            1,
            ConsumptionCounter::<i32>::new(consumed.clone()),
        ))
        .unwrap();
        g.connect::<i32>("produce_n", 0, "consumption_counter", 0).unwrap();

        for cycle in 0..3 {
            g.start();
            assert!(
                wait_until(
                    || consumed[0].load(Ordering::Relaxed) == 3,
                    Duration::from_secs(5),
                ),
                "cycle {cycle}",
            );

            // pause on the middle cycle, stop on the others
            if cycle == 1 {
                g.pause();
            } else {
                g.stop();
            }
            assert_eq!(consumed[0].load(Ordering::Relaxed), 3, "cycle {cycle}");

            consumed[0].store(0, Ordering::Relaxed);
            remaining.store(3, Ordering::Relaxed);
        }
        g.stop();
    }

    #[test]
    fn pause_parks_the_flow_until_restart() {
        let (feed_tx, feed_rx) = channel::unbounded();
        let (drain_tx, drain_rx) = channel::unbounded();

        let mut g = Graph::new();
        g.add(ProducerNode::new("pusher", 1, Pusher { feed: feed_rx })).unwrap();
        g.add(ConsumerNode::new("popper", 1, Popper::<i32> { drain: drain_tx })).unwrap();
        g.connect::<i32>("pusher", 0, "popper", 0).unwrap();

        g.start();
        feed_tx.send(Packet::new(1)).unwrap();
        assert_eq!(
            drain_rx.recv_timeout(Duration::from_secs(2)).unwrap().into_data(),
            1
        );

        g.pause();
        feed_tx.send(Packet::new(2)).unwrap();
        assert!(drain_rx.recv_timeout(Duration::from_millis(150)).is_err());

        g.start();
        assert_eq!(
            drain_rx.recv_timeout(Duration::from_secs(2)).unwrap().into_data(),
            2
        );
        g.stop();
    }

    // ---- sample nodes end to end

    #[test]
    fn tee_fans_out_in_order() {
        let (feed_tx, feed_rx) = channel::unbounded();
        let (drain0_tx, drain0_rx) = channel::unbounded();
        let (drain1_tx, drain1_rx) = channel::unbounded();

        let mut g = Graph::new();
        g.add(ProducerNode::new("pusher", 1, Pusher { feed: feed_rx })).unwrap();
        g.add(TransformerNode::new("tee", 1, 2, Tee::<i32>::new())).unwrap();
        g.add(ConsumerNode::new("popper0", 1, Popper::<i32> { drain: drain0_tx })).unwrap();
        g.add(ConsumerNode::new("popper1", 1, Popper::<i32> { drain: drain1_tx })).unwrap();

        g.connect::<i32>("pusher", 0, "tee", 0).unwrap();
        g.connect::<i32>("tee", 0, "popper0", 0).unwrap();
        g.connect::<i32>("tee", 1, "popper1", 0).unwrap();

        g.start();
        for v in [11, 22, 44] {
            feed_tx.send(Packet::new(v)).unwrap();
        }

        for drain in [&drain0_rx, &drain1_rx] {
            for expected in [11, 22, 44] {
                let packet = drain.recv_timeout(Duration::from_secs(2)).unwrap();
                assert_eq!(packet.into_data(), expected);
            }
        }
        g.stop();
    }

    #[test]
    fn delay_pushes_consumption_time_out() {
        let (feed_tx, feed_rx) = channel::unbounded();
        let (drain_tx, drain_rx) = channel::unbounded();
        let offset = Duration::from_secs(1);

        let mut g = Graph::new();
        g.add(ProducerNode::new("pusher", 1, Pusher { feed: feed_rx })).unwrap();
        g.add(TransformerNode::new("delay", 1, 1, Delay::<i32>::new(offset))).unwrap();
        g.add(ConsumerNode::new("popper", 1, Popper::<i32> { drain: drain_tx })).unwrap();
        g.connect::<i32>("pusher", 0, "delay", 0).unwrap();
        g.connect::<i32>("delay", 0, "popper", 0).unwrap();

        g.start();

        // no consumption time set: stamped arrival + offset
        let before = Instant::now();
        feed_tx.send(Packet::new(7)).unwrap();
        let out = drain_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(out.consumption_time().unwrap() >= before + offset);

        // preset consumption time: shifted by offset
        let preset = Instant::now() + Duration::from_secs(5);
        feed_tx.send(Packet::with_consumption_time(8, preset)).unwrap();
        let out = drain_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(out.consumption_time().unwrap() >= preset + offset);

        g.stop();
    }

    #[test]
    fn adder_sums_synchronised_tuples() {
        let (feed0_tx, feed0_rx) = channel::unbounded();
        let (feed1_tx, feed1_rx) = channel::unbounded();
        let (drain_tx, drain_rx) = channel::unbounded();

        let mut g = Graph::new();
        g.add(ProducerNode::new("pusher0", 1, Pusher { feed: feed0_rx })).unwrap();
        g.add(ProducerNode::new("pusher1", 1, Pusher { feed: feed1_rx })).unwrap();
        g.add(TransformerNode::new("adder", 2, 1, Adder::<i32>::new())).unwrap();
        g.add(ConsumerNode::new("popper", 1, Popper::<i32> { drain: drain_tx })).unwrap();

        g.connect::<i32>("pusher0", 0, "adder", 0).unwrap();
        g.connect::<i32>("pusher1", 0, "adder", 1).unwrap();
        g.connect::<i32>("adder", 0, "popper", 0).unwrap();

        g.start();
        feed0_tx.send(Packet::new(1)).unwrap();
        feed0_tx.send(Packet::new(2)).unwrap();

        // nothing fires until every input has a packet
        assert!(drain_rx.recv_timeout(Duration::from_millis(150)).is_err());

        feed1_tx.send(Packet::new(10)).unwrap();
        feed1_tx.send(Packet::new(20)).unwrap();

        assert_eq!(
            drain_rx.recv_timeout(Duration::from_secs(2)).unwrap().into_data(),
            11
        );
        assert_eq!(
            drain_rx.recv_timeout(Duration::from_secs(2)).unwrap().into_data(),
            22
        );
        g.stop();
    }

    #[test]
    fn const_adder_preserves_consumption_time() {
        let (feed_tx, feed_rx) = channel::unbounded();
        let (drain_tx, drain_rx) = channel::unbounded();

        let mut g = Graph::new();
        g.add(ProducerNode::new("pusher", 1, Pusher { feed: feed_rx })).unwrap();
        g.add(TransformerNode::new("plus100", 1, 1, ConstAdder::new(100))).unwrap();
        g.add(ConsumerNode::new("popper", 1, Popper::<i32> { drain: drain_tx })).unwrap();
        g.connect::<i32>("pusher", 0, "plus100", 0).unwrap();
        g.connect::<i32>("plus100", 0, "popper", 0).unwrap();

        g.start();
        let at = Instant::now() + Duration::from_secs(3);
        feed_tx.send(Packet::with_consumption_time(7, at)).unwrap();

        let out = drain_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(*out.data(), 107);
        assert_eq!(out.consumption_time(), Some(at));
        g.stop();
    }

    #[test]
    fn hello_world_cycle() {
        let timer = MonotonousTimer::new(Duration::from_millis(50));
        let buf = SharedBuf::new();

        let mut g = Graph::new();
        g.add(ProducerNode::new(
            "hello",
            1,
            Generator::new(&timer, || Text::from("Hello")),
        ))
        .unwrap();
        g.add(ProducerNode::new(
            "comma",
            1,
            Generator::new(&timer, || Text::from(", ")),
        ))
        .unwrap();
        g.add(ProducerNode::new(
            "world",
            1,
            Generator::new(&timer, || Text::from("world!")),
        ))
        .unwrap();
        g.add(TransformerNode::new("adder", 3, 1, Adder::<Text>::new())).unwrap();
        g.add(ConsumerNode::new("ostreamer", 1, Ostreamer::<Text, _>::new(buf.clone()))).unwrap();

        g.connect::<Text>("hello", 0, "adder", 0).unwrap();
        g.connect::<Text>("comma", 0, "adder", 1).unwrap();
        g.connect::<Text>("world", 0, "adder", 2).unwrap();
        g.connect::<Text>("adder", 0, "ostreamer", 0).unwrap();

        g.start();
        let ticker = timer.spawn();

        assert!(wait_until(|| buf.lines().len() >= 3, Duration::from_secs(10)));

        timer.stop();
        ticker.join().unwrap();
        g.stop();

        let lines = buf.lines();
        for line in lines.iter().take(3) {
            assert_eq!(line, "Hello, world!");
        }
    }

    // ---- wiring

    #[test]
    fn connect_rejects_unknown_names_types_and_pins() {
        use crate::error::GraphError;

        let mut g = Graph::new();
        g.add(ProducerNode::new("src", 1, DummyProduce::<i32>::new())).unwrap();
        g.add(ConsumerNode::new("sink", 1, DummyConsume::<i32>::new())).unwrap();

        assert_eq!(
            g.connect::<i32>("missing", 0, "sink", 0),
            Err(GraphError::NodeNotFound("missing".to_string()))
        );
        assert_eq!(
            g.connect::<i32>("src", 0, "missing", 0),
            Err(GraphError::NodeNotFound("missing".to_string()))
        );
        assert!(matches!(
            g.connect::<String>("src", 0, "sink", 0),
            Err(GraphError::TypeMismatch { .. })
        ));
        assert!(matches!(
            g.connect::<i32>("src", 3, "sink", 0),
            Err(GraphError::NoSuchPin { .. })
        ));
        assert!(matches!(
            g.connect::<i32>("src", 0, "sink", 3),
            Err(GraphError::NoSuchPin { .. })
        ));

        // the failed attempts left no edges behind
        let mut dot = Vec::new();
        g.to_dot(&mut dot).unwrap();
        assert!(!String::from_utf8(dot).unwrap().contains("->"));
    }

    #[test]
    fn add_rejects_duplicate_names() {
        use crate::error::GraphError;

        let mut g = Graph::new();
        g.add(ProducerNode::new("dup", 1, DummyProduce::<i32>::new())).unwrap();
        assert_eq!(
            g.add(ConsumerNode::new("dup", 1, DummyConsume::<i32>::new())),
            Err(GraphError::DuplicateName("dup".to_string()))
        );
    }

    #[test]
    fn connect_is_idempotent_and_rewire_updates_registry() {
        let mut g = Graph::new();
        g.add(ProducerNode::new("p1", 1, DummyProduce::<i32>::new())).unwrap();
        g.add(ProducerNode::new("p2", 1, DummyProduce::<i32>::new())).unwrap();
        g.add(ConsumerNode::new("c", 1, DummyConsume::<i32>::new())).unwrap();

        g.connect::<i32>("p1", 0, "c", 0).unwrap();
        g.connect::<i32>("p1", 0, "c", 0).unwrap();

        let mut dot = Vec::new();
        g.to_dot(&mut dot).unwrap();
        let dot = String::from_utf8(dot).unwrap();
        assert_eq!(dot.matches("->").count(), 1);
        assert!(dot.contains("p1 -> c"));

        // rewiring the inpin to a new upstream drops the stale edge
        g.connect::<i32>("p2", 0, "c", 0).unwrap();
        let mut dot = Vec::new();
        g.to_dot(&mut dot).unwrap();
        let dot = String::from_utf8(dot).unwrap();
        assert_eq!(dot.matches("->").count(), 1);
        assert!(dot.contains("p2 -> c"));
    }

    #[test]
    fn disconnect_clears_edge_records() {
        let mut g = Graph::new();
        g.add(ProducerNode::new("p", 1, DummyProduce::<i32>::new())).unwrap();
        g.add(ConsumerNode::new("c", 2, DummyConsume::<i32>::new())).unwrap();

        g.connect::<i32>("p", 0, "c", 1).unwrap();
        g.disconnect_output::<i32>("p", 0).unwrap();

        let mut dot = Vec::new();
        g.to_dot(&mut dot).unwrap();
        assert!(!String::from_utf8(dot).unwrap().contains("->"));

        g.connect::<i32>("p", 0, "c", 1).unwrap();
        g.disconnect_input::<i32>("c", 1).unwrap();

        let mut dot = Vec::new();
        g.to_dot(&mut dot).unwrap();
        assert!(!String::from_utf8(dot).unwrap().contains("->"));
    }

    #[test]
    fn to_dot_emits_the_wiring() {
        let mut g = Graph::new();
        g.add(ProducerNode::new("src", 1, DummyProduce::<i32>::new())).unwrap();
        g.add(ConsumerNode::new("sink", 1, DummyConsume::<i32>::new())).unwrap();
        g.connect::<i32>("src", 0, "sink", 0).unwrap();

        let mut dot = Vec::new();
        g.to_dot(&mut dot).unwrap();

        let expected = "digraph graph1\n\
                        {\n\
                        \trankdir = LR\n\
                        \tnode [shape = record, fontname = \"Helvetica\"]\n\
                        \tedge [color = \"midnightblue\", labelfontname = \"Courier\"]\n\
                        \tsrc -> sink [taillabel = \"0\", headlabel = \"0\"]\n\
                        }\n";
        assert_eq!(String::from_utf8(dot).unwrap(), expected);
    }

    #[test]
    fn config_default_caps_apply_to_connected_pipes() {
        use crate::config::GraphConfig;
        use crate::error::PushFailReason;

        let producer = ProducerNode::new("p", 1, DummyProduce::<i32>::new());
        let outs = producer.outputs().clone();

        let mut g = Graph::with_config(GraphConfig {
            name: Some("media".to_string()),
            default_max_length: 1,
            default_max_weight: 0,
        });
        g.add(producer).unwrap();
        g.add(ConsumerNode::new("c", 1, DummyConsume::<i32>::new())).unwrap();
        g.connect::<i32>("p", 0, "c", 0).unwrap();

        assert!(outs.pin(0).push(Packet::new(1)).is_ok());
        let err = outs.pin(0).push(Packet::new(2)).unwrap_err();
        assert_eq!(err.reason, PushFailReason::LengthCap);

        let mut dot = Vec::new();
        g.to_dot(&mut dot).unwrap();
        assert!(String::from_utf8(dot).unwrap().starts_with("digraph media\n"));
    }

    #[test]
    fn renamed_graph_keeps_its_dot_name() {
        let mut g = Graph::new();
        g.rename("media");

        let mut dot = Vec::new();
        g.to_dot(&mut dot).unwrap();
        assert!(String::from_utf8(dot).unwrap().starts_with("digraph media\n"));
    }

    #[test]
    fn add_named_renames_node_and_pins() {
        let mut g = Graph::new();
        g.add_named(ProducerNode::new("tmp", 1, DummyProduce::<i32>::new()), "src").unwrap();
        g.add(ConsumerNode::new("sink", 1, DummyConsume::<i32>::new())).unwrap();
        g.connect::<i32>("src", 0, "sink", 0).unwrap();

        assert!(g.find("src").is_some());
        assert!(g.find("tmp").is_none());

        let mut dot = Vec::new();
        g.to_dot(&mut dot).unwrap();
        assert!(String::from_utf8(dot).unwrap().contains("src -> sink"));
    }

    #[test]
    fn remove_stops_severs_and_evicts() {
        let remaining = Arc::new(AtomicUsize::new(0));
        let consumed = counters(1);

        let mut g = Graph::new();
        g.add(ProducerNode::new("p", 1, ProduceN::<i32>::new(remaining))).unwrap();
        g.add(ConsumerNode::new(
            "c",
            1,
            ConsumptionCounter::<i32>::new(consumed),
        ))
        .unwrap();
        g.connect::<i32>("p", 0, "c", 0).unwrap();
        g.start();

        let removed = g.remove("c").unwrap();
        assert_eq!(removed.state(), State::Stopped);
        assert_eq!(removed.name(), "c");
        assert!(g.find("c").is_none());

        let mut dot = Vec::new();
        g.to_dot(&mut dot).unwrap();
        assert!(!String::from_utf8(dot).unwrap().contains("->"));

        assert!(g.remove("c").is_none());
        assert!(g.remove("never-added").is_none());
        g.stop();
    }

    // ---- failure semantics

    #[test]
    fn panicking_worker_is_reported_and_not_restarted() {
        let (feed_tx, feed_rx) = channel::unbounded();

        let mut g = Graph::new();
        g.add(ProducerNode::new("pusher", 1, Pusher { feed: feed_rx })).unwrap();
        g.add(ConsumerNode::new("victim", 1, PanickingConsume)).unwrap();
        g.connect::<i32>("pusher", 0, "victim", 0).unwrap();

        g.start();
        assert!(wait_until(
            || g.find("victim").map(|n| n.is_healthy()) == Some(true),
            Duration::from_secs(2),
        ));

        feed_tx.send(Packet::new(1)).unwrap();
        assert!(wait_until(
            || g.find("victim").map(|n| n.is_healthy()) == Some(false),
            Duration::from_secs(2),
        ));

        g.stop();

        // the body died with the worker; a new start cannot revive the node
        g.start();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(g.find("victim").map(|n| n.is_healthy()), Some(false));
        g.stop();
    }
}
