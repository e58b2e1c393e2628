//! Tests for Controller module

use super::*;
use crate::gamepad::{GamepadAxis, GamepadButton};
use crate::mapping::{AxisMapping, ButtonMapping, EncoderMapping};
use crate::midi::ProtocolMessage;
use crate::sink::{LogSink, SinkError};
use crate::source::{ChannelSource, MessageSource};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Down(GamepadButton),
    Up(GamepadButton),
    Press(GamepadButton),
    Axis(GamepadAxis, f64),
}

/// Sink whose history stays readable after the controller took ownership
#[derive(Clone, Default)]
struct SharedSink {
    actions: Arc<parking_lot::Mutex<Vec<Action>>>,
    closes: Arc<AtomicUsize>,
}

impl SharedSink {
    fn actions(&self) -> Vec<Action> {
        self.actions.lock().clone()
    }

    fn record(&self, action: Action) -> std::result::Result<(), SinkError> {
        self.actions.lock().push(action);
        Ok(())
    }
}

impl GamepadSink for SharedSink {
    fn button_down(&mut self, button: GamepadButton) -> std::result::Result<(), SinkError> {
        self.record(Action::Down(button))
    }

    fn button_up(&mut self, button: GamepadButton) -> std::result::Result<(), SinkError> {
        self.record(Action::Up(button))
    }

    fn button_press(&mut self, button: GamepadButton) -> std::result::Result<(), SinkError> {
        self.record(Action::Press(button))
    }

    fn axis_move(&mut self, axis: GamepadAxis, value: f64) -> std::result::Result<(), SinkError> {
        self.record(Action::Axis(axis, value))
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Channel source that counts `close` calls
struct CountingSource {
    inner: ChannelSource,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl MessageSource for CountingSource {
    async fn recv(&mut self) -> Option<ProtocolMessage> {
        self.inner.recv().await
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }
}

struct Harness {
    tx: mpsc::Sender<ProtocolMessage>,
    sink: SharedSink,
    source_closes: Arc<AtomicUsize>,
    controller: Controller,
}

fn start(mappings: Vec<Mapping>) -> Harness {
    let (tx, inner) = ChannelSource::new(1024);
    let source_closes = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        inner,
        closes: source_closes.clone(),
    };
    let sink = SharedSink::default();

    let controller = Controller::spawn("test", Box::new(source), Box::new(sink.clone()), mappings);

    Harness {
        tx,
        sink,
        source_closes,
        controller,
    }
}

/// Send `messages`, end the source and wait for the loop to drain it
async fn feed(harness: Harness, messages: Vec<ProtocolMessage>) -> Vec<Action> {
    let Harness {
        tx,
        sink,
        controller,
        ..
    } = harness;

    for msg in messages {
        tx.send(msg).await.unwrap();
    }
    drop(tx);

    wait_stopped(&controller).await;
    controller.stop().await;
    sink.actions()
}

async fn wait_stopped(controller: &Controller) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while controller.is_running() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

fn button_a() -> Mapping {
    ButtonMapping::new("A", 1, 7, GamepadButton::South).into()
}

// ===== End-to-end scenarios =====

#[tokio::test]
async fn test_note_on_presses_button() {
    let actions = feed(start(vec![button_a()]), vec![ProtocolMessage::note_on(1, 7, 100)]).await;
    assert_eq!(actions, vec![Action::Down(GamepadButton::South)]);
}

#[tokio::test]
async fn test_note_off_releases_button() {
    let actions = feed(start(vec![button_a()]), vec![ProtocolMessage::note_off(1, 7, 0)]).await;
    assert_eq!(actions, vec![Action::Up(GamepadButton::South)]);
}

#[tokio::test]
async fn test_unsigned_fader_full_scale() {
    let fader = AxisMapping::new("Fader", 1, 0, GamepadAxis::LeftY, false, 0.0);
    let actions = feed(
        start(vec![fader.into()]),
        vec![ProtocolMessage::control_change(1, 0, 127)],
    )
    .await;
    assert_eq!(actions, vec![Action::Axis(GamepadAxis::LeftY, 1.0)]);
}

#[tokio::test]
async fn test_signed_stick_deadzone() {
    let stick = AxisMapping::new("Stick", 1, 0, GamepadAxis::LeftY, true, 0.05);
    let actions = feed(
        start(vec![stick.into()]),
        vec![ProtocolMessage::control_change(1, 0, 63)],
    )
    .await;
    assert_eq!(actions, vec![Action::Axis(GamepadAxis::LeftY, 0.0)]);
}

#[tokio::test]
async fn test_encoder_ticks() {
    let knob = EncoderMapping::new("Knob", 1, 10, GamepadButton::DpadUp, GamepadButton::DpadDown);
    let actions = feed(
        start(vec![knob.into()]),
        vec![
            ProtocolMessage::control_change(1, 10, 1),
            ProtocolMessage::control_change(1, 10, 127),
            // Not a tick, reported and skipped
            ProtocolMessage::control_change(1, 10, 64),
            ProtocolMessage::control_change(1, 10, 1),
        ],
    )
    .await;
    assert_eq!(
        actions,
        vec![
            Action::Press(GamepadButton::DpadUp),
            Action::Press(GamepadButton::DpadDown),
            Action::Press(GamepadButton::DpadUp),
        ]
    );
}

// ===== Laws =====

#[tokio::test]
async fn test_button_edge_law() {
    let actions = feed(
        start(vec![button_a()]),
        vec![
            ProtocolMessage::note_on(1, 7, 90),
            // Other key and other channel are ignored
            ProtocolMessage::note_on(1, 8, 90),
            ProtocolMessage::note_on(2, 7, 90),
            ProtocolMessage::note_on(1, 7, 0),
            ProtocolMessage::note_on(1, 7, 1),
            ProtocolMessage::note_off(1, 7, 64),
        ],
    )
    .await;
    assert_eq!(
        actions,
        vec![
            Action::Down(GamepadButton::South),
            Action::Up(GamepadButton::South),
            Action::Down(GamepadButton::South),
            Action::Up(GamepadButton::South),
        ]
    );
}

#[tokio::test]
async fn test_table_order_is_deterministic() {
    for _ in 0..10 {
        let harness = start(vec![
            ButtonMapping::new("first", 0, 36, GamepadButton::L1).into(),
            ButtonMapping::new("second", 0, 36, GamepadButton::R1).into(),
        ]);
        harness
            .controller
            .add_mapping(ButtonMapping::new("third", 0, 36, GamepadButton::Start).into());

        let actions = feed(harness, vec![ProtocolMessage::note_on(0, 36, 127)]).await;
        assert_eq!(
            actions,
            vec![
                Action::Down(GamepadButton::L1),
                Action::Down(GamepadButton::R1),
                Action::Down(GamepadButton::Start),
            ]
        );
    }
}

#[tokio::test]
async fn test_added_mapping_applies_to_later_messages() {
    let harness = start(vec![]);
    harness.tx.send(ProtocolMessage::note_on(0, 1, 100)).await.unwrap();

    // Wait until the first message has gone through the empty table
    tokio::time::sleep(Duration::from_millis(20)).await;
    harness
        .controller
        .add_mapping(ButtonMapping::new("late", 0, 1, GamepadButton::West).into());

    let actions = feed(harness, vec![ProtocolMessage::note_off(0, 1, 0)]).await;
    assert_eq!(actions, vec![Action::Up(GamepadButton::West)]);
}

#[tokio::test]
async fn test_no_sink_calls_after_stop() {
    let harness = start(vec![button_a()]);

    for i in 0..500u16 {
        let velocity = (i % 127) as u8;
        harness
            .tx
            .send(ProtocolMessage::note_on(1, 7, velocity))
            .await
            .unwrap();
    }

    harness.controller.stop().await;
    let after_stop = harness.sink.actions().len();

    // Buffered messages stay undelivered
    let _ = harness.tx.send(ProtocolMessage::note_on(1, 7, 100)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(harness.sink.actions().len(), after_stop);
    assert!(!harness.controller.is_running());
}

#[tokio::test]
async fn test_resources_released_exactly_once() {
    let harness = start(vec![button_a()]);

    harness.controller.stop().await;
    harness.controller.stop().await;

    assert_eq!(harness.source_closes.load(Ordering::SeqCst), 1);
    assert_eq!(harness.sink.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_stop() {
    let harness = start(vec![button_a()]);
    let controller = &harness.controller;

    tokio::join!(controller.stop(), controller.stop(), controller.stop());

    assert!(!controller.is_running());
    assert_eq!(harness.source_closes.load(Ordering::SeqCst), 1);
    assert_eq!(harness.sink.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_source_end_releases_resources() {
    let harness = start(vec![button_a()]);
    let sink = harness.sink.clone();
    let source_closes = harness.source_closes.clone();

    feed(harness, vec![]).await;

    assert_eq!(source_closes.load(Ordering::SeqCst), 1);
    assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_drop_without_stop_ends_loop() {
    let harness = start(vec![button_a()]);
    let sink = harness.sink.clone();
    drop(harness.controller);

    tokio::time::timeout(Duration::from_secs(2), async {
        while sink.closes.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

// ===== Lifecycle =====

fn spawn_log_controller() -> (mpsc::Sender<ProtocolMessage>, Controller) {
    let (tx, source) = ChannelSource::new(16);
    let controller = Controller::spawn(
        "test",
        Box::new(source),
        Box::new(LogSink::new("test")),
        vec![button_a()],
    );
    (tx, controller)
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let (_tx, controller) = spawn_log_controller();
    assert!(controller.is_running());
    assert_eq!(controller.name(), "test");

    controller.stop().await;
    controller.stop().await;

    assert!(!controller.is_running());
}

#[tokio::test]
async fn test_add_mapping_appends() {
    let (_tx, controller) = spawn_log_controller();
    controller.add_mapping(ButtonMapping::new("B", 0, 2, GamepadButton::East).into());
    assert_eq!(controller.mapping_count(), 2);
    controller.stop().await;
}

#[tokio::test]
async fn test_controller_list_stops_all() {
    let mut list = ControllerList::new();
    assert!(list.is_empty());

    let (_tx1, first) = spawn_log_controller();
    let (_tx2, second) = spawn_log_controller();
    list.push(first);
    list.push(second);
    assert_eq!(list.len(), 2);

    list.stop_all().await;
    assert!(list.iter().all(|c| !c.is_running()));
}

#[tokio::test]
async fn test_open_rejects_bad_mapping_before_touching_devices() {
    let config: crate::config::ControllerConfig = serde_yaml::from_str(
        r#"
portName: "no-such-port-7f3a9c"
mappings:
  - { comment: "bad", type: button, midiKey: 1, button: triangle }
"#,
    )
    .unwrap();

    match Controller::open(&config, SinkBackend::DryRun) {
        Err(crate::error::Error::InvalidMappingDescriptor(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("controller should not open"),
    }
}

#[tokio::test]
async fn test_open_reports_missing_port() {
    let config: crate::config::ControllerConfig =
        serde_yaml::from_str("portName: \"no-such-port-7f3a9c\"\n").unwrap();

    match Controller::open(&config, SinkBackend::DryRun) {
        Err(crate::error::Error::SourceUnavailable(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("controller should not open"),
    }
}

#[tokio::test]
async fn test_start_reports_missing_port() {
    let config: crate::config::ControllerConfig =
        serde_yaml::from_str("portName: \"no-such-port-7f3a9c\"\n").unwrap();

    match Controller::start(config, SinkBackend::DryRun).await {
        Err(crate::error::Error::SourceUnavailable(_)) => {}
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("controller should not open"),
    }
}

/// Source whose release takes a while, like a driver draining its thread
struct SlowCloseSource {
    inner: ChannelSource,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl MessageSource for SlowCloseSource {
    async fn recv(&mut self) -> Option<ProtocolMessage> {
        self.inner.recv().await
    }

    fn close(&mut self) {
        std::thread::sleep(Duration::from_millis(300));
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }
}

#[tokio::test]
async fn test_stop_after_abandoned_stop_still_waits() {
    let (_tx, inner) = ChannelSource::new(16);
    let source_closes = Arc::new(AtomicUsize::new(0));
    let source = SlowCloseSource {
        inner,
        closes: source_closes.clone(),
    };
    let sink = SharedSink::default();
    let controller = Controller::spawn("slow", Box::new(source), Box::new(sink.clone()), vec![]);

    // Gives up while the source is still being released
    let abandoned = tokio::time::timeout(Duration::from_millis(20), controller.stop()).await;
    assert!(abandoned.is_err());

    controller.stop().await;

    assert_eq!(source_closes.load(Ordering::SeqCst), 1);
    assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
    assert!(!controller.is_running());
}
