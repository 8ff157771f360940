use std::time::Duration;

use puremessage_engine::EngineConfig;
use puremessage_events::{
    BroadcastCommand, EventConsumer, EventEnvelope, GameEvent, parse_replay,
};
use puremessage_runner::{
    EngineConsumer, LogLevel, build_dispatcher, engine_channel, format_command, run_engine,
    run_replay,
};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, reload};

const WELCOME: &str = r#"
[[messages]]
name = "welcome"
trigger = "player_join"
enabled = true
destination = "player"
body = "Welcome {0}!"
delay_seconds = 5
"#;

type RunningEngine = (
    puremessage_runner::EngineHandle,
    mpsc::UnboundedReceiver<BroadcastCommand>,
    watch::Sender<bool>,
    tokio::task::JoinHandle<puremessage_engine::Dispatcher>,
);

fn start_engine(toml: &str) -> RunningEngine {
    start_engine_with_level(toml, None)
}

fn start_engine_with_level(
    toml: &str,
    log_level: Option<LogLevel>,
) -> RunningEngine {
    let config = EngineConfig::parse(toml).unwrap();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (dispatcher, rejected) =
        build_dispatcher(&config, commands_tx, tokio::time::Instant::now().into_std());
    assert!(rejected.is_empty(), "{:?}", rejected);

    let (handle, input_rx) = engine_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine = tokio::spawn(run_engine(
        dispatcher,
        input_rx,
        config.tick_interval(),
        shutdown_rx,
        log_level,
    ));
    (handle, commands_rx, shutdown_tx, engine)
}

#[tokio::test(start_paused = true)]
async fn test_engine_sends_delayed_welcome() {
    let (handle, mut commands_rx, _shutdown_tx, engine) = start_engine(WELCOME);

    handle.send_event(GameEvent::joined("Alice")).unwrap();
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(commands_rx.try_recv().is_err());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let command = commands_rx.try_recv().unwrap();
    assert_eq!(format_command(&command), "admin.say \"Welcome Alice!\" player Alice");

    handle.shutdown().unwrap();
    let dispatcher = engine.await.unwrap();
    assert_eq!(dispatcher.stats().tasks_fired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_settings_applied_while_running() {
    let (handle, mut commands_rx, _shutdown_tx, engine) = start_engine(WELCOME);

    handle.send_event(GameEvent::joined("Alice")).unwrap();
    handle
        .apply_setting("welcome|welcome - Message enabled", "False")
        .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(commands_rx.try_recv().is_err());

    handle.shutdown().unwrap();
    let dispatcher = engine.await.unwrap();
    assert!(!dispatcher.registry().get("welcome").unwrap().enabled());
}

#[tokio::test(start_paused = true)]
async fn test_drain_waits_for_scheduled_messages() {
    let (handle, mut commands_rx, _shutdown_tx, engine) = start_engine(WELCOME);

    // Input ends right after the join; the welcome is still due in 5s
    handle.send_event(GameEvent::joined("Alice")).unwrap();
    handle.drain().unwrap();
    drop(handle);

    let started = tokio::time::Instant::now();
    let dispatcher = engine.await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(dispatcher.stats().tasks_fired, 1);
    assert_eq!(commands_rx.try_recv().unwrap().text(), "Welcome Alice!");
}

#[tokio::test(start_paused = true)]
async fn test_drain_with_nothing_scheduled_stops() {
    let (handle, _commands_rx, _shutdown_tx, engine) = start_engine(WELCOME);

    handle.drain().unwrap();
    let dispatcher = engine.await.unwrap();
    assert_eq!(dispatcher.stats().tasks_fired, 0);
}

#[tokio::test(start_paused = true)]
async fn test_debug_setting_changes_log_level() {
    let (layer, reload_handle) = reload::Layer::new(EnvFilter::new("info"));
    let _subscriber = tracing_subscriber::registry().with(layer);
    let level = LogLevel::new(reload_handle);
    let (handle, _commands_rx, _shutdown_tx, engine) =
        start_engine_with_level(WELCOME, Some(level.clone()));

    handle.apply_setting("Add New/Settings|Debug", "True").unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(level.current().as_deref(), Some("debug"));

    handle.apply_setting("Add New/Settings|Debug", "False").unwrap();
    handle.shutdown().unwrap();
    let dispatcher = engine.await.unwrap();
    assert!(!dispatcher.debug());
    assert_eq!(level.current().as_deref(), Some("info"));
}

#[tokio::test(start_paused = true)]
async fn test_watch_shutdown_stops_engine() {
    let (handle, _commands_rx, shutdown_tx, engine) = start_engine(WELCOME);

    shutdown_tx.send(true).unwrap();
    let dispatcher = engine.await.unwrap();
    assert_eq!(dispatcher.registry().len(), 1);

    // Nothing is listening any more
    assert!(handle.send_event(GameEvent::joined("Bob")).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_consumer_forwards_events() {
    let (handle, mut commands_rx, _shutdown_tx, engine) = start_engine(
        r#"
        [[messages]]
        name = "rules"
        trigger = "player_spawn"
        enabled = true
        destination = "player"
        body = "Read the rules, {0}"
        "#,
    );

    let mut consumer = EngineConsumer::new(handle.clone());
    consumer.handle_event(EventEnvelope::new(GameEvent::joined("Dana")));
    consumer.handle_event(EventEnvelope::new(GameEvent::spawned("Dana")));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(commands_rx.try_recv().unwrap().text(), "Read the rules, Dana");

    drop(consumer);
    drop(handle);
    // All handles gone closes the input channel
    engine.await.unwrap();
}

#[test]
fn test_replay_reports_offsets() {
    let config = EngineConfig::parse(
        r#"
        [[messages]]
        name = "welcome"
        trigger = "player_join"
        enabled = true
        body = "Welcome {0}!"
        delay_seconds = 5

        [[messages]]
        name = "reminder"
        trigger = "timed_counter"
        enabled = true
        output = "yell"
        body = "Ten seconds in"
        seconds = 10
        "#,
    )
    .unwrap();
    let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
    let (mut dispatcher, _) = build_dispatcher(&config, commands_tx, std::time::Instant::now());

    let lines = parse_replay(
        "@0 round-start MP_Subway ConquestLarge0 0 2\n\
         @2.5 join Alice\n",
    )
    .unwrap();
    let sent = run_replay(
        &mut dispatcher,
        &mut commands_rx,
        &lines,
        Duration::from_millis(500),
        Duration::from_secs(30),
    );

    let timeline: Vec<(u128, &str)> = sent
        .iter()
        .map(|c| (c.offset.as_millis(), c.command.text()))
        .collect();
    assert_eq!(
        timeline,
        vec![(7500, "Welcome Alice!"), (10000, "Ten seconds in")]
    );
}
