use std::time::{Duration, Instant};

use puremessage_engine::{
    Broadcaster, Dispatcher, EngineConfig, MessageField, TaskKey, TriggerKind,
};
use puremessage_events::{BroadcastCommand, BroadcastScope, GameEvent, parse_replay};
use tokio::sync::mpsc;

struct Server {
    dispatcher: Dispatcher,
    rx: mpsc::UnboundedReceiver<BroadcastCommand>,
    start: Instant,
}

impl Server {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            dispatcher: Dispatcher::new(Broadcaster::new(tx)),
            rx,
            start: Instant::now(),
        }
    }

    fn with_config(toml: &str) -> Self {
        let mut server = Self::new();
        let config = EngineConfig::parse(toml).unwrap();
        let rejected = config.apply_to(&mut server.dispatcher, server.start);
        assert!(rejected.is_empty(), "{:?}", rejected);
        server
    }

    fn at(&self, secs: u64) -> Instant {
        self.start + Duration::from_secs(secs)
    }

    fn event(&mut self, secs: u64, event: GameEvent) {
        let now = self.at(secs);
        self.dispatcher.handle_event(&event, now);
    }

    fn tick(&mut self, secs: u64) {
        let now = self.at(secs);
        self.dispatcher.tick(now);
    }

    /// Feed a replay script, ticking every second in between events
    fn replay(&mut self, script: &str, until_secs: u64) {
        let lines = parse_replay(script).unwrap();
        let mut lines = lines.into_iter().peekable();
        for second in 0..=until_secs {
            while let Some(line) = lines.next_if(|l| l.offset.as_secs() <= second) {
                self.event(second, line.event);
            }
            self.tick(second);
        }
    }

    fn sent(&mut self) -> Vec<BroadcastCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = self.rx.try_recv() {
            out.push(cmd);
        }
        out
    }
}

const WELCOME: &str = r#"
[[messages]]
name = "welcome"
trigger = "player_join"
enabled = true
output = "say"
destination = "player"
body = "Welcome {0}!"
delay_seconds = 5
"#;

#[test]
fn test_welcome_message_end_to_end() {
    let mut server = Server::with_config(WELCOME);

    server.event(0, GameEvent::joined("Alice"));
    server.tick(4);
    assert!(server.sent().is_empty());

    server.tick(5);
    assert_eq!(
        server.sent(),
        vec![BroadcastCommand::Say {
            text: "Welcome Alice!".to_string(),
            scope: BroadcastScope::Player("Alice".to_string()),
        }]
    );

    // Exactly once
    server.tick(60);
    assert!(server.sent().is_empty());
}

#[test]
fn test_replayed_round() {
    let mut server = Server::with_config(
        r#"
        [[messages]]
        name = "halfway"
        trigger = "ticket_count"
        enabled = true
        body = "{0}% left"
        ticket_percent = 50

        [[messages]]
        name = "reminder"
        trigger = "timed_counter"
        enabled = true
        output = "yell"
        body = "Two minutes in"
        seconds = 120
        "#,
    );

    server.replay(
        r#"
        # round one
        @0 round-start MP_Subway ConquestLarge0 0 2
        @1 server-info ConquestLarge0 300 300
        @60 server-info ConquestLarge0 200 160
        @90 server-info ConquestLarge0 150 140
        @100 server-info ConquestLarge0 120 100
        @110 round-over 1
        "#,
        200,
    );

    let sent = server.sent();
    // The timed message was cancelled by the round ending at 110
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text(), "50% left");
    assert_eq!(server.dispatcher.shared().start_ticket_count, None);
}

#[test]
fn test_rename_during_join_delay() {
    let mut server = Server::with_config(WELCOME);
    server
        .dispatcher
        .set_field("welcome", MessageField::JoinDelay, "30", server.start)
        .unwrap();

    server.event(0, GameEvent::joined("Alice"));
    server
        .dispatcher
        .set_field("welcome", MessageField::Name, "greeting", server.at(10))
        .unwrap();

    assert!(server
        .dispatcher
        .scheduler()
        .is_scheduled(&TaskKey::player("greeting", "Alice")));

    server.tick(29);
    assert!(server.sent().is_empty());
    server.tick(30);
    assert_eq!(server.sent().len(), 1);
}

#[test]
fn test_disabling_stops_pending_join_messages() {
    let mut server = Server::with_config(WELCOME);
    server
        .dispatcher
        .set_field("welcome", MessageField::JoinDelay, "30", server.start)
        .unwrap();

    server.event(0, GameEvent::joined("Alice"));
    server
        .dispatcher
        .set_field("welcome", MessageField::Enabled, "False", server.at(10))
        .unwrap();
    server.tick(40);

    assert!(server.sent().is_empty());
}

#[test]
fn test_first_spawn_message_with_long_body() {
    let mut server = Server::with_config(
        r#"
        [[messages]]
        name = "rules"
        trigger = "player_spawn"
        enabled = true
        destination = "player"
        body = """
Hi {0}, welcome to the server. Please read the rules before you play. No base camping! No spawn killing? Be nice; have fun. Good luck out there.
/rules shows them again"""
        "#,
    );

    server.event(0, GameEvent::joined("Bob"));
    server.event(3, GameEvent::spawned("Bob"));
    server.event(40, GameEvent::spawned("Bob"));

    let sent = server.sent();
    let texts: Vec<&str> = sent.iter().map(|c| c.text()).collect();
    assert!(texts.len() >= 3, "{:?}", texts);
    assert!(texts.iter().all(|t| t.chars().count() <= 128));
    assert!(texts[0].starts_with("Hi Bob"));
    assert_eq!(*texts.last().unwrap(), " /rules shows them again");
    assert!(sent
        .iter()
        .all(|c| *c.scope() == BroadcastScope::Player("Bob".to_string())));
}

#[test]
fn test_trigger_change_keeps_settings() {
    let mut server = Server::with_config(WELCOME);
    let now = server.start;

    server
        .dispatcher
        .set_field("welcome", MessageField::Trigger, "PLAYER_SPAWN", now)
        .unwrap();
    let message = server.dispatcher.registry().get("welcome").unwrap();
    assert_eq!(message.kind(), TriggerKind::PlayerSpawn);
    assert!(message.enabled());

    server.event(1, GameEvent::joined("Carol"));
    server.event(2, GameEvent::spawned("Carol"));
    assert_eq!(server.sent()[0].text(), "Welcome Carol!");
}

#[test]
fn test_settings_listing_reflects_config() {
    let server = Server::with_config(WELCOME);
    let settings = server.dispatcher.settings();

    let delay = settings
        .iter()
        .find(|s| s.variable == "welcome|welcome - Message delay (seconds)")
        .unwrap();
    assert_eq!(delay.value, "5");
    assert!(settings
        .iter()
        .any(|s| s.variable == "Add New/Settings|Add a message"));
}
