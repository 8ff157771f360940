use puremessage_events::{BroadcastCommand, BroadcastScope, DEFAULT_YELL_DURATION};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::text_splitter::{split_message, SAY_MAX_LENGTH, YELL_MAX_LENGTH};

/// Where outbound say/yell commands end up
pub trait BroadcastChannel: Send {
    fn send(&mut self, command: BroadcastCommand);
}

impl BroadcastChannel for UnboundedSender<BroadcastCommand> {
    fn send(&mut self, command: BroadcastCommand) {
        if UnboundedSender::send(self, command).is_err() {
            warn!(target: "broadcast", "Broadcast receiver dropped, command discarded");
        }
    }
}

/// Say/yell front end for messages. Splits say text into chunks the server
/// accepts and hands every chunk to the channel in order.
pub struct Broadcaster {
    channel: Box<dyn BroadcastChannel>,
    say_max_length: usize,
    yell_duration: u32,
}

impl Broadcaster {
    pub fn new(channel: impl BroadcastChannel + 'static) -> Self {
        Self {
            channel: Box::new(channel),
            say_max_length: SAY_MAX_LENGTH,
            yell_duration: DEFAULT_YELL_DURATION,
        }
    }

    pub fn with_yell_duration(mut self, seconds: u32) -> Self {
        self.yell_duration = seconds;
        self
    }

    pub fn say_all(&mut self, text: &str) {
        self.say(text, BroadcastScope::All);
    }

    pub fn say_team(&mut self, text: &str, team: u32) {
        self.say(text, BroadcastScope::Team(team));
    }

    pub fn say_squad(&mut self, text: &str, team: u32, squad: u32) {
        self.say(text, BroadcastScope::Squad { team, squad });
    }

    pub fn say_player(&mut self, text: &str, player: &str) {
        self.say(text, BroadcastScope::Player(player.to_string()));
    }

    pub fn yell_all(&mut self, text: &str) {
        self.yell(text, BroadcastScope::All);
    }

    pub fn yell_team(&mut self, text: &str, team: u32) {
        self.yell(text, BroadcastScope::Team(team));
    }

    pub fn yell_squad(&mut self, text: &str, team: u32, squad: u32) {
        self.yell(text, BroadcastScope::Squad { team, squad });
    }

    pub fn yell_player(&mut self, text: &str, player: &str) {
        self.yell(text, BroadcastScope::Player(player.to_string()));
    }

    /// Say `text` to `scope`, one command per chunk
    pub fn say(&mut self, text: &str, scope: BroadcastScope) {
        debug!(target: "broadcast", "Saying to {}: {}", scope, text);

        for chunk in split_message(text, self.say_max_length) {
            self.channel.send(BroadcastCommand::Say {
                text: chunk,
                scope: scope.clone(),
            });
        }
    }

    /// Yell `text` to `scope`. Over-long yells are reported but still sent whole.
    pub fn yell(&mut self, text: &str, scope: BroadcastScope) {
        if text.chars().count() > YELL_MAX_LENGTH {
            warn!(
                target: "broadcast",
                "Yell longer than {} characters, the server may reject it: {}",
                YELL_MAX_LENGTH,
                text
            );
        }

        debug!(target: "broadcast", "Yelling to {}: {}", scope, text);

        self.channel.send(BroadcastCommand::Yell {
            text: text.to_string(),
            duration: self.yell_duration,
            scope,
        });
    }
}
