use std::time::{Duration, Instant};

use puremessage_engine::Dispatcher;
use puremessage_events::{BroadcastCommand, ReplayLine};
use tokio::sync::mpsc;
use tracing::debug;

/// A command together with when it went out, relative to the replay start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedCommand {
    pub offset: Duration,
    pub command: BroadcastCommand,
}

/// Feed `lines` to `dispatcher` on a simulated clock, ticking every `tick`
/// between events and for `settle` after the last one. Nothing sleeps, so a
/// whole round replays instantly. Ticks with nothing due are skipped, so the
/// cost depends on how much is scheduled, not on how long the replay spans.
///
/// `rx` must be the receiving end of the dispatcher's broadcast channel.
pub fn run_replay(
    dispatcher: &mut Dispatcher,
    rx: &mut mpsc::UnboundedReceiver<BroadcastCommand>,
    lines: &[ReplayLine],
    tick: Duration,
    settle: Duration,
) -> Vec<TimedCommand> {
    let mut clock = ReplayClock {
        start: Instant::now(),
        now: Duration::ZERO,
        tick: tick.max(Duration::from_millis(1)),
    };
    let mut sent = Vec::new();

    for line in lines {
        clock.advance(dispatcher, rx, line.offset, &mut sent);

        clock.now = clock.now.max(line.offset);
        debug!(target: "runner", "replay line {} at {:?}", line.line, clock.now);
        dispatcher.handle_event(&line.event, clock.start + clock.now);
        drain(rx, clock.now, &mut sent);
    }

    let end = clock.now.saturating_add(settle);
    clock.advance(dispatcher, rx, end, &mut sent);

    sent
}

struct ReplayClock {
    start: Instant,
    now: Duration,
    tick: Duration,
}

impl ReplayClock {
    /// Run every tick up to `until` that has a task due, in order
    fn advance(
        &mut self,
        dispatcher: &mut Dispatcher,
        rx: &mut mpsc::UnboundedReceiver<BroadcastCommand>,
        until: Duration,
        sent: &mut Vec<TimedCommand>,
    ) {
        while let Some(due) = dispatcher.next_due() {
            let due = due.saturating_duration_since(self.start);
            let Some(next) = self.first_tick_at_or_after(due) else {
                break;
            };
            if next > until {
                break;
            }

            self.now = next;
            dispatcher.tick(self.start + next);
            drain(rx, next, sent);
        }
    }

    /// The tick grid runs `tick` apart from the current time
    fn first_tick_at_or_after(&self, due: Duration) -> Option<Duration> {
        let steps = due
            .saturating_sub(self.now)
            .as_nanos()
            .div_ceil(self.tick.as_nanos())
            .max(1);
        let steps = u32::try_from(steps).ok()?;
        self.now.checked_add(self.tick.checked_mul(steps)?)
    }
}

fn drain(
    rx: &mut mpsc::UnboundedReceiver<BroadcastCommand>,
    offset: Duration,
    sent: &mut Vec<TimedCommand>,
) {
    while let Ok(command) = rx.try_recv() {
        sent.push(TimedCommand { offset, command });
    }
}

/// `90.5` style seconds, for printing offsets
pub fn format_offset(offset: Duration) -> String {
    let millis = offset.as_millis();
    if millis % 1000 == 0 {
        format!("{}", millis / 1000)
    } else {
        format!("{:.3}", offset.as_secs_f64())
            .trim_end_matches('0')
            .to_string()
    }
}
