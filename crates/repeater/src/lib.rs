//! A self-resetting periodic tick source (§4.9).
//!
//! `Repeater::start` fires its first signal after `interval`.
//! `update_interval` re-arms the next fire relative to elapsed time since the
//! last fire rather than restarting the cadence from zero. `stop` closes the
//! tick stream; reuse after stop is not supported (matches the single-use
//! contract in the spec).

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;

enum Command {
    UpdateInterval(Duration),
    Stop,
}

/// Handle held by the spawner to reconfigure or stop the repeater.
pub struct Repeater {
    commands: mpsc::UnboundedSender<Command>,
}

/// Single-consumer tick stream. Call [`Ticks::recv`] in a loop (or inside a
/// `select!` alongside a cancellation token) to observe fires.
pub struct Ticks {
    ticks: mpsc::Receiver<()>,
}

impl Ticks {
    pub async fn recv(&mut self) -> Option<()> {
        self.ticks.recv().await
    }
}

impl Repeater {
    /// Start a repeater whose first tick fires after `interval`.
    pub fn start(interval: Duration) -> (Self, Ticks) {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            let mut interval = interval;
            let mut last_fire = Instant::now();
            let mut deadline = last_fire + interval;

            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        last_fire = Instant::now();
                        deadline = last_fire + interval;
                        // A single-slot channel coalesces a tick the
                        // consumer hasn't drained yet rather than queuing.
                        let _ = tick_tx.try_send(());
                    }
                    cmd = cmd_rx.recv() => {
                        match cmd {
                            Some(Command::UpdateInterval(new_interval)) => {
                                let elapsed = last_fire.elapsed();
                                interval = new_interval;
                                deadline = if new_interval > elapsed {
                                    last_fire + (new_interval - elapsed)
                                } else {
                                    // Already overdue under the new
                                    // interval: fire immediately and re-arm.
                                    Instant::now()
                                };
                                trace!(?new_interval, "repeater interval updated");
                            }
                            Some(Command::Stop) | None => {
                                trace!("repeater stopped");
                                break;
                            }
                        }
                    }
                }
            }
        });

        (Self { commands: cmd_tx }, Ticks { ticks: tick_rx })
    }

    /// Arrange for the next fire at `now + (new - elapsed_since_last_fire)`
    /// if positive, or fire immediately and re-arm otherwise.
    pub fn update_interval(&self, new_interval: Duration) {
        let _ = self.commands.send(Command::UpdateInterval(new_interval));
    }

    /// Cancel the repeater and close its tick stream.
    pub fn stop(self) {
        let _ = self.commands.send(Command::Stop);
    }
}
