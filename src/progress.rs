//! Liveness reporting while a job runs.

use console::{style, Color};
use log::info;
use rand::seq::SliceRandom;
use std::time::Duration;

/// Receives the elapsed time each time a polling interval passes without the
/// job finishing.
pub trait ProgressReporter {
    fn report(&self, elapsed: Duration);
}

/// Formats a duration as `HH:MM:SS`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

const PALETTE: [Color; 5] = [
    Color::Cyan,
    Color::Green,
    Color::Magenta,
    Color::Yellow,
    Color::Blue,
];

/// Prints progress lines to stdout in one color chosen when the reporter is built.
pub struct ConsoleReporter {
    color: Color,
}

impl ConsoleReporter {
    pub fn new(color: Color) -> Self {
        Self { color }
    }

    /// Picks the line color at random so concurrent runs in neighbouring
    /// terminals are easy to tell apart.
    pub fn with_random_color() -> Self {
        let color = *PALETTE
            .choose(&mut rand::thread_rng())
            .unwrap_or(&Color::Cyan);
        Self::new(color)
    }

    pub fn line(&self, elapsed: Duration) -> String {
        format!("Job still running, elapsed {}", format_elapsed(elapsed))
    }
}

impl ProgressReporter for ConsoleReporter {
    fn report(&self, elapsed: Duration) {
        println!("{}", style(self.line(elapsed)).fg(self.color));
    }
}

/// Sends progress lines to the log at info level.
#[derive(Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&self, elapsed: Duration) {
        info!("Job still running, elapsed {}", format_elapsed(elapsed));
    }
}
