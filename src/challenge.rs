//! Login challenge state machine
//!
//! Runs one bounded authentication attempt: prompt for a code, check it
//! against the time-window matcher, pause and retry on a mismatch, and give
//! up when the time budget runs out or the input stream closes. The terminal
//! outcomes are admit and deny; what happens next is the caller's business.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::otp::Totp;

/// Prompt shown while waiting for a code
pub const PROMPT: &str = "One-time password: ";

/// Notice printed after a wrong code
const RETRY_NOTICE: &str = "Incorrect code, try again.";

/// Terminal outcome of one login challenge
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Hand the session its shell
    Admit,
    /// Terminate without granting a shell
    Deny,
}

/// One line of operator input, or the reason none arrived
#[derive(Debug, Eq, PartialEq)]
pub enum PromptEvent {
    /// A line was read before the deadline
    Line(String),
    /// The deadline passed while waiting
    Expired,
    /// The input stream ended or failed
    Closed,
}

/// A blocking line reader that honors a deadline
pub trait Prompt {
    /// Block for one line of input, giving up at `deadline`
    fn read_line(&mut self, deadline: Instant) -> PromptEvent;
}

/// Reads operator input from stdin
///
/// A detached reader thread feeds lines through a channel, so a blocked
/// read never outlives the deadline. The thread is reaped at process exit.
pub struct StdinPrompt {
    lines: Receiver<Option<String>>,
}

impl StdinPrompt {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Some(line)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = tx.send(None);
        });

        Self { lines: rx }
    }
}

impl Default for StdinPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt for StdinPrompt {
    fn read_line(&mut self, deadline: Instant) -> PromptEvent {
        let budget = deadline.saturating_duration_since(Instant::now());
        if budget.is_zero() {
            return PromptEvent::Expired;
        }

        match self.lines.recv_timeout(budget) {
            Ok(Some(line)) => PromptEvent::Line(line),
            Ok(None) => PromptEvent::Closed,
            Err(RecvTimeoutError::Timeout) => PromptEvent::Expired,
            Err(RecvTimeoutError::Disconnected) => PromptEvent::Closed,
        }
    }
}

/// One bounded login challenge for a loaded configuration
pub struct Challenge<'a> {
    config: &'a Config,
}

impl<'a> Challenge<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run the challenge to a terminal outcome
    ///
    /// Errors only on fatal configuration problems (malformed secret, zero
    /// period). A wrong code retries after the configured delay; an
    /// exhausted time budget or a closed input stream denies.
    pub fn run(&self, prompt: &mut dyn Prompt) -> Result<Outcome> {
        if !self.config.is_enrolled() {
            if self.config.require_enrollment {
                warn!("no secret enrolled and enrollment is required; denying login");
                return Ok(Outcome::Deny);
            }
            warn!("no secret enrolled; second factor bypassed");
            return Ok(Outcome::Admit);
        }

        let secret = self.config.decoded_secret()?;
        let matcher = Totp::new(
            &secret,
            self.config.digits,
            self.config.period,
            self.config.algorithm,
        )?;

        let deadline = Instant::now() + Duration::from_secs(self.config.timeout);

        loop {
            print!("{PROMPT}");
            let _ = io::stdout().flush();

            let line = match prompt.read_line(deadline) {
                PromptEvent::Line(line) => line,
                PromptEvent::Expired => {
                    debug!("time budget exhausted while waiting for input");
                    return Ok(Outcome::Deny);
                }
                PromptEvent::Closed => {
                    debug!("input stream closed");
                    return Ok(Outcome::Deny);
                }
            };

            let candidate = line.trim();
            if matcher.check(
                candidate,
                self.config.drift_backward,
                self.config.drift_forward,
            )? {
                debug!("code accepted");
                return Ok(Outcome::Admit);
            }

            // Fixed deterrent pause, capped at the remaining budget.
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Outcome::Deny);
            }
            thread::sleep(Duration::from_secs(self.config.delay).min(remaining));
            if Instant::now() >= deadline {
                return Ok(Outcome::Deny);
            }

            println!("{RETRY_NOTICE}");
        }
    }
}
