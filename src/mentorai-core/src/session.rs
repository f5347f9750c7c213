//! Submission state for a single feature view.
//!
//! Each view owns one [`Submission`] per action. Starting a submission clears
//! the previous result and hands out a [`Ticket`]; only the newest ticket can
//! settle, so a slow response from an earlier submission is dropped instead
//! of overwriting a newer one.

use std::future::Future;

use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::MentorError;

/// Identifies the submission a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Loading flag, latest result and latest error of one action.
#[derive(Debug)]
pub struct Submission<T> {
    generation: u64,
    loading: bool,
    result: Option<T>,
    last_error: Option<String>,
}

impl<T> Default for Submission<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            loading: false,
            result: None,
            last_error: None,
        }
    }
}

impl<T> Submission<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new submission, discarding whatever the previous one produced.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        self.loading = true;
        self.result = None;
        self.last_error = None;
        Ticket(self.generation)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    /// Record the outcome of a submission. Returns `false` when the ticket
    /// has been superseded and the outcome was dropped.
    pub fn settle(&mut self, ticket: Ticket, outcome: Result<T, MentorError>) -> bool {
        if !self.is_current(ticket) {
            debug!(
                ticket = ticket.0,
                current = self.generation,
                "Dropping stale submission result"
            );
            return false;
        }

        self.loading = false;
        match outcome {
            Ok(value) => self.result = Some(value),
            Err(e) => {
                error!(error = %e, "Submission failed");
                self.last_error = Some(e.to_string());
            }
        }
        true
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// A [`Submission`] that can be driven from several tasks at once.
#[derive(Debug, Default)]
pub struct FormSession<T> {
    state: Mutex<Submission<T>>,
}

impl<T: Clone> FormSession<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Submission::new()),
        }
    }

    /// Run `action` as the newest submission. Returns whether its outcome was
    /// kept; a submission started while this one was in flight wins.
    pub async fn submit<F>(&self, action: F) -> bool
    where
        F: Future<Output = Result<T, MentorError>>,
    {
        let ticket = self.state.lock().await.begin();
        let outcome = action.await;
        self.state.lock().await.settle(ticket, outcome)
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.is_loading()
    }

    pub async fn result(&self) -> Option<T> {
        self.state.lock().await.result().cloned()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error().map(str::to_string)
    }
}
