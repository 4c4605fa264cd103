//! Per-session queue and playback state machine.
//!
//! ```text
//! Idle --enqueue--> Playing <--pause/resume--> Paused
//! Playing|Paused --finish/skip--> Playing (next) | Idle (queue empty)
//! any --stop--> Idle
//! ```
//!
//! `PlaybackQueue` is plain data; callers hold the session lock around every
//! call, which is what serialises transitions.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use thiserror::Error;
use uuid::Uuid;

use super::state::{PlaybackRequest, PlaybackState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("the queue is full ({limit} tracks)")]
    Full { limit: usize },

    #[error("nothing is playing")]
    NothingPlaying,

    #[error("playback is already paused")]
    AlreadyPaused,

    #[error("playback is not paused")]
    NotPaused,

    #[error("there is no track at position {position} (queue has {len})")]
    InvalidPosition { position: usize, len: usize },

    /// The session is shutting down and accepts no more requests.
    #[error("the player for this channel is shutting down")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The queue was idle; the request is now current.
    Started,
    /// Waiting behind others, 1-based.
    Queued { position: usize },
}

#[derive(Debug)]
pub struct PlaybackQueue {
    pending: VecDeque<PlaybackRequest>,
    current: Option<PlaybackRequest>,
    state: PlaybackState,
    max_length: usize,
}

impl PlaybackQueue {
    /// `max_length` bounds pending requests; 0 means unbounded.
    pub fn new(max_length: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            current: None,
            state: PlaybackState::Idle,
            max_length,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current(&self) -> Option<&PlaybackRequest> {
        self.current.as_ref()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PlaybackRequest> {
        self.pending.iter()
    }

    /// Number of pending requests, excluding the current one.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_idle(&self) -> bool {
        self.state == PlaybackState::Idle
    }

    pub fn enqueue(&mut self, request: PlaybackRequest) -> Result<EnqueueOutcome, QueueError> {
        if self.current.is_none() {
            self.current = Some(request);
            self.state = PlaybackState::Playing;
            return Ok(EnqueueOutcome::Started);
        }

        if self.max_length > 0 && self.pending.len() >= self.max_length {
            return Err(QueueError::Full {
                limit: self.max_length,
            });
        }

        self.pending.push_back(request);
        Ok(EnqueueOutcome::Queued {
            position: self.pending.len(),
        })
    }

    /// Promotes the next pending request, or goes idle.
    fn advance(&mut self) {
        self.current = self.pending.pop_front();
        self.state = if self.current.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Idle
        };
    }

    /// Discards the current request and advances.
    pub fn skip(&mut self) -> Result<PlaybackRequest, QueueError> {
        let skipped = self.current.take().ok_or(QueueError::NothingPlaying)?;
        self.advance();
        Ok(skipped)
    }

    /// Completes `id` if it is still current.
    ///
    /// Returns `None` for a completion that lost a race with skip or stop, in
    /// which case nothing changes.
    pub fn finish(&mut self, id: Uuid) -> Option<PlaybackRequest> {
        if self.current.as_ref().map(|c| c.id) != Some(id) {
            return None;
        }
        let finished = self.current.take();
        self.advance();
        finished
    }

    pub fn pause(&mut self) -> Result<(), QueueError> {
        match self.state {
            PlaybackState::Idle => Err(QueueError::NothingPlaying),
            PlaybackState::Paused => Err(QueueError::AlreadyPaused),
            PlaybackState::Playing => {
                self.state = PlaybackState::Paused;
                Ok(())
            }
        }
    }

    pub fn resume(&mut self) -> Result<(), QueueError> {
        match self.state {
            PlaybackState::Idle => Err(QueueError::NothingPlaying),
            PlaybackState::Playing => Err(QueueError::NotPaused),
            PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                Ok(())
            }
        }
    }

    /// Clears everything and goes idle. Returns the current request, if any,
    /// and the discarded pending ones.
    pub fn stop(&mut self) -> (Option<PlaybackRequest>, Vec<PlaybackRequest>) {
        let current = self.current.take();
        let discarded = self.pending.drain(..).collect();
        self.state = PlaybackState::Idle;
        (current, discarded)
    }

    /// Removes the pending request at 1-based `position`.
    pub fn remove(&mut self, position: usize) -> Result<PlaybackRequest, QueueError> {
        let len = self.pending.len();
        position
            .checked_sub(1)
            .and_then(|index| self.pending.remove(index))
            .ok_or(QueueError::InvalidPosition { position, len })
    }

    /// Randomly reorders pending requests. Returns how many were shuffled.
    pub fn shuffle(&mut self) -> usize {
        let slice = self.pending.make_contiguous();
        slice.shuffle(&mut rand::thread_rng());
        slice.len()
    }
}
