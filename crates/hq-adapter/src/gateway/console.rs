//! Console channel gateway
//!
//! Stands in for the chat platform: channels live in memory, messages are
//! printed to the terminal as `#category/name text`. Categories appear on
//! first use, like the platform adapter creates them on demand.
//! Long messages go out in [`MAX_MESSAGE_LENGTH`] chunks.
//!
//! A read-only channel is closed to players only. HQ keeps posting to it.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use console::{style, Term};
use hq_usecase::ports::{ChannelGateway, ChannelRef};
use hq_usecase::GatewayError;
use tracing::{debug, info};

/// Platform limit for one message, in characters
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Break `message` into pieces of at most [`MAX_MESSAGE_LENGTH`] characters.
///
/// A piece ends just after the last newline of its window if that keeps it
/// at least half full, else after the last space, else at the window edge.
/// Concatenating the pieces gives back `message`.
pub fn split_message(message: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = message;
    loop {
        let Some((window_end, _)) = rest.char_indices().nth(MAX_MESSAGE_LENGTH) else {
            pieces.push(rest.to_string());
            return pieces;
        };
        let cut = break_after(&rest[..window_end]).unwrap_or(window_end);
        let (piece, tail) = rest.split_at(cut);
        pieces.push(piece.to_string());
        rest = tail;
    }
}

/// Byte offset just past the preferred break in `window`
fn break_after(window: &str) -> Option<usize> {
    window
        .rfind('\n')
        .filter(|&pos| window[..pos].chars().count() >= MAX_MESSAGE_LENGTH / 2)
        .or_else(|| window.rfind(' '))
        .map(|pos| pos + 1)
}

#[derive(Debug, Default)]
struct ChannelState {
    read_only: bool,
    history: Vec<String>,
}

pub struct ConsoleChannelGateway {
    term: Term,
    channels: Mutex<HashMap<ChannelRef, ChannelState>>,
}

impl Default for ConsoleChannelGateway {
    fn default() -> Self {
        Self::new(Term::stdout())
    }
}

impl ConsoleChannelGateway {
    pub fn new(term: Term) -> Self {
        Self {
            term,
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ChannelRef, ChannelState>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every channel, sorted, with its read-only flag
    pub fn channels(&self) -> Vec<(ChannelRef, bool)> {
        let mut list: Vec<_> = self
            .lock()
            .iter()
            .map(|(channel, state)| (channel.clone(), state.read_only))
            .collect();
        list.sort_by_key(|(channel, _)| channel.to_string());
        list
    }

    /// Chunks delivered to `channel`, oldest first
    pub fn history(&self, channel: &ChannelRef) -> Vec<String> {
        self.lock()
            .get(channel)
            .map(|state| state.history.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, channel: &ChannelRef) -> bool {
        self.lock().contains_key(channel)
    }

    pub fn is_read_only(&self, channel: &ChannelRef) -> bool {
        self.lock().get(channel).is_some_and(|state| state.read_only)
    }
}

#[async_trait]
impl ChannelGateway for ConsoleChannelGateway {
    async fn send_message(&self, channel: &ChannelRef, text: &str) -> Result<(), GatewayError> {
        let failed = |message: &str| GatewayError::SendFailed {
            channel: channel.to_string(),
            message: message.to_string(),
        };

        let chunks = split_message(text);
        {
            let mut channels = self.lock();
            let state = channels.get_mut(channel).ok_or_else(|| failed("unknown channel"))?;
            state.history.extend(chunks.iter().cloned());
        }

        let tag = style(format!("#{}", channel)).cyan().bold();
        for chunk in &chunks {
            self.term
                .write_line(&format!("{} {}", tag, chunk))
                .map_err(|e| failed(&e.to_string()))?;
        }
        debug!(channel = %channel, chunks = chunks.len(), "Message delivered");
        Ok(())
    }

    async fn ensure_channel(
        &self,
        category: &str,
        name: &str,
    ) -> Result<ChannelRef, GatewayError> {
        if category.trim().is_empty() {
            return Err(GatewayError::MissingCategory {
                category: category.to_string(),
            });
        }

        let channel = ChannelRef::new(category.to_lowercase(), name.to_lowercase());
        let mut channels = self.lock();
        if !channels.contains_key(&channel) {
            info!(channel = %channel, "Channel created");
            channels.insert(channel.clone(), ChannelState::default());
        }
        Ok(channel)
    }

    async fn find_channel(
        &self,
        category: &str,
        name: &str,
    ) -> Result<Option<ChannelRef>, GatewayError> {
        let channel = ChannelRef::new(category.to_lowercase(), name.to_lowercase());
        Ok(self.lock().contains_key(&channel).then_some(channel))
    }

    async fn set_read_only(&self, channel: &ChannelRef) -> Result<(), GatewayError> {
        let mut channels = self.lock();
        match channels.get_mut(channel) {
            Some(state) => {
                state.read_only = true;
                info!(channel = %channel, "Channel locked");
                Ok(())
            }
            None => Err(GatewayError::SendFailed {
                channel: channel.to_string(),
                message: "unknown channel".to_string(),
            }),
        }
    }
}
