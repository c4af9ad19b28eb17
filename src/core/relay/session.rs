//! One relayed call.
//!
//! A [`RelaySession`] owns the write halves of both connections and the
//! shared [`SessionState`]. [`RelaySession::run`] drives two pumps until
//! either leg ends:
//!
//! - telephony frames → `input_audio_buffer.append` on the AI endpoint
//! - AI endpoint events → `media` + `mark` on telephony, with barge-in
//!
//! State is mutated under a short synchronous lock; the resulting commands
//! are sent only after the lock is released.

use std::pin::pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use super::RelayConfig;
use super::codec::{self, AudioFrame, Direction};
use super::interruption::{self, Interruption};
use super::marks::{MarkPush, MarkTracker, RESPONSE_PART_MARK};
use super::telephony::{TelephonyIncoming, TelephonyOutgoing, TelephonySender};
use crate::core::realtime::openai::TELEPHONY_SAMPLE_RATE;
use crate::core::realtime::{ClientEvent, LOGGED_EVENT_TYPES, RealtimeSender, ServerEvent};
use crate::errors::{RelayError, RelayResult};

// =============================================================================
// State
// =============================================================================

/// Per-call timing and playback state.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Telephony correlation id from `start`
    pub stream_sid: Option<String>,
    /// Assistant item currently being played
    pub last_assistant_item: Option<String>,
    /// Timestamp of the most recent inbound `media` frame, in ms
    pub latest_media_timestamp: u64,
    /// Telephony clock when the current reply started playing; `None` when
    /// no reply is in flight
    pub response_start_timestamp: Option<u64>,
    pub marks: MarkTracker,
}

/// Messages to send to telephony for one assistant audio chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    pub media: TelephonyOutgoing,
    pub mark: Option<TelephonyOutgoing>,
    /// Oldest mark dropped to make room for this one
    pub evicted: Option<String>,
}

impl SessionState {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            stream_sid: None,
            last_assistant_item: None,
            latest_media_timestamp: 0,
            response_start_timestamp: None,
            marks: MarkTracker::with_capacity(config.max_pending_marks, config.mark_overflow_policy),
        }
    }

    pub fn on_start(&mut self, stream_sid: String) {
        self.stream_sid = Some(stream_sid);
        self.response_start_timestamp = None;
        self.latest_media_timestamp = 0;
        self.last_assistant_item = None;
    }

    pub fn on_media(&mut self, timestamp_ms: u64) {
        self.latest_media_timestamp = timestamp_ms;
    }

    /// Telephony acknowledged playback of the oldest mark.
    pub fn on_mark(&mut self) -> Option<String> {
        self.marks.acknowledge()
    }

    /// Account for one assistant audio chunk.
    ///
    /// Returns `None` when no stream has started yet; the chunk has nowhere to
    /// go and no state changes.
    pub fn on_audio_delta(&mut self, payload: String, item_id: Option<String>) -> Option<Playback> {
        let stream_sid = self.stream_sid.clone()?;

        if self.response_start_timestamp.is_none() {
            self.response_start_timestamp = Some(self.latest_media_timestamp);
            debug!(
                response_start_timestamp = self.latest_media_timestamp,
                "Setting start timestamp for new response"
            );
        }
        if item_id.is_some() {
            self.last_assistant_item = item_id;
        }

        let push = self.marks.push(RESPONSE_PART_MARK);
        let mark = push
            .should_send()
            .then(|| TelephonyOutgoing::mark(stream_sid.clone(), RESPONSE_PART_MARK));
        let evicted = match push {
            MarkPush::Evicted(oldest) => Some(oldest),
            MarkPush::Queued | MarkPush::Skipped => None,
        };

        Some(Playback {
            media: TelephonyOutgoing::media(stream_sid, payload),
            mark,
            evicted,
        })
    }
}

// =============================================================================
// Session
// =============================================================================

/// Which leg ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Telephony,
    Realtime,
}

/// Relay between one telephony stream and one AI endpoint connection.
pub struct RelaySession {
    state: Arc<Mutex<SessionState>>,
    realtime: Arc<dyn RealtimeSender>,
    telephony: Arc<dyn TelephonySender>,
}

impl RelaySession {
    pub fn new(
        config: &RelayConfig,
        realtime: Arc<dyn RealtimeSender>,
        telephony: Arc<dyn TelephonySender>,
    ) -> Self {
        let state = SessionState::new(config);
        debug!(
            max_pending_marks = ?state.marks.capacity(),
            mark_overflow_policy = %state.marks.policy(),
            "Relay session created"
        );
        Self {
            state: Arc::new(Mutex::new(state)),
            realtime,
            telephony,
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Pump both legs until one of them ends, then close both.
    ///
    /// Returns the leg that ended first, or the fatal error that ended the
    /// session.
    pub async fn run<T, R>(&self, telephony_frames: T, realtime_frames: R) -> RelayResult<Leg>
    where
        T: Stream<Item = String> + Send,
        R: Stream<Item = String> + Send,
    {
        let outcome = tokio::select! {
            result = self.pump_telephony(telephony_frames) => result.map(|_| Leg::Telephony),
            result = self.pump_realtime(realtime_frames) => result.map(|_| Leg::Realtime),
        };

        self.realtime.close().await;
        self.telephony.close().await;

        match &outcome {
            Ok(leg) => info!(?leg, "Relay session ended"),
            Err(e) => warn!(error = %e, "Relay session failed"),
        }
        outcome
    }

    async fn pump_telephony<T>(&self, frames: T) -> RelayResult<()>
    where
        T: Stream<Item = String> + Send,
    {
        let mut frames = pin!(frames);
        while let Some(text) = frames.next().await {
            self.handle_telephony_frame(&text).await?;
        }
        debug!("Telephony stream ended");
        Ok(())
    }

    async fn pump_realtime<R>(&self, frames: R) -> RelayResult<()>
    where
        R: Stream<Item = String> + Send,
    {
        let mut frames = pin!(frames);
        while let Some(text) = frames.next().await {
            match self.handle_realtime_frame(&text).await {
                Ok(()) => {}
                Err(e) if !e.is_fatal() => warn!(error = %e, "Skipping realtime event"),
                Err(e) => return Err(e),
            }
        }
        debug!("Realtime stream ended");
        Ok(())
    }

    /// Process one text frame from telephony.
    pub async fn handle_telephony_frame(&self, text: &str) -> RelayResult<()> {
        match TelephonyIncoming::parse(text)? {
            TelephonyIncoming::Media { media } => {
                self.state.lock().on_media(media.timestamp);

                let frame = match AudioFrame::decode(
                    &media.payload,
                    Some(media.timestamp),
                    Direction::Inbound,
                ) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, timestamp = media.timestamp, "Dropping caller audio");
                        return Ok(());
                    }
                };

                if self.realtime.is_open() {
                    trace!(
                        timestamp_ms = ?frame.timestamp_ms,
                        duration_ms = frame.duration_ms(),
                        "Forwarding caller audio"
                    );
                    self.realtime
                        .send(ClientEvent::InputAudioBufferAppend {
                            audio: frame.encode(),
                        })
                        .await?;
                } else {
                    trace!("Realtime connection closed, dropping caller audio");
                }
            }
            TelephonyIncoming::Start { start } => {
                info!(
                    stream_sid = %start.stream_sid,
                    call_sid = ?start.call_sid,
                    "Incoming stream has started"
                );
                if let Some(rate) = start.media_format.as_ref().and_then(|f| f.sample_rate)
                    && rate != TELEPHONY_SAMPLE_RATE
                {
                    warn!(
                        sample_rate = rate,
                        expected = TELEPHONY_SAMPLE_RATE,
                        "Unexpected telephony sample rate, audio is relayed as-is"
                    );
                }
                self.state.lock().on_start(start.stream_sid);
            }
            TelephonyIncoming::Mark { mark } => {
                let acked = self.state.lock().on_mark();
                trace!(name = %mark.name, acked = ?acked, "Mark acknowledged");
            }
            TelephonyIncoming::Stop => debug!("Telephony stream stopped"),
            TelephonyIncoming::Connected | TelephonyIncoming::Dtmf | TelephonyIncoming::Other => {}
        }
        Ok(())
    }

    /// Process one text frame from the AI endpoint.
    pub async fn handle_realtime_frame(&self, text: &str) -> RelayResult<()> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| RelayError::MalformedEvent(e.to_string()))?;

        let event_type = value.get("type").and_then(|t| t.as_str()).unwrap_or_default();
        if LOGGED_EVENT_TYPES.contains(&event_type) {
            info!(event_type, payload = %value, "Received event");
        }

        let event: ServerEvent =
            serde_json::from_value(value).map_err(|e| RelayError::MalformedEvent(e.to_string()))?;

        match event {
            ServerEvent::AudioDelta { delta, item_id, .. } => {
                let payload = codec::reencode(&delta)?;
                let playback = self.state.lock().on_audio_delta(payload, item_id);
                match playback {
                    Some(playback) => self.play(playback).await?,
                    None => debug!("No stream started yet, dropping assistant audio"),
                }
            }
            ServerEvent::SpeechStarted { .. } => {
                let interruption = {
                    let mut state = self.state.lock();
                    if state.last_assistant_item.is_some() {
                        interruption::on_speech_started(&mut state)
                    } else {
                        None
                    }
                };
                if let Some(interruption) = interruption {
                    self.interrupt(interruption).await?;
                }
            }
            ServerEvent::Error { error } => {
                warn!(
                    error_type = %error.error_type,
                    code = ?error.code,
                    message = %error.message,
                    "Realtime API error"
                );
            }
            _ => {}
        }
        Ok(())
    }

    async fn play(&self, playback: Playback) -> RelayResult<()> {
        if let Some(oldest) = &playback.evicted {
            debug!(mark = %oldest, "Mark queue full, dropped oldest pending mark");
        }
        self.telephony.send(playback.media).await?;
        if let Some(mark) = playback.mark {
            self.telephony.send(mark).await?;
        }
        Ok(())
    }

    async fn interrupt(&self, interruption: Interruption) -> RelayResult<()> {
        if self.realtime.is_open() {
            self.realtime.send(interruption.truncate_event()).await?;
        }
        if let Some(clear) = interruption.clear_message() {
            self.telephony.send(clear).await?;
        }
        Ok(())
    }
}
