//! Streaming TTS over WebSocket.
//!
//! Each utterance runs under a fresh `context_id`. The client sends a voice
//! config and then the text with an end marker; the server streams base64
//! PCM/WAV frames and a final-audio marker. An utterance completes only
//! when the final marker has arrived AND every scheduled buffer has
//! finished playing; the two signals feed one joint predicate.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine as _;
use blitsum_core::{AudioOutput, BlitsumError};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::engine::SpeechSynth;
use crate::scheduler::GaplessScheduler;

const MAX_RECONNECTS: u32 = 3;
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Wire protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub voice_id: String,
    pub style: String,
    pub sample_rate: u32,
    pub format: String,
    pub channel_type: String,
    pub encode_as_base64: bool,
    pub variation: u32,
}

impl VoiceConfig {
    pub fn new(voice_id: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            voice_id: voice_id.into(),
            style: "Conversational".to_string(),
            sample_rate,
            format: "WAV".to_string(),
            channel_type: "MONO".to_string(),
            encode_as_base64: true,
            variation: 1,
        }
    }
}

#[derive(Debug, Serialize)]
struct ConfigFrame<'a> {
    voice_config: &'a VoiceConfig,
    context_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TextFrame<'a> {
    text: &'a str,
    context_id: &'a str,
    end: bool,
}

#[derive(Debug, Serialize)]
struct ClearFrame<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    context_id: &'a str,
}

/// Everything the server may put in one frame.
#[derive(Debug, Default, Deserialize)]
pub struct ServerFrame {
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default, rename = "isFinalAudio")]
    pub is_final_audio: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum TransportEvent {
    Frame(String),
    Closed,
}

/// One live connection: text frames out, events in.
pub struct TtsConnection {
    pub outgoing: mpsc::UnboundedSender<String>,
    pub incoming: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Connection factory, abstracted so the session logic is testable without
/// a network.
#[async_trait]
pub trait TtsTransport: Send + Sync {
    async fn connect(&self) -> Result<TtsConnection>;
}

/// Production transport over `tokio-tungstenite`.
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    /// Build the endpoint with the negotiation query parameters.
    pub fn new(base_url: &str, api_key: &str, model: &str, sample_rate: u32) -> Self {
        let url = format!(
            "{base_url}?api-key={api_key}&model={model}&sample_rate={sample_rate}&channel_type=MONO&format=WAV"
        );
        Self { url }
    }
}

#[async_trait]
impl TtsTransport for WsTransport {
    async fn connect(&self) -> Result<TtsConnection> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(&self.url).await?;
        info!("TTS websocket connected");
        let (mut sink, mut stream) = ws_stream.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                if sink.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if incoming_tx.send(TransportEvent::Frame(text)).is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            let _ = incoming_tx.send(TransportEvent::Closed);
        });

        Ok(TtsConnection { outgoing, incoming })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

struct PendingSpeak {
    context_id: String,
    has_received_final: bool,
    resolve: Option<oneshot::Sender<Result<(), BlitsumError>>>,
}

impl PendingSpeak {
    fn reject(&mut self, error: BlitsumError) {
        if let Some(resolve) = self.resolve.take() {
            let _ = resolve.send(Err(error));
        }
    }
}

struct Inner {
    conn: Option<mpsc::UnboundedSender<String>>,
    scheduler: GaplessScheduler,
    pending: Option<PendingSpeak>,
    context_counter: u64,
}

impl Inner {
    /// The joint completion predicate: server said final AND nothing is
    /// still playing.
    fn maybe_complete(&mut self) {
        let done = match &self.pending {
            Some(pending) => {
                pending.has_received_final && self.scheduler.active_count() == 0
            }
            None => false,
        };
        if done {
            if let Some(mut pending) = self.pending.take() {
                debug!(context = %pending.context_id, "utterance complete");
                if let Some(resolve) = pending.resolve.take() {
                    let _ = resolve.send(Ok(()));
                }
            }
        }
    }

    fn send_frame(&self, frame: &str) {
        if let Some(conn) = &self.conn {
            let _ = conn.send(frame.to_string());
        }
    }
}

pub struct RemoteTts {
    transport: Arc<dyn TtsTransport>,
    voice: VoiceConfig,
    inner: Arc<Mutex<Inner>>,
}

impl RemoteTts {
    pub fn new(
        transport: Arc<dyn TtsTransport>,
        voice: VoiceConfig,
        output: Arc<dyn AudioOutput>,
    ) -> Arc<Self> {
        let (scheduler, mut drained_rx) = GaplessScheduler::new(output, voice.sample_rate);
        let inner = Arc::new(Mutex::new(Inner {
            conn: None,
            scheduler,
            pending: None,
            context_counter: 0,
        }));

        // Re-check the joint predicate whenever playback drains.
        let drained_inner = inner.clone();
        tokio::spawn(async move {
            while drained_rx.recv().await.is_some() {
                drained_inner.lock().unwrap().maybe_complete();
            }
        });

        Arc::new(Self { transport, voice, inner })
    }

    fn handle_frame(inner: &Mutex<Inner>, raw: &str) {
        let frame: ServerFrame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "unparseable TTS frame");
                return;
            }
        };
        let mut inner = inner.lock().unwrap();

        if let Some(audio) = frame.audio {
            match base64::engine::general_purpose::STANDARD.decode(audio.as_bytes()) {
                Ok(bytes) => inner.scheduler.push_chunk(&bytes),
                Err(err) => warn!(%err, "bad base64 audio chunk"),
            }
        }
        if frame.is_final_audio == Some(true) {
            if let Some(pending) = inner.pending.as_mut() {
                pending.has_received_final = true;
            }
            inner.maybe_complete();
        }
        if let Some(error) = frame.error {
            warn!(%error, "TTS server error");
            if let Some(pending) = inner.pending.as_mut() {
                pending.reject(BlitsumError::TtsProtocol(error));
            }
            inner.pending = None;
        }
    }

    /// Drive one connection's events, reconnecting on close with bounded
    /// retries.
    async fn run_connection(
        transport: Arc<dyn TtsTransport>,
        inner: Arc<Mutex<Inner>>,
        mut incoming: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        loop {
            loop {
                match incoming.recv().await {
                    Some(TransportEvent::Frame(frame)) => Self::handle_frame(&inner, &frame),
                    Some(TransportEvent::Closed) | None => break,
                }
            }

            warn!("TTS websocket disconnected, reconnecting");
            let mut reconnected = None;
            for attempt in 1..=MAX_RECONNECTS {
                tokio::time::sleep(RECONNECT_DELAY).await;
                match transport.connect().await {
                    Ok(conn) => {
                        info!(attempt, "TTS reconnected");
                        reconnected = Some(conn);
                        break;
                    }
                    Err(err) => warn!(attempt, %err, "TTS reconnect failed"),
                }
            }

            match reconnected {
                Some(conn) => {
                    let mut guard = inner.lock().unwrap();
                    guard.conn = Some(conn.outgoing);
                    incoming = conn.incoming;
                }
                None => {
                    let mut guard = inner.lock().unwrap();
                    guard.conn = None;
                    if let Some(pending) = guard.pending.as_mut() {
                        pending.reject(BlitsumError::Disconnected);
                    }
                    guard.pending = None;
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl SpeechSynth for RemoteTts {
    async fn connect(&self) -> Result<(), BlitsumError> {
        let conn = self
            .transport
            .connect()
            .await
            .map_err(|_| BlitsumError::Disconnected)?;
        {
            let mut inner = self.inner.lock().unwrap();
            inner.conn = Some(conn.outgoing);
        }
        tokio::spawn(Self::run_connection(
            self.transport.clone(),
            self.inner.clone(),
            conn.incoming,
        ));
        Ok(())
    }

    async fn speak(&self, text: &str) -> Result<(), BlitsumError> {
        let receiver = {
            let mut inner = self.inner.lock().unwrap();
            if inner.conn.is_none() {
                return Err(BlitsumError::Disconnected);
            }

            // A new utterance strictly serializes: cancel the previous one,
            // flush its audio, and end its context on the wire.
            if let Some(mut prior) = inner.pending.take() {
                prior.reject(BlitsumError::Interrupted);
                let cancel = serde_json::to_string(&TextFrame {
                    text: "",
                    context_id: &prior.context_id,
                    end: true,
                })
                .unwrap_or_default();
                inner.send_frame(&cancel);
                inner.scheduler.flush();
            }

            inner.context_counter += 1;
            let context_id = format!("ctx-{}", inner.context_counter);
            inner.scheduler.begin_stream();

            let config = serde_json::to_string(&ConfigFrame {
                voice_config: &self.voice,
                context_id: &context_id,
            })
            .map_err(|e| BlitsumError::TtsProtocol(e.to_string()))?;
            let payload = serde_json::to_string(&TextFrame {
                text,
                context_id: &context_id,
                end: true,
            })
            .map_err(|e| BlitsumError::TtsProtocol(e.to_string()))?;
            inner.send_frame(&config);
            inner.send_frame(&payload);

            let (resolve, receiver) = oneshot::channel();
            inner.pending = Some(PendingSpeak {
                context_id,
                has_received_final: false,
                resolve: Some(resolve),
            });
            receiver
        };

        match receiver.await {
            Ok(result) => result,
            Err(_) => Err(BlitsumError::Disconnected),
        }
    }

    async fn interrupt(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(mut pending) = inner.pending.take() {
            pending.reject(BlitsumError::Interrupted);
            let clear = serde_json::to_string(&ClearFrame {
                kind: "clear",
                context_id: &pending.context_id,
            })
            .unwrap_or_default();
            inner.send_frame(&clear);
        }
        inner.scheduler.flush();
    }

    async fn disconnect(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(mut pending) = inner.pending.take() {
            pending.reject(BlitsumError::Disconnected);
        }
        inner.scheduler.flush();
        inner.conn = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NullAudio;
    use std::sync::Mutex as StdMutex;

    /// A transport the test scripts by hand.
    struct ScriptedTransport {
        server_tx: StdMutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
        client_rx: StdMutex<Option<mpsc::UnboundedReceiver<String>>>,
        fail_connects: StdMutex<u32>,
    }

    impl ScriptedTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                server_tx: StdMutex::new(None),
                client_rx: StdMutex::new(None),
                fail_connects: StdMutex::new(0),
            })
        }

        fn send_frame(&self, json: &str) {
            let guard = self.server_tx.lock().unwrap();
            let tx = guard.as_ref().expect("not connected");
            tx.send(TransportEvent::Frame(json.to_string())).unwrap();
        }

        fn sent_frames(&self) -> Vec<String> {
            let mut frames = Vec::new();
            if let Some(rx) = self.client_rx.lock().unwrap().as_mut() {
                while let Ok(frame) = rx.try_recv() {
                    frames.push(frame);
                }
            }
            frames
        }
    }

    #[async_trait]
    impl TtsTransport for ScriptedTransport {
        async fn connect(&self) -> Result<TtsConnection> {
            {
                let mut fails = self.fail_connects.lock().unwrap();
                if *fails > 0 {
                    *fails -= 1;
                    anyhow::bail!("connection refused");
                }
            }
            let (outgoing, client_rx) = mpsc::unbounded_channel();
            let (server_tx, incoming) = mpsc::unbounded_channel();
            *self.server_tx.lock().unwrap() = Some(server_tx);
            *self.client_rx.lock().unwrap() = Some(client_rx);
            Ok(TtsConnection { outgoing, incoming })
        }
    }

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn remote(output: Arc<NullAudio>) -> (Arc<RemoteTts>, Arc<ScriptedTransport>) {
        let transport = ScriptedTransport::new();
        let tts = RemoteTts::new(
            transport.clone(),
            VoiceConfig::new("nova", 44_100),
            output,
        );
        (tts, transport)
    }

    #[tokio::test]
    async fn speak_resolves_only_on_joint_predicate() {
        let output = Arc::new(NullAudio::new());
        let (tts, transport) = remote(output.clone());
        tts.connect().await.unwrap();

        let speak = tokio::spawn({
            let tts = tts.clone();
            async move { tts.speak("hello there").await }
        });
        tokio::task::yield_now().await;

        transport.send_frame(&format!("{{\"audio\": \"{}\"}}", b64(&[0u8; 200])));
        transport.send_frame("{\"isFinalAudio\": true}");
        tokio::task::yield_now().await;

        // Final marker alone is not enough; a source is still playing.
        assert!(!speak.is_finished());

        output.finish_all();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let result = speak.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn new_speak_rejects_the_prior_one() {
        let output = Arc::new(NullAudio::new());
        let (tts, transport) = remote(output.clone());
        tts.connect().await.unwrap();

        let first = tokio::spawn({
            let tts = tts.clone();
            async move { tts.speak("first").await }
        });
        tokio::task::yield_now().await;

        let second = tokio::spawn({
            let tts = tts.clone();
            async move { tts.speak("second").await }
        });
        tokio::task::yield_now().await;

        let first_result = first.await.unwrap();
        assert!(matches!(first_result, Err(BlitsumError::Interrupted)));
        assert_eq!(first_result.unwrap_err().to_string(), "Interrupted by new speech");

        // Finish the second normally.
        transport.send_frame("{\"isFinalAudio\": true}");
        tokio::task::yield_now().await;
        assert!(second.await.unwrap().is_ok());

        // The wire saw: config+text for ctx-1, cancel for ctx-1, config+text
        // for ctx-2.
        let frames = transport.sent_frames();
        assert!(frames.iter().any(|f| f.contains("\"ctx-1\"") && f.contains("\"end\":true")));
        assert!(frames.iter().any(|f| f.contains("\"ctx-2\"")));
    }

    #[tokio::test]
    async fn interrupt_is_idempotent_and_flushes() {
        let output = Arc::new(NullAudio::new());
        let (tts, transport) = remote(output.clone());
        tts.connect().await.unwrap();

        let speak = tokio::spawn({
            let tts = tts.clone();
            async move { tts.speak("long sentence").await }
        });
        tokio::task::yield_now().await;
        transport.send_frame(&format!("{{\"audio\": \"{}\"}}", b64(&[0u8; 400])));
        tokio::task::yield_now().await;

        tts.interrupt().await;
        tts.interrupt().await;

        let result = speak.await.unwrap();
        assert!(matches!(result, Err(BlitsumError::Interrupted)));
        assert!(output.stopped_count() >= 1);

        // A clear frame went out for the interrupted context.
        let frames = transport.sent_frames();
        assert!(frames.iter().any(|f| f.contains("\"clear\"")));
    }

    #[tokio::test]
    async fn server_error_rejects_with_protocol_error() {
        let output = Arc::new(NullAudio::new());
        let (tts, transport) = remote(output);
        tts.connect().await.unwrap();

        let speak = tokio::spawn({
            let tts = tts.clone();
            async move { tts.speak("hello").await }
        });
        tokio::task::yield_now().await;
        transport.send_frame("{\"error\": \"voice not found\"}");

        let result = speak.await.unwrap();
        match result {
            Err(BlitsumError::TtsProtocol(message)) => assert_eq!(message, "voice not found"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_disconnect_rejects_pending() {
        let output = Arc::new(NullAudio::new());
        let (tts, transport) = remote(output);
        tts.connect().await.unwrap();
        // Every reconnect attempt will fail.
        *transport.fail_connects.lock().unwrap() = MAX_RECONNECTS;

        let speak = tokio::spawn({
            let tts = tts.clone();
            async move { tts.speak("hello").await }
        });
        tokio::task::yield_now().await;

        transport
            .server_tx
            .lock()
            .unwrap()
            .as_ref()
            .unwrap()
            .send(TransportEvent::Closed)
            .unwrap();

        // Paused clock: advancing past the three 2 s backoffs drains them.
        for _ in 0..4 {
            tokio::time::advance(RECONNECT_DELAY).await;
            tokio::task::yield_now().await;
        }

        let result = speak.await.unwrap();
        assert!(matches!(result, Err(BlitsumError::Disconnected)));
        assert_eq!(result.unwrap_err().to_string(), "Disconnected");
    }

    #[tokio::test]
    async fn first_chunk_header_is_stripped_by_magic() {
        let output = Arc::new(NullAudio::new());
        let (tts, transport) = remote(output.clone());
        tts.connect().await.unwrap();

        let _speak = tokio::spawn({
            let tts = tts.clone();
            async move { tts.speak("hi").await }
        });
        tokio::task::yield_now().await;

        let mut first = vec![0u8; crate::audio::WAV_HEADER_LEN];
        first[..4].copy_from_slice(b"RIFF");
        first[8..12].copy_from_slice(b"WAVE");
        first.extend_from_slice(&[0u8; 100]);
        transport.send_frame(&format!("{{\"audio\": \"{}\"}}", b64(&first)));
        transport.send_frame(&format!("{{\"audio\": \"{}\"}}", b64(&[0u8; 100])));
        tokio::task::yield_now().await;

        assert_eq!(output.scheduled_sample_counts(), vec![50, 50]);
    }
}
