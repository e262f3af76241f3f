//! Runtime assembly: one struct owning every subsystem, plus the
//! conversation loop that routes user turns through navigation or the LLM.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use blitsum_actions::{ActionExecutor, NavigationAgent};
use blitsum_config::{validate, SdkConfig};
use blitsum_context::{content_hash, ContentCache, Extractor};
use blitsum_core::{
    ActionKind, AudioOutput, BlitsumError, ChatMessage, ConversationHistory, ConversationStage,
    KeyValueStore, LlmProvider, LlmRequest, PageContext, PageDriver, PageEvent, Role,
    RuntimeEvent, RuntimeEventKind, SdkBus, SpeechRecognizer,
};
use blitsum_engagement::{rules, BehaviorTracker, EngagementEngine};
use blitsum_intent::IntentParser;
use blitsum_prompt::{dispatch, parse_reply, ChatCompletionProvider, PromptBuilder};
use blitsum_sales::{bant::BantScore, closing, ConversationFlow, ProfileBuilder};
use blitsum_ui::{Shell, StatePatch, Store, UiConfig};
use blitsum_voice::{
    LocalSynth, RemoteTts, SpeechSynth, VoiceConfig, VoiceSession, WsTransport,
    DEFAULT_SILENCE_THRESHOLD,
};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

const VISITED_KEY: &str = "blitsum_visited";

const RETRY_MESSAGE: &str = "Sorry, something went wrong on my end. Mind trying that again?";

/// The host-provided seams: page, audio, microphone, storage.
pub struct HostBindings {
    pub driver: Arc<dyn PageDriver>,
    pub audio: Arc<dyn AudioOutput>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub storage: Arc<dyn KeyValueStore>,
}

pub struct SalesRuntime {
    config: SdkConfig,
    driver: Arc<dyn PageDriver>,
    cache: Arc<ContentCache>,
    extractor: Extractor,
    executor: Arc<ActionExecutor>,
    navigator: NavigationAgent,
    tracker: Arc<BehaviorTracker>,
    flow: Mutex<ConversationFlow>,
    history: Mutex<ConversationHistory>,
    llm: Arc<dyn LlmProvider>,
    voice: Arc<VoiceSession>,
    store: Arc<Store>,
    shell: Arc<Shell>,
    first_visit: AtomicBool,
    session_id: Uuid,
    page_tx: mpsc::Sender<PageEvent>,
    event_tx: mpsc::Sender<RuntimeEvent>,
}

impl SalesRuntime {
    /// Production wiring: chat-completion LLM plus the streaming TTS with
    /// local fallback when the socket cannot open.
    pub async fn start(config: SdkConfig, bindings: HostBindings) -> Result<Arc<Self>> {
        let llm: Arc<dyn LlmProvider> = Arc::new(
            ChatCompletionProvider::new(config.llm_api_key.clone())
                .with_base_url(config.llm_base_url.clone()),
        );

        let transport = Arc::new(WsTransport::new(
            &config.tts_url,
            &config.tts_api_key,
            &config.tts_model,
            config.sample_rate,
        ));
        let voice_id = config.tts_voice_id.clone().unwrap_or_else(|| "aria".to_string());
        let remote = RemoteTts::new(
            transport,
            VoiceConfig::new(voice_id, config.sample_rate),
            bindings.audio.clone(),
        );
        let synth: Arc<dyn SpeechSynth> = match remote.connect().await {
            Ok(()) => remote,
            Err(err) => {
                // The endpoint URL carries the key; scrub before logging.
                let detail = blitsum_logging::redact(&err.to_string(), &[&config.tts_api_key]);
                warn!(error = %detail, "remote TTS unavailable, using local synthesis");
                Arc::new(LocalSynth::new())
            }
        };

        Self::start_with(config, bindings, llm, synth).await
    }

    /// Full wiring with injectable LLM and synthesis backends.
    pub async fn start_with(
        config: SdkConfig,
        bindings: HostBindings,
        llm: Arc<dyn LlmProvider>,
        synth: Arc<dyn SpeechSynth>,
    ) -> Result<Arc<Self>> {
        validate(&config)?;
        blitsum_logging::init_console_logger(&config.log_level);

        let mut bus = SdkBus::new();
        let session_id = Uuid::new_v4();

        let cache = Arc::new(ContentCache::new());
        let executor = Arc::new(ActionExecutor::new(bindings.driver.clone()));
        let navigator =
            NavigationAgent::new(executor.clone(), Arc::new(PageContext::default()));
        let tracker = Arc::new(BehaviorTracker::new(bindings.driver.clone()));
        tracker.init().await;

        let silence = config
            .silence_threshold_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SILENCE_THRESHOLD);
        let voice = VoiceSession::new(synth, bindings.recognizer.clone(), silence);

        let store = Arc::new(Store::new(UiConfig::default()));
        let (shell, submissions) = Shell::new(store.clone());

        // Cache watcher gets its own mutation feed.
        let (cache_tx, cache_rx) = mpsc::channel(64);
        tokio::spawn(cache.clone().watch(cache_rx));

        // Fan page events out to the tracker and the cache watcher.
        let page_rx = bus.take_page_rx().expect("fresh bus");
        let fan_tracker = tracker.clone();
        tokio::spawn(async move {
            let mut page_rx = page_rx;
            while let Some(event) = page_rx.recv().await {
                if matches!(event, PageEvent::Mutation { .. }) {
                    let _ = cache_tx.send(event.clone()).await;
                }
                fan_tracker.observe(event).await;
            }
        });

        // Engagement engine: behavior snapshots in, proactive messages out.
        let engine = Arc::new(EngagementEngine::new(rules::default_rules()));
        let behavior_rx = tracker.subscribe();
        let proactive_tx = bus.proactive_tx.clone();
        tokio::spawn(async move {
            engine.run(behavior_rx, proactive_tx).await;
        });

        // Proactive messages surface as assistant bubbles.
        let mut proactive_rx = bus.take_proactive_rx().expect("fresh bus");
        let proactive_shell = shell.clone();
        let proactive_store = store.clone();
        tokio::spawn(async move {
            while let Some(message) = proactive_rx.recv().await {
                info!(rule = %message.rule_id, "proactive message");
                proactive_shell.push_assistant(message.message);
                proactive_store.set_state(StatePatch::open(true));
            }
        });

        // The runtime event log: every notable transition lands in tracing.
        let mut event_rx = bus.take_event_rx().expect("fresh bus");
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                debug!(kind = %event.kind, payload = %event.payload, "runtime event");
            }
        });

        let first_visit = bindings.storage.get(VISITED_KEY).await?.is_none();
        if first_visit {
            bindings.storage.set(VISITED_KEY, "true").await?;
        }

        let history_max = config.history_max.unwrap_or(ConversationHistory::DEFAULT_MAX);
        let runtime = Arc::new(Self {
            config,
            driver: bindings.driver,
            cache,
            extractor: Extractor::new(),
            executor,
            navigator,
            tracker,
            flow: Mutex::new(ConversationFlow::new()),
            history: Mutex::new(ConversationHistory::new(history_max)),
            llm,
            voice,
            store,
            shell,
            first_visit: AtomicBool::new(first_visit),
            session_id,
            page_tx: bus.page_tx.clone(),
            event_tx: bus.event_tx.clone(),
        });
        runtime
            .record(RuntimeEventKind::SessionStarted, serde_json::json!({ "firstVisit": first_visit }))
            .await;

        // Typed submissions from the shell flow through the same path as
        // programmatic messages.
        let loop_runtime = runtime.clone();
        tokio::spawn(async move {
            let mut submissions = submissions;
            while let Some(text) = submissions.recv().await {
                let reply = loop_runtime.handle_user_message(&text).await;
                loop_runtime.shell.push_assistant(reply);
            }
        });

        info!(session = %session_id, "runtime started");
        Ok(runtime)
    }

    pub fn shell(&self) -> Arc<Shell> {
        self.shell.clone()
    }

    pub fn store(&self) -> Arc<Store> {
        self.store.clone()
    }

    pub fn tracker(&self) -> Arc<BehaviorTracker> {
        self.tracker.clone()
    }

    pub fn executor(&self) -> Arc<ActionExecutor> {
        self.executor.clone()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Sender the host binding uses to push page events in.
    pub fn page_events(&self) -> mpsc::Sender<PageEvent> {
        self.page_tx.clone()
    }

    pub fn is_first_visit(&self) -> bool {
        self.first_visit.load(Ordering::Relaxed)
    }

    async fn record(&self, kind: RuntimeEventKind, payload: serde_json::Value) {
        let _ = self
            .event_tx
            .send(RuntimeEvent::new(self.session_id, kind, payload))
            .await;
    }

    pub fn greeting(&self) -> String {
        if self.is_first_visit() {
            self.store.get_state().config.greeting
        } else {
            "Welcome back! Want to pick up where you left off?".to_string()
        }
    }

    /// The current page context: cached when the page hasn't changed,
    /// freshly extracted otherwise.
    pub async fn context(&self) -> Arc<PageContext> {
        let snapshot = match self.driver.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%err, "page snapshot failed, using empty context");
                return Arc::new(PageContext::default());
            }
        };
        let hash = content_hash(&snapshot.html);
        if let Some(ctx) = self.cache.get(&snapshot.url, Some(hash)) {
            debug!("context served from cache");
            return ctx;
        }
        let ctx = self.extractor.extract(&snapshot);
        self.cache.set(&snapshot.url, Some(hash), ctx)
    }

    /// One full user turn: navigation intents run the action path, the rest
    /// run the conversational path through the LLM.
    pub async fn handle_user_message(self: &Arc<Self>, text: &str) -> String {
        self.tracker.note_message_sent().await;

        let ctx = self.context().await;
        self.navigator.update_context(ctx.clone()).await;

        let intent = IntentParser::parse(text, &ctx);
        self.record(
            RuntimeEventKind::IntentParsed,
            serde_json::json!({ "intent": intent.intent, "confidence": intent.confidence }),
        )
        .await;
        if intent.is_navigation_request() {
            let response = self.navigator.navigate(text).await;
            self.record(
                RuntimeEventKind::PlanExecuted,
                serde_json::json!({ "steps": response.plan.len(), "success": response.success }),
            )
            .await;
            if response.plan.iter().any(|a| a.kind == ActionKind::Compare) {
                self.tracker.note_plan_comparison().await;
            }
            let mut history = self.history.lock().await;
            history.push(Role::User, text);
            history.push(Role::Assistant, response.message.clone());
            return response.message;
        }

        self.converse(text, &ctx).await
    }

    async fn converse(self: &Arc<Self>, text: &str, ctx: &Arc<PageContext>) -> String {
        let behavior = self.tracker.snapshot().await;

        let (stage, messages) = {
            let mut history = self.history.lock().await;
            let prior_user_messages = history.user_message_count();
            let stage = self.flow.lock().await.advance(text, prior_user_messages);

            // The user turn is appended exactly once, before the reply.
            history.push(Role::User, text);

            let profile = ProfileBuilder::build(&history, &behavior);
            let bant = BantScore::from_history(&history);
            let closing_plan = (stage == ConversationStage::Closing && bant.is_qualified())
                .then(|| closing::build_plan(&bant, &profile, ctx));

            let voice_mode = self.store.get_state().is_voice_mode;
            let system =
                PromptBuilder::build(ctx, stage, &profile, closing_plan.as_ref(), voice_mode);

            let mut messages = vec![system];
            for entry in history.entries() {
                messages.push(ChatMessage { role: entry.role, content: entry.content.clone() });
            }
            (stage, messages)
        };
        debug!(stage = stage.as_str(), "conversational turn");
        self.record(
            RuntimeEventKind::StageChanged,
            serde_json::json!({ "stage": stage.as_str() }),
        )
        .await;

        let request = LlmRequest {
            model: self.config.llm_model.clone(),
            messages,
            temperature: 0.7,
            max_tokens: 300,
        };

        let reply = match self.llm.complete(&request).await {
            Ok(response) => response.content,
            Err(err) => {
                warn!(%err, "LLM call failed");
                self.shell.push_error(RETRY_MESSAGE);
                return RETRY_MESSAGE.to_string();
            }
        };

        let parsed = parse_reply(&reply);
        dispatch(&parsed.directives, &self.executor, ctx).await;

        // The assistant reply is appended in the same turn it resolved.
        self.history.lock().await.push(Role::Assistant, parsed.text.clone());
        self.record(
            RuntimeEventKind::AssistantReplied,
            serde_json::json!({ "directives": parsed.directives.len() }),
        )
        .await;
        parsed.text
    }

    pub async fn current_stage(&self) -> ConversationStage {
        self.flow.lock().await.stage()
    }

    pub async fn history_snapshot(&self) -> ConversationHistory {
        self.history.lock().await.clone()
    }

    /// Flip into voice mode: start the session and route voice turns
    /// through the same conversation path.
    pub async fn enter_voice_mode(self: &Arc<Self>) -> Result<(), BlitsumError> {
        self.voice.start().await?;
        self.store.set_state(StatePatch::voice_mode(true));
        self.shell.set_voice_status(blitsum_core::VoiceState::Listening);

        let mut transcripts = self
            .voice
            .take_transcripts()
            .await
            .ok_or_else(|| BlitsumError::Config("voice session already consumed".into()))?;

        let runtime = self.clone();
        tokio::spawn(async move {
            while let Some(turn) = transcripts.recv().await {
                let reply = runtime.handle_user_message(&turn).await;
                runtime.shell.push_assistant(reply.clone());
                match runtime.voice.speak(&reply).await {
                    Ok(()) | Err(BlitsumError::Interrupted) => {}
                    Err(err) => warn!(%err, "voice playback failed"),
                }
            }
        });

        // Mirror the voice state into the shell status line.
        let mut state_rx = self.voice.state();
        let status_shell = self.shell.clone();
        tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                let state = *state_rx.borrow();
                status_shell.set_voice_status(state);
            }
        });

        info!("voice mode entered");
        Ok(())
    }

    pub async fn exit_voice_mode(&self) {
        self.voice.stop().await;
        self.store.set_state(StatePatch::voice_mode(false));
        self.shell.set_voice_status(blitsum_core::VoiceState::Idle);
        info!("voice mode exited");
    }

    pub fn voice(&self) -> Arc<VoiceSession> {
        self.voice.clone()
    }

    /// Tear down timers, effects and trackers. The runtime is not usable
    /// afterwards.
    pub async fn shutdown(&self) {
        self.voice.stop().await;
        self.executor.teardown().await;
        self.tracker.teardown().await;
        self.cache.invalidate_all();
        info!("runtime shut down");
    }
}
