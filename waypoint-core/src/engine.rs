//! Chat engine
//!
//! Owns the conversation loop: a command channel in, an event channel
//! out, and a spawned processor task in between. The UI never touches
//! the store or the routing agent directly; it sends commands and
//! renders the messages carried by events.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::message::{Message, Part, Role};
use crate::routing::RoutingAgent;
use crate::storage::{ThreadInfo, ThreadStore};

const TITLE_WORD_LIMIT: usize = 6;

pub enum EngineCommand {
    SendMessage(String),
    OpenThread(String),
    NewThread,
    DeleteThread(String),
    RenameThread { thread_id: String, title: String },
    RefreshThreads,
    SetWebSearch(bool),
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The active thread changed. `thread_id` is `None` for a fresh
    /// thread that has not been persisted yet.
    ThreadOpened {
        thread_id: Option<String>,
        messages: Vec<Message>,
    },
    ThreadsChanged(Vec<ThreadInfo>),
    /// An assistant turn began streaming.
    MessageStarted(Message),
    /// A streaming snapshot of the in-flight assistant message.
    MessageUpdated(Message),
    /// The assistant message in its final form.
    MessageComplete(Message),
    WebSearchChanged(bool),
    Error(String),
}

pub struct ChatEngine {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
    event_rx: mpsc::UnboundedReceiver<EngineEvent>,
    #[allow(dead_code)]
    processor_handle: JoinHandle<()>,
}

struct Processor {
    store: Arc<ThreadStore>,
    agent: RoutingAgent,
    resource_id: String,
    current_thread: Option<String>,
    web_search: bool,
    event_tx: mpsc::UnboundedSender<EngineEvent>,
}

impl ChatEngine {
    pub fn new(store: Arc<ThreadStore>, agent: RoutingAgent, resource_id: impl Into<String>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let processor = Processor {
            store,
            agent,
            resource_id: resource_id.into(),
            current_thread: None,
            web_search: false,
            event_tx,
        };
        let processor_handle = tokio::spawn(processor.run(cmd_rx));

        Self {
            cmd_tx,
            event_rx,
            processor_handle,
        }
    }

    pub fn send_message(&self, text: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::SendMessage(text.into()));
    }

    pub fn open_thread(&self, thread_id: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::OpenThread(thread_id.into()));
    }

    pub fn new_thread(&self) {
        let _ = self.cmd_tx.send(EngineCommand::NewThread);
    }

    pub fn delete_thread(&self, thread_id: impl Into<String>) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::DeleteThread(thread_id.into()));
    }

    pub fn rename_thread(&self, thread_id: impl Into<String>, title: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::RenameThread {
            thread_id: thread_id.into(),
            title: title.into(),
        });
    }

    pub fn refresh_threads(&self) {
        let _ = self.cmd_tx.send(EngineCommand::RefreshThreads);
    }

    pub fn set_web_search(&self, enabled: bool) {
        let _ = self.cmd_tx.send(EngineCommand::SetWebSearch(enabled));
    }

    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub async fn next_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }
}

impl Processor {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<EngineCommand>) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                EngineCommand::SendMessage(text) => self.handle_send(text).await,
                EngineCommand::OpenThread(thread_id) => self.handle_open(thread_id),
                EngineCommand::NewThread => {
                    self.current_thread = None;
                    self.emit(EngineEvent::ThreadOpened {
                        thread_id: None,
                        messages: Vec::new(),
                    });
                }
                EngineCommand::DeleteThread(thread_id) => self.handle_delete(thread_id),
                EngineCommand::RenameThread { thread_id, title } => {
                    match self.store.rename_thread(&thread_id, Some(&title)) {
                        Ok(()) => self.emit_threads(),
                        Err(e) => self.emit_error(e),
                    }
                }
                EngineCommand::RefreshThreads => self.emit_threads(),
                EngineCommand::SetWebSearch(enabled) => {
                    self.web_search = enabled;
                    info!(enabled, "Web search toggled");
                    self.emit(EngineEvent::WebSearchChanged(enabled));
                }
            }
        }
    }

    async fn handle_send(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }

        let thread_id = match self.ensure_thread(&text) {
            Ok(id) => id,
            Err(e) => return self.emit_error(e),
        };

        let user = Message::user(&text);
        if let Err(e) = self.store.append_message(&thread_id, &user) {
            return self.emit_error(e);
        }

        let mut assistant = Message::assistant();
        if let Err(e) = self.store.append_message(&thread_id, &assistant) {
            return self.emit_error(e);
        }
        self.emit(EngineEvent::MessageStarted(assistant.clone()));

        // Stream trace snapshots into the assistant message as they
        // arrive; the last part slot always holds the network part.
        let event_tx = self.event_tx.clone();
        let store = Arc::clone(&self.store);
        let mut snapshot_message = assistant.clone();
        let result = self
            .agent
            .run(&text, self.web_search, |trace| {
                snapshot_message.parts = vec![Part::network(trace.clone())];
                let _ = store.update_message(&snapshot_message);
                let _ = event_tx.send(EngineEvent::MessageUpdated(snapshot_message.clone()));
            })
            .await;

        match result {
            Ok(trace) => {
                let answer = trace
                    .output
                    .as_ref()
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                assistant.parts = vec![Part::network(trace)];
                if !answer.trim().is_empty() {
                    assistant.parts.push(Part::text(answer));
                }
                if let Err(e) = self.store.update_message(&assistant) {
                    return self.emit_error(e);
                }
                self.emit(EngineEvent::MessageComplete(assistant));
                self.emit_threads();
            }
            Err(e) => {
                error!(error = %e, "Routing run failed");
                self.emit_error(e);
            }
        }
    }

    /// Threads are created lazily on the first message, titled from it.
    fn ensure_thread(&mut self, first_text: &str) -> anyhow::Result<String> {
        if let Some(id) = &self.current_thread {
            return Ok(id.clone());
        }
        let id = Uuid::new_v4().to_string();
        self.store.create_thread(&id, &self.resource_id)?;
        self.store
            .rename_thread(&id, Some(&derive_title(first_text)))?;
        self.current_thread = Some(id.clone());
        self.emit_threads();
        Ok(id)
    }

    fn handle_open(&mut self, thread_id: String) {
        match self.store.load_messages(&thread_id) {
            Ok(messages) => {
                self.current_thread = Some(thread_id.clone());
                self.emit(EngineEvent::ThreadOpened {
                    thread_id: Some(thread_id),
                    messages,
                });
            }
            Err(e) => self.emit_error(e),
        }
    }

    fn handle_delete(&mut self, thread_id: String) {
        if let Err(e) = self.store.delete_thread(&thread_id) {
            return self.emit_error(e);
        }
        if self.current_thread.as_deref() == Some(thread_id.as_str()) {
            self.current_thread = None;
            self.emit(EngineEvent::ThreadOpened {
                thread_id: None,
                messages: Vec::new(),
            });
        }
        self.emit_threads();
    }

    fn emit_threads(&self) {
        match self.store.list_threads(&self.resource_id) {
            Ok(threads) => self.emit(EngineEvent::ThreadsChanged(threads)),
            Err(e) => self.emit_error(e),
        }
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    fn emit_error(&self, error: anyhow::Error) {
        let _ = self.event_tx.send(EngineEvent::Error(error.to_string()));
    }
}

/// First few words of the opening message, ellipsized.
fn derive_title(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= TITLE_WORD_LIMIT {
        return words.join(" ");
    }
    format!("{}…", words[..TITLE_WORD_LIMIT].join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{NetworkStatus, Role};
    use crate::routing::{RuleRouter, RoutingAgent};
    use crate::tools::weather::{WeatherProvider, WeatherReport};
    use crate::tools::ToolSet;
    use anyhow::Result;
    use async_trait::async_trait;

    struct StubWeather;

    #[async_trait]
    impl WeatherProvider for StubWeather {
        async fn current_weather(&self, location: &str) -> Result<WeatherReport> {
            Ok(WeatherReport {
                temperature: 18.0,
                feels_like: 17.0,
                humidity: 70.0,
                wind_speed: 10.0,
                wind_gust: 16.0,
                conditions: "Overcast".to_string(),
                location: location.to_string(),
            })
        }
    }

    fn engine() -> (ChatEngine, Arc<ThreadStore>) {
        let store = Arc::new(ThreadStore::in_memory().unwrap());
        let agent = RoutingAgent::new(
            ToolSet::new(Arc::new(StubWeather)),
            Arc::new(RuleRouter),
        );
        let engine = ChatEngine::new(Arc::clone(&store), agent, "traveler");
        (engine, store)
    }

    async fn drain_until_complete(engine: &mut ChatEngine) -> Message {
        loop {
            match engine.next_event().await.expect("engine closed") {
                EngineEvent::MessageComplete(message) => return message,
                EngineEvent::Error(e) => panic!("engine error: {e}"),
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_send_message_persists_and_completes() {
        let (mut engine, store) = engine();
        engine.send_message("What's the weather in Paris?");
        let complete = drain_until_complete(&mut engine).await;

        assert_eq!(complete.role, Role::Assistant);
        let network = complete
            .parts
            .iter()
            .find_map(|p| match p {
                Part::Network { data } => Some(data),
                _ => None,
            })
            .expect("assistant carries a trace");
        assert_eq!(network.status, NetworkStatus::Finished);
        assert!(complete.has_text_part());

        let threads = store.list_threads("traveler").unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].title.as_deref(), Some("What's the weather in Paris?"));
        assert_eq!(threads[0].message_count, 2);

        let stored = store.load_messages(&threads[0].id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, Role::User);
        assert_eq!(stored[1].id, complete.id);
        assert_eq!(stored[1].parts, complete.parts);
    }

    #[tokio::test]
    async fn test_streaming_updates_precede_completion() {
        let (mut engine, _store) = engine();
        engine.send_message("weather in Rome");

        let mut updates = 0usize;
        loop {
            match engine.next_event().await.unwrap() {
                EngineEvent::MessageUpdated(message) => {
                    updates += 1;
                    assert!(message
                        .parts
                        .iter()
                        .any(|p| matches!(p, Part::Network { .. })));
                }
                EngineEvent::MessageComplete(_) => break,
                EngineEvent::Error(e) => panic!("engine error: {e}"),
                _ => {}
            }
        }
        assert!(updates >= 3);
    }

    #[tokio::test]
    async fn test_delete_current_thread_resets_view() {
        let (mut engine, store) = engine();
        engine.send_message("weather in Oslo");
        drain_until_complete(&mut engine).await;

        let thread_id = store.list_threads("traveler").unwrap()[0].id.clone();
        engine.delete_thread(&thread_id);

        loop {
            match engine.next_event().await.unwrap() {
                EngineEvent::ThreadOpened { thread_id, messages } => {
                    assert!(thread_id.is_none());
                    assert!(messages.is_empty());
                    break;
                }
                EngineEvent::Error(e) => panic!("engine error: {e}"),
                _ => {}
            }
        }
        assert!(store.list_threads("traveler").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_thread_replays_history() {
        let (mut engine, store) = engine();
        engine.send_message("weather in Lima");
        drain_until_complete(&mut engine).await;

        let thread_id = store.list_threads("traveler").unwrap()[0].id.clone();
        engine.new_thread();
        engine.open_thread(&thread_id);

        let mut opened = Vec::new();
        loop {
            match engine.next_event().await.unwrap() {
                EngineEvent::ThreadOpened { thread_id: id, messages } => {
                    opened.push((id, messages));
                    if opened.len() == 2 {
                        break;
                    }
                }
                EngineEvent::Error(e) => panic!("engine error: {e}"),
                _ => {}
            }
        }
        let (id, messages) = &opened[1];
        assert_eq!(id.as_deref(), Some(thread_id.as_str()));
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_title_derivation() {
        assert_eq!(derive_title("short one"), "short one");
        assert_eq!(
            derive_title("plan a two week trip through southern Italy please"),
            "plan a two week trip through…"
        );
    }
}
