use std::time::{Duration, Instant};

use anyhow::Result;
use ratatui::layout::Rect;
use tokio::task::JoinHandle;

use crate::chat::{ChatClient, ChatOutcome, Stats, Vendor};
use crate::config::Config;
use crate::toast::{Toast, ToastKind, ToastPhase};
use crate::util::format_date;

/// Shown in the transcript when the server cannot be reached or answers
/// with something that is not the chat wire shape.
pub const CONNECTION_ERROR: &str =
    "✗ Could not reach the NetRouter server. Check that it is running and try again.";

/// Delay between consecutive card reveals on the dashboard.
const REVEAL_STEP_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    /// Transient "thinking" placeholder, removed when its exchange resolves.
    Pending,
    Error,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: u64,
    pub role: ChatRole,
    pub content: String,
}

/// One in-flight chat request, tied to its placeholder by id so overlapping
/// exchanges can never remove each other's placeholders.
pub struct PendingExchange {
    pub placeholder_id: u64,
    pub task: JoinHandle<Result<ChatOutcome>>,
}

#[derive(Debug, Clone)]
pub struct Card {
    pub title: String,
    pub lines: Vec<String>,
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Tooltip {
    pub text: String,
    pub anchor: Rect,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Chat widget state
    pub chat_open: bool,
    pub chat_input: String,
    pub chat_cursor: usize,
    pub chat_messages: Vec<ChatMessage>,
    next_message_id: u64,
    pub pending: Vec<PendingExchange>,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Dashboard state
    pub vendors: Vec<Vendor>,
    pub stats: Option<Stats>,
    pub stats_updated_at: Option<String>,
    pub cards: Vec<Card>,
    pub card_areas: Vec<Rect>,
    reveal_started: Option<Instant>,
    pub revealed_cards: usize,

    // Overlays
    pub toast: Option<Toast>,
    pub tooltip: Option<Tooltip>,

    // Animation
    pub tick_count: u64,

    // Background fetches
    pub vendors_task: Option<JoinHandle<Result<Vec<Vendor>>>>,
    pub stats_task: Option<JoinHandle<Result<Stats>>>,
    pub clear_task: Option<JoinHandle<Result<()>>>,

    pub client: ChatClient,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let client = ChatClient::new(&config.server_url());

        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Normal,

            chat_open: false,
            chat_input: String::new(),
            chat_cursor: 0,
            chat_messages: Vec::new(),
            next_message_id: 0,
            pending: Vec::new(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            vendors: Vec::new(),
            stats: None,
            stats_updated_at: None,
            cards: Vec::new(),
            card_areas: Vec::new(),
            reveal_started: None,
            revealed_cards: 0,

            toast: None,
            tooltip: None,

            tick_count: 0,

            vendors_task: None,
            stats_task: None,
            clear_task: None,

            client,
        };
        app.rebuild_cards();
        app
    }

    // ---- Chat widget -----------------------------------------------------

    /// Flip the chat widget. Opening moves focus into the input; closing
    /// restores the launcher hint in the footer.
    pub fn toggle_chat(&mut self) {
        self.chat_open = !self.chat_open;
        if self.chat_open {
            self.input_mode = InputMode::Editing;
            self.chat_cursor = self.chat_input.chars().count();
            self.scroll_chat_to_bottom();
        } else {
            self.input_mode = InputMode::Normal;
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_message_id += 1;
        self.next_message_id
    }

    /// Append the user message and its tagged placeholder to the transcript.
    /// Returns the placeholder id the resolving side must use.
    pub fn begin_exchange(&mut self, text: String) -> u64 {
        let user_id = self.next_id();
        self.chat_messages.push(ChatMessage {
            id: user_id,
            role: ChatRole::User,
            content: text,
        });

        let placeholder_id = self.next_id();
        self.chat_messages.push(ChatMessage {
            id: placeholder_id,
            role: ChatRole::Pending,
            content: String::new(),
        });

        self.scroll_chat_to_bottom();
        placeholder_id
    }

    /// Send the current input to the backend. Empty or whitespace-only input
    /// is a silent no-op: transcript and input field stay untouched.
    pub fn send_message(&mut self) {
        let text = self.chat_input.trim().to_string();
        if text.is_empty() {
            return;
        }

        self.chat_input.clear();
        self.chat_cursor = 0;

        let placeholder_id = self.begin_exchange(text.clone());

        let client = self.client.clone();
        let task = tokio::spawn(async move { client.send(&text).await });
        self.pending.push(PendingExchange {
            placeholder_id,
            task,
        });
    }

    /// Fold a finished exchange back into the transcript. The placeholder is
    /// removed by id, never by position.
    pub fn resolve_exchange(&mut self, placeholder_id: u64, result: Result<ChatOutcome>) {
        self.chat_messages.retain(|m| m.id != placeholder_id);

        let (role, content) = match result {
            Ok(ChatOutcome::Reply(text)) => (ChatRole::Assistant, text),
            Ok(ChatOutcome::Refused(error)) => (ChatRole::Error, format!("✗ {}", error)),
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                (ChatRole::Error, CONNECTION_ERROR.to_string())
            }
        };

        let id = self.next_id();
        self.chat_messages.push(ChatMessage { id, role, content });
        self.scroll_chat_to_bottom();
    }

    /// Ask the server to drop its conversation context.
    pub fn clear_chat(&mut self) {
        if self.clear_task.is_some() {
            return;
        }
        let client = self.client.clone();
        self.clear_task = Some(tokio::spawn(async move { client.clear_history().await }));
    }

    /// Scroll so the newest transcript entry (or the thinking indicator) is
    /// visible, accounting for line wrapping in the chat area.
    pub fn scroll_chat_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;
        for msg in &self.chat_messages {
            total_lines += 1; // role line
            match msg.role {
                ChatRole::Pending => total_lines += 1,
                _ => {
                    for line in msg.content.lines() {
                        let char_count = line.chars().count();
                        if char_count == 0 {
                            total_lines += 1;
                        } else {
                            total_lines += ((char_count / wrap_width) + 1) as u16;
                        }
                    }
                }
            }
            total_lines += 1; // blank line after message
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        } else {
            self.chat_scroll = 0;
        }
    }

    // ---- Dashboard -------------------------------------------------------

    /// Kick off the startup fetches for vendors and stats.
    pub fn start_dashboard_fetch(&mut self) {
        let client = self.client.clone();
        self.vendors_task = Some(tokio::spawn(async move { client.vendors().await }));
        self.refresh_stats();
    }

    /// Re-fetch stats only. Debounced on resize by the main loop.
    pub fn refresh_stats(&mut self) {
        if self.stats_task.is_some() {
            return;
        }
        let client = self.client.clone();
        self.stats_task = Some(tokio::spawn(async move { client.stats().await }));
    }

    /// Rebuild the card list from current data and restart the staggered
    /// reveal. Cards without data degrade to placeholders.
    pub fn rebuild_cards(&mut self) {
        let mut cards = Vec::new();

        let mut stats_lines = match self.stats {
            Some(stats) => vec![
                format!("Diagnostics run: {}", stats.total),
                format!("Resolved: {}", stats.resolved),
                format!("Success rate: {:.1}%", stats.success_rate),
            ],
            None => vec!["No data yet".to_string()],
        };
        if let Some(updated) = self
            .stats_updated_at
            .as_deref()
            .and_then(format_date)
        {
            stats_lines.push(format!("Updated {}", updated));
        }
        cards.push(Card {
            title: "Diagnostics".to_string(),
            lines: stats_lines,
            tooltip: Some("Usage statistics since server start".to_string()),
        });

        for vendor in &self.vendors {
            let tooltip = if vendor.versions.is_empty() {
                None
            } else {
                let versions: Vec<String> = vendor
                    .versions
                    .iter()
                    .map(|v| {
                        let label = if v.name.is_empty() { &v.id } else { &v.name };
                        if v.description.is_empty() {
                            label.clone()
                        } else {
                            format!("{}: {}", label, v.description)
                        }
                    })
                    .collect();
                Some(versions.join("; "))
            };

            cards.push(Card {
                title: format!("{} {}", vendor.icon, vendor.name).trim().to_string(),
                lines: vec![format!("{} supported versions", vendor.versions.len())],
                tooltip,
            });
        }

        self.cards = cards;
        self.card_areas.clear();
        self.tooltip = None;
        self.reveal_started = Some(Instant::now());
        self.revealed_cards = 0;
    }

    /// How many cards are visible `elapsed` into a reveal: card `i` appears
    /// once `i * REVEAL_STEP_MS` has passed, so card 0 shows immediately.
    pub fn revealed_count(elapsed: Duration, total: usize) -> usize {
        ((elapsed.as_millis() as u64 / REVEAL_STEP_MS) as usize + 1).min(total)
    }

    /// True while the staggered reveal is still running.
    pub fn reveal_in_progress(&self) -> bool {
        self.reveal_started.is_some()
    }

    // ---- Overlays --------------------------------------------------------

    /// Show a toast, replacing any live one. At most one toast exists.
    pub fn show_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toast = Some(Toast::new(message, kind));
    }

    /// Hit-test the pointer against the card areas recorded during render
    /// and show/hide the single tooltip accordingly.
    pub fn update_tooltip(&mut self, x: u16, y: u16) {
        for (i, area) in self.card_areas.iter().enumerate() {
            let inside = x >= area.x
                && x < area.x + area.width
                && y >= area.y
                && y < area.y + area.height;
            if inside {
                if let Some(text) = self.cards.get(i).and_then(|c| c.tooltip.clone()) {
                    self.tooltip = Some(Tooltip {
                        text,
                        anchor: *area,
                    });
                } else {
                    self.tooltip = None;
                }
                return;
            }
        }
        self.tooltip = None;
    }

    // ---- Ticking ---------------------------------------------------------

    /// Advance time-driven state: card reveal, thinking ellipsis, toast
    /// expiry. Called on every tick event (100 ms).
    pub fn tick(&mut self, now: Instant) {
        self.tick_count = self.tick_count.wrapping_add(1);

        if let Some(started) = self.reveal_started {
            let elapsed = now.saturating_duration_since(started);
            self.revealed_cards = Self::revealed_count(elapsed, self.cards.len());
            if self.revealed_cards >= self.cards.len()
                && elapsed.as_millis() as u64 >= self.cards.len() as u64 * REVEAL_STEP_MS + 300
            {
                self.reveal_started = None;
            }
        }

        if let Some(toast) = &self.toast {
            if toast.phase(now) == ToastPhase::Expired {
                self.toast = None;
            }
        }
    }

    /// Ellipsis frame for the thinking indicator, advancing every 300 ms.
    pub fn ellipsis_frame(&self) -> usize {
        (self.tick_count / 3) as usize % 3
    }

    // ---- Background task polling ----------------------------------------

    /// Reap finished background tasks. Each in-flight chat exchange resolves
    /// independently, in whatever order the responses arrive.
    pub async fn poll_tasks(&mut self) {
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].task.is_finished() {
                let exchange = self.pending.remove(i);
                let result = match exchange.task.await {
                    Ok(result) => result,
                    Err(err) => Err(err.into()),
                };
                self.resolve_exchange(exchange.placeholder_id, result);
            } else {
                i += 1;
            }
        }

        if self.vendors_task.as_ref().is_some_and(|t| t.is_finished()) {
            let task = self.vendors_task.take();
            if let Some(task) = task {
                match task.await {
                    Ok(Ok(vendors)) => {
                        let ids: Vec<&str> = vendors.iter().map(|v| v.id.as_str()).collect();
                        tracing::debug!(?ids, "vendors loaded");
                        self.vendors = vendors;
                        self.rebuild_cards();
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(error = %err, "vendor fetch failed");
                        self.show_toast("Could not load vendors from server", ToastKind::Error);
                    }
                    Err(err) => tracing::error!(error = %err, "vendor task panicked"),
                }
            }
        }

        if self.stats_task.as_ref().is_some_and(|t| t.is_finished()) {
            let task = self.stats_task.take();
            if let Some(task) = task {
                match task.await {
                    Ok(Ok(stats)) => {
                        self.stats = Some(stats);
                        self.stats_updated_at = Some(chrono::Utc::now().to_rfc3339());
                        self.rebuild_cards();
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(error = %err, "stats fetch failed");
                    }
                    Err(err) => tracing::error!(error = %err, "stats task panicked"),
                }
            }
        }

        if self.clear_task.as_ref().is_some_and(|t| t.is_finished()) {
            let task = self.clear_task.take();
            if let Some(task) = task {
                match task.await {
                    Ok(Ok(())) => {
                        self.chat_messages.clear();
                        self.chat_scroll = 0;
                        self.show_toast("Conversation cleared", ToastKind::Success);
                    }
                    Ok(Err(err)) => {
                        tracing::warn!(error = %err, "clear history failed");
                        self.show_toast("Could not clear conversation", ToastKind::Error);
                    }
                    Err(err) => tracing::error!(error = %err, "clear task panicked"),
                }
            }
        }
    }

    /// Last assistant reply, used by the copy binding.
    pub fn last_assistant_message(&self) -> Option<&ChatMessage> {
        self.chat_messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn test_app() -> App {
        App::new(&Config::new())
    }

    fn roles(app: &App) -> Vec<ChatRole> {
        app.chat_messages.iter().map(|m| m.role).collect()
    }

    #[test]
    fn empty_input_send_is_a_no_op() {
        let mut app = test_app();
        app.chat_input = "   \t ".to_string();

        app.send_message();

        assert!(app.chat_messages.is_empty());
        assert_eq!(app.chat_input, "   \t ");
        assert!(app.pending.is_empty());
    }

    #[test]
    fn exchange_resolves_to_assistant_reply() {
        let mut app = test_app();

        let id = app.begin_exchange("hello".to_string());
        assert_eq!(roles(&app), vec![ChatRole::User, ChatRole::Pending]);
        assert_eq!(app.chat_messages[0].content, "hello");

        app.resolve_exchange(id, Ok(ChatOutcome::Reply("**hi**".to_string())));

        assert_eq!(roles(&app), vec![ChatRole::User, ChatRole::Assistant]);
        assert_eq!(app.chat_messages[1].content, "**hi**");
    }

    #[test]
    fn server_refusal_becomes_error_line_with_glyph() {
        let mut app = test_app();
        let id = app.begin_exchange("hello".to_string());

        app.resolve_exchange(id, Ok(ChatOutcome::Refused("AI not configured".to_string())));

        assert_eq!(roles(&app), vec![ChatRole::User, ChatRole::Error]);
        assert_eq!(app.chat_messages[1].content, "✗ AI not configured");
    }

    #[test]
    fn transport_failure_becomes_generic_error() {
        let mut app = test_app();
        let id = app.begin_exchange("hello".to_string());

        app.resolve_exchange(id, Err(anyhow!("connection refused")));

        assert_eq!(roles(&app), vec![ChatRole::User, ChatRole::Error]);
        assert_eq!(app.chat_messages[1].content, CONNECTION_ERROR);
        assert!(!app.chat_messages[1].content.contains("connection refused"));
    }

    #[test]
    fn overlapping_exchanges_resolve_by_identity() {
        let mut app = test_app();
        let first = app.begin_exchange("one".to_string());
        let second = app.begin_exchange("two".to_string());

        // Second request finishes first; the first placeholder must survive.
        app.resolve_exchange(second, Ok(ChatOutcome::Reply("reply two".to_string())));

        assert!(app
            .chat_messages
            .iter()
            .any(|m| m.id == first && m.role == ChatRole::Pending));
        assert_eq!(app.chat_messages.last().unwrap().content, "reply two");

        app.resolve_exchange(first, Ok(ChatOutcome::Reply("reply one".to_string())));

        assert!(!app.chat_messages.iter().any(|m| m.role == ChatRole::Pending));
        assert_eq!(
            roles(&app),
            vec![
                ChatRole::User,
                ChatRole::User,
                ChatRole::Assistant,
                ChatRole::Assistant
            ]
        );
    }

    #[tokio::test]
    async fn send_message_end_to_end_against_mock_server() {
        use httpmock::prelude::*;
        use serde_json::json;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/ai/chat")
                    .json_body(json!({"message": "hello"}));
                then.status(200)
                    .json_body(json!({"success": true, "response": "**hi**"}));
            })
            .await;

        let config = Config {
            server_url: Some(server.base_url()),
        };
        let mut app = App::new(&config);
        app.chat_input = "hello".to_string();

        app.send_message();
        assert!(app.chat_input.is_empty());
        assert_eq!(app.pending.len(), 1);

        let exchange = app.pending.remove(0);
        let result = exchange.task.await.unwrap();
        app.resolve_exchange(exchange.placeholder_id, result);

        assert_eq!(roles(&app), vec![ChatRole::User, ChatRole::Assistant]);
        assert_eq!(app.chat_messages[1].content, "**hi**");
    }

    #[test]
    fn toast_is_a_singleton() {
        let mut app = test_app();
        app.show_toast("first", ToastKind::Info);
        app.show_toast("second", ToastKind::Success);
        app.show_toast("third", ToastKind::Error);

        let toast = app.toast.as_ref().unwrap();
        assert_eq!(toast.message, "third");
        assert_eq!(toast.kind, ToastKind::Error);
    }

    #[test]
    fn tooltip_shows_over_annotated_card_and_hides_on_leave() {
        let mut app = test_app();
        app.cards = vec![
            Card {
                title: "with tooltip".to_string(),
                lines: vec![],
                tooltip: Some("details".to_string()),
            },
            Card {
                title: "without".to_string(),
                lines: vec![],
                tooltip: None,
            },
        ];
        app.card_areas = vec![Rect::new(0, 0, 10, 5), Rect::new(10, 0, 10, 5)];

        app.update_tooltip(3, 2);
        assert_eq!(app.tooltip.as_ref().unwrap().text, "details");

        // Hovering a card without tooltip text shows nothing.
        app.update_tooltip(12, 2);
        assert!(app.tooltip.is_none());

        app.update_tooltip(3, 2);
        assert!(app.tooltip.is_some());

        // Leaving all cards hides the tooltip.
        app.update_tooltip(50, 20);
        assert!(app.tooltip.is_none());
    }

    #[test]
    fn reveal_is_staggered_by_index() {
        assert_eq!(App::revealed_count(Duration::from_millis(0), 5), 1);
        assert_eq!(App::revealed_count(Duration::from_millis(99), 5), 1);
        assert_eq!(App::revealed_count(Duration::from_millis(100), 5), 2);
        assert_eq!(App::revealed_count(Duration::from_millis(250), 5), 3);
        assert_eq!(App::revealed_count(Duration::from_millis(10_000), 5), 5);
    }

    #[test]
    fn expired_toast_is_removed_on_tick() {
        let mut app = test_app();
        app.show_toast("bye", ToastKind::Info);

        app.tick(Instant::now() + Duration::from_millis(4500));
        assert!(app.toast.is_none());
    }

    #[test]
    fn toggle_chat_moves_focus_into_input() {
        let mut app = test_app();
        assert!(!app.chat_open);

        app.toggle_chat();
        assert!(app.chat_open);
        assert_eq!(app.input_mode, InputMode::Editing);

        app.toggle_chat();
        assert!(!app.chat_open);
        assert_eq!(app.input_mode, InputMode::Normal);
    }
}
