use std::path::PathBuf;
use std::sync::Arc;

use gtm_core::{
    call_count_label, Agent, AgentError, AgentResponse, Config, Conversation, HistoryItem,
    PendingQuestion, Pricing, Team, SUGGESTED_QUESTIONS,
};
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;

use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    /// Welcome cards, or the transcript once a conversation exists
    Main,
    History,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Conversation
    pub conversation: Conversation,
    pub agent: Arc<dyn Agent>,
    pub events: UnboundedSender<AppEvent>,
    pub pricing: Pricing,

    // Input box
    pub query_input: String,
    pub query_cursor: usize, // cursor position in chars

    // Transcript scrolling
    pub chat_scroll: u16,
    pub chat_height: u16,      // inner height of the transcript, set during render
    pub chat_total_lines: u16, // wrapped line count, set during render
    pub follow_bottom: bool,

    // Welcome view
    pub team: Team,
    pub card_state: ListState,

    // History sidebar
    pub show_history: bool,
    pub history_state: ListState,

    // Suggestions popup
    pub show_suggestions: bool,
    pub suggestion_state: ListState,

    // Header
    pub call_count: Option<u64>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    /// Where the chosen team is remembered; `None` keeps it in memory only.
    pub config_path: Option<PathBuf>,
}

impl App {
    pub fn new(
        agent: Arc<dyn Agent>,
        events: UnboundedSender<AppEvent>,
        team: Team,
        pricing: Pricing,
        config_path: Option<PathBuf>,
    ) -> Self {
        let mut card_state = ListState::default();
        card_state.select(Some(0));

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Main,

            conversation: Conversation::new(),
            agent,
            events,
            pricing,

            query_input: String::new(),
            query_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_total_lines: 0,
            follow_bottom: true,

            team,
            card_state,

            show_history: true,
            history_state: ListState::default(),

            show_suggestions: false,
            suggestion_state: ListState::default(),

            call_count: None,
            animation_frame: 0,
            config_path,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    /// The welcome view shows until the first question is asked.
    pub fn is_welcome(&self) -> bool {
        self.conversation.messages().is_empty()
    }

    pub fn call_count_label(&self) -> String {
        call_count_label(self.call_count)
    }

    // Asking

    /// Submit the input box. Blank input or a request in flight leaves it untouched.
    pub fn submit_input(&mut self) {
        let question = self.query_input.trim().to_string();
        if question.is_empty() || self.is_loading() {
            return;
        }
        self.query_input.clear();
        self.query_cursor = 0;
        self.ask(&question);
    }

    /// Ask a quick suggestion; ignored while loading.
    pub fn ask_suggestion(&mut self, index: usize) {
        if self.is_loading() {
            return;
        }
        if let Some(question) = SUGGESTED_QUESTIONS.get(index) {
            self.show_suggestions = false;
            self.ask(question);
        }
    }

    pub fn ask_card(&mut self, index: usize) {
        if let Some(card) = self.team.questions().get(index) {
            self.ask(card.question);
        }
    }

    pub fn ask_selected_card(&mut self) {
        if let Some(i) = self.card_state.selected() {
            self.ask_card(i);
        }
    }

    /// Re-run the highlighted history question. Allowed even while loading.
    pub fn replay_selected(&mut self) {
        let item: Option<HistoryItem> = self
            .history_state
            .selected()
            .and_then(|i| self.conversation.history().get(i))
            .cloned();
        if let Some(item) = item {
            let pending = self.conversation.replay(&item);
            self.dispatch(pending);
        }
    }

    pub fn ask(&mut self, question: &str) {
        let pending = self.conversation.begin(question);
        self.dispatch(pending);
    }

    /// Run the request on its own task; the answer comes back as [`AppEvent::Answer`].
    fn dispatch(&mut self, pending: PendingQuestion) {
        self.follow_bottom = true;
        let agent = Arc::clone(&self.agent);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = agent.ask_question(&pending.question).await;
            // loop already gone when this fails
            let _ = events.send(AppEvent::Answer { pending, result });
        });
    }

    pub fn complete(&mut self, pending: PendingQuestion, result: Result<AgentResponse, AgentError>) {
        self.conversation.complete(pending, result);
        self.follow_bottom = true;
        self.clamp_history_selection();
    }

    // Conversation actions

    pub fn new_chat(&mut self) {
        self.conversation.new_chat();
        self.chat_scroll = 0;
        self.follow_bottom = true;
        self.focus = FocusPane::Main;
    }

    pub fn clear_history(&mut self) {
        self.conversation.clear_history();
        self.history_state.select(None);
        if self.focus == FocusPane::History {
            self.focus = FocusPane::Main;
        }
    }

    pub fn toggle_history(&mut self) {
        self.show_history = !self.show_history;
        if !self.show_history && self.focus == FocusPane::History {
            self.focus = FocusPane::Main;
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Main if self.show_history => {
                if self.history_state.selected().is_none() && !self.conversation.history().is_empty() {
                    self.history_state.select(Some(0));
                }
                FocusPane::History
            }
            _ => FocusPane::Main,
        };
    }

    fn clamp_history_selection(&mut self) {
        let len = self.conversation.history().len();
        match self.history_state.selected() {
            Some(_) if len == 0 => self.history_state.select(None),
            Some(i) if i >= len => self.history_state.select(Some(len - 1)),
            _ => {}
        }
    }

    // Teams

    pub fn set_team(&mut self, team: Team) {
        if team == self.team {
            return;
        }
        self.team = team;
        self.card_state.select(Some(0));

        if let Some(path) = &self.config_path {
            if let Err(e) = Config::save_default_team_to(path, team) {
                tracing::warn!(error = %e, "Could not remember team");
            }
        }
    }

    pub fn next_team(&mut self) {
        self.set_team(self.team.next());
    }

    pub fn prev_team(&mut self) {
        self.set_team(self.team.prev());
    }

    // List navigation

    pub fn nav_down(&mut self) {
        match self.focus {
            FocusPane::History => {
                let len = self.conversation.history().len();
                if len > 0 {
                    let i = self.history_state.selected().unwrap_or(0);
                    self.history_state.select(Some((i + 1).min(len - 1)));
                }
            }
            FocusPane::Main if self.is_welcome() => {
                let len = self.team.questions().len();
                let i = self.card_state.selected().unwrap_or(0);
                self.card_state.select(Some((i + 1).min(len - 1)));
            }
            FocusPane::Main => self.scroll_down(1),
        }
    }

    pub fn nav_up(&mut self) {
        match self.focus {
            FocusPane::History => {
                let i = self.history_state.selected().unwrap_or(0);
                self.history_state.select(Some(i.saturating_sub(1)));
            }
            FocusPane::Main if self.is_welcome() => {
                let i = self.card_state.selected().unwrap_or(0);
                self.card_state.select(Some(i.saturating_sub(1)));
            }
            FocusPane::Main => self.scroll_up(1),
        }
    }

    pub fn open_suggestions(&mut self) {
        if self.is_loading() {
            return;
        }
        self.suggestion_state.select(Some(0));
        self.show_suggestions = true;
    }

    pub fn suggestion_down(&mut self) {
        let i = self.suggestion_state.selected().unwrap_or(0);
        self.suggestion_state
            .select(Some((i + 1).min(SUGGESTED_QUESTIONS.len() - 1)));
    }

    pub fn suggestion_up(&mut self) {
        let i = self.suggestion_state.selected().unwrap_or(0);
        self.suggestion_state.select(Some(i.saturating_sub(1)));
    }

    // Transcript scrolling

    fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_bottom = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
    }

    /// Record the transcript's size after layout; pins to the end when following.
    pub fn update_chat_metrics(&mut self, total_lines: u16, height: u16) {
        self.chat_total_lines = total_lines;
        self.chat_height = height;
        if self.follow_bottom {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }

    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}
