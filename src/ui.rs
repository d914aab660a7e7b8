use crate::agent::Agent;
use crate::session::{Session, TurnReply};
use crate::tools::{ImageResult, SearchClient};
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, size};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget, Wrap};
use ratatui::{Frame, Terminal, TerminalOptions, Viewport};
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

type TuiTerminal = Terminal<CrosstermBackend<io::Stdout>>;

const REPLY_HEIGHT: u16 = 10;
const INPUT_HEIGHT: u16 = 6;

// Restores terminal settings even if the loop exits early.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Self {
        Self
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().flush();
    }
}

#[derive(Debug, Clone)]
pub enum ChatMessage {
    User(String),
    Assistant(String),
    Images {
        query: String,
        images: Vec<ImageResult>,
    },
    Info(String),
}

#[derive(Debug, Clone)]
struct LineSpec {
    text: String,
    style: Style,
}

impl LineSpec {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

impl ChatMessage {
    fn line_specs(&self) -> Vec<LineSpec> {
        match self {
            ChatMessage::User(msg) => {
                let header_style = Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::BOLD);
                let body_style = Style::default().fg(Color::Blue);
                let mut lines = vec![LineSpec::new("You:", header_style)];
                for line in msg.lines() {
                    lines.push(LineSpec::new(format!("  {}", line), body_style));
                }
                lines
            }
            ChatMessage::Assistant(msg) => {
                let header_style = Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD);
                let body_style = Style::default().fg(Color::Yellow);
                let mut lines = vec![LineSpec::new("Assistant:", header_style)];
                for line in msg.lines() {
                    lines.push(LineSpec::new(format!("  {}", line), body_style));
                }
                lines
            }
            ChatMessage::Images { query, images } => {
                let header_style = Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD);
                let body_style = Style::default().fg(Color::Magenta);
                let mut lines = vec![LineSpec::new(
                    format!("Images for \"{}\":", query),
                    header_style,
                )];

                if images.is_empty() {
                    lines.push(LineSpec::new("  ⚠️ No images could be rendered.", body_style));
                }
                for image in images {
                    lines.push(LineSpec::new(
                        format!("  {}", image.title),
                        body_style.add_modifier(Modifier::BOLD),
                    ));
                    if !image.source.is_empty() {
                        lines.push(LineSpec::new(
                            format!("    {}", image.source),
                            body_style.add_modifier(Modifier::ITALIC),
                        ));
                    }
                    lines.push(LineSpec::new(
                        format!("    thumbnail: {}", image.thumbnail_url),
                        body_style,
                    ));
                    if let Some(full_url) = &image.full_url {
                        lines.push(LineSpec::new(
                            format!("    full image: {}", full_url),
                            body_style,
                        ));
                    }
                }
                lines
            }
            ChatMessage::Info(msg) => vec![LineSpec::new(
                format!("ℹ {}", msg),
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            )],
        }
    }

    fn to_text(&self) -> Text<'static> {
        let lines = self
            .line_specs()
            .into_iter()
            .map(|spec| Line::from(Span::styled(spec.text, spec.style)))
            .collect::<Vec<_>>();
        Text::from(lines)
    }

    fn plain_lines(&self) -> Vec<String> {
        self.line_specs()
            .into_iter()
            .map(|spec| spec.text)
            .collect()
    }

    fn rendered_height(&self, width: u16) -> u16 {
        self.plain_lines()
            .iter()
            .map(|line| wrapped_height(line, width))
            .sum::<usize>() as u16
    }
}

/// Rows `line` takes when hard-wrapped at `width` columns.
fn wrapped_height(line: &str, width: u16) -> usize {
    let width = width.max(1) as usize;
    let len = line.chars().count().max(1);
    len.div_ceil(width)
}

#[derive(Debug)]
pub enum UiEvent {
    /// The reply text accumulated so far.
    Partial(String),
    TurnComplete {
        session: Session,
        reply: TurnReply,
    },
    Quit,
}

struct InputBuffer {
    lines: Vec<String>,
    cursor_x: usize,
    cursor_y: usize,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_x: 0,
            cursor_y: 0,
        }
    }

    fn clear(&mut self) {
        self.lines = vec![String::new()];
        self.cursor_x = 0;
        self.cursor_y = 0;
    }

    fn line_len(&self, y: usize) -> usize {
        self.lines[y].chars().count()
    }

    // cursor_x counts characters; String indices are bytes.
    fn byte_offset(line: &str, char_idx: usize) -> usize {
        line.char_indices()
            .nth(char_idx)
            .map(|(idx, _)| idx)
            .unwrap_or(line.len())
    }

    fn insert_char(&mut self, c: char) {
        let line = &mut self.lines[self.cursor_y];
        let offset = Self::byte_offset(line, self.cursor_x);
        line.insert(offset, c);
        self.cursor_x += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor_x > 0 {
            let line = &mut self.lines[self.cursor_y];
            let offset = Self::byte_offset(line, self.cursor_x - 1);
            line.remove(offset);
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            let prev_line = self.lines.remove(self.cursor_y);
            self.cursor_y -= 1;
            self.cursor_x = self.line_len(self.cursor_y);
            self.lines[self.cursor_y].push_str(&prev_line);
        }
    }

    fn new_line(&mut self) {
        let line = &self.lines[self.cursor_y];
        let remaining: String = line.chars().skip(self.cursor_x).collect();
        self.lines[self.cursor_y] = line.chars().take(self.cursor_x).collect();
        self.lines.insert(self.cursor_y + 1, remaining);
        self.cursor_y += 1;
        self.cursor_x = 0;
    }

    fn move_left(&mut self) {
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.line_len(self.cursor_y);
        }
    }

    fn move_right(&mut self) {
        if self.cursor_x < self.line_len(self.cursor_y) {
            self.cursor_x += 1;
        } else if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = 0;
        }
    }

    fn move_up(&mut self) {
        if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.cursor_x.min(self.line_len(self.cursor_y));
        }
    }

    fn move_down(&mut self) {
        if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = self.cursor_x.min(self.line_len(self.cursor_y));
        }
    }

    fn move_end(&mut self) {
        self.cursor_x = self.line_len(self.cursor_y);
    }

    fn to_string(&self) -> String {
        self.lines.join("\n")
    }

    fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    fn render(&self) -> Text<'static> {
        if self.is_empty() {
            return Text::from(Span::styled(
                "Type a message, /search <query> or /image <query>...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        Text::from(
            self.lines
                .iter()
                .map(|l| Line::from(l.clone()))
                .collect::<Vec<_>>(),
        )
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct App {
    input: InputBuffer,
    should_quit: bool,
    sender: mpsc::Sender<UiEvent>,
    receiver: mpsc::Receiver<UiEvent>,
    is_loading: bool,
    agent: Arc<Agent>,
    search: Arc<SearchClient>,
    // Taken by the running turn and handed back when it completes.
    session: Option<Session>,
    partial: String,
}

impl App {
    pub fn new(agent: Agent, search: SearchClient) -> Self {
        let (sender, receiver) = mpsc::channel(100);

        Self {
            input: InputBuffer::new(),
            should_quit: false,
            sender,
            receiver,
            is_loading: false,
            agent: Arc::new(agent),
            search: Arc::new(search),
            session: Some(Session::new()),
            partial: String::new(),
        }
    }

    fn draw(&mut self, f: &mut Frame) {
        let [reply_area, input_area] =
            Layout::vertical([Constraint::Length(REPLY_HEIGHT), Constraint::Length(INPUT_HEIGHT)])
                .areas(f.area());

        if self.is_loading {
            self.draw_reply(f, reply_area);
        }

        let title = if self.is_loading {
            " Input (Enter to send, Esc to quit) [Thinking...] "
        } else {
            " Input (Enter to send, Esc to quit) "
        };

        let input_paragraph = Paragraph::new(self.input.render())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .wrap(Wrap { trim: false });

        f.render_widget(input_paragraph, input_area);

        let cursor_x = (self.input.cursor_x + 1) as u16;
        let cursor_y = self.input.cursor_y as u16;
        let x = (input_area.x + cursor_x).min(input_area.x + input_area.width - 2);
        let y = (input_area.y + 1 + cursor_y).min(input_area.y + input_area.height - 2);
        f.set_cursor_position((x, y));
    }

    // Shows the tail of the reply while it streams in.
    fn draw_reply(&self, f: &mut Frame, area: Rect) {
        let inner_width = area.width.saturating_sub(2);
        let visible = area.height.saturating_sub(2) as usize;
        let total: usize = self
            .partial
            .lines()
            .map(|line| wrapped_height(line, inner_width))
            .sum();
        let scroll = total.saturating_sub(visible) as u16;

        let paragraph = Paragraph::new(self.partial.clone())
            .style(Style::default().fg(Color::Yellow))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Assistant ")
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0));

        f.render_widget(paragraph, area);
    }

    fn append_message(
        &mut self,
        terminal: &mut TuiTerminal,
        message: ChatMessage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let width = terminal.size()?.width;
        let height = message.rendered_height(width).saturating_add(1);
        let mut text = message.to_text();
        text.extend(Text::raw("\n"));
        // Insert above the inline viewport so the log stays in scrollback.
        terminal.insert_before(height, |buf| {
            let paragraph = Paragraph::new(text).wrap(Wrap { trim: false });
            paragraph.render(buf.area, buf);
        })?;
        Ok(())
    }

    fn submit(
        &mut self,
        terminal: &mut TuiTerminal,
        msg: String,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        self.append_message(terminal, ChatMessage::User(msg.clone()))?;
        self.input.clear();
        self.is_loading = true;
        self.partial.clear();

        let agent = Arc::clone(&self.agent);
        let search = Arc::clone(&self.search);
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let partial_sender = sender.clone();
            // Each update carries the whole prefix, so a dropped one is
            // covered by the next.
            let mut on_update = move |text: &str| {
                let _ = partial_sender.try_send(UiEvent::Partial(text.to_string()));
            };

            let reply = session
                .handle_turn(&msg, agent.as_ref(), search.as_ref(), &mut on_update)
                .await;
            let _ = sender.send(UiEvent::TurnComplete { session, reply }).await;
        });

        Ok(())
    }

    fn handle_events(
        &mut self,
        terminal: &mut TuiTerminal,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        while let Ok(event) = self.receiver.try_recv() {
            match event {
                UiEvent::Partial(text) => {
                    if self.is_loading {
                        self.partial = text;
                    }
                }
                UiEvent::TurnComplete { session, reply } => {
                    self.session = Some(session);
                    self.is_loading = false;
                    self.partial.clear();

                    let message = match reply {
                        TurnReply::Search(text) | TurnReply::Chat(text) => {
                            ChatMessage::Assistant(text)
                        }
                        TurnReply::Images { query, images } => {
                            ChatMessage::Images { query, images }
                        }
                    };
                    self.append_message(terminal, message)?;
                }
                UiEvent::Quit => {
                    self.should_quit = true;
                    return Ok(false);
                }
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    self.should_quit = true;
                    let _ = self.sender.try_send(UiEvent::Quit);
                    return Ok(false);
                }

                match key.code {
                    KeyCode::Esc => {
                        self.should_quit = true;
                        let _ = self.sender.try_send(UiEvent::Quit);
                        return Ok(false);
                    }
                    KeyCode::Enter => {
                        if key.modifiers.contains(KeyModifiers::SHIFT) {
                            self.input.new_line();
                        } else if !self.is_loading && !self.input.is_empty() {
                            let msg = self.input.to_string();
                            if !msg.trim().is_empty() {
                                self.submit(terminal, msg)?;
                            }
                        }
                    }
                    KeyCode::Char(c) => {
                        self.input.insert_char(c);
                    }
                    KeyCode::Backspace => {
                        self.input.delete_char();
                    }
                    KeyCode::Left => {
                        self.input.move_left();
                    }
                    KeyCode::Right => {
                        self.input.move_right();
                    }
                    KeyCode::Up => {
                        self.input.move_up();
                    }
                    KeyCode::Down => {
                        self.input.move_down();
                    }
                    KeyCode::Home => {
                        self.input.cursor_x = 0;
                    }
                    KeyCode::End => {
                        self.input.move_end();
                    }
                    _ => {}
                }
            }
        }

        Ok(true)
    }
}

pub fn run_tui(
    agent: Agent,
    search: SearchClient,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    let (_, rows) = size()?;
    if rows > 0 {
        // Push existing screen content into scrollback without clearing it.
        for _ in 0..rows {
            writeln!(stdout)?;
        }
        stdout.flush()?;
    }
    execute!(stdout, MoveTo(0, 0))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::with_options(
        backend,
        TerminalOptions {
            viewport: Viewport::Inline(REPLY_HEIGHT + INPUT_HEIGHT),
        },
    )?;

    let greeting = format!(
        "Chatting with {}. Use /search <query> for the web or /image <query> for pictures.",
        agent.model()
    );
    let mut app = App::new(agent, search);

    let _guard = TerminalGuard::new();

    app.append_message(&mut terminal, ChatMessage::Info(greeting))?;
    terminal.draw(|f| app.draw(f))?;

    while !app.should_quit {
        if !app.handle_events(&mut terminal)? {
            break;
        }

        terminal.draw(|f| app.draw(f))?;

        std::thread::sleep(Duration::from_millis(10));
    }

    disable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.flush()?;

    Ok(())
}
