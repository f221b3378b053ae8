//! Main TUI application state and logic

use crate::simulator::Simulation;
use crate::ui::panes::{
    render_memory_pane, render_stack_pane, render_status_bar, render_trace_pane,
    MemoryRenderData, MemoryScrollState, StackRenderData, StackScrollState, StatusRenderData,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Stack,
    Memory,
    Trace,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: stack -> memory -> trace)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Stack => FocusedPane::Memory,
            FocusedPane::Memory => FocusedPane::Trace,
            FocusedPane::Trace => FocusedPane::Stack,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Stack => FocusedPane::Trace,
            FocusedPane::Memory => FocusedPane::Stack,
            FocusedPane::Trace => FocusedPane::Memory,
        }
    }
}

/// The main application state
pub struct App {
    /// The simulation being replayed
    pub sim: Simulation,

    /// Scenario name for the status bar
    pub title: String,

    /// Currently focused pane
    pub focused_pane: FocusedPane,

    /// Per-pane scroll state
    pub stack_scroll: StackScrollState,
    pub memory_scroll: MemoryScrollState,
    pub trace_scroll: usize,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,
}

impl App {
    /// Create a new app replaying `sim`
    pub fn new(sim: Simulation, title: String) -> Self {
        App {
            sim,
            title,
            focused_pane: FocusedPane::Stack,
            stack_scroll: StackScrollState {
                offset: 0,
                prev_item_count: 0,
            },
            memory_scroll: MemoryScrollState {
                offset: 0,
                prev_focus: None,
            },
            trace_scroll: usize::MAX,
            should_quit: false,
            status_message: String::from("Ready!"),
            is_playing: false,
            last_play_time: Instant::now(),
            last_space_press: Instant::now()
                .checked_sub(Duration::from_secs(1))
                .unwrap_or(Instant::now()),
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            // Handle auto-play mode
            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_secs(1) {
                if self.sim.step_forward().is_ok() {
                    self.status_message = "Playing...".to_string();
                    self.trace_scroll = usize::MAX;
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Use poll with timeout to allow auto-play to work
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // 3 panes in 2 columns, plus status bar at bottom
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(size);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(main_chunks[0]);

        // Left column: Stack (top) | Trace (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        let written = self.sim.last_report().map(|r| r.written.clone());

        render_stack_pane(
            frame,
            left_rows[0],
            StackRenderData {
                stack: self.sim.stack(),
                memory: self.sim.memory(),
                convention: self.sim.convention(),
                last_return: self.sim.last_return(),
                written: written.clone(),
            },
            self.focused_pane == FocusedPane::Stack,
            &mut self.stack_scroll,
        );

        render_trace_pane(
            frame,
            left_rows[1],
            self.sim.trace(),
            self.focused_pane == FocusedPane::Trace,
            &mut self.trace_scroll,
        );

        render_memory_pane(
            frame,
            columns[1],
            MemoryRenderData {
                memory: self.sim.memory(),
                stack: self.sim.stack(),
                written,
            },
            self.focused_pane == FocusedPane::Memory,
            &mut self.memory_scroll,
        );

        render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message: &self.status_message,
                title: &self.title,
                current_step: self.sim.history_position(),
                total_steps: self.sim.total_snapshots(),
                is_playing: self.is_playing,
                hijacked: self.sim.last_return().is_some_and(|r| r.is_hijacked()),
            },
        );
    }

    /// Handle keyboard events
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1) as usize;
                let mut stepped = 0;
                for _ in 0..n {
                    if self.sim.step_forward().is_ok() {
                        stepped += 1;
                    } else {
                        break;
                    }
                }
                self.status_message = format!("Stepped forward {} step(s)", stepped);
                self.trace_scroll = usize::MAX;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.step_backward();
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.step_forward();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Stack => {
                    self.stack_scroll.offset = self.stack_scroll.offset.saturating_sub(1);
                }
                FocusedPane::Memory => {
                    self.memory_scroll.offset = self.memory_scroll.offset.saturating_sub(1);
                }
                FocusedPane::Trace => {
                    self.trace_scroll = self.trace_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Stack => {
                    self.stack_scroll.offset = self.stack_scroll.offset.saturating_add(1);
                }
                FocusedPane::Memory => {
                    self.memory_scroll.offset = self.memory_scroll.offset.saturating_add(1);
                }
                FocusedPane::Trace => {
                    self.trace_scroll = self.trace_scroll.saturating_add(1);
                }
            },
            KeyCode::Char(' ') => {
                // Toggle auto-play mode (with 200ms debounce to prevent key repeat spam)
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(Duration::from_secs(1))
                            .unwrap_or(Instant::now());
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                let _ = self.sim.jump_to_end();
                self.status_message = "Jumped to end".to_string();
                self.trace_scroll = usize::MAX;
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                let _ = self.sim.rewind_to_start();
                self.status_message = "Jumped to start".to_string();
                self.trace_scroll = usize::MAX;
            }
            _ => {}
        }
    }

    /// Step forward in the history
    fn step_forward(&mut self) {
        match self.sim.step_forward() {
            Ok(()) => {
                self.status_message = self.sim.current_label().to_string();
                // Auto-scroll trace to bottom
                self.trace_scroll = usize::MAX;
            }
            Err(message) => {
                self.status_message = format!("Cannot step forward: {}", message);
            }
        }
    }

    /// Step backward in the history
    fn step_backward(&mut self) {
        match self.sim.step_backward() {
            Ok(()) => {
                self.status_message = self.sim.current_label().to_string();
                self.trace_scroll = usize::MAX;
            }
            Err(message) => {
                self.status_message = format!("Cannot step backward: {}", message);
            }
        }
    }
}
