use anyhow::Result;
use crossterm::event::{Event, EventStream};
use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use icemon_core::{Anonymizer, Registry};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::Config;
use crate::render::{render_dashboard, SourceInfo};
use crate::source::{DataSource, SourceWake, SurfaceChange};
use crate::view::{KeyOutcome, ViewState};

const STATS_INTERVAL: Duration = Duration::from_secs(1);
const MAX_DRAIN: usize = 256;

pub struct TerminalSurface {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    suspended: bool,
}

impl TerminalSurface {
    pub fn enter() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        terminal.clear()?;
        Ok(Self {
            terminal,
            suspended: false,
        })
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn apply(&mut self, change: SurfaceChange) -> Result<()> {
        match change {
            SurfaceChange::Suspend => self.suspend(),
            SurfaceChange::Resume => self.resume(),
        }
    }

    fn suspend(&mut self) -> Result<()> {
        if self.suspended {
            return Ok(());
        }
        disable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            cursor::Show
        )?;
        self.suspended = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if !self.suspended {
            return Ok(());
        }
        enable_raw_mode()?;
        execute!(
            self.terminal.backend_mut(),
            EnterAlternateScreen,
            cursor::Hide
        )?;
        self.terminal.clear()?;
        self.suspended = false;
        Ok(())
    }

    pub fn restore(mut self) -> Result<()> {
        if !self.suspended {
            disable_raw_mode()?;
            execute!(
                self.terminal.backend_mut(),
                LeaveAlternateScreen,
                cursor::Show
            )?;
        }
        self.terminal.show_cursor()?;
        Ok(())
    }
}

enum LoopStep {
    Source(SourceWake),
    Input(Option<io::Result<Event>>),
    Stats,
    Quit,
}

enum Flow {
    Continue,
    Quit,
}

struct Signals {
    interrupt: Signal,
    terminate: Signal,
}

pub async fn run(config: Config) -> Result<()> {
    let mut registry = Registry::new();
    let mut view = ViewState::new(Anonymizer::new(config.anonymize));
    let mut source = DataSource::from_mode(config.mode);
    let mut signals = Signals {
        interrupt: signal(SignalKind::interrupt())?,
        terminate: signal(SignalKind::terminate())?,
    };

    let mut surface = TerminalSurface::enter()?;
    let result = event_loop(
        &mut surface,
        &mut registry,
        &mut view,
        &mut source,
        &mut signals,
    )
    .await;
    surface.restore()?;
    result
}

async fn event_loop(
    surface: &mut TerminalSurface,
    registry: &mut Registry,
    view: &mut ViewState,
    source: &mut DataSource,
    signals: &mut Signals,
) -> Result<()> {
    let mut input = EventStream::new();
    let mut stats = time::interval(STATS_INTERVAL);
    stats.set_missed_tick_behavior(MissedTickBehavior::Skip);

    if let Some(change) = source.start(registry) {
        surface.apply(change)?;
    }
    registry.request_redraw();

    loop {
        if !surface.is_suspended() && registry.take_redraw() {
            let info = SourceInfo {
                scheduler: source.scheduler_name(),
                net_name: source.net_name(),
            };
            surface.terminal.draw(|frame| {
                let area = frame.size();
                render_dashboard(
                    frame.buffer_mut(),
                    area,
                    registry,
                    view,
                    &info,
                    Instant::now(),
                );
            })?;
        }

        let step = tokio::select! {
            wake = source.wait() => LoopStep::Source(wake),
            event = input.next() => LoopStep::Input(event),
            _ = stats.tick() => LoopStep::Stats,
            _ = signals.interrupt.recv() => LoopStep::Quit,
            _ = signals.terminate.recv() => LoopStep::Quit,
        };
        if let Flow::Quit = handle_step(step, surface, registry, view, source)? {
            return Ok(());
        }

        // Everything that is already ready goes into the same frame.
        for _ in 0..MAX_DRAIN {
            let step = tokio::select! {
                biased;
                event = input.next() => LoopStep::Input(event),
                wake = source.wait() => LoopStep::Source(wake),
                _ = std::future::ready(()) => break,
            };
            if let Flow::Quit = handle_step(step, surface, registry, view, source)? {
                return Ok(());
            }
        }
    }
}

fn handle_step(
    step: LoopStep,
    surface: &mut TerminalSurface,
    registry: &mut Registry,
    view: &mut ViewState,
    source: &mut DataSource,
) -> Result<Flow> {
    match step {
        LoopStep::Source(wake) => {
            if let Some(change) = source.service(wake, registry) {
                surface.apply(change)?;
                registry.request_redraw();
            }
        }
        LoopStep::Input(Some(Ok(Event::Key(key)))) => match view.handle_key(key, registry) {
            KeyOutcome::Quit => return Ok(Flow::Quit),
            KeyOutcome::Passthrough(key) => {
                source.on_input(key, registry);
            }
            KeyOutcome::Redraw | KeyOutcome::Ignored => {}
        },
        LoopStep::Input(Some(Ok(Event::Resize(_, _)))) => registry.request_redraw(),
        LoopStep::Input(Some(Ok(_))) => {}
        LoopStep::Input(Some(Err(err))) => warn!("terminal_input_error: {err}"),
        LoopStep::Input(None) => {
            info!("terminal_input_closed");
            return Ok(Flow::Quit);
        }
        LoopStep::Stats => registry.request_redraw(),
        LoopStep::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}
