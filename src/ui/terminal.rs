use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::debug;

use super::app::App;

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// How long to block waiting for input before redrawing.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Put the terminal into raw mode, run the draw loop until the user quits,
/// then restore the terminal even if the loop errored out.
pub fn run_app(app: &mut App) -> Result<()> {
    let mut terminal = init_terminal()?;
    let outcome = event_loop(&mut terminal, app);
    restore_terminal(&mut terminal)?;
    debug!("draw loop finished");
    outcome
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode().context("could not enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("could not enter the alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("could not create the terminal backend")
}

fn event_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    loop {
        terminal
            .draw(|frame| app.draw(frame))
            .context("drawing a frame failed")?;

        if !event::poll(POLL_INTERVAL).context("polling for input failed")? {
            continue;
        }

        if let Event::Key(key_event) = event::read().context("reading an input event failed")? {
            if key_event.kind != KeyEventKind::Press {
                continue;
            }

            // Ctrl+S saves whichever form is open; plain Enter stays free
            // for line breaks inside the lyrics field.
            if key_event.modifiers.contains(KeyModifiers::CONTROL) {
                if let KeyCode::Char('s') = key_event.code {
                    app.handle_ctrl_s()?;
                    continue;
                }
            }

            if app.handle_key(key_event.code)? {
                return Ok(());
            }
        }
    }
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("could not disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("could not leave the alternate screen")?;
    terminal
        .show_cursor()
        .context("could not restore cursor visibility")
}
