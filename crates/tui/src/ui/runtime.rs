//! Runtime: terminal lifecycle and the unified event loop.
//!
//! One `select!` multiplexes terminal input, widget completions and poll
//! ticks (via [`WidgetDriver::next_message`]) and Ctrl+C. A frame is drawn
//! after every event so status changes show up as soon as they happen.
//!
//! The widget is activated when the loop starts and deactivated on the way
//! out, so no request outlives the screen.
use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use ratatui::{Terminal, prelude::*};
use tokio::signal;
use tracing::{debug, info};

use advisory_api::VariableApi;

use super::theme::{self, Theme};
use super::widget_component::{Action, WidgetComponent};
use crate::widget::{WidgetDriver, WidgetError, WidgetView};

type Backend = CrosstermBackend<std::io::Stdout>;

/// Put the terminal into raw mode and enter the alternate screen.
fn setup_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(terminal)
}

/// Restore terminal settings and leave the alternate screen.
fn cleanup_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn render<A: VariableApi + 'static>(
    terminal: &mut Terminal<Backend>,
    driver: &WidgetDriver<A>,
    component: &WidgetComponent,
    theme: &dyn Theme,
) -> Result<()> {
    let view = WidgetView::from_controller(driver.controller());
    terminal.draw(|frame| component.render(frame, frame.area(), &view, theme))?;
    Ok(())
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Entry point for the TUI runtime: sets up the terminal, activates the
/// widget, runs the event loop and performs cleanup on exit.
pub async fn run_app<A: VariableApi + 'static>(mut driver: WidgetDriver<A>) -> Result<()> {
    let theme = theme::load_from_env();
    let mut component = WidgetComponent::default();
    let mut terminal = setup_terminal()?;

    driver.activate();
    let outcome = event_loop(&mut terminal, &mut driver, &mut component, theme.as_ref()).await;
    driver.deactivate();

    cleanup_terminal(&mut terminal)?;
    info!("terminal session closed");
    outcome
}

async fn event_loop<A: VariableApi + 'static>(
    terminal: &mut Terminal<Backend>,
    driver: &mut WidgetDriver<A>,
    component: &mut WidgetComponent,
    theme: &dyn Theme,
) -> Result<()> {
    let mut events = EventStream::new();
    loop {
        render(terminal, driver, component, theme)?;

        tokio::select! {
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if is_ctrl_c(&key) {
                            break;
                        }
                        let editing = driver.controller().state().edit_open;
                        if let Some(action) = component.handle_key(key, editing)
                            && apply_action(driver, component, action)
                        {
                            break;
                        }
                    }
                    // Resize and focus events only need a redraw.
                    Some(Ok(_)) => {}
                    Some(Err(error)) => return Err(error.into()),
                    // Input stream closed; shut down cleanly.
                    None => break,
                }
            }
            Some(msg) = driver.next_message() => driver.dispatch(msg),
            _ = signal::ctrl_c() => break,
        }
    }
    Ok(())
}

/// Perform an operator action. Returns `true` when the session should end.
fn apply_action<A: VariableApi + 'static>(driver: &mut WidgetDriver<A>, component: &mut WidgetComponent, action: Action) -> bool {
    let outcome = match action {
        Action::Quit => return true,
        Action::Refresh => driver.refresh(),
        Action::ToggleEdit => driver.toggle_edit().map(|()| {
            let state = driver.controller().state();
            if state.edit_open {
                component.load_draft(&state.draft_value);
            }
        }),
        Action::CancelEdit => {
            driver.cancel_edit();
            Ok(())
        }
        Action::DraftEdited => {
            driver.set_draft(component.draft().to_string());
            Ok(())
        }
        Action::Save => {
            let draft = component.draft().to_string();
            driver.save(&draft)
        }
    };

    match outcome {
        Ok(()) => {}
        // Already reflected in the widget's error line.
        Err(error @ (WidgetError::Validation(_) | WidgetError::Api(_))) => debug!(%error, ?action, "action rejected"),
        Err(error) => {
            debug!(%error, ?action, "action rejected");
            component.set_notice(error.to_string());
        }
    }
    false
}
