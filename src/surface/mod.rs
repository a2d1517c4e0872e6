//! Control surface - terminal view bound to a session controller

mod app;
mod ui;

pub use app::{action_for_key, Action, SurfaceApp};

use crate::session::{SessionController, SessionError, SessionNotice};
use crate::widget::WidgetLoader;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::time::Duration;
use tokio::sync::mpsc;

/// Whether the surface keeps running after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Forward an action to the controller
pub fn perform<L: WidgetLoader>(
    controller: &mut SessionController<L>,
    app: &mut SurfaceApp,
    action: Action,
) -> Flow {
    let result = match action {
        Action::ToggleAudio => controller.toggle_audio(),
        Action::ToggleVideo => controller.toggle_video(),
        Action::ToggleScreenShare => controller.toggle_screen_share(),
        Action::ToggleChat => controller.toggle_chat(),
        Action::ApproveKnocking | Action::RejectKnocking => {
            let approved = action == Action::ApproveKnocking;
            match controller.state().knocking.first() {
                Some(guest) => controller.answer_knocking(&guest.id, approved),
                None => Ok(()),
            }
        }
        Action::Leave => {
            controller.leave();
            return Flow::Exit;
        }
    };

    match result {
        Ok(()) => {}
        Err(SessionError::NotStarted) => {
            app.add_notification("Not connected".to_string(), Duration::from_secs(2));
        }
        Err(e) => {
            tracing::warn!("Control action failed: {}", e);
            app.add_notification(e.to_string(), Duration::from_secs(3));
        }
    }

    Flow::Continue
}

/// Run the terminal surface until the session ends or the user leaves
pub async fn run<L: WidgetLoader>(
    controller: &mut SessionController<L>,
    mut notices: mpsc::UnboundedReceiver<SessionNotice>,
) -> Result<()> {
    let Some(config) = controller.config().cloned() else {
        anyhow::bail!("No session to show");
    };

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (input_tx, mut input_rx) = mpsc::channel(100);

    // Input thread
    std::thread::spawn(move || loop {
        if let Ok(event) = event::read() {
            if input_tx.blocking_send(event).is_err() {
                break;
            }
        }
    });

    let mut app = SurfaceApp::new(&config, controller.state());
    let mut state_rx = controller.subscribe();

    let result: Result<()> = async {
        loop {
            app.expire_notifications();
            terminal.draw(|f| ui::draw(f, &app))?;

            tokio::select! {
                Some(input) = controller.recv_input() => {
                    controller.handle_input(input).await;
                }
                Some(notice) = notices.recv() => {
                    if app.on_notice(notice) {
                        break;
                    }
                }
                Some(event) = input_rx.recv() => {
                    if let Event::Key(key) = event {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if let Some(action) = action_for_key(key) {
                            if perform(controller, &mut app, action) == Flow::Exit {
                                break;
                            }
                        }
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(250)) => {}
            }

            app.session = state_rx.borrow_and_update().clone();
        }
        Ok(())
    }
    .await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
