//! Session controller - owns the widget for one conference view

use super::{
    ConfigError, LobbyPolicy, SessionConfig, SessionError, SessionNotice, SessionPhase,
    SessionSettings, SessionState,
};
use crate::widget::{
    EventSink, Inbound, KnockingParticipant, Widget, WidgetCommand, WidgetEvent, WidgetLoader,
    WidgetOptions,
};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Result of `SessionController::start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Widget constructed; events will follow
    Started,
    /// Configuration was unusable; the caller was sent home
    Redirected(ConfigError),
}

/// Input waiting to be handled by the controller
#[derive(Debug)]
pub struct SessionInput(Inbound);

/// Exclusive ownership of one widget instance.
///
/// The widget is disposed exactly once, either explicitly or on drop.
pub struct SessionHandle<W: Widget> {
    widget: W,
    disposed: bool,
}

impl<W: Widget> SessionHandle<W> {
    fn new(widget: W) -> Self {
        Self {
            widget,
            disposed: false,
        }
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.widget.dispose();
        }
    }
}

impl<W: Widget> Drop for SessionHandle<W> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Drives one conferencing session from mount to teardown
pub struct SessionController<L: WidgetLoader> {
    loader: L,
    settings: SessionSettings,

    /// Configuration of the current (or last) session
    config: Option<SessionConfig>,

    /// Live widget, if any
    handle: Option<SessionHandle<L::Widget>>,

    /// Bumped on every start so late events from an old widget are dropped
    generation: u64,

    state: watch::Sender<SessionState>,
    notices: mpsc::UnboundedSender<SessionNotice>,

    inbound_tx: mpsc::UnboundedSender<Inbound>,
    inbound_rx: mpsc::UnboundedReceiver<Inbound>,
}

impl<L: WidgetLoader> SessionController<L> {
    /// Create an idle controller
    pub fn new(
        loader: L,
        settings: SessionSettings,
        notices: mpsc::UnboundedSender<SessionNotice>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        Self {
            loader,
            settings,
            config: None,
            handle: None,
            generation: 0,
            state,
            notices,
            inbound_tx,
            inbound_rx,
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Whether a widget is currently owned
    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Start a session.
    ///
    /// An empty room id never reaches the widget: the caller is redirected
    /// home instead. A widget that fails to load leaves the session in
    /// `Initializing`.
    pub fn start(&mut self, config: SessionConfig) -> Result<StartOutcome, SessionError> {
        if let Err(reason) = config.validate() {
            tracing::warn!("Not starting session: {}", reason);
            let _ = self.notices.send(SessionNotice::Redirect {
                reason: reason.clone(),
            });
            return Ok(StartOutcome::Redirected(reason));
        }

        if self.handle.is_some() {
            tracing::warn!("Session already running; disposing previous widget first");
            self.release();
        }

        self.generation += 1;
        self.state.send_replace(SessionState::default());

        let options = WidgetOptions::for_session(&config, &self.settings.widget);
        let sink = EventSink::new(self.generation, self.inbound_tx.clone());

        tracing::info!(
            "Starting session in room '{}' as '{}' (moderator: {})",
            config.room_id(),
            config.display_name(),
            config.is_moderator()
        );

        let is_moderator = config.is_moderator();
        self.config = Some(config);

        let widget = match self
            .loader
            .load(&self.settings.widget.domain, &options, sink)
        {
            Ok(widget) => widget,
            Err(failure) => {
                tracing::warn!("Conference widget failed to load: {}", failure);
                let _ = self.notices.send(SessionNotice::LoadFailed(failure.clone()));
                return Err(SessionError::Load(failure));
            }
        };

        self.handle = Some(SessionHandle::new(widget));

        if !is_moderator {
            self.set_phase(SessionPhase::WaitingForApproval);
        }

        Ok(StartOutcome::Started)
    }

    /// Dispose the widget and end the session. Does nothing without a widget.
    pub fn stop(&mut self) {
        if self.release() {
            self.set_phase(SessionPhase::Left);
        }
    }

    /// End the session and ask the host to navigate away
    pub fn leave(&mut self) {
        self.stop();
        let _ = self.notices.send(SessionNotice::NavigateAway);
    }

    pub fn toggle_audio(&mut self) -> Result<(), SessionError> {
        self.command(WidgetCommand::ToggleAudio)
    }

    pub fn toggle_video(&mut self) -> Result<(), SessionError> {
        self.command(WidgetCommand::ToggleVideo)
    }

    pub fn toggle_screen_share(&mut self) -> Result<(), SessionError> {
        self.command(WidgetCommand::ToggleShareScreen)
    }

    pub fn toggle_chat(&mut self) -> Result<(), SessionError> {
        self.command(WidgetCommand::ToggleChat)
    }

    /// Admit or turn away a lobby guest held under `LobbyPolicy::Manual`
    pub fn answer_knocking(&mut self, participant_id: &str, approved: bool) -> Result<(), SessionError> {
        self.command(WidgetCommand::AnswerKnockingParticipant {
            id: participant_id.to_string(),
            approved,
        })?;
        self.state
            .send_modify(|s| s.knocking.retain(|p| p.id != participant_id));
        Ok(())
    }

    /// Wait for the next queued input.
    ///
    /// Cancel safe; pair with `handle_input`.
    pub async fn recv_input(&mut self) -> Option<SessionInput> {
        self.inbound_rx.recv().await.map(SessionInput)
    }

    /// Apply one input received through `recv_input`
    pub async fn handle_input(&mut self, input: SessionInput) {
        self.dispatch(input.0).await;
    }

    /// Handle everything queued so far, including anything queued while
    /// handling. Returns the number of inputs handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(inbound) = self.inbound_rx.try_recv() {
            self.dispatch(inbound).await;
            handled += 1;
        }
        handled
    }

    /// Handle inputs until the widget is released
    pub async fn run_until_left(&mut self) {
        while self.handle.is_some() {
            match self.inbound_rx.recv().await {
                Some(inbound) => self.dispatch(inbound).await,
                None => break,
            }
        }
    }

    async fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Widget { generation, event } => {
                if generation != self.generation {
                    tracing::warn!("Dropping '{}' from a disposed widget", event.name);
                    return;
                }
                // A widget that failed to load, or was already released,
                // no longer drives the session
                if self.handle.is_none() {
                    tracing::debug!("No live widget; dropping '{}'", event.name);
                    return;
                }
                match WidgetEvent::decode(&event) {
                    Ok(Some(event)) => self.apply(event).await,
                    Ok(None) => tracing::trace!("Ignoring widget event '{}'", event.name),
                    Err(e) => tracing::warn!("{}", e),
                }
            }
            Inbound::ApprovalDue {
                generation,
                participant_id,
            } => {
                if generation != self.generation || !self.phase().is_active() {
                    return;
                }
                tracing::info!("Auto-approving lobby guest {}", participant_id);
                if let Err(e) = self.command(WidgetCommand::AnswerKnockingParticipant {
                    id: participant_id,
                    approved: true,
                }) {
                    tracing::warn!("Failed to approve lobby guest: {}", e);
                }
            }
        }
    }

    async fn apply(&mut self, event: WidgetEvent) {
        let phase = self.phase();
        if phase == SessionPhase::Left {
            tracing::debug!("Session over; ignoring '{}'", event.name());
            return;
        }

        match event {
            WidgetEvent::ConferenceJoined { room_name, .. } => {
                if phase == SessionPhase::Joined {
                    return;
                }
                tracing::info!("Joined conference '{}'", room_name);
                self.set_phase(SessionPhase::Joined);
                let _ = self.notices.send(SessionNotice::Joined);

                if self.is_moderator() && self.settings.submit_moderator_password {
                    self.submit_moderator_password();
                }
                if self.settings.pin_self_on_join {
                    self.pin_self().await;
                }
            }
            WidgetEvent::ConferenceLeft { .. } => {
                tracing::info!("Conference left");
                self.finish();
            }
            WidgetEvent::ParticipantJoined { id, .. } => {
                self.state.send_modify(|s| {
                    s.participant_count = s.participant_count.saturating_add(1);
                    s.knocking.retain(|p| p.id != id);
                });
                tracing::debug!("Participant {} joined", id);
            }
            WidgetEvent::ParticipantLeft { id } => {
                self.state.send_modify(|s| {
                    s.participant_count = s.participant_count.saturating_sub(1).max(1);
                });
                tracing::debug!("Participant {} left", id);
            }
            WidgetEvent::AudioMuteStatusChanged { muted } => {
                self.state.send_modify(|s| s.audio_muted = muted);
            }
            WidgetEvent::VideoMuteStatusChanged { muted } => {
                self.state.send_modify(|s| s.video_muted = muted);
            }
            WidgetEvent::ScreenSharingStatusChanged { on } => {
                self.state.send_modify(|s| s.screen_sharing = on);
            }
            WidgetEvent::KnockingParticipant(participant) => self.on_knocking(participant),
            WidgetEvent::ParticipantKickedOut { id, local } => {
                if local {
                    tracing::info!("Removed from the conference");
                    self.finish();
                } else {
                    tracing::debug!("Participant {} was removed", id);
                }
            }
            WidgetEvent::PasswordRequired => {
                if self.is_moderator() && self.settings.submit_moderator_password {
                    self.submit_moderator_password();
                }
            }
        }
    }

    fn on_knocking(&mut self, participant: KnockingParticipant) {
        if !self.is_moderator() {
            tracing::debug!("Ignoring lobby guest {}; not a moderator", participant.id);
            return;
        }

        match self.settings.lobby {
            LobbyPolicy::AutoApprove { delay } => self.schedule_approval(participant.id, delay),
            LobbyPolicy::Manual => {
                let mut added = false;
                self.state.send_modify(|s| {
                    if !s.knocking.iter().any(|p| p.id == participant.id) {
                        s.knocking.push(participant.clone());
                        added = true;
                    }
                });
                if added {
                    let _ = self.notices.send(SessionNotice::Knocking(participant));
                }
            }
        }
    }

    fn schedule_approval(&self, participant_id: String, delay: Duration) {
        let tx = self.inbound_tx.clone();
        let generation = self.generation;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Inbound::ApprovalDue {
                generation,
                participant_id,
            });
        });
    }

    fn submit_moderator_password(&mut self) {
        if let Err(e) = self.command(WidgetCommand::Password(String::new())) {
            tracing::warn!("Failed to submit moderator password: {}", e);
        }
    }

    async fn pin_self(&mut self) {
        let Some(name) = self.config.as_ref().map(|c| c.display_name().to_string()) else {
            return;
        };
        let Some(handle) = self.handle.as_mut() else {
            return;
        };

        let participants = match handle.widget.participants_info().await {
            Ok(participants) => participants,
            Err(e) => {
                tracing::warn!("Could not list participants: {}", e);
                return;
            }
        };

        if let Some(local) = participants
            .iter()
            .find(|p| p.formatted_display_name.contains(&name))
        {
            if let Err(e) = handle.widget.pin_participant(&local.participant_id) {
                tracing::warn!("Could not pin own video: {}", e);
            }
        }
    }

    fn command(&mut self, command: WidgetCommand) -> Result<(), SessionError> {
        let handle = self.handle.as_mut().ok_or(SessionError::NotStarted)?;
        tracing::debug!("Forwarding '{}' to widget", command.name());
        handle.widget.execute_command(command)?;
        Ok(())
    }

    fn finish(&mut self) {
        self.release();
        self.set_phase(SessionPhase::Left);
        let _ = self.notices.send(SessionNotice::NavigateAway);
    }

    /// Dispose the live widget. Returns whether there was one.
    fn release(&mut self) -> bool {
        match self.handle.take() {
            Some(mut handle) => {
                handle.dispose();
                tracing::info!("Conference widget disposed");
                true
            }
            None => false,
        }
    }

    fn is_moderator(&self) -> bool {
        self.config.as_ref().is_some_and(|c| c.is_moderator())
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.state.send_if_modified(|s| {
            if s.phase == phase {
                return false;
            }
            tracing::debug!("Session phase {:?} -> {:?}", s.phase, phase);
            s.phase = phase;
            true
        });
    }
}

impl<L: WidgetLoader> Drop for SessionController<L> {
    fn drop(&mut self) {
        self.stop();
    }
}
