//! Integration tests for SessionController

use proptest::prelude::*;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use videomeet::session::{
    ConfigError, LobbyPolicy, SessionConfig, SessionController, SessionError, SessionNotice,
    SessionPhase, SessionSettings, StartOutcome,
};
use videomeet::widget::{
    EventSink, LoadFailure, ParticipantInfo, Widget, WidgetCommand, WidgetError, WidgetLoader,
    WidgetOptions,
};

#[derive(Default)]
struct Recorder {
    loads: Vec<WidgetOptions>,
    sinks: Vec<EventSink>,
    commands: Vec<WidgetCommand>,
    pinned: Vec<String>,
    disposals: usize,
}

#[derive(Clone, Default)]
struct FakeLoader {
    recorder: Arc<Mutex<Recorder>>,
    fail: Option<LoadFailure>,
}

struct FakeWidget {
    recorder: Arc<Mutex<Recorder>>,
    display_name: String,
}

impl WidgetLoader for FakeLoader {
    type Widget = FakeWidget;

    fn load(
        &mut self,
        _domain: &str,
        options: &WidgetOptions,
        events: EventSink,
    ) -> Result<FakeWidget, LoadFailure> {
        let mut recorder = self.recorder.lock().unwrap();
        // A failing widget may still hold on to the sink
        recorder.sinks.push(events);
        if let Some(failure) = &self.fail {
            return Err(failure.clone());
        }
        recorder.loads.push(options.clone());
        Ok(FakeWidget {
            recorder: self.recorder.clone(),
            display_name: options.user_info.display_name.clone(),
        })
    }
}

impl Widget for FakeWidget {
    fn execute_command(&mut self, command: WidgetCommand) -> Result<(), WidgetError> {
        self.recorder.lock().unwrap().commands.push(command);
        Ok(())
    }

    async fn participants_info(&mut self) -> Result<Vec<ParticipantInfo>, WidgetError> {
        Ok(vec![
            ParticipantInfo {
                participant_id: "remote1".into(),
                display_name: "Someone".into(),
                formatted_display_name: "Someone".into(),
            },
            ParticipantInfo {
                participant_id: "local1".into(),
                display_name: self.display_name.clone(),
                formatted_display_name: format!("{} (me)", self.display_name),
            },
        ])
    }

    fn pin_participant(&mut self, participant_id: &str) -> Result<(), WidgetError> {
        self.recorder
            .lock()
            .unwrap()
            .pinned
            .push(participant_id.to_string());
        Ok(())
    }

    fn dispose(&mut self) {
        self.recorder.lock().unwrap().disposals += 1;
    }
}

struct Harness {
    controller: SessionController<FakeLoader>,
    notices: mpsc::UnboundedReceiver<SessionNotice>,
    recorder: Arc<Mutex<Recorder>>,
}

impl Harness {
    fn new(settings: SessionSettings) -> Self {
        Self::with_loader(FakeLoader::default(), settings)
    }

    fn with_loader(loader: FakeLoader, settings: SessionSettings) -> Self {
        let recorder = loader.recorder.clone();
        let (tx, notices) = mpsc::unbounded_channel();
        Self {
            controller: SessionController::new(loader, settings, tx),
            notices,
            recorder,
        }
    }

    fn emit(&self, name: &str, payload: serde_json::Value) {
        let sink = self.recorder.lock().unwrap().sinks.last().cloned().unwrap();
        assert!(sink.emit(name, payload));
    }

    fn commands(&self) -> Vec<WidgetCommand> {
        self.recorder.lock().unwrap().commands.clone()
    }

    fn disposals(&self) -> usize {
        self.recorder.lock().unwrap().disposals
    }

    fn drain_notices(&mut self) -> Vec<SessionNotice> {
        let mut notices = Vec::new();
        while let Ok(n) = self.notices.try_recv() {
            notices.push(n);
        }
        notices
    }
}

fn guest(room: &str) -> SessionConfig {
    SessionConfig::new(room, Some("Ann".into()), false)
}

fn moderator(room: &str) -> SessionConfig {
    SessionConfig::new(room, Some("Ann".into()), true)
}

#[tokio::test]
async fn test_empty_room_id_redirects_without_widget() {
    let mut h = Harness::new(SessionSettings::default());

    for room in ["", "   "] {
        let outcome = h.controller.start(guest(room)).unwrap();
        assert_eq!(outcome, StartOutcome::Redirected(ConfigError::MissingRoomId));
    }

    assert!(h.recorder.lock().unwrap().loads.is_empty());
    assert!(!h.controller.is_live());
    assert_eq!(
        h.drain_notices()[0],
        SessionNotice::Redirect {
            reason: ConfigError::MissingRoomId
        }
    );
}

#[tokio::test]
async fn test_guest_waits_for_approval_until_joined() {
    let mut h = Harness::new(SessionSettings::default());

    assert_eq!(h.controller.start(guest("standup")).unwrap(), StartOutcome::Started);
    assert_eq!(h.controller.phase(), SessionPhase::WaitingForApproval);

    // Nothing arrives: no spurious join
    assert_eq!(h.controller.process_pending().await, 0);
    assert_eq!(h.controller.phase(), SessionPhase::WaitingForApproval);

    h.emit("videoConferenceJoined", json!({ "roomName": "standup" }));
    h.controller.process_pending().await;
    assert_eq!(h.controller.phase(), SessionPhase::Joined);
    assert!(!h.commands().contains(&WidgetCommand::Password(String::new())));
}

#[tokio::test]
async fn test_moderator_join_submits_password_and_pins_self() {
    let mut h = Harness::new(SessionSettings::default());

    h.controller.start(moderator("standup")).unwrap();
    assert_eq!(h.controller.phase(), SessionPhase::Initializing);

    let options = h.recorder.lock().unwrap().loads[0].clone();
    assert!(!options.config_overwrite.prejoin_page_enabled);
    assert_eq!(options.room_name, "standup");

    h.emit("videoConferenceJoined", json!({ "roomName": "standup", "id": "local1" }));
    h.emit("videoConferenceJoined", json!({ "roomName": "standup", "id": "local1" }));
    h.controller.process_pending().await;

    assert_eq!(h.controller.phase(), SessionPhase::Joined);
    assert_eq!(h.commands(), vec![WidgetCommand::Password(String::new())]);
    assert_eq!(h.recorder.lock().unwrap().pinned, vec!["local1".to_string()]);
    assert!(h.drain_notices().contains(&SessionNotice::Joined));
}

#[tokio::test]
async fn test_moderator_password_can_be_disabled() {
    let mut h = Harness::new(SessionSettings {
        submit_moderator_password: false,
        pin_self_on_join: false,
        ..SessionSettings::default()
    });

    h.controller.start(moderator("standup")).unwrap();
    h.emit("videoConferenceJoined", json!({}));
    h.emit("passwordRequired", json!(null));
    h.controller.process_pending().await;

    assert!(h.commands().is_empty());
    assert!(h.recorder.lock().unwrap().pinned.is_empty());
}

#[tokio::test]
async fn test_participant_count_never_below_one() {
    let mut h = Harness::new(SessionSettings::default());
    h.controller.start(guest("r")).unwrap();

    h.emit("participantLeft", json!({ "id": "x" }));
    h.emit("participantJoined", json!({ "id": "a" }));
    h.emit("participantJoined", json!({ "id": "b" }));
    h.controller.process_pending().await;
    assert_eq!(h.controller.state().participant_count, 3);

    for _ in 0..5 {
        h.emit("participantLeft", json!({ "id": "a" }));
    }
    h.controller.process_pending().await;
    assert_eq!(h.controller.state().participant_count, 1);
}

#[tokio::test]
async fn test_toggle_audio_waits_for_status_event() {
    let mut h = Harness::new(SessionSettings::default());
    h.controller.start(guest("r")).unwrap();

    h.controller.toggle_audio().unwrap();
    assert_eq!(h.commands(), vec![WidgetCommand::ToggleAudio]);
    assert!(!h.controller.state().audio_muted);

    h.emit("audioMuteStatusChanged", json!({ "muted": true }));
    h.controller.process_pending().await;
    assert!(h.controller.state().audio_muted);
}

#[tokio::test]
async fn test_media_commands_forwarded_verbatim() {
    let mut h = Harness::new(SessionSettings::default());
    h.controller.start(guest("r")).unwrap();

    h.controller.toggle_video().unwrap();
    h.controller.toggle_screen_share().unwrap();
    h.controller.toggle_chat().unwrap();

    assert_eq!(
        h.commands(),
        vec![
            WidgetCommand::ToggleVideo,
            WidgetCommand::ToggleShareScreen,
            WidgetCommand::ToggleChat
        ]
    );

    h.emit("videoMuteStatusChanged", json!({ "muted": true }));
    h.emit("screenSharingStatusChanged", json!({ "on": true }));
    h.controller.process_pending().await;
    let state = h.controller.state();
    assert!(state.video_muted);
    assert!(state.screen_sharing);
}

#[tokio::test]
async fn test_commands_require_a_session() {
    let mut h = Harness::new(SessionSettings::default());
    assert!(matches!(h.controller.toggle_audio(), Err(SessionError::NotStarted)));
    assert!(matches!(h.controller.toggle_chat(), Err(SessionError::NotStarted)));
    assert!(h.commands().is_empty());
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let mut h = Harness::new(SessionSettings::default());

    // Never started
    h.controller.stop();
    assert_eq!(h.controller.phase(), SessionPhase::Initializing);
    assert_eq!(h.disposals(), 0);

    h.controller.start(guest("r")).unwrap();
    h.controller.stop();
    h.controller.stop();

    assert_eq!(h.disposals(), 1);
    assert_eq!(h.controller.phase(), SessionPhase::Left);
    assert!(!h.controller.is_live());
}

#[tokio::test]
async fn test_teardown_while_initializing_disposes_widget() {
    let h = Harness::new(SessionSettings::default());
    let recorder = h.recorder.clone();
    let Harness { mut controller, .. } = h;

    controller.start(moderator("r")).unwrap();
    assert_eq!(controller.phase(), SessionPhase::Initializing);
    drop(controller);

    assert_eq!(recorder.lock().unwrap().disposals, 1);
}

#[tokio::test]
async fn test_load_failure_leaves_session_initializing() {
    let loader = FakeLoader {
        fail: Some(LoadFailure::EntryPointMissing),
        ..FakeLoader::default()
    };
    let mut h = Harness::with_loader(loader, SessionSettings::default());

    let result = h.controller.start(guest("r"));
    assert!(matches!(
        result,
        Err(SessionError::Load(LoadFailure::EntryPointMissing))
    ));
    assert_eq!(h.controller.phase(), SessionPhase::Initializing);
    assert!(!h.controller.is_live());
    assert_eq!(
        h.drain_notices(),
        vec![SessionNotice::LoadFailed(LoadFailure::EntryPointMissing)]
    );

    h.controller.stop();
    assert_eq!(h.controller.phase(), SessionPhase::Initializing);
}

#[tokio::test]
async fn test_failed_widget_events_are_ignored() {
    let loader = FakeLoader {
        fail: Some(LoadFailure::EntryPointMissing),
        ..FakeLoader::default()
    };
    let mut h = Harness::with_loader(loader, SessionSettings::default());
    assert!(h.controller.start(moderator("r")).is_err());

    h.emit("videoConferenceJoined", json!({ "roomName": "r" }));
    h.emit("participantJoined", json!({ "id": "a" }));
    h.emit("audioMuteStatusChanged", json!({ "muted": true }));
    assert_eq!(h.controller.process_pending().await, 3);

    let state = h.controller.state();
    assert_eq!(state.phase, SessionPhase::Initializing);
    assert_eq!(state.participant_count, 1);
    assert!(!state.audio_muted);
    assert!(!h.controller.is_live());
    assert!(!h.drain_notices().contains(&SessionNotice::Joined));
}

#[tokio::test]
async fn test_conference_left_ends_session() {
    let mut h = Harness::new(SessionSettings::default());
    h.controller.start(guest("r")).unwrap();

    h.emit("videoConferenceJoined", json!({}));
    h.emit("videoConferenceLeft", json!({ "roomName": "r" }));
    h.emit("participantJoined", json!({ "id": "late" }));
    h.controller.process_pending().await;

    assert_eq!(h.controller.phase(), SessionPhase::Left);
    assert_eq!(h.controller.state().participant_count, 1);
    assert_eq!(h.disposals(), 1);
    assert!(h.drain_notices().contains(&SessionNotice::NavigateAway));

    // Teardown after the widget already left
    h.controller.stop();
    assert_eq!(h.disposals(), 1);
}

#[tokio::test]
async fn test_kicked_out_only_ends_own_session() {
    let mut h = Harness::new(SessionSettings::default());
    h.controller.start(guest("r")).unwrap();
    h.emit("videoConferenceJoined", json!({}));

    h.emit("participantKickedOut", json!({ "kicked": { "id": "other", "local": false } }));
    h.controller.process_pending().await;
    assert_eq!(h.controller.phase(), SessionPhase::Joined);

    h.emit("participantKickedOut", json!({ "kicked": { "id": "me", "local": true } }));
    h.controller.process_pending().await;
    assert_eq!(h.controller.phase(), SessionPhase::Left);
    assert_eq!(h.disposals(), 1);
}

#[tokio::test]
async fn test_leave_signals_navigation() {
    let mut h = Harness::new(SessionSettings::default());
    h.controller.start(guest("r")).unwrap();

    h.controller.leave();

    assert_eq!(h.controller.phase(), SessionPhase::Left);
    assert_eq!(h.disposals(), 1);
    assert_eq!(h.drain_notices(), vec![SessionNotice::NavigateAway]);
}

#[tokio::test]
async fn test_malformed_event_is_dropped() {
    let mut h = Harness::new(SessionSettings::default());
    h.controller.start(guest("r")).unwrap();

    h.emit("audioMuteStatusChanged", json!({ "muted": "sure" }));
    h.emit("someOtherEvent", json!({ "x": 1 }));
    h.emit("audioMuteStatusChanged", json!({ "muted": true }));

    assert_eq!(h.controller.process_pending().await, 3);
    assert!(h.controller.state().audio_muted);
    assert_eq!(h.controller.phase(), SessionPhase::WaitingForApproval);
}

#[tokio::test]
async fn test_moderator_auto_approves_knocking_guest() {
    let mut h = Harness::new(SessionSettings {
        lobby: LobbyPolicy::AutoApprove {
            delay: Duration::from_millis(10),
        },
        submit_moderator_password: false,
        ..SessionSettings::default()
    });
    h.controller.start(moderator("r")).unwrap();

    h.emit("knockingParticipant", json!({ "participant": { "id": "g1", "name": "Guest" } }));
    h.controller.process_pending().await;
    assert!(h.commands().is_empty());

    let input = timeout(Duration::from_secs(2), h.controller.recv_input())
        .await
        .expect("approval should be scheduled")
        .unwrap();
    h.controller.handle_input(input).await;

    assert_eq!(
        h.commands(),
        vec![WidgetCommand::AnswerKnockingParticipant {
            id: "g1".into(),
            approved: true
        }]
    );
}

#[tokio::test]
async fn test_guest_ignores_knocking() {
    let mut h = Harness::new(SessionSettings {
        lobby: LobbyPolicy::AutoApprove {
            delay: Duration::from_millis(1),
        },
        ..SessionSettings::default()
    });
    h.controller.start(guest("r")).unwrap();

    h.emit("knockingParticipant", json!({ "participant": { "id": "g1", "name": "Guest" } }));
    h.controller.process_pending().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    h.controller.process_pending().await;

    assert!(h.commands().is_empty());
    assert!(h.controller.state().knocking.is_empty());
}

#[tokio::test]
async fn test_manual_lobby_policy_waits_for_answer() {
    let mut h = Harness::new(SessionSettings {
        lobby: LobbyPolicy::Manual,
        submit_moderator_password: false,
        ..SessionSettings::default()
    });
    h.controller.start(moderator("r")).unwrap();

    let knock = json!({ "participant": { "id": "g1", "name": "Guest" } });
    h.emit("knockingParticipant", knock.clone());
    h.emit("knockingParticipant", knock);
    h.controller.process_pending().await;

    let state = h.controller.state();
    assert_eq!(state.knocking.len(), 1);
    assert_eq!(state.knocking[0].name, "Guest");
    let knocks = h
        .drain_notices()
        .into_iter()
        .filter(|n| matches!(n, SessionNotice::Knocking(_)))
        .count();
    assert_eq!(knocks, 1);

    h.controller.answer_knocking("g1", false).unwrap();
    assert!(h.controller.state().knocking.is_empty());
    assert_eq!(
        h.commands(),
        vec![WidgetCommand::AnswerKnockingParticipant {
            id: "g1".into(),
            approved: false
        }]
    );
}

#[tokio::test]
async fn test_restart_disposes_previous_widget_and_drops_its_events() {
    let mut h = Harness::new(SessionSettings::default());
    h.controller.start(guest("first")).unwrap();
    let old_sink = h.recorder.lock().unwrap().sinks[0].clone();

    h.controller.start(guest("second")).unwrap();
    assert_eq!(h.disposals(), 1);
    assert_eq!(h.recorder.lock().unwrap().loads.len(), 2);

    old_sink.emit("participantJoined", json!({ "id": "ghost" }));
    h.emit("participantJoined", json!({ "id": "real" }));
    h.controller.process_pending().await;

    assert_eq!(h.controller.state().participant_count, 2);
    assert_eq!(h.controller.config().unwrap().room_id(), "second");
}

#[tokio::test]
async fn test_run_until_left_stops_on_hangup() {
    let mut h = Harness::new(SessionSettings::default());
    h.controller.start(guest("r")).unwrap();

    h.emit("videoConferenceJoined", json!({}));
    h.emit("participantJoined", json!({ "id": "a" }));
    h.emit("videoConferenceLeft", json!({}));

    timeout(Duration::from_secs(2), h.controller.run_until_left())
        .await
        .expect("run loop should finish");
    assert_eq!(h.controller.phase(), SessionPhase::Left);
}

#[tokio::test]
async fn test_state_changes_are_observable() {
    let mut h = Harness::new(SessionSettings::default());
    let mut state_rx = h.controller.subscribe();
    h.controller.start(guest("r")).unwrap();

    h.emit("participantJoined", json!({ "id": "a" }));
    h.controller.process_pending().await;

    assert!(state_rx.has_changed().unwrap());
    assert_eq!(state_rx.borrow_and_update().participant_count, 2);
}

fn count_after(events: &[bool]) -> u32 {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let mut h = Harness::new(SessionSettings::default());
        h.controller.start(guest("r")).unwrap();
        for (i, joined) in events.iter().enumerate() {
            let name = if *joined { "participantJoined" } else { "participantLeft" };
            h.emit(name, json!({ "id": format!("p{i}") }));
        }
        h.controller.process_pending().await;
        h.controller.state().participant_count
    })
}

proptest! {
    #[test]
    fn participant_count_matches_clamped_model(events in prop::collection::vec(any::<bool>(), 0..64)) {
        let mut expected = 1u32;
        for joined in &events {
            expected = if *joined { expected + 1 } else { expected.saturating_sub(1).max(1) };
        }

        let count = count_after(&events);
        prop_assert!(count >= 1);
        prop_assert_eq!(count, expected);
    }

    #[test]
    fn joins_then_leaves_return_to_one(n in 0usize..32) {
        let mut events = vec![true; n];
        events.extend(vec![false; n]);
        prop_assert_eq!(count_after(&events), 1);
    }
}
