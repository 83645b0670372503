//! End-to-end turns through the session with fake capabilities

mod common;

use common::{FakeDesktop, Harness};
use pika::command::Action;
use pika::desktop::Key;
use pika::learning::{JsonStore, LearningState, MemoryStore, ResponseStyle, StateStore};
use pika::listen::Heard;
use pika::session::{Flow, generic_help, not_open_message};

fn repeat_free_history(state: &mut LearningState, count: usize) {
    for i in 0..count {
        state.record(&format!("write line {}", i), "insert_text");
    }
}

#[test]
fn test_insert_into_missing_window_says_not_open() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    let turn = harness
        .session()
        .handle(&mut state, "insert \"buy milk\" to shopping");

    assert_eq!(turn.action, Action::InsertText);
    assert_eq!(harness.desktop.focused, vec![Some("shopping".to_string())]);
    assert!(harness.desktop.typed.is_empty());
    assert_eq!(harness.voice.last(), Some(not_open_message("shopping").as_str()));
    assert_eq!(harness.voice.last(), Some("shopping is not open."));

    // still learned from
    assert_eq!(state.command_history.len(), 1);
    assert_eq!(state.command_history[0].action, "insert_text");
    assert_eq!(harness.store.saves(), 1);
}

#[test]
fn test_insert_into_named_window() {
    let mut harness = Harness::new(FakeDesktop::with_windows(&["shopping"]));
    let mut state = LearningState::default();

    harness.say(&mut state, &["insert \"buy milk\" to shopping"]);

    assert_eq!(harness.desktop.typed, vec!["buy milk"]);
    assert_eq!(harness.voice.last(), Some("I have written: buy milk"));
    // a named target never launches the editor
    assert!(harness.desktop.launched.is_empty());
}

#[test]
fn test_insert_default_target_launches_editor() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    harness.say(&mut state, &["write this: hello world"]);

    assert_eq!(harness.desktop.launched, vec!["notepad.exe"]);
    assert_eq!(harness.desktop.focused, vec![None]);
    assert_eq!(harness.desktop.typed, vec!["hello world"]);
}

#[test]
fn test_insert_without_content_gives_usage() {
    let mut harness = Harness::new(FakeDesktop::with_editor());
    let mut state = LearningState::default();

    harness.say(&mut state, &["write"]);

    assert!(harness.desktop.typed.is_empty());
    assert!(harness.voice.last().unwrap().contains("Write this: your text"));
    assert_eq!(state.command_history[0].action, "insert_text");
}

#[test]
fn test_insert_with_broken_keyboard() {
    let mut desktop = FakeDesktop::with_editor();
    desktop.keyboard_broken = true;
    let mut harness = Harness::new(desktop);
    let mut state = LearningState::default();

    harness.say(&mut state, &["note buy bread"]);

    assert_eq!(harness.voice.last(), Some("I could not reach the keyboard."));
    assert_eq!(state.command_history.len(), 1);
}

#[test]
fn test_clear_all_in_todo() {
    let mut harness = Harness::new(FakeDesktop::with_windows(&["todo"]));
    let mut state = LearningState::default();

    let turn = harness.session().handle(&mut state, "clear all in todo");

    assert_eq!(turn.action, Action::ClearText);
    assert_eq!(harness.desktop.focused, vec![Some("todo".to_string())]);
    assert_eq!(
        harness.desktop.hotkeys,
        vec![Key::select_all().to_vec(), vec![Key::Backspace]]
    );
    assert_eq!(harness.voice.last(), Some("I cleared all the text in todo."));
}

#[test]
fn test_clear_missing_target() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    harness.say(&mut state, &["clear all in todo"]);

    assert!(harness.desktop.hotkeys.is_empty());
    assert_eq!(harness.voice.last(), Some("todo is not open."));
    assert_eq!(state.command_history[0].action, "clear_text");
}

#[test]
fn test_delete_word() {
    let mut harness = Harness::new(FakeDesktop::with_windows(&["todo"]));
    let mut state = LearningState::default();

    harness.say(&mut state, &["delete word in todo"]);

    assert_eq!(harness.desktop.hotkeys, vec![Key::delete_word().to_vec()]);
    assert_eq!(harness.voice.last(), Some("I deleted the last word."));
}

#[test]
fn test_goodbye_ends_after_recording() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    let turns = harness.run(&mut state, &["goodbye", "open notepad"]);

    assert_eq!(turns, 1);
    assert_eq!(harness.ears.remaining(), 1);
    assert_eq!(harness.voice.last(), Some("Goodbye! Have a nice day."));
    assert_eq!(state.command_history.len(), 1);
    assert_eq!(state.command_history[0].action, "exit");
    assert_eq!(harness.store.saves(), 1);
    assert!(harness.store.document().unwrap().contains("\"exit\""));
}

#[test]
fn test_exit_turn_reports_end() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();
    let turn = harness.session().handle(&mut state, "quit");
    assert_eq!(turn.flow, Flow::End);
    assert_eq!(turn.action, Action::Exit);
}

#[test]
fn test_startup_lines() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    harness.run(&mut state, &[]);

    assert_eq!(
        harness.voice.spoken(),
        vec!["Pika is ready to assist you.", "How can I help you today?"]
    );
}

#[test]
fn test_unknown_with_empty_table_gives_generic_help() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    let turn = harness.session().handle(&mut state, "xyz");

    assert_eq!(turn.action, Action::Unknown);
    assert_eq!(turn.advisory, None);
    assert_eq!(harness.voice.spoken(), vec![generic_help("Notepad").as_str()]);
    assert_eq!(state.command_history[0].action, "unknown_command");
}

#[test]
fn test_unknown_suggests_similar_action() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();
    state.record("read my notes", "read_notes");

    let turn = harness.session().handle(&mut state, "reed my notes");

    assert_eq!(turn.action, Action::Unknown);
    assert_eq!(
        harness.voice.spoken(),
        vec![
            "I think you want to read your notes.",
            "I'm not sure what you mean. Did you want to read your notes?",
        ]
    );
}

#[test]
fn test_advisory_does_not_change_dispatch() {
    let mut harness = Harness::new(FakeDesktop::with_editor());
    let mut state = LearningState::default();
    state.record("write a letter", "read_notes");

    let turn = harness.session().handle(&mut state, "write a letter");

    assert_eq!(
        turn.advisory.as_deref(),
        Some("I think you want to read your notes.")
    );
    assert_eq!(turn.action, Action::InsertText);
    assert_eq!(harness.desktop.typed, vec!["a letter"]);
}

#[test]
fn test_low_sensitivity_needs_closer_match() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();
    state.record("read my notes", "read_notes");
    state.user_preferences.command_sensitivity = pika::learning::Sensitivity::Low;

    // about 0.87 similar: above the normal threshold, below the low one
    let turn = harness.session().handle(&mut state, "read all my notes");
    assert_eq!(turn.advisory, None);
}

#[test]
fn test_read_notes() {
    let desktop = FakeDesktop::default()
        .note("shopping", "milk\neggs\n")
        .note("notes", "   \n");
    let mut harness = Harness::new(desktop);
    let mut state = LearningState::default();

    harness.say(
        &mut state,
        &["read the notes from shopping", "read my notes", "read notes from todo"],
    );

    assert_eq!(
        harness.voice.spoken(),
        vec![
            "Here is the text in shopping:",
            "milk\neggs",
            "notes is empty.",
            "I could not find any notes in todo.",
        ]
    );
    assert!(state.command_history.iter().all(|r| r.action == "read_notes"));
}

#[test]
fn test_open_and_close_editor() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    harness.say(
        &mut state,
        &["close notepad", "open notepad", "open the editor", "close notepad"],
    );

    assert_eq!(
        harness.voice.spoken(),
        vec![
            "Notepad is not open.",
            "I have opened Notepad for you.",
            "Notepad is already open.",
            "I think you want to close the editor.",
            "I have closed Notepad.",
        ]
    );
    assert_eq!(harness.desktop.launched, vec!["notepad.exe"]);
    assert_eq!(harness.desktop.terminated, vec!["notepad.exe"]);
}

#[test]
fn test_greeting_with_hint() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();
    state.record("open notepad", "open_editor");

    harness.say(&mut state, &["hello"]);

    assert_eq!(
        harness.voice.spoken(),
        vec![
            "Hello! I am Pika, your voice assistant.",
            "Around this time you usually ask me to open the editor.",
        ]
    );
}

#[test]
fn test_brief_style() {
    let mut harness = Harness::new(FakeDesktop::with_editor());
    let mut state = LearningState::default();
    state.record("open notepad", "open_editor");
    state.user_preferences.response_style = ResponseStyle::Brief;

    harness.say(&mut state, &["hello", "write milk"]);

    assert_eq!(
        harness.voice.spoken(),
        vec!["Hello! I am Pika, your voice assistant.", "Done."]
    );
}

#[test]
fn test_detailed_style() {
    let mut harness = Harness::new(FakeDesktop::with_editor());
    let mut state = LearningState::default();
    state.user_preferences.response_style = ResponseStyle::Detailed;

    harness.say(&mut state, &["write milk"]);

    assert_eq!(
        harness.voice.last(),
        Some("I have written: milk into Notepad.")
    );
}

#[test]
fn test_explicit_adaptation() {
    let mut harness = Harness::new(FakeDesktop::default());
    harness.options.auto_adapt_rate = false;
    let mut state = LearningState::default();

    harness.say(&mut state, &["adjust speech faster", "hello"]);

    assert_eq!(state.user_preferences.speech_rate, 170);
    assert_eq!(
        harness.voice.lines[0],
        ("Done, speech rate is now 170.".to_string(), 170)
    );
    assert_eq!(harness.voice.lines[1].1, 170);
}

#[test]
fn test_auto_adapt_slows_down_after_repeats() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();
    repeat_free_history(&mut state, 6);
    for _ in 0..3 {
        state.record("repeat that", "unknown_command");
    }
    state.user_preferences.speech_rate = 150;

    harness.say(&mut state, &["please repeat"]);

    // 10 records, 4 of them asking for a repeat
    assert_eq!(state.user_preferences.speech_rate, 140);
}

#[test]
fn test_auto_adapt_speeds_up_without_repeats() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    harness.say(&mut state, &["hello"]);
    assert_eq!(state.user_preferences.speech_rate, 155);
}

#[test]
fn test_one_record_per_turn() {
    let mut harness = Harness::new(FakeDesktop::default());
    harness.ears = common::ScriptedEars::new(vec![
        Heard::Text("open notepad".into()),
        Heard::Nothing,
        Heard::Unavailable("offline".into()),
        Heard::Text("hello".into()),
        Heard::Text("xyz".into()),
    ]);
    let mut state = LearningState::default();

    let turns = harness.session().run(&mut state);

    assert_eq!(turns, 3);
    assert_eq!(state.command_history.len(), 3);
    assert_eq!(harness.store.saves(), 3);
    let actions: Vec<_> = state
        .command_history
        .iter()
        .map(|r| r.action.as_str())
        .collect();
    assert_eq!(actions, vec!["open_editor", "greeting", "unknown_command"]);
    assert!(
        harness
            .voice
            .spoken()
            .contains(&"I can't reach the speech recognizer right now. I'll keep trying.")
    );
}

#[test]
fn test_teach_then_predict() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    harness.say(&mut state, &["learn that scribble means opening the editor"]);
    assert_eq!(
        harness.voice.last(),
        Some("Got it. When you say 'scribble', I will know you want to open the editor.")
    );
    assert!(
        state
            .command_patterns
            .get("open_editor")
            .unwrap()
            .contains(&"scribble".to_string())
    );
    assert_eq!(state.command_history[0].action, "teach_command");

    let turn = harness.session().handle(&mut state, "scribble");
    assert_eq!(
        turn.advisory.as_deref(),
        Some("I think you want to open the editor.")
    );
    assert_eq!(turn.action, Action::Unknown);
}

#[test]
fn test_teach_after_unknown_then_predict() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    harness.say(
        &mut state,
        &["scribble", "learn that scribble means opening the editor"],
    );
    assert_eq!(
        state.command_patterns.iter().next().map(|(action, _)| action),
        Some("unknown_command")
    );

    let turn = harness.session().handle(&mut state, "scribble");
    assert_eq!(
        turn.advisory.as_deref(),
        Some("I think you want to open the editor.")
    );
    assert!(
        harness
            .voice
            .spoken()
            .contains(&"I think you want to open the editor.")
    );
}

#[test]
fn test_teach_refused() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    harness.say(&mut state, &["learn that blip means dance"]);

    assert!(harness.voice.last().unwrap().starts_with("I can't learn 'dance'."));
    assert_eq!(state.command_patterns.len(), 1);
}

#[test]
fn test_preferences_statement() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();

    let turn = harness
        .session()
        .handle(&mut state, "remember that I prefer brief answers");

    assert_eq!(turn.action, Action::SetPreferences);
    assert_eq!(state.user_preferences.response_style, ResponseStyle::Brief);
}

#[test]
fn test_forget_keeps_preferences() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();
    repeat_free_history(&mut state, 5);
    state.user_preferences.speech_rate = 200;
    state.user_preferences.response_style = ResponseStyle::Detailed;

    harness.say(&mut state, &["forget everything you learned"]);

    assert_eq!(state.command_history.len(), 1);
    assert_eq!(state.command_history[0].action, "forget_learning");
    assert_eq!(state.command_patterns.len(), 1);
    assert_eq!(state.user_preferences.speech_rate, 200);
    assert_eq!(state.user_preferences.response_style, ResponseStyle::Detailed);
}

#[test]
fn test_report() {
    let mut harness = Harness::new(FakeDesktop::default());
    let mut state = LearningState::default();
    state.record("open notepad", "open_editor");

    harness.say(&mut state, &["what have you learned"]);

    assert_eq!(
        harness.voice.last(),
        Some("I remember 1 command for 1 different action. You most often ask me to open the editor.")
    );
}

#[test]
fn test_save_failure_keeps_going() {
    let mut harness = Harness::new(FakeDesktop::default());
    harness.store = MemoryStore::failing();
    let mut state = LearningState::default();

    let turns = harness.run(&mut state, &["hello", "xyz", "exit"]);

    assert_eq!(turns, 3);
    assert_eq!(state.command_history.len(), 3);
}

#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("learning.json");
    let mut state = LearningState::default();

    {
        let mut harness = Harness::new(FakeDesktop::default());
        let mut store = JsonStore::new(&path);
        let mut session = pika::session::Session::new(
            harness.options.clone(),
            &mut harness.ears,
            &mut harness.voice,
            &mut harness.desktop,
            &mut store,
        );
        session.handle(&mut state, "open notepad");
        session.handle(&mut state, "read my notes");
    }

    let reloaded = JsonStore::new(&path).load();
    assert_eq!(reloaded, state);
    assert_eq!(reloaded.command_history.len(), 2);
}
