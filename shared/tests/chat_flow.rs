use crux_core::testing::AppTester;
use serde_json::json;
use shared::capabilities::{HttpError, RawResponse};
use shared::prompts::{CHAT_CONNECTION_FALLBACK, CHAT_EMPTY_ANSWER};
use shared::{App, ChatRole, Effect, Event, Model, Screen};

fn reply(text: &str) -> RawResponse {
    RawResponse::ok_json(&json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    }))
    .unwrap()
}

/// App sitting on the results screen of a freshly analysed report.
fn on_results() -> (AppTester<App, Effect>, Model) {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    app.update(
        Event::Configure {
            api_key: "test-key".into(),
            model: None,
            base_url: None,
        },
        &mut model,
    );
    app.update(
        Event::ReportSelected {
            bytes: vec![0xFF, 0xD8, 0xFF],
            mime_type: "image/jpeg".into(),
        },
        &mut model,
    );
    let record = json!({
        "reportType": "Thyroid Panel",
        "summary": "TSH is slightly elevated.",
        "parameters": [],
        "redFlags": [],
        "lifestyleRecommendations": [],
        "disclaimer": "Not medical advice."
    });
    let session = model.session.clone().unwrap();
    app.update(
        Event::AnalysisCompleted {
            session,
            result: Ok(reply(&record.to_string())),
        },
        &mut model,
    );
    assert_eq!(model.screen, Screen::Results);
    (app, model)
}

#[test]
fn whitespace_message_is_a_no_op() {
    let (app, mut model) = on_results();
    app.update(Event::ChatInputChanged { text: "   \n\t".into() }, &mut model);

    let update = app.update(Event::SendChatMessage, &mut model);

    assert!(update.effects.is_empty());
    assert_eq!(model.transcript.len(), 1);
    assert!(!model.chat_pending);
}

#[test]
fn question_and_answer_are_appended() {
    let (app, mut model) = on_results();
    app.update(Event::ChatInputChanged { text: "What is TSH?".into() }, &mut model);

    let update = app.update(Event::SendChatMessage, &mut model);

    let request = update
        .effects
        .iter()
        .find_map(|e| match e {
            Effect::Http(req) => Some(req.operation.clone()),
            _ => None,
        })
        .expect("chat should issue an HTTP request");
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    let contents = body["contents"].as_array().unwrap();
    // greeting, then the new question
    assert_eq!(contents.len(), 2);
    assert_eq!(contents[1]["parts"][0]["text"], "What is TSH?");
    assert!(body["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Report Type: Thyroid Panel"));

    assert!(model.chat_pending);
    assert!(model.chat_input.is_empty());
    assert_eq!(model.transcript.len(), 2);
    assert_eq!(model.transcript.last().unwrap().role, ChatRole::User);

    let session = model.session.clone().unwrap();
    app.update(
        Event::ChatReplyReceived {
            session,
            result: Ok(reply("It is a hormone that controls your thyroid.")),
        },
        &mut model,
    );

    assert!(!model.chat_pending);
    assert_eq!(model.transcript.len(), 3);
    let last = model.transcript.last().unwrap();
    assert_eq!(last.role, ChatRole::Model);
    assert_eq!(last.text, "It is a hormone that controls your thyroid.");
}

#[test]
fn failed_chat_appends_exactly_one_fallback() {
    let (app, mut model) = on_results();
    app.update(Event::ChatInputChanged { text: "Is this bad?".into() }, &mut model);
    app.update(Event::SendChatMessage, &mut model);
    let session = model.session.clone().unwrap();

    app.update(
        Event::ChatReplyReceived {
            session,
            result: Err(HttpError::NetworkError {
                message: "timeout".into(),
            }),
        },
        &mut model,
    );

    assert_eq!(model.screen, Screen::Results);
    assert!(model.active_error.is_none());
    assert_eq!(model.transcript.len(), 3);
    assert_eq!(model.transcript.last().unwrap().text, CHAT_CONNECTION_FALLBACK);
    assert!(!model.chat_pending);
}

#[test]
fn empty_reply_uses_apology() {
    let (app, mut model) = on_results();
    app.update(Event::ChatInputChanged { text: "Anything else?".into() }, &mut model);
    app.update(Event::SendChatMessage, &mut model);
    let session = model.session.clone().unwrap();

    app.update(
        Event::ChatReplyReceived {
            session,
            result: Ok(RawResponse::new(200, b"{\"candidates\": []}".to_vec())),
        },
        &mut model,
    );

    assert_eq!(model.transcript.last().unwrap().text, CHAT_EMPTY_ANSWER);
}

#[test]
fn sending_while_pending_is_ignored() {
    let (app, mut model) = on_results();
    app.update(Event::ChatInputChanged { text: "First".into() }, &mut model);
    app.update(Event::SendChatMessage, &mut model);
    app.update(Event::ChatInputChanged { text: "Second".into() }, &mut model);

    let update = app.update(Event::SendChatMessage, &mut model);

    assert!(update.effects.is_empty());
    assert_eq!(model.transcript.len(), 2);
    assert_eq!(model.chat_input, "Second");
}

#[test]
fn reply_for_closed_session_is_dropped() {
    let (app, mut model) = on_results();
    app.update(Event::ChatInputChanged { text: "Hello?".into() }, &mut model);
    app.update(Event::SendChatMessage, &mut model);
    let session = model.session.clone().unwrap();

    app.update(Event::NewUpload, &mut model);
    app.update(
        Event::ChatReplyReceived {
            session,
            result: Ok(reply("late answer")),
        },
        &mut model,
    );

    assert!(model.transcript.is_empty());
    assert_eq!(model.screen, Screen::Upload);
}

#[test]
fn going_home_from_results_drops_chat_and_record() {
    let (app, mut model) = on_results();
    app.update(Event::ChatInputChanged { text: "What now?".into() }, &mut model);
    app.update(Event::SendChatMessage, &mut model);
    assert!(model.chat_pending);
    let session = model.session.clone().unwrap();

    app.update(Event::GoHome, &mut model);

    assert_eq!(model.screen, Screen::Home);
    assert!(model.analysis.is_none());
    assert!(model.transcript.is_empty());
    assert!(!model.chat_pending);
    assert!(model.active_error.is_none());

    let update = app.update(
        Event::ChatReplyReceived {
            session,
            result: Ok(reply("too late")),
        },
        &mut model,
    );

    assert!(update.effects.is_empty());
    assert!(model.transcript.is_empty());
    assert_eq!(model.screen, Screen::Home);
}
