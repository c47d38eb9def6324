//! Realtime channel behaviour as seen through the SDK.

mod common;

use serde_json::json;

use common::{create_test_widget, valid_config, wait_for_event, wait_until};
use wc_core::constants::events;
use wc_core::error::{ConnError, PresentError, WcError};
use wc_models::SessionState;
use wc_services::SdkEvent;
use wc_socket::ConnectionState;

#[tokio::test]
async fn test_send_message_frame() {
    let (widget, _backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let mut server = transport.next_connection().await.unwrap();

    let client_id = widget.send_message("hello").unwrap();

    let frame = server.recv().await.unwrap();
    assert_eq!(frame.event, events::SEND_MESSAGE);
    assert_eq!(frame.data["conversationKey"], "conv-1");
    assert_eq!(frame.data["text"], "hello");
    assert_eq!(frame.data["clientId"], client_id.as_str());
}

#[tokio::test]
async fn test_send_message_requires_session() {
    let (widget, _backend, _transport) = create_test_widget();
    let err = widget.send_message("hello").unwrap_err();
    assert!(matches!(err, WcError::Present(PresentError::NotInitialized)));
}

#[tokio::test]
async fn test_inbound_message_is_forwarded() {
    let (widget, _backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();
    let mut rx = widget.subscribe();

    server.push_event(
        events::NEW_MESSAGE,
        json!({"id": "m1", "conversationKey": "conv-1", "text": "Hi there", "sender": "bot"}),
    );

    match wait_for_event(&mut rx, |e| matches!(e, SdkEvent::MessageReceived { .. })).await {
        SdkEvent::MessageReceived {
            message_id,
            conversation_key,
            text,
            sender,
        } => {
            assert_eq!(message_id, "m1");
            assert_eq!(conversation_key, "conv-1");
            assert_eq!(text, "Hi there");
            assert_eq!(sender, "bot");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_duplicate_messages_are_dropped() {
    let (widget, _backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();
    let mut rx = widget.subscribe();

    let first = json!({"id": "m1", "conversationKey": "conv-1", "text": "one"});
    server.push_event(events::NEW_MESSAGE, first.clone());
    server.push_event(events::NEW_MESSAGE, first);
    server.push_event(
        events::NEW_MESSAGE,
        json!({"id": "m2", "conversationKey": "conv-1", "text": "two"}),
    );

    let mut ids = Vec::new();
    while ids.len() < 2 {
        if let SdkEvent::MessageReceived { message_id, .. } =
            wait_for_event(&mut rx, |e| matches!(e, SdkEvent::MessageReceived { .. })).await
        {
            ids.push(message_id);
        }
    }
    assert_eq!(ids, vec!["m1".to_string(), "m2".to_string()]);
}

#[tokio::test]
async fn test_typing_is_forwarded() {
    let (widget, _backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();
    let mut rx = widget.subscribe();

    server.push_event(
        events::TYPING,
        json!({"conversationKey": "conv-1", "typing": true}),
    );

    let event = wait_for_event(&mut rx, |e| matches!(e, SdkEvent::TypingChanged { .. })).await;
    assert!(matches!(event, SdkEvent::TypingChanged { typing: true, .. }));
}

#[tokio::test]
async fn test_conversation_closed_clears_key() {
    let (widget, backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();

    server.push_event(
        events::CONVERSATION_CLOSED,
        json!({"conversationKey": "conv-1"}),
    );
    wait_until(|| widget.session().conversation_key().is_none()).await;

    let key = widget
        .open_conversation_detail_screen_without_key()
        .await
        .unwrap();
    assert_eq!(key.as_str(), "conv-2");
    assert_eq!(backend.conversations(), 2);
}

#[tokio::test]
async fn test_reconnect_below_cap_keeps_session() {
    let (widget, _backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();

    transport.refuse_next(2, ConnError::Unreachable("still down".into()));
    server.drop_connection();

    let _second = transport.next_connection().await.unwrap();
    wait_until(|| widget.channel_state() == ConnectionState::Connected).await;

    assert_eq!(widget.session_state(), SessionState::Initialized);
    assert_eq!(widget.session().channel().epoch(), 2);
    assert_eq!(transport.attempts(), 4);
    assert_eq!(transport.closed(), 1);
}

#[tokio::test]
async fn test_messages_queued_while_reconnecting_arrive_in_order() {
    let (widget, _backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();

    transport.pause();
    server.drop_connection();
    wait_until(|| widget.channel_state() == ConnectionState::Reconnecting).await;

    for text in ["one", "two", "three"] {
        widget.send_message(text).unwrap();
    }
    transport.resume();

    let mut server = transport.next_connection().await.unwrap();
    let mut texts = Vec::new();
    while texts.len() < 3 {
        let frame = server.recv().await.unwrap();
        if frame.event == events::SEND_MESSAGE {
            texts.push(frame.data["text"].as_str().unwrap_or_default().to_string());
        }
    }
    assert_eq!(texts, vec!["one", "two", "three"]);
    assert!(widget.is_sdk_initialized());
}

#[tokio::test]
async fn test_retries_exhausted_fails_session() {
    let (widget, _backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();
    let mut rx = widget.subscribe();

    transport.refuse_next(10, ConnError::Unreachable("gone".into()));
    server.drop_connection();

    match wait_for_event(&mut rx, |e| matches!(e, SdkEvent::SessionFailed { .. })).await {
        SdkEvent::SessionFailed { error } => {
            assert_eq!(error, ConnError::RetriesExhausted { attempts: 3 });
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(
        widget.session_state(),
        SessionState::InitializationFailed(_)
    ));
    assert_eq!(widget.channel_state(), ConnectionState::Failed);
    // Initial connection plus three reconnect attempts.
    assert_eq!(transport.attempts(), 4);
    assert!(widget.send_message("too late").is_err());
}

#[tokio::test]
async fn test_auth_rejection_on_reconnect_is_fatal() {
    let (widget, _backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();
    let mut rx = widget.subscribe();

    transport.require_token(Some("rotated-token"));
    server.drop_connection();

    match wait_for_event(&mut rx, |e| matches!(e, SdkEvent::SessionFailed { .. })).await {
        SdkEvent::SessionFailed { error } => assert!(matches!(error, ConnError::AuthFailed(_))),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(transport.attempts(), 2);
}

#[tokio::test]
async fn test_failed_session_can_be_reinitialized() {
    let (widget, backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();
    let mut rx = widget.subscribe();

    transport.refuse_next(3, ConnError::Unreachable("gone".into()));
    server.drop_connection();
    wait_for_event(&mut rx, |e| matches!(e, SdkEvent::SessionFailed { .. })).await;

    widget.initialize(valid_config()).await.unwrap();
    assert!(widget.is_sdk_initialized());
    assert_eq!(widget.channel_state(), ConnectionState::Connected);
    assert_eq!(backend.validations(), 2);
}

#[tokio::test]
async fn test_frames_queued_before_failure_are_not_sent_on_next_session() {
    let (widget, _backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();
    let mut rx = widget.subscribe();

    transport.refuse_next(3, ConnError::Unreachable("gone".into()));
    transport.pause();
    server.drop_connection();
    wait_until(|| widget.channel_state() == ConnectionState::Reconnecting).await;
    widget.send_message("from old session").unwrap();
    transport.resume();
    wait_for_event(&mut rx, |e| matches!(e, SdkEvent::SessionFailed { .. })).await;

    widget.initialize(valid_config()).await.unwrap();
    let mut server = transport.next_connection().await.unwrap();
    widget.send_message("fresh").unwrap();

    let frame = loop {
        let frame = server.recv().await.unwrap();
        if frame.event == events::SEND_MESSAGE {
            break frame;
        }
    };
    assert_eq!(frame.data["text"], "fresh");
    assert_eq!(frame.data["conversationKey"], "conv-2");
}

#[tokio::test]
async fn test_message_status_is_forwarded() {
    let (widget, _backend, transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let server = transport.next_connection().await.unwrap();
    let mut rx = widget.subscribe();

    server.push_event(events::MESSAGE_STATUS, json!({"id": "m7", "status": "read"}));

    match wait_for_event(&mut rx, |e| matches!(e, SdkEvent::MessageStatusChanged { .. })).await {
        SdkEvent::MessageStatusChanged { message_id, status } => {
            assert_eq!(message_id, "m7");
            assert_eq!(status, "read");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
