//! Conversation presentation integration tests.

mod common;

use std::time::Duration;

use common::{create_test_widget, valid_config, wait_for_event};
use wc_core::error::PresentError;
use wc_models::{ConversationKey, ResolvedTheme, ScreenKind, WidgetTheme};
use wc_services::SdkEvent;

#[tokio::test]
async fn test_launch_requires_initialized_session() {
    let (widget, backend, _transport) = create_test_widget();

    assert_eq!(
        widget.launch_conversation_list_full_screen().unwrap_err(),
        PresentError::NotInitialized
    );
    assert_eq!(
        widget.launch_conversation_list_bottom_sheet().unwrap_err(),
        PresentError::NotInitialized
    );
    assert_eq!(
        widget.launch_conversation("conv-9").unwrap_err(),
        PresentError::NotInitialized
    );
    assert_eq!(
        widget
            .open_conversation_detail_screen_without_key()
            .await
            .unwrap_err(),
        PresentError::NotInitialized
    );
    assert_eq!(
        widget.present_bottom_sheet_conversation_list().unwrap_err(),
        PresentError::NotInitialized
    );
    assert_eq!(backend.conversations(), 0);
}

#[tokio::test]
async fn test_launch_screens() {
    let (widget, _backend, _transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();

    let full = widget.launch_conversation_list_full_screen().unwrap();
    assert_eq!(full.kind, ScreenKind::ConversationListFullScreen);
    assert_eq!(full.bot_id, "b1");
    assert!(full.is_conversation_list());
    assert_eq!(full.theme, ResolvedTheme::default());

    let sheet = widget.launch_conversation_list_bottom_sheet().unwrap();
    assert_eq!(sheet.kind, ScreenKind::ConversationListBottomSheet);
    assert_ne!(sheet.id, full.id);

    let detail = widget.launch_conversation("conv-9").unwrap();
    assert_eq!(detail.kind, ScreenKind::ConversationDetail);
    assert_eq!(detail.conversation_key, Some(ConversationKey::new("conv-9")));
}

#[tokio::test]
async fn test_launch_conversation_rejects_blank_id() {
    let (widget, _backend, _transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();

    assert!(matches!(
        widget.launch_conversation("  ").unwrap_err(),
        PresentError::KeyUnavailable(_)
    ));
}

#[tokio::test]
async fn test_without_key_returns_cached_key() {
    let (widget, backend, _transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    assert_eq!(backend.conversations(), 1);

    for _ in 0..3 {
        let key = widget
            .open_conversation_detail_screen_without_key()
            .await
            .unwrap();
        assert_eq!(key.as_str(), "conv-1");
    }
    assert_eq!(backend.conversations(), 1);
}

#[tokio::test]
async fn test_without_key_concurrent_callers_share_one_request() {
    let (widget, backend, _transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    widget.session().clear_conversation_key();
    backend.set_delay(Duration::from_millis(30));

    let (a, b) = tokio::join!(
        widget.open_conversation_detail_screen_without_key(),
        widget.open_conversation_detail_screen_without_key()
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "conv-2");
    assert_eq!(backend.conversations(), 2);
    assert_eq!(widget.session().conversation_key(), Some(a));
}

#[tokio::test]
async fn test_without_key_failure() {
    let (widget, backend, _transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    widget.session().clear_conversation_key();
    backend.fail_conversations("unavailable");

    let err = widget
        .open_conversation_detail_screen_without_key()
        .await
        .unwrap_err();
    assert!(matches!(err, PresentError::KeyUnavailable(_)));
    assert_eq!(widget.session().conversation_key(), None);
}

#[tokio::test]
async fn test_screens_snapshot_theme() {
    let (widget, _backend, _transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();

    widget
        .set_theme(WidgetTheme::default().with_accent_primary("#112233"))
        .unwrap();
    let before = widget.launch_conversation_list_full_screen().unwrap();

    widget
        .set_theme(WidgetTheme::default().with_accent_primary("#445566"))
        .unwrap();
    let after = widget.launch_conversation_list_full_screen().unwrap();

    assert_eq!(before.theme.accent_primary.to_string(), "#112233");
    assert_eq!(after.theme.accent_primary.to_string(), "#445566");
}

#[tokio::test]
async fn test_present_bottom_sheet_emits_event() {
    let (widget, _backend, _transport) = create_test_widget();
    widget.initialize(valid_config()).await.unwrap();
    let mut rx = widget.subscribe();

    let descriptor = widget.present_bottom_sheet_conversation_list().unwrap();

    let event = wait_for_event(&mut rx, |e| matches!(e, SdkEvent::ScreenPresented { .. })).await;
    match event {
        SdkEvent::ScreenPresented { descriptor: shown } => assert_eq!(shown.id, descriptor.id),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(widget.presented_screens().len(), 1);
    assert_eq!(
        widget.presented_screens()[0].kind,
        ScreenKind::ConversationListBottomSheet
    );
}
