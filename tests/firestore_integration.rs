// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running:
//!   FIRESTORE_EMULATOR_HOST=localhost:8080 cargo test
//!
//! Each test uses unique uids so runs do not interfere with each other.

use corazon::models::{HeartStatus, OnlineStatus, User};
use corazon::services::{ChatService, MatchService};
use std::time::Duration;

mod common;
use common::test_db;

/// Generate a unique uid for test isolation.
fn unique_uid(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{prefix}-{nanos}")
}

/// Helper to create a basic test user.
fn test_user(uid: &str, age: u32) -> User {
    User {
        uid: uid.to_string(),
        username: uid.to_string(),
        email: format!("{uid}@example.com"),
        name: format!("Test {uid}"),
        age,
        location: "Madrid".to_string(),
        gender_identity: "woman".to_string(),
        sexual_orientation: "straight".to_string(),
        bio: "Hola".to_string(),
        interests: vec!["cine".to_string()],
        preferred_language: Some("es".to_string()),
        profile_photo: None,
        additional_photos: vec![],
        private_album: vec![],
        age_preference: None,
        liked_users: vec![],
        passed_users: vec![],
        matches: vec![],
        blocked_users: vec![],
        received_hearts: vec![],
        is_online: false,
        online_status: OnlineStatus::Offline,
        last_active: "2026-01-15T10:00:00.000Z".to_string(),
        created_at: "2026-01-15T10:00:00.000Z".to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// USER TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_user_crud() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("user");

    let before = db.get_user(&uid).await.unwrap();
    assert!(before.is_none(), "User should not exist before creation");

    let user = test_user(&uid, 28);
    db.upsert_user(&user).await.unwrap();

    let fetched = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(fetched.uid, uid);
    assert_eq!(fetched.age, 28);
    assert_eq!(fetched.location, "Madrid");
    assert_eq!(fetched.online_status, OnlineStatus::Offline);

    // Update keeps identity fields
    let mut updated = fetched.clone();
    updated.bio = "Nueva bio".to_string();
    updated.interests.push("senderismo".to_string());
    db.upsert_user(&updated).await.unwrap();

    let fetched = db.get_user(&uid).await.unwrap().unwrap();
    assert_eq!(fetched.bio, "Nueva bio");
    assert_eq!(fetched.interests.len(), 2);
    assert_eq!(fetched.created_at, user.created_at);

    println!("✓ User CRUD verified: uid={}", uid);
}

#[tokio::test]
async fn test_presence_update_patches_user() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("presence");
    db.upsert_user(&test_user(&uid, 30)).await.unwrap();

    let update = corazon::models::PresenceUpdate::new(
        OnlineStatus::Online,
        "2026-02-01T12:00:00.000Z".to_string(),
    );
    db.update_presence(&uid, &update).await.unwrap();

    let fetched = db.get_user(&uid).await.unwrap().unwrap();
    assert!(fetched.is_online);
    assert_eq!(fetched.online_status, OnlineStatus::Online);
    assert_eq!(fetched.last_active, "2026-02-01T12:00:00.000Z");
    // Rest of the profile untouched
    assert_eq!(fetched.location, "Madrid");

    println!("✓ Presence update verified: uid={}", uid);
}

// ═══════════════════════════════════════════════════════════════════════════
// MATCH ENGINE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_mutual_hearts_create_match() {
    require_emulator!();

    let db = test_db().await;
    let matching = MatchService::new(db.clone());

    let uid_a = unique_uid("ana");
    let uid_b = unique_uid("bea");
    db.upsert_user(&test_user(&uid_a, 26)).await.unwrap();
    db.upsert_user(&test_user(&uid_b, 29)).await.unwrap();

    // First heart: no match yet
    let ana = db.get_user(&uid_a).await.unwrap().unwrap();
    let outcome = matching.send_heart(&ana, &uid_b).await.unwrap();
    assert!(!outcome.is_match);
    assert!(outcome.matched_user.is_none());

    let heart = db.get_heart(&uid_a, &uid_b).await.unwrap().unwrap();
    assert_eq!(heart.status, HeartStatus::Sent);

    // Reverse heart completes the match
    let bea = db.get_user(&uid_b).await.unwrap().unwrap();
    assert!(bea.liked_users.is_empty());
    let outcome = matching.send_heart(&bea, &uid_a).await.unwrap();
    assert!(outcome.is_match);
    assert_eq!(outcome.matched_user.unwrap().id, uid_a);

    // Both hearts flipped, match record exists
    let heart_ab = db.get_heart(&uid_a, &uid_b).await.unwrap().unwrap();
    let heart_ba = db.get_heart(&uid_b, &uid_a).await.unwrap().unwrap();
    assert_eq!(heart_ab.status, HeartStatus::Matched);
    assert_eq!(heart_ba.status, HeartStatus::Matched);

    let match_record = db.get_match(&uid_a, &uid_b).await.unwrap().unwrap();
    assert_eq!(match_record.users.len(), 2);
    assert!(match_record.last_message.is_none());

    // Both list mirrors updated
    let ana = db.get_user(&uid_a).await.unwrap().unwrap();
    let bea = db.get_user(&uid_b).await.unwrap().unwrap();
    assert!(ana.has_matched(&uid_b));
    assert!(bea.has_matched(&uid_a));

    println!("✓ Mutual hearts matched: {} <-> {}", uid_a, uid_b);
}

#[tokio::test]
async fn test_resent_heart_is_idempotent() {
    require_emulator!();

    let db = test_db().await;
    let matching = MatchService::new(db.clone());

    let uid_a = unique_uid("carla");
    let uid_b = unique_uid("diego");
    db.upsert_user(&test_user(&uid_a, 31)).await.unwrap();
    db.upsert_user(&test_user(&uid_b, 33)).await.unwrap();

    let carla = db.get_user(&uid_a).await.unwrap().unwrap();
    matching.send_heart(&carla, &uid_b).await.unwrap();
    let first = db.get_heart(&uid_a, &uid_b).await.unwrap().unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;

    // Re-send: still no match, original timestamp kept
    let carla = db.get_user(&uid_a).await.unwrap().unwrap();
    let outcome = matching.send_heart(&carla, &uid_b).await.unwrap();
    assert!(!outcome.is_match);

    let resent = db.get_heart(&uid_a, &uid_b).await.unwrap().unwrap();
    assert_eq!(resent.created_at, first.created_at);

    let carla = db.get_user(&uid_a).await.unwrap().unwrap();
    assert_eq!(
        carla.liked_users.iter().filter(|u| **u == uid_b).count(),
        1,
        "Mirror array must not grow on re-send"
    );

    println!("✓ Heart re-send idempotent: {} -> {}", uid_a, uid_b);
}

#[tokio::test]
async fn test_pass_and_discovery_exclusion() {
    require_emulator!();

    let db = test_db().await;
    let matching = MatchService::new(db.clone());

    let uid_a = unique_uid("eva");
    let uid_b = unique_uid("fran");
    db.upsert_user(&test_user(&uid_a, 27)).await.unwrap();
    db.upsert_user(&test_user(&uid_b, 27)).await.unwrap();

    let eva = db.get_user(&uid_a).await.unwrap().unwrap();
    matching.pass_profile(&eva, &uid_b).await.unwrap();

    let eva = db.get_user(&uid_a).await.unwrap().unwrap();
    assert!(eva.passed_users.contains(&uid_b));

    let profiles = matching
        .discover(
            &eva,
            corazon::services::DiscoveryFilters::default(),
            Duration::from_secs(900),
        )
        .await
        .unwrap();
    let ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
    assert!(!ids.contains(&uid_a.as_str()), "Discovery must exclude self");
    assert!(
        !ids.contains(&uid_b.as_str()),
        "Discovery must exclude passed users"
    );

    println!("✓ Pass and discovery exclusion verified: {}", uid_a);
}

#[tokio::test]
async fn test_block_destroys_match() {
    require_emulator!();

    let db = test_db().await;
    let matching = MatchService::new(db.clone());

    let uid_a = unique_uid("hugo");
    let uid_b = unique_uid("ines");
    db.upsert_user(&test_user(&uid_a, 35)).await.unwrap();
    db.upsert_user(&test_user(&uid_b, 34)).await.unwrap();

    // Build a match first
    let hugo = db.get_user(&uid_a).await.unwrap().unwrap();
    matching.send_heart(&hugo, &uid_b).await.unwrap();
    let ines = db.get_user(&uid_b).await.unwrap().unwrap();
    matching.send_heart(&ines, &uid_a).await.unwrap();
    assert!(db.get_match(&uid_a, &uid_b).await.unwrap().is_some());

    // Block from one side
    let hugo = db.get_user(&uid_a).await.unwrap().unwrap();
    matching.block_user(&hugo, &uid_b).await.unwrap();

    assert!(
        db.get_match(&uid_a, &uid_b).await.unwrap().is_none(),
        "Block must destroy the match"
    );

    let hugo = db.get_user(&uid_a).await.unwrap().unwrap();
    let ines = db.get_user(&uid_b).await.unwrap().unwrap();
    assert!(hugo.blocked_users.contains(&uid_b));
    assert!(!hugo.has_matched(&uid_b));
    assert!(!ines.has_matched(&uid_a), "Both sides lose the match");

    // Unblock does not resurrect the match
    matching.unblock_user(&hugo, &uid_b).await.unwrap();
    let hugo = db.get_user(&uid_a).await.unwrap().unwrap();
    assert!(!hugo.blocked_users.contains(&uid_b));
    assert!(db.get_match(&uid_a, &uid_b).await.unwrap().is_none());

    println!("✓ Block/unblock verified: {} x {}", uid_a, uid_b);
}

#[tokio::test]
async fn test_heart_notes_inbox() {
    require_emulator!();

    let db = test_db().await;
    let matching = MatchService::new(db.clone());

    let uid_a = unique_uid("juan");
    let uid_b = unique_uid("kira");
    db.upsert_user(&test_user(&uid_a, 24)).await.unwrap();
    db.upsert_user(&test_user(&uid_b, 25)).await.unwrap();

    let juan = db.get_user(&uid_a).await.unwrap().unwrap();
    // Empty message falls back to the default note
    matching
        .send_heart_note(&juan, &uid_b, Some("   ".to_string()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    matching
        .send_heart_note(&juan, &uid_b, Some("Me encanta tu perfil".to_string()))
        .await
        .unwrap();

    let kira = db.get_user(&uid_b).await.unwrap().unwrap();
    assert_eq!(kira.received_hearts.len(), 2);

    let inbox = matching.received_hearts(&kira).await.unwrap();
    assert_eq!(inbox.len(), 2);
    // Newest first
    assert_eq!(inbox[0].note.message, "Me encanta tu perfil");
    assert_eq!(inbox[1].note.message, "Te envió un corazón 💖");
    assert_eq!(inbox[0].from_user.id, uid_a);
    assert!(!inbox[0].note.seen);

    matching
        .mark_hearts_seen(&kira, &[uid_a.clone()])
        .await
        .unwrap();
    let kira = db.get_user(&uid_b).await.unwrap().unwrap();
    assert!(kira.received_hearts.iter().all(|note| note.seen));

    println!("✓ Heart notes inbox verified: {} -> {}", uid_a, uid_b);
}

// ═══════════════════════════════════════════════════════════════════════════
// CONVERSATION TESTS
// ═══════════════════════════════════════════════════════════════════════════

/// Build a matched pair and return their fresh profiles.
async fn matched_pair(
    db: &corazon::db::FirestoreDb,
    matching: &MatchService,
    prefix_a: &str,
    prefix_b: &str,
) -> (User, User) {
    let uid_a = unique_uid(prefix_a);
    let uid_b = unique_uid(prefix_b);
    db.upsert_user(&test_user(&uid_a, 28)).await.unwrap();
    db.upsert_user(&test_user(&uid_b, 28)).await.unwrap();

    let a = db.get_user(&uid_a).await.unwrap().unwrap();
    matching.send_heart(&a, &uid_b).await.unwrap();
    let b = db.get_user(&uid_b).await.unwrap().unwrap();
    matching.send_heart(&b, &uid_a).await.unwrap();

    (
        db.get_user(&uid_a).await.unwrap().unwrap(),
        db.get_user(&uid_b).await.unwrap().unwrap(),
    )
}

#[tokio::test]
async fn test_chat_requires_match() {
    require_emulator!();

    let db = test_db().await;
    let chat = ChatService::new(db.clone());

    let uid_a = unique_uid("lola");
    let uid_b = unique_uid("max");
    db.upsert_user(&test_user(&uid_a, 22)).await.unwrap();
    db.upsert_user(&test_user(&uid_b, 23)).await.unwrap();

    let lola = db.get_user(&uid_a).await.unwrap().unwrap();
    let result = chat.get_or_create_conversation(&lola, &uid_b).await;
    assert!(
        matches!(result, Err(corazon::error::AppError::Forbidden(_))),
        "Chat with a non-match must be forbidden"
    );

    println!("✓ Chat gating verified: {} x {}", uid_a, uid_b);
}

#[tokio::test]
async fn test_conversation_lifecycle() {
    require_emulator!();

    let db = test_db().await;
    let matching = MatchService::new(db.clone());
    let chat = ChatService::new(db.clone());

    let (nora, omar) = matched_pair(&db, &matching, "nora", "omar").await;

    // Get-or-create is idempotent
    let conv1 = chat
        .get_or_create_conversation(&nora, &omar.uid)
        .await
        .unwrap();
    let conv2 = chat
        .get_or_create_conversation(&omar, &nora.uid)
        .await
        .unwrap();
    assert_eq!(conv1.id, conv2.id);
    assert_eq!(conv1.participants.len(), 2);

    // Send a couple of messages
    let sent = chat
        .send_message(&nora, &conv1.id, "Hola!", None)
        .await
        .unwrap();
    assert_eq!(sent.sender.id, nora.uid);
    assert_eq!(sent.recipient, omar.uid);
    assert_eq!(sent.content_type, "text");
    assert!(!sent.is_read);

    tokio::time::sleep(Duration::from_millis(10)).await;
    chat.send_message(&omar, &conv1.id, "Hola, qué tal?", None)
        .await
        .unwrap();

    // Conversation preview follows the latest message
    let listed = chat.list_conversations(&nora).await.unwrap();
    let listing = listed.iter().find(|c| c.id == conv1.id).unwrap();
    assert_eq!(listing.last_message_text, "Hola, qué tal?");

    // Match preview cache follows too
    let match_record = db.get_match(&nora.uid, &omar.uid).await.unwrap().unwrap();
    assert!(match_record.last_message.is_some());

    // Messages come back oldest first with senders expanded
    let messages = chat.list_messages(&nora, &conv1.id, 1, 50).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "Hola!");
    assert_eq!(messages[1].content, "Hola, qué tal?");
    assert_eq!(messages[1].sender.id, omar.uid);

    println!("✓ Conversation lifecycle verified: {}", conv1.id);
}

#[tokio::test]
async fn test_unread_and_mark_read() {
    require_emulator!();

    let db = test_db().await;
    let matching = MatchService::new(db.clone());
    let chat = ChatService::new(db.clone());

    let (pia, quim) = matched_pair(&db, &matching, "pia", "quim").await;
    let conv = chat
        .get_or_create_conversation(&pia, &quim.uid)
        .await
        .unwrap();

    for text in ["uno", "dos", "tres"] {
        chat.send_message(&pia, &conv.id, text, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(chat.unread_count(&quim.uid).await.unwrap(), 3);
    assert_eq!(chat.unread_count(&pia.uid).await.unwrap(), 0);

    let marked = chat.mark_read(&quim, &conv.id).await.unwrap();
    assert_eq!(marked, 3);
    assert_eq!(chat.unread_count(&quim.uid).await.unwrap(), 0);

    // read_at is stamped on every message
    let messages = chat.list_messages(&quim, &conv.id, 1, 50).await.unwrap();
    assert!(messages.iter().all(|m| m.is_read && m.read_at.is_some()));

    // Marking again is a no-op
    assert_eq!(chat.mark_read(&quim, &conv.id).await.unwrap(), 0);

    println!("✓ Unread tracking verified: {}", conv.id);
}

#[tokio::test]
async fn test_message_pagination() {
    require_emulator!();

    let db = test_db().await;
    let matching = MatchService::new(db.clone());
    let chat = ChatService::new(db.clone());

    let (rosa, saul) = matched_pair(&db, &matching, "rosa", "saul").await;
    let conv = chat
        .get_or_create_conversation(&rosa, &saul.uid)
        .await
        .unwrap();

    for i in 1..=5 {
        chat.send_message(&rosa, &conv.id, &format!("mensaje {i}"), None)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Page 1 is the newest two, oldest first within the page
    let page1 = chat.list_messages(&rosa, &conv.id, 1, 2).await.unwrap();
    let texts: Vec<&str> = page1.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, vec!["mensaje 4", "mensaje 5"]);

    let page2 = chat.list_messages(&rosa, &conv.id, 2, 2).await.unwrap();
    let texts: Vec<&str> = page2.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, vec!["mensaje 2", "mensaje 3"]);

    let page3 = chat.list_messages(&rosa, &conv.id, 3, 2).await.unwrap();
    let texts: Vec<&str> = page3.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(texts, vec!["mensaje 1"]);

    println!("✓ Message pagination verified: {}", conv.id);
}

#[tokio::test]
async fn test_access_denied_for_outsiders() {
    require_emulator!();

    let db = test_db().await;
    let matching = MatchService::new(db.clone());
    let chat = ChatService::new(db.clone());

    let (tara, ulises) = matched_pair(&db, &matching, "tara", "ulises").await;
    let conv = chat
        .get_or_create_conversation(&tara, &ulises.uid)
        .await
        .unwrap();

    let uid_v = unique_uid("vera");
    db.upsert_user(&test_user(&uid_v, 30)).await.unwrap();
    let vera = db.get_user(&uid_v).await.unwrap().unwrap();

    let result = chat.list_messages(&vera, &conv.id, 1, 50).await;
    assert!(matches!(
        result,
        Err(corazon::error::AppError::Forbidden(_))
    ));

    let result = chat.send_message(&vera, &conv.id, "hola", None).await;
    assert!(matches!(
        result,
        Err(corazon::error::AppError::Forbidden(_))
    ));

    println!("✓ Conversation access control verified: {}", conv.id);
}
