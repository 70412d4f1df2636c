//! Integration tests for `PgChatStore`.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use sqlx::PgPool;
use storyteller_core::chat::{Chat, Visibility};
use storyteller_core::message::{Message, Part, Role, ToolInvocation, ToolInvocationState};
use storyteller_core::repository::{ChatRepository, UserDirectory};
use storyteller_store::PgChatStore;
use uuid::Uuid;

/// Inserts a user row directly; users are provisioned by the auth layer.
async fn insert_user(pool: &PgPool, email: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2)")
        .bind(id)
        .bind(email)
        .execute(pool)
        .await
        .unwrap();
    id
}

fn make_message(chat_id: Uuid, role: Role, text: &str, created_at: DateTime<Utc>) -> Message {
    Message {
        id: Uuid::new_v4(),
        chat_id,
        role,
        parts: vec![Part::text(text)],
        created_at,
    }
}

// --- users ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_user_by_email(pool: PgPool) {
    let user_id = insert_user(&pool, "reader@example.com").await;
    let store = PgChatStore::new(pool);

    let found = store.find_user_by_email("reader@example.com").await.unwrap();
    let missing = store.find_user_by_email("nobody@example.com").await.unwrap();

    assert_eq!(found.map(|user| user.id), Some(user_id));
    assert!(missing.is_none());
}

// --- chats ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_chat_returns_none_for_unknown_id(pool: PgPool) {
    let store = PgChatStore::new(pool);

    let chat = store.find_chat(Uuid::new_v4()).await.unwrap();

    assert!(chat.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_save_and_find_chat(pool: PgPool) {
    let owner = insert_user(&pool, "reader@example.com").await;
    let store = PgChatStore::new(pool);
    let chat = Chat::new_story(Uuid::new_v4(), owner);

    store.save_chat(&chat).await.unwrap();

    let loaded = store.find_chat(chat.id).await.unwrap().unwrap();
    assert_eq!(loaded, chat);
    assert_eq!(loaded.visibility, Visibility::Private);
}

// --- messages ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_messages_are_returned_oldest_first(pool: PgPool) {
    let owner = insert_user(&pool, "reader@example.com").await;
    let store = PgChatStore::new(pool);
    let chat = Chat::new_story(Uuid::new_v4(), owner);
    store.save_chat(&chat).await.unwrap();
    let now = Utc::now().trunc_subsecs(6);
    let later = make_message(chat.id, Role::Assistant, "Once upon a time", now);
    let earlier = make_message(
        chat.id,
        Role::User,
        "Tell me a story",
        now - Duration::seconds(5),
    );

    store.save_messages(&[later.clone()]).await.unwrap();
    store.save_messages(&[earlier.clone()]).await.unwrap();

    let loaded = store.messages_by_chat(chat.id).await.unwrap();
    assert_eq!(loaded, vec![earlier, later]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_tool_invocation_parts_round_trip(pool: PgPool) {
    let owner = insert_user(&pool, "reader@example.com").await;
    let store = PgChatStore::new(pool);
    let chat = Chat::new_story(Uuid::new_v4(), owner);
    store.save_chat(&chat).await.unwrap();
    let now = Utc::now().trunc_subsecs(6);
    let mut message = make_message(chat.id, Role::Assistant, "Here it is.", now);
    message.parts.push(Part::ToolInvocation {
        tool_invocation: ToolInvocation {
            tool_name: "storyTelling".to_owned(),
            tool_call_id: "call-1".to_owned(),
            state: ToolInvocationState::Result {
                args: serde_json::json!({"story": "A fox."}),
                result: serde_json::json!({
                    "story": "A fox.",
                    "choices": ["Follow it"],
                    "completed": false,
                    "audioUrl": null,
                    "storyId": "seg-1"
                }),
            },
        },
    });

    store.save_messages(&[message.clone()]).await.unwrap();

    let loaded = store.messages_by_chat(chat.id).await.unwrap();
    assert_eq!(loaded, vec![message]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_duplicate_message_id_is_rejected(pool: PgPool) {
    let owner = insert_user(&pool, "reader@example.com").await;
    let store = PgChatStore::new(pool);
    let chat = Chat::new_story(Uuid::new_v4(), owner);
    store.save_chat(&chat).await.unwrap();
    let message = make_message(chat.id, Role::User, "Hi", Utc::now());

    store.save_messages(&[message.clone()]).await.unwrap();
    let result = store.save_messages(&[message]).await;

    assert!(result.is_err());
}

// --- quota counting ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_count_only_recent_user_messages_in_owned_chats(pool: PgPool) {
    // Arrange
    let reader = insert_user(&pool, "reader@example.com").await;
    let other = insert_user(&pool, "other@example.com").await;
    let store = PgChatStore::new(pool);
    let own_chat = Chat::new_story(Uuid::new_v4(), reader);
    let other_chat = Chat::new_story(Uuid::new_v4(), other);
    store.save_chat(&own_chat).await.unwrap();
    store.save_chat(&other_chat).await.unwrap();
    let now = Utc::now();
    store
        .save_messages(&[
            make_message(own_chat.id, Role::User, "one", now - Duration::hours(1)),
            make_message(own_chat.id, Role::User, "two", now - Duration::hours(2)),
            make_message(own_chat.id, Role::Assistant, "reply", now - Duration::hours(1)),
            make_message(own_chat.id, Role::User, "old", now - Duration::hours(30)),
            make_message(other_chat.id, Role::User, "theirs", now - Duration::hours(1)),
        ])
        .await
        .unwrap();

    // Act
    let count = store
        .count_user_messages_since(reader, now - Duration::hours(24))
        .await
        .unwrap();

    // Assert
    assert_eq!(count, 2);
}
