//! Step-by-step conversation flow for composing a broadcast.
//!
//! The engine is transport-free: it consumes a normalized [`Inbound`]
//! message and returns the replies to render, so the same flow can be
//! driven from long polling, a webhook, or a test. All progress lives
//! in the conversation state table keyed by the operator's Telegram
//! id, so a restart mid-composition loses nothing.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;

use database::broadcast::NewBroadcast;
use database::{admin, audience, conversation, Audience, ContentType, Recipient};

use crate::content::BroadcastContent;
use crate::error::Result;

/// Cancel button, accepted at every step.
pub const BTN_CANCEL: &str = "❌ Отмена";
/// Launch button at the confirmation step.
pub const BTN_LAUNCH: &str = "✅ Запустить";

/// Audience menu buttons in display order.
const AUDIENCE_BUTTONS: &[(&str, Audience)] = &[
    ("👥 Все", Audience::All),
    ("🛒 Покупатели", Audience::Customers),
    ("⭐ VIP", Audience::Vip),
    ("🆕 Новые", Audience::New),
    ("😴 Неактивные", Audience::Inactive),
    ("✍️ Выбрать вручную", Audience::Custom),
];

/// Content type menu buttons in display order.
const CONTENT_TYPE_BUTTONS: &[(&str, ContentType)] = &[
    ("📝 Текст", ContentType::Text),
    ("🖼 Фото", ContentType::Photo),
    ("🎬 Видео", ContentType::Video),
    ("📎 Документ", ContentType::Document),
    ("🎤 Голосовое", ContentType::Voice),
];

/// Conversation steps, stored as string tags in the state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ChooseAudience,
    EnterUsernames,
    ChooseType,
    ReceiveContent,
    Confirm,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ChooseAudience => "broadcast_choose_audience",
            Step::EnterUsernames => "broadcast_enter_usernames",
            Step::ChooseType => "broadcast_choose_type",
            Step::ReceiveContent => "broadcast_receive_content",
            Step::Confirm => "broadcast_confirm",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "broadcast_choose_audience" => Some(Step::ChooseAudience),
            "broadcast_enter_usernames" => Some(Step::EnterUsernames),
            "broadcast_choose_type" => Some(Step::ChooseType),
            "broadcast_receive_content" => Some(Step::ReceiveContent),
            "broadcast_confirm" => Some(Step::Confirm),
            _ => None,
        }
    }
}

/// The accumulated draft, serialized into the state table's data column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub audience: Option<Audience>,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub not_found: Vec<String>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub file_id: String,
}

/// An inbound operator message, reduced to what the flow inspects.
#[derive(Debug, Clone, Default)]
pub struct Inbound {
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo_file_id: Option<String>,
    pub video_file_id: Option<String>,
    pub document_file_id: Option<String>,
    pub voice_file_id: Option<String>,
}

impl Inbound {
    /// A plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Inbound {
            text: Some(text.into()),
            ..Inbound::default()
        }
    }
}

/// Which reply keyboard a prompt should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyboard {
    /// Audience menu plus cancel.
    Audience,
    /// Content type menu plus cancel.
    ContentType,
    /// Launch / cancel.
    Confirm,
    /// Cancel only.
    Cancel,
    /// Remove the current keyboard.
    Remove,
    /// Leave the current keyboard as is.
    None,
}

impl Keyboard {
    /// Button label rows, or `None` when no keyboard is attached.
    pub fn rows(&self) -> Option<Vec<Vec<&'static str>>> {
        match self {
            Keyboard::Audience => {
                let mut rows: Vec<Vec<&'static str>> = AUDIENCE_BUTTONS
                    .chunks(2)
                    .map(|pair| pair.iter().map(|(label, _)| *label).collect())
                    .collect();
                rows.push(vec![BTN_CANCEL]);
                Some(rows)
            }
            Keyboard::ContentType => {
                let mut rows: Vec<Vec<&'static str>> = CONTENT_TYPE_BUTTONS
                    .chunks(2)
                    .map(|pair| pair.iter().map(|(label, _)| *label).collect())
                    .collect();
                rows.push(vec![BTN_CANCEL]);
                Some(rows)
            }
            Keyboard::Confirm => Some(vec![vec![BTN_LAUNCH, BTN_CANCEL]]),
            Keyboard::Cancel => Some(vec![vec![BTN_CANCEL]]),
            Keyboard::Remove | Keyboard::None => None,
        }
    }
}

/// One message the bot should send back to the operator.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A text prompt with an optional keyboard.
    Prompt { text: String, keyboard: Keyboard },
    /// Render the drafted content exactly as recipients will see it.
    Preview(BroadcastContent),
}

impl Reply {
    fn prompt(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Reply::Prompt {
            text: text.into(),
            keyboard,
        }
    }
}

/// The result of feeding one inbound message to the engine.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Replies to send, in order.
    pub replies: Vec<Reply>,
    /// Id of a broadcast launched by this message, if any.
    pub launched: Option<i64>,
}

impl Outcome {
    fn reply(reply: Reply) -> Self {
        Outcome {
            replies: vec![reply],
            launched: None,
        }
    }
}

/// Extract `@`-prefixed usernames, lowercased, first occurrence wins.
pub fn parse_usernames(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '@' {
            i += 1;
            continue;
        }
        let mut name = String::new();
        let mut j = i + 1;
        while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
            name.push(chars[j].to_ascii_lowercase());
            j += 1;
        }
        if !name.is_empty() && seen.insert(name.clone()) {
            result.push(name);
        }
        i = j.max(i + 1);
    }

    result
}

/// The broadcast composition state machine.
#[derive(Debug, Clone)]
pub struct Engine {
    pool: SqlitePool,
}

impl Engine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Handle the "begin broadcast" command.
    ///
    /// Gated by the admin allowlist; unauthorized callers get a
    /// rejection and no state is created.
    pub async fn start(&self, telegram_id: i64, username: Option<&str>) -> Result<Outcome> {
        let operator = admin::get_and_update(&self.pool, telegram_id, username).await?;
        if operator.is_none() {
            tracing::info!(telegram_id, "Rejected broadcast command from non-admin");
            return Ok(Outcome::reply(Reply::prompt(
                "⛔ У вас нет прав для создания рассылок.",
                Keyboard::None,
            )));
        }

        self.save(telegram_id, Step::ChooseAudience, &Draft::default())
            .await?;

        Ok(Outcome::reply(Reply::prompt(
            "📢 Создание рассылки\n\nШаг 1/3: Выберите аудиторию:",
            Keyboard::Audience,
        )))
    }

    /// Route an inbound message through the current step.
    ///
    /// Returns an empty outcome when the operator has no active
    /// conversation.
    pub async fn handle_message(&self, telegram_id: i64, inbound: &Inbound) -> Result<Outcome> {
        let (tag, data) = conversation::get(&self.pool, telegram_id).await?;
        let Some(step) = Step::parse(&tag) else {
            return Ok(Outcome::default());
        };
        let draft: Draft = serde_json::from_str(&data).unwrap_or_default();

        if inbound.text.as_deref() == Some(BTN_CANCEL) {
            return self.cancel(telegram_id).await;
        }

        match step {
            Step::ChooseAudience => self.choose_audience(telegram_id, draft, inbound).await,
            Step::EnterUsernames => self.enter_usernames(telegram_id, draft, inbound).await,
            Step::ChooseType => self.choose_type(telegram_id, draft, inbound).await,
            Step::ReceiveContent => self.receive_content(telegram_id, draft, inbound).await,
            Step::Confirm => self.confirm(telegram_id, draft, inbound).await,
        }
    }

    async fn cancel(&self, telegram_id: i64) -> Result<Outcome> {
        conversation::clear(&self.pool, telegram_id).await?;
        Ok(Outcome::reply(Reply::prompt(
            "Рассылка отменена.",
            Keyboard::Remove,
        )))
    }

    async fn save(&self, telegram_id: i64, step: Step, draft: &Draft) -> Result<()> {
        let data = serde_json::to_string(draft)?;
        conversation::set(&self.pool, telegram_id, step.as_str(), &data).await?;
        Ok(())
    }

    async fn choose_audience(
        &self,
        telegram_id: i64,
        mut draft: Draft,
        inbound: &Inbound,
    ) -> Result<Outcome> {
        let selected = inbound.text.as_deref().and_then(|text| {
            AUDIENCE_BUTTONS
                .iter()
                .find(|(label, _)| *label == text)
                .map(|(label, audience)| (*label, *audience))
        });

        let Some((label, selected)) = selected else {
            return Ok(Outcome::reply(Reply::prompt(
                "Пожалуйста, выберите аудиторию из предложенных вариантов.",
                Keyboard::Audience,
            )));
        };

        if selected == Audience::Custom {
            draft.audience = Some(Audience::Custom);
            self.save(telegram_id, Step::EnterUsernames, &draft).await?;
            return Ok(Outcome::reply(Reply::prompt(
                "✍️ Введите @username получателей\n\n\
                 Формат: @user1 @user2 @user3\n\
                 или через запятую: @user1, @user2, @user3",
                Keyboard::Cancel,
            )));
        }

        let recipients = audience::resolve(&self.pool, selected).await?;
        if recipients.is_empty() {
            // No state change, let the operator pick another audience.
            return Ok(Outcome::reply(Reply::prompt(
                format!("😕 В аудитории \"{label}\" пока нет получателей. Выберите другую:"),
                Keyboard::Audience,
            )));
        }

        let count = recipients.len();
        draft.audience = Some(selected);
        draft.recipients = recipients;
        self.save(telegram_id, Step::ChooseType, &draft).await?;

        Ok(Outcome::reply(Reply::prompt(
            format!("✅ Найдено: {count} чел.\n\nШаг 2/3: Выберите тип контента:"),
            Keyboard::ContentType,
        )))
    }

    async fn enter_usernames(
        &self,
        telegram_id: i64,
        mut draft: Draft,
        inbound: &Inbound,
    ) -> Result<Outcome> {
        let usernames = inbound
            .text
            .as_deref()
            .map(parse_usernames)
            .unwrap_or_default();

        if usernames.is_empty() {
            return Ok(Outcome::reply(Reply::prompt(
                "❌ Не найдено ни одного @username.\n\n\
                 Пожалуйста, введите username в формате:\n\
                 @user1 @user2 @user3",
                Keyboard::Cancel,
            )));
        }

        let (found, not_found) = audience::find_by_usernames(&self.pool, &usernames).await?;

        if found.is_empty() {
            let listed = not_found
                .iter()
                .map(|u| format!("@{u}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(Outcome::reply(Reply::prompt(
                format!(
                    "❌ Ни один из указанных пользователей не найден в базе:\n{listed}\n\n\
                     Убедитесь, что пользователи:\n\
                     • Запускали бота командой /start\n\
                     • Username указан правильно"
                ),
                Keyboard::Cancel,
            )));
        }

        let found_list = found
            .iter()
            .map(|r| format!("@{}", r.username))
            .collect::<Vec<_>>()
            .join(", ");
        let mut response = format!("✅ Найдено: {} чел.\n{found_list}", found.len());
        if !not_found.is_empty() {
            let missing = not_found
                .iter()
                .map(|u| format!("@{u}"))
                .collect::<Vec<_>>()
                .join(", ");
            response.push_str(&format!("\n\n⚠️ Не найдены:\n{missing}"));
        }

        draft.recipients = found;
        draft.not_found = not_found;
        self.save(telegram_id, Step::ChooseType, &draft).await?;

        Ok(Outcome::reply(Reply::prompt(
            format!("{response}\n\nШаг 2/3: Выберите тип контента:"),
            Keyboard::ContentType,
        )))
    }

    async fn choose_type(
        &self,
        telegram_id: i64,
        mut draft: Draft,
        inbound: &Inbound,
    ) -> Result<Outcome> {
        let selected = inbound.text.as_deref().and_then(|text| {
            CONTENT_TYPE_BUTTONS
                .iter()
                .find(|(label, _)| *label == text)
                .map(|(_, content_type)| *content_type)
        });

        let Some(content_type) = selected else {
            return Ok(Outcome::reply(Reply::prompt(
                "Пожалуйста, выберите тип из предложенных вариантов.",
                Keyboard::ContentType,
            )));
        };

        draft.content_type = Some(content_type);
        self.save(telegram_id, Step::ReceiveContent, &draft).await?;

        let prompt = match content_type {
            ContentType::Text => "✏️ Шаг 3/3: Отправьте текст сообщения:",
            ContentType::Photo => "🖼 Шаг 3/3: Отправьте фото (можно с подписью):",
            ContentType::Video => "🎬 Шаг 3/3: Отправьте видео (можно с подписью):",
            ContentType::Document => "📎 Шаг 3/3: Отправьте документ (можно с подписью):",
            ContentType::Voice => "🎤 Шаг 3/3: Отправьте голосовое сообщение:",
        };
        Ok(Outcome::reply(Reply::prompt(prompt, Keyboard::Remove)))
    }

    async fn receive_content(
        &self,
        telegram_id: i64,
        mut draft: Draft,
        inbound: &Inbound,
    ) -> Result<Outcome> {
        let Some(content_type) = draft.content_type else {
            // Stale draft without a chosen type, start over.
            tracing::warn!(telegram_id, "Draft missing content type, resetting");
            return self.cancel(telegram_id).await;
        };

        let caption = inbound.caption.clone().unwrap_or_default();
        let (text, file_id) = match content_type {
            ContentType::Text => match &inbound.text {
                Some(body) => (body.clone(), String::new()),
                None => {
                    return Ok(Outcome::reply(Reply::prompt(
                        "❌ Пожалуйста, отправьте текстовое сообщение.",
                        Keyboard::None,
                    )))
                }
            },
            ContentType::Photo => match &inbound.photo_file_id {
                Some(file_id) => (caption, file_id.clone()),
                None => {
                    return Ok(Outcome::reply(Reply::prompt(
                        "❌ Пожалуйста, отправьте фото.",
                        Keyboard::None,
                    )))
                }
            },
            ContentType::Video => match &inbound.video_file_id {
                Some(file_id) => (caption, file_id.clone()),
                None => {
                    return Ok(Outcome::reply(Reply::prompt(
                        "❌ Пожалуйста, отправьте видео.",
                        Keyboard::None,
                    )))
                }
            },
            ContentType::Document => match &inbound.document_file_id {
                Some(file_id) => (caption, file_id.clone()),
                None => {
                    return Ok(Outcome::reply(Reply::prompt(
                        "❌ Пожалуйста, отправьте документ.",
                        Keyboard::None,
                    )))
                }
            },
            ContentType::Voice => match &inbound.voice_file_id {
                Some(file_id) => (String::new(), file_id.clone()),
                None => {
                    return Ok(Outcome::reply(Reply::prompt(
                        "❌ Пожалуйста, отправьте голосовое сообщение.",
                        Keyboard::None,
                    )))
                }
            },
        };

        draft.text = text;
        draft.file_id = file_id;
        self.save(telegram_id, Step::Confirm, &draft).await?;

        let shown = draft
            .recipients
            .iter()
            .take(5)
            .map(|r| format!("@{}", r.username))
            .collect::<Vec<_>>()
            .join(", ");
        let mut recipients_list = shown;
        if draft.recipients.len() > 5 {
            recipients_list.push_str(&format!(" и ещё {}...", draft.recipients.len() - 5));
        }

        let summary = format!(
            "📋 Сводка рассылки:\n\n\
             👥 Получатели: {} чел.\n{recipients_list}\n\n\
             📎 Тип: {}\n\n\
             👁 Предпросмотр:",
            draft.recipients.len(),
            BroadcastContent::type_label(content_type),
        );

        let preview = BroadcastContent::from_parts(content_type, &draft.text, &draft.file_id);

        Ok(Outcome {
            replies: vec![
                Reply::prompt(summary, Keyboard::None),
                Reply::Preview(preview),
                Reply::prompt("✅ Запустить рассылку?", Keyboard::Confirm),
            ],
            launched: None,
        })
    }

    async fn confirm(&self, telegram_id: i64, draft: Draft, inbound: &Inbound) -> Result<Outcome> {
        if inbound.text.as_deref() != Some(BTN_LAUNCH) {
            return Ok(Outcome::reply(Reply::prompt(
                "Пожалуйста, выберите действие:",
                Keyboard::Confirm,
            )));
        }

        let Some(content_type) = draft.content_type else {
            tracing::warn!(telegram_id, "Draft missing content type at confirm, resetting");
            return self.cancel(telegram_id).await;
        };

        let count = draft.recipients.len();
        let broadcast_id = database::broadcast::create_with_logs(
            &self.pool,
            &NewBroadcast {
                audience: draft.audience.unwrap_or(Audience::Custom),
                recipients: draft.recipients,
                content_type,
                text: draft.text,
                file_id: draft.file_id,
                created_by_telegram_id: telegram_id,
            },
        )
        .await?;

        conversation::clear(&self.pool, telegram_id).await?;
        tracing::info!(broadcast_id, recipients = count, "Broadcast launched");

        Ok(Outcome {
            replies: vec![Reply::prompt(
                format!(
                    "🚀 Рассылка #{broadcast_id} запущена!\n\n\
                     👥 Получателей: {count} чел.\n\n\
                     Статус можно отслеживать в админ-панели."
                ),
                Keyboard::Remove,
            )],
            launched: Some(broadcast_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::{delivery_log, user, BroadcastStatus, Database, LogStatus};

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1)
            .await
            .unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn engine_with_admin(db: &Database, admin_id: i64) -> Engine {
        admin::create_admin(db.pool(), "boss", "Boss").await.unwrap();
        admin::get_and_update(db.pool(), admin_id, Some("boss"))
            .await
            .unwrap()
            .unwrap();
        Engine::new(db.pool().clone())
    }

    fn prompt_text(outcome: &Outcome) -> &str {
        match &outcome.replies[0] {
            Reply::Prompt { text, .. } => text,
            Reply::Preview(_) => panic!("expected a prompt"),
        }
    }

    async fn current_step(db: &Database, telegram_id: i64) -> String {
        conversation::get(db.pool(), telegram_id).await.unwrap().0
    }

    #[test]
    fn test_parse_usernames_dedupes_case_insensitively() {
        assert_eq!(
            parse_usernames("@alice @bob, @Alice"),
            vec!["alice".to_string(), "bob".to_string()]
        );
        assert_eq!(parse_usernames("no mentions here"), Vec::<String>::new());
        assert_eq!(parse_usernames("@ @_x"), vec!["_x".to_string()]);
    }

    #[tokio::test]
    async fn test_non_admin_is_rejected_without_state() {
        let db = test_db().await;
        let engine = Engine::new(db.pool().clone());

        let outcome = engine.start(500, Some("stranger")).await.unwrap();
        assert!(prompt_text(&outcome).starts_with("⛔"));
        assert_eq!(current_step(&db, 500).await, "");
    }

    #[tokio::test]
    async fn test_predefined_audience_skips_username_entry() {
        let db = test_db().await;
        let engine = engine_with_admin(&db, 900).await;
        for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
            user::register_telegram_user(db.pool(), id, Some(name), None)
                .await
                .unwrap();
        }

        engine.start(900, Some("boss")).await.unwrap();
        let outcome = engine
            .handle_message(900, &Inbound::text("🆕 Новые"))
            .await
            .unwrap();

        assert!(prompt_text(&outcome).contains("Найдено: 3"));
        assert_eq!(current_step(&db, 900).await, "broadcast_choose_type");

        let (_, data) = conversation::get(db.pool(), 900).await.unwrap();
        let draft: Draft = serde_json::from_str(&data).unwrap();
        assert_eq!(draft.recipients.len(), 3);
        assert_eq!(draft.audience, Some(Audience::New));
    }

    #[tokio::test]
    async fn test_empty_audience_reprompts_in_place() {
        let db = test_db().await;
        let engine = engine_with_admin(&db, 900).await;

        engine.start(900, Some("boss")).await.unwrap();
        let outcome = engine
            .handle_message(900, &Inbound::text("⭐ VIP"))
            .await
            .unwrap();

        assert!(prompt_text(&outcome).contains("нет получателей"));
        assert_eq!(current_step(&db, 900).await, "broadcast_choose_audience");
    }

    #[tokio::test]
    async fn test_custom_usernames_partition_found_and_missing() {
        let db = test_db().await;
        let engine = engine_with_admin(&db, 900).await;
        user::register_telegram_user(db.pool(), 10, Some("alice"), None)
            .await
            .unwrap();

        engine.start(900, Some("boss")).await.unwrap();
        engine
            .handle_message(900, &Inbound::text("✍️ Выбрать вручную"))
            .await
            .unwrap();
        assert_eq!(current_step(&db, 900).await, "broadcast_enter_usernames");

        let outcome = engine
            .handle_message(900, &Inbound::text("@alice @bob @alice"))
            .await
            .unwrap();

        let text = prompt_text(&outcome);
        assert!(text.contains("Найдено: 1"));
        assert!(text.contains("Не найдены"));
        assert!(text.contains("@bob"));

        let (_, data) = conversation::get(db.pool(), 900).await.unwrap();
        let draft: Draft = serde_json::from_str(&data).unwrap();
        assert_eq!(draft.recipients.len(), 1);
        assert_eq!(draft.recipients[0].username, "alice");
        assert_eq!(draft.not_found, vec!["bob".to_string()]);
    }

    #[tokio::test]
    async fn test_cancel_clears_state_at_any_step() {
        let db = test_db().await;
        let engine = engine_with_admin(&db, 900).await;
        user::register_telegram_user(db.pool(), 10, Some("alice"), None)
            .await
            .unwrap();

        engine.start(900, Some("boss")).await.unwrap();
        engine
            .handle_message(900, &Inbound::text("👥 Все"))
            .await
            .unwrap();

        let outcome = engine
            .handle_message(900, &Inbound::text(BTN_CANCEL))
            .await
            .unwrap();
        assert_eq!(prompt_text(&outcome), "Рассылка отменена.");
        assert_eq!(current_step(&db, 900).await, "");

        // Further messages are ignored.
        let outcome = engine
            .handle_message(900, &Inbound::text("hello"))
            .await
            .unwrap();
        assert!(outcome.replies.is_empty());
    }

    #[tokio::test]
    async fn test_content_type_mismatch_reprompts() {
        let db = test_db().await;
        let engine = engine_with_admin(&db, 900).await;
        user::register_telegram_user(db.pool(), 10, Some("alice"), None)
            .await
            .unwrap();

        engine.start(900, Some("boss")).await.unwrap();
        engine
            .handle_message(900, &Inbound::text("👥 Все"))
            .await
            .unwrap();
        engine
            .handle_message(900, &Inbound::text("🖼 Фото"))
            .await
            .unwrap();

        // A text message while a photo is expected.
        let outcome = engine
            .handle_message(900, &Inbound::text("not a photo"))
            .await
            .unwrap();
        assert!(prompt_text(&outcome).contains("отправьте фото"));
        assert_eq!(current_step(&db, 900).await, "broadcast_receive_content");
    }

    #[tokio::test]
    async fn test_full_flow_launches_broadcast_with_pending_logs() {
        let db = test_db().await;
        let engine = engine_with_admin(&db, 900).await;
        user::register_telegram_user(db.pool(), 10, Some("alice"), None)
            .await
            .unwrap();
        user::register_telegram_user(db.pool(), 11, Some("bob"), None)
            .await
            .unwrap();

        engine.start(900, Some("boss")).await.unwrap();
        engine
            .handle_message(900, &Inbound::text("👥 Все"))
            .await
            .unwrap();
        engine
            .handle_message(900, &Inbound::text("📝 Текст"))
            .await
            .unwrap();

        let outcome = engine
            .handle_message(900, &Inbound::text("Привет!"))
            .await
            .unwrap();
        assert_eq!(outcome.replies.len(), 3);
        assert!(matches!(outcome.replies[1], Reply::Preview(_)));

        // A stray token at confirm re-prompts without launching.
        let outcome = engine
            .handle_message(900, &Inbound::text("maybe"))
            .await
            .unwrap();
        assert!(outcome.launched.is_none());
        assert_eq!(current_step(&db, 900).await, "broadcast_confirm");

        let outcome = engine
            .handle_message(900, &Inbound::text(BTN_LAUNCH))
            .await
            .unwrap();
        let id = outcome.launched.unwrap();
        assert!(prompt_text(&outcome).contains(&format!("#{id}")));
        assert_eq!(current_step(&db, 900).await, "");

        let broadcast = database::broadcast::get_broadcast(db.pool(), id)
            .await
            .unwrap();
        assert_eq!(broadcast.status, BroadcastStatus::Pending);
        assert_eq!(broadcast.total_recipients, 2);
        assert_eq!(broadcast.text, "Привет!");

        let logs = delivery_log::list_for_broadcast(db.pool(), id).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.status == LogStatus::Pending));
    }
}
