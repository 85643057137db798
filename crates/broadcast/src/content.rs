//! Broadcast content as a tagged variant.

use database::{Broadcast, ContentType};

/// The payload of a broadcast, one case per media kind.
///
/// Media captions ride along as the message body; voice notes carry
/// no caption at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastContent {
    Text { body: String },
    Photo { file_id: String, caption: String },
    Video { file_id: String, caption: String },
    Document { file_id: String, caption: String },
    Voice { file_id: String },
}

impl BroadcastContent {
    /// Assemble content from its stored columns.
    pub fn from_parts(content_type: ContentType, text: &str, file_id: &str) -> Self {
        match content_type {
            ContentType::Text => BroadcastContent::Text {
                body: text.to_string(),
            },
            ContentType::Photo => BroadcastContent::Photo {
                file_id: file_id.to_string(),
                caption: text.to_string(),
            },
            ContentType::Video => BroadcastContent::Video {
                file_id: file_id.to_string(),
                caption: text.to_string(),
            },
            ContentType::Document => BroadcastContent::Document {
                file_id: file_id.to_string(),
                caption: text.to_string(),
            },
            ContentType::Voice => BroadcastContent::Voice {
                file_id: file_id.to_string(),
            },
        }
    }

    /// Assemble content from a stored broadcast record.
    pub fn from_broadcast(broadcast: &Broadcast) -> Self {
        Self::from_parts(broadcast.content_type, &broadcast.text, &broadcast.file_id)
    }

    /// The stored content kind.
    pub fn content_type(&self) -> ContentType {
        match self {
            BroadcastContent::Text { .. } => ContentType::Text,
            BroadcastContent::Photo { .. } => ContentType::Photo,
            BroadcastContent::Video { .. } => ContentType::Video,
            BroadcastContent::Document { .. } => ContentType::Document,
            BroadcastContent::Voice { .. } => ContentType::Voice,
        }
    }

    /// Human-readable label for the summary message.
    pub fn type_label(content_type: ContentType) -> &'static str {
        match content_type {
            ContentType::Text => "Текст",
            ContentType::Photo => "Фото",
            ContentType::Video => "Видео",
            ContentType::Document => "Документ",
            ContentType::Voice => "Голосовое",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_voice_drops_caption() {
        let content = BroadcastContent::from_parts(ContentType::Voice, "ignored", "f1");
        assert_eq!(
            content,
            BroadcastContent::Voice {
                file_id: "f1".into()
            }
        );
        assert_eq!(content.content_type(), ContentType::Voice);
    }

    #[test]
    fn test_from_parts_media_keeps_caption() {
        let content = BroadcastContent::from_parts(ContentType::Photo, "hi", "f2");
        assert_eq!(
            content,
            BroadcastContent::Photo {
                file_id: "f2".into(),
                caption: "hi".into()
            }
        );
    }
}
