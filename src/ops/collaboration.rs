// src/ops/collaboration.rs
//! Collaboration operations: comments and workspace users.

use super::Workspace;
use crate::api::{fetch_all, Paginated, RequestEnvelope};
use crate::error::ClientError;
use crate::types::NotionId;
use serde::Serialize;
use serde_json::{json, Value};

/// One comment in a page's discussion.
#[derive(Debug, Clone, Serialize)]
pub struct CommentInfo {
    pub id: String,
    pub discussion_id: String,
    pub author_id: String,
    pub text: String,
    pub created_time: String,
}

/// What kind of principal a workspace user is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    Person,
    Bot,
}

/// A workspace member or integration.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub kind: UserKind,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Workspace {
    /// Add a plain-text comment to a page's discussion.
    pub async fn add_comment(
        &self,
        page_id: &NotionId,
        text: &str,
    ) -> Result<CommentInfo, ClientError> {
        if text.trim().is_empty() {
            return Err(ClientError::validation("comment text cannot be empty"));
        }

        let body = json!({
            "parent": { "page_id": page_id.to_hyphenated() },
            "rich_text": [{ "type": "text", "text": { "content": text } }],
        });

        let created = self
            .transport()
            .execute(&RequestEnvelope::post("comments", body))
            .await?;
        let comment = decode_comment(&created);
        log::info!("comment added to page {}", page_id);
        Ok(comment)
    }

    /// List every open comment on a page, oldest first.
    pub async fn list_comments(
        &self,
        page_id: &NotionId,
    ) -> Result<Vec<CommentInfo>, ClientError> {
        let raw = fetch_all(
            |page_size, cursor| {
                let mut envelope = RequestEnvelope::get("comments")
                    .with_query("block_id", page_id.to_hyphenated())
                    .with_query("page_size", page_size.to_string());
                if let Some(cursor) = cursor {
                    envelope = envelope.with_query("start_cursor", cursor);
                }
                async move {
                    let value = self.transport().execute(&envelope).await?;
                    let page: Paginated<Value> = serde_json::from_value(value)?;
                    Ok(page)
                }
            },
            None,
        )
        .await?;

        Ok(raw.iter().map(decode_comment).collect())
    }

    /// List all workspace users.
    pub async fn list_users(&self) -> Result<Vec<UserInfo>, ClientError> {
        let raw = fetch_all(
            |page_size, cursor| {
                let mut envelope = RequestEnvelope::get("users")
                    .with_query("page_size", page_size.to_string());
                if let Some(cursor) = cursor {
                    envelope = envelope.with_query("start_cursor", cursor);
                }
                async move {
                    let value = self.transport().execute(&envelope).await?;
                    let page: Paginated<Value> = serde_json::from_value(value)?;
                    Ok(page)
                }
            },
            None,
        )
        .await?;

        Ok(raw.iter().map(decode_user).collect())
    }

    /// Fetch one user by id.
    pub async fn get_user(&self, user_id: &NotionId) -> Result<UserInfo, ClientError> {
        let raw = self
            .transport()
            .execute(&RequestEnvelope::get(format!(
                "users/{}",
                user_id.to_hyphenated()
            )))
            .await?;
        Ok(decode_user(&raw))
    }
}

fn decode_comment(raw: &Value) -> CommentInfo {
    let text = raw
        .get("rich_text")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("plain_text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .concat()
        })
        .unwrap_or_default();

    CommentInfo {
        id: str_field(raw, "id"),
        discussion_id: str_field(raw, "discussion_id"),
        author_id: raw
            .get("created_by")
            .and_then(|u| u.get("id"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        text,
        created_time: str_field(raw, "created_time"),
    }
}

fn decode_user(raw: &Value) -> UserInfo {
    let kind = match raw.get("type").and_then(Value::as_str) {
        Some("bot") => UserKind::Bot,
        _ => UserKind::Person,
    };

    UserInfo {
        id: str_field(raw, "id"),
        kind,
        name: raw
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        email: raw
            .get("person")
            .and_then(|p| p.get("email"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn str_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_decoding_flattens_rich_text() {
        let raw = json!({
            "id": "c-1",
            "discussion_id": "d-1",
            "created_time": "2025-07-22T10:00:00.000Z",
            "created_by": { "object": "user", "id": "u-1" },
            "rich_text": [
                { "plain_text": "Bitte " },
                { "plain_text": "prüfen" }
            ]
        });
        let comment = decode_comment(&raw);
        assert_eq!(comment.text, "Bitte prüfen");
        assert_eq!(comment.author_id, "u-1");
    }

    #[test]
    fn user_decoding_reads_person_email() {
        let raw = json!({
            "id": "u-2",
            "type": "person",
            "name": "Sandra",
            "person": { "email": "sandra@example.at" }
        });
        let user = decode_user(&raw);
        assert_eq!(user.kind, UserKind::Person);
        assert_eq!(user.email.as_deref(), Some("sandra@example.at"));

        let bot = json!({ "id": "u-3", "type": "bot", "bot": {} });
        assert_eq!(decode_user(&bot).kind, UserKind::Bot);
    }
}
