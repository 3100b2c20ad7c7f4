use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use staffhub_core::{AppError, AppResult, NonEmptyString, UserId};
use uuid::Uuid;

/// Reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attachment {
    name: String,
    url: String,
    #[serde(default)]
    size: u64,
    path: String,
}

impl Attachment {
    /// Creates a validated attachment reference.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        size: u64,
        path: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            name: NonEmptyString::new(name)?.into(),
            url: NonEmptyString::new(url)?.into(),
            size,
            path: NonEmptyString::new(path)?.into(),
        })
    }

    /// Returns the original file name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the public download URL.
    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the stored size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the storage key used to delete the blob.
    #[must_use]
    pub fn path(&self) -> &str {
        self.path.as_str()
    }
}

/// Stable comment identifier within an entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(String);

impl CommentId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an existing identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        Ok(Self(NonEmptyString::new(value)?.into()))
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CommentId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Comment appended to an entity's thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    comment_id: CommentId,
    user: UserId,
    body: String,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    likes: BTreeSet<UserId>,
    #[serde(default)]
    notify_users: Vec<UserId>,
    created_at: DateTime<Utc>,
}

/// Input payload for composing a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentInput {
    /// Author.
    pub user: UserId,
    /// Raw comment body.
    pub body: String,
    /// Already-uploaded attachments.
    pub attachments: Vec<Attachment>,
    /// Users to notify in addition to the entity's subscribers.
    pub notify_users: Vec<UserId>,
}

impl CommentInput {
    /// Checks that the comment has a non-blank body or at least one attachment.
    pub fn validate(&self) -> AppResult<()> {
        if self.body.trim().is_empty() && self.attachments.is_empty() {
            return Err(AppError::Validation(
                "comment must have a body or an attachment".to_owned(),
            ));
        }

        Ok(())
    }
}

impl Comment {
    /// Composes a validated comment stamped at `created_at`.
    pub fn compose(input: CommentInput, created_at: DateTime<Utc>) -> AppResult<Self> {
        input.validate()?;
        let body = input.body.trim().to_owned();

        let mut notify_users = input.notify_users;
        notify_users.sort();
        notify_users.dedup();

        Ok(Self {
            comment_id: CommentId::generate(),
            user: input.user,
            body,
            attachments: input.attachments,
            likes: BTreeSet::new(),
            notify_users,
            created_at,
        })
    }

    /// Returns comment id.
    #[must_use]
    pub fn comment_id(&self) -> &CommentId {
        &self.comment_id
    }

    /// Returns the author.
    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Returns the trimmed body.
    #[must_use]
    pub fn body(&self) -> &str {
        self.body.as_str()
    }

    /// Returns attachments.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        self.attachments.as_slice()
    }

    /// Returns the users who liked the comment.
    #[must_use]
    pub fn likes(&self) -> &BTreeSet<UserId> {
        &self.likes
    }

    /// Returns explicitly notified users.
    #[must_use]
    pub fn notify_users(&self) -> &[UserId] {
        self.notify_users.as_slice()
    }

    /// Returns creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether the user currently likes the comment.
    #[must_use]
    pub fn is_liked_by(&self, user: &UserId) -> bool {
        self.likes.contains(user)
    }

    /// Flips the user's like and returns whether the comment is now liked.
    pub fn toggle_like(&mut self, user: &UserId) -> bool {
        if self.likes.remove(user) {
            return false;
        }

        self.likes.insert(user.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use staffhub_core::UserId;

    use super::{Attachment, Comment, CommentInput};

    fn user(value: &str) -> UserId {
        UserId::new(value).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn blank_comment_without_attachments_is_rejected() {
        let result = Comment::compose(
            CommentInput {
                user: user("u-1"),
                body: "   ".to_owned(),
                attachments: Vec::new(),
                notify_users: Vec::new(),
            },
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn attachment_only_comment_is_accepted() {
        let attachment = Attachment::new("receipt.pdf", "https://files/receipt.pdf", 2048, "1/receipt.pdf")
            .unwrap_or_else(|_| unreachable!());
        let comment = Comment::compose(
            CommentInput {
                user: user("u-1"),
                body: String::new(),
                attachments: vec![attachment],
                notify_users: vec![user("u-2"), user("u-2")],
            },
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(comment.attachments().len(), 1);
        assert_eq!(comment.notify_users().len(), 1);
    }

    #[test]
    fn toggle_like_flips_membership() {
        let mut comment = Comment::compose(
            CommentInput {
                user: user("u-1"),
                body: " Looks good ".to_owned(),
                attachments: Vec::new(),
                notify_users: Vec::new(),
            },
            Utc::now(),
        )
        .unwrap_or_else(|_| unreachable!());

        assert_eq!(comment.body(), "Looks good");
        assert!(comment.toggle_like(&user("u-2")));
        assert!(comment.is_liked_by(&user("u-2")));
        assert!(!comment.toggle_like(&user("u-2")));
        assert!(comment.likes().is_empty());
    }
}
