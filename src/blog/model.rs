//! Blog records as they are stored and served.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const GITHUB_AVATAR_BASE: &str = "https://github.com";

/// A site user, linked to a GitHub profile only through its avatar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub user_id: u64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub mail: String,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub last_login_at: DateTime<Utc>,
    pub avatar: String,
}

impl User {
    pub fn new(
        user_id: u64,
        username: &str,
        password: &str,
        mail: &str,
        last_login_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            username: username.to_owned(),
            password: password.to_owned(),
            mail: mail.to_owned(),
            created_at,
            last_login_at,
            avatar: avatar_uri(username),
        }
    }
}

/// GitHub avatar of `username`.
pub fn avatar_uri(username: &str) -> String {
    format!("{GITHUB_AVATAR_BASE}/{username}.png")
}

/// One earlier revision of a post body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostHistory {
    pub post_id: u64,
    pub created_at: DateTime<Utc>,
    pub body: String,
}

impl PostHistory {
    pub fn new(post_id: u64, created_at: DateTime<Utc>, body: &str) -> Self {
        Self {
            post_id,
            created_at,
            body: body.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub post_id: u64,
    /// Author.
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
    pub body: String,
    #[serde(rename = "History")]
    pub history: Vec<PostHistory>,
}

impl Post {
    pub fn new(
        post_id: u64,
        user_id: u64,
        created_at: DateTime<Utc>,
        body: &str,
        history: Vec<PostHistory>,
    ) -> Self {
        Self {
            post_id,
            user_id,
            created_at,
            body: body.to_owned(),
            history,
        }
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub mail: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub user_id: u64,
    pub body: String,
}
