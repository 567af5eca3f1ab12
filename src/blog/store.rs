//! Blog persistence seam and its in-process implementation.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::model::{NewPost, NewUser, Post, User};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("user {0} not found")]
    UserNotFound(u64),

    #[error("post {0} not found")]
    PostNotFound(u64),
}

#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError>;

    /// Posts authored by `user_id`, oldest first.
    async fn list_posts_by_user(&self, user_id: u64) -> Result<Vec<Post>, StoreError>;

    async fn create_post(&self, new: NewPost) -> Result<Post, StoreError>;

    async fn get_post(&self, post_id: u64) -> Result<Post, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<u64, User>,
    posts: BTreeMap<u64, Post>,
    next_user_id: u64,
    next_post_id: u64,
}

/// Store backed by ordered maps; ids start at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BlogStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tables = self.lock();
        tables.next_user_id += 1;
        let now = Utc::now();
        let user = User::new(
            tables.next_user_id,
            &new.username,
            &new.password,
            &new.mail,
            now,
            now,
        );
        tables.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn list_posts_by_user(&self, user_id: u64) -> Result<Vec<Post>, StoreError> {
        let tables = self.lock();
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::UserNotFound(user_id));
        }
        Ok(tables
            .posts
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_post(&self, new: NewPost) -> Result<Post, StoreError> {
        let mut tables = self.lock();
        if !tables.users.contains_key(&new.user_id) {
            return Err(StoreError::UserNotFound(new.user_id));
        }
        tables.next_post_id += 1;
        let post = Post::new(
            tables.next_post_id,
            new.user_id,
            Utc::now(),
            &new.body,
            Vec::new(),
        );
        tables.posts.insert(post.post_id, post.clone());
        Ok(post)
    }

    async fn get_post(&self, post_id: u64) -> Result<Post, StoreError> {
        self.lock()
            .posts
            .get(&post_id)
            .cloned()
            .ok_or(StoreError::PostNotFound(post_id))
    }
}
