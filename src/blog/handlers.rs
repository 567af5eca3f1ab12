//! Blog API routes.
//!
//! - `POST /users/`          - create a user
//! - `GET  /users/{id}/posts` - posts of a user
//! - `POST /posts/`          - create a post
//! - `GET  /posts/{id}`      - a single post

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, instrument};

use super::model::{NewPost, NewUser, Post, User};
use crate::AppState;
use crate::http::handler::AppError;
use crate::http::param_expr::{ParamExpr, guard_params};
use crate::metrics::{BlogLabels, BlogObject};

/// Up to 19 digits, so every accepted id fits a `u64`.
const NUMERIC_ID: &str = r"^[0-9]{1,19}$";

pub fn routes() -> Result<Router<Arc<AppState>>, regex::Error> {
    let ids = ParamExpr::new([("id", NUMERIC_ID)])?;
    let by_id = Router::new()
        .route("/users/{id}/posts", get(list_user_posts))
        .route("/posts/{id}", get(get_post))
        .route_layer(middleware::from_fn_with_state(ids, guard_params));

    Ok(Router::new()
        .route("/users/", post(create_user))
        .route("/posts/", post(create_post))
        .merge(by_id))
}

#[instrument(skip(state, new), fields(username = %new.username))]
async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if new.username.trim().is_empty() {
        return Err(AppError::BadRequest("username must not be empty".into()));
    }
    let user = state.blog.create_user(new).await?;
    state
        .metrics
        .metrics
        .blog_created
        .get_or_create(&BlogLabels {
            object: BlogObject::User,
        })
        .inc();
    info!(user_id = user.user_id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state))]
async fn list_user_posts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<Post>>, AppError> {
    Ok(Json(state.blog.list_posts_by_user(id).await?))
}

#[instrument(skip(state, new), fields(user_id = new.user_id))]
async fn create_post(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewPost>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    if new.body.trim().is_empty() {
        return Err(AppError::BadRequest("post body must not be empty".into()));
    }
    let post = state.blog.create_post(new).await?;
    state
        .metrics
        .metrics
        .blog_created
        .get_or_create(&BlogLabels {
            object: BlogObject::Post,
        })
        .inc();
    info!(post_id = post.post_id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

#[instrument(skip(state))]
async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(state.blog.get_post(id).await?))
}
