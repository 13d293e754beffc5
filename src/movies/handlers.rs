use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{
    CreateMovieResponse, MessageResponse, MovieListResponse, PageQuery, PaginationMeta,
    UpdateMovieResponse,
};
use super::repo::Movie;
use super::service::{apply_image_update, read_movie_form, resolve_new_image};
use crate::auth::jwt::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/:id", get(get_movie))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/movies", post(create_movie))
        .route("/movies/:id", put(update_movie).delete(delete_movie))
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024)) // 5MB uploads
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_movies(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<MovieListResponse>, ApiError> {
    let (page, limit) = (query.page(), query.limit());

    let data = Movie::list_by_user(&state.db, user.id, limit, query.offset()).await?;
    let total = Movie::count_by_user(&state.db, user.id).await?;

    Ok(Json(MovieListResponse {
        data,
        pagination: PaginationMeta::new(total, page, limit),
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_movie(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Movie>, ApiError> {
    let movie = Movie::find_by_user(&state.db, user.id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Movie not found".into()))?;
    Ok(Json(movie))
}

#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn create_movie(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreateMovieResponse>), ApiError> {
    let form = read_movie_form(&mut multipart).await?;
    let input = form.validate_create()?;
    let image_url = resolve_new_image(&state, &form).await?;

    let movie = Movie::create(&state.db, user.id, &input, image_url.as_deref()).await?;

    info!(movie_id = %movie.id, "movie created");
    Ok((
        StatusCode::CREATED,
        Json(CreateMovieResponse {
            id: movie.id,
            message: "Movie created successfully".into(),
            movie,
        }),
    ))
}

#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn update_movie(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UpdateMovieResponse>, ApiError> {
    let current = Movie::find_by_user(&state.db, user.id, id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("Movie not found or you do not have permission to edit it".into())
        })?;

    let form = read_movie_form(&mut multipart).await?;
    let input = form.validate_update()?;
    let image_url = apply_image_update(&state, current.image_url.as_deref(), &form).await?;

    let movie = Movie::update(&state.db, user.id, id, &input, image_url.as_deref())
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("Movie not found or you do not have permission to edit it".into())
        })?;

    info!(movie_id = %movie.id, "movie updated");
    Ok(Json(UpdateMovieResponse {
        success: true,
        movie,
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_movie(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let removed = Movie::delete(&state.db, user.id, id).await?;
    if !removed {
        return Err(ApiError::NotFound(
            "Movie not found or you do not have permission to delete it".into(),
        ));
    }

    info!(movie_id = %id, "movie deleted");
    Ok(Json(MessageResponse {
        message: "Movie deleted successfully".into(),
    }))
}
