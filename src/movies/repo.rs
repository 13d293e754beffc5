use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::MovieInput;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Movie {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub director: String,
    pub genre: String,
    pub year: i32,
    pub score: Option<f64>,
    pub review: Option<String>,
    pub watched: bool,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Movie {
    /// Most recent first; id as a deterministic tie-break for equal timestamps.
    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Movie>> {
        let rows = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, user_id, title, director, genre, year, score, review,
                   watched, image_url, created_at
            FROM movies
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as(r#"SELECT COUNT(*) FROM movies WHERE user_id = $1"#)
                .bind(user_id)
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    pub async fn find_by_user(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> anyhow::Result<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            r#"
            SELECT id, user_id, title, director, genre, year, score, review,
                   watched, image_url, created_at
            FROM movies
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(movie)
    }

    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        input: &MovieInput,
        image_url: Option<&str>,
    ) -> anyhow::Result<Movie> {
        let movie = sqlx::query_as::<_, Movie>(
            r#"
            INSERT INTO movies (user_id, title, director, genre, year, score, review, watched, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, title, director, genre, year, score, review,
                      watched, image_url, created_at
            "#,
        )
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.director)
        .bind(&input.genre)
        .bind(input.year)
        .bind(input.score)
        .bind(&input.review)
        .bind(input.watched)
        .bind(image_url)
        .fetch_one(db)
        .await?;
        Ok(movie)
    }

    /// Ownership-scoped update; `None` means no movie with that id belongs
    /// to the user.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        input: &MovieInput,
        image_url: Option<&str>,
    ) -> anyhow::Result<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(
            r#"
            UPDATE movies SET
                title = $3, director = $4, genre = $5, year = $6,
                score = $7, review = $8, watched = $9, image_url = $10
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, director, genre, year, score, review,
                      watched, image_url, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.director)
        .bind(&input.genre)
        .bind(input.year)
        .bind(input.score)
        .bind(&input.review)
        .bind(input.watched)
        .bind(image_url)
        .fetch_optional(db)
        .await?;
        Ok(movie)
    }

    /// Ownership-scoped delete; returns whether a row was removed.
    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM movies WHERE id = $1 AND user_id = $2"#)
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
