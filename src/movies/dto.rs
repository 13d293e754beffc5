use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::repo::Movie;
use crate::error::ApiError;

const MIN_YEAR: i32 = 1888;

/// Page/limit query params. Non-numeric values fall back to the defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "lenient_int")]
    page: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    limit: Option<i64>,
}

fn lenient_int<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.and_then(|s| s.trim().parse::<i64>().ok()))
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.filter(|l| *l >= 1).unwrap_or(10)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        Self {
            total,
            page,
            limit,
            total_pages: (total + limit - 1) / limit,
            has_next_page: page * limit < total,
            has_prev_page: page > 1,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovieListResponse {
    pub data: Vec<Movie>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct CreateMovieResponse {
    pub id: Uuid,
    pub message: String,
    pub movie: Movie,
}

#[derive(Debug, Serialize)]
pub struct UpdateMovieResponse {
    pub success: bool,
    pub movie: Movie,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// An uploaded image file from the multipart body.
#[derive(Debug)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Raw multipart fields as received; everything is text until validated.
#[derive(Debug, Default)]
pub struct MovieForm {
    pub title: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
    pub score: Option<String>,
    pub review: Option<String>,
    pub watched: Option<String>,
    pub image_url: Option<String>,
    pub upload: Option<ImageUpload>,
}

/// Fully-validated movie fields, ready for the repository.
#[derive(Debug, PartialEq)]
pub struct MovieInput {
    pub title: String,
    pub director: String,
    pub genre: String,
    pub year: i32,
    pub score: Option<f64>,
    pub review: Option<String>,
    pub watched: bool,
}

impl MovieForm {
    /// Create-side validation: the four required fields plus the year floor.
    /// A non-numeric score is silently dropped here; update is stricter.
    pub fn validate_create(&self) -> Result<MovieInput, ApiError> {
        Ok(MovieInput {
            title: require(self.title.as_deref(), "title")?,
            director: require(self.director.as_deref(), "director")?,
            genre: require(self.genre.as_deref(), "genre")?,
            year: parse_year(self.year.as_deref())?,
            score: self
                .score
                .as_deref()
                .and_then(|s| s.trim().parse::<f64>().ok()),
            review: non_empty(self.review.as_deref()),
            watched: is_truthy(self.watched.as_deref()),
        })
    }

    /// Update-side validation: as create, but score must be a number in
    /// 0..=10 and watched must be a boolean literal when present.
    pub fn validate_update(&self) -> Result<MovieInput, ApiError> {
        let score = match self.score.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => {
                let value: f64 = raw
                    .parse()
                    .map_err(|_| ApiError::validation("score must be a number between 0 and 10"))?;
                if !(0.0..=10.0).contains(&value) {
                    return Err(ApiError::validation("score must be a number between 0 and 10"));
                }
                Some(value)
            }
        };

        let watched = match self.watched.as_deref() {
            None => false,
            Some("true") => true,
            Some("false") => false,
            Some(_) => return Err(ApiError::validation("watched must be a boolean")),
        };

        Ok(MovieInput {
            title: require(self.title.as_deref(), "title")?,
            director: require(self.director.as_deref(), "director")?,
            genre: require(self.genre.as_deref(), "genre")?,
            year: parse_year(self.year.as_deref())?,
            score,
            review: non_empty(self.review.as_deref()),
            watched,
        })
    }
}

fn require(value: Option<&str>, field: &str) -> Result<String, ApiError> {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(ApiError::Validation(format!("{field} is required"))),
    }
}

fn parse_year(value: Option<&str>) -> Result<i32, ApiError> {
    let raw = match value.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Err(ApiError::validation("year is required")),
    };
    let year: i32 = raw
        .parse()
        .map_err(|_| ApiError::validation("year must be a valid number"))?;
    if year < MIN_YEAR {
        return Err(ApiError::Validation(format!(
            "year must be {MIN_YEAR} or later"
        )));
    }
    Ok(year)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

/// Only the literal string "true" counts as watched.
fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some("true"))
}
