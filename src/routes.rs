use std::sync::Arc;

use axum::{
    extract::{Form, Path, Query, State, rejection::FormRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    AppState,
    catalog::NewReview,
    error::{AppError, AppResult},
    extract::ClientIp,
    models::{RatingForm, ReviewForm},
    templates,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    year: Vec<i32>,
    #[serde(default)]
    genres: Vec<i32>,
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    page: Option<String>,
}

/// 1-based page number; anything but a positive integer is NotFound.
fn page_number(raw: Option<&str>) -> AppResult<u64> {
    match raw.map(str::trim) {
        None | Some("") => Ok(1),
        Some(s) => s.parse::<u64>().ok().filter(|n| *n > 0).ok_or_else(|| AppError::not_found("page")),
    }
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Html<String>> {
    let page = state.catalog.published(page_number(q.page.as_deref())?).await?;
    let frame = state.catalog.frame().await?;
    Ok(Html(templates::movies_page("Movies", &frame, &page, "", None)))
}

pub async fn filter(
    State(state): State<Arc<AppState>>,
    axum_extra::extract::Query(q): axum_extra::extract::Query<FilterQuery>,
) -> AppResult<Html<String>> {
    let page = state.catalog.filter(&q.year, &q.genres, page_number(q.page.as_deref())?).await?;
    let frame = state.catalog.frame().await?;

    let query: String = q
        .year
        .iter()
        .map(|y| format!("year={y}&"))
        .chain(q.genres.iter().map(|g| format!("genres={g}&")))
        .collect();

    Ok(Html(templates::movies_page("Filtered movies", &frame, &page, &query, None)))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Html<String>> {
    let term = q.q.unwrap_or_default();
    let page = state.catalog.search(&term, page_number(q.page.as_deref())?).await?;
    let frame = state.catalog.frame().await?;
    let query = format!("q={}&", urlencoding::encode(&term));
    Ok(Html(templates::movies_page("Search", &frame, &page, &query, Some(&term))))
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> AppResult<Html<String>> {
    let detail = state.catalog.movie_detail(&slug).await?;
    let frame = state.catalog.frame().await?;
    Ok(Html(templates::movie_page(&frame, &detail)))
}

pub async fn actor_detail(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> AppResult<Html<String>> {
    let detail = state.catalog.actor_detail(&name).await?;
    let frame = state.catalog.frame().await?;
    Ok(Html(templates::actor_page(&frame, &detail)))
}

pub async fn add_rating(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    form: Result<Form<RatingForm>, FormRejection>,
) -> AppResult<StatusCode> {
    let Form(form) = form.map_err(|e| AppError::validation(e.body_text()))?;

    let movie_id: i32 =
        form.movie.trim().parse().map_err(|_| AppError::validation("movie must be an id"))?;
    let star_id: i32 =
        form.star.trim().parse().map_err(|_| AppError::validation("star must be an id"))?;

    state.catalog.rate(&ip, movie_id, star_id).await?;
    tracing::info!(%ip, movie_id, star_id, "rating saved");

    Ok(StatusCode::CREATED)
}

/// Stores a review and redirects to the movie. Invalid submissions are
/// dropped and redirect all the same.
pub async fn add_review(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
    form: Result<Form<ReviewForm>, FormRejection>,
) -> AppResult<Response> {
    let movie_id: i32 = movie_id.parse().map_err(|_| AppError::not_found("movie"))?;
    let movie = state.catalog.movie_by_id(movie_id).await?;

    let review = form
        .map_err(|e| AppError::validation(e.body_text()))
        .and_then(|Form(form)| {
            form.validate().map_err(|e| AppError::validation(e.to_string()))?;
            let parent_id =
                form.parent_id().map_err(|_| AppError::validation("parent must be an id"))?;
            Ok(NewReview { name: form.name, email: form.email, text: form.text, parent_id })
        });

    let saved = match review {
        Ok(review) => state.catalog.add_review(&movie, review).await,
        Err(err) => Err(err),
    };

    match saved {
        Ok(review) => tracing::info!(movie_id, review_id = review.id, "review saved"),
        Err(AppError::Validation(reason)) => {
            tracing::warn!(movie_id, %reason, "review dropped")
        }
        Err(err) => return Err(err),
    }

    Ok((StatusCode::FOUND, [(header::LOCATION, movie.absolute_url())]).into_response())
}
