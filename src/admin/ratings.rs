use std::sync::Arc;

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::{Html, Response},
    routing::{get, post},
};
use maud::{Markup, html};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use super::{
    ListQuery, object_id,
    form::{Cleaner, Errors, FormData},
    widgets::{self, Column, Row, Sort},
};
use crate::{
    AppState,
    entities::{movie, rating, rating_star},
    error::{AppError, AppResult},
};

const SLUG: &str = "ratings";
const COLUMNS: &[Column] =
    &[Column::new("star", "Star"), Column::new("movie", "Movie"), Column::new("ip", "IP address")];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/ratings/", get(list))
        .route("/admin/ratings/add/", get(add_form).post(create))
        .route("/admin/ratings/{id}/", get(edit_form).post(update))
        .route("/admin/ratings/{id}/delete/", post(delete))
}

/// Select options for the two foreign keys.
struct Choices {
    stars: Vec<(i32, String)>,
    movies: Vec<(i32, String)>,
}

impl Choices {
    async fn load(state: &AppState) -> AppResult<Self> {
        let db = state.catalog.db();
        let stars = rating_star::Entity::find_ordered().all(db).await?;
        let movies = movie::Entity::find().order_by_asc(movie::Column::Title).all(db).await?;
        Ok(Self {
            stars: widgets::options(&stars, |s| (s.id, s.value.to_string())),
            movies: widgets::options(&movies, |m| (m.id, m.title.clone())),
        })
    }

    fn label(options: &[(i32, String)], id: i32) -> &str {
        options.iter().find(|(i, _)| *i == id).map(|(_, l)| l.as_str()).unwrap_or_default()
    }
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Html<String>> {
    let sort = Sort::parse(q.o.as_deref(), COLUMNS, "ip");
    let column = match sort.key {
        "star" => rating::Column::StarId,
        "movie" => rating::Column::MovieId,
        _ => rating::Column::Ip,
    };
    let ratings = sort
        .apply(rating::Entity::find(), column, rating::Column::Id)
        .all(state.catalog.db())
        .await?;
    let choices = Choices::load(&state).await?;

    let rows: Vec<Row> = ratings
        .iter()
        .map(|r| Row {
            id: r.id,
            cells: vec![
                html! { (Choices::label(&choices.stars, r.star_id)) },
                html! { (Choices::label(&choices.movies, r.movie_id)) },
                html! { (r.ip) },
            ],
        })
        .collect();

    Ok(widgets::render(
        "Ratings",
        html! {
            (widgets::list_header(SLUG, "Ratings", rows.len()))
            (widgets::list_table(SLUG, COLUMNS, sort, "", &rows))
        },
    ))
}

fn form_body(data: &FormData, errors: &Errors, choices: &Choices, id: Option<i32>) -> Markup {
    let action = match id {
        Some(id) => format!("/admin/{SLUG}/{id}/"),
        None => format!("/admin/{SLUG}/add/"),
    };
    html! {
        (widgets::form(&action, errors, html! {
            (widgets::text_input("IP address", "ip", data, errors, 150))
            (widgets::select("Star", "star", &choices.stars, true, data, errors))
            (widgets::select("Movie", "movie", &choices.movies, true, data, errors))
            (widgets::submit_row(false))
        }))
        @if let Some(id) = id {
            (widgets::delete_button(SLUG, id))
        }
    }
}

async fn clean(
    state: &AppState,
    data: &FormData,
    choices: &Choices,
    id: Option<i32>,
) -> AppResult<(rating::ActiveModel, Errors)> {
    let mut c = Cleaner::new(data);
    let ip = c.string("ip", 150);
    let star_id = c.choice("star", true);
    let movie_id = c.choice("movie", true);

    if star_id.is_some_and(|s| !choices.stars.iter().any(|(id, _)| *id == s)) {
        c.error("star", "Select a valid choice.");
    }
    if movie_id.is_some_and(|m| !choices.movies.iter().any(|(id, _)| *id == m)) {
        c.error("movie", "Select a valid choice.");
    }

    if let Some(movie_id) = movie_id {
        let mut taken = rating::Entity::find()
            .filter(rating::Column::Ip.eq(ip.as_str()))
            .filter(rating::Column::MovieId.eq(movie_id));
        if let Some(id) = id {
            taken = taken.filter(rating::Column::Id.ne(id));
        }
        if !ip.is_empty() && taken.count(state.catalog.db()).await? > 0 {
            c.error("__all__", "Rating with this IP address and Movie already exists.");
        }
    }

    let active = rating::ActiveModel {
        ip: Set(ip),
        star_id: Set(star_id.unwrap_or_default()),
        movie_id: Set(movie_id.unwrap_or_default()),
        ..Default::default()
    };
    Ok((active, c.finish()))
}

async fn add_form(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let choices = Choices::load(&state).await?;
    Ok(widgets::render("Add rating", form_body(&FormData::new(), &Errors::new(), &choices, None)))
}

async fn create(State(state): State<Arc<AppState>>, multipart: Multipart) -> AppResult<Response> {
    let data = FormData::from_multipart(multipart).await?;
    let choices = Choices::load(&state).await?;
    let (active, errors) = clean(&state, &data, &choices, None).await?;
    if !errors.is_empty() {
        return Ok(widgets::invalid("Add rating", form_body(&data, &errors, &choices, None)));
    }

    let saved = active.insert(state.catalog.db()).await?;
    tracing::info!(id = saved.id, movie_id = saved.movie_id, "rating created");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn find(state: &AppState, raw: &str) -> AppResult<rating::Model> {
    rating::Entity::find_by_id(object_id(raw)?)
        .one(state.catalog.db())
        .await?
        .ok_or_else(|| AppError::not_found("rating"))
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let rating = find(&state, &id).await?;
    let choices = Choices::load(&state).await?;

    let mut data = FormData::new();
    data.set("ip", &rating.ip).set("star", rating.star_id).set("movie", rating.movie_id);

    Ok(widgets::render("Change rating", form_body(&data, &Errors::new(), &choices, Some(rating.id))))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let rating = find(&state, &id).await?;
    let data = FormData::from_multipart(multipart).await?;
    let choices = Choices::load(&state).await?;

    let (mut active, errors) = clean(&state, &data, &choices, Some(rating.id)).await?;
    if !errors.is_empty() {
        return Ok(widgets::invalid(
            "Change rating",
            form_body(&data, &errors, &choices, Some(rating.id)),
        ));
    }

    active.id = Unchanged(rating.id);
    let saved = active.update(state.catalog.db()).await?;
    tracing::info!(id = saved.id, "rating updated");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let rating = find(&state, &id).await?;
    rating::Entity::delete_by_id(rating.id).exec(state.catalog.db()).await?;
    tracing::info!(id = rating.id, "rating deleted");
    Ok(widgets::redirect(&format!("/admin/{SLUG}/")))
}
