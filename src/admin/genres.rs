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
    Set,
};

use super::{
    ListQuery, object_id,
    form::{Cleaner, Errors, FormData},
    widgets::{self, Column, Row, Sort},
};
use crate::{
    AppState,
    entities::genre,
    error::{AppError, AppResult},
};

const SLUG: &str = "genres";
const COLUMNS: &[Column] = &[Column::new("name", "Name"), Column::new("url", "Url")];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/genres/", get(list))
        .route("/admin/genres/add/", get(add_form).post(create))
        .route("/admin/genres/{id}/", get(edit_form).post(update))
        .route("/admin/genres/{id}/delete/", post(delete))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Html<String>> {
    let sort = Sort::parse(q.o.as_deref(), COLUMNS, "name");
    let column = match sort.key {
        "url" => genre::Column::Url,
        _ => genre::Column::Name,
    };
    let genres = sort
        .apply(genre::Entity::find(), column, genre::Column::Id)
        .all(state.catalog.db())
        .await?;

    let rows: Vec<Row> = genres
        .iter()
        .map(|g| Row {
            id: g.id,
            cells: vec![html! { (g.name) }, html! { (g.url) }],
        })
        .collect();

    Ok(widgets::render(
        "Genres",
        html! {
            (widgets::list_header(SLUG, "Genres", rows.len()))
            (widgets::list_table(SLUG, COLUMNS, sort, "", &rows))
        },
    ))
}

fn form_body(data: &FormData, errors: &Errors, id: Option<i32>) -> Markup {
    let action = match id {
        Some(id) => format!("/admin/{SLUG}/{id}/"),
        None => format!("/admin/{SLUG}/add/"),
    };
    html! {
        (widgets::form(&action, errors, html! {
            (widgets::text_input("Name", "name", data, errors, 150))
            (widgets::textarea("Description", "description", data, errors))
            (widgets::text_input("Url", "url", data, errors, 150))
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
    id: Option<i32>,
) -> AppResult<(genre::ActiveModel, Errors)> {
    let mut c = Cleaner::new(data);
    let name = c.string("name", 150);
    let description = c.text("description", None);
    let url = c.slug("url", 150);

    let mut taken = genre::Entity::find().filter(genre::Column::Url.eq(url.as_str()));
    if let Some(id) = id {
        taken = taken.filter(genre::Column::Id.ne(id));
    }
    if !url.is_empty() && taken.count(state.catalog.db()).await? > 0 {
        c.error("url", "Genre with this Url already exists.");
    }

    let active = genre::ActiveModel {
        name: Set(name),
        description: Set(description),
        url: Set(url),
        ..Default::default()
    };
    Ok((active, c.finish()))
}

async fn add_form() -> Html<String> {
    widgets::render("Add genre", form_body(&FormData::new(), &Errors::new(), None))
}

async fn create(State(state): State<Arc<AppState>>, multipart: Multipart) -> AppResult<Response> {
    let data = FormData::from_multipart(multipart).await?;
    let (active, errors) = clean(&state, &data, None).await?;
    if !errors.is_empty() {
        return Ok(widgets::invalid("Add genre", form_body(&data, &errors, None)));
    }

    let saved = active.insert(state.catalog.db()).await?;
    tracing::info!(id = saved.id, url = %saved.url, "genre created");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn find(state: &AppState, raw: &str) -> AppResult<genre::Model> {
    genre::Entity::find_by_id(object_id(raw)?)
        .one(state.catalog.db())
        .await?
        .ok_or_else(|| AppError::not_found("genre"))
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let genre = find(&state, &id).await?;

    let mut data = FormData::new();
    data.set("name", &genre.name)
        .set("description", &genre.description)
        .set("url", &genre.url);

    Ok(widgets::render("Change genre", form_body(&data, &Errors::new(), Some(genre.id))))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let genre = find(&state, &id).await?;
    let data = FormData::from_multipart(multipart).await?;

    let (mut active, errors) = clean(&state, &data, Some(genre.id)).await?;
    if !errors.is_empty() {
        return Ok(widgets::invalid("Change genre", form_body(&data, &errors, Some(genre.id))));
    }

    active.id = Unchanged(genre.id);
    let saved = active.update(state.catalog.db()).await?;
    tracing::info!(id = saved.id, "genre updated");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let genre = find(&state, &id).await?;
    genre::Entity::delete_by_id(genre.id).exec(state.catalog.db()).await?;
    tracing::info!(id = genre.id, "genre deleted");
    Ok(widgets::redirect(&format!("/admin/{SLUG}/")))
}
