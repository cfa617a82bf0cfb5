use std::sync::Arc;

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::{Html, Response},
    routing::{get, post},
};
use maud::{Markup, html};
use sea_orm::{ActiveModelTrait, ActiveValue::Unchanged, EntityTrait, Set};

use super::{
    ListQuery, object_id,
    form::{Cleaner, Errors, FormData},
    widgets::{self, Column, Row, Sort},
};
use crate::{
    AppState,
    entities::rating_star,
    error::{AppError, AppResult},
};

const SLUG: &str = "stars";
const COLUMNS: &[Column] = &[Column::new("value", "Value")];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/stars/", get(list))
        .route("/admin/stars/add/", get(add_form).post(create))
        .route("/admin/stars/{id}/", get(edit_form).post(update))
        .route("/admin/stars/{id}/delete/", post(delete))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Html<String>> {
    // Stars read highest first unless a column header says otherwise.
    let sort = match q.o.as_deref() {
        None | Some("") => Sort { key: "value", desc: true },
        o => Sort::parse(o, COLUMNS, "value"),
    };
    let stars = sort
        .apply(rating_star::Entity::find(), rating_star::Column::Value, rating_star::Column::Id)
        .all(state.catalog.db())
        .await?;

    let rows: Vec<Row> =
        stars.iter().map(|s| Row { id: s.id, cells: vec![html! { (s.value) }] }).collect();

    Ok(widgets::render(
        "Rating stars",
        html! {
            (widgets::list_header(SLUG, "Rating stars", rows.len()))
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
            (widgets::number_input("Value", "value", data, errors))
            (widgets::submit_row(false))
        }))
        @if let Some(id) = id {
            (widgets::delete_button(SLUG, id))
        }
    }
}

fn clean(data: &FormData) -> (rating_star::ActiveModel, Errors) {
    let mut c = Cleaner::new(data);
    let value = c.small("value");
    (rating_star::ActiveModel { value: Set(value), ..Default::default() }, c.finish())
}

async fn add_form() -> Html<String> {
    let mut data = FormData::new();
    data.set("value", 0);
    widgets::render("Add rating star", form_body(&data, &Errors::new(), None))
}

async fn create(State(state): State<Arc<AppState>>, multipart: Multipart) -> AppResult<Response> {
    let data = FormData::from_multipart(multipart).await?;
    let (active, errors) = clean(&data);
    if !errors.is_empty() {
        return Ok(widgets::invalid("Add rating star", form_body(&data, &errors, None)));
    }

    let saved = active.insert(state.catalog.db()).await?;
    tracing::info!(id = saved.id, value = saved.value, "rating star created");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn find(state: &AppState, raw: &str) -> AppResult<rating_star::Model> {
    rating_star::Entity::find_by_id(object_id(raw)?)
        .one(state.catalog.db())
        .await?
        .ok_or_else(|| AppError::not_found("rating star"))
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let star = find(&state, &id).await?;
    let mut data = FormData::new();
    data.set("value", star.value);
    Ok(widgets::render("Change rating star", form_body(&data, &Errors::new(), Some(star.id))))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let star = find(&state, &id).await?;
    let data = FormData::from_multipart(multipart).await?;

    let (mut active, errors) = clean(&data);
    if !errors.is_empty() {
        return Ok(widgets::invalid("Change rating star", form_body(&data, &errors, Some(star.id))));
    }

    active.id = Unchanged(star.id);
    let saved = active.update(state.catalog.db()).await?;
    tracing::info!(id = saved.id, value = saved.value, "rating star updated");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let star = find(&state, &id).await?;
    rating_star::Entity::delete_by_id(star.id).exec(state.catalog.db()).await?;
    tracing::info!(id = star.id, "rating star deleted");
    Ok(widgets::redirect(&format!("/admin/{SLUG}/")))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use sea_orm::{EntityTrait, PaginatorTrait};
    use tower::ServiceExt;

    use crate::{
        entities::{rating, rating_star},
        test_support::{
            body_string, create_category, create_movie, multipart_post, test_state,
        },
    };

    #[tokio::test]
    async fn seeded_stars_list_highest_first() {
        let (state, _db) = test_state().await;
        let app = crate::router(state);

        let req = Request::builder().uri("/admin/stars/").body(Body::empty()).unwrap();
        let html = body_string(app.oneshot(req).await.unwrap()).await;
        let five = html.find(">5</a>").unwrap();
        let one = html.find(">1</a>").unwrap();
        assert!(five < one);
    }

    #[tokio::test]
    async fn negative_values_are_rejected_and_delete_cascades() {
        let (state, db) = test_state().await;
        let catalog = state.catalog.clone();
        let app = crate::router(state);

        let resp = app
            .clone()
            .oneshot(multipart_post("/admin/stars/add/", &[("value", "-1")], &[]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(rating_star::Entity::find().count(&db).await.unwrap(), 5);

        let cat = create_category(&db, "Feature", "feature").await;
        let movie = create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;
        let star = rating_star::Entity::find_ordered().one(&db).await.unwrap().unwrap();
        catalog.rate("203.0.113.1", movie.id, star.id).await.unwrap();

        let resp = app
            .oneshot(multipart_post(&format!("/admin/stars/{}/delete/", star.id), &[], &[]))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(rating::Entity::find().count(&db).await.unwrap(), 0);
    }
}
