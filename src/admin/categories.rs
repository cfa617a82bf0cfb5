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
    entities::category,
    error::{AppError, AppResult},
};

const SLUG: &str = "categories";
const COLUMNS: &[Column] =
    &[Column::new("id", "Id"), Column::new("name", "Name"), Column::new("url", "Url")];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/categories/", get(list))
        .route("/admin/categories/add/", get(add_form).post(create))
        .route("/admin/categories/{id}/", get(edit_form).post(update))
        .route("/admin/categories/{id}/delete/", post(delete))
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Html<String>> {
    let sort = Sort::parse(q.o.as_deref(), COLUMNS, "id");
    let column = match sort.key {
        "name" => category::Column::Name,
        "url" => category::Column::Url,
        _ => category::Column::Id,
    };
    let categories = sort
        .apply(category::Entity::find(), column, category::Column::Id)
        .all(state.catalog.db())
        .await?;

    let rows: Vec<Row> = categories
        .iter()
        .map(|c| Row {
            id: c.id,
            cells: vec![html! { (c.id) }, html! { (c.name) }, html! { (c.url) }],
        })
        .collect();

    Ok(widgets::render(
        "Categories",
        html! {
            (widgets::list_header(SLUG, "Categories", rows.len()))
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
            (widgets::text_input("Category", "name", data, errors, 150))
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
) -> AppResult<(category::ActiveModel, Errors)> {
    let mut c = Cleaner::new(data);
    let name = c.string("name", 150);
    let description = c.text("description", None);
    let url = c.slug("url", 150);

    let mut taken = category::Entity::find().filter(category::Column::Url.eq(url.as_str()));
    if let Some(id) = id {
        taken = taken.filter(category::Column::Id.ne(id));
    }
    if !url.is_empty() && taken.count(state.catalog.db()).await? > 0 {
        c.error("url", "Category with this Url already exists.");
    }

    let active = category::ActiveModel {
        name: Set(name),
        description: Set(description),
        url: Set(url),
        ..Default::default()
    };
    Ok((active, c.finish()))
}

async fn add_form() -> Html<String> {
    widgets::render("Add category", form_body(&FormData::new(), &Errors::new(), None))
}

async fn create(State(state): State<Arc<AppState>>, multipart: Multipart) -> AppResult<Response> {
    let data = FormData::from_multipart(multipart).await?;
    let (active, errors) = clean(&state, &data, None).await?;
    if !errors.is_empty() {
        return Ok(widgets::invalid("Add category", form_body(&data, &errors, None)));
    }

    let saved = active.insert(state.catalog.db()).await?;
    tracing::info!(id = saved.id, url = %saved.url, "category created");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn find(state: &AppState, raw: &str) -> AppResult<category::Model> {
    category::Entity::find_by_id(object_id(raw)?)
        .one(state.catalog.db())
        .await?
        .ok_or_else(|| AppError::not_found("category"))
}

async fn edit_form(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let category = find(&state, &id).await?;

    let mut data = FormData::new();
    data.set("name", &category.name)
        .set("description", &category.description)
        .set("url", &category.url);

    Ok(widgets::render("Change category", form_body(&data, &Errors::new(), Some(category.id))))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let category = find(&state, &id).await?;
    let data = FormData::from_multipart(multipart).await?;

    let (mut active, errors) = clean(&state, &data, Some(category.id)).await?;
    if !errors.is_empty() {
        return Ok(widgets::invalid("Change category", form_body(&data, &errors, Some(category.id))));
    }

    active.id = Unchanged(category.id);
    let saved = active.update(state.catalog.db()).await?;
    tracing::info!(id = saved.id, "category updated");
    Ok(widgets::after_save(&data, SLUG, saved.id))
}

async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let category = find(&state, &id).await?;
    category::Entity::delete_by_id(category.id).exec(state.catalog.db()).await?;
    tracing::info!(id = category.id, "category deleted");
    Ok(widgets::redirect(&format!("/admin/{SLUG}/")))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use sea_orm::{EntityTrait, PaginatorTrait};
    use tower::ServiceExt;

    use crate::{
        entities::{category, movie},
        test_support::{body_string, create_category, create_movie, multipart_post, test_state},
    };

    fn post(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
        multipart_post(uri, fields, &[])
    }

    #[tokio::test]
    async fn create_validates_and_redirects() {
        let (state, db) = test_state().await;
        let app = crate::router(state);
        create_category(&db, "Feature", "feature").await;

        let resp = app
            .clone()
            .oneshot(post(
                "/admin/categories/add/",
                &[("name", "Series"), ("description", "Episodic"), ("url", "feature")],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(resp).await.contains("Category with this Url already exists."));

        let resp = app
            .oneshot(post(
                "/admin/categories/add/",
                &[("name", "Series"), ("description", "Episodic"), ("url", "series")],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/admin/categories/");
        assert_eq!(category::Entity::find().count(&db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn edit_keeps_own_url_and_delete_cascades() {
        let (state, db) = test_state().await;
        let app = crate::router(state);
        let cat = create_category(&db, "Feature", "feature").await;
        create_movie(&db, cat.id, "Heat", "heat", 1995, false).await;

        let uri = format!("/admin/categories/{}/", cat.id);
        let resp = app
            .clone()
            .oneshot(post(
                &uri,
                &[("name", "Features"), ("description", "Long"), ("url", "feature"), ("_continue", "")],
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], uri.as_str());
        let stored = category::Entity::find_by_id(cat.id).one(&db).await.unwrap().unwrap();
        assert_eq!(stored.name, "Features");

        let resp = app.oneshot(post(&format!("{uri}delete/"), &[])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(category::Entity::find().count(&db).await.unwrap(), 0);
        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn list_sorts_by_requested_column() {
        let (state, db) = test_state().await;
        let app = crate::router(state);
        create_category(&db, "Alpha", "zulu").await;
        create_category(&db, "Bravo", "yankee").await;

        let req = Request::builder().uri("/admin/categories/?o=-name").body(Body::empty()).unwrap();
        let html = body_string(app.clone().oneshot(req).await.unwrap()).await;
        assert!(html.find("Bravo").unwrap() < html.find("Alpha").unwrap());

        let req = Request::builder().uri("/admin/categories/?o=url").body(Body::empty()).unwrap();
        let html = body_string(app.oneshot(req).await.unwrap()).await;
        assert!(html.find("yankee").unwrap() < html.find("zulu").unwrap());
    }
}
