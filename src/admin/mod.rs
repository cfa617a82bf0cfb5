//! Staff console: list, add, edit and delete screens for every table.
//!
//! Each entity module registers its own absolute `/admin/<slug>/...` routes.
//! Forms are multipart so image fields can be uploaded alongside text.

mod actors;
mod categories;
mod form;
mod genres;
mod movies;
mod ratings;
mod reviews;
mod shorts;
mod stars;
mod widgets;

use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::{Html, Response},
    routing::get,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Basic};
use maud::html;
use serde::Deserialize;

use crate::{
    AppState,
    error::{AppError, AppResult},
};

/// `(slug, label)` for every entity, in menu order.
pub const ENTITIES: &[(&str, &str)] = &[
    ("categories", "Categories"),
    ("actors", "Actors and directors"),
    ("genres", "Genres"),
    ("movies", "Movies"),
    ("shorts", "Movie shorts"),
    ("stars", "Rating stars"),
    ("ratings", "Ratings"),
    ("reviews", "Reviews"),
];

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    o: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/", get(index))
        .merge(categories::routes())
        .merge(actors::routes())
        .merge(genres::routes())
        .merge(movies::routes())
        .merge(shorts::routes())
        .merge(stars::routes())
        .merge(ratings::routes())
        .merge(reviews::routes())
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

async fn index() -> Html<String> {
    widgets::render(
        "Site administration",
        html! {
            ul class="bg-white shadow rounded-lg divide-y divide-gray-200" {
                @for (slug, label) in ENTITIES {
                    li class="flex items-center justify-between px-6 py-3" {
                        a class="text-blue-600 hover:text-blue-800" href=(format!("/admin/{slug}/")) { (label) }
                        a class="text-sm text-gray-500 hover:text-gray-700" href=(format!("/admin/{slug}/add/")) { "+ Add" }
                    }
                }
            }
        },
    )
}

/// Compares in time that depends only on the lengths, not on where the
/// first differing byte is.
fn same_secret(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    let diff = given
        .iter()
        .zip(expected)
        .fold(given.len() ^ expected.len(), |acc, (a, b)| acc | usize::from(a ^ b));
    diff == 0
}

/// Rejects requests whose Basic credentials do not match the configured
/// pair. Without configured credentials every request passes.
async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = &state.config.admin {
        let authorized = request
            .headers()
            .typed_get::<Authorization<Basic>>()
            .is_some_and(|auth| {
                // Both halves are always compared.
                let user = same_secret(auth.username(), &expected.username);
                let password = same_secret(auth.password(), &expected.password);
                user & password
            });

        if !authorized {
            tracing::warn!(path = %request.uri().path(), "admin credentials rejected");
            return Err(AppError::Unauthorized);
        }
    }

    Ok(next.run(request).await)
}

/// Path id of an admin object; anything unparsable is NotFound.
fn object_id(raw: &str) -> AppResult<i32> {
    raw.parse().map_err(|_| AppError::not_found("object"))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    use crate::{
        config::AdminCredentials,
        test_support::{body_string, test_state, test_state_with},
    };

    fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn guarded_app() -> Router {
        let admin = AdminCredentials { username: "staff".into(), password: "secret".into() };
        let (state, _db) = test_state_with(Some(admin)).await;
        crate::router(state)
    }

    #[tokio::test]
    async fn credentials_are_required_when_configured() {
        let app = guarded_app().await;

        let resp = app.clone().oneshot(get("/admin/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Basic realm=\"cinema admin\"");

        // staff:wrong
        let resp = app.clone().oneshot(get("/admin/movies/", Some("Basic c3RhZmY6d3Jvbmc="))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // staff:secret
        let resp = app.clone().oneshot(get("/admin/movies/", Some("Basic c3RhZmY6c2VjcmV0"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app.oneshot(get("/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn secrets_match_only_when_identical() {
        assert!(super::same_secret("secret", "secret"));
        assert!(!super::same_secret("secreT", "secret"));
        assert!(!super::same_secret("secret", "secrets"));
        assert!(!super::same_secret("", "secret"));
        assert!(super::same_secret("", ""));
    }

    #[tokio::test]
    async fn open_console_lists_every_entity() {
        let (state, _db) = test_state().await;
        let app = crate::router(state);

        let resp = app.clone().oneshot(get("/admin/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_string(resp).await;
        for (slug, _) in super::ENTITIES {
            assert!(html.contains(&format!("/admin/{slug}/")), "{slug}");
            let resp = app.clone().oneshot(get(&format!("/admin/{slug}/"), None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{slug}");
            let resp = app.clone().oneshot(get(&format!("/admin/{slug}/add/"), None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "{slug}");
        }

        let resp = app.clone().oneshot(get("/admin/movies/42/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = app.oneshot(get("/admin/movies/abc/", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
