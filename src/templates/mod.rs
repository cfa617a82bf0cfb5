mod movies;

pub use movies::{actor_page, movie_page, movies_page};

use axum::http::StatusCode;
use maud::{DOCTYPE, Markup, html};

use crate::{media, models::Frame, models::Page};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

pub fn error_page(status: StatusCode, message: &str) -> String {
    document(
        status.canonical_reason().unwrap_or("Error"),
        html! {
            div class="min-h-screen bg-gray-50 flex items-center justify-center" {
                div class="max-w-xl w-full px-6" {
                    div class="bg-white shadow rounded-lg p-8" {
                        h1 class="text-2xl font-bold text-gray-900" { (status.as_u16()) " " (status.canonical_reason().unwrap_or("Error")) }
                        p class="mt-4 text-gray-700" { (message) }
                        a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "Back" }
                    }
                }
            }
        },
    )
}

/// Public page: header with the category menu and search box, the page body,
/// and the sidebar with the filter form and the last movies.
fn page(title: &str, frame: &Frame, body: Markup) -> String {
    document(
        title,
        html! {
            div class="min-h-screen bg-gray-50" {
                header class="bg-gray-900 text-white" {
                    div class="max-w-6xl mx-auto px-6 py-4 flex items-center justify-between gap-6" {
                        a class="text-xl font-bold" href="/" { "Cinema" }
                        nav class="flex gap-4 text-sm" {
                            @for category in &frame.categories {
                                span class="text-gray-300" { (category.name) }
                            }
                        }
                        form method="get" action="/search/" class="flex" {
                            input class="rounded-l-md px-3 py-1 text-gray-900" type="search" name="q" placeholder="Search";
                            button class="rounded-r-md bg-blue-600 px-3 py-1" type="submit" { "Go" }
                        }
                    }
                }
                div class="max-w-6xl mx-auto px-6 py-10 grid gap-8 md:grid-cols-4" {
                    main class="md:col-span-3" { (body) }
                    aside class="space-y-8" {
                        (filter_form(frame))
                        (last_movies(frame))
                    }
                }
            }
        },
    )
}

fn filter_form(frame: &Frame) -> Markup {
    html! {
        form method="get" action="/filter/" class="bg-white shadow rounded-lg p-6 space-y-4" {
            h3 class="text-sm font-semibold text-gray-700" { "Genres" }
            ul class="space-y-1" {
                @for genre in &frame.genres {
                    li {
                        label class="text-sm text-gray-700" {
                            input type="checkbox" name="genres" value=(genre.id);
                            " " (genre.name)
                        }
                    }
                }
            }
            h3 class="text-sm font-semibold text-gray-700" { "Years" }
            ul class="space-y-1" {
                @for year in &frame.years {
                    li {
                        label class="text-sm text-gray-700" {
                            input type="checkbox" name="year" value=(year);
                            " " (year)
                        }
                    }
                }
            }
            button class="w-full rounded-md bg-blue-600 px-4 py-2 text-sm font-semibold text-white hover:bg-blue-700" type="submit" { "Find" }
        }
    }
}

fn last_movies(frame: &Frame) -> Markup {
    html! {
        div class="bg-white shadow rounded-lg p-6" {
            h3 class="text-sm font-semibold text-gray-700" { "Last movies" }
            ul class="mt-3 space-y-3" {
                @for movie in &frame.last_movies {
                    li class="flex items-center gap-3" {
                        img class="w-10 rounded" src=(media::url(&movie.poster)) alt="";
                        a class="text-sm text-blue-600 hover:text-blue-800" href=(movie.absolute_url()) { (movie.title) }
                    }
                }
            }
        }
    }
}

/// Previous/next links. `query` is the listing's query string without `page`,
/// either empty or ending in `&`.
fn pager<T>(page: &Page<T>, query: &str) -> Markup {
    html! {
        @if page.num_pages > 1 {
            nav class="mt-8 flex items-center justify-between text-sm" {
                @if page.has_previous() {
                    a class="text-blue-600 hover:text-blue-800" href=(format!("?{query}page={}", page.number - 1)) { "← Previous" }
                } @else {
                    span {}
                }
                span class="text-gray-500" { "Page " (page.number) " of " (page.num_pages) }
                @if page.has_next() {
                    a class="text-blue-600 hover:text-blue-800" href=(format!("?{query}page={}", page.number + 1)) { "Next →" }
                } @else {
                    span {}
                }
            }
        }
    }
}

pub(crate) fn document(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                script src=(TAILWIND_CDN) {}
            }
            body { (body) }
        }
    }
    .into_string()
}
