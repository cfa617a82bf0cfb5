use maud::{Markup, PreEscaped, html};

use super::{page, pager};
use crate::{
    entities::{actor, movie},
    media,
    models::{ActorDetail, Frame, MovieDetail, Page, ReviewNode},
};

/// Posts the rating form as soon as a star is picked.
const RATING_SCRIPT: &str = r#"
const rating = document.querySelector('form[name=rating]');
if (rating) {
    rating.addEventListener('change', function () {
        fetch(this.action, { method: 'POST', body: new URLSearchParams(new FormData(this)) })
            .then(response => alert(response.ok ? 'Rating saved' : 'Could not save rating'))
            .catch(() => alert('Error'));
    });
}
function replyTo(name, id) {
    document.getElementById('review-parent').value = id;
    const text = document.getElementById('review-text');
    text.value = name + ', ';
    text.focus();
}
"#;

pub fn movies_page(
    title: &str,
    frame: &Frame,
    movies: &Page<movie::Model>,
    query: &str,
    search: Option<&str>,
) -> String {
    page(
        title,
        frame,
        html! {
            h1 class="text-3xl font-bold text-gray-900" { (title) }
            @if let Some(q) = search {
                p class="mt-2 text-gray-600" { "Results for “" (q) "”" }
            }
            @if movies.items.is_empty() {
                div class="mt-10 bg-white shadow rounded-lg p-8" {
                    p class="text-gray-600" { "No movies found." }
                }
            } @else {
                div class="mt-8 grid gap-6 sm:grid-cols-2" {
                    @for movie in &movies.items {
                        (movie_card(movie))
                    }
                }
            }
            (pager(movies, query))
        },
    )
}

fn movie_card(movie: &movie::Model) -> Markup {
    html! {
        div class="bg-white shadow rounded-lg overflow-hidden" {
            img class="w-full h-64 object-cover" src=(media::url(&movie.poster)) alt=(movie.title);
            div class="p-4" {
                a class="text-lg font-semibold text-gray-900 hover:text-blue-700" href=(movie.absolute_url()) { (movie.title) }
                p class="text-sm text-gray-500" { (movie.year) " · " (movie.country) }
                @if !movie.subtitle.is_empty() {
                    p class="mt-2 text-sm text-gray-700" { (movie.subtitle) }
                }
            }
        }
    }
}

pub fn movie_page(frame: &Frame, detail: &MovieDetail) -> String {
    let movie = &detail.movie;
    page(
        &movie.title,
        frame,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                div class="flex flex-col gap-6 md:flex-row" {
                    img class="w-48 rounded" src=(media::url(&movie.poster)) alt=(movie.title);
                    div class="space-y-2 text-sm text-gray-700" {
                        h1 class="text-3xl font-bold text-gray-900" { (movie.title) }
                        @if !movie.subtitle.is_empty() {
                            p class="text-gray-500" { (movie.subtitle) }
                        }
                        p { span class="font-medium" { "Year: " } (movie.year) }
                        p { span class="font-medium" { "Country: " } (movie.country) }
                        @if let Some(category) = &detail.category {
                            p { span class="font-medium" { "Category: " } (category.name) }
                        }
                        p { span class="font-medium" { "Directors: " } (people(&detail.directors)) }
                        p { span class="font-medium" { "Actors: " } (people(&detail.actors)) }
                        p {
                            span class="font-medium" { "Genres: " }
                            @for (i, genre) in detail.genres.iter().enumerate() {
                                @if i > 0 { ", " }
                                (genre.name)
                            }
                        }
                        p { span class="font-medium" { "World premiere: " } (movie.world_premiere) }
                        p { span class="font-medium" { "Budget: " } "$" (movie.budget) }
                        p { span class="font-medium" { "Fees in USA: " } "$" (movie.fees_in_usa) }
                        p { span class="font-medium" { "Fees in world: " } "$" (movie.fees_in_world) }
                        (rating_form(detail))
                    }
                }

                @if !detail.shorts.is_empty() {
                    div class="mt-8 grid gap-4 sm:grid-cols-3" {
                        @for short in &detail.shorts {
                            figure {
                                img class="rounded" src=(media::url(&short.image)) alt=(short.title);
                                figcaption class="mt-1 text-xs text-gray-500" { (short.title) }
                            }
                        }
                    }
                }

                // Authored by staff through the rich-text editor.
                div class="mt-8 prose max-w-none" { (PreEscaped(&movie.description)) }
            }

            div class="mt-8 bg-white shadow rounded-lg p-8" {
                h2 class="text-xl font-semibold text-gray-900" { "Reviews" }
                div class="mt-4 space-y-4" {
                    @for node in &detail.reviews {
                        (review_node(node))
                    }
                }
                (review_form(movie))
            }
            script { (PreEscaped(RATING_SCRIPT)) }
        },
    )
}

fn people(list: &[actor::Model]) -> Markup {
    html! {
        @for (i, person) in list.iter().enumerate() {
            @if i > 0 { ", " }
            a class="text-blue-600 hover:text-blue-800" href=(actor_url(person)) { (person.name) }
        }
    }
}

fn rating_form(detail: &MovieDetail) -> Markup {
    html! {
        form name="rating" method="post" action="/add-rating/" class="pt-2" {
            input type="hidden" name="movie" value=(detail.movie.id);
            span class="font-medium" { "Rating: " }
            @for star in &detail.stars {
                label class="mr-2" {
                    input type="radio" name="star" value=(star.id);
                    " " (star.value)
                }
            }
        }
    }
}

fn review_node(node: &ReviewNode) -> Markup {
    let review = &node.review;
    html! {
        div class="border-l-4 border-gray-200 pl-4" {
            p class="font-medium text-gray-900" { (review.name) }
            p class="mt-1 text-gray-700 whitespace-pre-line" { (review.text) }
            button class="mt-1 text-xs text-blue-600 hover:text-blue-800" type="button"
                onclick=(format!("replyTo({}, {})", js_string(&review.name), review.id)) { "Reply" }
            @if !node.replies.is_empty() {
                div class="mt-3 space-y-3" {
                    @for reply in &node.replies {
                        (review_node(reply))
                    }
                }
            }
        }
    }
}

fn review_form(movie: &movie::Model) -> Markup {
    html! {
        form method="post" action=(format!("/review/{}/", movie.id)) class="mt-8 space-y-4" {
            input type="hidden" name="parent" id="review-parent" value="";
            div {
                label class="block text-sm font-medium text-gray-700" for="review-text" { "Review" }
                textarea class="mt-2 w-full rounded-md border border-gray-300 px-3 py-2" name="text" id="review-text" rows="5" maxlength="5000" required {}
            }
            div class="grid gap-4 sm:grid-cols-2" {
                input class="rounded-md border border-gray-300 px-3 py-2" name="name" placeholder="Name" maxlength="150" required;
                input class="rounded-md border border-gray-300 px-3 py-2" type="email" name="email" placeholder="Email" required;
            }
            button class="rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" type="submit" { "Send" }
        }
    }
}

pub fn actor_page(frame: &Frame, detail: &ActorDetail) -> String {
    let actor = &detail.actor;
    page(
        &actor.name,
        frame,
        html! {
            div class="bg-white shadow rounded-lg p-8" {
                div class="flex flex-col gap-6 md:flex-row" {
                    img class="w-48 rounded" src=(media::url(&actor.image)) alt=(actor.name);
                    div class="space-y-2 text-gray-700" {
                        h1 class="text-3xl font-bold text-gray-900" { (actor.name) }
                        p { span class="font-medium" { "Age: " } (actor.age) }
                        p class="whitespace-pre-line" { (actor.description) }
                    }
                }
                (filmography("Acted in", &detail.acted_in))
                (filmography("Directed", &detail.directed))
            }
        },
    )
}

fn filmography(label: &str, movies: &[movie::Model]) -> Markup {
    html! {
        @if !movies.is_empty() {
            h2 class="mt-8 text-lg font-semibold text-gray-900" { (label) }
            ul class="mt-2 space-y-1" {
                @for movie in movies {
                    li {
                        a class="text-blue-600 hover:text-blue-800" href=(movie.absolute_url()) { (movie.title) }
                        span class="text-gray-500" { " (" (movie.year) ")" }
                    }
                }
            }
        }
    }
}

pub fn actor_url(actor: &actor::Model) -> String {
    format!("/actor/{}/", urlencoding::encode(&actor.name))
}

/// Single-quoted JavaScript string literal for use inside an HTML attribute.
fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\x3c"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
