use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, PreEscaped, html};
use sea_orm::{ColumnTrait, EntityTrait, Order, QueryOrder, Select};

use super::{
    ENTITIES,
    form::{Errors, FormData},
};
use crate::{media, templates};

const CKEDITOR_CDN: &str = "https://cdn.ckeditor.com/ckeditor5/41.4.2/classic/ckeditor.js";

const INPUT: &str = "mt-1 w-full rounded-md border border-gray-300 px-3 py-2 text-sm";
const BUTTON: &str = "rounded-md bg-blue-600 px-4 py-2 text-sm font-semibold text-white hover:bg-blue-700";
const SECONDARY: &str = "rounded-md border border-gray-300 bg-white px-4 py-2 text-sm font-semibold text-gray-700 hover:bg-gray-100";

pub fn admin_page(title: &str, body: Markup) -> String {
    templates::document(
        &format!("{title} | Cinema admin"),
        html! {
            div class="min-h-screen bg-gray-50" {
                header class="bg-gray-900 text-white" {
                    div class="max-w-6xl mx-auto px-6 py-4 flex items-center gap-6" {
                        a class="text-xl font-bold" href="/admin/" { "Cinema admin" }
                        nav class="flex flex-wrap gap-4 text-sm text-gray-300" {
                            @for (slug, label) in ENTITIES {
                                a class="hover:text-white" href=(format!("/admin/{slug}/")) { (label) }
                            }
                        }
                        a class="ml-auto text-sm text-gray-300 hover:text-white" href="/" { "View site" }
                    }
                }
                main class="max-w-6xl mx-auto px-6 py-10" {
                    h1 class="text-2xl font-bold text-gray-900" { (title) }
                    div class="mt-6" { (body) }
                }
            }
        },
    )
}

pub fn render(title: &str, body: Markup) -> Html<String> {
    Html(admin_page(title, body))
}

/// The form again, with its errors, as a 400.
pub fn invalid(title: &str, body: Markup) -> Response {
    (StatusCode::BAD_REQUEST, render(title, body)).into_response()
}

pub fn redirect(location: &str) -> Response {
    (StatusCode::SEE_OTHER, [(header::LOCATION, location.to_string())]).into_response()
}

#[derive(Clone, Copy, Debug)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub sortable: bool,
}

impl Column {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label, sortable: true }
    }

    pub const fn fixed(key: &'static str, label: &'static str) -> Self {
        Self { key, label, sortable: false }
    }
}

/// List ordering from the `o` query parameter: a column key, `-` prefixed
/// for descending. Unknown or unsortable keys fall back to `default`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sort {
    pub key: &'static str,
    pub desc: bool,
}

impl Sort {
    pub fn parse(o: Option<&str>, columns: &[Column], default: &'static str) -> Self {
        let raw = o.unwrap_or_default().trim();
        let (name, desc) = match raw.strip_prefix('-') {
            Some(name) => (name, true),
            None => (raw, false),
        };

        columns
            .iter()
            .find(|c| c.sortable && c.key == name)
            .map(|c| Sort { key: c.key, desc })
            .unwrap_or(Sort { key: default, desc: false })
    }

    pub fn order(&self) -> Order {
        if self.desc { Order::Desc } else { Order::Asc }
    }

    /// Applies this order on `column`, then `id` as a tiebreaker.
    pub fn apply<E, C>(&self, select: Select<E>, column: C, id: C) -> Select<E>
    where
        E: EntityTrait,
        C: ColumnTrait,
    {
        select.order_by(column, self.order()).order_by(id, Order::Asc)
    }

    /// `o` value that a click on `key` should request.
    fn toggle(&self, key: &str) -> String {
        if self.key == key && !self.desc { format!("-{key}") } else { key.to_string() }
    }
}

pub struct Row {
    pub id: i32,
    pub cells: Vec<Markup>,
}

/// Sortable table of rows. The first cell links to the edit screen.
/// `query` carries the list's other parameters, empty or ending in `&`.
pub fn list_table(slug: &str, columns: &[Column], sort: Sort, query: &str, rows: &[Row]) -> Markup {
    html! {
        div class="bg-white shadow rounded-lg overflow-x-auto" {
            table class="min-w-full text-sm" {
                thead class="bg-gray-100 text-left text-gray-700" {
                    tr {
                        @for column in columns {
                            th class="px-4 py-2 font-semibold" {
                                @if column.sortable {
                                    a class="hover:text-blue-700" href=(format!("?{query}o={}", sort.toggle(column.key))) {
                                        (column.label)
                                        @if sort.key == column.key {
                                            @if sort.desc { " ▼" } @else { " ▲" }
                                        }
                                    }
                                } @else {
                                    (column.label)
                                }
                            }
                        }
                    }
                }
                tbody class="divide-y divide-gray-200" {
                    @for row in rows {
                        tr {
                            @for (i, cell) in row.cells.iter().enumerate() {
                                td class="px-4 py-2 align-middle" {
                                    @if i == 0 {
                                        a class="text-blue-600 hover:text-blue-800" href=(format!("/admin/{slug}/{}/", row.id)) { (cell) }
                                    } @else {
                                        (cell)
                                    }
                                }
                            }
                        }
                    }
                }
            }
            @if rows.is_empty() {
                p class="p-4 text-gray-500" { "Nothing here yet." }
            }
        }
    }
}

pub fn list_header(slug: &str, label: &str, count: usize) -> Markup {
    html! {
        div class="mb-4 flex items-center justify-between" {
            p class="text-sm text-gray-600" { (count) " " (label.to_lowercase()) }
            a class=(BUTTON) href=(format!("/admin/{slug}/add/")) { "Add" }
        }
    }
}

pub fn thumbnail(path: &str, width: u32, height: Option<u32>) -> Markup {
    html! {
        @if !path.is_empty() {
            @if let Some(height) = height {
                img src=(media::url(path)) width=(width) height=(height) alt="";
            } @else {
                img src=(media::url(path)) width=(width) alt="";
            }
        }
    }
}

pub fn error_summary(errors: &Errors) -> Markup {
    html! {
        @if !errors.is_empty() {
            div class="mb-6 rounded-md border border-red-200 bg-red-50 p-4 text-sm text-red-700" {
                "Please correct the errors below."
                @if let Some(message) = errors.get("__all__") {
                    p class="mt-1" { (message) }
                }
            }
        }
    }
}

fn field(label: &str, name: &str, errors: &Errors, input: Markup) -> Markup {
    html! {
        div class="mb-4" {
            label class="block text-sm font-medium text-gray-700" for=(name) { (label) }
            (input)
            @if let Some(message) = errors.get(name) {
                p class="mt-1 text-sm text-red-600" { (message) }
            }
        }
    }
}

pub fn text_input(label: &str, name: &str, data: &FormData, errors: &Errors, max: usize) -> Markup {
    field(
        label,
        name,
        errors,
        html! { input class=(INPUT) type="text" id=(name) name=(name) value=(data.text(name)) maxlength=(max); },
    )
}

pub fn email_input(label: &str, name: &str, data: &FormData, errors: &Errors) -> Markup {
    field(
        label,
        name,
        errors,
        html! { input class=(INPUT) type="email" id=(name) name=(name) value=(data.text(name)); },
    )
}

pub fn number_input(label: &str, name: &str, data: &FormData, errors: &Errors) -> Markup {
    field(
        label,
        name,
        errors,
        html! { input class=(INPUT) type="number" min="0" id=(name) name=(name) value=(data.text(name)); },
    )
}

pub fn date_input(label: &str, name: &str, data: &FormData, errors: &Errors) -> Markup {
    field(
        label,
        name,
        errors,
        html! { input class=(INPUT) type="date" id=(name) name=(name) value=(data.text(name)); },
    )
}

pub fn textarea(label: &str, name: &str, data: &FormData, errors: &Errors) -> Markup {
    field(
        label,
        name,
        errors,
        html! { textarea class=(INPUT) id=(name) name=(name) rows="6" { (data.text(name)) } },
    )
}

/// Textarea upgraded to a rich-text editor in the browser.
pub fn rich_text(label: &str, name: &str, data: &FormData, errors: &Errors) -> Markup {
    html! {
        (textarea(label, name, data, errors))
        script src=(CKEDITOR_CDN) {}
        script {
            (PreEscaped(format!(
                "ClassicEditor.create(document.getElementById('{name}')).catch(console.error);"
            )))
        }
    }
}

pub fn checkbox(label: &str, name: &str, data: &FormData, errors: &Errors) -> Markup {
    html! {
        div class="mb-4" {
            label class="inline-flex items-center gap-2 text-sm font-medium text-gray-700" {
                input type="checkbox" id=(name) name=(name) checked[data.checked(name)];
                (label)
            }
            @if let Some(message) = errors.get(name) {
                p class="mt-1 text-sm text-red-600" { (message) }
            }
        }
    }
}

/// Single choice over `(id, label)` options. `blank` adds an empty option.
pub fn select(
    label: &str,
    name: &str,
    options: &[(i32, String)],
    blank: bool,
    data: &FormData,
    errors: &Errors,
) -> Markup {
    let current = data.text(name);
    field(
        label,
        name,
        errors,
        html! {
            select class=(INPUT) id=(name) name=(name) {
                @if blank {
                    option value="" { "---------" }
                }
                @for (id, text) in options {
                    option value=(id) selected[current == id.to_string()] { (text) }
                }
            }
        },
    )
}

pub fn multi_select(
    label: &str,
    name: &str,
    options: &[(i32, String)],
    data: &FormData,
    errors: &Errors,
) -> Markup {
    let chosen = data.ids(name);
    field(
        label,
        name,
        errors,
        html! {
            select class=(INPUT) id=(name) name=(name) multiple size="6" {
                @for (id, text) in options {
                    option value=(id) selected[chosen.contains(id)] { (text) }
                }
            }
        },
    )
}

/// File picker. `current` is the stored path, previewed when present.
pub fn file_input(
    label: &str,
    name: &str,
    current: Option<&str>,
    preview: (u32, Option<u32>),
    errors: &Errors,
) -> Markup {
    field(
        label,
        name,
        errors,
        html! {
            @if let Some(path) = current.filter(|p| !p.is_empty()) {
                div class="mt-1 flex items-center gap-3 text-sm text-gray-600" {
                    (thumbnail(path, preview.0, preview.1))
                    span { "Currently: " (path) }
                }
            }
            input class="mt-1 block text-sm" type="file" accept="image/*" id=(name) name=(name);
        },
    )
}

pub fn readonly(label: &str, value: Markup) -> Markup {
    html! {
        div class="mb-4" {
            span class="block text-sm font-medium text-gray-700" { (label) }
            div class="mt-1 text-sm text-gray-900" { (value) }
        }
    }
}

pub fn fieldset(legend: &str, body: Markup) -> Markup {
    html! {
        fieldset class="mb-6 rounded-lg border border-gray-200 bg-white p-6" {
            legend class="px-2 text-sm font-semibold text-gray-700" { (legend) }
            (body)
        }
    }
}

/// Save buttons. `save_as_new` adds the copy action used on existing rows.
pub fn submit_row(save_as_new: bool) -> Markup {
    html! {
        div class="my-4 flex flex-wrap gap-3" {
            button class=(BUTTON) type="submit" name="_save" { "Save" }
            button class=(SECONDARY) type="submit" name="_continue" { "Save and continue editing" }
            @if save_as_new {
                button class=(SECONDARY) type="submit" name="_saveasnew" { "Save as new" }
            }
        }
    }
}

/// Multipart form wrapper around `body`.
pub fn form(action: &str, errors: &Errors, body: Markup) -> Markup {
    html! {
        (error_summary(errors))
        form method="post" action=(action) enctype="multipart/form-data" class="bg-white shadow rounded-lg p-6" {
            (body)
        }
    }
}

pub fn delete_button(slug: &str, id: i32) -> Markup {
    html! {
        form method="post" action=(format!("/admin/{slug}/{id}/delete/")) class="mt-4"
            onsubmit="return confirm('Delete this object?');" {
            button class="rounded-md bg-red-600 px-4 py-2 text-sm font-semibold text-white hover:bg-red-700" type="submit" { "Delete" }
        }
    }
}

/// Where to go after a successful save: back to the form on
/// `_continue`, otherwise to the list.
pub fn after_save(data: &FormData, slug: &str, id: i32) -> Response {
    if data.has("_continue") || data.has("_saveasnew") {
        redirect(&format!("/admin/{slug}/{id}/"))
    } else {
        redirect(&format!("/admin/{slug}/"))
    }
}

/// `(id, label)` pairs for select widgets.
pub fn options<T>(rows: &[T], f: impl Fn(&T) -> (i32, String)) -> Vec<(i32, String)> {
    rows.iter().map(f).collect()
}
