use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
};

use axum::{body::Bytes, extract::Multipart};
use validator::{ValidateEmail, ValidateLength, ValidateRange};

use crate::error::AppResult;

/// Field name to message.
pub type Errors = BTreeMap<String, String>;

const REQUIRED: &str = "This field is required.";

#[derive(Clone, Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Submitted (or initial) values of an admin form. Edit screens build one
/// from the stored row so rendering never distinguishes the two cases.
#[derive(Clone, Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Upload>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut data = Self::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name.is_empty() {
                continue;
            }

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if !file_name.is_empty() && !bytes.is_empty() {
                        data.files.insert(name, Upload { file_name, bytes });
                    }
                }
                None => {
                    let text = field.text().await?;
                    data.fields.entry(name).or_default().push(text);
                }
            }
        }

        Ok(data)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Display) -> &mut Self {
        self.fields.insert(name.into(), vec![value.to_string()]);
        self
    }

    pub fn set_all<I, V>(&mut self, name: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        self.fields.insert(name.into(), values.into_iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn set_checked(&mut self, name: impl Into<String>, checked: bool) -> &mut Self {
        let name = name.into();
        if checked {
            self.fields.insert(name, vec!["on".to_string()]);
        } else {
            self.fields.remove(&name);
        }
        self
    }

    /// First value, or `""` when the field is absent.
    pub fn text(&self, name: &str) -> &str {
        self.fields.get(name).and_then(|v| v.first()).map(String::as_str).unwrap_or_default()
    }

    pub fn values(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn checked(&self, name: &str) -> bool {
        !matches!(self.text(name), "" | "off" | "false" | "0")
    }

    pub fn file(&self, name: &str) -> Option<&Upload> {
        self.files.get(name)
    }

    /// Ids listed under `name`, skipping anything unparsable.
    pub fn ids(&self, name: &str) -> Vec<i32> {
        self.values(name).iter().filter_map(|v| v.trim().parse().ok()).collect()
    }
}

/// Turns raw form values into typed ones, collecting one message per field.
/// `prefix` scopes field names for inline rows.
pub struct Cleaner<'a> {
    data: &'a FormData,
    prefix: String,
    errors: Errors,
}

impl<'a> Cleaner<'a> {
    pub fn new(data: &'a FormData) -> Self {
        Self::with_prefix(data, "")
    }

    pub fn with_prefix(data: &'a FormData, prefix: impl Into<String>) -> Self {
        Self { data, prefix: prefix.into(), errors: Errors::new() }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub fn error(&mut self, name: &str, message: impl Into<String>) {
        self.errors.entry(self.key(name)).or_insert_with(|| message.into());
    }

    fn raw(&self, name: &str) -> &'a str {
        self.data.text(&self.key(name)).trim()
    }

    fn check_length(&mut self, name: &str, value: &str, max: usize) {
        if !value.validate_length(None, Some(max as u64), None) {
            self.error(name, format!("Ensure this value has at most {max} characters."));
        }
    }

    /// Required single-line text of at most `max` characters.
    pub fn string(&mut self, name: &str, max: usize) -> String {
        let value = self.raw(name);
        if value.is_empty() {
            self.error(name, REQUIRED);
        } else {
            self.check_length(name, value, max);
        }
        value.to_string()
    }

    /// Like [`Cleaner::string`] but blank is allowed.
    pub fn optional_string(&mut self, name: &str, max: usize) -> String {
        let value = self.raw(name);
        self.check_length(name, value, max);
        value.to_string()
    }

    /// Required multi-line text, kept untrimmed.
    pub fn text(&mut self, name: &str, max: Option<usize>) -> String {
        let value = self.data.text(&self.key(name));
        if value.trim().is_empty() {
            self.error(name, REQUIRED);
        } else if let Some(max) = max {
            self.check_length(name, value, max);
        }
        value.to_string()
    }

    pub fn slug(&mut self, name: &str, max: usize) -> String {
        let value = self.string(name, max);
        if !value.is_empty() && !is_slug(&value) {
            self.error(
                name,
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            );
        }
        value
    }

    pub fn email(&mut self, name: &str) -> String {
        let value = self.string(name, 254);
        if !value.is_empty() && !value.validate_email() {
            self.error(name, "Enter a valid email address.");
        }
        value
    }

    pub fn integer(&mut self, name: &str) -> i64 {
        let value = self.raw(name);
        if value.is_empty() {
            self.error(name, REQUIRED);
            return 0;
        }
        value.parse().unwrap_or_else(|_| {
            self.error(name, "Enter a whole number.");
            0
        })
    }

    pub fn non_negative(&mut self, name: &str) -> i64 {
        let value = self.integer(name);
        if !value.validate_range(Some(0_i64), None, None, None) {
            self.error(name, "Ensure this value is greater than or equal to 0.");
        }
        value
    }

    /// [`Cleaner::non_negative`] bounded to `i32`.
    pub fn small(&mut self, name: &str) -> i32 {
        let value = self.non_negative(name);
        if !value.validate_range(None, Some(i64::from(i32::MAX)), None, None) {
            self.error(name, "Ensure this value is less than or equal to 2147483647.");
            return 0;
        }
        i32::try_from(value).unwrap_or_default()
    }

    /// `YYYY-MM-DD`, normalized.
    pub fn date(&mut self, name: &str) -> String {
        let value = self.raw(name);
        if value.is_empty() {
            self.error(name, REQUIRED);
            return String::new();
        }
        match value.parse::<jiff::civil::Date>() {
            Ok(date) => date.to_string(),
            Err(_) => {
                self.error(name, "Enter a valid date.");
                value.to_string()
            }
        }
    }

    pub fn checkbox(&self, name: &str) -> bool {
        self.data.checked(&self.key(name))
    }

    /// A selected id. Blank is an error only when `required`.
    pub fn choice(&mut self, name: &str, required: bool) -> Option<i32> {
        let value = self.raw(name);
        if value.is_empty() {
            if required {
                self.error(name, REQUIRED);
            }
            return None;
        }
        match value.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                self.error(name, "Select a valid choice.");
                None
            }
        }
    }

    pub fn choices(&mut self, name: &str) -> Vec<i32> {
        let key = self.key(name);
        let mut ids = Vec::new();
        for raw in self.data.values(&key) {
            match raw.trim().parse::<i32>() {
                Ok(id) if !ids.contains(&id) => ids.push(id),
                Ok(_) => {}
                Err(_) => self.error(name, format!("“{raw}” is not a valid value.")),
            }
        }
        ids
    }

    pub fn finish(self) -> Errors {
        self.errors
    }
}

pub fn is_slug(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        let mut data = FormData::new();
        for (k, v) in pairs {
            data.fields.entry(k.to_string()).or_default().push(v.to_string());
        }
        data
    }

    #[test]
    fn cleans_typed_values() {
        let data = data(&[
            ("title", "  Heat "),
            ("year", "1995"),
            ("budget", "-5"),
            ("premiere", "1995-12-15"),
            ("url", "heat-1995"),
            ("email", "neil@example.com"),
            ("genres", "3"),
            ("genres", "1"),
            ("genres", "3"),
            ("draft", "on"),
        ]);
        let mut c = Cleaner::new(&data);

        assert_eq!(c.string("title", 150), "Heat");
        assert_eq!(c.small("year"), 1995);
        assert_eq!(c.non_negative("budget"), -5);
        assert_eq!(c.date("premiere"), "1995-12-15");
        assert_eq!(c.slug("url", 150), "heat-1995");
        assert_eq!(c.email("email"), "neil@example.com");
        assert_eq!(c.choices("genres"), vec![3, 1]);
        assert_eq!(c.choice("category", false), None);
        assert!(c.checkbox("draft"));
        assert!(!c.checkbox("missing"));

        let errors = c.finish();
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["budget"]);
    }

    #[test]
    fn reports_one_message_per_field() {
        let data = data(&[
            ("name", ""),
            ("url", "not a slug"),
            ("email", "nope"),
            ("date", "1995-13-40"),
            ("age", "x"),
            ("category", "x"),
        ]);
        let mut c = Cleaner::new(&data);
        c.string("name", 10);
        c.slug("url", 150);
        c.email("email");
        c.date("date");
        c.integer("age");
        c.choice("category", true);
        c.choice("parent", true);
        c.string("long", 1);

        let errors = c.finish();
        assert_eq!(errors["name"], REQUIRED);
        assert!(errors["url"].contains("slug"));
        assert!(errors["email"].contains("email"));
        assert_eq!(errors["date"], "Enter a valid date.");
        assert_eq!(errors["age"], "Enter a whole number.");
        assert_eq!(errors["category"], "Select a valid choice.");
        assert_eq!(errors["parent"], REQUIRED);
        assert_eq!(errors["long"], REQUIRED);
    }

    #[test]
    fn prefixes_scope_inline_rows() {
        let data = data(&[("short-4-title", "Trailer"), ("short-4-delete", "on")]);
        let mut c = Cleaner::with_prefix(&data, "short-4-");
        assert_eq!(c.string("title", 150), "Trailer");
        assert!(c.checkbox("delete"));
        c.string("description", 10);
        assert!(c.finish().contains_key("short-4-description"));
    }

    #[test]
    fn text_limits_count_characters() {
        let data = data(&[("text", &"é".repeat(5000))]);
        let mut c = Cleaner::new(&data);
        c.text("text", Some(5000));
        assert!(c.finish().is_empty());
    }

    #[test]
    fn length_and_range_bounds() {
        let data = data(&[
            ("fits", "abcde"),
            ("over", "abcdef"),
            ("note", "  abcdef  "),
            ("zero", "0"),
            ("huge", "2147483648"),
        ]);
        let mut c = Cleaner::new(&data);
        assert_eq!(c.string("fits", 5), "abcde");
        c.optional_string("over", 5);
        c.text("note", Some(9));
        assert_eq!(c.non_negative("zero"), 0);
        assert_eq!(c.small("huge"), 0);

        let errors = c.finish();
        assert_eq!(errors["over"], "Ensure this value has at most 5 characters.");
        assert_eq!(errors["note"], "Ensure this value has at most 9 characters.");
        assert!(errors["huge"].contains("2147483647"));
        assert!(!errors.contains_key("fits"));
        assert!(!errors.contains_key("zero"));
    }

    #[test]
    fn initial_values_round_trip_through_setters() {
        let mut data = FormData::new();
        data.set("year", 1999).set_all("actors", [1, 2]).set_checked("draft", true);
        assert_eq!(data.text("year"), "1999");
        assert_eq!(data.ids("actors"), vec![1, 2]);
        assert!(data.checked("draft"));
        data.set_checked("draft", false);
        assert!(!data.has("draft"));
    }
}
