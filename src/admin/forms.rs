use std::{collections::BTreeMap, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};

const TIMESTAMP_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const TIMESTAMP_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str = "Select a valid choice.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Widget {
    Text { max_length: usize },
    Password,
    Number,
    Checkbox,
    DateTime,
    Select,
    ReadOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// One input on an admin add/change page.
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub widget: Widget,
    pub value: String,
    pub options: Vec<SelectOption>,
    pub help: &'static str,
    pub error: String,
}

impl FormField {
    fn new(name: &'static str, label: &'static str, widget: Widget, value: &str) -> Self {
        return Self {
            name,
            label,
            widget,
            value: value.to_string(),
            options: vec![],
            help: "",
            error: String::new(),
        };
    }

    pub fn text(name: &'static str, label: &'static str, value: &str, max_length: usize) -> Self {
        return Self::new(name, label, Widget::Text { max_length }, value);
    }

    pub fn password(name: &'static str, label: &'static str) -> Self {
        return Self::new(name, label, Widget::Password, "");
    }

    pub fn number(name: &'static str, label: &'static str, value: &str) -> Self {
        return Self::new(name, label, Widget::Number, value);
    }

    pub fn checkbox(name: &'static str, label: &'static str, checked: bool) -> Self {
        let value = if checked { "on" } else { "" };

        return Self::new(name, label, Widget::Checkbox, value);
    }

    pub fn datetime(name: &'static str, label: &'static str, value: &str) -> Self {
        return Self::new(name, label, Widget::DateTime, value);
    }

    pub fn readonly(name: &'static str, label: &'static str, value: &str) -> Self {
        return Self::new(name, label, Widget::ReadOnly, value);
    }

    /// `blank` adds a leading empty choice, for optional foreign keys.
    pub fn select(
        name: &'static str,
        label: &'static str,
        value: &str,
        choices: Vec<(String, String)>,
        blank: Option<&str>,
    ) -> Self {
        let mut field = Self::new(name, label, Widget::Select, value);

        let blank = blank.map(|label| (String::new(), label.to_string()));

        field.options = blank
            .into_iter()
            .chain(choices)
            .map(|(choice, label)| SelectOption {
                selected: choice == value,
                value: choice,
                label,
            })
            .collect();

        return field;
    }

    pub fn with_help(mut self, help: &'static str) -> Self {
        self.help = help;
        return self;
    }

    pub fn with_errors(mut self, errors: &FieldErrors) -> Self {
        if let Some(error) = errors.get(self.name) {
            self.error = error.to_string();
        }

        return self;
    }

    pub fn input_type(&self) -> &'static str {
        return match self.widget {
            Widget::Text { .. } | Widget::ReadOnly | Widget::Select => "text",
            Widget::Password => "password",
            Widget::Number => "number",
            Widget::Checkbox => "checkbox",
            Widget::DateTime => "datetime-local",
        };
    }

    pub fn max_length(&self) -> usize {
        return match self.widget {
            Widget::Text { max_length } => max_length,
            _ => 0,
        };
    }

    pub fn is_select(&self) -> bool {
        return self.widget == Widget::Select;
    }

    pub fn is_checkbox(&self) -> bool {
        return self.widget == Widget::Checkbox;
    }

    pub fn is_checked(&self) -> bool {
        return self.is_checkbox() && !self.value.is_empty();
    }

    pub fn is_readonly(&self) -> bool {
        return self.widget == Widget::ReadOnly;
    }

    pub fn has_error(&self) -> bool {
        return !self.error.is_empty();
    }
}

/// Per-field validation messages, collected while a submitted form is parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        return self.0.get(field).map(String::as_str);
    }

    pub fn is_empty(&self) -> bool {
        return self.0.is_empty();
    }

    /// Required text, trimmed, at most `max_length` characters.
    pub fn text(&mut self, field: &'static str, raw: &str, max_length: usize) -> String {
        let value = raw.trim().to_string();

        if value.is_empty() {
            self.add(field, REQUIRED);
        } else if value.chars().count() > max_length {
            self.add(
                field,
                format!(
                    "Ensure this value has at most {max_length} characters (it has {}).",
                    value.chars().count()
                ),
            );
        }

        return value;
    }

    /// Empty input is `None`; anything else must parse.
    pub fn choice<T: FromStr>(&mut self, field: &'static str, raw: &str) -> Option<Option<T>> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Some(None);
        }

        let Ok(value) = raw.parse() else {
            self.add(field, INVALID_CHOICE);
            return None;
        };

        return Some(Some(value));
    }

    /// A required choice, usually a foreign key.
    pub fn key<T: FromStr>(&mut self, field: &'static str, raw: &str) -> Option<T> {
        let value = self.choice(field, raw)?;

        if value.is_none() {
            self.add(field, REQUIRED);
        }

        return value;
    }

    pub fn integer(&mut self, field: &'static str, raw: &str) -> Option<i32> {
        let raw = raw.trim();

        if raw.is_empty() {
            self.add(field, REQUIRED);
            return None;
        }

        let Ok(value) = raw.parse() else {
            self.add(field, "Enter a whole number.");
            return None;
        };

        return Some(value);
    }

    /// Empty input is `None`, which the models read as "now" on create
    /// and "unchanged" on update.
    pub fn timestamp(&mut self, field: &'static str, raw: &str) -> Option<Option<DateTime<Utc>>> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Some(None);
        }

        let parsed = TIMESTAMP_INPUT_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok());

        let Some(parsed) = parsed else {
            self.add(field, "Enter a valid date/time.");
            return None;
        };

        return Some(Some(parsed.and_utc()));
    }
}

pub fn checkbox(raw: &Option<String>) -> bool {
    return raw.as_deref().is_some_and(|v| !v.is_empty() && v != "off");
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    return value.format(TIMESTAMP_INPUT_FORMAT).to_string();
}

/// Change forms show whole seconds. Resubmitting the shown value gives
/// `None`, so the update keeps the stored sub-seconds.
pub fn changed_timestamp(
    submitted: Option<DateTime<Utc>>,
    stored: &DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    return submitted.filter(|submitted| format_timestamp(submitted) != format_timestamp(stored));
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn required_text_is_trimmed_and_bounded() {
        let mut errors = FieldErrors::new();

        assert_eq!(errors.text("name", "  Office Bingo ", 20), "Office Bingo");
        assert!(errors.is_empty());

        errors.text("name", "   ", 20);
        assert_eq!(errors.get("name"), Some(REQUIRED));

        let mut errors = FieldErrors::new();
        errors.text("player_name", &"p".repeat(65), 64);
        assert_eq!(
            errors.get("player_name"),
            Some("Ensure this value has at most 64 characters (it has 65).")
        );
    }

    #[test]
    fn max_length_counts_characters() {
        let mut errors = FieldErrors::new();

        errors.text("player_name", &"ü".repeat(64), 64);

        assert!(errors.is_empty());
    }

    #[test]
    fn first_error_per_field_wins() {
        let mut errors = FieldErrors::new();

        errors.add("author", REQUIRED);
        errors.add("author", INVALID_CHOICE);

        assert_eq!(errors.get("author"), Some(REQUIRED));
    }

    #[test]
    fn keys_distinguish_missing_from_invalid() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.key::<i64>("game_set", "12"), Some(12));
        assert!(errors.is_empty());

        assert_eq!(errors.key::<i64>("game_set", ""), None);
        assert_eq!(errors.get("game_set"), Some(REQUIRED));

        let mut errors = FieldErrors::new();
        assert_eq!(errors.key::<uuid::Uuid>("game", "not-a-uuid"), None);
        assert_eq!(errors.get("game"), Some(INVALID_CHOICE));
    }

    #[test]
    fn optional_choices_accept_blank() {
        let mut errors = FieldErrors::new();

        assert_eq!(errors.choice::<i64>("owner", ""), Some(None));
        assert_eq!(errors.choice::<i64>("owner", "5"), Some(Some(5)));
        assert!(errors.is_empty());
    }

    #[test]
    fn integers_must_parse() {
        let mut errors = FieldErrors::new();

        assert_eq!(errors.integer("player_count", " 4 "), Some(4));
        assert_eq!(errors.integer("player_count", "four"), None);
        assert_eq!(errors.get("player_count"), Some("Enter a whole number."));
    }

    #[test]
    fn timestamps_accept_minutes_or_seconds() {
        let mut errors = FieldErrors::new();
        let expected = Utc.with_ymd_and_hms(2024, 3, 9, 18, 5, 0).unwrap();

        assert_eq!(
            errors.timestamp("created_date", "2024-03-09T18:05"),
            Some(Some(expected))
        );
        assert_eq!(
            errors.timestamp("created_date", "2024-03-09T18:05:00"),
            Some(Some(expected))
        );
        assert_eq!(errors.timestamp("created_date", ""), Some(None));
        assert!(errors.is_empty());

        assert_eq!(errors.timestamp("created_date", "yesterday"), None);
        assert_eq!(errors.get("created_date"), Some("Enter a valid date/time."));
    }

    #[test]
    fn timestamps_format_for_datetime_inputs() {
        let value = Utc.with_ymd_and_hms(2024, 3, 9, 18, 5, 7).unwrap();

        assert_eq!(format_timestamp(&value), "2024-03-09T18:05:07");
    }

    #[test]
    fn resubmitted_timestamps_keep_sub_seconds() {
        let stored = Utc.with_ymd_and_hms(2024, 3, 9, 18, 5, 7).unwrap()
            + chrono::Duration::microseconds(26_490);

        let mut errors = FieldErrors::new();
        let shown = errors.timestamp("created_date", &format_timestamp(&stored)).unwrap();

        assert_eq!(changed_timestamp(shown, &stored), None);
        assert_eq!(changed_timestamp(None, &stored), None);

        let edited = Utc.with_ymd_and_hms(2024, 3, 9, 18, 6, 0).unwrap();
        assert_eq!(changed_timestamp(Some(edited), &stored), Some(edited));
    }

    #[test]
    fn checkboxes_read_browser_values() {
        assert!(checkbox(&Some("on".to_string())));
        assert!(checkbox(&Some("true".to_string())));
        assert!(!checkbox(&Some(String::new())));
        assert!(!checkbox(&None));
    }

    #[test]
    fn select_marks_current_choice() {
        let field = FormField::select(
            "owner",
            "Owner",
            "2",
            vec![
                ("1".to_string(), "host".to_string()),
                ("2".to_string(), "caller".to_string()),
            ],
            Some("---------"),
        );

        assert!(field.is_select());
        assert_eq!(field.options.len(), 3);
        assert_eq!(field.options[0].value, "");
        assert!(!field.options[1].selected);
        assert!(field.options[2].selected);
    }

    #[test]
    fn errors_attach_to_matching_field() {
        let mut errors = FieldErrors::new();
        errors.add("name", REQUIRED);

        let name = FormField::text("name", "Name", "", 1000).with_errors(&errors);
        let free_space = FormField::text("free_space", "Free space", "Free", 1000).with_errors(&errors);

        assert!(name.has_error());
        assert_eq!(name.max_length(), 1000);
        assert!(!free_space.has_error());
    }
}
