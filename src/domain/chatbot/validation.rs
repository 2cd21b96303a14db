//! Answer validation per input type.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use super::errors::InputRejection;
use super::flow::{FlowStep, InputType};

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Validates `input` for `step`, returning the value to capture.
///
/// Numbers are captured as JSON numbers, dates normalised to `YYYY-MM-DD`,
/// option answers (text or 1-based index) as the option text, everything
/// else as the trimmed string. A malformed validation pattern is ignored.
pub fn validate_input(step: &FlowStep, input: &str) -> Result<Value, InputRejection> {
    let input = input.trim();
    if input.is_empty() {
        return Err(InputRejection::Empty);
    }

    if let Some(pattern) = step.validation_pattern.as_deref() {
        match Regex::new(pattern) {
            Ok(re) if !re.is_match(input) => return Err(InputRejection::PatternMismatch),
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(step = %step.name, error = %e, "Ignoring invalid validation pattern");
            }
        }
    }

    match step.input_type {
        InputType::Text => Ok(Value::String(input.to_string())),
        InputType::Number => parse_number(input).ok_or(InputRejection::NotANumber),
        InputType::Email => {
            if EMAIL.is_match(input) {
                Ok(Value::String(input.to_string()))
            } else {
                Err(InputRejection::NotAnEmail)
            }
        }
        InputType::Phone => normalize_phone(input)
            .map(Value::String)
            .ok_or(InputRejection::NotAPhone),
        InputType::Date => DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
            .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
            .ok_or(InputRejection::NotADate),
        InputType::Select | InputType::Button => choose_option(&step.options, input)
            .map(|option| Value::String(option.to_string()))
            .ok_or(InputRejection::UnknownOption),
    }
}

fn parse_number(input: &str) -> Option<Value> {
    if let Ok(i) = input.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f: f64 = input.parse().ok()?;
    Number::from_f64(f).map(Value::Number)
}

/// Strips formatting and keeps an optional leading `+`; 7 to 15 digits.
fn normalize_phone(input: &str) -> Option<String> {
    let plus = input.starts_with('+');
    let mut digits = String::with_capacity(input.len());
    for c in input.trim_start_matches('+').chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' | '.' => {}
            _ => return None,
        }
    }
    if !(7..=15).contains(&digits.len()) {
        return None;
    }
    Some(if plus { format!("+{}", digits) } else { digits })
}

fn choose_option<'a>(options: &'a [String], input: &str) -> Option<&'a str> {
    if let Some(option) = options.iter().find(|o| o.trim().eq_ignore_ascii_case(input)) {
        return Some(option.as_str());
    }
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| options.get(i))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(input_type: InputType) -> FlowStep {
        FlowStep::new("s", 1, "?").with_input(input_type)
    }

    #[test]
    fn empty_answer_is_rejected() {
        assert_eq!(
            validate_input(&step(InputType::Text), "   "),
            Err(InputRejection::Empty)
        );
    }

    #[test]
    fn number_is_captured_numerically() {
        let s = step(InputType::Number);
        assert_eq!(validate_input(&s, "42"), Ok(json!(42)));
        assert_eq!(validate_input(&s, " 2.5 "), Ok(json!(2.5)));
        assert_eq!(validate_input(&s, "two"), Err(InputRejection::NotANumber));
        assert_eq!(validate_input(&s, "NaN"), Err(InputRejection::NotANumber));
    }

    #[test]
    fn email_shape_is_checked() {
        let s = step(InputType::Email);
        assert_eq!(validate_input(&s, "ana@example.com"), Ok(json!("ana@example.com")));
        assert_eq!(validate_input(&s, "ana@example"), Err(InputRejection::NotAnEmail));
        assert_eq!(validate_input(&s, "ana example.com"), Err(InputRejection::NotAnEmail));
    }

    #[test]
    fn phone_is_normalized() {
        let s = step(InputType::Phone);
        assert_eq!(validate_input(&s, "+1 (555) 010-0199"), Ok(json!("+15550100199")));
        assert_eq!(validate_input(&s, "12345"), Err(InputRejection::NotAPhone));
        assert_eq!(validate_input(&s, "555-CALL-NOW"), Err(InputRejection::NotAPhone));
    }

    #[test]
    fn dates_accept_common_formats() {
        let s = step(InputType::Date);
        assert_eq!(validate_input(&s, "2024-03-09"), Ok(json!("2024-03-09")));
        assert_eq!(validate_input(&s, "09/03/2024"), Ok(json!("2024-03-09")));
        assert_eq!(validate_input(&s, "09-03-2024"), Ok(json!("2024-03-09")));
        assert_eq!(validate_input(&s, "31/02/2024"), Err(InputRejection::NotADate));
    }

    #[test]
    fn options_match_by_text_or_index() {
        let s = step(InputType::Select).with_options(["Small", "Large"]);
        assert_eq!(validate_input(&s, "large"), Ok(json!("Large")));
        assert_eq!(validate_input(&s, "1"), Ok(json!("Small")));
        assert_eq!(validate_input(&s, "0"), Err(InputRejection::UnknownOption));
        assert_eq!(validate_input(&s, "3"), Err(InputRejection::UnknownOption));
        assert_eq!(validate_input(&s, "medium"), Err(InputRejection::UnknownOption));
    }

    #[test]
    fn pattern_is_applied_on_top_of_type() {
        let s = step(InputType::Text).with_pattern(r"^[A-Z]{3}-\d{3}$");
        assert_eq!(validate_input(&s, "ABC-123"), Ok(json!("ABC-123")));
        assert_eq!(validate_input(&s, "abc-123"), Err(InputRejection::PatternMismatch));
    }

    #[test]
    fn malformed_pattern_rejects_nothing() {
        let s = step(InputType::Text).with_pattern("([");
        assert_eq!(validate_input(&s, "anything"), Ok(json!("anything")));
    }
}
