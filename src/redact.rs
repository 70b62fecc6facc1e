//! Redaction of sensitive substrings in log payloads
//!
//! Every record is passed through a [`Redactor`] before it is written
//! locally or shipped to the cloud sink; unredacted content never leaves
//! the process boundary. Recognized patterns are replaced either fully
//! or with a partial reveal (last digits of a phone or card number, the
//! domain of an email address).

use regex::Regex;
use serde_json::Value;

const REDACTED: &str = "[REDACTED]";
const MAX_DEPTH: usize = 10;

/// Replacement policy for a matched pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedactAction {
    /// Replace the whole match
    Full,
    /// Keep first/last character of the local part and the domain
    Email,
    /// Keep the last four digits
    Phone,
    /// Keep the last four digits
    Ssn,
    /// Keep the last four digits
    CreditCard,
}

struct RedactRule {
    name: String,
    pattern: Regex,
    action: RedactAction,
}

/// Pattern-based redactor for sensitive data.
pub struct Redactor {
    rules: Vec<RedactRule>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}

impl Redactor {
    /// Create a redactor with the built-in pattern set
    pub fn new() -> Self {
        let builtin: &[(&str, &str, RedactAction)] = &[
            (
                "license_key",
                r#"(?i)(license[_-]?key|licensekey)\s*[:=]\s*['"]?([a-zA-Z0-9_-]{20,})['"]?"#,
                RedactAction::Full,
            ),
            (
                "api_key",
                r#"(?i)(api[_-]?key|apikey)\s*[:=]\s*['"]?([a-zA-Z0-9_-]{20,})['"]?"#,
                RedactAction::Full,
            ),
            (
                "jwt",
                r#"(?i)(bearer|jwt|token)\s*[:=]\s*['"]?([a-zA-Z0-9_-]+\.[a-zA-Z0-9_-]+\.[a-zA-Z0-9_-]+)['"]?"#,
                RedactAction::Full,
            ),
            (
                "password",
                r#"(?i)(password|passwd|pwd)\s*[:=]\s*['"]?([^\s'"]+)['"]?"#,
                RedactAction::Full,
            ),
            (
                "secret",
                r#"(?i)(secret|key)\s*[:=]\s*['"]?([a-zA-Z0-9_-]{20,})['"]?"#,
                RedactAction::Full,
            ),
            (
                "email",
                r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
                RedactAction::Email,
            ),
            (
                "phone",
                r#"(?i)(phone|tel|mobile)\s*[:=]\s*['"]?(\+?[\d\s\-()]{10,})['"]?"#,
                RedactAction::Phone,
            ),
            ("ssn", r"\b\d{3}-\d{2}-\d{4}\b", RedactAction::Ssn),
            (
                "credit_card",
                r"\b\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}\b",
                RedactAction::CreditCard,
            ),
        ];

        let rules = builtin
            .iter()
            .map(|(name, pattern, action)| RedactRule {
                name: (*name).to_string(),
                pattern: Regex::new(pattern).expect("builtin redaction pattern"),
                action: *action,
            })
            .collect();

        Self { rules }
    }

    /// Register an additional pattern; matches are fully replaced
    pub fn add_pattern(&mut self, name: impl Into<String>, pattern: &str) -> Result<(), regex::Error> {
        let compiled = Regex::new(pattern)?;
        self.rules.push(RedactRule {
            name: name.into(),
            pattern: compiled,
            action: RedactAction::Full,
        });
        Ok(())
    }

    /// Names of registered patterns
    pub fn pattern_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }

    /// Redact sensitive substrings in a piece of text
    pub fn redact_text(&self, text: &str) -> String {
        let mut redacted = text.to_string();
        for rule in &self.rules {
            redacted = rule
                .pattern
                .replace_all(&redacted, |caps: &regex::Captures<'_>| {
                    apply_action(rule.action, &caps[0])
                })
                .into_owned();
        }
        redacted
    }

    /// Recursively redact every string inside a JSON value
    pub fn redact_value(&self, value: &Value) -> Value {
        self.redact_at_depth(value, MAX_DEPTH)
    }

    fn redact_at_depth(&self, value: &Value, depth: usize) -> Value {
        if depth == 0 {
            return Value::String("[REDACTED - MAX DEPTH]".to_string());
        }
        match value {
            Value::String(s) => Value::String(self.redact_text(s)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.redact_at_depth(v, depth - 1))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.redact_at_depth(v, depth - 1)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

fn apply_action(action: RedactAction, matched: &str) -> String {
    match action {
        RedactAction::Full => REDACTED.to_string(),
        RedactAction::Email => redact_email(matched),
        RedactAction::Phone => redact_digits(matched, "***-***-"),
        RedactAction::Ssn => redact_digits(matched, "***-**-"),
        RedactAction::CreditCard => {
            let digits: String = matched.chars().filter(|c| c.is_ascii_digit()).collect();
            if digits.len() < 4 {
                REDACTED.to_string()
            } else {
                format!("{}{}", "*".repeat(digits.len() - 4), &digits[digits.len() - 4..])
            }
        }
    }
}

fn redact_email(email: &str) -> String {
    let Some((user, domain)) = email.split_once('@') else {
        return REDACTED.to_string();
    };
    let masked = if user.chars().count() <= 2 {
        "*".repeat(user.chars().count())
    } else {
        let chars: Vec<char> = user.chars().collect();
        format!(
            "{}{}{}",
            chars[0],
            "*".repeat(chars.len() - 2),
            chars[chars.len() - 1]
        )
    };
    format!("{}@{}", masked, domain)
}

fn redact_digits(matched: &str, prefix: &str) -> String {
    let digits: String = matched.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        REDACTED.to_string()
    } else {
        format!("{}{}", prefix, &digits[digits.len() - 4..])
    }
}
