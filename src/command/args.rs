//! Parameter schemas and argument parsing.
//!
//! Message commands are tokenised on whitespace with double quotes grouping a
//! token; interactions deliver named options that are checked against the same
//! schema.

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("missing required argument `{name}`")]
    Missing { name: String },

    #[error("`{name}` expects {expected}, got `{value}`")]
    Invalid {
        name: String,
        expected: &'static str,
        value: String,
    },

    #[error("unexpected argument `{0}`")]
    Unexpected(String),

    #[error("unterminated quote in arguments")]
    UnterminatedQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamKind {
    Text,
    Url,
    Integer { min: Option<i64>, max: Option<i64> },
    /// `mm:ss` or `mm:ss.fff`.
    Timestamp,
    /// `75%` or `75`.
    Percent,
    Bool,
}

impl ParamKind {
    fn expected(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Url => "an http(s) URL",
            Self::Integer { .. } => "an integer",
            Self::Timestamp => "a time like 01:30",
            Self::Percent => "a percentage like 80%",
            Self::Bool => "true or false",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    /// Consumes the rest of the line. Only meaningful on the last text parameter.
    pub greedy: bool,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            greedy: false,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            greedy: false,
        }
    }

    pub const fn greedy(mut self) -> Self {
        self.greedy = true;
        self
    }

    /// Parses one raw value according to this parameter's kind.
    pub fn parse_value(&self, raw: &str) -> Result<ArgValue, ArgumentError> {
        let invalid = || ArgumentError::Invalid {
            name: self.name.to_string(),
            expected: self.kind.expected(),
            value: raw.to_string(),
        };

        match self.kind {
            ParamKind::Text => Ok(ArgValue::Text(raw.to_string())),
            ParamKind::Url => {
                let lower = raw.to_ascii_lowercase();
                let has_host = raw
                    .split_once("://")
                    .map(|(_, rest)| !rest.is_empty() && !rest.starts_with('/'))
                    .unwrap_or(false);
                if (lower.starts_with("http://") || lower.starts_with("https://")) && has_host {
                    Ok(ArgValue::Url(raw.to_string()))
                } else {
                    Err(invalid())
                }
            }
            ParamKind::Integer { min, max } => {
                let value: i64 = raw.parse().map_err(|_| invalid())?;
                if min.is_some_and(|m| value < m) || max.is_some_and(|m| value > m) {
                    return Err(invalid());
                }
                Ok(ArgValue::Integer(value))
            }
            ParamKind::Timestamp => parse_timestamp_ms(raw)
                .map(ArgValue::Millis)
                .ok_or_else(invalid),
            ParamKind::Percent => raw
                .strip_suffix('%')
                .unwrap_or(raw)
                .parse::<u32>()
                .map(ArgValue::Percent)
                .map_err(|_| invalid()),
            ParamKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(ArgValue::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(ArgValue::Bool(false)),
                _ => Err(invalid()),
            },
        }
    }
}

static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3}):([0-5]\d)(?:\.(\d{1,3}))?$").expect("hardcoded regex")
});

/// Parses `mm:ss` / `mm:ss.fff` into milliseconds. Seconds must be below 60.
pub fn parse_timestamp_ms(raw: &str) -> Option<u64> {
    let caps = TIMESTAMP.captures(raw.trim())?;
    let minutes: u64 = caps.get(1)?.as_str().parse().ok()?;
    let seconds: u64 = caps.get(2)?.as_str().parse().ok()?;
    let millis = match caps.get(3) {
        // ".5" is half a second, not five milliseconds.
        Some(frac) => format!("{:0<3}", frac.as_str()).parse::<u64>().ok()?,
        None => 0,
    };
    Some((minutes * 60 + seconds) * 1000 + millis)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    Url(String),
    Integer(i64),
    Millis(u64),
    Percent(u32),
    Bool(bool),
}

impl ArgValue {
    fn render(&self) -> String {
        match self {
            Self::Text(s) | Self::Url(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Millis(ms) => crate::common::format::format_duration(*ms),
            Self::Percent(p) => format!("{p}%"),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// Parsed arguments, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: HashMap<&'static str, ArgValue>,
    order: Vec<&'static str>,
}

impl Args {
    fn insert(&mut self, name: &'static str, value: ArgValue) {
        if self.values.insert(name, value).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ArgValue::Text(s) | ArgValue::Url(s) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn millis(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            ArgValue::Millis(ms) => Some(*ms),
            _ => None,
        }
    }

    pub fn percent(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            ArgValue::Percent(p) => Some(*p),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in schema order, for logging the command line.
    pub fn rendered(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|name| self.values.get(name))
            .map(ArgValue::render)
            .collect()
    }
}

/// Splits a message body into tokens. Double quotes group whitespace.
///
/// The byte offset where each token starts is kept so greedy parameters can
/// take the rest of the original line untouched.
pub fn tokenize(input: &str) -> Result<Vec<(usize, String)>, ArgumentError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start: Option<usize> = None;
    let mut in_quotes = false;

    for (i, c) in input.char_indices() {
        match c {
            '"' => {
                start.get_or_insert(i);
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if let Some(s) = start.take() {
                    tokens.push((s, std::mem::take(&mut current)));
                }
            }
            c => {
                start.get_or_insert(i);
                current.push(c);
            }
        }
    }

    if in_quotes {
        return Err(ArgumentError::UnterminatedQuote);
    }
    if let Some(s) = start {
        tokens.push((s, current));
    }
    Ok(tokens)
}

/// Parses a message body against `params`.
pub fn parse_text(params: &[ParamSpec], input: &str) -> Result<Args, ArgumentError> {
    let tokens = tokenize(input)?;
    let mut args = Args::default();
    let mut next = 0usize;

    for param in params {
        let Some((offset, token)) = tokens.get(next) else {
            if param.required {
                return Err(ArgumentError::Missing {
                    name: param.name.to_string(),
                });
            }
            continue;
        };

        if param.greedy && param.kind == ParamKind::Text {
            let rest = input[*offset..].trim_end();
            let rest = if tokens.len() - next == 1 { token.as_str() } else { rest };
            args.insert(param.name, ArgValue::Text(rest.to_string()));
            next = tokens.len();
            continue;
        }

        args.insert(param.name, param.parse_value(token)?);
        next += 1;
    }

    if let Some((_, extra)) = tokens.get(next) {
        return Err(ArgumentError::Unexpected(extra.clone()));
    }
    Ok(args)
}

/// Parses named interaction options against `params`.
pub fn parse_options(
    params: &[ParamSpec],
    options: &[(String, serde_json::Value)],
) -> Result<Args, ArgumentError> {
    let mut args = Args::default();

    for (name, _) in options {
        if !params.iter().any(|p| p.name.eq_ignore_ascii_case(name)) {
            return Err(ArgumentError::Unexpected(name.clone()));
        }
    }

    for param in params {
        let value = options
            .iter()
            .find(|(name, _)| param.name.eq_ignore_ascii_case(name))
            .map(|(_, v)| v);

        let raw = match value {
            None | Some(serde_json::Value::Null) => {
                if param.required {
                    return Err(ArgumentError::Missing {
                        name: param.name.to_string(),
                    });
                }
                continue;
            }
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        args.insert(param.name, param.parse_value(&raw)?);
    }
    Ok(args)
}
