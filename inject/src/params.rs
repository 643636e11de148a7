use anyhow::{Context, Result};

use syntax::ast::Param;
use util::HashMap;

use crate::{Error, Value};

/// Default value of a declared input, classified once when the
/// declaration is parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Str(String),
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Json(serde_json::Value),
    Opaque(String),
}

impl DefaultValue {
    /// Classify the raw text of a default expression.
    pub fn classify(text: &str) -> Self {
        let text = text.trim();
        if let Some(unquoted) = unquote(text) {
            return Self::Str(unquoted.to_owned());
        }
        match text {
            "null" => return Self::Null,
            "undefined" => return Self::Undefined,
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => (),
        }
        if let Some(num) = numeric(text) {
            return num;
        }
        if is_json_like(text) {
            if let Ok(json) = serde_json::from_str(text) {
                return Self::Json(json);
            }
            log::debug!("default {text} looks like json but isn't; keeping it as text");
        }
        Self::Opaque(text.to_owned())
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Str(s) => Value::Str(s.clone()),
            Self::Null => Value::Null,
            Self::Undefined => Value::Undefined,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Float(f) => Value::Float(*f),
            Self::Json(json) => Value::Json(json.clone()),
            Self::Opaque(s) => Value::Opaque(s.clone()),
        }
    }
}

fn unquote(text: &str) -> Option<&str> {
    let mut chars = text.chars();
    let first = chars.next()?;
    let last = chars.next_back()?;
    if (first == '"' || first == '\'') && first == last {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

fn numeric(text: &str) -> Option<DefaultValue> {
    // keep "inf", "NaN" and friends out; they parse as floats in rust.
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || first == '-' || first == '+' || first == '.') {
        return None;
    }
    if text.contains('.') {
        let f: f64 = text.parse().ok()?;
        f.is_finite().then_some(DefaultValue::Float(f))
    } else if let Ok(i) = text.parse::<i64>() {
        Some(DefaultValue::Int(i))
    } else {
        // exponent forms like 1e3 have no '.', but aren't ints either:
        let f: f64 = text.parse().ok()?;
        f.is_finite().then_some(DefaultValue::Float(f))
    }
}

fn is_json_like(text: &str) -> bool {
    (text.starts_with('[') && text.ends_with(']')) || (text.starts_with('{') && text.ends_with('}'))
}

/// The ordered input names a task declares, plus defaults for those that have one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    names: Vec<String>,
    defaults: HashMap<String, DefaultValue>,
}

impl Params {
    /// A task that takes no inputs.
    pub fn none() -> Self {
        Self::default()
    }

    /// Inputs without defaults, by name.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            defaults: HashMap::default(),
        }
    }

    /// From a signature like `build(scheduler, size=10)`.
    pub fn from_signature(text: &str) -> Result<Self> {
        let params = syntax::parse_signature(text)
            .with_context(|| Error::InvalidDeclaration(text.to_owned()))?;
        Ok(Self::from_ast(&params))
    }

    /// From a bare list like `scheduler, size=10`.
    pub fn from_list(text: &str) -> Result<Self> {
        let params = syntax::parse_params(text)
            .with_context(|| Error::InvalidDeclaration(text.to_owned()))?;
        Ok(Self::from_ast(&params))
    }

    /// From one declaration per entry, e.g. `["scheduler", "size=10"]`.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::none();
        for entry in entries {
            let entry = entry.as_ref();
            let param = syntax::parse_param(entry)
                .with_context(|| Error::InvalidDeclaration(entry.to_owned()))?;
            params.push(&param);
        }
        Ok(params)
    }

    fn from_ast(params: &[Param]) -> Self {
        let mut out = Self::none();
        for param in params {
            out.push(param);
        }
        out
    }

    fn push(&mut self, param: &Param) {
        if let Some(default) = param.default {
            self.defaults
                .insert(param.name.to_owned(), DefaultValue::classify(default));
        }
        self.names.push(param.name.to_owned());
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn default_for(&self, name: &str) -> Option<&DefaultValue> {
        self.defaults.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
