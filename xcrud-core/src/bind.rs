//! Named parameter bindings.
//!
//! Filters and update values refer to parameters as `:name`. The values are
//! supplied through `bind` on the builder and kept in a [`BindingTable`] until
//! the operation executes.

use std::collections::BTreeMap;

use crate::{
    error::{CrudError, CrudResult},
    value::ExprValue,
};

/// Checks that `name` is a valid parameter name (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// # Errors
///
/// Returns [`CrudError::InvalidArgument`] otherwise.
pub fn validate_name(name: &str) -> CrudResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(CrudError::InvalidArgument(format!("invalid parameter name {name:?}")))
    }
}

/// Mapping from parameter name to value.
///
/// Names are case-sensitive and unique; binding the same name again replaces
/// the previous value. Entries are kept ordered by name so that encoding a
/// table is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingTable {
    values: BTreeMap<String, ExprValue>,
}

impl BindingTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `name`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::InvalidArgument`] if `name` is not a valid parameter
    /// name. The table is left untouched in that case.
    pub fn bind(&mut self, name: &str, value: ExprValue) -> CrudResult<()> {
        validate_name(name)?;
        value.validate_params()?;
        self.values.insert(name.to_string(), value);

        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ExprValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExprValue)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Checks that every name in `referenced` has a bound value.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::UnresolvedBinding`] naming the first missing parameter.
    pub fn resolve<'a>(&self, referenced: impl IntoIterator<Item = &'a str>) -> CrudResult<()> {
        match referenced
            .into_iter()
            .find(|name| !self.values.contains_key(*name))
        {
            Some(missing) => Err(CrudError::UnresolvedBinding(missing.to_string())),
            None => Ok(()),
        }
    }

    pub(crate) fn to_map(&self) -> BTreeMap<String, ExprValue> {
        self.values.clone()
    }
}

/// Lists the `:name` placeholders that appear in expression text, in order of appearance.
///
/// Text inside single, double or back quotes is skipped. A colon only starts a
/// placeholder when it is directly followed by a name and is not preceded by a
/// name character or a closing quote, so `{"a":1}` and `a::b` do not count.
pub fn placeholders(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut names = Vec::new();
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];

        if let Some(open) = quote {
            if c == '\\' {
                pos += 2;
                continue;
            }
            if c == open {
                quote = None;
                prev = Some(c);
            }
            pos += 1;
            continue;
        }

        match c {
            '\'' | '"' | '`' => quote = Some(c),
            ':' if !matches!(prev, Some(p) if p.is_ascii_alphanumeric() || matches!(p, '_' | ':' | '\'' | '"' | '`')) =>
            {
                let start = pos + 1;
                if start < chars.len() && (chars[start].is_ascii_alphabetic() || chars[start] == '_') {
                    let mut end = start;
                    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                        end += 1;
                    }
                    let name: String = chars[start..end].iter().collect();
                    if !names.contains(&name) {
                        names.push(name);
                    }
                    prev = Some(chars[end - 1]);
                    pos = end;
                    continue;
                }
            }
            _ => {}
        }

        if !c.is_whitespace() {
            prev = Some(c);
        }
        pos += 1;
    }

    names
}
