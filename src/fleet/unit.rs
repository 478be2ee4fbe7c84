//! systemd-style unit file handling.
//!
//! Fleet's API does not take unit file text; it takes the deserialized
//! `(section, name, value)` triples. The templates are embedded in the
//! binary and rendered with simple `{{KEY}}` substitution before being
//! parsed into triples.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// One `name=value` line of a unit file, tagged with its section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOption {
    pub section: String,
    pub name: String,
    pub value: String,
}

/// Substitute `{{KEY}}` placeholders. Leftover placeholders after
/// substitution are an error (a template var the caller forgot to bind).
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String, ClusterError> {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{{{}}}}}", key), value);
    }

    let leftover = Regex::new(r"\{\{[^}]*\}\}").expect("static regex");
    if let Some(m) = leftover.find(&out) {
        return Err(ClusterError::Config(format!(
            "unbound template placeholder: {}",
            m.as_str()
        )));
    }
    Ok(out)
}

/// True when the text still contains `{{...}}` placeholders.
pub fn has_placeholders(text: &str) -> bool {
    Regex::new(r"\{\{[^}]*\}\}")
        .expect("static regex")
        .is_match(text)
}

/// Deserialize unit file text into section/name/value triples.
/// Trailing-backslash line continuations are folded, comments and blank
/// lines are skipped.
pub fn parse(text: &str) -> Result<Vec<UnitOption>, ClusterError> {
    let mut options = Vec::new();
    let mut section = String::new();
    let mut lines = text.lines();

    while let Some(raw) = lines.next() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = line[1..line.len() - 1].to_string();
            continue;
        }

        if section.is_empty() {
            return Err(ClusterError::Config(format!(
                "unit option before any [Section] header: {}",
                line
            )));
        }

        let (name, value) = line.split_once('=').ok_or_else(|| {
            ClusterError::Config(format!("malformed unit line in [{}]: {}", section, line))
        })?;

        let mut value = value.trim().to_string();
        while value.ends_with('\\') {
            value.pop();
            match lines.next() {
                Some(cont) => {
                    value.push(' ');
                    value.push_str(cont.trim());
                }
                None => break,
            }
        }

        options.push(UnitOption {
            section: section.clone(),
            name: name.trim().to_string(),
            value,
        });
    }

    Ok(options)
}
