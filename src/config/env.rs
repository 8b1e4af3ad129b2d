// src/config/env.rs

//! Environment-variable expansion for settings values.
//!
//! Two forms are recognised:
//! - a whole value of the form `$NAME` is replaced by the variable's value;
//! - `${NAME}` anywhere inside a value is interpolated.
//!
//! Unset variables expand to the empty string, which for webhook settings
//! means "feature disabled".

/// Expand a settings value against the process environment.
pub fn expand_env(value: &str) -> String {
    expand_env_with(value, |name| std::env::var(name).ok())
}

/// Expand a settings value using a custom variable lookup.
pub fn expand_env_with<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let trimmed = value.trim();

    if let Some(name) = trimmed.strip_prefix('$') {
        if is_var_name(name) {
            return lookup(name).unwrap_or_default();
        }
    }

    let mut out = String::with_capacity(trimmed.len());
    let mut rest = trimmed;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if is_var_name(&after[..end]) => {
                out.push_str(&lookup(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            _ => {
                // Not a well-formed reference; keep it literally.
                out.push_str("${");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_var_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
