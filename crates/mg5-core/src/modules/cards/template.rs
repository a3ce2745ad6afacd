use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("undefined placeholder '%({key})s'")]
    UndefinedKey { key: String },
    #[error("unterminated placeholder starting at byte {offset}")]
    Unterminated { offset: usize },
}

/// Replaces `%(key)s` with `values[key]` and `%%` with `%`.
///
/// A `%` followed by anything else is kept as-is so that card comments using
/// a bare percent sign survive untouched.
pub(super) fn substitute(
    template: &str,
    values: &BTreeMap<String, String>,
) -> Result<String, TemplateError> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    let mut consumed = 0;

    while let Some(position) = rest.find('%') {
        rendered.push_str(&rest[..position]);
        let tail = &rest[position..];

        if tail.starts_with("%%") {
            rendered.push('%');
            rest = &tail[2..];
            consumed += position + 2;
            continue;
        }

        if let Some(body) = tail.strip_prefix("%(") {
            let Some(close) = body.find(")s") else {
                return Err(TemplateError::Unterminated {
                    offset: consumed + position,
                });
            };
            let key = &body[..close];
            let value = values.get(key).ok_or_else(|| TemplateError::UndefinedKey {
                key: key.to_string(),
            })?;
            rendered.push_str(value);
            let advance = 2 + close + 2;
            rest = &tail[advance..];
            consumed += position + advance;
            continue;
        }

        rendered.push('%');
        rest = &tail[1..];
        consumed += position + 1;
    }

    rendered.push_str(rest);
    Ok(rendered)
}
