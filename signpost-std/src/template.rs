//! Target template parsing and substitution.
//!
//! Templates use `$`-style placeholders:
//!
//! - `${name}` or `$name` is replaced by the named [`Parameters`] field.
//! - `$$` is a literal `$`.
//!
//! The recognized names are fixed: `base_url`, `user`, `path`, and
//! `unique_id`. Substitution is purely textual; values are not escaped or
//! URL-encoded.
//!
//! # Example
//!
//! ```rust,ignore
//! let template = Template::parse("${base_url}/nb/user/${user}/lab/tree/${path}.ipynb")?;
//! let url = template.render(&params);
//! ```

use signpost_core::{Parameters, TemplateError};
use std::fmt;

/// A placeholder that can appear in a target template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `${base_url}`
    BaseUrl,
    /// `${user}`
    User,
    /// `${path}`
    Path,
    /// `${unique_id}`; empty when unset.
    UniqueId,
}

impl Placeholder {
    /// Every recognized placeholder.
    pub const ALL: [Placeholder; 4] = [
        Placeholder::BaseUrl,
        Placeholder::User,
        Placeholder::Path,
        Placeholder::UniqueId,
    ];

    /// Look up a placeholder by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The placeholder's name, without `${}`.
    pub const fn name(self) -> &'static str {
        match self {
            Placeholder::BaseUrl => "base_url",
            Placeholder::User => "user",
            Placeholder::Path => "path",
            Placeholder::UniqueId => "unique_id",
        }
    }

    fn value(self, params: &Parameters) -> &str {
        match self {
            Placeholder::BaseUrl => &params.base_url,
            Placeholder::User => &params.user,
            Placeholder::Path => &params.path,
            Placeholder::UniqueId => params.unique_id.as_deref().unwrap_or(""),
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}}}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(Placeholder),
}

/// A parsed target template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`, rejecting unknown or malformed placeholders.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(pos) = rest.find('$') {
            literal.push_str(&rest[..pos]);
            let at = offset + pos;
            let after = &rest[pos + 1..];

            let (name, consumed) = if after.starts_with('$') {
                literal.push('$');
                (None, 2)
            } else if let Some(braced) = after.strip_prefix('{') {
                let Some(end) = braced.find('}') else {
                    return Err(malformed(at, source));
                };
                let name = &braced[..end];
                if !is_identifier(name) {
                    return Err(malformed(at, source));
                }
                (Some(name), end + 3)
            } else {
                let len = identifier_len(after);
                if len == 0 {
                    return Err(malformed(at, source));
                }
                (Some(&after[..len]), len + 1)
            };

            if let Some(name) = name {
                let placeholder =
                    Placeholder::from_name(name).ok_or_else(|| TemplateError::UnknownPlaceholder {
                        name: name.to_string(),
                        template: source.to_string(),
                    })?;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Var(placeholder));
            }

            rest = &rest[pos + consumed..];
            offset = at + consumed;
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholders referenced by this template, in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Var(p) => Some(*p),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder from `params`.
    pub fn render(&self, params: &Parameters) -> String {
        let mut out = String::with_capacity(self.source.len() + 64);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Var(p) => out.push_str(p.value(params)),
            }
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse `target` and substitute it from `params` in one step.
///
/// Used on the final context after all hooks ran, since hooks may have
/// rewritten `target`.
pub fn resolve(target: &str, params: &Parameters) -> Result<String, TemplateError> {
    Ok(Template::parse(target)?.render(params))
}

/// Escape `$` so `text` renders literally when embedded in a template.
pub fn escape(text: &str) -> String {
    text.replace('$', "$$")
}

fn malformed(offset: usize, template: &str) -> TemplateError {
    TemplateError::Malformed {
        offset,
        template: template.to_string(),
    }
}

fn identifier_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(*c == '_' || c.is_ascii_alphanumeric()))
        .map_or(s.len(), |(i, _)| i)
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && identifier_len(s) == s.len()
}
