//! Text format templates such as `{asctime}:{name}:{levelname}: {message}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ConfigError;

/// A record attribute a template can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// Local wall-clock time, `YYYY-MM-DD HH:MM:SS,mmm`.
    Asctime,
    /// Logger name (the record's target).
    Name,
    /// Level name, e.g. `INFO` or `WARNING`.
    Levelname,
    /// The message followed by any structured fields.
    Message,
    Module,
    Filename,
    Lineno,
}

impl Placeholder {
    fn parse(key: &str) -> Option<Self> {
        match key {
            "asctime" => Some(Self::Asctime),
            "name" => Some(Self::Name),
            "levelname" => Some(Self::Levelname),
            "message" => Some(Self::Message),
            "module" => Some(Self::Module),
            "filename" => Some(Self::Filename),
            "lineno" => Some(Self::Lineno),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// A parsed `{}`-style template. Literal braces are written `{{` and `}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// The bare `{message}` template used by handlers without a formatter.
    #[must_use]
    pub fn message_only() -> Self {
        Self {
            source: "{message}".to_string(),
            segments: vec![Segment::Field(Placeholder::Message)],
        }
    }

    /// `{asctime}:{name}:{levelname}: {message}`, the console line format.
    #[must_use]
    pub fn precise() -> Self {
        Self {
            source: "{asctime}:{name}:{levelname}: {message}".to_string(),
            segments: vec![
                Segment::Field(Placeholder::Asctime),
                Segment::Literal(":".to_string()),
                Segment::Field(Placeholder::Name),
                Segment::Literal(":".to_string()),
                Segment::Field(Placeholder::Levelname),
                Segment::Literal(": ".to_string()),
                Segment::Field(Placeholder::Message),
            ],
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Whether the template references `placeholder`.
    #[must_use]
    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Field(p) if *p == placeholder))
    }
}

impl FromStr for Template {
    type Err = ConfigError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigError::InvalidTemplate {
            template: source.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => {
                                return Err(invalid("unterminated placeholder".to_string()))
                            }
                            Some(k) => key.push(k),
                        }
                    }
                    let placeholder = Placeholder::parse(key.trim())
                        .ok_or_else(|| invalid(format!("unknown placeholder '{{{key}}}'")))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(placeholder));
                }
                '}' => return Err(invalid("unmatched '}'".to_string())),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }
}

impl TryFrom<String> for Template {
    type Error = ConfigError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        source.parse()
    }
}

impl From<Template> for String {
    fn from(template: Template) -> Self {
        template.source
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_precise_template() {
        let template: Template = "{asctime}:{name}:{levelname}: {message}".parse().unwrap();
        assert_eq!(template, Template::precise());
        assert_eq!(template.segments().count(), 7);
        assert!(template.uses(Placeholder::Asctime));
        assert!(!template.uses(Placeholder::Lineno));
    }

    #[test]
    fn test_escaped_braces_are_literal() {
        let template: Template = "{{{name}}}".parse().unwrap();
        let segments: Vec<_> = template.segments().cloned().collect();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("{".to_string()),
                Segment::Field(Placeholder::Name),
                Segment::Literal("}".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let err = "{asctime} {process}".parse::<Template>().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTemplate { .. }));
        assert!(format!("{err}").contains("{process}"));
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!("{message".parse::<Template>().is_err());
        assert!("message}".parse::<Template>().is_err());
        assert!("{mess{age}".parse::<Template>().is_err());
    }

    #[test]
    fn test_message_only_matches_parsed() {
        let parsed: Template = "{message}".parse().unwrap();
        assert_eq!(parsed, Template::message_only());
    }

    #[test]
    fn test_serde_uses_source_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            format: Template,
        }
        let wrapper: Wrapper = toml::from_str("format = \"{name}: {message}\"").unwrap();
        assert_eq!(wrapper.format.as_str(), "{name}: {message}");

        let bad = toml::from_str::<Wrapper>("format = \"{nope}\"");
        assert!(bad.is_err());
    }
}
