//! Pattern - compiled matchers evaluated against inbound events

use regex_lite::Regex;

use crate::application::errors::LoadError;
use crate::domain::entities::Event;

/// Groups captured by a match. Index 0 is the whole match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(Vec<Option<String>>);

impl Captures {
    pub fn new(groups: Vec<Option<String>>) -> Self {
        Self(groups)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|g| g.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substitute `$N` references in a template; `$$` is a literal dollar
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'$') {
                chars.next();
                out.push('$');
                continue;
            }

            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(d);
                chars.next();
            }

            match digits.parse::<usize>() {
                Ok(index) => out.push_str(self.get(index).unwrap_or("")),
                Err(_) => out.push('$'),
            }
        }

        out
    }
}

/// Text-matching rule of a binding
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Regex over the event text
    Text { source: String, regex: Regex },
    /// Uploaded file whose name ends with one of the suffixes
    Attachment { suffixes: Vec<String> },
}

impl Pattern {
    /// `/name` with an optional `@botname` suffix, followed by `args` when given.
    /// The whole text must match.
    pub fn command(name: &str, args: Option<&str>) -> Result<Self, LoadError> {
        let mut source = format!(r"^\s*/{}(?:@[A-Za-z0-9_]+)?", regex_lite::escape(name));
        if let Some(args) = args {
            source.push_str(r"\s+(?:");
            source.push_str(args);
            source.push(')');
        }
        source.push_str(r"\s*$");
        Self::regex(&source)
    }

    /// Raw regex, unanchored unless the source anchors itself
    pub fn regex(source: &str) -> Result<Self, LoadError> {
        let regex = Regex::new(source).map_err(|e| LoadError::Pattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Pattern::Text {
            source: source.to_string(),
            regex,
        })
    }

    pub fn attachment<S: AsRef<str>>(suffixes: &[S]) -> Self {
        Pattern::Attachment {
            suffixes: suffixes.iter().map(|s| s.as_ref().to_lowercase()).collect(),
        }
    }

    /// Match an event, returning its captures
    pub fn matches(&self, event: &Event) -> Option<Captures> {
        match self {
            Pattern::Text { regex, .. } => {
                let caps = regex.captures(&event.text)?;
                let groups = (0..caps.len())
                    .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                    .collect();
                Some(Captures::new(groups))
            }
            Pattern::Attachment { suffixes } => {
                let attachment = event.attachment.as_ref()?;
                let name = attachment.file_name.to_lowercase();
                if suffixes.iter().any(|s| name.ends_with(s.as_str())) {
                    Some(Captures::new(vec![Some(attachment.file_name.clone())]))
                } else {
                    None
                }
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Pattern::Text { source, .. } => source.clone(),
            Pattern::Attachment { suffixes } => format!("upload *{}", suffixes.join("|*")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Attachment;

    fn text(t: &str) -> Event {
        Event::real(1, 1, t)
    }

    #[test]
    fn command_matches_whole_text_only() {
        let pattern = Pattern::command("schedule", None).unwrap();

        assert!(pattern.matches(&text("/schedule")).is_some());
        assert!(pattern.matches(&text("/schedule@admin_bot")).is_some());
        assert!(pattern.matches(&text("/schedulelist")).is_none());
        assert!(pattern.matches(&text("say /schedule")).is_none());
    }

    #[test]
    fn command_arguments_are_captured() {
        let pattern = Pattern::command("schedule", Some(r"(\w+) (\d+) (-?\d+) ([\s\S]+)")).unwrap();

        let caps = pattern
            .matches(&text("/schedule daily 5 -100123 /sysinfo now"))
            .unwrap();

        assert_eq!(caps.get(1), Some("daily"));
        assert_eq!(caps.get(2), Some("5"));
        assert_eq!(caps.get(3), Some("-100123"));
        assert_eq!(caps.get(4), Some("/sysinfo now"));
    }

    #[test]
    fn malformed_regex_is_a_load_error() {
        let err = Pattern::regex("(unclosed").unwrap_err();
        assert!(matches!(err, LoadError::Pattern { .. }));
    }

    #[test]
    fn attachment_matches_by_suffix() {
        let pattern = Pattern::attachment(&[".yaml", ".yml"]);
        let upload = |name: &str| {
            Event::real(1, 1, "").with_attachment(Attachment {
                file_ref: "f".to_string(),
                file_name: name.to_string(),
            })
        };

        assert!(pattern.matches(&upload("Stats.YAML")).is_some());
        assert!(pattern.matches(&upload("stats.js")).is_none());
        assert!(pattern.matches(&text("stats.yaml")).is_none());
    }

    #[test]
    fn expand_substitutes_groups() {
        let caps = Captures::new(vec![Some("/echo hi".to_string()), Some("hi".to_string())]);

        assert_eq!(caps.expand("you said $1"), "you said hi");
        assert_eq!(caps.expand("$$1 and $9"), "$1 and ");
        assert_eq!(caps.expand("cost $"), "cost $");
    }
}
