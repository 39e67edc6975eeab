//! Trigger matching for text listeners, actions and commands.

use regex::Regex;

// ============================================================================
// Trigger
// ============================================================================

/// A single text trigger: an exact string or a regular expression.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Matches when the input equals the string.
    Text(String),
    /// Matches when the expression finds a match in the input.
    Pattern(Regex),
}

impl Trigger {
    /// Tests `input`, returning the match details on success.
    pub fn matches(&self, input: &str) -> Option<TriggerMatch> {
        match self {
            Self::Text(expected) => (expected == input).then(|| TriggerMatch {
                matched: input.to_string(),
                captures: Vec::new(),
            }),
            Self::Pattern(re) => re.captures(input).map(|caps| TriggerMatch {
                matched: caps
                    .get(0)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                captures: caps
                    .iter()
                    .skip(1)
                    .map(|c| c.map(|m| m.as_str().to_string()))
                    .collect(),
            }),
        }
    }
}

impl From<&str> for Trigger {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Trigger {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Regex> for Trigger {
    fn from(re: Regex) -> Self {
        Self::Pattern(re)
    }
}

// ============================================================================
// Triggers
// ============================================================================

/// One or more triggers; the first one that matches wins.
#[derive(Debug, Clone, Default)]
pub struct Triggers(Vec<Trigger>);

impl Triggers {
    /// Tests `input` against every trigger in order.
    pub fn matches(&self, input: &str) -> Option<TriggerMatch> {
        self.0.iter().find_map(|t| t.matches(input))
    }

    /// Returns the number of triggers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no triggers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Trigger> for Triggers {
    fn from(t: Trigger) -> Self {
        Self(vec![t])
    }
}

impl From<&str> for Triggers {
    fn from(s: &str) -> Self {
        Self(vec![s.into()])
    }
}

impl From<String> for Triggers {
    fn from(s: String) -> Self {
        Self(vec![s.into()])
    }
}

impl From<Regex> for Triggers {
    fn from(re: Regex) -> Self {
        Self(vec![re.into()])
    }
}

impl<T: Into<Trigger>> From<Vec<T>> for Triggers {
    fn from(triggers: Vec<T>) -> Self {
        triggers.into_iter().collect()
    }
}

impl<T: Into<Trigger>, const N: usize> From<[T; N]> for Triggers {
    fn from(triggers: [T; N]) -> Self {
        triggers.into_iter().collect()
    }
}

impl<T: Into<Trigger>> FromIterator<T> for Triggers {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// What a text or action trigger matched, stored on the context for the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    /// The full matched text.
    pub matched: String,
    /// Capture groups of a pattern trigger, in order (empty for exact triggers).
    pub captures: Vec<Option<String>>,
}

// ============================================================================
// Commands
// ============================================================================

/// A set of slash-command names, stored without the leading `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commands(Vec<String>);

impl Commands {
    /// Returns `true` if `name` is one of the commands.
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|c| c == name)
    }

    /// Returns the command names.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Parses `text` and returns its arguments if it invokes one of these commands.
    pub fn matches(&self, text: &str) -> Option<CommandArgs> {
        CommandArgs::parse(text).filter(|args| self.contains(&args.command))
    }
}

fn normalize(name: &str) -> String {
    name.trim().trim_start_matches('/').to_string()
}

impl From<&str> for Commands {
    fn from(s: &str) -> Self {
        Self(vec![normalize(s)])
    }
}

impl From<String> for Commands {
    fn from(s: String) -> Self {
        Self(vec![normalize(&s)])
    }
}

impl<S: AsRef<str>> FromIterator<S> for Commands {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| normalize(s.as_ref())).collect())
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Commands {
    fn from(names: [S; N]) -> Self {
        names.into_iter().collect()
    }
}

impl<S: AsRef<str>> From<Vec<S>> for Commands {
    fn from(names: Vec<S>) -> Self {
        names.into_iter().collect()
    }
}

/// A parsed slash command, stored on the context for the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgs {
    /// Command name without `/` or `@botname`.
    pub command: String,
    /// Everything after the command, trimmed.
    pub payload: String,
}

impl CommandArgs {
    /// Parses `/name[@bot] payload`; returns `None` for non-command text.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix('/')?;
        let (head, payload) = match rest.split_once(char::is_whitespace) {
            Some((head, payload)) => (head, payload.trim()),
            None => (rest, ""),
        };
        let command = head.split('@').next().unwrap_or(head);
        if command.is_empty() {
            return None;
        }
        Some(Self {
            command: command.to_string(),
            payload: payload.to_string(),
        })
    }

    /// Splits the payload on whitespace.
    pub fn args(&self) -> Vec<&str> {
        self.payload.split_whitespace().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_trigger_is_exact() {
        let t = Trigger::from("hello");
        assert!(t.matches("hello").is_some());
        assert!(t.matches("hello there").is_none());
    }

    #[test]
    fn test_pattern_trigger_exposes_captures() {
        let triggers = Triggers::from(Regex::new(r"^buy (\d+)$").unwrap());
        let m = triggers.matches("buy 12").unwrap();
        assert_eq!(m.matched, "buy 12");
        assert_eq!(m.captures, vec![Some("12".to_string())]);
    }

    #[test]
    fn test_first_matching_trigger_wins() {
        let triggers: Triggers = ["hi", "hello"].into_iter().collect();
        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers.matches("hello").unwrap().matched, "hello");
        assert!(triggers.matches("hey").is_none());
    }

    #[test]
    fn test_command_parsing() {
        let args = CommandArgs::parse("/start@my_bot  ref 42 ").unwrap();
        assert_eq!(args.command, "start");
        assert_eq!(args.payload, "ref 42");
        assert_eq!(args.args(), vec!["ref", "42"]);

        assert!(CommandArgs::parse("start").is_none());
        assert!(CommandArgs::parse("/").is_none());
    }

    #[test]
    fn test_commands_normalize_leading_slash() {
        let commands = Commands::from(["/start", "help"]);
        assert!(commands.matches("/start").is_some());
        assert!(commands.matches("/help me").is_some());
        assert!(commands.matches("/stop").is_none());
    }
}
