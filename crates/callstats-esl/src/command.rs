//! Parameterized engine commands.
//!
//! A [`CommandTemplate`] holds the verbatim command text with `{name}`
//! placeholders. Rendering substitutes each placeholder with a caller
//! supplied token after checking it against a strict whitelist. A
//! [`Command`] can only be obtained by rendering, so every string written to
//! the socket went through that check.

use core::fmt;

use crate::error::EslError;

/// Longest token accepted for substitution.
pub const MAX_TOKEN_LEN: usize = 64;

/// A command template with `{placeholder}` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTemplate {
    pattern: &'static str,
}

impl CommandTemplate {
    /// Wrap a verbatim command pattern.
    pub const fn new(pattern: &'static str) -> Self {
        Self { pattern }
    }

    /// The raw pattern, placeholders included.
    pub const fn pattern(&self) -> &'static str {
        self.pattern
    }

    /// Render the template, substituting `{name}` with the matching argument.
    ///
    /// Every substituted token must be non-empty, at most
    /// [`MAX_TOKEN_LEN`] bytes and consist only of ASCII letters, digits,
    /// `_`, `.` and `-`. Arguments that no placeholder refers to are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EslError::InvalidToken`] if a placeholder has no argument,
    /// a token fails the whitelist, or the pattern has an unclosed `{`.
    pub fn render(&self, args: &[(&str, &str)]) -> Result<Command, EslError> {
        let mut out = String::with_capacity(self.pattern.len());
        let mut rest = self.pattern;

        while let Some(open) = rest.find('{') {
            let (literal, tail) = rest.split_at(open);
            out.push_str(literal);
            let tail = tail.strip_prefix('{').unwrap_or(tail);

            let Some(close) = tail.find('}') else {
                return Err(EslError::InvalidToken {
                    placeholder: tail.to_owned(),
                    reason: format!("unclosed placeholder in `{}`", self.pattern),
                });
            };
            let (name, after) = tail.split_at(close);

            let value = args
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| EslError::InvalidToken {
                    placeholder: name.to_owned(),
                    reason: String::from("no value supplied"),
                })?;
            check_token(name, value)?;
            out.push_str(value);

            rest = after.strip_prefix('}').unwrap_or(after);
        }
        out.push_str(rest);

        Ok(Command(out))
    }

    /// Render a template that has no placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`EslError::InvalidToken`] if the pattern does have placeholders.
    pub fn fixed(&self) -> Result<Command, EslError> {
        self.render(&[])
    }
}

/// Check a token against the substitution whitelist.
///
/// # Errors
///
/// Returns [`EslError::InvalidToken`] naming the placeholder and the reason.
pub fn check_token(placeholder: &str, token: &str) -> Result<(), EslError> {
    let reject = |reason: &str| EslError::InvalidToken {
        placeholder: placeholder.to_owned(),
        reason: reason.to_owned(),
    };

    if token.is_empty() {
        return Err(reject("empty value"));
    }
    if token.len() > MAX_TOKEN_LEN {
        return Err(reject("value too long"));
    }
    if !token.chars().all(is_token_char) {
        return Err(reject("value contains characters outside [A-Za-z0-9_.-]"));
    }
    Ok(())
}

const fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// A fully rendered command, safe to send to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(String);

impl Command {
    /// The command text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const AGENTS: CommandTemplate =
        CommandTemplate::new("callcenter_config queue list agents {queue}@{domain}");

    #[test]
    fn render_substitutes_all_placeholders() {
        let command = AGENTS
            .render(&[("queue", "support"), ("domain", "default")])
            .unwrap();
        assert_eq!(
            command.as_str(),
            "callcenter_config queue list agents support@default"
        );
    }

    #[test]
    fn fixed_command_renders_verbatim() {
        let command = CommandTemplate::new("show calls").fixed().unwrap();
        assert_eq!(command.to_string(), "show calls");
    }

    #[test]
    fn fixed_rejects_templates_with_placeholders() {
        assert!(AGENTS.fixed().is_err());
    }

    #[test]
    fn missing_argument_is_rejected() {
        let err = AGENTS.render(&[("queue", "support")]).unwrap_err();
        assert!(matches!(
            err,
            EslError::InvalidToken { ref placeholder, .. } if placeholder == "domain"
        ));
    }

    #[test]
    fn command_delimiters_are_rejected() {
        for bad in ["; show calls", "support\nshow calls", "a b", "x|y", "q@other", ""] {
            let result = AGENTS.render(&[("queue", bad), ("domain", "default")]);
            assert!(result.is_err(), "token {bad:?} should be rejected");
        }
    }

    #[test]
    fn overlong_token_is_rejected() {
        let long = "q".repeat(MAX_TOKEN_LEN + 1);
        assert!(check_token("queue", &long).is_err());
        assert!(check_token("queue", &"q".repeat(MAX_TOKEN_LEN)).is_ok());
    }

    #[test]
    fn uuid_shaped_tokens_pass() {
        assert!(check_token("uuid", "3f2504e0-4f89-11d3-9a0c-0305e82c3301").is_ok());
    }

    #[test]
    fn unclosed_placeholder_is_an_error() {
        let broken = CommandTemplate::new("uuid_kill {uuid");
        assert!(broken.render(&[("uuid", "abc")]).is_err());
    }
}
