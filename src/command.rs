//! Turns a command template into the argument vector for one object.
//!
//! The template is split with shell word rules (quotes and backslash escapes
//! are honoured) but nothing is expanded locally: no variables, no globs, no
//! subshells. Only the object placeholder is replaced, and the replacement is
//! always literal, so `$HOME` in a template reaches the child untouched.

use thiserror::Error;

pub const PLACEHOLDER: &str = "$object";
const BRACED_PLACEHOLDER: &str = "${object}";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("command template is empty")]
    Empty,
    #[error("command template has unbalanced quotes")]
    MismatchedQuotes,
    #[error("command template must include the placeholder `{PLACEHOLDER}`")]
    MissingPlaceholder,
}

/// A validated, pre-tokenized command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    source: String,
    tokens: Vec<String>,
    placeholders: usize,
}

impl CommandTemplate {
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        let tokens = shellwords::split(template).map_err(|_| ConfigError::MismatchedQuotes)?;
        if tokens.is_empty() {
            return Err(ConfigError::Empty);
        }
        let placeholders = tokens
            .iter()
            .map(|token| placeholder_spans(token).len())
            .sum::<usize>();
        if placeholders == 0 {
            return Err(ConfigError::MissingPlaceholder);
        }
        Ok(Self {
            source: template.to_owned(),
            tokens,
            placeholders,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders
    }

    /// Substitutes `object` into every placeholder. The token count never
    /// changes: a token that is exactly the placeholder becomes exactly
    /// `object`, whatever it contains.
    pub fn render(&self, object: &str) -> Vec<String> {
        self.tokens
            .iter()
            .map(|token| substitute(token, object))
            .collect()
    }

    /// Shell-quoted rendering of the argv, for titles and logs.
    pub fn display_for(&self, object: &str) -> String {
        shellwords::join(
            &self
                .render(object)
                .iter()
                .map(String::as_str)
                .collect::<Vec<&str>>(),
        )
    }
}

/// One-shot form of [`CommandTemplate::parse`] followed by `render`.
pub fn render(template: &str, object: &str) -> Result<Vec<String>, ConfigError> {
    Ok(CommandTemplate::parse(template)?.render(object))
}

fn substitute(token: &str, object: &str) -> String {
    let spans = placeholder_spans(token);
    if spans.is_empty() {
        return token.to_owned();
    }
    let mut out = String::with_capacity(token.len() + object.len() * spans.len());
    let mut cursor = 0usize;
    for (start, end) in spans {
        out.push_str(&token[cursor..start]);
        out.push_str(object);
        cursor = end;
    }
    out.push_str(&token[cursor..]);
    out
}

/// Byte ranges of placeholders in `token`, in order and non-overlapping.
fn placeholder_spans(token: &str) -> Vec<(usize, usize)> {
    let bytes = token.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let rest = &bytes[i..];
        if rest.starts_with(BRACED_PLACEHOLDER.as_bytes()) {
            spans.push((i, i + BRACED_PLACEHOLDER.len()));
            i += BRACED_PLACEHOLDER.len();
            continue;
        }
        if rest.starts_with(PLACEHOLDER.as_bytes()) {
            let end = i + PLACEHOLDER.len();
            let continues_identifier = bytes
                .get(end)
                .is_some_and(|next| next.is_ascii_alphanumeric() || *next == b'_');
            if !continues_identifier {
                spans.push((i, end));
                i = end;
                continue;
            }
        }
        i += 1;
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn renders_simple_echo() {
        let argv = render("echo $object", "alpha").expect("render");
        assert_eq!(argv, vec!["echo".to_owned(), "alpha".to_owned()]);
    }

    #[test]
    fn leaves_other_variables_unexpanded() {
        let argv = render(r#"ssh $object "echo $HOSTNAME ; df -h /""#, "web-1").expect("render");
        assert_eq!(
            argv,
            vec![
                "ssh".to_owned(),
                "web-1".to_owned(),
                "echo $HOSTNAME ; df -h /".to_owned(),
            ]
        );
    }

    #[test]
    fn object_with_metacharacters_stays_one_argument() {
        let object = "name with spaces; rm -rf / $(whoami) `id` *";
        let argv = render("printf %s $object", object).expect("render");
        assert_eq!(argv.len(), 3);
        assert_eq!(argv[2], object);
    }

    #[test]
    fn placeholder_inside_word_keeps_word_together() {
        let argv = render("ssh root@$object:22 uptime", "db 1").expect("render");
        assert_eq!(argv[1], "root@db 1:22");
        assert_eq!(argv.len(), 3);
    }

    #[test]
    fn braced_placeholder_is_supported() {
        let argv = render("scp file ${object}.bak", "host").expect("render");
        assert_eq!(argv[2], "host.bak");
    }

    #[test]
    fn longer_identifier_is_not_a_placeholder() {
        let err = render("echo $objects", "x").expect_err("no placeholder");
        assert_eq!(err, ConfigError::MissingPlaceholder);
        let argv = render("echo $objects $object", "x").expect("render");
        assert_eq!(argv, vec!["echo", "$objects", "x"]);
    }

    #[test]
    fn missing_placeholder_is_config_error() {
        assert_eq!(
            CommandTemplate::parse("echo hello").expect_err("missing"),
            ConfigError::MissingPlaceholder
        );
    }

    #[test]
    fn empty_and_unbalanced_templates_are_rejected() {
        assert_eq!(
            CommandTemplate::parse("   ").expect_err("empty"),
            ConfigError::Empty
        );
        assert_eq!(
            CommandTemplate::parse("echo \"$object").expect_err("quotes"),
            ConfigError::MismatchedQuotes
        );
    }

    #[test]
    fn quoted_placeholder_is_still_substituted() {
        let argv = render("echo 'host: $object'", "a b").expect("render");
        assert_eq!(argv, vec!["echo", "host: a b"]);
    }

    #[test]
    fn display_for_quotes_arguments_with_spaces() {
        let template = CommandTemplate::parse("echo $object").expect("parse");
        assert_eq!(template.display_for("a b"), "echo a\\ b");
    }

    proptest! {
        #[test]
        fn substitution_never_changes_argument_count(object in "\\PC*") {
            let template = CommandTemplate::parse("ssh -o BatchMode=yes $object 'uptime; echo $USER'")
                .expect("parse");
            let first = template.render(&object);
            let second = template.render(&object);
            prop_assert_eq!(first.len(), template.token_count());
            prop_assert_eq!(&first, &second);
        }

        #[test]
        fn bare_placeholder_yields_object_verbatim(object in "[ -~\\t]{0,40}") {
            let template = CommandTemplate::parse("run --target $object --flag").expect("parse");
            let argv = template.render(&object);
            prop_assert_eq!(argv.len(), 4);
            prop_assert_eq!(argv[2].as_str(), object.as_str());
            prop_assert_eq!(argv[1].as_str(), "--target");
            prop_assert_eq!(argv[3].as_str(), "--flag");
        }
    }
}
