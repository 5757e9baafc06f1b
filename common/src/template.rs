// Grant-message template rendering
//
// Supports two placeholders, `{member}` and `{role}`. Substitution is a
// single left-to-right pass over the template: replaced text is never
// re-scanned, so a substituted value containing a literal placeholder token
// stays literal.

use regex::{Captures, Regex};

const PLACEHOLDER_PATTERN: &str = r"\{(member|role)\}";

/// Renders grant announcements from a guild's configured template.
pub struct TemplateRenderer {
    placeholder_regex: Regex,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        // The pattern is a constant; compilation cannot fail on it.
        let placeholder_regex =
            Regex::new(PLACEHOLDER_PATTERN).expect("placeholder pattern is valid");
        Self { placeholder_regex }
    }

    /// Substitute every `{member}` and `{role}` occurrence. Unknown `{...}`
    /// tokens pass through verbatim.
    pub fn render(&self, template: &str, member_mention: &str, role_mention: &str) -> String {
        self.placeholder_regex
            .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
                "member" => member_mention.to_string(),
                _ => role_mention.to_string(),
            })
            .into_owned()
    }

    /// True when the template references at least one placeholder.
    pub fn has_placeholders(&self, template: &str) -> bool {
        self.placeholder_regex.is_match(template)
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}
