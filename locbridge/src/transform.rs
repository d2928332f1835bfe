//! Value post-processing applied before a string lands in a native resource.
//!
//! A [`Pipeline`] is an ordered list of [`ValueTransform`] steps. Each platform
//! has one: Android converts iOS object placeholders and escapes apostrophes,
//! Apple `.strings` output escapes quotes and line breaks.
//!
//! Every step is idempotent on its own output, which keeps repeated hook runs
//! from stacking escapes.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // `%@` and positional `%1$@` object placeholders.
    static ref OBJECT_PLACEHOLDER_REGEX: Regex = Regex::new(r"%@").unwrap();
    static ref POSITIONAL_OBJECT_REGEX: Regex = Regex::new(r"\$@").unwrap();
}

/// One text transformation step.
pub trait ValueTransform: Send + Sync {
    fn apply<'a>(&self, value: &'a str) -> Cow<'a, str>;
}

/// Rewrites iOS object placeholders to their Android string form.
///
/// - `%@`   -> `%s`
/// - `%1$@` -> `%1$s`
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderToAndroid;

impl ValueTransform for PlaceholderToAndroid {
    fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match OBJECT_PLACEHOLDER_REGEX.replace_all(value, "%s") {
            Cow::Borrowed(untouched) => POSITIONAL_OBJECT_REGEX.replace_all(untouched, "$$s"),
            Cow::Owned(replaced) => Cow::Owned(
                POSITIONAL_OBJECT_REGEX
                    .replace_all(&replaced, "$$s")
                    .into_owned(),
            ),
        }
    }
}

/// Escapes `'` as `\'`, leaving already escaped apostrophes alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct EscapeApostrophes;

impl ValueTransform for EscapeApostrophes {
    fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        escape_unescaped(value, '\'')
    }
}

/// Escapes `"` and literal line breaks for the Apple `.strings` syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct EscapeStringsLiteral;

impl ValueTransform for EscapeStringsLiteral {
    fn apply<'a>(&self, value: &'a str) -> Cow<'a, str> {
        let quoted = escape_unescaped(value, '"');
        if !quoted.contains(['\n', '\r']) {
            return quoted;
        }
        Cow::Owned(
            quoted
                .replace("\r\n", "\\n")
                .replace('\n', "\\n")
                .replace('\r', "\\n"),
        )
    }
}

// Prefixes every `target` with a backslash unless an odd run of backslashes
// already precedes it.
fn escape_unescaped(value: &str, target: char) -> Cow<'_, str> {
    if !value.contains(target) {
        return Cow::Borrowed(value);
    }

    let mut out = String::with_capacity(value.len() + 4);
    let mut backslashes = 0usize;
    for c in value.chars() {
        if c == target && backslashes % 2 == 0 {
            out.push('\\');
        }
        if c == '\\' {
            backslashes += 1;
        } else {
            backslashes = 0;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Ordered list of transforms.
pub struct Pipeline {
    steps: Vec<Box<dyn ValueTransform>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline { steps: Vec::new() }
    }

    /// Appends a step; steps run in the order they were added.
    pub fn then<T: ValueTransform + 'static>(mut self, step: T) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Placeholder conversion, then apostrophe escaping.
    pub fn android() -> Self {
        Pipeline::new()
            .then(PlaceholderToAndroid)
            .then(EscapeApostrophes)
    }

    pub fn apple_strings() -> Self {
        Pipeline::new().then(EscapeStringsLiteral)
    }

    pub fn apply(&self, value: &str) -> String {
        let mut current = value.to_string();
        for step in &self.steps {
            if let Cow::Owned(next) = step.apply(&current) {
                current = next;
            }
        }
        current
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_to_android() {
        let t = PlaceholderToAndroid;
        assert_eq!(t.apply("Hello %@"), "Hello %s");
        assert_eq!(t.apply("%1$@ and %2$@"), "%1$s and %2$s");
        assert_eq!(t.apply("%d items"), "%d items");
        assert!(matches!(t.apply("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_apostrophes_escaped_once() {
        let t = EscapeApostrophes;
        assert_eq!(t.apply("Don't"), "Don\\'t");
        assert_eq!(t.apply("Don\\'t"), "Don\\'t");
        assert_eq!(t.apply("''"), "\\'\\'");
        // An escaped backslash does not escape the quote after it.
        assert_eq!(t.apply("a\\\\'b"), "a\\\\\\'b");
    }

    #[test]
    fn test_strings_literal_escaping() {
        let t = EscapeStringsLiteral;
        assert_eq!(t.apply(r#"Say "hi""#), r#"Say \"hi\""#);
        assert_eq!(t.apply(r#"Say \"hi\""#), r#"Say \"hi\""#);
        assert_eq!(t.apply("line 1\nline 2"), "line 1\\nline 2");
    }

    #[test]
    fn test_android_pipeline_order() {
        let pipeline = Pipeline::android();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.apply("It's %1$@'s turn"), "It\\'s %1$s\\'s turn");
    }

    #[test]
    fn test_pipelines_are_idempotent() {
        for pipeline in [Pipeline::android(), Pipeline::apple_strings()] {
            let once = pipeline.apply("It's \"%1$@\"\nnext");
            assert_eq!(pipeline.apply(&once), once);
        }
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        assert!(Pipeline::new().is_empty());
        assert_eq!(Pipeline::default().apply("As is %@"), "As is %@");
    }
}
