use std::borrow::Cow;

/// Ordered text substitutions applied to titles and names coming out of
/// sheet documents. Earlier rules win over later, overlapping ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionTable {
    rules: Vec<(String, String)>,
}

impl SubstitutionTable {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        let pattern = pattern.into();
        if !pattern.is_empty() {
            self.rules.push((pattern, replacement.into()));
        }
        self
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Borrows the input untouched when no rule matches.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(text);
        for (pattern, replacement) in &self.rules {
            if out.contains(pattern.as_str()) {
                out = Cow::Owned(out.replace(pattern.as_str(), replacement));
            }
        }
        out
    }
}

/// Repairs UTF-8 punctuation that was decoded as a legacy code page on its
/// way into the sheet API.
impl Default for SubstitutionTable {
    fn default() -> Self {
        Self::new()
            .with_rule("\u{393}\u{c7}\u{d6}", "'")
            .with_rule("\u{413}\u{c7}\u{d6}", "'")
            .with_rule("\u{e2}\u{80}\u{99}", "'")
            .with_rule("\u{e2}\u{80}\u{9c}", "\"")
            .with_rule("\u{e2}\u{80}\u{9d}", "\"")
            .with_rule("\u{e2}\u{80}\u{93}", "\u{2013}")
            .with_rule("\u{e2}\u{80}\u{94}", "\u{2014}")
            // Partial sequence whose lead character was already lost.
            .with_rule("\u{c7}\u{d6}", "'")
    }
}
