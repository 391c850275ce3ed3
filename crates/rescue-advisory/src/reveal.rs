/// Typewriter-style cursor over the current advice text.
///
/// Each [`RevealCursor::tick`] exposes one more character, so text of `L`
/// characters is fully visible after exactly `L` ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealCursor {
    text: String,
    revealed_chars: usize,
    total_chars: usize,
}

impl RevealCursor {
    pub fn new(text: impl Into<String>) -> Self {
        let mut cursor = Self::default();
        cursor.restart(text);
        cursor
    }

    /// Replaces the text and moves the cursor back to the start.
    pub fn restart(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.total_chars = self.text.chars().count();
        self.revealed_chars = 0;
    }

    /// Advances one character; returns false once everything is visible.
    pub fn tick(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }
        self.revealed_chars += 1;
        true
    }

    pub fn is_complete(&self) -> bool {
        self.revealed_chars >= self.total_chars
    }

    pub fn position(&self) -> usize {
        self.revealed_chars
    }

    pub fn len(&self) -> usize {
        self.total_chars
    }

    pub fn is_empty(&self) -> bool {
        self.total_chars == 0
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn visible(&self) -> &str {
        let end = self
            .text
            .char_indices()
            .nth(self.revealed_chars)
            .map(|(index, _)| index)
            .unwrap_or(self.text.len());
        &self.text[..end]
    }
}
