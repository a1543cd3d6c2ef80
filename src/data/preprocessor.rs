// ============================================================
// Layer 4 — Sentence Preprocessor
// ============================================================
// Normalises each corpus sentence before tokenisation so the
// three corpora share one surface form:
//
//   1. Lowercase
//   2. Detach `.`, `?`, `,` and `'` so they become their own
//      whitespace-separated tokens ("it's." → "it 's .")
//   3. Map tabs, non-breaking spaces and control characters
//      to plain spaces
//   4. Collapse runs of whitespace and trim
//
// Example:
//   "Is it   GOOD?"  →  "is it good ?"

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one sentence. Returns an owned String.
    pub fn clean(&self, text: &str) -> String {
        // ── Step 1: Lowercase, detach punctuation, blank out oddities ─────────
        let mut spaced = String::with_capacity(text.len() + 8);
        for c in text.chars().flat_map(char::to_lowercase) {
            match c {
                '.' | '?' | ',' | '\'' => {
                    spaced.push(' ');
                    spaced.push(c);
                }
                '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => spaced.push(' '),
                c if c.is_control() => spaced.push(' '),
                c => spaced.push(c),
            }
        }

        // ── Step 2: Collapse whitespace ───────────────────────────────────────
        spaced.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
