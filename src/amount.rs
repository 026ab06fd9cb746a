//! Deposit amount field sanitizing
//!
//! Two cooperating pieces keep the field readable as a decimal number:
//! a keystroke filter that rejects anything but digits and a single decimal
//! separator, and [`format_amount`] which normalizes leading zeros and a
//! leading separator whenever the field changes or loses focus.

use crate::surface::{Surface, AMOUNT_INPUT};

/// Characters accepted as decimal separator; they are interchangeable
pub const SEPARATORS: [char; 2] = [',', '.'];

fn is_separator(c: char) -> bool {
    SEPARATORS.contains(&c)
}

/// Normalize raw amount text.
///
/// - a leading separator gets a `0` in front (`".5"` -> `"0.5"`)
/// - a run of leading zeros collapses to one (`"000"` -> `"0"`)
/// - a single zero directly before a nonzero digit is dropped (`"07"` -> `"7"`)
///
/// Idempotent: formatting an already formatted value returns it unchanged.
pub fn format_amount(text: &str) -> String {
    let mut value = if text.starts_with(is_separator) {
        format!("0{}", text)
    } else {
        text.to_string()
    };

    let rest = value.trim_start_matches('0');
    if rest.len() < value.len() {
        value = format!("0{}", rest);
    }

    let mut chars = value.chars();
    if let (Some('0'), Some(next)) = (chars.next(), chars.next()) {
        if ('1'..='9').contains(&next) {
            value.remove(0);
        }
    }

    value
}

/// Key pressed while the amount field has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
}

/// What the field should do with a keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDecision {
    /// Let the character through
    Accept,
    /// Swallow the keystroke
    Reject,
    /// Swallow the keystroke and drop focus from the field
    Blur,
}

/// Decide whether `key` may be typed into a field currently holding `current`.
pub fn filter_key(current: &str, key: Key) -> KeyDecision {
    match key {
        Key::Enter => KeyDecision::Blur,
        Key::Char(c) if c.is_ascii_digit() => KeyDecision::Accept,
        Key::Char(c) if is_separator(c) => {
            if current.contains(is_separator) {
                KeyDecision::Reject
            } else {
                KeyDecision::Accept
            }
        }
        Key::Char(_) => KeyDecision::Reject,
    }
}

/// Amount field bound to the rendered surface
///
/// Keeps its own copy of the raw text so keystroke decisions never need to
/// read back from the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountField {
    raw_text: String,
}

impl AmountField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.raw_text
    }

    /// Handle a keypress; accepted characters are appended and the text
    /// reformatted, as the page's input event would.
    pub fn on_key(&mut self, key: Key, surface: &dyn Surface) -> KeyDecision {
        let decision = filter_key(&self.raw_text, key);
        match (decision, key) {
            (KeyDecision::Accept, Key::Char(c)) => {
                self.raw_text.push(c);
                self.raw_text = format_amount(&self.raw_text);
                surface.set_value(AMOUNT_INPUT, &self.raw_text);
            }
            (KeyDecision::Blur, _) => {
                surface.blur(AMOUNT_INPUT);
                self.on_blur(surface);
            }
            _ => {}
        }
        decision
    }

    /// Handle an input event (paste, drop, autofill) carrying the full new text
    pub fn on_input(&mut self, text: &str, surface: &dyn Surface) {
        self.raw_text = format_amount(text);
        surface.set_value(AMOUNT_INPUT, &self.raw_text);
    }

    pub fn on_blur(&mut self, surface: &dyn Surface) {
        self.raw_text = format_amount(&self.raw_text);
        surface.set_value(AMOUNT_INPUT, &self.raw_text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use proptest::prelude::*;

    #[test]
    fn test_leading_separator_gets_zero() {
        assert_eq!(format_amount(",5"), "0,5");
        assert_eq!(format_amount(".5"), "0.5");
        assert_eq!(format_amount("."), "0.");
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(format_amount("00"), "0");
        assert_eq!(format_amount("007"), "7");
        assert_eq!(format_amount("0"), "0");
        assert_eq!(format_amount("000,25"), "0,25");
        assert_eq!(format_amount("0100"), "100");
    }

    #[test]
    fn test_untouched_values() {
        assert_eq!(format_amount(""), "");
        assert_eq!(format_amount("12.5"), "12.5");
        assert_eq!(format_amount("0.05"), "0.05");
    }

    #[test]
    fn test_separator_rejected_when_present() {
        assert_eq!(filter_key("3,", Key::Char('.')), KeyDecision::Reject);
        assert_eq!(filter_key("3.", Key::Char(',')), KeyDecision::Reject);
        assert_eq!(filter_key("", Key::Char(',')), KeyDecision::Accept);
        assert_eq!(filter_key("3", Key::Char('.')), KeyDecision::Accept);
    }

    #[test]
    fn test_other_keys() {
        assert_eq!(filter_key("1", Key::Char('7')), KeyDecision::Accept);
        assert_eq!(filter_key("1", Key::Char('e')), KeyDecision::Reject);
        assert_eq!(filter_key("1", Key::Char('-')), KeyDecision::Reject);
        assert_eq!(filter_key("1", Key::Enter), KeyDecision::Blur);
    }

    #[test]
    fn test_field_typing_session() {
        let surface = MemorySurface::new();
        let mut field = AmountField::new();

        let typed = [
            ('0', "0"),
            ('0', "0"),
            ('.', "0."),
            (',', "0."),
            ('x', "0."),
            ('5', "0.5"),
        ];
        for (c, shown) in typed {
            field.on_key(Key::Char(c), &surface);
            assert_eq!(surface.value(AMOUNT_INPUT).as_deref(), Some(shown), "after {:?}", c);
        }
        assert_eq!(field.text(), "0.5");

        assert_eq!(field.on_key(Key::Enter, &surface), KeyDecision::Blur);
        assert_eq!(field.text(), "0.5");
        assert_eq!(surface.value(AMOUNT_INPUT).as_deref(), Some("0.5"));
        assert_eq!(surface.blur_count(AMOUNT_INPUT), 1);
    }

    #[test]
    fn test_keystrokes_never_render_leading_zero_or_separator() {
        let surface = MemorySurface::new();
        let mut field = AmountField::new();
        field.on_key(Key::Char('0'), &surface);
        field.on_key(Key::Char('7'), &surface);
        assert_eq!(surface.value(AMOUNT_INPUT).as_deref(), Some("7"));

        let mut field = AmountField::new();
        field.on_key(Key::Char(','), &surface);
        assert_eq!(surface.value(AMOUNT_INPUT).as_deref(), Some("0,"));
    }

    #[test]
    fn test_pasted_text_is_formatted() {
        let surface = MemorySurface::new();
        let mut field = AmountField::new();
        field.on_input(",75", &surface);
        assert_eq!(surface.value(AMOUNT_INPUT).as_deref(), Some("0,75"));
    }

    proptest! {
        #[test]
        fn prop_format_is_idempotent(s in "[0-9,.a-z]{0,12}") {
            let once = format_amount(&s);
            prop_assert_eq!(format_amount(&once), once.clone());
        }

        #[test]
        fn prop_formatted_never_starts_with_separator(s in "[0-9,.]{0,12}") {
            let out = format_amount(&s);
            prop_assert!(!out.starts_with(is_separator));
            prop_assert!(!(out.starts_with('0') && out[1..].starts_with(|c: char| ('1'..='9').contains(&c))));
        }
    }
}
