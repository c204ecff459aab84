//! Character scanner shared by the segmenter and the field extractors.

use chrono::NaiveDate;

use crate::domain::error::FieldError;

pub(crate) struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    pub(crate) fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip whitespace and Markdown emphasis markers.
    pub(crate) fn skip_decoration(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || ch == '*' || ch == '`' {
                self.advance();
            } else {
                break;
            }
        }
    }

    pub(crate) fn consume_str(&mut self, s: &str) -> bool {
        if self.remaining().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    pub(crate) fn consume_any(&mut self, options: &[&str]) -> bool {
        options.iter().any(|s| self.consume_str(s))
    }

    /// Advance until the next ASCII digit (or a sign directly followed by one).
    pub(crate) fn skip_to_number(&mut self, allow_sign: bool) -> bool {
        loop {
            let rest = self.remaining();
            let mut chars = rest.chars();
            match chars.next() {
                None => return false,
                Some(c) if c.is_ascii_digit() => return true,
                Some(c) if allow_sign && is_sign(c) => {
                    if chars.next().is_some_and(|n| n.is_ascii_digit()) {
                        return true;
                    }
                }
                Some(_) => {}
            }
            self.advance();
        }
    }

    /// Parse `1,234.5` style numbers. With `allow_sign`, a leading `+`, `-`
    /// or `−` is accepted.
    pub(crate) fn parse_number(&mut self, allow_sign: bool) -> Result<f64, FieldError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut text = String::new();

        if allow_sign {
            match self.peek() {
                Some('+') => {
                    self.advance();
                }
                Some('-') | Some('−') => {
                    self.advance();
                    text.push('-');
                }
                _ => {}
            }
        }

        let mut digits = 0;
        let mut has_dot = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                text.push(ch);
                self.advance();
            } else if ch == ',' && digits > 0 && self.next_is_digit_after(ch) {
                self.advance();
            } else if ch == '.' && !has_dot && self.next_is_digit_after(ch) {
                has_dot = true;
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            let found: String = self.input[start..].chars().take(12).collect();
            return Err(FieldError::MalformedNumber(found.trim().to_string()));
        }

        text.parse::<f64>()
            .map_err(|_| FieldError::MalformedNumber(text.clone()))
    }

    fn next_is_digit_after(&self, ch: char) -> bool {
        self.remaining()[ch.len_utf8()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }
}

fn is_sign(c: char) -> bool {
    matches!(c, '+' | '-' | '−')
}

/// Remove Markdown emphasis and surrounding whitespace.
pub(crate) fn strip_decoration(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '*' && *c != '`')
        .collect::<String>()
        .trim()
        .to_string()
}

/// First `YYYY-MM-DD` or `YYYY/MM/DD` date in `text`.
pub(crate) fn find_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    for i in 0..=bytes.len() - 10 {
        if i > 0 && bytes[i - 1].is_ascii_digit() {
            continue;
        }
        let w = &bytes[i..i + 10];
        let digits_ok = [0, 1, 2, 3, 5, 6, 8, 9].iter().all(|&j| w[j].is_ascii_digit());
        let seps_ok = matches!(w[4], b'-' | b'/') && matches!(w[7], b'-' | b'/');
        let trailing_ok = bytes.get(i + 10).is_none_or(|b| !b.is_ascii_digit());
        if !(digits_ok && seps_ok && trailing_ok) {
            continue;
        }
        // Window is pure ASCII here, so slicing on byte offsets is safe.
        let s = &text[i..i + 10];
        let year = s[0..4].parse::<i32>().ok();
        let month = s[5..7].parse::<u32>().ok();
        let day = s[8..10].parse::<u32>().ok();
        if let (Some(y), Some(m), Some(d)) = (year, month, day) {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                return Some(date);
            }
        }
    }
    None
}
