//! Per-field extractors. Each returns an explicit outcome; callers decide
//! whether a missing field drops the block.

use super::scanner::{strip_decoration, Scanner};
use super::segment::{looks_like_symbol, TableRow};
use crate::domain::error::FieldError;
use crate::domain::prediction::{Direction, PercentRange, PriceTarget};

const DIRECTION_LABELS: [&str; 5] = ["預測方向", "预测方向", "方向", "Direction", "direction"];
const TARGET_LABELS: [&str; 6] = [
    "目標價位",
    "目標價",
    "目标价",
    "Target price",
    "Target",
    "target",
];
const PREV_CLOSE_LABELS: [&str; 8] = [
    "前收盤",
    "前收盘",
    "前收",
    "昨收",
    "Prev Close",
    "Previous Close",
    "prev_close",
    "Reference Price",
];
const RATIONALE_LABELS: [&str; 6] = ["理由", "原因", "依據", "依据", "Rationale", "Reason"];

const RANGE_SEPARATORS: [&str; 7] = ["~", "～", "-", "–", "—", "至", "to"];
const PCT_SEPARATORS: [&str; 6] = ["~", "～", "to", "至", "-", "–"];

/// Name and symbol from a heading such as `台積電 (2330) ★★★`.
pub fn header(text: &str) -> Result<(String, String), FieldError> {
    let text = strip_decoration(text);
    let open = text
        .char_indices()
        .find(|(_, c)| *c == '(' || *c == '（')
        .map(|(i, c)| (i, c.len_utf8()));
    let Some((open_at, open_len)) = open else {
        return Err(FieldError::MissingSymbol);
    };

    let after = &text[open_at + open_len..];
    let close_at = after
        .find([')', '）'])
        .ok_or(FieldError::MissingSymbol)?;
    let symbol = after[..close_at].trim();
    if symbol.is_empty()
        || !(looks_like_symbol(symbol) || symbol.chars().all(|c| c.is_ascii_alphabetic()))
    {
        return Err(FieldError::MissingSymbol);
    }

    let name = clean_name(&text[..open_at]);
    let name = if name.is_empty() {
        symbol.to_string()
    } else {
        name
    };
    Ok((name, symbol.to_uppercase()))
}

fn clean_name(raw: &str) -> String {
    let without_stars: String = raw.chars().filter(|c| *c != '★' && *c != '☆').collect();
    // `聯發科 - 強力推薦` keeps the leading part; `世芯-KY` has no spaced dash
    without_stars
        .replace(" – ", " - ")
        .replace(" — ", " - ")
        .split(" - ")
        .map(str::trim)
        .find(|part| !part.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Value of the first `Label: value` line in `lines` matching any label.
pub fn labelled_value(lines: &[&str], labels: &[&str]) -> Option<String> {
    lines.iter().find_map(|line| {
        let mut s = Scanner::new(line);
        s.skip_decoration();
        s.consume_str("- ");
        s.skip_decoration();
        if !s.consume_any(labels) {
            return None;
        }
        s.skip_decoration();
        if !s.consume_any(&[":", "："]) {
            return None;
        }
        Some(strip_decoration(s.remaining()))
    })
}

pub fn direction(lines: &[&str]) -> Result<Direction, FieldError> {
    let value = labelled_value(lines, &DIRECTION_LABELS).ok_or(FieldError::MissingDirection)?;
    parse_direction(&value)
}

/// Map direction vocabulary (traditional/simplified Chinese or English) to
/// a [`Direction`]. Bullish wording wins over bearish, bearish over neutral.
pub fn parse_direction(value: &str) -> Result<Direction, FieldError> {
    let lower = value.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has_word = |vocab: &[&str]| words.iter().any(|w| vocab.contains(w));
    let has_text = |vocab: &[&str]| vocab.iter().any(|v| value.contains(v));

    if has_text(&["漲", "涨", "看多"]) || has_word(&["up", "bullish", "bull", "long", "buy"]) {
        Ok(Direction::Up)
    } else if has_text(&["跌", "看空"]) || has_word(&["down", "bearish", "bear", "short", "sell"])
    {
        Ok(Direction::Down)
    } else if has_text(&["震", "盪", "荡", "盤整", "盘整", "持平"])
        || has_word(&["neutral", "sideways", "flat", "range", "hold"])
    {
        Ok(Direction::Neutral)
    } else {
        Err(FieldError::UnknownDirection(value.to_string()))
    }
}

pub fn target(lines: &[&str]) -> Result<PriceTarget, FieldError> {
    let value = labelled_value(lines, &TARGET_LABELS).ok_or(FieldError::MissingTarget)?;
    parse_price_range(&value)
}

/// `600 ~ 610 元`, `1,470-1,475`, `46.5～47.5`.
pub fn parse_price_range(value: &str) -> Result<PriceTarget, FieldError> {
    let mut s = Scanner::new(value);
    if !s.skip_to_number(false) {
        return Err(FieldError::MissingTarget);
    }
    let min = s.parse_number(false)?;
    s.skip_whitespace();
    if !s.consume_any(&RANGE_SEPARATORS) {
        return Err(FieldError::MalformedNumber(value.to_string()));
    }
    s.skip_whitespace();
    let max = s.parse_number(false)?;
    PriceTarget::new(min, max)
}

/// Reference price from a labelled line in the block, else from a document
/// table row whose first cell is the symbol and whose third cell is numeric.
pub fn prev_close(lines: &[&str], symbol: &str, table_rows: &[TableRow]) -> Option<f64> {
    let labelled = labelled_value(lines, &PREV_CLOSE_LABELS).and_then(|v| {
        let mut s = Scanner::new(&v);
        s.skip_to_number(false);
        s.parse_number(false).ok()
    });
    if let Some(price) = labelled.filter(|p| *p > 0.0) {
        return Some(price);
    }

    table_rows.iter().find_map(|row| {
        if row.cells.len() < 3 {
            return None;
        }
        let first = strip_decoration(row.cells[0]);
        let rest = first.strip_prefix(symbol)?;
        if rest.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return None;
        }
        let mut s = Scanner::new(row.cells[2]);
        s.skip_decoration();
        let price = s.parse_number(false).ok()?;
        s.skip_decoration();
        (price > 0.0 && s.remaining().is_empty()).then_some(price)
    })
}

pub fn rationale(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| labelled_value(std::slice::from_ref(line), &RATIONALE_LABELS))
        .filter(|v| !v.is_empty())
        .collect()
}

/// Name and symbol from a review-table cell such as `**聯電 2303**`.
pub fn review_identity(cell: &str) -> Result<(String, String), FieldError> {
    let text = strip_decoration(cell);
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    let symbol = match tokens.pop() {
        Some(t) if looks_like_symbol(t) => t.to_uppercase(),
        _ => return Err(FieldError::MissingSymbol),
    };
    let name = tokens.join(" ");
    let name = if name.is_empty() { symbol.clone() } else { name };
    Ok((name, symbol))
}

/// `+2~4%`, `-1~+1%`, `+2-4%`, `+3%`. The whole cell must be the range.
pub fn percent_range(cell: &str) -> Result<PercentRange, FieldError> {
    let text = strip_decoration(cell);
    let mut s = Scanner::new(&text);
    if !s
        .peek()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '−'))
    {
        return Err(FieldError::MissingPercentRange);
    }
    let min = s.parse_number(true)?;
    s.skip_whitespace();
    s.consume_str("%");
    s.skip_whitespace();
    let max = if s.consume_any(&PCT_SEPARATORS) {
        s.skip_whitespace();
        s.parse_number(true)?
    } else {
        min
    };
    s.skip_whitespace();
    s.consume_str("%");
    if !s.remaining().trim().is_empty() {
        return Err(FieldError::MalformedNumber(text));
    }
    PercentRange::new(min, max)
}

/// Observed move such as `**-1.32%**`; the `%` is required.
pub fn observed_percent(cell: &str) -> Result<f64, FieldError> {
    let text = strip_decoration(cell);
    let mut s = Scanner::new(&text);
    let value = s.parse_number(true)?;
    s.skip_whitespace();
    if !s.consume_str("%") || !s.remaining().trim().is_empty() {
        return Err(FieldError::MalformedNumber(text));
    }
    Ok(value)
}
