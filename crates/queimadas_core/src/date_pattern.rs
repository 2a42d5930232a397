//! Date formats and date placeholders embedded in layer names, titles and times.
//!
//! Formats use the dashboard's token style (`YYYY`, `MM`, `DD`, `HH`, `II`,
//! `SS`). A placeholder is written `{{FORMAT}}` or `{{FORMAT|-1}}`, where the
//! optional signed number shifts the resolved date by whole days.

use chrono::{Days, NaiveDate, NaiveDateTime};

const TOKENS: [(&str, &str); 6] = [
    ("YYYY", "%Y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("II", "%M"),
    ("SS", "%S"),
];

/// Translate a dashboard date format into a `chrono` format string.
pub fn to_chrono_format(format: &str) -> String {
    let mut out = String::with_capacity(format.len() + 4);
    let mut rest = format;
    'outer: while !rest.is_empty() {
        for (token, spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            if ch == '%' {
                out.push_str("%%");
            } else {
                out.push(ch);
            }
        }
        rest = chars.as_str();
    }
    out
}

/// Format a date with a dashboard date format.
pub fn format_date(date: NaiveDate, format: &str) -> String {
    date.format(&to_chrono_format(format)).to_string()
}

/// Format a date/time with a dashboard date format.
pub fn format_date_time(value: NaiveDateTime, format: &str) -> String {
    value.format(&to_chrono_format(format)).to_string()
}

/// Parse a date written in a dashboard date format.
pub fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), &to_chrono_format(format)).ok()
}

/// Parse a date/time written in a dashboard date format.
pub fn parse_date_time(value: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), &to_chrono_format(format)).ok()
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Placeholder { format: &'a str, offset_days: i64 },
}

/// Day offset of a placeholder: `-1`, `+2` or `-1d`; anything else is `0`.
fn parse_offset_days(offset: &str) -> i64 {
    let offset = offset.trim();
    offset
        .strip_suffix('d')
        .unwrap_or(offset)
        .parse()
        .unwrap_or(0)
}

fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        if start > 0 {
            out.push(Segment::Literal(&rest[..start]));
        }
        let body = &rest[start + 2..start + 2 + len];
        let (format, offset_days) = match body.split_once('|') {
            Some((format, offset)) => (format, parse_offset_days(offset)),
            None => (body, 0),
        };
        out.push(Segment::Placeholder {
            format: format.trim(),
            offset_days,
        });
        rest = &rest[start + 2 + len + 2..];
    }
    if !rest.is_empty() {
        out.push(Segment::Literal(rest));
    }
    out
}

/// Returns `true` when `text` contains at least one date placeholder.
pub fn has_date_pattern(text: &str) -> bool {
    segments(text)
        .iter()
        .any(|segment| matches!(segment, Segment::Placeholder { .. }))
}

/// Resolve every placeholder in `text` against `today`.
pub fn process_string_with_date_pattern(text: &str, today: NaiveDate) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Literal(literal) => out.push_str(literal),
            Segment::Placeholder {
                format,
                offset_days,
            } => {
                let date = shift_days(today, offset_days).unwrap_or_else(|| {
                    tracing::warn!(offset_days, "date placeholder offset out of range");
                    today
                });
                out.push_str(&format_date(date, format));
            }
        }
    }
    out
}

fn shift_days(day: NaiveDate, offset_days: i64) -> Option<NaiveDate> {
    let days = Days::new(offset_days.unsigned_abs());
    if offset_days < 0 {
        day.checked_sub_days(days)
    } else {
        day.checked_add_days(days)
    }
}

/// Format of the first placeholder in `text`, if any.
pub fn format_from_string_with_date_pattern(text: &str) -> Option<String> {
    segments(text).into_iter().find_map(|segment| match segment {
        Segment::Placeholder { format, .. } => Some(format.to_string()),
        Segment::Literal(_) => None,
    })
}

/// Replace every placeholder in `text` with `replacement`.
pub fn replace_date_pattern_with_string(text: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Literal(literal) => out.push_str(literal),
            Segment::Placeholder { .. } => out.push_str(replacement),
        }
    }
    out
}
