//! Quote-aware record splitting and field quoting.

use super::Delimiter;

/// Split text into records of fields.
///
/// Quoted fields may contain the delimiter, line breaks and doubled quotes.
/// Unquoted fields are trimmed. The first record is always returned (the
/// header); later records that are entirely blank are skipped.
pub(super) fn records(text: &str, delimiter: Delimiter) -> Vec<Vec<String>> {
    let separator = delimiter.as_char();
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                },
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() && !quoted => {
                field.clear();
                quoted = true;
                in_quotes = true;
            },
            c if c == separator => {
                fields.push(finish_field(&mut field, &mut quoted));
            },
            '\n' => {
                fields.push(finish_field(&mut field, &mut quoted));
                push_record(&mut records, std::mem::take(&mut fields));
            },
            '\r' if chars.peek() == Some(&'\n') => {},
            _ => field.push(c),
        }
    }

    if !field.is_empty() || quoted || !fields.is_empty() || records.is_empty() {
        fields.push(finish_field(&mut field, &mut quoted));
        push_record(&mut records, fields);
    }

    records
}

fn finish_field(field: &mut String, quoted: &mut bool) -> String {
    let value = std::mem::take(field);
    if std::mem::replace(quoted, false) {
        value
    } else {
        value.trim().to_string()
    }
}

fn push_record(records: &mut Vec<Vec<String>>, fields: Vec<String>) {
    let blank = fields.len() == 1 && fields[0].is_empty();
    if records.is_empty() || !blank {
        records.push(fields);
    }
}

/// Wrap a field in quotes, doubling embedded quotes.
pub(super) fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
