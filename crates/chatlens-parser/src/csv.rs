// CSV exports: a header row naming Date, User and Message columns, followed
// by one record per message. Quoted fields may contain commas, doubled
// quotes and newlines.

use chrono::NaiveDateTime;

use chatlens_types::ParsedMessage;

use crate::error::{ParseError, Result};
use crate::parser::{LogFormat, ParseReport};

const DATE_COLUMNS: &[&str] = &["date", "날짜", "timestamp"];
const USER_COLUMNS: &[&str] = &["user", "사용자", "author", "name"];
const MESSAGE_COLUMNS: &[&str] = &["message", "메시지", "text", "content"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

fn normalise(column: &str) -> String {
    column.trim().trim_matches('"').trim().to_lowercase()
}

fn column_index(header: &[String], aliases: &[&str]) -> Option<usize> {
    header.iter().position(|c| aliases.contains(&c.as_str()))
}

/// A first line naming at least two known columns is treated as a CSV header.
pub(crate) fn looks_like_header(line: &str) -> bool {
    if !line.contains(',') {
        return false;
    }
    let columns: Vec<String> = line.split(',').map(normalise).collect();
    [DATE_COLUMNS, USER_COLUMNS, MESSAGE_COLUMNS]
        .iter()
        .filter(|aliases| column_index(&columns, aliases).is_some())
        .count()
        >= 2
}

fn read_records(raw: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match (quoted, c) {
            (true, '"') if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            (true, '"') => quoted = false,
            (true, c) => field.push(c),
            (false, '"') if field.is_empty() => quoted = true,
            (false, ',') => record.push(std::mem::take(&mut field)),
            (false, '\r') => {}
            (false, '\n') => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            (false, c) => field.push(c),
        }
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    records
        .into_iter()
        .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
        .collect()
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

pub(crate) fn parse(raw: &str) -> Result<ParseReport> {
    let mut records = read_records(raw).into_iter();
    let header: Vec<String> = records
        .next()
        .map(|h| h.iter().map(|c| normalise(c)).collect())
        .unwrap_or_default();

    let date = column_index(&header, DATE_COLUMNS);
    let user = column_index(&header, USER_COLUMNS);
    let message = column_index(&header, MESSAGE_COLUMNS);

    let (date, user, message) = match (date, user, message) {
        (Some(d), Some(u), Some(m)) => (d, u, m),
        _ => {
            let missing = [("Date", date), ("User", user), ("Message", message)]
                .into_iter()
                .filter(|(_, index)| index.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(ParseError::MissingColumns(missing));
        }
    };

    let mut report = ParseReport {
        format: LogFormat::Csv,
        messages: Vec::new(),
        skipped_lines: 0,
        continuation_lines: 0,
        date_lines: 0,
    };

    for record in records {
        let fields = (
            record.get(date).and_then(|v| parse_timestamp(v)),
            record.get(user).map(|v| v.trim()).filter(|v| !v.is_empty()),
            record.get(message),
        );
        match fields {
            (Some(timestamp), Some(author), Some(text)) => {
                let sequence = report.messages.len() as u64;
                report.messages.push(ParsedMessage {
                    author: author.to_string(),
                    text: text.clone(),
                    timestamp,
                    sequence,
                });
            }
            _ => report.skipped_lines += 1,
        }
    }

    if report.messages.is_empty() {
        return Err(ParseError::UnrecognizedFormat {
            skipped_lines: report.skipped_lines,
        });
    }

    tracing::debug!(
        messages = report.messages.len(),
        skipped = report.skipped_lines,
        "Parsed CSV export"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_detection() {
        assert!(looks_like_header("Date,User,Message"));
        assert!(looks_like_header("날짜,사용자,메시지"));
        assert!(looks_like_header("\"Date\",\"User\""));
        assert!(!looks_like_header("오후 1:23, Alice : hello"));
        assert!(!looks_like_header("Date only"));
    }

    #[test]
    fn test_quoted_fields() {
        let records = read_records("a,\"b, c\",\"say \"\"hi\"\"\"\n\"multi\nline\",x,y\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec!["a", "b, c", "say \"hi\""]);
        assert_eq!(records[1][0], "multi\nline");
    }

    #[test]
    fn test_parse_csv_export() {
        let raw = "Date,User,Message\n2024-01-15 13:23:00,Alice,\"hello, world\"\n2024-01-15 13:25:00,Bob,hi\nbad-date,Carol,skip\n";
        let report = parse(raw).unwrap();

        assert_eq!(report.format, LogFormat::Csv);
        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.messages[0].text, "hello, world");
        assert_eq!(report.messages[1].author, "Bob");
        assert_eq!(report.skipped_lines, 1);
    }

    #[test]
    fn test_missing_columns() {
        let err = parse("Date,User\n2024-01-15 13:23:00,Alice\n").unwrap_err();
        assert_eq!(err, ParseError::MissingColumns(vec!["Message".to_string()]));
    }
}
