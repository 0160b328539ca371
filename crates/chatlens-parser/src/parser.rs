use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use chatlens_types::ParsedMessage;

use crate::csv;
use crate::error::{ParseError, Result};
use crate::grammar::{date_header, take_author_and_text, take_date, take_time};

#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    /// Date used for messages that appear before any date header.
    /// `None` means today (UTC) at parse time.
    pub fallback_date: Option<NaiveDate>,
}

impl ParserConfig {
    pub fn with_fallback_date(mut self, date: NaiveDate) -> Self {
        self.fallback_date = Some(date);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    KakaoText,
    Csv,
}

/// Result of one parse pass, including partial-match bookkeeping.
#[derive(Debug, Clone)]
pub struct ParseReport {
    pub format: LogFormat,
    pub messages: Vec<ParsedMessage>,
    /// Non-blank lines that matched nothing and had no message to attach to
    pub skipped_lines: usize,
    /// Lines appended to the preceding message
    pub continuation_lines: usize,
    pub date_lines: usize,
}

enum Line<'a> {
    Blank,
    DateHeader(NaiveDate),
    Message {
        date: Option<NaiveDate>,
        time: NaiveTime,
        author: &'a str,
        text: &'a str,
    },
    Other,
}

/// `[Author] [오후 1:23] text`
fn pc_message(s: &str) -> Option<Line<'_>> {
    let rest = s.strip_prefix('[')?;
    let (author, rest) = rest.split_once("] [")?;
    let (time, rest) = take_time(rest)?;
    let rest = rest.trim_start().strip_prefix(']')?;
    let author = author.trim();
    if author.is_empty() {
        return None;
    }
    Some(Line::Message {
        date: None,
        time,
        author,
        text: rest.strip_prefix(' ').unwrap_or(rest),
    })
}

/// `2024년 1월 15일 오후 1:23, Author : text`
fn dated_message(s: &str) -> Option<Line<'_>> {
    let (date, rest) = take_date(s)?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(',').unwrap_or(rest);
    let (time, rest) = take_time(rest)?;
    let (author, text) = take_author_and_text(rest)?;
    Some(Line::Message {
        date: Some(date),
        time,
        author,
        text,
    })
}

/// `오후 1:23, Author : text`
fn short_message(s: &str) -> Option<Line<'_>> {
    let (time, rest) = take_time(s)?;
    let (author, text) = take_author_and_text(rest)?;
    Some(Line::Message {
        date: None,
        time,
        author,
        text,
    })
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }

    if let Some(message) = pc_message(trimmed)
        .or_else(|| dated_message(trimmed))
        .or_else(|| short_message(trimmed))
    {
        return message;
    }

    // Separator lines such as "----- 2024년 1월 15일 월요일 -----"
    let undecorated = trimmed.trim_matches(|c: char| c == '-' || c.is_whitespace());
    if let Some(date) = date_header(undecorated) {
        return Line::DateHeader(date);
    }

    Line::Other
}

/// Single-pass parser for exported chat logs.
#[derive(Debug, Clone, Default)]
pub struct LogParser {
    config: ParserConfig,
}

impl LogParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse raw export text into messages in source order.
    ///
    /// Lines that match no message shape are appended to the previous
    /// message as continuation lines. Fails when no message is found.
    pub fn parse(&self, raw: &str) -> Result<ParseReport> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let fallback = self
            .config
            .fallback_date
            .unwrap_or_else(|| Utc::now().date_naive());

        if raw
            .lines()
            .find(|l| !l.trim().is_empty())
            .is_some_and(csv::looks_like_header)
        {
            return csv::parse(raw);
        }

        let mut current_date: Option<NaiveDate> = None;
        let mut report = ParseReport {
            format: LogFormat::KakaoText,
            messages: Vec::new(),
            skipped_lines: 0,
            continuation_lines: 0,
            date_lines: 0,
        };

        for line in raw.lines() {
            match classify(line) {
                Line::Blank => {}
                Line::DateHeader(date) => {
                    current_date = Some(date);
                    report.date_lines += 1;
                }
                Line::Message { date, time, author, text } => {
                    if date.is_some() {
                        current_date = date;
                    }
                    let day = current_date.unwrap_or(fallback);
                    let sequence = report.messages.len() as u64;
                    report.messages.push(ParsedMessage {
                        author: author.to_string(),
                        text: text.to_string(),
                        timestamp: day.and_time(time),
                        sequence,
                    });
                }
                Line::Other => match report.messages.last_mut() {
                    Some(previous) => {
                        previous.text.push('\n');
                        previous.text.push_str(line.trim_end());
                        report.continuation_lines += 1;
                    }
                    None => report.skipped_lines += 1,
                },
            }
        }

        if report.messages.is_empty() {
            tracing::debug!(skipped = report.skipped_lines, "No message lines recognised");
            return Err(ParseError::UnrecognizedFormat {
                skipped_lines: report.skipped_lines,
            });
        }

        tracing::debug!(
            messages = report.messages.len(),
            continuation = report.continuation_lines,
            skipped = report.skipped_lines,
            "Parsed chat export"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn parser() -> LogParser {
        LogParser::new(
            ParserConfig::default().with_fallback_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        )
    }

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    #[test]
    fn test_short_form_with_blank_line() {
        let raw = "오후 1:23, Alice : hello\n\n오전 9:05, Bob : morning";
        let report = parser().parse(raw).unwrap();

        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.messages[0].author, "Alice");
        assert_eq!(report.messages[0].text, "hello");
        assert_eq!(report.messages[0].timestamp, ts(2024, 3, 1, 13, 23));
        assert_eq!(report.messages[1].author, "Bob");
        assert_eq!(report.messages[1].sequence, 1);
    }

    #[test]
    fn test_pc_export_with_date_separators() {
        let raw = "\
Talk_2024.1.16 님과 카카오톡 대화
저장한 날짜 : 2024-01-16 10:00:00

--------------- 2024년 1월 15일 월요일 ---------------
[Alice] [오후 11:58] 곧 자정
[Bob] [오후 11:59] 응
--------------- 2024년 1월 16일 화요일 ---------------
[Alice] [오전 12:01] 새해 복
";
        let report = parser().parse(raw).unwrap();

        assert_eq!(report.messages.len(), 3);
        assert_eq!(report.date_lines, 2);
        assert_eq!(report.messages[0].timestamp, ts(2024, 1, 15, 23, 58));
        assert_eq!(report.messages[2].timestamp, ts(2024, 1, 16, 0, 1));
        assert_eq!(report.messages[2].text, "새해 복");
    }

    #[test]
    fn test_header_lines_before_first_message_are_skipped() {
        let raw = "Talk_2024.1.16 님과 카카오톡 대화\n오후 2:00, Alice : hi";
        let report = parser().parse(raw).unwrap();
        assert_eq!(report.skipped_lines, 1);
        assert_eq!(report.messages.len(), 1);
    }

    #[test]
    fn test_mobile_form_sets_date() {
        let raw = "2023년 12월 1일 오후 1:23, 김철수 : 안녕하세요\n오후 1:24, 이영희 : 반가워요";
        let report = parser().parse(raw).unwrap();

        assert_eq!(report.messages[0].timestamp, ts(2023, 12, 1, 13, 23));
        assert_eq!(report.messages[1].timestamp, ts(2023, 12, 1, 13, 24));
        assert_eq!(report.messages[1].author, "이영희");
    }

    #[test]
    fn test_continuation_lines_join_previous_message() {
        let raw = "오후 1:23, Alice : first line\nsecond line\n  indented third\n오후 1:30, Bob : ok";
        let report = parser().parse(raw).unwrap();

        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.messages[0].text, "first line\nsecond line\n  indented third");
        assert_eq!(report.continuation_lines, 2);
    }

    #[test]
    fn test_unmarked_time_is_a_continuation() {
        let raw = "2024년 5월 1일 수요일\n오전 9:00, Alice : 회의 공지\n10:30, 장소 : 3층 회의실";
        let report = parser().parse(raw).unwrap();

        assert_eq!(report.messages.len(), 1);
        assert_eq!(report.messages[0].text, "회의 공지\n10:30, 장소 : 3층 회의실");
        assert_eq!(report.continuation_lines, 1);
    }

    #[test]
    fn test_dated_text_line_does_not_move_current_date() {
        let raw = "2024년 5월 1일 수요일\n오전 9:00, Alice : 일정\n2024-06-30 배포 예정\n오전 9:05, Bob : ok";
        let report = parser().parse(raw).unwrap();

        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.messages[0].text, "일정\n2024-06-30 배포 예정");
        assert_eq!(report.messages[1].timestamp, ts(2024, 5, 1, 9, 5));
        assert_eq!(report.date_lines, 1);
    }

    #[test]
    fn test_unrecognized_format() {
        let err = parser().parse("just some notes\nnothing here").unwrap_err();
        assert_eq!(err, ParseError::UnrecognizedFormat { skipped_lines: 2 });
        assert_eq!(err.reason(), "unrecognized-format");
        assert!(parser().parse("").is_err());
    }

    #[test]
    fn test_crlf_and_bom() {
        let raw = "\u{feff}오후 1:23, Alice : hi\r\n오후 1:24, Bob : yo\r\n";
        let report = parser().parse(raw).unwrap();
        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.messages[1].text, "yo");
    }
}
