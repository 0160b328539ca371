// Token-level recognisers for KakaoTalk export lines.
//
// Every function takes the remaining input and returns the recognised value
// plus the unconsumed tail, or None without consuming anything.

use chrono::{NaiveDate, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

const MERIDIEM_MARKERS: &[(&str, Meridiem)] = &[
    ("오전", Meridiem::Am),
    ("오후", Meridiem::Pm),
    ("AM", Meridiem::Am),
    ("PM", Meridiem::Pm),
    ("am", Meridiem::Am),
    ("pm", Meridiem::Pm),
];

fn take_meridiem(s: &str) -> Option<(Meridiem, &str)> {
    MERIDIEM_MARKERS
        .iter()
        .find_map(|(marker, meridiem)| s.strip_prefix(marker).map(|rest| (*meridiem, rest)))
}

/// Leading run of 1..=max ASCII digits.
fn take_digits(s: &str, max: usize) -> Option<(u32, &str)> {
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 || len > max {
        return None;
    }
    let value = s[..len].parse().ok()?;
    Some((value, &s[len..]))
}

fn take_year(s: &str) -> Option<(i32, &str)> {
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    if len != 4 {
        return None;
    }
    let value = s[..4].parse().ok()?;
    Some((value, &s[4..]))
}

/// `H:MM` or `HH:MM`; minutes are exactly two digits.
fn take_clock(s: &str) -> Option<(u32, u32, &str)> {
    let (hour, rest) = take_digits(s, 2)?;
    let rest = rest.strip_prefix(':')?;
    if rest.bytes().take_while(u8::is_ascii_digit).count() != 2 {
        return None;
    }
    let minute = rest[..2].parse().ok()?;
    Some((hour, minute, &rest[2..]))
}

fn twelve_hour(meridiem: Meridiem, hour: u32, minute: u32) -> Option<NaiveTime> {
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = match (meridiem, hour) {
        (Meridiem::Am, 12) => 0,
        (Meridiem::Am, h) => h,
        (Meridiem::Pm, 12) => 12,
        (Meridiem::Pm, h) => h + 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Time of day with a meridiem marker before or after the clock:
/// `오후 1:23` or `1:23 PM`. A bare `13:23` is not a time.
pub(crate) fn take_time(s: &str) -> Option<(NaiveTime, &str)> {
    let s = s.trim_start();

    if let Some((meridiem, rest)) = take_meridiem(s) {
        let (hour, minute, rest) = take_clock(rest.trim_start())?;
        return Some((twelve_hour(meridiem, hour, minute)?, rest));
    }

    let (hour, minute, rest) = take_clock(s)?;
    let (meridiem, rest) = take_meridiem(rest.trim_start())?;
    Some((twelve_hour(meridiem, hour, minute)?, rest))
}

fn korean_date(s: &str) -> Option<(i32, u32, u32, &str)> {
    let (year, rest) = take_year(s)?;
    let rest = rest.strip_prefix('년')?.trim_start();
    let (month, rest) = take_digits(rest, 2)?;
    let rest = rest.strip_prefix('월')?.trim_start();
    let (day, rest) = take_digits(rest, 2)?;
    let rest = rest.strip_prefix('일')?;
    Some((year, month, day, rest))
}

fn dotted_date(s: &str) -> Option<(i32, u32, u32, &str)> {
    let (year, rest) = take_year(s)?;
    let rest = rest.strip_prefix('.')?.trim_start();
    let (month, rest) = take_digits(rest, 2)?;
    let rest = rest.strip_prefix('.')?.trim_start();
    let (day, rest) = take_digits(rest, 2)?;
    let rest = rest.strip_prefix('.')?;
    Some((year, month, day, rest))
}

fn iso_date(s: &str) -> Option<(i32, u32, u32, &str)> {
    let (year, rest) = take_year(s)?;
    let rest = rest.strip_prefix('-')?;
    let (month, rest) = take_digits(rest, 2)?;
    let rest = rest.strip_prefix('-')?;
    let (day, rest) = take_digits(rest, 2)?;
    Some((year, month, day, rest))
}

/// Calendar date: `2024년 1월 15일`, `2024. 1. 15.` or `2024-01-15`.
pub(crate) fn take_date(s: &str) -> Option<(NaiveDate, &str)> {
    let (year, month, day, rest) = korean_date(s)
        .or_else(|| dotted_date(s))
        .or_else(|| iso_date(s))?;
    Some((NaiveDate::from_ymd_opt(year, month, day)?, rest))
}

const WEEKDAYS: &[&str] = &[
    "월요일", "화요일", "수요일", "목요일", "금요일", "토요일", "일요일",
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// A whole date separator line: the date, optionally followed by a weekday.
pub(crate) fn date_header(s: &str) -> Option<NaiveDate> {
    let (date, rest) = take_date(s)?;
    let rest = rest.trim();
    (rest.is_empty() || WEEKDAYS.contains(&rest)).then_some(date)
}

/// `, Author : text` following a timestamp.
pub(crate) fn take_author_and_text(s: &str) -> Option<(&str, &str)> {
    let rest = s.trim_start().strip_prefix(',')?;
    let (author, text) = rest.split_once(':')?;
    let author = author.trim();
    if author.is_empty() {
        return None;
    }
    Some((author, text.strip_prefix(' ').unwrap_or(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_korean_meridiem() {
        assert_eq!(take_time("오후 1:23").unwrap().0, hm(13, 23));
        assert_eq!(take_time("오전 12:05").unwrap().0, hm(0, 5));
        assert_eq!(take_time("오후 12:30").unwrap().0, hm(12, 30));
        assert_eq!(take_time("오전 9:00, rest").unwrap().1, ", rest");
    }

    #[test]
    fn test_trailing_meridiem() {
        assert_eq!(take_time("1:23 PM] hi").unwrap(), (hm(13, 23), "] hi"));
    }

    #[test]
    fn test_time_requires_meridiem() {
        assert!(take_time("13:23, Bob").is_none());
        assert!(take_time("10:30, 장소 : 3층").is_none());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(take_time("오후 13:00").is_none());
        assert!(take_time("오전 0:10").is_none());
        assert!(take_time("25:00").is_none());
        assert!(take_time("9:5").is_none());
        assert!(take_time("9:555").is_none());
    }

    #[test]
    fn test_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(take_date("2024년 1월 15일 월요일").unwrap(), (expected, " 월요일"));
        assert_eq!(take_date("2024. 1. 15. 오후").unwrap().0, expected);
        assert_eq!(take_date("2024-01-15 13:00").unwrap().0, expected);
        assert!(take_date("2024년 13월 1일").is_none());
        assert!(take_date("24년 1월 1일").is_none());
    }

    #[test]
    fn test_date_header_allows_only_weekday_after_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert_eq!(date_header("2024년 6월 30일 일요일"), Some(expected));
        assert_eq!(date_header("2024-06-30"), Some(expected));
        assert_eq!(date_header("2024-06-30 Sunday"), Some(expected));
        assert_eq!(date_header("2024-06-30 배포 예정"), None);
        assert_eq!(date_header("2024년 6월 30일까지 제출"), None);
    }

    #[test]
    fn test_author_and_text() {
        assert_eq!(take_author_and_text(", Alice : hi: there"), Some(("Alice", "hi: there")));
        assert_eq!(take_author_and_text(", : orphan"), None);
        assert_eq!(take_author_and_text(" Alice : no comma"), None);
    }
}
