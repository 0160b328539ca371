use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::room::Watermark;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub term: String,
    pub count: u64,
}

/// Message share per sentiment class, each in hundredths.
///
/// Fractions sum to 1.0 for a non-empty room and are all zero for an
/// empty one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl SentimentDistribution {
    pub fn total(&self) -> f64 {
        self.positive + self.neutral + self.negative
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStats {
    pub author: String,
    pub message_count: u64,
    pub avg_message_length: f64,
    pub most_active_hour: u32,
    pub first_message_at: NaiveDateTime,
    pub last_message_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub room_id: String,
    pub computed_at: DateTime<Utc>,
    pub watermark: Watermark,
    pub message_count: usize,
    pub hourly_histogram: [u64; 24],
    /// Monday = 0 … Sunday = 6
    pub weekday_histogram: [u64; 7],
    pub per_participant_counts: BTreeMap<String, u64>,
    pub participants: Vec<ParticipantStats>,
    pub top_keywords: Vec<KeywordCount>,
    pub sentiment_distribution: SentimentDistribution,
}

impl StatisticsSnapshot {
    /// Hours sorted by activity, busiest first, zero buckets excluded.
    pub fn peak_hours(&self, limit: usize) -> Vec<(u32, u64)> {
        let mut hours: Vec<(u32, u64)> = self
            .hourly_histogram
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(hour, count)| (hour as u32, *count))
            .collect();
        hours.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        hours.truncate(limit);
        hours
    }
}
