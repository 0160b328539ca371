use chrono::{Datelike, NaiveDateTime, Timelike, Utc};
use std::collections::{BTreeMap, HashSet};

use chatlens_types::{ParticipantStats, Room, StatisticsSnapshot};

use crate::config::{StatsConfig, DEFAULT_STOPWORDS};
use crate::keywords::KeywordCounter;
use crate::sentiment::{distribution, Lexicon, Sentiment};

#[derive(Default)]
struct AuthorAccumulator {
    count: u64,
    chars: u64,
    hours: [u64; 24],
    first: Option<NaiveDateTime>,
    last: Option<NaiveDateTime>,
}

impl AuthorAccumulator {
    fn finish(self, author: String) -> Option<ParticipantStats> {
        let (first, last) = (self.first?, self.last?);
        // Strictly greater keeps the earliest hour on ties.
        let mut most_active_hour = 0;
        for (hour, count) in self.hours.iter().enumerate() {
            if *count > self.hours[most_active_hour] {
                most_active_hour = hour;
            }
        }
        let avg = self.chars as f64 / self.count as f64;
        Some(ParticipantStats {
            author,
            message_count: self.count,
            avg_message_length: (avg * 100.0).round() / 100.0,
            most_active_hour: most_active_hour as u32,
            first_message_at: first,
            last_message_at: last,
        })
    }
}

/// Pure aggregation over a room's messages.
#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    config: StatsConfig,
    stopwords: HashSet<String>,
    lexicon: Lexicon,
}

impl StatisticsEngine {
    pub fn new(config: StatsConfig) -> Self {
        let stopwords = DEFAULT_STOPWORDS
            .iter()
            .map(|s| s.to_string())
            .chain(config.extra_stopwords.iter().map(|s| s.trim().to_lowercase()))
            .collect();
        let lexicon = Lexicon::new(&config.positive_terms, &config.negative_terms);
        Self {
            config,
            stopwords,
            lexicon,
        }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        self.lexicon.classify(text)
    }

    pub fn compute(&self, room: &Room) -> StatisticsSnapshot {
        let mut hourly_histogram = [0u64; 24];
        let mut weekday_histogram = [0u64; 7];
        let mut authors: BTreeMap<String, AuthorAccumulator> = BTreeMap::new();
        let mut keywords = KeywordCounter::new(&self.stopwords, self.config.min_token_chars);
        let mut sentiment = [0u64; 3];

        for message in &room.messages {
            let hour = message.timestamp.hour() as usize;
            hourly_histogram[hour] += 1;
            weekday_histogram[message.timestamp.weekday().num_days_from_monday() as usize] += 1;

            let acc = authors.entry(message.author.clone()).or_default();
            acc.count += 1;
            acc.chars += message.text.chars().count() as u64;
            acc.hours[hour] += 1;
            acc.first = Some(acc.first.map_or(message.timestamp, |t| t.min(message.timestamp)));
            acc.last = Some(acc.last.map_or(message.timestamp, |t| t.max(message.timestamp)));

            keywords.add_text(&message.text);

            match self.lexicon.classify(&message.text) {
                Sentiment::Positive => sentiment[0] += 1,
                Sentiment::Neutral => sentiment[1] += 1,
                Sentiment::Negative => sentiment[2] += 1,
            }
        }

        let per_participant_counts = authors.iter().map(|(a, acc)| (a.clone(), acc.count)).collect();
        let mut participants: Vec<ParticipantStats> = authors
            .into_iter()
            .filter_map(|(author, acc)| acc.finish(author))
            .collect();
        participants.sort_by(|a, b| b.message_count.cmp(&a.message_count).then(a.author.cmp(&b.author)));

        let snapshot = StatisticsSnapshot {
            room_id: room.id.clone(),
            computed_at: Utc::now(),
            watermark: room.watermark(),
            message_count: room.messages.len(),
            hourly_histogram,
            weekday_histogram,
            per_participant_counts,
            participants,
            top_keywords: keywords.top(self.config.top_keywords),
            sentiment_distribution: distribution(sentiment[0], sentiment[1], sentiment[2]),
        };

        tracing::debug!(
            room_id = %room.id,
            messages = snapshot.message_count,
            revision = snapshot.watermark.revision,
            "Computed statistics"
        );

        snapshot
    }
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self::new(StatsConfig::default())
    }
}
