use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Write;
use tiktoken_rs::{cl100k_base, CoreBPE};

use chatlens_llm::Message;
use chatlens_types::{AnalysisType, Room, StatisticsSnapshot};

use crate::error::{ContextError, Result};
use crate::strategy::{ContextStrategy, ContextWindow};
use crate::templates::{instructions, DEFAULT_SYSTEM_PROMPT_TEMPLATE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Only the latest messages are considered
    pub max_messages: usize,
    /// Budget for system prompt plus user turn, in cl100k tokens
    pub max_context_tokens: usize,
    pub response_language: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_messages: 500,
            max_context_tokens: 6000,
            response_language: "Korean".to_string(),
        }
    }
}

pub struct DefaultContextStrategy {
    config: ContextConfig,
    system_prompt_template: String,
    bpe: CoreBPE,
}

impl DefaultContextStrategy {
    pub fn new(config: ContextConfig) -> Result<Self> {
        Self::with_template(config, DEFAULT_SYSTEM_PROMPT_TEMPLATE)
    }

    pub fn with_template(config: ContextConfig, system_prompt_template: impl Into<String>) -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| ContextError::Tokenizer(e.to_string()))?;
        Ok(Self {
            config,
            system_prompt_template: system_prompt_template.into(),
            bpe,
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Count tokens using tiktoken
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    fn system_prompt(&self) -> String {
        self.system_prompt_template
            .replace("<language>", &self.config.response_language)
    }

    fn overview(&self, room: &Room, snapshot: &StatisticsSnapshot) -> String {
        let mut out = String::new();
        let period = match (room.messages.first(), room.messages.last()) {
            (Some(first), Some(last)) => format!(
                "{} ~ {}",
                first.timestamp.format("%Y-%m-%d"),
                last.timestamp.format("%Y-%m-%d")
            ),
            _ => "-".to_string(),
        };

        let _ = writeln!(out, "## Overview");
        let _ = writeln!(out, "- Room: {}", room.name);
        let _ = writeln!(out, "- Messages: {}", room.message_count());
        let _ = writeln!(out, "- Participants: {}", room.participants.len());
        let _ = writeln!(out, "- Period: {}", period);

        let _ = writeln!(out, "\n## Top participants");
        for p in snapshot.participants.iter().take(3) {
            let _ = writeln!(out, "- {}: {} messages", p.author, p.message_count);
        }

        let peak = snapshot
            .peak_hours(3)
            .iter()
            .map(|(hour, count)| format!("{:02}:00 ({})", hour, count))
            .collect::<Vec<_>>()
            .join(", ");
        let keywords = snapshot
            .top_keywords
            .iter()
            .map(|k| format!("{} ({})", k.term, k.count))
            .collect::<Vec<_>>()
            .join(", ");
        let s = snapshot.sentiment_distribution;

        let _ = writeln!(out, "\n## Statistics");
        let _ = writeln!(out, "- Peak hours: {}", if peak.is_empty() { "-" } else { peak.as_str() });
        let _ = writeln!(out, "- Top keywords: {}", if keywords.is_empty() { "-" } else { keywords.as_str() });
        let _ = writeln!(
            out,
            "- Sentiment: positive {:.0}%, neutral {:.0}%, negative {:.0}%",
            s.positive * 100.0,
            s.neutral * 100.0,
            s.negative * 100.0
        );
        out
    }

    fn assemble(&self, head: &str, omitted: usize, lines: &VecDeque<String>) -> String {
        let mut body = String::with_capacity(head.len() + lines.iter().map(|l| l.len() + 1).sum::<usize>() + 64);
        body.push_str(head);
        body.push_str("\n## Transcript\n");
        if omitted > 0 {
            let _ = writeln!(body, "... ({} earlier messages omitted)", omitted);
        }
        for line in lines {
            body.push_str(line);
            body.push('\n');
        }
        body
    }
}

impl ContextStrategy for DefaultContextStrategy {
    fn build(
        &self,
        room: &Room,
        snapshot: &StatisticsSnapshot,
        analysis_type: AnalysisType,
    ) -> Result<ContextWindow> {
        let system_prompt = self.system_prompt();
        let head = format!("{}\n\n{}", instructions(analysis_type), self.overview(room, snapshot));

        let start = room.messages.len().saturating_sub(self.config.max_messages);
        let mut omitted = start;
        let mut lines: VecDeque<String> = room.messages[start..]
            .iter()
            .map(|m| {
                format!(
                    "[{}] {}: {}",
                    m.timestamp.format("%Y-%m-%d %H:%M"),
                    m.author,
                    m.text.replace('\n', " ")
                )
            })
            .collect();

        let budget = self.config.max_context_tokens;
        let fixed = self.count_tokens(&system_prompt) + self.count_tokens(&head) + 16;
        let mut line_tokens: VecDeque<usize> = lines.iter().map(|l| self.count_tokens(l) + 1).collect();
        let mut estimate = fixed + line_tokens.iter().sum::<usize>();

        // Drop the oldest lines until the estimate fits, then confirm on the
        // assembled text.
        loop {
            while estimate > budget && !lines.is_empty() {
                lines.pop_front();
                estimate -= line_tokens.pop_front().unwrap_or(0);
                omitted += 1;
            }

            let body = self.assemble(&head, omitted, &lines);
            let prompt_tokens = self.count_tokens(&system_prompt) + self.count_tokens(&body);
            if prompt_tokens <= budget || lines.is_empty() {
                tracing::debug!(
                    room_id = %room.id,
                    analysis_type = %analysis_type,
                    included = lines.len(),
                    omitted,
                    prompt_tokens,
                    "Built analysis prompt"
                );
                return Ok(ContextWindow {
                    system_prompt,
                    messages: vec![Message::human(body)],
                    included_messages: lines.len(),
                    omitted_messages: omitted,
                    prompt_tokens,
                });
            }
            estimate = budget + 1;
        }
    }
}
