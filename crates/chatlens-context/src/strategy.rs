use chatlens_llm::Message;
use chatlens_types::{AnalysisType, Room, StatisticsSnapshot};

/// Prompt sent to the provider for one analysis.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    pub system_prompt: String,
    pub messages: Vec<Message>,
    /// Transcript lines that made it into the prompt
    pub included_messages: usize,
    /// Older messages left out to stay within limits
    pub omitted_messages: usize,
    pub prompt_tokens: usize,
}

impl ContextWindow {
    /// System prompt first, then the user turn(s)
    pub fn into_messages(self) -> Vec<Message> {
        let mut all = Vec::with_capacity(self.messages.len() + 1);
        all.push(Message::system(self.system_prompt));
        all.extend(self.messages);
        all
    }
}

/// Strategy for turning a room into a bounded analysis prompt
pub trait ContextStrategy: Send + Sync {
    fn build(
        &self,
        room: &Room,
        snapshot: &StatisticsSnapshot,
        analysis_type: AnalysisType,
    ) -> crate::error::Result<ContextWindow>;
}
