use chatlens_types::AnalysisType;

/// `<language>` is replaced with the configured response language.
pub const DEFAULT_SYSTEM_PROMPT_TEMPLATE: &str = "You are an expert analyst of KakaoTalk group chats. \
Read the chat data you are given and report useful, concrete insights. \
Quote short examples from the transcript where they support a point. \
Answer in <language>.";

const COMPREHENSIVE: &str = "Analyze the following chat comprehensively.

Cover:
1. The main conversation topics
2. How participants converse (patterns, roles, activity)
3. Important keywords or issues
4. The overall mood and tone
5. Notable insights";

const SENTIMENT: &str = "Analyze the emotions in the following chat.

Cover:
1. Overall emotional tone, as a positive / negative / neutral ratio
2. How the mood changes over time
3. The main emotional expressions used
4. Points where the mood shifted sharply, and why
5. The emotional character of each main participant";

const KEYWORDS: &str = "Extract the key terms from the following chat.

List:
1. The 10 most frequently mentioned keywords
2. Names of people, companies and products
3. Trending topics or issue keywords
4. Emotion words

Give each keyword's frequency and the context it appears in.";

const TOPICS: &str = "Identify the main topics of the following chat.

Cover:
1. The main conversation topics (3 to 5)
2. The weight and importance of each topic
3. How the topics relate to each other
4. How the topics drift over time
5. Which participants care about which topics

Explain each topic with concrete examples.";

/// Task instructions for an analysis type.
pub fn instructions(analysis_type: AnalysisType) -> &'static str {
    match analysis_type {
        AnalysisType::Comprehensive => COMPREHENSIVE,
        AnalysisType::Sentiment => SENTIMENT,
        AnalysisType::Keywords => KEYWORDS,
        AnalysisType::Topics => TOPICS,
    }
}
