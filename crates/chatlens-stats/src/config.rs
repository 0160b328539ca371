use serde::{Deserialize, Serialize};

/// Korean particles and chat filler plus common English function words.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "이", "그", "저", "것", "들", "은", "는", "가", "을", "를", "에", "의", "와", "과", "도", "만",
    "부터", "까지", "로", "으로", "에서", "한테", "께", "한테서", "께서", "이다", "아니다", "있다",
    "없다", "되다", "하다", "좋다", "나쁘다", "크다", "작다", "ㅋㅋ", "ㅎㅎ", "ㅠㅠ", "ㅜㅜ", "ㅠ",
    "ㅜ", "그리고", "그래서", "근데", "그냥", "진짜", "너무", "이제", "사진", "이모티콘", "the", "a",
    "an", "and", "or", "but", "is", "are", "was", "were", "be", "to", "of", "in", "on", "at", "for",
    "with", "it", "this", "that", "you", "i", "we", "they", "he", "she", "my", "your", "so", "just",
];

pub const DEFAULT_POSITIVE_TERMS: &[&str] = &[
    "좋아", "좋은", "최고", "감사", "고마", "행복", "사랑", "대박", "재밌", "재미있", "기뻐", "축하",
    "멋지", "훌륭", "good", "great", "thanks", "thank you", "love", "happy", "awesome", "nice",
    "excellent",
];

pub const DEFAULT_NEGATIVE_TERMS: &[&str] = &[
    "싫어", "싫다", "짜증", "화나", "슬퍼", "슬프", "최악", "힘들", "별로", "우울", "불안", "걱정",
    "bad", "hate", "sad", "angry", "terrible", "awful", "worst",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub top_keywords: usize,
    /// Shorter tokens (in characters) are not counted as keywords
    pub min_token_chars: usize,
    /// Added to the built-in stop-word list
    pub extra_stopwords: Vec<String>,
    pub positive_terms: Vec<String>,
    pub negative_terms: Vec<String>,
}

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            top_keywords: 10,
            min_token_chars: 2,
            extra_stopwords: Vec::new(),
            positive_terms: owned(DEFAULT_POSITIVE_TERMS),
            negative_terms: owned(DEFAULT_NEGATIVE_TERMS),
        }
    }
}
