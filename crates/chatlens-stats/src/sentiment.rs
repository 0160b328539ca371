use chatlens_types::SentimentDistribution;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Substring lexicon classifier.
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl Lexicon {
    pub fn new(positive: &[String], negative: &[String]) -> Self {
        let prepare = |terms: &[String]| -> Vec<String> {
            terms
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect()
        };
        Self {
            positive: prepare(positive),
            negative: prepare(negative),
        }
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        let text = text.to_lowercase();
        let hits = |terms: &[String]| terms.iter().filter(|t| text.contains(t.as_str())).count();
        let (positive, negative) = (hits(&self.positive[..]), hits(&self.negative[..]));
        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        }
    }
}

/// Turn class counts into hundredths that sum to exactly 100 using the
/// largest-remainder method. Ties go to positive, then neutral, then negative.
pub fn distribution(positive: u64, neutral: u64, negative: u64) -> SentimentDistribution {
    let counts = [positive, neutral, negative];
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return SentimentDistribution::default();
    }

    let mut shares = [0u64; 3];
    let mut remainders = [(0u64, 0usize); 3];
    for (i, count) in counts.iter().enumerate() {
        shares[i] = count * 100 / total;
        remainders[i] = (count * 100 % total, i);
    }

    let assigned: u64 = shares.iter().sum();
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, i) in remainders.iter().take((100 - assigned) as usize) {
        shares[*i] += 1;
    }

    SentimentDistribution {
        positive: shares[0] as f64 / 100.0,
        neutral: shares[1] as f64 / 100.0,
        negative: shares[2] as f64 / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        let s = |v: &[&str]| v.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        Lexicon::new(&s(&["좋아", "great"]), &s(&["싫어", "bad"]))
    }

    #[test]
    fn test_classify() {
        let lexicon = lexicon();
        assert_eq!(lexicon.classify("이거 정말 좋아요"), Sentiment::Positive);
        assert_eq!(lexicon.classify("GREAT job"), Sentiment::Positive);
        assert_eq!(lexicon.classify("싫어"), Sentiment::Negative);
        assert_eq!(lexicon.classify("좋아 근데 싫어"), Sentiment::Neutral);
        assert_eq!(lexicon.classify("점심 뭐 먹지"), Sentiment::Neutral);
    }

    #[test]
    fn test_thirds_sum_to_one() {
        let d = distribution(1, 1, 1);
        assert_eq!((d.positive, d.neutral, d.negative), (0.34, 0.33, 0.33));
        assert!((d.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_edge_cases() {
        assert_eq!(distribution(0, 0, 0), SentimentDistribution::default());
        assert_eq!(distribution(0, 5, 0).neutral, 1.0);

        for (p, n, g) in [(1, 2, 4), (7, 0, 13), (333, 333, 334), (2, 1, 0)] {
            let d = distribution(p, n, g);
            assert!((d.total() - 1.0).abs() < 1e-9, "{:?}", (p, n, g));
        }
    }
}
