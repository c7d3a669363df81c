//! Summary statistics over a set of scraped records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::QuestionRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessRates {
    pub text: String,
    pub options: String,
    pub explanation: String,
    pub images: String,
}

/// Coverage of each extracted field across a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total_questions: usize,
    pub questions_with_text: usize,
    pub questions_with_options: usize,
    pub questions_with_explanation: usize,
    pub questions_with_images: usize,
    pub premium_questions: usize,
    pub success_rate: SuccessRates,
    pub topics_distribution: BTreeMap<String, usize>,
}

impl SummaryReport {
    /// `None` for an empty batch.
    pub fn from_records(records: &[QuestionRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let total = records.len();
        let count = |f: fn(&QuestionRecord) -> bool| records.iter().filter(|r| f(r)).count();

        let with_text = count(|r| r.question_text.is_found());
        let with_options = count(|r| !r.options.is_empty());
        let with_explanation = count(|r| r.explanation.is_found());
        let with_images = count(|r| !r.images.is_empty());
        let premium = count(|r| r.is_premium);

        let mut topics = BTreeMap::new();
        for record in records {
            *topics.entry(record.topic.clone()).or_insert(0) += 1;
        }

        Some(Self {
            total_questions: total,
            questions_with_text: with_text,
            questions_with_options: with_options,
            questions_with_explanation: with_explanation,
            questions_with_images: with_images,
            premium_questions: premium,
            success_rate: SuccessRates {
                text: rate(with_text, total),
                options: rate(with_options, total),
                explanation: rate(with_explanation, total),
                images: rate(with_images, total),
            },
            topics_distribution: topics,
        })
    }
}

fn rate(hits: usize, total: usize) -> String {
    format!("{:.1}%", hits as f64 / total as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Extracted, Target};

    #[test]
    fn test_empty_batch_has_no_report() {
        assert!(SummaryReport::from_records(&[]).is_none());
    }

    #[test]
    fn test_counts_and_rates() {
        let mut records: Vec<QuestionRecord> = (1..=3)
            .map(|i| {
                let topic = if i == 3 { "2" } else { "1" };
                QuestionRecord::for_target(&Target::new(topic, i.to_string(), "https://q.test"))
            })
            .collect();
        records[0].question_text = Extracted::Found("What is IAM?".into());
        records[0].options = vec!["A. Identity and Access Management".into()];
        records[1].question_text = Extracted::Found("What is STS?".into());
        records[2].is_premium = true;

        let report = SummaryReport::from_records(&records).unwrap();
        assert_eq!(report.total_questions, 3);
        assert_eq!(report.questions_with_text, 2);
        assert_eq!(report.questions_with_options, 1);
        assert_eq!(report.premium_questions, 1);
        assert_eq!(report.success_rate.text, "66.7%");
        assert_eq!(report.success_rate.explanation, "0.0%");
        assert_eq!(report.topics_distribution.get("1"), Some(&2));
        assert_eq!(report.topics_distribution.get("2"), Some(&1));
    }
}
