//! Flat record form for tabular consumers.
//!
//! List fields (`options`, `images`, `tags`) become one string with items
//! joined by `|`. A literal `|` or `\` inside an item is escaped with `\`, so
//! splitting gives back exactly the items that were joined. An empty list is
//! the empty string; a list holding one empty item is a lone `\`.
//! Discussion comments have no flat form.
//!
//! Flat records are also written and read as CSV, one row per record under a
//! header row naming the twelve columns.

use std::io::{Read, Write};

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::{
    Extracted, HarvestResult, QuestionRecord, CORRECT_ANSWER_NOT_FOUND, EXPLANATION_NOT_FOUND,
    QUESTION_TEXT_NOT_FOUND,
};

pub const LIST_SEPARATOR: char = '|';
const ESCAPE: char = '\\';

/// CSV header, in [`FlatQuestionRecord`] field order.
pub const FLAT_COLUMNS: [&str; 12] = [
    "topic",
    "question_number",
    "url",
    "question_text",
    "options",
    "correct_answer",
    "explanation",
    "images",
    "difficulty",
    "tags",
    "vote_count",
    "is_premium",
];

/// A [`QuestionRecord`] with pipe-joined list fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatQuestionRecord {
    pub topic: String,
    pub question_number: String,
    pub url: String,
    pub question_text: String,
    pub options: String,
    pub correct_answer: String,
    pub explanation: String,
    pub images: String,
    pub difficulty: String,
    pub tags: String,
    pub vote_count: u32,
    pub is_premium: bool,
}

impl From<&QuestionRecord> for FlatQuestionRecord {
    fn from(r: &QuestionRecord) -> Self {
        Self {
            topic: r.topic.clone(),
            question_number: r.question_number.clone(),
            url: r.url.clone(),
            question_text: r.question_text.to_text(QUESTION_TEXT_NOT_FOUND),
            options: join_list(&r.options),
            correct_answer: r.correct_answer.to_text(CORRECT_ANSWER_NOT_FOUND),
            explanation: r.explanation.to_text(EXPLANATION_NOT_FOUND),
            images: join_list(&r.images),
            difficulty: r.difficulty.clone(),
            tags: join_list(&r.tags),
            vote_count: r.vote_count,
            is_premium: r.is_premium,
        }
    }
}

impl From<FlatQuestionRecord> for QuestionRecord {
    fn from(f: FlatQuestionRecord) -> Self {
        Self {
            topic: f.topic,
            question_number: f.question_number,
            url: f.url,
            question_text: Extracted::from_text(f.question_text, QUESTION_TEXT_NOT_FOUND),
            options: split_list(&f.options),
            correct_answer: Extracted::from_text(f.correct_answer, CORRECT_ANSWER_NOT_FOUND),
            explanation: Extracted::from_text(f.explanation, EXPLANATION_NOT_FOUND),
            images: split_list(&f.images),
            discussion_comments: Vec::new(),
            vote_count: f.vote_count,
            is_premium: f.is_premium,
            tags: split_list(&f.tags),
            difficulty: f.difficulty,
        }
    }
}

pub fn flatten(records: &[QuestionRecord]) -> Vec<FlatQuestionRecord> {
    records.iter().map(FlatQuestionRecord::from).collect()
}

/// Write `records` as CSV. The header row is written even when there are
/// no records.
pub fn write_csv<W: Write>(records: &[QuestionRecord], writer: W) -> HarvestResult<()> {
    let mut out = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    out.write_record(FLAT_COLUMNS)?;
    for record in records {
        out.serialize(FlatQuestionRecord::from(record))?;
    }
    out.flush()?;
    Ok(())
}

pub fn to_csv(records: &[QuestionRecord]) -> HarvestResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    Ok(buf)
}

/// Read records written by [`write_csv`].
pub fn read_csv<R: Read>(reader: R) -> HarvestResult<Vec<QuestionRecord>> {
    let mut rows = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in rows.deserialize::<FlatQuestionRecord>() {
        records.push(QuestionRecord::from(row?));
    }
    Ok(records)
}

/// Join items with `|`, escaping separators and escapes inside items.
pub fn join_list(items: &[String]) -> String {
    if matches!(items, [only] if only.is_empty()) {
        return ESCAPE.to_string();
    }
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(LIST_SEPARATOR);
        }
        for c in item.chars() {
            if c == LIST_SEPARATOR || c == ESCAPE {
                out.push(ESCAPE);
            }
            out.push(c);
        }
    }
    out
}

/// Inverse of [`join_list`]. The empty string is the empty list.
pub fn split_list(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = joined.chars();
    while let Some(c) = chars.next() {
        match c {
            // A dangling escape only marks a lone empty item.
            ESCAPE => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            LIST_SEPARATOR => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);
    items
}

/// Deserialize a list field given either as an array or a pipe-joined string.
pub fn list_or_pipe<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrPipe {
        List(Vec<String>),
        Pipe(String),
    }

    Ok(match ListOrPipe::deserialize(deserializer)? {
        ListOrPipe::List(items) => items,
        ListOrPipe::Pipe(joined) => split_list(&joined),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Target;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_join_and_split() {
        let items = strings(&["A. Use S3", "B. Use EFS"]);
        assert_eq!(join_list(&items), "A. Use S3|B. Use EFS");
        assert_eq!(split_list("A. Use S3|B. Use EFS"), items);
        assert!(split_list("").is_empty());
        assert_eq!(join_list(&[]), "");
    }

    #[test]
    fn test_separator_inside_item_survives() {
        let items = strings(&["A. cat a.txt | grep x", r"B. C:\temp", "C. plain"]);
        let joined = join_list(&items);
        assert_eq!(joined, r"A. cat a.txt \| grep x|B. C:\\temp|C. plain");
        assert_eq!(split_list(&joined), items);
    }

    #[test]
    fn test_single_empty_item_differs_from_empty_list() {
        let one_empty = strings(&[""]);
        assert_eq!(join_list(&one_empty), r"\");
        assert_eq!(split_list(r"\"), one_empty);
        assert_eq!(join_list(&[]), "");
        assert!(split_list("").is_empty());

        let two_empty = strings(&["", ""]);
        assert_eq!(split_list(&join_list(&two_empty)), two_empty);
    }

    #[test]
    fn test_csv_export_reads_back() {
        let target = Target::new("Topic 2", "15", "https://q.test/15");
        let mut record = QuestionRecord::for_target(&target);
        record.question_text =
            Extracted::Found("Which option, \"A\" or \"B\", is cheaper?\nPick one.".to_string());
        record.options = strings(&["A. cat a.txt | grep x", "B. S3, then Glacier"]);
        record.images = strings(&[""]);
        record.vote_count = 12;
        record.is_premium = true;

        let bytes = to_csv(std::slice::from_ref(&record)).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with(&FLAT_COLUMNS.join(",")));

        let back = read_csv(bytes.as_slice()).unwrap();
        assert_eq!(back, vec![record]);
    }

    #[test]
    fn test_csv_export_of_nothing_has_header() {
        let bytes = to_csv(&[]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap().trim_end(), FLAT_COLUMNS.join(","));
        assert!(read_csv(FLAT_COLUMNS.join(",").as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_flat_record_keeps_sentinels_and_empties() {
        let target = Target::new("2", "15", "https://q.test/15");
        let mut record = QuestionRecord::for_target(&target);
        record.options = strings(&["A. First option", "B. Second option"]);
        record.explanation = Extracted::Found(String::new());

        let flat = FlatQuestionRecord::from(&record);
        assert_eq!(flat.question_text, QUESTION_TEXT_NOT_FOUND);
        assert_eq!(flat.images, "");
        assert_eq!(flat.options, "A. First option|B. Second option");

        let back = QuestionRecord::from(flat);
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_accepts_pipe_joined_lists() {
        let json = r#"{
            "topic": "1", "question_number": "4", "url": "https://q.test/4",
            "question_text": "Which region?",
            "options": "A. us-east-1|B. eu-west-1",
            "correct_answer": "Correct answer not found",
            "explanation": "Explanation not found",
            "images": "",
            "tags": ["networking"]
        }"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.options, strings(&["A. us-east-1", "B. eu-west-1"]));
        assert!(record.images.is_empty());
        assert_eq!(record.tags, strings(&["networking"]));
    }
}
