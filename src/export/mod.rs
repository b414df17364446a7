//! Library export to BibTeX, CSV and JSON.
//!
//! Formatting is pure. Tag and note maps are optional; papers without an
//! entry simply get empty fields. Writing the result to disk is the only I/O
//! and lives in [`write_export`].

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::ClientError;
use crate::models::{Paper, PaperNote, Tag};

/// Tags per paper id.
pub type PaperTags = HashMap<String, Vec<Tag>>;

/// Notes per paper id.
pub type PaperNotes = HashMap<String, PaperNote>;

/// Longest note excerpt embedded in a BibTeX entry, in characters.
const BIBTEX_NOTE_CHARS: usize = 200;

const CSV_HEADER: &str = "Title,Authors,Year,Journal,Volume,Issue,URL,Tags,Note";

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    BibTeX,
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::BibTeX => "bib",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::BibTeX => "application/x-bibtex",
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }

    /// Format `papers` in this format.
    pub fn render(
        &self,
        papers: &[Paper],
        tags: Option<&PaperTags>,
        notes: Option<&PaperNotes>,
    ) -> Result<String, ClientError> {
        match self {
            ExportFormat::BibTeX => Ok(to_bibtex(papers, notes)),
            ExportFormat::Csv => Ok(to_csv(papers, tags, notes)),
            ExportFormat::Json => to_json(papers, tags, notes),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bibtex" | "bib" => Ok(ExportFormat::BibTeX),
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(ClientError::Validation(format!(
                "Unknown export format: {}",
                other
            ))),
        }
    }
}

/// Citation key: last name of the first author, year, first title word.
///
/// Papers sharing all three produce the same key.
pub fn citation_key(paper: &Paper) -> String {
    let last_name = paper
        .authors
        .first()
        .and_then(|author| author.split(' ').next_back())
        .map(str::to_lowercase)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string());

    let first_word = paper
        .title
        .split(' ')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    format!("{}{}{}", last_name, paper.year, first_word)
}

/// One `@article` entry per paper.
pub fn to_bibtex(papers: &[Paper], notes: Option<&PaperNotes>) -> String {
    let mut bibtex = String::new();

    for paper in papers {
        let _ = writeln!(bibtex, "@article{{{},", citation_key(paper));
        push_bibtex_field(&mut bibtex, "title", &paper.title);

        if !paper.authors.is_empty() {
            push_bibtex_field(&mut bibtex, "author", &paper.authors.join(" and "));
        }
        if let Some(journal) = non_empty(&paper.journal) {
            push_bibtex_field(&mut bibtex, "journal", journal);
        }
        if let Some(volume) = non_empty(&paper.volume) {
            push_bibtex_field(&mut bibtex, "volume", volume);
        }
        if let Some(issue) = non_empty(&paper.issue) {
            push_bibtex_field(&mut bibtex, "number", issue);
        }
        if let Some(pages) = non_empty(&paper.pages) {
            push_bibtex_field(&mut bibtex, "pages", &pages.replacen('-', "--", 1));
        }

        push_bibtex_field(&mut bibtex, "year", &paper.year.to_string());

        if !paper.url.is_empty() {
            push_bibtex_field(&mut bibtex, "url", &paper.url);
        }

        if let Some(note) = notes.and_then(|n| n.get(&paper.id)).filter(|n| n.is_present()) {
            let flattened: String = note
                .content
                .replace('\n', " ")
                .chars()
                .take(BIBTEX_NOTE_CHARS)
                .collect();
            push_bibtex_field(&mut bibtex, "note", &flattened);
        }

        bibtex.push_str("}\n\n");
    }

    bibtex
}

fn push_bibtex_field(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(out, "  {}={{{}}},", name, value);
}

/// Header row plus one fully quoted row per paper.
pub fn to_csv(papers: &[Paper], tags: Option<&PaperTags>, notes: Option<&PaperNotes>) -> String {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');

    for paper in papers {
        let tag_names = tags
            .and_then(|t| t.get(&paper.id))
            .map(|t| tag_names(t).join("; "))
            .unwrap_or_default();
        let note = notes
            .and_then(|n| n.get(&paper.id))
            .map(|n| n.content.as_str())
            .unwrap_or_default();

        let row = [
            escape_csv(&paper.title),
            escape_csv(&paper.authors.join("; ")),
            paper.year.to_string(),
            escape_csv(paper.journal.as_deref().unwrap_or_default()),
            escape_csv(paper.volume.as_deref().unwrap_or_default()),
            escape_csv(paper.issue.as_deref().unwrap_or_default()),
            escape_csv(&paper.url),
            escape_csv(&tag_names),
            escape_csv(note),
        ];

        csv.push_str(&row.join(","));
        csv.push('\n');
    }

    csv
}

fn escape_csv(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Record layout of the JSON export.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRecord<'a> {
    id: &'a str,
    title: &'a str,
    authors: &'a [String],
    year: i32,
    journal: Option<&'a str>,
    volume: Option<&'a str>,
    issue: Option<&'a str>,
    pages: Option<&'a str>,
    url: &'a str,
    #[serde(rename = "abstract")]
    abstract_text: Option<&'a str>,
    tags: Vec<&'a str>,
    note: &'a str,
    created_at: Option<&'a str>,
}

/// Pretty-printed JSON array with a fixed key set.
pub fn to_json(
    papers: &[Paper],
    tags: Option<&PaperTags>,
    notes: Option<&PaperNotes>,
) -> Result<String, ClientError> {
    let records: Vec<ExportRecord<'_>> = papers
        .iter()
        .map(|paper| ExportRecord {
            id: &paper.id,
            title: &paper.title,
            authors: &paper.authors,
            year: paper.year,
            journal: paper.journal.as_deref(),
            volume: paper.volume.as_deref(),
            issue: paper.issue.as_deref(),
            pages: paper.pages.as_deref(),
            url: &paper.url,
            abstract_text: paper.abstract_text.as_deref(),
            tags: tags
                .and_then(|t| t.get(&paper.id))
                .map(|t| tag_names(t))
                .unwrap_or_default(),
            note: notes
                .and_then(|n| n.get(&paper.id))
                .map(|n| n.content.as_str())
                .unwrap_or_default(),
            created_at: paper.created_at.as_deref(),
        })
        .collect();

    Ok(serde_json::to_string_pretty(&records)?)
}

/// `research-library-<date>.<ext>`
pub fn default_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "research-library-{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Write an export into `dir` under its default file name.
pub fn write_export(
    dir: &Path,
    format: ExportFormat,
    content: &str,
    date: NaiveDate,
) -> Result<PathBuf, ClientError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(default_file_name(format, date));
    fs::write(&path, content)?;

    tracing::info!(
        "Exported {} ({}) to {:?}",
        format.extension(),
        format.mime_type(),
        path
    );
    Ok(path)
}

fn tag_names(tags: &[Tag]) -> Vec<&str> {
    tags.iter().map(|t| t.name.as_str()).collect()
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn paper(id: &str, title: &str, authors: &[&str], year: i32) -> Paper {
        Paper {
            id: id.to_string(),
            title: title.to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            year,
            abstract_text: None,
            url: format!("https://doi.org/10.1000/{}", id),
            journal: None,
            volume: None,
            issue: None,
            pages: None,
            pdf_path: None,
            created_at: None,
            tags: Vec::new(),
        }
    }

    fn tag(id: &str, name: &str) -> Tag {
        Tag {
            id: id.to_string(),
            name: name.to_string(),
            color: Some("#3B82F6".to_string()),
            created_at: None,
        }
    }

    fn note(paper_id: &str, content: &str) -> PaperNote {
        PaperNote {
            paper_id: paper_id.to_string(),
            content: content.to_string(),
            updated_at: Some("2024-05-01T10:00:00".to_string()),
        }
    }

    #[test]
    fn test_citation_key() {
        let p = paper("W1", "Deep Residual Learning", &["Kaiming He", "Xiangyu Zhang"], 2016);
        assert_eq!(citation_key(&p), "he2016deep");

        let anonymous = paper("W2", "Untitled Work", &[], 1999);
        assert_eq!(citation_key(&anonymous), "unknown1999untitled");
    }

    #[test]
    fn test_citation_keys_collide() {
        let a = paper("W1", "Learning to rank", &["Jane Smith"], 2020);
        let b = paper("W2", "Learning from noisy labels", &["Jane Smith", "Bob Lee"], 2020);
        assert_eq!(citation_key(&a), citation_key(&b));

        let bibtex = to_bibtex(&[a, b], None);
        assert_eq!(bibtex.matches("@article{smith2020learning,").count(), 2);
    }

    #[test]
    fn test_bibtex_entry_layout() {
        let mut p = paper("W1", "Attention Is All You Need", &["Ashish Vaswani", "Noam Shazeer"], 2017);
        p.journal = Some("NeurIPS".to_string());
        p.volume = Some("30".to_string());
        p.issue = Some("".to_string());
        p.pages = Some("12-34".to_string());

        let bibtex = to_bibtex(&[p], None);
        let expected = "@article{vaswani2017attention,\n\
                        \x20 title={Attention Is All You Need},\n\
                        \x20 author={Ashish Vaswani and Noam Shazeer},\n\
                        \x20 journal={NeurIPS},\n\
                        \x20 volume={30},\n\
                        \x20 pages={12--34},\n\
                        \x20 year={2017},\n\
                        \x20 url={https://doi.org/10.1000/W1},\n\
                        }\n\n";
        assert_eq!(bibtex, expected);
    }

    #[test]
    fn test_bibtex_note_is_flattened_and_truncated() {
        let p = paper("W1", "Notes", &["A B"], 2000);
        let long = format!("line one\nline two {}", "x".repeat(500));
        let notes = PaperNotes::from([("W1".to_string(), note("W1", &long))]);

        let bibtex = to_bibtex(&[p], Some(&notes));
        let note_line = bibtex
            .lines()
            .find(|l| l.starts_with("  note={"))
            .unwrap();
        let value = note_line
            .trim_start_matches("  note={")
            .trim_end_matches("},");

        assert!(value.starts_with("line one line two "));
        assert_eq!(value.chars().count(), 200);
    }

    #[test]
    fn test_bibtex_skips_empty_note() {
        let p = paper("W1", "Notes", &["A B"], 2000);
        let notes = PaperNotes::from([("W1".to_string(), note("W1", ""))]);
        assert!(!to_bibtex(&[p], Some(&notes)).contains("note="));
    }

    #[test]
    fn test_csv_quotes_and_escapes() {
        let mut p = paper("W1", "Graphs, \"Networks\" and more", &["Ann Lee", "Bo Chen"], 2021);
        p.journal = Some("Nature".to_string());
        let tags = PaperTags::from([(
            "W1".to_string(),
            vec![tag("t1", "ml"), tag("t2", "graphs")],
        )]);
        let notes = PaperNotes::from([("W1".to_string(), note("W1", "must read"))]);

        let csv = to_csv(&[p], Some(&tags), Some(&notes));
        let mut lines = csv.lines();

        assert_eq!(lines.next().unwrap(), CSV_HEADER);
        assert_eq!(
            lines.next().unwrap(),
            "\"Graphs, \"\"Networks\"\" and more\",\"Ann Lee; Bo Chen\",2021,\"Nature\",\"\",\"\",\"https://doi.org/10.1000/W1\",\"ml; graphs\",\"must read\""
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_without_maps_has_empty_fields() {
        let p = paper("W1", "Plain", &["A B"], 2000);
        let csv = to_csv(&[p], None, None);
        assert!(csv.ends_with(",\"\",\"\"\n"));
    }

    #[test]
    fn test_json_round_trip() {
        let mut p = paper("W1", "Attention Is All You Need", &["Ashish Vaswani"], 2017);
        p.created_at = Some("2024-01-02T03:04:05".to_string());
        let q = paper("W2", "BERT", &["Jacob Devlin", "Ming-Wei Chang"], 2019);
        let tags = PaperTags::from([("W1".to_string(), vec![tag("t1", "nlp")])]);
        let notes = PaperNotes::from([("W2".to_string(), note("W2", "pretraining"))]);

        let json = to_json(&[p.clone(), q.clone()], Some(&tags), Some(&notes)).unwrap();
        assert!(json.starts_with("[\n  {\n    \"id\": \"W1\""));

        let parsed: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        for (record, original) in parsed.iter().zip([&p, &q]) {
            assert_eq!(record["title"], original.title.as_str());
            assert_eq!(record["year"], original.year);
            assert_eq!(record["url"], original.url.as_str());
            let authors: Vec<String> = serde_json::from_value(record["authors"].clone()).unwrap();
            assert_eq!(&authors, &original.authors);
        }

        assert_eq!(parsed[0]["tags"], serde_json::json!(["nlp"]));
        assert_eq!(parsed[0]["note"], "");
        assert_eq!(parsed[0]["createdAt"], "2024-01-02T03:04:05");
        assert_eq!(parsed[1]["tags"], serde_json::json!([]));
        assert_eq!(parsed[1]["note"], "pretraining");

        let keys: Vec<&str> = parsed[0]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys.len(), 13);
        assert!(keys.contains(&"abstract"));
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!("bib".parse::<ExportFormat>().unwrap(), ExportFormat::BibTeX);
        assert_eq!("BibTeX".parse::<ExportFormat>().unwrap(), ExportFormat::BibTeX);
        assert_eq!("csv".parse::<ExportFormat>().unwrap().mime_type(), "text/csv");
        assert!("xml".parse::<ExportFormat>().is_err());

        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            default_file_name(ExportFormat::Json, date),
            "research-library-2024-03-09.json"
        );
        assert_eq!(ExportFormat::BibTeX.mime_type(), "application/x-bibtex");
    }

    #[test]
    fn test_write_export() {
        let dir = tempfile::TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let path = write_export(dir.path(), ExportFormat::Csv, CSV_HEADER, date).unwrap();

        assert_eq!(path.file_name().unwrap(), "research-library-2024-03-09.csv");
        assert_eq!(fs::read_to_string(path).unwrap(), CSV_HEADER);
    }
}
