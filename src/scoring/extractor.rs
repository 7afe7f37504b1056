// src/scoring/extractor.rs

//! Response-sheet scraping.
//!
//! Everything that knows the vendor's markup lives here: the two-column
//! candidate tables, the `section-lbl` dividers and the `question-pnl`
//! blocks. Extraction is best-effort and never fails; callers decide which
//! missing fields are fatal.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::candidate::{CandidateDetails, SectionTally};

const SECTION_CLASS: &str = "section-lbl";
const UNATTEMPTED_SENTINEL: &str = "--";
const CHOSEN_OPTION_LABEL: &str = "Chosen Option";
const VENUE_KEYS: [&str; 3] = ["venue", "test center", "centre"];

static ROW: LazyLock<Selector> = LazyLock::new(|| selector("table tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| selector("td"));
static SECTION_OR_QUESTION: LazyLock<Selector> =
    LazyLock::new(|| selector("div.section-lbl, div.question-pnl"));
static RIGHT_ANSWER: LazyLock<Selector> = LazyLock::new(|| selector("td.rightAns"));

static EXAM_DATE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"\b(\d{1,2}/\d{1,2}/\d{4})\b"));
static EXAM_TIME: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)(\d{1,2}:\d{2})\s*([AP]M)\s*[-–]\s*(\d{1,2}:\d{2})\s*([AP]M)")
});
static OPTION_NUMERAL: LazyLock<Regex> = LazyLock::new(|| regex(r"(\d)\."));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern is valid")
}

/// How a single question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Wrong,
    Unattempted,
}

/// Parses a response sheet into candidate metadata and per-section tallies.
pub fn extract(markup: &str) -> (CandidateDetails, Vec<SectionTally>) {
    let document = Html::parse_document(markup);

    let mut details = candidate_details(&document);
    let text = document_text(&document);
    details.exam_date = find_exam_date(&text);
    details.exam_time = find_exam_time(&text);

    (details, section_tallies(&document))
}

fn candidate_details(document: &Html) -> CandidateDetails {
    let mut details = CandidateDetails::default();

    for row in document.select(&ROW) {
        let cells: Vec<String> = row.select(&CELL).map(element_text).collect();
        let [key, value] = cells.as_slice() else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        let key = key.to_lowercase();
        // "name" alone also matches "Exam Name", "Venue Name", ...
        let slot = if key.contains("roll") {
            &mut details.roll
        } else if key.contains("candidate name") {
            &mut details.name
        } else if VENUE_KEYS.iter().any(|k| key.contains(k)) {
            &mut details.venue
        } else if key.contains("subject") {
            &mut details.subject
        } else {
            continue;
        };

        if slot.is_none() {
            *slot = Some(value.clone());
        }
    }

    details
}

pub fn find_exam_date(text: &str) -> Option<String> {
    EXAM_DATE.captures(text).map(|c| c[1].to_string())
}

pub fn find_exam_time(text: &str) -> Option<String> {
    EXAM_TIME.captures(text).map(|c| {
        format!(
            "{} {} - {} {}",
            &c[1],
            c[2].to_uppercase(),
            &c[3],
            c[4].to_uppercase()
        )
    })
}

fn section_tallies(document: &Html) -> Vec<SectionTally> {
    let mut tallies: Vec<SectionTally> = Vec::new();
    let mut current: Option<usize> = None;

    for element in document.select(&SECTION_OR_QUESTION) {
        if element.value().classes().any(|c| c == SECTION_CLASS) {
            let label = element_text(element);
            let index = match tallies.iter().position(|t| t.label == label) {
                Some(index) => index,
                None => {
                    tallies.push(SectionTally::new(label));
                    tallies.len() - 1
                }
            };
            current = Some(index);
            continue;
        }

        // Question panels before the first section label belong nowhere.
        let Some(index) = current else {
            continue;
        };

        match classify_question(element) {
            Some(Outcome::Correct) => tallies[index].correct += 1,
            Some(Outcome::Wrong) => tallies[index].wrong += 1,
            Some(Outcome::Unattempted) => tallies[index].unattempted += 1,
            None => tracing::debug!(
                section = %tallies[index].label,
                "Skipping question without a readable correct option"
            ),
        }
    }

    tallies
}

/// Classifies one question panel. `None` when the correct option cannot be read.
pub fn classify_question(panel: ElementRef<'_>) -> Option<Outcome> {
    let correct = panel
        .select(&RIGHT_ANSWER)
        .find_map(|td| option_numeral(&element_text(td)))?;

    Some(match chosen_option(panel) {
        None => Outcome::Unattempted,
        Some(chosen) if chosen == correct => Outcome::Correct,
        Some(_) => Outcome::Wrong,
    })
}

fn option_numeral(text: &str) -> Option<u32> {
    OPTION_NUMERAL.captures(text)?[1].parse().ok()
}

fn chosen_option(panel: ElementRef<'_>) -> Option<u32> {
    let label = panel
        .select(&CELL)
        .filter(|td| is_leaf_cell(*td))
        .find(|td| element_text(*td).contains(CHOSEN_OPTION_LABEL))?;

    let value = label
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "td")
        .map(element_text)?;

    if value.is_empty() || value == UNATTEMPTED_SENTINEL {
        return None;
    }
    value.parse().ok()
}

/// A cell with no nested cells; layout tables wrap the real ones.
fn is_leaf_cell(td: ElementRef<'_>) -> bool {
    !td.descendants()
        .skip(1)
        .any(|n| n.value().as_element().is_some_and(|e| e.name() == "td"))
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize(element.text())
}

fn document_text(document: &Html) -> String {
    normalize(document.root_element().text())
}

fn normalize<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    fragments
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
