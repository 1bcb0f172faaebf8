use std::collections::HashMap;

use async_trait::async_trait;

use crate::{LabelGenerator, NamingError, TitleGenerator};

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "are", "was", "its", "into", "over",
    "about", "new", "how", "why", "what", "your", "you", "our", "has", "have",
];

const LABEL_WORDS: usize = 3;
const TITLE_WORDS: usize = 8;

/// Offline label generator.
///
/// A category name is the most frequent title words across the samples; a
/// title is the leading words of the summary. Same input, same output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubLabeler;

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl LabelGenerator for StubLabeler {
    async fn generate_label(&self, samples: &[String]) -> Result<String, NamingError> {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut order = 0;
        for sample in samples {
            // Snippets are "{title}: {summary}"; weigh only the title.
            let title = sample.split_once(": ").map_or(sample.as_str(), |(t, _)| t);
            for word in words(title) {
                let entry = counts.entry(word).or_insert((0, order));
                entry.0 += 1;
                order += 1;
            }
        }

        let mut ranked: Vec<(String, usize, usize)> = counts
            .into_iter()
            .map(|(word, (count, first))| (word, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let label = ranked
            .iter()
            .take(LABEL_WORDS)
            .map(|(word, _, _)| capitalize(word))
            .collect::<Vec<_>>()
            .join(" ");
        if label.is_empty() {
            Err(NamingError::Empty)
        } else {
            Ok(label)
        }
    }
}

#[async_trait]
impl TitleGenerator for StubLabeler {
    async fn generate_title(&self, summary: &str) -> Result<String, NamingError> {
        let title = summary
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .take(TITLE_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
        if title.is_empty() {
            Err(NamingError::Empty)
        } else {
            Ok(title)
        }
    }
}
