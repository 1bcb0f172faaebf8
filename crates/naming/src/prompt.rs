//! Chat prompts and output cleanup.

use serde_json::{json, Value};

const LABEL_SYSTEM: &str =
    "You are a helpful assistant that summarizes a list of texts into a concise category name.";

const TITLE_SYSTEM: &str = "You are an expert multilingual headline editor. \
Given a passage, you detect its language and craft a concise, eye-catching title \
in the same language. Do NOT output explanations, only the title line.";

/// Messages asking for one category name covering `samples`.
pub(crate) fn label_messages(samples: &[String]) -> Value {
    let documents = samples.join("\n");
    let user = format!(
        "The following are summaries and titles of bookmarks that belong to the same cluster.\n\
         Generate a short and clear category name that best represents the topic of this cluster.\n\
         \n\
         Documents:\n\
         {documents}\n\
         \n\
         Category title (in English):"
    );
    json!([
        { "role": "system", "content": LABEL_SYSTEM },
        { "role": "user", "content": user },
    ])
}

/// Messages asking for a title in the summary's own language.
pub(crate) fn title_messages(summary: &str) -> Value {
    let user = format!(
        "Rules:\n\
         1) Detect the language of the summary and reply in that language.\n\
         2) Use 4-10 key words only; drop stop-words, endings, punctuation.\n\
         3) Return one line with no quotes or period.\n\
         \n\
         Example:\n\
         Summary:\n\
         Global oil prices have surged due to geopolitical tensions, impacting inflation worldwide.\n\
         Title: Global Oil Price Surge\n\
         \n\
         Summary:\n\
         \"\"\"{summary}\"\"\"\n\
         Title:"
    );
    json!([
        { "role": "system", "content": TITLE_SYSTEM },
        { "role": "user", "content": user },
    ])
}

/// Trim whitespace, a leading `Title:`/`Category:` echo and one layer of
/// surrounding quotes. `None` when nothing is left.
pub(crate) fn clean_output(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    // Keep only the first non-empty line.
    text = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");

    for prefix in ["Title:", "Category title:", "Category:"] {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest.trim();
        }
    }

    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”'), ('‘', '’'), ('`', '`')] {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            text = inner.trim();
            break;
        }
    }

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
