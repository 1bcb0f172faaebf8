//! Command-line front end: cluster a JSON file of bookmarks and print the
//! result as JSON.
//!
//! ```text
//! arrange [--config arrange.yaml] [--assign-only] [FILE|-]
//! ```
//!
//! Input is either a bare array of `{"title", "summary"}` objects or
//! `{"items": [...]}`. Without `--config` the offline stub embedder and
//! labeler are used.

use std::path::PathBuf;

use anyhow::{Context, Result};
use arrange::{ArrangeConfig, Document};
use clap::Parser;
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Deserialize)]
#[serde(untagged)]
enum Input {
    List(Vec<Document>),
    Wrapped { items: Vec<Document> },
}

impl Input {
    fn into_documents(self) -> Vec<Document> {
        match self {
            Input::List(docs) | Input::Wrapped { items: docs } => docs,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "arrange", version)]
#[command(about = "Cluster bookmarks by topic and name each cluster")]
struct Args {
    /// Pipeline YAML; the offline pipeline when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Print cluster assignments without naming them
    #[arg(long)]
    assign_only: bool,

    /// JSON input file, `-` or nothing for stdin
    input: Option<String>,
}

async fn read_input(source: Option<&str>) -> Result<String> {
    match source {
        None | Some("-") => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("reading stdin")?;
            Ok(buf)
        }
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {path}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ArrangeConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ArrangeConfig::offline(),
    };
    let pipeline = config.build_pipeline()?;

    let raw = read_input(args.input.as_deref()).await?;
    let docs = serde_json::from_str::<Input>(&raw)
        .context("input must be a JSON array of documents or {\"items\": [...]}")?
        .into_documents();

    let output = if args.assign_only {
        let grouping = pipeline.assign(&docs).await?;
        serde_json::to_string_pretty(&serde_json::json!({ "clusters": grouping.assignments }))?
    } else {
        serde_json::to_string_pretty(&pipeline.run(&docs).await?)?
    };
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_and_input_are_parsed() {
        let args =
            Args::try_parse_from(["arrange", "-c", "arrange.yaml", "--assign-only", "links.json"])
                .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("arrange.yaml")));
        assert!(args.assign_only);
        assert_eq!(args.input.as_deref(), Some("links.json"));

        let args = Args::try_parse_from(["arrange"]).unwrap();
        assert!(args.config.is_none() && !args.assign_only && args.input.is_none());
    }

    #[test]
    fn bad_command_lines_are_rejected() {
        assert!(Args::try_parse_from(["arrange", "--config"]).is_err());
        assert!(Args::try_parse_from(["arrange", "--verbose"]).is_err());
        assert!(Args::try_parse_from(["arrange", "a.json", "b.json"]).is_err());
    }

    #[test]
    fn both_input_shapes_are_accepted() {
        let list: Input = serde_json::from_str(r#"[{"title":"a","summary":"b"}]"#).unwrap();
        assert_eq!(list.into_documents().len(), 1);
        let wrapped: Input =
            serde_json::from_str(r#"{"items":[{"title":"a","summary":"b"}]}"#).unwrap();
        assert_eq!(wrapped.into_documents().len(), 1);
    }
}
