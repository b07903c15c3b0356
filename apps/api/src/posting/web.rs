//! Fetches a posting page and reduces it to visible text.

use std::time::Duration;

use reqwest::{Client, Url};
use scraper::{Html, Node};
use tracing::info;

use crate::posting::IntakeError;

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "head", "template"];

#[derive(Clone)]
pub struct PostingFetcher {
    client: Client,
}

impl PostingFetcher {
    pub fn new(timeout: Duration) -> Result<Self, IntakeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, IntakeError> {
        let url = parse_url(url)?;
        info!("Fetching job posting: {url}");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(IntakeError::Status(response.status().as_u16()));
        }
        let html = response.text().await?;
        Ok(html_to_text(&html))
    }
}

fn parse_url(raw: &str) -> Result<Url, IntakeError> {
    let url = Url::parse(raw.trim()).map_err(|_| IntakeError::InvalidUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(IntakeError::InvalidUrl(raw.to_string())),
    }
}

/// One line per visible text node, script/style content removed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if hidden {
            continue;
        }
        let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}
