//! Search capabilities handed to the research agent.
//!
//! * **`duckduckgo_search`**: scrapes the DuckDuckGo HTML endpoint and returns
//!   titles, snippets and links as plain text.
//! * **`wikipedia`**: searches the MediaWiki API and returns the plain-text
//!   summaries of the top pages.

use async_trait::async_trait;
use futures::future::try_join_all;
use percent_encoding::percent_decode_str;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{AgentError, Result};

const DDG_MAX_RESULTS: usize = 5;
const WIKIPEDIA_TOP_K: usize = 3;
const WIKIPEDIA_MAX_CHARS: usize = 4000;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn run(&self, input: &str) -> Result<String>;
}

pub struct DuckDuckGoSearch {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoSearch {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Tool for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo_search"
    }

    fn description(&self) -> &str {
        "A wrapper around DuckDuckGo Search. Useful for when you need to answer questions \
         about current events. Input should be a search query."
    }

    async fn run(&self, input: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("q", input)])
            .header("Accept", "text/html")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::UpstreamError {
                service: "duckduckgo",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        let results = parse_ddg_results(&body, DDG_MAX_RESULTS);
        debug!("DuckDuckGo returned {} results for {:?}", results.len(), input);

        if results.is_empty() {
            warn!("No DuckDuckGo results for {:?}", input);
            return Ok("No good DuckDuckGo Search Result was found".to_string());
        }

        for hit in &results {
            debug!("DuckDuckGo hit {:?} -> {}", hit.title, hit.link);
        }

        Ok(format_snippets(&results))
    }
}

/// Snippets joined by spaces; a hit without a snippet contributes its title.
fn format_snippets(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| {
            if h.snippet.is_empty() {
                h.title.as_str()
            } else {
                h.snippet.as_str()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq)]
struct SearchHit {
    title: String,
    snippet: String,
    link: String,
}

fn parse_ddg_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);

    // Static selectors; parse cannot fail.
    let result_sel = Selector::parse(".result").unwrap();
    let link_sel = Selector::parse("a.result__a").unwrap();
    let snippet_sel = Selector::parse(".result__snippet").unwrap();

    doc.select(&result_sel)
        .filter_map(|result| {
            let anchor = result.select(&link_sel).next()?;
            let title = collapse_whitespace(&anchor.text().collect::<String>());
            if title.is_empty() {
                return None;
            }
            let link = extract_ddg_url(anchor.value().attr("href").unwrap_or(""));
            let snippet = result
                .select(&snippet_sel)
                .next()
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .unwrap_or_default();
            Some(SearchHit {
                title,
                snippet,
                link,
            })
        })
        .take(max_results)
        .collect()
}

/// DuckDuckGo wraps result links as `//duckduckgo.com/l/?uddg=<encoded>&rut=...`.
fn extract_ddg_url(href: &str) -> String {
    if let Some(pos) = href.find("uddg=") {
        let start = pos + 5;
        let end = href[start..]
            .find('&')
            .map(|i| start + i)
            .unwrap_or(href.len());
        let encoded = &href[start..end];
        if !encoded.is_empty() {
            return percent_decode_str(encoded).decode_utf8_lossy().into_owned();
        }
    }
    href.to_string()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub struct WikipediaQuery {
    client: Client,
    api_url: String,
}

impl WikipediaQuery {
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, params: &[(&str, &str)]) -> Result<T> {
        let response = self.client.get(&self.api_url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::UpstreamError {
                service: "wikipedia",
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    async fn search_titles(&self, query: &str) -> Result<Vec<String>> {
        let limit = WIKIPEDIA_TOP_K.to_string();
        let parsed: SearchResponse = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", &limit),
                ("format", "json"),
            ])
            .await?;

        Ok(parsed
            .query
            .map(|q| q.search.into_iter().map(|s| s.title).collect())
            .unwrap_or_default())
    }

    async fn page_summary(&self, title: &str) -> Result<Option<String>> {
        let parsed: ExtractResponse = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
            ])
            .await?;

        let extract = parsed
            .query
            .and_then(|q| q.pages.into_values().next())
            .and_then(|p| p.extract)
            .filter(|e| !e.trim().is_empty());

        Ok(extract.map(|summary| format!("Page: {title}\nSummary: {}", summary.trim())))
    }
}

#[async_trait]
impl Tool for WikipediaQuery {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "A wrapper around Wikipedia. Useful for when you need to answer general questions \
         about people, places, companies, facts, historical events, or other subjects. \
         Input should be a search query."
    }

    async fn run(&self, input: &str) -> Result<String> {
        let titles = self.search_titles(input).await?;
        debug!("Wikipedia search returned {} titles for {:?}", titles.len(), input);

        let summaries = try_join_all(titles.iter().map(|t| self.page_summary(t))).await?;
        let pages: Vec<String> = summaries.into_iter().flatten().collect();

        if pages.is_empty() {
            warn!("No Wikipedia results for {:?}", input);
            return Ok("No good Wikipedia Search Result was found".to_string());
        }

        Ok(truncate_chars(&pages.join("\n\n"), WIKIPEDIA_MAX_CHARS))
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchEntry>,
}

#[derive(Debug, Deserialize)]
struct SearchEntry {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: std::collections::HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    #[serde(default)]
    extract: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DDG_PAGE: &str = r#"<html><body>
        <div class="result">
          <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fparis&rut=abc">
            Paris in May</a></h2>
          <a class="result__snippet">Events and   festivals in Paris.</a>
        </div>
        <div class="result">
          <h2><a class="result__a" href="https://direct.example.org/">Direct link</a></h2>
        </div>
        <div class="result"><a class="result__a" href="x"></a></div>
      </body></html>"#;

    #[test]
    fn ddg_results_are_parsed_and_links_decoded() {
        let hits = parse_ddg_results(DDG_PAGE, 5);
        assert_eq!(
            hits,
            vec![
                SearchHit {
                    title: "Paris in May".to_string(),
                    snippet: "Events and festivals in Paris.".to_string(),
                    link: "https://example.com/paris".to_string(),
                },
                SearchHit {
                    title: "Direct link".to_string(),
                    snippet: String::new(),
                    link: "https://direct.example.org/".to_string(),
                },
            ]
        );
    }

    #[test]
    fn ddg_results_respect_limit() {
        assert_eq!(parse_ddg_results(DDG_PAGE, 1).len(), 1);
    }

    #[tokio::test]
    async fn ddg_tool_joins_snippets_with_spaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DDG_PAGE))
            .mount(&server)
            .await;

        let tool = DuckDuckGoSearch::new(Client::new(), format!("{}/html/", server.uri()));
        let out = tool.run("paris").await.unwrap();
        assert_eq!(out, "Events and festivals in Paris. Direct link");
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("ãéíõú", 3), "ãéí");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[tokio::test]
    async fn ddg_tool_reports_empty_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let tool = DuckDuckGoSearch::new(Client::new(), format!("{}/html/", server.uri()));
        let out = tool.run("nothing").await.unwrap();
        assert_eq!(out, "No good DuckDuckGo Search Result was found");
    }

    #[tokio::test]
    async fn wikipedia_tool_formats_page_summaries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("list", "search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {"search": [{"title": "Paris"}]}
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("prop", "extracts"))
            .and(query_param("titles", "Paris"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {"pages": {"22989": {"title": "Paris", "extract": "Paris is the capital of France."}}}
            })))
            .mount(&server)
            .await;

        let tool = WikipediaQuery::new(Client::new(), format!("{}/w/api.php", server.uri()));
        let out = tool.run("Paris").await.unwrap();
        assert_eq!(out, "Page: Paris\nSummary: Paris is the capital of France.");
    }

    #[tokio::test]
    async fn wikipedia_tool_propagates_http_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tool = WikipediaQuery::new(Client::new(), format!("{}/w/api.php", server.uri()));
        let err = tool.run("Paris").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::UpstreamError { status: 503, .. }
        ));
    }
}
