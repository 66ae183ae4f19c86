//! Tools the step agent can call.
//!
//! Every tool takes a single free-text query and answers with an ordered
//! list of snippets. `WebSearch` talks to the Tavily search API; the
//! workspace tools give read-only access to the codebase under analysis.

use crate::agent::model::ToolDefinition;
use crate::error::{AgentError, ToolError};
use crate::scanner::FileScanner;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Maximum hits returned by `search_code`.
const MAX_SEARCH_HITS: usize = 20;

/// One ranked piece of tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Where the content came from (URL, file path, `path:line`).
    pub source: String,
    pub content: String,
}

impl Snippet {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// A capability the step agent can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Meaning of the `query` argument, shown to the model.
    fn query_description(&self) -> &str;

    async fn invoke(&self, query: &str) -> Result<Vec<Snippet>, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": self.query_description()
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

/// The set of tools offered to the step agent.
#[derive(Clone, Default)]
pub struct ToolBox {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, tool: impl Tool + 'static) -> Self {
        self.with_shared(Arc::new(tool))
    }

    pub fn with_shared(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

/// Render snippets as the text folded back into the agent's context.
pub fn format_snippets(snippets: &[Snippet]) -> String {
    if snippets.is_empty() {
        return "No results.".to_string();
    }

    snippets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {}\n{}", i + 1, s.source, s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Settings for [`WebSearch`].
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub api_key: String,
    pub base_url: String,
    pub max_results: usize,
    pub search_depth: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

/// Web search through the Tavily API.
pub struct WebSearch {
    settings: SearchSettings,
    http_client: reqwest::Client,
}

impl WebSearch {
    pub const NAME: &'static str = "web_search";

    pub fn new(settings: SearchSettings) -> Result<Self, AgentError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| ToolError::transport(Self::NAME, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            http_client,
        })
    }
}

/// Keep the first `max` results in ranking order.
fn to_snippets(response: TavilyResponse, max: usize) -> Vec<Snippet> {
    response
        .results
        .into_iter()
        .take(max)
        .map(|r| {
            let content = if r.title.is_empty() {
                r.content
            } else {
                format!("{}\n{}", r.title, r.content)
            };
            Snippet::new(r.url, content)
        })
        .collect()
}

#[async_trait]
impl Tool for WebSearch {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Search the web for best practices, library documentation, known issues and common architecture patterns."
    }

    fn query_description(&self) -> &str {
        "Search query"
    }

    async fn invoke(&self, query: &str) -> Result<Vec<Snippet>, ToolError> {
        let url = format!("{}/search", self.settings.base_url.trim_end_matches('/'));
        let request = TavilyRequest {
            query,
            max_results: self.settings.max_results,
            search_depth: &self.settings.search_depth,
        };

        debug!("Searching the web for: {}", query);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ToolError::transport(Self::NAME, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::transport(
                Self::NAME,
                format!("Search API error {}: {}", status, body),
            ));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ToolError::transport(Self::NAME, format!("Failed to parse search response: {}", e)))?;

        Ok(to_snippets(body, self.settings.max_results))
    }
}

/// Lists a workspace directory.
pub struct ListFiles {
    scanner: Arc<FileScanner>,
}

impl ListFiles {
    pub fn new(scanner: Arc<FileScanner>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl Tool for ListFiles {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files and directories in the workspace. Use this to explore the codebase structure."
    }

    fn query_description(&self) -> &str {
        "Directory path relative to the workspace root. Use '.' for the root."
    }

    async fn invoke(&self, query: &str) -> Result<Vec<Snippet>, ToolError> {
        let dir = if query.trim().is_empty() { "." } else { query.trim() };
        let entries = self
            .scanner
            .list_directory(dir)
            .map_err(|e| ToolError::rejected(e.to_string()))?;

        Ok(vec![Snippet::new(dir, entries.join("\n"))])
    }
}

/// Reads a workspace source file.
pub struct ReadFile {
    scanner: Arc<FileScanner>,
}

impl ReadFile {
    pub fn new(scanner: Arc<FileScanner>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl Tool for ReadFile {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a source file in the workspace."
    }

    fn query_description(&self) -> &str {
        "Path to the file relative to the workspace root"
    }

    async fn invoke(&self, query: &str) -> Result<Vec<Snippet>, ToolError> {
        let path = query.trim();
        let content = self
            .scanner
            .read_file(path)
            .map_err(|e| ToolError::rejected(e.to_string()))?;

        Ok(vec![Snippet::new(path, content)])
    }
}

/// Plain-text search over workspace sources.
pub struct SearchCode {
    scanner: Arc<FileScanner>,
}

impl SearchCode {
    pub fn new(scanner: Arc<FileScanner>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl Tool for SearchCode {
    fn name(&self) -> &str {
        "search_code"
    }

    fn description(&self) -> &str {
        "Search the workspace sources for a text pattern. Returns matching lines with file and line numbers."
    }

    fn query_description(&self) -> &str {
        "Text pattern to search for"
    }

    async fn invoke(&self, query: &str) -> Result<Vec<Snippet>, ToolError> {
        if query.is_empty() {
            return Err(ToolError::rejected("Search pattern must not be empty"));
        }

        let hits = self
            .scanner
            .search(query, MAX_SEARCH_HITS)
            .map_err(|e| ToolError::rejected(e.to_string()))?;

        Ok(hits
            .into_iter()
            .map(|h| Snippet::new(format!("{}:{}", h.path, h.line_number), h.line))
            .collect())
    }
}

/// Tool set for a workspace: the three exploration tools sharing one scanner.
pub fn workspace_tools(toolbox: ToolBox, scanner: FileScanner) -> ToolBox {
    let scanner = Arc::new(scanner);
    toolbox
        .with(ListFiles::new(scanner.clone()))
        .with(ReadFile::new(scanner.clone()))
        .with(SearchCode::new(scanner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanConfig;
    use tempfile::TempDir;

    fn tavily_json(n: usize) -> serde_json::Value {
        let results: Vec<_> = (1..=n)
            .map(|i| {
                json!({
                    "title": format!("Result {}", i),
                    "url": format!("https://example.com/{}", i),
                    "content": format!("content {}", i),
                    "score": 1.0 / i as f64
                })
            })
            .collect();
        json!({ "query": "q", "results": results })
    }

    fn tavily_body(n: usize) -> TavilyResponse {
        serde_json::from_value(tavily_json(n)).unwrap()
    }

    fn search_settings(base_url: String) -> SearchSettings {
        SearchSettings {
            api_key: "tvly-test".to_string(),
            base_url,
            max_results: 3,
            search_depth: "basic".to_string(),
            timeout_seconds: 5,
        }
    }

    fn workspace() -> (TempDir, ToolBox) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "pub mod db;\nuse serde::Serialize;\n").unwrap();
        let scanner = FileScanner::new(dir.path().to_path_buf(), ScanConfig::default());
        let toolbox = workspace_tools(ToolBox::new(), scanner);
        (dir, toolbox)
    }

    #[test]
    fn test_search_results_capped_in_source_order() {
        let snippets = to_snippets(tavily_body(5), 3);

        assert_eq!(snippets.len(), 3);
        let sources: Vec<_> = snippets.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(
            sources,
            [
                "https://example.com/1",
                "https://example.com/2",
                "https://example.com/3"
            ]
        );
        assert!(snippets[0].content.starts_with("Result 1"));
    }

    #[tokio::test]
    async fn test_web_search_invoke_keeps_first_three_of_five() {
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer tvly-test"))
            .and(body_partial_json(json!({
                "query": "rust module layering",
                "max_results": 3,
                "search_depth": "basic"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(tavily_json(5)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let search = WebSearch::new(search_settings(mock_server.uri())).unwrap();
        let snippets = search.invoke("rust module layering").await.unwrap();

        let sources: Vec<_> = snippets.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(
            sources,
            [
                "https://example.com/1",
                "https://example.com/2",
                "https://example.com/3"
            ]
        );
    }

    #[tokio::test]
    async fn test_web_search_api_error_is_transport_failure() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&mock_server)
            .await;

        let search = WebSearch::new(search_settings(mock_server.uri())).unwrap();
        let err = search.invoke("anything").await.unwrap_err();
        match err {
            ToolError::Transport { tool, message } => {
                assert_eq!(tool, "web_search");
                assert!(message.contains("503"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_search_results_fewer_than_cap() {
        assert_eq!(to_snippets(tavily_body(2), 3).len(), 2);
        assert!(to_snippets(tavily_body(0), 3).is_empty());
    }

    #[test]
    fn test_format_snippets() {
        assert_eq!(format_snippets(&[]), "No results.");
        let text = format_snippets(&[Snippet::new("a.rs", "x"), Snippet::new("b.rs", "y")]);
        assert_eq!(text, "[1] a.rs\nx\n\n[2] b.rs\ny");
    }

    #[test]
    fn test_toolbox_definitions() {
        let (_dir, toolbox) = workspace();
        assert_eq!(toolbox.names(), ["list_files", "read_file", "search_code"]);

        let defs = toolbox.definitions();
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].parameters["required"][0], "query");
        assert!(toolbox.get("read_file").is_some());
        assert!(toolbox.get("report_issue").is_none());
    }

    #[tokio::test]
    async fn test_workspace_tools() {
        let (_dir, toolbox) = workspace();

        let listing = toolbox.get("list_files").unwrap().invoke(".").await.unwrap();
        assert_eq!(listing[0].content, "src/");

        let file = toolbox.get("read_file").unwrap().invoke("src/lib.rs").await.unwrap();
        assert!(file[0].content.contains("pub mod db;"));

        let hits = toolbox.get("search_code").unwrap().invoke("serde").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].source.ends_with("lib.rs:2"));
    }

    #[tokio::test]
    async fn test_workspace_tools_reject_bad_paths() {
        let (_dir, toolbox) = workspace();
        let read = toolbox.get("read_file").unwrap();

        let err = read.invoke("../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, ToolError::Rejected(_)));

        let err = read.invoke("missing.rs").await.unwrap_err();
        assert!(matches!(err, ToolError::Rejected(_)));
    }
}
