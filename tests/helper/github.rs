//! mockito-backed GitHub REST fixtures

use mockito::{Matcher, Mock, ServerGuard};
use serde_json::{Value, json};

pub const SHA: &str = "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678";
pub const SHA_2: &str = "0123456789abcdef0123456789abcdef01234567";

/// A mock GitHub API host; `prefix` is `""` for GitHub.com and `/api/v3`
/// for Enterprise.
pub struct GitHubServer {
    pub server: ServerGuard,
    prefix: String,
}

impl GitHubServer {
    pub async fn new() -> Self {
        Self::with_prefix("").await
    }

    pub async fn enterprise() -> Self {
        Self::with_prefix("/api/v3").await
    }

    async fn with_prefix(prefix: &str) -> Self {
        Self {
            server: mockito::Server::new_async().await,
            prefix: prefix.to_string(),
        }
    }

    /// Host URL, without the API prefix
    pub fn url(&self) -> String {
        self.server.url()
    }

    fn path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }

    pub async fn mock_json(&mut self, path: &str, status: usize, body: Value) -> Mock {
        let path = self.path(path);
        self.server
            .mock("GET", path.as_str())
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    pub async fn mock_not_found(&mut self, path: &str) -> Mock {
        self.mock_json(path, 404, json!({"message": "Not Found"}))
            .await
    }

    pub async fn mock_ref(&mut self, repo: &str, namespace: &str, name: &str, sha: &str) -> Mock {
        self.mock_json(
            &format!("/repos/{repo}/git/ref/{namespace}/{name}"),
            200,
            ref_json(namespace, name, sha),
        )
        .await
    }

    pub async fn mock_repository(&mut self, repo: &str, html_url: &str) -> Mock {
        self.mock_json(
            &format!("/repos/{repo}"),
            200,
            json!({
                "full_name": repo,
                "html_url": html_url,
                "default_branch": "main",
                "private": false
            }),
        )
        .await
    }

    /// Serves a ref listing as two pages linked by a `rel="next"` header
    pub async fn mock_paged_refs(
        &mut self,
        repo: &str,
        namespace: &str,
        first: &[&str],
        second: &[&str],
    ) -> (Mock, Mock) {
        let path = self.path(&format!("/repos/{repo}/git/refs/{namespace}"));
        let next = format!("{}{}?per_page=100&page=2", self.server.url(), path);

        let page_one = self
            .server
            .mock("GET", path.as_str())
            .match_query(Matcher::Exact("per_page=100".to_string()))
            .with_status(200)
            .with_header("link", &format!("<{next}>; rel=\"next\""))
            .with_body(refs_json(namespace, first).to_string())
            .create_async()
            .await;
        let page_two = self
            .server
            .mock("GET", path.as_str())
            .match_query(Matcher::Exact("per_page=100&page=2".to_string()))
            .with_status(200)
            .with_body(refs_json(namespace, second).to_string())
            .create_async()
            .await;

        (page_one, page_two)
    }
}

pub fn ref_json(namespace: &str, name: &str, sha: &str) -> Value {
    json!({
        "ref": format!("refs/{namespace}/{name}"),
        "object": { "sha": sha, "type": "commit" }
    })
}

fn refs_json(namespace: &str, names: &[&str]) -> Value {
    Value::Array(
        names
            .iter()
            .map(|name| ref_json(namespace, name, SHA))
            .collect(),
    )
}

pub fn pull_json(number: u64, state: &str, updated_at: &str, head_sha: &str) -> Value {
    json!({
        "number": number,
        "title": format!("Change #{number}"),
        "state": state,
        "html_url": format!("https://github.com/hal/agent/pull/{number}"),
        "updated_at": updated_at,
        "user": { "login": "octocat" },
        "head": { "ref": format!("feature-{number}"), "sha": head_sha },
        "base": { "ref": "main", "sha": SHA_2 }
    })
}
