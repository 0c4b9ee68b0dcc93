//! Agent -> MCP -> backend over real listeners, with a stubbed generator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use leadrelay_core::{
    Agent, CommandRouter, GenerationClient, GenerationError, LeadService, LeadStore, McpClient,
};
use leadrelay_gateway::{agent, backend, mcp};
use reqwest::Url;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Replies with a fixed generator output and counts calls.
struct StubGenerator {
    reply: String,
    calls: AtomicUsize,
}

impl StubGenerator {
    fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        assert!(prompt.contains("Conversation:"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

async fn spawn(app: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

struct Relay {
    _dir: TempDir,
    backend_url: String,
    mcp_url: String,
    agent_url: String,
}

async fn start(generator: Arc<StubGenerator>) -> Relay {
    let dir = TempDir::new().unwrap();
    let store = LeadStore::open(Some(dir.path().join("leads"))).unwrap();
    let backend_url = spawn(backend::router(store)).await;

    let service = LeadService::new(Url::parse(&backend_url).unwrap(), None).unwrap();
    let mcp_base = spawn(mcp::router(CommandRouter::new(Arc::new(service)))).await;
    let mcp_url = format!("{}/execute", mcp_base);

    let agent = Agent::new(
        generator,
        McpClient::new(Url::parse(&mcp_url).unwrap(), None).unwrap(),
    );
    let agent_url = spawn(agent::router(agent)).await;

    Relay {
        _dir: dir,
        backend_url,
        mcp_url,
        agent_url,
    }
}

async fn post(url: &str, body: Value) -> (u16, Value) {
    let res = reqwest::Client::new().post(url).json(&body).send().await.unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap_or(Value::Null))
}

const JOHN: &str = r#"```json
{
  "command": "createLead",
  "data": {
    "name": "John",
    "source": "website",
    "contact": { "email": "john@example.com", "phone": null },
    "interestedProducts": ["A"],
    "status": "New",
    "notes": "Asked about A"
  }
}
```"#;

#[tokio::test]
async fn conversation_creates_lead() {
    let generator = StubGenerator::new(JOHN);
    let relay = start(generator.clone()).await;

    let conversation =
        "Hi, I'm John from your website. I'd like product A. Email john@example.com";
    let (status, body) = post(
        &format!("{}/api/ai-agent/parse-and-create", relay.agent_url),
        json!({ "conversation": conversation }),
    )
    .await;

    assert_eq!(status, 200, "{}", body);
    assert_eq!(body["message"], "Handled");
    assert_eq!(body["mcpStatus"], 201);
    assert_eq!(body["mcpResponse"]["message"], "Lead created successfully");
    assert_eq!(generator.calls(), 1);

    let id = body["mcpResponse"]["id"].as_str().unwrap();
    let lead: Value = reqwest::get(format!("{}/api/leads/{}", relay.backend_url, id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(lead["name"], "John");
    assert_eq!(lead["contact"]["email"], "john@example.com");
}

#[tokio::test]
async fn empty_conversation_skips_generation() {
    let generator = StubGenerator::new(JOHN);
    let relay = start(generator.clone()).await;
    let url = format!("{}/api/ai-agent/parse-and-create", relay.agent_url);

    for body in [json!({ "conversation": "" }), json!({ "conversation": "   " }), json!({})] {
        let (status, reply) = post(&url, body).await;
        assert_eq!(status, 400);
        assert_eq!(reply, json!({ "error": "Conversation required" }));
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn incomplete_lead_rejected_by_agent() {
    let generator = StubGenerator::new(
        r#"{ "command": "createLead", "data": { "name": "John", "contact": {} } }"#,
    );
    let relay = start(generator.clone()).await;
    let (status, body) = post(
        &format!("{}/api/ai-agent/parse-and-create", relay.agent_url),
        json!({ "conversation": "John called" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(
        body["missingFields"],
        json!(["source", "contact.email", "interestedProducts"])
    );

    let leads: Value = reqwest::get(format!("{}/api/leads", relay.backend_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(leads, json!([]));
}

#[tokio::test]
async fn unparseable_generation_is_500() {
    let generator = StubGenerator::new("I could not understand that.");
    let relay = start(generator).await;
    let (status, body) = post(
        &format!("{}/api/ai-agent/parse-and-create", relay.agent_url),
        json!({ "conversation": "???" }),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Failed to process");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn lookup_of_missing_lead_is_handled() {
    let generator = StubGenerator::new(r#"{ "command": "getLeadById", "id": "missing" }"#);
    let relay = start(generator).await;
    let (status, body) = post(
        &format!("{}/api/ai-agent/parse-and-create", relay.agent_url),
        json!({ "conversation": "Show me lead missing" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({
            "message": "Handled",
            "mcpResponse": { "message": "Not found" },
            "mcpStatus": 404
        })
    );
}

#[tokio::test]
async fn delete_twice_through_mcp() {
    let relay = start(StubGenerator::new(JOHN)).await;
    let (status, created) = post(
        &relay.mcp_url,
        json!({
            "command": "createLead",
            "data": {
                "name": "Temp",
                "source": "referral",
                "contact": { "email": "temp@example.com" },
                "interestedProducts": ["B"]
            }
        }),
    )
    .await;
    assert_eq!(status, 200);
    let id = created["id"].as_str().unwrap().to_string();

    let delete = json!({ "command": "deleteLeadById", "id": id.clone() });
    let (status, body) = post(&relay.mcp_url, delete.clone()).await;
    assert_eq!(status, 200);
    assert_eq!(body["deletedId"], id.as_str());

    let (status, body) = post(&relay.mcp_url, delete).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Failed to delete lead from backend");
    assert_eq!(body["details"], "Lead not found");
}

#[tokio::test]
async fn update_through_mcp_merges() {
    let relay = start(StubGenerator::new(JOHN)).await;
    let (_, created) = post(
        &relay.mcp_url,
        json!({
            "command": "createLead",
            "data": {
                "name": "Ann",
                "source": "social media",
                "contact": { "email": "ann@example.com" },
                "interestedProducts": ["C"]
            }
        }),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = post(
        &relay.mcp_url,
        json!({ "command": "updateLeadById", "id": id.clone(), "data": { "status": "Contacted" } }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Lead updated successfully");

    let lookup = json!({ "command": "getLeadById", "id": id.clone() });
    let (status, lead) = post(&relay.mcp_url, lookup).await;
    assert_eq!(status, 200);
    assert_eq!(lead["id"], id.as_str());
    assert_eq!(lead["status"], "Contacted");
    assert_eq!(lead["name"], "Ann");
}
