//! Load generator: concurrent command traffic against a running MCP service.
//! Even-numbered clients list leads; odd ones create a lead, then fetch it by the returned id.
//! Target: `$LEADRELAY_LOAD_URL`, else the configured MCP execute URL.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use leadrelay_core::{Command, CommandEnvelope, RelayConfig};
use reqwest::Client;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

const CONCURRENT_CLIENTS: usize = 10;
const REQUESTS_PER_CLIENT: usize = 5;

fn target() -> (String, Option<Duration>) {
    let config = RelayConfig::load().ok();
    let timeout = config.as_ref().and_then(RelayConfig::http_timeout);
    if let Ok(url) = std::env::var("LEADRELAY_LOAD_URL") {
        return (url, timeout);
    }
    let url = match config {
        Some(config) => config
            .agent
            .mcp_url
            .unwrap_or_else(|| format!("http://{}:{}/execute", config.host, config.mcp.port)),
        None => "http://127.0.0.1:6000/execute".to_string(),
    };
    (url, timeout)
}

fn synthetic_lead(client_id: usize, n: usize) -> Map<String, Value> {
    Map::from_iter([
        ("name".to_string(), json!(format!("Load {}-{}", client_id, n))),
        ("source".to_string(), json!("load-test")),
        (
            "contact".to_string(),
            json!({ "email": format!("load{}.{}@example.com", client_id, n) }),
        ),
        ("interestedProducts".to_string(), json!(["load test"])),
        ("notes".to_string(), json!("synthetic")),
    ])
}

#[derive(Clone)]
struct Tally {
    success: Arc<AtomicU32>,
    failure: Arc<AtomicU32>,
    latencies: Arc<RwLock<Vec<u64>>>,
}

impl Tally {
    fn new() -> Self {
        Self {
            success: Arc::new(AtomicU32::new(0)),
            failure: Arc::new(AtomicU32::new(0)),
            latencies: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Send one command; a 2xx reply counts as success and yields its body.
    async fn send(
        &self,
        client: &Client,
        url: &str,
        client_id: usize,
        command: Command,
    ) -> Option<Value> {
        let kind = command.kind();
        let envelope = CommandEnvelope::from(command);
        let start = Instant::now();
        let res = client.post(url).json(&envelope).send().await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match res {
            Ok(resp) if resp.status().is_success() => {
                self.success.fetch_add(1, Ordering::Relaxed);
                self.latencies.write().await.push(elapsed_ms);
                resp.json().await.ok()
            }
            Ok(resp) => {
                eprintln!("[load-gen] client {} {} got {}", client_id, kind, resp.status());
                self.failure.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                eprintln!("[load-gen] client {} {} failed: {}", client_id, kind, e);
                self.failure.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }
}

async fn run_client(tally: Tally, client: Client, url: String, client_id: usize) {
    for n in 0..REQUESTS_PER_CLIENT {
        if client_id % 2 == 0 {
            tally.send(&client, &url, client_id, Command::GetLeads).await;
            continue;
        }
        let create = Command::CreateLead {
            data: synthetic_lead(client_id, n),
        };
        let Some(created) = tally.send(&client, &url, client_id, create).await else {
            continue;
        };
        match created.get("id").and_then(Value::as_str) {
            Some(id) => {
                let read_back = Command::GetLeadById { id: id.to_string() };
                tally.send(&client, &url, client_id, read_back).await;
            }
            None => eprintln!("[load-gen] client {} create reply had no id", client_id),
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let (url, timeout) = target();
    println!(
        "[load-gen] {} clients x {} rounds -> {}",
        CONCURRENT_CLIENTS, REQUESTS_PER_CLIENT, url
    );

    let client = match leadrelay_core::http::client(timeout) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("[load-gen] HTTP client setup failed: {}", e);
            std::process::exit(1);
        }
    };
    let tally = Tally::new();

    let tasks = (0..CONCURRENT_CLIENTS).map(|client_id| {
        tokio::spawn(run_client(tally.clone(), client.clone(), url.clone(), client_id))
    });
    join_all(tasks).await;

    let s = tally.success.load(Ordering::Relaxed);
    let f = tally.failure.load(Ordering::Relaxed);
    let total = s + f;
    let success_rate = if total > 0 {
        (s as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    let latencies = tally.latencies.read().await;
    let avg_ms = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
    };
    let max_ms = latencies.iter().copied().max().unwrap_or(0);

    println!(
        "[load-gen] success {:.1}% | avg {:.0} ms | max {} ms",
        success_rate, avg_ms, max_ms
    );
    println!("[load-gen] total {} | ok {} | failed {}", total, s, f);
}
