//! Integration tests for the observer API.
//!
//! Tests drive the router via `tower::ServiceExt` without a TCP server,
//! with the kernel stores populated directly.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use observatory_agents::MessageBus;
use observatory_agents::messaging::Delivery;
use observatory_economy::TransactionLog;
use observatory_ledger::{EventLedger, ReplayEngine};
use observatory_observer::{ObserverState, build_router};
use observatory_types::{AgentStatus, EventDraft, ResourceKind};
use observatory_world::{Agent, ResourcePool, WorldState};

struct Fixture {
    state: Arc<ObserverState>,
    state_path: PathBuf,
    ledger_path: PathBuf,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.state_path);
        let _ = std::fs::remove_file(&self.ledger_path);
    }
}

fn fixture(name: &str) -> Fixture {
    let mut state_path = std::env::temp_dir();
    state_path.push(format!("observatory-obs-{}-{name}.json", std::process::id()));
    let mut ledger_path = std::env::temp_dir();
    ledger_path.push(format!("observatory-obs-{}-{name}.jsonl", std::process::id()));
    let _ = std::fs::remove_file(&state_path);
    let _ = std::fs::remove_file(&ledger_path);

    let world = Arc::new(WorldState::new(&state_path));
    let ledger = Arc::new(EventLedger::open(&ledger_path));
    let replay = Arc::new(ReplayEngine::new(Arc::clone(&ledger)));

    Fixture {
        state: Arc::new(ObserverState {
            world,
            ledger,
            replay,
            accounting: Arc::new(TransactionLog::new()),
            messages: Arc::new(MessageBus::with_seed(5)),
        }),
        state_path,
        ledger_path,
    }
}

fn router(fx: &Fixture) -> Router {
    build_router(Arc::clone(&fx.state))
}

async fn body_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

fn add_agent(fx: &Fixture, agent_id: &str, region: &str, status: AgentStatus) {
    fx.state.world.insert_agent(Agent {
        agent_id: agent_id.to_owned(),
        display_name: agent_id.to_owned(),
        public_key: format!("secret_pk_{agent_id}"),
        region: region.to_owned(),
        resources: ResourcePool::create_default(),
        status,
        owner_identity: None,
        claim_token: Some(String::from("secret-token")),
        claim_token_expires: Some(1e12),
        alliances: Vec::new(),
        created_at_tick: 0,
        died_at_tick: None,
        parent_agent: None,
    });
}

fn append_event(fx: &Fixture, tick: u64, action: &str, agent: &str, details: Value) {
    fx.state.ledger.append(EventDraft {
        tick,
        action_type: action.to_owned(),
        agent_id: agent.to_owned(),
        success: true,
        details,
        error: None,
    });
}

// =========================================================================
// Read-only enforcement
// =========================================================================

#[tokio::test]
async fn post_put_delete_are_405() {
    for method in ["POST", "PUT", "DELETE", "PATCH"] {
        let fx = fixture("methods");
        let request = Request::builder()
            .method(method)
            .uri("/api/observer/world/state")
            .body(Body::empty())
            .unwrap();
        let response = router(&fx).oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "{method} must be rejected"
        );
        let json = body_json(response.into_body()).await;
        assert_eq!(json["error"], "Observer API is read-only");
    }
}

#[tokio::test]
async fn get_requests_pass_the_guard() {
    let fx = fixture("guard");
    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/world/state")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =========================================================================
// World and agents
// =========================================================================

#[tokio::test]
async fn world_state_snapshot_shape() {
    let fx = fixture("worldstate");
    add_agent(&fx, "agent_a", "nexus", AgentStatus::Claimed);
    {
        let mut world = fx.state.world.lock();
        world.tick = 9;
    }

    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/world/state")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["tick"], 9);
    assert_eq!(json["regions"].as_object().unwrap().len(), 5);
    assert!(json["agents"]["agent_a"].is_object());
    assert_eq!(json["stats"]["pending_trades"], 0);
}

#[tokio::test]
async fn agent_views_elide_secrets() {
    let fx = fixture("secrets");
    add_agent(&fx, "agent_a", "nexus", AgentStatus::Unclaimed);

    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/agents/agent_a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response.into_body()).await;
    assert_eq!(json["agent_id"], "agent_a");
    assert_eq!(json["status"], "unclaimed");
    assert!(json.get("public_key").is_none());
    assert!(json.get("claim_token").is_none());

    // The listing elides them too.
    let response = router(&fx)
        .oneshot(Request::get("/api/observer/agents").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert!(json["agent_a"].get("public_key").is_none());
}

#[tokio::test]
async fn missing_agent_is_404() {
    let fx = fixture("missing");
    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/agents/agent_ghost")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn regions_listing_includes_occupancy() {
    let fx = fixture("regions");
    add_agent(&fx, "agent_a", "forge", AgentStatus::Claimed);

    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/world/regions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["forge"]["agent_count"], 1);
    assert_eq!(json["forge"]["capacity"], 80);
    assert_eq!(json["void"]["danger_level"], 0.9);
}

// =========================================================================
// Ledger queries
// =========================================================================

#[tokio::test]
async fn ledger_events_filtering_and_cap() {
    let fx = fixture("events");
    append_event(&fx, 1, "register", "agent_a", json!({}));
    append_event(&fx, 2, "move", "agent_a", json!({}));
    append_event(&fx, 3, "move", "agent_b", json!({}));

    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/ledger/events?action_type=move&agent_id=agent_a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["events"][0]["tick"], 2);

    // Oversized limits are capped rather than honored.
    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/ledger/events?limit=999999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Event ids are monotone in query results.
    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/ledger/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    let ids: Vec<u64> = json["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_id"].as_u64().unwrap())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

// =========================================================================
// Analytics
// =========================================================================

#[tokio::test]
async fn analytics_summary_aggregates() {
    let fx = fixture("analytics");
    add_agent(&fx, "agent_a", "nexus", AgentStatus::Claimed);
    add_agent(&fx, "agent_b", "nexus", AgentStatus::Unclaimed);
    add_agent(&fx, "agent_c", "forge", AgentStatus::Claimed);
    {
        let mut world = fx.state.world.lock();
        world.kill_agent("agent_c", 4);
        world.tick = 7;
    }
    append_event(&fx, 1, "register", "agent_a", json!({}));
    fx.state
        .accounting
        .record_transfer(2, "agent_a", "agent_b", ResourceKind::Energy, 12.0, None);
    fx.state.messages.send_message(Delivery {
        tick: 3,
        from_agent: String::from("agent_a"),
        to_agent: String::from("agent_b"),
        content: String::from("ping"),
        noise_factor: 0.0,
        sender_region: String::from("nexus"),
        receiver_region: String::from("nexus"),
    });

    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/analytics/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["agents"]["total"], 3);
    assert_eq!(json["agents"]["alive"], 2);
    assert_eq!(json["agents"]["claimed"], 1);
    assert_eq!(json["agents"]["dead"], 1);
    assert_eq!(json["world"]["total_ticks"], 7);
    assert_eq!(json["world"]["total_events"], 1);
    assert_eq!(json["economy"]["trade_volume"]["energy"], 12.0);
    assert_eq!(json["communication"]["messages_sent"], 1);
}

// =========================================================================
// Replay and timelines
// =========================================================================

#[tokio::test]
async fn replay_reconstructs_historical_state() {
    let fx = fixture("replay");
    append_event(&fx, 1, "register", "agent_a", json!({"spawn_region": "nexus"}));
    append_event(
        &fx,
        3,
        "move",
        "agent_a",
        json!({"from_region": "nexus", "to_region": "forge"}),
    );
    append_event(&fx, 7, "death", "agent_a", json!({"cause": "energy_depletion"}));

    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/replay/5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["tick"], 5);
    assert_eq!(json["agents"]["agent_a"]["region"], "forge");
    assert_eq!(json["agents"]["agent_a"]["status"], "unclaimed");

    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/replay/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["agents"]["agent_a"]["status"], "dead");
    assert_eq!(json["agents"]["agent_a"]["died_at_tick"], 7);
}

#[tokio::test]
async fn timelines_are_scoped() {
    let fx = fixture("timeline");
    append_event(&fx, 1, "register", "agent_a", json!({}));
    append_event(&fx, 2, "register", "agent_b", json!({}));
    append_event(&fx, 3, "move", "agent_a", json!({}));

    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/timeline/agent_a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["agent_id"], "agent_a");
    assert_eq!(json["events"].as_array().unwrap().len(), 2);

    let response = router(&fx)
        .oneshot(
            Request::get("/api/observer/timeline?from=2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response.into_body()).await;
    assert_eq!(json["events"].as_array().unwrap().len(), 2);
}
