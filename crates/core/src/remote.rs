use crate::domain::{Action, Advance, BlueprintStatus, ExecutionStatus, Role, StructuringStatus};
use crate::fixtures::Seed;
use crate::store::{DashboardStore, EntityKind, RecommendationAdvance, StoreSnapshot};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleBody {
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBody<S> {
    pub status: S,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// The operations a presenter drives, acting as the store's current role.
#[async_trait::async_trait]
pub trait DashboardClient: Send + Sync {
    fn target(&self) -> String;

    async fn snapshot(&self) -> Result<StoreSnapshot>;

    async fn set_role(&self, role: Role) -> Result<()>;

    async fn advance_blueprint(&self, id: &str) -> Result<Advance<BlueprintStatus>>;

    async fn advance_recommendation(&self, id: &str) -> Result<RecommendationAdvance>;

    async fn advance_structuring(&self, id: &str) -> Result<Advance<StructuringStatus>>;

    async fn advance_execution(&self, id: &str) -> Result<Advance<ExecutionStatus>>;

    async fn reset(&self) -> Result<()>;
}

/// Drives a store living in this process.
#[derive(Debug, Clone)]
pub struct LocalDashboardClient {
    store: Arc<Mutex<DashboardStore>>,
    seed: Seed,
}

impl LocalDashboardClient {
    pub fn new(store: DashboardStore, seed: Seed) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            seed,
        }
    }
}

#[async_trait::async_trait]
impl DashboardClient for LocalDashboardClient {
    fn target(&self) -> String {
        "in-process".to_string()
    }

    async fn snapshot(&self) -> Result<StoreSnapshot> {
        Ok(self.store.lock().await.snapshot())
    }

    async fn set_role(&self, role: Role) -> Result<()> {
        self.store.lock().await.set_current_role(role);
        Ok(())
    }

    async fn advance_blueprint(&self, id: &str) -> Result<Advance<BlueprintStatus>> {
        let mut store = self.store.lock().await;
        store.authorize_advance(EntityKind::Blueprint, id)?;
        Ok(store.advance_blueprint(id)?)
    }

    async fn advance_recommendation(&self, id: &str) -> Result<RecommendationAdvance> {
        let mut store = self.store.lock().await;
        store.authorize_advance(EntityKind::Recommendation, id)?;
        Ok(store.advance_recommendation(id)?)
    }

    async fn advance_structuring(&self, id: &str) -> Result<Advance<StructuringStatus>> {
        let mut store = self.store.lock().await;
        store.authorize_advance(EntityKind::StructuringCase, id)?;
        Ok(store.advance_structuring(id)?)
    }

    async fn advance_execution(&self, id: &str) -> Result<Advance<ExecutionStatus>> {
        let mut store = self.store.lock().await;
        store.authorize_advance(EntityKind::ExecutionTicket, id)?;
        Ok(store.advance_execution(id)?)
    }

    async fn reset(&self) -> Result<()> {
        let mut store = self.store.lock().await;
        store.authorize(Action::ResetDemo)?;
        store.reset(self.seed.clone())
    }
}

/// Drives a running `wealthdesk_api` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDashboardClient {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl HttpDashboardClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let timeout_secs = std::env::var("WEALTHDESK_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("WEALTHDESK_API_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES)
            .max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build wealthdesk api http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let res = self.http.get(self.url(path)).send().await;
            match res {
                Ok(res) => return read_json(res).await,
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err).with_context(|| format!("GET {path} failed"));
                    }
                    let backoff = Duration::from_millis(250 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, error = %err, %path, "wealthdesk api unreachable; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    // Mutations are not retried: a lost response may still have been applied.
    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let mut req = self.http.request(method.clone(), self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        let res = req
            .send()
            .await
            .with_context(|| format!("{method} {path} failed"))?;
        read_json(res).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json::<(), T>(reqwest::Method::POST, path, None)
            .await
    }
}

async fn read_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T> {
    let status = res.status();
    let text = res
        .text()
        .await
        .context("failed to read wealthdesk api response")?;

    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .map(|e| e.error)
            .unwrap_or(text);
        anyhow::bail!("wealthdesk api HTTP {status}: {detail}");
    }

    serde_json::from_str::<T>(&text)
        .with_context(|| format!("unexpected wealthdesk api response: {text}"))
}

#[async_trait::async_trait]
impl DashboardClient for HttpDashboardClient {
    fn target(&self) -> String {
        self.base_url.clone()
    }

    async fn snapshot(&self) -> Result<StoreSnapshot> {
        self.get_json("/state").await
    }

    async fn set_role(&self, role: Role) -> Result<()> {
        let _: RoleBody = self
            .send_json(reqwest::Method::PUT, "/role", Some(&RoleBody { role }))
            .await?;
        Ok(())
    }

    async fn advance_blueprint(&self, id: &str) -> Result<Advance<BlueprintStatus>> {
        self.post(&format!("/blueprints/{id}/advance")).await
    }

    async fn advance_recommendation(&self, id: &str) -> Result<RecommendationAdvance> {
        self.post(&format!("/recommendations/{id}/advance")).await
    }

    async fn advance_structuring(&self, id: &str) -> Result<Advance<StructuringStatus>> {
        self.post(&format!("/structuring/{id}/advance")).await
    }

    async fn advance_execution(&self, id: &str) -> Result<Advance<ExecutionStatus>> {
        self.post(&format!("/executions/{id}/advance")).await
    }

    async fn reset(&self) -> Result<()> {
        let _: StoreSnapshot = self.post("/reset").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecommendationStatus;

    fn local() -> LocalDashboardClient {
        let store = DashboardStore::demo().unwrap();
        LocalDashboardClient::new(store, Seed::demo())
    }

    #[tokio::test]
    async fn local_client_enforces_role() {
        let client = local();
        // Default role is the relationship manager.
        let err = client.advance_execution("EXE-001").await.unwrap_err();
        assert!(err.to_string().contains("not permitted"));

        client.set_role(Role::Administrator).await.unwrap();
        let advance = client.advance_execution("EXE-001").await.unwrap();
        assert_eq!(advance.status(), ExecutionStatus::Processing);
    }

    #[tokio::test]
    async fn local_client_execution_creates_ticket() {
        let client = local();
        client.advance_recommendation("rec-003").await.unwrap();
        client.set_role(Role::FinancialAdvisor).await.unwrap();
        let step = client.advance_recommendation("rec-003").await.unwrap();

        assert_eq!(step.recommendation.status, RecommendationStatus::Executing);
        let ticket = step.ticket.unwrap();
        assert_eq!(ticket.recommendation_id, "rec-003");

        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.execution_tickets.len(), 3);
    }

    #[tokio::test]
    async fn local_reset_needs_admin() {
        let client = local();
        client.advance_blueprint("bp-002").await.unwrap();
        assert!(client.reset().await.is_err());

        client.set_role(Role::Administrator).await.unwrap();
        client.reset().await.unwrap();
        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.blueprints[1].status, BlueprintStatus::Draft);
    }

    #[test]
    fn http_client_trims_trailing_slash() {
        let client = HttpDashboardClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.url("/state"), "http://localhost:3000/state");
        assert_eq!(client.target(), "http://localhost:3000");
    }

    #[test]
    fn status_body_accepts_hyphenated_structuring() {
        let body: StatusBody<StructuringStatus> =
            serde_json::from_str(r#"{"status":"in-progress"}"#).unwrap();
        assert_eq!(body.status, StructuringStatus::InProgress);
    }
}
