//! HTTP transport for the client state machines

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{AdminBackend, UserBackend};
use crate::{
    error::{AppError, AppResult, ErrorResponse},
    models::{Borrowing, Item, LookupResult, ScanStatus, UserShort},
    services::scan::ProcessScan,
};

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginReply {
    token: String,
    user: UserShort,
}

#[derive(Serialize)]
struct LookupBody {
    user_id: i64,
    item_id: i64,
}

#[derive(Serialize)]
struct CancelBody {
    user_id: i64,
}

#[derive(Deserialize)]
struct StatusReply {
    status: ScanStatus,
}

/// Authenticated connection to a Gearloan server's `/api/v1`
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: String,
    user: UserShort,
}

impl HttpBackend {
    /// Log in and keep the bearer token for subsequent calls
    pub async fn login(base_url: &str, email: &str, password: &str) -> AppResult<Self> {
        let client = Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let request = client
            .post(format!("{}/auth/login", base_url))
            .json(&LoginBody { email, password });
        let reply: LoginReply = send(request).await?;

        Ok(Self {
            client,
            base_url,
            token: reply.token,
            user: reply.user,
        })
    }

    pub fn user(&self) -> &UserShort {
        &self.user
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
    }
}

/// Send a request and decode either the expected body or the error body
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> AppResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("Request failed: {}", e)))?;

    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| AppError::Internal(format!("Unexpected response body: {}", e)));
    }

    match response.json::<ErrorResponse>().await {
        Ok(body) => Err(AppError::from_response(status.as_u16(), body)),
        Err(_) => Err(AppError::Internal(format!("HTTP {}", status))),
    }
}

#[async_trait]
impl AdminBackend for HttpBackend {
    async fn lookup(&self, user_id: i64, item_id: i64) -> AppResult<LookupResult> {
        send(self.post("/admin/scan/lookup").json(&LookupBody { user_id, item_id })).await
    }

    async fn cancel_scan(&self, user_id: i64) -> AppResult<()> {
        let _: serde_json::Value =
            send(self.post("/admin/scan/cancel").json(&CancelBody { user_id })).await?;
        Ok(())
    }

    async fn process_scan(&self, request: &ProcessScan) -> AppResult<Borrowing> {
        send(self.post("/admin/scan").json(request)).await
    }
}

#[async_trait]
impl UserBackend for HttpBackend {
    fn user_id(&self) -> i64 {
        self.user.id
    }

    async fn fetch_item(&self, item_id: i64) -> AppResult<Item> {
        send(self.get(&format!("/items/{}", item_id))).await
    }

    async fn check_status(&self) -> AppResult<ScanStatus> {
        let reply: StatusReply = send(self.get("/user/scan/check-status")).await?;
        Ok(reply.status)
    }

    async fn cancel_own_scan(&self) -> AppResult<()> {
        let _: serde_json::Value = send(self.post("/user/scan/cancel")).await?;
        Ok(())
    }
}
