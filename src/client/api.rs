//! HTTP client for the session and room endpoints

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use crate::game::{RoomId, UserId};

/// Anonymous session returned by `POST /auth/anonymous`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: UserId,
    pub token: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedRoom {
    room_id: RoomId,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// WebSocket URL for joining `room_id` with `token`
    pub fn room_ws_url(&self, room_id: &str, token: &str) -> String {
        let ws_base = self
            .base_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{}/rooms/{}/ws?token={}", ws_base, room_id, token)
    }

    pub async fn login_anonymous(&self) -> Result<Session, ApiError> {
        let response = self
            .client
            .post(format!("{}/auth/anonymous", self.base_url))
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn create_room(&self, token: &str) -> Result<RoomId, ApiError> {
        let response = self
            .client
            .post(format!("{}/rooms", self.base_url))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;
        let created: CreatedRoom = Self::parse(response).await?;
        Ok(created.room_id)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(ApiError::Parse)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(reqwest::Error),
}
