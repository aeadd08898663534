//! Account directory client (user activity and lock state).

use crate::{endpoint, ensure_success};
use async_trait::async_trait;
use deskbot_core::{error::DeskbotError, traits::AccountDirectory};
use serde::Deserialize;
use tracing::debug;

const SERVICE: &str = "account directory";

pub struct DirectoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn get_flag<T>(&self, path: String) -> Result<T, DeskbotError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = endpoint(&self.base_url, &path);
        debug!("directory: GET {url}");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DeskbotError::collaborator(SERVICE, format!("request failed: {e}")))?;

        ensure_success(SERVICE, resp)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DeskbotError::collaborator(SERVICE, format!("malformed response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActiveResponse {
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LockedResponse {
    pub locked: bool,
}

/// Directory path for one of a user's flags, with the id percent-encoded as a
/// single segment.
fn user_flag_path(user_id: &str, flag: &str) -> String {
    format!("users/{}/{flag}", urlencoding::encode(user_id))
}

#[async_trait]
impl AccountDirectory for DirectoryClient {
    async fn is_user_active(&self, user_id: &str) -> Result<bool, DeskbotError> {
        let parsed: ActiveResponse = self
            .get_flag(user_flag_path(user_id, "active"))
            .await?;
        Ok(parsed.active)
    }

    async fn is_account_locked(&self, user_id: &str) -> Result<bool, DeskbotError> {
        let parsed: LockedResponse = self
            .get_flag(user_flag_path(user_id, "locked"))
            .await?;
        Ok(parsed.locked)
    }
}
