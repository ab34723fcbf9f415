/// Read-only OneDrive queries issued once a session is established
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;
use crate::providers::CloudProvider;
use crate::types::{DriveItem, DriveListing, TokenSet};

pub const ME_PATH: &str = "me";
pub const ROOT_CHILDREN_PATH: &str = "me/drive/root/children";

pub struct DriveClient {
    provider: Arc<dyn CloudProvider>,
    access_token: String,
}

impl DriveClient {
    pub fn new(provider: Arc<dyn CloudProvider>, token: &TokenSet) -> Self {
        Self {
            provider,
            access_token: token.access_token.clone(),
        }
    }

    /// Basic info about the signed-in account
    pub async fn me(&self) -> Result<Value> {
        self.provider.get_json(ME_PATH, &self.access_token).await
    }

    /// Folders and files at the root of the drive
    pub async fn root_children(&self) -> Result<Vec<DriveItem>> {
        let body = self
            .provider
            .get_json(ROOT_CHILDREN_PATH, &self.access_token)
            .await?;
        let listing: DriveListing = serde_json::from_value(body)?;
        tracing::debug!("Drive root has {} items", listing.value.len());
        Ok(listing.value)
    }
}
