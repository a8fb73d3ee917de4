use super::interface::StorageResolver;

use crate::error::{ForumError, ForumResult};
use ::log::{debug, warn};
use ::reqwest::Client;
use ::serde::{Deserialize, Serialize};
use ::std::time::Duration;

#[derive(Debug, Serialize)]
struct FileRequest<'a> {
    fileid: &'a str,
    max_age: u32,
}

#[derive(Debug, Serialize)]
struct BatchDownloadRequest<'a> {
    env: &'a str,
    file_list: Vec<FileRequest<'a>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct FileResponse {
    pub fileid: String,
    pub download_url: String,
    pub status: i32,
    pub errmsg: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct BatchDownloadResponse {
    pub errcode: i32,
    pub errmsg: String,
    pub file_list: Vec<FileResponse>,
}

pub(crate) fn download_url(
    storage_id: &str,
    response: BatchDownloadResponse,
) -> ForumResult<String> {
    if response.errcode != 0 {
        return Err(ForumError::Provider(format!(
            "batchdownloadfile errcode {}: {}",
            response.errcode, response.errmsg
        )));
    }

    let file = response.file_list.into_iter().next().ok_or_else(|| {
        ForumError::Provider(format!("no download url for {}", storage_id))
    })?;

    if file.status != 0 {
        return Err(ForumError::Provider(format!(
            "cannot resolve {}: status {} {}",
            storage_id, file.status, file.errmsg
        )));
    }

    if file.download_url.is_empty() {
        return Err(ForumError::Provider(format!(
            "empty download url for {}",
            storage_id
        )));
    }

    Ok(file.download_url)
}

pub(crate) struct WeChatCloudStorage {
    batch_download_url: ::url::Url,
    env_id: String,
    max_age: u32,
    client: Client,
}

impl WeChatCloudStorage {
    pub(crate) fn new(
        api_base: &str,
        env_id: String,
        max_age: u32,
        timeout: Duration,
    ) -> ::anyhow::Result<Self> {
        Ok(WeChatCloudStorage {
            batch_download_url: crate::utils::api_endpoint(
                api_base,
                "tcb/batchdownloadfile",
            )?,
            env_id,
            max_age,
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait::async_trait]
impl StorageResolver for WeChatCloudStorage {
    async fn resolve(&self, storage_id: &str) -> ForumResult<String> {
        let response: BatchDownloadResponse = self
            .client
            .post(self.batch_download_url.clone())
            .json(&BatchDownloadRequest {
                env: &self.env_id,
                file_list: vec![FileRequest {
                    fileid: storage_id,
                    max_age: self.max_age,
                }],
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match download_url(storage_id, response) {
            Ok(url) => {
                debug!("resolved storage id {}", storage_id);
                Ok(url)
            }
            Err(err) => {
                warn!("storage resolution failed: {}", err);
                Err(err)
            }
        }
    }
}
