pub(crate) mod interface;
pub(crate) mod wechat_cloud;

use crate::config::Config;
use ::anyhow::Result;
use ::std::time::Duration;

pub(crate) fn make_resolver(
    config: &Config,
) -> Result<Box<dyn interface::StorageResolver>> {
    match config.storage_interface.as_str() {
        "wechat" => Ok(Box::new(wechat_cloud::WeChatCloudStorage::new(
            &config.wechat_api_base,
            config.wechat_env_id.clone(),
            config.download_url_max_age,
            Duration::from_secs(config.storage_timeout_seconds),
        )?)),
        interface => {
            Err(anyhow::anyhow!("Unknown storage interface: {}", interface))
        }
    }
}
