use crate::config::Config;

use self::interface::ContentSafetyProvider;
pub(crate) mod interface;

pub(crate) mod wechat;

pub(crate) fn make_provider(
    config: &Config,
) -> ::anyhow::Result<Box<dyn ContentSafetyProvider>> {
    match config.moderation_interface.as_str() {
        "wechat" => Ok(Box::new(wechat::WeChatContentSafety::new(
            &config.wechat_api_base,
            ::std::time::Duration::from_secs(config.provider_timeout_seconds),
        )?)),
        interface => Err(::anyhow::anyhow!(
            "Unknown moderation interface: {}",
            interface
        )),
    }
}
