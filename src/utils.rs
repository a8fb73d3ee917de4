/// Resolve `path` against an API base such as `http://api.weixin.qq.com`.
/// A base with a path prefix keeps that prefix.
pub(crate) fn api_endpoint(
    base: &str,
    path: &str,
) -> Result<::url::Url, ::url::ParseError> {
    let mut base = ::url::Url::parse(base)?;

    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }

    base.join(path.trim_start_matches('/'))
}

/// First `max_chars` characters of `content`, with `...` appended when cut.
pub(crate) fn excerpt(content: &str, max_chars: usize) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(max_chars).collect();

    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
