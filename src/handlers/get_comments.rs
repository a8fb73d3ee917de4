pub(crate) async fn handler(
    post_id: i64,
    state: ::std::sync::Arc<crate::State>,
) -> Result<Box<dyn ::warp::Reply>, ::warp::Rejection> {
    let comments = crate::warp_try_forum!(state.comments.list(post_id).await);

    Ok(super::util::success(&comments))
}
