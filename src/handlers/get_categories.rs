pub(crate) async fn handler(
    state: ::std::sync::Arc<crate::State>,
) -> Result<Box<dyn ::warp::Reply>, ::warp::Rejection> {
    let categories = crate::warp_try_forum!(state.posts.categories().await);

    Ok(super::util::success(&categories))
}
