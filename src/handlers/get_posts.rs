use crate::{
    context::RequestContext,
    model::{PostListQuery, PostSort},
};

#[derive(::serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Query {
    page: Option<u32>,
    page_size: Option<u32>,
    category: Option<String>,
    sort: Option<PostSort>,
}

pub(crate) async fn handler(
    state: ::std::sync::Arc<crate::State>,
    context: RequestContext,
    query: Query,
) -> Result<Box<dyn ::warp::Reply>, ::warp::Rejection> {
    let query = PostListQuery::new(
        query.page,
        query.page_size,
        query.category,
        query.sort,
    );

    let mut page = crate::warp_try_forum!(state.posts.list(&query).await);
    state.likes.mark_liked(&context, &mut page.list).await;

    Ok(super::util::success(&page))
}
