pub(crate) mod delete_post;
pub(crate) mod get_categories;
pub(crate) mod get_comments;
pub(crate) mod get_health;
pub(crate) mod get_post;
pub(crate) mod get_posts;
pub(crate) mod post_comments;
pub(crate) mod post_like;
pub(crate) mod post_media_check_callback;
pub(crate) mod post_posts;
pub(crate) mod util;
