//! Feed interaction model.
//!
//! A [`FeedList`] holds one tab's pages as [`FeedItem`]s. Each item owns the
//! optimistic like/repost/bookmark state of its post, its view tracker and
//! its lazily loaded [`CommentThread`].
//!
//! Network-facing operations come in two phases (`begin_*` returns a ticket,
//! `finish_*` applies the response) so a host can run requests concurrently.
//! The async helpers run both phases back to back.

pub mod comments;
pub mod counters;
pub mod item;
pub mod list;
pub mod view;

pub use comments::{CommentLoad, CommentSubmit, CommentThread, LoadState, ReplyPolicy};
pub use counters::PendingToggle;
pub use item::FeedItem;
pub use list::{FeedList, PageRequest, FEED_ERROR};
pub use view::{ViewState, ViewTracker, VIEW_THRESHOLD};
