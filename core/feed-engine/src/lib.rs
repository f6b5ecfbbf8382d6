//! Feed engine for the Hypeline client core
//!
//! Builds personalized feed pages from the content store:
//! - [`stratified`]: time-stratified fetching across four recency bands with
//!   rotating follower sampling
//! - [`diversity`]: creator-diversity reordering with a no-repeat window
//! - [`discovery`]: session feeds that never dead-end, replaying shuffled
//!   history once the store is exhausted
//! - [`hype`]: the engagement economy helpers (hype rating regeneration and
//!   progressive-tap milestones)
//!
//! All state is session-scoped and in-memory; the only external collaborator
//! is the [`content_store::ContentStore`] gateway. Store failures degrade to
//! shorter pages inside the engine, so no public operation here returns an
//! error.

pub mod config;
pub mod discovery;
pub mod diversity;
pub mod hype;
pub mod session;
pub mod stratified;

pub use config::FeedConfig;
pub use discovery::{DiscoveryFeed, FollowingFeed};
pub use diversity::{diversify, diversify_with_rng, diversify_with_window};
pub use session::FeedSession;
pub use stratified::{fetch_stratified, AgeBand, RotationCursor, StratifiedPage, AGE_BANDS};
