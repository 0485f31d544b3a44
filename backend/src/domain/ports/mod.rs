//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`, [`UserDirectory`]) are implemented
//! by domain services. Driven ports (`*Repository`) are implemented by the
//! adapters under `crate::outbound`.

mod macros;
pub(crate) use macros::define_port_error;

mod content_repository;
mod feed_command;
mod feed_query;
mod karma_ledger_repository;
mod leaderboard_query;
mod like_ledger_repository;
mod like_toggle_command;
mod user_directory;
mod user_repository;

#[cfg(test)]
pub use content_repository::MockContentRepository;
pub use content_repository::{
    ContentRepository, ContentRepositoryError, FixtureContentRepository,
};
#[cfg(test)]
pub use feed_command::MockFeedCommand;
pub use feed_command::{
    CreateCommentRequest, CreatePostRequest, DeleteCommentRequest, DeletePostRequest,
    FeedCommand, FixtureFeedCommand,
};
#[cfg(test)]
pub use feed_query::MockFeedQuery;
pub use feed_query::{FeedQuery, FixtureFeedQuery, PostThread};
#[cfg(test)]
pub use karma_ledger_repository::MockKarmaLedgerRepository;
pub use karma_ledger_repository::{
    FixtureKarmaLedgerRepository, KarmaLedgerRepository, KarmaLedgerRepositoryError,
};
#[cfg(test)]
pub use leaderboard_query::MockLeaderboardQuery;
pub use leaderboard_query::{FixtureLeaderboardQuery, LeaderboardQuery};
#[cfg(test)]
pub use like_ledger_repository::{MockLikeLedgerRepository, MockLikeLedgerTransaction};
pub use like_ledger_repository::{
    FixtureLikeLedgerRepository, FixtureLikeLedgerTransaction, LikeLedgerRepository,
    LikeLedgerRepositoryError, LikeLedgerTransaction,
};
#[cfg(test)]
pub use like_toggle_command::MockLikeToggleCommand;
pub use like_toggle_command::{FixtureLikeToggleCommand, LikeToggleCommand, ToggleLikeRequest};
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{FixtureUserDirectory, RegisterUserRequest, UserDirectory};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{FixtureUserRepository, UserRepository, UserRepositoryError};
