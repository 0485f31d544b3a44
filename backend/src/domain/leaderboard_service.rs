//! Leaderboard and karma total queries.
//!
//! Windows are resolved against the injected clock at query time, so the
//! same request issued later covers a later range.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{
    KarmaLedgerRepository, KarmaLedgerRepositoryError, LeaderboardQuery, UserRepository,
    UserRepositoryError,
};
use crate::domain::{Error, LeaderboardEntry, LeaderboardRequest, UserKarma, UserKarmaRequest};

/// Leaderboard service implementing the read-side driving port.
#[derive(Clone)]
pub struct LeaderboardService<K, U> {
    ledger: Arc<K>,
    users: Arc<U>,
    clock: Arc<dyn Clock>,
}

impl<K, U> LeaderboardService<K, U> {
    pub fn new(ledger: Arc<K>, users: Arc<U>, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            users,
            clock,
        }
    }
}

impl<K, U> LeaderboardService<K, U>
where
    K: KarmaLedgerRepository,
    U: UserRepository,
{
    fn map_ledger_error(error: KarmaLedgerRepositoryError) -> Error {
        match error {
            KarmaLedgerRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("karma ledger unavailable: {message}"))
            }
            KarmaLedgerRepositoryError::Query { message } => {
                Error::internal(format!("karma ledger error: {message}"))
            }
        }
    }

    fn map_user_error(error: UserRepositoryError) -> Error {
        match error {
            UserRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("user repository unavailable: {message}"))
            }
            UserRepositoryError::Query { message } => {
                Error::internal(format!("user repository error: {message}"))
            }
            UserRepositoryError::DuplicateUsername { username } => {
                Error::internal(format!("unexpected username conflict: {username}"))
            }
        }
    }
}

#[async_trait]
impl<K, U> LeaderboardQuery for LeaderboardService<K, U>
where
    K: KarmaLedgerRepository,
    U: UserRepository,
{
    async fn top(&self, request: LeaderboardRequest) -> Result<Vec<LeaderboardEntry>, Error> {
        let window = request.span.window_ending_at(self.clock.utc());
        let rows = self
            .ledger
            .leaderboard(window, request.limit.get())
            .await
            .map_err(Self::map_ledger_error)?;
        debug!(
            start = %window.start,
            end = %window.end,
            rows = rows.len(),
            "leaderboard computed"
        );
        Ok(rows)
    }

    async fn user_karma(&self, request: UserKarmaRequest) -> Result<UserKarma, Error> {
        let exists = self
            .users
            .find_by_id(&request.user_id)
            .await
            .map_err(Self::map_user_error)?
            .is_some();
        if !exists {
            return Err(Error::not_found(format!(
                "user {} not found",
                request.user_id
            )));
        }

        let now = self.clock.utc();
        let window = request.span.map(|span| span.window_ending_at(now));
        let total = self
            .ledger
            .total_for_user(&request.user_id, window)
            .await
            .map_err(Self::map_ledger_error)?;
        Ok(UserKarma {
            user_id: request.user_id,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockKarmaLedgerRepository, MockUserRepository};
    use crate::domain::{
        ErrorCode, LeaderboardLimit, LeaderboardSpan, User, UserId, Username,
    };
    use chrono::{DateTime, Duration, Local, TimeZone, Utc};
    use rstest::rstest;

    struct FixtureClock(DateTime<Utc>);

    impl Clock for FixtureClock {
        fn local(&self) -> DateTime<Local> {
            self.0.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 18, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn make_service(
        ledger: MockKarmaLedgerRepository,
        users: MockUserRepository,
    ) -> LeaderboardService<MockKarmaLedgerRepository, MockUserRepository> {
        LeaderboardService::new(
            Arc::new(ledger),
            Arc::new(users),
            Arc::new(FixtureClock(now())),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn top_resolves_window_against_clock() {
        let winner = UserId::random();
        let mut ledger = MockKarmaLedgerRepository::new();
        ledger
            .expect_leaderboard()
            .times(1)
            .withf(|window, limit| {
                window.end == now() && window.start == now() - Duration::hours(6) && *limit == 3
            })
            .return_once(move |_, _| {
                Ok(vec![LeaderboardEntry {
                    user_id: winner,
                    username: "ada".to_owned(),
                    total: 25,
                }])
            });

        let request = LeaderboardRequest {
            span: LeaderboardSpan::from_hours(6).expect("valid span"),
            limit: LeaderboardLimit::new(3).expect("valid limit"),
        };
        let rows = make_service(ledger, MockUserRepository::new())
            .top(request)
            .await
            .expect("leaderboard");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total, 25);
    }

    #[rstest]
    #[tokio::test]
    async fn top_maps_connection_failure() {
        let mut ledger = MockKarmaLedgerRepository::new();
        ledger
            .expect_leaderboard()
            .return_once(|_, _| Err(KarmaLedgerRepositoryError::connection("refused")));

        let error = make_service(ledger, MockUserRepository::new())
            .top(LeaderboardRequest::default())
            .await
            .expect_err("unavailable");

        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(24))]
    #[tokio::test]
    async fn user_karma_passes_optional_window(#[case] hours: Option<i64>) {
        let user = User::new(UserId::random(), Username::new("grace").expect("valid"));
        let user_id = user.id;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .return_once(move |_| Ok(Some(user)));
        let mut ledger = MockKarmaLedgerRepository::new();
        ledger
            .expect_total_for_user()
            .times(1)
            .withf(move |id, window| {
                *id == user_id
                    && window.map(|w| w.end) == hours.map(|_| now())
                    && window.map(|w| w.start) == hours.map(|h| now() - Duration::hours(h))
            })
            .return_once(|_, _| Ok(6));

        let karma = make_service(ledger, users)
            .user_karma(UserKarmaRequest {
                user_id,
                span: hours.map(|h| LeaderboardSpan::from_hours(h).expect("valid span")),
            })
            .await
            .expect("karma");

        assert_eq!(karma, UserKarma { user_id, total: 6 });
    }

    #[rstest]
    #[tokio::test]
    async fn user_karma_rejects_unknown_user() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().return_once(|_| Ok(None));
        let mut ledger = MockKarmaLedgerRepository::new();
        ledger.expect_total_for_user().never();

        let error = make_service(ledger, users)
            .user_karma(UserKarmaRequest {
                user_id: UserId::random(),
                span: None,
            })
            .await
            .expect_err("unknown user");

        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}
