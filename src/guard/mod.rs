//! Role-gated route guard.
//!
//! Access to protected pages is decided by one pure-ish function returning
//! an explicit outcome; callers perform the navigation. Nothing here
//! renders, so the policy is testable and there is no window where
//! protected content leaks before a redirect.
//!
//! Failure semantics: any database error during the session or role lookup
//! is a denial, never a crash on a protected page.

use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::api::auth::{self, SessionEvent};

/// Where unauthenticated visitors are sent.
pub const LOGIN_ROUTE: &str = "/login";
/// Where authenticated visitors with the wrong role are sent.
pub const HOME_ROUTE: &str = "/";

/// The explicit outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted { user_id: String, role: String },
    Redirect(&'static str),
}

impl AccessDecision {
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            AccessDecision::Granted { .. } => None,
            AccessDecision::Redirect(target) => Some(target),
        }
    }
}

/// Derive the access decision for a request.
///
/// No token or no live session redirects to the login page. A role
/// requirement that the user does not meet redirects home. A failed role
/// lookup counts as "no session".
pub async fn check_access(
    pool: &SqlitePool,
    token: Option<&str>,
    required_role: Option<&str>,
) -> AccessDecision {
    let Some(token) = token else {
        return AccessDecision::Redirect(LOGIN_ROUTE);
    };

    let user = match auth::get_current_user(pool, token).await {
        Ok(user) => user,
        Err(_) => return AccessDecision::Redirect(LOGIN_ROUTE),
    };

    if let Some(required) = required_role {
        if user.role != required {
            tracing::warn!(
                user_id = %user.id,
                required_role = required,
                "access denied: role mismatch"
            );
            return AccessDecision::Redirect(HOME_ROUTE);
        }
    }

    AccessDecision::Granted {
        user_id: user.id,
        role: user.role,
    }
}

/// Re-runs the access check on every published session event, for one
/// fixed token and role requirement.
///
/// The latest check is authoritative: events that arrive while a check is
/// in progress supersede its result, so a stale check can never overwrite
/// a newer one. Dropping the watcher drops its subscription.
pub struct AccessWatcher {
    pool: SqlitePool,
    events: broadcast::Receiver<SessionEvent>,
    token: Option<String>,
    required_role: Option<String>,
}

impl AccessWatcher {
    pub fn new(
        pool: SqlitePool,
        events: broadcast::Receiver<SessionEvent>,
        token: Option<String>,
        required_role: Option<String>,
    ) -> Self {
        Self {
            pool,
            events,
            token,
            required_role,
        }
    }

    /// Current decision, independent of any event.
    pub async fn current(&self) -> AccessDecision {
        check_access(&self.pool, self.token.as_deref(), self.required_role.as_deref()).await
    }

    /// Wait for the next session event and return the freshest decision
    /// after it. Returns `None` once the event channel closes.
    pub async fn next_decision(&mut self) -> Option<AccessDecision> {
        loop {
            match self.events.recv().await {
                Ok(_) => {}
                // Missed events still mean "something changed"
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
            self.drain_pending();

            loop {
                let decision = self.current().await;
                if self.superseded() {
                    // A newer event arrived during the check; its state is
                    // what counts, so discard this result and re-check.
                    self.drain_pending();
                    continue;
                }
                return Some(decision);
            }
        }
    }

    fn drain_pending(&mut self) {
        while self.events.try_recv().is_ok() {}
    }

    fn superseded(&mut self) -> bool {
        match self.events.try_recv() {
            Ok(_) => true,
            Err(broadcast::error::TryRecvError::Lagged(_)) => true,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::{create_session, destroy_session, ensure_admin_user};
    use crate::db;
    use crate::db::User;

    async fn admin_pool() -> (SqlitePool, User) {
        let pool = db::init_test_pool().await;
        ensure_admin_user(&pool, "admin@test.local", "s3cret-pass").await.unwrap();
        let admin: User = sqlx::query_as("SELECT * FROM users WHERE role = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
        (pool, admin)
    }

    async fn client_user(pool: &SqlitePool) -> User {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO users (id, email, password_hash, role) VALUES (?, 'c@test.local', 'x', 'client')")
            .bind(&id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn no_session_redirects_to_login() {
        let (pool, _) = admin_pool().await;
        let decision = check_access(&pool, None, Some("admin")).await;
        assert_eq!(decision, AccessDecision::Redirect(LOGIN_ROUTE));
    }

    #[tokio::test]
    async fn unknown_token_redirects_to_login() {
        let (pool, _) = admin_pool().await;
        let decision = check_access(&pool, Some("bogus"), Some("admin")).await;
        assert_eq!(decision, AccessDecision::Redirect(LOGIN_ROUTE));
    }

    #[tokio::test]
    async fn wrong_role_redirects_home() {
        let (pool, _) = admin_pool().await;
        let client = client_user(&pool).await;
        let token = create_session(&pool, &client.id, 7).await.unwrap();

        let decision = check_access(&pool, Some(&token), Some("admin")).await;
        assert_eq!(decision, AccessDecision::Redirect(HOME_ROUTE));
    }

    #[tokio::test]
    async fn matching_role_is_granted() {
        let (pool, admin) = admin_pool().await;
        let token = create_session(&pool, &admin.id, 7).await.unwrap();

        let decision = check_access(&pool, Some(&token), Some("admin")).await;
        assert_eq!(
            decision,
            AccessDecision::Granted {
                user_id: admin.id,
                role: "admin".to_string()
            }
        );
    }

    #[tokio::test]
    async fn any_authenticated_user_passes_without_role_requirement() {
        let (pool, _) = admin_pool().await;
        let client = client_user(&pool).await;
        let token = create_session(&pool, &client.id, 7).await.unwrap();

        let decision = check_access(&pool, Some(&token), None).await;
        assert!(matches!(decision, AccessDecision::Granted { .. }));
    }

    #[tokio::test]
    async fn lookup_failure_denies_instead_of_crashing() {
        let (pool, admin) = admin_pool().await;
        let token = create_session(&pool, &admin.id, 7).await.unwrap();
        pool.close().await;

        let decision = check_access(&pool, Some(&token), Some("admin")).await;
        assert_eq!(decision, AccessDecision::Redirect(LOGIN_ROUTE));
    }

    #[tokio::test]
    async fn watcher_tracks_session_revocation() {
        let (pool, admin) = admin_pool().await;
        let token = create_session(&pool, &admin.id, 7).await.unwrap();

        let (tx, rx) = broadcast::channel(16);
        let mut watcher = AccessWatcher::new(
            pool.clone(),
            rx,
            Some(token.clone()),
            Some("admin".to_string()),
        );
        assert!(matches!(watcher.current().await, AccessDecision::Granted { .. }));

        destroy_session(&pool, &token).await.unwrap();
        tx.send(SessionEvent::SignedOut {
            user_id: admin.id.clone(),
        })
        .unwrap();

        let decision = watcher.next_decision().await.unwrap();
        assert_eq!(decision, AccessDecision::Redirect(LOGIN_ROUTE));
    }

    #[tokio::test]
    async fn rapid_events_resolve_to_the_latest_state() {
        let (pool, admin) = admin_pool().await;
        let token = create_session(&pool, &admin.id, 7).await.unwrap();

        let (tx, rx) = broadcast::channel(16);
        let mut watcher =
            AccessWatcher::new(pool.clone(), rx, Some(token.clone()), Some("admin".to_string()));

        // A burst of notifications; only the state after the last matters.
        for _ in 0..5 {
            tx.send(SessionEvent::SignedIn {
                user_id: admin.id.clone(),
            })
            .unwrap();
        }
        destroy_session(&pool, &token).await.unwrap();
        tx.send(SessionEvent::SignedOut {
            user_id: admin.id.clone(),
        })
        .unwrap();

        let decision = watcher.next_decision().await.unwrap();
        assert_eq!(decision, AccessDecision::Redirect(LOGIN_ROUTE));
    }

    #[tokio::test]
    async fn watcher_ends_when_the_channel_closes() {
        let (pool, _) = admin_pool().await;
        let (tx, rx) = broadcast::channel(16);
        let mut watcher = AccessWatcher::new(pool, rx, None, None);
        drop(tx);
        assert!(watcher.next_decision().await.is_none());
    }
}
