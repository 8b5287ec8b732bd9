pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod guard;
pub mod sitemap;
pub mod ui;
pub mod wizard;

pub use db::DbPool;

use config::Config;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::api::auth::SessionEvent;
use crate::wizard::{ContactForm, SellCarForm, Wizard, WizardForm};

/// A server-side wizard plus the time of its last form post, so abandoned
/// sessions can be swept out.
pub struct WizardSession<F: WizardForm> {
    pub wizard: Wizard<F>,
    pub touched_at: Instant,
}

impl<F: WizardForm> WizardSession<F> {
    pub fn new(wizard: Wizard<F>) -> Self {
        Self {
            wizard,
            touched_at: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.touched_at = Instant::now();
    }
}

impl<F: WizardForm> Default for WizardSession<F> {
    fn default() -> Self {
        Self::new(Wizard::new())
    }
}

/// Anonymous wizard sessions are kept server-side, keyed by a cookie id
/// (contact wizards by cookie id plus car id).
pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    /// Login/logout notifications; open admin pages subscribe to this.
    pub session_events: broadcast::Sender<SessionEvent>,
    pub sell_wizards: DashMap<String, WizardSession<SellCarForm>>,
    pub contact_wizards: DashMap<String, WizardSession<ContactForm>>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let (session_events, _) = broadcast::channel(64);
        Self {
            config,
            db,
            session_events,
            sell_wizards: DashMap::new(),
            contact_wizards: DashMap::new(),
        }
    }

    /// Drop wizard sessions idle longer than `max_age`.
    pub fn evict_stale_wizards(&self, max_age: Duration) {
        self.sell_wizards
            .retain(|_, session| session.touched_at.elapsed() < max_age);
        self.contact_wizards
            .retain(|_, session| session.touched_at.elapsed() < max_age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_wizard_sessions_are_evicted() {
        let pool = db::init_test_pool().await;
        let state = AppState::new(Config::default(), pool);

        state.sell_wizards.insert(
            "stale".to_string(),
            WizardSession::new(Wizard::<SellCarForm>::new()),
        );
        state.contact_wizards.insert(
            "stale:1".to_string(),
            WizardSession::new(Wizard::<ContactForm>::new()),
        );
        tokio::time::sleep(Duration::from_millis(300)).await;
        state
            .sell_wizards
            .insert("fresh".to_string(), WizardSession::default());

        state.evict_stale_wizards(Duration::from_millis(150));

        assert!(state.sell_wizards.contains_key("fresh"));
        assert!(!state.sell_wizards.contains_key("stale"));
        assert!(state.contact_wizards.is_empty());
    }
}
