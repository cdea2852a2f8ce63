use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, trace, warn};

use super::enrich::enrich_game;
use super::reconcile::{MatchEvent, ReconcilerState, reconcile};
use crate::aoe4::{Aoe4Api, Game, ProfileId};

/// Which profile to poll and whether polling is on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollTarget {
    pub profile_id: Option<ProfileId>,
    pub enabled: bool,
}

impl PollTarget {
    pub fn new(profile_id: Option<ProfileId>, enabled: bool) -> Self {
        Self {
            profile_id,
            enabled,
        }
    }

    pub fn live_profile(&self) -> Option<&ProfileId> {
        self.profile_id.as_ref().filter(|_| self.enabled)
    }

    pub fn is_live(&self) -> bool {
        self.live_profile().is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollerEvent {
    GameStarted(Game),
    GameEnded(Game),
    /// The exposed current match changed (enriched, ended or cleared).
    MatchUpdated(Option<Game>),
    /// The latest fetch failed; polling goes on at the same pace.
    FetchFailed(String),
}

/// Observable state of the poller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollerView {
    pub current_match: Option<Game>,
    pub last_error: Option<String>,
    pub fetching: bool,
}

pub struct GamePoller<A: ?Sized> {
    api: Arc<A>,
    interval: Duration,
    state: ReconcilerState,
    target: watch::Receiver<PollTarget>,
    active_profile: Option<ProfileId>,
    refresh: Arc<Notify>,
    view: watch::Sender<PollerView>,
    events: mpsc::Sender<PollerEvent>,
}

/// Control side of a running [`GamePoller`].
pub struct PollerHandle {
    target: watch::Sender<PollTarget>,
    refresh: Arc<Notify>,
    view: watch::Receiver<PollerView>,
    task: JoinHandle<()>,
}

impl<A> GamePoller<A>
where
    A: Aoe4Api + ?Sized + 'static,
{
    /// Start polling on a background task. The first fetch happens right away
    /// when the target is live.
    pub fn spawn(
        api: Arc<A>,
        interval: Duration,
        target: PollTarget,
    ) -> (PollerHandle, mpsc::Receiver<PollerEvent>) {
        let (target_tx, target_rx) = watch::channel(target.clone());
        let (view_tx, view_rx) = watch::channel(PollerView::default());
        let (events_tx, events_rx) = mpsc::channel(64);
        let refresh = Arc::new(Notify::new());

        let poller = Self {
            api,
            interval,
            state: ReconcilerState::default(),
            target: target_rx,
            active_profile: target.profile_id,
            refresh: refresh.clone(),
            view: view_tx,
            events: events_tx,
        };

        let task = tokio::spawn(poller.run());

        (
            PollerHandle {
                target: target_tx,
                refresh,
                view: view_rx,
                task,
            },
            events_rx,
        )
    }

    async fn run(mut self) {
        info!(interval_ms = self.interval.as_millis() as u64, "🔄 Game poller started");

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Target changes win over a tick that became ready at the same time.
            tokio::select! {
                biased;
                changed = self.target.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let target = self.target.borrow_and_update().clone();
                    self.on_target_changed(&target).await;
                }
                _ = self.refresh.notified() => {
                    debug!("🔄 Manual refresh");
                }
                _ = interval.tick() => {}
            }

            self.poll_once().await;
        }

        info!("🔄 Game poller stopped");
    }

    async fn on_target_changed(&mut self, target: &PollTarget) {
        debug!(
            profile_id = ?target.profile_id.as_ref().map(ToString::to_string),
            enabled = target.enabled,
            "🔄 Poll target changed"
        );

        if target.profile_id != self.active_profile {
            self.active_profile = target.profile_id.clone();
            let had_match = self.state.current_match.is_some();
            self.state = ReconcilerState::default();
            self.view.send_modify(|v| {
                v.current_match = None;
                v.last_error = None;
            });
            if had_match {
                self.emit(PollerEvent::MatchUpdated(None)).await;
            }
        }
    }

    #[instrument(skip(self), fields(profile_id = tracing::field::Empty))]
    async fn poll_once(&mut self) {
        // A change that landed after the select still resets state first.
        if self.target.has_changed().unwrap_or(false) {
            let target = self.target.borrow_and_update().clone();
            self.on_target_changed(&target).await;
        }

        let target = self.target.borrow().clone();
        let Some(profile_id) = target.live_profile().cloned() else {
            trace!("🔄 Polling inactive, skipping");
            return;
        };
        tracing::Span::current().record("profile_id", tracing::field::display(&profile_id));

        self.view.send_modify(|v| v.fetching = true);
        let result = self.api.get_last_game(&profile_id).await;
        self.view.send_modify(|v| v.fetching = false);

        if !self.target_is(&target) {
            debug!("🔄 Target changed during fetch, discarding result");
            return;
        }

        let latest = match result {
            Ok(latest) => latest,
            Err(e) => {
                let message = e.user_message();
                warn!(error = %e, "🔄 ⚠️ Failed to fetch last game");
                self.view
                    .send_modify(|v| v.last_error = Some(message.clone()));
                self.emit(PollerEvent::FetchFailed(message)).await;
                return;
            }
        };

        self.view.send_modify(|v| v.last_error = None);

        let (state, events) = reconcile(std::mem::take(&mut self.state), latest);
        self.state = state;

        for event in events {
            match event {
                MatchEvent::GameStarted(game) => {
                    info!(game_id = %game.game_id, map = ?game.map, "🔄 ✅ New game detected");
                    self.publish_current();
                    self.emit(PollerEvent::GameStarted(game.clone())).await;
                    self.enrich(game, &target).await;
                }
                MatchEvent::GameEnded(game) => {
                    info!(game_id = %game.game_id, "🔄 🏁 Game finished");
                    self.publish_current();
                    self.emit(PollerEvent::GameEnded(game)).await;
                    self.emit(PollerEvent::MatchUpdated(self.state.current_match.clone()))
                        .await;
                }
                MatchEvent::Cleared => {
                    info!("🔄 No game reported anymore, clearing current match");
                    self.publish_current();
                    self.emit(PollerEvent::MatchUpdated(None)).await;
                }
            }
        }
    }

    async fn enrich(&mut self, game: Game, target: &PollTarget) {
        let enriched = enrich_game(self.api.as_ref(), game).await;

        if !self.target_is(target) {
            debug!("🔄 Target changed during enrichment, discarding result");
            return;
        }

        if self.state.install_enriched(enriched.game) {
            self.publish_current();
            self.emit(PollerEvent::MatchUpdated(self.state.current_match.clone()))
                .await;
        }
    }

    fn target_is(&self, target: &PollTarget) -> bool {
        *self.target.borrow() == *target
    }

    fn publish_current(&self) {
        let current = self.state.current_match.clone();
        self.view.send_modify(|v| v.current_match = current);
    }

    async fn emit(&self, event: PollerEvent) {
        // Nobody listening is fine, the view still reflects the state.
        let _ = self.events.send(event).await;
    }
}

impl PollerHandle {
    pub fn set_profile(&self, profile_id: Option<ProfileId>) {
        self.target.send_modify(|t| t.profile_id = profile_id);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.target.send_modify(|t| t.enabled = enabled);
    }

    /// Fetch now instead of waiting for the next tick. The interval keeps
    /// its schedule.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// True exactly when polling is enabled and a profile is selected.
    pub fn is_polling(&self) -> bool {
        self.target.borrow().is_live()
    }

    pub fn is_enabled(&self) -> bool {
        self.target.borrow().enabled
    }

    pub fn current_match(&self) -> Option<Game> {
        self.view.borrow().current_match.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.view.borrow().last_error.clone()
    }

    pub fn view(&self) -> watch::Receiver<PollerView> {
        self.view.clone()
    }

    /// Stop future fetches. An in-flight fetch is dropped with the task.
    pub fn stop(self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::time::{Instant, timeout};

    use super::*;
    use crate::aoe4::{Player, PlayerGamesResponse};
    use crate::error::AppError;

    /// Replays scripted last-game responses, repeating the final one.
    struct Script {
        responses: Mutex<VecDeque<Result<Option<Game>, AppError>>>,
        last: Mutex<Option<Game>>,
        fetches: AtomicUsize,
    }

    impl Script {
        fn new(responses: Vec<Result<Option<Game>, AppError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                last: Mutex::new(None),
                fetches: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Aoe4Api for Script {
        async fn get_player(&self, profile_id: &ProfileId) -> Result<Player, AppError> {
            Ok(Player {
                profile_id: profile_id.to_string().parse().unwrap_or_default(),
                name: format!("full-{profile_id}"),
                ..Default::default()
            })
        }

        async fn get_last_game(&self, _: &ProfileId) -> Result<Option<Game>, AppError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(Ok(game)) => {
                    *self.last.lock().unwrap() = game.clone();
                    Ok(game)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last.lock().unwrap().clone()),
            }
        }

        async fn get_player_games(
            &self,
            _: &ProfileId,
            _: u32,
            _: u32,
        ) -> Result<PlayerGamesResponse, AppError> {
            unimplemented!()
        }
    }

    /// Answers after `delay`. Profile 1 sees game "a", then "a2"; any other
    /// profile sees "b".
    struct Slow {
        delay: Duration,
        profile_one_calls: AtomicUsize,
    }

    #[async_trait]
    impl Aoe4Api for Slow {
        async fn get_player(&self, profile_id: &ProfileId) -> Result<Player, AppError> {
            Ok(Player {
                name: format!("full-{profile_id}"),
                ..Default::default()
            })
        }

        async fn get_last_game(&self, profile_id: &ProfileId) -> Result<Option<Game>, AppError> {
            tokio::time::sleep(self.delay).await;
            let game = match profile_id {
                ProfileId::Numeric(1) if self.profile_one_calls.fetch_add(1, Ordering::SeqCst) == 0 => {
                    game("a", true)
                }
                ProfileId::Numeric(1) => game("a2", true),
                _ => game("b", true),
            };
            Ok(Some(game))
        }

        async fn get_player_games(
            &self,
            _: &ProfileId,
            _: u32,
            _: u32,
        ) -> Result<PlayerGamesResponse, AppError> {
            unimplemented!()
        }
    }

    fn game(id: &str, ongoing: bool) -> Game {
        serde_json::from_value(serde_json::json!({
            "game_id": id,
            "ongoing": ongoing,
            "teams": [
                [{"profile_id": 1, "name": "me"}],
                [{"profile_id": 2, "name": "them"}]
            ]
        }))
        .unwrap()
    }

    fn live() -> PollTarget {
        PollTarget::new(Some(ProfileId::Numeric(1)), true)
    }

    async fn next(rx: &mut mpsc::Receiver<PollerEvent>) -> PollerEvent {
        timeout(Duration::from_secs(3600), rx.recv())
            .await
            .expect("poller went quiet")
            .expect("poller stopped")
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_end_of_same_game() {
        let api = Script::new(vec![Ok(Some(game("a", true))), Ok(Some(game("a", false)))]);
        let (handle, mut rx) = GamePoller::spawn(api, Duration::from_secs(10), live());

        assert!(matches!(next(&mut rx).await, PollerEvent::GameStarted(g) if g.game_id.0 == "a"));

        let PollerEvent::MatchUpdated(Some(enriched)) = next(&mut rx).await else {
            panic!("expected enriched match");
        };
        assert!(enriched.players().all(|p| p.player.is_some()));

        assert!(matches!(next(&mut rx).await, PollerEvent::GameEnded(g) if !g.ongoing));

        let current = handle.current_match().unwrap();
        assert_eq!(current.game_id.0, "a");
        assert!(!current.ongoing);
        assert!(current.players().all(|p| p.player.is_some()));
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn errors_do_not_stop_polling() {
        let api = Script::new(vec![
            Err(AppError::Aoe4Api {
                status: 429,
                message: "Too Many Requests".into(),
            }),
            Ok(Some(game("a", true))),
        ]);
        let (handle, mut rx) = GamePoller::spawn(api.clone(), Duration::from_secs(10), live());

        assert_eq!(
            next(&mut rx).await,
            PollerEvent::FetchFailed("Rate limit exceeded. Please try again later.".into())
        );
        assert!(matches!(next(&mut rx).await, PollerEvent::GameStarted(_)));
        assert_eq!(handle.last_error(), None);
        assert_eq!(api.fetches.load(Ordering::SeqCst), 2);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_poller_does_not_fetch() {
        let api = Script::new(vec![Ok(Some(game("a", true)))]);
        let target = PollTarget::new(Some(ProfileId::Numeric(1)), false);
        let (handle, mut rx) = GamePoller::spawn(api.clone(), Duration::from_secs(10), target);

        assert!(!handle.is_polling());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.fetches.load(Ordering::SeqCst), 0);

        handle.set_enabled(true);
        assert!(handle.is_polling());
        assert!(matches!(next(&mut rx).await, PollerEvent::GameStarted(_)));

        handle.set_profile(None);
        assert!(!handle.is_polling());
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_fetches_before_next_tick() {
        let api = Script::new(vec![Ok(Some(game("a", true))), Ok(Some(game("b", true)))]);
        let interval = Duration::from_secs(3600);
        let (handle, mut rx) = GamePoller::spawn(api.clone(), interval, live());

        assert!(matches!(next(&mut rx).await, PollerEvent::GameStarted(_)));
        assert!(matches!(next(&mut rx).await, PollerEvent::MatchUpdated(_)));

        let before = Instant::now();
        handle.refresh();
        assert!(matches!(next(&mut rx).await, PollerEvent::GameStarted(g) if g.game_id.0 == "b"));
        assert!(before.elapsed() < interval);
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn profile_switch_during_slow_fetch_starts_new_game_once() {
        let api = Arc::new(Slow {
            delay: Duration::from_secs(15),
            profile_one_calls: AtomicUsize::new(0),
        });
        let (handle, mut rx) = GamePoller::spawn(api, Duration::from_secs(10), live());

        assert!(matches!(next(&mut rx).await, PollerEvent::GameStarted(g) if g.game_id.0 == "a"));
        assert!(matches!(next(&mut rx).await, PollerEvent::MatchUpdated(Some(_))));

        // The next fetch for profile 1 is in flight and outlasts the interval.
        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.set_profile(Some(ProfileId::Numeric(2)));

        assert_eq!(next(&mut rx).await, PollerEvent::MatchUpdated(None));
        assert!(matches!(next(&mut rx).await, PollerEvent::GameStarted(g) if g.game_id.0 == "b"));
        assert!(
            matches!(next(&mut rx).await, PollerEvent::MatchUpdated(Some(g)) if g.game_id.0 == "b")
        );

        tokio::time::sleep(Duration::from_secs(120)).await;
        let mut rest = Vec::new();
        while let Ok(event) = rx.try_recv() {
            rest.push(event);
        }
        assert!(rest.is_empty(), "unexpected events: {rest:?}");
        assert_eq!(
            handle.current_match().map(|g| g.game_id.0),
            Some("b".to_string())
        );
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn switching_profile_clears_current_match() {
        let api = Script::new(vec![Ok(Some(game("a", true)))]);
        let (handle, mut rx) = GamePoller::spawn(api, Duration::from_secs(10), live());

        assert!(matches!(next(&mut rx).await, PollerEvent::GameStarted(_)));
        assert!(matches!(next(&mut rx).await, PollerEvent::MatchUpdated(Some(_))));

        handle.set_profile(Some(ProfileId::Numeric(2)));
        assert_eq!(next(&mut rx).await, PollerEvent::MatchUpdated(None));
        // Same game seen from the new profile counts as a fresh start.
        assert!(matches!(next(&mut rx).await, PollerEvent::GameStarted(g) if g.game_id.0 == "a"));
        handle.stop();
    }
}
