use super::notification::NotificationStore;
use crate::{
    config::SessionConfig,
    gateway::{documents::*, Gateway},
    models::{mapify, GuildInfo, SessionToken, UserProfile},
    navigation::{Route, View},
    prelude::*,
    storage::{DurableStore, Key},
    Error,
};
use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthState {
    Unauthenticated,
    /// An authorization code is being exchanged for a token.
    Authenticating,
    /// A token is held. The profile may not have been fetched yet.
    Authenticated,
}

/// An immutable snapshot of the signed in user's session.
#[derive(Clone, Debug)]
pub struct Session {
    pub state: AuthState,
    pub token: Option<SessionToken>,
    pub info: Option<UserProfile>,
    pub guilds: IndexMap<GuildId, GuildInfo>,
    pub active_guild: Option<GuildId>,
    pub active_view: Option<View>,
}

impl Session {
    fn new(token: Option<SessionToken>, route: &Route) -> Self {
        Self {
            state: if token.is_some() {
                AuthState::Authenticated
            } else {
                AuthState::Unauthenticated
            },
            token,
            info: None,
            guilds: IndexMap::new(),
            active_guild: route.guild_id().map(String::from),
            active_view: route.view(),
        }
    }

    /// Whether the user may manage roles in the guild. Unknown guilds never allow it.
    pub fn has_role_permissions(&self, guild_id: &str) -> bool {
        self.guilds
            .get(guild_id)
            .map(GuildInfo::can_manage_roles)
            .unwrap_or(false)
    }

    /// The route describing the current selection.
    pub fn route(&self) -> Route {
        match &self.active_guild {
            Some(guild_id) => Route::Guild {
                guild_id: guild_id.clone(),
                view: self.active_view,
            },
            None => Route::Root,
        }
    }
}

struct SessionStoreRef {
    gateway: Gateway,
    storage: Arc<dyn DurableStore>,
    notifications: NotificationStore,
    config: SessionConfig,
    session: watch::Sender<Arc<Session>>,
    // Bumped by every sign in attempt and sign out. A pending session end only
    // applies to the generation it was scheduled in.
    generation: AtomicU64,
}

/// Tracks who is signed in, which guilds they can see and what they are
/// looking at.
#[derive(Clone)]
pub struct SessionStore(Arc<SessionStoreRef>);

impl SessionStore {
    /// Restores any persisted token and seeds the selection from the route the
    /// console was opened at. Fetching the profile is left to the caller.
    pub fn new(
        gateway: Gateway,
        storage: Arc<dyn DurableStore>,
        notifications: NotificationStore,
        config: SessionConfig,
        initial: &Route,
    ) -> Self {
        let token = storage
            .get(Key::Token)
            .and_then(|raw| SessionToken::from_stored(&raw));
        if token.is_some() {
            debug!("Restored persisted session token");
        }
        let (session, _) = watch::channel(Arc::new(Session::new(token, initial)));
        Self(Arc::new(SessionStoreRef {
            gateway,
            storage,
            notifications,
            config,
            session,
            generation: AtomicU64::new(0),
        }))
    }

    pub fn snapshot(&self) -> Arc<Session> {
        Arc::clone(&self.0.session.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Session>> {
        self.0.session.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.snapshot().state
    }

    pub fn has_role_permissions(&self, guild_id: &str) -> bool {
        self.snapshot().has_role_permissions(guild_id)
    }

    pub fn has_role_permissions_for_active(&self) -> bool {
        let session = self.snapshot();
        session
            .active_guild
            .as_deref()
            .map(|guild_id| session.has_role_permissions(guild_id))
            .unwrap_or(false)
    }

    /// The views offered for the active guild. Until the guild's permissions
    /// are known every view is offered.
    pub fn available_views(&self) -> Vec<View> {
        let session = self.snapshot();
        let allowed = match session
            .active_guild
            .as_deref()
            .filter(|id| session.guilds.contains_key(*id))
        {
            Some(guild_id) => session.has_role_permissions(guild_id),
            None => true,
        };
        View::ALL
            .into_iter()
            .filter(|view| !view.requires_role_permissions() || allowed)
            .collect()
    }

    /// Guilds the bot is present in.
    pub fn active_guilds(&self) -> Vec<GuildInfo> {
        self.snapshot().guilds.values().filter(|g| g.cached).cloned().collect()
    }

    /// Guilds the user can see but the bot has not been invited to.
    pub fn inactive_guilds(&self) -> Vec<GuildInfo> {
        self.snapshot().guilds.values().filter(|g| !g.cached).cloned().collect()
    }

    /// Exchanges an OAuth authorization code for a token, then loads the profile.
    pub async fn get_token(&self, code: &str) {
        self.0.generation.fetch_add(1, Ordering::SeqCst);
        self.update(|session| session.state = AuthState::Authenticating);
        match self.try_get_token(code).await {
            Ok(()) => {
                info!("Signed in");
                self.request_info().await;
            }
            Err(err) => {
                error!("Token exchange failed: {:?}", err);
                self.0
                    .notifications
                    .failure(format!("{}. Automatically signing out.", err));
                self.end_session();
            }
        }
    }

    /// Loads the profile and guild list of the signed in user. Failure ends
    /// the session.
    pub async fn request_info(&self) {
        if let Err(err) = self.try_request_info().await {
            error!("Fetching user info failed: {:?}", err);
            self.0.notifications.failure(err.to_string());
            self.end_session();
        }
    }

    /// Forgets the token and profile. Other persisted values are kept.
    pub fn sign_out(&self) {
        self.0.generation.fetch_add(1, Ordering::SeqCst);
        for key in [Key::Token, Key::Code] {
            if let Err(err) = self.0.storage.remove(key) {
                warn!("Failed to remove {} from storage: {}", key, err);
            }
        }
        self.update(|session| {
            session.state = AuthState::Unauthenticated;
            session.token = None;
            session.info = None;
        });
        info!("Signed out");
    }

    pub fn select_guild(&self, guild_id: impl Into<GuildId>) {
        let guild_id = guild_id.into();
        self.update(|session| {
            session.active_guild = Some(guild_id);
            session.active_view = Some(View::View);
        });
    }

    pub fn select_view(&self, view: View) {
        self.update(|session| session.active_view = Some(view));
    }

    /// Moves the selection to a route. The callback route is not a
    /// destination of its own and leaves the selection untouched.
    pub fn navigate(&self, route: &Route) {
        match route {
            Route::Callback { .. } => {}
            route => self.update(|session| {
                session.active_guild = route.guild_id().map(String::from);
                session.active_view = route.view();
            }),
        }
    }

    /// Saves the route to return to once the OAuth redirect completes.
    pub fn remember_area(&self, route: &Route) {
        if let Err(err) = self.0.storage.set(Key::LastArea, route.to_string()) {
            warn!("Failed to remember the last area: {}", err);
        }
    }

    /// Handles the OAuth redirect: keeps the authorization code for the
    /// exchange and returns where to go next.
    pub fn handle_callback(&self, code: Option<&str>) -> Route {
        match code {
            Some(code) => {
                if let Err(err) = self.0.storage.set(Key::Code, code.to_owned()) {
                    warn!("Failed to store the authorization code: {}", err);
                }
            }
            None => error!("Callback received but got no code."),
        }
        let target = self
            .0
            .storage
            .get(Key::LastArea)
            .map(|area| Route::parse(&area))
            .unwrap_or(Route::Root);
        if let Err(err) = self.0.storage.remove(Key::LastArea) {
            warn!("Failed to remove the last area: {}", err);
        }
        self.navigate(&target);
        target
    }

    /// An authorization code received by the callback and not exchanged yet.
    pub fn pending_code(&self) -> Option<String> {
        self.0.storage.get(Key::Code)
    }

    async fn try_get_token(&self, code: &str) -> Result<(), Error> {
        let data: TokenData = self
            .0
            .gateway
            .query(&GET_TOKEN, TokenVariables { code })
            .await?;
        // Persisted before anything else so the next request already carries it.
        self.0
            .storage
            .set(Key::Token, serde_json::to_string(&data.token)?)?;
        self.0.storage.remove(Key::Code)?;
        self.update(|session| {
            session.state = AuthState::Authenticated;
            session.token = Some(data.token);
        });
        Ok(())
    }

    async fn try_request_info(&self) -> Result<(), Error> {
        let data: MeData = self.0.gateway.query(&GET_ME_INFO, NoVariables {}).await?;
        let mut info = data.me.info;
        info.avatar_url = info.avatar_url_as("png", self.0.config.avatar_size);
        let guilds = mapify(data.me.guilds);
        debug!("Loaded profile of {} with {} guilds", info.display_name(), guilds.len());
        self.update(|session| {
            session.info = Some(info);
            session.guilds = guilds;
        });
        Ok(())
    }

    /// Ends the session after the grace delay, which leaves time to read the
    /// failure notification. Clears everything persisted and returns to the
    /// root, unless the user signed in or out again in the meantime.
    fn end_session(&self) {
        let store = self.clone();
        let delay = self.0.config.sign_out_delay();
        let generation = self.0.generation.load(Ordering::SeqCst);
        warn!("Ending session in {:?}", delay);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if store.0.generation.load(Ordering::SeqCst) != generation {
                debug!("Session changed since the failure, keeping it");
                return;
            }
            if let Err(err) = store.0.storage.clear() {
                error!("Failed to clear storage: {}", err);
            }
            store.update(|session| {
                *session = Session::new(None, &Route::Root);
            });
        });
    }

    fn update(&self, op: impl FnOnce(&mut Session)) {
        self.0.session.send_modify(|current| {
            let mut next = Session::clone(current);
            op(&mut next);
            *current = Arc::new(next);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockTransport;
    use crate::models::Permissions;
    use crate::stores::notification::{Notification, NotificationKind};
    use crate::storage::MemoryStore;
    use serde_json::json;

    const TOKEN: &str = r#"{"accessToken":"a","tokenType":"Bearer","expiresIn":604800,"refreshToken":"r","scope":"identify guilds"}"#;

    struct Harness {
        transport: MockTransport,
        storage: Arc<MemoryStore>,
        notifications: NotificationStore,
        store: SessionStore,
    }

    fn harness(storage: MemoryStore, route: &str) -> Harness {
        let transport = MockTransport::new();
        let storage = Arc::new(storage);
        let notifications = NotificationStore::new(Duration::from_secs(15));
        let store = SessionStore::new(
            Gateway::new(transport.clone()),
            storage.clone(),
            notifications.clone(),
            SessionConfig::default(),
            &Route::parse(route),
        );
        Harness {
            transport,
            storage,
            notifications,
            store,
        }
    }

    fn me() -> serde_json::Value {
        json!({
            "me": {
                "info": {"username": "Nelly", "discriminator": "1337", "id": "80", "avatar": "abc"},
                "guilds": [
                    {"id": "1", "name": "Managed", "icon": null, "owner": false, "permissions": 268435456, "cached": true},
                    {"id": "2", "name": "Member", "icon": "i", "owner": false, "permissions": 2048, "cached": true},
                    {"id": "3", "name": "Elsewhere", "icon": null, "owner": true, "permissions": 8, "cached": false},
                ],
            }
        })
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    static_assertions::assert_impl_all!(SessionStore: Send, Sync, Clone);

    #[tokio::test]
    async fn test_starts_unauthenticated_without_token() {
        let h = harness(MemoryStore::new(), "/");
        let session = h.store.snapshot();
        assert_eq!(session.state, AuthState::Unauthenticated);
        assert!(session.token.is_none());
        assert_eq!(session.route(), Route::Root);
    }

    #[tokio::test]
    async fn test_restores_token_and_route() {
        let h = harness(MemoryStore::with([(Key::Token, TOKEN.into())]), "/1/create");
        let session = h.store.snapshot();
        assert_eq!(session.state, AuthState::Authenticated);
        assert_eq!(session.token.as_ref().unwrap().access_token, "a");
        assert_eq!(session.active_guild.as_deref(), Some("1"));
        assert_eq!(session.active_view, Some(View::Create));
        assert!(session.info.is_none());
        assert_eq!(h.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_token_is_ignored() {
        let h = harness(MemoryStore::with([(Key::Token, "undefined".into())]), "/");
        assert_eq!(h.store.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_request_info() {
        let h = harness(MemoryStore::with([(Key::Token, TOKEN.into())]), "/1/view");
        h.transport.respond(me());
        h.store.request_info().await;

        let session = h.store.snapshot();
        let info = session.info.as_ref().unwrap();
        assert_eq!(info.username, "Nelly");
        assert_eq!(
            info.avatar_url.as_deref(),
            Some("https://cdn.discordapp.com/avatars/80/abc.png?size=256")
        );
        let ids: Vec<_> = session.guilds.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(h.transport.requests()[0].operation_name, "GetMeInfo");

        let active: Vec<_> = h.store.active_guilds().into_iter().map(|g| g.id).collect();
        let inactive: Vec<_> = h.store.inactive_guilds().into_iter().map(|g| g.id).collect();
        assert_eq!(active, vec!["1", "2"]);
        assert_eq!(inactive, vec!["3"]);
    }

    #[tokio::test]
    async fn test_role_permissions() {
        let h = harness(MemoryStore::with([(Key::Token, TOKEN.into())]), "/2/view");
        assert!(!h.store.has_role_permissions("1"));
        assert_eq!(h.store.available_views(), View::ALL.to_vec());

        h.transport.respond(me());
        h.store.request_info().await;

        assert!(h.store.has_role_permissions("1"));
        assert!(!h.store.has_role_permissions("2"));
        assert!(h.store.has_role_permissions("3"));
        assert!(!h.store.has_role_permissions("unknown"));
        assert!(!h.store.has_role_permissions_for_active());
        assert_eq!(h.store.available_views(), vec![View::View]);

        h.store.select_guild("1");
        assert!(h.store.has_role_permissions_for_active());
        assert_eq!(h.store.available_views(), View::ALL.to_vec());
        assert_eq!(h.store.snapshot().guilds["1"].permissions, Permissions::MANAGE_ROLES);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_info_failure_ends_session_after_delay() {
        let h = harness(
            MemoryStore::with([(Key::Token, TOKEN.into()), (Key::LastArea, "/1".into())]),
            "/1/view",
        );
        h.transport.fail("401: Unauthorized");
        h.store.request_info().await;

        assert_eq!(h.notifications.active(), Some(Notification::failure("401: Unauthorized")));
        assert_eq!(h.store.state(), AuthState::Authenticated);
        assert!(!h.storage.is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;

        let session = h.store.snapshot();
        assert_eq!(session.state, AuthState::Unauthenticated);
        assert!(session.token.is_none());
        assert_eq!(session.route(), Route::Root);
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn test_get_token() {
        let h = harness(MemoryStore::with([(Key::Code, "xyz".into())]), "/");
        let mut rx = h.store.subscribe();
        h.transport.respond(json!({"token": serde_json::from_str::<serde_json::Value>(TOKEN).unwrap()}));
        h.transport.respond(me());

        h.store.get_token("xyz").await;

        let requests = h.transport.requests();
        assert_eq!(requests[0].operation_name, "GetToken");
        assert_eq!(requests[0].variables, json!({"code": "xyz"}));
        assert_eq!(requests[1].operation_name, "GetMeInfo");
        assert_eq!(h.storage.get(Key::Token).as_deref(), Some(TOKEN));
        assert_eq!(h.storage.get(Key::Code), None);

        let session = h.store.snapshot();
        assert_eq!(session.state, AuthState::Authenticated);
        assert!(session.info.is_some());
        assert!(rx.has_changed().unwrap());
        assert!(Arc::ptr_eq(&rx.borrow_and_update(), &session));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_token_failure() {
        let h = harness(MemoryStore::with([(Key::Code, "stale".into())]), "/");
        h.transport.fail("Invalid \"code\" in request.");

        h.store.get_token("stale").await;

        let active = h.notifications.active().unwrap();
        assert_eq!(active.kind, NotificationKind::Failure);
        assert_eq!(
            active.message,
            "Invalid \"code\" in request.. Automatically signing out."
        );
        assert_eq!(h.storage.get(Key::Code).as_deref(), Some("stale"));

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert!(h.storage.is_empty());
        assert_eq!(h.store.state(), AuthState::Unauthenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_during_grace_delay_survives() {
        let h = harness(MemoryStore::new(), "/");
        h.transport.fail("Invalid \"code\" in request.");
        h.store.get_token("stale").await;

        tokio::time::sleep(Duration::from_secs(2)).await;
        h.transport.respond(json!({"token": serde_json::from_str::<serde_json::Value>(TOKEN).unwrap()}));
        h.transport.respond(me());
        h.store.get_token("good").await;
        assert_eq!(h.store.state(), AuthState::Authenticated);

        tokio::time::sleep(Duration::from_secs(4)).await;
        settle().await;

        assert_eq!(h.store.state(), AuthState::Authenticated);
        assert!(h.store.snapshot().info.is_some());
        assert_eq!(h.storage.get(Key::Token).as_deref(), Some(TOKEN));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_during_grace_delay_keeps_last_area() {
        let h = harness(MemoryStore::with([(Key::Token, TOKEN.into())]), "/");
        h.transport.fail("401: Unauthorized");
        h.store.request_info().await;
        h.store.sign_out();
        h.store.remember_area(&Route::parse("/1/roles"));

        tokio::time::sleep(Duration::from_secs(6)).await;
        settle().await;

        assert_eq!(h.store.state(), AuthState::Unauthenticated);
        assert_eq!(h.storage.get(Key::LastArea).as_deref(), Some("/1/roles"));
    }

    #[tokio::test]
    async fn test_sign_out_keeps_other_keys() {
        let h = harness(
            MemoryStore::with([
                (Key::Token, TOKEN.into()),
                (Key::Code, "c".into()),
                (Key::LastArea, "/1".into()),
            ]),
            "/",
        );
        h.store.sign_out();
        assert_eq!(h.store.state(), AuthState::Unauthenticated);
        assert_eq!(h.storage.get(Key::Token), None);
        assert_eq!(h.storage.get(Key::Code), None);
        assert_eq!(h.storage.get(Key::LastArea).as_deref(), Some("/1"));
    }

    #[tokio::test]
    async fn test_callback_round_trip() {
        let h = harness(MemoryStore::new(), "/callback?code=abc");
        h.store.remember_area(&Route::parse("/1/roles"));

        let target = h.store.handle_callback(Some("abc"));

        assert_eq!(target, Route::parse("/1/roles"));
        assert_eq!(h.store.pending_code().as_deref(), Some("abc"));
        assert_eq!(h.storage.get(Key::LastArea), None);
        assert_eq!(h.store.snapshot().active_view, Some(View::Roles));
    }

    #[tokio::test]
    async fn test_callback_without_area_goes_home() {
        let h = harness(MemoryStore::new(), "/callback");
        assert_eq!(h.store.handle_callback(None), Route::Root);
        assert_eq!(h.store.pending_code(), None);
    }

    #[tokio::test]
    async fn test_navigation() {
        let h = harness(MemoryStore::new(), "/");
        h.store.select_guild("7");
        assert_eq!(h.store.snapshot().route(), Route::parse("/7/view"));
        h.store.select_view(View::Settings);
        assert_eq!(h.store.snapshot().route(), Route::parse("/7/settings"));
        h.store.navigate(&Route::parse("/callback?code=x"));
        assert_eq!(h.store.snapshot().route(), Route::parse("/7/settings"));
        h.store.navigate(&Route::Root);
        assert_eq!(h.store.snapshot().active_guild, None);
    }
}
