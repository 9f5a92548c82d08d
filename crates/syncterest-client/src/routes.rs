//! Route table and navigation guards.
//!
//! Guard order is fixed: an incomplete onboarding wins over every other
//! redirect, so a signed-in user with a half-filled profile always lands
//! on `/onboarding` no matter which authed route they asked for.

use std::fmt;
use std::str::FromStr;

use syncterest_shared::types::{ChannelId, ConversationId, EventId, GroupId, UserId};

use crate::state::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSection {
    Account,
    Privacy,
    Notifications,
    Appearance,
    Language,
    LinkedAccounts,
    Subscription,
    DataManagement,
    BlockedUsers,
    Help,
}

impl SettingsSection {
    fn as_str(&self) -> &'static str {
        match self {
            SettingsSection::Account => "account",
            SettingsSection::Privacy => "privacy",
            SettingsSection::Notifications => "notifications",
            SettingsSection::Appearance => "appearance",
            SettingsSection::Language => "language",
            SettingsSection::LinkedAccounts => "linked-accounts",
            SettingsSection::Subscription => "subscription",
            SettingsSection::DataManagement => "data-management",
            SettingsSection::BlockedUsers => "blocked-users",
            SettingsSection::Help => "help",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "account" => SettingsSection::Account,
            "privacy" => SettingsSection::Privacy,
            "notifications" => SettingsSection::Notifications,
            "appearance" => SettingsSection::Appearance,
            "language" => SettingsSection::Language,
            "linked-accounts" => SettingsSection::LinkedAccounts,
            "subscription" => SettingsSection::Subscription,
            "data-management" => SettingsSection::DataManagement,
            "blocked-users" => SettingsSection::BlockedUsers,
            "help" => SettingsSection::Help,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    // Public
    Landing,
    Login,
    Signup,
    // Authed
    Home,
    Chat(Option<ConversationId>),
    Search,
    Profile(UserId),
    Group(GroupId),
    Event(EventId),
    Channels,
    Channel(ChannelId),
    Settings(SettingsSection),
    Onboarding,
}

impl Route {
    /// Routes reachable without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Landing | Route::Login | Route::Signup)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Landing => write!(f, "/"),
            Route::Login => write!(f, "/login"),
            Route::Signup => write!(f, "/signup"),
            Route::Home => write!(f, "/home"),
            Route::Chat(None) => write!(f, "/chat"),
            Route::Chat(Some(id)) => write!(f, "/chat/{id}"),
            Route::Search => write!(f, "/search"),
            Route::Profile(id) => write!(f, "/profile/{id}"),
            Route::Group(id) => write!(f, "/groups/{id}"),
            Route::Event(id) => write!(f, "/events/{id}"),
            Route::Channels => write!(f, "/channels"),
            Route::Channel(id) => write!(f, "/channels/{id}"),
            Route::Settings(section) => write!(f, "/settings/{}", section.as_str()),
            Route::Onboarding => write!(f, "/onboarding"),
        }
    }
}

/// Error for an unroutable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRoute(pub String);

impl fmt::Display for UnknownRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown route: {}", self.0)
    }
}

impl std::error::Error for UnknownRoute {}

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownRoute(path.to_string());
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        Ok(match segments.as_slice() {
            [""] => Route::Landing,
            ["login"] => Route::Login,
            ["signup"] => Route::Signup,
            ["home"] => Route::Home,
            ["chat"] => Route::Chat(None),
            ["chat", id] => Route::Chat(Some(id.parse().map_err(|_| unknown())?)),
            ["search"] => Route::Search,
            ["profile", id] => Route::Profile(id.parse().map_err(|_| unknown())?),
            ["groups", id] => Route::Group(id.parse().map_err(|_| unknown())?),
            ["events", id] => Route::Event(id.parse().map_err(|_| unknown())?),
            ["channels"] => Route::Channels,
            ["channels", id] => Route::Channel(id.parse().map_err(|_| unknown())?),
            ["settings", section] => {
                Route::Settings(SettingsSection::parse(section).ok_or_else(unknown)?)
            }
            ["onboarding"] => Route::Onboarding,
            _ => return Err(unknown()),
        })
    }
}

/// Where navigation to `route` should actually land, or `None` to let it
/// through.
pub fn redirect_for(session: Option<&Session>, route: &Route) -> Option<Route> {
    match session {
        Some(session) if !session.onboarding_complete => {
            // Incomplete onboarding overrides everything, including the
            // signed-in redirect away from auth pages.
            (*route != Route::Onboarding).then_some(Route::Onboarding)
        }
        Some(_) => route.is_public().then_some(Route::Home),
        None => (!route.is_public()).then_some(Route::Login),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AuthUser;
    use chrono::Utc;
    use syncterest_store::Profile;

    fn session(onboarded: bool) -> Session {
        let id = UserId::new();
        let mut profile = Profile::new(id, Utc::now());
        if onboarded {
            profile.full_name = Some("Ada Lovelace".into());
            profile.username = Some("ada".into());
            profile.interests = vec!["math".into()];
            profile.personality_tags = vec!["analytical".into()];
        }
        Session::new(
            AuthUser {
                id,
                email: "ada@example.com".into(),
            },
            Some(profile),
        )
    }

    #[test]
    fn incomplete_onboarding_redirects_everywhere() {
        let s = session(false);
        for route in [
            Route::Home,
            Route::Chat(None),
            Route::Search,
            Route::Channels,
            Route::Settings(SettingsSection::Account),
            Route::Landing,
            Route::Login,
        ] {
            assert_eq!(
                redirect_for(Some(&s), &route),
                Some(Route::Onboarding),
                "route {route} should redirect to onboarding"
            );
        }
        assert_eq!(redirect_for(Some(&s), &Route::Onboarding), None);
    }

    #[test]
    fn onboarded_user_is_bounced_off_auth_pages() {
        let s = session(true);
        assert_eq!(redirect_for(Some(&s), &Route::Landing), Some(Route::Home));
        assert_eq!(redirect_for(Some(&s), &Route::Login), Some(Route::Home));
        assert_eq!(redirect_for(Some(&s), &Route::Signup), Some(Route::Home));
        assert_eq!(redirect_for(Some(&s), &Route::Home), None);
        assert_eq!(redirect_for(Some(&s), &Route::Chat(None)), None);
    }

    #[test]
    fn signed_out_user_needs_login_for_authed_routes() {
        assert_eq!(redirect_for(None, &Route::Home), Some(Route::Login));
        assert_eq!(redirect_for(None, &Route::Onboarding), Some(Route::Login));
        assert_eq!(redirect_for(None, &Route::Landing), None);
        assert_eq!(redirect_for(None, &Route::Signup), None);
    }

    #[test]
    fn routes_round_trip_through_strings() {
        let routes = [
            Route::Landing,
            Route::Login,
            Route::Home,
            Route::Chat(None),
            Route::Chat(Some(ConversationId::new())),
            Route::Profile(UserId::new()),
            Route::Group(GroupId::new()),
            Route::Event(EventId::new()),
            Route::Channels,
            Route::Channel(ChannelId::new()),
            Route::Settings(SettingsSection::BlockedUsers),
            Route::Onboarding,
        ];
        for route in routes {
            let parsed: Route = route.to_string().parse().unwrap();
            assert_eq!(parsed, route);
        }
    }

    #[test]
    fn junk_paths_are_rejected() {
        assert!("/nope".parse::<Route>().is_err());
        assert!("/chat/not-a-uuid".parse::<Route>().is_err());
        assert!("/settings/bogus".parse::<Route>().is_err());
    }
}
