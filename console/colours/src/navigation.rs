use crate::models::GuildId;
use std::{fmt, str::FromStr};

/// The content panes of a guild.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum View {
    View,
    Create,
    Roles,
    Settings,
}

impl View {
    pub const ALL: [View; 4] = [View::View, View::Create, View::Roles, View::Settings];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Roles => "roles",
            Self::Settings => "settings",
        }
    }

    /// The label shown on navigation buttons.
    pub fn title(self) -> &'static str {
        match self {
            Self::View => "View",
            Self::Create => "Create",
            Self::Roles => "Add Roles",
            Self::Settings => "Settings",
        }
    }

    /// Whether the view needs permission to manage roles in the guild.
    pub fn requires_role_permissions(self) -> bool {
        !matches!(self, Self::View)
    }
}

impl FromStr for View {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|view| view.as_str() == s).ok_or(())
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A location within the console.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Route {
    Root,
    /// The OAuth redirect target, carrying the authorization code if one was sent.
    Callback { code: Option<String> },
    /// A guild, and optionally one of its views. Unknown view names are dropped.
    Guild { guild_id: GuildId, view: Option<View> },
}

impl Route {
    /// Parses a path with an optional query string. Anything unrecognised
    /// falls back to the root.
    pub fn parse(location: &str) -> Self {
        let (path, query) = match location.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (location, None),
        };
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        match (segments.next(), segments.next(), segments.next()) {
            (None, _, _) => Self::Root,
            (Some("callback"), None, _) => Self::Callback {
                code: query.and_then(|q| query_param(q, "code")),
            },
            (Some(guild_id), view, None) => Self::Guild {
                guild_id: guild_id.to_owned(),
                view: view.and_then(|v| v.parse().ok()),
            },
            _ => Self::Root,
        }
    }

    pub fn guild_id(&self) -> Option<&str> {
        match self {
            Self::Guild { guild_id, .. } => Some(guild_id),
            _ => None,
        }
    }

    pub fn view(&self) -> Option<View> {
        match self {
            Self::Guild { view, .. } => *view,
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("/"),
            Self::Callback { code: None } => f.write_str("/callback"),
            Self::Callback { code: Some(code) } => {
                let query = reqwest::Url::parse_with_params("http://localhost/callback", &[("code", code)])
                    .map_err(|_| fmt::Error)?;
                write!(f, "/callback?{}", query.query().unwrap_or_default())
            }
            Self::Guild { guild_id, view: None } => write!(f, "/{}", guild_id),
            Self::Guild {
                guild_id,
                view: Some(view),
            } => write!(f, "/{}/{}", guild_id, view),
        }
    }
}

fn query_param(query: &str, name: &str) -> Option<String> {
    let url = reqwest::Url::parse(&format!("http://localhost/?{}", query)).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
