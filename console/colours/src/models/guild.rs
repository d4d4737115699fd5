use super::{deserialize_permissions, mapify, Identified, Permissions, RoleId, BASE_ASSET_URI};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A Discord role managed by the bot.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub colour: String,
    #[serde(deserialize_with = "deserialize_permissions")]
    pub permissions: Permissions,
    pub hoist: bool,
}

/// A role the bot manages as a colour role.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Colour {
    pub id: RoleId,
    pub name: String,
    pub colour: String,
}

impl Identified for Role {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Colour {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Everything known about one guild's roles and colours.
///
/// Records are immutable once published by the guild store. Every change
/// produces a new record that shares the untouched entries with its
/// predecessor, so an `Arc` held onto by a caller keeps describing the point
/// in time it was read at.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GuildRecord {
    pub roles: IndexMap<RoleId, Arc<Role>>,
    pub colours: IndexMap<RoleId, Arc<Colour>>,
}

impl GuildRecord {
    pub fn new(roles: Vec<Role>, colours: Vec<Colour>) -> Self {
        Self {
            roles: mapify(roles.into_iter().map(Arc::new)),
            colours: mapify(colours.into_iter().map(Arc::new)),
        }
    }

    /// Returns a copy with the given colours inserted. Existing IDs are
    /// overwritten in place; new IDs are appended. Entries equal to what is
    /// already cached keep their existing allocation.
    pub fn with_colours(&self, colours: impl IntoIterator<Item = Colour>) -> Self {
        let mut next = self.clone();
        for colour in colours {
            match next.colours.get(&colour.id) {
                Some(existing) if **existing == colour => {}
                _ => {
                    next.colours.insert(colour.id.clone(), Arc::new(colour));
                }
            }
        }
        next
    }

    /// Returns a copy without the given colours. Roles are left untouched.
    pub fn without_colours<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut next = self.clone();
        for id in ids {
            next.colours.shift_remove(id);
        }
        next
    }

    /// Roles that are not colour roles yet, in server order.
    pub fn candidate_roles(&self) -> impl Iterator<Item = &Arc<Role>> + '_ {
        self.roles
            .values()
            .filter(move |role| !self.colours.contains_key(&role.id))
    }
}

impl<T: Identified> Identified for Arc<T> {
    fn id(&self) -> &str {
        (**self).id()
    }
}

/// A guild as seen by the signed in user.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GuildInfo {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub owner: bool,
    #[serde(deserialize_with = "deserialize_permissions")]
    pub permissions: Permissions,
    /// Whether the bot is present in the guild.
    #[serde(default)]
    pub cached: bool,
}

impl GuildInfo {
    /// Whether the user may manage colour roles. Administrators implicitly may.
    pub fn can_manage_roles(&self) -> bool {
        self.permissions
            .intersects(Permissions::MANAGE_ROLES | Permissions::ADMINISTRATOR)
    }

    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .as_ref()
            .map(|hash| format!("{}/icons/{}/{}.png", BASE_ASSET_URI, self.id, hash))
    }
}

impl Identified for GuildInfo {
    fn id(&self) -> &str {
        &self.id
    }
}
