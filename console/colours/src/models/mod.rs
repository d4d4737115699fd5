pub mod colour;
pub mod guild;
pub mod user;

pub use self::{
    colour::HexColour,
    guild::{Colour, GuildInfo, GuildRecord, Role},
    user::{SessionToken, UserProfile},
};
pub use twilight_model::guild::Permissions;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

pub type GuildId = String;
pub type RoleId = String;

pub const BASE_ASSET_URI: &str = "https://cdn.discordapp.com";

/// Anything keyed by a server-assigned ID.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Keys a list by ID. Iteration order of the result is the order of the input.
/// Later duplicates replace earlier ones but keep the earlier position.
pub fn mapify<T: Identified>(items: impl IntoIterator<Item = T>) -> IndexMap<String, T> {
    let mut map = IndexMap::new();
    for item in items {
        map.insert(item.id().to_owned(), item);
    }
    map
}

/// Permission bitmasks arrive either as JSON integers, possibly negative when
/// the backend squeezes them into a signed 32 bit field, or as decimal strings.
pub(crate) fn deserialize_permissions<'de, D>(deserializer: D) -> Result<Permissions, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPermissions {
        Int(i64),
        Str(String),
    }

    let bits = match RawPermissions::deserialize(deserializer)? {
        RawPermissions::Int(value) if value < 0 => u64::from(value as i32 as u32),
        RawPermissions::Int(value) => value as u64,
        RawPermissions::Str(value) => value.parse().map_err(serde::de::Error::custom)?,
    };
    Ok(Permissions::from_bits_truncate(bits))
}
