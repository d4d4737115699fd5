use super::notification::NotificationStore;
use crate::{
    gateway::{documents::*, Gateway},
    models::{GuildRecord, HexColour, Role},
    prelude::*,
    Error,
};
use dashmap::DashMap;
use tokio::sync::{broadcast, Mutex};

const CREATED_MESSAGE: &str = "Your colour(s) were created successfully!";
const UPDATED_MESSAGE: &str = "Your colour was updated successfully!";
const DELETED_MESSAGE: &str = "Colour was deleted successfully!";

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// A colour to create. The server assigns the ID.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColourCreate {
    pub name: String,
    pub hex: String,
    /// Adopts an existing role as a colour role instead of creating a new one.
    pub role_id: Option<RoleId>,
}

impl ColourCreate {
    pub fn new(name: impl Into<String>, hex: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hex: hex.into(),
            role_id: None,
        }
    }

    /// Turns an existing role into a colour role, optionally renaming it.
    pub fn from_role(role: &Role, name: Option<String>) -> Self {
        Self {
            name: name.unwrap_or_else(|| role.name.clone()),
            hex: role.colour.clone(),
            role_id: Some(role.id.clone()),
        }
    }
}

/// A partial update of a single colour.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ColourUpdate {
    pub id: RoleId,
    pub name: Option<String>,
    pub colour: Option<String>,
}

/// Emitted whenever a guild's cached record is replaced.
#[derive(Clone, Debug)]
pub struct GuildUpdate {
    pub guild_id: GuildId,
    pub record: Arc<GuildRecord>,
}

struct GuildStoreRef {
    gateway: Gateway,
    notifications: NotificationStore,
    guilds: DashMap<GuildId, Arc<GuildRecord>>,
    // Operations on one guild run one at a time, in the order they were
    // called. Guarded sections include the network round trip.
    locks: DashMap<GuildId, Arc<Mutex<()>>>,
    updates: broadcast::Sender<GuildUpdate>,
}

/// Client side cache of guild roles and colours, kept in sync with the
/// backend through the gateway.
///
/// Every operation reports its outcome through the notification store and
/// never returns an error. A record is only present once it has been fetched
/// successfully; absence means "not loaded yet", not "does not exist".
#[derive(Clone)]
pub struct GuildStore(Arc<GuildStoreRef>);

impl GuildStore {
    pub fn new(gateway: Gateway, notifications: NotificationStore) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self(Arc::new(GuildStoreRef {
            gateway,
            notifications,
            guilds: DashMap::new(),
            locks: DashMap::new(),
            updates,
        }))
    }

    /// Gets the cached record of a guild.
    ///
    /// This is an O(1) operation.
    pub fn guild(&self, guild_id: &str) -> Option<Arc<GuildRecord>> {
        self.0.guilds.get(guild_id).map(|r| Arc::clone(r.value()))
    }

    /// Gets the IDs of every cached guild.
    pub fn guilds(&self) -> Vec<GuildId> {
        self.0.guilds.iter().map(|r| r.key().clone()).collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GuildUpdate> {
        self.0.updates.subscribe()
    }

    /// Roles of a cached guild that are not colour roles yet.
    pub fn candidate_roles(&self, guild_id: &str) -> Vec<Arc<Role>> {
        self.guild(guild_id)
            .map(|record| record.candidate_roles().cloned().collect())
            .unwrap_or_default()
    }

    /// Loads a guild's roles and colours. Guilds already cached are returned
    /// as is without contacting the backend.
    pub async fn fetch_guild(&self, guild_id: &str) -> Option<Arc<GuildRecord>> {
        let _guard = self.lock(guild_id).await;
        if let Some(record) = self.guild(guild_id) {
            return Some(record);
        }
        let result = self.try_fetch_guild(guild_id).await;
        self.report(result, None)
    }

    pub async fn create_colour(
        &self,
        guild_id: &str,
        colour: ColourCreate,
    ) -> Option<Arc<GuildRecord>> {
        self.create_colours(guild_id, vec![colour]).await
    }

    /// Creates colours in bulk and merges whatever the server returns.
    /// Does nothing for guilds that are not cached.
    pub async fn create_colours(
        &self,
        guild_id: &str,
        colours: Vec<ColourCreate>,
    ) -> Option<Arc<GuildRecord>> {
        // Uncached guilds are skipped before a lock is ever made for them.
        self.guild(guild_id)?;
        let _guard = self.lock(guild_id).await;
        let current = self.guild(guild_id)?;
        if colours.is_empty() {
            return Some(current);
        }
        let result = self.try_create_colours(guild_id, &current, colours).await;
        self.report(result, Some(CREATED_MESSAGE))
    }

    /// Updates the name and/or colour of a single colour.
    /// Does nothing for guilds that are not cached.
    pub async fn update_colour(
        &self,
        guild_id: &str,
        update: ColourUpdate,
    ) -> Option<Arc<GuildRecord>> {
        self.guild(guild_id)?;
        let _guard = self.lock(guild_id).await;
        let current = self.guild(guild_id)?;
        let result = self.try_update_colour(guild_id, &current, update).await;
        self.report(result, Some(UPDATED_MESSAGE))
    }

    /// Deletes colours in bulk. Only the colours the server reports as
    /// deleted leave the cache; the roles themselves stay.
    /// Does nothing for guilds that are not cached.
    pub async fn delete_colours(
        &self,
        guild_id: &str,
        ids: Vec<RoleId>,
    ) -> Option<Arc<GuildRecord>> {
        self.guild(guild_id)?;
        let _guard = self.lock(guild_id).await;
        let current = self.guild(guild_id)?;
        let result = self.try_delete_colours(guild_id, &current, ids).await;
        self.report(result, Some(DELETED_MESSAGE))
    }

    async fn try_fetch_guild(&self, guild_id: &str) -> Result<Arc<GuildRecord>, Error> {
        let data: GuildData = self
            .0
            .gateway
            .query(&GET_GUILD, GuildVariables { id: guild_id })
            .await?;
        let record = GuildRecord::new(data.guild.roles, data.guild.colours);
        debug!(
            "Fetched guild {}: {} roles, {} colours",
            guild_id,
            record.roles.len(),
            record.colours.len()
        );
        Ok(self.publish(guild_id, record))
    }

    async fn try_create_colours(
        &self,
        guild_id: &str,
        current: &GuildRecord,
        colours: Vec<ColourCreate>,
    ) -> Result<Arc<GuildRecord>, Error> {
        let payload = colours
            .into_iter()
            .map(|colour| -> Result<ColourCreateInput, Error> {
                let hex: HexColour = colour.hex.parse()?;
                Ok(ColourCreateInput {
                    name: colour.name,
                    hex: hex.to_string(),
                    role_id: colour.role_id,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let data: CreateColoursData = self
            .0
            .gateway
            .mutate(
                &CREATE_COLOURS,
                MutationVariables {
                    id: guild_id,
                    payload,
                },
            )
            .await?;
        Ok(self.publish(guild_id, current.with_colours(data.create_colours)))
    }

    async fn try_update_colour(
        &self,
        guild_id: &str,
        current: &GuildRecord,
        update: ColourUpdate,
    ) -> Result<Arc<GuildRecord>, Error> {
        let hex = match update.colour {
            Some(colour) => Some(colour.parse::<HexColour>()?.to_string()),
            None => None,
        };

        // The mutation is addressed by colour ID; the guild is implied.
        let data: UpdateColourData = self
            .0
            .gateway
            .mutate(
                &UPDATE_COLOUR,
                MutationVariables {
                    id: update.id.as_str(),
                    payload: ColourUpdateInput {
                        name: update.name,
                        hex,
                        update_role_name: true,
                    },
                },
            )
            .await?;
        Ok(self.publish(guild_id, current.with_colours([data.update_colour])))
    }

    async fn try_delete_colours(
        &self,
        guild_id: &str,
        current: &GuildRecord,
        ids: Vec<RoleId>,
    ) -> Result<Arc<GuildRecord>, Error> {
        let data: DeleteColoursData = self
            .0
            .gateway
            .mutate(
                &DELETE_COLOURS,
                MutationVariables {
                    id: guild_id,
                    payload: ids,
                },
            )
            .await?;

        for failed in data.delete_colours.iter().filter(|r| !r.success) {
            debug!("Server declined to delete colour {} in {}", failed.id, guild_id);
        }
        let deleted = data
            .delete_colours
            .iter()
            .filter(|r| r.success)
            .map(|r| r.id.as_str());
        Ok(self.publish(guild_id, current.without_colours(deleted)))
    }

    /// Replaces the cached record of a guild and tells subscribers about it.
    fn publish(&self, guild_id: &str, record: GuildRecord) -> Arc<GuildRecord> {
        let record = Arc::new(record);
        self.0
            .guilds
            .insert(guild_id.to_owned(), Arc::clone(&record));
        // Nobody listening is fine.
        let _ = self.0.updates.send(GuildUpdate {
            guild_id: guild_id.to_owned(),
            record: Arc::clone(&record),
        });
        record
    }

    fn report<T>(&self, result: Result<T, Error>, success: Option<&str>) -> Option<T> {
        match result {
            Ok(value) => {
                if let Some(message) = success {
                    self.0.notifications.success(message);
                }
                Some(value)
            }
            Err(err) => {
                error!("Guild operation failed: {:?}", err);
                self.0.notifications.failure(err.to_string());
                None
            }
        }
    }

    async fn lock(&self, guild_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = self
            .0
            .locks
            .entry(guild_id.to_owned())
            .or_default()
            .value()
            .clone();
        lock.lock_owned().await
    }
}
