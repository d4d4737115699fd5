use crate::render;
use anyhow::{anyhow, bail, Result};
use clap::Subcommand;
use colours::models::GuildRecord;
use colours::navigation::{Route, View};
use colours::stores::{
    AuthState, ColourCreate, ColourUpdate, GuildStore, NotificationKind, NotificationStore,
    SessionStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// Leeway on top of the sign out delay for the clearing task to run.
const SIGN_OUT_LEEWAY: Duration = Duration::from_secs(1);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Exchange an OAuth authorization code for a session
    Login {
        /// Authorization code. Defaults to the code left by the last callback
        code: Option<String>,
    },

    /// Handle an OAuth redirect such as /callback?code=...
    Callback {
        location: String,
    },

    /// Open a console location such as /<guild>/<view>
    Open {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Show the signed in user
    Whoami,

    /// List the guilds visible to the signed in user
    Guilds,

    /// List the colours of a guild
    Colours {
        guild: String,
    },

    /// List the roles of a guild that could become colours
    Roles {
        guild: String,
    },

    /// Create one or more colours
    Create {
        guild: String,

        /// A colour as NAME=HEX, e.g. "Blue=#0000ff". May be repeated
        #[arg(short, long = "colour", required = true, value_parser = parse_colour)]
        colours: Vec<ColourCreate>,
    },

    /// Rename or recolour a colour
    Update {
        guild: String,

        /// ID of the colour
        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short = 'x', long)]
        hex: Option<String>,
    },

    /// Delete colours. The roles themselves are kept
    Delete {
        guild: String,

        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Turn existing roles into colours, keeping their name and colour
    Adopt {
        guild: String,

        #[arg(required = true)]
        roles: Vec<String>,
    },

    /// Forget the stored session
    Logout,
}

impl Command {
    /// The location the console opens at for this command.
    pub fn route(&self) -> Route {
        match self {
            Self::Callback { location } => Route::parse(location),
            Self::Open { path } => Route::parse(path),
            Self::Colours { guild } | Self::Create { guild, .. } | Self::Update { guild, .. } => {
                Route::Guild {
                    guild_id: guild.clone(),
                    view: Some(View::View),
                }
            }
            Self::Roles { guild } | Self::Adopt { guild, .. } => Route::Guild {
                guild_id: guild.clone(),
                view: Some(View::Roles),
            },
            Self::Delete { guild, .. } => Route::Guild {
                guild_id: guild.clone(),
                view: Some(View::Settings),
            },
            _ => Route::Root,
        }
    }
}

pub(crate) fn parse_colour(arg: &str) -> Result<ColourCreate, String> {
    let (name, hex) = arg
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=HEX, got {:?}", arg))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("colour name cannot be empty".to_owned());
    }
    Ok(ColourCreate::new(name, hex.trim()))
}

/// The composition root: every store exists once and is shared by handle.
pub struct Console {
    pub session: SessionStore,
    pub guilds: GuildStore,
    pub notifications: NotificationStore,
    pub sign_out_delay: Duration,
}

impl Console {
    pub async fn run(&self, command: Command) -> Result<()> {
        debug!("Running {:?}", command);
        match command {
            Command::Login { code } => {
                let code = code
                    .or_else(|| self.session.pending_code())
                    .ok_or_else(|| anyhow!("No authorization code. Open the login page first."))?;
                self.login(&code).await
            }
            Command::Callback { location } => self.callback(Route::parse(&location)).await,
            Command::Open { path } => self.open(Route::parse(&path)).await,
            Command::Whoami => {
                self.signed_in().await?;
                println!("{}", render::profile(&self.session.snapshot()));
                Ok(())
            }
            Command::Guilds => {
                self.signed_in().await?;
                print!(
                    "{}",
                    render::guilds(&self.session.active_guilds(), &self.session.inactive_guilds())
                );
                Ok(())
            }
            Command::Colours { guild } => {
                self.signed_in().await?;
                let record = self.load(&guild).await?;
                print!("{}", render::colours(&record));
                Ok(())
            }
            Command::Roles { guild } => {
                self.signed_in().await?;
                self.load(&guild).await?;
                print!("{}", render::roles(&self.guilds.candidate_roles(&guild)));
                Ok(())
            }
            Command::Create { guild, colours } => {
                self.manageable(&guild).await?;
                self.guilds.create_colours(&guild, colours).await;
                self.report()?;
                self.show_colours(&guild);
                Ok(())
            }
            Command::Update {
                guild,
                id,
                name,
                hex,
            } => {
                if name.is_none() && hex.is_none() {
                    bail!("Nothing to update. Pass --name and/or --hex.");
                }
                self.manageable(&guild).await?;
                let update = ColourUpdate {
                    id,
                    name,
                    colour: hex,
                };
                self.guilds.update_colour(&guild, update).await;
                self.report()?;
                self.show_colours(&guild);
                Ok(())
            }
            Command::Delete { guild, ids } => {
                self.manageable(&guild).await?;
                self.guilds.delete_colours(&guild, ids).await;
                self.report()?;
                self.show_colours(&guild);
                Ok(())
            }
            Command::Adopt { guild, roles } => {
                let record = self.manageable(&guild).await?;
                let colours = roles
                    .iter()
                    .map(|id| {
                        record
                            .roles
                            .get(id)
                            .map(|role| ColourCreate::from_role(role, None))
                            .ok_or_else(|| anyhow!("Unknown role {}", id))
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.guilds.create_colours(&guild, colours).await;
                self.report()?;
                self.show_colours(&guild);
                Ok(())
            }
            Command::Logout => {
                self.session.sign_out();
                println!("Signed out.");
                Ok(())
            }
        }
    }

    async fn login(&self, code: &str) -> Result<()> {
        self.session.get_token(code).await;
        if self.session.snapshot().info.is_none() {
            return self.fail_session().await;
        }
        println!("{}", render::profile(&self.session.snapshot()));
        Ok(())
    }

    async fn callback(&self, route: Route) -> Result<()> {
        let code = match route {
            Route::Callback { code } => code,
            other => bail!("{} is not an OAuth callback", other),
        };
        let target = self.session.handle_callback(code.as_deref());
        match self.session.pending_code() {
            Some(code) => self.login(&code).await?,
            None => bail!("Callback received but got no code."),
        }
        println!("Continue at {}", target);
        Ok(())
    }

    async fn open(&self, route: Route) -> Result<()> {
        if let Route::Callback { .. } = route {
            return self.callback(route).await;
        }
        if self.session.state() == AuthState::Unauthenticated {
            self.session.remember_area(&route);
            bail!("Not signed in. Run `login <code>`; the console will return to {}.", route);
        }
        self.signed_in().await?;
        self.session.navigate(&route);

        let session = self.session.snapshot();
        let guild_id = match session.active_guild.as_deref() {
            Some(guild_id) => guild_id,
            None => {
                println!("{}", render::profile(&session));
                print!(
                    "{}",
                    render::guilds(&self.session.active_guilds(), &self.session.inactive_guilds())
                );
                return Ok(());
            }
        };
        let views = self.session.available_views();
        let view = match session.active_view {
            Some(view) if views.contains(&view) => view,
            Some(view) => bail!("You cannot open {} in this guild.", view.title()),
            None => View::View,
        };
        match session.guilds.get(guild_id) {
            Some(info) => println!("{}", render::guild_header(info)),
            None => println!("{}", guild_id),
        }
        println!("{}\n", render::views(&views, Some(view)));

        let record = self.load(guild_id).await?;
        match view {
            View::View | View::Create | View::Settings => print!("{}", render::colours(&record)),
            View::Roles => print!("{}", render::roles(&self.guilds.candidate_roles(guild_id))),
        }
        Ok(())
    }

    /// Makes sure the profile is loaded. Without a session this fails right away.
    async fn signed_in(&self) -> Result<()> {
        if self.session.state() == AuthState::Unauthenticated {
            bail!("Not signed in. Run `login <code>` first.");
        }
        if self.session.snapshot().info.is_some() {
            return Ok(());
        }
        self.session.request_info().await;
        if self.session.snapshot().info.is_none() {
            return self.fail_session().await;
        }
        Ok(())
    }

    /// Signs in, loads the guild and checks for permission to manage roles.
    async fn manageable(&self, guild_id: &str) -> Result<Arc<GuildRecord>> {
        self.signed_in().await?;
        if !self.session.has_role_permissions(guild_id) {
            bail!("You need the Manage Roles permission in this guild.");
        }
        self.load(guild_id).await
    }

    async fn load(&self, guild_id: &str) -> Result<Arc<GuildRecord>> {
        match self.guilds.fetch_guild(guild_id).await {
            Some(record) => Ok(record),
            None => {
                self.report()?;
                bail!("Guild {} could not be loaded.", guild_id)
            }
        }
    }

    fn show_colours(&self, guild_id: &str) {
        if let Some(record) = self.guilds.guild(guild_id) {
            print!("{}", render::colours(&record));
        }
    }

    /// Prints and dismisses the active notification. Failures become errors.
    fn report(&self) -> Result<()> {
        let active = match self.notifications.active() {
            Some(active) => active,
            None => return Ok(()),
        };
        self.notifications.clear();
        match active.kind {
            NotificationKind::Success => {
                println!("{}", render::notification(&active));
                Ok(())
            }
            NotificationKind::Failure => Err(anyhow!(active.message)),
        }
    }

    /// A session ending failure was reported. Stay around until the session
    /// has been cleared so storage is not left half signed out.
    async fn fail_session(&self) -> Result<()> {
        let message = self
            .notifications
            .active()
            .map(|n| n.message)
            .unwrap_or_else(|| "Signing in failed.".to_owned());
        eprintln!("{}", message);

        let mut session = self.session.subscribe();
        let ended = session.wait_for(|s| s.state == AuthState::Unauthenticated);
        if tokio::time::timeout(self.sign_out_delay + SIGN_OUT_LEEWAY, ended)
            .await
            .is_err()
        {
            warn!("Session was not cleared in time");
        }
        bail!("Signed out.")
    }
}
