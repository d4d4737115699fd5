use colours::models::{GuildInfo, GuildRecord, HexColour, Role};
use colours::navigation::View;
use colours::stores::{Notification, NotificationKind, Session};
use std::fmt::Write;
use std::sync::Arc;

/// A block of terminal background in the given colour. Unparsable colours
/// render as blank space so columns stay aligned.
pub fn swatch(colour: &str) -> String {
    match colour.parse::<HexColour>() {
        Ok(HexColour { r, g, b }) => format!("\x1b[48;2;{};{};{}m    \x1b[0m", r, g, b),
        Err(_) => "    ".to_owned(),
    }
}

pub fn notification(notification: &Notification) -> String {
    let prefix = match notification.kind {
        NotificationKind::Success => "ok",
        NotificationKind::Failure => "error",
    };
    format!("{}: {}", prefix, notification.message)
}

pub fn colours(record: &GuildRecord) -> String {
    if record.colours.is_empty() {
        return "No colours yet.".to_owned();
    }
    let mut out = String::new();
    for colour in record.colours.values() {
        let _ = writeln!(
            out,
            "{} {:<8} {} ({})",
            swatch(&colour.colour),
            colour.colour,
            colour.name,
            colour.id
        );
    }
    out
}

pub fn roles(roles: &[Arc<Role>]) -> String {
    if roles.is_empty() {
        return "Every role is already a colour.".to_owned();
    }
    let mut out = String::new();
    for role in roles {
        let _ = writeln!(
            out,
            "{} {:<8} {} ({}){}",
            swatch(&role.colour),
            role.colour,
            role.name,
            role.id,
            if role.hoist { " hoisted" } else { "" }
        );
    }
    out
}

pub fn guild_header(guild: &GuildInfo) -> String {
    match guild.icon_url() {
        Some(icon) => format!("{} ({})", guild.name, icon),
        None => guild.name.clone(),
    }
}

fn guild_line(out: &mut String, guild: &GuildInfo) {
    let marker = if guild.can_manage_roles() { '*' } else { ' ' };
    let _ = writeln!(out, "{} {} ({})", marker, guild.name, guild.id);
}

/// Guilds the bot is in come first. Guilds the user may manage roles in are
/// starred.
pub fn guilds(active: &[GuildInfo], inactive: &[GuildInfo]) -> String {
    let mut out = String::new();
    for guild in active {
        guild_line(&mut out, guild);
    }
    if !inactive.is_empty() {
        out.push_str("\nInvite the bot to:\n");
        for guild in inactive {
            guild_line(&mut out, guild);
        }
    }
    out
}

pub fn profile(session: &Session) -> String {
    match &session.info {
        Some(info) => match &info.avatar_url {
            Some(avatar) => format!("Signed in as {} ({})", info.display_name(), avatar),
            None => format!("Signed in as {}", info.display_name()),
        },
        None => format!("{:?}", session.state),
    }
}

/// The navigation bar of a guild, with the active view bracketed.
pub fn views(views: &[View], active: Option<View>) -> String {
    views
        .iter()
        .map(|view| {
            if Some(*view) == active {
                format!("[{}]", view.title())
            } else {
                view.title().to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}
