//! The fixed GraphQL documents the console sends, along with the shapes of
//! their variables and responses.

use crate::models::{Colour, GuildInfo, Role, SessionToken, UserProfile};
use serde::{Deserialize, Serialize};

/// A named GraphQL document.
#[derive(Debug)]
pub struct Operation {
    pub name: &'static str,
    pub document: &'static str,
}

pub const GET_GUILD: Operation = Operation {
    name: "GetGuild",
    document: r#"
query GetGuild($id: String!) {
    guild(id: $id) {
        colours {
            id
            name
            colour
        }
        roles {
            id
            name
            colour
            permissions
            hoist
        }
    }
}"#,
};

pub const CREATE_COLOURS: Operation = Operation {
    name: "CreateColour",
    document: r#"
mutation CreateColour($payload: [ColourCreateInput!]!, $id: String!) {
    createColours(guild: $id, details: $payload) {
        id
        name
        colour
    }
}"#,
};

pub const UPDATE_COLOUR: Operation = Operation {
    name: "UpdateColour",
    document: r#"
mutation UpdateColour($payload: ColourUpdateInput!, $id: String!) {
    updateColour(colourId: $id, newData: $payload) {
        id
        name
        colour
    }
}"#,
};

pub const DELETE_COLOURS: Operation = Operation {
    name: "DeleteColours",
    document: r#"
mutation DeleteColours($payload: [String!]!, $id: String!) {
    deleteColours(guild: $id, ids: $payload) {
        success
        id
    }
}"#,
};

pub const GET_ME_INFO: Operation = Operation {
    name: "GetMeInfo",
    document: r#"
query GetMeInfo {
    me {
        info {
            username
            discriminator
            id
            avatar
        }
        guilds(cachedOnly: false) {
            id
            name
            icon
            owner
            permissions
            cached
        }
    }
}"#,
};

pub const GET_TOKEN: Operation = Operation {
    name: "GetToken",
    document: r#"
query GetToken($code: String!) {
    token(code: $code) {
        accessToken
        tokenType
        expiresIn
        refreshToken
        scope
    }
}"#,
};

#[derive(Debug, Serialize)]
pub struct GuildVariables<'a> {
    pub id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GuildData {
    pub guild: GuildPayload,
}

#[derive(Debug, Deserialize)]
pub struct GuildPayload {
    pub colours: Vec<Colour>,
    pub roles: Vec<Role>,
}

/// Variables shared by every colour mutation: the target ID and a payload.
#[derive(Debug, Serialize)]
pub struct MutationVariables<'a, P> {
    pub id: &'a str,
    pub payload: P,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColourCreateInput {
    pub name: String,
    pub hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColourUpdateInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex: Option<String>,
    pub update_role_name: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateColoursData {
    pub create_colours: Vec<Colour>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateColourData {
    pub update_colour: Colour,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteColoursData {
    pub delete_colours: Vec<ColourDeleteResult>,
}

#[derive(Debug, Deserialize)]
pub struct ColourDeleteResult {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct NoVariables {}

#[derive(Debug, Deserialize)]
pub struct MeData {
    pub me: MePayload,
}

#[derive(Debug, Deserialize)]
pub struct MePayload {
    pub info: UserProfile,
    pub guilds: Vec<GuildInfo>,
}

#[derive(Debug, Serialize)]
pub struct TokenVariables<'a> {
    pub code: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenData {
    pub token: SessionToken,
}
