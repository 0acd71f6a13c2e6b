use serde::Serialize;

use rosterbot_core::color::Color;

use crate::gateway::{RoleHandle, RoleId, UserId};
use crate::provision::RoleSet;

pub const ACTION_PRIMARY: &str = "primary";
pub const ACTION_SECONDARY: &str = "secondary";
pub const ACTION_CUSTOM: &str = "custom";
pub const ACTION_CANCEL: &str = "cancel";

const NOTICE_RED: u32 = 0xFF0000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Success,
    Primary,
    Secondary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub action_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl Button {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self { action_id: action_id.into(), label: label.into(), style }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl Embed {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            color: None,
            fields: Vec::new(),
            thumbnail_url: None,
        }
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color.value());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField { name: name.into(), value: value.into(), inline: false });
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// A command reply or reply edit. Editing with empty `buttons` strips the
/// previously attached controls, which is how terminal notices retire the
/// selection row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReplyPayload {
    pub content: String,
    pub embeds: Vec<Embed>,
    pub buttons: Vec<Button>,
    pub ephemeral: bool,
}

impl ReplyPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), embeds: Vec::new(), buttons: Vec::new(), ephemeral: false }
    }

    pub fn embed(embed: Embed) -> Self {
        Self { content: String::new(), embeds: vec![embed], buttons: Vec::new(), ephemeral: false }
    }

    pub fn ephemeral_text(content: impl Into<String>) -> Self {
        Self { content: content.into(), embeds: Vec::new(), buttons: Vec::new(), ephemeral: true }
    }

    pub fn buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }
}

pub fn role_mention(role: RoleId) -> String {
    format!("<@&{role}>")
}

pub fn user_mention(user: UserId) -> String {
    format!("<@{user}>")
}

pub fn avatar_url(team_number: u32) -> String {
    format!("https://www.thebluealliance.com/avatar/2024/frc{team_number}.png")
}

/// Presentation payload: the team-assignment embed plus the four mutually
/// exclusive choice controls.
pub fn setup_prompt(team_number: u32, roles: &RoleSet) -> ReplyPayload {
    let embed = Embed::new(
        "Team Assignment",
        format!(
            "Welcome {}!\nYou are the first of your team to join the server",
            role_mention(roles.team_role.id)
        ),
    )
    .color(roles.primary_color_role.color)
    .field(
        "Select Color:",
        format!(
            "{}\n{}\nA Custom Hex?",
            role_mention(roles.primary_color_role.id),
            role_mention(roles.secondary_color_role.id)
        ),
    )
    .thumbnail(avatar_url(team_number));

    ReplyPayload::embed(embed).buttons(vec![
        Button::new(ACTION_PRIMARY, "Primary", ButtonStyle::Success),
        Button::new(ACTION_SECONDARY, "Secondary", ButtonStyle::Primary),
        Button::new(ACTION_CUSTOM, "Custom", ButtonStyle::Secondary),
        Button::new(ACTION_CANCEL, "Cancel", ButtonStyle::Danger),
    ])
}

pub fn color_committed(team_number: u32, team_role: RoleId, user: UserId, color: Color) -> ReplyPayload {
    let embed = Embed::new(
        "Team Assignment",
        format!("Added you to {}, {}", role_mention(team_role), user_mention(user)),
    )
    .color(color)
    .thumbnail(avatar_url(team_number));

    ReplyPayload::embed(embed)
}

/// Reply for the existing-team fast path, listing whoever already holds
/// the role.
pub fn roster(
    team_number: u32,
    team_role: &RoleHandle,
    user: UserId,
    teammates: &[UserId],
) -> ReplyPayload {
    let members = if teammates.is_empty() {
        "You're the first one!".to_owned()
    } else {
        teammates.iter().map(|id| user_mention(*id)).collect::<Vec<_>>().join("\n")
    };

    let embed = Embed::new(
        "Team Assignment",
        format!("Added you to {}, {}", role_mention(team_role.id), user_mention(user)),
    )
    .color(team_role.color)
    .field("Others on your team in the server:", members)
    .thumbnail(avatar_url(team_number));

    ReplyPayload::embed(embed)
}

fn custom_color_embed(team_number: u32, team_role: RoleId, color: Color) -> Embed {
    Embed::new(
        "Custom Color",
        format!(
            "Please enter a hex code for the color you\nwould like to use for {}",
            role_mention(team_role)
        ),
    )
    .color(color)
    .thumbnail(avatar_url(team_number))
}

const HEX_FORMATS: &str = "Accepted formats are **#RRGGBB**, **RRGGBB**, **#RGB**, and **RGB**";

pub fn custom_prompt(team_number: u32, team_role: RoleId, role_color: Color) -> ReplyPayload {
    let embed =
        custom_color_embed(team_number, team_role, role_color).field("Formatting:", HEX_FORMATS);
    ReplyPayload::embed(embed)
}

pub fn custom_retry(
    team_number: u32,
    team_role: RoleId,
    role_color: Color,
    attempt: u32,
) -> ReplyPayload {
    let embed = custom_color_embed(team_number, team_role, role_color).field(
        format!("**Invalid hex code, please try again ({attempt})**"),
        HEX_FORMATS,
    );
    ReplyPayload::embed(embed)
}

pub fn custom_committed(
    team_number: u32,
    team_role: RoleId,
    user: UserId,
    color: Color,
) -> ReplyPayload {
    let embed = custom_color_embed(team_number, team_role, color).field(
        "Role Assignment",
        format!("Added you to {}, {}", role_mention(team_role), user_mention(user)),
    );
    ReplyPayload::embed(embed)
}

pub fn cancel_notice(team_number: u32) -> ReplyPayload {
    let embed = Embed::new("Operation Cancelled", "Run /setup to try again")
        .color(Color::from_rgb(NOTICE_RED))
        .thumbnail(avatar_url(team_number));
    ReplyPayload::embed(embed)
}

pub fn failure_notice(team_number: u32) -> ReplyPayload {
    let embed = Embed::new("Something went wrong", "Perhaps a timeout? Run /setup to try again")
        .color(Color::from_rgb(NOTICE_RED))
        .thumbnail(avatar_url(team_number));
    ReplyPayload::embed(embed)
}

pub fn team_not_found() -> ReplyPayload {
    ReplyPayload::text("Team data or colors not found.")
}

pub fn admin_denial() -> ReplyPayload {
    ReplyPayload::ephemeral_text("You do not have permission to use this command.")
}

pub fn command_error(detail: &str, request_id: &str) -> ReplyPayload {
    ReplyPayload::ephemeral_text(format!("{detail} (request `{request_id}`)"))
}

pub fn map_display(rendered: &str) -> ReplyPayload {
    ReplyPayload::text(format!("```json\n{rendered}\n```"))
}

pub fn map_updating(keyword: &str, emoji: &str) -> ReplyPayload {
    ReplyPayload::text(format!("Updating Keyword: {keyword} with Emoji: {emoji}..."))
}

pub fn map_updated(keyword: &str, emoji: &str) -> ReplyPayload {
    ReplyPayload::text(format!("Successfully updated Keyword: {keyword} with Emoji: {emoji}"))
}

pub fn map_saved_locally(keyword: &str) -> ReplyPayload {
    ReplyPayload::text(format!("Updated Keyword: {keyword} but failed to push changes."))
}

pub fn map_update_failed() -> ReplyPayload {
    ReplyPayload::text("Failed to update the reaction map.")
}

#[cfg(test)]
mod tests {
    use rosterbot_core::color::Color;

    use super::{setup_prompt, ACTION_CANCEL, ACTION_CUSTOM, ACTION_PRIMARY, ACTION_SECONDARY};
    use crate::gateway::{RoleHandle, RoleId};
    use crate::provision::RoleSet;

    fn role(id: u64, name: &str, color: u32) -> RoleHandle {
        RoleHandle { id: RoleId(id), name: name.to_owned(), color: Color::from_rgb(color) }
    }

    fn role_set() -> RoleSet {
        RoleSet {
            team_role: role(1, "254 | Cheesy Poofs", 0),
            primary_color_role: role(2, "254 | Cheesy Poofs Primary", 0x0066B3),
            secondary_color_role: role(3, "254 | Cheesy Poofs Secondary", 0xFFFFFF),
        }
    }

    #[test]
    fn prompt_offers_exactly_the_four_choice_controls() {
        let payload = setup_prompt(254, &role_set());
        let ids: Vec<&str> = payload.buttons.iter().map(|b| b.action_id.as_str()).collect();
        assert_eq!(ids, vec![ACTION_PRIMARY, ACTION_SECONDARY, ACTION_CUSTOM, ACTION_CANCEL]);
    }

    #[test]
    fn prompt_embed_mentions_all_three_roles() {
        let payload = setup_prompt(254, &role_set());
        let embed = payload.embeds.first().expect("one embed");

        assert!(embed.description.contains("<@&1>"));
        let select = embed.fields.first().expect("select field");
        assert!(select.value.contains("<@&2>"));
        assert!(select.value.contains("<@&3>"));
    }

    #[test]
    fn prompt_thumbnail_is_keyed_by_team_number() {
        let payload = setup_prompt(254, &role_set());
        let embed = payload.embeds.first().expect("one embed");
        assert_eq!(
            embed.thumbnail_url.as_deref(),
            Some("https://www.thebluealliance.com/avatar/2024/frc254.png")
        );
    }

    #[test]
    fn prompt_takes_the_primary_role_color() {
        let payload = setup_prompt(254, &role_set());
        assert_eq!(payload.embeds[0].color, Some(0x0066B3));
    }
}
