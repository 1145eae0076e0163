//! `randchat show <user_id>`: one user record plus recent partners.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use randchat_core::repository::talk::TalkRepository;
use randchat_types::user::{ChatState, User, UserId};

use crate::state::AppState;

pub async fn show_user(state: &AppState, user_id: i64, json: bool) -> Result<()> {
    let id = UserId(user_id);
    let Some(handle) = state.lifecycle().directory().get(id).await? else {
        bail!("user {id} not found");
    };
    let user = handle.snapshot().await;

    let limit = state.config.recent_partners_limit;
    let recent = state.lifecycle().talks().recent_partner_ids(id, limit).await?;

    if json {
        let out = serde_json::json!({
            "user": user,
            "recent_partners": recent,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(format!("User {id}")).cyan().bold());
    println!();
    println!("{}", user_table(&user));
    println!();

    if recent.is_empty() {
        println!("  {}", style("No talks yet.").dim());
    } else {
        let ids: Vec<String> = recent.iter().map(ToString::to_string).collect();
        println!("  Recent partners: {}", ids.join(", "));
    }
    println!();

    Ok(())
}

fn user_table(user: &User) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);

    let state_cell = match user.state {
        ChatState::Idle => Cell::new("○ idle").fg(Color::DarkGrey),
        ChatState::Waiting { since } => {
            Cell::new(format!("◌ waiting since {}", since.to_rfc3339())).fg(Color::Yellow)
        }
        ChatState::Chatting { partner } => {
            Cell::new(format!("● chatting with {partner}")).fg(Color::Green)
        }
    };

    let or_unset = |value: Option<String>| value.unwrap_or_else(|| "(not set)".to_string());

    table.add_row(vec![Cell::new("State"), state_cell]);
    table.add_row(vec![
        Cell::new("Languages"),
        Cell::new(user.languages.as_slice().join(", ")),
    ]);
    table.add_row(vec![
        Cell::new("Sex"),
        Cell::new(or_unset(user.sex.map(|s| s.to_string()))),
    ]);
    table.add_row(vec![
        Cell::new("Partner sex"),
        Cell::new(or_unset(user.partner_sex.map(|s| s.to_string()))),
    ]);
    table.add_row(vec![Cell::new("Bonuses"), Cell::new(user.bonus_count)]);
    table.add_row(vec![
        Cell::new("Invited by"),
        Cell::new(or_unset(user.invited_by.map(|id| id.to_string()))),
    ]);
    table.add_row(vec![Cell::new("Invitation"), Cell::new(user.invitation.as_str())]);
    table.add_row(vec![Cell::new("Setup step"), Cell::new(user.wizard.to_string())]);
    table.add_row(vec![
        Cell::new("Created"),
        Cell::new(user.created_at.to_rfc3339()).fg(Color::DarkGrey),
    ]);
    table
}
