//! Discovery, swipes, matches and chat.

use anyhow::{anyhow, Result};
use futures::future::try_join;
use petmatch_core::models::{Match, Message};

use super::{pet_row, pet_table_header, Context};
use crate::output::{self, OutputFormat};

/// Show pets the acting pet can swipe on.
pub async fn discover(ctx: &Context, as_pet: Option<i64>) -> Result<()> {
    ctx.require_user()?;
    let pet_id = ctx.acting_pet(as_pet).await?;
    let candidates = ctx.api().discover(pet_id).await?;

    match ctx.format {
        OutputFormat::Text => {
            if candidates.is_empty() {
                println!("No more pets to discover. Check back later!");
            } else {
                println!("{}", pet_table_header());
                output::print_divider();
                for pet in &candidates {
                    println!("{}", pet_row(pet));
                }
            }
        }
        OutputFormat::Json => output::print_json(&candidates)?,
    }
    Ok(())
}

/// Like another pet. Reports a match when the like was mutual.
pub async fn like(ctx: &Context, to_pet: i64, as_pet: Option<i64>) -> Result<()> {
    ctx.require_user()?;
    let from_pet = ctx.acting_pet(as_pet).await?;
    let like = ctx.api().like(from_pet, to_pet).await?;

    match ctx.format {
        OutputFormat::Text => match &like.matched {
            Some(matched) => println!(
                "It's a match with {}! (match {})",
                display_name(&like.to_pet_name, to_pet),
                matched.id
            ),
            None => println!("Liked {}", display_name(&like.to_pet_name, to_pet)),
        },
        OutputFormat::Json => output::print_json(&like)?,
    }
    Ok(())
}

/// Pass on another pet.
pub async fn pass(ctx: &Context, to_pet: i64, as_pet: Option<i64>) -> Result<()> {
    ctx.require_user()?;
    let from_pet = ctx.acting_pet(as_pet).await?;
    let pass = ctx.api().pass(from_pet, to_pet).await?;

    match ctx.format {
        OutputFormat::Text => println!("Passed on pet {}", to_pet),
        OutputFormat::Json => output::print_json(&pass)?,
    }
    Ok(())
}

fn display_name(name: &str, pet_id: i64) -> String {
    if name.is_empty() {
        format!("pet {}", pet_id)
    } else {
        name.to_string()
    }
}

/// Ids of the user's own pets and their matches, fetched together.
async fn own_pets_and_matches(ctx: &Context) -> Result<(Vec<i64>, Vec<Match>)> {
    let (pets, matches) = try_join(ctx.api().list_pets(), ctx.api().list_matches()).await?;
    Ok((pets.iter().map(|p| p.id).collect(), matches))
}

pub(crate) fn match_line(matched: &Match, own_pet_ids: &[i64]) -> String {
    let own = matched.own_pet(own_pet_ids).map(|p| p.name.as_str()).unwrap_or("?");
    let partner = matched.partner(own_pet_ids).map(|p| p.name.as_str()).unwrap_or("?");
    let unread = if matched.has_unread(own_pet_ids) { "*" } else { " " };
    let preview = matched
        .last_message
        .as_ref()
        .map(|m| m.content.as_str())
        .unwrap_or("Say hello!");
    format!("{} {:<6} {} & {}: {}", unread, matched.id, own, partner, preview)
}

/// List matches. Unread conversations are marked with `*`.
pub async fn matches(ctx: &Context) -> Result<()> {
    ctx.require_user()?;
    let (own_pet_ids, matches) = own_pets_and_matches(ctx).await?;

    match ctx.format {
        OutputFormat::Text => {
            if matches.is_empty() {
                println!("No matches yet. Keep swiping!");
            } else {
                for matched in &matches {
                    println!("{}", match_line(matched, &own_pet_ids));
                }
            }
        }
        OutputFormat::Json => output::print_json(&matches)?,
    }
    Ok(())
}

fn message_line(message: &Message, own_pet_ids: &[i64]) -> String {
    let sender = if own_pet_ids.contains(&message.sender_pet) {
        "you".to_string()
    } else {
        display_name(&message.sender_pet_name, message.sender_pet)
    };
    format!(
        "[{}] {}: {}",
        message.created_at.format("%Y-%m-%d %H:%M"),
        sender,
        message.content
    )
}

/// Show the conversation in a match and mark it read.
pub async fn messages(ctx: &Context, match_id: i64) -> Result<()> {
    ctx.require_user()?;
    let (pets, messages) =
        try_join(ctx.api().list_pets(), ctx.api().list_messages(match_id)).await?;
    ctx.api().mark_messages_read(match_id).await?;
    let own_pet_ids: Vec<i64> = pets.iter().map(|p| p.id).collect();

    match ctx.format {
        OutputFormat::Text => {
            if messages.is_empty() {
                println!("No messages yet");
            } else {
                for message in &messages {
                    println!("{}", message_line(message, &own_pet_ids));
                }
            }
        }
        OutputFormat::Json => output::print_json(&messages)?,
    }
    Ok(())
}

/// Send a message in a match, as the user's pet in that match.
pub async fn send(ctx: &Context, match_id: i64, text: &str) -> Result<()> {
    ctx.require_user()?;
    let (own_pet_ids, matches) = own_pets_and_matches(ctx).await?;
    let sender = matches
        .iter()
        .find(|m| m.id == match_id)
        .and_then(|m| m.own_pet(&own_pet_ids))
        .map(|p| p.id)
        .ok_or_else(|| anyhow!("Match {} not found", match_id))?;

    let message = ctx.api().send_message(match_id, sender, text).await?;

    match ctx.format {
        OutputFormat::Text => println!("{}", message_line(&message, &own_pet_ids)),
        OutputFormat::Json => output::print_json(&message)?,
    }
    Ok(())
}
