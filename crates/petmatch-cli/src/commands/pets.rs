//! Pet profile commands.

use anyhow::Result;
use futures::future::try_join;
use petmatch_core::models::{NewPet, Pet};

use super::{pet_row, pet_table_header, Context};
use crate::output::{self, OutputFormat};

/// List the user's pets. The active pet is marked with `*`.
pub async fn pets_list(ctx: &Context) -> Result<()> {
    ctx.require_user()?;
    let pets = ctx.api().list_pets().await?;

    match ctx.format {
        OutputFormat::Text => {
            if pets.is_empty() {
                println!("No pets yet. Add one with 'petmatch pets add'");
            } else {
                println!("{}", pet_table_header());
                output::print_divider();
                for pet in &pets {
                    println!("{}", pet_row(pet));
                }
            }
        }
        OutputFormat::Json => output::print_json(&pets)?,
    }
    Ok(())
}

/// Show one pet with its gallery.
pub async fn pets_show(ctx: &Context, pet_id: i64) -> Result<()> {
    ctx.require_user()?;
    let (pet, images) = try_join(ctx.api().get_pet(pet_id), ctx.api().pet_images(pet_id)).await?;

    match ctx.format {
        OutputFormat::Text => {
            print_pet(&pet);
            if !images.is_empty() {
                output::print_heading("Images");
                for image in &images {
                    println!("  {}", image.image);
                }
            }
        }
        OutputFormat::Json => output::print_json(&Pet { images, ..pet })?,
    }
    Ok(())
}

fn print_pet(pet: &Pet) {
    output::print_heading(&pet.name);
    output::print_row("ID", &pet.id.to_string());
    output::print_row("Type", pet.pet_type.as_str());
    output::print_row("Breed", &pet.breed);
    output::print_row("Age", &pet.age.to_string());
    output::print_row("Gender", &pet.gender.to_string());
    output::print_row("Active", if pet.is_active { "yes" } else { "no" });
    if let Some(cover) = pet.cover_image() {
        output::print_row("Photo", cover);
    }
    if !pet.bio.is_empty() {
        output::print_row("Bio", &pet.bio);
    }
}

/// Create a pet profile.
pub async fn pets_add(ctx: &Context, pet: NewPet) -> Result<()> {
    ctx.require_user()?;
    let pet = ctx.api().create_pet(&pet).await?;

    match ctx.format {
        OutputFormat::Text => println!("Added {} (id {})", pet.summary(), pet.id),
        OutputFormat::Json => output::print_json(&pet)?,
    }
    Ok(())
}

/// Make a pet the one used for discovery.
pub async fn pets_activate(ctx: &Context, pet_id: i64) -> Result<()> {
    ctx.require_user()?;
    let pet = ctx.api().set_active_pet(pet_id).await?;

    match ctx.format {
        OutputFormat::Text => println!("{} is now your active pet", pet.name),
        OutputFormat::Json => output::print_json(&pet)?,
    }
    Ok(())
}

/// Delete a pet profile.
pub async fn pets_remove(ctx: &Context, pet_id: i64) -> Result<()> {
    ctx.require_user()?;
    ctx.api().delete_pet(pet_id).await?;
    output::print_success(&format!("Removed pet {}", pet_id), ctx.format);
    Ok(())
}
