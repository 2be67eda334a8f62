//! CLI command implementations.

mod auth;
mod pets;
mod social;

pub use auth::{login, logout, register, whoami};
pub use pets::{pets_activate, pets_add, pets_list, pets_remove, pets_show};
pub use social::{discover, like, matches, messages, pass, send};

use anyhow::{anyhow, bail, Result};
use petmatch_core::models::{active_pet, Pet, User};
use petmatch_core::{ApiClient, Config, SessionController};

use crate::output::OutputFormat;

pub const NOT_LOGGED_IN: &str = "Not logged in";

/// Everything a command needs: the restored session, the loaded config and
/// how to print.
pub struct Context {
    pub session: SessionController,
    pub config: Config,
    pub format: OutputFormat,
}

impl Context {
    pub fn api(&self) -> &ApiClient {
        self.session.api()
    }

    /// The logged-in user, or an error for commands that need one.
    pub fn require_user(&self) -> Result<User> {
        self.session.user().ok_or_else(|| anyhow!(NOT_LOGGED_IN))
    }

    /// The pet to act as: `explicit` when given, otherwise the active pet.
    pub async fn acting_pet(&self, explicit: Option<i64>) -> Result<i64> {
        if let Some(id) = explicit {
            return Ok(id);
        }
        let pets = self.api().list_pets().await?;
        match active_pet(&pets) {
            Some(pet) => Ok(pet.id),
            None => bail!("You have no pets yet. Add one with 'petmatch pets add'"),
        }
    }
}

/// Table row for a pet, shared by listings.
pub(crate) fn pet_row(pet: &Pet) -> String {
    let marker = if pet.is_active { "*" } else { " " };
    format!(
        "{} {:<6} {:<16} {:<8} {:<16} {:>3}  {}",
        marker,
        pet.id,
        pet.name,
        pet.pet_type.as_str(),
        pet.breed,
        pet.age,
        pet.gender
    )
}

pub(crate) fn pet_table_header() -> String {
    format!(
        "  {:<6} {:<16} {:<8} {:<16} {:>3}  {}",
        "ID", "Name", "Type", "Breed", "Age", "Gender"
    )
}
