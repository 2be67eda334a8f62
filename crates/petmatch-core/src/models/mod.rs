//! Data models for PetMatch entities.
//!
//! - `User`: the authenticated account
//! - `Pet`, `PetImage`, `NewPet`, `PetUpdate`: pet profiles
//! - `Like`, `Pass`, `Match`, `Message`: swiping, matches and chat

pub mod pet;
pub mod social;
pub mod user;

pub use pet::{active_pet, Gender, NewPet, Pet, PetImage, PetType, PetUpdate};
pub use social::{LastMessage, Like, Match, Message, Pass};
pub use user::User;
