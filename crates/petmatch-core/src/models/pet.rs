use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::ValidationErrors;

/// Backend column limits for pet profiles
const MAX_NAME_LENGTH: usize = 100;
const MAX_BREED_LENGTH: usize = 100;
const MAX_BIO_LENGTH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum PetType {
    Dog,
    Cat,
    Bird,
    Rabbit,
    Other,
}

impl PetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PetType::Dog => "dog",
            PetType::Cat => "cat",
            PetType::Bird => "bird",
            PetType::Rabbit => "rabbit",
            PetType::Other => "other",
        }
    }
}

impl fmt::Display for PetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dog" => Ok(PetType::Dog),
            "cat" => Ok(PetType::Cat),
            "bird" => Ok(PetType::Bird),
            "rabbit" => Ok(PetType::Rabbit),
            "other" => Ok(PetType::Other),
            other => Err(format!("unknown pet type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => f.write_str("male"),
            Gender::Female => f.write_str("female"),
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            other => Err(format!("unknown gender '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PetImage {
    pub id: i64,
    pub image: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A pet profile owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Pet {
    pub id: i64,
    pub owner: i64,
    #[serde(default)]
    pub owner_email: String,
    pub name: String,
    pub pet_type: PetType,
    pub breed: String,
    pub age: i32,
    pub gender: Gender,
    pub bio: String,
    pub main_image: Option<String>,
    #[serde(default)]
    pub images: Vec<PetImage>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pet {
    /// One-line summary, e.g. "Rex (dog, Labrador, 3y)"
    pub fn summary(&self) -> String {
        format!("{} ({}, {}, {}y)", self.name, self.pet_type, self.breed, self.age)
    }

    /// Main image if set, otherwise the most recent gallery image
    pub fn cover_image(&self) -> Option<&str> {
        self.main_image
            .as_deref()
            .filter(|url| !url.is_empty())
            .or_else(|| self.images.first().map(|img| img.image.as_str()))
    }
}

/// The pet the user swipes as: the active one, else the first listed.
pub fn active_pet(pets: &[Pet]) -> Option<&Pet> {
    pets.iter().find(|p| p.is_active).or_else(|| pets.first())
}

/// Payload for creating a pet profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NewPet {
    pub name: String,
    pub pet_type: PetType,
    pub breed: String,
    pub age: i32,
    pub gender: Gender,
    pub bio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub additional_images: Vec<String>,
}

impl NewPet {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate_profile(&self.name, &self.breed, self.age, &self.bio)
    }
}

/// Full replacement of a pet's editable fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PetUpdate {
    pub name: String,
    pub pet_type: PetType,
    pub breed: String,
    pub age: i32,
    pub gender: Gender,
    pub bio: String,
    pub main_image: Option<String>,
    pub is_active: bool,
}

impl PetUpdate {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        validate_profile(&self.name, &self.breed, self.age, &self.bio)
    }
}

impl From<&Pet> for PetUpdate {
    fn from(pet: &Pet) -> Self {
        Self {
            name: pet.name.clone(),
            pet_type: pet.pet_type,
            breed: pet.breed.clone(),
            age: pet.age,
            gender: pet.gender,
            bio: pet.bio.clone(),
            main_image: pet.main_image.clone(),
            is_active: pet.is_active,
        }
    }
}

fn validate_profile(name: &str, breed: &str, age: i32, bio: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if name.trim().is_empty() {
        errors.add("name", "This field may not be blank.");
    } else if name.chars().count() > MAX_NAME_LENGTH {
        errors.add("name", "Ensure this field has no more than 100 characters.");
    }
    if breed.trim().is_empty() {
        errors.add("breed", "This field may not be blank.");
    } else if breed.chars().count() > MAX_BREED_LENGTH {
        errors.add("breed", "Ensure this field has no more than 100 characters.");
    }
    if age < 0 {
        errors.add("age", "Age cannot be negative.");
    }
    if bio.chars().count() > MAX_BIO_LENGTH {
        errors.add("bio", "Ensure this field has no more than 500 characters.");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
