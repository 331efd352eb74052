//! Notification policy: which channels to use for a sighting and what to say.
//!
//! Pure decision logic. Nothing here performs I/O.

use orange_collar_core::{ContactChannel, PetId, PhoneNumber};

use crate::models::{Pet, User};

/// One decided notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    /// Send `body` as a text message to `to`.
    Text { to: PhoneNumber, body: String },
    /// Call `to`; the provider fetches the call document for `pet_id`.
    VoiceCall { to: PhoneNumber, pet_id: PetId },
}

impl DispatchAction {
    /// The channel this action uses.
    #[must_use]
    pub const fn channel(&self) -> ContactChannel {
        match self {
            Self::Text { .. } => ContactChannel::Sms,
            Self::VoiceCall { .. } => ContactChannel::Voice,
        }
    }
}

/// What the policy decided for a sighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchPlan {
    /// The owner has no phone number on file.
    NoContactInfo,
    /// Actions to run in order. May be empty when the owner opted out of
    /// every supported channel.
    Actions(Vec<DispatchAction>),
}

/// The text sent to an owner when their pet is sighted.
#[must_use]
pub fn sighting_message(pet: &Pet, app_name: &str) -> String {
    format!(
        "Your {}, {}, was sighted in the area. Log in to {app_name} to change your pet's status.",
        pet.species, pet.name
    )
}

/// Decide how to notify `owner` about a sighting of `pet`.
///
/// Texts come before calls. `allow_mms` never yields an action.
#[must_use]
pub fn plan_notifications(pet: &Pet, owner: &User, app_name: &str) -> DispatchPlan {
    if !owner.has_contact_info() {
        return DispatchPlan::NoContactInfo;
    }

    let mut actions = Vec::with_capacity(2);

    if owner.preferences.allows(ContactChannel::Sms) {
        actions.push(DispatchAction::Text {
            to: owner.primary_phone.clone(),
            body: sighting_message(pet, app_name),
        });
    }

    if owner.preferences.allows(ContactChannel::Voice) {
        actions.push(DispatchAction::VoiceCall {
            to: owner.primary_phone.clone(),
            pet_id: pet.id,
        });
    }

    DispatchPlan::Actions(actions)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};

    use orange_collar_core::{
        ContactPreferences, ContactTimestamps, Email, PetId, PetStatus, PhoneNumber, UserId,
    };

    use crate::models::{Pet, User};

    pub fn signup_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    pub fn owner(phone: &str, allow_sms: bool, allow_voice: bool) -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("owner@example.com").unwrap(),
            name: "Pat".to_owned(),
            primary_phone: PhoneNumber::new(phone),
            secondary_phone: PhoneNumber::default(),
            primary_address: "12 Elm St".to_owned(),
            secondary_address: String::new(),
            preferences: ContactPreferences {
                allow_sms,
                allow_mms: true,
                allow_voice,
            },
            pet_watch: false,
            contact: ContactTimestamps::all_at(signup_instant()),
            created_at: signup_instant(),
            updated_at: signup_instant(),
        }
    }

    pub fn rex() -> Pet {
        Pet {
            id: PetId::new(7),
            user_id: UserId::new(1),
            name: "Rex".to_owned(),
            species: "dog".to_owned(),
            color: "brown".to_owned(),
            breed: String::new(),
            gender: String::new(),
            description: String::new(),
            indoor_pet: false,
            status: PetStatus::parse(PetStatus::LOST).unwrap(),
            picture: None,
            home_address: String::new(),
            created_at: signup_instant(),
        }
    }
}
