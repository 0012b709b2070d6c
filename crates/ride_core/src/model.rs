//! Participants: identifiers, users, and drivers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RideError, RideResult};
use crate::geo::Location;

/// Opaque user identifier (rider or driver).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Opaque ride identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RideId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RideId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<&str> for RideId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rider,
    Driver,
}

impl Role {
    pub fn other(self) -> Self {
        match self {
            Role::Rider => Role::Driver,
            Role::Driver => Role::Rider,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub make: String,
    pub model: String,
    pub year: u16,
    pub license_plate: String,
    pub color: String,
}

/// Maximum participant rating.
pub const MAX_USER_RATING: f32 = 5.0;

/// A rider or driver profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Initials or an image reference.
    pub avatar: String,
    /// Average rating in 0.0..=5.0.
    pub rating: f32,
    role: Role,
    pub current_location: Option<Location>,
    pub vehicle_info: Option<VehicleInfo>,
}

impl User {
    /// Creates a profile with empty contact details and a perfect rating.
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        let name = name.into();
        Self {
            id: UserId::new(id),
            avatar: initials(&name),
            name,
            email: String::new(),
            phone: String::new(),
            rating: MAX_USER_RATING,
            role,
            current_location: None,
            vehicle_info: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.current_location = Some(location);
        self
    }

    pub fn with_vehicle(mut self, vehicle: VehicleInfo) -> Self {
        self.vehicle_info = Some(vehicle);
        self
    }

    pub fn with_contact(mut self, email: impl Into<String>, phone: impl Into<String>) -> Self {
        self.email = email.into();
        self.phone = phone.into();
        self
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = clamp_rating(rating);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Builds a separate participant with the opposite role.
    ///
    /// The role of an existing profile never changes; switching between rider
    /// and driver mode means acting as a different logical user.
    pub fn switch_role(&self, new_id: impl Into<String>) -> User {
        User {
            id: UserId::new(new_id),
            role: self.role.other(),
            ..self.clone()
        }
    }

    /// Applies a partial profile edit. Id and role are not editable.
    pub fn apply_update(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(phone) = update.phone {
            self.phone = phone;
        }
        if let Some(avatar) = update.avatar {
            self.avatar = avatar;
        }
        if let Some(location) = update.current_location {
            self.current_location = Some(location);
        }
        if let Some(vehicle) = update.vehicle_info {
            self.vehicle_info = Some(vehicle);
        }
    }
}

/// Partial profile edit; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub current_location: Option<Location>,
    pub vehicle_info: Option<VehicleInfo>,
}

/// A user with role `driver` plus availability state.
///
/// Invariants: `is_available` implies `is_online`, and a driver bound to
/// `current_ride_id` is never available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub user: User,
    is_online: bool,
    is_available: bool,
    current_ride_id: Option<RideId>,
}

impl Driver {
    /// Wraps a driver profile. The driver starts online and available.
    pub fn from_user(user: User) -> RideResult<Self> {
        if user.role() != Role::Driver {
            return Err(RideError::RoleMismatch(user.id.clone()));
        }
        Ok(Self {
            user,
            is_online: true,
            is_available: true,
            current_ride_id: None,
        })
    }

    pub fn id(&self) -> &UserId {
        &self.user.id
    }

    pub fn location(&self) -> Option<Location> {
        self.user.current_location
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    pub fn is_available(&self) -> bool {
        self.is_available
    }

    pub fn current_ride_id(&self) -> Option<&RideId> {
        self.current_ride_id.as_ref()
    }

    /// Online, unbound, and with a known location.
    pub fn can_take_ride(&self) -> bool {
        self.is_online && self.is_available && self.location().is_some()
    }

    pub fn go_online(&mut self) {
        self.is_online = true;
        if self.current_ride_id.is_none() {
            self.is_available = true;
        }
    }

    pub fn go_offline(&mut self) -> RideResult<()> {
        if let Some(ride_id) = &self.current_ride_id {
            return Err(RideError::DriverBusy {
                driver_id: self.user.id.clone(),
                ride_id: ride_id.clone(),
            });
        }
        self.is_online = false;
        self.is_available = false;
        Ok(())
    }

    /// Binds the driver to a ride.
    pub fn bind(&mut self, ride_id: RideId) -> RideResult<()> {
        if !self.can_take_ride() {
            return Err(RideError::DriverUnavailable(self.user.id.clone()));
        }
        self.is_available = false;
        self.current_ride_id = Some(ride_id);
        Ok(())
    }

    /// Clears the ride binding; returns the ride the driver was bound to.
    pub fn release(&mut self) -> Option<RideId> {
        let released = self.current_ride_id.take();
        self.is_available = self.is_online;
        released
    }
}

fn clamp_rating(rating: f32) -> f32 {
    if rating.is_nan() {
        return 0.0;
    }
    rating.clamp(0.0, MAX_USER_RATING)
}

fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}
