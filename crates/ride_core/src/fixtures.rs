//! Sample participants for demos: a rider in lower Manhattan and a small fleet.
//!
//! The rider waits at 40.7128, -74.0060. `driver_3` starts bound to
//! `ride_000`, so only two drivers are free.

use crate::error::RideResult;
use crate::geo::{Location, Place};
use crate::model::{Driver, RideId, Role, User, VehicleInfo};

pub const SAMPLE_RIDER_ID: &str = "rider_1";

pub fn sample_rider_location() -> RideResult<Location> {
    Location::new(40.7128, -74.0060)
}

pub fn sample_rider() -> RideResult<User> {
    Ok(User::new(SAMPLE_RIDER_ID, "John Doe", Role::Rider)
        .with_contact("john@example.com", "+1234567890")
        .with_rating(4.9)
        .with_location(sample_rider_location()?))
}

pub fn sample_pickup() -> RideResult<Place> {
    Ok(Place::new("123 Main St", sample_rider_location()?))
}

pub fn sample_destination() -> RideResult<Place> {
    Ok(Place::new("456 Broadway", Location::new(40.7580, -73.9855)?))
}

struct SampleDriver {
    id: &'static str,
    name: &'static str,
    email: &'static str,
    rating: f32,
    at: (f64, f64),
    car: (&'static str, &'static str, u16, &'static str, &'static str),
}

const SAMPLE_DRIVERS: [SampleDriver; 3] = [
    SampleDriver {
        id: "driver_1",
        name: "Mike Chen",
        email: "mike@example.com",
        rating: 4.95,
        at: (40.7180, -74.0100),
        car: ("Toyota", "Camry", 2022, "ABC-123", "White"),
    },
    SampleDriver {
        id: "driver_2",
        name: "Sarah Williams",
        email: "sarah@example.com",
        rating: 4.88,
        at: (40.7080, -74.0020),
        car: ("Honda", "Civic", 2021, "XYZ-789", "Blue"),
    },
    SampleDriver {
        id: "driver_3",
        name: "Alex Rodriguez",
        email: "alex@example.com",
        rating: 4.92,
        at: (40.7200, -74.0150),
        car: ("Ford", "Explorer", 2023, "SUV-456", "Black"),
    },
];

impl SampleDriver {
    fn build(&self) -> RideResult<Driver> {
        let (make, model, year, plate, color) = self.car;
        let user = User::new(self.id, self.name, Role::Driver)
            .with_contact(self.email, "+1234567800")
            .with_rating(self.rating)
            .with_location(Location::new(self.at.0, self.at.1)?)
            .with_vehicle(VehicleInfo {
                make: make.to_string(),
                model: model.to_string(),
                year,
                license_plate: plate.to_string(),
                color: color.to_string(),
            });
        Driver::from_user(user)
    }
}

/// Three drivers; `driver_3` is already on `ride_000`.
pub fn sample_fleet() -> RideResult<Vec<Driver>> {
    let mut fleet = SAMPLE_DRIVERS
        .iter()
        .map(SampleDriver::build)
        .collect::<RideResult<Vec<_>>>()?;
    if let Some(busy) = fleet.iter_mut().find(|d| d.id().as_str() == "driver_3") {
        busy.bind(RideId::from("ride_000"))?;
    }
    Ok(fleet)
}
