//! The ride desk: the one place that owns rides from request to archive.
//!
//! Open rides (pending, accepted, in progress) live in `open`. Completed rides
//! wait in `awaiting_rating` until the rider rates or skips, then move to the
//! history. Cancelled rides are archived immediately.

use std::collections::BTreeMap;
use std::sync::Arc;

use bevy_ecs::prelude::Resource;
use tracing::{info, warn};

use crate::config::DeskConfig;
use crate::error::{RideError, RideResult};
use crate::geo::Place;
use crate::history::RideHistory;
use crate::lifecycle::{CancelledBy, Rating, RideEvent, RideRequest, RideStatus};
use crate::matching::{DriverPool, MatchOutcome, MatchingAlgorithm};
use crate::model::{RideId, UserId};
use crate::pricing::{FareQuote, RideClass};
use crate::routing::{RouteEstimate, RouteEstimator, StraightLineEstimator, DEFAULT_DETOUR_FACTOR};
use crate::telemetry::DeskTelemetry;
use crate::wallet::Wallet;

#[derive(Resource)]
pub struct RideDesk {
    config: DeskConfig,
    pool: Arc<DriverPool>,
    matcher: Box<dyn MatchingAlgorithm>,
    router: Box<dyn RouteEstimator>,
    open: BTreeMap<RideId, RideRequest>,
    awaiting_rating: BTreeMap<RideId, RideRequest>,
    history: RideHistory,
    wallet: Wallet,
    telemetry: DeskTelemetry,
    next_seq: u64,
}

impl RideDesk {
    pub fn new(config: DeskConfig, pool: Arc<DriverPool>) -> Self {
        let matcher = config.matching.build(config.seed);
        let router = Box::new(StraightLineEstimator {
            detour_factor: DEFAULT_DETOUR_FACTOR,
            speed_kmh: config.driver_speed_kmh,
        });
        Self {
            config,
            pool,
            matcher,
            router,
            open: BTreeMap::new(),
            awaiting_rating: BTreeMap::new(),
            history: RideHistory::new(),
            wallet: Wallet::new(),
            telemetry: DeskTelemetry::default(),
            next_seq: 1,
        }
    }

    pub fn with_router(mut self, router: Box<dyn RouteEstimator>) -> Self {
        self.router = router;
        self
    }

    pub fn with_matcher(mut self, matcher: Box<dyn MatchingAlgorithm>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<DriverPool> {
        &self.pool
    }

    pub fn history(&self) -> &RideHistory {
        &self.history
    }

    pub fn telemetry(&self) -> &DeskTelemetry {
        &self.telemetry
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Top-ups and saved cards go straight to the wallet.
    pub fn wallet_mut(&mut self) -> &mut Wallet {
        &mut self.wallet
    }

    /// Route estimate and a price for every class, for the booking sheet.
    pub fn quote(&self, pickup: &Place, destination: &Place) -> RideResult<(RouteEstimate, Vec<FareQuote>)> {
        let route = self.router.estimate(&pickup.location, &destination.location);
        let quotes = self.config.fares.quote_all(route.distance_km)?;
        Ok((route, quotes))
    }

    /// Creates a pending ride priced from the estimated route.
    pub fn create_ride_request(
        &mut self,
        rider_id: UserId,
        pickup: Place,
        destination: Place,
        class: RideClass,
        now: u64,
    ) -> RideResult<&RideRequest> {
        let route = self.router.estimate(&pickup.location, &destination.location);
        self.create_ride_request_with_route(rider_id, pickup, destination, class, route, now)
    }

    pub fn create_ride_request_with_route(
        &mut self,
        rider_id: UserId,
        pickup: Place,
        destination: Place,
        class: RideClass,
        route: RouteEstimate,
        now: u64,
    ) -> RideResult<&RideRequest> {
        if let Some(existing) = self.open_ride_for_rider(&rider_id) {
            return Err(RideError::RiderBusy {
                rider_id,
                ride_id: existing.id().clone(),
            });
        }
        let ride_id = RideId::new(format!("ride_{:03}", self.next_seq));
        let ride = RideRequest::new(
            ride_id.clone(),
            rider_id,
            pickup,
            destination,
            class,
            route,
            &self.config.fares,
            now,
        )?;
        self.next_seq += 1;
        self.telemetry.rides_requested += 1;
        info!(
            ride_id = %ride.id(),
            rider_id = %ride.rider_id(),
            class = %ride.ride_class(),
            price = ride.price(),
            distance_km = ride.distance_km(),
            "ride requested"
        );
        Ok(&*self.open.entry(ride_id).or_insert(ride))
    }

    pub fn ride(&self, ride_id: &RideId) -> Option<&RideRequest> {
        self.open
            .get(ride_id)
            .or_else(|| self.awaiting_rating.get(ride_id))
            .or_else(|| self.history.find(ride_id))
    }

    /// Pending, accepted and in-progress rides, ordered by id.
    pub fn open_rides(&self) -> impl Iterator<Item = &RideRequest> {
        self.open.values()
    }

    /// Completed rides the rider has not rated or skipped yet.
    pub fn awaiting_rating(&self) -> impl Iterator<Item = &RideRequest> {
        self.awaiting_rating.values()
    }

    pub fn open_ride_for_rider(&self, rider_id: &UserId) -> Option<&RideRequest> {
        self.open.values().find(|r| r.rider_id() == rider_id)
    }

    /// Tries to bind a driver to a pending ride.
    ///
    /// Drivers who declined the ride are skipped. On a match the ride is
    /// accepted by that driver.
    pub fn dispatch(&mut self, ride_id: &RideId, now: u64) -> RideResult<MatchOutcome> {
        let ride = self.open_ride(ride_id, "accept")?;
        if ride.status() != RideStatus::Pending {
            return Err(RideError::invalid_transition(ride_id, ride.status(), "accept"));
        }
        let pickup = ride.pickup().location;
        let declined = ride.declined_by().to_vec();

        let outcome = self.pool.dispatch(
            self.matcher.as_ref(),
            &pickup,
            self.config.max_radius_km,
            ride_id,
            &declined,
        );
        let MatchOutcome::Matched(found) = &outcome else {
            self.telemetry.no_driver_outcomes += 1;
            warn!(ride_id = %ride_id, radius_km = self.config.max_radius_km, "no driver available");
            return Ok(outcome);
        };

        let driver_id = found.driver.id().clone();
        let accepted = self.apply_open(
            ride_id,
            RideEvent::Accept {
                driver_id: driver_id.clone(),
                at: now,
            },
        );
        if let Err(err) = accepted {
            self.pool.release(&driver_id, ride_id)?;
            return Err(err);
        }
        self.telemetry.rides_matched += 1;
        info!(
            ride_id = %ride_id,
            driver_id = %driver_id,
            distance_km = found.distance_km,
            "driver matched"
        );
        Ok(outcome)
    }

    /// Pending rides the driver could accept: inside the radius and not declined.
    pub fn pending_for_driver(&self, driver_id: &UserId) -> RideResult<Vec<&RideRequest>> {
        let driver = self
            .pool
            .get(driver_id)
            .ok_or_else(|| RideError::UnknownDriver(driver_id.clone()))?;
        let Some(here) = driver.location() else {
            return Ok(Vec::new());
        };
        let mut rides: Vec<&RideRequest> = self
            .open
            .values()
            .filter(|r| r.status() == RideStatus::Pending)
            .filter(|r| !r.declined_by().contains(driver_id))
            .filter(|r| here.distance_km(&r.pickup().location) < self.config.max_radius_km)
            .collect();
        rides.sort_by(|a, b| {
            a.requested_at()
                .cmp(&b.requested_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(rides)
    }

    /// A driver takes a pending ride from their feed.
    ///
    /// Only rides the feed would show can be taken: the driver must be inside
    /// the dispatch radius and must not have declined the ride.
    pub fn accept_as_driver(&mut self, ride_id: &RideId, driver_id: &UserId, now: u64) -> RideResult<&RideRequest> {
        let ride = self.open_ride(ride_id, "accept")?;
        if ride.status() != RideStatus::Pending {
            return Err(RideError::invalid_transition(ride_id, ride.status(), "accept"));
        }
        let pickup = ride.pickup().location;
        let declined = ride.declined_by().to_vec();
        self.pool
            .claim(driver_id, ride_id, &pickup, self.config.max_radius_km, &declined)?;
        let accepted = self.apply_open(
            ride_id,
            RideEvent::Accept {
                driver_id: driver_id.clone(),
                at: now,
            },
        );
        if let Err(err) = accepted {
            self.pool.release(driver_id, ride_id)?;
            return Err(err);
        }
        self.telemetry.rides_matched += 1;
        info!(ride_id = %ride_id, driver_id = %driver_id, "ride accepted by driver");
        self.open_ride(ride_id, "accept")
    }

    /// The driver passes; the ride stays pending and is never offered to them again.
    pub fn decline(&mut self, ride_id: &RideId, driver_id: &UserId) -> RideResult<&RideRequest> {
        if self.pool.get(driver_id).is_none() {
            return Err(RideError::UnknownDriver(driver_id.clone()));
        }
        self.apply_open(
            ride_id,
            RideEvent::Decline {
                driver_id: driver_id.clone(),
            },
        )?;
        self.telemetry.rides_declined += 1;
        info!(ride_id = %ride_id, driver_id = %driver_id, "ride declined");
        self.open_ride(ride_id, "decline")
    }

    pub fn driver_arrived(&mut self, ride_id: &RideId, now: u64) -> RideResult<&RideRequest> {
        self.apply_open(ride_id, RideEvent::DriverArrived { at: now })?;
        self.telemetry.rides_started += 1;
        info!(ride_id = %ride_id, status = %RideStatus::InProgress, "driver arrived");
        self.open_ride(ride_id, "start")
    }

    /// Finishes the trip, frees the driver and queues the ride for rating.
    ///
    /// With `charge_on_completion` the rider is charged the fare. A failed
    /// charge is logged and counted; the trip still completes.
    pub fn complete(&mut self, ride_id: &RideId, now: u64) -> RideResult<&RideRequest> {
        self.apply_open(ride_id, RideEvent::Complete { at: now })?;
        let ride = self
            .open
            .remove(ride_id)
            .ok_or_else(|| RideError::UnknownRide(ride_id.clone()))?;
        self.release_driver(&ride);
        self.telemetry.rides_completed += 1;
        info!(ride_id = %ride_id, price = ride.price(), status = %ride.status(), "ride completed");
        if self.config.charge_on_completion {
            match self.wallet.charge_ride(&ride, now) {
                Ok(source) => {
                    self.telemetry.rides_charged += 1;
                    info!(ride_id = %ride_id, amount = ride.price(), source = ?source, "ride charged");
                }
                Err(err) => {
                    self.telemetry.payment_failures += 1;
                    warn!(ride_id = %ride_id, error = %err, "ride charge failed");
                }
            }
        }
        Ok(&*self.awaiting_rating.entry(ride_id.clone()).or_insert(ride))
    }

    /// Cancels an open ride, frees any bound driver and archives it.
    pub fn cancel(&mut self, ride_id: &RideId, by: CancelledBy, now: u64) -> RideResult<RideRequest> {
        self.apply_open(ride_id, RideEvent::Cancel { by, at: now })?;
        let ride = self
            .open
            .remove(ride_id)
            .ok_or_else(|| RideError::UnknownRide(ride_id.clone()))?;
        self.release_driver(&ride);
        self.history.record_cancellation(ride.clone())?;
        self.telemetry.rides_cancelled += 1;
        info!(ride_id = %ride_id, cancelled_by = ?by, "ride cancelled");
        Ok(ride)
    }

    /// Stores the rider's rating and feedback and archives the ride.
    pub fn record_completion(
        &mut self,
        ride_id: &RideId,
        rating: Option<Rating>,
        feedback: Option<String>,
    ) -> RideResult<()> {
        let Some(ride) = self.awaiting_rating.remove(ride_id) else {
            return Err(self.not_rateable(ride_id));
        };
        let rated = rating.is_some();
        self.history.record_completion(ride, rating, feedback)?;
        if rated {
            self.telemetry.rides_rated += 1;
        }
        info!(ride_id = %ride_id, rating = rating.map(Rating::stars), "ride archived");
        Ok(())
    }

    /// Archives a completed ride without a rating.
    pub fn skip_rating(&mut self, ride_id: &RideId) -> RideResult<()> {
        self.record_completion(ride_id, None, None)
    }

    fn not_rateable(&self, ride_id: &RideId) -> RideError {
        if let Some(ride) = self.open.get(ride_id) {
            return RideError::NotCompleted {
                ride_id: ride_id.clone(),
                status: ride.status(),
            };
        }
        match self.history.find(ride_id) {
            Some(ride) if ride.status() == RideStatus::Completed => {
                RideError::RatingAlreadyRecorded(ride_id.clone())
            }
            Some(ride) => RideError::NotCompleted {
                ride_id: ride_id.clone(),
                status: ride.status(),
            },
            None => RideError::UnknownRide(ride_id.clone()),
        }
    }

    /// Looks up an open ride; closed rides report an invalid transition.
    fn open_ride(&self, ride_id: &RideId, event: &'static str) -> RideResult<&RideRequest> {
        if let Some(ride) = self.open.get(ride_id) {
            return Ok(ride);
        }
        let closed = self
            .awaiting_rating
            .get(ride_id)
            .or_else(|| self.history.find(ride_id));
        match closed {
            Some(ride) => Err(RideError::invalid_transition(ride_id, ride.status(), event)),
            None => Err(RideError::UnknownRide(ride_id.clone())),
        }
    }

    fn apply_open(&mut self, ride_id: &RideId, event: RideEvent) -> RideResult<()> {
        self.open_ride(ride_id, event.name())?;
        let ride = self
            .open
            .get_mut(ride_id)
            .ok_or_else(|| RideError::UnknownRide(ride_id.clone()))?;
        ride.apply(event)
    }

    fn release_driver(&self, ride: &RideRequest) {
        let Some(driver_id) = ride.driver_id() else {
            return;
        };
        match self.pool.release(driver_id, ride.id()) {
            Ok(true) => {}
            Ok(false) => warn!(ride_id = %ride.id(), driver_id = %driver_id, "driver was not bound to ride"),
            Err(err) => warn!(ride_id = %ride.id(), error = %err, "could not release driver"),
        }
    }
}
