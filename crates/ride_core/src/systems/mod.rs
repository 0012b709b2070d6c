pub mod arrival_tick;
pub mod dispatch_attempt;
pub mod position_update;
pub mod trip_finished;
