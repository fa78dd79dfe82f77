//! Domain types for the robust route planner.
//!
//! This module contains the core domain model types that represent
//! validated transit data. All types enforce their invariants at construction
//! time, so code that receives these types can trust their validity.

mod connection;
mod error;
mod leg;
mod route;
mod stop;
mod time;

pub use connection::{
    Connection, ConnectionId, ConnectionKind, DelayKey, TransportCategory, Trip, TripId, Walk,
};
pub use error::DomainError;
pub use leg::{Leg, LegMode};
pub use route::Route;
pub use stop::{InvalidStopId, Stop, StopId, StopIndex};
pub use time::{OperatingWindow, ServiceTime, TimeError};
