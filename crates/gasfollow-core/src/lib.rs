//! gasfollow-core — follow the EGL desired gas limit at runtime.
//!
//! A controller task owns an on/off switch. While enabled, a single
//! sampler task polls the oracle and rewrites the shared gas bounds;
//! disabling stops the sampler, waits for it to exit, and restores the
//! bounds captured at start.
//!
//! # Architecture
//!
//! ```text
//! FollowHandle (clone freely)
//!   └── mpsc<Command> ──► controller task (single decision loop)
//!                           ├── FollowState: Disabled | Active
//!                           ├── baseline GasBounds (captured once)
//!                           └── Active → sampler task
//!                                 ├── Oracle::read()
//!                                 ├── GasBounds::from_desired()
//!                                 └── SharedBounds::set()
//! ```
//!
//! # Mapping
//!
//! `ceiling = desired`, `floor = desired / 2`. A read failure leaves the
//! last applied bounds in place.

pub mod bounds;
pub mod config;
pub mod controller;
pub mod error;
pub mod sampler;

pub use bounds::{GasBounds, SharedBounds};
pub use config::FollowConfig;
pub use controller::{FollowHandle, FollowState, Transition};
pub use error::{FollowError, FollowResult};
