//! Background tasks module
//! 
//! This module contains the tick loop that drives a running countdown and
//! the detached task that settles a reward claim.

pub mod claim;
pub mod ticker;

pub(crate) use claim::claim_task;
pub(crate) use ticker::tick_loop;
