//! Integration flows.

mod fixture;
mod flows;
mod recorder;
