//! Switchboard routes user requests to expert agent services.
//!
//! An explicit override picks the expert directly; otherwise keyword and
//! pattern rules from the catalog decide, with a configured fallback
//! guaranteeing every request resolves somewhere. The chosen expert's event
//! stream is interpreted into live answer text plus a trajectory of the
//! internal steps, rendered once when the answer begins.

pub mod catalog;
pub mod error;
pub mod events;
pub mod gateway;
pub mod interpreter;
pub mod orchestrator;
pub mod routing;

pub use catalog::{Catalog, CatalogSnapshot, ExpertRecord, ExpertStatus, ValidationMode};
pub use error::{Result, RouterError};
pub use events::RawEvent;
pub use gateway::{A2aGateway, DelegationGateway, GatewayError};
pub use interpreter::{EventInterpreter, OutputItem};
pub use orchestrator::{Orchestrator, Request};
pub use routing::RoutingDecision;
