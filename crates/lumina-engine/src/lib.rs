pub mod adapters;
pub mod dryrun;
pub mod gateway;
pub mod gemini;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use gateway::{default_gateway_registry, GatewayRegistry, ModelGateway};
pub use runtime::SessionRuntime;
