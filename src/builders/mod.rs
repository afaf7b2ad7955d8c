//! Builders to construct requester components from configuration.

pub mod dispatcher_builder;

pub use dispatcher_builder::DispatcherBuilder;
