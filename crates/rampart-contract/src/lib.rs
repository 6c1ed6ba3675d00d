//! Contract validation for the Rampart proxy.
//!
//! This crate defines the boundary between the proxy and the contract
//! checker: the specification document model, the violation report and
//! usage types, the [`ContractValidator`] trait the proxy consumes, and a
//! baseline validator implementation. The proxy treats any validator as a
//! black box; everything it needs flows through the types defined here.

pub mod report;
pub mod source;
pub mod spec;
pub mod usage;
pub mod validator;

pub use report::{CapturedRequest, CapturedResponse, Coverage, Report};
pub use source::SpecSource;
pub use spec::{Action, Resource, ResponseDecl, Specification};
pub use usage::Usage;
pub use validator::{ContractValidator, SpecValidator};
