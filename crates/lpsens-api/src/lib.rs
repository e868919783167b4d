//! Request/response layer around `lpsens-solver`.
//!
//! Requests arrive as the JSON document the web client posts, responses go
//! back with the field names and four-decimal rounding that client expects.
//! The remote path hands the same model to an external solver as MPS.

pub mod neos;
pub mod remote;
mod request;
mod response;

pub use neos::{NeosConfig, NeosQueue};
pub use remote::{JobQueue, PollingConfig, PollingSolver, RemoteError, RemoteSolver};
pub use request::{ObjectiveKind, RequestError, SensitivityRequest};
pub use response::{
    Assignment, BUDGET_EXHAUSTED_MESSAGE, ConstraintEntry, FailureKind, FailureResponse, NO_OPTIMUM_MESSAGE, OptimalResponse,
    SensitivityResponse, VariableEntry, respond, respond_json, round4,
};
