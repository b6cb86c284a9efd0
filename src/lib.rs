pub mod amount;
pub mod api;
pub mod collector;
pub mod config;
pub mod csv;
pub mod driver;
pub mod gateway;
pub mod model;
pub mod order;
pub mod workflow;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use amount::Amount;
pub use api::{Backend, HttpBackend, Session};
pub use config::Config;
pub use driver::Driver;
pub use gateway::{PaymentGateway, SimulatedGateway};
pub use model::{FinancingMethod, InstallmentPlan, Term, TransactionToken};
pub use workflow::{ConfirmationState, Stage, Workflow, WorkflowError};
