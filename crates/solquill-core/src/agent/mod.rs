//! The conversational contract agent: edit context, prompt assembly and the
//! turn loop that applies extracted actions.

pub mod context;
pub mod prompt;
pub mod turn;

pub use context::EditContext;
pub use turn::{ANALYZING_NOTICE, AgentSettings, ContractAgent};
