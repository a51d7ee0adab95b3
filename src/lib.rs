//! pdf-dialogue: tool-augmented dialogue over local PDF documents.
//!
//! A question and a directory of documents go in; the documents are
//! attached to the conversation, the model verifies quotations with the
//! `search_pdf` tool, and the answer comes back whole or as a token stream.
//!
//! # Example
//!
//! ```no_run
//! use pdf_dialogue::agent::message::user_message;
//! use pdf_dialogue::agent::{AgentConfig, Orchestrator};
//!
//! # async fn demo() -> Result<(), pdf_dialogue::error::AgentError> {
//! let config = AgentConfig::from_env()?;
//! let orchestrator = Orchestrator::from_config(&config)?;
//! let answer = orchestrator
//!     .run_once(
//!         vec![user_message("What does the report say about X?")],
//!         &config.documents,
//!         config.round_limit,
//!     )
//!     .await?;
//! println!("{answer}");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod document;
pub mod error;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod search;

pub use agent::{AgentConfig, DialogueOutcome, DialogueToken, Orchestrator, StopReason};
pub use document::{DocumentLoader, DocumentsConfig};
pub use error::{AgentError, Error, Result};
pub use search::{PdfSearch, SearchConfig, SearchOutcome};
