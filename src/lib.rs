//! Parley: the conversation core of a chat-completions client.
//!
//! The crate keeps a canonical conversation history, prices it in tokens,
//! compacts it under a budget, translates it to and from the
//! `/chat/completions` wire format (including streamed responses), and
//! checkpoints it under a session tag.
//!
//! # Quick start
//!
//! ```no_run
//! use parley::api::{ChatCompletionsAdapter, GenerationConfig, ProtocolAdapter};
//! use parley::history::{CompactionConfig, Compactor};
//! use parley::session::Session;
//! use parley::tokens::TokenAccountant;
//! use parley::types::{History, Turn};
//!
//! let mut session = Session::new(History::from(vec![Turn::user("Hello!")]));
//! let compactor = Compactor::new(CompactionConfig::default(), TokenAccountant::shared().clone());
//! compactor.compact(&mut session);
//! let request = ChatCompletionsAdapter::new()
//!     .render_request(&session.history, &GenerationConfig::default());
//! println!("{}", serde_json::to_string(&request).unwrap());
//! ```

pub mod api;
pub mod build_info;
pub mod config;
pub mod error;
pub mod history;
pub mod session;
#[cfg(test)]
pub mod testsupport;
pub mod tokens;
pub mod types;
