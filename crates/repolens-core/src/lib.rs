//! Configuration, structural analysis, query routing, and answer synthesis.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod facts;
pub mod registry;
pub mod response;
pub mod router;
pub mod service;
pub mod synthesizer;

pub use config::Config;
pub use error::{CoreError, Result};
pub use facts::{RepositoryFacts, analyze_repository};
pub use response::{AnswerResponse, Outcome, Source};
pub use router::{QueryClassification, QueryRouter, Route, classify};
pub use service::{FileDocumentation, QaService, UploadReport};
pub use synthesizer::AnswerSynthesizer;
