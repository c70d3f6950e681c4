//! # hcleval
//!
//! An evaluator for an HCL-style configuration language, exposed as a small
//! catalog of pure functions over dynamically-typed values.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Tokenizer → TokenPreprocessor → Parser → AST → Evaluator / Decoder → Value
//! ```
//!
//! * [`tokenizer`]: turns source text into positioned tokens, including the
//!   template sub-language inside quoted strings.
//! * [`analyzer`]: recursive descent parser producing [`ast::Expression`] and
//!   [`ast::Body`] trees plus [`diagnostics::Diagnostics`].
//! * [`value`]: the dynamic value model, refinements of unknown values and
//!   type conversion.
//! * [`eval`]: expression and template evaluation against an [`eval::EvalContext`].
//! * [`decoder`]: schema-driven decoding of configuration bodies.
//! * [`speclang`]: loader for spec files describing a decode schema.
//! * [`provider`]: the four user-facing operations (`evalexpr`, `evaltemplate`,
//!   `evalconfigattrs`, `evalconfig`).
//!
//! ## Example
//!
//! ```rust
//! use hcleval::{provider::Provider, value::Value};
//!
//! let provider = Provider::default();
//! let result = provider
//!     .call("evalexpr", &[Value::string("1 + 2"), Value::empty_object()])
//!     .unwrap();
//! assert_eq!(result, Value::number(3));
//! ```

pub mod analyzer;
pub mod ast;
pub mod config;
pub mod decoder;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod functions;
pub mod preprocessor;
pub mod provider;
pub mod speclang;
pub mod suggest;
pub mod tokenizer;
pub mod value;

// Re-exports
pub use config::EngineConfig;
pub use diagnostics::{Diagnostic, Diagnostics, Pos, Severity, SourceRange};
pub use error::*;
pub use provider::Provider;
pub use value::{Type, Value};

#[cfg(test)]
mod test_setup {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}
