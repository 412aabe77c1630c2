pub use leftrec_atn as atn;
pub use leftrec_grammar::*;
pub use leftrec_interp as interp;
pub use leftrec_rewrite as rewrite;

mod pipeline;

pub use crate::pipeline::{ProcessedGrammar, Tool, ToolError};
