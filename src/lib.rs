pub mod ast;
pub mod eval;
pub mod explain;
pub mod host;
pub mod lexer;
pub mod parser;
pub mod policy;
pub mod session;
pub mod tensor;

pub use eval::{EvalError, Evaluator, IncrEvalTrap, evaluate};
pub use explain::explain;
pub use parser::parse;
pub use policy::Policy;
pub use session::{Diagnosis, Session};
