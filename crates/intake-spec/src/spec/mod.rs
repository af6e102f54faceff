pub mod form;
pub mod question;

pub use form::{FormSchema, FormSettings, SchemaError};
pub use question::{ConditionalRule, QuestionSpec, QuestionType};
