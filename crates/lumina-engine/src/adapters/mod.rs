mod edit;
mod suggest;

pub use edit::{build_edit_payload, request_edit};
pub use suggest::{build_suggestion_payload, request_suggestions, try_request_suggestions};
