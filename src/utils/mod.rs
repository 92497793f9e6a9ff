// Form and URL helpers shared by the handlers
pub mod parse_flag;
pub mod url_encoding;
pub mod url_parser;

pub use parse_flag::parse_flag;
pub use url_encoding::{form_value, parse_urlencoded_body};
pub use url_parser::hostname_from_url;
