// API Middleware
//
// Browser session handling: the encrypted session cookie and the extractor
// that resolves it to a live session.

pub mod session;

pub use session::{
    clear_session_cookie, ensure_session_key, session_key, set_session_key, MaybeSession,
};
