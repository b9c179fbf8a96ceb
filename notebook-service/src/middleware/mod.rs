mod session;

pub use session::{session_guard, SessionUser, LOGIN_PATH, SESSION_COOKIE};
