//! Route paths.

pub const POST_REGISTER: &str = "/register";
pub const POST_LOGIN: &str = "/login";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const GET_HEALTH: &str = "/health";
pub const GET_LIST: &str = "/list";
pub const POST_LOGOUT: &str = "/logout";
pub const POST_GET_NEW_ACCESS: &str = "/get_new_access";
pub const GET_USERS: &str = "/users";
