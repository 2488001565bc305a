//! Route paths.

pub const POST_AUTH_LOGIN: &str = "/auth/login";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
pub const GET_AUTH_ME: &str = "/auth/me";
pub const GET_AUTH_OAUTH_PROVIDERS: &str = "/auth/oauth/providers";
pub const GET_AUTH_OAUTH_AUTHORIZE: &str = "/auth/oauth/{provider}/authorize";
pub const POST_AUTH_OAUTH_CALLBACK: &str = "/auth/oauth/{provider}/callback";
