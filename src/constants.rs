// configuration
pub const DEBUG_ENV_VAR: &str = "GOA_DEBUG";
pub const DEFAULT_ACTION_DIR: &str = "go-actions";
pub const DEFAULT_CLONE_DIR: &str = "/app/repo";
pub const DEFAULT_CMD_TIMEOUT: &str = "40s";
pub const DEFAULT_GIT_PROGRAM: &str = "git";

// actions
pub const TWEET_ACTION: &str = "tweet";
pub const TWEET_ENDPOINT: &str = "https://api.twitter.com/2/tweets";
