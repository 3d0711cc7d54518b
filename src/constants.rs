pub mod network {
    pub const TIMEOUT_TOOL_CALL_MS: u64 = 30_000;
    pub const TIMEOUT_TOKEN_REFRESH_MS: u64 = 15_000;
}

pub mod auth {
    /// Tokens within this window of their expiry are treated as expired so a
    /// request never departs with a credential about to lapse mid-flight.
    pub const EXPIRY_SKEW_MS: i64 = 30_000;
}

pub mod formatting {
    pub const ITEM_SEPARATOR: &str = "\n\n";
}

pub mod http {
    pub const USER_AGENT: &str = "toolcall/0.4";
    pub const ACCEPT: &str = "application/json, text/plain, */*";
}
