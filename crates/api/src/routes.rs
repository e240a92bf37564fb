//! Backend endpoint paths.

pub const ACCOUNTS: &str = "/api/accounts";
pub const TRADES: &str = "/api/trades";

pub const LOGIN: &str = "/api/auth/login";
pub const REGISTER: &str = "/api/auth/register";
pub const GOOGLE_LOGIN: &str = "/api/auth/google";
pub const FACEBOOK_LOGIN: &str = "/api/auth/facebook";
pub const SEND_OTP: &str = "/api/auth/send-otp";
pub const VERIFY_OTP: &str = "/api/auth/verify-otp";
pub const FORGOT_PASSWORD: &str = "/api/auth/forgot-password";
pub const RESET_PASSWORD: &str = "/api/auth/reset-password";
pub const PROFILE: &str = "/api/auth/profile";
pub const CHANGE_PASSWORD: &str = "/api/auth/change-password";

pub fn account(account_id: i64) -> String {
    format!("{ACCOUNTS}/{account_id}")
}

pub fn close_trade(ticket: i64) -> String {
    format!("{TRADES}/{ticket}/close")
}
