//! Redirect targets.

/// Base URL for WhatsApp click-to-chat links.
pub const WA_ME_BASE: &str = "https://wa.me/";

/// Build a `wa.me` link, keeping only the digits of `phone_number`.
pub fn wa_me_link(phone_number: &str) -> String {
    let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();
    format!("{}{}", WA_ME_BASE, digits)
}
