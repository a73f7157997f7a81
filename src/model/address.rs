//! Email address pairs (RFC 5322 §3.4).

/// A sender or recipient address.
///
/// # Examples
/// - `"Mail Delivery Subsystem <mailer-daemon@googlemail.com>"` → `display_name = "Mail Delivery Subsystem"`
/// - `"no-reply@accounts.google.com"` → `display_name = ""`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    pub fn new(display_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            address: address.into(),
        }
    }

    /// Build from the optional name/address pair `mail-parser` yields.
    pub fn from_addr(addr: &mail_parser::Addr<'_>) -> Self {
        Self {
            display_name: addr.name.as_deref().unwrap_or("").trim().to_string(),
            address: addr.address.as_deref().unwrap_or("").trim().to_string(),
        }
    }

    /// Case-insensitive comparison against a bare address.
    pub fn is_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }

    /// Case-insensitive comparison against a display name.
    pub fn is_named(&self, name: &str) -> bool {
        self.display_name.eq_ignore_ascii_case(name)
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "<{}>", self.address)
        } else {
            write!(f, "\"{}\" <{}>", self.display_name, self.address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_matching() {
        let addr = EmailAddress::new("MAIL delivery SUBSYSTEM", "No-Reply@Accounts.Google.com");
        assert!(addr.is_address("no-reply@accounts.google.com"));
        assert!(addr.is_named("Mail Delivery Subsystem"));
        assert!(!addr.is_named("Mail Delivery"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            EmailAddress::new("Alice", "alice@example.com").to_string(),
            "\"Alice\" <alice@example.com>"
        );
        assert_eq!(
            EmailAddress::new("", "alice@example.com").to_string(),
            "<alice@example.com>"
        );
    }
}
