//! Resolving an internal user id from the evidence a charge carries.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;

/// Strip the mangling the provider's sandbox applies to customer emails.
///
/// Test-mode charges report the customer as `ravesb_<token>_real@example.com`.
/// The real address is whatever follows the last underscore before the `@`,
/// provided that leaves a non-empty local part and domain. Anything that does
/// not fit the convention is returned unchanged.
pub fn extract_real_email(email: &str) -> &str {
    for (pos, _) in email.match_indices('_') {
        let rest = &email[pos + 1..];
        if let Some(at) = rest.find('@') {
            let local = &rest[..at];
            let domain = &rest[at + 1..];
            if !local.is_empty() && !local.contains('_') && !domain.is_empty() {
                return rest;
            }
        }
    }
    email
}

/// Lookup form of a provider-reported email: lowercased, and with sandbox
/// noise stripped only when running against the provider's test environment.
/// Production addresses are never rewritten.
pub fn canonical_email(email: &str, test_mode: bool) -> String {
    let real = if test_mode {
        extract_real_email(email)
    } else {
        email
    };
    real.trim().to_lowercase()
}

/// Resolve the internal user a charge belongs to.
///
/// A user id attached to the charge metadata at initiation time is
/// authoritative and used without a lookup. Otherwise the provider-reported
/// customer email is canonicalized and matched against the local user
/// mirror. `None` means the caller should defer to a later delivery that
/// may carry better evidence.
pub fn resolve_user_id(
    conn: &Connection,
    meta_user_id: Option<&str>,
    customer_email: Option<&str>,
    test_mode: bool,
) -> Result<Option<String>> {
    if let Some(user_id) = meta_user_id
        && !user_id.is_empty()
    {
        return Ok(Some(user_id.to_string()));
    }

    let Some(email) = customer_email else {
        return Ok(None);
    };
    let canonical = canonical_email(email, test_mode);
    Ok(queries::get_user_by_email(conn, &canonical)?.map(|u| u.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sandbox_prefix() {
        assert_eq!(extract_real_email("ravesb_test_jane@mail.com"), "jane@mail.com");
        assert_eq!(extract_real_email("ravesb_a_b_c@m.com"), "c@m.com");
        assert_eq!(extract_real_email("_jane@mail.com"), "jane@mail.com");
    }

    #[test]
    fn leaves_unmangled_emails_alone() {
        assert_eq!(extract_real_email("jane@mail.com"), "jane@mail.com");
        assert_eq!(extract_real_email("jane@mail_x.com"), "jane@mail_x.com");
        assert_eq!(extract_real_email("no-at-sign"), "no-at-sign");
        assert_eq!(extract_real_email(""), "");
    }

    #[test]
    fn ignores_underscores_that_leave_empty_parts() {
        // Empty local part after the underscore
        assert_eq!(extract_real_email("ravesb_test_@mail.com"), "ravesb_test_@mail.com");
        // Empty domain
        assert_eq!(extract_real_email("ravesb_jane@"), "ravesb_jane@");
    }

    #[test]
    fn canonical_email_only_strips_in_test_mode() {
        assert_eq!(canonical_email("ravesb_test_Jane@Mail.com", true), "jane@mail.com");
        assert_eq!(
            canonical_email("ravesb_test_Jane@Mail.com", false),
            "ravesb_test_jane@mail.com"
        );
        assert_eq!(canonical_email("  Jane@Mail.com  ", false), "jane@mail.com");
    }
}
