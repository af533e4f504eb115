use crate::RefError;

/// Validate a ref name before it is used to build a filesystem path.
///
/// Names may contain `/` (e.g. `release/1.2`) but must not contain `..`,
/// start with `-`, or contain control bytes. Path oddities that could
/// escape the refs directory are rejected too.
pub fn validate_ref_name(name: &str) -> Result<(), RefError> {
    let invalid = |reason: &str| RefError::InvalidName {
        name: name.into(),
        reason: reason.into(),
    };

    if name.is_empty() {
        return Err(invalid("empty name"));
    }
    if name.starts_with('-') {
        return Err(invalid("starts with '-'"));
    }
    if name.contains("..") {
        return Err(invalid("contains '..'"));
    }
    if name.bytes().any(|b| b < 0x20 || b == 0x7f) {
        return Err(invalid("contains control byte"));
    }
    if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
        return Err(invalid("malformed path"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_simple_and_nested_names() {
        assert!(validate_ref_name("main").is_ok());
        assert!(validate_ref_name("release/1.2").is_ok());
        assert!(validate_ref_name("feature/deeply/nested/branch").is_ok());
        assert!(validate_ref_name("v1.0.0").is_ok());
    }

    #[test]
    fn rejects_dotdot() {
        assert!(validate_ref_name("../../etc/passwd").is_err());
        assert!(validate_ref_name("a/../b").is_err());
    }

    #[test]
    fn rejects_leading_dash() {
        assert!(validate_ref_name("-flag").is_err());
    }

    #[test]
    fn rejects_control_bytes() {
        assert!(validate_ref_name("na\x01me").is_err());
        assert!(validate_ref_name("na\x7fme").is_err());
        assert!(validate_ref_name("na\nme").is_err());
    }

    #[test]
    fn rejects_path_oddities() {
        assert!(validate_ref_name("").is_err());
        assert!(validate_ref_name("/rooted").is_err());
        assert!(validate_ref_name("trailing/").is_err());
        assert!(validate_ref_name("double//slash").is_err());
    }
}
