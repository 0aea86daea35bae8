//! Per-server label helpers
//!
//! Every server in a batch is labeled `<name>-<server_id>` during the tag
//! phase, so labels stay unique across a batch sharing one base name.

/// Build the per-server label.
pub fn unique_name(name: &str, server_id: &str) -> String {
    format!("{name}-{server_id}")
}

/// Split a label into its base name and trailing server id.
///
/// The base name may itself contain `-`; only the last component is treated
/// as the id. Labels without a separator come back whole, with no id.
pub fn parse_unique_name(label: &str) -> (&str, Option<&str>) {
    match label.rsplit_once('-') {
        Some((name, id)) if !name.is_empty() && !id.is_empty() => (name, Some(id)),
        _ => (label, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let label = unique_name("web", "10042");
        assert_eq!(label, "web-10042");
        assert_eq!(parse_unique_name(&label), ("web", Some("10042")));
    }

    #[test]
    fn name_may_contain_separator() {
        assert_eq!(
            parse_unique_name("test-server-10042"),
            ("test-server", Some("10042"))
        );
    }

    #[test]
    fn no_separator_means_no_id() {
        assert_eq!(parse_unique_name("plain"), ("plain", None));
        assert_eq!(parse_unique_name("trailing-"), ("trailing-", None));
    }
}
