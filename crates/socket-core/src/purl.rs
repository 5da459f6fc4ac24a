//! Package specs and Package URLs (pkg:npm/name@version).

/// A package reference as typed on the command line: `lodash`,
/// `lodash@4.17.21`, `@scope/pkg@^1.0.0`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PackageSpec {
    pub name: String,
    pub version: Option<String>,
}

impl PackageSpec {
    /// Split on the last `@` that is not the scope marker.
    pub fn parse(spec: &str) -> Option<PackageSpec> {
        let spec = spec.trim();
        if spec.is_empty() {
            return None;
        }
        match spec.rfind('@') {
            Some(at) if at > 0 => Some(PackageSpec {
                name: spec[..at].to_string(),
                version: Some(spec[at + 1..].to_string()).filter(|v| !v.is_empty()),
            }),
            _ => Some(PackageSpec {
                name: spec.to_string(),
                version: None,
            }),
        }
    }

    pub fn purl(&self) -> Option<String> {
        self.version.as_deref().map(|v| npm_purl(&self.name, v))
    }
}

/// Render an npm purl. Scoped names encode the leading `@` per the purl spec.
pub fn npm_purl(name: &str, version: &str) -> String {
    let encoded = if let Some(rest) = name.strip_prefix('@') {
        format!("%40{}", rest)
    } else {
        name.to_string()
    };
    format!("pkg:npm/{}@{}", encoded, version)
}

/// Strip semver range operators so a spec range can stand in for a version
/// when no lockfile pins one.
pub fn clean_range(range: &str) -> &str {
    range
        .trim_start_matches('^')
        .trim_start_matches('~')
        .trim_start_matches(">=")
        .trim_start_matches("<=")
        .trim_start_matches('>')
        .trim_start_matches('<')
        .trim_start_matches('=')
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_and_versioned() {
        assert_eq!(
            PackageSpec::parse("lodash"),
            Some(PackageSpec {
                name: "lodash".into(),
                version: None
            })
        );
        assert_eq!(
            PackageSpec::parse("lodash@4.17.21"),
            Some(PackageSpec {
                name: "lodash".into(),
                version: Some("4.17.21".into())
            })
        );
    }

    #[test]
    fn parse_scoped() {
        assert_eq!(
            PackageSpec::parse("@babel/core@7.24.0"),
            Some(PackageSpec {
                name: "@babel/core".into(),
                version: Some("7.24.0".into())
            })
        );
        assert_eq!(
            PackageSpec::parse("@babel/core"),
            Some(PackageSpec {
                name: "@babel/core".into(),
                version: None
            })
        );
    }

    #[test]
    fn purl_rendering() {
        assert_eq!(npm_purl("lodash", "4.17.21"), "pkg:npm/lodash@4.17.21");
        assert_eq!(
            npm_purl("@babel/core", "7.24.0"),
            "pkg:npm/%40babel/core@7.24.0"
        );
    }

    #[test]
    fn range_cleaning() {
        assert_eq!(clean_range("^1.2.3"), "1.2.3");
        assert_eq!(clean_range("~0.4.0"), "0.4.0");
        assert_eq!(clean_range(">=2.0.0"), "2.0.0");
        assert_eq!(clean_range("1.0.0"), "1.0.0");
    }
}
