//! Read package.json and package-lock.json for dependency and resolved
//! version maps; build purl lists for full-project checks.

use std::collections::HashMap;
use std::path::Path;

use crate::purl;

const DEP_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Read package.json and return name -> version spec across all dependency
/// sections. Later sections do not override earlier ones.
pub fn read_package_json_deps(path: &Path) -> Option<HashMap<String, String>> {
    let s = std::fs::read_to_string(path).ok()?;
    let v: serde_json::Value = serde_json::from_str(&s).ok()?;
    let mut deps = HashMap::new();
    for section in DEP_SECTIONS {
        if let Some(d) = v.get(section).and_then(|d| d.as_object()) {
            for (name, spec) in d {
                if let Some(s) = spec.as_str() {
                    deps.entry(name.clone()).or_insert_with(|| s.to_string());
                }
            }
        }
    }
    Some(deps)
}

/// Read package-lock.json and return resolved versions: name -> exact version.
/// Supports lockfileVersion 2 and 3 (packages key).
pub fn read_lockfile_resolved(path: &Path) -> Option<HashMap<String, String>> {
    let s = std::fs::read_to_string(path).ok()?;
    let v: serde_json::Value = serde_json::from_str(&s).ok()?;
    let packages = v.get("packages")?.as_object()?;
    let mut resolved = HashMap::new();
    for (key, val) in packages {
        // key is "" for root, "node_modules/foo" or nested "node_modules/a/node_modules/b"
        let name = match key.rfind("node_modules/") {
            Some(i) => &key[i + "node_modules/".len()..],
            None => continue,
        };
        if name.is_empty() {
            continue;
        }
        if let Some(version) = val.get("version").and_then(|x| x.as_str()) {
            resolved.insert(name.to_string(), version.to_string());
        }
    }
    Some(resolved)
}

/// Purls for every dependency of the project in `dir`: lockfile-resolved
/// versions where available, cleaned ranges otherwise. Specs with no usable
/// version are skipped.
pub fn project_purls(dir: &Path) -> Result<Vec<String>, String> {
    let pj = dir.join("package.json");
    if !pj.is_file() {
        return Err(format!("No package.json found in {}", dir.display()));
    }
    let deps = read_package_json_deps(&pj)
        .ok_or_else(|| format!("Could not read {}", pj.display()))?;
    let resolved = read_lockfile_resolved(&dir.join("package-lock.json"));

    let mut names: Vec<&String> = deps.keys().collect();
    names.sort();
    let mut purls = Vec::with_capacity(names.len());
    for name in names {
        let version = resolved
            .as_ref()
            .and_then(|r| r.get(name))
            .cloned()
            .or_else(|| {
                let cleaned = purl::clean_range(&deps[name]);
                // Ranges like "*" or "latest" have no usable pin.
                cleaned
                    .chars()
                    .next()
                    .filter(|c| c.is_ascii_digit())
                    .map(|_| cleaned.to_string())
            });
        if let Some(version) = version {
            purls.push(purl::npm_purl(name, &version));
        }
    }
    Ok(purls)
}
