//! Lexical-then-numeric SemVer comparison for the `Version` check (§4.4).
//!
//! Deliberately not a delegation to the `semver` crate: the source compares
//! dotted numeric components pairwise and falls back to lexical string
//! comparison for any non-numeric component (including the whole
//! pre-release suffix), which `semver::Version::parse` would simply reject.
//! Ported from `remotecheck`'s version manifest comparator (see
//! `examples/original_source/utils/semver.go`).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid semver")]
pub struct InvalidSemVer;

/// Returns -1 if `lhs` is older than `rhs`, 1 if newer, 0 if equivalent.
pub fn compare(lhs: &str, rhs: &str) -> Result<i32, InvalidSemVer> {
    if lhs == rhs {
        return Ok(0);
    }
    if lhs.is_empty() {
        return Ok(-1);
    }
    if rhs.is_empty() {
        return Ok(1);
    }

    let l_parts: Vec<&str> = lhs.split('-').collect();
    let r_parts: Vec<&str> = rhs.split('-').collect();

    if l_parts[0] != r_parts[0] {
        let l_sub: Vec<&str> = l_parts[0].split('.').collect();
        let r_sub: Vec<&str> = r_parts[0].split('.').collect();
        for (i, lv) in l_sub.iter().enumerate() {
            let rv = r_sub.get(i).ok_or(InvalidSemVer)?;
            if lv == rv {
                continue;
            }
            let ilv: i64 = lv.parse().map_err(|_| InvalidSemVer)?;
            let irv: i64 = rv.parse().map_err(|_| InvalidSemVer)?;
            match ilv.cmp(&irv) {
                std::cmp::Ordering::Greater => return Ok(1),
                std::cmp::Ordering::Less => return Ok(-1),
                std::cmp::Ordering::Equal => {}
            }
        }
    }

    let (cl_parts, cr_parts) = (l_parts.len(), r_parts.len());
    if cl_parts == 1 && cr_parts > 1 {
        return Ok(1);
    }
    if cl_parts > 1 && cr_parts == 1 {
        return Ok(-1);
    }
    if cl_parts > cr_parts {
        return Ok(1);
    }
    if cl_parts < cr_parts {
        return Ok(-1);
    }

    for (lv, rv) in l_parts.iter().zip(r_parts.iter()) {
        if lv == rv {
            continue;
        }
        match (lv.parse::<i64>(), rv.parse::<i64>()) {
            (Ok(ilv), Ok(irv)) => match ilv.cmp(&irv) {
                std::cmp::Ordering::Greater => return Ok(1),
                std::cmp::Ordering::Less => return Ok(-1),
                std::cmp::Ordering::Equal => {}
            },
            _ => match lv.cmp(rv) {
                std::cmp::Ordering::Greater => return Ok(1),
                std::cmp::Ordering::Less => return Ok(-1),
                std::cmp::Ordering::Equal => {}
            },
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_vs_blank_is_equal() {
        assert_eq!(compare("", ""), Ok(0));
    }

    #[test]
    fn blank_is_older_than_any_version() {
        assert_eq!(compare("", "1.0.0"), Ok(-1));
        assert_eq!(compare("1.0.0", ""), Ok(1));
    }

    #[test]
    fn same_release_is_equal() {
        assert_eq!(compare("1.0.0", "1.0.0"), Ok(0));
    }

    #[test]
    fn patch_minor_major_ordering() {
        assert_eq!(compare("1.0.1", "1.0.0"), Ok(1));
        assert_eq!(compare("1.0.1", "1.0.2"), Ok(-1));
        assert_eq!(compare("1.1.0", "1.0.0"), Ok(1));
        assert_eq!(compare("1.0.1", "1.1.0"), Ok(-1));
        assert_eq!(compare("2.0.0", "1.0.0"), Ok(1));
        assert_eq!(compare("1.1.1", "2.0.0"), Ok(-1));
    }

    #[test]
    fn prerelease_is_older_than_release() {
        assert_eq!(compare("1.0.1-rc1", "1.0.1"), Ok(-1));
        assert_eq!(compare("1.0.1", "1.1.0-rc1"), Ok(-1));
    }

    #[test]
    fn prerelease_tags_compare_lexically() {
        assert_eq!(compare("1.0.1-rc1", "1.0.1-rc2"), Ok(-1));
    }

    #[test]
    fn non_numeric_component_is_an_error() {
        assert_eq!(compare("1.0.0", "1.z.0"), Err(InvalidSemVer));
        assert_eq!(compare("1.z.0", "1.0.0"), Err(InvalidSemVer));
        assert_eq!(compare("1.z.0", "1.z.0"), Ok(0));
    }
}
