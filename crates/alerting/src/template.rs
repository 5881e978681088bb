//! Minimal `{{placeholder}}` substitution for alert templates (§4.6
//! Delivery). Unknown placeholders are left verbatim rather than erroring —
//! an operator-authored template with a typo should still fire, not vanish.

use std::collections::BTreeMap;

pub fn render(template: &str, values: &BTreeMap<&'static str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        rest = &rest[start + 2..];
        match rest.find("}}") {
            Some(end) => {
                let key = rest[..end].trim();
                if let Some(value) = values.get(key) {
                    out.push_str(value);
                } else {
                    out.push_str("{{");
                    out.push_str(key);
                    out.push_str("}}");
                }
                rest = &rest[end + 2..];
            }
            None => {
                out.push_str("{{");
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders() {
        let mut values = BTreeMap::new();
        values.insert("subject_name", "host1".to_string());
        assert_eq!(render("check {{subject_name}} failed", &values), "check host1 failed");
    }

    #[test]
    fn leaves_unknown_placeholders_verbatim() {
        let values = BTreeMap::new();
        assert_eq!(render("{{nope}}", &values), "{{nope}}");
    }
}
