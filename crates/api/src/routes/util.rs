use std::collections::BTreeMap;

use regex::RegexBuilder;

use crate::error::{ApiError, ApiResult};

pub fn parse_id(raw: &str) -> ApiResult<pulsewatch_ids::Id> {
    raw.parse().map_err(ApiError::from)
}

/// Case-insensitive regex, per §6 `name` search param.
pub fn parse_name_regex(params: &BTreeMap<String, String>) -> ApiResult<Option<regex::Regex>> {
    match params.get("name") {
        None => Ok(None),
        Some(pattern) => RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Some)
            .map_err(|err| ApiError::bad_request(format!("invalid name regex: {err}"))),
    }
}

pub fn csv_param<'a>(params: &'a BTreeMap<String, String>, key: &str) -> Vec<&'a str> {
    params
        .get(key)
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}
