/*
 * Responsibility
 * - Processes の request/response DTO
 * - query DTO の検証 (形式チェック) を from_raw に持たせる
 */
use serde::{Deserialize, Serialize};

use crate::api::v1::extractors::query::QueryParams;
use crate::error::ValidationIssue;

const PROTOCOL_MAX_LEN: usize = 64;

/// Lenient query shape; validation happens in [`QueryParams::from_raw`].
#[derive(Debug, Deserialize)]
pub struct ProcessNumberQuery {
    #[serde(default)]
    pub protocol: Option<String>,
}

/// Validated form of [`ProcessNumberQuery`].
#[derive(Debug)]
pub struct ProcessNumberParams {
    pub protocol: String,
}

impl QueryParams for ProcessNumberParams {
    type Raw = ProcessNumberQuery;

    fn from_raw(raw: Self::Raw) -> Result<Self, Vec<ValidationIssue>> {
        let protocol = match raw.protocol {
            None => {
                return Err(vec![ValidationIssue::query(
                    "protocol",
                    "Field required",
                    "missing",
                )]);
            }
            Some(protocol) => protocol,
        };

        let mut issues = Vec::new();
        if protocol.trim().is_empty() {
            issues.push(ValidationIssue::query(
                "protocol",
                "protocol cannot be empty",
                "value_error",
            ));
        }
        if protocol.len() > PROTOCOL_MAX_LEN {
            issues.push(ValidationIssue::query(
                "protocol",
                format!("protocol must be <= {PROTOCOL_MAX_LEN} chars"),
                "value_error",
            ));
        }

        if issues.is_empty() {
            Ok(Self { protocol })
        } else {
            Err(issues)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProcessNumberResponse {
    pub process_number: String,
    pub user_email: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessDetailsResponse {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(protocol: Option<&str>) -> ProcessNumberQuery {
        ProcessNumberQuery {
            protocol: protocol.map(str::to_string),
        }
    }

    #[test]
    fn valid_protocol_passes() {
        let params = ProcessNumberParams::from_raw(raw(Some("2024-000123"))).unwrap();
        assert_eq!(params.protocol, "2024-000123");
    }

    #[test]
    fn missing_protocol_is_reported_with_its_location() {
        let issues = ProcessNumberParams::from_raw(raw(None)).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].loc, vec!["query", "protocol"]);
        assert_eq!(issues[0].kind, "missing");
    }

    #[test]
    fn blank_protocol_is_a_value_error() {
        let issues = ProcessNumberParams::from_raw(raw(Some("   "))).unwrap_err();
        assert_eq!(issues[0].kind, "value_error");
    }

    #[test]
    fn oversized_protocol_is_a_value_error() {
        let issues = ProcessNumberParams::from_raw(raw(Some(&"9".repeat(65)))).unwrap_err();
        assert_eq!(issues[0].kind, "value_error");
    }
}
