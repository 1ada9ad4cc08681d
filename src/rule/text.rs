//! 基于原始文本的策略（keyword / regex）

use super::{Classification, RuleError};
use regex::RegexBuilder;

/// 关键字匹配；关键字为空时直接返回 OK
pub fn evaluate_keyword(body: &str, keyword: &str) -> Classification {
    if keyword.is_empty() {
        return Classification::ok();
    }
    if body.to_lowercase().contains(&keyword.to_lowercase()) {
        Classification::alert(format!("keyword '{}' detected", keyword))
    } else {
        Classification::ok()
    }
}

/// 正则匹配（大小写不敏感）；表达式为空时直接返回 OK
pub fn evaluate_regex(body: &str, pattern: &str) -> Result<Classification, RuleError> {
    if pattern.is_empty() {
        return Ok(Classification::ok());
    }
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| RuleError::InvalidRegex(e.to_string()))?;

    if regex.is_match(body) {
        Ok(Classification::alert(format!("regex '{}' matched", pattern)))
    } else {
        Ok(Classification::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckStatus;

    #[test]
    fn test_keyword_case_insensitive() {
        let result = evaluate_keyword("All systems: MAJOR OUTAGE", "major outage");
        assert_eq!(result.status, CheckStatus::Alert);
        assert_eq!(result.reason.as_deref(), Some("keyword 'major outage' detected"));
    }

    #[test]
    fn test_keyword_no_match() {
        assert_eq!(evaluate_keyword("All Systems Operational", "outage").status, CheckStatus::Ok);
    }

    #[test]
    fn test_empty_keyword_is_pass_through() {
        assert_eq!(evaluate_keyword("anything at all", "").status, CheckStatus::Ok);
    }

    #[test]
    fn test_regex_match() {
        let result = evaluate_regex("Steam Store: offline", r"store:\s+OFFLINE").unwrap();
        assert_eq!(result.status, CheckStatus::Alert);
        assert_eq!(result.reason.as_deref(), Some(r"regex 'store:\s+OFFLINE' matched"));
    }

    #[test]
    fn test_regex_no_match() {
        assert_eq!(evaluate_regex("fine", "outage|degraded").unwrap().status, CheckStatus::Ok);
    }

    #[test]
    fn test_invalid_regex() {
        let err = evaluate_regex("body", "(unclosed").unwrap_err();
        assert!(matches!(err, RuleError::InvalidRegex(_)));
        assert!(err.to_string().starts_with("invalid regex: "));
    }
}
