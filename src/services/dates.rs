use chrono::{Duration, FixedOffset, NaiveDate, Utc};
use std::sync::Arc;

use crate::services::llm::{strip_code_fence, LanguageModel, LlmError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Turns date expressions such as "내일" or "다음주 일요일" into a calendar date.
pub struct DateResolver {
    model: Arc<dyn LanguageModel>,
    offset: FixedOffset,
}

impl DateResolver {
    pub fn new(model: Arc<dyn LanguageModel>, utc_offset_hours: i32) -> Result<Self, DateError> {
        let offset = utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or(DateError::InvalidOffset(utc_offset_hours))?;
        Ok(Self { model, offset })
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    /// Resolve `expression` against the current local date.
    pub async fn resolve_relative_date(&self, expression: &str) -> Result<NaiveDate, DateError> {
        self.resolve_on(expression, self.today()).await
    }

    /// Resolve `expression` as if today were `today`.
    ///
    /// Simple day offsets are computed locally; anything else goes to the
    /// language model, whose answer must parse as `YYYY-MM-DD`.
    pub async fn resolve_on(
        &self,
        expression: &str,
        today: NaiveDate,
    ) -> Result<NaiveDate, DateError> {
        if let Some(date) = resolve_local(expression, today) {
            return Ok(date);
        }

        let prompt = format!(
            "당신은 오직 날짜 계산만 수행하는 AI 어시스턴트입니다.\n\
             현재 날짜는 {} 입니다.\n\
             사용자의 날짜 표현('{}')을 분석하여 최종 목표 날짜를 계산하세요.\n\
             다른 설명이나 인사말, 문장 부호 없이 오직 'YYYY-MM-DD' 형식의 날짜만 출력하세요.",
            today.format(DATE_FORMAT),
            expression.trim()
        );

        let answer = self.model.generate(&prompt).await?;
        let candidate = strip_code_fence(&answer);
        let date = NaiveDate::parse_from_str(candidate, DATE_FORMAT)
            .map_err(|_| DateError::Unparseable(candidate.to_string()))?;

        tracing::info!(
            expression = %expression,
            resolved = %date.format(DATE_FORMAT),
            "Resolved date expression with language model"
        );
        Ok(date)
    }
}

/// Format a date the way the search service expects it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Resolve literal dates and plain day offsets without the language model.
pub fn resolve_local(expression: &str, today: NaiveDate) -> Option<NaiveDate> {
    let expr = expression.trim();

    for format in [DATE_FORMAT, "%Y.%m.%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(expr, format) {
            return Some(date);
        }
    }

    let days = match expr.to_lowercase().as_str() {
        "" | "오늘" | "today" => 0,
        "내일" | "tomorrow" => 1,
        "모레" | "내일모레" => 2,
        "글피" => 3,
        _ => return None,
    };
    today.checked_add_signed(Duration::days(days))
}

#[derive(Debug, thiserror::Error)]
pub enum DateError {
    #[error("Invalid UTC offset: {0} hours")]
    InvalidOffset(i32),

    #[error("Date resolution failed: {0}")]
    Model(#[from] LlmError),

    #[error("Could not read a YYYY-MM-DD date from '{0}'")]
    Unparseable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedAnswer(&'static str);

    #[async_trait]
    impl LanguageModel for FixedAnswer {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_local_offsets() {
        let today = day(2025, 12, 31);
        assert_eq!(resolve_local("오늘", today), Some(today));
        assert_eq!(resolve_local("내일", today), Some(day(2026, 1, 1)));
        assert_eq!(resolve_local(" 모레 ", today), Some(day(2026, 1, 2)));
        assert_eq!(resolve_local("Tomorrow", today), Some(day(2026, 1, 1)));
        assert_eq!(resolve_local("다음주 일요일", today), None);
    }

    #[test]
    fn test_literal_dates() {
        let today = day(2025, 1, 1);
        assert_eq!(resolve_local("2025-03-01", today), Some(day(2025, 3, 1)));
        assert_eq!(resolve_local("2025.03.01", today), Some(day(2025, 3, 1)));
    }

    #[tokio::test]
    async fn test_model_fallback() {
        let resolver = DateResolver::new(Arc::new(FixedAnswer("```\n2025-01-05\n```")), 9).unwrap();
        let date = resolver
            .resolve_on("다음주 일요일", day(2024, 12, 30))
            .await
            .unwrap();
        assert_eq!(date, day(2025, 1, 5));
    }

    #[tokio::test]
    async fn test_model_garbage_rejected() {
        let resolver = DateResolver::new(Arc::new(FixedAnswer("언젠가")), 9).unwrap();
        let err = resolver
            .resolve_on("추석", day(2025, 1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DateError::Unparseable(_)));
    }

    #[test]
    fn test_invalid_offset() {
        assert!(DateResolver::new(Arc::new(FixedAnswer("")), 30).is_err());
    }
}
